//! The simulation owner: map, things and the clip stack.

use hecs::{Entity, World};
use log::{debug, trace};
use once_cell::unsync::OnceCell;

use super::clip::{ClipContext, ClipStack};
use super::secnodes::SectorLinks;
use super::spacial::{Cell, ThingGrid};
use super::{CompatConfig, Mobj};
use crate::defs::MobjFlags;
use crate::world::{Level, PortalGroupTable, ValidCount};

/// Sector-movement scratch, also the target of spechit overrun writes.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct CrushState {
    pub change: i32,
    pub nofit: bool,
    pub moveamt: f32,
    pub midtex_moving: bool,
}

/// One loaded map with everything on it.
///
/// All movement queries are methods on this type. Anything game code
/// needs to do in the middle of a query goes through
/// [`PlayHooks`](super::PlayHooks), which receives the simulation back.
pub struct MapSim {
    pub level: Level,
    pub world: World,
    pub things: ThingGrid,
    pub compat: CompatConfig,
    pub portals: PortalGroupTable,
    pub leveltime: u32,
    /// Map number; MAP30 telefrags for everyone under old rules.
    pub gamemap: u32,

    pub(crate) clip: ClipStack,
    pub(crate) validcount: ValidCount,
    pub(crate) touching: SectorLinks,
    pub(crate) crush: CrushState,
    spechit_base: OnceCell<u32>,
}

impl MapSim {
    /// Takes ownership of `level`, assigns portal groups and prepares an
    /// empty thing grid on the blockmap's origin.
    pub fn new(mut level: Level, compat: CompatConfig) -> Self {
        let portals = PortalGroupTable::build(&mut level);
        debug!(
            "{}: {} lines, {} sectors, {} portal group(s)",
            level.name,
            level.linedefs.len(),
            level.sectors.len(),
            portals.group_count()
        );
        Self {
            things: ThingGrid::new(level.blockmap.origin),
            validcount: ValidCount::new(level.linedefs.len()),
            touching: SectorLinks::new(level.sectors.len()),
            world: World::new(),
            compat,
            portals,
            leveltime: 0,
            gamemap: 1,
            clip: ClipStack::new(),
            crush: CrushState::default(),
            spechit_base: OnceCell::new(),
            level,
        }
    }

    /*──────────────────────── clip frames ───────────────────────*/

    /// Result of the most recent query at the current nesting level.
    pub fn clip(&self) -> &ClipContext {
        self.clip.current()
    }

    /// Nesting level; 0 outside any collaborator call.
    pub fn clip_depth(&self) -> usize {
        self.clip.depth()
    }

    pub fn push_frame(&mut self) {
        self.clip.push();
    }

    pub fn pop_frame(&mut self) {
        self.clip.pop();
    }

    /// Run a collaborator on its own frame.
    pub(crate) fn reentrant<R>(&mut self, f: impl FnOnce(&mut MapSim) -> R) -> R {
        self.clip.push();
        let r = f(self);
        self.clip.pop();
        r
    }

    /// Overrun base address. The address is resolved on first use and
    /// fixed for the map; whether it applies follows the current config.
    pub(crate) fn spechit_base(&self) -> Option<u32> {
        if !self.compat.spechit_overrun_enabled() {
            return None;
        }
        Some(
            *self
                .spechit_base
                .get_or_init(|| self.compat.spechit_overrun_address()),
        )
    }

    /// Both object and portal clipping need the 3D thing checks.
    #[inline]
    pub fn use_3d_clipping(&self) -> bool {
        self.compat.overunder() || (self.portals.enabled() && self.compat.linked_portals())
    }

    /*──────────────────────── thing access ──────────────────────*/

    /// Copy of a thing's state, `None` once it is gone.
    #[inline]
    pub fn mobj(&self, e: Entity) -> Option<Mobj> {
        self.world.get::<&Mobj>(e).ok().map(|m| *m)
    }

    #[inline]
    pub fn mobj_mut(&mut self, e: Entity) -> Option<hecs::RefMut<'_, Mobj>> {
        self.world.get::<&mut Mobj>(e).ok()
    }

    /// Apply `f` to a live thing; a removed thing is ignored.
    #[inline]
    pub(crate) fn with_mobj(&mut self, e: Entity, f: impl FnOnce(&mut Mobj)) {
        if let Ok(mut mo) = self.world.get::<&mut Mobj>(e) {
            f(&mut mo);
        }
    }

    /*──────────────────────── spawning ──────────────────────────*/

    /// Put a thing on the map at `mobj.pos`.
    ///
    /// Its sector, group and height caches come from the sector under
    /// its centre; no collision test is made.
    pub fn spawn_thing(&mut self, mut mobj: Mobj) -> Entity {
        let sid = self.level.sector_at(mobj.xy());
        let sector = &self.level.sectors[sid as usize];
        mobj.sector = sid;
        mobj.group_id = sector.group_id;
        mobj.floorz = sector.floor_h;
        mobj.dropoffz = sector.floor_h;
        mobj.secfloorz = sector.floor_h;
        mobj.passfloorz = sector.floor_h;
        mobj.ceilingz = sector.ceil_h;
        mobj.secceilz = sector.ceil_h;
        mobj.passceilz = sector.ceil_h;
        if let Some(p) = mobj.player.as_mut() {
            p.view_z = mobj.pos.z + p.view_height;
        }

        let e = self.world.spawn((mobj,));
        self.set_thing_position(e);
        trace!("spawned {:?} kind {} at {}", e, mobj.kind.0, mobj.pos);
        e
    }

    /// Unlink and despawn. Unknown entities are ignored.
    pub fn remove_thing(&mut self, e: Entity) {
        self.unset_thing_position(e);
        self.touching.unlink(e);
        if self.world.despawn(e).is_ok() {
            trace!("removed {e:?}");
        }
    }

    /// Number of things on the map.
    pub fn thing_count(&self) -> usize {
        self.world.len() as usize
    }

    /*──────────────────────── linking ───────────────────────────*/

    /// Take a thing out of the thing grid. Its sector links stay until
    /// the next [`set_thing_position`](Self::set_thing_position) so that
    /// sectors it still touches keep their place in the list.
    pub(crate) fn unset_thing_position(&mut self, e: Entity) {
        self.things.remove(e);
    }

    /// Link a thing at its current position.
    pub(crate) fn set_thing_position(&mut self, e: Entity) {
        let Some(mo) = self.mobj(e) else {
            return;
        };
        let sid = self.level.sector_at(mo.xy());
        let group = self.level.sectors[sid as usize].group_id;
        self.with_mobj(e, |m| {
            m.sector = sid;
            m.group_id = group;
        });

        if !mo.flags.contains(MobjFlags::NOSECTOR) {
            let sectors = self.sectors_touched(mo.xy(), mo.radius, sid);
            self.touching.link(e, &sectors);
        }
        if !mo.flags.contains(MobjFlags::NOBLOCKMAP) {
            self.things.insert(e, mo.xy());
        }
    }

    /// Copy the current frame's height results onto `e`.
    pub(crate) fn copy_clip_heights(&mut self, e: Entity) {
        let c = self.clip.current();
        let z = [
            c.floorz, c.ceilingz, c.dropoffz, c.secfloorz, c.secceilz, c.passfloorz, c.passceilz,
        ];
        self.with_mobj(e, |m| {
            [
                m.floorz, m.ceilingz, m.dropoffz, m.secfloorz, m.secceilz, m.passfloorz, m.passceilz,
            ] = z;
        });
    }

    /// Things linked in one grid cell, copied so the caller may relink
    /// while walking. Entries may be despawned by the time they are read.
    #[inline]
    pub(crate) fn cell_things(&self, bx: i32, by: i32) -> Cell {
        self.things.snapshot(bx, by)
    }
}
