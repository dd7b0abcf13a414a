//! Position checks with infinitely tall things.
//!
//! * [`MapSim::check_position`] is the entry point; it hands over to the
//!   3D variant when things may stack.
//! * The rules shared by both variants (touchy things, skulls, missiles,
//!   pushing, pickups) live here as well.
//!
//! A check only writes the current clip frame; things are touched only
//! through the [`PlayHooks`] collaborators.

use glam::Vec2;
use hecs::Entity;
use log::warn;
use smallvec::SmallVec;

use super::opening::PORTAL_BIAS;
use super::{DamageKind, MapSim, Mobj, PlayHooks, RandomClass, ThingState};
use crate::defs::{MobjFlags, MobjFlags2, MobjFlags3, MobjIntFlags, MobjKind};
use crate::world::{Aabb, Linedef, LinedefFlags, LinedefId, MAXRADIUS};

pub(crate) type LineList = SmallVec<[LinedefId; 32]>;

/// What the shared thing rules decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Contact {
    Pass,
    Block,
    /// Nothing decisive; the caller applies its own rules.
    Undecided,
}

impl MapSim {
    /// Can `e` stand at `(x, y)`?
    ///
    /// On return the current clip frame holds the floor, ceiling and
    /// dropoff heights found there, the lines that set them, any
    /// blocking thing and the special lines touched.
    pub fn check_position(&mut self, hooks: &mut dyn PlayHooks, e: Entity, x: f32, y: f32) -> bool {
        if self.use_3d_clipping() {
            self.check_position_3d(hooks, e, x, y)
        } else {
            self.check_position_2d(hooks, e, x, y)
        }
    }

    /// Reset the current frame for a query of `mo` at `(x, y)`.
    ///
    /// Heights start from the sector under the point. A linked floor or
    /// ceiling portal pushes its surface out of the way.
    pub(crate) fn begin_clip(&mut self, e: Entity, mo: &Mobj, x: f32, y: f32) {
        let at = Vec2::new(x, y);
        let sector = &self.level.sectors[self.level.sector_at(at) as usize];
        let bias = self.compat.linked_portals()
            && self.portals.enabled()
            && !mo.flags.contains(MobjFlags::NOCLIP);
        let floor = if bias && sector.floor_portal.is_some() {
            sector.floor_h - PORTAL_BIAS
        } else {
            sector.floor_h
        };
        let ceil = if bias && sector.ceiling_portal.is_some() {
            sector.ceil_h + PORTAL_BIAS
        } else {
            sector.ceil_h
        };
        let floorpic = sector.floor_pic;

        let c = self.clip.current_mut();
        c.thing = Some(e);
        c.x = x;
        c.y = y;
        c.bbox = Aabb::around(at, mo.radius);
        c.floorz = floor;
        c.dropoffz = floor;
        c.secfloorz = floor;
        c.passfloorz = floor;
        c.ceilingz = ceil;
        c.secceilz = ceil;
        c.passceilz = ceil;
        c.floorpic = floorpic;
        c.touch3dside = false;
        c.floorline = None;
        c.ceilingline = None;
        c.blockline = None;
        c.blocking_mobj = None;
        c.spechit.clear();
    }

    pub(crate) fn check_position_2d(
        &mut self,
        hooks: &mut dyn PlayHooks,
        e: Entity,
        x: f32,
        y: f32,
    ) -> bool {
        let Some(mo) = self.mobj(e) else {
            return false;
        };
        self.begin_clip(e, &mo, x, y);
        self.clip.current_mut().unstuck = mo.is_real_player() && self.compat.mbf_rules();

        if mo.flags.contains(MobjFlags::NOCLIP) {
            return true;
        }

        let bbox = self.clip.current().bbox;
        let (xl, xh, yl, yh) = self.things.block_range(&bbox, MAXRADIUS);
        for bx in xl..=xh {
            for by in yl..=yh {
                for other in self.cell_things(bx, by) {
                    if self.world.contains(other) && !self.pit_check_thing(hooks, e, other) {
                        return false;
                    }
                }
            }
        }

        // things that let the mover through are not blockers
        self.clip.current_mut().blocking_mobj = None;
        self.check_lines(e, bbox)
    }

    /// Line half of a position check over `bbox`.
    pub(crate) fn check_lines(&mut self, e: Entity, bbox: Aabb) -> bool {
        let Some(mo) = self.mobj(e) else {
            return false;
        };
        let lines = self.lines_in_box(bbox);
        lines.into_iter().all(|li| self.pit_check_line(&mo, li))
    }

    /// Each line registered in the cells under `bbox`, once, in
    /// blockmap order.
    pub(crate) fn lines_in_box(&mut self, bbox: Aabb) -> LineList {
        let mut out = LineList::new();
        self.level
            .block_lines_iter(bbox, &mut self.validcount, |li, _| {
                out.push(li);
                true
            });
        out
    }

    /*──────────────────────── lines ─────────────────────────────*/

    /// `true` when `ld` does not touch the footprint `mo` has now.
    pub(crate) fn untouched(&self, ld: &Linedef, mo: &Mobj) -> bool {
        let bbox = Aabb::around(mo.xy(), mo.radius);
        !bbox.overlaps(&ld.bbox) || self.level.box_on_line_side(&bbox, ld) != -1
    }

    fn pit_check_line(&mut self, mo: &Mobj, li: LinedefId) -> bool {
        let ld = &self.level.linedefs[li as usize];
        let clip = self.clip.current();
        if !clip.bbox.overlaps(&ld.bbox) || self.level.box_on_line_side(&clip.bbox, ld) != -1 {
            return true;
        }

        let linked = ld.portal.is_some() && self.portals.enabled() && self.compat.linked_portals();

        if ld.back_sector.is_none() && linked {
            self.add_spechit(li);
            return true;
        }

        if ld.back_sector.is_none() || ld.flags.contains(LinedefFlags::BLOCK_ALL) {
            // a player stuck in a wall may only back out of it
            let escapes = clip.unstuck
                && !self.untouched(ld, mo)
                && (clip.x - mo.pos.x) * ld.delta.y > (clip.y - mo.pos.y) * ld.delta.x;
            self.clip.current_mut().blockline = Some(li);
            return escapes;
        }

        if !mo.flags.intersects(MobjFlags::MISSILE | MobjFlags::BOUNCES) {
            if ld.flags.contains(LinedefFlags::IMPASSABLE) {
                return clip.unstuck && !self.untouched(ld, mo);
            }
            if ld.flags.contains(LinedefFlags::BLOCK_MONSTERS)
                && !ld.flags.contains(LinedefFlags::MIDTEX_3D)
                && mo.blocked_as_monster()
            {
                return false;
            }
        }

        let special = ld.special != 0;
        let op = self.line_opening(li, Some(mo));
        let mbf_midtex = self.compat.demo_version >= 331;

        let c = self.clip.current_mut();
        c.open = op;
        c.floorpic = op.floorpic;
        if op.touch3dside {
            c.touch3dside = true;
        }
        if op.top < c.ceilingz {
            c.ceilingz = op.top;
            c.ceilingline = Some(li);
            c.blockline = Some(li);
        }
        if op.bottom > c.floorz {
            c.floorz = op.bottom;
            c.floorline = Some(li);
            c.blockline = Some(li);
        }
        if op.lowfloor < c.dropoffz {
            c.dropoffz = op.lowfloor;
        }
        // no dropoffs while standing on a 3D mid texture
        if mbf_midtex && c.touch3dside {
            c.dropoffz = c.floorz;
        }
        c.secfloorz = c.secfloorz.max(op.sec_floor);
        c.secceilz = c.secceilz.min(op.sec_ceil);
        c.passfloorz = c.passfloorz.max(c.floorz);
        c.passceilz = c.passceilz.min(c.ceilingz);

        if special || linked {
            self.add_spechit(li);
        }
        true
    }

    /// Record a touched special line, replaying the vanilla overflow
    /// once more than eight have been seen.
    fn add_spechit(&mut self, li: LinedefId) {
        self.clip.current_mut().spechit.push(li);
        let n = self.clip.current().numspechit();
        if n > 8 {
            if let Some(base) = self.spechit_base() {
                self.spechit_overrun(base, li, n);
            }
        }
    }

    /// Writes that landed past the end of the eight-entry array.
    fn spechit_overrun(&mut self, base: u32, li: LinedefId, n: usize) {
        let addr = base.wrapping_add(li as u32 * 0x3E);
        let fixed = addr as i32 as f32 / 65536.0;
        match n {
            9 => self.clip.current_mut().bbox.max.y = fixed,
            10 => self.clip.current_mut().bbox.min.y = fixed,
            11 => self.clip.current_mut().bbox.min.x = fixed,
            12 => self.clip.current_mut().bbox.max.x = fixed,
            13 => self.crush.change = addr as i32,
            14 => self.crush.nofit = addr != 0,
            _ => warn!("spechit overrun with {n} entries cannot be emulated"),
        }
    }

    /*──────────────────────── things ────────────────────────────*/

    fn pit_check_thing(&mut self, hooks: &mut dyn PlayHooks, e: Entity, other: Entity) -> bool {
        let (Some(mo), Some(th)) = (self.mobj(e), self.mobj(other)) else {
            return true;
        };
        if !th.flags.intersects(
            MobjFlags::SOLID | MobjFlags::SPECIAL | MobjFlags::SHOOTABLE | MobjFlags::TOUCHY,
        ) {
            return true;
        }
        let blockdist = th.radius + mo.radius;
        let clip = self.clip.current();
        if (th.pos.x - clip.x).abs() >= blockdist || (th.pos.y - clip.y).abs() >= blockdist {
            return true;
        }
        if other == e {
            return true;
        }
        self.clip.current_mut().blocking_mobj = Some(other);

        if self.touched(hooks, e, other) {
            return true;
        }
        match self.thing_contact(hooks, e, other) {
            Contact::Pass => return true,
            Contact::Block => return false,
            Contact::Undecided => {}
        }

        let Some(th) = self.mobj(other) else {
            return true;
        };
        if th.flags.contains(MobjFlags::SPECIAL) {
            return self.check_pick_up(hooks, e, other);
        }
        self.solid_passes(e, &th)
    }

    /// Last word on two things that overlap: non-solid movers and
    /// no-clipping obstacles let each other through.
    pub(crate) fn solid_passes(&self, e: Entity, th: &Mobj) -> bool {
        let solid = th.flags.contains(MobjFlags::SOLID);
        if self.compat.demo_compatibility {
            return !solid;
        }
        let mover_solid = self
            .mobj(e)
            .is_some_and(|m| m.flags.contains(MobjFlags::SOLID));
        !((solid && !th.flags.contains(MobjFlags::NOCLIP)) && mover_solid)
    }

    /// A solid mover bumping a live touchy thing kills it.
    pub(crate) fn touched(&mut self, hooks: &mut dyn PlayHooks, e: Entity, other: Entity) -> bool {
        let (Some(mo), Some(th)) = (self.mobj(e), self.mobj(other)) else {
            return false;
        };
        let fires = th.flags.contains(MobjFlags::TOUCHY)
            && mo.flags.contains(MobjFlags::SOLID)
            && th.health > 0
            && (th.intflags.contains(MobjIntFlags::ARMED) || th.sentient())
            && (th.kind != mo.kind || th.player.is_some())
            && th.top() >= mo.pos.z
            && mo.top() >= th.pos.z
            && !MobjKind::pe_skull_pair(th.kind, mo.kind);
        if fires {
            self.reentrant(|sim| {
                hooks.damage_thing(sim, other, None, None, th.health, DamageKind::Unknown)
            });
        }
        fires
    }

    /// A charging skull slams into `other` and stops dead.
    pub(crate) fn skull_hit(&mut self, hooks: &mut dyn PlayHooks, e: Entity, other: Entity) -> bool {
        let Some(mo) = self.mobj(e) else {
            return false;
        };
        if !mo.flags.contains(MobjFlags::SKULLFLY) {
            return false;
        }
        let damage = (hooks.p_random(RandomClass::SkullFly) % 8 + 1) * mo.damage;
        self.reentrant(|sim| {
            hooks.damage_thing(sim, other, Some(e), Some(e), damage, DamageKind::Projectile)
        });
        self.with_mobj(e, |m| {
            m.flags.remove(MobjFlags::SKULLFLY);
            m.mom = glam::Vec3::ZERO;
        });
        self.reentrant(|sim| hooks.set_state(sim, e, ThingState::Spawn));
        self.clip.current_mut().blocking_mobj = None;
        true
    }

    /// Skulls, missiles and pushing.
    pub(crate) fn thing_contact(
        &mut self,
        hooks: &mut dyn PlayHooks,
        e: Entity,
        other: Entity,
    ) -> Contact {
        if self.skull_hit(hooks, e, other) {
            return Contact::Block;
        }
        let (Some(mo), Some(th)) = (self.mobj(e), self.mobj(other)) else {
            return Contact::Pass;
        };

        if mo.flags.contains(MobjFlags::MISSILE)
            || (mo.flags.contains(MobjFlags::BOUNCES) && !mo.flags.contains(MobjFlags::SOLID))
        {
            return self.missile_contact(hooks, e, &mo, other, &th);
        }

        let v = self.compat.demo_version;
        if th.flags2.contains(MobjFlags2::PUSHABLE)
            && v >= 329
            && !(v >= 331 && mo.flags3.contains(MobjFlags3::CANNOTPUSH))
        {
            self.with_mobj(other, |t| {
                t.mom.x += mo.mom.x / 4.0;
                t.mom.y += mo.mom.y / 4.0;
            });
        }
        Contact::Undecided
    }

    fn missile_contact(
        &mut self,
        hooks: &mut dyn PlayHooks,
        e: Entity,
        mo: &Mobj,
        other: Entity,
        th: &Mobj,
    ) -> Contact {
        let height = if self.compat.decoration_heights() && th.flags3.contains(MobjFlags3::DECORATION3D)
        {
            th.info_height
        } else {
            th.height
        };

        if th.flags3.contains(MobjFlags3::GHOST) && mo.flags3.contains(MobjFlags3::THRUGHOST) {
            return Contact::Pass;
        }
        if mo.pos.z > th.pos.z + height || mo.top() < th.pos.z {
            return Contact::Pass;
        }

        if let Some(t) = mo.target {
            if other == t {
                return Contact::Pass;
            }
            let kin = self
                .mobj(t)
                .is_some_and(|shooter| shooter.kind.same_species(th.kind));
            if kin && th.player.is_none() {
                return Contact::Block;
            }
        }

        if mo.flags3.contains(MobjFlags3::RIP) {
            let damage = ((hooks.p_random(RandomClass::Rip) & 3) + 2) * mo.damage;
            self.reentrant(|sim| {
                hooks.damage_thing(sim, other, Some(e), mo.target, damage, DamageKind::Projectile)
            });
            if th.flags2.contains(MobjFlags2::PUSHABLE) && !mo.flags3.contains(MobjFlags3::CANNOTPUSH) {
                self.with_mobj(other, |t| {
                    t.mom.x += mo.mom.x / 4.0;
                    t.mom.y += mo.mom.y / 4.0;
                });
            }
            return Contact::Pass;
        }

        // a bouncing non-missile rebounds off solids and does no damage
        if !mo.flags.contains(MobjFlags::MISSILE) {
            if !th.flags.contains(MobjFlags::SOLID) {
                return Contact::Pass;
            }
            self.with_mobj(e, |m| {
                m.mom.x = -m.mom.x;
                m.mom.y = -m.mom.y;
                if !m.flags.contains(MobjFlags::NOGRAVITY) {
                    m.mom.x /= 4.0;
                    m.mom.y /= 4.0;
                }
            });
            return Contact::Block;
        }

        if !th.flags.contains(MobjFlags::SHOOTABLE) {
            return if th.flags.contains(MobjFlags::SOLID) {
                Contact::Block
            } else {
                Contact::Pass
            };
        }

        let damage = (hooks.p_random(RandomClass::Damage) % 8 + 1) * mo.damage;
        self.reentrant(|sim| {
            hooks.damage_thing(sim, other, Some(e), mo.target, damage, DamageKind::Projectile)
        });
        Contact::Block
    }

    /// Hand a pickup to the mover if it collects things.
    pub(crate) fn check_pick_up(&mut self, hooks: &mut dyn PlayHooks, e: Entity, special: Entity) -> bool {
        let solid = self
            .mobj(special)
            .is_some_and(|s| s.flags.contains(MobjFlags::SOLID));
        if self
            .mobj(e)
            .is_some_and(|m| m.flags.contains(MobjFlags::PICKUP))
        {
            self.reentrant(|sim| hooks.touch_special_thing(sim, special, e));
        }
        !solid
    }

    /*──────────────────────── spawn sight line ──────────────────*/

    /// Does a blocking line separate `actor` from `(x, y)`?
    ///
    /// Used before spawning a lost soul out of a pain elemental. Any
    /// one-sided, impassable or monster-blocking line (3D mid textures
    /// excepted) that the segment crosses counts.
    pub fn check_sides(&mut self, actor: Entity, x: f32, y: f32) -> bool {
        let Some(mo) = self.mobj(actor) else {
            return false;
        };
        let (pe, ls) = (mo.xy(), Vec2::new(x, y));
        let bbox = Aabb::spanning(pe, ls);

        for li in self.lines_in_box(bbox) {
            let ld = &self.level.linedefs[li as usize];
            let mut mask = LinedefFlags::TWO_SIDED | LinedefFlags::IMPASSABLE;
            if !ld.flags.contains(LinedefFlags::MIDTEX_3D) {
                mask |= LinedefFlags::BLOCK_MONSTERS;
            }
            let blocking = !((ld.flags ^ LinedefFlags::TWO_SIDED) & mask).is_empty();
            let apart = bbox.min.x > ld.bbox.max.x
                || bbox.max.x < ld.bbox.min.x
                || bbox.max.y < ld.bbox.min.y
                || bbox.min.y > ld.bbox.max.y;
            if blocking
                && !apart
                && self.level.point_on_line_side(pe, ld) != self.level.point_on_line_side(ls, ld)
            {
                return true;
            }
        }
        false
    }
}
