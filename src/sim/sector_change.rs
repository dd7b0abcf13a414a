//! Re-clipping things after a floor or ceiling moved.
//!
//! Without stacking, every thing touching the sector is height-clipped
//! and crushed if it no longer fits. With stacking the four kinds of
//! plane movement are handled apart: rising floors push things up onto
//! whatever is above them, lowering ceilings push them down.

use std::collections::HashSet;

use glam::{Vec2, Vec3};
use hecs::Entity;
use log::trace;

use super::hooks::DamageKind;
use super::torque::MAXGEAR;
use super::{MapSim, Mobj, PlayHooks, RandomClass, ThingState};
use crate::defs::{MobjFlags, MobjFlags2, MobjFlags3, MobjIntFlags};
use crate::world::{Aabb, MAXRADIUS, SectorId};

/// Which plane of a sector moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectorPlane {
    Floor,
    Ceiling,
    /// A 3D mid texture: floor and ceiling rules at once.
    MidTex3d,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PushResult {
    Fit,
    /// The pushed thing met the floor or ceiling.
    HitPlane,
    /// Something beyond it would not move.
    NoFit,
}

#[derive(Clone, Copy)]
enum Mover {
    FloorDrop,
    FloorRaise,
    CeilingLower,
    CeilingRaise,
}

impl MapSim {
    /// Refit `e` after the sector under it changed height. Things on the
    /// floor ride it, floaters only move when the ceiling forces them.
    /// Returns whether it still fits.
    pub fn thing_height_clip(&mut self, hooks: &mut dyn PlayHooks, e: Entity) -> bool {
        let Some(before) = self.mobj(e) else {
            return true;
        };
        let onfloor = before.pos.z == before.floorz;
        let oldfloorz = before.floorz;

        self.check_position(hooks, e, before.pos.x, before.pos.y);
        self.copy_clip_heights(e);

        let mut fits = true;
        self.with_mobj(e, |m| {
            if m.flags2.contains(MobjFlags2::FLOATBOB) {
                if m.floorz > oldfloorz || !m.flags.contains(MobjFlags::NOGRAVITY) {
                    m.pos.z = m.pos.z - oldfloorz + m.floorz;
                }
                if m.top() > m.ceilingz {
                    m.pos.z = m.ceilingz - m.height;
                }
            } else if onfloor {
                m.pos.z = m.floorz;
                // a thing balanced on a ledge gets tipped again
                if m.intflags.contains(MobjIntFlags::FALLING) && m.gear >= MAXGEAR {
                    m.gear = 0;
                }
            } else if m.top() > m.ceilingz {
                m.pos.z = m.ceilingz - m.height;
            }
            fits = m.ceilingz - m.floorz >= m.height;
        });
        fits
    }

    /// Re-clip every thing in the cells around `sector`. Returns `true`
    /// when some shootable thing did not fit.
    pub fn change_sector(&mut self, hooks: &mut dyn PlayHooks, sector: SectorId, crunch: i32) -> bool {
        self.crush.nofit = false;
        self.crush.change = crunch;

        let bb = self.level.sectors[sector as usize].block_box;
        for bx in bb.left..=bb.right {
            for by in bb.bottom..=bb.top {
                for e in self.cell_things(bx, by) {
                    if self.world.contains(e) {
                        self.pit_change_sector(hooks, e);
                    }
                }
            }
        }
        self.crush.nofit
    }

    /// Re-clip the things touching `sector` after one of its planes moved
    /// by `amount` (negative: down). Picks the blockmap scan, the 3D push
    /// rules or the touching-list scan according to compatibility.
    pub fn check_sector(
        &mut self,
        hooks: &mut dyn PlayHooks,
        sector: SectorId,
        crunch: i32,
        amount: f32,
        plane: SectorPlane,
    ) -> bool {
        if self.compat.comp_floors && (self.compat.mbf_rules() || self.compat.demo_compatibility) {
            return self.change_sector(hooks, sector, crunch);
        }
        if self.use_3d_clipping() {
            return self.change_sector_3d(hooks, sector, crunch, amount, plane);
        }

        self.crush.nofit = false;
        self.crush.change = crunch;
        self.for_each_touching(sector, |sim, e| sim.pit_change_sector(hooks, e));
        self.crush.nofit
    }

    /// Plane movement with stacked things.
    pub fn change_sector_3d(
        &mut self,
        hooks: &mut dyn PlayHooks,
        sector: SectorId,
        crunch: i32,
        amount: f32,
        plane: SectorPlane,
    ) -> bool {
        self.crush.midtex_moving = false;
        self.crush.nofit = false;
        self.crush.change = crunch;
        self.crush.moveamt = amount.abs();

        let down = amount < 0.0;
        let floor = if down { Mover::FloorDrop } else { Mover::FloorRaise };
        let ceiling = if down { Mover::CeilingLower } else { Mover::CeilingRaise };
        let (first, second) = match plane {
            SectorPlane::Floor => (floor, None),
            SectorPlane::Ceiling => (ceiling, None),
            SectorPlane::MidTex3d => {
                self.crush.midtex_moving = true;
                (floor, Some(ceiling))
            }
        };

        self.for_each_touching(sector, |sim, e| {
            sim.run_mover(hooks, first, e);
            if let Some(m) = second {
                sim.run_mover(hooks, m, e);
            }
        });
        self.crush.nofit
    }

    /// Visit each thing in `sector`'s touching list once, rescanning from
    /// the head after every visit since `f` may relink things.
    fn for_each_touching(&mut self, sector: SectorId, mut f: impl FnMut(&mut MapSim, Entity)) {
        let vertical_gate = self.portals.enabled() && self.compat.demo_version >= 340;
        let mut visited: HashSet<Entity> = HashSet::new();
        loop {
            let next = self
                .touching
                .things_in(sector)
                .iter()
                .copied()
                .filter(|&e| !vertical_gate || self.sector_touches_vertically(sector, e))
                .find(|e| !visited.contains(e));
            let Some(e) = next else {
                break;
            };
            visited.insert(e);
            if self
                .mobj(e)
                .is_some_and(|m| !m.flags.contains(MobjFlags::NOBLOCKMAP))
            {
                f(self, e);
            }
        }
    }

    /// With portals, a thing linked to a sector may be in a different
    /// storey of it.
    fn sector_touches_vertically(&self, sector: SectorId, e: Entity) -> bool {
        let s = &self.level.sectors[sector as usize];
        self.mobj(e).is_some_and(|m| {
            (m.top() >= s.floor_h || s.floor_portal.is_some())
                && (m.pos.z <= s.ceil_h || s.ceiling_portal.is_some())
        })
    }

    fn pit_change_sector(&mut self, hooks: &mut dyn PlayHooks, e: Entity) {
        if self.thing_height_clip(hooks, e) {
            return;
        }
        self.do_crunch(hooks, e);
    }

    /// What happens to a thing that no longer fits.
    fn do_crunch(&mut self, hooks: &mut dyn PlayHooks, e: Entity) {
        let Some(mo) = self.mobj(e) else {
            return;
        };

        // bodies to giblets
        if mo.health <= 0 {
            self.reentrant(|sim| hooks.set_state(sim, e, ThingState::Gibs));
            self.with_mobj(e, |m| {
                m.flags.remove(MobjFlags::SOLID);
                m.height = 0.0;
                m.radius = 0.0;
            });
            return;
        }

        if mo.flags.contains(MobjFlags::DROPPED) {
            self.reentrant(|sim| hooks.remove_thing(sim, e));
            return;
        }

        if mo.flags.contains(MobjFlags::TOUCHY)
            && (mo.intflags.contains(MobjIntFlags::ARMED) || mo.sentient())
        {
            self.reentrant(|sim| hooks.damage_thing(sim, e, None, None, mo.health, DamageKind::Crush));
            return;
        }

        if !mo.flags.contains(MobjFlags::SHOOTABLE) {
            return;
        }
        self.crush.nofit = true;

        let change = self.crush.change;
        if change > 0 && self.leveltime & 3 == 0 {
            if mo.flags2.intersects(MobjFlags2::INVULNERABLE | MobjFlags2::DORMANT) {
                return;
            }
            self.reentrant(|sim| hooks.damage_thing(sim, e, None, None, change, DamageKind::Crush));

            if self.compat.demo_version < 333 || !mo.flags.contains(MobjFlags::NOBLOOD) {
                // blood rises from the middle of the body
                let at = mo.pos + Vec3::Z * (mo.height / 2.0);
                if let Some(blood) = self.reentrant(|sim| hooks.spawn_blood(sim, at)) {
                    let mx = hooks.p_sub_random(RandomClass::Crush) as f32 / 16.0;
                    let my = hooks.p_sub_random(RandomClass::Crush) as f32 / 16.0;
                    self.with_mobj(blood, |b| {
                        b.mom.x = mx;
                        b.mom.y = my;
                    });
                }
            }
        }
    }

    /* ----------------------------------------------------------------- */
    /*  3D plane movers                                                  */
    /* ----------------------------------------------------------------- */

    fn run_mover(&mut self, hooks: &mut dyn PlayHooks, mover: Mover, e: Entity) {
        match mover {
            Mover::FloorDrop => self.floor_drop(hooks, e),
            Mover::FloorRaise => self.floor_raise(hooks, e),
            Mover::CeilingLower => self.ceiling_lower(hooks, e),
            Mover::CeilingRaise => self.ceiling_raise(hooks, e),
        }
    }

    /// 3D position check in place; every thing is PASSMOBJ while a mid
    /// texture moves so nothing gets stuck in it.
    fn adjust_floor_ceil(&mut self, hooks: &mut dyn PlayHooks, e: Entity) -> bool {
        let Some(mo) = self.mobj(e) else {
            return false;
        };
        if self.crush.midtex_moving {
            self.with_mobj(e, |m| m.flags3.insert(MobjFlags3::PASSMOBJ));
        }
        let good = self.check_position_3d(hooks, e, mo.pos.x, mo.pos.y);
        self.copy_clip_heights(e);
        self.with_mobj(e, |m| m.flags3 = mo.flags3);
        good
    }

    fn floor_drop(&mut self, hooks: &mut dyn PlayHooks, e: Entity) {
        let Some(before) = self.mobj(e) else {
            return;
        };
        let oldfloorz = before.floorz;
        self.adjust_floor_ceil(hooks, e);

        let moveamt = self.crush.moveamt;
        self.with_mobj(e, |m| {
            let rides = m.mom.z == 0.0
                && (!m.flags.contains(MobjFlags::NOGRAVITY) || m.pos.z == oldfloorz);
            if !rides {
                return;
            }
            // bobbers keep their height over the floor; walkers follow
            // it down only when it drops slowly
            if m.flags2.contains(MobjFlags2::FLOATBOB) {
                m.pos.z = m.pos.z - oldfloorz + m.floorz;
            } else if m.flags.contains(MobjFlags::NOGRAVITY) || m.pos.z - m.floorz <= moveamt {
                m.pos.z = m.floorz;
            }
        });
    }

    fn floor_raise(&mut self, hooks: &mut dyn PlayHooks, e: Entity) {
        let Some(before) = self.mobj(e) else {
            return;
        };
        let oldfloorz = before.floorz;
        self.adjust_floor_ceil(hooks, e);
        let Some(mo) = self.mobj(e) else {
            return;
        };

        let bobbing = !mo.flags.contains(MobjFlags::NOGRAVITY) && mo.flags2.contains(MobjFlags2::FLOATBOB);
        if mo.pos.z > mo.floorz && !bobbing {
            return;
        }
        let oldz = mo.pos.z;
        self.with_mobj(e, |m| {
            if m.flags2.contains(MobjFlags2::FLOATBOB) {
                m.pos.z = m.pos.z - oldfloorz + m.floorz;
            } else {
                m.pos.z = m.floorz;
            }
        });

        let mut intersectors = Vec::new();
        match self.push_up(hooks, e, &mut intersectors) {
            PushResult::Fit => {}
            PushResult::HitPlane => self.do_crunch(hooks, e),
            PushResult::NoFit => {
                self.do_crunch(hooks, e);
                self.with_mobj(e, |m| m.pos.z = oldz);
            }
        }
    }

    fn ceiling_lower(&mut self, hooks: &mut dyn PlayHooks, e: Entity) {
        let Some(before) = self.mobj(e) else {
            return;
        };
        let onfloor = before.pos.z <= before.floorz;
        self.adjust_floor_ceil(hooks, e);
        let Some(mo) = self.mobj(e) else {
            return;
        };
        if mo.top() <= mo.ceilingz {
            return;
        }

        self.with_mobj(e, |m| {
            m.pos.z = if m.ceilingz - m.height >= m.floorz {
                m.ceilingz - m.height
            } else {
                m.floorz
            };
        });

        let mut intersectors = Vec::new();
        if self.push_down(hooks, e, &mut intersectors) != PushResult::Fit {
            if onfloor {
                self.with_mobj(e, |m| m.pos.z = m.floorz);
            }
            self.do_crunch(hooks, e);
        }
    }

    fn ceiling_raise(&mut self, hooks: &mut dyn PlayHooks, e: Entity) {
        let good = self.adjust_floor_ceil(hooks, e);
        let Some(mo) = self.mobj(e) else {
            return;
        };
        let moveamt = self.crush.moveamt;

        // only things stuck in the floor move; hangers stay put
        if mo.pos.z < mo.floorz && mo.top() >= mo.ceilingz - moveamt {
            self.with_mobj(e, |m| {
                m.pos.z = m.floorz;
                if m.top() > m.ceilingz {
                    m.pos.z = m.ceilingz - m.height;
                }
            });
        } else if !good && mo.top() < mo.ceilingz {
            // settle on top of whatever we are inside of
            let Some(under) = self.mobj_z_blocker(e, &mo).and_then(|b| self.mobj(b)) else {
                return;
            };
            if under.pos.z <= mo.pos.z {
                let z = (mo.ceilingz - mo.height).min(under.top());
                self.with_mobj(e, |m| m.pos.z = z);
            }
        }
    }

    /// Things resting on `e` (their bottom within its body).
    fn find_above_intersectors(&self, e: Entity, out: &mut Vec<Entity>) {
        self.find_intersectors(e, out, |mo, th| th.pos.z >= mo.pos.z && th.pos.z <= mo.top());
    }

    /// Things `e` is resting on (their top within its body).
    fn find_below_intersectors(&self, e: Entity, out: &mut Vec<Entity>) {
        self.find_intersectors(e, out, |mo, th| th.top() <= mo.top() && th.top() > mo.pos.z);
    }

    fn find_intersectors(
        &self,
        e: Entity,
        out: &mut Vec<Entity>,
        overlaps: impl Fn(&Mobj, &Mobj) -> bool,
    ) {
        let Some(mo) = self.mobj(e) else {
            return;
        };
        if mo.flags.contains(MobjFlags::NOCLIP) || !mo.flags.contains(MobjFlags::SOLID) {
            return;
        }
        let bbox = Aabb::around(mo.xy(), mo.radius + MAXRADIUS);
        self.things.for_each_in_bbox(bbox, |other| {
            let Some(th) = self.mobj(other) else {
                return true;
            };
            if !th.flags.contains(MobjFlags::SOLID) || th.flags.contains(MobjFlags::SPECIAL) || other == e {
                return true;
            }
            let blockdist = th.radius + mo.radius;
            let link = self.portals.link_or_zero(mo.group_id, th.group_id);
            let d = th.xy() + Vec2::new(link.x, link.y) - mo.xy();
            if d.x.abs() >= blockdist || d.y.abs() >= blockdist {
                return true;
            }
            if overlaps(&mo, &th) {
                out.push(other);
            }
            true
        });
    }

    /// A heavier thing that is not a monster stops the push.
    fn too_heavy(&self, pusher: Entity, other: Entity) -> bool {
        let (Some(p), Some(o)) = (self.mobj(pusher), self.mobj(other)) else {
            return false;
        };
        let killable = o.flags.contains(MobjFlags::COUNTKILL) || o.flags3.contains(MobjFlags3::KILLABLE);
        !killable && o.mass > p.mass
    }

    fn push_up(&mut self, hooks: &mut dyn PlayHooks, e: Entity, intersectors: &mut Vec<Entity>) -> PushResult {
        let Some(mo) = self.mobj(e) else {
            return PushResult::Fit;
        };
        if mo.top() > mo.ceilingz {
            return PushResult::HitPlane;
        }

        let first = intersectors.len();
        self.find_above_intersectors(e, intersectors);
        let last = intersectors.len();
        for i in first..last {
            let other = intersectors[i];
            let Some(oldz) = self.mobj(other).map(|o| o.pos.z) else {
                continue;
            };
            if self.too_heavy(e, other) {
                return PushResult::NoFit;
            }
            self.adjust_floor_ceil(hooks, other);
            let top = self.mobj(e).map_or(mo.top(), |m| m.top());
            self.with_mobj(other, |o| o.pos.z = top + 1.0);
            if self.push_up(hooks, other, intersectors) != PushResult::Fit {
                trace!("{other:?} jammed above {e:?}");
                self.do_crunch(hooks, other);
                self.with_mobj(other, |o| o.pos.z = oldz);
                return PushResult::NoFit;
            }
        }
        PushResult::Fit
    }

    fn push_down(&mut self, hooks: &mut dyn PlayHooks, e: Entity, intersectors: &mut Vec<Entity>) -> PushResult {
        let Some(mo) = self.mobj(e) else {
            return PushResult::Fit;
        };
        if mo.pos.z <= mo.floorz {
            return PushResult::HitPlane;
        }

        let first = intersectors.len();
        self.find_below_intersectors(e, intersectors);
        let last = intersectors.len();
        for i in first..last {
            let other = intersectors[i];
            let Some(oldz) = self.mobj(other).map(|o| o.pos.z) else {
                continue;
            };
            if self.too_heavy(e, other) {
                return PushResult::NoFit;
            }
            self.adjust_floor_ceil(hooks, other);
            let Some(o) = self.mobj(other) else {
                continue;
            };
            let z = self.mobj(e).map_or(mo.pos.z, |m| m.pos.z);
            // only ever pushed down
            if oldz > z - o.height {
                self.with_mobj(other, |o| o.pos.z = z - o.height);
                if self.push_down(hooks, other, intersectors) != PushResult::Fit {
                    trace!("{other:?} jammed below {e:?}");
                    self.do_crunch(hooks, other);
                    self.with_mobj(other, |o| o.pos.z = oldz);
                    return PushResult::NoFit;
                }
            }
        }
        PushResult::Fit
    }
}
