//! Horizontal moves: `try_move` and the dropoff rule sets.
//!
//! Order of the tests follows the classic P_TryMove so that recorded
//! games replay identically; the dropoff test is picked by demo version.

use glam::Vec2;
use hecs::Entity;
use log::debug;

use super::compat::DropoffPolicy;
use super::opening::STEPSIZE;
use super::{MapSim, Mobj, PlayHooks};
use crate::defs::{MobjFlags, MobjFlags2, MobjFlags3, MobjIntFlags};

/* ----------------------------------------------------------------- */
/*  Physics constants (f32 map-units)                                */
/* ----------------------------------------------------------------- */
/// Drop a monster may take when it has a reason to jump down.
const MAX_JUMP_DOWN: f32 = 128.0;
/// Steepest step a bouncing, gravity-bound thing may climb.
const BOUNCE_STEP: f32 = 16.0;
/// Teleports through one portal allowed per tick.
const MAX_PORTAL_TAINT: u32 = 6;

impl MapSim {
    /// Move `e` to `(x, y)` if it fits, keeping its z.
    ///
    /// `dropoff` is 0 for ordinary moves, 1 when dropping off ledges is
    /// allowed (pushed things, falling corpses) and 2 for monsters
    /// jumping down towards their target.
    ///
    /// On success the thing is relinked, its height caches are copied
    /// from the clip frame and crossed special lines are triggered.
    pub fn try_move(&mut self, hooks: &mut dyn PlayHooks, e: Entity, x: f32, y: f32, dropoff: u8) -> bool {
        let Some(thing) = self.mobj(e) else {
            return false;
        };
        let on3dmidtex = thing.passfloorz == thing.floorz
            && thing.passfloorz != thing.secfloorz
            && thing.pos.z == thing.floorz;

        {
            let c = self.clip.current_mut();
            c.felldown = false;
            c.floatok = false;
        }

        /* -- 1: position test ----------------------------------------- */
        if self.use_3d_clipping() {
            let oldz = thing.pos.z;
            if !self.check_position_3d(hooks, e, x, y) {
                if !self.may_step_onto_blocker(e) {
                    return false;
                }
                let passes = self
                    .mobj(e)
                    .is_some_and(|m| m.flags3.contains(MobjFlags3::PASSMOBJ));
                if !passes {
                    self.with_mobj(e, |m| m.pos.z = oldz);
                    return false;
                }
            }
        } else if !self.check_position_2d(hooks, e, x, y) {
            return false;
        }

        let Some(thing) = self.mobj(e) else {
            return false;
        };

        /* -- 2: height rules ------------------------------------------ */
        if !thing.flags.contains(MobjFlags::NOCLIP) {
            let c = self.clip.current();
            let (floor, ceil) = (c.floorz, c.ceilingz);
            let touching = |line: Option<u16>| {
                line.is_some_and(|l| !self.untouched(&self.level.linedefs[l as usize], &thing))
            };
            let ret = c.unstuck
                && (c.ceilingline.is_none() || touching(c.ceilingline))
                && (c.floorline.is_none() || touching(c.floorline));

            if ceil - floor < thing.height {
                return ret; // doesn't fit
            }
            self.clip.current_mut().floatok = true;

            if !thing.flags.contains(MobjFlags::TELEPORT) && ceil - thing.pos.z < thing.height {
                return ret; // mobj must lower to fit
            }

            if !thing.flags.contains(MobjFlags::TELEPORT)
                && !thing.flags3.contains(MobjFlags3::FLOORMISSILE)
            {
                if floor - thing.pos.z > STEPSIZE {
                    return ret; // too big a step up
                }
                if self.use_3d_clipping() && thing.pos.z < floor {
                    // nothing may be in the way of the step up
                    let mut raised = thing;
                    raised.pos.z = floor;
                    if self.mobj_z_blocker(e, &raised).is_some() {
                        return false;
                    }
                }
            }

            if !self.check_dropoff(&thing, dropoff, on3dmidtex) {
                return false;
            }

            if thing.flags.contains(MobjFlags::BOUNCES)
                && !thing.flags.intersects(MobjFlags::MISSILE | MobjFlags::NOGRAVITY)
                && !thing.sentient()
                && floor - thing.pos.z > BOUNCE_STEP
            {
                return false;
            }

            // falling things may not climb too many steps
            if thing.intflags.contains(MobjIntFlags::FALLING)
                && floor - thing.pos.z > thing.mom.x * thing.mom.x + thing.mom.y * thing.mom.y
            {
                return false;
            }

            if thing.flags2.contains(MobjFlags2::CANTLEAVEFLOORPIC) {
                let here = self.level.sectors[thing.sector as usize].floor_pic;
                if self.clip.current().floorpic != here || floor - thing.pos.z != 0.0 {
                    return false;
                }
            }
        }

        /* -- 3: commit ------------------------------------------------ */
        self.commit_move(hooks, e, &thing, x, y);
        true
    }

    /// 3D failure path: may a player climb onto what stopped it?
    fn may_step_onto_blocker(&mut self, e: Entity) -> bool {
        let Some(thing) = self.mobj(e) else {
            return false;
        };
        let c = self.clip.current();
        let Some(b) = c.blocking_mobj.and_then(|b| self.mobj(b)) else {
            return false;
        };
        if b.player.is_some() || thing.player.is_none() {
            return false;
        }
        let steplimit = if b.flags.contains(MobjFlags::CORPSE) {
            0.0
        } else {
            STEPSIZE
        };
        if b.top() - thing.pos.z > steplimit || c.ceilingz - b.top() < thing.height {
            return false;
        }
        // a dying touchy thing stays in the way until it turns non-solid
        if b.flags.contains(MobjFlags::TOUCHY) && b.health <= 0 {
            return false;
        }
        true
    }

    /// Relink at `(x, y)` and fire the special lines crossed on the way.
    fn commit_move(&mut self, hooks: &mut dyn PlayHooks, e: Entity, before: &Mobj, x: f32, y: f32) {
        let old = before.xy();
        let oldgroup = before.group_id;

        self.unset_thing_position(e);
        self.copy_clip_heights(e);
        self.with_mobj(e, |m| {
            m.pos.x = x;
            m.pos.y = y;
        });
        self.set_thing_position(e);
        self.reentrant(|sim| hooks.adjust_floor_clip(sim, e));

        if before.flags.intersects(MobjFlags::TELEPORT | MobjFlags::NOCLIP) {
            return;
        }

        let hits = std::mem::take(&mut self.clip.current_mut().spechit);
        for &li in hits.iter().rev() {
            let Some(now) = self.mobj(e) else {
                break;
            };
            let ld = &self.level.linedefs[li as usize];
            let front_group = self.level.sectors[ld.front_sector as usize].group_id;

            if let Some(pid) = ld
                .portal
                .filter(|_| self.portals.enabled() && self.compat.linked_portals()) {
                // behind a portal line means we went through it
                if self.level.point_on_line_side(now.xy(), ld) == 1 {
                    let portal = &self.level.portals[pid as usize];
                    let link = portal
                        .target_group
                        .and_then(|g| self.portals.get_link_offset(front_group, g));
                    if let Some(link) = link {
                        if portal.tainted <= MAX_PORTAL_TAINT {
                            self.level.portals[pid as usize].tainted += 1;
                            self.portal_teleport(hooks, e, link);
                        } else {
                            debug!("portal {pid} tainted, skipping teleport");
                        }
                    }
                }
            }

            let ld = &self.level.linedefs[li as usize];
            if ld.special != 0 {
                let Some(now) = self.mobj(e) else {
                    break;
                };
                let link = self.portals.link_or_zero(now.group_id, front_group);
                let oldlink = if now.group_id == oldgroup {
                    link
                } else {
                    self.portals.link_or_zero(oldgroup, front_group)
                };
                let oldside = self.level.point_on_line_side(old - oldlink.truncate(), ld);
                let newside = self.level.point_on_line_side(now.xy() - link.truncate(), ld);
                if oldside != newside {
                    self.reentrant(|sim| hooks.cross_special_line(sim, li, oldside, e));
                }
            }
        }

        // hand the allocation back to the frame
        let c = self.clip.current_mut();
        let mut hits = hits;
        hits.clear();
        c.spechit = hits;
    }

    /* ================================================================= */
    /*  Dropoff rule sets                                                */
    /* ================================================================= */

    fn check_dropoff(&mut self, thing: &Mobj, dropoff: u8, on3dmidtex: bool) -> bool {
        match self.compat.dropoff_policy() {
            DropoffPolicy::Vanilla => self.dropoff_vanilla(thing),
            DropoffPolicy::Boom => self.dropoff_boom(thing, dropoff),
            DropoffPolicy::Mbf => self.dropoff_mbf(thing, dropoff),
            DropoffPolicy::Eternity => self.dropoff_eternity(thing, dropoff, on3dmidtex),
        }
    }

    fn dropoff_vanilla(&self, thing: &Mobj) -> bool {
        let c = self.clip.current();
        thing.flags.intersects(MobjFlags::DROPOFF | MobjFlags::FLOAT) || c.floorz - c.dropoffz <= STEPSIZE
    }

    fn dropoff_boom(&self, thing: &Mobj, dropoff: u8) -> bool {
        if self.compat.compatibility || dropoff == 0 {
            return self.dropoff_vanilla(thing);
        }
        true
    }

    fn dropoff_mbf(&mut self, thing: &Mobj, dropoff: u8) -> bool {
        let floorz = self.clip.current().floorz;
        self.dropoff_common(thing, dropoff, floorz)
    }

    fn dropoff_eternity(&mut self, thing: &Mobj, dropoff: u8, on3dmidtex: bool) -> bool {
        let clipfloor = self.clip.current().floorz;
        // standing on a thing: don't walk off it onto a dropoff
        let floorz = if self.use_3d_clipping() && thing.intflags.contains(MobjIntFlags::ONMOBJ) {
            thing.pos.z.max(clipfloor)
        } else {
            clipfloor
        };

        if thing.flags.intersects(MobjFlags::DROPOFF | MobjFlags::FLOAT) {
            return true;
        }

        if on3dmidtex {
            // never step off a 3D mid texture onto more than a stair
            if !self.dropoff_granted(thing, dropoff, thing.pos.z - clipfloor, clipfloor) {
                return thing.pos.z - clipfloor <= STEPSIZE;
            }
            self.clip.current_mut().felldown =
                !thing.flags.contains(MobjFlags::NOGRAVITY) && thing.pos.z - clipfloor > STEPSIZE;
            return true;
        }

        self.dropoff_common(thing, dropoff, floorz)
    }

    /// MBF rules, shared with later versions. `floorz` is the floor the
    /// mover would stand on.
    fn dropoff_common(&mut self, thing: &Mobj, dropoff: u8, floorz: f32) -> bool {
        if thing.flags.intersects(MobjFlags::DROPOFF | MobjFlags::FLOAT) {
            return true;
        }
        let dropz = self.clip.current().dropoffz;

        if self.compat.comp_dropoff {
            return floorz - dropz <= STEPSIZE;
        }
        if !self.dropoff_granted(thing, dropoff, floorz - dropz, dropz) {
            let blocked = if !self.compat.monkeys || !self.compat.mbf_rules() {
                floorz - dropz > STEPSIZE
            } else {
                thing.floorz - floorz > STEPSIZE || thing.dropoffz - dropz > STEPSIZE
            };
            return !blocked;
        }
        self.clip.current_mut().felldown =
            !thing.flags.contains(MobjFlags::NOGRAVITY) && thing.pos.z - floorz > STEPSIZE;
        true
    }

    /// Is the caller's dropoff request honoured? A jump (`dropoff == 2`)
    /// needs a drop no deeper than 128 and a target below `level`.
    fn dropoff_granted(&self, thing: &Mobj, dropoff: u8, drop: f32, level: f32) -> bool {
        match dropoff {
            0 => false,
            2 => {
                let target_below = thing
                    .target
                    .and_then(|t| self.mobj(t))
                    .is_some_and(|t| t.pos.z <= level);
                drop <= MAX_JUMP_DOWN && target_below
            }
            _ => true,
        }
    }

    /// Shift `e` through a linked portal by `offset`, keeping momentum
    /// and eye height. Things on the far side are telefragged only when
    /// they overlap the mover vertically.
    pub fn portal_teleport(&mut self, hooks: &mut dyn PlayHooks, e: Entity, offset: glam::Vec3) -> bool {
        let Some(mo) = self.mobj(e) else {
            return false;
        };
        let dest = mo.xy() - Vec2::new(offset.x, offset.y);
        if !self.portal_teleport_move(hooks, e, dest.x, dest.y) {
            return false;
        }
        self.with_mobj(e, |m| {
            m.pos.z = mo.pos.z - offset.z;
            m.mom = mo.mom;
            if let Some(p) = m.player.as_mut() {
                p.view_z = m.pos.z + p.view_height;
            }
        });
        self.reentrant(|sim| hooks.adjust_floor_clip(sim, e));
        true
    }
}
