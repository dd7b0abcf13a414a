//! Position checks where things have height.
//!
//! Things may stand on, pass over or slip under each other. A walker
//! bumping into something low enough to climb is not blocked outright:
//! the check keeps looking for a thing that really blocks and reports
//! the climbable one through [`ClipContext::blocking_mobj`].
//!
//! [`ClipContext::blocking_mobj`]: super::ClipContext::blocking_mobj

use std::f32::consts::TAU;

use glam::Vec2;
use hecs::Entity;

use super::opening::STEPSIZE;
use super::position::Contact;
use super::{MapSim, Mobj, PlayHooks};
use crate::defs::{MobjFlags, MobjFlags2, MobjFlags3, MobjIntFlags};
use crate::world::{Aabb, MAXRADIUS, approx_distance};

/// Vertical speed of a floater closing in on its target.
const FLOATSPEED: f32 = 4.0;
/// How far above an item's base a passer-by still collects it.
const ITEM_HEIGHT: f32 = 8.0;

/// Height above the floor of a float-bobbing thing at phase `i`.
pub fn float_bob_offset(i: u32) -> f32 {
    8.0 * ((i & 63) as f32 * TAU / 64.0).sin()
}

impl MapSim {
    /// Position check that lets things stack.
    pub fn check_position_3d(&mut self, hooks: &mut dyn PlayHooks, e: Entity, x: f32, y: f32) -> bool {
        let Some(mo) = self.mobj(e) else {
            return false;
        };
        self.begin_clip(e, &mo, x, y);
        self.clip.current_mut().unstuck = mo.is_real_player();

        if mo.flags.contains(MobjFlags::NOCLIP) && !mo.flags.contains(MobjFlags::SKULLFLY) {
            return true;
        }

        let realheight = mo.height;
        // catch stepping up into things
        if mo.player.is_some() {
            self.with_mobj(e, |m| m.height = realheight + STEPSIZE);
        }
        let mut stepthing = None;
        let things = self.check_things_3d(hooks, e, &mut stepthing);
        self.with_mobj(e, |m| m.height = realheight);
        let Some(thingblocker) = things else {
            return false;
        };

        self.clip.current_mut().blocking_mobj = None;
        let Some(mo) = self.mobj(e) else {
            return false;
        };
        if mo.flags.contains(MobjFlags::NOCLIP) {
            self.clip.current_mut().blocking_mobj = thingblocker;
            return thingblocker.is_none();
        }

        let c = self.clip.current_mut();
        let thingdropoffz = c.floorz;
        c.floorz = c.dropoffz;
        let bbox = c.bbox;

        if !self.check_lines(e, bbox) {
            return false;
        }

        let c = self.clip.current_mut();
        if c.ceilingz - c.floorz < mo.height {
            return false;
        }
        if stepthing.is_some() {
            c.dropoffz = thingdropoffz;
        }
        c.blocking_mobj = thingblocker;
        thingblocker.is_none()
    }

    /// Thing pass of the 3D check.
    ///
    /// `None` when something definitely blocks, else the highest thing
    /// the mover could climb onto (if any).
    fn check_things_3d(
        &mut self,
        hooks: &mut dyn PlayHooks,
        e: Entity,
        stepthing: &mut Option<Entity>,
    ) -> Option<Option<Entity>> {
        let bbox = self.clip.current().bbox;
        let (xl, xh, yl, yh) = self.things.block_range(&bbox, MAXRADIUS);
        let mut thingblocker: Option<Entity> = None;

        for bx in xl..=xh {
            for by in yl..=yh {
                // resume after the climbable thing last reported
                let mut robin: Option<Entity> = None;
                loop {
                    let cell = self.cell_things(bx, by);
                    let start = match robin {
                        None => 0,
                        Some(r) => match cell.iter().position(|&t| t == r) {
                            Some(i) => i + 1,
                            None => break,
                        },
                    };
                    let blocked = cell[start..].iter().any(|&other| {
                        self.world.contains(other) && !self.pit_check_thing_3d(hooks, e, other, stepthing)
                    });
                    if !blocked {
                        break;
                    }

                    let mo = self.mobj(e)?;
                    let blocker = self
                        .clip
                        .current()
                        .blocking_mobj
                        .and_then(|b| self.mobj(b).map(|m| (b, m)));
                    let Some((b, bm)) = blocker else {
                        // slammed into something
                        return None;
                    };

                    if bm.player.is_none()
                        && !mo
                            .flags
                            .intersects(MobjFlags::FLOAT | MobjFlags::MISSILE | MobjFlags::SKULLFLY)
                        && bm.top() - mo.pos.z <= STEPSIZE
                    {
                        let higher = thingblocker
                            .and_then(|t| self.mobj(t))
                            .is_none_or(|t| bm.pos.z > t.pos.z);
                        if higher {
                            thingblocker = Some(b);
                        }
                        robin = Some(b);
                        self.clip.current_mut().blocking_mobj = None;
                    } else if mo.player.is_some() && mo.pos.z + mo.height - bm.pos.z <= STEPSIZE {
                        if thingblocker.is_some() {
                            // something to step up on; don't step
                            return None;
                        }
                        robin = Some(b);
                        self.clip.current_mut().blocking_mobj = None;
                    } else {
                        return None;
                    }
                }
            }
        }
        Some(thingblocker)
    }

    fn pit_check_thing_3d(
        &mut self,
        hooks: &mut dyn PlayHooks,
        e: Entity,
        other: Entity,
        stepthing: &mut Option<Entity>,
    ) -> bool {
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

        let topz = th.top();

        // monsters walk on things as well as floors
        if !mo.flags.intersects(
            MobjFlags::FLOAT | MobjFlags::MISSILE | MobjFlags::SKULLFLY | MobjFlags::NOGRAVITY,
        ) && th.flags.contains(MobjFlags::SOLID)
            && (mo.flags.contains(MobjFlags::COUNTKILL) || mo.flags3.contains(MobjFlags3::KILLABLE))
        {
            let c = self.clip.current_mut();
            if topz >= c.floorz && topz <= mo.pos.z + STEPSIZE {
                *stepthing = Some(other);
                c.floorz = topz;
            }
        }

        let notouch = mo.intflags.contains(MobjIntFlags::NOTOUCH);
        if mo.flags3.contains(MobjFlags3::PASSMOBJ) {
            if mo.flags3.contains(MobjFlags3::DONTOVERLAP) && th.flags3.contains(MobjFlags3::DONTOVERLAP) {
                return false;
            }
            // touchies go off when touched exactly
            if th.flags.contains(MobjFlags::TOUCHY)
                && !notouch
                && (mo.pos.z == topz || mo.top() == th.pos.z)
            {
                self.touched(hooks, e, other);
                self.with_mobj(e, |m| m.mom.z += 1.0);
                return true;
            }
            if mo.pos.z >= topz || mo.top() <= th.pos.z {
                if th.flags.contains(MobjFlags::SPECIAL)
                    && mo.pos.z >= topz
                    && mo.pos.z - th.pos.z <= ITEM_HEIGHT
                {
                    return self.check_pick_up(hooks, e, other);
                }
                return true;
            }
        }

        if !notouch && self.touched(hooks, e, other) {
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
        let Some(mo) = self.mobj(e) else {
            return true;
        };
        // the fake step height must not reach pickups overhead
        if th.flags.contains(MobjFlags::SPECIAL) && th.pos.z < mo.top() - STEPSIZE {
            return self.check_pick_up(hooks, e, other);
        }
        self.solid_passes(e, &th)
    }

    /// Would `e` fit at `(x, y, z)`? Pickups and touchy things are left
    /// alone.
    pub fn check_position_ext(
        &mut self,
        hooks: &mut dyn PlayHooks,
        e: Entity,
        x: f32,
        y: f32,
        z: f32,
    ) -> bool {
        let Some(saved) = self.mobj(e) else {
            return false;
        };
        self.with_mobj(e, |m| {
            m.flags.remove(MobjFlags::PICKUP);
            m.intflags.insert(MobjIntFlags::NOTOUCH);
        });
        let xygood = self.check_position(hooks, e, x, y);
        self.with_mobj(e, |m| {
            m.flags = saved.flags;
            m.intflags.remove(MobjIntFlags::NOTOUCH);
        });
        if !xygood {
            return false;
        }

        let mut z = z;
        if saved.flags2.contains(MobjFlags2::FLOATBOB) {
            z -= float_bob_offset(saved.floatbob.wrapping_add(self.leveltime).wrapping_sub(1));
        }
        let sector = &self.level.sectors[self.level.sector_at(Vec2::new(x, y)) as usize];
        z >= sector.floor_h && z + saved.height <= sector.ceil_h
    }

    /// Is `e`'s current height free of other solid things?
    pub fn test_mobj_z(&self, e: Entity) -> bool {
        self.mobj(e).is_none_or(|mo| self.mobj_z_blocker(e, &mo).is_none())
    }

    /// First solid thing overlapping `mo` (standing in for `e`) in 3D.
    pub(crate) fn mobj_z_blocker(&self, e: Entity, mo: &Mobj) -> Option<Entity> {
        if mo.flags.contains(MobjFlags::NOCLIP) {
            return None;
        }
        let bbox = Aabb::around(mo.xy(), mo.radius);
        let mut found = None;
        self.things
            .for_each_in_bbox(grow(bbox, MAXRADIUS), |other| {
                let Some(th) = self.mobj(other) else {
                    return true;
                };
                let corpses_step_aside = self.compat.demo_version >= 402;
                let skip = !th.flags.contains(MobjFlags::SOLID)
                    || th.flags.intersects(MobjFlags::SPECIAL | MobjFlags::NOCLIP)
                    || (corpses_step_aside && th.flags.contains(MobjFlags::CORPSE))
                    || mo.flags.contains(MobjFlags::SPECIAL)
                    || other == e
                    || mo.pos.z > th.top()
                    || mo.top() <= th.pos.z;
                if skip {
                    return true;
                }
                let blockdist = th.radius + mo.radius;
                if (th.pos.x - mo.pos.x).abs() >= blockdist || (th.pos.y - mo.pos.y).abs() >= blockdist {
                    return true;
                }
                found = Some(other);
                false
            });
        found
    }

    /// The thing `e` would be standing on after one tick of vertical
    /// movement, if any. Nothing is changed.
    pub fn get_thing_under(&self, e: Entity) -> Option<Entity> {
        let mut mo = self.mobj(e)?;
        mo.pos.z = self.z_movement_test(&mo);
        self.mobj_z_blocker(e, &mo)
    }

    /// Height `mo` would reach after one tick of vertical movement.
    fn z_movement_test(&self, mo: &Mobj) -> f32 {
        let mut z = mo.pos.z;
        let floater = mo.flags.contains(MobjFlags::FLOAT) && mo.sentient();
        let mut float_only = false;

        if mo.flags.contains(MobjFlags::BOUNCES) && mo.mom.z != 0.0 {
            z += mo.mom.z;
            if z <= mo.floorz {
                z = mo.floorz;
                if mo.mom.z < 0.0 {
                    if mo.flags.contains(MobjFlags::TOUCHY)
                        && mo.intflags.contains(MobjIntFlags::ARMED)
                        && mo.health > 0
                    {
                        return z;
                    } else if floater {
                        float_only = true;
                    }
                }
            } else if z >= mo.ceilingz - mo.height {
                z = mo.ceilingz - mo.height;
                if mo.mom.z > 0.0 {
                    // no sky here, so missiles stop at the ceiling
                    if mo.flags.contains(MobjFlags::MISSILE) || !floater {
                        return z;
                    }
                    float_only = true;
                }
            } else {
                if !floater {
                    return z;
                }
                float_only = true;
            }
        }

        if !float_only {
            z += mo.mom.z;
        }

        if (mo.flags ^ MobjFlags::FLOAT)
            .intersection(MobjFlags::FLOAT | MobjFlags::SKULLFLY | MobjFlags::INFLOAT)
            .is_empty()
        {
            if let Some(t) = mo.target.and_then(|t| self.mobj(t)) {
                let d = mo.xy() - t.xy();
                let delta = t.pos.z + mo.height / 2.0 - z;
                if approx_distance(d.x, d.y) < delta.abs() * 3.0 {
                    z += if delta < 0.0 { -FLOATSPEED } else { FLOATSPEED };
                }
            }
        }

        if z <= mo.floorz {
            z = mo.floorz;
        }
        if z + mo.height > mo.ceilingz {
            z = mo.ceilingz - mo.height;
        }
        z
    }
}

fn grow(b: Aabb, pad: f32) -> Aabb {
    Aabb {
        min: b.min - Vec2::splat(pad),
        max: b.max + Vec2::splat(pad),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_bob_table_shape() {
        assert_eq!(float_bob_offset(0), 0.0);
        assert!((float_bob_offset(16) - 8.0).abs() < 1e-4);
        assert!((float_bob_offset(48) + 8.0).abs() < 1e-4);
        assert_eq!(float_bob_offset(64), float_bob_offset(0));
    }
}
