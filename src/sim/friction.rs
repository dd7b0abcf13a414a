//! Floor friction: ice and mud sectors.
//!
//! Friction and move factors stay on the vanilla integer scale
//! (`ORIG_FRICTION` = 0xE800, `ORIG_FRICTION_FACTOR` = 2048); only the
//! momentum thresholds are converted to map units.

use hecs::Entity;

use super::MapSim;
use crate::defs::MobjFlags;
use crate::world::{approx_distance, FRICTION_MASK, ORIG_FRICTION, ORIG_FRICTION_FACTOR};

/// Speed past which mud stops holding a walker back. (vanilla 15000)
const MORE_FRICTION_MOMENTUM: f32 = 15000.0 / 65536.0;

impl MapSim {
    /// `(friction, movefactor)` for `e` from the sectors it stands in.
    /// Where sectors disagree the stickiest one wins.
    pub fn get_friction(&self, e: Entity) -> (i32, i32) {
        let mut friction = ORIG_FRICTION;
        let mut movefactor = ORIG_FRICTION_FACTOR;
        let Some(mo) = self.mobj(e) else {
            return (friction, movefactor);
        };

        let applies = !mo.flags.intersects(MobjFlags::NOCLIP | MobjFlags::NOGRAVITY)
            && (self.compat.mbf_rules() || (mo.player.is_some() && !self.compat.compatibility))
            && self.compat.variable_friction;
        if !applies {
            return (friction, movefactor);
        }

        let vertical_gate = self.portals.enabled() && self.compat.demo_version >= 340;
        for &s in self.touching_sectors(e) {
            let sec = &self.level.sectors[s as usize];
            if vertical_gate && !(mo.top() >= sec.floor_h || sec.floor_portal.is_some()) {
                continue;
            }
            let on_floor = mo.pos.z <= sec.floor_h
                || (self.compat.mbf_rules()
                    && sec
                        .height_sec
                        .is_some_and(|h| mo.pos.z <= self.level.sectors[h as usize].floor_h));
            if sec.special & FRICTION_MASK != 0
                && (sec.friction < friction || friction == ORIG_FRICTION)
                && on_floor
            {
                friction = sec.friction;
                movefactor = sec.move_factor;
            }
        }
        (friction, movefactor)
    }

    /// `(movefactor, friction)` to scale a walker's thrust by. In mud the
    /// factor grows with speed so things can pull themselves out.
    pub fn get_move_factor(&mut self, e: Entity) -> (i32, i32) {
        let Some(mo) = self.mobj(e) else {
            return (ORIG_FRICTION_FACTOR, ORIG_FRICTION);
        };
        let momentum = approx_distance(mo.mom.x, mo.mom.y);

        if !self.compat.mbf_rules() {
            // BOOM: friction was stored on the thing while it moved
            let mut movefactor = ORIG_FRICTION_FACTOR;
            if !self.compat.compatibility
                && self.compat.variable_friction
                && !mo.flags.intersects(MobjFlags::NOGRAVITY | MobjFlags::NOCLIP)
                && mo.friction != ORIG_FRICTION
            {
                movefactor = mo.movefactor;
                if mo.friction < ORIG_FRICTION {
                    movefactor = scale_for_mud(movefactor, momentum);
                }
                self.with_mobj(e, |m| m.movefactor = ORIG_FRICTION_FACTOR);
            }
            return (movefactor, mo.friction);
        }

        let (friction, mut movefactor) = self.get_friction(e);
        if friction < ORIG_FRICTION {
            movefactor = scale_for_mud(movefactor, momentum);
        }
        (movefactor, friction)
    }
}

fn scale_for_mud(movefactor: i32, momentum: f32) -> i32 {
    if momentum > MORE_FRICTION_MOMENTUM * 4.0 {
        movefactor << 3
    } else if momentum > MORE_FRICTION_MOMENTUM * 2.0 {
        movefactor << 2
    } else if momentum > MORE_FRICTION_MOMENTUM {
        movefactor << 1
    } else {
        movefactor
    }
}
