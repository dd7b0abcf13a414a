//! Ledge torque: things hanging over a drop slowly tip off it.
//!
//! Each contacted two-sided line whose low side is under the thing's
//! centre pushes it away, in proportion to how far the centre is past
//! the edge. The push halves with every gear so things settle.

use glam::Vec2;
use hecs::Entity;

use super::MapSim;
use crate::defs::MobjIntFlags;
use crate::world::{Aabb, Sector};

/// Gear at which torque is applied at full strength.
const OVERDRIVE: u32 = 6;
pub const MAXGEAR: u32 = OVERDRIVE + 16;
/// Squared momentum beyond which the gear is stepped up. (vanilla 4*FRACUNIT)
const TORQUE_LIMIT: f32 = 4.0;
/// Fixed-point scale of the integer lever arm.
const FRACUNIT: f32 = 65536.0;

impl MapSim {
    /// Add the momentum every straddled ledge applies to `e` and update
    /// its falling state and gear.
    pub fn apply_torque(&mut self, e: Entity) {
        let Some(mo) = self.mobj(e) else {
            return;
        };
        let was_falling = mo.intflags.contains(MobjIntFlags::FALLING);
        let bbox = Aabb::around(mo.xy(), mo.radius);

        let mut mom = mo.mom.truncate();
        let mut gear = mo.gear;
        for li in self.lines_in_box(bbox) {
            let ld = &self.level.linedefs[li as usize];
            let Some(back) = ld.back_sector else {
                continue;
            };
            let front = &self.level.sectors[ld.front_sector as usize];
            let back = &self.level.sectors[back as usize];
            let link = self.portals.link_or_zero(mo.group_id, front.group_id).truncate();
            let lbox = Aabb {
                min: bbox.min - link,
                max: bbox.max - link,
            };
            if !lbox.overlaps(&ld.bbox) || self.level.box_on_line_side(&lbox, ld) != -1 {
                continue;
            }

            let pos = mo.xy() - link;
            let v1 = self.level.v1(ld);
            // integer lever arm: every factor is truncated to whole units
            let (dx, dy) = (ld.delta.x.floor(), ld.delta.y.floor());
            let dist = dx * pos.y.floor() - dy * pos.x.floor() - dx * v1.y.floor() + dy * v1.x.floor();

            let z = mo.pos.z;
            let tips = if self.portals.enabled() && self.compat.demo_version >= 340 {
                // a portal floor at the same height also counts as a drop
                let low = |s: &Sector| s.floor_h < z || (s.floor_h == z && s.floor_portal.is_some());
                if dist < 0.0 {
                    low(front) && back.floor_h == z
                } else {
                    low(back) && front.floor_h == z
                }
            } else if dist < 0.0 {
                front.floor_h < z && back.floor_h >= z
            } else {
                back.floor_h < z && front.floor_h >= z
            };
            if !tips {
                continue;
            }

            let (mut major, mut minor) = (ld.delta.x.abs(), ld.delta.y.abs());
            if minor > major {
                std::mem::swap(&mut major, &mut minor);
            }
            // sine of the line's slope angle + 90°
            let sine = (minor / major).atan().cos();
            let scale = if gear < OVERDRIVE {
                (1u32 << (OVERDRIVE - gear)) as f32
            } else {
                1.0 / (1u32 << (gear - OVERDRIVE)) as f32
            };
            // `dist` is a raw fixed value; back to map units here
            let arm = dist * sine * scale / major / FRACUNIT;

            let mut push = Vec2::new(ld.delta.y * arm, ld.delta.x * arm);
            let mut energy = push.length_squared();
            while energy > TORQUE_LIMIT && gear < MAXGEAR {
                gear += 1;
                push *= 0.5;
                energy *= 0.5;
            }
            mom.x -= push.x;
            mom.y += push.y;
        }

        let falling = mom != Vec2::ZERO;
        self.with_mobj(e, |m| {
            m.mom.x = mom.x;
            m.mom.y = mom.y;
            m.gear = gear;
            m.intflags.set(MobjIntFlags::FALLING, falling);
            if !(falling || was_falling) {
                m.gear = 0;
            } else if m.gear < MAXGEAR {
                m.gear += 1;
            }
        });
    }
}
