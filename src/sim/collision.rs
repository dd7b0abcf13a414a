//! Wall sliding.
//!
//! When a move is blocked the thing is traced from three corners of its
//! box along its momentum. It advances to just short of the nearest
//! blocking line, and whatever momentum is left is turned along that
//! line. After two deflections it falls back to moving one axis at a
//! time.

use glam::Vec2;
use hecs::Entity;

use super::hooks::Sound;
use super::opening::STEPSIZE;
use super::trace::Intercept;
use super::{MapSim, Mobj, PlayHooks};
use crate::world::{
    ANG45, ANG90, ANG180, LinedefFlags, LinedefId, ORIG_FRICTION, SlopeType, approx_distance,
    bam_to_radians, point_to_angle,
};

/// Back-off from the blocking line. (vanilla 0x800)
const SLIDE_FUDGE: f32 = 1.0 / 32.0;
/// Speed above which an icy floor bounces a thing off walls.
const ICE_BOUNCE_SPEED: f32 = 4.0;

impl MapSim {
    /// Move `e` by its momentum, sliding along whatever walls it hits.
    pub fn slide_move(&mut self, hooks: &mut dyn PlayHooks, e: Entity) {
        let mut hitcount = 3;
        loop {
            hitcount -= 1;
            let Some(mo) = self.mobj(e) else {
                return;
            };
            if hitcount == 0 {
                self.stairstep(hooks, e, &mo);
                return;
            }

            let mom = mo.mom.truncate();
            let (leadx, trailx) = if mom.x > 0.0 {
                (mo.pos.x + mo.radius, mo.pos.x - mo.radius)
            } else {
                (mo.pos.x - mo.radius, mo.pos.x + mo.radius)
            };
            let (leady, traily) = if mom.y > 0.0 {
                (mo.pos.y + mo.radius, mo.pos.y - mo.radius)
            } else {
                (mo.pos.y - mo.radius, mo.pos.y + mo.radius)
            };

            let mut best: Option<(f32, LinedefId)> = None;
            for corner in [
                Vec2::new(leadx, leady),
                Vec2::new(trailx, leady),
                Vec2::new(leadx, traily),
            ] {
                self.path_traverse(corner, corner + mom, |sim, ic| {
                    sim.slide_traverse(e, &mo, ic, &mut best)
                });
            }

            // the move must have hit the middle, so stairstep
            let Some((bestfrac, bestline)) = best else {
                self.stairstep(hooks, e, &mo);
                return;
            };

            let frac = bestfrac - SLIDE_FUDGE;
            if frac > 0.0 {
                let to = mo.xy() + mom * frac;
                if !self.try_move(hooks, e, to.x, to.y, 1) {
                    if let Some(mo) = self.mobj(e) {
                        self.stairstep(hooks, e, &mo);
                    }
                    return;
                }
            }

            // now continue along the wall with what is left
            let remainder = (1.0 - (frac + SLIDE_FUDGE)).min(1.0);
            if remainder <= 0.0 {
                return;
            }
            let Some(mo) = self.mobj(e) else {
                return;
            };
            let mut tm = mom * remainder;
            self.hit_slide_line(hooks, e, &mo, bestline, &mut tm);

            self.with_mobj(e, |m| {
                m.mom.x = tm.x;
                m.mom.y = tm.y;
                if let Some(p) = m.player.as_mut().filter(|p| !p.voodoo) {
                    if p.bob_mom.x.abs() > tm.x.abs() {
                        p.bob_mom.x = tm.x;
                    }
                    if p.bob_mom.y.abs() > tm.y.abs() {
                        p.bob_mom.y = tm.y;
                    }
                }
            });

            let to = mo.xy() + tm;
            if self.try_move(hooks, e, to.x, to.y, 1) {
                return;
            }
        }
    }

    /// Try each axis of the move on its own.
    fn stairstep(&mut self, hooks: &mut dyn PlayHooks, e: Entity, mo: &Mobj) {
        let mom = mo.mom.truncate();
        if self.try_move(hooks, e, mo.pos.x, mo.pos.y + mom.y, 1) {
            return;
        }
        let Some(mo) = self.mobj(e) else {
            return;
        };
        if !self.try_move(hooks, e, mo.pos.x + mom.x, mo.pos.y, 1) && self.compat.demo_version == 201 {
            self.with_mobj(e, |m| {
                m.mom.x = 0.0;
                m.mom.y = 0.0;
            });
        }
    }

    /// Visitor for one slide trace; records the nearest blocking line.
    fn slide_traverse(
        &mut self,
        e: Entity,
        mo: &Mobj,
        ic: &Intercept,
        best: &mut Option<(f32, LinedefId)>,
    ) -> bool {
        let ld = &self.level.linedefs[ic.line as usize];
        let blocks = if ld.back_sector.is_none() {
            // one-sided walls are never hit from behind
            if self.level.point_on_line_side(mo.xy(), ld) == 1 {
                return true;
            }
            true
        } else if ld.flags.contains(LinedefFlags::BLOCK_ALL) {
            true
        } else {
            let op = self.line_opening(ic.line, Some(mo));
            self.clip.current_mut().open = op;
            op.range < mo.height
                || op.top - mo.pos.z < mo.height
                || op.bottom - mo.pos.z > STEPSIZE
                || (self.use_3d_clipping() && mo.pos.z < op.bottom && {
                    // stepping up onto the ledge would put it inside a thing
                    let mut raised = *mo;
                    raised.pos.z = op.bottom;
                    self.mobj_z_blocker(e, &raised).is_some()
                })
        };
        if !blocks {
            return true;
        }
        if best.is_none_or(|(frac, _)| ic.frac < frac) {
            *best = Some((ic.frac, ic.line));
        }
        false
    }

    /// Turn the remaining move `tm` along `line`. On ice a hard enough
    /// hit bounces off instead.
    fn hit_slide_line(
        &mut self,
        hooks: &mut dyn PlayHooks,
        e: Entity,
        mo: &Mobj,
        line: LinedefId,
        tm: &mut Vec2,
    ) {
        let icy = if self.compat.mbf_rules() {
            approx_distance(tm.x, tm.y) > ICE_BOUNCE_SPEED
                && self.compat.variable_friction
                && mo.pos.z <= mo.floorz
                && self.get_friction(e).0 > ORIG_FRICTION
        } else {
            !self.compat.compatibility
                && self.compat.variable_friction
                && mo.player.is_some()
                && mo.pos.z <= mo.floorz
                && mo.friction > ORIG_FRICTION
        };
        let mut oof = |sim: &mut MapSim| {
            if mo.player.is_some() && mo.health > 0 {
                sim.reentrant(|sim| hooks.start_sound(sim, e, Sound::Oof));
            }
        };

        let ld = &self.level.linedefs[line as usize];
        let (slope, delta) = (ld.slope, ld.delta);
        let side = self.level.point_on_line_side(mo.xy(), ld);
        match slope {
            SlopeType::Horizontal => {
                if icy && tm.y.abs() > tm.x.abs() {
                    oof(self);
                    tm.x /= 2.0;
                    tm.y = -tm.y / 2.0;
                } else {
                    tm.y = 0.0;
                }
            }
            SlopeType::Vertical => {
                if icy && tm.x.abs() > tm.y.abs() {
                    oof(self);
                    tm.x = -tm.x / 2.0;
                    tm.y /= 2.0;
                } else {
                    tm.x = 0.0;
                }
            }
            SlopeType::Positive | SlopeType::Negative => {
                let mut lineangle = point_to_angle(delta);
                if side == 1 {
                    lineangle = lineangle.wrapping_add(ANG180);
                }
                let mut moveangle = point_to_angle(*tm);
                if !self.compat.demo_compatibility {
                    // round-off nudge so a head-on hit picks a side
                    moveangle = moveangle.wrapping_add(10);
                }
                let mut deltaangle = moveangle.wrapping_sub(lineangle);
                let movelen = approx_distance(tm.x, tm.y);

                if icy && deltaangle > ANG45 && deltaangle < ANG90 + ANG45 {
                    oof(self);
                    let bounce = bam_to_radians(lineangle.wrapping_sub(deltaangle));
                    *tm = Vec2::new(bounce.cos(), bounce.sin()) * (movelen / 2.0);
                } else {
                    if deltaangle > ANG180 {
                        deltaangle = deltaangle.wrapping_add(ANG180);
                    }
                    let newlen = movelen * bam_to_radians(deltaangle).cos();
                    let along = bam_to_radians(lineangle);
                    *tm = Vec2::new(along.cos(), along.sin()) * newlen;
                }
            }
        }
    }
}
