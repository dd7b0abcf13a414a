use glam::Vec2;
use hecs::Entity;
use log::trace;
use std::time::{Duration, Instant};

use super::{MapSim, Mobj, PlayHooks};
use crate::defs::MobjFlags;

pub const SIM_FPS: u32 = 35;
const TIC: Duration = Duration::from_micros(1_000_000 / SIM_FPS as u64);

/* ----------------------------------------------------------------- */
/*  Physics constants (f32 map-units)                                */
/* ----------------------------------------------------------------- */
const MAX_MOVE: f32 = 30.0; // vanilla 30*FRACUNIT
const STOP_SPEED: f32 = 1.0 / 16.0; // vanilla 0x1000
const FRACUNIT: f32 = 65536.0;

/// Owns the map simulation and advances it one fixed-rate tic at a time.
pub struct TicRunner {
    sim: MapSim,
    last: Instant,
}

impl TicRunner {
    pub fn new(sim: MapSim) -> Self {
        Self {
            sim,
            last: Instant::now(),
        }
    }

    #[inline]
    pub fn sim(&self) -> &MapSim {
        &self.sim
    }

    #[inline]
    pub fn sim_mut(&mut self) -> &mut MapSim {
        &mut self.sim
    }

    pub fn into_sim(self) -> MapSim {
        self.sim
    }

    /// Advance enough tics to synchronise simulation with real time.
    pub fn pump(&mut self, hooks: &mut dyn PlayHooks) {
        while self.last.elapsed() >= TIC {
            self.tick(hooks);
            self.last += TIC;
        }
    }

    /// Run one tic: level time, portal bookkeeping, then every moving
    /// thing's horizontal step.
    pub fn tick(&mut self, hooks: &mut dyn PlayHooks) {
        let sim = &mut self.sim;
        sim.leveltime = sim.leveltime.wrapping_add(1);
        for portal in &mut sim.level.portals {
            portal.tainted = 0;
        }

        // spawn order; things removed mid-tic are skipped
        let mut movers: Vec<Entity> = sim
            .world
            .query_mut::<&Mobj>()
            .into_iter()
            .filter(|(_, m)| m.mom.x != 0.0 || m.mom.y != 0.0)
            .map(|(e, _)| e)
            .collect();
        movers.sort_by_key(|e| e.id());
        for e in movers {
            sim.xy_movement(hooks, e);
        }
    }
}

impl MapSim {
    /// One tic of horizontal momentum for `e`: split into steps no
    /// longer than half the move cap, slide or stop on a block, then
    /// ground friction.
    fn xy_movement(&mut self, hooks: &mut dyn PlayHooks, e: Entity) {
        let Some(mo) = self.mobj(e) else {
            return;
        };
        let is_player = mo.player.is_some();
        let mom = mo.mom.truncate().clamp(Vec2::splat(-MAX_MOVE), Vec2::splat(MAX_MOVE));
        self.with_mobj(e, |m| {
            m.mom.x = mom.x;
            m.mom.y = mom.y;
        });

        let mut left = mom;
        while left != Vec2::ZERO {
            let Some(mo) = self.mobj(e) else {
                return;
            };
            let step = if left.x.abs() > MAX_MOVE / 2.0 || left.y.abs() > MAX_MOVE / 2.0 {
                left / 2.0
            } else {
                left
            };
            left -= step;

            let dest = mo.xy() + step;
            if self.try_move(hooks, e, dest.x, dest.y, 0) {
                continue;
            }
            if is_player {
                self.slide_move(hooks, e);
            } else {
                trace!("{e:?} blocked, stopping");
                self.with_mobj(e, |m| {
                    m.mom.x = 0.0;
                    m.mom.y = 0.0;
                });
            }
            break;
        }

        let Some(mo) = self.mobj(e) else {
            return;
        };
        if mo.flags.intersects(MobjFlags::MISSILE | MobjFlags::SKULLFLY) || mo.pos.z > mo.floorz {
            return;
        }
        if mo.mom.x.abs() < STOP_SPEED && mo.mom.y.abs() < STOP_SPEED {
            self.with_mobj(e, |m| {
                m.mom.x = 0.0;
                m.mom.y = 0.0;
            });
        } else {
            let friction = self.get_friction(e).0 as f32 / FRACUNIT;
            self.with_mobj(e, |m| {
                m.mom.x *= friction;
                m.mom.y *= friction;
            });
        }
    }
}
