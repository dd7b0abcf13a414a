//! Discontinuous moves: teleporters, boss spawns and portal crossings.
//!
//! No path is tested. The destination's heights are seeded from the
//! sector there, anything in the way is stomped (or blocks), and the
//! thing is relinked unconditionally.

use hecs::Entity;
use log::trace;

use super::hooks::DamageKind;
use super::{MapSim, Mobj, PlayHooks};
use crate::defs::{MobjFlags, MobjFlags3};
use crate::world::MAXRADIUS;

/// Damage that gets through god mode.
pub const GOD_BREACH_DAMAGE: i32 = 10000;

/// How occupants of the destination are treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stomp {
    /// Classic: kill shootable occupants when telefrag applies,
    /// optionally ignore inert ones.
    Flat { telefrag: bool, ignore_inerts: bool },
    /// Portal crossings: only occupants overlapping in z are hit.
    Vertical,
}

impl MapSim {
    /// Teleport `e` to `(x, y)`. Inert things at the destination are
    /// ignored; shootable ones are telefragged when the mover is a
    /// stomper, a boss on any map, or anyone on MAP30 under old rules.
    pub fn teleport_move(&mut self, hooks: &mut dyn PlayHooks, e: Entity, x: f32, y: f32, boss: bool) -> bool {
        let Some(mo) = self.mobj(e) else {
            return false;
        };
        let telefrag = self.telefrag_allowed(&mo, boss);
        self.teleport_with(hooks, e, &mo, x, y, Stomp::Flat { telefrag, ignore_inerts: true })
    }

    /// Like [`teleport_move`](Self::teleport_move) but any thing at the
    /// destination, shootable or not, counts as an occupant.
    pub fn teleport_move_strict(
        &mut self,
        hooks: &mut dyn PlayHooks,
        e: Entity,
        x: f32,
        y: f32,
        boss: bool,
    ) -> bool {
        let Some(mo) = self.mobj(e) else {
            return false;
        };
        let telefrag = self.telefrag_allowed(&mo, boss);
        self.teleport_with(hooks, e, &mo, x, y, Stomp::Flat { telefrag, ignore_inerts: false })
    }

    /// Teleport used when passing through a linked portal. Only things
    /// the mover actually lands in are stomped; the move never fails on
    /// an occupant.
    pub fn portal_teleport_move(&mut self, hooks: &mut dyn PlayHooks, e: Entity, x: f32, y: f32) -> bool {
        let Some(mo) = self.mobj(e) else {
            return false;
        };
        self.teleport_with(hooks, e, &mo, x, y, Stomp::Vertical)
    }

    fn telefrag_allowed(&self, mo: &Mobj, boss: bool) -> bool {
        if mo.flags3.contains(MobjFlags3::TELESTOMP) {
            return true;
        }
        if !self.compat.comp_telefrag && self.compat.mbf_rules() {
            boss
        } else {
            self.gamemap == 30
        }
    }

    fn teleport_with(
        &mut self,
        hooks: &mut dyn PlayHooks,
        e: Entity,
        mo: &Mobj,
        x: f32,
        y: f32,
        stomp: Stomp,
    ) -> bool {
        self.begin_clip(e, mo, x, y);
        self.validcount.bump();

        let bbox = self.clip.current().bbox;
        let (xl, xh, yl, yh) = self.things.block_range(&bbox, MAXRADIUS);
        for bx in xl..=xh {
            for by in yl..=yh {
                for other in self.cell_things(bx, by) {
                    if !self.world.contains(other) {
                        continue;
                    }
                    let ok = match stomp {
                        Stomp::Flat { telefrag, ignore_inerts } => {
                            self.pit_stomp_thing(hooks, e, other, telefrag, ignore_inerts)
                        }
                        Stomp::Vertical => self.pit_stomp_thing_3d(hooks, e, other),
                    };
                    if !ok {
                        trace!("teleport of {e:?} blocked by {other:?}");
                        return false;
                    }
                }
            }
        }

        // a stomped occupant may have taken the mover with it
        if !self.world.contains(e) {
            return false;
        }

        self.unset_thing_position(e);
        self.copy_clip_heights(e);
        self.with_mobj(e, |m| {
            m.pos.x = x;
            m.pos.y = y;
        });
        self.set_thing_position(e);
        true
    }

    /// `other` overlaps the destination box in x and y.
    fn stomp_contact(&self, e: Entity, other: Entity) -> Option<(Mobj, Mobj)> {
        if other == e {
            return None;
        }
        let mo = self.mobj(e)?;
        let th = self.mobj(other)?;
        let c = self.clip.current();
        let blockdist = th.radius + mo.radius;
        if (th.pos.x - c.x).abs() >= blockdist || (th.pos.y - c.y).abs() >= blockdist {
            return None;
        }
        Some((mo, th))
    }

    fn pit_stomp_thing(
        &mut self,
        hooks: &mut dyn PlayHooks,
        e: Entity,
        other: Entity,
        telefrag: bool,
        ignore_inerts: bool,
    ) -> bool {
        let Some(th) = self.mobj(other) else {
            return true;
        };
        if !th.flags.contains(MobjFlags::SHOOTABLE) && ignore_inerts {
            return true;
        }
        if self.stomp_contact(e, other).is_none() {
            return true;
        }
        // monsters don't stomp things except on boss level
        if !telefrag {
            return false;
        }
        self.reentrant(|sim| {
            hooks.damage_thing(sim, other, Some(e), Some(e), GOD_BREACH_DAMAGE, DamageKind::Telefrag)
        });
        true
    }

    fn pit_stomp_thing_3d(&mut self, hooks: &mut dyn PlayHooks, e: Entity, other: Entity) -> bool {
        let Some(th) = self.mobj(other) else {
            return true;
        };
        if !th.flags.contains(MobjFlags::SHOOTABLE) {
            return true;
        }
        let Some((mo, th)) = self.stomp_contact(e, other) else {
            return true;
        };
        if mo.pos.z >= th.top() || th.pos.z >= mo.top() {
            return true;
        }

        let mut frag = |sim: &mut MapSim, victim: Entity, killer: Entity| {
            sim.reentrant(|sim| {
                hooks.damage_thing(
                    sim,
                    victim,
                    Some(killer),
                    Some(killer),
                    GOD_BREACH_DAMAGE,
                    DamageKind::Telefrag,
                )
            });
        };
        if mo.player.is_some() {
            frag(self, other, e);
            // both players die
            if th.player.is_some() {
                frag(self, e, other);
            }
        } else if th.player.is_some() {
            frag(self, e, other);
        }
        true
    }
}
