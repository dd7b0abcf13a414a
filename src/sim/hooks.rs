//! Collaborators the clipping code calls but does not implement.
//!
//! Damage rules, pickups, line specials, sounds, state changes and the
//! random number stream all live in game code. Every method receives
//! the simulation so it may move, spawn or remove things; the engine
//! wraps each call in a fresh clip frame.

use glam::Vec3;
use hecs::Entity;

use super::MapSim;
use crate::world::LinedefId;

/// Means of death passed to the damage collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageKind {
    Unknown,
    Telefrag,
    Crush,
    /// Missile, ripper or skull slam; the inflictor's own kind.
    Projectile,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sound {
    /// Player grunts against an icy wall.
    Oof,
}

/// Animation states the engine forces directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThingState {
    Spawn,
    Gibs,
}

/// Random stream class, kept apart so demos stay in sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RandomClass {
    SkullFly,
    Damage,
    Rip,
    Crush,
}

pub trait PlayHooks {
    fn damage_thing(
        &mut self,
        sim: &mut MapSim,
        target: Entity,
        inflictor: Option<Entity>,
        source: Option<Entity>,
        amount: i32,
        kind: DamageKind,
    );

    /// `toucher` walked into the pickup `special`. May remove it.
    fn touch_special_thing(&mut self, sim: &mut MapSim, special: Entity, toucher: Entity);

    /// `thing` crossed `line` coming from `side` (0 front, 1 back).
    fn cross_special_line(&mut self, sim: &mut MapSim, line: LinedefId, side: usize, thing: Entity);

    fn start_sound(&mut self, _sim: &mut MapSim, _origin: Entity, _sound: Sound) {}

    fn set_state(&mut self, sim: &mut MapSim, thing: Entity, state: ThingState);

    fn remove_thing(&mut self, sim: &mut MapSim, thing: Entity) {
        sim.remove_thing(thing);
    }

    /// Spawn a blood splat; the engine sets its momentum.
    fn spawn_blood(&mut self, sim: &mut MapSim, at: Vec3) -> Option<Entity>;

    /// Foot clipping after a relink (deep water and the like).
    fn adjust_floor_clip(&mut self, _sim: &mut MapSim, _thing: Entity) {}

    /// Next byte, 0..=255, from the play random stream.
    fn p_random(&mut self, class: RandomClass) -> i32;

    fn p_sub_random(&mut self, class: RandomClass) -> i32 {
        let r = self.p_random(class);
        r - self.p_random(class)
    }
}
