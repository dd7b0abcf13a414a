//! Shared fixtures: a recording collaborator and small hand-built maps.

#![allow(dead_code)]

use glam::{Vec2, Vec3};
use hecs::Entity;
use yadoom_clip::defs::{MobjFlags, MobjKind};
use yadoom_clip::sim::{
    CompatConfig, DamageKind, MapSim, Mobj, PlayHooks, RandomClass, Sound, ThingState,
};
use yadoom_clip::world::{LevelBuilder, LinedefId, SectorId};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Everything the engine asked game code to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Damage {
        target: Entity,
        source: Option<Entity>,
        amount: i32,
        kind: DamageKind,
    },
    Touch {
        special: Entity,
        toucher: Entity,
    },
    Cross {
        line: LinedefId,
        side: usize,
        thing: Entity,
    },
    Sound(Entity, Sound),
    State(Entity, ThingState),
}

/// What to do when a pickup is touched.
pub type TouchHook = Box<dyn FnMut(&mut MapSim, Entity, Entity)>;

#[derive(Default)]
pub struct Recorder {
    pub calls: Vec<Call>,
    /// Runs after the touch is recorded; removes the pickup when unset.
    pub on_touch: Option<TouchHook>,
}

impl Recorder {
    pub fn damage(&self) -> Vec<(Entity, i32, DamageKind)> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                Call::Damage {
                    target, amount, kind, ..
                } => Some((target, amount, kind)),
                _ => None,
            })
            .collect()
    }

    pub fn crossings(&self) -> Vec<(LinedefId, usize)> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                Call::Cross { line, side, .. } => Some((line, side)),
                _ => None,
            })
            .collect()
    }
}

impl PlayHooks for Recorder {
    fn damage_thing(
        &mut self,
        _sim: &mut MapSim,
        target: Entity,
        _inflictor: Option<Entity>,
        source: Option<Entity>,
        amount: i32,
        kind: DamageKind,
    ) {
        self.calls.push(Call::Damage {
            target,
            source,
            amount,
            kind,
        });
    }

    fn touch_special_thing(&mut self, sim: &mut MapSim, special: Entity, toucher: Entity) {
        self.calls.push(Call::Touch { special, toucher });
        match self.on_touch.as_mut() {
            Some(f) => f(sim, special, toucher),
            None => sim.remove_thing(special),
        }
    }

    fn cross_special_line(&mut self, _sim: &mut MapSim, line: LinedefId, side: usize, thing: Entity) {
        self.calls.push(Call::Cross { line, side, thing });
    }

    fn start_sound(&mut self, _sim: &mut MapSim, origin: Entity, sound: Sound) {
        self.calls.push(Call::Sound(origin, sound));
    }

    fn set_state(&mut self, _sim: &mut MapSim, thing: Entity, state: ThingState) {
        self.calls.push(Call::State(thing, state));
    }

    fn spawn_blood(&mut self, _sim: &mut MapSim, _at: Vec3) -> Option<Entity> {
        None
    }

    fn p_random(&mut self, _class: RandomClass) -> i32 {
        0
    }
}

/// Clockwise square with inward-facing walls.
pub fn square(x0: f32, y0: f32, size: f32) -> [Vec2; 4] {
    [
        Vec2::new(x0, y0),
        Vec2::new(x0, y0 + size),
        Vec2::new(x0 + size, y0 + size),
        Vec2::new(x0 + size, y0),
    ]
}

/// One 512×512 room, floor 0, ceiling 128.
pub fn flat_room(compat: CompatConfig) -> MapSim {
    let mut b = LevelBuilder::new("flat");
    let s = b.sector(0.0, 128.0);
    b.polygon(s, &square(0.0, 0.0, 512.0));
    MapSim::new(b.build().expect("flat level"), compat)
}

/// Two 256×256 rooms side by side (west x 0..256, east x 256..512)
/// joined by a two-sided line at x = 256. Returns the sim, both sectors
/// and the shared line.
pub fn two_rooms(
    west: (f32, f32),
    east: (f32, f32),
    compat: CompatConfig,
) -> (MapSim, SectorId, SectorId, LinedefId) {
    let mut b = LevelBuilder::new("pair");
    let w = b.sector(west.0, west.1);
    let e = b.sector(east.0, east.1);
    let v: Vec<_> = [
        (0., 0.),
        (0., 256.),
        (256., 256.),
        (256., 0.),
        (512., 256.),
        (512., 0.),
    ]
    .iter()
    .map(|&(x, y)| b.vertex(x, y))
    .collect();
    b.line(v[0], v[1], w, None);
    b.line(v[1], v[2], w, None);
    let shared = b.line(v[2], v[3], w, Some(e));
    b.line(v[3], v[0], w, None);
    b.line(v[2], v[4], e, None);
    b.line(v[4], v[5], e, None);
    b.line(v[5], v[3], e, None);
    let sim = MapSim::new(b.build().expect("pair level"), compat);
    (sim, w, e, shared)
}

/// A walking, shootable monster.
pub fn imp(at: Vec3) -> Mobj {
    let mut m = Mobj::new(
        MobjKind(11),
        at,
        20.0,
        56.0,
        MobjFlags::SOLID | MobjFlags::SHOOTABLE | MobjFlags::COUNTKILL,
    );
    m.health = 60;
    m.has_seestate = true;
    m
}

/// A non-solid pickup.
pub fn medikit(at: Vec3) -> Mobj {
    Mobj::new(MobjKind(50), at, 20.0, 16.0, MobjFlags::SPECIAL)
}
