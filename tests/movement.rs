mod common;

use anyhow::Result;
use glam::{Vec2, Vec3};
use hecs::Entity;
use yadoom_clip::defs::{MobjFlags, MobjFlags3, MobjIntFlags, MobjKind};
use yadoom_clip::sim::{CompatConfig, DamageKind, MapSim, Mobj, TicRunner};
use yadoom_clip::world::{LevelBuilder, LinedefFlags};

use common::{Call, Recorder, flat_room, imp, init_logging, medikit, two_rooms};

#[test]
fn open_floor_move_commits() -> Result<()> {
    init_logging();
    let mut sim = flat_room(CompatConfig::default());
    let mut hooks = Recorder::default();
    let e = sim.spawn_thing(Mobj::player(Vec3::new(100.0, 100.0, 0.0)));

    assert!(sim.try_move(&mut hooks, e, 120.0, 90.0, 0));

    let mo = sim.mobj(e).ok_or_else(|| anyhow::anyhow!("player gone"))?;
    assert_eq!(mo.xy(), Vec2::new(120.0, 90.0));
    assert_eq!((mo.floorz, mo.ceilingz, mo.dropoffz), (0.0, 128.0, 0.0));
    assert!(hooks.calls.is_empty());
    Ok(())
}

#[test]
fn wall_blocks_and_leaves_the_thing_alone() {
    for compat in [CompatConfig::vanilla(), CompatConfig::eternity()] {
        let mut sim = flat_room(compat);
        let mut hooks = Recorder::default();
        let e = sim.spawn_thing(imp(Vec3::new(480.0, 256.0, 0.0)));
        let before = sim.mobj(e).expect("spawned");

        assert!(!sim.try_move(&mut hooks, e, 500.0, 256.0, 0));
        assert!(!sim.check_position(&mut hooks, e, 500.0, 256.0));

        let after = sim.mobj(e).expect("still there");
        assert_eq!(after.pos, before.pos);
        assert_eq!(
            (after.floorz, after.ceilingz, after.dropoffz),
            (before.floorz, before.ceilingz, before.dropoffz)
        );
        assert!(sim.clip().blockline.is_some());
    }
}

#[test]
fn step_height_limit_is_24() {
    for (step, ok) in [(24.0, true), (25.0, false)] {
        let (mut sim, _, east, _) = two_rooms((0.0, 128.0), (step, 128.0), CompatConfig::default());
        let mut hooks = Recorder::default();
        let e = sim.spawn_thing(imp(Vec3::new(230.0, 128.0, 0.0)));

        assert_eq!(sim.try_move(&mut hooks, e, 250.0, 128.0, 0), ok, "step {step}");
        if ok {
            let mo = sim.mobj(e).expect("alive");
            assert_eq!(mo.floorz, step);
            assert_eq!(sim.level.sectors[east as usize].floor_h, step);
        }
    }
}

#[test]
fn low_ceiling_does_not_fit() {
    let (mut sim, ..) = two_rooms((0.0, 128.0), (0.0, 40.0), CompatConfig::default());
    let mut hooks = Recorder::default();
    let e = sim.spawn_thing(imp(Vec3::new(230.0, 128.0, 0.0)));
    assert!(!sim.try_move(&mut hooks, e, 250.0, 128.0, 0));
    assert!(!sim.clip().floatok);
}

/// Monster on a 64-high shelf (west) stepping towards the pit (east).
fn shelf_walk(compat: CompatConfig, dropoff: u8) -> bool {
    let (mut sim, ..) = two_rooms((64.0, 192.0), (0.0, 192.0), compat);
    let mut hooks = Recorder::default();
    let e = sim.spawn_thing(imp(Vec3::new(226.0, 128.0, 64.0)));
    sim.try_move(&mut hooks, e, 246.0, 128.0, dropoff)
}

#[test]
fn dropoff_rules_follow_the_demo_version() {
    for compat in [
        CompatConfig::vanilla(),
        CompatConfig::boom(),
        CompatConfig::mbf(),
        CompatConfig::eternity(),
    ] {
        assert!(!shelf_walk(compat, 0), "{:?} walks off a ledge", compat.dropoff_policy());
    }

    // an allowed drop is honoured from BOOM on
    assert!(!shelf_walk(CompatConfig::vanilla(), 1));
    assert!(shelf_walk(CompatConfig::boom(), 1));
    assert!(shelf_walk(CompatConfig::mbf(), 1));
    assert!(shelf_walk(CompatConfig::eternity(), 1));

    // comp_dropoff restores the old rule under MBF
    let strict = CompatConfig {
        comp_dropoff: true,
        ..CompatConfig::mbf()
    };
    assert!(!shelf_walk(strict, 1));
}

#[test]
fn dropoff_flag_lets_things_step_off() {
    let (mut sim, ..) = two_rooms((64.0, 192.0), (0.0, 192.0), CompatConfig::vanilla());
    let mut hooks = Recorder::default();
    let mut m = imp(Vec3::new(226.0, 128.0, 64.0));
    m.flags.insert(MobjFlags::DROPOFF);
    let e = sim.spawn_thing(m);
    assert!(sim.try_move(&mut hooks, e, 246.0, 128.0, 0));
    assert_eq!(sim.mobj(e).map(|m| m.dropoffz), Some(0.0));
}

#[test]
fn crossing_a_special_line_notifies_once() {
    let mut b = LevelBuilder::new("trigger");
    let w = b.sector(0.0, 128.0);
    let e_ = b.sector(0.0, 128.0);
    let v: Vec<_> = [(0., 0.), (0., 256.), (256., 256.), (256., 0.), (512., 256.), (512., 0.)]
        .iter()
        .map(|&(x, y)| b.vertex(x, y))
        .collect();
    b.line(v[0], v[1], w, None);
    b.line(v[1], v[2], w, None);
    let trigger = b.line(v[2], v[3], w, Some(e_));
    b.set_special(trigger, 88, 1);
    b.line(v[3], v[0], w, None);
    b.line(v[2], v[4], e_, None);
    b.line(v[4], v[5], e_, None);
    b.line(v[5], v[3], e_, None);
    let mut sim = MapSim::new(b.build().expect("trigger level"), CompatConfig::default());
    let mut hooks = Recorder::default();
    let e = sim.spawn_thing(Mobj::player(Vec3::new(240.0, 128.0, 0.0)));

    // still on the front side: touched but not crossed
    assert!(sim.try_move(&mut hooks, e, 250.0, 128.0, 0));
    assert!(hooks.crossings().is_empty());

    assert!(sim.try_move(&mut hooks, e, 262.0, 128.0, 0));
    assert_eq!(hooks.crossings(), vec![(trigger, 0)]);

    assert!(sim.try_move(&mut hooks, e, 250.0, 128.0, 0));
    assert_eq!(hooks.crossings(), vec![(trigger, 0), (trigger, 1)]);
}

#[test]
fn pickups_are_touched_and_do_not_block() {
    let mut sim = flat_room(CompatConfig::default());
    let mut hooks = Recorder::default();
    let player = sim.spawn_thing(Mobj::player(Vec3::new(100.0, 100.0, 0.0)));
    let kit = sim.spawn_thing(medikit(Vec3::new(130.0, 100.0, 0.0)));

    assert!(sim.try_move(&mut hooks, player, 115.0, 100.0, 0));
    assert_eq!(
        hooks.calls,
        vec![Call::Touch {
            special: kit,
            toucher: player
        }]
    );
    assert!(sim.mobj(kit).is_none());
}

#[test]
fn nested_move_keeps_the_outer_result() {
    // the pickup handler shoves a monster up onto the east platform
    let (mut sim, ..) = two_rooms((0.0, 128.0), (16.0, 128.0), CompatConfig::default());
    let monster = sim.spawn_thing(imp(Vec3::new(380.0, 128.0, 16.0)));
    let player = sim.spawn_thing(Mobj::player(Vec3::new(64.0, 128.0, 0.0)));
    sim.spawn_thing(medikit(Vec3::new(100.0, 128.0, 0.0)));

    let mut hooks = Recorder {
        on_touch: Some(Box::new(move |sim: &mut MapSim, special: Entity, _toucher: Entity| {
            let mut inner = Recorder::default();
            assert!(sim.try_move(&mut inner, monster, 400.0, 128.0, 0));
            assert_eq!(sim.clip().floorz, 16.0);
            sim.remove_thing(special);
        })),
        ..Recorder::default()
    };

    let depth = sim.clip_depth();
    assert!(sim.try_move(&mut hooks, player, 80.0, 128.0, 0));
    assert_eq!(sim.clip_depth(), depth);

    assert_eq!(sim.clip().floorz, 0.0);
    assert_eq!(sim.mobj(player).map(|m| m.floorz), Some(0.0));
    assert_eq!(sim.mobj(monster).map(|m| (m.pos.x, m.floorz)), Some((400.0, 16.0)));
}

#[test]
fn slide_always_terminates() {
    let mut sim = flat_room(CompatConfig::default());
    let mut hooks = Recorder::default();
    for (at, mom) in [
        (Vec2::new(40.0, 40.0), Vec2::new(-300.0, -250.0)),
        (Vec2::new(470.0, 256.0), Vec2::new(500.0, 1.0)),
        (Vec2::new(256.0, 470.0), Vec2::new(0.0, 1000.0)),
        (Vec2::new(256.0, 256.0), Vec2::new(1.0e-3, -1.0e-3)),
    ] {
        let mut mo = Mobj::player(at.extend(0.0));
        mo.mom = mom.extend(0.0);
        let e = sim.spawn_thing(mo);
        sim.slide_move(&mut hooks, e);
        let mo = sim.mobj(e).expect("alive");
        assert!(
            (16.0..=496.0).contains(&mo.pos.x) && (16.0..=496.0).contains(&mo.pos.y),
            "left the room: {}",
            mo.pos
        );
        sim.remove_thing(e);
    }
}

#[test]
fn stacked_things_under_3d_clipping() {
    let mut sim = flat_room(CompatConfig::eternity());
    let mut hooks = Recorder::default();
    let low = sim.spawn_thing(imp(Vec3::new(200.0, 200.0, 0.0)));
    let mut flier = imp(Vec3::new(260.0, 200.0, 64.0));
    flier.flags3.insert(MobjFlags3::PASSMOBJ);
    let high = sim.spawn_thing(flier);

    // the high monster passes over the low one
    assert!(sim.try_move(&mut hooks, high, 210.0, 200.0, 0));
    assert!(sim.test_mobj_z(high));

    // a third at floor level still bumps into the low one
    let third = sim.spawn_thing(imp(Vec3::new(300.0, 300.0, 0.0)));
    assert!(!sim.check_position(&mut hooks, third, 165.0, 200.0));
    assert_eq!(sim.clip().blocking_mobj, Some(low));

    // 2D rules: infinitely tall things always collide
    let mut flat = flat_room(CompatConfig::vanilla());
    let low = flat.spawn_thing(imp(Vec3::new(200.0, 200.0, 0.0)));
    let high = flat.spawn_thing(imp(Vec3::new(260.0, 200.0, 64.0)));
    assert!(!flat.try_move(&mut hooks, high, 210.0, 200.0, 0));
    assert_eq!(flat.clip().blocking_mobj, Some(low));
}

#[test]
fn passing_over_a_low_item_collects_it() {
    let mut sim = flat_room(CompatConfig::eternity());
    let mut hooks = Recorder::default();
    let mut mo = Mobj::player(Vec3::new(100.0, 100.0, 8.0));
    mo.flags3.insert(MobjFlags3::PASSMOBJ);
    let player = sim.spawn_thing(mo);
    let mut low = medikit(Vec3::new(130.0, 100.0, 0.0));
    low.height = 8.0;
    let kit = sim.spawn_thing(low);

    assert!(sim.check_position(&mut hooks, player, 115.0, 100.0));
    assert_eq!(
        hooks.calls,
        vec![Call::Touch {
            special: kit,
            toucher: player
        }]
    );
    assert!(sim.mobj(kit).is_none());
}

#[test]
fn items_out_of_reach_below_are_left_alone() {
    let mut sim = flat_room(CompatConfig::eternity());
    let mut hooks = Recorder::default();
    let mut mo = Mobj::player(Vec3::new(100.0, 100.0, 24.0));
    mo.flags3.insert(MobjFlags3::PASSMOBJ);
    let player = sim.spawn_thing(mo);
    // pickups reach 8 units above an item's base
    let tall = sim.spawn_thing(medikit(Vec3::new(130.0, 100.0, 0.0)));
    let mut low = medikit(Vec3::new(100.0, 130.0, 0.0));
    low.height = 8.0;
    let low = sim.spawn_thing(low);

    assert!(sim.check_position(&mut hooks, player, 115.0, 115.0));
    assert!(hooks.calls.is_empty());
    assert!(sim.mobj(tall).is_some() && sim.mobj(low).is_some());
}

fn edit(sim: &mut MapSim, e: Entity, f: impl FnOnce(&mut Mobj)) {
    if let Some(mut m) = sim.mobj_mut(e) {
        f(&mut *m);
    }
}

/// An armed mine 16 units tall.
fn mine(at: Vec3) -> Mobj {
    let mut m = Mobj::new(
        MobjKind(2035),
        at,
        16.0,
        16.0,
        MobjFlags::SOLID | MobjFlags::SHOOTABLE | MobjFlags::TOUCHY,
    );
    m.intflags.insert(MobjIntFlags::ARMED);
    m.health = 20;
    m
}

#[test]
fn touchy_thing_goes_off_when_landed_on_exactly() {
    let mut sim = flat_room(CompatConfig::eternity());
    let mut hooks = Recorder::default();
    let boom = sim.spawn_thing(mine(Vec3::new(130.0, 100.0, 0.0)));
    let mut mo = Mobj::player(Vec3::new(100.0, 100.0, 16.0));
    mo.flags3.insert(MobjFlags3::PASSMOBJ);
    let player = sim.spawn_thing(mo);

    assert!(sim.check_position(&mut hooks, player, 115.0, 100.0));
    assert_eq!(hooks.damage(), vec![(boom, 20, DamageKind::Unknown)]);
    // kicked up so it can run across
    assert_eq!(sim.mobj(player).map(|m| m.mom.z), Some(1.0));

    // a little higher it just passes over
    let mut hooks = Recorder::default();
    edit(&mut sim, player, |m| {
        m.pos.z = 17.0;
        m.mom.z = 0.0;
    });
    assert!(sim.check_position(&mut hooks, player, 115.0, 100.0));
    assert!(hooks.damage().is_empty());
    assert_eq!(sim.mobj(player).map(|m| m.mom.z), Some(0.0));
}

/// A solid crate of the given height.
fn crate_box(at: Vec3, height: f32) -> Mobj {
    Mobj::new(MobjKind(2000), at, 16.0, height, MobjFlags::SOLID)
}

#[test]
fn players_step_up_onto_low_things() {
    for (height, passmobj, ok) in [(16.0, true, true), (40.0, true, false), (16.0, false, false)] {
        let mut sim = flat_room(CompatConfig::eternity());
        let mut hooks = Recorder::default();
        let block = sim.spawn_thing(crate_box(Vec3::new(140.0, 100.0, 0.0), height));
        let mut mo = Mobj::player(Vec3::new(100.0, 100.0, 0.0));
        if passmobj {
            mo.flags3.insert(MobjFlags3::PASSMOBJ);
        }
        let player = sim.spawn_thing(mo);

        assert_eq!(
            sim.try_move(&mut hooks, player, 115.0, 100.0, 0),
            ok,
            "height {height}, passmobj {passmobj}"
        );
        let mo = sim.mobj(player).expect("player");
        assert_eq!(mo.pos.x, if ok { 115.0 } else { 100.0 });
        assert_eq!(mo.pos.z, 0.0);
        if !ok {
            assert_eq!(sim.clip().blocking_mobj, Some(block));
        }
    }
}

#[test]
fn thing_under_follows_one_tick_of_falling() {
    let mut sim = flat_room(CompatConfig::eternity());
    let low = sim.spawn_thing(imp(Vec3::new(200.0, 200.0, 0.0)));
    let e = sim.spawn_thing(imp(Vec3::new(210.0, 200.0, 60.0)));

    // hovering clear of the head below
    assert_eq!(sim.get_thing_under(e), None);

    // falling 8 units lands it inside the other's head
    edit(&mut sim, e, |m| m.mom.z = -8.0);
    assert_eq!(sim.get_thing_under(e), Some(low));
    // the test moves nothing
    assert_eq!(sim.mobj(e).map(|m| m.pos.z), Some(60.0));

    // rising away never finds it
    edit(&mut sim, e, |m| m.mom.z = 8.0);
    assert_eq!(sim.get_thing_under(e), None);
}

#[test]
fn corpses_stop_blocking_from_demo_402() {
    for (version, clear) in [(401, false), (402, true)] {
        let compat = CompatConfig {
            demo_version: version,
            ..CompatConfig::eternity()
        };
        let mut sim = flat_room(compat);
        let mut body = imp(Vec3::new(200.0, 200.0, 0.0));
        body.flags.insert(MobjFlags::CORPSE);
        sim.spawn_thing(body);
        let e = sim.spawn_thing(Mobj::player(Vec3::new(210.0, 200.0, 0.0)));
        assert_eq!(sim.test_mobj_z(e), clear, "demo {version}");
    }
}

#[test]
fn wall_block_does_not_report_a_passed_thing() {
    let mut sim = flat_room(CompatConfig::vanilla());
    let mut hooks = Recorder::default();
    let e = sim.spawn_thing(imp(Vec3::new(470.0, 256.0, 0.0)));
    let kit = sim.spawn_thing(medikit(Vec3::new(490.0, 256.0, 0.0)));

    assert!(!sim.check_position(&mut hooks, e, 500.0, 256.0));
    assert!(sim.clip().blockline.is_some());
    assert_eq!(sim.clip().blocking_mobj, None);
    // monsters do not pick things up
    assert!(sim.mobj(kit).is_some());
}

#[test]
fn monster_blocking_lines() {
    let cases = [
        (MobjFlags::empty(), MobjFlags3::empty(), false),
        (MobjFlags::FRIEND, MobjFlags3::empty(), true),
        (MobjFlags::empty(), MobjFlags3::MONSTERPASS, true),
    ];
    for (flags, flags3, ok) in cases {
        let (mut sim, _, _, shared) = two_rooms((0.0, 128.0), (0.0, 128.0), CompatConfig::default());
        sim.level.linedefs[shared as usize]
            .flags
            .insert(LinedefFlags::BLOCK_MONSTERS);
        let mut hooks = Recorder::default();
        let mut m = imp(Vec3::new(230.0, 128.0, 0.0));
        m.flags.insert(flags);
        m.flags3.insert(flags3);
        let e = sim.spawn_thing(m);
        assert_eq!(sim.try_move(&mut hooks, e, 250.0, 128.0, 0), ok, "{flags:?} {flags3:?}");
    }
}

fn crowd() -> TicRunner {
    let mut runner = TicRunner::new(flat_room(CompatConfig::default()));
    let sim = runner.sim_mut();
    for i in 0..6 {
        let f = i as f32;
        let mut mo = if i % 2 == 0 {
            Mobj::player(Vec3::new(60.0 + 70.0 * f, 100.0, 0.0))
        } else {
            imp(Vec3::new(60.0 + 70.0 * f, 300.0, 0.0))
        };
        mo.mom = Vec3::new(12.0 - 4.0 * f, 25.0 - 9.0 * f, 0.0);
        sim.spawn_thing(mo);
    }
    runner
}

#[test]
fn same_input_same_world() {
    let (mut a, mut b) = (crowd(), crowd());
    let (mut ha, mut hb) = (Recorder::default(), Recorder::default());
    for _ in 0..70 {
        a.tick(&mut ha);
        b.tick(&mut hb);
    }
    assert_eq!(ha.calls, hb.calls);

    let snapshot = |r: &TicRunner| {
        let mut all: Vec<_> = r
            .sim()
            .world
            .query::<&Mobj>()
            .iter()
            .map(|(e, m)| (e.id(), m.pos, m.mom, m.floorz))
            .collect();
        all.sort_by_key(|t| t.0);
        all
    };
    assert_eq!(snapshot(&a), snapshot(&b));
    assert_eq!(a.sim().leveltime, 70);

    // everything stayed inside the room
    for (_, pos, ..) in snapshot(&a) {
        assert!((0.0..=512.0).contains(&pos.x) && (0.0..=512.0).contains(&pos.y));
    }
}

#[test]
fn spawn_sight_line_stops_at_walls() {
    let (mut sim, ..) = two_rooms((0.0, 128.0), (0.0, 128.0), CompatConfig::default());
    let pain = sim.spawn_thing(imp(Vec3::new(200.0, 128.0, 0.0)));
    assert!(!sim.check_sides(pain, 300.0, 128.0));
    assert!(sim.check_sides(pain, 600.0, 128.0));
}

#[test]
fn extended_check_tests_height_without_side_effects() {
    let mut sim = flat_room(CompatConfig::eternity());
    let mut hooks = Recorder::default();
    let player = sim.spawn_thing(Mobj::player(Vec3::new(100.0, 100.0, 0.0)));
    let kit = sim.spawn_thing(medikit(Vec3::new(300.0, 300.0, 0.0)));

    assert!(sim.check_position_ext(&mut hooks, player, 300.0, 300.0, 0.0));
    assert!(!sim.check_position_ext(&mut hooks, player, 300.0, 300.0, 100.0));
    assert!(hooks.calls.is_empty());
    assert!(sim.mobj(kit).is_some());
    assert!(sim.mobj(player).is_some_and(|m| m.flags.contains(MobjFlags::PICKUP)));
}
