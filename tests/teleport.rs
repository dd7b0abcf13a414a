mod common;

use glam::Vec3;
use yadoom_clip::sim::{CompatConfig, DamageKind, GOD_BREACH_DAMAGE, Mobj};

use common::{Recorder, flat_room, imp, init_logging};

#[test]
fn player_telefrags_whatever_is_there() {
    init_logging();
    let mut sim = flat_room(CompatConfig::vanilla());
    let mut hooks = Recorder::default();
    let player = sim.spawn_thing(Mobj::player(Vec3::new(100.0, 100.0, 0.0)));
    let victim = sim.spawn_thing(imp(Vec3::new(300.0, 300.0, 0.0)));

    assert!(sim.teleport_move(&mut hooks, player, 300.0, 300.0, false));

    assert_eq!(hooks.damage(), vec![(victim, GOD_BREACH_DAMAGE, DamageKind::Telefrag)]);
    let mo = sim.mobj(player).expect("player");
    assert_eq!((mo.pos.x, mo.pos.y), (300.0, 300.0));
    assert_eq!((mo.floorz, mo.ceilingz), (0.0, 128.0));
}

#[test]
fn monsters_only_telefrag_on_map30_under_old_rules() {
    for (map, allowed) in [(1, false), (30, true)] {
        let mut sim = flat_room(CompatConfig::vanilla());
        sim.gamemap = map;
        let mut hooks = Recorder::default();
        let mover = sim.spawn_thing(imp(Vec3::new(100.0, 100.0, 0.0)));
        sim.spawn_thing(imp(Vec3::new(300.0, 300.0, 0.0)));

        assert_eq!(sim.teleport_move(&mut hooks, mover, 300.0, 300.0, false), allowed, "MAP{map:02}");
        assert_eq!(hooks.damage().len(), allowed as usize);

        let x = sim.mobj(mover).map(|m| m.pos.x);
        assert_eq!(x, Some(if allowed { 300.0 } else { 100.0 }));
    }
}

#[test]
fn mbf_lets_bosses_telefrag_anywhere() {
    for boss in [false, true] {
        let mut sim = flat_room(CompatConfig::mbf());
        sim.gamemap = 30;
        let mut hooks = Recorder::default();
        let mover = sim.spawn_thing(imp(Vec3::new(100.0, 100.0, 0.0)));
        sim.spawn_thing(imp(Vec3::new(300.0, 300.0, 0.0)));
        assert_eq!(sim.teleport_move(&mut hooks, mover, 300.0, 300.0, boss), boss);
    }
}

#[test]
fn inert_things_are_ignored_unless_strict() {
    let mut sim = flat_room(CompatConfig::vanilla());
    let mut hooks = Recorder::default();
    let mover = sim.spawn_thing(imp(Vec3::new(100.0, 100.0, 0.0)));
    let mut pillar = imp(Vec3::new(300.0, 300.0, 0.0));
    pillar.flags.remove(yadoom_clip::defs::MobjFlags::SHOOTABLE);
    sim.spawn_thing(pillar);

    assert!(!sim.teleport_move_strict(&mut hooks, mover, 300.0, 300.0, false));
    assert!(sim.teleport_move(&mut hooks, mover, 300.0, 300.0, false));
    assert!(hooks.damage().is_empty());
}
