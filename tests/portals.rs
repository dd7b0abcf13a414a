mod common;

use glam::{Vec2, Vec3};
use yadoom_clip::defs::MobjFlags3;
use yadoom_clip::sim::{CompatConfig, MapSim, Mobj};
use yadoom_clip::world::LevelBuilder;

use common::{Recorder, imp, init_logging, square};

/// Two 256×256 rooms far apart, A at x 0..256 and B at x 1024..1280.
/// A's east wall and B's west wall are the same place in space.
fn linked_rooms(compat: CompatConfig) -> MapSim {
    let mut b = LevelBuilder::new("linked");
    let a = b.sector(0.0, 128.0);
    let room_b = b.sector(0.0, 128.0);

    let wa = b.polygon(a, &square(0.0, 0.0, 256.0));
    let wb = b.polygon(room_b, &square(1024.0, 0.0, 256.0));
    // polygon order: west, north, east, south
    let to_b = b.portal(room_b, Vec3::new(-768.0, 0.0, 0.0));
    b.line_portal(wa[2], to_b);
    let to_a = b.portal(a, Vec3::new(768.0, 0.0, 0.0));
    b.line_portal(wb[0], to_a);

    MapSim::new(b.build().expect("linked level"), compat)
}

#[test]
fn groups_and_links() {
    let sim = linked_rooms(CompatConfig::eternity());
    assert!(sim.portals.enabled());
    assert_eq!(sim.portals.group_count(), 2);

    let (ga, gb) = (sim.level.sectors[0].group_id, sim.level.sectors[1].group_id);
    assert_ne!(ga, gb);
    assert_eq!(sim.portals.get_link_offset(ga, gb), Some(Vec3::new(-768.0, 0.0, 0.0)));
    assert_eq!(sim.portals.get_link_offset(gb, ga), Some(Vec3::new(768.0, 0.0, 0.0)));
    assert_eq!(sim.portals.get_link_offset(ga, ga), None);
    assert_eq!(sim.portals.link_or_zero(ga, 7), Vec3::ZERO);
}

#[test]
fn walking_through_a_line_portal() {
    init_logging();
    let mut sim = linked_rooms(CompatConfig::eternity());
    let mut hooks = Recorder::default();
    let mut mo = Mobj::player(Vec3::new(240.0, 128.0, 0.0));
    mo.mom = Vec3::new(20.0, 0.0, 0.0);
    let e = sim.spawn_thing(mo);

    assert!(sim.try_move(&mut hooks, e, 260.0, 128.0, 0));

    let mo = sim.mobj(e).expect("player");
    assert_eq!(mo.xy(), Vec2::new(1028.0, 128.0));
    assert_eq!(mo.group_id, sim.level.sectors[1].group_id);
    assert_eq!(mo.sector, 1);
    assert_eq!(mo.mom, Vec3::new(20.0, 0.0, 0.0));
    assert_eq!(sim.level.portals[0].tainted, 1);
}

#[test]
fn the_far_side_is_stomped() {
    let mut sim = linked_rooms(CompatConfig::eternity());
    let mut hooks = Recorder::default();
    let e = sim.spawn_thing(Mobj::player(Vec3::new(240.0, 128.0, 0.0)));
    let lurker = sim.spawn_thing(imp(Vec3::new(1050.0, 128.0, 0.0)));

    assert!(sim.try_move(&mut hooks, e, 260.0, 128.0, 0));
    assert_eq!(hooks.damage().first().map(|d| d.0), Some(lurker));
}

#[test]
fn old_demos_treat_portal_lines_as_walls() {
    let mut sim = linked_rooms(CompatConfig::mbf());
    let mut hooks = Recorder::default();
    let e = sim.spawn_thing(Mobj::player(Vec3::new(240.0, 128.0, 0.0)));
    assert!(!sim.try_move(&mut hooks, e, 260.0, 128.0, 0));
    assert_eq!(sim.mobj(e).map(|m| m.pos.x), Some(240.0));
}

#[test]
fn linked_portals_keep_3d_clipping_under_comp_overunder() {
    let compat = CompatConfig {
        comp_overunder: true,
        ..CompatConfig::eternity()
    };
    let mut sim = linked_rooms(compat);
    assert!(!sim.compat.overunder());
    assert!(sim.use_3d_clipping());

    // a flier still passes over a monster on the floor
    let mut hooks = Recorder::default();
    sim.spawn_thing(imp(Vec3::new(100.0, 128.0, 0.0)));
    let mut flier = imp(Vec3::new(160.0, 128.0, 64.0));
    flier.flags3.insert(MobjFlags3::PASSMOBJ);
    let high = sim.spawn_thing(flier);
    assert!(sim.try_move(&mut hooks, high, 110.0, 128.0, 0));

    // without portals the switch turns stacking off
    let mut flat = common::flat_room(compat);
    assert!(!flat.use_3d_clipping());
    flat.spawn_thing(imp(Vec3::new(100.0, 128.0, 0.0)));
    let mut flier = imp(Vec3::new(160.0, 128.0, 64.0));
    flier.flags3.insert(MobjFlags3::PASSMOBJ);
    let high = flat.spawn_thing(flier);
    assert!(!flat.try_move(&mut hooks, high, 110.0, 128.0, 0));
}
