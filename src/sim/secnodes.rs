//! Thing ↔ sector touching lists.
//!
//! * A thing is linked to every sector its square footprint overlaps,
//!   plus the sector under its centre.
//! * New links go to the **head** of both lists; links that survive a
//!   move keep their place. Sector movement and friction walk these
//!   lists, so the order is observable.

use glam::Vec2;
use hecs::Entity;
use smallvec::SmallVec;
use std::collections::HashMap;

use super::MapSim;
use crate::world::{Aabb, SectorId};

pub(crate) type SectorList = SmallVec<[SectorId; 4]>;

#[derive(Debug, Default)]
pub(crate) struct SectorLinks {
    by_sector: Vec<Vec<Entity>>,
    by_thing: HashMap<Entity, SectorList>,
}

impl SectorLinks {
    pub fn new(sectors: usize) -> Self {
        Self {
            by_sector: vec![Vec::new(); sectors],
            by_thing: HashMap::new(),
        }
    }

    /// Make `e` touch exactly `sectors`.
    pub fn link(&mut self, e: Entity, sectors: &[SectorId]) {
        let mut list = self.by_thing.remove(&e).unwrap_or_default();

        for &s in sectors {
            if list.contains(&s) {
                continue;
            }
            list.insert(0, s);
            if let Some(things) = self.by_sector.get_mut(s as usize) {
                things.insert(0, e);
            }
        }

        let by_sector = &mut self.by_sector;
        list.retain(|s| {
            let keep = sectors.contains(s);
            if !keep {
                if let Some(things) = by_sector.get_mut(*s as usize) {
                    things.retain(|&t| t != e);
                }
            }
            keep
        });

        self.by_thing.insert(e, list);
    }

    pub fn unlink(&mut self, e: Entity) {
        if let Some(list) = self.by_thing.remove(&e) {
            for s in list {
                if let Some(things) = self.by_sector.get_mut(s as usize) {
                    things.retain(|&t| t != e);
                }
            }
        }
    }

    pub fn things_in(&self, s: SectorId) -> &[Entity] {
        self.by_sector.get(s as usize).map_or(&[], |v| v.as_slice())
    }

    pub fn sectors_of(&self, e: Entity) -> &[SectorId] {
        self.by_thing.get(&e).map_or(&[], |v| v.as_slice())
    }
}

impl MapSim {
    /// Sectors a thing is linked into, most recently added first.
    pub fn touching_sectors(&self, e: Entity) -> &[SectorId] {
        self.touching.sectors_of(e)
    }

    /// Things touching sector `s`, most recently linked first.
    pub fn sector_things(&self, s: SectorId) -> &[Entity] {
        self.touching.things_in(s)
    }

    /// Every sector a footprint of `radius` at `pos` overlaps, in
    /// blockmap order, ending with `own`.
    pub(crate) fn sectors_touched(&mut self, pos: Vec2, radius: f32, own: SectorId) -> SectorList {
        let bbox = Aabb::around(pos, radius);
        let mut out = SectorList::new();
        let level = &self.level;
        level.block_lines_iter(bbox, &mut self.validcount, |_, ld| {
            if !bbox.overlaps(&ld.bbox) || level.box_on_line_side(&bbox, ld) != -1 {
                return true;
            }
            out.push(ld.front_sector);
            if let Some(back) = ld.back_sector.filter(|&b| b != ld.front_sector) {
                out.push(back);
            }
            true
        });
        out.push(own);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hecs::World;

    #[test]
    fn surviving_links_keep_their_place() {
        let mut w = World::new();
        let (a, b) = (w.spawn(()), w.spawn(()));
        let mut l = SectorLinks::new(4);

        l.link(a, &[1, 0]);
        assert_eq!(l.sectors_of(a), &[0, 1]);
        l.link(b, &[1]);
        assert_eq!(l.things_in(1), &[b, a]);

        // a leaves sector 1, enters 2, stays in 0
        l.link(a, &[2, 0]);
        assert_eq!(l.sectors_of(a), &[2, 0]);
        assert_eq!(l.things_in(1), &[b]);
        assert_eq!(l.things_in(2), &[a]);

        l.unlink(a);
        assert!(l.sectors_of(a).is_empty());
        assert!(l.things_in(0).is_empty());
    }

    #[test]
    fn duplicate_sectors_link_once() {
        let mut w = World::new();
        let a = w.spawn(());
        let mut l = SectorLinks::new(2);
        l.link(a, &[0, 1, 0, 1]);
        assert_eq!(l.sectors_of(a), &[1, 0]);
        assert_eq!(l.things_in(0), &[a]);
    }
}
