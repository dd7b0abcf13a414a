//! Runtime “thing” grid – the blockmap half that holds mobjs.
//!
//! * One cell ≙ 128×128 map‑units, sharing the line blockmap's origin.
//! * Each cell keeps a `SmallVec` of entities; Doom maps rarely have
//!   more than a handful of live mobjs per block.
//! * A relink inserts at the **head** of its cell, so iteration visits
//!   the most recently linked thing first, like `blocklinks`.
//!
//! Things are linked by their centre point. Queries therefore widen
//! their box by `MAXRADIUS` before turning it into a cell range.

use glam::Vec2;
use hecs::Entity;
use smallvec::SmallVec;
use std::collections::HashMap;

use crate::world::{Aabb, Level};

/*──────────────────────── core types ────────────────────────*/

/// Row / column index in the blockmap grid
pub type Bx = i32;
pub type By = i32;

/// Small fixed‑capacity cell
pub type Cell = SmallVec<[Entity; 8]>;

/// Hash‑map grid (sparse – only allocated where something lives)
#[derive(Debug, Default)]
pub struct ThingGrid {
    origin: Vec2,
    cells: HashMap<(Bx, By), Cell>,
    /// Where every linked entity currently sits.
    links: HashMap<Entity, (Bx, By)>,
}

/*───────────────────────── API ──────────────────────────────*/

impl ThingGrid {
    pub fn new(origin: Vec2) -> ThingGrid {
        ThingGrid {
            origin,
            cells: HashMap::new(),
            links: HashMap::new(),
        }
    }

    #[inline]
    pub fn block_of(&self, p: Vec2) -> (Bx, By) {
        (
            Level::world_to_block(p.x, self.origin.x),
            Level::world_to_block(p.y, self.origin.y),
        )
    }

    /// Link `ent` at `pos`, ahead of everything already in the cell.
    pub fn insert(&mut self, ent: Entity, pos: Vec2) {
        self.remove(ent);
        let key = self.block_of(pos);
        self.cells.entry(key).or_default().insert(0, ent);
        self.links.insert(ent, key);
    }

    /// Unlink `ent`, keeping the order of the rest of its cell.
    pub fn remove(&mut self, ent: Entity) -> bool {
        let Some(key) = self.links.remove(&ent) else {
            return false;
        };
        if let Some(cell) = self.cells.get_mut(&key) {
            if let Some(i) = cell.iter().position(|&e| e == ent) {
                cell.remove(i);
            }
            if cell.is_empty() {
                self.cells.remove(&key);
            }
        }
        true
    }

    #[inline]
    pub fn is_linked(&self, ent: Entity) -> bool {
        self.links.contains_key(&ent)
    }

    #[inline]
    pub fn cell_of(&self, ent: Entity) -> Option<(Bx, By)> {
        self.links.get(&ent).copied()
    }

    /// Current contents of one cell, copied so the caller may relink
    /// things while walking it.
    pub fn snapshot(&self, bx: Bx, by: By) -> Cell {
        self.cells.get(&(bx, by)).cloned().unwrap_or_default()
    }

    /// Cell range `(xl, xh, yl, yh)` for `bbox` grown by `pad`.
    pub fn block_range(&self, bbox: &Aabb, pad: f32) -> (Bx, Bx, By, By) {
        let lo = self.block_of(bbox.min - Vec2::splat(pad));
        let hi = self.block_of(bbox.max + Vec2::splat(pad));
        (lo.0, hi.0, lo.1, hi.1)
    }

    /// Visit every entity whose **origin** lies in the cells overlapped
    /// by `bbox`, x outer, y inner, each cell head first.
    /// Iteration stops early when `f` returns `false`.
    pub fn for_each_in_bbox<F>(&self, bbox: Aabb, mut f: F) -> bool
    where
        F: FnMut(Entity) -> bool,
    {
        let (xl, xh, yl, yh) = self.block_range(&bbox, 0.0);
        for bx in xl..=xh {
            for by in yl..=yh {
                if let Some(cell) = self.cells.get(&(bx, by)) {
                    for &ent in cell {
                        if !f(ent) {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
