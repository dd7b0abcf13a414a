use glam::Vec2;
use log::debug;

use super::{Aabb, Level, Linedef, LinedefId, Node, SectorId, SlopeType};

pub const CHILD_MASK: u16 = 0x7FFF;

pub const SUBSECTOR_BIT: u16 = 0x8000;

/// size of one grid cell in world units
pub const MAPBLOCKSHIFT: i32 = 7; // 2^7 = 128
pub const MAPBLOCKSIZE: f32 = (1 << MAPBLOCKSHIFT) as f32;

/// Largest thing radius; things are linked by their centre, so queries
/// widen the box by this much.
pub const MAXRADIUS: f32 = 32.0; // vanilla 32*FRACUNIT

/// Binary angle: the full circle maps onto the whole `u32` range.
pub type Bam = u32;
pub const ANG45: Bam = 0x2000_0000;
pub const ANG90: Bam = 0x4000_0000;
pub const ANG180: Bam = 0x8000_0000;

// ──────────────────────────────────────────────────────────────────────────
//                       Level – public helpers
// ──────────────────────────────────────────────────────────────────────────
impl Level {
    /// Index of the BSP root (`nodes.len()-1` in Doom).
    #[inline(always)]
    pub fn bsp_root(&self) -> u16 {
        assert!(!self.nodes.is_empty());
        (self.nodes.len() - 1) as u16
    }

    /// Walk the BSP and return the subsector id containing `p`.
    pub fn locate_subsector(&self, p: Vec2) -> u16 {
        let mut idx = self.bsp_root();
        loop {
            let node = &self.nodes[idx as usize];
            let child = node.child[node.point_side(p) as usize];
            if child & SUBSECTOR_BIT != 0 {
                return child & CHILD_MASK;
            }
            idx = child;
        }
    }

    /// Sector containing `p`.
    ///
    /// Levels that carry a BSP use it; hand-built levels without nodes
    /// fall back to an even-odd test against each sector's boundary.
    pub fn sector_at(&self, p: Vec2) -> SectorId {
        if !self.nodes.is_empty() {
            return self.subsectors[self.locate_subsector(p) as usize].sector;
        }
        self.sector_by_boundary(p)
    }

    fn sector_by_boundary(&self, p: Vec2) -> SectorId {
        for (sid, sector) in self.sectors.iter().enumerate() {
            let sid = sid as SectorId;
            let mut inside = false;
            for &li in &sector.lines {
                let ld = &self.linedefs[li as usize];
                // Lines with this sector on both sides are not boundary.
                if ld.back_sector == Some(ld.front_sector) {
                    continue;
                }
                let a = self.vertices[ld.v1 as usize].pos;
                let b = self.vertices[ld.v2 as usize].pos;
                if (a.y > p.y) != (b.y > p.y) {
                    let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                    if p.x < x {
                        inside = !inside;
                    }
                }
            }
            if inside {
                return sid;
            }
        }
        debug!("point {p} outside every sector, using sector 0");
        0
    }

    /// convert world-space x/y to integer block coords
    #[inline]
    pub fn world_to_block(x: f32, origin: f32) -> i32 {
        ((x - origin) / MAPBLOCKSIZE).floor() as i32
    }

    /// Block range `(xl, xh, yl, yh)` covered by `bbox`, grown by `pad`.
    #[inline]
    pub fn block_range(&self, bbox: &Aabb, pad: f32) -> (i32, i32, i32, i32) {
        let o = self.blockmap.origin;
        (
            Self::world_to_block(bbox.min.x - pad, o.x),
            Self::world_to_block(bbox.max.x + pad, o.x),
            Self::world_to_block(bbox.min.y - pad, o.y),
            Self::world_to_block(bbox.max.y + pad, o.y),
        )
    }

    /// Lines registered in one blockmap cell; empty outside the map.
    #[inline]
    pub fn cell_lines(&self, bx: i32, by: i32) -> &[LinedefId] {
        let bm = &self.blockmap;
        if bx < 0 || by < 0 || bx >= bm.width || by >= bm.height {
            return &[];
        }
        &bm.lines[(by * bm.width + bx) as usize]
    }

    /// vanilla-style iterator over *unique* linedefs that the axis-aligned
    /// bounding box touches.  Stops early if func returns false.
    pub fn block_lines_iter<F>(&self, bbox: Aabb, marks: &mut ValidCount, mut func: F) -> bool
    where
        F: FnMut(LinedefId, &Linedef) -> bool,
    {
        marks.bump();
        let (xl, xh, yl, yh) = self.block_range(&bbox, 0.0);

        for bx in xl..=xh {
            for by in yl..=yh {
                for &li in self.cell_lines(bx, by) {
                    if !marks.mark(li) {
                        continue;
                    }
                    if !func(li, &self.linedefs[li as usize]) {
                        return false;
                    }
                }
            }
        }
        true
    }

    #[inline]
    pub fn v1(&self, line: &Linedef) -> Vec2 {
        self.vertices[line.v1 as usize].pos
    }

    #[inline]
    pub fn v2(&self, line: &Linedef) -> Vec2 {
        self.vertices[line.v2 as usize].pos
    }

    /// 0 = front, 1 = back.
    #[inline]
    pub fn point_on_line_side(&self, p: Vec2, line: &Linedef) -> usize {
        point_on_line_side(p, self.v1(line), line.delta)
    }

    /// 0 / 1 when the whole box lies on one side, -1 when it straddles.
    #[inline]
    pub fn box_on_line_side(&self, bbox: &Aabb, line: &Linedef) -> i32 {
        box_on_line_side(bbox, self.v1(line), line.delta, line.slope)
    }
}

/// `validcount` replacement: a stamp per line, bumped once per query so
/// overlapping blockmap cells test each line only once.
#[derive(Debug, Default)]
pub struct ValidCount {
    stamp: u32,
    marks: Vec<u32>,
}

impl ValidCount {
    pub fn new(lines: usize) -> Self {
        Self {
            stamp: 0,
            marks: vec![0; lines],
        }
    }

    #[inline]
    pub fn bump(&mut self) {
        self.stamp = self.stamp.wrapping_add(1);
        if self.stamp == 0 {
            self.marks.fill(0);
            self.stamp = 1;
        }
    }

    /// Marks `line`; returns `false` if it was already seen this query.
    #[inline]
    pub fn mark(&mut self, line: LinedefId) -> bool {
        let idx = line as usize;
        if idx >= self.marks.len() {
            self.marks.resize(idx + 1, 0);
        }
        if self.marks[idx] == self.stamp {
            return false;
        }
        self.marks[idx] = self.stamp;
        true
    }
}

/*──────────────────────── line side tests ────────────────────────*/

/// P_PointOnLineSide: 0 = front (right of v1→v2), 1 = back.
#[inline]
pub fn point_on_line_side(p: Vec2, v1: Vec2, delta: Vec2) -> usize {
    if delta.x == 0.0 {
        return if p.x <= v1.x {
            (delta.y > 0.0) as usize
        } else {
            (delta.y < 0.0) as usize
        };
    }
    if delta.y == 0.0 {
        return if p.y <= v1.y {
            (delta.x < 0.0) as usize
        } else {
            (delta.x > 0.0) as usize
        };
    }
    ((p.y - v1.y) * delta.x >= delta.y * (p.x - v1.x)) as usize
}

/// P_BoxOnLineSide: considers the line infinite.
pub fn box_on_line_side(b: &Aabb, v1: Vec2, delta: Vec2, slope: SlopeType) -> i32 {
    match slope {
        SlopeType::Horizontal => {
            let p = b.max.y > v1.y;
            if (b.min.y > v1.y) == p {
                (p ^ (delta.x < 0.0)) as i32
            } else {
                -1
            }
        }
        SlopeType::Vertical => {
            let p = b.max.x < v1.x;
            if (b.min.x < v1.x) == p {
                (p ^ (delta.y < 0.0)) as i32
            } else {
                -1
            }
        }
        SlopeType::Positive => {
            let p = point_on_line_side(Vec2::new(b.min.x, b.max.y), v1, delta);
            if point_on_line_side(Vec2::new(b.max.x, b.min.y), v1, delta) == p {
                p as i32
            } else {
                -1
            }
        }
        SlopeType::Negative => {
            let p = point_on_line_side(b.max, v1, delta);
            if point_on_line_side(b.min, v1, delta) == p {
                p as i32
            } else {
                -1
            }
        }
    }
}

impl SlopeType {
    pub fn classify(delta: Vec2) -> SlopeType {
        if delta.x == 0.0 {
            SlopeType::Vertical
        } else if delta.y == 0.0 {
            SlopeType::Horizontal
        } else if (delta.y > 0.0) == (delta.x > 0.0) {
            SlopeType::Positive
        } else {
            SlopeType::Negative
        }
    }
}

/// P_AproxDistance: octagonal distance estimate.
#[inline]
pub fn approx_distance(dx: f32, dy: f32) -> f32 {
    let (dx, dy) = (dx.abs(), dy.abs());
    if dx < dy {
        dx + dy - dx * 0.5
    } else {
        dx + dy - dy * 0.5
    }
}

/*──────────────────────── binary angles ────────────────────────*/

/// R_PointToAngle2 from the origin.
#[inline]
pub fn point_to_angle(v: Vec2) -> Bam {
    if v.x == 0.0 && v.y == 0.0 {
        return 0;
    }
    let turns = v.y.atan2(v.x) as f64 / std::f64::consts::TAU;
    (turns.rem_euclid(1.0) * 4_294_967_296.0) as u64 as Bam
}

#[inline]
pub fn bam_to_radians(a: Bam) -> f32 {
    (a as f64 / 4_294_967_296.0 * std::f64::consts::TAU) as f32
}

// ──────────────────────────────────────────────────────────────────────────
//                       Node geometry helpers
// ──────────────────────────────────────────────────────────────────────────
impl Node {
    /// 0 = *front* of splitter, 1 = *back*.
    #[inline(always)]
    pub fn point_side(&self, p: Vec2) -> i32 {
        if self.dx == 0.0 {
            return if p.x <= self.x {
                (self.dy > 0.0) as i32
            } else {
                (self.dy < 0.0) as i32
            };
        }
        if self.dy == 0.0 {
            return if p.y <= self.y {
                (self.dx < 0.0) as i32
            } else {
                (self.dx > 0.0) as i32
            };
        }

        let d = (p.x - self.x) * self.dy - (p.y - self.y) * self.dx;
        (d <= 0.0) as i32 // 0 = front, 1 = back
    }
}

// ──────────────────────────────────────────────────────────────────────────
//                       Aabb geometry helpers
// ──────────────────────────────────────────────────────────────────────────
impl Aabb {
    /// Square footprint of a thing of `radius` centred on `c`.
    #[inline]
    pub fn around(c: Vec2, radius: f32) -> Aabb {
        Aabb {
            min: c - Vec2::splat(radius),
            max: c + Vec2::splat(radius),
        }
    }

    /// Open-interval overlap, the test PIT_CheckLine starts with.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        !(self.max.x <= other.min.x
            || self.min.x >= other.max.x
            || self.max.y <= other.min.y
            || self.min.y >= other.max.y)
    }

    /// Box spanned by two points.
    #[inline]
    pub fn spanning(a: Vec2, b: Vec2) -> Aabb {
        Aabb {
            min: a.min(b),
            max: a.max(b),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Blockmap, Subsector};

    fn split_level() -> Level {
        // One vertical splitter at x = 0 pointing north: east is front.
        Level {
            name: "split".into(),
            linedefs: vec![],
            sidedefs: vec![],
            vertices: vec![],
            segs: vec![],
            subsectors: vec![
                Subsector {
                    seg_count: 0,
                    first_seg: 0,
                    sector: 7,
                },
                Subsector {
                    seg_count: 0,
                    first_seg: 0,
                    sector: 9,
                },
            ],
            nodes: vec![Node {
                x: 0.0,
                y: 0.0,
                dx: 0.0,
                dy: 64.0,
                bbox: [Aabb::default(), Aabb::default()],
                child: [SUBSECTOR_BIT, SUBSECTOR_BIT | 1],
            }],
            sectors: vec![],
            blockmap: Blockmap::default(),
            portals: vec![],
        }
    }

    #[test]
    fn bsp_walk_picks_side() {
        let lvl = split_level();
        assert_eq!(lvl.sector_at(Vec2::new(10.0, 5.0)), 7);
        assert_eq!(lvl.sector_at(Vec2::new(-10.0, 5.0)), 9);
    }

    #[test]
    fn point_side_matches_vanilla_axes() {
        let v1 = Vec2::ZERO;
        // northbound vertical line: east is front
        assert_eq!(point_on_line_side(Vec2::new(5.0, 1.0), v1, Vec2::new(0.0, 10.0)), 0);
        assert_eq!(point_on_line_side(Vec2::new(-5.0, 1.0), v1, Vec2::new(0.0, 10.0)), 1);
        // eastbound horizontal line: south is front
        assert_eq!(point_on_line_side(Vec2::new(1.0, -5.0), v1, Vec2::new(10.0, 0.0)), 0);
        assert_eq!(point_on_line_side(Vec2::new(1.0, 5.0), v1, Vec2::new(10.0, 0.0)), 1);
    }

    #[test]
    fn box_side_straddle_and_clear() {
        let v1 = Vec2::ZERO;
        let d = Vec2::new(0.0, 128.0);
        let straddle = Aabb::around(Vec2::new(4.0, 64.0), 16.0);
        let east = Aabb::around(Vec2::new(40.0, 64.0), 16.0);
        let west = Aabb::around(Vec2::new(-40.0, 64.0), 16.0);
        assert_eq!(box_on_line_side(&straddle, v1, d, SlopeType::Vertical), -1);
        assert_eq!(box_on_line_side(&east, v1, d, SlopeType::Vertical), 0);
        assert_eq!(box_on_line_side(&west, v1, d, SlopeType::Vertical), 1);

        let diag = Vec2::new(64.0, 64.0);
        let slope = SlopeType::classify(diag);
        assert_eq!(slope, SlopeType::Positive);
        let on = Aabb::around(Vec2::new(32.0, 32.0), 8.0);
        let below = Aabb::around(Vec2::new(48.0, 0.0), 8.0);
        assert_eq!(box_on_line_side(&on, v1, diag, slope), -1);
        assert_eq!(box_on_line_side(&below, v1, diag, slope), 0);
    }

    #[test]
    fn approx_distance_is_octagonal() {
        assert_eq!(approx_distance(10.0, 0.0), 10.0);
        assert_eq!(approx_distance(-4.0, 3.0), 5.5);
    }

    #[test]
    fn angles_wrap_like_bams() {
        assert_eq!(point_to_angle(Vec2::new(1.0, 0.0)), 0);
        assert_eq!(point_to_angle(Vec2::new(0.0, 1.0)), ANG90);
        assert_eq!(point_to_angle(Vec2::new(-1.0, 0.0)), ANG180);
        assert!((bam_to_radians(ANG90) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn validcount_dedups_within_a_query() {
        let mut vc = ValidCount::new(4);
        vc.bump();
        assert!(vc.mark(2));
        assert!(!vc.mark(2));
        vc.bump();
        assert!(vc.mark(2));
    }
}
