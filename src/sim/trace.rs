//! Line traces through the blockmap.
//!
//! A trace collects every line it crosses, then hands them to a visitor
//! nearest first. Lines at the same distance keep blockmap order.

use glam::Vec2;
use smallvec::SmallVec;

use super::MapSim;
use crate::world::{point_on_line_side, Level, LinedefId, MAPBLOCKSIZE};

/// Cells a single trace may visit. (vanilla 64)
const MAX_TRACE_CELLS: usize = 64;

/// A point and a direction; the trace itself or a line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Divline {
    pub origin: Vec2,
    pub delta: Vec2,
}

impl Divline {
    #[inline]
    pub fn new(from: Vec2, to: Vec2) -> Self {
        Self {
            origin: from,
            delta: to - from,
        }
    }

    /// 0 = front, 1 = back.
    #[inline]
    pub fn side_of(&self, p: Vec2) -> usize {
        point_on_line_side(p, self.origin, self.delta)
    }
}

/// Fraction along `trace` where it meets `line`, 0 when parallel.
pub fn intercept_vector(trace: &Divline, line: &Divline) -> f32 {
    let den = line.delta.y * trace.delta.x - line.delta.x * trace.delta.y;
    if den == 0.0 {
        return 0.0;
    }
    let num = (line.origin.x - trace.origin.x) * line.delta.y
        + (trace.origin.y - line.origin.y) * line.delta.x;
    num / den
}

/// A line crossed by a trace.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intercept {
    /// 0 at the start of the trace, 1 at its end.
    pub frac: f32,
    pub line: LinedefId,
}

impl MapSim {
    /// Trace from `from` to `to` and call `visit` on each crossed line
    /// up to the end of the trace. Returns `false` if `visit` stopped it.
    pub fn path_traverse(
        &mut self,
        from: Vec2,
        to: Vec2,
        mut visit: impl FnMut(&mut MapSim, &Intercept) -> bool,
    ) -> bool {
        let mut intercepts = self.line_intercepts(from, to);
        intercepts.sort_by(|a, b| a.frac.total_cmp(&b.frac));
        for ic in &intercepts {
            if ic.frac > 1.0 {
                break;
            }
            if !visit(self, ic) {
                return false;
            }
        }
        true
    }

    fn line_intercepts(&mut self, from: Vec2, to: Vec2) -> SmallVec<[Intercept; 16]> {
        let origin = self.level.blockmap.origin;
        let mut from = from;
        // a trace exactly on a cell edge would miss lines along it
        if (from.x - origin.x).rem_euclid(MAPBLOCKSIZE) == 0.0 {
            from.x += 1.0;
        }
        if (from.y - origin.y).rem_euclid(MAPBLOCKSIZE) == 0.0 {
            from.y += 1.0;
        }
        let trace = Divline::new(from, to);
        let long = trace.delta.x.abs() > 16.0 || trace.delta.y.abs() > 16.0;

        self.validcount.bump();
        let mut out = SmallVec::new();
        for (bx, by) in cells_along(&self.level, from, to) {
            for &li in self.level.cell_lines(bx, by) {
                if !self.validcount.mark(li) {
                    continue;
                }
                let ld = &self.level.linedefs[li as usize];
                let v1 = self.level.v1(ld);
                let (s1, s2) = if long {
                    (trace.side_of(v1), trace.side_of(v1 + ld.delta))
                } else {
                    (
                        point_on_line_side(trace.origin, v1, ld.delta),
                        point_on_line_side(to, v1, ld.delta),
                    )
                };
                if s1 == s2 {
                    continue;
                }
                let frac = intercept_vector(&trace, &Divline { origin: v1, delta: ld.delta });
                if frac < 0.0 {
                    continue;
                }
                out.push(Intercept { frac, line: li });
            }
        }
        out
    }
}

/// Blockmap cells under the segment, in the order it enters them.
fn cells_along(level: &Level, from: Vec2, to: Vec2) -> SmallVec<[(i32, i32); 16]> {
    let origin = level.blockmap.origin;
    let mut cx = Level::world_to_block(from.x, origin.x);
    let mut cy = Level::world_to_block(from.y, origin.y);
    let ex = Level::world_to_block(to.x, origin.x);
    let ey = Level::world_to_block(to.y, origin.y);

    let d = to - from;
    let step_x = d.x.signum() as i32;
    let step_y = d.y.signum() as i32;
    // parametric distance to the first boundary and between boundaries
    let boundary = |c: i32, step: i32, o: f32| o + (c + (step > 0) as i32) as f32 * MAPBLOCKSIZE;
    let (mut t_x, dt_x) = if d.x != 0.0 {
        ((boundary(cx, step_x, origin.x) - from.x) / d.x, MAPBLOCKSIZE / d.x.abs())
    } else {
        (f32::INFINITY, f32::INFINITY)
    };
    let (mut t_y, dt_y) = if d.y != 0.0 {
        ((boundary(cy, step_y, origin.y) - from.y) / d.y, MAPBLOCKSIZE / d.y.abs())
    } else {
        (f32::INFINITY, f32::INFINITY)
    };

    let mut cells = SmallVec::new();
    cells.push((cx, cy));
    while (cx, cy) != (ex, ey) && cells.len() < MAX_TRACE_CELLS {
        if t_x < t_y {
            cx += step_x;
            t_x += dt_x;
        } else if t_y < t_x {
            cy += step_y;
            t_y += dt_y;
        } else {
            // through a corner: both neighbours, then the diagonal
            cells.push((cx + step_x, cy));
            cells.push((cx, cy + step_y));
            cx += step_x;
            cy += step_y;
            t_x += dt_x;
            t_y += dt_y;
        }
        cells.push((cx, cy));
    }
    cells
}
