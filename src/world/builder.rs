//! Programmatic level setup.
//!
//! Callers describe vertices, sectors and lines; [`LevelBuilder::build`]
//! derives everything the clipping code reads at run time: line deltas,
//! bounding boxes and slope classes, sidedef → sector wiring, per-sector
//! line lists and block boxes, and the 128×128 line blockmap.

use glam::{Vec2, Vec3};
use thiserror::Error;

use super::geometry::{
    Aabb, BlockBox, Blockmap, Level, Linedef, LinedefFlags, LinedefId, ORIG_FRICTION,
    ORIG_FRICTION_FACTOR, Portal, PortalId, Sector, SectorId, Sidedef, SidedefId, SlopeType,
    TextureId, Vertex, VertexId,
};
use super::helpers::{MAPBLOCKSIZE, MAXRADIUS};

/// Largest blockmap the builder will lay out, in cells per axis.
const MAX_BLOCKMAP_DIM: i32 = 1024;

/*──────────────────────────── Error type ───────────────────────────*/

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LevelBuildError {
    #[error("linedef {line} references missing vertex {vertex}")]
    DanglingVertex { line: LinedefId, vertex: VertexId },

    #[error("linedef {line} references missing sidedef {side}")]
    DanglingSidedef { line: LinedefId, side: SidedefId },

    #[error("sidedef {side} references missing sector {sector}")]
    DanglingSector { side: SidedefId, sector: SectorId },

    #[error("portal {portal} targets missing sector {sector}")]
    DanglingPortal { portal: PortalId, sector: SectorId },

    #[error("linedef {0} has zero length")]
    DegenerateLine(LinedefId),

    #[error("level has no vertices")]
    Empty,

    #[error("blockmap of {width}x{height} cells is too large")]
    BlockmapTooLarge { width: i32, height: i32 },
}

/*──────────────────────────── Builder ───────────────────────────────*/

/// Line under construction; sidedefs are created on demand.
#[derive(Clone, Debug)]
struct LineSpec {
    v1: VertexId,
    v2: VertexId,
    front: SidedefId,
    back: Option<SidedefId>,
    flags: LinedefFlags,
    special: u16,
    tag: u16,
    portal: Option<PortalId>,
}

#[derive(Debug, Default)]
pub struct LevelBuilder {
    name: String,
    vertices: Vec<Vertex>,
    sidedefs: Vec<Sidedef>,
    lines: Vec<LineSpec>,
    sectors: Vec<Sector>,
    portals: Vec<Portal>,
}

impl LevelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn vertex(&mut self, x: f32, y: f32) -> VertexId {
        self.vertices.push(Vertex {
            pos: Vec2::new(x, y),
        });
        (self.vertices.len() - 1) as VertexId
    }

    /// New sector with normal friction and no special.
    pub fn sector(&mut self, floor_h: f32, ceil_h: f32) -> SectorId {
        self.sectors.push(Sector {
            floor_h,
            ceil_h,
            floor_pic: 0,
            ceil_pic: 0,
            light: 1.0,
            special: 0,
            tag: 0,
            friction: ORIG_FRICTION,
            move_factor: ORIG_FRICTION_FACTOR,
            height_sec: None,
            floor_portal: None,
            ceiling_portal: None,
            group_id: 0,
            lines: Vec::new(),
            block_box: BlockBox::default(),
        });
        (self.sectors.len() - 1) as SectorId
    }

    /// Direct access for specials, friction, flats and portals.
    pub fn sector_mut(&mut self, id: SectorId) -> &mut Sector {
        &mut self.sectors[id as usize]
    }

    pub fn side(&mut self, sector: SectorId) -> SidedefId {
        self.sidedefs.push(Sidedef {
            x_off: 0.0,
            y_off: 0.0,
            middle: 0,
            middle_height: 0.0,
            sector,
        });
        (self.sidedefs.len() - 1) as SidedefId
    }

    /// Line from `v1` to `v2`. The front (right-hand) side faces `front`.
    pub fn line(
        &mut self,
        v1: VertexId,
        v2: VertexId,
        front: SectorId,
        back: Option<SectorId>,
    ) -> LinedefId {
        let front = self.side(front);
        let back = back.map(|s| self.side(s));
        let flags = if back.is_some() {
            LinedefFlags::TWO_SIDED
        } else {
            LinedefFlags::IMPASSABLE
        };
        self.lines.push(LineSpec {
            v1,
            v2,
            front,
            back,
            flags,
            special: 0,
            tag: 0,
            portal: None,
        });
        (self.lines.len() - 1) as LinedefId
    }

    /// Closed loop of one-sided walls around `sector`.
    ///
    /// Points go clockwise so that the front sides face inwards.
    pub fn polygon(&mut self, sector: SectorId, points: &[Vec2]) -> Vec<LinedefId> {
        let ids: Vec<VertexId> = points.iter().map(|p| self.vertex(p.x, p.y)).collect();
        (0..ids.len())
            .map(|i| self.line(ids[i], ids[(i + 1) % ids.len()], sector, None))
            .collect()
    }

    pub fn set_line_flags(&mut self, line: LinedefId, flags: LinedefFlags) {
        self.lines[line as usize].flags = flags;
    }

    pub fn add_line_flags(&mut self, line: LinedefId, flags: LinedefFlags) {
        self.lines[line as usize].flags |= flags;
    }

    pub fn set_special(&mut self, line: LinedefId, special: u16, tag: u16) {
        let l = &mut self.lines[line as usize];
        l.special = special;
        l.tag = tag;
    }

    /// Middle texture on the front side, used by 3D mid-texture lines.
    pub fn set_mid_texture(&mut self, line: LinedefId, tex: TextureId, height: f32, y_off: f32) {
        let side = self.lines[line as usize].front as usize;
        let sd = &mut self.sidedefs[side];
        sd.middle = tex;
        sd.middle_height = height;
        sd.y_off = y_off;
    }

    pub fn portal(&mut self, target_sector: SectorId, delta: Vec3) -> PortalId {
        self.portals.push(Portal {
            target_sector,
            delta,
            target_group: None,
            tainted: 0,
        });
        (self.portals.len() - 1) as PortalId
    }

    pub fn line_portal(&mut self, line: LinedefId, portal: PortalId) {
        self.lines[line as usize].portal = Some(portal);
    }

    pub fn floor_portal(&mut self, sector: SectorId, portal: PortalId) {
        self.sectors[sector as usize].floor_portal = Some(portal);
    }

    pub fn ceiling_portal(&mut self, sector: SectorId, portal: PortalId) {
        self.sectors[sector as usize].ceiling_portal = Some(portal);
    }

    pub fn build(self) -> Result<Level, LevelBuildError> {
        let LevelBuilder {
            name,
            vertices,
            sidedefs,
            lines,
            mut sectors,
            portals,
        } = self;

        if vertices.is_empty() {
            return Err(LevelBuildError::Empty);
        }

        for (i, sd) in sidedefs.iter().enumerate() {
            if sd.sector as usize >= sectors.len() {
                return Err(LevelBuildError::DanglingSector {
                    side: i as SidedefId,
                    sector: sd.sector,
                });
            }
        }
        for (i, p) in portals.iter().enumerate() {
            if p.target_sector as usize >= sectors.len() {
                return Err(LevelBuildError::DanglingPortal {
                    portal: i as PortalId,
                    sector: p.target_sector,
                });
            }
        }

        /*----- 1. linedefs with derived geometry ------------------------*/
        let mut linedefs = Vec::with_capacity(lines.len());
        for (i, spec) in lines.into_iter().enumerate() {
            let id = i as LinedefId;
            let pos = |v: VertexId| {
                vertices
                    .get(v as usize)
                    .map(|vx| vx.pos)
                    .ok_or(LevelBuildError::DanglingVertex { line: id, vertex: v })
            };
            let (a, b) = (pos(spec.v1)?, pos(spec.v2)?);
            let delta = b - a;
            if delta == Vec2::ZERO {
                return Err(LevelBuildError::DegenerateLine(id));
            }
            let sector_of = |s: SidedefId| {
                sidedefs
                    .get(s as usize)
                    .map(|sd| sd.sector)
                    .ok_or(LevelBuildError::DanglingSidedef { line: id, side: s })
            };
            let front_sector = sector_of(spec.front)?;
            let back_sector = spec.back.map(sector_of).transpose()?;

            linedefs.push(Linedef {
                v1: spec.v1,
                v2: spec.v2,
                delta,
                bbox: Aabb::spanning(a, b),
                slope: SlopeType::classify(delta),
                flags: spec.flags,
                special: spec.special,
                tag: spec.tag,
                right_sidedef: Some(spec.front),
                left_sidedef: spec.back,
                front_sector,
                back_sector,
                portal: spec.portal,
            });
        }

        /*----- 2. per-sector line lists ---------------------------------*/
        for (i, ld) in linedefs.iter().enumerate() {
            sectors[ld.front_sector as usize].lines.push(i as LinedefId);
            if let Some(back) = ld.back_sector {
                if back != ld.front_sector {
                    sectors[back as usize].lines.push(i as LinedefId);
                }
            }
        }

        /*----- 3. blockmap ----------------------------------------------*/
        let blockmap = build_blockmap(&vertices, &linedefs)?;

        /*----- 4. sector block boxes (P_GroupLines) ---------------------*/
        for sector in sectors.iter_mut() {
            sector.block_box = sector_block_box(sector, &linedefs, &vertices, &blockmap);
        }

        Ok(Level {
            name,
            linedefs,
            sidedefs,
            vertices,
            segs: Vec::new(),
            subsectors: Vec::new(),
            nodes: Vec::new(),
            sectors,
            blockmap,
            portals,
        })
    }
}

/*──────────────────────── blockmap helpers ─────────────────────────*/

fn build_blockmap(vertices: &[Vertex], linedefs: &[Linedef]) -> Result<Blockmap, LevelBuildError> {
    let (mut min, mut max) = (vertices[0].pos, vertices[0].pos);
    for v in vertices {
        min = min.min(v.pos);
        max = max.max(v.pos);
    }
    let origin = (min - Vec2::splat(8.0)).floor();
    let width = ((max.x - origin.x) / MAPBLOCKSIZE).floor() as i32 + 1;
    let height = ((max.y - origin.y) / MAPBLOCKSIZE).floor() as i32 + 1;
    if width > MAX_BLOCKMAP_DIM || height > MAX_BLOCKMAP_DIM {
        return Err(LevelBuildError::BlockmapTooLarge { width, height });
    }

    let mut lines = vec![Vec::new(); (width * height) as usize];
    for (i, ld) in linedefs.iter().enumerate() {
        let a = vertices[ld.v1 as usize].pos;
        let b = vertices[ld.v2 as usize].pos;
        let xl = Level::world_to_block(ld.bbox.min.x, origin.x).max(0);
        let xh = Level::world_to_block(ld.bbox.max.x, origin.x).min(width - 1);
        let yl = Level::world_to_block(ld.bbox.min.y, origin.y).max(0);
        let yh = Level::world_to_block(ld.bbox.max.y, origin.y).min(height - 1);
        for by in yl..=yh {
            for bx in xl..=xh {
                let cell_min = origin + Vec2::new(bx as f32, by as f32) * MAPBLOCKSIZE;
                let cell = Aabb {
                    min: cell_min,
                    max: cell_min + Vec2::splat(MAPBLOCKSIZE),
                };
                if segment_touches_box(a, b, &cell) {
                    lines[(by * width + bx) as usize].push(i as LinedefId);
                }
            }
        }
    }

    Ok(Blockmap {
        origin,
        width,
        height,
        lines,
    })
}

/// Liang–Barsky clip of segment `a→b` against the closed box.
fn segment_touches_box(a: Vec2, b: Vec2, bx: &Aabb) -> bool {
    let d = b - a;
    let (mut t0, mut t1) = (0.0f32, 1.0f32);
    for (p, q) in [
        (-d.x, a.x - bx.min.x),
        (d.x, bx.max.x - a.x),
        (-d.y, a.y - bx.min.y),
        (d.y, bx.max.y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return false;
        }
    }
    true
}

fn sector_block_box(
    sector: &Sector,
    linedefs: &[Linedef],
    vertices: &[Vertex],
    bm: &Blockmap,
) -> BlockBox {
    let mut bbox: Option<Aabb> = None;
    for &li in &sector.lines {
        let ld = &linedefs[li as usize];
        for v in [ld.v1, ld.v2] {
            let p = vertices[v as usize].pos;
            bbox = Some(match bbox {
                Some(b) => Aabb {
                    min: b.min.min(p),
                    max: b.max.max(p),
                },
                None => Aabb { min: p, max: p },
            });
        }
    }
    let Some(bbox) = bbox else {
        return BlockBox::default();
    };
    let cell = |v: f32, o: f32, hi: i32| Level::world_to_block(v, o).clamp(0, hi - 1);
    BlockBox {
        top: cell(bbox.max.y + MAXRADIUS, bm.origin.y, bm.height),
        bottom: cell(bbox.min.y - MAXRADIUS, bm.origin.y, bm.height),
        right: cell(bbox.max.x + MAXRADIUS, bm.origin.x, bm.width),
        left: cell(bbox.min.x - MAXRADIUS, bm.origin.x, bm.width),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(b: &mut LevelBuilder, s: SectorId, x0: f32, y0: f32, x1: f32, y1: f32) {
        b.polygon(
            s,
            &[
                Vec2::new(x0, y0),
                Vec2::new(x0, y1),
                Vec2::new(x1, y1),
                Vec2::new(x1, y0),
            ],
        );
    }

    #[test]
    fn room_lines_face_inwards() {
        let mut b = LevelBuilder::new("room");
        let s = b.sector(0.0, 128.0);
        square(&mut b, s, -256.0, -256.0, 256.0, 256.0);
        let lvl = b.build().unwrap();

        let centre = Vec2::ZERO;
        for ld in &lvl.linedefs {
            assert_eq!(lvl.point_on_line_side(centre, ld), 0);
            assert!(ld.back_sector.is_none());
        }
        assert_eq!(lvl.sectors[0].lines.len(), 4);
        assert_eq!(lvl.sector_at(Vec2::new(10.0, -30.0)), s);
    }

    #[test]
    fn every_line_lands_in_its_cells() {
        let mut b = LevelBuilder::new("diag");
        let s = b.sector(0.0, 128.0);
        b.polygon(
            s,
            &[
                Vec2::new(0.0, 0.0),
                Vec2::new(300.0, 500.0),
                Vec2::new(600.0, 0.0),
            ],
        );
        let lvl = b.build().unwrap();
        for (i, ld) in lvl.linedefs.iter().enumerate() {
            let a = lvl.v1(ld);
            let mid = a + ld.delta * 0.5;
            let bx = Level::world_to_block(mid.x, lvl.blockmap.origin.x);
            let by = Level::world_to_block(mid.y, lvl.blockmap.origin.y);
            assert!(lvl.cell_lines(bx, by).contains(&(i as LinedefId)));
        }
    }

    #[test]
    fn dangling_references_are_reported() {
        let mut b = LevelBuilder::new("bad");
        let s = b.sector(0.0, 128.0);
        let v = b.vertex(0.0, 0.0);
        b.line(v, 9, s, None);
        assert_eq!(
            b.build().unwrap_err(),
            LevelBuildError::DanglingVertex { line: 0, vertex: 9 }
        );

        let mut b = LevelBuilder::new("bad-sector");
        let v1 = b.vertex(0.0, 0.0);
        let v2 = b.vertex(64.0, 0.0);
        b.line(v1, v2, 3, None);
        assert!(matches!(
            b.build(),
            Err(LevelBuildError::DanglingSector { sector: 3, .. })
        ));
    }

    #[test]
    fn two_sided_lines_join_both_sectors() {
        let mut b = LevelBuilder::new("pair");
        let a = b.sector(0.0, 128.0);
        let c = b.sector(16.0, 128.0);
        let v1 = b.vertex(0.0, 0.0);
        let v2 = b.vertex(0.0, 64.0);
        let l = b.line(v1, v2, a, Some(c));
        let lvl = b.build().unwrap();
        assert!(lvl.sectors[a as usize].lines.contains(&l));
        assert!(lvl.sectors[c as usize].lines.contains(&l));
        assert!(lvl.linedefs[l as usize].flags.contains(LinedefFlags::TWO_SIDED));
    }
}
