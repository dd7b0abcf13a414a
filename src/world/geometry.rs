use bitflags::bitflags;
use glam::{Vec2, Vec3};

pub type SubsectorId = u16;
pub type LinedefId = u16;
pub type SegmentId = u16;
pub type VertexId = u16;
pub type SidedefId = u16;
pub type SectorId = u16;
pub type PortalId = u16;
pub type TextureId = u16;

/// Portal group index.  Every sector belongs to exactly one group once
/// the link table has been built.
pub type GroupId = usize;

/// `TextureId` meaning "no texture on this surface".
pub const NO_TEXTURE: TextureId = 0;

/// Runtime snapshot of one map.  Geometry is immutable after setup;
/// sector heights and portal taint counters change during play.
#[derive(Debug)]
pub struct Level {
    pub name: String,
    pub linedefs: Vec<Linedef>,
    pub sidedefs: Vec<Sidedef>,
    pub vertices: Vec<Vertex>,
    pub segs: Vec<Seg>,
    pub subsectors: Vec<Subsector>,
    pub nodes: Vec<Node>,
    pub sectors: Vec<Sector>,
    pub blockmap: Blockmap,
    pub portals: Vec<Portal>,
}

/*--------------------------- linedefs -------------------------------*/

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LinedefFlags: u16 {
        const IMPASSABLE      = 0x0001;
        const BLOCK_MONSTERS  = 0x0002;
        const TWO_SIDED       = 0x0004;
        const UPPER_UNPEGGED  = 0x0008;
        const LOWER_UNPEGGED  = 0x0010;
        const SECRET          = 0x0020;
        const BLOCK_SOUND     = 0x0040;
        // Eternity: solid middle texture things can stand on.
        const MIDTEX_3D       = 0x0400;
        // Blocks everything, missiles included; clips like a one-sided line.
        const BLOCK_ALL       = 0x8000;
    }
}

/// Orientation class used by the fast box/line side test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeType {
    Horizontal,
    Vertical,
    Positive,
    Negative,
}

#[derive(Clone, Debug)]
pub struct Linedef {
    pub v1: VertexId,
    pub v2: VertexId,
    /// `v2 - v1`
    pub delta: Vec2,
    pub bbox: Aabb,
    pub slope: SlopeType,
    pub flags: LinedefFlags,
    pub special: u16,
    pub tag: u16,
    pub right_sidedef: Option<SidedefId>,
    pub left_sidedef: Option<SidedefId>,
    pub front_sector: SectorId,
    /// `None` for one-sided lines.
    pub back_sector: Option<SectorId>,
    /// Linked line portal, if any.
    pub portal: Option<PortalId>,
}

/*--------------------------- sidedefs -------------------------------*/

#[derive(Clone, Debug)]
pub struct Sidedef {
    pub x_off: f32,
    /// Row offset; moves the middle texture vertically.
    pub y_off: f32,
    pub middle: TextureId,
    /// Height of the middle texture in map units (0 when absent).
    pub middle_height: f32,
    pub sector: SectorId,
}

/*----------------------- simple primitives --------------------------*/

#[derive(Clone, Copy, Debug)]
pub struct Vertex {
    pub pos: Vec2,
}

#[derive(Clone, Debug)]
pub struct Seg {
    pub v1: VertexId,
    pub v2: VertexId,
    pub linedef: LinedefId,
    pub dir: u16,
    pub offset: f32,
}

#[derive(Clone, Debug)]
pub struct Subsector {
    pub seg_count: u16,
    pub first_seg: SegmentId,
    pub sector: SectorId,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub bbox: [Aabb; 2],
    pub child: [u16; 2],
}

/// Inclusive blockmap cell range covered by a sector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockBox {
    pub left: i32,
    pub right: i32,
    pub bottom: i32,
    pub top: i32,
}

/// Normal ground friction, vanilla scale.
pub const ORIG_FRICTION: i32 = 0xE800;
/// Normal move factor, vanilla scale.
pub const ORIG_FRICTION_FACTOR: i32 = 2048;
/// Sector special bit that turns on `friction` / `move_factor`.
pub const FRICTION_MASK: i16 = 0x100;

#[derive(Clone, Debug)]
pub struct Sector {
    pub floor_h: f32,
    pub ceil_h: f32,
    pub floor_pic: TextureId,
    pub ceil_pic: TextureId,
    pub light: f32,
    pub special: i16,
    pub tag: i16,
    /// Vanilla-scale friction (`0xE800` is normal ground).
    pub friction: i32,
    pub move_factor: i32,
    /// Deep-water control sector.
    pub height_sec: Option<SectorId>,
    pub floor_portal: Option<PortalId>,
    pub ceiling_portal: Option<PortalId>,
    pub group_id: GroupId,
    pub lines: Vec<LinedefId>,
    pub block_box: BlockBox,
}

/*--------------------------- blockmap -------------------------------*/

/// Uniform 128×128 grid of line lists, built once at level setup.
#[derive(Clone, Debug, Default)]
pub struct Blockmap {
    pub origin: Vec2,
    pub width: i32,
    pub height: i32,
    /// Row-major: `lines[by * width + bx]`.
    pub lines: Vec<Vec<LinedefId>>,
}

/*---------------------------- portals -------------------------------*/

/// A linked (walk-through) portal: geometry on the far side is the same
/// space shifted by `delta`.
#[derive(Clone, Debug)]
pub struct Portal {
    /// Any sector on the far side; its group is the portal's target.
    pub target_sector: SectorId,
    /// Source minus destination: crossing subtracts it from the position.
    pub delta: Vec3,
    /// Resolved by the link table build.
    pub target_group: Option<GroupId>,
    /// Teleports through this portal during the current tick.
    pub tainted: u32,
}
