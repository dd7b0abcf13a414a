mod builder;
mod geometry;
mod helpers;
mod portal;

pub use geometry::{
    Aabb, BlockBox, Blockmap, FRICTION_MASK, GroupId, Level, Linedef, LinedefFlags, LinedefId,
    NO_TEXTURE, Node, ORIG_FRICTION, ORIG_FRICTION_FACTOR, Portal, PortalId, Sector, SectorId,
    Seg, SegmentId, Sidedef, SidedefId, SlopeType, Subsector, SubsectorId, TextureId, Vertex,
    VertexId,
};

pub use helpers::{
    ANG45, ANG90, ANG180, Bam, MAPBLOCKSIZE, MAXRADIUS, ValidCount, approx_distance,
    bam_to_radians, box_on_line_side, point_on_line_side, point_to_angle,
};

pub use builder::{LevelBuildError, LevelBuilder};
pub use portal::{PortalError, PortalGroupTable};
