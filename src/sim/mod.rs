mod clip;
mod collision;
mod compat;
mod components;
mod friction;
mod hooks;
mod mob;
mod opening;
mod position;
mod position3d;
mod secnodes;
mod sector_change;
mod spacial;
mod teleport;
mod tic;
mod torque;
mod trace;
mod xy_movement;

pub use clip::{ClipContext, ClipStack};
pub use compat::{
    CompatConfig, CompatParseError, DEMO_VERSION_BOOM, DEMO_VERSION_ETERNITY, DEMO_VERSION_MBF,
    DEMO_VERSION_VANILLA, DropoffPolicy, SpechitEmulation,
};
pub use components::{Mobj, PlayerState};
pub use hooks::{DamageKind, PlayHooks, RandomClass, Sound, ThingState};
pub use mob::MapSim;
pub use opening::LineOpening;
pub use position3d::float_bob_offset;
pub use sector_change::SectorPlane;
pub use spacial::ThingGrid;
pub use teleport::GOD_BREACH_DAMAGE;
pub use tic::{SIM_FPS, TicRunner};
pub use torque::MAXGEAR;
pub use trace::{Divline, Intercept, intercept_vector};
