//! Map movement and collision clipping for Doom-engine levels.
//!
//! [`world`] holds the level geometry and portal links, [`defs`] the
//! thing flags and kinds, and [`sim`] the engine itself: position
//! checks, moves, teleports, slides and sector movement, all methods on
//! [`sim::MapSim`].

pub mod defs;
pub mod sim;
pub mod world;
