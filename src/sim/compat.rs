//! Compatibility switches.
//!
//! Every rule that changed between engine generations is gated on a
//! field of [`CompatConfig`]. The same thing, position and config always
//! yield the same decision; nothing here depends on runtime state.

use std::str::FromStr;

use thiserror::Error;

/// DOOM 1.9 recordings and older.
pub const DEMO_VERSION_VANILLA: i32 = 109;
pub const DEMO_VERSION_BOOM: i32 = 202;
pub const DEMO_VERSION_MBF: i32 = 203;
pub const DEMO_VERSION_ETERNITY: i32 = 401;

/// Spechit overrun base when emulation mode 2 is selected.
const SPECHIT_BASE_MAGIC: u32 = 0x01C0_9C98;
/// Spechit overrun base for every other mode.
const SPECHIT_BASE_CLASSIC: u32 = 0x84F9_68E8;

/// Which table of ghost writes an overflowing spechit list reproduces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpechitEmulation {
    #[default]
    Off,
    /// Mode 1: the DOS executable's usual base address.
    Classic,
    /// Mode 2: the base address seen in the DOOM II executable.
    Magic,
}

/// Dropoff rule set, chosen from the demo version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropoffPolicy {
    Vanilla,
    Boom,
    Mbf,
    Eternity,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CompatParseError {
    #[error("unknown compatibility preset `{0}`")]
    UnknownPreset(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompatConfig {
    pub demo_version: i32,
    /// Playing back a pre-BOOM recording.
    pub demo_compatibility: bool,
    /// BOOM's global compatibility toggle.
    pub compatibility: bool,
    pub comp_dropoff: bool,
    pub comp_telefrag: bool,
    pub comp_floors: bool,
    pub comp_overunder: bool,
    pub comp_theights: bool,
    pub variable_friction: bool,
    /// MBF: monsters may climb steep stairs.
    pub monkeys: bool,
    pub spechits_emulation: SpechitEmulation,
    /// Explicit base address; forces overrun emulation on.
    pub spechit_base_address: Option<u32>,
}

impl CompatConfig {
    pub fn vanilla() -> Self {
        Self {
            demo_version: DEMO_VERSION_VANILLA,
            demo_compatibility: true,
            compatibility: true,
            comp_dropoff: true,
            comp_telefrag: true,
            comp_floors: true,
            comp_overunder: true,
            comp_theights: true,
            variable_friction: false,
            monkeys: false,
            spechits_emulation: SpechitEmulation::Off,
            spechit_base_address: None,
        }
    }

    pub fn boom() -> Self {
        Self {
            demo_version: DEMO_VERSION_BOOM,
            demo_compatibility: false,
            compatibility: false,
            comp_floors: false,
            variable_friction: true,
            ..Self::vanilla()
        }
    }

    pub fn mbf() -> Self {
        Self {
            demo_version: DEMO_VERSION_MBF,
            comp_dropoff: false,
            comp_telefrag: false,
            ..Self::boom()
        }
    }

    pub fn eternity() -> Self {
        Self {
            demo_version: DEMO_VERSION_ETERNITY,
            comp_overunder: false,
            comp_theights: false,
            ..Self::mbf()
        }
    }

    pub fn dropoff_policy(&self) -> DropoffPolicy {
        match self.demo_version {
            v if v < 200 => DropoffPolicy::Vanilla,
            v if v <= DEMO_VERSION_BOOM => DropoffPolicy::Boom,
            DEMO_VERSION_MBF => DropoffPolicy::Mbf,
            _ => DropoffPolicy::Eternity,
        }
    }

    /// Things stack on each other (3D object clipping).
    #[inline]
    pub fn overunder(&self) -> bool {
        self.demo_version >= 331 && !self.comp_overunder
    }

    #[inline]
    pub fn linked_portals(&self) -> bool {
        self.demo_version >= 333
    }

    /// MBF and later rules (unstuck, icy walls, dropoff monkeys).
    #[inline]
    pub fn mbf_rules(&self) -> bool {
        self.demo_version >= DEMO_VERSION_MBF
    }

    /// Thing height used when a missile tests a DECORATION3D thing.
    #[inline]
    pub fn decoration_heights(&self) -> bool {
        self.demo_version >= 333 && !self.comp_theights
    }

    /// An overflowing spechit list must replay the vanilla memory
    /// corruption.
    #[inline]
    pub fn spechit_overrun_enabled(&self) -> bool {
        self.spechit_base_address.is_some()
            || (self.demo_compatibility && self.spechits_emulation != SpechitEmulation::Off)
    }

    /// Address the overrun writes are derived from, whether or not the
    /// overrun is currently replayed.
    pub fn spechit_overrun_address(&self) -> u32 {
        match (self.spechit_base_address, self.spechits_emulation) {
            (Some(base), _) => base,
            (None, SpechitEmulation::Magic) => SPECHIT_BASE_MAGIC,
            (None, _) => SPECHIT_BASE_CLASSIC,
        }
    }

    /// `Some(base)` when an overflowing spechit list must replay the
    /// vanilla memory corruption.
    pub fn spechit_overrun_base(&self) -> Option<u32> {
        self.spechit_overrun_enabled()
            .then(|| self.spechit_overrun_address())
    }
}

impl Default for CompatConfig {
    fn default() -> Self {
        Self::eternity()
    }
}

impl FromStr for CompatConfig {
    type Err = CompatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vanilla" | "doom" => Ok(Self::vanilla()),
            "boom" => Ok(Self::boom()),
            "mbf" => Ok(Self::mbf()),
            "eternity" | "ee" => Ok(Self::eternity()),
            _ => Err(CompatParseError::UnknownPreset(s.to_owned())),
        }
    }
}
