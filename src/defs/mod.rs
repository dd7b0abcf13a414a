pub mod flags;
pub mod kinds;

pub use self::{
    flags::{MobjFlags, MobjFlags2, MobjFlags3, MobjIntFlags},
    kinds::MobjKind,
};
