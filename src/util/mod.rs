//! Utility types and functions shared by every layer.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math types (glam re-exports, colors, triangles, byte matrices)
//! - Version number packing
//! - Logging setup

mod error;
mod logging;
mod math;
mod version;

pub use error::*;
pub use logging::*;
pub use math::*;
pub use version::*;
