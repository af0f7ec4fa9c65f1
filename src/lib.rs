//! # nifcore
//!
//! Schema-driven object model and binary codec for NetImmerse / Gamebryo
//! (`.nif`) files.
//!
//! Nothing about individual block types is compiled in: a [`Schema`] read from
//! a JSON description lists the basic types, enums, compounds and blocks of
//! every supported file version, and a [`Document`] expands each block of a
//! file into a tree of typed [`Value`]s following that description. Field
//! presence (version ranges, conditions), array sizes and templates are all
//! resolved at run time.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math types, version numbers, logging setup
//! - [`config`] - Persistent settings
//! - [`value`] - Dynamically typed field values
//! - [`expr`] - Condition and array-size expressions
//! - [`schema`] - Type registry
//! - [`model`] - Item tree arena
//! - [`codec`] - Per-kind wire encoding
//! - [`document`] - Whole files: load, save, blocks, links, notifications
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nifcore::prelude::*;
//!
//! let schema = Arc::new(Schema::from_path("nif.json")?);
//! let mut doc = Document::new(schema, &Settings::default());
//! doc.open("scene.nif")?;
//!
//! let root = doc.block(0, Some("NiNode")).expect("root node");
//! doc.set(root, "Scale", 2.0f32);
//! doc.save_path("scaled.nif")?;
//! ```

pub mod util;
pub mod config;
pub mod value;
pub mod expr;
pub mod schema;
pub mod model;
pub mod codec;
pub mod document;

// Re-export commonly used types
pub use config::Settings;
pub use document::{ChangeEvent, Document};
pub use model::{Item, ItemId, ItemTree};
pub use schema::Schema;
pub use util::{Error, Result};
pub use value::{Value, ValueKind};

/// Build stamp set by `build.rs`.
pub const BUILD_STAMP: &str = env!("NIFCORE_BUILD_STAMP");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::codec::{NifReader, NifWriter, StreamFlags};
    pub use crate::config::Settings;
    pub use crate::document::{ChangeEvent, Document};
    pub use crate::expr::{Expr, ExprValue, Resolver};
    pub use crate::model::{ItemId, ItemTree};
    pub use crate::schema::{Schema, SchemaSource};
    pub use crate::util::{version_to_number, version_to_string, Error, Result};
    pub use crate::value::{FromValue, IntoValue, Value, ValueKind};
}
