//! Process-wide schema slot.
//!
//! Documents never read this implicitly; hosts fetch the current schema and
//! pass the `Arc` to [`Document::new`](crate::document::Document::new).
//! Reloading swaps the slot, so documents built earlier keep their schema.

use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock};

use super::{Schema, SchemaSource};
use crate::util::Result;

static CURRENT: RwLock<Option<Arc<Schema>>> = const_rwlock(None);

/// Replace the shared schema.
pub fn install(schema: Schema) -> Arc<Schema> {
    let schema = Arc::new(schema);
    *CURRENT.write() = Some(Arc::clone(&schema));
    schema
}

/// The shared schema, if one is installed.
pub fn current() -> Option<Arc<Schema>> {
    CURRENT.read().clone()
}

/// Clear the slot and rebuild from `source`. On failure the slot stays empty.
pub fn reload(source: &SchemaSource) -> Result<Arc<Schema>> {
    clear();
    let schema = Schema::load(source)?;
    tracing::info!("schema reloaded");
    Ok(install(schema))
}

pub fn clear() {
    *CURRENT.write() = None;
}
