//! The document: a whole NIF file as an item tree.
//!
//! Root rows are laid out as
//!
//! | row        | content                    |
//! |------------|----------------------------|
//! | 0          | header pseudo-block        |
//! | 1..=N      | the N blocks, in file order |
//! | N + 1      | footer                     |
//!
//! Header and footer rows always exist; they are empty when the schema does
//! not declare `Header` / `Footer` compounds.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nifcore::prelude::*;
//!
//! let schema = Arc::new(Schema::from_path("nif.json")?);
//! let mut doc = Document::new(schema, &Settings::default());
//! doc.open("scene.nif")?;
//! for n in 0..doc.block_count() {
//!     let block = doc.block_item(n).unwrap();
//!     println!("{n}: {} {}", doc.type_name_of(block), doc.get_string_at(block, "Name"));
//! }
//! ```

mod access;
mod array;
mod blocks;
mod condition;
mod links;
mod load;
mod notify;
mod save;

pub use array::MAX_ARRAY_SIZE;
pub use blocks::block_type_hash;
pub use condition::{HeaderResolver, ItemResolver};
pub use load::parse_header_string;
pub use notify::{ChangeEvent, SubscriptionId};

use std::sync::Arc;

use crate::codec::StreamFlags;
use crate::config::Settings;
use crate::model::{ItemId, ItemTree};
use crate::schema::{FieldSpec, Schema};
use crate::util::{version_to_string, V10_0_1_0, V20_0_0_5, V3_3_0_13};

use links::LinkTables;
use notify::Notifier;

const HEADER_NAME: &str = "NiHeader";
const FOOTER_NAME: &str = "NiFooter";
/// Type name of block rows.
pub const BLOCK_TYPE: &str = "NiBlock";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Loading,
}

/// A NIF file bound to a schema.
pub struct Document {
    schema: Arc<Schema>,
    settings: Settings,
    tree: ItemTree,
    version: u32,
    header_string: String,
    flags: StreamFlags,
    state: State,
    links: LinkTables,
    notify: Notifier,
}

impl Document {
    /// Empty document at the startup version from `settings`.
    pub fn new(schema: Arc<Schema>, settings: &Settings) -> Self {
        let mut doc = Self {
            schema,
            settings: settings.clone(),
            tree: ItemTree::new(FieldSpec::named("root", "")),
            version: 0,
            header_string: String::new(),
            flags: StreamFlags::default(),
            state: State::Idle,
            links: LinkTables::default(),
            notify: Notifier::default(),
        };
        doc.reset_tree();
        doc
    }

    #[inline]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn tree(&self) -> &ItemTree {
        &self.tree
    }

    #[inline]
    pub fn root(&self) -> ItemId {
        self.tree.root()
    }

    /// Format version of the document.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn version_string(&self) -> String {
        version_to_string(self.version)
    }

    /// Banner line the file was read with (or will be written with).
    pub fn header_string(&self) -> &str {
        &self.header_string
    }

    #[inline]
    pub fn flags(&self) -> &StreamFlags {
        &self.flags
    }

    pub fn is_loading(&self) -> bool {
        self.state == State::Loading
    }

    fn update_flags(&mut self) {
        self.flags = StreamFlags::for_version(self.version, &self.header_string)
            .with_max_length(self.settings.max_string_length);
    }

    /// Drop all blocks and rebuild an empty file at the startup version.
    pub fn clear(&mut self) {
        self.reset_tree();
        self.emit(ChangeEvent::Reset);
    }

    fn reset_tree(&mut self) {
        let prev = self.state;
        self.state = State::Loading;

        self.tree = ItemTree::new(FieldSpec::named("root", ""));
        self.links = LinkTables::default();
        let root = self.tree.root();
        self.insert_section(root, HEADER_NAME, "Header");
        self.insert_section(root, FOOTER_NAME, "Footer");

        self.version = self.settings.startup_version_number();
        if !self.schema.is_version_supported(self.version) {
            tracing::warn!(
                "unsupported startup version {}, reverting to 20.0.0.5",
                self.settings.startup_version
            );
            self.version = V20_0_0_5;
        }

        let prefix = if self.version <= V10_0_1_0 {
            "NetImmerse File Format, Version "
        } else {
            "Gamebryo File Format, Version "
        };
        self.header_string = format!("{prefix}{}", version_to_string(self.version));
        self.update_flags();

        let header = self.header();
        let version = self.version;
        if let Some(v) = self.get_item(header, "Version").and_then(|v| self.value_mut(v)) {
            v.set_file_version(version);
        }
        let banner = self.header_string.clone();
        self.set(header, "Header String", banner);

        if self.version >= V20_0_0_5 {
            let (uv, uv2) = (self.settings.user_version, self.settings.user_version2);
            self.set(header, "User Version", uv);
            self.set(header, "User Version 2", uv2);
        }

        if self.version < V3_3_0_13 {
            let copyright = [
                "Numerical Design Limited, Chapel Hill, NC 27514",
                "Copyright (c) 1996-2000",
                "All Rights Reserved",
            ];
            if let Some(arr) = self.get_item(header, "Copyright") {
                if self.update_array(arr).is_ok() {
                    self.set_array_items(arr, &copyright.map(str::to_owned));
                }
            }
        }

        self.state = prev;
    }

    /// Header or footer row: the compound's fields, or an empty branch.
    fn insert_section(&mut self, root: ItemId, name: &str, compound: &str) {
        let mut spec = FieldSpec::named(name, compound);
        spec.conditionless = true;
        spec.compound = self.schema.is_compound(compound);
        if spec.compound {
            self.insert_type(root, spec, None);
        } else {
            self.insert_branch(root, spec, None);
        }
    }

    /// Header pseudo-block (root row 0).
    pub fn header(&self) -> ItemId {
        self.tree.child(self.root(), 0).unwrap_or(self.root())
    }

    /// Footer (last root row).
    pub fn footer(&self) -> ItemId {
        let n = self.tree.child_count(self.root());
        self.tree.child(self.root(), n.saturating_sub(1)).unwrap_or(self.root())
    }

    /// Root row an item belongs to.
    pub fn top_level(&self, id: ItemId) -> Option<ItemId> {
        let root = self.root();
        let mut cur = id;
        loop {
            match self.tree.parent(cur) {
                Some(p) if p == root => return Some(cur),
                Some(p) => cur = p,
                None => return None,
            }
        }
    }
}
