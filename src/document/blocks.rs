//! Block bookkeeping and header/footer refresh.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{ChangeEvent, Document, BLOCK_TYPE};
use crate::codec::size_of;
use crate::model::ItemId;
use crate::schema::{FieldSpec, Schema};
use crate::util::{V20_1_0_3, V20_2_0_0, V20_3_1_2};
use crate::value::IntoValue;

/// Block type carrying its usage and access in the type string.
const DATA_STREAM: &str = "NiDataStream";
const RTTI_SEPARATOR: char = '\x01';

/// Hash used in place of block type names by 20.3.1.2 files.
pub fn block_type_hash(name: &str) -> u32 {
    name.bytes().fold(0u32, |h, c| h.wrapping_mul(33).wrapping_add(c as u32))
}

/// Split `NiDataStream\x01usage\x01access` into the type and its arguments.
pub(super) fn split_rtti(name: &str) -> (&str, Option<(u32, u32)>) {
    let mut parts = name.split(RTTI_SEPARATOR);
    let base = parts.next().unwrap_or(name);
    if base != DATA_STREAM {
        return (base, None);
    }
    let mut arg = || parts.next().and_then(|p| p.parse::<u32>().ok()).unwrap_or(0);
    let usage = arg();
    let access = arg();
    (base, Some((usage, access)))
}

impl Document {
    /// Number of blocks (root rows minus header and footer).
    pub fn block_count(&self) -> usize {
        self.tree.child_count(self.root()).saturating_sub(2)
    }

    pub fn block_item(&self, n: usize) -> Option<ItemId> {
        (n < self.block_count()).then(|| self.tree.child(self.root(), n + 1)).flatten()
    }

    /// Block `n`, optionally only when its type inherits `filter`.
    pub fn block(&self, n: usize, filter: Option<&str>) -> Option<ItemId> {
        let id = self.block_item(n)?;
        match filter {
            Some(f) if !self.schema.inherits(self.tree.name(id), f) => None,
            _ => Some(id),
        }
    }

    /// Index of the block containing `id`.
    pub fn block_number(&self, id: ItemId) -> Option<usize> {
        let top = self.top_level(id)?;
        let row = self.tree.row(top);
        (row >= 1 && row <= self.block_count()).then(|| row - 1)
    }

    /// Whether the block containing `id` is (or derives from) `ancestor`.
    pub fn inherits_item(&self, id: ItemId, ancestor: &str) -> bool {
        self.block_number(id)
            .and_then(|n| self.block_item(n))
            .is_some_and(|b| self.schema.inherits(self.tree.name(b), ancestor))
    }

    fn insert_block_fields(&mut self, block: ItemId, schema: &Schema, name: &str, seen: &mut HashSet<String>) {
        if !seen.insert(name.to_owned()) {
            return;
        }
        let Some(def) = schema.block(name) else {
            tracing::warn!("unknown ancestor {name}");
            return;
        };
        for a in &def.ancestors {
            self.insert_block_fields(block, schema, a, seen);
        }
        for f in &def.fields {
            self.insert_type(block, f.clone(), None);
        }
    }

    /// Insert a new block of `type_name` at `at` (appended when `None` or past the end).
    ///
    /// Links to blocks at or after `at` shift up by one.
    pub fn insert_block(&mut self, type_name: &str, at: Option<usize>) -> Option<ItemId> {
        if !self.schema.is_block(type_name) {
            tracing::warn!("cannot insert unknown block type {type_name:?}");
            return None;
        }
        let count = self.block_count();
        let at = at.filter(|a| *a < count);
        if let Some(a) = at {
            self.adjust_links(a as i32, 1);
        }
        let row = at.map_or(count + 1, |a| a + 1);

        let mut spec = FieldSpec::named(type_name, BLOCK_TYPE);
        spec.conditionless = true;
        let root = self.root();
        let id = self.insert_branch(root, spec, Some(row))?;

        let schema = Arc::clone(&self.schema);
        self.insert_block_fields(id, &schema, type_name, &mut HashSet::new());

        self.emit(ChangeEvent::RowsInserted { parent: root, first: row, last: row });
        self.blocks_changed();
        Some(id)
    }

    /// Remove block `n`. Links to it become -1; later links shift down.
    pub fn remove_block(&mut self, n: usize) -> bool {
        let Some(id) = self.block_item(n) else { return false };
        self.adjust_links(n as i32, 0);
        self.adjust_links(n as i32, -1);
        self.tree.remove(id);
        let root = self.root();
        self.emit(ChangeEvent::RowsRemoved { parent: root, first: n + 1, last: n + 1 });
        self.blocks_changed();
        true
    }

    /// Move block `src` to position `dst`, rewriting links to follow.
    pub fn move_block(&mut self, src: usize, dst: usize) -> bool {
        let count = self.block_count();
        if src >= count || dst >= count {
            return false;
        }
        if src == dst {
            return true;
        }
        let mut map = HashMap::from([(src as i32, dst as i32)]);
        if src < dst {
            map.extend((src + 1..=dst).map(|i| (i as i32, i as i32 - 1)));
        } else {
            map.extend((dst..src).map(|i| (i as i32, i as i32 + 1)));
        }
        self.map_links(&map);
        let root = self.root();
        self.tree.move_child(root, src + 1, dst + 1);

        let (lo, hi) = (src.min(dst) + 1, src.max(dst) + 1);
        if let (Some(first), Some(last)) = (self.tree.child(root, lo), self.tree.child(root, hi)) {
            self.emit(ChangeEvent::DataChanged { first, last });
        }
        self.blocks_changed();
        true
    }

    /// Encoded size of everything below `id`.
    pub fn block_size(&self, id: ItemId) -> usize {
        let mut size = 0;
        for &c in self.tree.children(id) {
            let Some(item) = self.tree.get(c) else { continue };
            if item.is_abstract() || !self.eval_condition(c, false) {
                continue;
            }
            if item.child_count() > 0 || self.is_array(c) {
                size += self.block_size(c);
            } else {
                size += size_of(item.value(), &self.flags);
            }
        }
        size
    }

    /// Type string of a block as stored in the header.
    fn rtti_name(&self, block: ItemId) -> String {
        let name = self.tree.name(block);
        if name != DATA_STREAM {
            return name.to_owned();
        }
        let usage = self.get::<u32>(block, "Usage");
        let access = self.get::<u32>(block, "Access");
        format!("{DATA_STREAM}{RTTI_SEPARATOR}{usage}{RTTI_SEPARATOR}{access}")
    }

    /// Refresh header tables now, or after the current batch.
    pub fn update_header(&mut self) {
        if self.notify.batching() {
            self.notify.pending.header = true;
        } else {
            self.refresh_header();
        }
    }

    /// Resize a header array to its count field and fill it.
    fn fill_array<T: IntoValue + Clone>(&mut self, parent: ItemId, name: &str, values: &[T]) {
        let Some(array) = self.get_item(parent, name) else { return };
        if let Err(e) = self.update_array(array) {
            tracing::warn!("{name}: {e}");
            return;
        }
        self.set_array_items(array, values);
    }

    pub(super) fn refresh_header(&mut self) {
        let header = self.header();
        let n = self.block_count();

        let mut types: Vec<String> = Vec::new();
        let mut index: Vec<u32> = Vec::with_capacity(n);
        let mut sizes: Vec<u32> = Vec::new();
        let with_sizes = self.version >= V20_2_0_0 && self.get_item(header, "Block Size").is_some();
        for b in 0..n {
            let Some(block) = self.block_item(b) else { continue };
            let name = self.rtti_name(block);
            let i = match types.iter().position(|t| *t == name) {
                Some(i) => i,
                None => {
                    types.push(name);
                    types.len() - 1
                }
            };
            index.push(i as u32);
            if with_sizes {
                if let Err(e) = self.update_arrays(block) {
                    tracing::warn!("block {b}: {e}");
                }
                sizes.push(self.block_size(block) as u32);
            }
        }

        self.set(header, "Num Blocks", n as u32);
        self.set(header, "Num Block Types", types.len() as u32);
        self.fill_array(header, "Block Types", &types);
        if self.version == V20_3_1_2 {
            let hashes: Vec<u32> = types.iter().map(|t| block_type_hash(t)).collect();
            self.fill_array(header, "Block Type Hashes", &hashes);
        }
        self.fill_array(header, "Block Type Index", &index);
        if with_sizes {
            self.fill_array(header, "Block Size", &sizes);
        }

        if self.version >= V20_1_0_3 {
            let longest = self
                .get_array::<String>(header, "Strings")
                .iter()
                .map(|s| s.chars().count())
                .max()
                .unwrap_or(0);
            self.set(header, "Max String Length", longest as u32);
        }
    }

    /// Refresh footer roots now, or after the current batch.
    pub fn update_footer(&mut self) {
        if self.notify.batching() {
            self.notify.pending.footer = true;
        } else {
            self.refresh_footer();
        }
    }

    pub(super) fn refresh_footer(&mut self) {
        let footer = self.footer();
        let roots = self.root_links().to_vec();
        self.set(footer, "Num Roots", roots.len() as u32);
        self.fill_array(footer, "Roots", &roots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::doc_at;

    #[test]
    fn test_hash() {
        assert_eq!(block_type_hash(""), 0);
        assert_eq!(block_type_hash("A"), 65);
        assert_eq!(block_type_hash("AB"), 65 * 33 + 66);
    }

    #[test]
    fn test_split_rtti() {
        assert_eq!(split_rtti("NiNode"), ("NiNode", None));
        assert_eq!(split_rtti("NiDataStream\x014\x0112"), ("NiDataStream", Some((4, 12))));
    }

    #[test]
    fn test_block_queries() {
        let mut doc = doc_at("20.0.0.5");
        let node = doc.insert_block("NiNode", None).unwrap();
        let prop = doc.insert_block("NiAlphaProperty", None).unwrap();
        assert!(doc.insert_block("NiObject", None).is_none());
        assert!(doc.insert_block("Bogus", None).is_none());

        assert_eq!(doc.block_count(), 2);
        assert_eq!(doc.block_item(1), Some(prop));
        assert_eq!(doc.block_item(2), None);
        assert_eq!(doc.block(0, Some("NiAVObject")), Some(node));
        assert_eq!(doc.block(1, Some("NiAVObject")), None);
        assert_eq!(doc.block(1, Some("NiProperty")), Some(prop));
        let scale = doc.get_item(node, "Scale").unwrap();
        assert_eq!(doc.block_number(scale), Some(0));
        assert_eq!(doc.block_number(doc.header()), None);
        assert!(doc.inherits_item(scale, "NiObjectNET"));
    }

    #[test]
    fn test_ancestor_fields_first() {
        let mut doc = doc_at("20.0.0.5");
        let node = doc.insert_block("NiNode", None).unwrap();
        let names: Vec<&str> =
            doc.tree().children(node).iter().map(|c| doc.tree().name(*c)).collect();
        assert_eq!(names.first(), Some(&"Name"));
        let flags = names.iter().position(|n| *n == "Flags").unwrap();
        let kids = names.iter().position(|n| *n == "Num Children").unwrap();
        assert!(flags < kids);
    }

    #[test]
    fn test_header_tables() {
        let mut doc = doc_at("20.2.0.7");
        doc.insert_block("NiNode", None).unwrap();
        doc.insert_block("NiAlphaProperty", None).unwrap();
        doc.insert_block("NiNode", None).unwrap();
        let h = doc.header();
        assert_eq!(doc.get::<u32>(h, "Num Blocks"), 3);
        assert_eq!(doc.get::<u32>(h, "Num Block Types"), 2);
        assert_eq!(doc.get_array::<String>(h, "Block Types"), vec!["NiNode", "NiAlphaProperty"]);
        assert_eq!(doc.get_array::<u32>(h, "Block Type Index"), vec![0, 1, 0]);
        let sizes = doc.get_array::<u32>(h, "Block Size");
        assert_eq!(sizes.len(), 3);
        let b0 = doc.block_item(0).unwrap();
        assert_eq!(sizes[0] as usize, doc.block_size(b0));
    }

    #[test]
    fn test_move_block() {
        let mut doc = doc_at("20.0.0.5");
        let a = doc.insert_block("NiNode", None).unwrap();
        doc.insert_block("NiAlphaProperty", None).unwrap();
        doc.insert_block("NiNode", None).unwrap();
        doc.set(a, "Num Children", 2u32);
        doc.update_array_at(a, "Children").unwrap();
        doc.set_link_array(a, "Children", &[1, 2]);

        assert!(doc.move_block(0, 2));
        assert_eq!(doc.block_item(2), Some(a));
        assert_eq!(doc.get_link_array(a, "Children"), vec![0, 1]);
        assert_eq!(doc.get_array::<String>(doc.header(), "Block Types"), vec!["NiAlphaProperty", "NiNode"]);
        assert_eq!(doc.get_array::<u32>(doc.header(), "Block Type Index"), vec![0, 1, 1]);
        assert_eq!(doc.root_links(), &[2]);
        assert!(!doc.move_block(0, 3));
    }

    #[test]
    fn test_data_stream_rtti() {
        let mut doc = doc_at("20.2.0.7");
        let b = doc.insert_block("NiDataStream", None).unwrap();
        doc.batch(|doc| {
            doc.set(b, "Usage", 1u32);
            doc.set(b, "Access", 5u32);
            doc.update_header();
        });
        let types = doc.get_array::<String>(doc.header(), "Block Types");
        assert_eq!(types, vec!["NiDataStream\x011\x015"]);
    }
}
