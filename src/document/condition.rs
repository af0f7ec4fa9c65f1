//! Version and condition evaluation, path lookup, identifier resolution.

use super::Document;
use crate::expr::{Expr, ExprValue, Resolver};
use crate::model::ItemId;
use crate::util::Result;

/// Resolves condition identifiers relative to an item.
///
/// Lookup order: `ARG` climbs to the nearest ancestor argument; other names
/// are sibling fields (or `..`-relative paths); block type names test the
/// enclosing block's ancestry; anything else is 0.
pub struct ItemResolver<'a> {
    doc: &'a Document,
    item: ItemId,
}

impl<'a> ItemResolver<'a> {
    pub fn new(doc: &'a Document, item: ItemId) -> Self {
        Self { doc, item }
    }

    /// Nearest non-`ARG` argument above the item.
    fn argument(&self) -> ExprValue {
        let tree = self.doc.tree();
        let mut cur = self.item;
        loop {
            let Some(p) = tree.parent(cur) else { return ExprValue::UInt(0) };
            let arg = tree.get(p).map_or("", |i| i.arg());
            if arg.is_empty() {
                cur = p;
                continue;
            }
            if arg.bytes().all(|b| b.is_ascii_digit()) {
                return ExprValue::UInt(arg.parse().unwrap_or(0));
            }
            if arg == "ARG" {
                cur = p;
                continue;
            }
            // Argument names a field next to the item carrying it.
            return ItemResolver::new(self.doc, p).field(arg);
        }
    }

    fn field(&self, name: &str) -> ExprValue {
        let tree = self.doc.tree();
        let Some(parent) = tree.parent(self.item) else { return ExprValue::UInt(0) };
        let Some(found) = self.doc.get_item(parent, name) else {
            return self.block_test(name);
        };
        let Some(item) = tree.get(found) else { return ExprValue::UInt(0) };
        if self.doc.is_array(found) && item.child_count() > 0 && !item.value().is_valid() {
            // Per-row operand: pick the element matching our own row.
            let row = tree.row(self.item);
            return match tree.child(found, row).and_then(|c| tree.get(c)) {
                Some(elem) => scalar(elem.value()),
                None => ExprValue::UInt(0),
            };
        }
        scalar(item.value())
    }

    fn block_test(&self, name: &str) -> ExprValue {
        let schema = self.doc.schema();
        if !schema.is_ancestor_or_block(name) {
            return ExprValue::UInt(0);
        }
        let block = self
            .doc
            .top_level(self.item)
            .map_or("", |b| self.doc.tree().name(b));
        ExprValue::Bool(schema.inherits(block, name))
    }
}

fn scalar(v: &crate::value::Value) -> ExprValue {
    if v.is_count() || v.is_float() {
        ExprValue::UInt(v.to_count())
    } else if v.is_file_version() {
        ExprValue::UInt(v.to_file_version())
    } else {
        ExprValue::UInt(0)
    }
}

impl Resolver for ItemResolver<'_> {
    fn resolve(&self, ident: &str) -> ExprValue {
        if ident == "ARG" {
            return self.argument();
        }
        self.field(ident)
    }
}

/// Resolves version-condition identifiers against header fields only.
pub struct HeaderResolver<'a> {
    doc: &'a Document,
}

impl<'a> HeaderResolver<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }
}

impl Resolver for HeaderResolver<'_> {
    fn resolve(&self, ident: &str) -> ExprValue {
        let tree = self.doc.tree();
        match self.doc.get_item(self.doc.header(), ident).and_then(|i| tree.get(i)) {
            Some(item) => scalar(item.value()),
            None => ExprValue::UInt(0),
        }
    }
}

impl Document {
    fn evaluate_text<R: Resolver>(&self, id: ItemId, what: &str, text: &str, r: &R) -> bool {
        match Expr::parse(text) {
            Ok(e) => e.evaluate_bool(r),
            Err(err) => {
                tracing::warn!("{}: bad {what} {text:?}: {err}", self.tree.path(id));
                false
            }
        }
    }

    /// Whether the item exists in the document's version.
    pub fn eval_version(&self, id: ItemId, check_parents: bool) -> bool {
        if id == self.root() {
            return true;
        }
        let Some(item) = self.tree.get(id) else { return false };
        if check_parents {
            if let Some(p) = item.parent() {
                if !self.eval_version(p, true) {
                    return false;
                }
            }
        }
        if item.is_conditionless() {
            return true;
        }
        if !item.spec().in_version_range(self.version) {
            return false;
        }
        let vercond = item.vercond();
        vercond.is_empty()
            || self.evaluate_text(id, "vercond", vercond, &HeaderResolver::new(self))
    }

    /// Whether the item is present: its version holds and its condition is true.
    pub fn eval_condition(&self, id: ItemId, check_parents: bool) -> bool {
        if !self.eval_version(id, check_parents) {
            return false;
        }
        if id == self.root() {
            return true;
        }
        let Some(item) = self.tree.get(id) else { return false };
        if check_parents {
            if let Some(p) = item.parent() {
                if !self.eval_condition(p, true) {
                    return false;
                }
            }
        }
        if item.is_conditionless() {
            return true;
        }
        let cond = item.cond();
        cond.is_empty() || self.evaluate_text(id, "cond", cond, &ItemResolver::new(self, id))
    }

    /// Present in the file, ancestors included.
    #[inline]
    pub fn condition(&self, id: ItemId) -> bool {
        self.eval_condition(id, true)
    }

    fn present_child(&self, parent: ItemId, name: &str) -> Option<ItemId> {
        self.tree
            .children(parent)
            .iter()
            .copied()
            .find(|c| self.tree.name(*c) == name && self.eval_condition(*c, false))
    }

    /// Present item at `path` below `parent`.
    ///
    /// The whole path is tried as one name first; otherwise it is split at
    /// `/` or `\`, with `..` stepping up one level.
    pub fn get_item(&self, parent: ItemId, path: &str) -> Option<ItemId> {
        if path.is_empty() || !self.tree.contains(parent) {
            return None;
        }
        if let Some(c) = self.present_child(parent, path) {
            return Some(c);
        }
        let mut cur = parent;
        for part in path.split(['/', '\\']).filter(|p| !p.is_empty()) {
            cur = if part == ".." { self.tree.parent(cur)? } else { self.present_child(cur, part)? };
        }
        (cur != self.root() && cur != parent).then_some(cur)
    }

    /// Array item, or an element row of a two-dimensional array.
    pub fn is_array(&self, id: ItemId) -> bool {
        let Some(item) = self.tree.get(id) else { return false };
        item.is_array() || self.tree.parent(id).and_then(|p| self.tree.get(p)).is_some_and(|p| p.is_multi_array())
    }

    /// Element count the item's `arr1` expression asks for.
    pub fn array_size(&self, id: ItemId) -> Result<u32> {
        let Some(item) = self.tree.get(id) else { return Ok(0) };
        if !item.is_array() || item.arr1().is_empty() {
            return Ok(0);
        }
        let expr = Expr::parse(item.arr1())?;
        Ok(expr.evaluate_u32(&ItemResolver::new(self, id)))
    }
}
