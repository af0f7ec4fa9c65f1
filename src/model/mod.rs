//! Item tree arena.
//!
//! Every item of a document lives in one [`ItemTree`]. Items refer to each
//! other through [`ItemId`] indices; each item stores its parent and its row so
//! both can be read in constant time. Freed slots are reused.

mod item;

pub use item::Item;

use std::fmt;

use crate::schema::FieldSpec;

/// Index of an item in its tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) u32);

impl ItemId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena of items with a single root.
#[derive(Clone, Debug)]
pub struct ItemTree {
    slots: Vec<Option<Item>>,
    free: Vec<u32>,
    root: ItemId,
}

impl ItemTree {
    /// Tree holding only a root built from `spec`.
    pub fn new(spec: FieldSpec) -> Self {
        Self { slots: vec![Some(Item::new(spec))], free: Vec::new(), root: ItemId(0) }
    }

    #[inline]
    pub fn root(&self) -> ItemId {
        self.root
    }

    /// Number of live items, root included.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        self.get(id).and_then(Item::parent)
    }

    pub fn row(&self, id: ItemId) -> usize {
        self.get(id).map_or(0, Item::row)
    }

    pub fn children(&self, id: ItemId) -> &[ItemId] {
        self.get(id).map(Item::children).unwrap_or(&[])
    }

    pub fn child(&self, id: ItemId, row: usize) -> Option<ItemId> {
        self.children(id).get(row).copied()
    }

    pub fn child_count(&self, id: ItemId) -> usize {
        self.children(id).len()
    }

    pub fn name(&self, id: ItemId) -> &str {
        self.get(id).map_or("", Item::name)
    }

    /// First direct child called `name`, regardless of conditions.
    pub fn child_by_name(&self, id: ItemId, name: &str) -> Option<ItemId> {
        self.children(id).iter().copied().find(|c| self.name(*c) == name)
    }

    fn alloc(&mut self, item: Item) -> ItemId {
        match self.free.pop() {
            Some(i) => {
                self.slots[i as usize] = Some(item);
                ItemId(i)
            }
            None => {
                self.slots.push(Some(item));
                ItemId((self.slots.len() - 1) as u32)
            }
        }
    }

    fn renumber(&mut self, parent: ItemId, from: usize) {
        let kids: Vec<ItemId> = self.children(parent).get(from..).unwrap_or(&[]).to_vec();
        for (i, c) in kids.into_iter().enumerate() {
            if let Some(item) = self.get_mut(c) {
                item.row = from + i;
            }
        }
    }

    /// Insert a new child of `parent` at `at` (appended when `None` or past the end).
    pub fn insert(&mut self, parent: ItemId, spec: FieldSpec, at: Option<usize>) -> Option<ItemId> {
        let count = self.get(parent)?.child_count();
        let at = at.map_or(count, |a| a.min(count));
        let mut item = Item::new(spec);
        item.parent = Some(parent);
        item.row = at;
        let id = self.alloc(item);
        self.get_mut(parent)?.children.insert(at, id);
        self.renumber(parent, at + 1);
        Some(id)
    }

    /// Append a child of `parent`.
    pub fn push(&mut self, parent: ItemId, spec: FieldSpec) -> Option<ItemId> {
        self.insert(parent, spec, None)
    }

    fn free_subtree(&mut self, id: ItemId) {
        let mut stack = vec![id];
        while let Some(i) = stack.pop() {
            if let Some(item) = self.slots.get_mut(i.index()).and_then(Option::take) {
                stack.extend(item.children);
                self.free.push(i.0);
            }
        }
    }

    /// Remove `count` children of `parent` starting at `first`, with their subtrees.
    pub fn remove_children(&mut self, parent: ItemId, first: usize, count: usize) {
        let Some(p) = self.get_mut(parent) else { return };
        let end = (first + count).min(p.children.len());
        if first >= end {
            return;
        }
        let removed: Vec<ItemId> = p.children.drain(first..end).collect();
        for r in removed {
            self.free_subtree(r);
        }
        self.renumber(parent, first);
    }

    /// Remove one item (not the root) with its subtree.
    pub fn remove(&mut self, id: ItemId) {
        if id == self.root {
            return;
        }
        if let Some(parent) = self.parent(id) {
            let row = self.row(id);
            self.remove_children(parent, row, 1);
        }
    }

    /// Truncate `parent` to `len` children.
    pub fn truncate(&mut self, parent: ItemId, len: usize) {
        let count = self.child_count(parent);
        if len < count {
            self.remove_children(parent, len, count - len);
        }
    }

    /// Move the child at row `from` to row `to` within `parent`.
    pub fn move_child(&mut self, parent: ItemId, from: usize, to: usize) -> bool {
        let Some(p) = self.get_mut(parent) else { return false };
        if from >= p.children.len() || to >= p.children.len() {
            return false;
        }
        let id = p.children.remove(from);
        p.children.insert(to, id);
        self.renumber(parent, from.min(to));
        true
    }

    /// True when `ancestor` is `id` or lies above it.
    pub fn is_ancestor_of(&self, ancestor: ItemId, id: ItemId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.parent(c);
        }
        false
    }

    /// `id` and everything below it, depth first, in wire order.
    pub fn descendants(&self, id: ItemId) -> Vec<ItemId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(self.children(i).iter().rev().copied());
        }
        out
    }

    /// Names from the root's child down to `id`, joined by `/`.
    pub fn path(&self, id: ItemId) -> String {
        let mut parts = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == self.root {
                break;
            }
            parts.push(self.name(c));
            cur = self.parent(c);
        }
        parts.reverse();
        parts.join("/")
    }
}
