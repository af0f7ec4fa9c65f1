//! Block link tables.
//!
//! `Ref` fields (kind `Link`) are child links and `Ptr` fields (kind `UpLink`)
//! parent links. Roots are blocks no other block refers to as a child.

use std::collections::HashMap;

use super::Document;
use crate::model::ItemId;
use crate::value::ValueKind;

#[derive(Clone, Debug, Default)]
pub(super) struct LinkTables {
    child: Vec<Vec<i32>>,
    parent: Vec<Vec<i32>>,
    roots: Vec<i32>,
}

impl Document {
    /// Blocks `n` refers to through `Ref` fields, in field order.
    pub fn child_links(&self, n: usize) -> &[i32] {
        self.links.child.get(n).map_or(&[], Vec::as_slice)
    }

    /// Blocks `n` refers to through `Ptr` fields.
    pub fn parent_links(&self, n: usize) -> &[i32] {
        self.links.parent.get(n).map_or(&[], Vec::as_slice)
    }

    pub fn root_links(&self) -> &[i32] {
        &self.links.roots
    }

    /// First block holding a child link to `n`.
    pub fn parent_block(&self, n: usize) -> Option<usize> {
        self.links.child.iter().position(|kids| kids.contains(&(n as i32)))
    }

    /// Rebuild the link tables, or mark them stale while batching.
    pub fn update_links(&mut self) {
        if self.notify.batching() {
            self.notify.pending.links = true;
        } else {
            self.refresh_links();
        }
    }

    fn collect_links(&self, id: ItemId, child: &mut Vec<i32>, parent: &mut Vec<i32>) {
        for &c in self.tree.children(id) {
            if !self.eval_condition(c, false) {
                continue;
            }
            if self.tree.child_count(c) > 0 {
                self.collect_links(c, child, parent);
                continue;
            }
            let Some(v) = self.value(c) else { continue };
            let l = v.to_link();
            if l < 0 {
                continue;
            }
            let list = if v.kind() == ValueKind::UpLink { &mut *parent } else { &mut *child };
            if !list.contains(&l) {
                list.push(l);
            }
        }
    }

    pub(super) fn refresh_links(&mut self) {
        let n = self.block_count();
        let mut child = vec![Vec::new(); n];
        let mut parent = vec![Vec::new(); n];
        for b in 0..n {
            if let Some(item) = self.block_item(b) {
                self.collect_links(item, &mut child[b], &mut parent[b]);
            }
        }
        remove_cycles(&mut child);

        let mut is_child = vec![false; n];
        for &l in child.iter().flatten() {
            if let Some(f) = is_child.get_mut(l as usize) {
                *f = true;
            }
        }
        self.links.roots = (0..n).filter(|b| !is_child[*b]).map(|b| b as i32).collect();
        self.links.child = child;
        self.links.parent = parent;
    }

    /// Link value at `path`; -1 when absent or not a link.
    pub fn get_link(&self, parent: ItemId, path: &str) -> i32 {
        self.get_item(parent, path).and_then(|id| self.value(id)).map_or(-1, |v| v.to_link())
    }

    pub fn set_link(&mut self, parent: ItemId, path: &str, link: i32) -> bool {
        match self.get_item(parent, path) {
            Some(id) if self.value(id).is_some_and(|v| v.is_link()) => self.set_value(id, link),
            _ => false,
        }
    }

    /// Links of a link array; empty when any element is not a link.
    pub fn get_link_array(&self, parent: ItemId, path: &str) -> Vec<i32> {
        let Some(array) = self.get_item(parent, path) else { return Vec::new() };
        let mut out = Vec::with_capacity(self.tree.child_count(array));
        for &c in self.tree.children(array) {
            match self.value(c) {
                Some(v) if v.is_link() => out.push(v.to_link()),
                _ => return Vec::new(),
            }
        }
        out
    }

    pub fn set_link_array(&mut self, parent: ItemId, path: &str, links: &[i32]) -> bool {
        let Some(array) = self.get_item(parent, path) else { return false };
        if self.tree.children(array).iter().any(|c| !self.value(*c).is_some_and(|v| v.is_link())) {
            return false;
        }
        self.set_array_items(array, links)
    }

    /// Visit every link value below `id`.
    fn for_each_link(&mut self, id: ItemId, f: &mut impl FnMut(i32) -> Option<i32>) {
        for c in self.tree.descendants(id) {
            let Some(v) = self.value_mut(c) else { continue };
            if !v.is_link() {
                continue;
            }
            if let Some(l) = f(v.to_link()) {
                v.set_link(l);
            }
        }
    }

    /// Shift links at or above `block` by `delta`; `delta == 0` nulls links to `block`.
    pub(super) fn adjust_links(&mut self, block: i32, delta: i32) {
        let root = self.root();
        self.for_each_link(root, &mut |l| {
            if l < 0 {
                None
            } else if delta == 0 {
                (l == block).then_some(-1)
            } else {
                (l >= block).then_some(l + delta)
            }
        });
    }

    /// Rewrite links through `map`; unmapped links stay.
    pub(super) fn map_links(&mut self, map: &HashMap<i32, i32>) {
        if map.is_empty() {
            return;
        }
        let root = self.root();
        self.for_each_link(root, &mut |l| map.get(&l).copied());
    }
}

/// Drop child links that close a cycle, keeping the first path found.
fn remove_cycles(child: &mut [Vec<i32>]) {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        White,
        Gray,
        Black,
    }

    let n = child.len();
    let mut mark = vec![Mark::White; n];
    for start in 0..n {
        if mark[start] != Mark::White {
            continue;
        }
        // (block, next edge index)
        let mut stack = vec![(start, 0usize)];
        mark[start] = Mark::Gray;
        while let Some(top) = stack.last_mut() {
            let (b, i) = *top;
            let Some(l) = child[b].get(i).copied() else {
                mark[b] = Mark::Black;
                stack.pop();
                continue;
            };
            let t = l as usize;
            if l < 0 || t >= n {
                top.1 += 1;
                continue;
            }
            match mark[t] {
                Mark::Gray => {
                    tracing::warn!("recursive link {b} -> {t} removed");
                    child[b].remove(i);
                }
                Mark::Black => top.1 += 1,
                Mark::White => {
                    top.1 += 1;
                    mark[t] = Mark::Gray;
                    stack.push((t, 0));
                }
            }
        }
    }
}
