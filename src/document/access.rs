//! Typed item access and string table handling.

use super::{ChangeEvent, Document};
use crate::model::{Item, ItemId};
use crate::util::V20_1_0_3;
use crate::value::{FromValue, IntoValue, Value, ValueKind};

impl Document {
    #[inline]
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.tree.get(id)
    }

    pub fn name_of(&self, id: ItemId) -> &str {
        self.tree.get(id).map_or("", Item::name)
    }

    pub fn type_name_of(&self, id: ItemId) -> &str {
        self.tree.get(id).map_or("", Item::type_name)
    }

    pub fn template_of(&self, id: ItemId) -> &str {
        self.tree.get(id).map_or("", Item::template)
    }

    pub fn arg_of(&self, id: ItemId) -> &str {
        self.tree.get(id).map_or("", Item::arg)
    }

    pub fn arr1_of(&self, id: ItemId) -> &str {
        self.tree.get(id).map_or("", Item::arr1)
    }

    pub fn arr2_of(&self, id: ItemId) -> &str {
        self.tree.get(id).map_or("", Item::arr2)
    }

    pub fn cond_of(&self, id: ItemId) -> &str {
        self.tree.get(id).map_or("", Item::cond)
    }

    pub fn value(&self, id: ItemId) -> Option<&Value> {
        self.tree.get(id).map(Item::value)
    }

    /// Raw value access; no notification, no link refresh.
    pub(crate) fn value_mut(&mut self, id: ItemId) -> Option<&mut Value> {
        self.tree.get_mut(id).map(Item::value_mut)
    }

    /// Value at `path`; `T::default()` when absent or of another kind.
    pub fn get<T: FromValue + Default>(&self, parent: ItemId, path: &str) -> T {
        self.try_get(parent, path).unwrap_or_default()
    }

    pub fn try_get<T: FromValue>(&self, parent: ItemId, path: &str) -> Option<T> {
        self.get_item(parent, path).and_then(|id| self.value(id)).and_then(T::from_value)
    }

    /// Store `v` at `path`. False when the item is absent or the kind does not fit.
    pub fn set<T: IntoValue>(&mut self, parent: ItemId, path: &str, v: T) -> bool {
        match self.get_item(parent, path) {
            Some(id) => self.set_value(id, v),
            None => false,
        }
    }

    /// Store `v` in the item and notify.
    pub fn set_value<T: IntoValue>(&mut self, id: ItemId, v: T) -> bool {
        let Some(value) = self.value_mut(id) else { return false };
        if !value.set(v) {
            return false;
        }
        let is_link = value.is_link();
        self.emit(ChangeEvent::DataChanged { first: id, last: id });
        if is_link && self.top_level(id) != Some(self.footer()) {
            self.links_changed();
        }
        true
    }

    /// Element values of the array at `path`.
    pub fn get_array<T: FromValue + Default>(&self, parent: ItemId, path: &str) -> Vec<T> {
        let Some(array) = self.get_item(parent, path) else { return Vec::new() };
        self.tree
            .children(array)
            .iter()
            .map(|c| self.value(*c).and_then(T::from_value).unwrap_or_default())
            .collect()
    }

    /// Fill the array at `path` from `values`; the array keeps its size.
    pub fn set_array<T: IntoValue + Clone>(&mut self, parent: ItemId, path: &str, values: &[T]) -> bool {
        match self.get_item(parent, path) {
            Some(array) => self.set_array_items(array, values),
            None => false,
        }
    }

    /// Fill the elements of `array` in order. True when every value fit.
    pub fn set_array_items<T: IntoValue + Clone>(&mut self, array: ItemId, values: &[T]) -> bool {
        let kids = self.tree.children(array).to_vec();
        let mut all = kids.len() == values.len();
        let mut links = false;
        for (c, v) in kids.iter().zip(values) {
            let Some(value) = self.value_mut(*c) else {
                all = false;
                continue;
            };
            if value.set(v.clone()) {
                links |= value.is_link();
            } else {
                all = false;
            }
        }
        let n = kids.len().min(values.len());
        if n > 0 {
            self.emit(ChangeEvent::DataChanged { first: kids[0], last: kids[n - 1] });
        }
        if links && self.top_level(array) != Some(self.footer()) {
            self.links_changed();
        }
        all
    }

    fn header_strings(&self) -> Option<ItemId> {
        self.get_item(self.header(), "Strings")
    }

    /// Entry of the header string table; empty for -1 or out of range.
    pub fn header_string_at(&self, index: u32) -> String {
        if index == u32::MAX {
            return String::new();
        }
        self.header_strings()
            .and_then(|s| self.tree.child(s, index as usize))
            .and_then(|c| self.value(c))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_default()
    }

    /// Text of an item, resolving string table indices.
    ///
    /// Compound strings (`Index` / `String` members) are looked through.
    pub fn get_string(&self, id: ItemId) -> String {
        let Some(item) = self.tree.get(id) else { return String::new() };
        let value = item.value();
        match value.kind() {
            ValueKind::StringIndex => self.header_string_at(value.to_count()),
            ValueKind::None if item.child_count() > 0 => {
                let member = if self.version >= V20_1_0_3 { "Index" } else { "String" };
                self.get_item(id, member).map(|m| self.get_string(m)).unwrap_or_default()
            }
            _ => match value.as_str() {
                Some(s) => s.to_owned(),
                None => value.to_string(),
            },
        }
    }

    pub fn get_string_at(&self, parent: ItemId, path: &str) -> String {
        self.get_item(parent, path).map(|id| self.get_string(id)).unwrap_or_default()
    }

    /// Set the text at `path`, interning into the header table in index mode.
    pub fn set_string(&mut self, parent: ItemId, path: &str, s: &str) -> bool {
        match self.get_item(parent, path) {
            Some(id) => self.assign_string(id, s),
            None => false,
        }
    }

    pub fn assign_string(&mut self, id: ItemId, s: &str) -> bool {
        let Some(item) = self.tree.get(id) else { return false };
        match item.value().kind() {
            ValueKind::StringIndex => {
                let index = self.intern_string(s);
                self.set_value(id, index)
            }
            ValueKind::None if item.child_count() > 0 => {
                let member = if self.version >= V20_1_0_3 { "Index" } else { "String" };
                match self.get_item(id, member) {
                    Some(m) => self.assign_string(m, s),
                    None => false,
                }
            }
            _ => self.set_value(id, s),
        }
    }

    /// Index of `s` in the header table, appending it when new. -1 for "".
    fn intern_string(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return u32::MAX;
        }
        let Some(strings) = self.header_strings() else { return u32::MAX };
        let existing = self
            .tree
            .children(strings)
            .iter()
            .position(|c| self.value(*c).and_then(Value::as_str) == Some(s));
        if let Some(i) = existing {
            return i as u32;
        }

        let header = self.header();
        let n = self.tree.child_count(strings) as u32;
        self.set(header, "Num Strings", n + 1);
        if let Err(e) = self.update_array(strings) {
            tracing::warn!("string table: {e}");
            return u32::MAX;
        }
        match self.tree.child(strings, n as usize) {
            Some(c) if self.set_value(c, s) => n,
            _ => u32::MAX,
        }
    }
}
