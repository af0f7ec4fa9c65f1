//! A node of the item tree.

use super::ItemId;
use crate::schema::FieldSpec;
use crate::value::Value;

/// Live tree node: a private copy of its field spec plus a value.
///
/// Branches (compounds, arrays, blocks) carry a `None`-kind value.
#[derive(Clone, Debug)]
pub struct Item {
    pub(crate) spec: FieldSpec,
    pub(crate) value: Value,
    pub(crate) parent: Option<ItemId>,
    pub(crate) row: usize,
    pub(crate) children: Vec<ItemId>,
}

impl Item {
    /// Item from a spec; the spec's default value moves into the item.
    pub fn new(mut spec: FieldSpec) -> Self {
        let value = std::mem::take(&mut spec.value);
        Self { spec, value, parent: None, row: 0, children: Vec::new() }
    }

    #[inline]
    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    #[inline]
    pub fn spec_mut(&mut self) -> &mut FieldSpec {
        &mut self.spec
    }

    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[inline]
    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    #[inline]
    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    /// Position among the parent's children.
    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    #[inline]
    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    #[inline]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn type_name(&self) -> &str {
        &self.spec.type_name
    }

    pub fn template(&self) -> &str {
        &self.spec.template
    }

    pub fn arg(&self) -> &str {
        &self.spec.arg
    }

    pub fn arr1(&self) -> &str {
        &self.spec.arr1
    }

    pub fn arr2(&self) -> &str {
        &self.spec.arr2
    }

    pub fn cond(&self) -> &str {
        &self.spec.cond
    }

    pub fn vercond(&self) -> &str {
        &self.spec.vercond
    }

    pub fn ver1(&self) -> u32 {
        self.spec.ver1
    }

    pub fn ver2(&self) -> u32 {
        self.spec.ver2
    }

    pub fn is_array(&self) -> bool {
        self.spec.array
    }

    pub fn is_multi_array(&self) -> bool {
        self.spec.multi_array
    }

    pub fn is_binary(&self) -> bool {
        self.spec.binary
    }

    pub fn is_compound(&self) -> bool {
        self.spec.compound
    }

    pub fn is_templated(&self) -> bool {
        self.spec.templated
    }

    pub fn is_conditionless(&self) -> bool {
        self.spec.conditionless
    }

    pub fn is_abstract(&self) -> bool {
        self.spec.is_abstract
    }
}
