//! Field specifications: the per-row template items are built from.

use crate::value::Value;

/// Type name standing for "the template argument of the enclosing field".
pub const TEMPLATE: &str = "TEMPLATE";

/// Schema-derived description of one field.
///
/// Items own a mutable copy of their spec; array elements rewrite `arg`,
/// `arr1` and the flags of their copy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub type_name: String,
    /// Template argument, or [`TEMPLATE`] to forward the parent's.
    pub template: String,
    pub arg: String,
    pub arr1: String,
    pub arr2: String,
    pub cond: String,
    /// First version the field exists in; 0 for unbounded.
    pub ver1: u32,
    /// Last version the field exists in; 0 for unbounded.
    pub ver2: u32,
    pub vercond: String,
    pub is_abstract: bool,
    /// Array stored as one raw byte run.
    pub binary: bool,
    /// Type names a compound.
    pub compound: bool,
    pub array: bool,
    pub multi_array: bool,
    pub templated: bool,
    /// Always present; set on array elements.
    pub conditionless: bool,
    /// Default value text as declared.
    pub default: Option<String>,
    /// Default-constructed value with `default` applied.
    pub value: Value,
}

impl FieldSpec {
    /// Minimal spec used for synthetic items (root, header, blobs).
    pub fn named(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self { name: name.into(), type_name: type_name.into(), ..Default::default() }
    }

    /// Whether `v` lies in `[ver1, ver2]`, zero bounds being open.
    #[inline]
    pub fn in_version_range(&self, v: u32) -> bool {
        (self.ver1 == 0 || self.ver1 <= v) && (self.ver2 == 0 || v <= self.ver2)
    }

    /// Set the array dimension and keep the array flag in step.
    pub fn set_arr1(&mut self, arr1: impl Into<String>) {
        self.arr1 = arr1.into();
        self.array = !self.arr1.is_empty();
    }
}
