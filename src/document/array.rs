//! Type instantiation and array sizing.

use std::sync::Arc;

use super::{ChangeEvent, Document, State};
use crate::model::ItemId;
use crate::schema::{FieldSpec, TEMPLATE};
use crate::util::{Error, Result, V20_1_0_3};
use crate::value::{Value, ValueKind};

/// Largest element count an array may ask for.
pub const MAX_ARRAY_SIZE: usize = 8 * 1024 * 1024;

/// Make an element expression relative to the array item.
fn parent_prefix(s: &str) -> String {
    if s.is_empty() || s.bytes().all(|b| b.is_ascii_digit()) {
        s.to_owned()
    } else {
        format!("..\\{s}")
    }
}

impl Document {
    /// Default value of a basic type, with the declared default applied.
    fn default_value(&self, type_name: &str, default: Option<&str>) -> Value {
        let mut value = Value::new(self.schema.basic_kind(type_name).unwrap_or(ValueKind::None));
        if let Some(d) = default.filter(|d| !d.is_empty()) {
            match self.schema.enum_value(type_name, d) {
                Some(v) => {
                    value.set_count(v);
                }
                None => {
                    value.from_string(d);
                }
            }
        }
        value
    }

    /// Replace `TEMPLATE` in the spec with the nearest concrete template above `parent`.
    fn resolve_template(&self, parent: ItemId, spec: &mut FieldSpec) {
        if !spec.templated {
            return;
        }
        let mut cur = Some(parent);
        let mut found = None;
        while let Some(c) = cur {
            let t = self.tree.get(c).map_or("", |i| i.template());
            if !t.is_empty() && t != TEMPLATE {
                found = Some(t.to_owned());
                break;
            }
            cur = self.tree.parent(c);
        }
        let Some(t) = found else {
            tracing::debug!("{}: no template argument for {}", self.tree.path(parent), spec.name);
            return;
        };
        if spec.type_name == TEMPLATE {
            spec.value = self.default_value(&t, spec.default.as_deref());
            spec.type_name = t.clone();
        }
        if spec.template == TEMPLATE {
            spec.template = t;
        }
        spec.templated = false;
        spec.compound = self.schema.is_compound(&spec.type_name);
    }

    /// Insert a branch: a row without a value.
    pub(crate) fn insert_branch(&mut self, parent: ItemId, mut spec: FieldSpec, at: Option<usize>) -> Option<ItemId> {
        spec.value = Value::default();
        self.tree.insert(parent, spec, at)
    }

    /// Instantiate `spec` below `parent`: arrays, compounds and leaves.
    pub(crate) fn insert_type(&mut self, parent: ItemId, mut spec: FieldSpec, at: Option<usize>) -> Option<ItemId> {
        self.resolve_template(parent, &mut spec);

        if spec.array {
            let id = self.insert_branch(parent, spec, at)?;
            if self.eval_condition(id, false) {
                if let Err(e) = self.update_array(id) {
                    tracing::warn!("{}: {e}", self.tree.path(id));
                }
            }
            return Some(id);
        }

        if spec.compound {
            let schema = Arc::clone(&self.schema);
            let def = schema.compound(&spec.type_name)?;
            let id = self.insert_branch(parent, spec, at)?;
            for f in &def.fields {
                self.insert_type(id, f.clone(), None);
            }
            return Some(id);
        }

        if matches!(spec.value.kind(), ValueKind::String | ValueKind::FilePath) {
            let kind = if self.version < V20_1_0_3 {
                ValueKind::SizedString
            } else {
                ValueKind::StringIndex
            };
            spec.value.change_type(kind);
            if kind == ValueKind::StringIndex {
                spec.value.set_count(u32::MAX);
            }
        }
        self.tree.insert(parent, spec, at)
    }

    /// Spec for the elements of an array item.
    fn element_spec(&self, array: ItemId) -> Option<FieldSpec> {
        let a = self.tree.get(array)?.spec();
        let mut spec = FieldSpec {
            name: a.name.clone(),
            type_name: a.type_name.clone(),
            template: a.template.clone(),
            arg: parent_prefix(&a.arg),
            cond: String::new(),
            ver1: a.ver1,
            ver2: a.ver2,
            compound: a.compound,
            conditionless: true,
            default: a.default.clone(),
            value: self.default_value(&a.type_name, a.default.as_deref()),
            ..Default::default()
        };
        spec.set_arr1(parent_prefix(&a.arr2));
        Some(spec)
    }

    /// Resize an array item to its `arr1` size.
    pub fn update_array(&mut self, id: ItemId) -> Result<()> {
        let Some(item) = self.tree.get(id) else { return Ok(()) };
        if !item.is_array() || item.arr1().is_empty() {
            return Ok(());
        }
        let (binary, is_compound) = (item.is_binary(), item.is_compound());
        let link_type = self.schema.basic_kind(item.type_name()).is_some_and(ValueKind::is_link);
        let size = self.array_size(id)? as usize;

        if size > MAX_ARRAY_SIZE {
            return Err(Error::decode(
                self.tree.name(id).to_owned(),
                format!("array size {size} exceeds {MAX_ARRAY_SIZE}"),
            ));
        }
        if binary {
            self.update_byte_array(id, size);
            return Ok(());
        }

        let rows = self.tree.child_count(id);
        if size > rows {
            let Some(base) = self.element_spec(id) else { return Ok(()) };
            for i in rows..size {
                let mut spec = base.clone();
                spec.name = format!("{}[{i}]", base.name);
                self.insert_type(id, spec, None);
            }
            self.emit(ChangeEvent::RowsInserted { parent: id, first: rows, last: size - 1 });
        } else if size < rows {
            self.tree.truncate(id, size);
            self.emit(ChangeEvent::RowsRemoved { parent: id, first: size, last: rows - 1 });
        }

        if size != rows
            && self.state != State::Loading
            && (is_compound || link_type)
            && self.top_level(id) != Some(self.footer())
        {
            self.links_changed();
        }
        Ok(())
    }

    /// Resize the array at `path` below `parent`.
    pub fn update_array_at(&mut self, parent: ItemId, path: &str) -> Result<()> {
        match self.get_item(parent, path) {
            Some(id) => self.update_array(id),
            None => Err(Error::invalid(format!("no array {path:?} below {}", self.tree.path(parent)))),
        }
    }

    /// Binary arrays keep their elements as one blob.
    fn update_byte_array(&mut self, id: ItemId, size: usize) {
        let kids = self.tree.children(id).to_vec();
        let blob = match kids.as_slice() {
            [one] if self.value(*one).is_some_and(|v| v.kind() == ValueKind::Blob) => *one,
            _ => {
                let legacy: Vec<u8> =
                    kids.iter().filter_map(|c| self.value(*c)).map(|v| v.to_count() as u8).collect();
                self.tree.truncate(id, 0);
                let mut spec = FieldSpec::named(self.tree.name(id).to_owned(), "blob");
                spec.conditionless = true;
                spec.value = Value::new(ValueKind::Blob);
                spec.value.set(legacy);
                let Some(b) = self.tree.insert(id, spec, None) else { return };
                b
            }
        };
        if let Some(v) = self.value_mut(blob) {
            let mut bytes = v.get::<Vec<u8>>();
            if bytes.len() != size {
                bytes.resize(size, 0);
                v.set(bytes);
            }
        }
    }

    /// Resize every present array below `id`.
    pub fn update_arrays(&mut self, id: ItemId) -> Result<()> {
        let kids = self.tree.children(id).to_vec();
        for c in kids {
            if !self.eval_condition(c, false) {
                continue;
            }
            if self.tree.get(c).is_some_and(|i| i.is_array()) {
                self.update_array(c)?;
            }
            self.update_arrays(c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::doc_at;

    #[test]
    fn test_parent_prefix() {
        assert_eq!(parent_prefix(""), "");
        assert_eq!(parent_prefix("12"), "12");
        assert_eq!(parent_prefix("Strip Lengths"), "..\\Strip Lengths");
    }

    #[test]
    fn test_resize() {
        let mut doc = doc_at("20.0.0.5");
        let data = doc.insert_block("NiTriStripsData", None).unwrap();
        doc.set(data, "Num Vertices", 5u32);
        doc.set(data, "Has Vertices", true);
        let verts = doc.get_item(data, "Vertices").unwrap();
        doc.update_array(verts).unwrap();
        assert_eq!(doc.tree().child_count(verts), 5);
        let e = doc.tree().child(verts, 4).unwrap();
        assert_eq!(doc.tree().name(e), "Vertices[4]");
        assert_eq!(doc.value(e).unwrap().kind(), ValueKind::Vector3);

        doc.set(data, "Num Vertices", 2u32);
        doc.update_array(verts).unwrap();
        assert_eq!(doc.tree().child_count(verts), 2);
    }

    #[test]
    fn test_resize_twice_is_stable() {
        let mut doc = doc_at("20.0.0.5");
        let node = doc.insert_block("NiNode", None).unwrap();
        doc.set(node, "Num Children", 3u32);
        doc.update_array_at(node, "Children").unwrap();
        let kids = doc.get_item(node, "Children").unwrap();
        let first: Vec<_> = doc.tree().children(kids).to_vec();
        doc.update_array(kids).unwrap();
        assert_eq!(doc.tree().child_count(kids), 3);
        assert_eq!(doc.tree().children(kids), first.as_slice());
    }

    #[test]
    fn test_two_dimensional() {
        let mut doc = doc_at("20.0.0.5");
        let data = doc.insert_block("NiTriStripsData", None).unwrap();
        doc.set(data, "Num Strips", 2u32);
        doc.update_array_at(data, "Strip Lengths").unwrap();
        doc.set_array(data, "Strip Lengths", &[3u32, 1]);
        doc.update_arrays(data).unwrap();

        let points = doc.get_item(data, "Points").unwrap();
        assert_eq!(doc.tree().child_count(points), 2);
        let rows: Vec<usize> =
            doc.tree().children(points).iter().map(|r| doc.tree().child_count(*r)).collect();
        assert_eq!(rows, vec![3, 1]);
        let row0 = doc.tree().child(points, 0).unwrap();
        assert!(doc.is_array(row0));
        assert_eq!(doc.tree().name(doc.tree().child(row0, 2).unwrap()), "Points[0][2]");
    }

    #[test]
    fn test_argument() {
        let mut doc = doc_at("20.0.0.5");
        let b = doc.insert_block("NiIntegerData", None).unwrap();
        doc.set(b, "Count", 4u32);
        doc.update_arrays(b).unwrap();
        let list = doc.get_item(b, "List/Items").unwrap();
        assert_eq!(doc.tree().child_count(list), 4);
        let fixed = doc.get_item(b, "Fixed/Items").unwrap();
        assert_eq!(doc.tree().child_count(fixed), 2);
    }

    #[test]
    fn test_template() {
        let mut doc = doc_at("20.0.0.5");
        let b = doc.insert_block("NiFloatData", None).unwrap();
        doc.set(b, "Data/Num Keys", 2u32);
        doc.update_arrays(b).unwrap();
        let keys = doc.get_item(b, "Data/Keys").unwrap();
        assert_eq!(doc.type_name_of(keys), "Key");
        assert_eq!(doc.template_of(keys), "float");
        let value = doc.get_item(keys, "Keys[1]/Value").unwrap();
        assert_eq!(doc.type_name_of(value), "float");
        assert_eq!(doc.value(value).unwrap().kind(), ValueKind::Float);
    }

    #[test]
    fn test_binary_array() {
        let mut doc = doc_at("20.0.0.5");
        let b = doc.insert_block("NiPixelData", None).unwrap();
        doc.set(b, "Num Pixels", 6u32);
        let px = doc.get_item(b, "Pixels").unwrap();
        doc.update_array(px).unwrap();
        assert_eq!(doc.tree().child_count(px), 1);
        let blob = doc.tree().child(px, 0).unwrap();
        assert_eq!(doc.value(blob).unwrap().as_bytes().map(<[u8]>::len), Some(6));
    }

    #[test]
    fn test_oversized_array() {
        let mut doc = doc_at("20.0.0.5");
        let data = doc.insert_block("NiTriStripsData", None).unwrap();
        doc.set(data, "Num Strips", 9_000_000u32);
        assert!(matches!(
            doc.update_array_at(data, "Strip Lengths"),
            Err(Error::FieldDecode { .. })
        ));
    }

    #[test]
    fn test_oversized_binary_array() {
        let mut doc = doc_at("20.0.0.5");
        let b = doc.insert_block("NiPixelData", None).unwrap();
        doc.set(b, "Num Pixels", 9_000_000u32);
        let px = doc.get_item(b, "Pixels").unwrap();
        assert!(matches!(doc.update_array(px), Err(Error::FieldDecode { .. })));
        let held: usize = doc
            .tree()
            .children(px)
            .iter()
            .filter_map(|c| doc.value(*c).and_then(|v| v.as_bytes()))
            .map(<[u8]>::len)
            .sum();
        assert_eq!(held, 0);
    }

    #[test]
    fn test_string_retype() {
        let mut doc = doc_at("20.0.0.5");
        let b = doc.insert_block("NiNode", None).unwrap();
        assert_eq!(doc.value(doc.get_item(b, "Name").unwrap()).unwrap().kind(), ValueKind::SizedString);

        let mut doc = doc_at("20.2.0.7");
        let b = doc.insert_block("NiNode", None).unwrap();
        let name = doc.get_item(b, "Name").unwrap();
        assert_eq!(doc.value(name).unwrap().kind(), ValueKind::StringIndex);
        assert_eq!(doc.get_string(name), "");
    }
}
