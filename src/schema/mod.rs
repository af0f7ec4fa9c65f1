//! Schema registry: the declarative description of every NIF type.
//!
//! A [`Schema`] is built once from a [`SchemaSource`] (JSON) and is immutable
//! afterwards. Documents hold it through an `Arc`; [`registry`] offers a
//! process-wide slot for hosts that want one shared instance.
//!
//! Four kinds of names live in a schema:
//!
//! - **basic types** - aliases of a [`ValueKind`], enums and bit flags included
//! - **compounds** - ordered field lists
//! - **blocks** - compounds with an ancestor list; fields of all ancestors
//!   come first
//! - **ancestors** - abstract blocks, never instantiated on their own

mod field;
pub mod registry;
mod source;
mod validate;

pub use field::{FieldSpec, TEMPLATE};
pub use source::{
    BasicDecl, BlockDecl, CompoundDecl, EnumDecl, FieldDecl, Inherit, OptionDecl, SchemaSource,
};

use std::collections::{HashMap, HashSet};
use std::path::Path;

use smallvec::SmallVec;

use crate::expr::precedence::PrecedenceWarning;
use crate::util::{version_to_number, Error, Result};
use crate::value::{Value, ValueKind, BUILTIN_TYPES};

/// A compound or block type.
#[derive(Clone, Debug, Default)]
pub struct TypeDef {
    pub name: String,
    /// Declared ancestors, in order. Empty for compounds.
    pub ancestors: Vec<String>,
    pub is_abstract: bool,
    pub fields: Vec<FieldSpec>,
}

/// How a basic type's values are best shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayHint {
    #[default]
    Plain,
    Enum,
    BitFlags,
}

/// Options of an enum or bit-flag type.
#[derive(Clone, Debug, Default)]
pub struct EnumInfo {
    pub storage: ValueKind,
    pub bitflags: bool,
    /// `(name, value)`; for bit flags the value is the bit position.
    pub options: Vec<(String, u32)>,
}

/// The loaded, validated type registry.
#[derive(Debug, Default)]
pub struct Schema {
    versions: Vec<u32>,
    basic: HashMap<String, ValueKind>,
    enums: HashMap<String, EnumInfo>,
    compounds: HashMap<String, TypeDef>,
    blocks: HashMap<String, TypeDef>,
    /// Declaration order of blocks, for listings.
    block_order: Vec<String>,
    precedence_warnings: Vec<PrecedenceWarning>,
}

/// Parse a `0x` hex or decimal integer.
fn parse_option_value(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse::<i64>().ok().map(|v| v as u32),
    }
}

fn parse_version(s: &str, what: &str) -> Result<u32> {
    if s.trim().is_empty() {
        return Ok(0);
    }
    match version_to_number(s) {
        0 => Err(Error::schema(format!("{what}: invalid version {s:?}"))),
        v => Ok(v),
    }
}

impl Schema {
    /// Build and validate a schema.
    pub fn load(source: &SchemaSource) -> Result<Self> {
        let mut schema = Schema {
            basic: BUILTIN_TYPES.iter().map(|(n, k)| ((*n).to_owned(), *k)).collect(),
            ..Default::default()
        };

        for v in &source.versions {
            schema.versions.push(parse_version(v, "versions")?);
        }

        let mut declared = HashSet::new();
        let mut declare = |name: &str| -> Result<()> {
            if name.is_empty() {
                return Err(Error::schema("declaration without a name"));
            }
            if !declared.insert(name.to_owned()) {
                return Err(Error::schema(format!("duplicate declaration of {name:?}")));
            }
            Ok(())
        };

        for b in &source.basic {
            declare(&b.name)?;
            let kind = match ValueKind::from_variant_name(&b.kind) {
                ValueKind::None => ValueKind::from_name(&b.kind),
                k => k,
            };
            if !kind.is_valid() {
                return Err(Error::schema(format!(
                    "basic type {:?} has unknown kind {:?}",
                    b.name, b.kind
                )));
            }
            schema.basic.insert(b.name.clone(), kind);
        }

        for e in &source.enums {
            declare(&e.name)?;
            let storage = schema.basic_kind(&e.storage).ok_or_else(|| {
                Error::schema(format!("enum {:?} has unknown storage {:?}", e.name, e.storage))
            })?;
            let mut options = Vec::with_capacity(e.options.len());
            for o in &e.options {
                let v = parse_option_value(&o.value).ok_or_else(|| {
                    Error::schema(format!(
                        "enum {:?} option {:?} has no integer value",
                        e.name, o.name
                    ))
                })?;
                options.push((o.name.clone(), v));
            }
            schema.basic.insert(e.name.clone(), storage);
            schema
                .enums
                .insert(e.name.clone(), EnumInfo { storage, bitflags: e.bitflags, options });
        }

        // Names first: field flags depend on which types are compounds.
        for c in &source.compounds {
            declare(&c.name)?;
            schema.compounds.insert(c.name.clone(), TypeDef { name: c.name.clone(), ..Default::default() });
        }
        for b in &source.blocks {
            declare(&b.name)?;
        }

        for c in &source.compounds {
            let fields = c
                .fields
                .iter()
                .map(|f| schema.field_from_decl(&c.name, f))
                .collect::<Result<Vec<_>>>()?;
            if let Some(def) = schema.compounds.get_mut(&c.name) {
                def.fields = fields;
            }
        }

        for b in &source.blocks {
            let fields = b
                .fields
                .iter()
                .map(|f| schema.field_from_decl(&b.name, f))
                .collect::<Result<Vec<_>>>()?;
            schema.block_order.push(b.name.clone());
            schema.blocks.insert(
                b.name.clone(),
                TypeDef {
                    name: b.name.clone(),
                    ancestors: b.inherit.names(),
                    is_abstract: b.is_abstract,
                    fields,
                },
            );
        }

        validate::check(&schema)?;
        schema.precedence_warnings = validate::audit_precedence(&schema);

        tracing::debug!(
            "schema loaded: {} blocks, {} compounds, {} enums, {} versions",
            schema.blocks.len(),
            schema.compounds.len(),
            schema.enums.len(),
            schema.versions.len()
        );
        Ok(schema)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::load(&SchemaSource::from_json(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(&SchemaSource::from_path(path)?)
    }

    fn field_from_decl(&self, owner: &str, d: &FieldDecl) -> Result<FieldSpec> {
        let what = format!("{owner}/{}", d.name);
        let mut vercond = d.vercond.clone();
        for (field, ver) in [("User Version", &d.userver), ("User Version 2", &d.userver2)] {
            if ver.is_empty() {
                continue;
            }
            // Grouped so the leftmost split keeps both tests whole.
            vercond = if vercond.is_empty() {
                format!("({field} == {ver})")
            } else {
                format!("({vercond}) && ({field} == {ver})")
            };
        }

        let kind = self.basic_kind(&d.type_name).unwrap_or(ValueKind::None);
        let mut value = Value::new(kind);
        if let Some(def) = d.default.as_deref().filter(|s| !s.is_empty()) {
            match self.enum_value(&d.type_name, def) {
                Some(v) => {
                    value.set_count(v);
                }
                None => {
                    if !value.from_string(def) {
                        tracing::debug!("{what}: default {def:?} not applicable to {kind}");
                    }
                }
            }
        }

        Ok(FieldSpec {
            name: d.name.clone(),
            type_name: d.type_name.clone(),
            template: d.template.clone(),
            arg: d.arg.clone(),
            arr1: d.arr1.clone(),
            arr2: d.arr2.clone(),
            cond: d.cond.clone(),
            ver1: parse_version(&d.ver1, &what)?,
            ver2: parse_version(&d.ver2, &what)?,
            vercond,
            is_abstract: d.is_abstract,
            binary: d.binary,
            compound: self.compounds.contains_key(&d.type_name),
            array: !d.arr1.is_empty(),
            multi_array: !d.arr2.is_empty(),
            templated: d.type_name == TEMPLATE || d.template == TEMPLATE,
            conditionless: false,
            default: d.default.clone(),
            value,
        })
    }

    /// Supported file versions; empty means "any".
    pub fn versions(&self) -> &[u32] {
        &self.versions
    }

    pub fn is_version_supported(&self, v: u32) -> bool {
        self.versions.is_empty() || self.versions.contains(&v)
    }

    /// Non-abstract block type.
    pub fn is_block(&self, name: &str) -> bool {
        self.blocks.get(name).is_some_and(|b| !b.is_abstract)
    }

    /// Abstract block type.
    pub fn is_ancestor(&self, name: &str) -> bool {
        self.blocks.get(name).is_some_and(|b| b.is_abstract)
    }

    pub fn is_ancestor_or_block(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    pub fn is_compound(&self, name: &str) -> bool {
        self.compounds.contains_key(name)
    }

    pub fn is_basic_type(&self, name: &str) -> bool {
        self.basic.contains_key(name)
    }

    /// Value kind of a basic, enum or built-in type.
    pub fn basic_kind(&self, name: &str) -> Option<ValueKind> {
        self.basic.get(name).copied()
    }

    pub fn compound(&self, name: &str) -> Option<&TypeDef> {
        self.compounds.get(name)
    }

    /// Block or ancestor definition.
    pub fn block(&self, name: &str) -> Option<&TypeDef> {
        self.blocks.get(name)
    }

    /// Block and ancestor names in declaration order.
    pub fn block_names(&self) -> impl Iterator<Item = &str> {
        self.block_order.iter().map(String::as_str)
    }

    pub fn compound_names(&self) -> impl Iterator<Item = &str> {
        self.compounds.keys().map(String::as_str)
    }

    pub fn enum_info(&self, name: &str) -> Option<&EnumInfo> {
        self.enums.get(name)
    }

    pub fn display_hint(&self, name: &str) -> DisplayHint {
        match self.enums.get(name) {
            Some(e) if e.bitflags => DisplayHint::BitFlags,
            Some(_) => DisplayHint::Enum,
            None => DisplayHint::Plain,
        }
    }

    /// Option name for `value`. Bit flags give the set options joined by `|`.
    pub fn enum_option(&self, type_name: &str, value: u32) -> Option<String> {
        let e = self.enums.get(type_name)?;
        if e.bitflags {
            let names: Vec<&str> = e
                .options
                .iter()
                .filter(|(_, bit)| *bit < 32 && value & (1 << bit) != 0)
                .map(|(n, _)| n.as_str())
                .collect();
            return Some(names.join(" | "));
        }
        e.options.iter().find(|(_, v)| *v == value).map(|(n, _)| n.clone())
    }

    /// Value of an option name. Bit flags accept `A | B`.
    pub fn enum_value(&self, type_name: &str, option: &str) -> Option<u32> {
        let e = self.enums.get(type_name)?;
        let lookup = |name: &str| e.options.iter().find(|(n, _)| n == name).map(|(_, v)| *v);
        if e.bitflags {
            let mut v = 0u32;
            for part in option.split('|').map(str::trim).filter(|p| !p.is_empty()) {
                v |= 1u32.checked_shl(lookup(part)?).unwrap_or(0);
            }
            return Some(v);
        }
        lookup(option.trim())
    }

    /// True when `block` is `ancestor` or derives from it.
    pub fn inherits(&self, block: &str, ancestor: &str) -> bool {
        if block == ancestor {
            return true;
        }
        let mut stack: SmallVec<[&str; 8]> = SmallVec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        stack.push(block);
        while let Some(name) = stack.pop() {
            if !seen.insert(name) {
                continue;
            }
            let Some(def) = self.blocks.get(name) else { continue };
            for a in &def.ancestors {
                if a == ancestor {
                    return true;
                }
                stack.push(a.as_str());
            }
        }
        false
    }

    /// Conditions whose leftmost-split and conventional readings differ.
    pub fn precedence_warnings(&self) -> &[PrecedenceWarning] {
        &self.precedence_warnings
    }

    pub(crate) fn compounds_iter(&self) -> impl Iterator<Item = &TypeDef> {
        self.compounds.values()
    }

    pub(crate) fn blocks_iter(&self) -> impl Iterator<Item = &TypeDef> {
        self.block_order.iter().filter_map(|n| self.blocks.get(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = r#"{
        "versions": ["4.0.0.2", "20.0.0.5"],
        "basic": [{ "name": "MyInt", "kind": "UInt" }],
        "enums": [
            { "name": "AlphaFormat", "storage": "uint",
              "options": [{ "name": "ALPHA_NONE", "value": "0" },
                          { "name": "ALPHA_BINARY", "value": "1" }] },
            { "name": "Caps", "storage": "ushort", "bitflags": true,
              "options": [{ "name": "A", "value": "0" }, { "name": "B", "value": "3" }] }
        ],
        "compounds": [
            { "name": "Pair", "fields": [{ "name": "X", "type": "float" },
                                          { "name": "Y", "type": "float" }] }
        ],
        "blocks": [
            { "name": "NiObject", "abstract": true },
            { "name": "NiObjectNET", "abstract": true, "inherit": "NiObject",
              "fields": [{ "name": "Name", "type": "string" }] },
            { "name": "NiAVObject", "abstract": true, "inherit": ["NiObjectNET"],
              "fields": [{ "name": "Flags", "type": "ushort", "default": "8" },
                         { "name": "Format", "type": "AlphaFormat", "default": "ALPHA_BINARY",
                           "userver": "11", "vercond": "Version >= 20.0.0.5" }] },
            { "name": "NiNode", "inherit": "NiAVObject",
              "fields": [{ "name": "P", "type": "Pair", "ver1": "10.0.1.0" }] }
        ]
    }"#;

    #[test]
    fn test_load_and_query() {
        let s = Schema::from_json(SRC).unwrap();
        assert!(s.is_block("NiNode"));
        assert!(!s.is_block("NiObject"));
        assert!(s.is_ancestor("NiAVObject"));
        assert!(s.is_ancestor_or_block("NiNode"));
        assert!(s.is_compound("Pair"));
        assert!(s.is_basic_type("MyInt"));
        assert_eq!(s.basic_kind("AlphaFormat"), Some(ValueKind::UInt));
        assert_eq!(s.basic_kind("Ref"), Some(ValueKind::Link));
        assert!(s.is_version_supported(0x04000002));
        assert!(!s.is_version_supported(0x14010003));
    }

    #[test]
    fn test_inherits() {
        let s = Schema::from_json(SRC).unwrap();
        assert!(s.inherits("NiNode", "NiNode"));
        assert!(s.inherits("NiNode", "NiObject"));
        assert!(s.inherits("NiNode", "NiObjectNET"));
        assert!(!s.inherits("NiObject", "NiNode"));
    }

    #[test]
    fn test_field_flags() {
        let s = Schema::from_json(SRC).unwrap();
        let av = s.block("NiAVObject").unwrap();
        assert_eq!(av.fields[0].value.to_count(), 8);
        assert_eq!(av.fields[1].value.to_count(), 1);
        assert_eq!(av.fields[1].vercond, "(Version >= 20.0.0.5) && (User Version == 11)");
        let node = s.block("NiNode").unwrap();
        assert!(node.fields[0].compound);
        assert_eq!(node.fields[0].ver1, 0x0A000100);
    }

    #[test]
    fn test_user_version_gate() {
        use crate::expr::{Expr, ExprValue};

        let s = Schema::from_json(SRC).unwrap();
        let cond = Expr::parse(&s.block("NiAVObject").unwrap().fields[1].vercond).unwrap();
        let header = |user: u32| {
            move |name: &str| match name {
                "Version" => ExprValue::UInt(0x14020007),
                "User Version" => ExprValue::UInt(user),
                _ => ExprValue::Null,
            }
        };
        assert!(!cond.evaluate_bool(&header(0)));
        assert!(cond.evaluate_bool(&header(11)));
        let old = |name: &str| match name {
            "Version" => ExprValue::UInt(0x0A000100),
            _ => ExprValue::UInt(11),
        };
        assert!(!cond.evaluate_bool(&old));
    }

    #[test]
    fn test_enums() {
        let s = Schema::from_json(SRC).unwrap();
        assert_eq!(s.display_hint("AlphaFormat"), DisplayHint::Enum);
        assert_eq!(s.display_hint("Caps"), DisplayHint::BitFlags);
        assert_eq!(s.display_hint("uint"), DisplayHint::Plain);
        assert_eq!(s.enum_option("AlphaFormat", 1).as_deref(), Some("ALPHA_BINARY"));
        assert_eq!(s.enum_value("AlphaFormat", "ALPHA_NONE"), Some(0));
        assert_eq!(s.enum_option("Caps", 0b1001).as_deref(), Some("A | B"));
        assert_eq!(s.enum_value("Caps", "A | B"), Some(0b1001));
    }
}
