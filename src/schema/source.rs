//! Serde form of the schema description.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::util::Result;

/// Top-level schema document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSource {
    /// Supported file versions, as version strings.
    pub versions: Vec<String>,
    /// Named aliases of value kinds.
    pub basic: Vec<BasicDecl>,
    /// Enumerations and bit-flag sets.
    pub enums: Vec<EnumDecl>,
    /// Field groups without ancestry.
    pub compounds: Vec<CompoundDecl>,
    /// Block types; abstract ones act as ancestors only.
    pub blocks: Vec<BlockDecl>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BasicDecl {
    pub name: String,
    /// `ValueKind` variant name or a built-in type name.
    pub kind: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumDecl {
    pub name: String,
    /// Storage type name, e.g. `uint`.
    pub storage: String,
    /// Options are bit positions rather than values.
    pub bitflags: bool,
    pub options: Vec<OptionDecl>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OptionDecl {
    pub name: String,
    /// Decimal or `0x` hex integer.
    pub value: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompoundDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockDecl {
    pub name: String,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub inherit: Inherit,
    pub fields: Vec<FieldDecl>,
}

/// Ancestor list, written as one name or a list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Inherit {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl Inherit {
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::One(s) if s.is_empty() => Vec::new(),
            Self::One(s) => vec![s.clone()],
            Self::Many(v) => v.clone(),
        }
    }
}

/// One `<add>`-style field declaration. Only `name` and `type` are required.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub arg: String,
    #[serde(default)]
    pub arr1: String,
    #[serde(default)]
    pub arr2: String,
    #[serde(default)]
    pub cond: String,
    #[serde(default)]
    pub ver1: String,
    #[serde(default)]
    pub ver2: String,
    #[serde(default)]
    pub vercond: String,
    #[serde(default)]
    pub userver: String,
    #[serde(default)]
    pub userver2: String,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub default: Option<String>,
}

impl SchemaSource {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
