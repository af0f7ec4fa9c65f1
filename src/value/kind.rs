//! Value kinds - the closed set of field encodings.

use std::fmt;

/// Encoding kind of a [`Value`](super::Value).
///
/// The declaration order matters: every kind from `Bool` through `UInt` is a
/// *count* kind (usable as an array size or condition operand), and every kind
/// from `SizedString` through `Char8String` is a plain string kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ValueKind {
    Bool = 0,
    Byte,
    Word,
    Flags,
    StringOffset,
    StringIndex,
    BlockTypeIndex,
    Int,
    Short,
    ULittle32,
    Int64,
    UInt64,
    UInt,
    Link,
    UpLink,
    Float,
    SizedString,
    Text,
    ShortString,
    HeaderString,
    LineString,
    Char8String,
    Color3,
    Color4,
    Vector3,
    Quat,
    QuatXYZW,
    Matrix,
    Matrix4,
    Vector2,
    Vector4,
    Triangle,
    FileVersion,
    ByteArray,
    StringPalette,
    /// Generic string: inline before 20.1.0.3, a string table index after.
    String,
    /// Like `String`; kept apart for path-specific display.
    FilePath,
    ByteMatrix,
    Blob,
    Hfloat,
    HalfVector3,
    UshortVector3,
    ByteVector3,
    HalfVector2,
    ByteColor4,
    Normbyte,
    #[default]
    None = 0xff,
}

/// Built-in type names and the kinds they map to.
pub const BUILTIN_TYPES: &[(&str, ValueKind)] = &[
    ("bool", ValueKind::Bool),
    ("byte", ValueKind::Byte),
    ("char", ValueKind::Byte),
    ("word", ValueKind::Word),
    ("short", ValueKind::Short),
    ("int", ValueKind::Int),
    ("Flags", ValueKind::Flags),
    ("ushort", ValueKind::Word),
    ("uint", ValueKind::UInt),
    ("ulittle32", ValueKind::ULittle32),
    ("int64", ValueKind::Int64),
    ("uint64", ValueKind::UInt64),
    ("Ref", ValueKind::Link),
    ("Ptr", ValueKind::UpLink),
    ("float", ValueKind::Float),
    ("SizedString", ValueKind::SizedString),
    ("Text", ValueKind::Text),
    ("ShortString", ValueKind::ShortString),
    ("Color3", ValueKind::Color3),
    ("Color4", ValueKind::Color4),
    ("Vector4", ValueKind::Vector4),
    ("Vector3", ValueKind::Vector3),
    ("TBC", ValueKind::Vector3),
    ("Quaternion", ValueKind::Quat),
    ("QuaternionWXYZ", ValueKind::Quat),
    ("QuaternionXYZW", ValueKind::QuatXYZW),
    ("Matrix33", ValueKind::Matrix),
    ("Matrix44", ValueKind::Matrix4),
    ("Vector2", ValueKind::Vector2),
    ("TexCoord", ValueKind::Vector2),
    ("Triangle", ValueKind::Triangle),
    ("ByteArray", ValueKind::ByteArray),
    ("ByteMatrix", ValueKind::ByteMatrix),
    ("FileVersion", ValueKind::FileVersion),
    ("HeaderString", ValueKind::HeaderString),
    ("LineString", ValueKind::LineString),
    ("StringPalette", ValueKind::StringPalette),
    ("StringOffset", ValueKind::StringOffset),
    ("StringIndex", ValueKind::StringIndex),
    ("BlockTypeIndex", ValueKind::BlockTypeIndex),
    ("char8string", ValueKind::Char8String),
    ("string", ValueKind::String),
    ("FilePath", ValueKind::FilePath),
    ("blob", ValueKind::Blob),
    ("hfloat", ValueKind::Hfloat),
    ("HalfVector3", ValueKind::HalfVector3),
    ("UshortVector3", ValueKind::UshortVector3),
    ("ByteVector3", ValueKind::ByteVector3),
    ("HalfVector2", ValueKind::HalfVector2),
    ("HalfTexCoord", ValueKind::HalfVector2),
    ("ByteColor4", ValueKind::ByteColor4),
    ("normbyte", ValueKind::Normbyte),
];

impl ValueKind {
    /// Kind for a built-in type name; `None` when unknown.
    pub fn from_name(name: &str) -> Self {
        BUILTIN_TYPES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, k)| *k)
            .unwrap_or(Self::None)
    }

    /// Kind for its variant name as written in schema `basic` aliases.
    pub fn from_variant_name(name: &str) -> Self {
        (0u8..=Self::Normbyte as u8)
            .map(Self::from_u8)
            .find(|k| k.name() == name)
            .unwrap_or(Self::None)
    }

    /// Canonical variant name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Byte => "Byte",
            Self::Word => "Word",
            Self::Flags => "Flags",
            Self::StringOffset => "StringOffset",
            Self::StringIndex => "StringIndex",
            Self::BlockTypeIndex => "BlockTypeIndex",
            Self::Int => "Int",
            Self::Short => "Short",
            Self::ULittle32 => "ULittle32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::UInt => "UInt",
            Self::Link => "Link",
            Self::UpLink => "UpLink",
            Self::Float => "Float",
            Self::SizedString => "SizedString",
            Self::Text => "Text",
            Self::ShortString => "ShortString",
            Self::HeaderString => "HeaderString",
            Self::LineString => "LineString",
            Self::Char8String => "Char8String",
            Self::Color3 => "Color3",
            Self::Color4 => "Color4",
            Self::Vector3 => "Vector3",
            Self::Quat => "Quat",
            Self::QuatXYZW => "QuatXYZW",
            Self::Matrix => "Matrix",
            Self::Matrix4 => "Matrix4",
            Self::Vector2 => "Vector2",
            Self::Vector4 => "Vector4",
            Self::Triangle => "Triangle",
            Self::FileVersion => "FileVersion",
            Self::ByteArray => "ByteArray",
            Self::StringPalette => "StringPalette",
            Self::String => "String",
            Self::FilePath => "FilePath",
            Self::ByteMatrix => "ByteMatrix",
            Self::Blob => "Blob",
            Self::Hfloat => "Hfloat",
            Self::HalfVector3 => "HalfVector3",
            Self::UshortVector3 => "UshortVector3",
            Self::ByteVector3 => "ByteVector3",
            Self::HalfVector2 => "HalfVector2",
            Self::ByteColor4 => "ByteColor4",
            Self::Normbyte => "Normbyte",
            Self::None => "None",
        }
    }

    /// Convert from the `repr(u8)` discriminant.
    pub const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Bool,
            1 => Self::Byte,
            2 => Self::Word,
            3 => Self::Flags,
            4 => Self::StringOffset,
            5 => Self::StringIndex,
            6 => Self::BlockTypeIndex,
            7 => Self::Int,
            8 => Self::Short,
            9 => Self::ULittle32,
            10 => Self::Int64,
            11 => Self::UInt64,
            12 => Self::UInt,
            13 => Self::Link,
            14 => Self::UpLink,
            15 => Self::Float,
            16 => Self::SizedString,
            17 => Self::Text,
            18 => Self::ShortString,
            19 => Self::HeaderString,
            20 => Self::LineString,
            21 => Self::Char8String,
            22 => Self::Color3,
            23 => Self::Color4,
            24 => Self::Vector3,
            25 => Self::Quat,
            26 => Self::QuatXYZW,
            27 => Self::Matrix,
            28 => Self::Matrix4,
            29 => Self::Vector2,
            30 => Self::Vector4,
            31 => Self::Triangle,
            32 => Self::FileVersion,
            33 => Self::ByteArray,
            34 => Self::StringPalette,
            35 => Self::String,
            36 => Self::FilePath,
            37 => Self::ByteMatrix,
            38 => Self::Blob,
            39 => Self::Hfloat,
            40 => Self::HalfVector3,
            41 => Self::UshortVector3,
            42 => Self::ByteVector3,
            43 => Self::HalfVector2,
            44 => Self::ByteColor4,
            45 => Self::Normbyte,
            _ => Self::None,
        }
    }

    /// Integer-like kinds usable as counts and condition operands.
    #[inline]
    pub const fn is_count(self) -> bool {
        (self as u8) <= (Self::UInt as u8)
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Hfloat | Self::Normbyte)
    }

    /// Plain string kinds plus the generic string/path kinds.
    #[inline]
    pub const fn is_string(self) -> bool {
        let v = self as u8;
        (v >= Self::SizedString as u8 && v <= Self::Char8String as u8)
            || matches!(self, Self::String | Self::FilePath)
    }

    #[inline]
    pub const fn is_link(self) -> bool {
        matches!(self, Self::Link | Self::UpLink)
    }

    #[inline]
    pub const fn is_color(self) -> bool {
        matches!(self, Self::Color3 | Self::Color4 | Self::ByteColor4)
    }

    #[inline]
    pub const fn is_vector(self) -> bool {
        matches!(
            self,
            Self::Vector2
                | Self::Vector3
                | Self::Vector4
                | Self::HalfVector2
                | Self::HalfVector3
                | Self::UshortVector3
                | Self::ByteVector3
        )
    }

    #[inline]
    pub const fn is_matrix(self) -> bool {
        matches!(self, Self::Matrix | Self::Matrix4)
    }

    #[inline]
    pub const fn is_quat(self) -> bool {
        matches!(self, Self::Quat | Self::QuatXYZW)
    }

    /// Kinds whose payload is a byte buffer.
    #[inline]
    pub const fn is_byte_array(self) -> bool {
        matches!(self, Self::ByteArray | Self::StringPalette | Self::ByteMatrix | Self::Blob)
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        assert_eq!(ValueKind::from_name("uint"), ValueKind::UInt);
        assert_eq!(ValueKind::from_name("Ref"), ValueKind::Link);
        assert_eq!(ValueKind::from_name("QuaternionXYZW"), ValueKind::QuatXYZW);
        assert_eq!(ValueKind::from_name("NiNode"), ValueKind::None);
    }

    #[test]
    fn test_u8_roundtrip() {
        for v in 0u8..=45 {
            let k = ValueKind::from_u8(v);
            assert!(k.is_valid());
            assert_eq!(k as u8, v);
            assert_eq!(ValueKind::from_variant_name(k.name()), k);
        }
        assert_eq!(ValueKind::from_u8(200), ValueKind::None);
    }

    #[test]
    fn test_classes() {
        assert!(ValueKind::Bool.is_count());
        assert!(ValueKind::UInt.is_count());
        assert!(!ValueKind::Link.is_count());
        assert!(ValueKind::SizedString.is_string());
        assert!(ValueKind::Char8String.is_string());
        assert!(ValueKind::String.is_string());
        assert!(!ValueKind::Color3.is_string());
        assert!(ValueKind::UpLink.is_link());
    }
}
