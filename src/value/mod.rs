//! Dynamically typed field values.
//!
//! A [`Value`] pairs a [`ValueKind`] with a payload. The kind decides both the
//! wire encoding (see [`codec`](crate::codec)) and which typed accessors work:
//! `get::<T>()` on the wrong kind yields `T::default()` and `set::<T>()`
//! returns `false`.
//!
//! # Example
//!
//! ```
//! use nifcore::value::{Value, ValueKind};
//!
//! let mut v = Value::new(ValueKind::UInt);
//! assert!(v.set::<u32>(42));
//! assert_eq!(v.get::<u32>(), 42);
//! assert_eq!(v.get::<f32>(), 0.0); // wrong kind
//! ```

mod access;
mod kind;
mod text;

pub use access::{FromValue, IntoValue};
pub use kind::{ValueKind, BUILTIN_TYPES};

use crate::util::{ByteMatrix, Color3, Color4, Mat3, Mat4, Quat, Triangle, Vec2, Vec3, Vec4};

/// Storage behind a [`Value`]. Several kinds share one payload shape.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Payload {
    Empty,
    /// Count kinds, links, file versions. Signed kinds keep their bit pattern.
    U32(u32),
    U64(u64),
    F32(f32),
    Text(String),
    Color3(Color3),
    Color4(Color4),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Quat(Quat),
    Mat3(Mat3),
    Mat4(Mat4),
    Triangle(Triangle),
    Bytes(Vec<u8>),
    /// NUL-separated strings plus the trailing length word from the file.
    Palette { data: Vec<u8>, length: u32 },
    ByteMatrix(ByteMatrix),
}

impl Payload {
    /// Default payload for a kind.
    fn for_kind(kind: ValueKind) -> Self {
        use ValueKind as K;
        match kind {
            K::Int64 | K::UInt64 => Self::U64(0),
            k if k.is_count() => Self::U32(0),
            K::Link | K::UpLink => Self::U32(u32::MAX),
            K::FileVersion => Self::U32(0),
            K::Float | K::Hfloat | K::Normbyte => Self::F32(0.0),
            k if k.is_string() => Self::Text(String::new()),
            K::Color3 => Self::Color3(Color3::default()),
            K::Color4 | K::ByteColor4 => Self::Color4(Color4::default()),
            K::Vector2 | K::HalfVector2 => Self::Vec2(Vec2::ZERO),
            K::Vector3 | K::HalfVector3 | K::UshortVector3 | K::ByteVector3 => {
                Self::Vec3(Vec3::ZERO)
            }
            K::Vector4 => Self::Vec4(Vec4::ZERO),
            K::Quat | K::QuatXYZW => Self::Quat(Quat::IDENTITY),
            K::Matrix => Self::Mat3(Mat3::IDENTITY),
            K::Matrix4 => Self::Mat4(Mat4::IDENTITY),
            K::Triangle => Self::Triangle(Triangle::default()),
            K::ByteArray | K::Blob => Self::Bytes(Vec::new()),
            K::StringPalette => Self::Palette { data: Vec::new(), length: 0 },
            K::ByteMatrix => Self::ByteMatrix(ByteMatrix::default()),
            _ => Self::Empty,
        }
    }
}

/// A field value: kind tag plus payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    kind: ValueKind,
    pub(crate) data: Payload,
}

impl Default for Value {
    fn default() -> Self {
        Self { kind: ValueKind::None, data: Payload::Empty }
    }
}

impl Value {
    /// Default-constructed value of `kind`.
    pub fn new(kind: ValueKind) -> Self {
        Self { kind, data: Payload::for_kind(kind) }
    }

    #[inline]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Switch to `kind`, dropping the old payload. No-op when unchanged.
    pub fn change_type(&mut self, kind: ValueKind) {
        if self.kind != kind {
            self.kind = kind;
            self.data = Payload::for_kind(kind);
        }
    }

    /// Typed read; `T::default()` on kind mismatch.
    pub fn get<T: FromValue + Default>(&self) -> T {
        T::from_value(self).unwrap_or_default()
    }

    /// Typed read; `None` on kind mismatch.
    pub fn try_get<T: FromValue>(&self) -> Option<T> {
        T::from_value(self)
    }

    /// Typed write; `false` on kind mismatch.
    pub fn set<T: IntoValue>(&mut self, v: T) -> bool {
        v.into_value(self)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.kind.is_valid()
    }

    #[inline]
    pub fn is_count(&self) -> bool {
        self.kind.is_count()
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        self.kind.is_float()
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        self.kind.is_string()
    }

    #[inline]
    pub fn is_link(&self) -> bool {
        self.kind.is_link()
    }

    #[inline]
    pub fn is_file_version(&self) -> bool {
        self.kind == ValueKind::FileVersion
    }

    #[inline]
    pub fn is_color(&self) -> bool {
        self.kind.is_color()
    }

    #[inline]
    pub fn is_vector(&self) -> bool {
        self.kind.is_vector()
    }

    #[inline]
    pub fn is_matrix(&self) -> bool {
        self.kind.is_matrix()
    }

    #[inline]
    pub fn is_quat(&self) -> bool {
        self.kind.is_quat()
    }

    #[inline]
    pub fn is_byte_array(&self) -> bool {
        self.kind.is_byte_array()
    }

    /// Value as an unsigned count. Floats truncate; other kinds give 0.
    pub fn to_count(&self) -> u32 {
        match (&self.data, self.kind.is_count() || self.kind.is_float()) {
            (Payload::U32(v), true) => *v,
            (Payload::U64(v), true) => *v as u32,
            (Payload::F32(v), true) => *v as u32,
            _ => 0,
        }
    }

    /// Store a count, masked to the kind's width. Only count kinds accept it.
    pub fn set_count(&mut self, c: u32) -> bool {
        use ValueKind as K;
        if !self.kind.is_count() {
            return false;
        }
        self.data = match self.kind {
            K::Byte => Payload::U32(c & 0xff),
            K::Word | K::Short | K::Flags | K::BlockTypeIndex => Payload::U32(c & 0xffff),
            K::Int64 | K::UInt64 => Payload::U64(c as u64),
            _ => Payload::U32(c),
        };
        true
    }

    /// Value as a float; non-float kinds give 0.
    pub fn to_float(&self) -> f32 {
        match &self.data {
            Payload::F32(v) if self.kind.is_float() => *v,
            _ => 0.0,
        }
    }

    pub fn set_float(&mut self, f: f32) -> bool {
        if !self.kind.is_float() {
            return false;
        }
        self.data = Payload::F32(f);
        true
    }

    /// Block index a link points at; -1 for null links and non-link kinds.
    pub fn to_link(&self) -> i32 {
        match &self.data {
            Payload::U32(v) if self.kind.is_link() => *v as i32,
            _ => -1,
        }
    }

    pub fn set_link(&mut self, link: i32) -> bool {
        if !self.kind.is_link() {
            return false;
        }
        self.data = Payload::U32(link as u32);
        true
    }

    /// Packed file version; 0 for other kinds.
    pub fn to_file_version(&self) -> u32 {
        match &self.data {
            Payload::U32(v) if self.is_file_version() => *v,
            _ => 0,
        }
    }

    pub fn set_file_version(&mut self, v: u32) -> bool {
        if !self.is_file_version() {
            return false;
        }
        self.data = Payload::U32(v);
        true
    }

    /// Text of a string kind.
    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of a byte-buffer kind.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            Payload::Bytes(b) | Payload::Palette { data: b, .. } => Some(b),
            Payload::ByteMatrix(m) => Some(&m.data),
            _ => None,
        }
    }

    /// Strings of a palette, split at NUL.
    pub fn palette_strings(&self) -> Vec<String> {
        let Payload::Palette { data, .. } = &self.data else {
            return Vec::new();
        };
        let mut parts: Vec<String> = data.split(|b| *b == 0).map(latin1_to_string).collect();
        // Trailing NUL (or no data at all) leaves one empty tail.
        if data.last().map_or(true, |b| *b == 0) {
            parts.pop();
        }
        parts
    }
}

/// Decode Latin-1 bytes.
pub(crate) fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Encode to Latin-1; characters outside the range become `?`.
pub(crate) fn string_to_latin1(s: &str) -> Vec<u8> {
    s.chars().map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_resets_payload() {
        let mut v = Value::new(ValueKind::UInt);
        v.set_count(7);
        v.change_type(ValueKind::UInt);
        assert_eq!(v.to_count(), 7);
        v.change_type(ValueKind::SizedString);
        assert_eq!(v.as_str(), Some(""));
        v.change_type(ValueKind::Matrix);
        assert_eq!(v.get::<Mat3>(), Mat3::IDENTITY);
    }

    #[test]
    fn test_float_retype_round_trip() {
        let mut v = Value::new(ValueKind::Float);
        assert!(v.set(2.5f32));
        v.change_type(ValueKind::Vector3);
        assert_eq!(v.get::<crate::util::Vec3>(), crate::util::Vec3::ZERO);
        v.change_type(ValueKind::Float);
        assert_eq!(v.get::<f32>(), 0.0);
    }

    #[test]
    fn test_count_masking() {
        let mut v = Value::new(ValueKind::Byte);
        assert!(v.set_count(0x1ff));
        assert_eq!(v.to_count(), 0xff);
        let mut v = Value::new(ValueKind::Word);
        v.set_count(0x12345);
        assert_eq!(v.to_count(), 0x2345);
        let mut v = Value::new(ValueKind::Float);
        assert!(!v.set_count(3));
        v.set_float(3.7);
        assert_eq!(v.to_count(), 3);
    }

    #[test]
    fn test_links() {
        let mut v = Value::new(ValueKind::Link);
        assert_eq!(v.to_link(), -1);
        assert!(v.set_link(4));
        assert_eq!(v.to_link(), 4);
        assert_eq!(Value::new(ValueKind::UInt).to_link(), -1);
    }

    #[test]
    fn test_palette_strings() {
        let mut v = Value::new(ValueKind::StringPalette);
        v.data = Payload::Palette { data: b"abc\0de\0".to_vec(), length: 7 };
        assert_eq!(v.palette_strings(), vec!["abc".to_string(), "de".to_string()]);
    }

    #[test]
    fn test_latin1() {
        assert_eq!(latin1_to_string(&[0x41, 0xe9]), "A\u{e9}");
        assert_eq!(string_to_latin1("A\u{e9}\u{4e2d}"), vec![0x41, 0xe9, b'?']);
    }
}
