//! Kind-checked conversions between [`Value`] and Rust types.

use super::{Payload, Value, ValueKind};
use crate::util::{ByteMatrix, Color3, Color4, Mat3, Mat4, Quat, Triangle, Vec2, Vec3, Vec4};

/// Read a Rust value out of a [`Value`] of a compatible kind.
pub trait FromValue: Sized {
    fn from_value(v: &Value) -> Option<Self>;
}

/// Store a Rust value into a [`Value`] of a compatible kind.
///
/// Returns `false` and leaves the value untouched on kind mismatch.
pub trait IntoValue {
    fn into_value(self, v: &mut Value) -> bool;
}

impl FromValue for u32 {
    fn from_value(v: &Value) -> Option<Self> {
        match v.data {
            Payload::U32(x) if v.kind().is_count() || v.is_file_version() => Some(x),
            Payload::U64(x) if v.kind().is_count() => Some(x as u32),
            _ => None,
        }
    }
}

impl IntoValue for u32 {
    fn into_value(self, v: &mut Value) -> bool {
        if v.is_file_version() {
            return v.set_file_version(self);
        }
        v.set_count(self)
    }
}

impl FromValue for i32 {
    fn from_value(v: &Value) -> Option<Self> {
        match (v.kind(), &v.data) {
            (ValueKind::Short, Payload::U32(x)) => Some(*x as u16 as i16 as i32),
            (ValueKind::Int | ValueKind::Link | ValueKind::UpLink, Payload::U32(x)) => {
                Some(*x as i32)
            }
            _ => None,
        }
    }
}

impl IntoValue for i32 {
    fn into_value(self, v: &mut Value) -> bool {
        match v.kind() {
            ValueKind::Link | ValueKind::UpLink => v.set_link(self),
            ValueKind::Int | ValueKind::Short => v.set_count(self as u32),
            _ => false,
        }
    }
}

impl FromValue for u64 {
    fn from_value(v: &Value) -> Option<Self> {
        match v.data {
            Payload::U64(x) => Some(x),
            Payload::U32(x) if v.kind().is_count() => Some(x as u64),
            _ => None,
        }
    }
}

impl IntoValue for u64 {
    fn into_value(self, v: &mut Value) -> bool {
        match v.data {
            Payload::U64(ref mut x) => {
                *x = self;
                true
            }
            _ => false,
        }
    }
}

impl FromValue for bool {
    fn from_value(v: &Value) -> Option<Self> {
        match v.data {
            Payload::U32(x) if v.kind() == ValueKind::Bool => Some(x != 0),
            _ => None,
        }
    }
}

impl IntoValue for bool {
    fn into_value(self, v: &mut Value) -> bool {
        v.kind() == ValueKind::Bool && v.set_count(self as u32)
    }
}

impl FromValue for f32 {
    fn from_value(v: &Value) -> Option<Self> {
        match v.data {
            Payload::F32(x) => Some(x),
            _ => None,
        }
    }
}

impl IntoValue for f32 {
    fn into_value(self, v: &mut Value) -> bool {
        v.set_float(self)
    }
}

impl FromValue for String {
    fn from_value(v: &Value) -> Option<Self> {
        v.as_str().map(str::to_owned)
    }
}

impl IntoValue for String {
    fn into_value(self, v: &mut Value) -> bool {
        match v.data {
            Payload::Text(ref mut s) => {
                *s = self;
                true
            }
            _ => false,
        }
    }
}

impl IntoValue for &str {
    fn into_value(self, v: &mut Value) -> bool {
        self.to_owned().into_value(v)
    }
}

impl FromValue for Vec<u8> {
    fn from_value(v: &Value) -> Option<Self> {
        v.as_bytes().map(<[u8]>::to_vec)
    }
}

impl IntoValue for Vec<u8> {
    fn into_value(self, v: &mut Value) -> bool {
        match v.data {
            Payload::Bytes(ref mut b) => *b = self,
            Payload::Palette { ref mut data, ref mut length } => {
                *length = self.len() as u32;
                *data = self;
            }
            _ => return false,
        }
        true
    }
}

/// Plain payload types that map one-to-one onto a payload variant.
macro_rules! payload_access {
    ($ty:ty, $variant:ident) => {
        impl FromValue for $ty {
            fn from_value(v: &Value) -> Option<Self> {
                match &v.data {
                    Payload::$variant(x) => Some(x.clone()),
                    _ => None,
                }
            }
        }

        impl IntoValue for $ty {
            fn into_value(self, v: &mut Value) -> bool {
                match v.data {
                    Payload::$variant(ref mut x) => {
                        *x = self;
                        true
                    }
                    _ => false,
                }
            }
        }
    };
}

payload_access!(Color3, Color3);
payload_access!(Color4, Color4);
payload_access!(Vec2, Vec2);
payload_access!(Vec3, Vec3);
payload_access!(Vec4, Vec4);
payload_access!(Quat, Quat);
payload_access!(Mat3, Mat3);
payload_access!(Mat4, Mat4);
payload_access!(Triangle, Triangle);
payload_access!(ByteMatrix, ByteMatrix);
