//! Encoded size prediction.

use super::writer::SHORT_STRING_MAX;
use super::StreamFlags;
use crate::value::{Payload, Value, ValueKind};

fn latin1_len(s: &str) -> usize {
    s.chars().count()
}

/// Number of bytes [`NifWriter::write`](super::NifWriter::write) emits for `value`.
pub fn size_of(value: &Value, flags: &StreamFlags) -> usize {
    use ValueKind as K;
    match (value.kind(), &value.data) {
        (K::Bool, _) => {
            if flags.bool32 {
                4
            } else {
                1
            }
        }
        (K::Byte | K::Normbyte, _) => 1,
        (K::Word | K::Short | K::Flags | K::BlockTypeIndex | K::Hfloat, _) => 2,
        (
            K::StringOffset
            | K::StringIndex
            | K::Int
            | K::UInt
            | K::ULittle32
            | K::Link
            | K::UpLink
            | K::Float
            | K::FileVersion,
            _,
        ) => 4,
        (K::Int64 | K::UInt64, _) => 8,
        (K::ByteVector3, _) => 3,
        (K::HalfVector3 | K::UshortVector3 | K::Triangle, _) => 6,
        (K::HalfVector2 | K::ByteColor4, _) => 4,
        (K::Vector2, _) => 8,
        (K::Vector3 | K::Color3, _) => 12,
        (K::Vector4 | K::Color4 | K::Quat | K::QuatXYZW, _) => 16,
        (K::Matrix, _) => 36,
        (K::Matrix4, _) => 64,
        (K::SizedString | K::Text, Payload::Text(s)) => 4 + latin1_len(s),
        (K::ShortString, Payload::Text(s)) => 1 + latin1_len(s).min(SHORT_STRING_MAX) + 1,
        (K::HeaderString | K::LineString, Payload::Text(s)) => latin1_len(s) + 1,
        (K::Char8String, _) => 8,
        (K::ByteArray, Payload::Bytes(b)) => 4 + b.len(),
        (K::StringPalette, Payload::Palette { data, .. }) => 4 + data.len() + 4,
        (K::ByteMatrix, Payload::ByteMatrix(m)) => 8 + m.data.len(),
        (K::String | K::FilePath, Payload::Text(s)) => {
            if flags.string_index {
                4
            } else {
                4 + latin1_len(s)
            }
        }
        (K::Blob, Payload::Bytes(b)) => b.len(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_sizes() {
        let f = StreamFlags::for_version(0x14000005, "");
        assert_eq!(size_of(&Value::new(ValueKind::Matrix4), &f), 64);
        assert_eq!(size_of(&Value::new(ValueKind::Bool), &f), 1);
        assert_eq!(size_of(&Value::new(ValueKind::None), &f), 0);
        let f = StreamFlags::for_version(0x04000002, "");
        assert_eq!(size_of(&Value::new(ValueKind::Bool), &f), 4);
    }

    #[test]
    fn test_string_sizes() {
        let f = StreamFlags::for_version(0x14000005, "");
        let mut s = Value::new(ValueKind::ShortString);
        s.set("héllo");
        assert_eq!(size_of(&s, &f), 7);
        let mut h = Value::new(ValueKind::HeaderString);
        h.set("NetImmerse");
        assert_eq!(size_of(&h, &f), 11);
        let mut g = Value::new(ValueKind::String);
        g.set("abc");
        assert_eq!(size_of(&g, &f), 7);
        assert_eq!(size_of(&g, &StreamFlags::for_version(0x14020007, "")), 4);
    }
}
