//! Binary codec: per-kind little-endian encoding of [`Value`](crate::value::Value)s.
//!
//! Three pieces are kept in lockstep:
//!
//! - [`NifReader`] decodes a value in place from a byte slice
//! - [`NifWriter`] encodes a value to any `Write` sink
//! - [`size_of`] predicts the number of bytes `NifWriter` will emit
//!
//! The encoding of several kinds depends on the file version; those switches
//! are gathered in [`StreamFlags`].

mod reader;
mod size;
mod writer;

pub use reader::NifReader;
pub use size::size_of;
pub use writer::NifWriter;

use crate::util::{V20_1_0_3, V3_3_0_13, V4_0_0_2};

/// Default cap on sized string lengths.
pub const MAX_STRING_LENGTH: u32 = 0x8000;

/// Cap on string palette lengths.
pub const MAX_PALETTE_LENGTH: i32 = 0xffff;

/// Header strings longer than this are rejected.
pub const HEADER_STRING_LIMIT: usize = 80;

/// Line strings longer than this are rejected.
pub const LINE_STRING_LIMIT: usize = 255;

/// Version-dependent encoding switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamFlags {
    pub version: u32,
    /// Booleans take 4 bytes instead of 1.
    pub bool32: bool,
    /// Links are stored 1-based.
    pub link_adjust: bool,
    /// Generic strings are indices into the header string table.
    pub string_index: bool,
    /// NeoSteam files store a fake version number.
    pub neosteam: bool,
    pub max_length: u32,
}

impl Default for StreamFlags {
    fn default() -> Self {
        Self::for_version(0, "")
    }
}

impl StreamFlags {
    pub fn for_version(version: u32, header_string: &str) -> Self {
        Self {
            version,
            bool32: version <= V4_0_0_2,
            link_adjust: version < V3_3_0_13,
            string_index: version >= V20_1_0_3,
            neosteam: header_string.starts_with("NS"),
            max_length: MAX_STRING_LENGTH,
        }
    }

    /// Same flags with a different string length cap.
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = max_length;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{Color3, Mat3, Quat, Vec3};
    use crate::value::{Value, ValueKind};

    fn flags(v: u32) -> StreamFlags {
        StreamFlags::for_version(v, "Gamebryo File Format, Version x")
    }

    #[test]
    fn test_flag_thresholds() {
        let f = flags(0x04000002);
        assert!(f.bool32 && !f.link_adjust && !f.string_index);
        let f = flags(0x03010000);
        assert!(f.link_adjust);
        let f = flags(0x14010003);
        assert!(!f.bool32 && f.string_index);
        assert!(StreamFlags::for_version(0x0a010000, "NS").neosteam);
    }

    /// Write a value, check `size_of`, read it back.
    fn roundtrip(v: &Value, f: StreamFlags) -> Value {
        let mut buf = Vec::new();
        NifWriter::new(&mut buf, f).write(v).unwrap();
        assert_eq!(buf.len(), size_of(v, &f), "size of {}", v.kind());
        let mut back = Value::new(v.kind());
        if let Some(b) = v.as_bytes().filter(|_| v.kind() == ValueKind::Blob) {
            back.set(vec![0u8; b.len()]);
        }
        let mut r = NifReader::new(&buf, f);
        r.read(&mut back).unwrap();
        assert_eq!(r.pos(), buf.len());
        back
    }

    #[test]
    fn test_size_matches_write_for_every_kind() {
        for f in [flags(0x04000002), flags(0x0A000100), flags(0x14020007), flags(0x03010000)] {
            for k in 0u8..=45 {
                let kind = ValueKind::from_u8(k);
                let mut v = Value::new(kind);
                v.from_string("7");
                if kind.is_string() {
                    v.set("abc");
                }
                let back = roundtrip(&v, f);
                if !matches!(kind, ValueKind::String | ValueKind::FilePath) {
                    assert_eq!(back.kind(), kind);
                }
            }
        }
    }

    #[test]
    fn test_values_survive() {
        let f = flags(0x14000005);
        let mut v = Value::new(ValueKind::Vector3);
        v.set(Vec3::new(1.0, -2.5, 3.25));
        assert_eq!(roundtrip(&v, f), v);

        let mut m = Value::new(ValueKind::Matrix);
        m.set(Mat3::from_cols_array(&[1., 2., 3., 4., 5., 6., 7., 8., 9.]));
        assert_eq!(roundtrip(&m, f), m);

        let mut q = Value::new(ValueKind::QuatXYZW);
        q.set(Quat::from_xyzw(0.1, 0.2, 0.3, 0.4));
        assert_eq!(roundtrip(&q, f), q);

        let mut c = Value::new(ValueKind::Color3);
        c.set(Color3::new(0.5, 0.25, 1.0));
        assert_eq!(roundtrip(&c, f), c);
    }
}
