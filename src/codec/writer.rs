//! Value encoding to a byte sink.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use half::f16;

use super::StreamFlags;
use crate::util::{Error, Result, NEOSTEAM_FILE_VERSION};
use crate::value::{string_to_latin1, Payload, Value, ValueKind};

/// Longest short string body, leaving room for the NUL.
pub(crate) const SHORT_STRING_MAX: usize = 254;

/// Little-endian value writer with position tracking.
pub struct NifWriter<W: Write> {
    inner: W,
    pos: u64,
    flags: StreamFlags,
}

impl<W: Write> NifWriter<W> {
    pub fn new(inner: W, flags: StreamFlags) -> Self {
        Self { inner, pos: 0, flags }
    }

    /// Bytes written so far.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    #[inline]
    pub fn flags(&self) -> &StreamFlags {
        &self.flags
    }

    pub fn set_flags(&mut self, flags: StreamFlags) {
        self.flags = flags;
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(|e| Error::WriteFailed(e.to_string()))
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data).map_err(|e| Error::WriteFailed(e.to_string()))?;
        self.pos += data.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_bytes(&[v])
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    fn write_f32s(&mut self, vals: &[f32]) -> Result<()> {
        let mut buf = Vec::with_capacity(vals.len() * 4);
        for v in vals {
            buf.write_f32::<LittleEndian>(*v)?;
        }
        self.write_bytes(&buf)
    }

    fn write_half(&mut self, v: f32) -> Result<()> {
        self.write_u16(f16::from_f32(v).to_bits())
    }

    fn write_sized_string(&mut self, s: &str) -> Result<()> {
        let bytes = string_to_latin1(s);
        self.write_i32(bytes.len() as i32)?;
        self.write_bytes(&bytes)
    }

    fn signed_to_byte(f: f32) -> u8 {
        (((f as f64 + 1.0) / 2.0) * 255.0).round().clamp(0.0, 255.0) as u8
    }

    fn unit_to_byte(f: f32) -> u8 {
        (f as f64 * 255.0).round().clamp(0.0, 255.0) as u8
    }

    /// Encode `value` according to its kind.
    ///
    /// A payload that does not match the kind is a caller bug and reports
    /// [`Error::WriteFailed`].
    pub fn write(&mut self, value: &Value) -> Result<()> {
        use ValueKind as K;
        let kind = value.kind();
        let mismatch = || Error::WriteFailed(format!("{kind} value holds a foreign payload"));
        match (kind, &value.data) {
            (K::Bool, Payload::U32(v)) => {
                if self.flags.bool32 {
                    self.write_u32(*v)
                } else {
                    self.write_u8(*v as u8)
                }
            }
            (K::Byte, Payload::U32(v)) => self.write_u8(*v as u8),
            (K::Word | K::Short | K::Flags | K::BlockTypeIndex, Payload::U32(v)) => {
                self.write_u16(*v as u16)
            }
            (K::StringOffset | K::StringIndex | K::Int | K::UInt | K::ULittle32, Payload::U32(v)) => {
                self.write_u32(*v)
            }
            (K::Int64 | K::UInt64, Payload::U64(v)) => self.write_bytes(&v.to_le_bytes()),
            (K::Link | K::UpLink, Payload::U32(v)) => {
                let mut l = *v as i32;
                if self.flags.link_adjust {
                    l = l.wrapping_add(1);
                }
                self.write_i32(l)
            }
            (K::Float, Payload::F32(f)) => self.write_f32(*f),
            (K::Hfloat, Payload::F32(f)) => self.write_half(*f),
            (K::Normbyte, Payload::F32(f)) => self.write_u8(Self::signed_to_byte(*f)),
            (K::ByteVector3, Payload::Vec3(v)) => self.write_bytes(&[
                Self::signed_to_byte(v.x),
                Self::signed_to_byte(v.y),
                Self::signed_to_byte(v.z),
            ]),
            (K::HalfVector3, Payload::Vec3(v)) => {
                self.write_half(v.x)?;
                self.write_half(v.y)?;
                self.write_half(v.z)
            }
            (K::UshortVector3, Payload::Vec3(v)) => {
                for c in v.to_array() {
                    self.write_u16(c.round().clamp(0.0, u16::MAX as f32) as u16)?;
                }
                Ok(())
            }
            (K::HalfVector2, Payload::Vec2(v)) => {
                self.write_half(v.x)?;
                self.write_half(v.y)
            }
            (K::Vector2, Payload::Vec2(v)) => self.write_f32s(&v.to_array()),
            (K::Vector3, Payload::Vec3(v)) => self.write_f32s(&v.to_array()),
            (K::Vector4, Payload::Vec4(v)) => self.write_f32s(&v.to_array()),
            (K::Triangle, Payload::Triangle(t)) => {
                for i in t.v {
                    self.write_u16(i)?;
                }
                Ok(())
            }
            (K::Quat, Payload::Quat(q)) => self.write_f32s(&[q.w, q.x, q.y, q.z]),
            (K::QuatXYZW, Payload::Quat(q)) => self.write_f32s(&[q.x, q.y, q.z, q.w]),
            (K::Matrix, Payload::Mat3(m)) => self.write_f32s(&m.transpose().to_cols_array()),
            (K::Matrix4, Payload::Mat4(m)) => self.write_f32s(&m.transpose().to_cols_array()),
            (K::Color3, Payload::Color3(c)) => self.write_f32s(&c.to_array()),
            (K::Color4, Payload::Color4(c)) => self.write_f32s(&c.to_array()),
            (K::ByteColor4, Payload::Color4(c)) => {
                let b = c.to_array().map(Self::unit_to_byte);
                self.write_bytes(&b)
            }
            (K::SizedString | K::Text, Payload::Text(s)) => self.write_sized_string(s),
            (K::ShortString, Payload::Text(s)) => {
                let mut bytes = string_to_latin1(s);
                bytes.truncate(SHORT_STRING_MAX);
                bytes.push(0);
                self.write_u8(bytes.len() as u8)?;
                self.write_bytes(&bytes)
            }
            (K::HeaderString | K::LineString, Payload::Text(s)) => {
                let mut bytes = string_to_latin1(s);
                bytes.push(b'\n');
                self.write_bytes(&bytes)
            }
            (K::Char8String, Payload::Text(s)) => {
                let mut bytes = string_to_latin1(s);
                bytes.resize(8, 0);
                self.write_bytes(&bytes)
            }
            (K::FileVersion, Payload::U32(v)) => {
                self.write_u32(if self.flags.neosteam { NEOSTEAM_FILE_VERSION } else { *v })
            }
            (K::ByteArray, Payload::Bytes(b)) => {
                self.write_i32(b.len() as i32)?;
                self.write_bytes(b)
            }
            (K::StringPalette, Payload::Palette { data, length }) => {
                self.write_i32(data.len() as i32)?;
                self.write_bytes(data)?;
                self.write_u32(*length)
            }
            (K::ByteMatrix, Payload::ByteMatrix(m)) => {
                self.write_u32(m.cols)?;
                self.write_u32(m.rows)?;
                self.write_bytes(&m.data)
            }
            // Not yet moved into the string table.
            (K::String | K::FilePath, Payload::Text(s)) => {
                if self.flags.string_index {
                    self.write_u32(0)
                } else {
                    self.write_sized_string(s)
                }
            }
            (K::Blob, Payload::Bytes(b)) => self.write_bytes(b),
            (K::None, _) => Ok(()),
            _ => Err(mismatch()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{Color4, Vec3};

    fn write(v: &Value, f: StreamFlags) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut w = NifWriter::new(&mut buf, f);
        w.write(v).unwrap();
        assert_eq!(w.pos() as usize, buf.len());
        buf
    }

    fn flags() -> StreamFlags {
        StreamFlags::for_version(0x14000005, "")
    }

    #[test]
    fn test_bool_width() {
        let mut b = Value::new(ValueKind::Bool);
        b.set(true);
        assert_eq!(write(&b, StreamFlags::for_version(0x04000002, "")), vec![1, 0, 0, 0]);
        assert_eq!(write(&b, flags()), vec![1]);
    }

    #[test]
    fn test_short_string_caps() {
        let mut s = Value::new(ValueKind::ShortString);
        s.set("x".repeat(300));
        let out = write(&s, flags());
        assert_eq!(out[0], 255);
        assert_eq!(out.len(), 256);
        assert_eq!(*out.last().unwrap(), 0);
    }

    #[test]
    fn test_char8_pads() {
        let mut s = Value::new(ValueKind::Char8String);
        s.set("abc");
        assert_eq!(write(&s, flags()), b"abc\0\0\0\0\0".to_vec());
    }

    #[test]
    fn test_byte_encodings() {
        let mut v = Value::new(ValueKind::ByteVector3);
        v.set(Vec3::new(-1.0, 0.0, 1.0));
        assert_eq!(write(&v, flags()), vec![0, 128, 255]);

        let mut c = Value::new(ValueKind::ByteColor4);
        c.set(Color4::new(0.0, 0.5, 1.0, 1.0));
        assert_eq!(write(&c, flags()), vec![0, 128, 255, 255]);
    }

    #[test]
    fn test_neosteam_and_links() {
        let mut v = Value::new(ValueKind::FileVersion);
        v.set_file_version(0x0a010000);
        let out = write(&v, StreamFlags::for_version(0x0a010000, "NS"));
        assert_eq!(out, NEOSTEAM_FILE_VERSION.to_le_bytes().to_vec());

        let l = Value::new(ValueKind::Link);
        assert_eq!(write(&l, StreamFlags::for_version(0x03010000, "")), vec![0; 4]);
        assert_eq!(write(&l, flags()), vec![0xff; 4]);
    }

    #[test]
    fn test_unretyped_string_in_index_mode() {
        let mut s = Value::new(ValueKind::String);
        s.set("name");
        assert_eq!(write(&s, StreamFlags::for_version(0x14020007, "")), vec![0; 4]);
        assert_eq!(write(&s, flags()), b"\x04\0\0\0name".to_vec());
    }
}
