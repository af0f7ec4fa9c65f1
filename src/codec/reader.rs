//! Value decoding from a byte slice.

use byteorder::{ByteOrder, LittleEndian};
use half::f16;

use super::{StreamFlags, HEADER_STRING_LIMIT, LINE_STRING_LIMIT, MAX_PALETTE_LENGTH};
use crate::util::{
    ByteMatrix, Color3, Color4, Error, Mat3, Mat4, Quat, Result, Triangle, Vec2, Vec3, Vec4,
    NEOSTEAM_FILE_VERSION, V10_1_0_0,
};
use crate::value::{latin1_to_string, Payload, Value, ValueKind};

/// Cursor over an in-memory NIF stream.
///
/// Every read checks the remaining length first, so truncated input surfaces
/// as [`Error::UnexpectedEof`] carrying the offset of the failed read.
pub struct NifReader<'a> {
    data: &'a [u8],
    pos: usize,
    flags: StreamFlags,
}

impl<'a> NifReader<'a> {
    pub fn new(data: &'a [u8], flags: StreamFlags) -> Self {
        Self { data, pos: 0, flags }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    #[inline]
    pub fn flags(&self) -> &StreamFlags {
        &self.flags
    }

    /// Switch encoding, e.g. once the header version is known.
    pub fn set_flags(&mut self, flags: StreamFlags) {
        self.flags = flags;
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::UnexpectedEof(self.pos as u64));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    fn read_half(&mut self) -> Result<f32> {
        Ok(f16::from_bits(self.read_u16()?).to_f32())
    }

    fn read_f32s<const N: usize>(&mut self) -> Result<[f32; N]> {
        let mut out = [0.0f32; N];
        LittleEndian::read_f32_into(self.take(N * 4)?, &mut out);
        Ok(out)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.take(n)?.to_vec())
    }

    /// Length prefix that must be non-negative.
    fn read_len(&mut self, kind: ValueKind) -> Result<usize> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(Error::decode(kind.name(), format!("negative length {len}")));
        }
        Ok(len as usize)
    }

    fn read_sized_string(&mut self, kind: ValueKind) -> Result<String> {
        let len = self.read_i32()?;
        if len < 0 || len as u32 > self.flags.max_length {
            return Err(Error::decode(
                kind.name(),
                format!("length {len} outside 0..={}", self.flags.max_length),
            ));
        }
        Ok(latin1_to_string(self.take(len as usize)?))
    }

    /// Bytes up to a newline. Fails once `limit - 1` bytes pass without one.
    fn read_line(&mut self, kind: ValueKind, limit: usize) -> Result<String> {
        let window = &self.data[self.pos..];
        let scan = &window[..window.len().min(limit - 1)];
        match scan.iter().position(|&b| b == b'\n') {
            Some(n) => {
                self.pos += n + 1;
                Ok(latin1_to_string(&scan[..n]))
            }
            None if scan.len() < limit - 1 => {
                self.pos += scan.len();
                Ok(latin1_to_string(scan))
            }
            None => Err(Error::decode(kind.name(), format!("no newline within {limit} bytes"))),
        }
    }

    fn byte_to_signed(b: u8) -> f32 {
        ((b as f64 / 255.0) * 2.0 - 1.0) as f32
    }

    /// Decode `value` in place according to its kind.
    ///
    /// Generic strings change kind while reading: to a string index when the
    /// version uses a header string table, to a sized string otherwise.
    pub fn read(&mut self, value: &mut Value) -> Result<()> {
        use ValueKind as K;
        let kind = value.kind();
        let data = match kind {
            K::Bool => {
                if self.flags.bool32 {
                    Payload::U32(self.read_u32()?)
                } else {
                    Payload::U32(self.read_u8()? as u32)
                }
            }
            K::Byte => Payload::U32(self.read_u8()? as u32),
            K::Word | K::Short | K::Flags | K::BlockTypeIndex => {
                Payload::U32(self.read_u16()? as u32)
            }
            K::StringOffset | K::StringIndex | K::Int | K::UInt | K::ULittle32 => {
                Payload::U32(self.read_u32()?)
            }
            K::Int64 | K::UInt64 => Payload::U64(self.read_u64()?),
            K::Link | K::UpLink => {
                let mut l = self.read_i32()?;
                if self.flags.link_adjust {
                    l = l.wrapping_sub(1);
                }
                Payload::U32(l as u32)
            }
            K::Float => Payload::F32(self.read_f32()?),
            K::Hfloat => Payload::F32(self.read_half()?),
            K::Normbyte => Payload::F32(Self::byte_to_signed(self.read_u8()?)),
            K::ByteVector3 => {
                let b = self.take(3)?;
                Payload::Vec3(Vec3::new(
                    Self::byte_to_signed(b[0]),
                    Self::byte_to_signed(b[1]),
                    Self::byte_to_signed(b[2]),
                ))
            }
            K::HalfVector3 => {
                Payload::Vec3(Vec3::new(self.read_half()?, self.read_half()?, self.read_half()?))
            }
            K::UshortVector3 => Payload::Vec3(Vec3::new(
                self.read_u16()? as f32,
                self.read_u16()? as f32,
                self.read_u16()? as f32,
            )),
            K::HalfVector2 => Payload::Vec2(Vec2::new(self.read_half()?, self.read_half()?)),
            K::Vector2 => Payload::Vec2(Vec2::from_array(self.read_f32s::<2>()?)),
            K::Vector3 => Payload::Vec3(Vec3::from_array(self.read_f32s::<3>()?)),
            K::Vector4 => Payload::Vec4(Vec4::from_array(self.read_f32s::<4>()?)),
            K::Triangle => {
                Payload::Triangle(Triangle::new(self.read_u16()?, self.read_u16()?, self.read_u16()?))
            }
            K::Quat => {
                let [w, x, y, z] = self.read_f32s::<4>()?;
                Payload::Quat(Quat::from_xyzw(x, y, z, w))
            }
            K::QuatXYZW => {
                let [x, y, z, w] = self.read_f32s::<4>()?;
                Payload::Quat(Quat::from_xyzw(x, y, z, w))
            }
            // Row-major on disk.
            K::Matrix => Payload::Mat3(Mat3::from_cols_array(&self.read_f32s::<9>()?).transpose()),
            K::Matrix4 => {
                Payload::Mat4(Mat4::from_cols_array(&self.read_f32s::<16>()?).transpose())
            }
            K::Color3 => Payload::Color3(Color3::from_array(self.read_f32s::<3>()?)),
            K::Color4 => Payload::Color4(Color4::from_array(self.read_f32s::<4>()?)),
            K::ByteColor4 => {
                let b = self.take(4)?;
                let c = |i: usize| b[i] as f32 / 255.0;
                Payload::Color4(Color4::new(c(0), c(1), c(2), c(3)))
            }
            K::SizedString | K::Text => Payload::Text(self.read_sized_string(kind)?),
            K::ShortString => {
                let len = self.read_u8()? as usize;
                let raw = self.take(len)?;
                let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                Payload::Text(latin1_to_string(&raw[..end]))
            }
            K::HeaderString => Payload::Text(self.read_line(kind, HEADER_STRING_LIMIT)?),
            K::LineString => Payload::Text(self.read_line(kind, LINE_STRING_LIMIT)?),
            K::Char8String => {
                let raw = self.take(8)?;
                let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                Payload::Text(latin1_to_string(&raw[..end]))
            }
            K::FileVersion => {
                let v = self.read_u32()?;
                Payload::U32(if v == NEOSTEAM_FILE_VERSION { V10_1_0_0 } else { v })
            }
            K::ByteArray => {
                let len = self.read_len(kind)?;
                Payload::Bytes(self.read_bytes(len)?)
            }
            K::StringPalette => {
                let len = self.read_i32()?;
                if !(0..=MAX_PALETTE_LENGTH).contains(&len) {
                    return Err(Error::decode(kind.name(), format!("length {len} out of range")));
                }
                let data = self.read_bytes(len as usize)?;
                let length = self.read_u32()?;
                Payload::Palette { data, length }
            }
            K::ByteMatrix => {
                let cols = self.read_len(kind)?;
                let rows = self.read_len(kind)?;
                let n = cols
                    .checked_mul(rows)
                    .ok_or_else(|| Error::decode(kind.name(), "size overflow"))?;
                Payload::ByteMatrix(ByteMatrix {
                    cols: cols as u32,
                    rows: rows as u32,
                    data: self.read_bytes(n)?,
                })
            }
            K::String | K::FilePath => {
                if self.flags.string_index {
                    value.change_type(K::StringIndex);
                    Payload::U32(self.read_u32()?)
                } else {
                    value.change_type(K::SizedString);
                    Payload::Text(self.read_sized_string(kind)?)
                }
            }
            K::Blob => {
                let len = value.as_bytes().map_or(0, <[u8]>::len);
                Payload::Bytes(self.read_bytes(len)?)
            }
            K::None => return Ok(()),
        };
        value.data = data;
        Ok(())
    }
}
