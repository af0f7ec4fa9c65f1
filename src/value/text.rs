//! Locale-independent text form of values.

use std::fmt;

use super::{Payload, Value, ValueKind};
use crate::util::{
    matrix_from_euler, matrix_to_euler, version_to_number, version_to_string, Color3, Color4,
    Mat3, Quat, Vec2, Vec3, Vec4,
};

/// Decimals for vector components and rotation angles.
const VECTOR_DECIMALS: usize = 4;
/// Decimals for plain floats.
const FLOAT_DECIMALS: usize = 6;

fn channel(c: f32) -> u8 {
    (c * 255.0).clamp(0.0, 255.0) as u8
}

fn parse_channel(hex: &str) -> Option<f32> {
    u8::from_str_radix(hex, 16).ok().map(|b| b as f32 / 255.0)
}

/// Parse an integer with an optional `0x` / `0` radix prefix and sign.
fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let v = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if neg { -v } else { v })
}

/// All numbers in a labelled string like `X 1.0 Y 2.0`.
fn numbers(s: &str) -> Vec<f32> {
    s.split_whitespace().filter_map(|t| t.parse::<f32>().ok()).collect()
}

/// Degrees with negative zero folded to zero.
fn degrees(rad: f32) -> f32 {
    rad.to_degrees() + 0.0
}

fn fmt_euler(f: &mut fmt::Formatter<'_>, m: &Mat3) -> fmt::Result {
    let (x, y, z, ok) = matrix_to_euler(m);
    let (pre, suf) = if ok { ("", "") } else { ("(", ")") };
    write!(
        f,
        "{pre}Y {:.p$} P {:.p$} R {:.p$}{suf}",
        degrees(x),
        degrees(y),
        degrees(z),
        p = VECTOR_DECIMALS
    )
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ValueKind as K;
        const P: usize = VECTOR_DECIMALS;
        match (self.kind(), &self.data) {
            (K::Bool, Payload::U32(v)) => f.write_str(if *v != 0 { "yes" } else { "no" }),
            (K::Short, Payload::U32(v)) => write!(f, "{}", *v as u16 as i16),
            (K::Int | K::Link | K::UpLink, Payload::U32(v)) => write!(f, "{}", *v as i32),
            (K::FileVersion, Payload::U32(v)) => f.write_str(&version_to_string(*v)),
            (_, Payload::U32(v)) => write!(f, "{v}"),
            (K::Int64, Payload::U64(v)) => write!(f, "{}", *v as i64),
            (_, Payload::U64(v)) => write!(f, "{v}"),
            (K::Float, Payload::F32(v)) => write!(f, "{:.prec$}", v, prec = FLOAT_DECIMALS),
            (_, Payload::F32(v)) => write!(f, "{:.P$}", v),
            (_, Payload::Text(s)) => f.write_str(s),
            (_, Payload::Color3(c)) => {
                write!(f, "#{:02x}{:02x}{:02x}", channel(c.r), channel(c.g), channel(c.b))
            }
            (_, Payload::Color4(c)) => write!(
                f,
                "#{:02x}{:02x}{:02x}{:02x}",
                channel(c.r),
                channel(c.g),
                channel(c.b),
                channel(c.a)
            ),
            (_, Payload::Vec2(v)) => write!(f, "X {:.P$} Y {:.P$}", v.x, v.y),
            (_, Payload::Vec3(v)) => write!(f, "X {:.P$} Y {:.P$} Z {:.P$}", v.x, v.y, v.z),
            (_, Payload::Vec4(v)) => {
                write!(f, "X {:.P$} Y {:.P$} Z {:.P$} W {:.P$}", v.x, v.y, v.z, v.w)
            }
            (_, Payload::Quat(q)) => fmt_euler(f, &Mat3::from_quat(*q)),
            (_, Payload::Mat3(m)) => fmt_euler(f, m),
            (_, Payload::Mat4(m)) => {
                // Stored rows carry the translation last; glam wants it in a column.
                let (s, r, t) = m.transpose().to_scale_rotation_translation();
                let (x, y, z, _) = matrix_to_euler(&Mat3::from_quat(r));
                write!(
                    f,
                    "Trans( X {:.3} Y {:.3} Z {:.3} ) Rot( Y {:.3} P {:.3} R {:.3} ) Scale( X {:.3} Y {:.3} Z {:.3} )",
                    t.x,
                    t.y,
                    t.z,
                    degrees(x),
                    degrees(y),
                    degrees(z),
                    s.x,
                    s.y,
                    s.z
                )
            }
            (_, Payload::Triangle(t)) => write!(f, "{t}"),
            (_, Payload::Bytes(b)) => write!(f, "{} bytes", b.len()),
            (_, Payload::Palette { .. }) => {
                for s in self.palette_strings() {
                    write!(f, "{s}|")?;
                }
                Ok(())
            }
            (_, Payload::ByteMatrix(m)) => {
                write!(f, "{} bytes  [{} x {}]", m.len(), m.cols, m.rows)
            }
            (_, Payload::Empty) => Ok(()),
        }
    }
}

impl Value {
    /// Parse `s` into this value's kind. Returns `false` when the text is not
    /// valid for the kind or the kind has no text form.
    pub fn from_string(&mut self, s: &str) -> bool {
        use ValueKind as K;
        match self.kind() {
            K::Bool => match s.trim() {
                "yes" | "true" => self.set_count(1),
                "no" | "false" => self.set_count(0),
                other => parse_int(other).is_some_and(|v| self.set_count(v as u32)),
            },
            K::Byte => parse_int(s)
                .filter(|v| (0..=0xff).contains(v))
                .is_some_and(|v| self.set_count(v as u32)),
            K::Word | K::Flags | K::StringOffset | K::BlockTypeIndex | K::Short => parse_int(s)
                .filter(|v| (i16::MIN as i64..=u16::MAX as i64).contains(v))
                .is_some_and(|v| self.set_count(v as u32)),
            K::Int => parse_int(s)
                .and_then(|v| i32::try_from(v).ok())
                .is_some_and(|v| self.set_count(v as u32)),
            K::UInt | K::ULittle32 => parse_int(s)
                .and_then(|v| u32::try_from(v).ok())
                .is_some_and(|v| self.set_count(v)),
            K::StringIndex => s.trim().parse::<u32>().is_ok_and(|v| self.set_count(v)),
            K::Int64 => s.trim().parse::<i64>().is_ok_and(|v| self.set(v as u64)),
            K::UInt64 => s.trim().parse::<u64>().is_ok_and(|v| self.set(v)),
            K::Link | K::UpLink => s.trim().parse::<i32>().is_ok_and(|v| self.set_link(v)),
            K::Float | K::Hfloat | K::Normbyte => {
                s.trim().parse::<f32>().is_ok_and(|v| self.set_float(v))
            }
            k if k.is_string() => self.set(s),
            K::Color3 => {
                let h = s.trim().trim_start_matches('#');
                match (h.len(), h.get(0..2), h.get(2..4), h.get(4..6)) {
                    (6, Some(r), Some(g), Some(b)) => {
                        match (parse_channel(r), parse_channel(g), parse_channel(b)) {
                            (Some(r), Some(g), Some(b)) => self.set(Color3::new(r, g, b)),
                            _ => false,
                        }
                    }
                    _ => false,
                }
            }
            K::Color4 | K::ByteColor4 => {
                let h = s.trim().trim_start_matches('#');
                let ch: Option<Vec<f32>> = (0..h.len() / 2)
                    .map(|i| h.get(i * 2..i * 2 + 2).and_then(parse_channel))
                    .collect();
                match (h.len(), ch.as_deref()) {
                    (8, Some([r, g, b, a])) => self.set(Color4::new(*r, *g, *b, *a)),
                    (6, Some([r, g, b])) => self.set(Color4::new(*r, *g, *b, 1.0)),
                    _ => false,
                }
            }
            K::FileVersion => {
                let v = version_to_number(s);
                v != 0 && self.set_file_version(v)
            }
            K::Vector2 | K::HalfVector2 => match numbers(s)[..] {
                [x, y, ..] => self.set(Vec2::new(x, y)),
                _ => false,
            },
            K::Vector3 | K::HalfVector3 | K::UshortVector3 | K::ByteVector3 => {
                match numbers(s)[..] {
                    [x, y, z, ..] => self.set(Vec3::new(x, y, z)),
                    _ => false,
                }
            }
            K::Vector4 => match numbers(s)[..] {
                [x, y, z, w, ..] => self.set(Vec4::new(x, y, z, w)),
                _ => false,
            },
            K::Quat | K::QuatXYZW => match numbers(s)[..] {
                [w, x, y, z] => self.set(Quat::from_xyzw(x, y, z, w)),
                [y, p, r] => {
                    let m = matrix_from_euler(y.to_radians(), p.to_radians(), r.to_radians());
                    self.set(Quat::from_mat3(&m))
                }
                _ => false,
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{ByteMatrix, Mat4};

    fn text(kind: ValueKind, f: impl FnOnce(&mut Value)) -> String {
        let mut v = Value::new(kind);
        f(&mut v);
        v.to_string()
    }

    #[test]
    fn test_display_scalars() {
        assert_eq!(text(ValueKind::Bool, |v| { v.set(true); }), "yes");
        assert_eq!(text(ValueKind::Link, |_| {}), "-1");
        assert_eq!(text(ValueKind::Short, |v| { v.set(-5i32); }), "-5");
        assert_eq!(text(ValueKind::Float, |v| { v.set(1.5f32); }), "1.500000");
        assert_eq!(
            text(ValueKind::FileVersion, |v| { v.set(0x14000005u32); }),
            "20.0.0.5"
        );
    }

    #[test]
    fn test_display_compound() {
        assert_eq!(
            text(ValueKind::Vector3, |v| { v.set(Vec3::new(1.0, 2.0, 3.0)); }),
            "X 1.0000 Y 2.0000 Z 3.0000"
        );
        assert_eq!(
            text(ValueKind::Color3, |v| { v.set(Color3::new(1.0, 0.0, 0.5)); }),
            "#ff007f"
        );
        assert_eq!(text(ValueKind::Matrix, |_| {}), "Y 0.0000 P 0.0000 R 0.0000");
        assert_eq!(text(ValueKind::ByteArray, |v| { v.set(vec![0u8; 5]); }), "5 bytes");
        assert_eq!(
            text(ValueKind::ByteMatrix, |v| { v.set(ByteMatrix::new(2, 3)); }),
            "6 bytes  [2 x 3]"
        );
        assert!(text(ValueKind::Matrix4, |v| { v.set(Mat4::IDENTITY); }).starts_with("Trans( X 0.000"));
    }

    #[test]
    fn test_from_string() {
        let mut v = Value::new(ValueKind::UInt);
        assert!(v.from_string("0x10"));
        assert_eq!(v.to_count(), 16);
        assert!(!v.from_string("abc"));

        let mut b = Value::new(ValueKind::Bool);
        assert!(b.from_string("no"));
        assert!(!b.get::<bool>());

        let mut c = Value::new(ValueKind::Color4);
        assert!(c.from_string("#ff000080"));
        assert_eq!(c.get::<Color4>().r, 1.0);

        let mut fv = Value::new(ValueKind::FileVersion);
        assert!(fv.from_string("4.0.0.2"));
        assert_eq!(fv.to_file_version(), 0x04000002);
        assert!(!fv.from_string(""));

        let mut vec = Value::new(ValueKind::Vector3);
        assert!(vec.from_string("X 1 Y 2 Z 3"));
        assert_eq!(vec.get::<Vec3>(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_unsupported_from_string() {
        for kind in [
            ValueKind::ByteArray,
            ValueKind::ByteMatrix,
            ValueKind::StringPalette,
            ValueKind::Matrix,
            ValueKind::Matrix4,
            ValueKind::Triangle,
            ValueKind::Blob,
            ValueKind::None,
        ] {
            assert!(!Value::new(kind).from_string("1"), "{kind}");
        }
    }
}
