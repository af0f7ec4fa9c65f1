//! Math type re-exports and the small NIF-specific value types.
//!
//! Vectors, quaternions and matrices come from `glam`; colors, triangles and
//! byte matrices are plain data types with a fixed wire layout.

pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// RGB color with float channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Color3 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color3 {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    #[inline]
    pub const fn from_array(a: [f32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }
}

/// RGBA color with float channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color4 {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub const fn from_array(a: [f32; 4]) -> Self {
        Self::new(a[0], a[1], a[2], a[3])
    }
}

/// Triangle as three 16-bit vertex indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Triangle {
    pub v: [u16; 3],
}

impl Triangle {
    #[inline]
    pub const fn new(v1: u16, v2: u16, v3: u16) -> Self {
        Self { v: [v1, v2, v3] }
    }
}

impl fmt::Display for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.v[0], self.v[1], self.v[2])
    }
}

/// Two-dimensional byte array stored as `cols` runs of `rows` bytes.
///
/// The wire form is `i32 cols, i32 rows, cols*rows bytes`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteMatrix {
    pub cols: u32,
    pub rows: u32,
    pub data: Vec<u8>,
}

impl ByteMatrix {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows, data: vec![0; cols as usize * rows as usize] }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Euler angles `(x, y, z)` in radians of a rotation matrix.
///
/// The flag is false at gimbal lock, where `z` is forced to zero.
pub fn matrix_to_euler(m: &Mat3) -> (f32, f32, f32, bool) {
    // Rows of the stored matrix; glam is column-major so read transposed.
    let r = m.transpose();
    let (r0, r1, r2) = (r.x_axis, r.y_axis, r.z_axis);
    if r0.z < 1.0 {
        if r0.z > -1.0 {
            ((-r1.z).atan2(r2.z), r0.z.asin(), (-r0.y).atan2(r0.x), true)
        } else {
            (-(-r1.x).atan2(r1.y), -std::f32::consts::FRAC_PI_2, 0.0, false)
        }
    } else {
        (r1.x.atan2(r1.y), std::f32::consts::FRAC_PI_2, 0.0, false)
    }
}

/// Rotation matrix from Euler angles in radians.
pub fn matrix_from_euler(x: f32, y: f32, z: f32) -> Mat3 {
    let (sx, cx) = x.sin_cos();
    let (sy, cy) = y.sin_cos();
    let (sz, cz) = z.sin_cos();
    let rows = [
        [cy * cz, -cy * sz, sy],
        [sx * sy * cz + sz * cx, cx * cz - sx * sy * sz, -sx * cy],
        [sx * sz - cx * sy * cz, cx * sy * sz + sx * cz, cx * cy],
    ];
    Mat3::from_cols_array_2d(&rows).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_sizes() {
        assert_eq!(std::mem::size_of::<Color3>(), 12);
        assert_eq!(std::mem::size_of::<Color4>(), 16);
        assert_eq!(std::mem::size_of::<Triangle>(), 6);
    }

    #[test]
    fn test_euler_roundtrip() {
        let m = matrix_from_euler(0.3, -0.2, 1.1);
        let (x, y, z, ok) = matrix_to_euler(&m);
        assert!(ok);
        assert!((x - 0.3).abs() < 1e-5);
        assert!((y + 0.2).abs() < 1e-5);
        assert!((z - 1.1).abs() < 1e-5);
    }

    #[test]
    fn test_identity_euler() {
        let (x, y, z, ok) = matrix_to_euler(&Mat3::IDENTITY);
        assert!(ok);
        assert_eq!((x, y, z), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_byte_matrix() {
        let m = ByteMatrix::new(3, 4);
        assert_eq!(m.len(), 12);
        assert!(!m.is_empty());
    }
}
