//! NIF version numbers.
//!
//! Versions are packed as `0xAABBCCDD` for `A.B.C.D`. Files older than
//! 3.3.0.13 write two-part versions (`3.1`, `2.3`), whose minor part is split
//! digit by digit.

/// 3.3.0.13: first version with block-count header and footer.
pub const V3_3_0_13: u32 = 0x0303_000D;
/// 4.0.0.2: last version storing booleans as 32-bit integers.
pub const V4_0_0_2: u32 = 0x0400_0002;
/// 10.0.0.0: last version with inline block type names.
pub const V10_0_0_0: u32 = 0x0A00_0000;
/// 10.0.1.0: last version written with the "NetImmerse" banner.
pub const V10_0_1_0: u32 = 0x0A00_0100;
/// 10.1.0.0: version assumed for NeoSteam files.
pub const V10_1_0_0: u32 = 0x0A01_0000;
/// 10.2.0.0: first version without the per-block separator.
pub const V10_2_0_0: u32 = 0x0A02_0000;
/// 20.0.0.4: first version with an endian byte.
pub const V20_0_0_4: u32 = 0x1400_0004;
/// 20.0.0.5: default startup version.
pub const V20_0_0_5: u32 = 0x1400_0005;
/// 20.1.0.3: first version with a header string table.
pub const V20_1_0_3: u32 = 0x1401_0003;
/// 20.2.0.0: first version with per-block sizes in the header.
pub const V20_2_0_0: u32 = 0x1402_0000;
/// 20.3.1.2: custom version storing block type hashes.
pub const V20_3_1_2: u32 = 0x1403_0102;

/// Version number written for NeoSteam files in place of the real version.
pub const NEOSTEAM_FILE_VERSION: u32 = 0x08F3_5232;

/// Parse a version string into its packed number.
///
/// Returns 0 for empty or malformed input and for more than four parts.
/// A string without dots is taken as a plain decimal number.
pub fn version_to_number(s: &str) -> u32 {
    let s = s.trim();
    if s.is_empty() {
        return 0;
    }

    if !s.contains('.') {
        return match s.parse::<u32>() {
            Ok(u32::MAX) | Err(_) => 0,
            Ok(v) => v,
        };
    }

    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() > 4 {
        return 0;
    }

    let num = |p: &str| p.parse::<u32>().unwrap_or(0);

    if parts.len() == 2 {
        // Old style: major, then each following digit is its own part.
        let minor = parts[1];
        let digit = |r: std::ops::Range<usize>| minor.get(r).map_or(0, num);
        let mut v = num(parts[0]) << 24;
        v = v.wrapping_add(digit(0..1) << 16);
        v = v.wrapping_add(digit(1..2) << 8);
        v = v.wrapping_add(minor.get(2..).map_or(0, num));
        return v;
    }

    parts
        .iter()
        .take(4)
        .enumerate()
        .fold(0u32, |v, (i, p)| v.wrapping_add(num(p) << ((3 - i) * 8)))
}

/// Format a packed version number; 0 formats as the empty string.
pub fn version_to_string(v: u32) -> String {
    if v == 0 {
        return String::new();
    }

    let a = (v >> 24) & 0xff;
    let b = (v >> 16) & 0xff;
    let c = (v >> 8) & 0xff;
    let d = v & 0xff;

    if v < V3_3_0_13 {
        let mut s = format!("{}.{}", a, b);
        if c > 0 || d > 0 {
            s.push_str(&c.to_string());
        }
        if d > 0 {
            s.push_str(&d.to_string());
        }
        s
    } else {
        format!("{}.{}.{}.{}", a, b, c, d)
    }
}
