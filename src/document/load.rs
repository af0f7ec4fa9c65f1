//! Decoding whole files.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::blocks::{block_type_hash, split_rtti};
use super::{ChangeEvent, Document, State};
use crate::codec::NifReader;
use crate::model::ItemId;
use crate::util::{
    version_to_number, version_to_string, Error, Result, V10_0_0_0, V10_1_0_0, V10_2_0_0,
    V20_2_0_0, V20_3_1_2, V3_3_0_13,
};
use crate::value::{latin1_to_string, ValueKind};

/// Banner prefixes of files we accept.
const BANNERS: [&str; 5] = [
    "NetImmerse File Format",
    "Gamebryo",
    "NDSNIF",
    "NS",
    "Joymaster HS1 Object Format - (JMI)",
];

pub(super) const TOP_LEVEL_OBJECT: &str = "Top Level Object";
pub(super) const END_OF_FILE: &str = "End Of File";

/// Longest inline block type name.
const MAX_INLINE_NAME: i32 = 80;

/// Version named by a header banner line.
///
/// The number follows the word `Version` (any case). NeoSteam banners carry
/// none and map to 10.1.0.0. Returns 0 for a malformed number.
pub fn parse_header_string(s: &str) -> Result<u32> {
    if !BANNERS.iter().any(|b| s.starts_with(b)) {
        return Err(Error::InvalidMagic(s.chars().take(64).collect()));
    }
    match s.to_ascii_lowercase().find("version") {
        Some(p) => {
            let rest = s.get(p + 8..).unwrap_or("");
            let end = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
            Ok(version_to_number(&rest[..end]))
        }
        None if s.starts_with("NS") => Ok(V10_1_0_0),
        None => Err(Error::InvalidMagic(s.to_owned())),
    }
}

/// Blocks separated by a zero word: 10.0.x to 10.1.x, Havok blocks excepted.
pub(super) fn has_separator(version: u32, type_name: &str) -> bool {
    version > V10_0_0_0 && version < V10_2_0_0 && !type_name.starts_with("bhk")
}

/// Inline `i32` length + Latin-1 name.
fn read_inline_name(r: &mut NifReader, min: i32, block: usize) -> Result<String> {
    let at = r.pos();
    let len = r.read_i32()?;
    if !(min..=MAX_INLINE_NAME).contains(&len) {
        return Err(Error::InvalidStructure(format!(
            "block {block} does not start with a type name (length {len} at {at})"
        )));
    }
    Ok(latin1_to_string(&r.read_bytes(len as usize)?))
}

/// Header tables used to name blocks in newer files.
struct BlockTable {
    types: Vec<String>,
    index: Vec<u32>,
    hashes: Vec<u32>,
    sizes: Vec<u32>,
    by_hash: HashMap<u32, String>,
}

impl BlockTable {
    fn type_name(&self, c: usize, version: u32) -> Result<String> {
        let i = self.index.get(c).map_or(0, |i| (i & 0x7fff) as usize);
        if version == V20_3_1_2 {
            let hash = self.hashes.get(i).copied().unwrap_or(0);
            return self.by_hash.get(&hash).cloned().ok_or_else(|| Error::UnknownBlock {
                index: c,
                type_name: format!("hash 0x{hash:08X}"),
            });
        }
        self.types.get(i).cloned().ok_or_else(|| Error::UnknownBlock {
            index: c,
            type_name: format!("type index {i}"),
        })
    }
}

impl Document {
    /// Load a file from memory, replacing the current content.
    ///
    /// On failure the document keeps whatever was decoded so far.
    pub fn load(&mut self, data: &[u8]) -> Result<()> {
        let span = tracing::info_span!("load", bytes = data.len());
        let _enter = span.enter();

        self.state = State::Loading;
        self.reset_tree();
        let result = self.load_body(data);
        self.state = State::Idle;

        self.refresh_links();
        self.emit(ChangeEvent::Reset);
        match &result {
            Ok(()) => tracing::info!(
                "loaded {} blocks, version {}",
                self.block_count(),
                version_to_string(self.version)
            ),
            Err(e) => tracing::warn!("load failed: {e}"),
        }
        result
    }

    pub fn load_from(&mut self, mut reader: impl Read) -> Result<()> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.load(&data)
    }

    /// Load a file from disk.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tracing::debug!("opening {}", path.display());
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return self.load(&[]);
        }
        self.load_file(file)
    }

    #[cfg(feature = "mmap")]
    fn load_file(&mut self, file: File) -> Result<()> {
        // Safety: read-only map, dropped before returning.
        let map = unsafe { memmap2::Mmap::map(&file) }?;
        self.load(&map)
    }

    #[cfg(not(feature = "mmap"))]
    fn load_file(&mut self, mut file: File) -> Result<()> {
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        self.load(&data)
    }

    /// Take version and flags from a banner line.
    fn apply_header_string(&mut self, banner: &str) -> Result<()> {
        let version = parse_header_string(banner)?;
        if version == 0 || !self.schema.is_version_supported(version) {
            return Err(Error::UnsupportedVersion(version));
        }
        self.version = version;
        self.header_string = banner.to_owned();
        self.update_flags();
        tracing::debug!("banner {banner:?}, version {}", version_to_string(version));
        Ok(())
    }

    /// Decode the present children of `id`, sizing arrays as they come.
    fn load_item(&mut self, r: &mut NifReader, id: ItemId) -> Result<()> {
        let kids = self.tree.children(id).to_vec();
        for c in kids {
            let Some(item) = self.tree.get(c) else { continue };
            if item.is_abstract() || !self.eval_condition(c, false) {
                continue;
            }
            if item.is_array() {
                self.update_array(c)?;
                self.load_item(r, c)?;
                continue;
            }
            if item.child_count() > 0 {
                self.load_item(r, c)?;
                continue;
            }

            let Some(value) = self.tree.get_mut(c).map(|i| i.value_mut()) else { continue };
            if let Err(e) = r.read(value) {
                tracing::debug!("{} at {}: {e}", self.tree.path(c), r.pos());
                return Err(e);
            }
            if value.kind() == ValueKind::HeaderString {
                let banner = value.as_str().unwrap_or_default().to_owned();
                self.apply_header_string(&banner)?;
                r.set_flags(self.flags);
            }
        }
        Ok(())
    }

    fn load_header(&mut self, r: &mut NifReader) -> Result<()> {
        let header = self.header();
        self.set(header, "User Version", 0u32);
        self.set(header, "User Version 2", 0u32);
        self.load_item(r, header)?;

        if self.get_item(header, "Endian Type").is_some() && self.get::<u32>(header, "Endian Type") == 0 {
            return Err(Error::InvalidStructure("big-endian files are not supported".into()));
        }
        Ok(())
    }

    fn load_body(&mut self, data: &[u8]) -> Result<()> {
        let mut r = NifReader::new(data, self.flags);
        self.load_header(&mut r)?;

        if self.version < V3_3_0_13 {
            return self.load_legacy_blocks(&mut r);
        }

        let header = self.header();
        let count = self.get::<u32>(header, "Num Blocks") as usize;
        let table = BlockTable {
            types: self.get_array(header, "Block Types"),
            index: self.get_array(header, "Block Type Index"),
            hashes: self.get_array(header, "Block Type Hashes"),
            sizes: if !self.settings.ignore_block_size && self.version >= V20_2_0_0 {
                self.get_array(header, "Block Size")
            } else {
                Vec::new()
            },
            by_hash: if self.version == V20_3_1_2 {
                self.schema.block_names().map(|n| (block_type_hash(n), n.to_owned())).collect()
            } else {
                HashMap::new()
            },
        };

        for c in 0..count {
            if r.is_eof() {
                return Err(Error::UnexpectedEof(r.pos() as u64));
            }
            let name = if self.version > V10_0_0_0 {
                let name = table.type_name(c, self.version)?;
                if has_separator(self.version, &name) {
                    let sep = r.read_u32()?;
                    if sep != 0 {
                        tracing::warn!("non-zero block separator ({sep}) before block {c} ({name})");
                    }
                }
                name
            } else {
                read_inline_name(&mut r, 2, c)?
            };

            let start = r.pos();
            self.load_block(&mut r, c, &name)?;

            if let Some(&size) = table.sizes.get(c) {
                let expected = start + size as usize;
                if r.pos() != expected {
                    tracing::warn!(
                        "block {c} ({name}) at 0x{start:x} ended at 0x{:x}, expected 0x{expected:x}",
                        r.pos()
                    );
                    r.seek(expected);
                }
            }
        }

        let footer = self.footer();
        if let Err(e) = self.load_item(&mut r, footer) {
            tracing::warn!("footer: {e}");
        }
        Ok(())
    }

    /// Insert block `c` of type `rtti` and decode it.
    fn load_block(&mut self, r: &mut NifReader, c: usize, rtti: &str) -> Result<ItemId> {
        let (name, stream_args) = split_rtti(rtti);
        if !self.schema.is_block(name) {
            return Err(Error::UnknownBlock { index: c, type_name: name.to_owned() });
        }
        let block = self
            .insert_block(name, None)
            .ok_or_else(|| Error::UnknownBlock { index: c, type_name: name.to_owned() })?;
        tracing::debug!("block {c}: {name} at 0x{:x}", r.pos());
        self.load_item(r, block)?;

        if let Some((usage, access)) = stream_args {
            self.set(block, "Usage", usage);
            self.set(block, "Access", access);
        }
        Ok(block)
    }

    /// Files before 3.3.0.13: inline names with block ids, up to `End Of File`.
    fn load_legacy_blocks(&mut self, r: &mut NifReader) -> Result<()> {
        let mut ids = HashMap::new();
        let result = self.read_legacy_blocks(r, &mut ids);
        self.map_links(&ids);
        result
    }

    fn read_legacy_blocks(&mut self, r: &mut NifReader, ids: &mut HashMap<i32, i32>) -> Result<()> {
        for c in 0.. {
            if r.is_eof() {
                return Err(Error::UnexpectedEof(r.pos() as u64));
            }
            let mut name = read_inline_name(r, 0, c)?;
            if name == END_OF_FILE {
                break;
            }
            if name == TOP_LEVEL_OBJECT {
                name = read_inline_name(r, 0, c)?;
            }
            let id = r.read_i32()?.wrapping_sub(1);
            if id != c as i32 {
                ids.insert(id, c as i32);
            }
            self.load_block(r, c, &name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::doc_at;

    fn sized(s: &str) -> Vec<u8> {
        let mut out = (s.len() as i32).to_le_bytes().to_vec();
        out.extend_from_slice(s.as_bytes());
        out
    }

    /// 4.0.0.2 file: header, one NiAlphaProperty, footer with one root.
    fn alpha_file(type_name: &str) -> Vec<u8> {
        let mut b = b"NetImmerse File Format, Version 4.0.0.2\n".to_vec();
        b.extend_from_slice(&0x0400_0002u32.to_le_bytes());
        b.extend_from_slice(&1u32.to_le_bytes());
        b.extend(sized(type_name));
        b.extend(sized("alpha"));
        b.extend_from_slice(&0x00edu16.to_le_bytes());
        b.push(128);
        b.extend_from_slice(&1u32.to_le_bytes());
        b.extend_from_slice(&0i32.to_le_bytes());
        b
    }

    #[test]
    fn test_parse_header_string() {
        assert_eq!(parse_header_string("NetImmerse File Format, Version 4.0.0.2").unwrap(), 0x04000002);
        assert_eq!(parse_header_string("Gamebryo File Format, Version 20.2.0.7").unwrap(), 0x14020007);
        assert_eq!(parse_header_string("NDSNIF....@....@...., Version 20.3.0.9").unwrap(), 0x14030009);
        assert_eq!(parse_header_string("NS").unwrap(), V10_1_0_0);
        assert_eq!(
            parse_header_string("Joymaster HS1 Object Format - (JMI), Version 20.1.0.3").unwrap(),
            0x14010003
        );
        assert_eq!(parse_header_string("Gamebryo File Format, VERSION 10.1.0.0x").unwrap(), V10_1_0_0);
        assert!(matches!(parse_header_string("PK\x03\x04"), Err(Error::InvalidMagic(_))));
        assert!(matches!(parse_header_string("Gamebryo File Format"), Err(Error::InvalidMagic(_))));
    }

    #[test]
    fn test_separator_rule() {
        assert!(has_separator(0x0A000100, "NiNode"));
        assert!(!has_separator(0x0A000100, "bhkRigidBody"));
        assert!(!has_separator(V10_0_0_0, "NiNode"));
        assert!(!has_separator(V10_2_0_0, "NiNode"));
    }

    #[test]
    fn test_load_inline_names() {
        let mut doc = doc_at("20.0.0.5");
        doc.load(&alpha_file("NiAlphaProperty")).unwrap();
        assert_eq!(doc.version(), 0x04000002);
        assert!(doc.flags().bool32);
        assert_eq!(doc.block_count(), 1);
        let b = doc.block_item(0).unwrap();
        assert_eq!(doc.name_of(b), "NiAlphaProperty");
        assert_eq!(doc.get_string_at(b, "Name"), "alpha");
        assert_eq!(doc.get::<u32>(b, "Flags"), 0xed);
        assert_eq!(doc.get::<u32>(b, "Threshold"), 128);
        assert_eq!(doc.root_links(), &[0]);
        assert_eq!(doc.get_link_array(doc.footer(), "Roots"), vec![0]);
        assert!(!doc.is_loading());
    }

    #[test]
    fn test_unknown_block_aborts() {
        let mut doc = doc_at("20.0.0.5");
        let e = doc.load(&alpha_file("NiBogus")).unwrap_err();
        assert!(matches!(e, Error::UnknownBlock { index: 0, ref type_name } if type_name == "NiBogus"));
    }

    #[test]
    fn test_bad_banner_and_version() {
        let mut doc = doc_at("20.0.0.5");
        assert!(matches!(doc.load(b"hello world\n"), Err(Error::InvalidMagic(_))));
        let e = doc.load(b"Gamebryo File Format, Version 1.2.3.4\n").unwrap_err();
        assert!(matches!(e, Error::UnsupportedVersion(0x01020304)));
    }

    #[test]
    fn test_truncated() {
        let mut doc = doc_at("20.0.0.5");
        let mut data = alpha_file("NiAlphaProperty");
        data.truncate(data.len() - 12);
        assert!(matches!(doc.load(&data), Err(Error::UnexpectedEof(_))));
    }

    #[test]
    fn test_big_endian_rejected() {
        let mut b = b"Gamebryo File Format, Version 20.0.0.5\n".to_vec();
        b.extend_from_slice(&0x1400_0005u32.to_le_bytes());
        b.push(0);
        // User Version, Num Blocks, Num Block Types, Unknown Int 2
        b.extend_from_slice(&[0; 14]);
        let mut doc = doc_at("20.0.0.5");
        assert!(matches!(doc.load(&b), Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn test_load_from_reader() {
        let mut doc = doc_at("20.0.0.5");
        let data = alpha_file("NiAlphaProperty");
        doc.load_from(std::io::Cursor::new(data)).unwrap();
        assert_eq!(doc.block_count(), 1);
    }
}
