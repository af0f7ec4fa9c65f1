//! Integration tests for loading hand-built files and re-saving them.

use std::sync::Arc;

use nifcore::document::block_type_hash;
use nifcore::prelude::*;
use nifcore::util::Vec3;

use tempfile::NamedTempFile;

const SCHEMA: &str = include_str!("data/test_schema.json");

fn schema() -> Arc<Schema> {
    Arc::new(Schema::from_json(SCHEMA).expect("test schema should load"))
}

fn document() -> Document {
    Document::new(schema(), &Settings::default())
}

fn document_at(version: &str) -> Document {
    let settings = Settings { startup_version: version.into(), ..Default::default() };
    Document::new(schema(), &settings)
}

/// Little-endian byte builder.
#[derive(Default)]
struct Bytes(Vec<u8>);

impl Bytes {
    fn line(mut self, s: &str) -> Self {
        self.0.extend_from_slice(s.as_bytes());
        self.0.push(b'\n');
        self
    }
    fn u8(mut self, v: u8) -> Self {
        self.0.push(v);
        self
    }
    fn u16(mut self, v: u16) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    fn u32(mut self, v: u32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    fn i32(mut self, v: i32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    fn f32(mut self, v: f32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }
    fn sized(self, s: &str) -> Self {
        let mut b = self.i32(s.len() as i32);
        b.0.extend_from_slice(s.as_bytes());
        b
    }
    fn zeros(mut self, n: usize) -> Self {
        self.0.resize(self.0.len() + n, 0);
        self
    }
}

/// NiNode body before 20.1.0.3 with `children` as raw link values.
fn legacy_node(b: Bytes, name: &str, children: &[i32]) -> Bytes {
    let mut b = b
        .sized(name)
        .u16(0) // Flags
        .zeros(12 + 36) // Translation, Rotation
        .f32(1.0)
        .u32(0) // Num Properties
        .u32(children.len() as u32);
    for c in children {
        b = b.i32(*c);
    }
    b.u32(0) // Num Effects
}

#[test]
fn test_legacy_block_ids_are_remapped() {
    let mut b = Bytes::default()
        .line("NetImmerse File Format, Version 3.1")
        .line("Numerical Design Limited, Chapel Hill, NC 27514")
        .line("Copyright (c) 1996-2000")
        .line("All Rights Reserved")
        .sized("Top Level Object")
        .sized("NiNode")
        .i32(0x1000);
    // Links are stored 1-based: 0x2000 names the block with id 0x2000.
    b = legacy_node(b, "root", &[0x2000]);
    b = b.sized("NiNode").i32(0x2000);
    b = legacy_node(b, "kid", &[]);
    let data = b.sized("End Of File").0;

    let mut doc = document();
    doc.load(&data).expect("legacy file should load");
    assert_eq!(doc.version_string(), "3.1");
    assert_eq!(doc.block_count(), 2);
    let root = doc.block_item(0).unwrap();
    assert_eq!(doc.get_string_at(root, "Name"), "root");
    assert_eq!(doc.get_link_array(root, "Children"), vec![1]);
    assert_eq!(doc.child_links(0), &[1]);
    assert_eq!(doc.root_links(), &[0]);

    let copyright = doc.get_item(doc.header(), "Copyright").unwrap();
    assert_eq!(doc.tree().child_count(copyright), 3);

    // Re-saving writes sequential ids; that output is stable.
    let saved = doc.save_to_vec().unwrap();
    assert_ne!(saved, data);
    let mut back = document();
    back.load(&saved).unwrap();
    assert_eq!(back.get_link_array(back.block_item(0).unwrap(), "Children"), vec![1]);
    assert_eq!(back.save_to_vec().unwrap(), saved);
}

#[test]
fn test_inline_names_match_bytes() {
    let mut b = Bytes::default()
        .line("NetImmerse File Format, Version 4.0.0.2")
        .u32(0x0400_0002)
        .u32(2)
        .sized("NiNode");
    b = legacy_node(b, "root", &[1]);
    b = b.sized("NiNode");
    b = legacy_node(b, "kid", &[]);
    let data = b.u32(1).i32(0).0;

    let mut doc = document();
    doc.load(&data).unwrap();
    assert_eq!(doc.child_links(0), &[1]);
    assert_eq!(doc.save_to_vec().unwrap(), data);
}

/// 20.2.0.7 file holding one `bhkRigidBody` with three trailing junk bytes.
fn padded_body() -> Vec<u8> {
    Bytes::default()
        .line("Gamebryo File Format, Version 20.2.0.7")
        .u32(0x1402_0007)
        .u8(1) // Endian Type
        .u32(0) // User Version
        .u32(1) // Num Blocks
        .u16(1) // Num Block Types
        .sized("bhkRigidBody")
        .u16(0) // Block Type Index
        .u32(7) // Block Size
        .u32(0) // Num Strings
        .u32(0) // Max String Length
        .u32(0) // Unknown Int 2
        .f32(1.5)
        .u8(0xaa)
        .u8(0xaa)
        .u8(0xaa)
        .u32(1) // Num Roots
        .i32(0)
        .0
}

#[test]
fn test_block_size_repositions() {
    let settings = Settings { ignore_block_size: false, ..Default::default() };
    let mut doc = Document::new(schema(), &settings);
    doc.load(&padded_body()).unwrap();
    let body = doc.block_item(0).unwrap();
    assert_eq!(doc.get::<f32>(body, "Mass"), 1.5);
    assert_eq!(doc.get::<u32>(doc.footer(), "Num Roots"), 1);
    assert_eq!(doc.get_link_array(doc.footer(), "Roots"), vec![0]);
}

#[test]
fn test_footer_failure_is_not_fatal() {
    // Block sizes ignored: the footer is read from the junk bytes and fails.
    let mut doc = document();
    doc.load(&padded_body()).unwrap();
    assert_eq!(doc.block_count(), 1);
    assert_eq!(doc.root_links(), &[0]);
}

#[test]
fn test_huge_pixel_count_is_rejected() {
    let data = Bytes::default()
        .line("Gamebryo File Format, Version 20.0.0.5")
        .u32(0x1400_0005)
        .u8(1) // Endian Type
        .u32(0) // User Version
        .u32(1) // Num Blocks
        .u16(1) // Num Block Types
        .sized("NiPixelData")
        .u16(0) // Block Type Index
        .u32(0) // Unknown Int 2
        .u32(u32::MAX) // Num Pixels
        .u32(1) // Format
        .zeros(16)
        .0;

    let mut doc = document();
    assert!(matches!(doc.load(&data), Err(Error::FieldDecode { .. })));
}

#[test]
fn test_type_hashes() {
    let mut doc = document_at("20.3.1.2");
    let node = doc.insert_block("NiNode", None).unwrap();
    doc.set_string(node, "Name", "hashed");
    let data = doc.save_to_vec().unwrap();

    let h = doc.header();
    assert!(doc.get_item(h, "Block Types").is_none());
    assert_eq!(doc.get_array::<u32>(h, "Block Type Hashes"), vec![block_type_hash("NiNode")]);

    let mut back = document();
    back.load(&data).unwrap();
    let node = back.block_item(0).unwrap();
    assert_eq!(back.name_of(node), "NiNode");
    assert_eq!(back.get_string_at(node, "Name"), "hashed");
    assert_eq!(back.save_to_vec().unwrap(), data);
}

#[test]
fn test_data_stream_arguments() {
    let mut doc = document_at("20.2.0.7");
    let stream = doc.insert_block("NiDataStream", None).unwrap();
    doc.set(stream, "Usage", 1u32);
    doc.set(stream, "Access", 5u32);
    doc.set(stream, "Num Bytes", 3u32);
    doc.update_array_at(stream, "Data").unwrap();
    let data = doc.get_item(stream, "Data").unwrap();
    let blob = doc.tree().child(data, 0).unwrap();
    assert!(doc.set_value(blob, vec![7u8, 8, 9]));
    let bytes = doc.save_to_vec().unwrap();

    let mut back = document();
    back.load(&bytes).unwrap();
    let stream = back.block_item(0).unwrap();
    assert_eq!(back.name_of(stream), "NiDataStream");
    assert_eq!(back.get::<u32>(stream, "Usage"), 1);
    assert_eq!(back.get::<u32>(stream, "Access"), 5);
    let data = back.get_item(stream, "Data").unwrap();
    let blob = back.tree().child(data, 0).unwrap();
    assert_eq!(back.value(blob).and_then(Value::as_bytes), Some(&[7u8, 8, 9][..]));
    assert_eq!(back.save_to_vec().unwrap(), bytes);
}

#[test]
fn test_file_round_trip() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp.path();

    let mut doc = document_at("20.0.0.5");
    let data = doc.insert_block("NiTriStripsData", None).unwrap();
    doc.set(data, "Num Vertices", 2u32);
    doc.set(data, "Has Vertices", true);
    doc.update_arrays(data).unwrap();
    doc.set_array(data, "Vertices", &[Vec3::X, Vec3::Y]);
    doc.set(data, "Num Strips", 2u32);
    doc.update_arrays(data).unwrap();
    doc.set_array(data, "Strip Lengths", &[3u32, 1]);
    doc.update_arrays(data).unwrap();
    doc.set_array(data, "Points/Points[0]", &[0u32, 1, 2]);
    doc.set_array(data, "Points/Points[1]", &[5u32]);
    doc.save_path(path).expect("Failed to write file");

    let mut back = document();
    back.open(path).expect("Failed to read file");
    let data = back.block_item(0).unwrap();
    assert_eq!(back.get_array::<Vec3>(data, "Vertices"), vec![Vec3::X, Vec3::Y]);
    assert_eq!(back.get_array::<u32>(data, "Strip Lengths"), vec![3, 1]);
    assert_eq!(back.get_array::<u32>(data, "Points/Points[0]"), vec![0, 1, 2]);
    assert_eq!(back.get_array::<u32>(data, "Points/Points[1]"), vec![5]);
}

#[test]
fn test_missing_file() {
    let mut doc = document();
    assert!(matches!(doc.open("/nonexistent/scene.nif"), Err(Error::Io(_))));
}
