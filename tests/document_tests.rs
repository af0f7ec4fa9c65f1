//! Editing workflows through the public document API.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use nifcore::prelude::*;
use nifcore::schema::{registry, DisplayHint};

const SCHEMA: &str = include_str!("data/test_schema.json");

fn document_at(schema: Arc<Schema>, version: &str) -> Document {
    let settings = Settings { startup_version: version.into(), ..Default::default() };
    Document::new(schema, &settings)
}

fn fresh(version: &str) -> Document {
    document_at(Arc::new(Schema::from_json(SCHEMA).unwrap()), version)
}

#[test]
fn test_registry_shared_schema() {
    let installed = registry::install(Schema::from_json(SCHEMA).unwrap());
    let current = registry::current().expect("schema installed");
    assert!(Arc::ptr_eq(&installed, &current));

    let doc = document_at(current, "20.0.0.5");
    assert!(Arc::ptr_eq(doc.schema(), &installed));
    assert_eq!(doc.version_string(), "20.0.0.5");

    // Documents keep their schema after the slot is cleared.
    registry::clear();
    assert!(registry::current().is_none());
    assert!(doc.schema().is_block("NiNode"));
}

#[test]
fn test_schema_queries() {
    let schema = Schema::from_json(SCHEMA).unwrap();
    assert!(schema.inherits("NiSwitchNode", "NiAVObject"));
    assert!(!schema.inherits("NiAlphaProperty", "NiAVObject"));
    assert!(schema.is_version_supported(version_to_number("20.2.0.7")));
    assert!(!schema.is_version_supported(version_to_number("20.1.0.3")));
    assert_eq!(schema.display_hint("NodeFlags"), DisplayHint::BitFlags);
    assert_eq!(schema.enum_option("AlphaFormat", 2).as_deref(), Some("ALPHA_SMOOTH"));
    assert_eq!(schema.enum_value("AlphaFormat", "ALPHA_NONE"), Some(0));
}

#[test]
fn test_type_conditions() {
    let mut doc = fresh("20.0.0.5");
    let node = doc.insert_block("NiNode", None).unwrap();
    let switch = doc.insert_block("NiSwitchNode", None).unwrap();
    assert!(doc.get_item(node, "Switch Extra").is_none());
    assert!(doc.get_item(switch, "Switch Extra").is_some());
    assert!(doc.inherits_item(switch, "NiNode"));
    assert_eq!(doc.block(1, Some("NiNode")), Some(switch));
    assert_eq!(doc.block(0, Some("NiProperty")), None);

    // Non-blocks are refused.
    assert!(doc.insert_block("Header", None).is_none());
    assert!(doc.insert_block("NiObject", None).is_some());
}

#[test]
fn test_conditional_array_follows_flag() {
    let mut doc = fresh("20.0.0.5");
    let data = doc.insert_block("NiTriStripsData", None).unwrap();
    doc.set(data, "Num Vertices", 3u32);
    doc.update_arrays(data).unwrap();
    assert!(doc.get_item(data, "Vertices").is_none());

    doc.set(data, "Has Vertices", true);
    doc.update_arrays(data).unwrap();
    let verts = doc.get_item(data, "Vertices").unwrap();
    assert_eq!(doc.tree().child_count(verts), 3);
    assert_eq!(doc.array_size(verts).unwrap(), 3);
}

#[test]
fn test_argument_arrays() {
    let mut doc = fresh("20.0.0.5");
    let data = doc.insert_block("NiIntegerData", None).unwrap();
    doc.set(data, "Count", 4u32);
    doc.update_arrays(data).unwrap();
    assert_eq!(doc.get_array::<u32>(data, "List/Items").len(), 4);
    assert_eq!(doc.get_array::<u32>(data, "Fixed/Items").len(), 2);
}

#[test]
fn test_oversized_array_is_refused() {
    let mut doc = fresh("20.0.0.5");
    let node = doc.insert_block("NiNode", None).unwrap();
    doc.set(node, "Num Children", u32::MAX);
    assert!(doc.update_array_at(node, "Children").is_err());
}

#[test]
fn test_remove_block_rewrites_links() {
    let mut doc = fresh("20.0.0.5");
    let root = doc.insert_block("NiNode", None).unwrap();
    doc.insert_block("NiNode", None).unwrap();
    doc.insert_block("NiNode", None).unwrap();
    doc.set(root, "Num Children", 2u32);
    doc.update_array_at(root, "Children").unwrap();
    doc.set_link_array(root, "Children", &[1, 2]);
    assert_eq!(doc.child_links(0), &[1, 2]);
    assert_eq!(doc.root_links(), &[0]);

    assert!(doc.remove_block(1));
    assert_eq!(doc.block_count(), 2);
    assert_eq!(doc.get_link_array(root, "Children"), vec![-1, 1]);
    assert_eq!(doc.child_links(0), &[1]);
    assert!(!doc.remove_block(5));
}

#[test]
fn test_skin_parent_links() {
    let mut doc = fresh("20.0.0.5");
    doc.insert_block("NiNode", None).unwrap();
    doc.insert_block("NiNode", None).unwrap();
    let skin = doc.insert_block("NiSkinInstance", None).unwrap();
    doc.set_link(skin, "Skeleton Root", 0);
    doc.set(skin, "Num Bones", 2u32);
    doc.update_array_at(skin, "Bones").unwrap();
    doc.set_link_array(skin, "Bones", &[1, 0]);

    assert_eq!(doc.parent_links(2), &[0, 1]);
    assert!(doc.child_links(2).is_empty());
    assert_eq!(doc.root_links(), &[0, 1, 2]);
}

#[test]
fn test_string_table_at_20_2() {
    let mut doc = fresh("20.2.0.7");
    let a = doc.insert_block("NiStringExtraData", None).unwrap();
    let b = doc.insert_block("NiStringExtraData", None).unwrap();
    doc.set_string(a, "Name", "shared");
    doc.set_string(b, "Name", "shared");
    doc.set_string(b, "String Data", "other");
    let bytes = doc.save_to_vec().unwrap();

    let mut back = fresh("20.0.0.5");
    back.load(&bytes).unwrap();
    let h = back.header();
    assert_eq!(back.get_array::<String>(h, "Strings"), vec!["shared", "other"]);
    let b = back.block_item(1).unwrap();
    assert_eq!(back.get_string_at(b, "Name"), "shared");
    assert_eq!(back.get_string_at(b, "String Data"), "other");
}

#[test]
fn test_batched_edits_notify_once() {
    let mut doc = fresh("20.0.0.5");
    let node = doc.insert_block("NiNode", None).unwrap();
    let prop = doc.insert_block("NiAlphaProperty", None).unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let sub = doc.subscribe(move |ev| sink.borrow_mut().push(ev.clone()));

    doc.batch(|doc| {
        doc.set(node, "Num Properties", 1u32);
        doc.update_array_at(node, "Properties").unwrap();
        doc.set_link(node, "Properties/Properties[0]", 1);
        doc.set(prop, "Threshold", 200u32);
    });
    assert_eq!(log.borrow().as_slice(), &[ChangeEvent::DataChanged { first: node, last: prop }]);
    assert_eq!(doc.root_links(), &[0]);

    assert!(doc.unsubscribe(sub));
    doc.set(prop, "Threshold", 100u32);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_load_resets_observers_view() {
    let mut doc = fresh("4.0.0.2");
    doc.insert_block("NiAlphaProperty", None).unwrap();
    let bytes = doc.save_to_vec().unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let mut back = fresh("20.0.0.5");
    back.subscribe(move |ev| sink.borrow_mut().push(ev.clone()));
    back.load(&bytes).unwrap();
    assert_eq!(log.borrow().last(), Some(&ChangeEvent::Reset));
    assert_eq!(back.version(), version_to_number("4.0.0.2"));
    assert!(!back.is_loading());
}
