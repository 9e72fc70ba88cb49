//! Unit tests for object_id.rs
//!
//! Tests determinism and equality of the name hash.

use crate::object_id::ObjectId;

#[test]
fn test_object_id_deterministic() {
    let a = ObjectId::from_name("vertex_buffer");
    let b = ObjectId::from_name("vertex_buffer");
    assert_eq!(a, b);
    assert_eq!(a.raw(), b.raw());
}

#[test]
fn test_object_id_distinct_names() {
    let a = ObjectId::from_name("vertex_buffer");
    let b = ObjectId::from_name("index_buffer");
    assert_ne!(a, b);
}

#[test]
fn test_object_id_empty_name() {
    // The empty name hashes like any other; rejecting it is the facade's job
    let a = ObjectId::from_name("");
    let b = ObjectId::from_name("");
    assert_eq!(a, b);
}

#[test]
fn test_object_id_usable_as_map_key() {
    use rustc_hash::FxHashMap;

    let mut map: FxHashMap<ObjectId, u32> = FxHashMap::default();
    map.insert(ObjectId::from_name("a"), 1);
    map.insert(ObjectId::from_name("b"), 2);

    assert_eq!(map.get(&ObjectId::from_name("a")), Some(&1));
    assert_eq!(map.get(&ObjectId::from_name("b")), Some(&2));
    assert_eq!(map.get(&ObjectId::from_name("c")), None);
}

#[test]
fn test_object_id_display_format() {
    let id = ObjectId::from_name("buffer");
    let rendered = format!("{}", id);
    assert!(rendered.starts_with("0x"));
    // 0x prefix + 16 hex digits
    assert_eq!(rendered.len(), 18);
}
