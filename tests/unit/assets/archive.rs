use std::io::Write;

use super::*;

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, bytes) in entries {
        w.start_file(*name, opts).unwrap();
        w.write_all(bytes).unwrap();
    }
    w.finish().unwrap().into_inner()
}

#[test]
fn normalize_entry_name_slash_normalization() {
    assert_eq!(normalize_entry_name("data/0.webp").unwrap(), "data/0.webp");
    assert_eq!(normalize_entry_name("data\\0.webp").unwrap(), "data/0.webp");
    assert_eq!(normalize_entry_name("./data//0.webp").unwrap(), "data/0.webp");
    assert!(normalize_entry_name("../x.webp").is_err());
    assert!(normalize_entry_name("/abs.webp").is_err());
    assert!(normalize_entry_name("").is_err());
    assert!(normalize_entry_name("./").is_err());
}

#[test]
fn zip_store_reads_bytes_and_text() {
    let bytes = zip_bytes(&[
        ("mimetype", b"image/openraster"),
        ("stack.xml", b"<image/>"),
        ("data/0.webp", &[1, 2, 3]),
    ]);
    let store = ZipArchiveStore::from_bytes(bytes).unwrap();

    assert_eq!(store.text("mimetype").unwrap(), "image/openraster");
    assert_eq!(store.bytes("data/0.webp").unwrap(), vec![1, 2, 3]);
    assert_eq!(store.bytes("./data\\0.webp").unwrap(), vec![1, 2, 3]);
    assert!(store.contains("stack.xml"));
    assert_eq!(
        store.entry_names(),
        vec!["data/0.webp", "mimetype", "stack.xml"]
    );
}

#[test]
fn zip_store_missing_entry_is_entry_not_found() {
    let store = ZipArchiveStore::from_bytes(zip_bytes(&[("a", b"x")])).unwrap();
    assert!(matches!(
        store.bytes("b"),
        Err(CgError::EntryNotFound(name)) if name == "b"
    ));
    assert!(matches!(
        store.bytes("../a"),
        Err(CgError::EntryNotFound(_))
    ));
    assert!(!store.contains("b"));
}

#[test]
fn zip_store_rejects_non_zip_input() {
    assert!(matches!(
        ZipArchiveStore::from_bytes(b"definitely not a zip".to_vec()),
        Err(CgError::InvalidContainer(_))
    ));
}

#[test]
fn zip_store_skips_directory_entries() {
    let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts = zip::write::FileOptions::default();
    w.add_directory("data/", opts).unwrap();
    w.start_file("data/0.png", opts).unwrap();
    w.write_all(&[9]).unwrap();
    let bytes = w.finish().unwrap().into_inner();

    let store = ZipArchiveStore::from_bytes(bytes).unwrap();
    assert_eq!(store.entry_names(), vec!["data/0.png"]);
}

#[test]
fn text_rejects_invalid_utf8() {
    let store = MemoryArchiveStore::new()
        .with_entry("stack.xml", vec![0xff, 0xfe])
        .unwrap();
    assert!(matches!(
        store.text("stack.xml"),
        Err(CgError::InvalidContainer(_))
    ));
}

#[test]
fn memory_store_normalizes_names() {
    let store = MemoryArchiveStore::new()
        .with_entry("data\\a.png", vec![7])
        .unwrap();
    assert_eq!(store.bytes("./data/a.png").unwrap(), vec![7]);
    assert_eq!(store.entry_names(), vec!["data/a.png"]);
    assert!(MemoryArchiveStore::new().with_entry("../a", vec![]).is_err());
}

#[test]
fn declared_entry_size_is_capped_before_allocation() {
    assert_eq!(prealloc_hint(0), 0);
    assert_eq!(prealloc_hint(1234), 1234);
    assert_eq!(prealloc_hint(u64::MAX), MAX_PREALLOC as usize);
}
