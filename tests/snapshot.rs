// Persistence test suite: snapshot round-trips and defensive decoding.
//
// The wire format under test: 16-byte header (magic 0x4B565301, version 1,
// entry count, reserved zero, all little-endian), then per record a 4-byte
// signed key, a 4-byte value length and the raw UTF-8 value bytes. Corrupt
// inputs must fail with Corruption (bad magic/version, oversized or
// malformed values) or FileIo (truncation), and must never populate the
// target store with garbage beyond what was validly parsed.
use std::fs;
use std::path::PathBuf;

use probekv::snapshot::{self, SnapshotHeader, MAX_VALUE_LEN, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
use probekv::{KvStore, StoreError, TOMBSTONE_KEY};
use tempfile::TempDir;

fn temp_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

// Builds snapshot bytes by hand so tests control every field.
fn raw_snapshot(entry_count: u32, records: &[(i32, &[u8])]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&SNAPSHOT_MAGIC.to_le_bytes());
    bytes.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&entry_count.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    for (key, value) in records {
        bytes.extend_from_slice(&key.to_le_bytes());
        bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
        bytes.extend_from_slice(value);
    }
    bytes
}

// Test: the canonical round-trip. Save three entries, load into a fresh
// store, observe the same mapping and an updated associated path.
#[test]
fn save_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "kv.bin");

    let mut source = KvStore::new().unwrap();
    source.set(100, "one hundred").unwrap();
    source.set(200, "two hundred").unwrap();
    source.set(300, "three hundred").unwrap();
    assert_eq!(source.save(&path).unwrap(), 3);
    assert_eq!(source.path(), Some(path.as_path()));

    let mut target = KvStore::new().unwrap();
    assert_eq!(target.load(&path).unwrap(), 3);
    assert_eq!(target.count(), 3);
    assert_eq!(target.get(100).unwrap(), "one hundred");
    assert_eq!(target.get(200).unwrap(), "two hundred");
    assert_eq!(target.get(300).unwrap(), "three hundred");
    assert_eq!(target.path(), Some(path.as_path()));
}

// Test: an empty store round-trips to a header-only file.
#[test]
fn empty_store_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "empty.bin");

    let mut source = KvStore::new().unwrap();
    assert_eq!(source.save(&path).unwrap(), 0);
    assert_eq!(
        fs::metadata(&path).unwrap().len(),
        SnapshotHeader::SIZE as u64
    );

    let mut target = KvStore::new().unwrap();
    assert_eq!(target.load(&path).unwrap(), 0);
    assert!(target.is_empty());
}

// Test: loading goes through the normal set path, so records merge into
// (and overwrite within) a non-empty target.
#[test]
fn load_merges_into_existing_entries() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "merge.bin");

    let mut source = KvStore::new().unwrap();
    source.set(1, "from file").unwrap();
    source.set(2, "also from file").unwrap();
    source.save(&path).unwrap();

    let mut target = KvStore::new().unwrap();
    target.set(1, "stale").unwrap();
    target.set(99, "kept").unwrap();
    target.load(&path).unwrap();

    assert_eq!(target.count(), 3);
    assert_eq!(target.get(1).unwrap(), "from file");
    assert_eq!(target.get(2).unwrap(), "also from file");
    assert_eq!(target.get(99).unwrap(), "kept");
}

// Test: deleted entries are not written out.
#[test]
fn tombstones_are_not_persisted() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "tombstones.bin");

    let mut source = KvStore::new().unwrap();
    for key in 0..6 {
        source.set(key, "v").unwrap();
    }
    source.delete(2).unwrap();
    source.delete(3).unwrap();
    assert_eq!(source.save(&path).unwrap(), 4);

    let mut target = KvStore::new().unwrap();
    assert_eq!(target.load(&path).unwrap(), 4);
    assert!(matches!(target.get(2), Err(StoreError::KeyNotFound)));
    assert!(matches!(target.get(3), Err(StoreError::KeyNotFound)));
    assert_eq!(target.get(0).unwrap(), "v");
}

// Test: a corrupted magic number is rejected before any record is read,
// and the target store is left untouched.
#[test]
fn corrupt_magic_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "badmagic.bin");

    let mut bytes = raw_snapshot(1, &[(1, b"one".as_slice())]);
    bytes[0] ^= 0xFF;
    fs::write(&path, bytes).unwrap();

    let mut target = KvStore::new().unwrap();
    let err = target.load(&path).unwrap_err();
    assert!(matches!(err, StoreError::Corruption(_)));
    assert!(target.is_empty());
    assert_eq!(target.path(), None);
}

// Test: a version from the future is rejected the same way.
#[test]
fn unsupported_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "badversion.bin");

    let mut bytes = raw_snapshot(0, &[]);
    bytes[4..8].copy_from_slice(&(SNAPSHOT_VERSION + 1).to_le_bytes());
    fs::write(&path, bytes).unwrap();

    let mut target = KvStore::new().unwrap();
    assert!(matches!(
        target.load(&path).unwrap_err(),
        StoreError::Corruption(_)
    ));
}

// Test: a declared value length above the ceiling fails with Corruption
// before any allocation for it; records before the bad one stay applied.
#[test]
fn oversized_value_length_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "oversized.bin");

    let mut bytes = raw_snapshot(2, &[(1, b"fine".as_slice())]);
    // Second record: plausible key, absurd length, no body.
    bytes.extend_from_slice(&2i32.to_le_bytes());
    bytes.extend_from_slice(&(MAX_VALUE_LEN + 1).to_le_bytes());
    fs::write(&path, bytes).unwrap();

    let mut target = KvStore::new().unwrap();
    let err = target.load(&path).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Corruption("value length exceeds ceiling")
    ));
    // The valid prefix was applied; nothing beyond it was.
    assert_eq!(target.count(), 1);
    assert_eq!(target.get(1).unwrap(), "fine");
    assert!(matches!(target.get(2), Err(StoreError::KeyNotFound)));
    assert_eq!(target.path(), None);
}

// Test: a value length exactly at the ceiling is accepted.
#[test]
fn value_length_at_ceiling_is_accepted() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "ceiling.bin");

    let big = "x".repeat(MAX_VALUE_LEN as usize);
    let bytes = raw_snapshot(1, &[(7, big.as_bytes())]);
    fs::write(&path, bytes).unwrap();

    let mut target = KvStore::new().unwrap();
    assert_eq!(target.load(&path).unwrap(), 1);
    assert_eq!(target.get(7).unwrap().len(), MAX_VALUE_LEN as usize);
}

// Test: truncation inside a record body fails with FileIo.
#[test]
fn truncated_record_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "truncated.bin");

    let mut bytes = raw_snapshot(1, &[(5, b"complete value".as_slice())]);
    bytes.truncate(bytes.len() - 4);
    fs::write(&path, bytes).unwrap();

    let mut target = KvStore::new().unwrap();
    assert!(matches!(
        target.load(&path).unwrap_err(),
        StoreError::FileIo(_)
    ));
}

// Test: a header that claims more records than the file holds fails with
// FileIo once the reader runs out of bytes.
#[test]
fn entry_count_beyond_eof_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "shortcount.bin");

    let bytes = raw_snapshot(3, &[(1, b"only one".as_slice())]);
    fs::write(&path, bytes).unwrap();

    let mut target = KvStore::new().unwrap();
    let err = target.load(&path).unwrap_err();
    assert!(matches!(err, StoreError::FileIo(_)));
    assert_eq!(target.count(), 1);
}

// Test: value bytes that are not valid UTF-8 are Corruption, not a panic.
#[test]
fn invalid_utf8_value_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "badutf8.bin");

    let bytes = raw_snapshot(1, &[(1, [0xFF, 0xFE, 0xFD].as_slice())]);
    fs::write(&path, bytes).unwrap();

    let mut target = KvStore::new().unwrap();
    assert!(matches!(
        target.load(&path).unwrap_err(),
        StoreError::Corruption("value is not valid UTF-8")
    ));
}

// Test: a record carrying the reserved key is refused by the insertion
// path, failing the load as a whole.
#[test]
fn reserved_key_record_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "reservedkey.bin");

    let bytes = raw_snapshot(1, &[(TOMBSTONE_KEY, b"nope".as_slice())]);
    fs::write(&path, bytes).unwrap();

    let mut target = KvStore::new().unwrap();
    assert!(matches!(
        target.load(&path).unwrap_err(),
        StoreError::InvalidParam
    ));
    assert!(target.is_empty());
}

// Test: snapshot_exists reflects file presence without validating content.
#[test]
fn snapshot_exists_probes_the_path() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "exists.bin");

    assert!(!snapshot::snapshot_exists(&path));
    fs::write(&path, b"not even a header").unwrap();
    assert!(snapshot::snapshot_exists(&path));
}

// Test: saving records the path and overwrites a previous snapshot file.
#[test]
fn save_overwrites_previous_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "overwrite.bin");

    let mut store = KvStore::new().unwrap();
    for key in 0..10 {
        store.set(key, "old").unwrap();
    }
    store.save(&path).unwrap();

    store.clear();
    store.set(1, "new").unwrap();
    assert_eq!(store.save(&path).unwrap(), 1);

    let mut reloaded = KvStore::new().unwrap();
    assert_eq!(reloaded.load(&path).unwrap(), 1);
    assert_eq!(reloaded.get(1).unwrap(), "new");
    assert!(matches!(reloaded.get(2), Err(StoreError::KeyNotFound)));
}
