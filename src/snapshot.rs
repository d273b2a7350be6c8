//! Flat binary snapshots of a [`ProbeTable`].
//!
//! Wire layout, little-endian: a fixed 16-byte header (magic, version,
//! entry count, reserved word), followed by one record per live entry:
//! 4-byte signed key, 4-byte value length, then the raw UTF-8 value bytes
//! with no terminator. Records follow the slot array's physical order.
//!
//! Decoding is defensive: the magic and version must match exactly, and
//! every declared value length is bounds-checked against [`MAX_VALUE_LEN`]
//! before anything is allocated for it, so a corrupt or hostile file cannot
//! request an absurd buffer.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;

use crate::error::{Result, StoreError};
use crate::table::ProbeTable;

/// Identifies a snapshot file ("KVS" plus a format byte).
pub const SNAPSHOT_MAGIC: u32 = 0x4B56_5301;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Hard ceiling on a single record's declared value length.
pub const MAX_VALUE_LEN: u32 = 100_000;

/// Fixed-size header at the front of every snapshot.
///
/// Layout (16 bytes):
/// - magic: u32        format identification
/// - version: u32      format version
/// - entry_count: u32  number of records that follow
/// - reserved: u32     always zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    pub entry_count: u32,
    pub reserved: u32,
}

impl SnapshotHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 16;

    pub fn new(entry_count: u32) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: SNAPSHOT_VERSION,
            entry_count,
            reserved: 0,
        }
    }

    /// Encodes the header into the front of `buf`.
    pub fn encode(&self, buf: &mut [u8; Self::SIZE]) {
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&self.entry_count.to_le_bytes());
        buf[12..16].copy_from_slice(&self.reserved.to_le_bytes());
    }

    /// Decodes a header without validating its fields; see
    /// [`SnapshotHeader::validate`].
    pub fn decode(buf: &[u8; Self::SIZE]) -> Self {
        Self {
            magic: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            version: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            entry_count: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            reserved: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        }
    }

    /// Rejects headers whose magic or version do not match this build's
    /// format exactly.
    pub fn validate(&self) -> Result<()> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(StoreError::Corruption("snapshot magic mismatch"));
        }
        if self.version != SNAPSHOT_VERSION {
            return Err(StoreError::Corruption("unsupported snapshot version"));
        }
        Ok(())
    }
}

/// Writes every live entry of `table` to a new snapshot at `path`,
/// returning the number of records written. Any I/O failure reports
/// [`StoreError::FileIo`].
pub fn write_snapshot(table: &ProbeTable, path: &Path) -> Result<usize> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let mut buf = [0u8; SnapshotHeader::SIZE];
    SnapshotHeader::new(table.len() as u32).encode(&mut buf);
    writer.write_all(&buf)?;

    for (key, value) in table {
        writer.write_all(&key.to_le_bytes())?;
        writer.write_all(&(value.len() as u32).to_le_bytes())?;
        writer.write_all(value.as_bytes())?;
    }

    writer.flush()?;
    debug!("wrote snapshot {:?} ({} entries)", path, table.len());
    Ok(table.len())
}

/// Reads the snapshot at `path` into `table` through the normal insertion
/// path, returning the number of records read.
///
/// The load fails as a whole on a truncated file, a validation failure or a
/// rejected insert; records decoded before the failure point remain
/// applied.
pub fn read_snapshot(table: &mut ProbeTable, path: &Path) -> Result<usize> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut buf = [0u8; SnapshotHeader::SIZE];
    reader.read_exact(&mut buf)?;
    let header = SnapshotHeader::decode(&buf);
    header.validate()?;

    for _ in 0..header.entry_count {
        let mut word = [0u8; 4];
        reader.read_exact(&mut word)?;
        let key = i32::from_le_bytes(word);

        reader.read_exact(&mut word)?;
        let value_len = u32::from_le_bytes(word);
        if value_len > MAX_VALUE_LEN {
            return Err(StoreError::Corruption("value length exceeds ceiling"));
        }

        let mut bytes = vec![0u8; value_len as usize];
        reader.read_exact(&mut bytes)?;
        let value = String::from_utf8(bytes)
            .map_err(|_| StoreError::Corruption("value is not valid UTF-8"))?;

        table.set(key, value)?;
    }

    debug!("read snapshot {:?} ({} entries)", path, header.entry_count);
    Ok(header.entry_count as usize)
}

/// Whether a readable snapshot file exists at `path`. Does not validate its
/// contents.
pub fn snapshot_exists(path: &Path) -> bool {
    File::open(path).is_ok()
}
