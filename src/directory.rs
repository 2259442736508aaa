//! File directory: 64 fixed slots of named records
//!
//! A slot is free when it holds no record; in the region image a free
//! slot is all zeros, and a live record starts with its NUL-padded name
//! (first byte non-zero).

use crate::error::{Result, StoreError};
use crate::superblock::{MAX_FILES, NAME_LEN, RECORD_SIZE};
use std::fmt;

/// Bounds-checked file name
///
/// Fixed 32-byte field with NUL padding, at most 31 name bytes.
/// Construction fails on anything that does not fit; nothing is ever
/// silently truncated.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FileName([u8; NAME_LEN]);

impl FileName {
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(StoreError::InvalidArgument("empty file name".into()));
        }
        if name.len() > NAME_LEN - 1 {
            return Err(StoreError::InvalidArgument(format!(
                "file name too long: {} bytes (max {})",
                name.len(),
                NAME_LEN - 1
            )));
        }
        if name.bytes().any(|b| b == 0) {
            return Err(StoreError::InvalidArgument(
                "file name contains a NUL byte".into(),
            ));
        }

        let mut field = [0u8; NAME_LEN];
        field[..name.len()].copy_from_slice(name.as_bytes());
        Ok(FileName(field))
    }

    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        // Construction only accepts &str input, so the field is UTF-8.
        std::str::from_utf8(&self.0[..end]).unwrap_or("")
    }

    /// The full NUL-padded field as it appears in the region image
    pub fn as_field(&self) -> &[u8; NAME_LEN] {
        &self.0
    }
}

impl fmt::Debug for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileName({:?})", self.as_str())
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<str> for FileName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

/// One live directory record
///
/// `blocks` is the authoritative ordered list of owned block indices;
/// payload chunk *k* lives in `blocks[k]`. The encoded image keeps only
/// `start_block` (= `blocks[0]`) for byte-layout compatibility, so the
/// list is engine state with the same lifetime as the record.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub name: FileName,
    pub size: u32,
    pub timestamp: u32,
    pub kind: u8,
    pub blocks: Vec<u32>,
}

impl FileRecord {
    pub fn new(name: FileName, size: u32, blocks: Vec<u32>) -> Self {
        FileRecord {
            name,
            size,
            timestamp: 0,
            kind: 0,
            blocks,
        }
    }

    /// First owned block, as stored in the record image
    pub fn start_block(&self) -> u32 {
        self.blocks.first().copied().unwrap_or(0)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Encode to the 60-byte record image
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[0..NAME_LEN].copy_from_slice(self.name.as_field());
        bytes[32..36].copy_from_slice(&self.start_block().to_le_bytes());
        bytes[36..40].copy_from_slice(&self.size.to_le_bytes());
        bytes[40..44].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes[44] = self.kind;
        // bytes 45..60 reserved
        bytes
    }
}

/// Fixed-size directory of file records
#[derive(Debug, Clone)]
pub struct Directory {
    slots: Vec<Option<FileRecord>>,
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

impl Directory {
    pub fn new() -> Self {
        Directory {
            slots: (0..MAX_FILES).map(|_| None).collect(),
        }
    }

    /// Resolve a name to its slot index
    pub fn find(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(record) if record.name == *name))
    }

    /// First free slot, if any
    pub fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|slot| slot.is_none())
    }

    pub fn get(&self, slot: usize) -> Option<&FileRecord> {
        self.slots.get(slot).and_then(|s| s.as_ref())
    }

    pub fn insert(&mut self, slot: usize, record: FileRecord) {
        self.slots[slot] = Some(record);
    }

    /// Clear a slot, returning the record it held
    pub fn remove(&mut self, slot: usize) -> Option<FileRecord> {
        self.slots.get_mut(slot).and_then(|s| s.take())
    }

    /// Live records in slot order
    pub fn live(&self) -> impl Iterator<Item = (usize, &FileRecord)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, record)| record.as_ref().map(|r| (slot, r)))
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
