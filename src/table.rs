//! Byte-per-block free-space tracking
//!
//! One byte per data block, index = block number: 0 = free, 1 = used.
//! A byte per block is deliberately chosen over a bit-vector; the table
//! for a 1 MiB region is about 1 KiB, and the byte form maps directly
//! onto the region image.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};

/// Allocation table over the data region
///
/// Allocation is first-fit from block 0 upward and makes no contiguity
/// promise: a file's blocks are whatever free indices come first. Callers
/// keep the returned list and hand it back to [`AllocationTable::release`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationTable {
    /// One entry per block (0 = free, 1 = used)
    entries: Vec<u8>,

    /// Number of free blocks, kept in lockstep with `entries`
    free_blocks: usize,
}

impl AllocationTable {
    /// Create a table with every block free
    pub fn new(total_blocks: usize) -> Self {
        AllocationTable {
            entries: vec![0u8; total_blocks],
            free_blocks: total_blocks,
        }
    }

    /// Allocate `blocks_needed` blocks, first-fit from block 0
    ///
    /// Returns the chosen block indices in ascending order. Fails with
    /// [`StoreError::InsufficientSpace`] before marking anything when not
    /// enough free blocks exist.
    pub fn allocate(&mut self, blocks_needed: usize) -> Result<Vec<u32>> {
        if blocks_needed > self.free_blocks {
            return Err(StoreError::InsufficientSpace {
                needed: blocks_needed,
                free: self.free_blocks,
            });
        }

        let mut chosen = Vec::with_capacity(blocks_needed);
        for (block, entry) in self.entries.iter_mut().enumerate() {
            if chosen.len() == blocks_needed {
                break;
            }
            if *entry == 0 {
                *entry = 1;
                chosen.push(block as u32);
            }
        }

        // free_blocks counts the zero entries, so the scan cannot come up
        // short once the capacity check passes.
        debug_assert_eq!(chosen.len(), blocks_needed);

        self.free_blocks -= blocks_needed;
        Ok(chosen)
    }

    /// Release previously allocated blocks
    ///
    /// A block that is already free is logged and skipped rather than
    /// double-counted.
    pub fn release(&mut self, blocks: &[u32]) -> Result<()> {
        for &block in blocks {
            if block as usize >= self.entries.len() {
                return Err(StoreError::InvalidBlockId(block));
            }

            if self.entries[block as usize] == 0 {
                tracing::warn!(block, "double-free detected in allocation table");
                continue;
            }

            self.entries[block as usize] = 0;
            self.free_blocks += 1;
        }

        Ok(())
    }

    /// Whether a block is currently marked used
    pub fn is_allocated(&self, block: u32) -> bool {
        self.entries
            .get(block as usize)
            .map(|&e| e != 0)
            .unwrap_or(false)
    }

    pub fn total_blocks(&self) -> usize {
        self.entries.len()
    }

    pub fn free_blocks(&self) -> usize {
        self.free_blocks
    }

    /// Raw table bytes, exactly as they appear in the region image
    pub fn as_bytes(&self) -> &[u8] {
        &self.entries
    }

    /// Recount free entries; used by consistency checks
    pub fn count_free(&self) -> usize {
        self.entries.iter().filter(|&&e| e == 0).count()
    }
}
