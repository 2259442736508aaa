//! Main store engine
//!
//! Ties the superblock, allocation table, and file directory together
//! over one exclusively-owned memory region, and keeps the region image
//! byte-consistent with the typed state on every mutation.

use crate::arena::Region;
use crate::directory::{Directory, FileName, FileRecord};
use crate::error::{Result, StoreError};
use crate::superblock::{Layout, Superblock, BLOCK_SIZE, SUPERBLOCK_SIZE};
use crate::table::AllocationTable;
use serde::{Deserialize, Serialize};

/// One entry produced by [`RamStore::list`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub size: u32,
    pub timestamp: u32,
    pub kind: u8,
    pub start_block: u32,
}

/// Size and timestamp for a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub size: u32,
    pub timestamp: u32,
}

/// Store-wide accounting snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_blocks: usize,
    pub free_blocks: usize,
    pub used_blocks: usize,
    pub file_count: usize,
}

/// Fixed-capacity file store over a memory region
///
/// Formatted once, lives as long as the process, and rebuilds from
/// scratch on every format; there is no persistence. All operations are
/// synchronous and run on the caller's thread; exclusive access is
/// enforced by `&mut self` rather than a lock.
///
/// Block ownership is tracked per record as an explicit ordered list,
/// so a file whose first-fit allocation landed on scattered blocks still
/// reads back and deletes correctly.
pub struct RamStore {
    region: Region,
    layout: Layout,
    superblock: Superblock,
    table: AllocationTable,
    directory: Directory,
}

impl RamStore {
    /// Format a reserved region and return the store over it
    ///
    /// Carves the superblock, allocation table, and directory out of the
    /// front of the region, zeroes everything, and writes the initial
    /// image. Fails with [`StoreError::RegionTooSmall`] when the fixed
    /// structures do not fit; a region with zero data blocks formats
    /// successfully but cannot hold any payload.
    pub fn format(region: Region) -> Result<Self> {
        let layout = Layout::for_region(region.len())?;
        let superblock = Superblock::new(&layout);
        let table = AllocationTable::new(layout.total_blocks);
        let directory = Directory::new();

        let mut store = RamStore {
            region,
            layout,
            superblock,
            table,
            directory,
        };

        store.region.as_bytes_mut().fill(0);
        store.sync_superblock();
        store.sync_table();

        tracing::info!(
            region_size = store.layout.region_size,
            total_blocks = store.layout.total_blocks,
            "formatted store"
        );

        Ok(store)
    }

    /// Format a store over a freshly allocated region of `region_size` bytes
    pub fn with_capacity(region_size: usize) -> Result<Self> {
        Self::format(Region::new(region_size))
    }

    /// Create a file, replacing any existing file of the same name
    ///
    /// Replacement is delete-then-create, not atomic: a failure after the
    /// implicit delete leaves the name absent rather than restored.
    pub fn create(&mut self, name: &str, payload: &[u8]) -> Result<()> {
        let file_name = FileName::new(name)?;
        if payload.is_empty() {
            return Err(StoreError::InvalidArgument("empty payload".into()));
        }

        if self.directory.find(name).is_some() {
            self.delete(name)?;
        }

        let blocks_needed = (payload.len() + BLOCK_SIZE - 1) / BLOCK_SIZE;
        if blocks_needed > self.table.free_blocks() {
            return Err(StoreError::InsufficientSpace {
                needed: blocks_needed,
                free: self.table.free_blocks(),
            });
        }

        // Slot check comes before any block is marked used, so a full
        // directory cannot leak allocated blocks.
        let slot = self.directory.free_slot().ok_or(StoreError::DirectoryFull)?;

        let blocks = self.table.allocate(blocks_needed)?;

        // Payload chunk k goes into the k-th chosen block, whatever its
        // numeric index.
        for (k, &block) in blocks.iter().enumerate() {
            let chunk_start = k * BLOCK_SIZE;
            let chunk = &payload[chunk_start..payload.len().min(chunk_start + BLOCK_SIZE)];
            let range = self.layout.block_range(block);
            self.region.as_bytes_mut()[range.start..range.start + chunk.len()]
                .copy_from_slice(chunk);
        }

        let record = FileRecord::new(file_name, payload.len() as u32, blocks);
        self.directory.insert(slot, record);

        self.superblock.file_count += 1;
        self.superblock.free_blocks = self.table.free_blocks() as u32;

        self.sync_record(slot);
        self.sync_table();
        self.sync_superblock();

        tracing::debug!(name, bytes = payload.len(), blocks = blocks_needed, "created file");

        Ok(())
    }

    /// Read a file into `buf`, returning the number of bytes copied
    ///
    /// Iterates the record's block list in order, so scattered blocks
    /// read back exactly as written.
    pub fn read(&self, name: &str, buf: &mut [u8]) -> Result<usize> {
        let record = self.lookup(name)?;
        let size = record.size as usize;

        if buf.len() < size {
            return Err(StoreError::BufferTooSmall {
                needed: size,
                capacity: buf.len(),
            });
        }

        let mut copied = 0;
        for &block in &record.blocks {
            let n = (size - copied).min(BLOCK_SIZE);
            let range = self.layout.block_range(block);
            buf[copied..copied + n]
                .copy_from_slice(&self.region.as_bytes()[range.start..range.start + n]);
            copied += n;
        }

        Ok(copied)
    }

    /// Read a file into a freshly allocated buffer
    pub fn read_to_vec(&self, name: &str) -> Result<Vec<u8>> {
        let size = self.lookup(name)?.size as usize;
        let mut buf = vec![0u8; size];
        self.read(name, &mut buf)?;
        Ok(buf)
    }

    /// Delete a file, releasing exactly the blocks it owns
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let slot = self.directory.find(name).ok_or(StoreError::NotFound)?;
        let record = self.directory.remove(slot).ok_or(StoreError::NotFound)?;

        self.table.release(&record.blocks)?;

        self.superblock.file_count -= 1;
        self.superblock.free_blocks = self.table.free_blocks() as u32;

        self.sync_record(slot);
        self.sync_table();
        self.sync_superblock();

        tracing::debug!(name, blocks = record.block_count(), "deleted file");

        Ok(())
    }

    /// Whether a file of this name exists
    pub fn exists(&self, name: &str) -> bool {
        self.directory.find(name).is_some()
    }

    /// Snapshot live records, in slot order, into `out`
    ///
    /// Fills at most `out.len()` entries and returns the count. This is a
    /// point-in-time copy, not a live iterator.
    pub fn list(&self, out: &mut [DirEntry]) -> usize {
        let mut count = 0;
        for (_, record) in self.directory.live() {
            if count == out.len() {
                break;
            }
            out[count] = DirEntry {
                name: record.name.as_str().to_string(),
                size: record.size,
                timestamp: record.timestamp,
                kind: record.kind,
                start_block: record.start_block(),
            };
            count += 1;
        }
        count
    }

    /// Size and timestamp for a name
    pub fn stat(&self, name: &str) -> Result<FileStat> {
        let record = self.lookup(name)?;
        Ok(FileStat {
            size: record.size,
            timestamp: record.timestamp,
        })
    }

    pub fn file_count(&self) -> usize {
        self.superblock.file_count as usize
    }

    pub fn free_space(&self) -> u64 {
        self.table.free_blocks() as u64 * BLOCK_SIZE as u64
    }

    pub fn total_space(&self) -> u64 {
        self.table.total_blocks() as u64 * BLOCK_SIZE as u64
    }

    pub fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    pub fn total_blocks(&self) -> usize {
        self.table.total_blocks()
    }

    pub fn free_blocks(&self) -> usize {
        self.table.free_blocks()
    }

    /// Accounting snapshot
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total_blocks: self.table.total_blocks(),
            free_blocks: self.table.free_blocks(),
            used_blocks: self.table.total_blocks() - self.table.free_blocks(),
            file_count: self.file_count(),
        }
    }

    /// The full region image
    ///
    /// Read-only view for inspection and image-compatibility checks; the
    /// store remains the sole writer.
    pub fn image(&self) -> &[u8] {
        self.region.as_bytes()
    }

    /// Verify every cross-structure invariant
    ///
    /// Checks space and count accounting, block ownership (each used
    /// block owned by exactly one record), name uniqueness, and that the
    /// region image agrees byte-for-byte with the typed state.
    pub fn check_consistency(&self) -> Result<()> {
        self.superblock.validate()?;

        if self.superblock.free_blocks as usize != self.table.free_blocks() {
            return Err(StoreError::Corrupted(format!(
                "superblock free_blocks {} != table free count {}",
                self.superblock.free_blocks,
                self.table.free_blocks()
            )));
        }
        if self.table.free_blocks() != self.table.count_free() {
            return Err(StoreError::Corrupted(
                "allocation table free counter disagrees with entries".into(),
            ));
        }
        if self.superblock.file_count as usize != self.directory.live_count() {
            return Err(StoreError::Corrupted(format!(
                "superblock file_count {} != live records {}",
                self.superblock.file_count,
                self.directory.live_count()
            )));
        }

        let mut owned = vec![false; self.table.total_blocks()];
        let mut names = Vec::new();
        let mut owned_total = 0usize;

        for (slot, record) in self.directory.live() {
            let expected = (record.size as usize + BLOCK_SIZE - 1) / BLOCK_SIZE;
            if record.block_count() != expected {
                return Err(StoreError::Corrupted(format!(
                    "record '{}' owns {} blocks, size {} needs {}",
                    record.name,
                    record.block_count(),
                    record.size,
                    expected
                )));
            }

            if names.contains(&record.name.as_str()) {
                return Err(StoreError::Corrupted(format!(
                    "duplicate name '{}'",
                    record.name
                )));
            }
            names.push(record.name.as_str());

            for &block in &record.blocks {
                let idx = block as usize;
                if idx >= owned.len() {
                    return Err(StoreError::InvalidBlockId(block));
                }
                if owned[idx] {
                    return Err(StoreError::Corrupted(format!(
                        "block {} owned by two records",
                        block
                    )));
                }
                if !self.table.is_allocated(block) {
                    return Err(StoreError::Corrupted(format!(
                        "record '{}' owns block {} not marked used",
                        record.name, block
                    )));
                }
                owned[idx] = true;
                owned_total += 1;
            }

            let range = self.layout.record_range(slot);
            if self.region.as_bytes()[range] != record.encode()[..] {
                return Err(StoreError::Corrupted(format!(
                    "record image for slot {} out of date",
                    slot
                )));
            }
        }

        if owned_total + self.table.free_blocks() != self.table.total_blocks() {
            return Err(StoreError::Corrupted(format!(
                "space accounting broken: {} owned + {} free != {} total",
                owned_total,
                self.table.free_blocks(),
                self.table.total_blocks()
            )));
        }

        let sb_image = &self.region.as_bytes()[..SUPERBLOCK_SIZE];
        if sb_image != self.superblock.to_bytes().as_slice() {
            return Err(StoreError::Corrupted("superblock image out of date".into()));
        }
        if self.region.as_bytes()[self.layout.table_range()] != *self.table.as_bytes() {
            return Err(StoreError::Corrupted(
                "allocation table image out of date".into(),
            ));
        }

        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<&FileRecord> {
        self.directory
            .find(name)
            .and_then(|slot| self.directory.get(slot))
            .ok_or(StoreError::NotFound)
    }

    fn sync_superblock(&mut self) {
        let bytes = self.superblock.to_bytes();
        self.region.as_bytes_mut()[..SUPERBLOCK_SIZE].copy_from_slice(&bytes);
    }

    fn sync_table(&mut self) {
        let range = self.layout.table_range();
        let RamStore { region, table, .. } = self;
        region.as_bytes_mut()[range].copy_from_slice(table.as_bytes());
    }

    fn sync_record(&mut self, slot: usize) {
        let range = self.layout.record_range(slot);
        let image = self
            .directory
            .get(slot)
            .map(|record| record.encode())
            .unwrap_or([0u8; crate::superblock::RECORD_SIZE]);
        self.region.as_bytes_mut()[range].copy_from_slice(&image);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::superblock::{DEFAULT_REGION_SIZE, MAGIC};

    #[test]
    fn test_format_writes_image() {
        let store = RamStore::with_capacity(DEFAULT_REGION_SIZE).unwrap();
        assert_eq!(&store.image()[0..8], &MAGIC);
        assert_eq!(store.total_blocks(), 1018);
        assert_eq!(store.free_blocks(), 1018);
        assert_eq!(store.file_count(), 0);
        store.check_consistency().unwrap();
    }

    #[test]
    fn test_create_and_read_back() {
        let mut store = RamStore::with_capacity(DEFAULT_REGION_SIZE).unwrap();
        store.create("hello.txt", b"hello, region").unwrap();

        assert!(store.exists("hello.txt"));
        assert_eq!(store.read_to_vec("hello.txt").unwrap(), b"hello, region");

        let mut buf = [0u8; 64];
        let n = store.read("hello.txt", &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello, region");

        store.check_consistency().unwrap();
    }

    #[test]
    fn test_payload_lands_in_data_region() {
        let mut store = RamStore::with_capacity(DEFAULT_REGION_SIZE).unwrap();
        store.create("a", b"xyz").unwrap();

        // First file goes to block 0, which starts at the data offset.
        let data_offset = 512 + 1024 + 64 * 60;
        assert_eq!(&store.image()[data_offset..data_offset + 3], b"xyz");
    }

    #[test]
    fn test_invalid_arguments() {
        let mut store = RamStore::with_capacity(DEFAULT_REGION_SIZE).unwrap();
        assert!(matches!(
            store.create("", b"data"),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.create("empty", b""),
            Err(StoreError::InvalidArgument(_))
        ));
        assert_eq!(store.file_count(), 0);
    }

    #[test]
    fn test_not_found() {
        let mut store = RamStore::with_capacity(DEFAULT_REGION_SIZE).unwrap();
        let mut buf = [0u8; 8];
        assert!(matches!(
            store.read("ghost", &mut buf),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(store.delete("ghost"), Err(StoreError::NotFound)));
        assert!(matches!(store.stat("ghost"), Err(StoreError::NotFound)));
        assert!(!store.exists("ghost"));
    }

    #[test]
    fn test_api_types_serialization() {
        let mut store = RamStore::with_capacity(DEFAULT_REGION_SIZE).unwrap();
        store.create("a.txt", b"0123456789").unwrap();

        let mut entries = vec![DirEntry::default(); 1];
        store.list(&mut entries);

        let json = serde_json::to_string(&entries[0]).unwrap();
        let entry: DirEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, entries[0]);
        assert_eq!(entry.name, "a.txt");
        assert_eq!(entry.size, 10);

        let json = serde_json::to_string(&store.stats()).unwrap();
        let stats: StoreStats = serde_json::from_str(&json).unwrap();
        assert_eq!(stats, store.stats());
        assert_eq!(stats.used_blocks, 1);

        let json = serde_json::to_string(&store.stat("a.txt").unwrap()).unwrap();
        let stat: FileStat = serde_json::from_str(&json).unwrap();
        assert_eq!(stat.size, 10);
        assert_eq!(stat.timestamp, 0);
    }

    #[test]
    fn test_zero_block_store_holds_nothing() {
        // 5376 bytes: leaves 1019 bytes after the fixed structures,
        // under one block.
        let mut store = RamStore::with_capacity(5376).unwrap();
        assert_eq!(store.total_blocks(), 0);
        assert!(matches!(
            store.create("a", b"x"),
            Err(StoreError::InsufficientSpace { .. })
        ));
    }
}
