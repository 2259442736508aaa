use crate::error::{Result, StoreError};
use std::ops::Range;

pub const MAGIC: [u8; 8] = *b"ATOMICFS";
pub const FORMAT_VERSION: u32 = 1;

/// Fixed allocation granule of the data region.
pub const BLOCK_SIZE: usize = 1024;

/// Capacity of the file directory.
pub const MAX_FILES: usize = 64;

/// File name field width, terminator included (31 usable characters).
pub const NAME_LEN: usize = 32;

/// Default region size handed to [`crate::RamStore::with_capacity`].
pub const DEFAULT_REGION_SIZE: usize = 1024 * 1024;

/// Encoded superblock size, reserved padding included.
pub const SUPERBLOCK_SIZE: usize = 512;

/// Encoded directory record size: 32 name + 4 start_block + 4 size
/// + 4 timestamp + 1 type + 15 reserved.
pub const RECORD_SIZE: usize = 60;

/// Encoded directory size (64 records).
pub const DIRECTORY_BYTES: usize = MAX_FILES * RECORD_SIZE;

/// Store superblock (region bytes 0..512)
///
/// The layout descriptor at the front of the region: format identity,
/// block geometry, and the live counts every mutation keeps consistent
/// with the allocation table and file directory behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    /// Magic identifier: "ATOMICFS"
    pub magic: [u8; 8],

    /// Format version
    pub version: u32,

    /// Total number of data blocks in the region
    pub total_blocks: u32,

    /// Number of free data blocks
    pub free_blocks: u32,

    /// Number of live directory records
    pub file_count: u32,

    /// Block size in bytes (always 1024)
    pub block_size: u32,

    /// Bytes reserved for the allocation table
    pub table_bytes: u32,

    /// Bytes reserved for the file directory
    pub directory_bytes: u32,

    /// Data blocks behind the fixed structures (mirrors `total_blocks`)
    pub data_blocks: u32,
}

impl Superblock {
    /// Create a freshly formatted superblock for the given layout
    pub fn new(layout: &Layout) -> Self {
        Superblock {
            magic: MAGIC,
            version: FORMAT_VERSION,
            total_blocks: layout.total_blocks as u32,
            free_blocks: layout.total_blocks as u32,
            file_count: 0,
            block_size: BLOCK_SIZE as u32,
            table_bytes: layout.table_capacity as u32,
            directory_bytes: DIRECTORY_BYTES as u32,
            data_blocks: layout.total_blocks as u32,
        }
    }

    /// Validate magic, version, block size, and count sanity
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(StoreError::InvalidMagic);
        }

        if self.version != FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion(self.version));
        }

        if self.block_size != BLOCK_SIZE as u32 {
            return Err(StoreError::InvalidBlockSize(self.block_size));
        }

        if self.free_blocks > self.total_blocks {
            return Err(StoreError::Corrupted(format!(
                "free blocks ({}) exceeds total blocks ({})",
                self.free_blocks, self.total_blocks
            )));
        }

        Ok(())
    }

    /// Serialize to the 512-byte region image, fields little-endian
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SUPERBLOCK_SIZE);

        bytes.extend_from_slice(&self.magic);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.total_blocks.to_le_bytes());
        bytes.extend_from_slice(&self.free_blocks.to_le_bytes());
        bytes.extend_from_slice(&self.file_count.to_le_bytes());
        bytes.extend_from_slice(&self.block_size.to_le_bytes());
        bytes.extend_from_slice(&self.table_bytes.to_le_bytes());
        bytes.extend_from_slice(&self.directory_bytes.to_le_bytes());
        bytes.extend_from_slice(&self.data_blocks.to_le_bytes());

        // Pad to SUPERBLOCK_SIZE
        bytes.resize(SUPERBLOCK_SIZE, 0);

        bytes
    }

    /// Deserialize from the region image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SUPERBLOCK_SIZE {
            return Err(StoreError::Corrupted(format!(
                "superblock image truncated: {} bytes",
                bytes.len()
            )));
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[0..8]);

        let read_u32 = |offset: usize| {
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };

        let superblock = Superblock {
            magic,
            version: read_u32(8),
            total_blocks: read_u32(12),
            free_blocks: read_u32(16),
            file_count: read_u32(20),
            block_size: read_u32(24),
            table_bytes: read_u32(28),
            directory_bytes: read_u32(32),
            data_blocks: read_u32(36),
        };

        superblock.validate()?;

        Ok(superblock)
    }
}

/// Byte ranges of the fixed structures within a formatted region
///
/// Computed once at format time:
///
/// ```text
/// [Superblock: 512 B]
/// [Allocation table: region_size / 1024 B, one byte per block]
/// [File directory: 64 x 60 B]
/// [Data region: total_blocks x 1024 B]
/// ```
///
/// The table is sized from the raw region size before the data region is
/// known, so it over-reserves slightly; `total_blocks` is what actually
/// fits behind the fixed structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Full region size in bytes
    pub region_size: usize,

    /// Bytes reserved for the allocation table
    pub table_capacity: usize,

    /// Data blocks available behind the fixed structures
    pub total_blocks: usize,

    /// Offset of the allocation table
    pub table_offset: usize,

    /// Offset of the file directory
    pub directory_offset: usize,

    /// Offset of the data region
    pub data_offset: usize,
}

impl Layout {
    /// Compute the layout for a region of the given size
    ///
    /// Fails with [`StoreError::RegionTooSmall`] when the region cannot
    /// hold the three fixed structures. A layout with zero data blocks is
    /// valid; such a store simply cannot hold any payload.
    pub fn for_region(region_size: usize) -> Result<Self> {
        let table_capacity = region_size / BLOCK_SIZE;
        let table_offset = SUPERBLOCK_SIZE;
        let directory_offset = table_offset + table_capacity;
        let data_offset = directory_offset + DIRECTORY_BYTES;

        if region_size < data_offset {
            return Err(StoreError::RegionTooSmall {
                needed: data_offset,
                actual: region_size,
            });
        }

        let total_blocks = (region_size - data_offset) / BLOCK_SIZE;

        Ok(Layout {
            region_size,
            table_capacity,
            total_blocks,
            table_offset,
            directory_offset,
            data_offset,
        })
    }

    /// Region byte range of the allocation table (live entries only)
    pub fn table_range(&self) -> Range<usize> {
        self.table_offset..self.table_offset + self.total_blocks
    }

    /// Region byte range of directory slot `slot`
    pub fn record_range(&self, slot: usize) -> Range<usize> {
        let start = self.directory_offset + slot * RECORD_SIZE;
        start..start + RECORD_SIZE
    }

    /// Region byte range of data block `block`
    pub fn block_range(&self, block: u32) -> Range<usize> {
        let start = self.data_offset + block as usize * BLOCK_SIZE;
        start..start + BLOCK_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superblock_creation() {
        let layout = Layout::for_region(DEFAULT_REGION_SIZE).unwrap();
        let sb = Superblock::new(&layout);
        assert_eq!(sb.magic, MAGIC);
        assert_eq!(sb.version, FORMAT_VERSION);
        assert_eq!(sb.block_size, BLOCK_SIZE as u32);
        assert_eq!(sb.free_blocks, sb.total_blocks);
        assert_eq!(sb.file_count, 0);
        assert!(sb.validate().is_ok());
    }

    #[test]
    fn test_invalid_magic() {
        let layout = Layout::for_region(DEFAULT_REGION_SIZE).unwrap();
        let mut sb = Superblock::new(&layout);
        sb.magic = *b"INVALID!";
        assert!(matches!(sb.validate(), Err(StoreError::InvalidMagic)));
    }

    #[test]
    fn test_invalid_version() {
        let layout = Layout::for_region(DEFAULT_REGION_SIZE).unwrap();
        let mut sb = Superblock::new(&layout);
        sb.version = 99;
        assert!(matches!(
            sb.validate(),
            Err(StoreError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_invalid_block_size() {
        let layout = Layout::for_region(DEFAULT_REGION_SIZE).unwrap();
        let mut sb = Superblock::new(&layout);
        sb.block_size = 4096;
        assert!(matches!(
            sb.validate(),
            Err(StoreError::InvalidBlockSize(4096))
        ));
    }

    #[test]
    fn test_free_blocks_exceeds_total() {
        let layout = Layout::for_region(DEFAULT_REGION_SIZE).unwrap();
        let mut sb = Superblock::new(&layout);
        sb.free_blocks = sb.total_blocks + 1;
        assert!(matches!(sb.validate(), Err(StoreError::Corrupted(_))));
    }

    #[test]
    fn test_superblock_serialization() {
        let layout = Layout::for_region(DEFAULT_REGION_SIZE).unwrap();
        let mut sb = Superblock::new(&layout);
        sb.free_blocks = 500;
        sb.file_count = 3;

        let bytes = sb.to_bytes();
        assert_eq!(bytes.len(), SUPERBLOCK_SIZE);
        assert_eq!(&bytes[0..8], b"ATOMICFS");

        let decoded = Superblock::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, sb);
    }

    #[test]
    fn test_superblock_truncated_image() {
        let bytes = vec![0u8; 40];
        assert!(matches!(
            Superblock::from_bytes(&bytes),
            Err(StoreError::Corrupted(_))
        ));
    }

    #[test]
    fn test_layout_default_region() {
        // 1 MiB region: 512 superblock + 1024 table + 3840 directory
        // leaves 1043200 bytes, 1018 whole blocks.
        let layout = Layout::for_region(DEFAULT_REGION_SIZE).unwrap();
        assert_eq!(layout.table_capacity, 1024);
        assert_eq!(layout.table_offset, 512);
        assert_eq!(layout.directory_offset, 1536);
        assert_eq!(layout.data_offset, 5376);
        assert_eq!(layout.total_blocks, 1018);
    }

    #[test]
    fn test_layout_region_too_small() {
        let err = Layout::for_region(1000).unwrap_err();
        assert!(matches!(err, StoreError::RegionTooSmall { .. }));
    }

    #[test]
    fn test_layout_zero_data_blocks() {
        // Structures end at byte 4357; the 1019 bytes left are under one
        // block, so the layout is valid but holds no data.
        let layout = Layout::for_region(5376).unwrap();
        assert_eq!(layout.total_blocks, 0);
        assert_eq!(layout.data_offset, 4357);
    }

    #[test]
    fn test_layout_ranges() {
        let layout = Layout::for_region(DEFAULT_REGION_SIZE).unwrap();
        assert_eq!(layout.table_range(), 512..512 + 1018);
        assert_eq!(layout.record_range(0), 1536..1596);
        assert_eq!(layout.record_range(63), 1536 + 63 * 60..1536 + 64 * 60);
        assert_eq!(layout.block_range(0), 5376..6400);
        assert_eq!(layout.block_range(1), 6400..7424);
    }
}
