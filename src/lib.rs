//! Fixed-capacity in-memory block file store
//!
//! A flat, named-file store formatted over one contiguous memory region.
//! State lives only for the lifetime of the process: every format starts
//! from scratch, and there is no device, driver, or OS file API below
//! this crate. It exists so that a minimal execution environment can
//! offer create/read/delete/list storage to front ends such as a shell
//! or a line editor.
//!
//! - [`error`] - error types for store operations
//! - [`superblock`] - layout descriptor and region geometry
//! - [`table`] - byte-per-block free-space tracking
//! - [`directory`] - bounded names and the 64-record file directory
//! - [`store`] - the engine tying the structures together
//! - [`arena`] - the bump-style reservation service regions come from
//!
//! ## Region image
//!
//! ```text
//! +--------------------------------------------+
//! | Superblock (512 B)                         |
//! |  - Magic: "ATOMICFS", version, block size  |
//! |  - total/free block counts, file count     |
//! +--------------------------------------------+
//! | Allocation table (1 byte per block)        |
//! |  - 0 = free, 1 = used                      |
//! +--------------------------------------------+
//! | File directory (64 x 60 B records)         |
//! |  - name, start block, size, timestamp      |
//! +--------------------------------------------+
//! | Data region (total_blocks x 1024 B)        |
//! +--------------------------------------------+
//! ```
//!
//! ## Example
//!
//! ```
//! use ramstore::{BumpArena, RamStore, DEFAULT_REGION_SIZE};
//!
//! let mut arena = BumpArena::new(2 * DEFAULT_REGION_SIZE);
//! let region = arena.reserve(DEFAULT_REGION_SIZE).unwrap();
//!
//! let mut store = RamStore::format(region).unwrap();
//! store.create("motd.txt", b"welcome").unwrap();
//!
//! assert_eq!(store.read_to_vec("motd.txt").unwrap(), b"welcome");
//! assert_eq!(store.file_count(), 1);
//!
//! store.delete("motd.txt").unwrap();
//! assert!(!store.exists("motd.txt"));
//! ```
//!
//! ## Design notes
//!
//! Allocation is first-fit and makes no contiguity promise; each
//! directory record therefore carries an explicit ordered block list,
//! and read/delete iterate that list instead of assuming a contiguous
//! run from the first block. The store is an explicitly constructed,
//! exclusively owned value: mutation requires `&mut self`, which is the
//! whole concurrency story for this single-context design.

pub mod arena;
pub mod directory;
pub mod error;
pub mod store;
pub mod superblock;
pub mod table;

// Re-export commonly used types
pub use arena::{BumpArena, Region};
pub use directory::{Directory, FileName, FileRecord};
pub use error::{Result, StoreError};
pub use store::{DirEntry, FileStat, RamStore, StoreStats};
pub use superblock::{
    Layout, Superblock, BLOCK_SIZE, DEFAULT_REGION_SIZE, MAGIC, MAX_FILES, NAME_LEN,
};
pub use table::AllocationTable;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
