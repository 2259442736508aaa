use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid magic number in superblock")]
    InvalidMagic,

    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u32),

    #[error("invalid block size: {0}")]
    InvalidBlockSize(u32),

    #[error("region too small: fixed structures need {needed} bytes, region holds {actual}")]
    RegionTooSmall { needed: usize, actual: usize },

    #[error("file not found")]
    NotFound,

    #[error("insufficient space: {needed} blocks needed, {free} free")]
    InsufficientSpace { needed: usize, free: usize },

    #[error("file directory is full")]
    DirectoryFull,

    #[error("buffer too small: {needed} bytes needed, {capacity} available")]
    BufferTooSmall { needed: usize, capacity: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid block id: {0}")]
    InvalidBlockId(u32),

    #[error("arena exhausted: requested {requested} bytes, {remaining} remaining")]
    ArenaExhausted { requested: usize, remaining: usize },

    #[error("store corrupted: {0}")]
    Corrupted(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
