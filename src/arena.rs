//! Bump-style region reservation
//!
//! Models the memory-reservation service the store's region is carved
//! from: reservations only ever move the bump pointer forward and are
//! never returned. This is distinct from the store's own allocation
//! table, which does reclaim blocks.

use crate::error::{Result, StoreError};

/// Exclusively-owned byte range handed out by [`BumpArena::reserve`]
///
/// Exactly one consumer owns a region; the store takes it by value at
/// format time and nothing else can touch its bytes afterwards.
#[derive(Debug)]
pub struct Region {
    bytes: Box<[u8]>,
}

impl Region {
    /// A zeroed region of the given size
    pub fn new(size: usize) -> Self {
        Region {
            bytes: vec![0u8; size].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

/// Bump reservation over a fixed capacity
///
/// `reserve` rounds each request up to 4-byte alignment and advances the
/// bump pointer; there is no free. Once the pointer reaches capacity the
/// arena is exhausted for the rest of its lifetime.
#[derive(Debug)]
pub struct BumpArena {
    capacity: usize,
    used: usize,
}

impl BumpArena {
    pub fn new(capacity: usize) -> Self {
        BumpArena { capacity, used: 0 }
    }

    /// Reserve `size` bytes, failing once capacity is exhausted
    pub fn reserve(&mut self, size: usize) -> Result<Region> {
        let aligned = (size + 3) & !3;
        let remaining = self.capacity - self.used;

        if aligned > remaining {
            return Err(StoreError::ArenaExhausted {
                requested: size,
                remaining,
            });
        }

        self.used += aligned;
        tracing::debug!(size, used = self.used, "reserved region from arena");
        Ok(Region::new(size))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_bumps_forward() {
        let mut arena = BumpArena::new(1024);
        let region = arena.reserve(100).unwrap();
        assert_eq!(region.len(), 100);
        // Rounded up to 4-byte alignment.
        assert_eq!(arena.used(), 104);
        assert_eq!(arena.remaining(), 920);
    }

    #[test]
    fn test_exhaustion_is_permanent() {
        let mut arena = BumpArena::new(64);
        arena.reserve(60).unwrap();

        let err = arena.reserve(8).unwrap_err();
        assert!(matches!(
            err,
            StoreError::ArenaExhausted {
                requested: 8,
                remaining: 4
            }
        ));

        // A smaller request that still fits succeeds; nothing is reclaimed.
        arena.reserve(4).unwrap();
        assert_eq!(arena.remaining(), 0);
        assert!(arena.reserve(1).is_err());
    }

    #[test]
    fn test_region_is_zeroed() {
        let region = Region::new(16);
        assert!(region.as_bytes().iter().all(|&b| b == 0));
    }
}
