//! Content checksum
//!
//! Frames carry the low 32 bits of XXH64 (seed 0) computed over the
//! uncompressed content. Dictionary ids are derived from the same hash.

use std::hash::Hasher;
use twox_hash::XxHash64;

/// Incremental content checksum
#[derive(Clone)]
pub struct ContentChecksum {
    hasher: XxHash64,
}

impl std::fmt::Debug for ContentChecksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentChecksum")
            .field("current", &self.value())
            .finish()
    }
}

impl ContentChecksum {
    /// Start a new checksum
    pub fn new() -> Self {
        Self {
            hasher: XxHash64::with_seed(0),
        }
    }

    /// Feed content bytes
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.write(data);
    }

    /// Checksum of everything fed so far
    pub fn value(&self) -> u32 {
        self.hasher.finish() as u32
    }
}

impl Default for ContentChecksum {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot content checksum
pub fn checksum(data: &[u8]) -> u32 {
    XxHash64::oneshot(0, data) as u32
}

/// Full 64-bit hash, used for dictionary ids
pub fn hash64(data: &[u8]) -> u64 {
    XxHash64::oneshot(0, data)
}
