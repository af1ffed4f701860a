//! Hashing and table insertion for the match finder

use super::state::MatchState;

/// Multiplier for the multiplicative hashes
const PRIME_64: u64 = 0xCF1B_BCDC_B7A5_6463;

/// Bytes hashed by the long table
pub(crate) const LONG_HASH_BYTES: usize = 8;

/// Read up to 8 bytes little-endian, zero padded past the end
#[inline]
pub(crate) fn load_u64(data: &[u8], pos: usize) -> u64 {
    let tail = data.get(pos..).unwrap_or_default();
    let available = tail.len().min(8);
    let mut buf = [0u8; 8];
    buf[..available].copy_from_slice(&tail[..available]);
    u64::from_le_bytes(buf)
}

/// Hash the `length` (3..=8) bytes at `pos` into `bits` bits
#[inline]
pub(crate) fn hash_bytes(data: &[u8], pos: usize, length: usize, bits: u32) -> usize {
    let value = load_u64(data, pos) << (64 - 8 * length as u32);
    (value.wrapping_mul(PRIME_64) >> (64 - bits)) as usize
}

/// Length of the common prefix of `data[cur..end]` and `data[cand..]`
#[inline]
pub(crate) fn count_match(data: &[u8], cur: usize, cand: usize, end: usize) -> usize {
    let max = end - cur;
    let mut len = 0;
    while len + 8 <= max {
        let diff = load_u64(data, cur + len) ^ load_u64(data, cand + len);
        if diff != 0 {
            return len + (diff.trailing_zeros() / 8) as usize;
        }
        len += 8;
    }
    while len < max && data[cur + len] == data[cand + len] {
        len += 1;
    }
    len
}

impl MatchState {
    #[inline]
    pub(crate) fn short_hash(&self, index: usize) -> usize {
        hash_bytes(
            &self.window,
            index,
            self.params.min_match as usize,
            self.params.hash_log,
        )
    }

    #[inline]
    pub(crate) fn long_hash(&self, index: usize) -> usize {
        hash_bytes(&self.window, index, LONG_HASH_BYTES, self.params.chain_log)
    }

    /// True if enough bytes follow `index` to hash it
    #[inline]
    pub(crate) fn can_hash(&self, index: usize) -> bool {
        index + self.params.min_match as usize <= self.window.len()
    }

    /// Record `index` in every table the strategy keeps
    pub(crate) fn insert(&mut self, index: usize) {
        if !self.can_hash(index) {
            return;
        }
        let position = self.abs(index);
        let slot = self.short_hash(index);
        if !self.chain_table.is_empty() {
            let mask = self.chain_table.len() - 1;
            self.chain_table[position as usize & mask] = self.hash_table[slot];
        }
        self.hash_table[slot] = position;

        if !self.long_table.is_empty() && index + LONG_HASH_BYTES <= self.window.len() {
            let slot = self.long_hash(index);
            self.long_table[slot] = position;
        }
    }

    /// Insert every position from `next_to_update` up to `target`
    pub(crate) fn update_to(&mut self, target: usize) {
        while self.next_to_update < target && self.can_hash(self.next_to_update) {
            self.insert(self.next_to_update);
            self.next_to_update += 1;
        }
    }

    /// Insert all dictionary positions below `end`
    pub(crate) fn prime(&mut self, end: usize) {
        self.update_to(end);
    }
}
