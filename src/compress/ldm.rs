//! Long distance matcher
//!
//! A rolling hash over `ldm_min_match` bytes is sampled at a rate of
//! `1 / 2^ldm_hash_rate_log`. Sampled positions go into a table of buckets
//! holding `2^ldm_bucket_size_log` entries each, replaced round-robin. Each
//! block is scanned once before parsing; verified long matches found at
//! sampled positions are offered to the parsers as extra candidates.

use super::hash::count_match;
use super::pattern::Match;
use super::state::{MatchState, EMPTY};
use crate::params::ResolvedParams;

const ROLL_PRIME: u64 = 0x9E37_79B1_85EB_CA87;
const SAMPLE_MIX: u64 = 0xC2B2_AE3D_27D4_EB4F;

#[derive(Debug, Clone, Copy, Default)]
struct LdmEntry {
    position: u32,
    check: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct LdmState {
    table: Vec<LdmEntry>,
    next_slot: Vec<u8>,
    bucket_log: u32,
    bucket_bits: u32,
    min_match: usize,
    rate_mask: u64,
    /// `ROLL_PRIME^(min_match - 1)`
    power: u64,
    window_size: usize,
    /// Matches found by the last scan, sorted by window index
    candidates: Vec<(usize, Match)>,
}

/// Byte as fed to the rolling hash
#[inline]
fn symbol(byte: u8) -> u64 {
    byte as u64 + 1
}

impl LdmState {
    pub fn new(params: &ResolvedParams) -> Self {
        let hash_log = params.ldm_hash_log.max(params.ldm_bucket_size_log + 1);
        let bucket_bits = hash_log - params.ldm_bucket_size_log;
        Self {
            table: vec![LdmEntry::default(); 1 << hash_log],
            next_slot: vec![0; 1 << bucket_bits],
            bucket_log: params.ldm_bucket_size_log,
            bucket_bits,
            min_match: params.ldm_min_match as usize,
            rate_mask: (1u64 << params.ldm_hash_rate_log) - 1,
            power: ROLL_PRIME.wrapping_pow(params.ldm_min_match - 1),
            window_size: params.window_size(),
            candidates: Vec::new(),
        }
    }

    fn initial_hash(data: &[u8]) -> u64 {
        data.iter()
            .fold(0u64, |h, &b| h.wrapping_mul(ROLL_PRIME).wrapping_add(symbol(b)))
    }

    #[inline]
    fn sampled(&self, hash: u64) -> bool {
        (hash.wrapping_mul(SAMPLE_MIX) >> 32) & self.rate_mask == self.rate_mask
    }

    #[inline]
    fn bucket(&self, hash: u64) -> usize {
        ((hash >> 20) as usize & ((1 << self.bucket_bits) - 1)) << self.bucket_log
    }

    fn insert(&mut self, hash: u64, position: u32) {
        let bucket = self.bucket(hash);
        let bucket_index = bucket >> self.bucket_log;
        let slot = self.next_slot[bucket_index] as usize;
        self.table[bucket + slot] = LdmEntry {
            position,
            check: (hash >> 40) as u32,
        };
        self.next_slot[bucket_index] = ((slot + 1) & ((1 << self.bucket_log) - 1)) as u8;
    }

    /// Visit the rolling hash of every `min_match`-byte window starting in `start..end`
    fn roll<F: FnMut(&mut Self, usize, u64)>(&mut self, window: &[u8], start: usize, end: usize, mut visit: F) {
        let m = self.min_match;
        if end < start + m {
            return;
        }
        let mut hash = Self::initial_hash(&window[start..start + m]);
        let mut index = start;
        loop {
            visit(self, index, hash);
            if index + m >= end {
                break;
            }
            hash = hash
                .wrapping_sub(symbol(window[index]).wrapping_mul(self.power))
                .wrapping_mul(ROLL_PRIME)
                .wrapping_add(symbol(window[index + m]));
            index += 1;
        }
    }

    /// Insert sampled dictionary positions
    pub fn prime(&mut self, window: &[u8], base: u32, end: usize) {
        self.roll(window, 0, end, |ldm, index, hash| {
            if ldm.sampled(hash) {
                ldm.insert(hash, base + index as u32);
            }
        });
    }

    /// Find long matches in `start..end` and insert its sampled positions
    pub fn scan(&mut self, window: &[u8], base: u32, start: usize, end: usize) {
        self.candidates.clear();
        self.roll(window, start, end, |ldm, index, hash| {
            if !ldm.sampled(hash) {
                return;
            }
            let bucket = ldm.bucket(hash);
            let check = (hash >> 40) as u32;
            let low = index.saturating_sub(ldm.window_size);
            let mut best: Option<Match> = None;
            for entry in &ldm.table[bucket..bucket + (1 << ldm.bucket_log)] {
                if entry.position == EMPTY || entry.check != check || entry.position < base {
                    continue;
                }
                let cand = (entry.position - base) as usize;
                if cand < low || cand >= index {
                    continue;
                }
                let length = count_match(window, index, cand, end);
                let offset = (index - cand) as u32;
                if length >= ldm.min_match
                    && best.map_or(true, |b| {
                        length as u32 > b.length || (length as u32 == b.length && offset < b.offset)
                    })
                {
                    best = Some(Match {
                        offset,
                        length: length as u32,
                    });
                }
            }
            if let Some(found) = best {
                ldm.candidates.push((index, found));
            }
            ldm.insert(hash, base + index as u32);
        });
    }

    /// Long match recorded at `index`, clipped to `end`
    pub fn candidate_at(&self, state: &MatchState, index: usize, end: usize) -> Option<Match> {
        let at = self.candidates.binary_search_by_key(&index, |c| c.0).ok()?;
        let found = self.candidates[at].1;
        let length = (found.length as usize).min(end - index);
        (length >= state.params.min_match as usize).then_some(Match {
            offset: found.offset,
            length: length as u32,
        })
    }

    /// Rebase stored positions
    pub fn correct(&mut self, correction: u32) {
        for entry in &mut self.table {
            entry.position = if entry.position > correction {
                entry.position - correction
            } else {
                EMPTY
            };
        }
    }
}
