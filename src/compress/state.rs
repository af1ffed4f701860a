//! Match finder state
//!
//! The window is a growable buffer holding the dictionary (if any), the
//! history kept for back-references and the block being compressed. Hash
//! and chain tables store absolute positions (`base + index`) so sliding
//! the window never touches them; only when absolute positions approach
//! `u32::MAX` are the tables rebased.

use super::ldm::LdmState;
use super::optimal::PriceModel;
use crate::params::{ResolvedParams, Strategy};

/// Table value of an empty slot
pub(crate) const EMPTY: u32 = 0;

/// Absolute position of the first byte ever placed in a window
const START_POSITION: u32 = 1;

/// Rebase the tables once absolute positions pass this value
const CORRECTION_LIMIT: u32 = 3 << 30;

/// Everything the parsers need to find matches in one frame
#[derive(Debug, Clone)]
pub(crate) struct MatchState {
    pub params: ResolvedParams,
    /// Dictionary, history and current block
    pub window: Vec<u8>,
    /// Absolute position of `window[0]`
    pub base: u32,
    /// Short hash table (all strategies)
    pub hash_table: Vec<u32>,
    /// Long (8-byte) hash table, `DFast` only
    pub long_table: Vec<u32>,
    /// Previous occurrence links, chain strategies only
    pub chain_table: Vec<u32>,
    /// First window index not yet inserted
    pub next_to_update: usize,
    pub ldm: Option<LdmState>,
    pub prices: Option<PriceModel>,
}

impl MatchState {
    /// Create the state for one frame, priming it with `dictionary`
    pub fn new(params: ResolvedParams, dictionary: Option<&[u8]>) -> Self {
        let strategy = params.strategy;
        let long_table = if strategy == Strategy::DFast {
            vec![EMPTY; 1 << params.chain_log]
        } else {
            Vec::new()
        };
        let chain_table = if strategy.uses_chain() {
            vec![EMPTY; 1 << params.chain_log]
        } else {
            Vec::new()
        };
        let ldm = params.ldm.then(|| LdmState::new(&params));
        let prices = strategy.is_optimal().then(PriceModel::default);

        let mut state = Self {
            hash_table: vec![EMPTY; 1 << params.hash_log],
            long_table,
            chain_table,
            window: Vec::new(),
            base: START_POSITION,
            next_to_update: 0,
            ldm,
            prices,
            params,
        };

        if let Some(content) = dictionary.filter(|d| !d.is_empty()) {
            // Only the tail that fits in the window is reachable
            let usable = content.len().min(state.params.window_size());
            state.window.extend_from_slice(&content[content.len() - usable..]);
            let len = state.window.len();
            state.prime(len);
            if let Some(ldm) = state.ldm.as_mut() {
                ldm.prime(&state.window, state.base, len);
            }
        }
        state
    }

    /// Absolute position of a window index
    #[inline]
    pub fn abs(&self, index: usize) -> u32 {
        self.base + index as u32
    }

    /// Window index of an absolute position, `None` if it slid out
    #[inline]
    pub fn index_of(&self, position: u32) -> Option<usize> {
        if position < self.base || position == EMPTY {
            None
        } else {
            Some((position - self.base) as usize)
        }
    }

    /// Lowest index a match found at `index` may reference
    #[inline]
    pub fn lowest_index(&self, index: usize) -> usize {
        index.saturating_sub(self.params.window_size())
    }

    /// Append a block to the window, returning its index range
    pub fn append(&mut self, block: &[u8]) -> (usize, usize) {
        let start = self.window.len();
        self.window.extend_from_slice(block);
        (start, self.window.len())
    }

    /// Drop history that no match can reach any more
    pub fn slide(&mut self) {
        let window_size = self.params.window_size();
        let slack = (window_size / 4).max(crate::common::BLOCK_SIZE_MAX);
        if self.window.len() <= window_size + slack {
            return;
        }
        let drop = self.window.len() - window_size;
        self.window.drain(..drop);
        self.base += drop as u32;
        self.next_to_update = self.next_to_update.saturating_sub(drop);
        log::trace!("window slid by {drop} bytes, base now {}", self.base);

        if self.base as u64 + self.window.len() as u64 + crate::common::BLOCK_SIZE_MAX as u64
            > CORRECTION_LIMIT as u64
        {
            self.correct();
        }
    }

    /// Rebase every stored position so absolute positions stay small
    fn correct(&mut self) {
        // Keep `position & chain_mask` unchanged for the chain table
        let cycle = self.chain_table.len().max(1) as u32;
        let correction = ((self.base - START_POSITION) / cycle) * cycle;
        if correction == 0 {
            return;
        }
        let rebase = |table: &mut Vec<u32>| {
            for slot in table.iter_mut() {
                *slot = if *slot > correction {
                    *slot - correction
                } else {
                    EMPTY
                };
            }
        };
        rebase(&mut self.hash_table);
        rebase(&mut self.long_table);
        rebase(&mut self.chain_table);
        if let Some(ldm) = self.ldm.as_mut() {
            ldm.correct(correction);
        }
        self.base -= correction;
        log::debug!("match tables rebased by {correction}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CompressionParams;

    fn params(level: i32) -> ResolvedParams {
        CompressionParams::from_level(level).unwrap().resolve().unwrap()
    }

    #[test]
    fn test_tables_follow_strategy() {
        let fast = MatchState::new(params(1), None);
        assert!(fast.chain_table.is_empty());
        assert!(fast.long_table.is_empty());
        assert!(fast.prices.is_none());

        let dfast = MatchState::new(params(3), None);
        assert!(!dfast.long_table.is_empty());

        let lazy = MatchState::new(params(8), None);
        assert!(!lazy.chain_table.is_empty());

        let opt = MatchState::new(params(19), None);
        assert!(opt.prices.is_some());
    }

    #[test]
    fn test_dictionary_priming() {
        let dictionary = b"common prefix shared by every sample, common prefix".to_vec();
        let state = MatchState::new(params(5), Some(&dictionary));
        assert_eq!(state.window, dictionary);
        assert!(state.next_to_update > 0);
        assert!(state.hash_table.iter().any(|&slot| slot != EMPTY));
    }

    #[test]
    fn test_slide_keeps_window() {
        let mut p = params(1);
        p.window_log = 10;
        p.hash_log = 8;
        let mut state = MatchState::new(p, None);
        let block = vec![7u8; crate::common::BLOCK_SIZE_MAX];
        state.append(&block);
        state.append(&block[..2048]);
        state.slide();
        assert_eq!(state.window.len(), 1024);
        assert_eq!(state.base as usize, 1 + crate::common::BLOCK_SIZE_MAX + 2048 - 1024);
        assert_eq!(state.index_of(state.base), Some(0));
        assert_eq!(state.index_of(state.base - 1), None);
    }
}
