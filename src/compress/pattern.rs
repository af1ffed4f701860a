//! Match search and the greedy/lazy parsers
//!
//! Every search probes the repeat offset first, then the long distance
//! candidate, then the strategy's own tables. Longer matches win; equal
//! lengths keep the smaller offset.

use super::hash::{count_match, LONG_HASH_BYTES};
use super::sequences::SymbolStream;
use super::state::{MatchState, EMPTY};
use crate::params::Strategy;

/// Literal runs longer than `1 << SKIP_SHIFT` make the fast strategies step faster
const SKIP_SHIFT: usize = 8;

/// Extra gain a deferred match must show before it replaces the current one
const LAZY_BONUS: i64 = 4;

/// A back-reference candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Match {
    pub offset: u32,
    pub length: u32,
}

impl Match {
    /// Rough worth of the match in quarter bytes
    #[inline]
    pub fn gain(&self, rep: u32) -> i64 {
        let offset_bits = if self.offset == rep {
            0
        } else {
            32 - self.offset.leading_zeros() as i64
        };
        self.length as i64 * 4 - offset_bits
    }
}

/// Keep the longer candidate, or the closer one on a tie
#[inline]
fn consider(best: &mut Option<Match>, candidate: Match) {
    match best {
        Some(current)
            if candidate.length < current.length
                || (candidate.length == current.length && candidate.offset >= current.offset) => {}
        _ => *best = Some(candidate),
    }
}

impl MatchState {
    /// Verify the candidate at absolute `position` for a match at `index`
    #[inline]
    fn check_candidate(&self, index: usize, position: u32, end: usize, low: usize) -> Option<Match> {
        let cand = self.index_of(position)?;
        if cand < low || cand >= index {
            return None;
        }
        let length = count_match(&self.window, index, cand, end);
        (length >= self.params.min_match as usize).then_some(Match {
            offset: (index - cand) as u32,
            length: length as u32,
        })
    }

    /// Match at the repeat offset, if any
    #[inline]
    fn repeat_match(&self, index: usize, end: usize, rep: u32) -> Option<Match> {
        let rep_usize = rep as usize;
        if rep == 0 || rep_usize > index - self.lowest_index(index) {
            return None;
        }
        let length = count_match(&self.window, index, index - rep_usize, end);
        (length >= self.params.min_match as usize).then_some(Match {
            offset: rep,
            length: length as u32,
        })
    }

    /// Length at which searching stops early
    fn sufficient_length(&self) -> usize {
        match self.params.strategy {
            Strategy::Fast | Strategy::DFast => usize::MAX,
            _ if self.params.target_length == 0 => usize::MAX,
            _ => self.params.target_length as usize,
        }
    }

    /// Best match at `index` that ends no later than `end`
    pub(crate) fn find_best(&mut self, index: usize, end: usize, rep: u32) -> Option<Match> {
        if index + self.params.min_match as usize > end {
            return None;
        }
        let low = self.lowest_index(index);
        let mut best = self.repeat_match(index, end, rep);
        if let Some(candidate) = self.ldm.as_ref().and_then(|ldm| ldm.candidate_at(self, index, end)) {
            consider(&mut best, candidate);
        }

        match self.params.strategy {
            Strategy::Fast => {
                let slot = self.short_hash(index);
                if let Some(candidate) = self.check_candidate(index, self.hash_table[slot], end, low) {
                    consider(&mut best, candidate);
                }
                self.hash_table[slot] = self.abs(index);
            }
            Strategy::DFast => {
                if index + LONG_HASH_BYTES <= self.window.len() {
                    let slot = self.long_hash(index);
                    if let Some(candidate) =
                        self.check_candidate(index, self.long_table[slot], end, low)
                    {
                        consider(&mut best, candidate);
                    }
                }
                let slot = self.short_hash(index);
                if let Some(candidate) = self.check_candidate(index, self.hash_table[slot], end, low) {
                    consider(&mut best, candidate);
                }
                self.insert(index);
            }
            _ => {
                let depth = self.search_depth();
                self.walk_chain(index, end, low, depth, |candidate| {
                    consider(&mut best, candidate);
                    true
                });
            }
        }
        best
    }

    /// Chain searches per position for the strategy
    pub(crate) fn search_depth(&self) -> usize {
        let depth = 1usize << self.params.search_log;
        match self.params.strategy {
            Strategy::BtLazy2 | Strategy::BtUltra | Strategy::BtUltra2 => depth * 2,
            _ => depth,
        }
    }

    /// Walk the hash chain at `index`, newest first, feeding verified
    /// candidates to `visit` until it returns false or the depth is spent
    pub(crate) fn walk_chain<F>(&mut self, index: usize, end: usize, low: usize, depth: usize, mut visit: F)
    where
        F: FnMut(Match) -> bool,
    {
        self.update_to(index);
        let sufficient = self.sufficient_length();
        let chain_size = self.chain_table.len();
        let mask = chain_size - 1;
        let mut position = self.hash_table[self.short_hash(index)];
        let mut attempts = depth;

        while position != EMPTY && attempts > 0 {
            let Some(cand) = self.index_of(position) else {
                break;
            };
            if cand < low {
                break;
            }
            if cand < index {
                if index - cand >= chain_size {
                    break;
                }
                if let Some(candidate) = self.check_candidate(index, position, end, low) {
                    let length = candidate.length as usize;
                    if !visit(candidate) || length >= sufficient || index + length == end {
                        break;
                    }
                }
            }
            position = self.chain_table[position as usize & mask];
            attempts -= 1;
        }
    }

    /// Greedy or lazy parse of `window[start..end]`
    pub(crate) fn parse_lazy(
        &mut self,
        start: usize,
        end: usize,
        rep: &mut u32,
        lazy_depth: usize,
        out: &mut SymbolStream,
    ) {
        let min_match = self.params.min_match as usize;
        let fast = matches!(self.params.strategy, Strategy::Fast | Strategy::DFast);
        let acceleration = (self.params.target_length as usize).max(1);
        let sufficient = self.sufficient_length();
        let mut anchor = start;
        let mut index = start;

        while index + min_match <= end {
            let Some(mut best) = self.find_best(index, end, *rep) else {
                index += if fast {
                    1 + ((index - anchor) >> SKIP_SHIFT) * acceleration
                } else {
                    1
                };
                continue;
            };

            let mut at = index;
            if (best.length as usize) < sufficient {
                for _ in 0..lazy_depth {
                    let next = at + 1;
                    match self.find_best(next, end, *rep) {
                        Some(candidate) if candidate.gain(*rep) > best.gain(*rep) + LAZY_BONUS => {
                            best = candidate;
                            at = next;
                        }
                        _ => break,
                    }
                }
            }

            out.push_match(&self.window[anchor..at], best);
            *rep = best.offset;
            index = at + best.length as usize;
            anchor = index;

            if fast {
                // Seed a couple of positions from inside the match
                for inside in [at + 2, index.saturating_sub(2)] {
                    if inside > at && inside < index {
                        self.insert(inside);
                    }
                }
            }
        }

        out.push_literals(&self.window[anchor..end]);
    }
}
