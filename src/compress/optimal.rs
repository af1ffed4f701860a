//! Price-based optimal parser
//!
//! Each segment of a block is parsed with a forward shortest-path search:
//! node `i` holds the cheapest known way to reach `start + i`, reached
//! either by a literal or by a match. Prices are estimated bit costs in
//! 1/256 bit units, taken from symbol statistics of earlier blocks. A match
//! reaching the strategy's target length is taken at once.

use super::hash::count_match;
use super::pattern::Match;
use super::sequences::{SymbolStats, SymbolStream};
use super::state::MatchState;
use crate::common::MIN_MATCH_FLOOR;
use crate::entropy::codes::{value_to_code, VALUE_CODE_COUNT};
use crate::params::Strategy;

/// One bit in price units
const BIT: u32 = 256;

/// Positions searched per segment
const SEGMENT_SIZE: usize = 4096;

const UNREACHED: u32 = u32::MAX;

/// Fixed-point `log2(raw + 1)` in 1/256 bit units
fn frac_weight(raw: u32) -> u32 {
    let stat = raw + 1;
    let high_bit = 31 - stat.leading_zeros();
    high_bit * BIT + ((stat << 8) >> high_bit)
}

/// Per-symbol prices derived from frequencies
fn prices_of(freqs: &[u32], out: &mut [u32]) {
    let total = frac_weight(freqs.iter().sum());
    for (price, &freq) in out.iter_mut().zip(freqs) {
        *price = total.saturating_sub(frac_weight(freq)).max(BIT / 4);
    }
}

/// Estimated costs of literals, lengths and offsets
#[derive(Debug, Clone)]
pub(crate) struct PriceModel {
    stats: SymbolStats,
    literal: [u32; 256],
    literal_length: [u32; VALUE_CODE_COUNT],
    match_length: [u32; VALUE_CODE_COUNT],
    offset: [u32; VALUE_CODE_COUNT],
    /// False until real statistics have been folded in
    seeded: bool,
}

impl Default for PriceModel {
    fn default() -> Self {
        let mut stats = SymbolStats::default();
        stats.literals.fill(1);
        // Short lengths and small offsets dominate typical input
        for code in 0..VALUE_CODE_COUNT {
            let weight = (VALUE_CODE_COUNT - code) as u32;
            stats.literal_lengths[code] = weight * 2;
            stats.match_lengths[code] = weight * 2;
            stats.offsets[code] = weight;
        }
        stats.offsets[0] = VALUE_CODE_COUNT as u32 * 4;
        let mut model = Self {
            stats,
            literal: [0; 256],
            literal_length: [0; VALUE_CODE_COUNT],
            match_length: [0; VALUE_CODE_COUNT],
            offset: [0; VALUE_CODE_COUNT],
            seeded: false,
        };
        model.refresh();
        model
    }
}

impl PriceModel {
    fn refresh(&mut self) {
        prices_of(&self.stats.literals, &mut self.literal);
        prices_of(&self.stats.literal_lengths, &mut self.literal_length);
        prices_of(&self.stats.match_lengths, &mut self.match_length);
        prices_of(&self.stats.offsets, &mut self.offset);
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Fold the symbols of a parsed block into the model
    pub fn update(&mut self, stream: &SymbolStream, rep: u32) {
        let decay = |table: &mut [u32]| {
            for freq in table.iter_mut() {
                *freq = (*freq >> 1) + 1;
            }
        };
        decay(&mut self.stats.literals);
        decay(&mut self.stats.literal_lengths);
        decay(&mut self.stats.match_lengths);
        decay(&mut self.stats.offsets);
        let mut rep = rep;
        self.stats.add(stream, &mut rep);
        self.seeded = true;
        self.refresh();
    }

    #[inline]
    fn literal_price(&self, byte: u8) -> u32 {
        self.literal[byte as usize]
    }

    #[inline]
    fn value_price(table: &[u32; VALUE_CODE_COUNT], value: u32) -> u32 {
        let (code, extra_bits, _) = value_to_code(value);
        table[code as usize] + extra_bits * BIT
    }

    /// Cost of a sequence ending in a match after `literal_run` literals
    #[inline]
    fn match_price(&self, literal_run: u32, offset: u32, length: u32, rep: u32) -> u32 {
        let wire_offset = if offset == rep { 0 } else { offset };
        Self::value_price(&self.literal_length, literal_run)
            + Self::value_price(&self.match_length, length - MIN_MATCH_FLOOR as u32)
            + Self::value_price(&self.offset, wire_offset)
    }
}

/// Shortest-path node
#[derive(Debug, Clone, Copy)]
struct Node {
    price: u32,
    /// Length of the step that reached this node, 0 for a literal
    length: u32,
    offset: u32,
    /// Literals since the last match on the cheapest path
    literal_run: u32,
    /// Repeat offset in effect on the cheapest path
    rep: u32,
}

impl Node {
    const UNREACHED: Node = Node {
        price: UNREACHED,
        length: 0,
        offset: 0,
        literal_run: 0,
        rep: 0,
    };
}

impl MatchState {
    /// Candidates at `index` with strictly increasing lengths
    fn collect_matches(&mut self, index: usize, end: usize, rep: u32, out: &mut Vec<Match>) {
        out.clear();
        let min_match = self.params.min_match as usize;
        if index + min_match > end {
            return;
        }
        let low = self.lowest_index(index);
        let mut longest = min_match - 1;

        if rep > 0 && rep as usize <= index - low {
            let length = count_match(&self.window, index, index - rep as usize, end);
            if length > longest {
                longest = length;
                out.push(Match {
                    offset: rep,
                    length: length as u32,
                });
            }
        }
        if let Some(found) = self.ldm.as_ref().and_then(|ldm| ldm.candidate_at(self, index, end)) {
            if found.length as usize > longest {
                longest = found.length as usize;
                out.push(found);
            }
        }

        let depth = self.search_depth();
        self.walk_chain(index, end, low, depth, |candidate| {
            if candidate.length as usize > longest {
                longest = candidate.length as usize;
                out.push(candidate);
            }
            true
        });
        out.sort_by_key(|m| (m.length, m.offset));
        out.dedup_by_key(|m| m.length);
    }

    /// Optimal parse of `window[start..end]`
    pub(crate) fn parse_optimal(&mut self, start: usize, end: usize, rep: &mut u32, out: &mut SymbolStream) {
        let mut model = self.prices.take().unwrap_or_default();
        if self.params.strategy == Strategy::BtUltra2 && !model.is_seeded() {
            // Statistics pass over a scratch copy of the tables
            let mut scout = self.clone();
            let mut scout_rep = *rep;
            let mut first_pass = SymbolStream::default();
            scout.parse_lazy(start, end, &mut scout_rep, 2, &mut first_pass);
            model.update(&first_pass, *rep);
        }

        let block_rep = *rep;
        let all_lengths = self.params.strategy >= Strategy::BtUltra;
        let min_match = self.params.min_match as usize;
        let sufficient = match self.params.target_length as usize {
            0 => 64,
            n => n.max(min_match + 1),
        };

        let mut nodes = vec![Node::UNREACHED; SEGMENT_SIZE + 1];
        let mut matches = Vec::new();
        let mut path = Vec::new();
        let mut anchor = start;
        let mut index = start;

        while index + min_match <= end {
            let segment = (end - index).min(SEGMENT_SIZE);
            nodes[..=segment].fill(Node::UNREACHED);
            nodes[0] = Node {
                price: 0,
                length: 0,
                offset: 0,
                literal_run: (index - anchor) as u32,
                rep: *rep,
            };

            let mut last = segment;
            let mut forced: Option<Match> = None;
            for i in 0..segment {
                let node = nodes[i];
                if node.price == UNREACHED {
                    continue;
                }
                let pos = index + i;

                let literal = node.price + model.literal_price(self.window[pos]);
                if literal < nodes[i + 1].price {
                    nodes[i + 1] = Node {
                        price: literal,
                        length: 0,
                        offset: 0,
                        literal_run: node.literal_run + 1,
                        rep: node.rep,
                    };
                }

                self.collect_matches(pos, end, node.rep, &mut matches);
                let Some(&longest) = matches.last() else {
                    continue;
                };
                if longest.length as usize >= sufficient {
                    forced = Some(longest);
                    last = i;
                    break;
                }

                let mut relax = |offset: u32, length: u32| {
                    let price = node.price + model.match_price(node.literal_run, offset, length, node.rep);
                    let target = &mut nodes[i + length as usize];
                    if price < target.price {
                        *target = Node {
                            price,
                            length,
                            offset,
                            literal_run: 0,
                            rep: offset,
                        };
                    }
                };
                let mut from = min_match as u32;
                for found in &matches {
                    let top = found.length.min((segment - i) as u32);
                    if top < from {
                        break;
                    }
                    if all_lengths {
                        for length in from..=top {
                            relax(found.offset, length);
                        }
                    } else {
                        relax(found.offset, from);
                        relax(found.offset, top);
                    }
                    from = top + 1;
                }
            }

            // Walk back from the last node to recover the chosen steps
            path.clear();
            let mut at = last;
            while at > 0 {
                let node = nodes[at];
                let step = if node.length == 0 { 1 } else { node.length as usize };
                path.push((at - step, node));
                at -= step;
            }
            for &(from, node) in path.iter().rev() {
                if node.length > 0 {
                    let found = Match {
                        offset: node.offset,
                        length: node.length,
                    };
                    out.push_match(&self.window[anchor..index + from], found);
                    *rep = node.offset;
                    anchor = index + from + node.length as usize;
                }
            }
            if let Some(found) = forced {
                out.push_match(&self.window[anchor..index + last], found);
                *rep = found.offset;
                anchor = index + last + found.length as usize;
                index = anchor;
            } else {
                index += last;
            }
        }

        out.push_literals(&self.window[anchor..end]);
        model.update(out, block_rep);
        self.prices = Some(model);
    }
}
