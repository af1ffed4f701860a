//! Huffman code construction
//!
//! Code lengths come from a deterministic Huffman tree: ties between equal
//! weights are broken by node order (leaves by symbol value, internal nodes
//! by creation order), so identical frequency tables always produce
//! identical codes. Lengths above the limit are handled by halving the
//! weights and rebuilding until the tree fits.

use crate::bitio::{BitReader, BitWriter};
use crate::{CodecError, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Lookup table entry: symbol and code length (0 marks an unused slot)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DecodeEntry {
    symbol: u16,
    length: u8,
}

/// Canonical prefix code over a dense alphabet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanCode {
    /// Code length per symbol, 0 for absent symbols
    lengths: Vec<u8>,
    /// Bit-reversed canonical codes, ready for LSB-first output
    codes: Vec<u16>,
    /// Decode table indexed by the next `table_bits` input bits
    table: Vec<DecodeEntry>,
    table_bits: u8,
}

impl HuffmanCode {
    /// Build a code from per-symbol frequencies
    pub fn from_frequencies(freqs: &[u32], max_bits: u8) -> Result<Self> {
        let lengths = limited_code_lengths(freqs, max_bits);
        Self::from_lengths(lengths, max_bits)
    }

    /// Build a code from per-symbol lengths, validating the Kraft inequality
    pub fn from_lengths(mut lengths: Vec<u8>, max_bits: u8) -> Result<Self> {
        while lengths.last() == Some(&0) {
            lengths.pop();
        }
        let table_bits = lengths.iter().copied().max().unwrap_or(0);
        if table_bits == 0 {
            return Err(CodecError::corrupt("prefix code without symbols"));
        }
        if table_bits > max_bits {
            return Err(CodecError::corrupt(format!(
                "code length {table_bits} exceeds limit {max_bits}"
            )));
        }

        let kraft: u64 = lengths
            .iter()
            .filter(|&&l| l > 0)
            .map(|&l| 1u64 << (table_bits - l))
            .sum();
        if kraft > 1u64 << table_bits {
            return Err(CodecError::corrupt("over-subscribed prefix code"));
        }

        // Canonical assignment ordered by (length, symbol)
        let mut bl_count = [0u32; 16];
        for &len in &lengths {
            if len > 0 {
                bl_count[len as usize] += 1;
            }
        }
        let mut next_code = [0u32; 16];
        let mut code = 0u32;
        for bits in 1..16 {
            code = (code + bl_count[bits - 1]) << 1;
            next_code[bits] = code;
        }

        let mut codes = vec![0u16; lengths.len()];
        let mut table = vec![DecodeEntry::default(); 1usize << table_bits];
        for (symbol, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let canonical = next_code[len as usize];
            next_code[len as usize] += 1;
            let reversed = reverse_bits(canonical, len);
            codes[symbol] = reversed as u16;

            let step = 1usize << len;
            let mut index = reversed as usize;
            while index < table.len() {
                table[index] = DecodeEntry {
                    symbol: symbol as u16,
                    length: len,
                };
                index += step;
            }
        }

        Ok(Self {
            lengths,
            codes,
            table,
            table_bits,
        })
    }

    /// Per-symbol code lengths
    pub fn lengths(&self) -> &[u8] {
        &self.lengths
    }

    /// Code length of `symbol`, 0 if it has no code
    #[inline]
    pub fn length_of(&self, symbol: u16) -> u8 {
        self.lengths.get(symbol as usize).copied().unwrap_or(0)
    }

    /// Write the code for `symbol`
    #[inline]
    pub fn encode_symbol(&self, writer: &mut BitWriter, symbol: u16) -> Result<()> {
        let len = self.length_of(symbol);
        if len == 0 {
            return Err(CodecError::config(format!(
                "symbol {symbol} has no code in this table"
            )));
        }
        writer.write_bits(self.codes[symbol as usize] as u32, len as u32);
        Ok(())
    }

    /// Read one symbol
    #[inline]
    pub fn decode_symbol(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        let bits = reader.peek_bits(self.table_bits as u32) as usize;
        let entry = self.table[bits];
        if entry.length == 0 {
            return Err(CodecError::corrupt("bit pattern matches no code"));
        }
        reader.consume(entry.length as u32)?;
        Ok(entry.symbol)
    }
}

/// Reverse the low `len` bits of `code`
fn reverse_bits(code: u32, len: u8) -> u32 {
    code.reverse_bits() >> (32 - len as u32)
}

/// Code lengths limited to `max_bits`
pub(crate) fn limited_code_lengths(freqs: &[u32], max_bits: u8) -> Vec<u8> {
    let mut weights: Vec<u64> = freqs.iter().map(|&f| f as u64).collect();
    loop {
        let lengths = tree_code_lengths(&weights);
        if lengths.iter().all(|&l| l <= max_bits) {
            return lengths;
        }
        for weight in weights.iter_mut().filter(|w| **w > 0) {
            *weight = (*weight >> 1).max(1);
        }
    }
}

/// Unlimited Huffman code lengths; a lone symbol gets length 1
fn tree_code_lengths(weights: &[u64]) -> Vec<u8> {
    let leaves = weights.len();
    let mut lengths = vec![0u8; leaves];

    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = weights
        .iter()
        .enumerate()
        .filter(|(_, &w)| w > 0)
        .map(|(symbol, &w)| Reverse((w, symbol)))
        .collect();

    match heap.len() {
        0 => return lengths,
        1 => {
            if let Some(Reverse((_, symbol))) = heap.pop() {
                lengths[symbol] = 1;
            }
            return lengths;
        }
        _ => {}
    }

    // Node ids: leaves are 0..leaves, internal nodes follow in creation order
    let mut parent = vec![usize::MAX; leaves];
    while heap.len() > 1 {
        let (Some(Reverse((w1, a))), Some(Reverse((w2, b)))) = (heap.pop(), heap.pop()) else {
            break;
        };
        let node = parent.len();
        parent.push(usize::MAX);
        parent[a] = node;
        parent[b] = node;
        heap.push(Reverse((w1 + w2, node)));
    }

    // Parents are always created after their children
    let mut depth = vec![0u32; parent.len()];
    for node in (leaves..parent.len()).rev() {
        if parent[node] != usize::MAX {
            depth[node] = depth[parent[node]] + 1;
        }
    }
    for symbol in 0..leaves {
        if parent[symbol] != usize::MAX {
            lengths[symbol] = (depth[parent[symbol]] + 1).min(u8::MAX as u32) as u8;
        }
    }

    lengths
}
