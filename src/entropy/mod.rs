//! Entropy coding
//!
//! Symbols are coded with canonical, length-limited Huffman codes. A
//! distribution with a single distinct symbol degenerates into a constant
//! code that spends zero bits per symbol.
//!
//! Codes travel inside compressed blocks as a description:
//!
//! ```text
//! 0x00 varint(symbol)                          constant code
//! 0x01 varint(n) lengths[n] (4 bits each, low nibble first)
//! 0x02                                         use the dictionary's table
//! ```

pub mod codes;
mod huffman;

pub use huffman::HuffmanCode;

use crate::bitio::{write_varint, BitReader, BitWriter, ByteCursor};
use crate::common::MAX_CODE_BITS;
use crate::{CodecError, Result};

const DESC_CONSTANT: u8 = 0;
const DESC_HUFFMAN: u8 = 1;
const DESC_DICTIONARY: u8 = 2;

/// A prefix code over `u16` symbols
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    /// Only one symbol occurs; it costs no bits
    Constant(u16),
    /// General canonical Huffman code
    Huffman(HuffmanCode),
}

/// Parsed table description
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableDescription {
    /// Table carried inline
    Inline(Code),
    /// Use the matching table from the session dictionary
    Dictionary,
}

impl Code {
    /// Build a code from symbol frequencies
    pub fn build(freqs: &[u32]) -> Result<Self> {
        Self::build_limited(freqs, MAX_CODE_BITS)
    }

    /// Build a code whose lengths do not exceed `max_bits`
    pub fn build_limited(freqs: &[u32], max_bits: u8) -> Result<Self> {
        let mut present = freqs.iter().enumerate().filter(|(_, &f)| f > 0);
        let Some((first, _)) = present.next() else {
            return Err(CodecError::config("cannot build a code from an empty histogram"));
        };
        if present.next().is_none() {
            return Ok(Code::Constant(first as u16));
        }
        Ok(Code::Huffman(HuffmanCode::from_frequencies(
            freqs, max_bits,
        )?))
    }

    /// True if every symbol with a non-zero count has a code
    pub fn covers(&self, freqs: &[u32]) -> bool {
        match self {
            Code::Constant(symbol) => freqs
                .iter()
                .enumerate()
                .all(|(s, &f)| f == 0 || s == *symbol as usize),
            Code::Huffman(code) => freqs
                .iter()
                .enumerate()
                .all(|(s, &f)| f == 0 || code.length_of(s as u16) > 0),
        }
    }

    /// Bits needed to code the histogram, `None` if a symbol is not covered
    pub fn cost_bits(&self, freqs: &[u32]) -> Option<u64> {
        if !self.covers(freqs) {
            return None;
        }
        Some(match self {
            Code::Constant(_) => 0,
            Code::Huffman(code) => freqs
                .iter()
                .enumerate()
                .map(|(s, &f)| f as u64 * code.length_of(s as u16) as u64)
                .sum(),
        })
    }

    /// Code length in bits of `symbol`
    pub fn bits_for(&self, symbol: u16) -> u32 {
        match self {
            Code::Constant(_) => 0,
            Code::Huffman(code) => code.length_of(symbol) as u32,
        }
    }

    /// Write one symbol
    #[inline]
    pub fn encode_symbol(&self, writer: &mut BitWriter, symbol: u16) -> Result<()> {
        match self {
            Code::Constant(expected) if *expected == symbol => Ok(()),
            Code::Constant(expected) => Err(CodecError::config(format!(
                "symbol {symbol} coded with constant table for {expected}"
            ))),
            Code::Huffman(code) => code.encode_symbol(writer, symbol),
        }
    }

    /// Read one symbol
    #[inline]
    pub fn decode_symbol(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        match self {
            Code::Constant(symbol) => Ok(*symbol),
            Code::Huffman(code) => code.decode_symbol(reader),
        }
    }

    /// Append the inline description of this code
    pub fn write_description(&self, out: &mut Vec<u8>) {
        match self {
            Code::Constant(symbol) => {
                out.push(DESC_CONSTANT);
                write_varint(out, *symbol as u64);
            }
            Code::Huffman(code) => {
                let lengths = code.lengths();
                let used = lengths.iter().rposition(|&l| l > 0).map_or(0, |i| i + 1);
                out.push(DESC_HUFFMAN);
                write_varint(out, used as u64);
                for pair in lengths[..used].chunks(2) {
                    let low = pair[0];
                    let high = pair.get(1).copied().unwrap_or(0);
                    out.push(low | (high << 4));
                }
            }
        }
    }

    /// Size in bytes of the inline description
    pub fn description_len(&self) -> usize {
        let mut out = Vec::new();
        self.write_description(&mut out);
        out.len()
    }

    /// Parse a description for an alphabet of `alphabet` symbols
    pub fn read_description(
        cursor: &mut ByteCursor<'_>,
        alphabet: usize,
    ) -> Result<TableDescription> {
        match cursor.read_u8()? {
            DESC_CONSTANT => {
                let symbol = cursor.read_length(alphabet - 1, "constant symbol")?;
                Ok(TableDescription::Inline(Code::Constant(symbol as u16)))
            }
            DESC_HUFFMAN => {
                let count = cursor.read_length(alphabet, "table size")?;
                let packed = cursor.read_slice(count.div_ceil(2))?;
                let mut lengths = Vec::with_capacity(count);
                for &byte in packed {
                    lengths.push(byte & 0x0F);
                    lengths.push(byte >> 4);
                }
                if count % 2 == 1 && lengths.pop() != Some(0) {
                    return Err(CodecError::corrupt("non-zero padding in table description"));
                }
                Ok(TableDescription::Inline(Code::Huffman(
                    HuffmanCode::from_lengths(lengths, MAX_CODE_BITS)?,
                )))
            }
            DESC_DICTIONARY => Ok(TableDescription::Dictionary),
            other => Err(CodecError::corrupt(format!(
                "unknown table description kind {other}"
            ))),
        }
    }
}

/// Write the marker that selects the dictionary's table
pub fn write_dictionary_reference(out: &mut Vec<u8>) {
    out.push(DESC_DICTIONARY);
}

/// Build a code from a frequency table
pub fn build(freqs: &[u32]) -> Result<Code> {
    Code::build(freqs)
}

/// Encode `symbols` into a standalone bitstream
pub fn encode(code: &Code, symbols: &[u16]) -> Result<Vec<u8>> {
    let mut writer = BitWriter::with_capacity(symbols.len());
    for &symbol in symbols {
        code.encode_symbol(&mut writer, symbol)?;
    }
    Ok(writer.finish())
}

/// Decode exactly `count` symbols from `bitstream`
pub fn decode(code: &Code, bitstream: &[u8], count: usize) -> Result<Vec<u16>> {
    let mut reader = BitReader::new(bitstream);
    let mut symbols = Vec::with_capacity(count);
    for _ in 0..count {
        symbols.push(code.decode_symbol(&mut reader)?);
    }
    Ok(symbols)
}

/// Byte histogram
pub fn histogram(data: &[u8]) -> [u32; 256] {
    let mut freqs = [0u32; 256];
    for &byte in data {
        freqs[byte as usize] += 1;
    }
    freqs
}
