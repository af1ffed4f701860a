//! Symbol streams and compressed block payloads
//!
//! ```text
//! payload   := varint(regenerated) literals sequences
//! literals  := mode:u8 varint(count) body
//!              0 raw:     count bytes
//!              1 rle:     one byte
//!              2 huffman: description varint(len) bitstream
//! sequences := varint(nb_seq) [ll_desc ml_desc of_desc varint(len) bitstream]
//! ```
//!
//! For each sequence the bitstream holds the literal-length, match-length
//! and offset codes followed by their extra bits. Match lengths are stored
//! minus the minimum match; an offset equal to the previous one is stored
//! as 0.

use super::pattern::Match;
use crate::bitio::{write_varint, BitWriter};
use crate::common::MIN_MATCH_FLOOR;
use crate::dictionary::EntropyTables;
use crate::entropy::codes::{value_to_code, VALUE_CODE_COUNT};
use crate::entropy::{histogram, write_dictionary_reference, Code};
use crate::frame::Sequence;
use crate::Result;

pub(crate) const LITERALS_RAW: u8 = 0;
pub(crate) const LITERALS_RLE: u8 = 1;
pub(crate) const LITERALS_HUFFMAN: u8 = 2;

/// Sequences and literal bytes produced by a parser for one block
#[derive(Debug, Default, Clone)]
pub(crate) struct SymbolStream {
    pub sequences: Vec<Sequence>,
    pub literals: Vec<u8>,
}

impl SymbolStream {
    pub fn clear(&mut self) {
        self.sequences.clear();
        self.literals.clear();
    }

    /// Record `literals` followed by `found`
    pub fn push_match(&mut self, literals: &[u8], found: Match) {
        self.literals.extend_from_slice(literals);
        self.sequences.push(Sequence {
            literal_length: literals.len() as u32,
            offset: found.offset,
            match_length: found.length,
        });
    }

    /// Record trailing literals
    pub fn push_literals(&mut self, literals: &[u8]) {
        self.literals.extend_from_slice(literals);
    }
}

/// One sequence split into codes and extra bits
#[derive(Debug, Clone, Copy)]
struct SequenceCodes {
    ll: (u16, u32, u32),
    ml: (u16, u32, u32),
    of: (u16, u32, u32),
}

/// Split sequences into codes, resolving repeat offsets from `rep`
fn sequence_codes(sequences: &[Sequence], rep: &mut u32) -> Vec<SequenceCodes> {
    sequences
        .iter()
        .map(|seq| {
            let wire_offset = if seq.offset == *rep { 0 } else { seq.offset };
            *rep = seq.offset;
            SequenceCodes {
                ll: value_to_code(seq.literal_length),
                ml: value_to_code(seq.match_length - MIN_MATCH_FLOOR as u32),
                of: value_to_code(wire_offset),
            }
        })
        .collect()
}

/// Symbol frequencies gathered over many blocks
#[derive(Debug, Clone)]
pub(crate) struct SymbolStats {
    pub literals: [u32; 256],
    pub literal_lengths: [u32; VALUE_CODE_COUNT],
    pub match_lengths: [u32; VALUE_CODE_COUNT],
    pub offsets: [u32; VALUE_CODE_COUNT],
}

impl Default for SymbolStats {
    fn default() -> Self {
        Self {
            literals: [0; 256],
            literal_lengths: [0; VALUE_CODE_COUNT],
            match_lengths: [0; VALUE_CODE_COUNT],
            offsets: [0; VALUE_CODE_COUNT],
        }
    }
}

impl SymbolStats {
    /// Count the symbols of one block
    pub fn add(&mut self, stream: &SymbolStream, rep: &mut u32) {
        for &byte in &stream.literals {
            self.literals[byte as usize] += 1;
        }
        for codes in sequence_codes(&stream.sequences, rep) {
            self.literal_lengths[codes.ll.0 as usize] += 1;
            self.match_lengths[codes.ml.0 as usize] += 1;
            self.offsets[codes.of.0 as usize] += 1;
        }
    }
}

/// Table picked for one stream
enum TableChoice<'a> {
    Inline(Code),
    Dictionary(&'a Code),
}

impl TableChoice<'_> {
    fn code(&self) -> &Code {
        match self {
            TableChoice::Inline(code) => code,
            TableChoice::Dictionary(code) => code,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            TableChoice::Inline(code) => code.write_description(out),
            TableChoice::Dictionary(_) => write_dictionary_reference(out),
        }
    }
}

/// Pick the cheaper of a fresh table and the dictionary's
fn choose_table<'a>(freqs: &[u32], dictionary: Option<&'a Code>) -> Result<(TableChoice<'a>, u64)> {
    let inline = Code::build(freqs)?;
    let inline_bits = inline.cost_bits(freqs).unwrap_or(u64::MAX) + inline.description_len() as u64 * 8;
    if let Some(shared) = dictionary {
        if let Some(bits) = shared.cost_bits(freqs) {
            let shared_bits = bits + 8;
            if shared_bits < inline_bits {
                return Ok((TableChoice::Dictionary(shared), shared_bits));
            }
        }
    }
    Ok((TableChoice::Inline(inline), inline_bits))
}

fn varint_len(value: u64) -> usize {
    let mut scratch = Vec::with_capacity(10);
    write_varint(&mut scratch, value);
    scratch.len()
}

fn write_literals(out: &mut Vec<u8>, literals: &[u8], tables: Option<&EntropyTables>) -> Result<()> {
    let count = literals.len();
    let Some(&first) = literals.first() else {
        out.push(LITERALS_RAW);
        write_varint(out, 0);
        return Ok(());
    };
    if literals.iter().all(|&b| b == first) {
        out.push(LITERALS_RLE);
        write_varint(out, count as u64);
        out.push(first);
        return Ok(());
    }

    let freqs = histogram(literals);
    let (choice, bits) = choose_table(&freqs, tables.map(|t| &t.literals))?;
    let stream_len = bits.div_ceil(8) as usize;
    if stream_len + varint_len(stream_len as u64) < count {
        let symbols: Vec<u16> = literals.iter().map(|&b| b as u16).collect();
        let bitstream = crate::entropy::encode(choice.code(), &symbols)?;
        out.push(LITERALS_HUFFMAN);
        write_varint(out, count as u64);
        choice.write(out);
        write_varint(out, bitstream.len() as u64);
        out.extend_from_slice(&bitstream);
    } else {
        out.push(LITERALS_RAW);
        write_varint(out, count as u64);
        out.extend_from_slice(literals);
    }
    Ok(())
}

fn write_sequences(
    out: &mut Vec<u8>,
    sequences: &[Sequence],
    rep: &mut u32,
    tables: Option<&EntropyTables>,
) -> Result<()> {
    write_varint(out, sequences.len() as u64);
    if sequences.is_empty() {
        return Ok(());
    }

    let codes = sequence_codes(sequences, rep);
    let mut ll_freqs = [0u32; VALUE_CODE_COUNT];
    let mut ml_freqs = [0u32; VALUE_CODE_COUNT];
    let mut of_freqs = [0u32; VALUE_CODE_COUNT];
    for c in &codes {
        ll_freqs[c.ll.0 as usize] += 1;
        ml_freqs[c.ml.0 as usize] += 1;
        of_freqs[c.of.0 as usize] += 1;
    }

    let (ll, _) = choose_table(&ll_freqs, tables.map(|t| &t.literal_lengths))?;
    let (ml, _) = choose_table(&ml_freqs, tables.map(|t| &t.match_lengths))?;
    let (of, _) = choose_table(&of_freqs, tables.map(|t| &t.offsets))?;
    ll.write(out);
    ml.write(out);
    of.write(out);

    let mut writer = BitWriter::with_capacity(sequences.len() * 4);
    for c in &codes {
        ll.code().encode_symbol(&mut writer, c.ll.0)?;
        ml.code().encode_symbol(&mut writer, c.ml.0)?;
        of.code().encode_symbol(&mut writer, c.of.0)?;
        writer.write_bits(c.ll.2, c.ll.1);
        writer.write_bits(c.ml.2, c.ml.1);
        writer.write_bits(c.of.2, c.of.1);
    }
    let bitstream = writer.finish();
    write_varint(out, bitstream.len() as u64);
    out.extend_from_slice(&bitstream);
    Ok(())
}

/// Encode a compressed block payload, advancing `rep` past its sequences
pub(crate) fn encode_payload(
    regenerated: usize,
    stream: &SymbolStream,
    rep: &mut u32,
    tables: Option<&EntropyTables>,
) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(regenerated / 2 + 16);
    write_varint(&mut out, regenerated as u64);
    write_literals(&mut out, &stream.literals, tables)?;
    write_sequences(&mut out, &stream.sequences, rep, tables)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> SymbolStream {
        let mut stream = SymbolStream::default();
        stream.push_match(b"abcd", Match { offset: 4, length: 12 });
        stream.push_match(b"", Match { offset: 4, length: 3 });
        stream.push_match(b"xy", Match { offset: 700, length: 40 });
        stream.push_literals(b"tail");
        stream
    }

    #[test]
    fn test_repeat_offsets_resolved() {
        let mut rep = 4;
        let codes = sequence_codes(&stream().sequences, &mut rep);
        assert_eq!(codes[0].of.0, 0);
        assert_eq!(codes[1].of.0, 0);
        assert_ne!(codes[2].of.0, 0);
        assert_eq!(rep, 700);
    }

    #[test]
    fn test_literal_modes() {
        let mut out = Vec::new();
        write_literals(&mut out, b"", None).unwrap();
        assert_eq!(out, [LITERALS_RAW, 0]);

        let mut out = Vec::new();
        write_literals(&mut out, &[9u8; 300], None).unwrap();
        assert_eq!(out[0], LITERALS_RLE);
        assert_eq!(out.len(), 4);

        let mut out = Vec::new();
        let text = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaabbbbbbbbbbbbbbbbbcccccccd".repeat(20);
        write_literals(&mut out, &text, None).unwrap();
        assert_eq!(out[0], LITERALS_HUFFMAN);
        assert!(out.len() < text.len());
    }

    #[test]
    fn test_incompressible_literals_stay_raw() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut out = Vec::new();
        write_literals(&mut out, &data, None).unwrap();
        assert_eq!(out[0], LITERALS_RAW);
    }

    #[test]
    fn test_stats_count_symbols() {
        let mut stats = SymbolStats::default();
        let mut rep = 1;
        stats.add(&stream(), &mut rep);
        assert_eq!(stats.literals[b'a' as usize], 2);
        assert_eq!(stats.offsets.iter().sum::<u32>(), 3);
        assert_eq!(stats.offsets[0], 1);
    }

    #[test]
    fn test_payload_starts_with_size() {
        let mut rep = 1;
        let payload = encode_payload(65, &stream(), &mut rep, None).unwrap();
        assert_eq!(payload[0], 65);
    }
}
