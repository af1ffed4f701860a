//! Compressed block decoding
//!
//! Inverse of the payload layout written by the compressor: literals are
//! decoded first, then the sequence bitstream is replayed against the
//! history, copying literal runs and back-references in order.

use crate::bitio::{BitReader, ByteCursor};
use crate::common::{BLOCK_SIZE_MAX, MIN_MATCH_FLOOR};
use crate::compress::{LITERALS_HUFFMAN, LITERALS_RAW, LITERALS_RLE};
use crate::dictionary::EntropyTables;
use crate::entropy::codes::{code_base, VALUE_CODE_COUNT};
use crate::entropy::{Code, TableDescription};
use crate::{CodecError, Result};
use std::borrow::Cow;

/// Counts reported for a decoded block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BlockCounts {
    pub literals: usize,
    pub sequences: usize,
    pub longest_match: usize,
}

/// Resolve a table description against the dictionary tables
fn read_table<'a>(
    cursor: &mut ByteCursor<'_>,
    alphabet: usize,
    shared: Option<&'a Code>,
) -> Result<Cow<'a, Code>> {
    match Code::read_description(cursor, alphabet)? {
        TableDescription::Inline(code) => Ok(Cow::Owned(code)),
        TableDescription::Dictionary => shared
            .map(Cow::Borrowed)
            .ok_or_else(|| CodecError::corrupt("block refers to dictionary tables that are not loaded")),
    }
}

fn read_literals<'p>(
    cursor: &mut ByteCursor<'p>,
    regenerated: usize,
    tables: Option<&EntropyTables>,
) -> Result<Cow<'p, [u8]>> {
    let mode = cursor.read_u8()?;
    let count = cursor.read_length(regenerated, "literal count")?;
    match mode {
        LITERALS_RAW => Ok(Cow::Borrowed(cursor.read_slice(count)?)),
        LITERALS_RLE => Ok(Cow::Owned(vec![cursor.read_u8()?; count])),
        LITERALS_HUFFMAN => {
            let code = read_table(cursor, 256, tables.map(|t| &t.literals))?;
            let len = cursor.read_length(cursor.remaining(), "literal stream")?;
            let stream = cursor.read_slice(len)?;
            let symbols = crate::entropy::decode(&code, stream, count)?;
            Ok(Cow::Owned(symbols.into_iter().map(|s| s as u8).collect()))
        }
        other => Err(CodecError::corrupt(format!("unknown literals mode {other}"))),
    }
}

#[inline]
fn read_value(code: &Code, reader: &mut BitReader<'_>) -> Result<u16> {
    code.decode_symbol(reader)
}

#[inline]
fn value_of(code: u16, reader: &mut BitReader<'_>) -> Result<u64> {
    let (base, bits) = code_base(code)?;
    Ok(base as u64 + reader.read_bits(bits)? as u64)
}

/// Decode one compressed payload, appending its content to `history`
///
/// `history` holds everything a back-reference may reach (dictionary tail
/// and earlier content); offsets beyond `window_size` or the start of the
/// history are rejected. `rep` is the frame's repeat offset.
pub(crate) fn decode_compressed_block(
    payload: &[u8],
    history: &mut Vec<u8>,
    window_size: usize,
    rep: &mut u32,
    tables: Option<&EntropyTables>,
) -> Result<BlockCounts> {
    let mut cursor = ByteCursor::new(payload);
    let regenerated = cursor.read_length(BLOCK_SIZE_MAX, "block size")?;
    let literals = read_literals(&mut cursor, regenerated, tables)?;
    let nb_seq = cursor.read_length(regenerated, "sequence count")?;
    let block_start = history.len();
    let block_end = block_start + regenerated;
    history.reserve(regenerated);

    let mut counts = BlockCounts {
        literals: literals.len(),
        sequences: nb_seq,
        longest_match: 0,
    };
    let mut lit_pos = 0usize;

    if nb_seq > 0 {
        let ll_code = read_table(&mut cursor, VALUE_CODE_COUNT, tables.map(|t| &t.literal_lengths))?;
        let ml_code = read_table(&mut cursor, VALUE_CODE_COUNT, tables.map(|t| &t.match_lengths))?;
        let of_code = read_table(&mut cursor, VALUE_CODE_COUNT, tables.map(|t| &t.offsets))?;
        let len = cursor.read_length(cursor.remaining(), "sequence stream")?;
        let mut reader = BitReader::new(cursor.read_slice(len)?);

        for _ in 0..nb_seq {
            let ll = read_value(&ll_code, &mut reader)?;
            let ml = read_value(&ml_code, &mut reader)?;
            let of = read_value(&of_code, &mut reader)?;
            let literal_length = value_of(ll, &mut reader)? as usize;
            let match_length = value_of(ml, &mut reader)? as usize + MIN_MATCH_FLOOR;
            let offset = match value_of(of, &mut reader)? {
                0 => *rep,
                value => value as u32,
            };

            if literal_length > literals.len() - lit_pos {
                return Err(CodecError::corrupt("literal run exceeds decoded literals"));
            }
            history.extend_from_slice(&literals[lit_pos..lit_pos + literal_length]);
            lit_pos += literal_length;

            let reach = window_size.min(history.len());
            if offset == 0 || offset as usize > reach {
                return Err(CodecError::corrupt(format!(
                    "offset {offset} reaches beyond the window ({reach} bytes available)"
                )));
            }
            if history.len() + match_length > block_end {
                return Err(CodecError::corrupt("match runs past the block size"));
            }
            copy_match(history, offset as usize, match_length);
            *rep = offset;
            counts.longest_match = counts.longest_match.max(match_length);
        }
        if !reader.is_finished() {
            return Err(CodecError::corrupt("unused bits after the last sequence"));
        }
    }

    history.extend_from_slice(&literals[lit_pos..]);
    if !cursor.is_empty() {
        return Err(CodecError::corrupt("trailing bytes in compressed block"));
    }
    if history.len() != block_end {
        return Err(CodecError::corrupt(format!(
            "block decoded to {} bytes, header says {regenerated}",
            history.len() - block_start
        )));
    }
    Ok(counts)
}

/// Append `length` bytes copied from `offset` bytes back; may overlap
#[inline]
fn copy_match(history: &mut Vec<u8>, offset: usize, length: usize) {
    let from = history.len() - offset;
    if offset >= length {
        history.extend_from_within(from..from + length);
    } else {
        for i in 0..length {
            let byte = history[from + i];
            history.push(byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitio::write_varint;

    #[test]
    fn test_overlapping_copy() {
        let mut history = b"ab".to_vec();
        copy_match(&mut history, 2, 5);
        assert_eq!(history, b"abababa");
        copy_match(&mut history, 7, 3);
        assert_eq!(history, b"abababaaba");
    }

    #[test]
    fn test_literals_only_block() {
        let mut payload = Vec::new();
        write_varint(&mut payload, 5);
        payload.push(LITERALS_RAW);
        write_varint(&mut payload, 5);
        payload.extend_from_slice(b"hello");
        write_varint(&mut payload, 0);

        let mut history = Vec::new();
        let mut rep = 1;
        let counts = decode_compressed_block(&payload, &mut history, 1024, &mut rep, None).unwrap();
        assert_eq!(history, b"hello");
        assert_eq!(counts.literals, 5);
    }

    #[test]
    fn test_size_disagreement_is_corrupt() {
        let mut payload = Vec::new();
        write_varint(&mut payload, 6);
        payload.push(LITERALS_RLE);
        write_varint(&mut payload, 5);
        payload.push(b'x');
        write_varint(&mut payload, 0);

        let mut history = Vec::new();
        let mut rep = 1;
        let err = decode_compressed_block(&payload, &mut history, 1024, &mut rep, None).unwrap_err();
        assert!(matches!(err, CodecError::CorruptStream(_)));
    }

    #[test]
    fn test_dictionary_reference_without_tables() {
        let mut payload = Vec::new();
        write_varint(&mut payload, 4);
        payload.push(LITERALS_HUFFMAN);
        write_varint(&mut payload, 4);
        crate::entropy::write_dictionary_reference(&mut payload);

        let mut history = Vec::new();
        let mut rep = 1;
        assert!(decode_compressed_block(&payload, &mut history, 1024, &mut rep, None).is_err());
    }
}
