//! Bit and byte level readers and writers
//!
//! Bits are packed LSB-first: the first bit written lands in bit 0 of the
//! first output byte. Every read past the end of the underlying buffer is a
//! `CorruptStream` error, never a panic.

use crate::{CodecError, Result};

/// LSB-first bit accumulator
#[derive(Debug, Default)]
pub struct BitWriter {
    out: Vec<u8>,
    acc: u64,
    nbits: u32,
}

impl BitWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with room for `bytes` output bytes
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            out: Vec::with_capacity(bytes),
            acc: 0,
            nbits: 0,
        }
    }

    /// Append the low `n_bits` bits of `value` (`n_bits <= 32`)
    #[inline]
    pub fn write_bits(&mut self, value: u32, n_bits: u32) {
        debug_assert!(n_bits <= 32);
        if n_bits == 0 {
            return;
        }
        let mask = (1u64 << n_bits) - 1;
        self.acc |= (value as u64 & mask) << self.nbits;
        self.nbits += n_bits;

        while self.nbits >= 8 {
            self.out.push(self.acc as u8);
            self.acc >>= 8;
            self.nbits -= 8;
        }
    }

    /// Number of bits written so far
    pub fn bit_len(&self) -> usize {
        self.out.len() * 8 + self.nbits as usize
    }

    /// Flush the partial byte (zero padded) and return the buffer
    pub fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            self.out.push(self.acc as u8);
        }
        self.out
    }
}

/// LSB-first bit reader over a byte slice
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at the first bit of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Look at the next `n_bits` bits (`n_bits <= 32`) without consuming them.
    /// Bits past the end of the buffer read as zero.
    #[inline]
    pub fn peek_bits(&self, n_bits: u32) -> u32 {
        debug_assert!(n_bits <= 32);
        if n_bits == 0 {
            return 0;
        }
        let byte = self.bit_pos / 8;
        let shift = self.bit_pos % 8;

        let mut window = 0u64;
        for i in 0..5 {
            if let Some(&b) = self.data.get(byte + i) {
                window |= (b as u64) << (8 * i);
            }
        }

        ((window >> shift) & ((1u64 << n_bits) - 1)) as u32
    }

    /// Drop `n_bits` bits
    #[inline]
    pub fn consume(&mut self, n_bits: u32) -> Result<()> {
        self.bit_pos += n_bits as usize;
        if self.bit_pos > self.data.len() * 8 {
            return Err(CodecError::corrupt("bitstream ended prematurely"));
        }
        Ok(())
    }

    /// Read and consume `n_bits` bits
    #[inline]
    pub fn read_bits(&mut self, n_bits: u32) -> Result<u32> {
        let value = self.peek_bits(n_bits);
        self.consume(n_bits)?;
        Ok(value)
    }

    /// Bits not yet consumed
    pub fn remaining_bits(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_pos)
    }

    /// True when only the zero padding of the final byte is left
    pub fn is_finished(&self) -> bool {
        self.remaining_bits() < 8
    }
}

/// Checked byte-level cursor
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True when every byte was consumed
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Read `n` bytes
    pub fn read_slice(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(CodecError::corrupt(format!(
                "need {} bytes, only {} left",
                n,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_slice(1)?[0])
    }

    /// Read a little-endian `u32`
    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(self.read_uint_le(4)? as u32)
    }

    /// Read a little-endian unsigned integer of `width` bytes (`width <= 8`)
    pub fn read_uint_le(&mut self, width: usize) -> Result<u64> {
        debug_assert!(width <= 8);
        let bytes = self.read_slice(width)?;
        Ok(bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    /// Read a LEB128 varint
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut value = 0u64;
        for i in 0..10 {
            let byte = self.read_u8()?;
            let bits = (byte & 0x7F) as u64;
            if i == 9 && bits > 1 {
                return Err(CodecError::corrupt("varint overflows 64 bits"));
            }
            value |= bits << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::corrupt("varint longer than 10 bytes"))
    }

    /// Read a varint that must fit `usize` and stay at or below `max`
    pub fn read_length(&mut self, max: usize, what: &str) -> Result<usize> {
        let value = self.read_varint()?;
        if value > max as u64 {
            return Err(CodecError::corrupt(format!(
                "{what} {value} exceeds limit {max}"
            )));
        }
        Ok(value as usize)
    }
}

/// Append a LEB128 varint
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Append the low `width` bytes of `value`, little-endian
pub fn write_uint_le(out: &mut Vec<u8>, value: u64, width: usize) {
    out.extend_from_slice(&value.to_le_bytes()[..width]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_lsb_first() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b1, 1);
        writer.write_bits(0b01, 2);
        writer.write_bits(0b11111, 5);
        writer.write_bits(0xABC, 12);
        assert_eq!(writer.bit_len(), 20);
        let bytes = writer.finish();
        assert_eq!(bytes[0], 0b1111_1011);
        assert_eq!(bytes.len(), 3);

        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(2).unwrap(), 1);
        assert_eq!(reader.read_bits(5).unwrap(), 0b11111);
        assert_eq!(reader.read_bits(12).unwrap(), 0xABC);
        assert!(reader.is_finished());
    }

    #[test]
    fn test_wide_values() {
        let mut writer = BitWriter::new();
        writer.write_bits(3, 3);
        writer.write_bits(0xDEAD_BEEF, 32);
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_bits(3).unwrap(), 3);
        assert_eq!(reader.read_bits(32).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_reader_overrun() {
        let data = [0xFFu8];
        let mut reader = BitReader::new(&data);
        assert!(reader.read_bits(8).is_ok());
        assert_eq!(reader.peek_bits(4), 0);
        assert!(matches!(
            reader.consume(1),
            Err(CodecError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_varint() {
        for value in [0u64, 1, 127, 128, 300, 1 << 35, u64::MAX] {
            let mut out = Vec::new();
            write_varint(&mut out, value);
            let mut cursor = ByteCursor::new(&out);
            assert_eq!(cursor.read_varint().unwrap(), value);
            assert!(cursor.is_empty());
        }

        // Truncated varint
        let mut cursor = ByteCursor::new(&[0x80, 0x80]);
        assert!(cursor.read_varint().is_err());
    }

    #[test]
    fn test_cursor_fixed_width() {
        let mut out = Vec::new();
        write_uint_le(&mut out, 0x0102_0304, 4);
        write_uint_le(&mut out, 0xBEEF, 2);
        let mut cursor = ByteCursor::new(&out);
        assert_eq!(cursor.read_u32_le().unwrap(), 0x0102_0304);
        assert_eq!(cursor.read_uint_le(2).unwrap(), 0xBEEF);
        assert!(cursor.read_u8().is_err());
    }

    #[test]
    fn test_read_length_limit() {
        let mut out = Vec::new();
        write_varint(&mut out, 5000);
        let mut cursor = ByteCursor::new(&out);
        assert!(cursor.read_length(4096, "literal count").is_err());
    }
}
