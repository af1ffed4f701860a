//! Length and offset code buckets
//!
//! Literal lengths, match lengths and offsets are entropy coded as a small
//! code plus raw extra bits. Values below 16 are their own code. Above that
//! each power of two `2^n` is split in two halves, each with its own code and
//! `n - 1` extra bits:
//!
//! ```text
//! value      code  extra bits
//! 0..=15     0..=15  0
//! 16..=23    16      3
//! 24..=31    17      3
//! 32..=47    18      4
//! 48..=63    19      4
//! ...
//! ```

use crate::{CodecError, Result};

/// Number of codes needed to cover every `u32` value
pub const VALUE_CODE_COUNT: usize = 72;

/// Values that are their own code
const DIRECT_CODES: u32 = 16;

/// Map a value to `(code, extra_bit_count, extra_bits)`
#[inline]
pub fn value_to_code(value: u32) -> (u16, u32, u32) {
    if value < DIRECT_CODES {
        return (value as u16, 0, 0);
    }
    let n = 31 - value.leading_zeros();
    let half = (value >> (n - 1)) & 1;
    let code = DIRECT_CODES + 2 * (n - 4) + half;
    let extra_bits = n - 1;
    (code as u16, extra_bits, value & ((1 << extra_bits) - 1))
}

/// Base value and extra bit count of a code
#[inline]
pub fn code_base(code: u16) -> Result<(u32, u32)> {
    let code = code as u32;
    if code < DIRECT_CODES {
        return Ok((code, 0));
    }
    if code as usize >= VALUE_CODE_COUNT {
        return Err(CodecError::corrupt(format!("value code {code} out of range")));
    }
    let k = code - DIRECT_CODES;
    let n = k / 2 + 4;
    let half = k % 2;
    Ok(((2 + half) << (n - 1), n - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_boundaries() {
        assert_eq!(value_to_code(0), (0, 0, 0));
        assert_eq!(value_to_code(15), (15, 0, 0));
        assert_eq!(value_to_code(16), (16, 3, 0));
        assert_eq!(value_to_code(23), (16, 3, 7));
        assert_eq!(value_to_code(24), (17, 3, 0));
        assert_eq!(value_to_code(32), (18, 4, 0));
        assert_eq!(value_to_code(u32::MAX).0, 71);
    }

    #[test]
    fn test_code_base_inverts() {
        for value in (0..5000u32).chain([1 << 17, (1 << 27) + 12345, u32::MAX]) {
            let (code, bits, extra) = value_to_code(value);
            let (base, base_bits) = code_base(code).unwrap();
            assert_eq!(bits, base_bits);
            assert_eq!(base + extra, value);
        }
    }

    #[test]
    fn test_invalid_code() {
        assert!(code_base(VALUE_CODE_COUNT as u16).is_err());
    }
}
