//! Variable-length integer encoding and decoding.
//!
//! Implements Protocol Buffers variable-length integer encoding: 7 data bits
//! per byte plus a continuation bit. Used for all length prefixes so that
//! short values (the common case) cost a single byte.

use crate::Error;
use bytes::{Buf, BufMut};

const DATA_BITS_PER_BYTE: usize = 7;
const DATA_BITS_MASK: u8 = 0x7F;
const CONTINUATION_BIT_MASK: u8 = 0x80;

/// Maximum number of bytes in a varint-encoded `u64`.
const MAX_VARINT_LEN: usize = 10;

/// Writes a `u64` to the buffer as a varint.
pub fn write(mut value: u64, buf: &mut impl BufMut) {
    loop {
        let byte = (value & DATA_BITS_MASK as u64) as u8;
        value >>= DATA_BITS_PER_BYTE;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | CONTINUATION_BIT_MASK);
    }
}

/// Reads a varint-encoded `u64` from the buffer.
///
/// Rejects encodings longer than [MAX_VARINT_LEN] bytes and encodings whose
/// final byte overflows 64 bits, so every value has exactly one accepted
/// encoding length.
pub fn read(buf: &mut impl Buf) -> Result<u64, Error> {
    let mut value: u64 = 0;
    for i in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err(Error::EndOfBuffer);
        }
        let byte = buf.get_u8();
        let data = (byte & DATA_BITS_MASK) as u64;
        let shift = i * DATA_BITS_PER_BYTE;
        // The tenth byte may only contribute a single bit.
        if shift == 63 && data > 1 {
            return Err(Error::InvalidVarint);
        }
        value |= data << shift;
        if byte & CONTINUATION_BIT_MASK == 0 {
            return Ok(value);
        }
    }
    Err(Error::InvalidVarint)
}

/// Returns the number of bytes `value` occupies when varint-encoded.
pub fn size(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    core::cmp::max(1, bits.div_ceil(DATA_BITS_PER_BYTE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn round_trip(value: u64) {
        let mut buf = BytesMut::new();
        write(value, &mut buf);
        assert_eq!(buf.len(), size(value));
        let mut read_buf = buf.freeze();
        assert_eq!(read(&mut read_buf).unwrap(), value);
        assert_eq!(read_buf.remaining(), 0);
    }

    #[test]
    fn test_round_trip() {
        for value in [
            0,
            1,
            127,
            128,
            16_383,
            16_384,
            u32::MAX as u64,
            u64::MAX - 1,
            u64::MAX,
        ] {
            round_trip(value);
        }
    }

    #[test]
    fn test_read_truncated() {
        // Continuation bit set but no further bytes.
        let mut buf = &[0x80u8][..];
        assert!(matches!(read(&mut buf), Err(Error::EndOfBuffer)));
    }

    #[test]
    fn test_read_overflow() {
        // Eleven continuation bytes can never terminate within bounds.
        let mut buf = &[0xFFu8; 11][..];
        assert!(matches!(read(&mut buf), Err(Error::InvalidVarint)));

        // Tenth byte contributing more than one bit overflows 64 bits.
        let mut buf = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02][..];
        assert!(matches!(read(&mut buf), Err(Error::InvalidVarint)));
    }
}
