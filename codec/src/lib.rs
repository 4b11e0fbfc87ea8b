//! Serialize structured data.
//!
//! # Overview
//!
//! A binary serialization library designed to efficiently and safely:
//! - Serialize structured data into a binary format
//! - Deserialize untrusted binary input into structured data
//!
//! Every length read from the wire is bounded by a caller-supplied maximum
//! (via [Read::Cfg]), so decoding attacker-controlled input can never allocate
//! more than the caller allows.
//!
//! # Example
//!
//! ```
//! use bytes::{Buf, BufMut};
//! use weft_codec::{DecodeExt, EncodeSize, Encode, Error, Read, ReadExt, Write};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Point {
//!     x: u32,
//!     y: u32,
//! }
//!
//! impl Write for Point {
//!     fn write(&self, buf: &mut impl BufMut) {
//!         self.x.write(buf);
//!         self.y.write(buf);
//!     }
//! }
//!
//! impl EncodeSize for Point {
//!     fn encode_size(&self) -> usize {
//!         self.x.encode_size() + self.y.encode_size()
//!     }
//! }
//!
//! impl Read for Point {
//!     type Cfg = ();
//!
//!     fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
//!         let x = u32::read(buf)?;
//!         let y = u32::read(buf)?;
//!         Ok(Self { x, y })
//!     }
//! }
//!
//! let point = Point { x: 1, y: 2 };
//! let encoded = point.encode();
//! assert_eq!(Point::decode(encoded).unwrap(), point);
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

pub mod error;
pub mod varint;

pub use error::Error;

/// Trait for types that can be written (encoded) to a buffer.
pub trait Write {
    /// Encodes this value by writing to a buffer.
    ///
    /// Implementations may panic if the buffer doesn't have enough capacity.
    fn write(&self, buf: &mut impl BufMut);
}

/// Trait for types that know their encoded length.
pub trait EncodeSize {
    /// The exact number of bytes that [Write::write] will write.
    fn encode_size(&self) -> usize;
}

/// Trait for types with a known, fixed encoded length.
pub trait FixedSize {
    /// The length of the encoded value.
    const SIZE: usize;
}

impl<T: FixedSize> EncodeSize for T {
    fn encode_size(&self) -> usize {
        Self::SIZE
    }
}

/// Trait for types that can be encoded to a buffer.
pub trait Encode: Write + EncodeSize {
    /// Encodes a value to a [Bytes] buffer.
    ///
    /// Panics if the [Write] implementation does not write exactly
    /// [EncodeSize::encode_size] bytes.
    fn encode(&self) -> Bytes {
        let size = self.encode_size();
        let mut buffer = BytesMut::with_capacity(size);
        self.write(&mut buffer);
        assert_eq!(buffer.len(), size, "write() did not write expected bytes");
        buffer.freeze()
    }
}

impl<T: Write + EncodeSize> Encode for T {}

/// Trait for types that can be read/decoded from a buffer.
///
/// The `Cfg` type allows for configuration during the read process: most
/// commonly, limiting the maximum size of allocated buffers when decoding
/// untrusted data. Use `()` for types that require no configuration.
pub trait Read: Sized {
    /// Configuration threaded through the read.
    type Cfg;

    /// Reads a value from the buffer, consuming the necessary bytes.
    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, Error>;
}

/// Extension trait providing an ergonomic read for types with no configuration.
pub trait ReadExt: Read<Cfg = ()> {
    /// Reads a value using the default `()` config.
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        Self::read_cfg(buf, &())
    }
}

impl<T: Read<Cfg = ()>> ReadExt for T {}

/// Trait for types that can be decoded from a buffer, ensuring the entire
/// buffer is consumed.
pub trait Decode: Read {
    /// Decodes a value, failing with [Error::ExtraData] if bytes remain.
    fn decode_cfg(mut buf: impl Buf, cfg: &Self::Cfg) -> Result<Self, Error> {
        let result = Self::read_cfg(&mut buf, cfg)?;
        let remaining = buf.remaining();
        if remaining > 0 {
            return Err(Error::ExtraData(remaining));
        }
        Ok(result)
    }
}

impl<T: Read> Decode for T {}

/// Extension trait providing an ergonomic decode for types with no configuration.
pub trait DecodeExt: Decode<Cfg = ()> {
    /// Decodes a value using the default `()` config.
    fn decode(buf: impl Buf) -> Result<Self, Error> {
        Self::decode_cfg(buf, &())
    }
}

impl<T: Decode<Cfg = ()>> DecodeExt for T {}

// ---------- Primitive implementations ----------

macro_rules! impl_uint {
    ($type:ty, $put:ident, $get:ident) => {
        impl Write for $type {
            fn write(&self, buf: &mut impl BufMut) {
                buf.$put(*self);
            }
        }

        impl FixedSize for $type {
            const SIZE: usize = core::mem::size_of::<$type>();
        }

        impl Read for $type {
            type Cfg = ();

            fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
                if buf.remaining() < Self::SIZE {
                    return Err(Error::EndOfBuffer);
                }
                Ok(buf.$get())
            }
        }
    };
}

impl_uint!(u8, put_u8, get_u8);
impl_uint!(u16, put_u16, get_u16);
impl_uint!(u32, put_u32, get_u32);
impl_uint!(u64, put_u64, get_u64);

impl Write for bool {
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u8(*self as u8);
    }
}

impl FixedSize for bool {
    const SIZE: usize = 1;
}

impl Read for bool {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        match u8::read(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::InvalidBool),
        }
    }
}

impl<const N: usize> Write for [u8; N] {
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(self);
    }
}

impl<const N: usize> FixedSize for [u8; N] {
    const SIZE: usize = N;
}

impl<const N: usize> Read for [u8; N] {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        if buf.remaining() < N {
            return Err(Error::EndOfBuffer);
        }
        let mut array = [0u8; N];
        buf.copy_to_slice(&mut array);
        Ok(array)
    }
}

impl<T: Write> Write for Option<T> {
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Some(value) => {
                true.write(buf);
                value.write(buf);
            }
            None => false.write(buf),
        }
    }
}

impl<T: EncodeSize> EncodeSize for Option<T> {
    fn encode_size(&self) -> usize {
        1 + self.as_ref().map_or(0, |value| value.encode_size())
    }
}

impl<T: Read> Read for Option<T> {
    type Cfg = T::Cfg;

    fn read_cfg(buf: &mut impl Buf, cfg: &Self::Cfg) -> Result<Self, Error> {
        if bool::read(buf)? {
            Ok(Some(T::read_cfg(buf, cfg)?))
        } else {
            Ok(None)
        }
    }
}

impl Write for Bytes {
    fn write(&self, buf: &mut impl BufMut) {
        varint::write(self.len() as u64, buf);
        buf.put_slice(self);
    }
}

impl EncodeSize for Bytes {
    fn encode_size(&self) -> usize {
        varint::size(self.len() as u64) + self.len()
    }
}

impl Read for Bytes {
    /// Maximum number of bytes to read.
    type Cfg = usize;

    fn read_cfg(buf: &mut impl Buf, max: &usize) -> Result<Self, Error> {
        let len = varint::read(buf)?;
        let len = usize::try_from(len).map_err(|_| Error::InvalidVarint)?;
        if len > *max {
            return Err(Error::LengthExceeded(len, *max));
        }
        if buf.remaining() < len {
            return Err(Error::EndOfBuffer);
        }
        Ok(buf.copy_to_bytes(len))
    }
}

impl<T: Write> Write for Vec<T> {
    fn write(&self, buf: &mut impl BufMut) {
        varint::write(self.len() as u64, buf);
        for item in self {
            item.write(buf);
        }
    }
}

impl<T: EncodeSize> EncodeSize for Vec<T> {
    fn encode_size(&self) -> usize {
        varint::size(self.len() as u64)
            + self.iter().map(|item| item.encode_size()).sum::<usize>()
    }
}

impl<T: Read> Read for Vec<T> {
    /// Maximum number of items, plus the per-item configuration.
    type Cfg = (usize, T::Cfg);

    fn read_cfg(buf: &mut impl Buf, (max, cfg): &Self::Cfg) -> Result<Self, Error> {
        let count = varint::read(buf)?;
        let count = usize::try_from(count).map_err(|_| Error::InvalidVarint)?;
        if count > *max {
            return Err(Error::LengthExceeded(count, *max));
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::read_cfg(buf, cfg)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_round_trip() {
        let mut buf = BytesMut::new();
        42u8.write(&mut buf);
        1_234u16.write(&mut buf);
        567_890u32.write(&mut buf);
        u64::MAX.write(&mut buf);
        true.write(&mut buf);
        [1u8, 2, 3].write(&mut buf);

        let mut buf = buf.freeze();
        assert_eq!(u8::read(&mut buf).unwrap(), 42);
        assert_eq!(u16::read(&mut buf).unwrap(), 1_234);
        assert_eq!(u32::read(&mut buf).unwrap(), 567_890);
        assert_eq!(u64::read(&mut buf).unwrap(), u64::MAX);
        assert!(bool::read(&mut buf).unwrap());
        assert_eq!(<[u8; 3]>::read(&mut buf).unwrap(), [1, 2, 3]);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_invalid_bool() {
        let mut buf = &[2u8][..];
        assert!(matches!(bool::read(&mut buf), Err(Error::InvalidBool)));
    }

    #[test]
    fn test_option_round_trip() {
        let some = Some(7u32);
        let none: Option<u32> = None;
        assert_eq!(some.encode_size(), 5);
        assert_eq!(none.encode_size(), 1);
        assert_eq!(Option::<u32>::decode(some.encode()).unwrap(), some);
        assert_eq!(Option::<u32>::decode(none.encode()).unwrap(), none);
    }

    #[test]
    fn test_bytes_bounded() {
        let data = Bytes::from_static(b"hello");
        let encoded = data.encode();
        assert_eq!(
            Bytes::decode_cfg(encoded.clone(), &usize::MAX).unwrap(),
            data
        );
        assert!(matches!(
            Bytes::decode_cfg(encoded, &4),
            Err(Error::LengthExceeded(5, 4))
        ));
    }

    #[test]
    fn test_bytes_truncated() {
        let mut encoded = BytesMut::new();
        varint::write(100, &mut encoded);
        encoded.put_slice(b"short");
        assert!(matches!(
            Bytes::decode_cfg(encoded.freeze(), &usize::MAX),
            Err(Error::EndOfBuffer)
        ));
    }

    #[test]
    fn test_vec_bounded() {
        let items: Vec<u16> = vec![1, 2, 3];
        let encoded = items.encode();
        assert_eq!(
            Vec::<u16>::decode_cfg(encoded.clone(), &(3, ())).unwrap(),
            items
        );
        assert!(matches!(
            Vec::<u16>::decode_cfg(encoded, &(2, ())),
            Err(Error::LengthExceeded(3, 2))
        ));
    }

    #[test]
    fn test_decode_rejects_extra_data() {
        let mut buf = BytesMut::new();
        7u32.write(&mut buf);
        buf.put_u8(0xAA);
        assert!(matches!(
            u32::decode(buf.freeze()),
            Err(Error::ExtraData(1))
        ));
    }
}
