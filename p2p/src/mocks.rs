//! Mock implementations of collaborator traits for tests and examples.

use crate::Codec;
use bytes::Bytes;
use weft_codec::Error;

/// A [Codec] carrying UTF-8 strings. Decoding rejects invalid UTF-8, which
/// makes it useful for exercising the untrusted-datagram path.
#[derive(Clone, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    type Message = String;

    fn encode(&self, message: &String) -> Bytes {
        Bytes::copy_from_slice(message.as_bytes())
    }

    fn decode(&self, bytes: Bytes) -> Result<String, Error> {
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::Invalid("TextCodec", "invalid UTF-8"))
    }
}
