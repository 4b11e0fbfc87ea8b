//! Generate keys, sign arbitrary messages, and bind session keys to peer
//! identities.
//!
//! Two ECDSA schemes are provided, one per role:
//!
//! - [Secp256k1]: long-lived peer identity keys (the curve used by
//!   widely-deployed blockchain identities, so a peer identity can double as
//!   one).
//! - [Secp256r1]: short-lived connection keys (the curve TLS stacks
//!   negotiate by default).
//!
//! The [certificate] module binds a connection key to an identity key with a
//! signed certificate extension, enabling peer authentication without a
//! certificate authority.

use bytes::{Buf, BufMut, Bytes};
use rand::{CryptoRng, Rng};
use weft_codec::{Error as CodecError, FixedSize, Read, ReadExt, Write};

pub mod certificate;
pub mod secp256k1;
pub mod secp256r1;

pub use secp256k1::Secp256k1;
pub use secp256r1::Secp256r1;

/// Byte encoding of a private key (a big-endian curve scalar).
pub type PrivateKey = Bytes;

/// Byte encoding of a public key (a SEC1 compressed curve point).
pub type PublicKey = Bytes;

/// Byte encoding of a signature (`R || S`, fixed width).
pub type Signature = Bytes;

/// Curves supported for key generation.
///
/// Connection keys may use any of these; identity keys are fixed to
/// [Curve::Secp256k1].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Curve {
    Secp256k1,
    Secp256r1,
}

/// Prefix byte for [Curve::Secp256k1].
const CURVE_SECP256K1_PREFIX: u8 = 0;
/// Prefix byte for [Curve::Secp256r1].
const CURVE_SECP256R1_PREFIX: u8 = 1;

impl Write for Curve {
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Self::Secp256k1 => CURVE_SECP256K1_PREFIX.write(buf),
            Self::Secp256r1 => CURVE_SECP256R1_PREFIX.write(buf),
        }
    }
}

impl FixedSize for Curve {
    const SIZE: usize = 1;
}

impl Read for Curve {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        match u8::read(buf)? {
            CURVE_SECP256K1_PREFIX => Ok(Self::Secp256k1),
            CURVE_SECP256R1_PREFIX => Ok(Self::Secp256r1),
            _ => Err(CodecError::Invalid("Curve", "unknown curve")),
        }
    }
}

/// Interface that signers must implement.
///
/// Signing and verification share no mutable state beyond the immutable curve
/// parameters: [Scheme::verify] is an associated function usable without a
/// signer in hand.
pub trait Scheme: Send + Sync + Clone + 'static {
    /// The curve this scheme operates over.
    const CURVE: Curve;

    /// Generate a new key pair using the provided source of randomness.
    fn new<R: Rng + CryptoRng>(rng: &mut R) -> Self;

    /// Reconstruct a signer from a raw private key.
    ///
    /// Returns `None` (never panics) if the bytes are not a valid scalar for
    /// the scheme's curve.
    fn from(private_key: PrivateKey) -> Option<Self>;

    /// Returns the raw private key.
    fn private_key(&self) -> PrivateKey;

    /// Returns the public key in SEC1 compressed form.
    fn public_key(&self) -> PublicKey;

    /// Sign a message with the given namespace.
    ///
    /// The namespace prevents cross-domain attacks: a signature produced for
    /// one context can never verify in another. The message should not be
    /// hashed prior to calling this function.
    fn sign(&mut self, namespace: Option<&[u8]>, message: &[u8]) -> Signature;

    /// Check that a public key is a valid point on the scheme's curve.
    fn validate(public_key: &PublicKey) -> bool;

    /// Verify a signature. Returns `false` (never panics) on malformed keys,
    /// malformed signatures, or mismatched curves.
    fn verify(
        namespace: Option<&[u8]>,
        message: &[u8],
        public_key: &PublicKey,
        signature: &Signature,
    ) -> bool;

    /// Returns the encoded lengths of `(PublicKey, Signature)`.
    fn len() -> (usize, usize);
}
