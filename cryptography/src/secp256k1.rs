//! Secp256k1 implementation of the [Scheme] trait, used for long-lived peer
//! identity keys.
//!
//! Operates over public keys in compressed form (SEC 1, Version 2.0, Section
//! 2.3.3), generates deterministic signatures as specified in
//! [RFC 6979](https://datatracker.ietf.org/doc/html/rfc6979), and enforces
//! signatures are normalized according to
//! [BIP 62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki#low-s-values-in-signatures).
//!
//! Secp256k1 is the curve used by widely-deployed blockchain identities; a
//! peer identity generated here can be reused as one.
//!
//! # Example
//! ```rust
//! use weft_cryptography::{Scheme, Secp256k1};
//! use rand::rngs::OsRng;
//!
//! // Generate a new identity
//! let mut signer = Secp256k1::new(&mut OsRng);
//!
//! // Sign a message
//! let namespace = Some(&b"demo"[..]);
//! let msg = b"hello, world!";
//! let signature = signer.sign(namespace, msg);
//!
//! // Verify the signature
//! assert!(Secp256k1::verify(namespace, msg, &signer.public_key(), &signature));
//! ```

use crate::{Curve, PrivateKey, PublicKey, Scheme, Signature};
use k256::{
    ecdsa::{
        signature::{Signer, Verifier},
        SigningKey, VerifyingKey,
    },
    elliptic_curve::scalar::IsHigh,
};
use rand::{rngs::StdRng, CryptoRng, Rng, SeedableRng};
use std::borrow::Cow;
use weft_utils::union_unique;

const PRIVATE_KEY_LENGTH: usize = 32;
const PUBLIC_KEY_LENGTH: usize = 33; // Y-Parity || X
const SIGNATURE_LENGTH: usize = 64; // R || S

/// Secp256k1 implementation of the [Scheme] trait.
#[derive(Clone)]
pub struct Secp256k1 {
    signer: SigningKey,
    verifier: VerifyingKey,
}

impl Scheme for Secp256k1 {
    const CURVE: Curve = Curve::Secp256k1;

    fn new<R: Rng + CryptoRng>(r: &mut R) -> Self {
        let signer = SigningKey::random(r);
        let verifier = signer.verifying_key().to_owned();
        Self { signer, verifier }
    }

    fn from(private_key: PrivateKey) -> Option<Self> {
        let private_key: [u8; PRIVATE_KEY_LENGTH] = match private_key.as_ref().try_into() {
            Ok(key) => key,
            Err(_) => return None,
        };
        let signer = match SigningKey::from_slice(&private_key) {
            Ok(key) => key,
            Err(_) => return None,
        };
        let verifier = signer.verifying_key().to_owned();
        Some(Self { signer, verifier })
    }

    fn private_key(&self) -> PrivateKey {
        self.signer.to_bytes().to_vec().into()
    }

    fn public_key(&self) -> PublicKey {
        self.verifier.to_encoded_point(true).to_bytes().to_vec().into()
    }

    fn sign(&mut self, namespace: Option<&[u8]>, message: &[u8]) -> Signature {
        let signature: k256::ecdsa::Signature = match namespace {
            Some(namespace) => self.signer.sign(&union_unique(namespace, message)),
            None => self.signer.sign(message),
        };
        let signature = match signature.normalize_s() {
            Some(normalized) => normalized,
            None => signature,
        };
        signature.to_vec().into()
    }

    fn validate(public_key: &PublicKey) -> bool {
        let public_key: [u8; PUBLIC_KEY_LENGTH] = match public_key.as_ref().try_into() {
            Ok(key) => key,
            Err(_) => return false,
        };
        VerifyingKey::from_sec1_bytes(&public_key).is_ok()
    }

    fn verify(
        namespace: Option<&[u8]>,
        message: &[u8],
        public_key: &PublicKey,
        signature: &Signature,
    ) -> bool {
        let public_key: [u8; PUBLIC_KEY_LENGTH] = match public_key.as_ref().try_into() {
            Ok(key) => key,
            Err(_) => return false,
        };
        let signature: [u8; SIGNATURE_LENGTH] = match signature.as_ref().try_into() {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        let signature = match k256::ecdsa::Signature::from_slice(&signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        if signature.s().is_high().into() {
            // Reject any signatures with a `s` value in the upper half of the curve order.
            return false;
        }
        let verifier = match VerifyingKey::from_sec1_bytes(&public_key) {
            Ok(key) => key,
            Err(_) => return false,
        };
        let payload = match namespace {
            Some(namespace) => Cow::Owned(union_unique(namespace, message)),
            None => Cow::Borrowed(message),
        };
        verifier.verify(&payload, &signature).is_ok()
    }

    fn len() -> (usize, usize) {
        (PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH)
    }
}

/// Creates a new Secp256k1 signer with a private key derived from the provided
/// seed.
///
/// # Warning
///
/// This function is insecure and should only be used for examples and testing.
pub fn insecure_signer(seed: u64) -> Secp256k1 {
    let mut rng = StdRng::seed_from_u64(seed);
    Secp256k1::new(&mut rng)
}
