//! Secp256r1 implementation of the [Scheme] trait, used for short-lived
//! connection keys.
//!
//! Operates over public keys in compressed form (SEC 1, Version 2.0, Section
//! 2.3.3), generates deterministic signatures as specified in
//! [RFC 6979](https://datatracker.ietf.org/doc/html/rfc6979), and enforces
//! signatures are normalized according to
//! [BIP 62](https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki#low-s-values-in-signatures).
//!
//! Secp256r1 (NIST P-256) is the curve TLS stacks negotiate by default, so a
//! connection key generated here can subject a TLS-compatible certificate.

use crate::{Curve, PrivateKey, PublicKey, Scheme, Signature};
use p256::{
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

/// Secp256r1 implementation of the [Scheme] trait.
#[derive(Clone)]
pub struct Secp256r1 {
    signer: SigningKey,
    verifier: VerifyingKey,
}

impl Scheme for Secp256r1 {
    const CURVE: Curve = Curve::Secp256r1;

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
        let signature: p256::ecdsa::Signature = match namespace {
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
        let signature = match p256::ecdsa::Signature::from_slice(&signature) {
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

/// Creates a new Secp256r1 signer with a private key derived from the provided
/// seed.
///
/// # Warning
///
/// This function is insecure and should only be used for examples and testing.
pub fn insecure_signer(seed: u64) -> Secp256r1 {
    let mut rng = StdRng::seed_from_u64(seed);
    Secp256r1::new(&mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_utils::from_hex_formatted;

    const TEST_NAMESPACE: &[u8] = b"test_namespace";

    /// Test keys sourced from (FIPS 186-4)
    /// https://csrc.nist.gov/projects/cryptographic-algorithm-validation-program/digital-signatures.
    #[test]
    fn test_scheme_sign() {
        let private_key: PrivateKey = from_hex_formatted(
            "519b423d715f8b581f4fa8ee59f4771a5b44c8130b4e3eacca54a56dda72b464",
        )
        .unwrap()
        .into();
        let message = from_hex_formatted(
            "5905238877c77421f73e43ee3da6f2d9e2ccad5fc942dcec0cbd25482935faaf416983fe165b1a045e
            e2bcd2e6dca3bdf46c4310a7461f9a37960ca672d3feb5473e253605fb1ddfd28065b53cb5858a8ad28175bf
            9bd386a5e471ea7a65c17cc934a9d791e91491eb3754d03799790fe2d308d16146d5c9b0d0debd97d79ce8",
        )
        .unwrap();
        let mut signer = <Secp256r1 as Scheme>::from(private_key).unwrap();
        let signature = signer.sign(None, &message);
        assert_eq!(SIGNATURE_LENGTH, signature.len());
        assert!(Secp256r1::verify(
            None,
            &message,
            &signer.public_key(),
            &signature
        ));
    }

    #[test]
    fn test_scheme_private_key() {
        let private_key_hex = "519b423d715f8b581f4fa8ee59f4771a5b44c8130b4e3eacca54a56dda72b464";
        let private_key: PrivateKey = from_hex_formatted(private_key_hex).unwrap().into();
        let signer = <Secp256r1 as Scheme>::from(private_key).unwrap();
        let exported_private_key = signer.private_key();
        assert_eq!(
            private_key_hex,
            weft_utils::hex(&exported_private_key).as_str(),
        );
    }

    // Ensure RFC 6979 compliance (should also be tested by the underlying library)
    #[test]
    fn test_rfc6979() {
        let private_key: PrivateKey = from_hex_formatted(
            "c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721",
        )
        .unwrap()
        .into();
        let exp_sig = p256::ecdsa::Signature::from_slice(
            &from_hex_formatted(
                "efd48b2aacb6a8fd1140dd9cd45e81d69d2c877b56aaf991c34d0ea84eaf3716
                f7cb1c942d657c41d436c7a1b6e29f65f3e900dbb9aff4064dc4ab2f843acda8",
            )
            .unwrap(),
        )
        .unwrap();
        let mut signer = <Secp256r1 as Scheme>::from(private_key).unwrap();
        let signature = signer.sign(None, b"sample");
        // The vector's `s` is in the upper half of the curve order, so signing
        // emits the normalized form.
        assert_eq!(signature.to_vec(), exp_sig.normalize_s().unwrap().to_vec());
    }

    #[test]
    fn test_wrong_namespace() {
        let mut signer = insecure_signer(0);
        let signature = signer.sign(Some(TEST_NAMESPACE), b"payload");
        assert!(!Secp256r1::verify(
            Some(&b"other_namespace"[..]),
            b"payload",
            &signer.public_key(),
            &signature
        ));
    }

    #[test]
    fn test_cross_curve_rejected() {
        // A secp256k1 signature must never verify under a secp256r1 key (and
        // vice versa), even for identical payloads.
        let mut identity = crate::secp256k1::insecure_signer(0);
        let signature = identity.sign(Some(TEST_NAMESPACE), b"payload");
        let mut connection = insecure_signer(0);
        assert!(!Secp256r1::verify(
            Some(TEST_NAMESPACE),
            b"payload",
            &connection.public_key(),
            &signature
        ));
        let signature = connection.sign(Some(TEST_NAMESPACE), b"payload");
        assert!(!crate::secp256k1::Secp256k1::verify(
            Some(TEST_NAMESPACE),
            b"payload",
            &identity.public_key(),
            &signature
        ));
    }

    #[test]
    fn test_validate() {
        let signer = insecure_signer(3);
        assert!(Secp256r1::validate(&signer.public_key()));
        assert!(!Secp256r1::validate(&vec![0u8; PUBLIC_KEY_LENGTH].into()));
    }
}
