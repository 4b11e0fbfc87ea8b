//! Self-signed peer certificates that bind a short-lived connection key to a
//! long-lived peer identity, without a certificate authority.
//!
//! A [Certificate] carries two independent signatures with two independent
//! purposes:
//!
//! - The **identity binding**: a signature computed with the identity private
//!   key ([crate::Secp256k1]) over the connection public key, embedded in a
//!   certificate extension together with the identity public key. Verifying it
//!   proves the holder of the identity key vouched for this connection key.
//! - The **outer signature**: the certificate is self-signed with the
//!   connection private key over the to-be-signed (TBS) encoding, proving the
//!   presenter holds the connection private key.
//!
//! The two signatures use distinct namespaces so neither can be replayed as
//! the other.
//!
//! The certificate is X.509-shaped (subject public key, validity window,
//! extension list of object identifier + criticality flag + opaque value,
//! outer signature) and serialized with [weft_codec] in that field order, the
//! same wire discipline as every other artifact that crosses a peer
//! connection.
//!
//! # Example
//! ```rust
//! use weft_cryptography::{certificate, Scheme, Secp256k1, Secp256r1};
//! use rand::rngs::OsRng;
//!
//! // A long-lived identity and a fresh per-session connection key
//! let mut identity = Secp256k1::new(&mut OsRng);
//! let connection = Secp256r1::new(&mut OsRng);
//!
//! // Bind them for the next hour
//! let cert = certificate::Builder::new(connection, 0, 3_600_000)
//!     .bind(&mut identity)
//!     .build()
//!     .unwrap();
//!
//! // The remote peer verifies the claimed identity
//! assert!(cert.verify_binding(&identity.public_key()));
//! ```

use crate::{secp256k1::Secp256k1, Curve, PublicKey, Scheme, Signature};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;
use weft_codec::{
    DecodeExt, Encode, EncodeSize, Error as CodecError, Read, ReadExt, Write,
};

/// Object identifier of the identity-binding extension (a private enterprise
/// arc), encoded as its dotted-decimal string.
pub const BINDING_OID: &[u8] = b"1.3.6.1.4.1.60871.1.1";

/// Namespace for the certificate's outer self-signature.
const CERTIFICATE_NAMESPACE: &[u8] = b"weft::certificate::self";

/// Namespace for the identity-binding signature.
const BINDING_NAMESPACE: &[u8] = b"weft::certificate::binding";

/// Maximum encoded length of an extension object identifier.
const MAX_OID_LEN: usize = 64;
/// Maximum encoded length of an extension value.
const MAX_EXTENSION_LEN: usize = 4_096;
/// Maximum number of extensions in a certificate.
const MAX_EXTENSIONS: usize = 32;
/// Maximum encoded length of a public key (SEC1 uncompressed upper bound).
const MAX_KEY_LEN: usize = 65;
/// Maximum encoded length of a signature.
const MAX_SIGNATURE_LEN: usize = 96;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("no identity binding extension attached")]
    MissingBinding,
    #[error("certificate not valid until {0}")]
    NotYetValid(u64),
    #[error("certificate expired at {0}")]
    Expired(u64),
    #[error("invalid self-signature")]
    InvalidSelfSignature,
    #[error("invalid identity binding")]
    InvalidBinding,
    #[error("validity window is empty")]
    EmptyValidity,
}

/// A certificate extension: an object identifier, a criticality flag, and an
/// opaque value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extension {
    pub oid: Bytes,
    pub critical: bool,
    pub value: Bytes,
}

impl Write for Extension {
    fn write(&self, buf: &mut impl BufMut) {
        self.oid.write(buf);
        self.critical.write(buf);
        self.value.write(buf);
    }
}

impl EncodeSize for Extension {
    fn encode_size(&self) -> usize {
        self.oid.encode_size() + self.critical.encode_size() + self.value.encode_size()
    }
}

impl Read for Extension {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let oid = Bytes::read_cfg(buf, &MAX_OID_LEN)?;
        let critical = bool::read(buf)?;
        let value = Bytes::read_cfg(buf, &MAX_EXTENSION_LEN)?;
        Ok(Self {
            oid,
            critical,
            value,
        })
    }
}

/// Value of the identity-binding extension: the identity public key and its
/// signature over the certificate's subject (connection) public key.
#[derive(Clone, Debug, PartialEq, Eq)]
struct IdentityBinding {
    identity: PublicKey,
    signature: Signature,
}

impl Write for IdentityBinding {
    fn write(&self, buf: &mut impl BufMut) {
        self.identity.write(buf);
        self.signature.write(buf);
    }
}

impl EncodeSize for IdentityBinding {
    fn encode_size(&self) -> usize {
        self.identity.encode_size() + self.signature.encode_size()
    }
}

impl Read for IdentityBinding {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let identity = Bytes::read_cfg(buf, &MAX_KEY_LEN)?;
        let signature = Bytes::read_cfg(buf, &MAX_SIGNATURE_LEN)?;
        Ok(Self {
            identity,
            signature,
        })
    }
}

/// A self-signed peer certificate.
///
/// Construct with [Builder]; parse untrusted bytes with
/// [weft_codec::DecodeExt::decode] and then check [Certificate::authenticate].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
    curve: Curve,
    subject_public_key: PublicKey,
    not_before: u64,
    not_after: u64,
    extensions: Vec<Extension>,
    signature: Signature,
}

impl Certificate {
    /// The curve of the subject (connection) public key.
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// The subject (connection) public key.
    pub fn subject_public_key(&self) -> &PublicKey {
        &self.subject_public_key
    }

    /// Start of the validity window (epoch milliseconds, inclusive).
    pub fn not_before(&self) -> u64 {
        self.not_before
    }

    /// End of the validity window (epoch milliseconds, exclusive).
    pub fn not_after(&self) -> u64 {
        self.not_after
    }

    /// The embedded extensions, in the order they were attached.
    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// Encodes the to-be-signed portion (everything but the outer signature).
    fn tbs(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.curve.write(&mut buf);
        self.subject_public_key.write(&mut buf);
        self.not_before.write(&mut buf);
        self.not_after.write(&mut buf);
        self.extensions.write(&mut buf);
        buf.freeze()
    }

    /// Whether `now` (epoch milliseconds) falls within the validity window
    /// `[not_before, not_after)`.
    pub fn valid_at(&self, now: u64) -> bool {
        self.not_before <= now && now < self.not_after
    }

    /// Verifies the outer self-signature under the subject public key.
    pub fn verify_self_signed(&self) -> bool {
        let tbs = self.tbs();
        match self.curve {
            Curve::Secp256k1 => Secp256k1::verify(
                Some(CERTIFICATE_NAMESPACE),
                &tbs,
                &self.subject_public_key,
                &self.signature,
            ),
            Curve::Secp256r1 => crate::Secp256r1::verify(
                Some(CERTIFICATE_NAMESPACE),
                &tbs,
                &self.subject_public_key,
                &self.signature,
            ),
        }
    }

    /// Verifies the identity-binding extension under a claimed identity public
    /// key.
    ///
    /// Returns `true` iff the certificate embeds a binding extension whose
    /// identity equals `identity` and whose signature validates over the
    /// subject public key. Returns `false` (never an error) on a missing
    /// extension, a malformed value, a mismatched curve, or a signature
    /// failure: verification failures are data, not faults.
    pub fn verify_binding(&self, identity: &PublicKey) -> bool {
        let Some(extension) = self.extensions.iter().find(|e| e.oid == BINDING_OID) else {
            return false;
        };
        let Ok(binding) = IdentityBinding::decode(extension.value.clone()) else {
            return false;
        };
        if binding.identity != *identity {
            return false;
        }
        Secp256k1::verify(
            Some(BINDING_NAMESPACE),
            &self.subject_public_key,
            identity,
            &binding.signature,
        )
    }

    /// Runs the full session-establishment check: validity window, outer
    /// self-signature, and identity binding under the claimed identity.
    pub fn authenticate(&self, identity: &PublicKey, now: u64) -> Result<(), Error> {
        if now < self.not_before {
            return Err(Error::NotYetValid(self.not_before));
        }
        if now >= self.not_after {
            return Err(Error::Expired(self.not_after));
        }
        if !self.verify_self_signed() {
            return Err(Error::InvalidSelfSignature);
        }
        if !self.verify_binding(identity) {
            return Err(Error::InvalidBinding);
        }
        Ok(())
    }
}

impl Write for Certificate {
    fn write(&self, buf: &mut impl BufMut) {
        self.curve.write(buf);
        self.subject_public_key.write(buf);
        self.not_before.write(buf);
        self.not_after.write(buf);
        self.extensions.write(buf);
        self.signature.write(buf);
    }
}

impl EncodeSize for Certificate {
    fn encode_size(&self) -> usize {
        self.curve.encode_size()
            + self.subject_public_key.encode_size()
            + self.not_before.encode_size()
            + self.not_after.encode_size()
            + self.extensions.encode_size()
            + self.signature.encode_size()
    }
}

impl Read for Certificate {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let curve = Curve::read(buf)?;
        let subject_public_key = Bytes::read_cfg(buf, &MAX_KEY_LEN)?;
        let not_before = u64::read(buf)?;
        let not_after = u64::read(buf)?;
        let extensions = Vec::<Extension>::read_cfg(buf, &(MAX_EXTENSIONS, ()))?;
        let signature = Bytes::read_cfg(buf, &MAX_SIGNATURE_LEN)?;
        Ok(Self {
            curve,
            subject_public_key,
            not_before,
            not_after,
            extensions,
            signature,
        })
    }
}

/// Builds a [Certificate] for a connection key pair.
///
/// Extensions are embedded in the order they are attached. [Builder::build]
/// refuses to produce a certificate without an identity binding: an unbound
/// connection key proves nothing about who is connecting.
pub struct Builder<C: Scheme> {
    connection: C,
    not_before: u64,
    not_after: u64,
    extensions: Vec<Extension>,
    bound: bool,
}

impl<C: Scheme> Builder<C> {
    /// Starts a certificate for `connection`, valid over
    /// `[not_before, not_after)` epoch milliseconds.
    pub fn new(connection: C, not_before: u64, not_after: u64) -> Self {
        Self {
            connection,
            not_before,
            not_after,
            extensions: Vec::new(),
            bound: false,
        }
    }

    /// Attaches an opaque extension.
    pub fn extension(mut self, oid: Bytes, critical: bool, value: Bytes) -> Self {
        self.extensions.push(Extension {
            oid,
            critical,
            value,
        });
        self
    }

    /// Attaches the identity-binding extension: a signature with the identity
    /// private key over the connection public key, alongside the identity
    /// public key.
    pub fn bind(mut self, identity: &mut Secp256k1) -> Self {
        let subject = self.connection.public_key();
        let signature = identity.sign(Some(BINDING_NAMESPACE), &subject);
        let binding = IdentityBinding {
            identity: identity.public_key(),
            signature,
        };
        self.extensions.push(Extension {
            oid: Bytes::from_static(BINDING_OID),
            critical: true,
            value: binding.encode(),
        });
        self.bound = true;
        self
    }

    /// Self-signs and returns the certificate.
    pub fn build(mut self) -> Result<Certificate, Error> {
        if !self.bound {
            return Err(Error::MissingBinding);
        }
        if self.not_before >= self.not_after {
            return Err(Error::EmptyValidity);
        }
        let mut certificate = Certificate {
            curve: C::CURVE,
            subject_public_key: self.connection.public_key(),
            not_before: self.not_before,
            not_after: self.not_after,
            extensions: self.extensions,
            signature: Bytes::new(),
        };
        let tbs = certificate.tbs();
        certificate.signature = self.connection.sign(Some(CERTIFICATE_NAMESPACE), &tbs);
        Ok(certificate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{secp256k1, secp256r1, Secp256r1};

    fn test_certificate() -> (Certificate, Secp256k1, Secp256r1) {
        let mut identity = secp256k1::insecure_signer(0);
        let connection = secp256r1::insecure_signer(1);
        let certificate = Builder::new(connection.clone(), 1_000, 2_000)
            .bind(&mut identity)
            .build()
            .unwrap();
        (certificate, identity, connection)
    }

    #[test]
    fn test_build_and_verify() {
        let (certificate, identity, connection) = test_certificate();
        assert_eq!(certificate.curve(), Curve::Secp256r1);
        assert_eq!(*certificate.subject_public_key(), connection.public_key());
        assert!(certificate.verify_self_signed());
        assert!(certificate.verify_binding(&identity.public_key()));
        assert_eq!(certificate.authenticate(&identity.public_key(), 1_500), Ok(()));
    }

    #[test]
    fn test_codec_round_trip() {
        let (certificate, identity, _) = test_certificate();
        let decoded = Certificate::decode(certificate.encode()).unwrap();
        assert_eq!(decoded, certificate);
        assert!(decoded.verify_self_signed());
        assert!(decoded.verify_binding(&identity.public_key()));
    }

    #[test]
    fn test_secp256k1_connection_key() {
        // The connection key may also live on the identity curve.
        let mut identity = secp256k1::insecure_signer(0);
        let connection = secp256k1::insecure_signer(1);
        let certificate = Builder::new(connection, 0, 1)
            .bind(&mut identity)
            .build()
            .unwrap();
        assert_eq!(certificate.curve(), Curve::Secp256k1);
        assert!(certificate.verify_self_signed());
        assert!(certificate.verify_binding(&identity.public_key()));
    }

    #[test]
    fn test_missing_binding() {
        let connection = secp256r1::insecure_signer(1);
        let result = Builder::new(connection, 0, 1).build();
        assert_eq!(result.unwrap_err(), Error::MissingBinding);
    }

    #[test]
    fn test_empty_validity() {
        let mut identity = secp256k1::insecure_signer(0);
        let connection = secp256r1::insecure_signer(1);
        let result = Builder::new(connection, 5, 5).bind(&mut identity).build();
        assert_eq!(result.unwrap_err(), Error::EmptyValidity);
    }

    #[test]
    fn test_substituted_identity() {
        let (certificate, _, _) = test_certificate();
        let unrelated = secp256k1::insecure_signer(99);
        assert!(!certificate.verify_binding(&unrelated.public_key()));
        assert_eq!(
            certificate.authenticate(&unrelated.public_key(), 1_500),
            Err(Error::InvalidBinding)
        );
    }

    #[test]
    fn test_substituted_connection_key() {
        // Re-signing the TBS with a different connection key must not revive
        // the original identity binding.
        let (certificate, identity, _) = test_certificate();
        let mut thief = secp256r1::insecure_signer(99);
        let mut stolen = certificate.clone();
        stolen.subject_public_key = thief.public_key();
        stolen.signature = thief.sign(Some(CERTIFICATE_NAMESPACE), &stolen.tbs());
        assert!(stolen.verify_self_signed());
        assert!(!stolen.verify_binding(&identity.public_key()));
    }

    #[test]
    fn test_corrupted_certificate() {
        let (certificate, identity, _) = test_certificate();
        let encoded = certificate.encode();
        for i in 0..encoded.len() {
            let mut corrupted = encoded.to_vec();
            corrupted[i] ^= 0xFF;
            // Corruption either fails to decode or fails to verify; it never
            // authenticates and never panics.
            if let Ok(decoded) = Certificate::decode(Bytes::from(corrupted)) {
                assert!(decoded
                    .authenticate(&identity.public_key(), 1_500)
                    .is_err());
            }
        }
    }

    #[test]
    fn test_validity_window_half_open() {
        let (certificate, identity, _) = test_certificate();
        assert!(!certificate.valid_at(999));
        assert!(certificate.valid_at(1_000)); // inclusive start
        assert!(certificate.valid_at(1_999));
        assert!(!certificate.valid_at(2_000)); // exclusive end

        assert_eq!(
            certificate.authenticate(&identity.public_key(), 999),
            Err(Error::NotYetValid(1_000))
        );
        assert_eq!(certificate.authenticate(&identity.public_key(), 1_000), Ok(()));
        assert_eq!(
            certificate.authenticate(&identity.public_key(), 2_000),
            Err(Error::Expired(2_000))
        );
    }

    #[test]
    fn test_validity_from_wall_clock() {
        use std::time::SystemTime;
        use weft_utils::SystemTimeExt;

        let mut identity = secp256k1::insecure_signer(0);
        let connection = secp256r1::insecure_signer(1);
        let issued = SystemTime::now().epoch_millis();
        let certificate = Builder::new(connection, issued, issued + 60_000)
            .bind(&mut identity)
            .build()
            .unwrap();
        assert!(certificate.valid_at(SystemTime::now().epoch_millis()));
    }

    #[test]
    fn test_extension_order_preserved() {
        let mut identity = secp256k1::insecure_signer(0);
        let connection = secp256r1::insecure_signer(1);
        let certificate = Builder::new(connection, 0, 1)
            .extension(Bytes::from_static(b"1.2.3"), false, Bytes::from_static(b"a"))
            .bind(&mut identity)
            .extension(Bytes::from_static(b"1.2.4"), true, Bytes::from_static(b"b"))
            .build()
            .unwrap();

        let decoded = Certificate::decode(certificate.encode()).unwrap();
        let oids: Vec<&[u8]> = decoded.extensions().iter().map(|e| e.oid.as_ref()).collect();
        assert_eq!(oids, vec![&b"1.2.3"[..], BINDING_OID, &b"1.2.4"[..]]);
        assert!(decoded.verify_binding(&identity.public_key()));
    }

    #[test]
    fn test_binding_not_replayable_as_self_signature() {
        // The namespaces differ, so the identity signature embedded in the
        // extension can never double as an outer signature (and vice versa).
        let mut identity = secp256k1::insecure_signer(0);
        let connection = secp256k1::insecure_signer(1);
        let certificate = Builder::new(connection.clone(), 0, 1)
            .bind(&mut identity)
            .build()
            .unwrap();
        let extension = certificate
            .extensions()
            .iter()
            .find(|e| e.oid == BINDING_OID)
            .unwrap();
        let binding = IdentityBinding::decode(extension.value.clone()).unwrap();
        assert!(!Secp256k1::verify(
            Some(CERTIFICATE_NAMESPACE),
            &certificate.subject_public_key,
            &identity.public_key(),
            &binding.signature,
        ));
    }
}
