//! An in-memory datagram transport for tests and examples.
//!
//! Delivery is reliable and in-order per sender; there is no link shaping.
//! Binding an address twice fails, sending to an unbound address fails, and
//! releasing an endpoint completes its stream and frees the address for
//! rebinding.

mod network;
pub use network::{Network, Sink, Stream};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("address already in use: {0}")]
    AddressInUse(String),
    #[error("unknown recipient: {0}")]
    UnknownRecipient(String),
    #[error("socket closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Sink as _, Stream as _, Transport as _};
    use bytes::Bytes;

    #[tokio::test]
    async fn test_send_recv() {
        let network = Network::new();
        let (alice, _alice_stream) = network.bind("alice").await.unwrap();
        let (_bob, mut bob_stream) = network.bind("bob").await.unwrap();

        alice
            .send("bob", Bytes::from_static(b"hi"))
            .await
            .unwrap();
        let (origin, bytes) = bob_stream.recv().await.unwrap();
        assert_eq!(origin, "alice");
        assert_eq!(bytes, Bytes::from_static(b"hi"));
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let network = Network::new();
        let (sink, _stream) = network.bind("alice").await.unwrap();
        assert!(matches!(
            network.bind("alice").await,
            Err(Error::AddressInUse(_))
        ));
        assert_eq!(sink.local_address(), "alice");
    }

    #[tokio::test]
    async fn test_unknown_recipient() {
        let network = Network::new();
        let (alice, _stream) = network.bind("alice").await.unwrap();
        assert!(matches!(
            alice.send("nowhere", Bytes::from_static(b"hi")).await,
            Err(Error::UnknownRecipient(_))
        ));
    }

    #[tokio::test]
    async fn test_release() {
        let network = Network::new();
        let (alice, _alice_stream) = network.bind("alice").await.unwrap();
        let (bob, mut bob_stream) = network.bind("bob").await.unwrap();

        // Messages in flight before the release are still delivered...
        alice.send("bob", Bytes::from_static(b"hi")).await.unwrap();
        bob.release().await;
        bob.release().await; // idempotent
        assert!(bob_stream.recv().await.is_some());

        // ...then the stream completes.
        assert!(bob_stream.recv().await.is_none());

        // The released endpoint can neither send nor be reached.
        assert!(matches!(
            bob.send("alice", Bytes::from_static(b"hi")).await,
            Err(Error::Closed)
        ));
        assert!(matches!(
            alice.send("bob", Bytes::from_static(b"hi")).await,
            Err(Error::UnknownRecipient(_))
        ));

        // The address is free for rebinding.
        let (_bob, _stream) = network.bind("bob").await.unwrap();
    }
}
