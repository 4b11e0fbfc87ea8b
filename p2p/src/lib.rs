//! Exchange messages with peers over lossless bidirectional channels.
//!
//! # Overview
//!
//! A [PeerGroup] owns one bound transport endpoint and turns raw datagrams
//! into [Channel]s, one per remote peer. Inbound channels (and each channel's
//! inbound messages) are delivered through [replay::ReplayOnce], a buffered
//! single-subscriber event source: nothing that arrives before the
//! application subscribes is ever lost, and a second subscriber is rejected
//! rather than silently racing the first.
//!
//! Socket I/O and message serialization stay behind the [Transport] and
//! [Codec] collaborator traits. The [simulated] module provides an in-memory
//! transport; [mocks] provides test codecs. Peer authentication is layered on
//! top by exchanging `weft-cryptography` certificates during channel
//! establishment and verifying the identity binding before trusting a
//! channel.
//!
//! # Example
//!
//! ```
//! use futures::StreamExt;
//! use prometheus_client::registry::Registry;
//! use std::sync::{Arc, Mutex};
//! use weft_p2p::{mocks::TextCodec, simulated, Config, PeerGroup};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let network = simulated::Network::new();
//!
//! // Bind two peers and drive their routers
//! let cfg = Config::recommended(Arc::new(Mutex::new(Registry::default())));
//! let (alice, router) = PeerGroup::bind(&network, TextCodec, "alice", cfg).await.unwrap();
//! tokio::spawn(router.run());
//! let cfg = Config::recommended(Arc::new(Mutex::new(Registry::default())));
//! let (bob, router) = PeerGroup::bind(&network, TextCodec, "bob", cfg).await.unwrap();
//! tokio::spawn(router.run());
//!
//! // Alice opens a channel to Bob and greets
//! let channel = alice.dial("bob").await.unwrap();
//! channel.send(&"hello".to_string()).await.unwrap();
//!
//! // Bob sees one inbound channel carrying the greeting
//! let mut inbound = bob.listen().unwrap();
//! let channel = inbound.next().await.unwrap().unwrap();
//! let mut messages = channel.subscribe().unwrap();
//! assert_eq!(messages.next().await.unwrap().unwrap(), "hello");
//! # }
//! ```

use bytes::Bytes;
use std::{error::Error as StdError, fmt::Debug, future::Future, hash::Hash, marker::PhantomData};
use weft_codec::{DecodeExt, Encode, Error as CodecError};

pub mod config;
pub mod group;
mod metrics;
pub mod mocks;
pub mod replay;
pub mod simulated;

pub use config::Config;
pub use group::{Channel, Error, PeerGroup, Router};

/// Tuple representing a datagram received from a given address.
pub type Datagram<A> = (A, Bytes);

/// Interface for a datagram transport that can bind local endpoints.
///
/// The core never performs socket I/O itself: it binds through this trait and
/// sequences sends and receives on the returned handles.
pub trait Transport: Clone + Send + Sync + 'static {
    /// Address of an endpoint. Opaque to the core beyond equality and
    /// hashing.
    type Address: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Error that can occur when binding or sending.
    type Error: Debug + StdError + Send + Sync + 'static;

    /// Outbound half of a bound endpoint.
    type Sink: Sink<Address = Self::Address, Error = Self::Error>;

    /// Inbound half of a bound endpoint.
    type Stream: Stream<Address = Self::Address>;

    /// Bind a local endpoint, returning its outbound and inbound halves.
    fn bind(
        &self,
        address: Self::Address,
    ) -> impl Future<Output = Result<(Self::Sink, Self::Stream), Self::Error>> + Send;
}

/// Outbound half of a bound endpoint.
pub trait Sink: Clone + Send + Sync + 'static {
    /// Address of an endpoint.
    type Address: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Error that can occur when sending.
    type Error: Debug + StdError + Send + Sync + 'static;

    /// Send a datagram to a recipient.
    fn send(
        &self,
        recipient: Self::Address,
        message: Bytes,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// The local address this endpoint is bound to.
    fn local_address(&self) -> Self::Address;

    /// Release the bound endpoint. Idempotent; the paired [Stream] completes
    /// and subsequent sends fail.
    fn release(&self) -> impl Future<Output = ()> + Send;
}

/// Inbound half of a bound endpoint.
pub trait Stream: Send + 'static {
    /// Address of an endpoint.
    type Address: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Receive the next datagram, or `None` once the endpoint is released.
    fn recv(&mut self) -> impl Future<Output = Option<Datagram<Self::Address>>> + Send;
}

/// Interface for the message serialization collaborator.
///
/// The core never inspects message content: it consumes encoded lengths (for
/// MTU enforcement) and decoded values (for delivery).
pub trait Codec: Clone + Send + Sync + 'static {
    /// The application message type carried over channels.
    type Message: Clone + Send + Sync + 'static;

    /// Encode a message to bytes.
    fn encode(&self, message: &Self::Message) -> Bytes;

    /// Decode a message from bytes. Fallible: inbound datagrams are
    /// untrusted.
    fn decode(&self, bytes: Bytes) -> Result<Self::Message, CodecError>;
}

/// A [Codec] for any message type with a [weft_codec] encoding.
pub struct WireCodec<M> {
    _marker: PhantomData<M>,
}

impl<M> WireCodec<M> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<M> Default for WireCodec<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for WireCodec<M> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<M> Codec for WireCodec<M>
where
    M: Encode + DecodeExt + Clone + Send + Sync + 'static,
{
    type Message = M;

    fn encode(&self, message: &M) -> Bytes {
        message.encode()
    }

    fn decode(&self, bytes: Bytes) -> Result<M, CodecError> {
        M::decode(bytes)
    }
}
