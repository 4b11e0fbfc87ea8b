//! Peer groups and the channels they produce.
//!
//! A [PeerGroup] exclusively owns one bound transport endpoint. Inbound
//! datagrams are demultiplexed by source address into [Channel]s: the first
//! datagram from an unknown peer establishes a channel and publishes it on
//! the group's inbound-channel stream, in the order peers were first
//! observed. Outbound channels are established with [PeerGroup::dial] and
//! reuse the association if one already exists.
//!
//! Shutdown is idempotent: the first call releases the endpoint and
//! completes every stream; later calls succeed without effect. In-flight
//! sends either complete before the release or fail with [Error::Shutdown].

use crate::{
    config::Config,
    metrics::Metrics,
    replay::{self, ReplayOnce, Subscription},
    Codec, Sink as _, Stream as _, Transport,
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("message too large: {size} > {mtu}")]
    MessageTooLarge { size: usize, mtu: usize },
    #[error("peer group shut down")]
    Shutdown,
    #[error("transport failure: {0}")]
    Transport(String),
}

/// A bidirectional conversation with one remote peer.
///
/// Cheap to clone; all clones refer to the same conversation (and share its
/// single inbound subscription).
pub struct Channel<T: Transport, C: Codec> {
    remote: T::Address,
    codec: C,
    mtu: usize,
    sink: T::Sink,
    shut: Arc<AtomicBool>,
    metrics: Metrics,
    inbound: ReplayOnce<C::Message, Error>,
}

impl<T: Transport, C: Codec> std::fmt::Debug for Channel<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("mtu", &self.mtu)
            .finish_non_exhaustive()
    }
}

impl<T: Transport, C: Codec> Clone for Channel<T, C> {
    fn clone(&self) -> Self {
        Self {
            remote: self.remote.clone(),
            codec: self.codec.clone(),
            mtu: self.mtu,
            sink: self.sink.clone(),
            shut: self.shut.clone(),
            metrics: self.metrics.clone(),
            inbound: self.inbound.clone(),
        }
    }
}

impl<T: Transport, C: Codec> Channel<T, C> {
    /// The address of the remote peer.
    pub fn remote_address(&self) -> &T::Address {
        &self.remote
    }

    /// Encode and send a message to the remote peer.
    ///
    /// Fails fast with [Error::MessageTooLarge] (carrying the measured
    /// encoded size and the configured MTU) when the encoded size strictly
    /// exceeds the MTU; nothing is transmitted in that case. A message of
    /// exactly the MTU is valid. Fails with [Error::Shutdown] once the
    /// owning group has shut down.
    pub async fn send(&self, message: &C::Message) -> Result<(), Error> {
        let bytes = self.codec.encode(message);
        let size = bytes.len();
        if size > self.mtu {
            return Err(Error::MessageTooLarge {
                size,
                mtu: self.mtu,
            });
        }
        if self.shut.load(Ordering::Acquire) {
            return Err(Error::Shutdown);
        }
        match self.sink.send(self.remote.clone(), bytes).await {
            Ok(()) => {
                self.metrics.messages_sent.inc();
                Ok(())
            }
            Err(err) => {
                // The release may have won the race with this send.
                if self.shut.load(Ordering::Acquire) {
                    return Err(Error::Shutdown);
                }
                Err(Error::Transport(err.to_string()))
            }
        }
    }

    /// Subscribe to the channel's inbound messages.
    ///
    /// Messages decoded before the subscription are replayed first, in
    /// arrival order; the stream then continues live and completes when the
    /// channel (or its group) is torn down. May be called at most once per
    /// channel.
    pub fn subscribe(&self) -> Result<Subscription<C::Message, Error>, replay::Error> {
        self.inbound.subscribe()
    }
}

/// A bound local endpoint producing inbound [Channel]s and dialing outbound
/// ones.
pub struct PeerGroup<T: Transport, C: Codec> {
    codec: C,
    mtu: usize,
    sink: T::Sink,
    shut: Arc<AtomicBool>,
    peers: Arc<Mutex<HashMap<T::Address, Channel<T, C>>>>,
    channels: ReplayOnce<Channel<T, C>, Error>,
    metrics: Metrics,
}

impl<T: Transport, C: Codec> Clone for PeerGroup<T, C> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec.clone(),
            mtu: self.mtu,
            sink: self.sink.clone(),
            shut: self.shut.clone(),
            peers: self.peers.clone(),
            channels: self.channels.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<T: Transport, C: Codec> PeerGroup<T, C> {
    /// Bind a local endpoint on `transport` and return the group plus its
    /// [Router].
    ///
    /// The caller must drive [Router::run] (typically on a spawned task) for
    /// inbound channels and messages to flow.
    pub async fn bind(
        transport: &T,
        codec: C,
        address: T::Address,
        cfg: Config,
    ) -> Result<(Self, Router<T, C>), Error> {
        let (sink, stream) = transport
            .bind(address)
            .await
            .map_err(|err| Error::Transport(err.to_string()))?;
        let group = Self {
            codec,
            mtu: cfg.mtu,
            sink,
            shut: Arc::new(AtomicBool::new(false)),
            peers: Arc::new(Mutex::new(HashMap::new())),
            channels: ReplayOnce::new(),
            metrics: Metrics::init(&cfg.registry),
        };
        let router = Router {
            stream,
            group: group.clone(),
        };
        Ok((group, router))
    }

    /// The local address this group is bound to, stable while active.
    pub fn local_address(&self) -> T::Address {
        self.sink.local_address()
    }

    /// Establish (or reuse) an outbound channel to `remote`.
    ///
    /// Over a datagram transport there is no connect round-trip, so
    /// reachability errors surface from [Channel::send] rather than here.
    /// Retry policy belongs to the caller.
    pub async fn dial(&self, remote: T::Address) -> Result<Channel<T, C>, Error> {
        if self.shut.load(Ordering::Acquire) {
            return Err(Error::Shutdown);
        }
        let mut peers = self.peers.lock().unwrap();
        if let Some(channel) = peers.get(&remote) {
            return Ok(channel.clone());
        }
        let channel = self.create_channel(remote.clone());
        peers.insert(remote, channel.clone());
        Ok(channel)
    }

    /// Subscribe to inbound channels, one per distinct peer that contacts
    /// this group, in the order peers were first observed.
    ///
    /// Channels established before the subscription are replayed first. May
    /// be called at most once per group.
    pub fn listen(&self) -> Result<Subscription<Channel<T, C>, Error>, replay::Error> {
        self.channels.subscribe()
    }

    /// Release the bound endpoint and complete every stream.
    ///
    /// Idempotent: the first call performs the release; later calls succeed
    /// without effect. After completion the local address is no longer
    /// bound.
    pub async fn shutdown(&self) -> Result<(), Error> {
        if self.shut.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.sink.release().await;
        {
            let peers = self.peers.lock().unwrap();
            for channel in peers.values() {
                channel.inbound.complete();
            }
        }
        self.channels.complete();
        Ok(())
    }

    fn create_channel(&self, remote: T::Address) -> Channel<T, C> {
        Channel {
            remote,
            codec: self.codec.clone(),
            mtu: self.mtu,
            sink: self.sink.clone(),
            shut: self.shut.clone(),
            metrics: self.metrics.clone(),
            inbound: ReplayOnce::new(),
        }
    }
}

/// Drives a [PeerGroup]'s receive loop.
///
/// Runs until the transport stream completes (on release or transport
/// failure), then completes every stream the group handed out.
pub struct Router<T: Transport, C: Codec> {
    stream: T::Stream,
    group: PeerGroup<T, C>,
}

impl<T: Transport, C: Codec> Router<T, C> {
    pub async fn run(mut self) {
        while let Some((origin, bytes)) = self.stream.recv().await {
            // Inbound datagrams are untrusted: one peer's garbage must not
            // tear down the group.
            let message = match self.group.codec.decode(bytes) {
                Ok(message) => message,
                Err(err) => {
                    self.group.metrics.messages_dropped.inc();
                    debug!(origin = ?origin, ?err, reason = "decode failure", "dropping message");
                    continue;
                }
            };

            // Route to the peer's channel, establishing it on first contact.
            let channel = {
                let mut peers = self.group.peers.lock().unwrap();
                match peers.get(&origin) {
                    Some(channel) => channel.clone(),
                    None => {
                        let channel = self.group.create_channel(origin.clone());
                        peers.insert(origin.clone(), channel.clone());
                        debug!(peer = ?origin, "establishing channel");
                        self.group.metrics.channels_established.inc();
                        self.group.channels.publish(channel.clone());
                        channel
                    }
                }
            };
            channel.inbound.publish(message);
            self.group.metrics.messages_received.inc();
        }

        // The endpoint is gone; terminate every stream (no-ops if shutdown
        // already did).
        {
            let peers = self.group.peers.lock().unwrap();
            for channel in peers.values() {
                channel.inbound.complete();
            }
        }
        self.group.channels.complete();
    }
}
