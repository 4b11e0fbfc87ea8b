//! Implementation of the in-memory datagram network.

use super::Error;
use crate::Datagram;
use bytes::Bytes;
use futures::{channel::mpsc, StreamExt};
use std::{
    collections::HashMap,
    fmt::Debug,
    hash::Hash,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

type Mailbox<A> = mpsc::UnboundedSender<Datagram<A>>;

/// An in-memory datagram network.
///
/// Cheap to clone; all clones address the same set of endpoints.
pub struct Network<A> {
    listeners: Arc<Mutex<HashMap<A, Mailbox<A>>>>,
}

impl<A> Clone for Network<A> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<A> Default for Network<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Network<A> {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<A> crate::Transport for Network<A>
where
    A: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    type Address = A;
    type Error = Error;
    type Sink = Sink<A>;
    type Stream = Stream<A>;

    async fn bind(&self, address: A) -> Result<(Sink<A>, Stream<A>), Error> {
        let mut listeners = self.listeners.lock().unwrap();
        if listeners.contains_key(&address) {
            return Err(Error::AddressInUse(format!("{:?}", address)));
        }
        let (sender, receiver) = mpsc::unbounded();
        listeners.insert(address.clone(), sender);
        Ok((
            Sink {
                address,
                listeners: self.listeners.clone(),
                released: Arc::new(AtomicBool::new(false)),
            },
            Stream { receiver },
        ))
    }
}

/// Outbound half of a bound in-memory endpoint.
pub struct Sink<A> {
    address: A,
    listeners: Arc<Mutex<HashMap<A, Mailbox<A>>>>,
    released: Arc<AtomicBool>,
}

impl<A: Clone> Clone for Sink<A> {
    fn clone(&self) -> Self {
        Self {
            address: self.address.clone(),
            listeners: self.listeners.clone(),
            released: self.released.clone(),
        }
    }
}

impl<A> crate::Sink for Sink<A>
where
    A: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    type Address = A;
    type Error = Error;

    async fn send(&self, recipient: A, message: Bytes) -> Result<(), Error> {
        if self.released.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        let mailbox = {
            let listeners = self.listeners.lock().unwrap();
            listeners.get(&recipient).cloned()
        };
        let Some(mailbox) = mailbox else {
            return Err(Error::UnknownRecipient(format!("{:?}", recipient)));
        };
        mailbox
            .unbounded_send((self.address.clone(), message))
            .map_err(|_| Error::UnknownRecipient(format!("{:?}", recipient)))
    }

    fn local_address(&self) -> A {
        self.address.clone()
    }

    async fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        // Dropping the mailbox sender completes the paired stream.
        let mut listeners = self.listeners.lock().unwrap();
        listeners.remove(&self.address);
    }
}

/// Inbound half of a bound in-memory endpoint.
pub struct Stream<A> {
    receiver: mpsc::UnboundedReceiver<Datagram<A>>,
}

impl<A> crate::Stream for Stream<A>
where
    A: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    type Address = A;

    async fn recv(&mut self) -> Option<Datagram<A>> {
        self.receiver.next().await
    }
}
