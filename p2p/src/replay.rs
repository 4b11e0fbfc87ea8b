//! Buffered, at-most-one-subscriber event source.
//!
//! A plain broadcast primitive drops every event emitted before a subscriber
//! attaches and happily delivers to N concurrent subscribers. [ReplayOnce]
//! does neither: events are buffered until the single subscriber attaches,
//! replayed in emission order, and a second subscription attempt fails
//! deterministically.
//!
//! The producer and subscriber may live in different tasks: all state (the
//! buffer, the subscriber registration, the pending waker) is guarded by one
//! mutex, so no interleaving of [ReplayOnce::publish] and
//! [ReplayOnce::subscribe] can lose, duplicate, or reorder an event.

use std::{
    collections::VecDeque,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll, Waker},
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("already subscribed")]
    AlreadySubscribed,
}

/// An event held in the subject's buffer.
enum Event<T, E> {
    Message(T),
    Completed,
    Failed(E),
}

/// State shared between the producer handle and the subscription, guarded by
/// a single mutex (the one mandatory synchronization point).
struct Inner<T, E> {
    buffer: VecDeque<Event<T, E>>,
    subscribed: bool,
    terminated: bool,
    waker: Option<Waker>,
}

/// Producer handle of a buffered single-subscriber event source.
///
/// Cheap to clone; all clones feed the same subscriber.
pub struct ReplayOnce<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
}

impl<T, E> Clone for ReplayOnce<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> Default for ReplayOnce<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> ReplayOnce<T, E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                buffer: VecDeque::new(),
                subscribed: false,
                terminated: false,
                waker: None,
            })),
        }
    }

    /// Emit a message to the eventual (or current) subscriber.
    ///
    /// Ignored once the subject has terminated: termination is final and
    /// late publishes are not an error.
    pub fn publish(&self, message: T) {
        self.push(Event::Message(message));
    }

    /// Terminate the subject successfully. The first terminal event wins;
    /// everything pushed afterwards is ignored.
    pub fn complete(&self) {
        self.push(Event::Completed);
    }

    /// Terminate the subject with an error. The first terminal event wins;
    /// everything pushed afterwards is ignored.
    pub fn fail(&self, error: E) {
        self.push(Event::Failed(error));
    }

    fn push(&self, event: Event<T, E>) {
        let mut inner = self.inner.lock().unwrap();
        if inner.terminated {
            return;
        }
        if matches!(event, Event::Completed | Event::Failed(_)) {
            inner.terminated = true;
        }
        inner.buffer.push_back(event);
        let waker = inner.waker.take();
        drop(inner);
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Attach the one allowed subscriber.
    ///
    /// The returned [Subscription] first replays everything published so far
    /// (in emission order), then yields live events until termination. Every
    /// call after the first fails with [Error::AlreadySubscribed] and leaves
    /// the first subscriber untouched.
    pub fn subscribe(&self) -> Result<Subscription<T, E>, Error> {
        let mut inner = self.inner.lock().unwrap();
        if inner.subscribed {
            return Err(Error::AlreadySubscribed);
        }
        inner.subscribed = true;
        Ok(Subscription {
            inner: self.inner.clone(),
            done: false,
        })
    }
}

/// Consumer half of a [ReplayOnce].
///
/// Yields `Ok(message)` per published message in emission order; a
/// [ReplayOnce::fail] surfaces as one `Err(error)` and then the stream ends;
/// a [ReplayOnce::complete] ends the stream directly.
pub struct Subscription<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
    done: bool,
}

impl<T, E> std::fmt::Debug for Subscription<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<T, E> futures::Stream for Subscription<T, E> {
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        let mut inner = this.inner.lock().unwrap();
        match inner.buffer.pop_front() {
            Some(Event::Message(message)) => Poll::Ready(Some(Ok(message))),
            Some(Event::Completed) => {
                drop(inner);
                this.done = true;
                Poll::Ready(None)
            }
            Some(Event::Failed(error)) => {
                drop(inner);
                this.done = true;
                Poll::Ready(Some(Err(error)))
            }
            None => {
                inner.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
