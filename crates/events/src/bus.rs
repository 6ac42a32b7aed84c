//! Event publishing/subscription abstraction (mechanics only).
//!
//! Events are published only after the unit of work that produced them has
//! committed. Delivery is at-least-once: consumers must tolerate duplicates
//! (the stock journal deduplicates by sequence number).

use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};

/// Receiving end of a bus; every subscription sees every message published
/// after it was created.
///
/// Consumers pull at their own pace:
///
/// ```ignore
/// let feed = bus.subscribe();
/// // ... commands run, envelopes are published ...
/// for envelope in feed.drain() {
///     journal.apply_envelope(&envelope)?;
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Next queued message, if any.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Everything queued so far, in publish order.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Pub/sub transport for committed envelopes.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
