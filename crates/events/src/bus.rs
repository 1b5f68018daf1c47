//! Event publishing/subscription abstraction (mechanics only).
//!
//! This module provides the **event bus pattern** - a pub/sub mechanism for distributing
//! events to every connected consumer (realtime viewers, loggers, tests).
//!
//! ## Delivery
//!
//! - **Best-effort**: a message reaches the subscribers that exist when it is published.
//!   Nobody acknowledges anything.
//! - **No backpressure**: a slow subscriber falls behind and skips the messages it missed
//!   instead of slowing the publisher down.
//! - **No persistence**: the bus distributes, the catalog store is the source of truth.
//!
//! Consumers must therefore tolerate gaps. Catalog notifications always carry the full
//! product snapshot, so the last message a subscriber sees is the current state.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};

/// A subscription to an event stream.
///
/// Each subscription gets a copy of every event published after it was created
/// (broadcast semantics).
///
/// ## Usage Pattern
///
/// ```ignore
/// let mut subscription = bus.subscribe();
/// while let Some(event) = subscription.recv().await {
///     forward(event).await?;
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: broadcast::Receiver<M>,
}

impl<M: Clone> Subscription<M> {
    pub fn new(receiver: broadcast::Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next message.
    ///
    /// Returns `None` once the bus is gone. Messages dropped because this
    /// subscriber lagged behind are skipped.
    pub async fn recv(&mut self) -> Option<M> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "subscriber lagged; skipping to latest");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive. `None` when nothing is pending or the bus is gone.
    pub fn try_recv(&mut self) -> Option<M> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Some(message),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// ```text
/// Mutation → Catalog store (write) → Notifier (load snapshot) → Event bus → Subscribers
/// ```
///
/// Writes are **stored first** and **published** afterwards, so a failed publish never
/// loses data.
///
/// ## Thread Safety
///
/// The trait requires `Send + Sync`; request handlers on any runtime worker can publish
/// concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Publish to every current subscriber. Returns how many received it.
    fn publish(&self, message: M) -> Result<usize, Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<usize, Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
