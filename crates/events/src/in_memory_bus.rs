//! In-process event bus backed by a tokio broadcast channel.

use core::convert::Infallible;

use tokio::sync::broadcast;

use crate::bus::{EventBus, Subscription};

/// Default number of messages buffered per subscriber before it starts lagging.
pub const DEFAULT_CAPACITY: usize = 256;

/// In-memory pub/sub bus.
///
/// - No IO
/// - Best-effort fan-out
/// - Publishing with no subscribers is not an error
#[derive(Debug, Clone)]
pub struct InMemoryEventBus<M> {
    sender: broadcast::Sender<M>,
}

impl<M: Clone> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }
}

impl<M: Clone> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + Sync + 'static,
{
    type Error = Infallible;

    fn publish(&self, message: M) -> Result<usize, Self::Error> {
        // `send` only fails when nobody is listening.
        Ok(self.sender.send(message).unwrap_or(0))
    }

    fn subscribe(&self) -> Subscription<M> {
        Subscription::new(self.sender.subscribe())
    }
}
