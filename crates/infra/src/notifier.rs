//! Catalog change fan-out.
//!
//! ```text
//! Mutation → Catalog store (write) → ChangeNotifier (load snapshot) → Event bus → Subscribers
//! ```
//!
//! Notification is best-effort and runs after the write has succeeded, so a
//! failure here never turns a successful mutation into an error response.

use std::sync::Arc;

use tracing::{debug, warn};

use storefront_events::{Event, EventBus, InMemoryEventBus, Subscription};
use storefront_products::CatalogEvent;

use crate::store::{CatalogStore, StoreResult};

/// Publishes full product snapshots to every connected subscriber.
#[derive(Debug, Clone)]
pub struct ChangeNotifier<S, B> {
    store: S,
    bus: B,
}

/// Notifier wiring used by the API: any backend, in-process bus.
pub type CatalogNotifier = ChangeNotifier<Arc<dyn CatalogStore>, Arc<InMemoryEventBus<CatalogEvent>>>;

impl<S, B> ChangeNotifier<S, B>
where
    S: CatalogStore,
    B: EventBus<CatalogEvent>,
{
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    /// Current product collection, in insertion order.
    pub async fn snapshot(&self) -> StoreResult<CatalogEvent> {
        Ok(CatalogEvent::snapshot(self.store.all_products().await?))
    }

    /// Load a fresh snapshot and broadcast it.
    ///
    /// Returns how many subscribers received it. Failures are logged and
    /// reported as zero deliveries.
    pub async fn notify(&self) -> usize {
        let event = match self.snapshot().await {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "failed to load catalog snapshot; skipping notification");
                return 0;
            }
        };

        let products = event.products().len();
        let occurred_at = event.occurred_at();
        match self.bus.publish(event) {
            Ok(delivered) => {
                debug!(products, delivered, %occurred_at, "catalog snapshot published");
                delivered
            }
            Err(err) => {
                warn!(error = ?err, "failed to publish catalog snapshot");
                0
            }
        }
    }

    pub fn subscribe(&self) -> Subscription<CatalogEvent> {
        self.bus.subscribe()
    }
}
