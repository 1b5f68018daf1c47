//! Service wiring: pick the backend, then share one store, one bus and one
//! notifier between every handler.

use std::sync::Arc;

use tracing::info;

use storefront_events::InMemoryEventBus;
use storefront_infra::{
    CartService, CatalogNotifier, CatalogService, CatalogStore, ChangeNotifier, DocumentCatalogStore,
    FileCatalogStore, StoreError,
};
use storefront_products::CatalogEvent;

use crate::config::{AppConfig, StorageBackend};

#[derive(Clone)]
pub struct AppServices {
    pub catalog: CatalogService,
    pub carts: CartService,
}

impl AppServices {
    /// Wire services around an already opened store.
    pub fn from_store(store: Arc<dyn CatalogStore>) -> Self {
        let bus: Arc<InMemoryEventBus<CatalogEvent>> = Arc::new(InMemoryEventBus::new());
        let notifier = Arc::new(ChangeNotifier::new(Arc::clone(&store), bus));

        Self {
            catalog: CatalogService::new(Arc::clone(&store), notifier),
            carts: CartService::new(store),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.catalog.backend_name()
    }

    pub fn notifier(&self) -> &Arc<CatalogNotifier> {
        self.catalog.notifier()
    }
}

/// Open the configured backend.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    let store: Arc<dyn CatalogStore> = match &config.backend {
        StorageBackend::File { data_dir } => Arc::new(FileCatalogStore::open(data_dir).await?),
        StorageBackend::Document { database_url } => {
            let store = DocumentCatalogStore::connect(database_url).await?;
            store.ensure_schema().await?;
            Arc::new(store)
        }
    };

    info!(backend = %config.backend, "catalog store ready");
    Ok(AppServices::from_store(store))
}
