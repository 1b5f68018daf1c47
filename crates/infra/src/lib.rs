//! Infrastructure layer: catalog storage backends, change notification and the
//! services that tie domain rules to storage.

pub mod notifier;
pub mod services;
pub mod store;

pub use notifier::{CatalogNotifier, ChangeNotifier};
pub use services::{CartService, CatalogService, PRODUCTS_BASE_PATH};
pub use store::{
    CatalogStore, DocumentCatalogStore, FileCatalogStore, IdAllocator, ProductSlice, StoreError,
    StoreResult,
};
