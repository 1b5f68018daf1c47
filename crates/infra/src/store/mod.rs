//! Catalog storage boundary.
//!
//! Two interchangeable backends persist products and carts:
//!
//! - [`FileCatalogStore`]: one pretty-printed JSON array per collection on local disk.
//! - [`DocumentCatalogStore`]: JSONB documents in PostgreSQL.
//!
//! Both honor the same contract, so the API never knows which one is active.
//! Listing semantics (filter, price sort, skip/limit, total count) are shared
//! with the query engine in `storefront-products`.

pub mod document;
pub mod file;
pub mod id_allocator;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use storefront_carts::{Cart, PopulatedCart};
use storefront_core::{CartId, DomainError, ProductId};
use storefront_products::{PriceSort, Product, ProductDraft, ProductFilter, ProductPatch};

pub use document::DocumentCatalogStore;
pub use file::FileCatalogStore;
pub use id_allocator::IdAllocator;

/// Storage failures.
///
/// `Io`, `Serialization` and `Database` are infrastructure faults. They surface
/// to clients as a generic internal error; the detail only goes to the logs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("product code already exists: {0}")]
    DuplicateCode(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("io error during {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error during {operation}: {source}")]
    Serialization {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub(crate) fn io(operation: &'static str, source: std::io::Error) -> Self {
        Self::Io { operation, source }
    }

    pub(crate) fn serialization(operation: &'static str, source: serde_json::Error) -> Self {
        Self::Serialization { operation, source }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateCode(code) => DomainError::duplicate_code(code),
            StoreError::InvalidId(id) => DomainError::invalid_id(id),
            other => DomainError::internal(other.to_string()),
        }
    }
}

/// One page of a filtered, sorted listing plus the number of matching rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSlice {
    pub products: Vec<Product>,
    pub total: u64,
}

/// Persistence contract shared by every backend.
///
/// Single-record reads and writes are atomic. Lookups by an unknown id return
/// `Ok(None)` (or `Ok(false)` for deletes) rather than an error; an id the
/// backend cannot even parse is [`StoreError::InvalidId`].
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Short backend label used in logs and `/health`.
    fn backend_name(&self) -> &'static str;

    /// Filter, then sort by price (stable; ties keep insertion order), then
    /// skip/limit. `total` counts every row matching the filter.
    async fn list_products(
        &self,
        filter: &ProductFilter,
        sort: PriceSort,
        skip: u64,
        limit: u64,
    ) -> StoreResult<ProductSlice>;

    /// Every product in insertion order.
    async fn all_products(&self) -> StoreResult<Vec<Product>>;

    async fn get_product(&self, id: &ProductId) -> StoreResult<Option<Product>>;

    /// Insert under a fresh id. Fails with `DuplicateCode` when the code is taken.
    async fn create_product(&self, draft: ProductDraft) -> StoreResult<Product>;

    /// Merge `patch` into an existing product. The id is never changed.
    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> StoreResult<Option<Product>>;

    /// Returns whether a product was removed.
    async fn delete_product(&self, id: &ProductId) -> StoreResult<bool>;

    /// Resolve a set of ids. Unknown or unparsable ids are simply absent.
    async fn products_by_ids(&self, ids: &[ProductId]) -> StoreResult<HashMap<ProductId, Product>>;

    async fn create_cart(&self) -> StoreResult<Cart>;

    async fn get_cart(&self, id: &CartId) -> StoreResult<Option<Cart>>;

    /// Overwrite the line items of an existing cart. `None` when the cart is gone.
    async fn save_cart(&self, cart: &Cart) -> StoreResult<Option<Cart>>;

    /// Cart with every line's product resolved. Dangling references resolve to `None`.
    async fn get_populated_cart(&self, id: &CartId) -> StoreResult<Option<PopulatedCart>> {
        let Some(cart) = self.get_cart(id).await? else {
            return Ok(None);
        };
        let products = self.products_by_ids(&cart.product_refs()).await?;
        Ok(Some(cart.populate(&products)))
    }
}

#[async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        sort: PriceSort,
        skip: u64,
        limit: u64,
    ) -> StoreResult<ProductSlice> {
        (**self).list_products(filter, sort, skip, limit).await
    }

    async fn all_products(&self) -> StoreResult<Vec<Product>> {
        (**self).all_products().await
    }

    async fn get_product(&self, id: &ProductId) -> StoreResult<Option<Product>> {
        (**self).get_product(id).await
    }

    async fn create_product(&self, draft: ProductDraft) -> StoreResult<Product> {
        (**self).create_product(draft).await
    }

    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> StoreResult<Option<Product>> {
        (**self).update_product(id, patch).await
    }

    async fn delete_product(&self, id: &ProductId) -> StoreResult<bool> {
        (**self).delete_product(id).await
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> StoreResult<HashMap<ProductId, Product>> {
        (**self).products_by_ids(ids).await
    }

    async fn create_cart(&self) -> StoreResult<Cart> {
        (**self).create_cart().await
    }

    async fn get_cart(&self, id: &CartId) -> StoreResult<Option<Cart>> {
        (**self).get_cart(id).await
    }

    async fn save_cart(&self, cart: &Cart) -> StoreResult<Option<Cart>> {
        (**self).save_cart(cart).await
    }

    async fn get_populated_cart(&self, id: &CartId) -> StoreResult<Option<PopulatedCart>> {
        (**self).get_populated_cart(id).await
    }
}
