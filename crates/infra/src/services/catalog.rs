use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use tracing::{info, instrument};

use storefront_core::{DomainError, DomainResult, ProductId};
use storefront_products::{
    CatalogQuery, CreateProductRequest, Product, ProductPage, ProductPatch, QuickAddProduct,
};

use crate::notifier::CatalogNotifier;
use crate::store::CatalogStore;

/// Product catalog operations.
///
/// Every successful create, update or delete is followed by a snapshot
/// broadcast through the [`CatalogNotifier`].
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    notifier: Arc<CatalogNotifier>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, notifier: Arc<CatalogNotifier>) -> Self {
        Self { store, notifier }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn notifier(&self) -> &Arc<CatalogNotifier> {
        &self.notifier
    }

    /// One page of the catalog plus navigation metadata and links.
    #[instrument(skip(self, query), fields(page = query.page, limit = query.limit), err)]
    pub async fn list_products(&self, query: &CatalogQuery, base_path: &str) -> DomainResult<ProductPage> {
        let slice = self
            .store
            .list_products(&query.filter, query.sort, query.skip(), query.limit)
            .await?;
        Ok(query.to_page(base_path, slice.products, slice.total))
    }

    pub async fn get_product(&self, id: &ProductId) -> DomainResult<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product"))
    }

    #[instrument(skip(self, request), err)]
    pub async fn create_product(&self, request: CreateProductRequest) -> DomainResult<Product> {
        let draft = request.into_draft()?;
        let product = self.store.create_product(draft).await?;
        info!(product_id = %product.id, code = %product.code, "product created");
        self.notifier.notify().await;
        Ok(product)
    }

    /// Realtime `addProduct`: fills in defaults for everything but title and price.
    #[instrument(skip(self, request), err)]
    pub async fn quick_add(&self, request: QuickAddProduct) -> DomainResult<Product> {
        let draft = request.into_draft(Utc::now().timestamp_millis(), &quick_add_nonce())?;
        let product = self.store.create_product(draft).await?;
        info!(product_id = %product.id, code = %product.code, "product quick-added");
        self.notifier.notify().await;
        Ok(product)
    }

    #[instrument(skip(self, patch), fields(product_id = %id), err)]
    pub async fn update_product(&self, id: &ProductId, patch: ProductPatch) -> DomainResult<Product> {
        patch.validate()?;
        let product = self
            .store
            .update_product(id, patch)
            .await?
            .ok_or_else(|| DomainError::not_found("product"))?;
        self.notifier.notify().await;
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete_product(&self, id: &ProductId) -> DomainResult<()> {
        if !self.store.delete_product(id).await? {
            return Err(DomainError::not_found("product"));
        }
        info!(product_id = %id, "product deleted");
        self.notifier.notify().await;
        Ok(())
    }
}

/// Random tail of a fresh UUIDv7 (the leading hex digits only encode the time).
fn quick_add_nonce() -> String {
    let simple = Uuid::now_v7().simple().to_string();
    simple[simple.len() - 12..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::ChangeNotifier;
    use crate::services::PRODUCTS_BASE_PATH;
    use crate::store::FileCatalogStore;
    use serde_json::json;
    use storefront_events::InMemoryEventBus;
    use tempfile::TempDir;

    async fn service() -> (TempDir, CatalogService) {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn CatalogStore> = Arc::new(FileCatalogStore::open(dir.path()).await.unwrap());
        let notifier = Arc::new(ChangeNotifier::new(
            Arc::clone(&store),
            Arc::new(InMemoryEventBus::new()),
        ));
        (dir, CatalogService::new(store, notifier))
    }

    fn request(code: &str, price: f64, category: &str) -> CreateProductRequest {
        serde_json::from_value(json!({
            "title": format!("Item {code}"),
            "description": "desc",
            "code": code,
            "price": price,
            "stock": 5,
            "category": category
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn create_broadcasts_snapshot() {
        let (_dir, svc) = service().await;
        let mut sub = svc.notifier().subscribe();

        let product = svc.create_product(request("A", 10.0, "x")).await.unwrap();
        assert!(product.status);
        assert!(product.thumbnails.is_empty());

        let event = sub.recv().await.unwrap();
        assert_eq!(event.products(), [product]);
    }

    #[tokio::test]
    async fn create_with_missing_fields_is_rejected_without_broadcast() {
        let (_dir, svc) = service().await;
        let mut sub = svc.notifier().subscribe();

        let err = svc
            .create_product(CreateProductRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn duplicate_code_leaves_catalog_unchanged() {
        let (_dir, svc) = service().await;
        svc.create_product(request("A", 1.0, "x")).await.unwrap();
        let err = svc.create_product(request("A", 2.0, "y")).await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateCode(_)));

        let page = svc
            .list_products(&CatalogQuery::default(), PRODUCTS_BASE_PATH)
            .await
            .unwrap();
        assert_eq!(page.payload.len(), 1);
        assert_eq!(page.payload[0].price, 1.0);
    }

    #[tokio::test]
    async fn lists_page_of_filtered_products_sorted_by_price() {
        let (_dir, svc) = service().await;
        for (code, price) in [("E1", 100.0), ("E2", 500.0), ("E3", 300.0), ("E4", 200.0), ("E5", 400.0)] {
            svc.create_product(request(code, price, "electronics")).await.unwrap();
        }
        svc.create_product(request("B1", 999.0, "books")).await.unwrap();

        let query = CatalogQuery::from_params([
            ("limit", "2"),
            ("page", "2"),
            ("query", "electronics"),
            ("sort", "desc"),
        ]);
        let page = svc.list_products(&query, PRODUCTS_BASE_PATH).await.unwrap();

        let prices: Vec<_> = page.payload.iter().map(|p| p.price).collect();
        assert_eq!(prices, [300.0, 200.0]);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_prev_page && page.has_next_page);
        assert_eq!(
            page.next_link.as_deref(),
            Some("/api/products?limit=2&page=3&query=electronics&sort=desc")
        );
    }

    #[tokio::test]
    async fn update_keeps_id_and_rejects_invalid_patch() {
        let (_dir, svc) = service().await;
        let product = svc.create_product(request("A", 1.0, "x")).await.unwrap();

        let patch: ProductPatch = serde_json::from_value(json!({ "id": "999", "stock": 0 })).unwrap();
        let updated = svc.update_product(&product.id, patch).await.unwrap();
        assert_eq!(updated.id, product.id);
        assert_eq!(updated.stock, 0);

        let bad = ProductPatch {
            price: Some(-1.0),
            ..ProductPatch::default()
        };
        let err = svc.update_product(&product.id, bad).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_products_are_not_found() {
        let (_dir, svc) = service().await;
        let ghost = ProductId::new("77");
        assert!(matches!(svc.get_product(&ghost).await, Err(DomainError::NotFound(_))));
        assert!(matches!(
            svc.update_product(&ghost, ProductPatch::default()).await,
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(svc.delete_product(&ghost).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn quick_add_fills_defaults_and_delete_broadcasts() {
        let (_dir, svc) = service().await;
        let quick: QuickAddProduct = serde_json::from_value(json!({ "title": "Sticker", "price": "2.5" })).unwrap();
        let product = svc.quick_add(quick).await.unwrap();
        assert_eq!(product.description, QuickAddProduct::DEFAULT_DESCRIPTION);
        assert_eq!(product.stock, QuickAddProduct::DEFAULT_STOCK);
        assert_eq!(product.category, QuickAddProduct::DEFAULT_CATEGORY);
        assert!(product.code.starts_with("AUTO-"));

        let mut sub = svc.notifier().subscribe();
        svc.delete_product(&product.id).await.unwrap();
        assert!(sub.recv().await.unwrap().products().is_empty());
    }

    #[tokio::test]
    async fn back_to_back_quick_adds_all_succeed() {
        let (_dir, svc) = service().await;
        for n in 0..20 {
            let quick: QuickAddProduct =
                serde_json::from_value(json!({ "title": format!("Badge {n}"), "price": 1 })).unwrap();
            svc.quick_add(quick).await.unwrap();
        }

        let all = svc
            .list_products(&CatalogQuery::from_params([("limit", "50")]), PRODUCTS_BASE_PATH)
            .await
            .unwrap()
            .payload;
        assert_eq!(all.len(), 20);
        let codes: std::collections::HashSet<_> = all.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes.len(), 20);
    }
}
