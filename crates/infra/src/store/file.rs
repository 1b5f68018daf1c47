//! JSON-file catalog backend.
//!
//! Each collection is a single pretty-printed JSON array on disk
//! (`products.json`, `carts.json`). Every mutation reads the whole array,
//! changes it in memory and rewrites the file.
//!
//! ## Concurrency
//!
//! Read-modify-write cycles are serialized by one async mutex per collection,
//! and the rewrite goes to `<file>.tmp` first and is renamed over the original.
//! Readers therefore never see a half-written file and concurrent writers in
//! this process never lose each other's updates. Two processes sharing one data
//! directory are not coordinated.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use storefront_carts::Cart;
use storefront_core::{CartId, ProductId};
use storefront_products::{PriceSort, Product, ProductDraft, ProductFilter, ProductPatch};

use super::{CatalogStore, IdAllocator, ProductSlice, StoreError, StoreResult};

pub const PRODUCTS_FILE: &str = "products.json";
pub const CARTS_FILE: &str = "carts.json";

/// One JSON array file plus the lock that serializes its writers.
#[derive(Debug)]
struct JsonCollection<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _records: PhantomData<fn() -> T>,
}

impl<T> JsonCollection<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    async fn open(path: PathBuf) -> StoreResult<Self> {
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io("open collection", e))?;
        if !exists {
            tokio::fs::write(&path, b"[]")
                .await
                .map_err(|e| StoreError::io("initialise collection", e))?;
            debug!(path = %path.display(), "initialised empty collection");
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
            _records: PhantomData,
        })
    }

    async fn load(&self) -> StoreResult<Vec<T>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("read collection", e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| StoreError::serialization("parse collection", e))
    }

    async fn persist(&self, records: &[T]) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|e| StoreError::serialization("encode collection", e))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::io("write collection", e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io("replace collection", e))?;
        Ok(())
    }

    /// Run `f` against the current records under the write lock.
    ///
    /// `f` returns its result plus whether the records changed; the file is
    /// only rewritten when they did.
    async fn mutate<R, F>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Vec<T>) -> StoreResult<(R, bool)> + Send,
        R: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let (result, changed) = f(&mut records)?;
        if changed {
            self.persist(&records).await?;
        }
        Ok(result)
    }
}

/// Catalog store over a local data directory.
#[derive(Debug)]
pub struct FileCatalogStore {
    products: JsonCollection<Product>,
    carts: JsonCollection<Cart>,
}

impl FileCatalogStore {
    /// Open (and create if needed) the data directory and both collection files.
    pub async fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io("create data directory", e))?;

        Ok(Self {
            products: JsonCollection::open(dir.join(PRODUCTS_FILE)).await?,
            carts: JsonCollection::open(dir.join(CARTS_FILE)).await?,
        })
    }
}

fn clamp(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

#[async_trait]
impl CatalogStore for FileCatalogStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    #[instrument(skip(self), err)]
    async fn list_products(
        &self,
        filter: &ProductFilter,
        sort: PriceSort,
        skip: u64,
        limit: u64,
    ) -> StoreResult<ProductSlice> {
        let mut matching: Vec<Product> = self
            .products
            .load()
            .await?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        sort.apply(&mut matching);

        let total = matching.len() as u64;
        let products = matching
            .into_iter()
            .skip(clamp(skip))
            .take(clamp(limit))
            .collect();
        Ok(ProductSlice { products, total })
    }

    async fn all_products(&self) -> StoreResult<Vec<Product>> {
        self.products.load().await
    }

    async fn get_product(&self, id: &ProductId) -> StoreResult<Option<Product>> {
        Ok(self.products.load().await?.into_iter().find(|p| &p.id == id))
    }

    #[instrument(skip(self, draft), fields(code = %draft.code), err)]
    async fn create_product(&self, draft: ProductDraft) -> StoreResult<Product> {
        self.products
            .mutate(move |products| {
                if products.iter().any(|p| p.code == draft.code) {
                    return Err(StoreError::DuplicateCode(draft.code));
                }
                let id = ProductId::new(IdAllocator::next_id(products));
                let product = Product::from_draft(id, draft);
                products.push(product.clone());
                Ok((product, true))
            })
            .await
    }

    #[instrument(skip(self, patch), fields(product_id = %id), err)]
    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> StoreResult<Option<Product>> {
        self.products
            .mutate(move |products| {
                let Some(idx) = products.iter().position(|p| &p.id == id) else {
                    return Ok((None, false));
                };
                if let Some(code) = &patch.code {
                    if products.iter().any(|p| &p.code == code && &p.id != id) {
                        return Err(StoreError::DuplicateCode(code.clone()));
                    }
                }
                products[idx].apply_patch(patch);
                Ok((Some(products[idx].clone()), true))
            })
            .await
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: &ProductId) -> StoreResult<bool> {
        self.products
            .mutate(|products| {
                let before = products.len();
                products.retain(|p| &p.id != id);
                let removed = products.len() != before;
                Ok((removed, removed))
            })
            .await
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> StoreResult<HashMap<ProductId, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .products
            .load()
            .await?
            .into_iter()
            .filter(|p| ids.contains(&p.id))
            .map(|p| (p.id.clone(), p))
            .collect())
    }

    #[instrument(skip(self), err)]
    async fn create_cart(&self) -> StoreResult<Cart> {
        self.carts
            .mutate(|carts| {
                let cart = Cart::empty(CartId::new(IdAllocator::next_id(carts)));
                carts.push(cart.clone());
                Ok((cart, true))
            })
            .await
    }

    async fn get_cart(&self, id: &CartId) -> StoreResult<Option<Cart>> {
        Ok(self.carts.load().await?.into_iter().find(|c| &c.id == id))
    }

    #[instrument(skip(self, cart), fields(cart_id = %cart.id, lines = cart.items.len()), err)]
    async fn save_cart(&self, cart: &Cart) -> StoreResult<Option<Cart>> {
        self.carts
            .mutate(|carts| match carts.iter_mut().find(|c| c.id == cart.id) {
                Some(stored) => {
                    stored.items = cart.items.clone();
                    Ok((Some(stored.clone()), true))
                }
                None => Ok((None, false)),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use storefront_carts::LineItem;
    use tempfile::TempDir;

    fn draft(code: &str, price: f64, category: &str) -> ProductDraft {
        ProductDraft {
            title: format!("Product {code}"),
            description: "test product".to_string(),
            code: code.to_string(),
            price,
            status: true,
            stock: 3,
            category: category.to_string(),
            thumbnails: Vec::new(),
        }
    }

    async fn open_store() -> (TempDir, FileCatalogStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCatalogStore::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn open_initialises_missing_files() {
        let (dir, _store) = open_store().await;
        for file in [PRODUCTS_FILE, CARTS_FILE] {
            let raw = std::fs::read_to_string(dir.path().join(file)).unwrap();
            assert_eq!(raw, "[]");
        }
    }

    #[tokio::test]
    async fn open_keeps_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PRODUCTS_FILE),
            r#"[{"id":"7","title":"Lamp","description":"d","code":"L1","price":12.5,"status":true,"stock":2,"category":"home"}]"#,
        )
        .unwrap();

        let store = FileCatalogStore::open(dir.path()).await.unwrap();
        let product = store.get_product(&ProductId::new("7")).await.unwrap().unwrap();
        assert_eq!(product.title, "Lamp");
        assert!(product.thumbnails.is_empty());

        let created = store.create_product(draft("L2", 1.0, "home")).await.unwrap();
        assert_eq!(created.id.as_str(), "8");
    }

    #[tokio::test]
    async fn creates_sequential_ids_and_rejects_duplicate_codes() {
        let (_dir, store) = open_store().await;
        let a = store.create_product(draft("A", 1.0, "x")).await.unwrap();
        let b = store.create_product(draft("B", 2.0, "x")).await.unwrap();
        assert_eq!((a.id.as_str(), b.id.as_str()), ("1", "2"));

        let err = store.create_product(draft("A", 3.0, "x")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCode(code) if code == "A"));
        assert_eq!(store.all_products().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn writes_pretty_json_and_no_temp_file() {
        let (dir, store) = open_store().await;
        store.create_product(draft("A", 1.0, "x")).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join(PRODUCTS_FILE)).unwrap();
        assert!(raw.starts_with("[\n  {\n    \"id\": \"1\""));
        assert!(!dir.path().join("products.json.tmp").exists());
    }

    #[tokio::test]
    async fn update_merges_fields_and_keeps_id() {
        let (_dir, store) = open_store().await;
        let created = store.create_product(draft("A", 1.0, "x")).await.unwrap();

        let patch = ProductPatch {
            price: Some(9.5),
            stock: Some(0),
            ..ProductPatch::default()
        };
        let updated = store.update_product(&created.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.price, 9.5);
        assert_eq!(updated.stock, 0);
        assert_eq!(updated.title, created.title);
    }

    #[tokio::test]
    async fn update_rejects_code_of_another_product() {
        let (_dir, store) = open_store().await;
        let a = store.create_product(draft("A", 1.0, "x")).await.unwrap();
        store.create_product(draft("B", 1.0, "x")).await.unwrap();

        let taken = ProductPatch {
            code: Some("B".into()),
            ..ProductPatch::default()
        };
        let err = store.update_product(&a.id, taken).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCode(_)));

        let own = ProductPatch {
            code: Some("A".into()),
            ..ProductPatch::default()
        };
        assert!(store.update_product(&a.id, own).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_and_delete_of_unknown_id() {
        let (_dir, store) = open_store().await;
        let ghost = ProductId::new("404");
        assert!(store.update_product(&ghost, ProductPatch::default()).await.unwrap().is_none());
        assert!(!store.delete_product(&ghost).await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_product() {
        let (_dir, store) = open_store().await;
        let a = store.create_product(draft("A", 1.0, "x")).await.unwrap();
        assert!(store.delete_product(&a.id).await.unwrap());
        assert!(store.get_product(&a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_sorts_and_paginates() {
        let (_dir, store) = open_store().await;
        store.create_product(draft("A", 30.0, "tools")).await.unwrap();
        store.create_product(draft("B", 10.0, "toys")).await.unwrap();
        store.create_product(draft("C", 20.0, "tools")).await.unwrap();
        store.create_product(draft("D", 10.0, "tools")).await.unwrap();

        let filter = ProductFilter::Category("tools".into());
        let slice = store
            .list_products(&filter, PriceSort::Ascending, 0, 2)
            .await
            .unwrap();
        assert_eq!(slice.total, 3);
        let codes: Vec<_> = slice.products.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, ["D", "C"]);

        let slice = store
            .list_products(&ProductFilter::None, PriceSort::None, 3, 10)
            .await
            .unwrap();
        assert_eq!(slice.total, 4);
        assert_eq!(slice.products.len(), 1);
        assert_eq!(slice.products[0].code, "D");
    }

    #[tokio::test]
    async fn corrupt_file_is_a_serialization_error() {
        let (dir, store) = open_store().await;
        std::fs::write(dir.path().join(PRODUCTS_FILE), "{not json").unwrap();
        let err = store.all_products().await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }

    #[tokio::test]
    async fn concurrent_creates_get_unique_ids() {
        let (_dir, store) = open_store().await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..16)
            .map(|n| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.create_product(draft(&format!("C{n}"), 1.0, "x")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let products = store.all_products().await.unwrap();
        assert_eq!(products.len(), 16);
        let ids: std::collections::HashSet<_> = products.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids.len(), 16);
    }

    #[tokio::test]
    async fn carts_are_created_saved_and_populated() {
        let (_dir, store) = open_store().await;
        let product = store.create_product(draft("A", 2.5, "x")).await.unwrap();
        let cart = store.create_cart().await.unwrap();
        assert_eq!(cart.id.as_str(), "1");
        assert!(cart.is_empty());

        let mut next = cart.clone();
        next.items = vec![
            LineItem::new(product.id.clone(), 2),
            LineItem::new(ProductId::new("gone"), 1),
        ];
        let saved = store.save_cart(&next).await.unwrap().unwrap();
        assert_eq!(saved.items.len(), 2);

        let populated = store.get_populated_cart(&cart.id).await.unwrap().unwrap();
        assert_eq!(populated.products[0].product.as_ref(), Some(&product));
        assert!(populated.products[1].product.is_none());
        assert_eq!(populated.total(), 5.0);
    }

    #[tokio::test]
    async fn save_of_unknown_cart_returns_none() {
        let (_dir, store) = open_store().await;
        let ghost = Cart::empty(CartId::new("99"));
        assert!(store.save_cart(&ghost).await.unwrap().is_none());
        assert!(store.get_populated_cart(&ghost.id).await.unwrap().is_none());
    }
}
