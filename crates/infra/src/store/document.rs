//! PostgreSQL document backend.
//!
//! Products and carts are stored as JSONB documents keyed by a UUIDv7 id:
//!
//! ```sql
//! products(id uuid primary key, seq bigserial, doc jsonb)  -- unique (doc->>'code')
//! carts   (id uuid primary key, seq bigserial, doc jsonb)
//! ```
//!
//! `seq` records insertion order, which is the order of unsorted listings and
//! the tie-break of price sorts.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `DuplicateCode` |
//! | Database (other) | Any other | `Database` |
//! | PoolClosed / Other | N/A | `Database` |
//!
//! An id that is not a UUID can never exist here, so operations addressing one
//! fail with `InvalidId` before touching the database.
//!
//! Every single-document write is one statement (or one transaction), so it is
//! atomic. Multi-step cart sequences in the service layer are not.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{instrument, Span};
use uuid::Uuid;

use storefront_carts::Cart;
use storefront_core::{CartId, ProductId};
use storefront_products::{PriceSort, Product, ProductDraft, ProductFilter, ProductPatch};

use super::{CatalogStore, ProductSlice, StoreError, StoreResult};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        seq BIGSERIAL NOT NULL,
        doc JSONB NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS products_code_key ON products ((doc->>'code'))",
    r#"
    CREATE TABLE IF NOT EXISTS carts (
        id UUID PRIMARY KEY,
        seq BIGSERIAL NOT NULL,
        doc JSONB NOT NULL
    )
    "#,
];

/// Shared `WHERE` clause of the listing and count queries.
/// `$1` is the category (or NULL), `$2` the availability flag (or NULL).
const LIST_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR doc->>'category' = $1)
      AND ($2::boolean IS NULL OR (doc->>'status')::boolean = $2)
"#;

#[derive(Debug, Clone)]
pub struct DocumentCatalogStore {
    pool: PgPool,
}

impl DocumentCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a default pool.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes when missing. Safe to run on every startup.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

fn order_clause(sort: PriceSort) -> &'static str {
    match sort {
        PriceSort::None => "ORDER BY seq ASC",
        PriceSort::Ascending => "ORDER BY (doc->>'price')::float8 ASC, seq ASC",
        PriceSort::Descending => "ORDER BY (doc->>'price')::float8 DESC, seq ASC",
    }
}

fn filter_binds(filter: &ProductFilter) -> (Option<&str>, Option<bool>) {
    match filter {
        ProductFilter::None => (None, None),
        ProductFilter::Category(category) => (Some(category.as_str()), None),
        ProductFilter::Availability(status) => (None, Some(*status)),
    }
}

fn parse_uuid(id: &impl AsRef<str>) -> StoreResult<Uuid> {
    Uuid::parse_str(id.as_ref()).map_err(|_| StoreError::InvalidId(id.as_ref().to_string()))
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn decode<T: serde::de::DeserializeOwned>(row: &sqlx::postgres::PgRow) -> StoreResult<T> {
    row.try_get::<Json<T>, _>("doc")
        .map(|Json(doc)| doc)
        .map_err(|e| map_sqlx_error("decode document", e))
}

#[async_trait]
impl CatalogStore for DocumentCatalogStore {
    fn backend_name(&self) -> &'static str {
        "document"
    }

    #[instrument(skip(self), fields(total = tracing::field::Empty), err)]
    async fn list_products(
        &self,
        filter: &ProductFilter,
        sort: PriceSort,
        skip: u64,
        limit: u64,
    ) -> StoreResult<ProductSlice> {
        let (category, status) = filter_binds(filter);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products {LIST_FILTER}"))
            .bind(category)
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;

        let rows = sqlx::query(&format!(
            "SELECT doc FROM products {LIST_FILTER} {} LIMIT $3 OFFSET $4",
            order_clause(sort)
        ))
        .bind(category)
        .bind(status)
        .bind(to_i64(limit))
        .bind(to_i64(skip))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        let products = rows.iter().map(decode).collect::<StoreResult<Vec<Product>>>()?;
        Span::current().record("total", total);
        Ok(ProductSlice {
            products,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn all_products(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query("SELECT doc FROM products ORDER BY seq ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("all_products", e))?;
        rows.iter().map(decode).collect()
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: &ProductId) -> StoreResult<Option<Product>> {
        let uuid = parse_uuid(id)?;
        let row = sqlx::query("SELECT doc FROM products WHERE id = $1")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self, draft), fields(code = %draft.code), err)]
    async fn create_product(&self, draft: ProductDraft) -> StoreResult<Product> {
        let uuid = Uuid::now_v7();
        let code = draft.code.clone();
        let product = Product::from_draft(ProductId::from(uuid), draft);

        sqlx::query("INSERT INTO products (id, doc) VALUES ($1, $2)")
            .bind(uuid)
            .bind(Json(&product))
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error("create_product", &code, e))?;
        Ok(product)
    }

    #[instrument(skip(self, patch), fields(product_id = %id), err)]
    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> StoreResult<Option<Product>> {
        let uuid = parse_uuid(id)?;
        let code = patch.code.clone().unwrap_or_default();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;

        let row = sqlx::query("SELECT doc FROM products WHERE id = $1 FOR UPDATE")
            .bind(uuid)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut product: Product = decode(&row)?;
        product.apply_patch(patch);

        sqlx::query("UPDATE products SET doc = $2 WHERE id = $1")
            .bind(uuid)
            .bind(Json(&product))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error("update_product", &code, e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;
        Ok(Some(product))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: &ProductId) -> StoreResult<bool> {
        let uuid = parse_uuid(id)?;
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> StoreResult<HashMap<ProductId, Product>> {
        // Unparsable references cannot match any row; they stay unresolved.
        let uuids: Vec<Uuid> = ids.iter().filter_map(|id| parse_uuid(id).ok()).collect();
        if uuids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query("SELECT doc FROM products WHERE id = ANY($1)")
            .bind(&uuids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("products_by_ids", e))?;

        rows.iter()
            .map(|row| decode::<Product>(row).map(|p| (p.id.clone(), p)))
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn create_cart(&self) -> StoreResult<Cart> {
        let uuid = Uuid::now_v7();
        let cart = Cart::empty(CartId::from(uuid));
        sqlx::query("INSERT INTO carts (id, doc) VALUES ($1, $2)")
            .bind(uuid)
            .bind(Json(&cart))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_cart", e))?;
        Ok(cart)
    }

    #[instrument(skip(self), fields(cart_id = %id), err)]
    async fn get_cart(&self, id: &CartId) -> StoreResult<Option<Cart>> {
        let uuid = parse_uuid(id)?;
        let row = sqlx::query("SELECT doc FROM carts WHERE id = $1")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_cart", e))?;
        row.as_ref().map(decode).transpose()
    }

    #[instrument(skip(self, cart), fields(cart_id = %cart.id, lines = cart.items.len()), err)]
    async fn save_cart(&self, cart: &Cart) -> StoreResult<Option<Cart>> {
        let uuid = parse_uuid(&cart.id)?;
        for line in &cart.items {
            parse_uuid(&line.product)?;
        }

        let row = sqlx::query("UPDATE carts SET doc = $2 WHERE id = $1 RETURNING doc")
            .bind(uuid)
            .bind(Json(cart))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("save_cart", e))?;
        row.as_ref().map(decode).transpose()
    }
}

/// Map a write error, attributing unique violations to the product `code`.
fn map_write_error(operation: &str, code: &str, err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        return StoreError::DuplicateCode(code.to_string());
    }
    map_sqlx_error(operation, err)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

/// Map SQLx errors to `StoreError`.
///
/// Unique violations only become `DuplicateCode` through [`map_write_error`],
/// which knows the product code. Anywhere else they are plain database errors.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Database(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_clause_breaks_price_ties_by_insertion() {
        assert_eq!(order_clause(PriceSort::None), "ORDER BY seq ASC");
        assert!(order_clause(PriceSort::Ascending).ends_with("ASC, seq ASC"));
        assert!(order_clause(PriceSort::Descending).ends_with("DESC, seq ASC"));
    }

    #[test]
    fn filter_binds_match_variants() {
        assert_eq!(filter_binds(&ProductFilter::None), (None, None));
        assert_eq!(
            filter_binds(&ProductFilter::Category("toys".into())),
            (Some("toys"), None)
        );
        assert_eq!(
            filter_binds(&ProductFilter::Availability(false)),
            (None, Some(false))
        );
    }

    #[test]
    fn non_uuid_ids_are_invalid() {
        assert!(matches!(
            parse_uuid(&ProductId::new("42")),
            Err(StoreError::InvalidId(id)) if id == "42"
        ));
        assert!(parse_uuid(&ProductId::from(Uuid::now_v7())).is_ok());
    }

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct UniqueViolation {
        message: String,
    }

    impl sqlx::error::DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            &self.message
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some("23505".into())
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }
    }

    fn unique_violation() -> sqlx::Error {
        sqlx::Error::Database(Box::new(UniqueViolation {
            message: "duplicate key value violates unique constraint \"products_code_key\"".to_string(),
        }))
    }

    #[test]
    fn unique_violation_on_product_write_carries_the_code() {
        let err = map_write_error("create_product", "SKU-1", unique_violation());
        assert!(matches!(err, StoreError::DuplicateCode(code) if code == "SKU-1"));
    }

    #[test]
    fn unique_violation_elsewhere_is_a_database_error() {
        let err = map_sqlx_error("save_cart", unique_violation());
        assert!(matches!(err, StoreError::Database(msg) if msg.contains("save_cart")));
    }

    #[test]
    fn pool_closed_maps_to_database_error() {
        let err = map_sqlx_error("get_product", sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Database(msg) if msg.contains("get_product")));
    }
}
