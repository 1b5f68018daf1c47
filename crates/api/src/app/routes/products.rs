use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, RawQuery},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use storefront_core::ProductId;
use storefront_infra::PRODUCTS_BASE_PATH;
use storefront_products::{CatalogQuery, CreateProductRequest, ProductPatch};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:pid",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// `GET /api/products?limit=&page=&sort=&query=`
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    RawQuery(raw): RawQuery,
) -> axum::response::Response {
    let query = CatalogQuery::from_params(dto::query_pairs(raw.as_deref()));
    match services.catalog.list_products(&query, PRODUCTS_BASE_PATH).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(pid): Path<String>,
) -> axum::response::Response {
    match services.catalog.get_product(&ProductId::new(pid)).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.catalog.create_product(body).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Partial update. An `id` in the body is ignored.
pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(pid): Path<String>,
    body: Result<Json<ProductPatch>, JsonRejection>,
) -> axum::response::Response {
    let Json(patch) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.catalog.update_product(&ProductId::new(pid), patch).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(pid): Path<String>,
) -> axum::response::Response {
    match services.catalog.delete_product(&ProductId::new(pid)).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "deleted" }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
