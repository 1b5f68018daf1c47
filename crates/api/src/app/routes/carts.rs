use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use storefront_core::{CartId, ProductId};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_cart))
        .route("/:cid", get(get_cart).put(replace_products).delete(clear_cart))
        .route("/:cid/product/:pid", post(add_product))
        .route(
            "/:cid/products/:pid",
            put(set_quantity).delete(remove_product),
        )
}

fn ok_status() -> axum::response::Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response()
}

pub async fn create_cart(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.carts.create_cart().await {
        Ok(cart) => (StatusCode::CREATED, Json(cart)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Cart with every line's product resolved (`null` for deleted products).
pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Path(cid): Path<String>,
) -> axum::response::Response {
    match services.carts.get_cart(&CartId::new(cid)).await {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn add_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path((cid, pid)): Path<(String, String)>,
) -> axum::response::Response {
    match services
        .carts
        .add_product(&CartId::new(cid), &ProductId::new(pid))
        .await
    {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn replace_products(
    Extension(services): Extension<Arc<AppServices>>,
    Path(cid): Path<String>,
    body: Result<Json<dto::ReplaceCartRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services
        .carts
        .replace_products(&CartId::new(cid), body.products)
        .await
    {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn set_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Path((cid, pid)): Path<(String, String)>,
    body: Result<Json<dto::SetQuantityRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services
        .carts
        .set_quantity(&CartId::new(cid), &ProductId::new(pid), body.quantity)
        .await
    {
        Ok(cart) => (StatusCode::OK, Json(cart)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn remove_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path((cid, pid)): Path<(String, String)>,
) -> axum::response::Response {
    match services
        .carts
        .remove_product(&CartId::new(cid), &ProductId::new(pid))
        .await
    {
        Ok(_) => ok_status(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn clear_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Path(cid): Path<String>,
) -> axum::response::Response {
    match services.carts.clear(&CartId::new(cid)).await {
        Ok(_) => ok_status(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
