use axum::{routing::get, Router};

pub mod carts;
pub mod products;
pub mod realtime;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/ws", get(realtime::upgrade))
        .nest("/api/products", products::router())
        .nest("/api/carts", carts::router())
}
