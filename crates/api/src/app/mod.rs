//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend selection and shared services (store, bus, notifier)
//! - `routes/`: HTTP and WebSocket handlers (one file per area)
//! - `dto.rs`: edge-only request shapes and the realtime wire format
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: AppServices) -> Router {
    routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(middleware::log_requests))
            .layer(Extension(Arc::new(services))),
    )
}
