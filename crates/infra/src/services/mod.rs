//! Application services: domain rules + storage + notification.
//!
//! Handlers (HTTP and realtime) call these and never talk to a store directly.

mod carts;
mod catalog;

pub use carts::CartService;
pub use catalog::CatalogService;

/// Base path that pagination links are built against.
pub const PRODUCTS_BASE_PATH: &str = "/api/products";
