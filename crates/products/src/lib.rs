//! Products domain module.
//!
//! Product records, create/patch payload validation, and the catalog query
//! engine that normalizes listing parameters. Pure domain logic (no IO, no
//! HTTP, no storage).

pub mod event;
pub mod product;
pub mod query;

pub use event::CatalogEvent;
pub use product::{CreateProductRequest, Product, ProductDraft, ProductPatch, QuickAddProduct};
pub use query::{CatalogQuery, PageInfo, PriceSort, ProductFilter, ProductPage};
