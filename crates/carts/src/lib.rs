//! Carts domain module.
//!
//! Carts hold line items that reference products by id only. All mutations go
//! through [`CartAggregator`], which enforces one line item per product and
//! validates quantities before anything reaches storage.

pub mod aggregator;
pub mod cart;

pub use aggregator::{CartAggregator, CartCommand};
pub use cart::{Cart, LineItem, PopulatedCart, PopulatedLineItem};
