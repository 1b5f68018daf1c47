use chrono::{DateTime, Utc};

use storefront_events::Event;

use crate::product::Product;

/// Catalog change notification.
///
/// Always a full snapshot of the product collection, never a delta, so
/// receiving notifications out of order or missing some is harmless: the last
/// one received describes the current catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    Products {
        products: Vec<Product>,
        occurred_at: DateTime<Utc>,
    },
}

impl CatalogEvent {
    pub fn snapshot(products: Vec<Product>) -> Self {
        Self::Products {
            products,
            occurred_at: Utc::now(),
        }
    }

    pub fn products(&self) -> &[Product] {
        match self {
            Self::Products { products, .. } => products,
        }
    }
}

impl Event for CatalogEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Products { .. } => "products",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::Products { occurred_at, .. } => *occurred_at,
        }
    }
}
