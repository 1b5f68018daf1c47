use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use storefront_core::{CartId, Entity, ProductId};
use storefront_products::Product;

/// Cart line: product reference + quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: ProductId,
    pub quantity: u64,
}

impl LineItem {
    pub fn new(product: ProductId, quantity: u64) -> Self {
        Self { product, quantity }
    }
}

/// Shopping cart. Serialized as `{ "id", "products": [{ "product", "quantity" }] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    #[serde(rename = "products", default)]
    pub items: Vec<LineItem>,
}

impl Cart {
    pub fn empty(id: CartId) -> Self {
        Self {
            id,
            items: Vec::new(),
        }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Distinct product references, in line order.
    pub fn product_refs(&self) -> Vec<ProductId> {
        let mut refs: Vec<ProductId> = Vec::with_capacity(self.items.len());
        for line in &self.items {
            if !refs.contains(&line.product) {
                refs.push(line.product.clone());
            }
        }
        refs
    }

    /// Resolve references against a product snapshot. Missing products stay `None`.
    pub fn populate(&self, products: &HashMap<ProductId, Product>) -> PopulatedCart {
        PopulatedCart {
            id: self.id.clone(),
            products: self
                .items
                .iter()
                .map(|l| PopulatedLineItem {
                    product: products.get(&l.product).cloned(),
                    quantity: l.quantity,
                })
                .collect(),
        }
    }
}

impl Entity for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Line item with its product resolved for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulatedLineItem {
    /// `null` when the referenced product no longer exists.
    pub product: Option<Product>,
    pub quantity: u64,
}

/// Cart read model returned by `GET /api/carts/{cid}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulatedCart {
    pub id: CartId,
    pub products: Vec<PopulatedLineItem>,
}

impl PopulatedCart {
    /// Sum of price × quantity over resolved line items.
    pub fn total(&self) -> f64 {
        self.products
            .iter()
            .filter_map(|l| l.product.as_ref().map(|p| p.price * l.quantity as f64))
            .sum()
    }

    /// Line items whose product could not be resolved.
    pub fn dangling_count(&self) -> usize {
        self.products.iter().filter(|l| l.product.is_none()).count()
    }
}
