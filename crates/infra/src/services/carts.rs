use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use storefront_carts::{Cart, CartAggregator, CartCommand, PopulatedCart};
use storefront_core::{CartId, DomainError, DomainResult, ProductId};

use crate::store::CatalogStore;

/// Cart operations.
///
/// Each mutation is read cart → apply command → save cart. The sequence is
/// not transactional: two concurrent mutations of the same cart may lose one
/// of the updates.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CatalogStore>,
    aggregator: CartAggregator,
}

impl CartService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            aggregator: CartAggregator::new(),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn create_cart(&self) -> DomainResult<Cart> {
        Ok(self.store.create_cart().await?)
    }

    /// Cart with product details resolved; dangling lines carry `null`.
    pub async fn get_cart(&self, cart_id: &CartId) -> DomainResult<PopulatedCart> {
        self.store
            .get_populated_cart(cart_id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart"))
    }

    /// Add one unit of an existing product. Returns the populated cart.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id), err)]
    pub async fn add_product(&self, cart_id: &CartId, product_id: &ProductId) -> DomainResult<PopulatedCart> {
        let cart = self.load(cart_id).await?;
        if self.store.get_product(product_id).await?.is_none() {
            return Err(DomainError::not_found("product"));
        }

        self.apply(&cart, CartCommand::add_one(product_id.clone())).await?;
        self.get_cart(cart_id).await
    }

    /// Replace every line with `products` (`[{ "product", "quantity" }]`).
    #[instrument(skip(self, products), fields(cart_id = %cart_id), err)]
    pub async fn replace_products(&self, cart_id: &CartId, products: JsonValue) -> DomainResult<Cart> {
        let cart = self.load(cart_id).await?;
        self.apply(&cart, CartCommand::ReplaceAll { items: products }).await
    }

    #[instrument(skip(self, quantity), fields(cart_id = %cart_id, product_id = %product_id), err)]
    pub async fn set_quantity(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: JsonValue,
    ) -> DomainResult<Cart> {
        let cart = self.load(cart_id).await?;
        let command = CartCommand::SetQuantity {
            product: product_id.clone(),
            quantity,
        };
        self.apply(&cart, command).await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id), err)]
    pub async fn remove_product(&self, cart_id: &CartId, product_id: &ProductId) -> DomainResult<Cart> {
        let cart = self.load(cart_id).await?;
        self.apply(&cart, CartCommand::Remove { product: product_id.clone() }).await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id), err)]
    pub async fn clear(&self, cart_id: &CartId) -> DomainResult<Cart> {
        let cart = self.load(cart_id).await?;
        self.apply(&cart, CartCommand::Clear).await
    }

    async fn load(&self, cart_id: &CartId) -> DomainResult<Cart> {
        self.store
            .get_cart(cart_id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart"))
    }

    async fn apply(&self, cart: &Cart, command: CartCommand) -> DomainResult<Cart> {
        let next = self.aggregator.apply(cart, &command)?;
        debug!(cart_id = %cart.id, lines = next.items.len(), "saving cart");
        // The cart can vanish between load and save; report it like a missing cart.
        self.store
            .save_cart(&next)
            .await?
            .ok_or_else(|| DomainError::not_found("cart"))
    }
}
