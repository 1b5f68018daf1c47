//! Cart line-item mutations.
//!
//! [`CartAggregator::apply`] is pure: it takes the current cart and a command
//! and returns the next cart, or an error with the input left untouched.
//! Persisting the result is the caller's job.

use serde_json::Value as JsonValue;

use storefront_core::{DomainError, DomainResult, ProductId};

use crate::cart::{Cart, LineItem};

/// Mutation requested on a cart.
#[derive(Debug, Clone, PartialEq)]
pub enum CartCommand {
    /// Increment an existing line by `step`, or append a new line with quantity 1.
    AddOrIncrement { product: ProductId, step: u64 },
    /// Replace the quantity of an existing line. Raw JSON so the value is validated here.
    SetQuantity { product: ProductId, quantity: JsonValue },
    Remove { product: ProductId },
    /// Replace every line. Expects a JSON array of `{ product, quantity }`.
    ReplaceAll { items: JsonValue },
    Clear,
}

impl CartCommand {
    pub fn add_one(product: ProductId) -> Self {
        Self::AddOrIncrement { product, step: 1 }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CartAggregator;

impl CartAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, cart: &Cart, command: &CartCommand) -> DomainResult<Cart> {
        let mut next = cart.clone();
        match command {
            CartCommand::AddOrIncrement { product, step } => {
                match next.items.iter_mut().find(|l| &l.product == product) {
                    Some(line) => line.quantity = line.quantity.saturating_add(*step),
                    None => next.items.push(LineItem::new(product.clone(), 1)),
                }
            }
            CartCommand::SetQuantity { product, quantity } => {
                let quantity = parse_quantity(quantity)?;
                let idx = next
                    .items
                    .iter()
                    .position(|l| &l.product == product)
                    .ok_or_else(|| DomainError::not_found("product in cart"))?;
                // Zero removes the line so stored quantities stay >= 1.
                if quantity == 0 {
                    next.items.remove(idx);
                } else {
                    next.items[idx].quantity = quantity;
                }
            }
            CartCommand::Remove { product } => {
                next.items.retain(|l| &l.product != product);
            }
            CartCommand::ReplaceAll { items } => {
                next.items = parse_line_items(items)?;
            }
            CartCommand::Clear => next.items.clear(),
        }
        Ok(next)
    }
}

/// Non-negative integer given as a JSON number or numeric string.
pub fn parse_quantity(raw: &JsonValue) -> DomainResult<u64> {
    let invalid = || DomainError::validation("quantity must be a non-negative integer");
    let number = match raw {
        JsonValue::Number(n) => n.as_f64().ok_or_else(invalid)?,
        JsonValue::String(s) => s.trim().parse::<f64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    if !number.is_finite() || number < 0.0 || number.fract() != 0.0 || number > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(number as u64)
}

fn parse_line_items(raw: &JsonValue) -> DomainResult<Vec<LineItem>> {
    let entries = raw
        .as_array()
        .ok_or_else(|| DomainError::validation("products must be an array"))?;

    let mut lines: Vec<LineItem> = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        let product = match entry.get("product") {
            Some(JsonValue::String(s)) if !s.trim().is_empty() => ProductId::new(s.as_str()),
            Some(JsonValue::Number(n)) => ProductId::new(n.to_string()),
            _ => {
                return Err(DomainError::validation(format!(
                    "products[{idx}].product is required"
                )));
            }
        };
        let quantity = entry
            .get("quantity")
            .ok_or_else(|| DomainError::validation(format!("products[{idx}].quantity is required")))
            .and_then(parse_quantity)?;
        if quantity == 0 {
            return Err(DomainError::validation(format!(
                "products[{idx}].quantity must be at least 1"
            )));
        }

        match lines.iter_mut().find(|l| l.product == product) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
            None => lines.push(LineItem::new(product, quantity)),
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storefront_core::CartId;

    fn empty_cart() -> Cart {
        Cart::empty(CartId::new("1"))
    }

    fn pid(id: &str) -> ProductId {
        ProductId::new(id)
    }

    fn cart_with(lines: &[(&str, u64)]) -> Cart {
        Cart {
            id: CartId::new("1"),
            items: lines.iter().map(|(p, q)| LineItem::new(pid(p), *q)).collect(),
        }
    }

    #[test]
    fn adding_same_product_twice_increments() {
        let agg = CartAggregator::new();
        let cart = agg.apply(&empty_cart(), &CartCommand::add_one(pid("1"))).unwrap();
        let cart = agg.apply(&cart, &CartCommand::add_one(pid("1"))).unwrap();
        assert_eq!(cart.items, vec![LineItem::new(pid("1"), 2)]);
    }

    #[test]
    fn adding_distinct_products_appends_lines() {
        let agg = CartAggregator::new();
        let cart = agg.apply(&empty_cart(), &CartCommand::add_one(pid("1"))).unwrap();
        let cart = agg.apply(&cart, &CartCommand::add_one(pid("2"))).unwrap();
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[1], LineItem::new(pid("2"), 1));
    }

    #[test]
    fn first_insert_ignores_step() {
        let agg = CartAggregator::new();
        let cmd = CartCommand::AddOrIncrement { product: pid("1"), step: 5 };
        let cart = agg.apply(&empty_cart(), &cmd).unwrap();
        assert_eq!(cart.items[0].quantity, 1);
        let cart = agg.apply(&cart, &cmd).unwrap();
        assert_eq!(cart.items[0].quantity, 6);
    }

    #[test]
    fn set_quantity_replaces_value() {
        let cart = cart_with(&[("1", 2)]);
        let next = CartAggregator::new()
            .apply(&cart, &CartCommand::SetQuantity { product: pid("1"), quantity: json!(3) })
            .unwrap();
        assert_eq!(next.items[0].quantity, 3);
    }

    #[test]
    fn set_quantity_accepts_numeric_strings() {
        let cart = cart_with(&[("1", 2)]);
        let next = CartAggregator::new()
            .apply(&cart, &CartCommand::SetQuantity { product: pid("1"), quantity: json!("4") })
            .unwrap();
        assert_eq!(next.items[0].quantity, 4);
    }

    #[test]
    fn set_quantity_rejects_negative_and_non_numeric() {
        let cart = cart_with(&[("1", 2)]);
        let agg = CartAggregator::new();
        for bad in [json!(-1), json!("abc"), json!(null), json!(1.5), json!([3])] {
            let err = agg
                .apply(&cart, &CartCommand::SetQuantity { product: pid("1"), quantity: bad })
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
        assert_eq!(cart.items[0].quantity, 2);
    }

    #[test]
    fn set_quantity_on_missing_line_is_not_found() {
        let err = CartAggregator::new()
            .apply(&empty_cart(), &CartCommand::SetQuantity { product: pid("9"), quantity: json!(1) })
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn set_quantity_zero_removes_line() {
        let cart = cart_with(&[("1", 2), ("2", 1)]);
        let next = CartAggregator::new()
            .apply(&cart, &CartCommand::SetQuantity { product: pid("1"), quantity: json!(0) })
            .unwrap();
        assert_eq!(next.items, vec![LineItem::new(pid("2"), 1)]);
    }

    #[test]
    fn remove_missing_product_is_noop() {
        let cart = cart_with(&[("1", 2)]);
        let next = CartAggregator::new()
            .apply(&cart, &CartCommand::Remove { product: pid("7") })
            .unwrap();
        assert_eq!(next, cart);
    }

    #[test]
    fn remove_drops_matching_line() {
        let cart = cart_with(&[("1", 2), ("2", 1)]);
        let next = CartAggregator::new()
            .apply(&cart, &CartCommand::Remove { product: pid("1") })
            .unwrap();
        assert_eq!(next.items, vec![LineItem::new(pid("2"), 1)]);
    }

    #[test]
    fn replace_all_requires_array() {
        let err = CartAggregator::new()
            .apply(&empty_cart(), &CartCommand::ReplaceAll { items: json!({ "product": "1" }) })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn replace_all_accepts_unknown_products_and_merges_duplicates() {
        let items = json!([
            { "product": "ghost", "quantity": 2 },
            { "product": "1", "quantity": 1 },
            { "product": "ghost", "quantity": "3" }
        ]);
        let next = CartAggregator::new()
            .apply(&cart_with(&[("5", 9)]), &CartCommand::ReplaceAll { items })
            .unwrap();
        assert_eq!(
            next.items,
            vec![LineItem::new(pid("ghost"), 5), LineItem::new(pid("1"), 1)]
        );
    }

    #[test]
    fn replace_all_rejects_entries_without_quantity() {
        let err = CartAggregator::new()
            .apply(&empty_cart(), &CartCommand::ReplaceAll { items: json!([{ "product": "1" }]) })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn clear_empties_cart() {
        let next = CartAggregator::new()
            .apply(&cart_with(&[("1", 2), ("2", 1)]), &CartCommand::Clear)
            .unwrap();
        assert!(next.is_empty());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any sequence of adds yields one line per product whose
            /// quantity equals the number of adds for that product.
            #[test]
            fn adds_merge_per_product(refs in proptest::collection::vec(0u8..5, 0..40)) {
                let agg = CartAggregator::new();
                let mut cart = empty_cart();
                for r in &refs {
                    cart = agg.apply(&cart, &CartCommand::add_one(pid(&r.to_string()))).unwrap();
                }

                let mut seen = std::collections::HashSet::new();
                for line in cart.items() {
                    prop_assert!(seen.insert(line.product.clone()));
                    let expected = refs.iter().filter(|r| r.to_string() == line.product.as_str()).count() as u64;
                    prop_assert_eq!(line.quantity, expected);
                }
                prop_assert_eq!(seen.len(), refs.iter().collect::<std::collections::HashSet<_>>().len());
            }
        }
    }
}
