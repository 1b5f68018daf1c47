use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use storefront_core::{DomainError, DomainResult, Entity, ProductId};

/// Catalog product as stored by either backend and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub code: String,
    pub price: f64,
    pub status: bool,
    pub stock: u64,
    pub category: String,
    #[serde(default)]
    pub thumbnails: Vec<String>,
}

impl Product {
    /// Materialize a validated draft under a freshly allocated identifier.
    pub fn from_draft(id: ProductId, draft: ProductDraft) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            code: draft.code,
            price: draft.price,
            status: draft.status,
            stock: draft.stock,
            category: draft.category,
            thumbnails: draft.thumbnails,
        }
    }

    /// Merge a validated patch into this record. The identifier never changes.
    pub fn apply_patch(&mut self, patch: ProductPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(code) = patch.code {
            self.code = code;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(thumbnails) = patch.thumbnails {
            self.thumbnails = thumbnails;
        }
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Validated product data without an identifier (input to `create_product`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub code: String,
    pub price: f64,
    pub status: bool,
    pub stock: u64,
    pub category: String,
    pub thumbnails: Vec<String>,
}

/// Raw create payload. Every field is optional so that missing fields are
/// reported as one validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    /// JSON number or numeric string.
    pub price: Option<JsonValue>,
    pub status: Option<bool>,
    pub stock: Option<u64>,
    pub category: Option<String>,
    pub thumbnails: Option<Vec<String>>,
}

impl CreateProductRequest {
    /// Check required fields and apply defaults (`status = true`, no thumbnails).
    pub fn into_draft(self) -> DomainResult<ProductDraft> {
        let mut missing = Vec::new();
        let title = required_text(self.title, "title", &mut missing);
        let description = required_text(self.description, "description", &mut missing);
        let code = required_text(self.code, "code", &mut missing);
        let category = required_text(self.category, "category", &mut missing);
        if self.price.is_none() {
            missing.push("price");
        }
        if self.stock.is_none() {
            missing.push("stock");
        }
        if !missing.is_empty() {
            return Err(DomainError::validation(format!(
                "missing fields: {}",
                missing.join(", ")
            )));
        }

        let price = self
            .price
            .as_ref()
            .and_then(number_from_json)
            .ok_or_else(|| DomainError::validation("price must be a number"))?;
        validate_price(price)?;

        Ok(ProductDraft {
            title,
            description,
            code,
            price,
            status: self.status.unwrap_or(true),
            stock: self.stock.unwrap_or_default(),
            category,
            thumbnails: self.thumbnails.unwrap_or_default(),
        })
    }
}

fn required_text(value: Option<String>, field: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            missing.push(field);
            String::new()
        }
    }
}

fn validate_price(price: f64) -> DomainResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::validation("price must be a non-negative number"));
    }
    Ok(())
}

/// Partial update payload.
///
/// Unknown keys (including `id`) are ignored during deserialization, which is
/// what keeps the identifier immutable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub price: Option<f64>,
    pub status: Option<bool>,
    pub stock: Option<u64>,
    pub category: Option<String>,
    pub thumbnails: Option<Vec<String>>,
}

impl ProductPatch {
    pub fn validate(&self) -> DomainResult<()> {
        for (field, value) in [
            ("title", &self.title),
            ("code", &self.code),
            ("category", &self.category),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(DomainError::validation(format!("{field} must not be empty")));
            }
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }
}

/// Minimal product sent by realtime clients (`addProduct`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuickAddProduct {
    pub title: Option<String>,
    pub price: Option<JsonValue>,
}

impl QuickAddProduct {
    pub const DEFAULT_DESCRIPTION: &'static str = "No description";
    pub const DEFAULT_STOCK: u64 = 10;
    pub const DEFAULT_CATEGORY: &'static str = "general";

    /// Fill in server-side defaults.
    ///
    /// The generated code is `AUTO-<created_at_millis>-<nonce>`. Callers pass a
    /// fresh nonce per call so adds within the same millisecond stay unique.
    pub fn into_draft(self, created_at_millis: i64, nonce: &str) -> DomainResult<ProductDraft> {
        let title = match self.title {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(DomainError::validation("title is required")),
        };
        let price = self
            .price
            .as_ref()
            .and_then(number_from_json)
            .ok_or_else(|| DomainError::validation("price must be a number"))?;
        validate_price(price)?;

        Ok(ProductDraft {
            title,
            description: Self::DEFAULT_DESCRIPTION.to_string(),
            code: format!("AUTO-{created_at_millis}-{nonce}"),
            price,
            status: true,
            stock: Self::DEFAULT_STOCK,
            category: Self::DEFAULT_CATEGORY.to_string(),
            thumbnails: Vec::new(),
        })
    }
}

/// Accept JSON numbers and numeric strings (`"12.5"`), like browsers submit them.
pub fn number_from_json(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}
