//! Request/response shapes that only exist at the HTTP and WebSocket edge.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use storefront_events::Event;
use storefront_products::{CatalogEvent, Product};

// -------------------------
// Request DTOs
// -------------------------

/// `PUT /api/carts/{cid}` body. `products` stays raw so the cart rules
/// produce the validation message.
#[derive(Debug, Default, Deserialize)]
pub struct ReplaceCartRequest {
    #[serde(default)]
    pub products: JsonValue,
}

/// `PUT /api/carts/{cid}/products/{pid}` body.
#[derive(Debug, Default, Deserialize)]
pub struct SetQuantityRequest {
    #[serde(default)]
    pub quantity: JsonValue,
}

/// Ordered `(key, value)` pairs of a raw query string.
pub fn query_pairs(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .into_owned()
            .collect()
    })
    .unwrap_or_default()
}

// -------------------------
// Realtime wire format
// -------------------------

/// Server → client frame: `{"event": "products", "data": [...]}`.
#[derive(Debug, Clone, Serialize)]
pub struct ServerMessage<'a> {
    pub event: &'static str,
    pub data: &'a [Product],
}

impl<'a> ServerMessage<'a> {
    pub fn from_event(event: &'a CatalogEvent) -> Self {
        Self {
            event: event.event_type(),
            data: event.products(),
        }
    }
}

/// Client → server frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    AddProduct(JsonValue),
    DeleteProduct(JsonValue),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_pairs_keep_order_and_decode() {
        let pairs = query_pairs(Some("sort=desc&query=home%20office&limit=5&query=x"));
        assert_eq!(
            pairs,
            vec![
                ("sort".to_string(), "desc".to_string()),
                ("query".to_string(), "home office".to_string()),
                ("limit".to_string(), "5".to_string()),
                ("query".to_string(), "x".to_string()),
            ]
        );
        assert!(query_pairs(None).is_empty());
    }

    #[test]
    fn server_message_shape() {
        let event = CatalogEvent::snapshot(Vec::new());
        let json = serde_json::to_value(ServerMessage::from_event(&event)).unwrap();
        assert_eq!(json, json!({ "event": "products", "data": [] }));
    }

    #[test]
    fn client_messages_parse() {
        let add: ClientMessage =
            serde_json::from_value(json!({ "event": "addProduct", "data": { "title": "Pen", "price": 2 } })).unwrap();
        assert!(matches!(add, ClientMessage::AddProduct(data) if data["title"] == "Pen"));

        let del: ClientMessage =
            serde_json::from_value(json!({ "event": "deleteProduct", "data": "12" })).unwrap();
        assert!(matches!(del, ClientMessage::DeleteProduct(JsonValue::String(id)) if id == "12"));

        assert!(serde_json::from_value::<ClientMessage>(json!({ "event": "dropTables" })).is_err());
    }
}
