//! Realtime catalog channel over WebSocket.
//!
//! Frames are JSON text `{"event", "data"}`. The server pushes `products` (the
//! full snapshot) on connect and after every catalog mutation; clients may send
//! `addProduct` and `deleteProduct`. Bad client frames are logged and dropped,
//! never answered with an error.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::IntoResponse,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use storefront_core::ProductId;
use storefront_products::{CatalogEvent, QuickAddProduct};

use crate::app::dto::{ClientMessage, ServerMessage};
use crate::app::services::AppServices;

/// GET /ws: upgrade to WebSocket
pub async fn upgrade(
    Extension(services): Extension<Arc<AppServices>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, services))
}

async fn handle_socket(socket: WebSocket, services: Arc<AppServices>) {
    // Subscribe before loading the first snapshot so no mutation falls in between.
    let mut updates = services.notifier().subscribe();
    let (mut sink, mut stream) = socket.split();
    info!("realtime peer connected");

    match services.notifier().snapshot().await {
        Ok(event) => {
            if send_event(&mut sink, &event).await.is_err() {
                debug!("realtime peer left before initial snapshot");
                return;
            }
        }
        Err(err) => warn!(error = %err, "failed to load initial snapshot"),
    }

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => handle_client_frame(&services, &text).await,
                Some(Ok(Message::Ping(data))) => {
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(err)) => {
                    warn!(error = %err, "realtime socket error");
                    break;
                }
                Some(Ok(_)) => {} // Binary, Pong
            },
            update = updates.recv() => match update {
                Some(event) => {
                    if send_event(&mut sink, &event).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    info!("realtime peer disconnected");
}

async fn send_event(
    sink: &mut SplitSink<WebSocket, Message>,
    event: &CatalogEvent,
) -> Result<(), axum::Error> {
    match serde_json::to_string(&ServerMessage::from_event(event)) {
        Ok(json) => sink.send(Message::Text(json)).await,
        Err(err) => {
            warn!(error = %err, "failed to encode catalog snapshot");
            Ok(())
        }
    }
}

async fn handle_client_frame(services: &AppServices, text: &str) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            debug!(error = %err, "ignoring unrecognised realtime frame");
            return;
        }
    };

    match message {
        ClientMessage::AddProduct(data) => {
            let request: QuickAddProduct = match serde_json::from_value(data) {
                Ok(request) => request,
                Err(err) => {
                    debug!(error = %err, "ignoring malformed addProduct payload");
                    return;
                }
            };
            if let Err(err) = services.catalog.quick_add(request).await {
                warn!(error = %err, "addProduct dropped");
            }
        }
        ClientMessage::DeleteProduct(data) => {
            let id = match data {
                JsonValue::String(id) if !id.trim().is_empty() => id,
                JsonValue::Number(n) => n.to_string(),
                _ => {
                    debug!("ignoring deleteProduct without id");
                    return;
                }
            };
            if let Err(err) = services.catalog.delete_product(&ProductId::new(id)).await {
                warn!(error = %err, "deleteProduct dropped");
            }
        }
    }
}
