use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{Order, OrderStatus};

/// OrderEvent
///
/// Emitted whenever an order changes status. Carries ids only, no personal data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEvent {
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub store_id: Uuid,
    pub status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

impl From<&Order> for OrderEvent {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            customer_id: order.customer_id,
            store_id: order.store_id,
            status: order.status,
            occurred_at: order.updated_at,
        }
    }
}

/// Notifier
///
/// Outbound notification contract (email/SMS delivery lives outside this service).
/// Delivery is best effort: implementations log failures and never fail the request.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_status_changed(&self, event: &OrderEvent);
}

pub type NotifierState = Arc<dyn Notifier>;

/// Writes events to the log only.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_status_changed(&self, event: &OrderEvent) {
        tracing::info!(
            order_id = %event.order_id,
            customer_id = %event.customer_id,
            status = ?event.status,
            "order status changed"
        );
    }
}

/// POSTs each event as JSON to a configured endpoint.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn order_status_changed(&self, event: &OrderEvent) {
        let result = self.client.post(&self.url).json(event).send().await;
        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(order_id = %event.order_id, "order event delivered");
            }
            Ok(response) => {
                tracing::warn!(
                    order_id = %event.order_id,
                    status = %response.status(),
                    "order event rejected by webhook"
                );
            }
            Err(e) => {
                tracing::warn!(order_id = %event.order_id, "order event delivery failed: {:?}", e);
            }
        }
    }
}

/// MemoryNotifier
///
/// Records events in memory so tests can assert on what would have been sent.
#[derive(Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<OrderEvent>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<OrderEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn order_status_changed(&self, event: &OrderEvent) {
        self.events.lock().await.push(event.clone());
    }
}
