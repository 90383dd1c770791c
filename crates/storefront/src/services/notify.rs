//! Order notification webhook.
//!
//! New orders are pushed onto a bounded queue and posted to the configured
//! spreadsheet webhook by a background task. Enqueueing never waits: when the
//! queue is full the notification is dropped and logged. Delivery is
//! attempted once; failures are logged and otherwise ignored.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rhema_core::{BookId, NewOrder, OrderId, OrderStatus};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// Errors delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Webhook answered with a non-success status.
    #[error("webhook returned status {0}")]
    Status(u16),
}

/// Denormalized order summary posted to the webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWebhookPayload {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: OrderStatus,
    pub items: Vec<WebhookItem>,
    /// RFC 3339
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookItem {
    pub id: Option<BookId>,
    pub title: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl OrderWebhookPayload {
    #[must_use]
    pub fn from_order(order: &NewOrder, date: DateTime<Utc>) -> Self {
        Self {
            id: order.id,
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            customer_phone: order.customer_phone.clone(),
            amount: order.amount.amount(),
            status: order.status,
            items: order
                .items
                .iter()
                .map(|item| WebhookItem {
                    id: item.book_id,
                    title: item.title.clone(),
                    quantity: item.quantity,
                    price: item.price.amount(),
                })
                .collect(),
            date: date.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// One queued delivery.
#[derive(Debug, Clone)]
pub struct OrderNotification {
    pub url: String,
    pub payload: OrderWebhookPayload,
}

/// Delivers notifications.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn deliver(&self, notification: &OrderNotification) -> Result<(), NotifyError>;
}

/// Posts notifications as JSON.
#[derive(Clone)]
pub struct HttpWebhookSink {
    client: reqwest::Client,
}

impl HttpWebhookSink {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookSink for HttpWebhookSink {
    async fn deliver(&self, notification: &OrderNotification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&notification.url)
            .json(&notification.payload)
            .send()
            .await?;
        let status = response.status();
        // Apps Script webhooks answer with a redirect to the result page.
        if status.is_success() || status.is_redirection() {
            Ok(())
        } else {
            Err(NotifyError::Status(status.as_u16()))
        }
    }
}

/// Handle for queueing order notifications.
#[derive(Clone)]
pub struct OrderNotifier {
    tx: mpsc::Sender<OrderNotification>,
}

impl OrderNotifier {
    /// Start the delivery task with a queue of `capacity` notifications.
    #[must_use]
    pub fn spawn(capacity: usize, sink: Arc<dyn WebhookSink>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_delivery(rx, sink));
        (Self { tx }, handle)
    }

    /// Queue a notification without waiting.
    ///
    /// Returns `false` if it was dropped.
    #[instrument(skip(self, notification), fields(order_id = %notification.payload.id))]
    pub fn notify(&self, notification: OrderNotification) -> bool {
        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Order notification queue full, dropping notification");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Order notification worker stopped, dropping notification");
                false
            }
        }
    }
}

async fn run_delivery(mut rx: mpsc::Receiver<OrderNotification>, sink: Arc<dyn WebhookSink>) {
    while let Some(notification) = rx.recv().await {
        match sink.deliver(&notification).await {
            Ok(()) => debug!(order_id = %notification.payload.id, "Order notification delivered"),
            Err(error) => warn!(
                order_id = %notification.payload.id,
                error = %error,
                "Order notification failed"
            ),
        }
    }
}
