//! # Alert Dispatch Seam
//!
//! Hands post-commit [`AlertEvent`]s off to whatever notification
//! dispatcher the deployment wires up (status bar, email digest, ...).
//!
//! ## Delivery Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Alert Dispatch                                   │
//! │                                                                         │
//! │  CheckoutEngine ── COMMIT ──► evaluate rules ──► AlertSink::send_all    │
//! │                                                       │                 │
//! │                                       unbounded mpsc  │  never blocks   │
//! │                                                       ▼                 │
//! │                                              consumer task (external)   │
//! │                                                                         │
//! │  Fire-and-forget: a closed or missing consumer is logged and            │
//! │  otherwise ignored. The committed sale is already durable; alert        │
//! │  delivery can never fail it.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use keel_core::AlertEvent;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Fire-and-forget sender for post-commit alert events.
///
/// Cloneable; every stock-mutating path in the engine shares one sink.
#[derive(Debug, Clone)]
pub struct AlertSink {
    tx: Option<mpsc::UnboundedSender<AlertEvent>>,
}

impl AlertSink {
    /// Creates a sink and the receiver a dispatcher task should drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AlertEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (AlertSink { tx: Some(tx) }, rx)
    }

    /// Creates a sink that drops every event.
    ///
    /// For deployments and tests that don't consume alerts.
    pub fn disabled() -> Self {
        AlertSink { tx: None }
    }

    /// Sends one event. Never blocks and never returns an error.
    pub fn send(&self, event: AlertEvent) {
        let Some(tx) = &self.tx else {
            debug!("Alert sink disabled, dropping event");
            return;
        };

        if let Err(e) = tx.send(event) {
            // Receiver dropped; the operation that produced the event
            // is already committed, so this is log-and-continue.
            warn!(event = ?e.0, "Alert consumer gone, dropping event");
        }
    }

    /// Sends a batch of events produced by one committed operation.
    pub fn send_all(&self, events: Vec<AlertEvent>) {
        for event in events {
            self.send(event);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use keel_core::LowStockAlert;

    fn event(sku: &str) -> AlertEvent {
        AlertEvent::LowStock(LowStockAlert {
            sku: sku.to_string(),
            name: "Test".to_string(),
            stock: 1,
            threshold: 25,
            supplier_contact: None,
            occurred_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (sink, mut rx) = AlertSink::channel();

        sink.send_all(vec![event("A"), event("B")]);

        match rx.recv().await.unwrap() {
            AlertEvent::LowStock(a) => assert_eq!(a.sku, "A"),
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.recv().await.unwrap() {
            AlertEvent::LowStock(a) => assert_eq!(a.sku, "B"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_closed_receiver_does_not_panic() {
        let (sink, rx) = AlertSink::channel();
        drop(rx);

        sink.send(event("A"));
    }

    #[test]
    fn test_disabled_sink_drops_silently() {
        let sink = AlertSink::disabled();
        sink.send(event("A"));
    }
}
