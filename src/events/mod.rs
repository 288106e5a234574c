use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the services after a transaction commits.
///
/// Emission is fire and forget: a full or closed channel is logged and
/// dropped, it never fails the operation that produced the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    DocumentCreated {
        document_id: Uuid,
        document_type: String,
        reference: String,
    },
    DocumentStatusChanged {
        document_id: Uuid,
        document_type: String,
        reference: String,
        old_status: String,
        new_status: String,
    },
    DocumentValidated {
        document_id: Uuid,
        document_type: String,
        reference: String,
        validated_by: Uuid,
        validated_at: DateTime<Utc>,
    },
    StockChanged {
        product_id: Uuid,
        warehouse_id: Uuid,
        location_id: Uuid,
        quantity_delta: Decimal,
        on_hand: Decimal,
        reference: String,
    },
    LowStock {
        product_id: Uuid,
        warehouse_id: Uuid,
        location_id: Uuid,
        on_hand: Decimal,
        threshold: Decimal,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::DocumentCreated { .. } => "document_created",
            Event::DocumentStatusChanged { .. } => "document_status_changed",
            Event::DocumentValidated { .. } => "document_validated",
            Event::StockChanged { .. } => "stock_changed",
            Event::LowStock { .. } => "low_stock",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Queues an event without waiting. A lagging or shut-down consumer
    /// must not stall stock operations, so errors are logged and swallowed.
    pub fn emit(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("dropping event, channel unavailable: {}", e);
        }
    }
}

/// Creates the event channel pair used at startup.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Consumes events from the services and fans them out to broadcast
/// subscribers (websocket sessions, log sinks). Runs until every
/// `EventSender` clone is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, fanout: broadcast::Sender<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::DocumentCreated {
                document_type,
                reference,
                ..
            } => {
                info!(document_type, reference, "document created");
            }
            Event::DocumentStatusChanged {
                reference,
                old_status,
                new_status,
                ..
            } => {
                info!(reference, old_status, new_status, "document status changed");
            }
            Event::DocumentValidated {
                document_type,
                reference,
                validated_by,
                ..
            } => {
                info!(
                    document_type,
                    reference,
                    %validated_by,
                    "document validated"
                );
            }
            Event::StockChanged {
                product_id,
                location_id,
                quantity_delta,
                on_hand,
                reference,
                ..
            } => {
                info!(
                    %product_id,
                    %location_id,
                    %quantity_delta,
                    %on_hand,
                    reference,
                    "stock changed"
                );
            }
            Event::LowStock {
                product_id,
                location_id,
                on_hand,
                threshold,
                ..
            } => {
                warn!(
                    %product_id,
                    %location_id,
                    %on_hand,
                    %threshold,
                    "stock below threshold"
                );
            }
        }

        // Receiver count can be zero when no session is connected.
        let _ = fanout.send(event);
    }

    warn!("event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn emit_is_fire_and_forget_when_channel_is_full() {
        let (sender, _rx) = channel(1);
        let event = Event::DocumentCreated {
            document_id: Uuid::new_v4(),
            document_type: "receipt".into(),
            reference: "WH/IN/0001".into(),
        };
        sender.emit(event.clone());
        // Channel is now full; a second emit must not block or panic.
        sender.emit(event);
    }

    #[tokio::test]
    async fn emit_is_fire_and_forget_when_receiver_is_gone() {
        let (sender, rx) = channel(4);
        drop(rx);
        sender.emit(Event::LowStock {
            product_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            on_hand: dec!(3),
            threshold: dec!(10),
        });
    }

    #[tokio::test]
    async fn process_events_fans_out_to_broadcast_subscribers() {
        let (sender, rx) = channel(4);
        let (fanout, mut sub) = broadcast::channel(4);
        let handle = tokio::spawn(process_events(rx, fanout));

        sender.emit(Event::DocumentCreated {
            document_id: Uuid::new_v4(),
            document_type: "transfer".into(),
            reference: "WH/TR/0007".into(),
        });
        let received = sub.recv().await.unwrap();
        assert_eq!(received.name(), "document_created");

        drop(sender);
        handle.await.unwrap();
    }
}
