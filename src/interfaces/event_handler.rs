// ============================================================================
// Event Handler Interface
// Defines the contract for handling order and trade events
// ============================================================================

use crate::domain::{OrderId, Side, Trade, TraderId};
use crate::error::RejectReason;
use crate::numeric::{Price, Quantity};
use chrono::{DateTime, Utc};
use crossbeam::channel::Sender;
use parking_lot::Mutex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Events emitted by the exchange once a submission or cancel has committed
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderEvent {
    /// Order passed validation
    OrderAccepted {
        order_id: OrderId,
        trader_id: TraderId,
        timestamp: DateTime<Utc>,
    },

    /// Order rejected with reason; nothing else changed
    OrderRejected {
        order_id: OrderId,
        trader_id: TraderId,
        reason: RejectReason,
        timestamp: DateTime<Utc>,
    },

    /// Order matched, trade generated and settled
    TradeExecuted {
        trade: Trade,
        timestamp: DateTime<Utc>,
    },

    /// Order (or its remainder) added to the book
    OrderRested {
        order_id: OrderId,
        side: Side,
        price: Price,
        remaining: Quantity,
        timestamp: DateTime<Utc>,
    },

    /// Order fully filled, incoming or resting
    OrderFilled {
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },

    /// Resting order cancelled
    OrderCancelled {
        order_id: OrderId,
        remaining: Quantity,
        timestamp: DateTime<Utc>,
    },
}

/// Event handler trait for processing exchange events
/// Implementations can handle logging, metrics, notifications, etc.
///
/// Handlers run on the matching thread and must not block.
pub trait EventHandler: Send + Sync {
    /// Handle an order event
    fn on_event(&self, event: OrderEvent);

    /// Batch event handler (optional optimization)
    fn on_events(&self, events: Vec<OrderEvent>) {
        for event in events {
            self.on_event(event);
        }
    }
}

/// No-op event handler for testing
pub struct NoOpEventHandler;

impl EventHandler for NoOpEventHandler {
    fn on_event(&self, _event: OrderEvent) {
        // Do nothing
    }
}

/// Logging event handler
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn on_event(&self, event: OrderEvent) {
        tracing::debug!("Exchange event: {:?}", event);
    }
}

/// Forwards events to a consumer on another thread.
///
/// Sending never blocks; events are dropped once the receiver is gone.
pub struct ChannelEventHandler {
    sender: Sender<OrderEvent>,
}

impl ChannelEventHandler {
    pub fn new(sender: Sender<OrderEvent>) -> Self {
        Self { sender }
    }
}

impl EventHandler for ChannelEventHandler {
    fn on_event(&self, event: OrderEvent) {
        if self.sender.try_send(event).is_err() {
            tracing::trace!("event receiver unavailable, dropping event");
        }
    }
}

/// Keeps every event in memory
#[derive(Default)]
pub struct RecordingEventHandler {
    events: Mutex<Vec<OrderEvent>>,
}

impl RecordingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OrderEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<OrderEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventHandler for RecordingEventHandler {
    fn on_event(&self, event: OrderEvent) {
        self.events.lock().push(event);
    }

    fn on_events(&self, events: Vec<OrderEvent>) {
        self.events.lock().extend(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cancelled() -> OrderEvent {
        OrderEvent::OrderCancelled {
            order_id: OrderId::new(),
            remaining: 5,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_noop_handler() {
        let handler = NoOpEventHandler;
        handler.on_event(cancelled());
        // Should not panic
    }

    #[test]
    fn test_recording_handler() {
        let handler = RecordingEventHandler::new();
        handler.on_events(vec![cancelled(), cancelled()]);
        assert_eq!(handler.len(), 2);
        assert_eq!(handler.take().len(), 2);
        assert!(handler.is_empty());
    }

    #[test]
    fn test_channel_handler() {
        let (tx, rx) = crossbeam::channel::unbounded();
        let handler = ChannelEventHandler::new(tx);
        handler.on_event(cancelled());
        assert!(matches!(rx.try_recv(), Ok(OrderEvent::OrderCancelled { .. })));

        drop(rx);
        // Receiver gone: dropped silently
        handler.on_event(cancelled());
    }
}
