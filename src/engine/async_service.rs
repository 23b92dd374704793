// ============================================================================
// Async Service
// Single-writer exchange loop as a tokio task
// ============================================================================

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

use super::exchange::Exchange;
use crate::domain::{Order, OrderId, OrderOutcome};
use crate::error::{ExchangeError, ExchangeResult};
use crate::numeric::Cash;

const QUEUE_DEPTH: usize = 1024;

enum Request {
    Submit {
        order: Order,
        timestamp: u64,
        reply: oneshot::Sender<ExchangeResult<OrderOutcome>>,
    },
    Cancel {
        order_id: OrderId,
        reply: oneshot::Sender<ExchangeResult<Order>>,
    },
    TotalFees {
        reply: oneshot::Sender<Cash>,
    },
}

/// Move the exchange into a task that owns it exclusively. Must be called
/// from within a tokio runtime.
///
/// The task ends once every handle has been dropped.
pub fn spawn(exchange: Exchange) -> (AsyncExchangeHandle, JoinHandle<()>) {
    let (requests, inbox) = mpsc::channel(QUEUE_DEPTH);
    let task = tokio::spawn(run(exchange, inbox));
    info!("async exchange task started");
    (AsyncExchangeHandle { requests }, task)
}

async fn run(mut exchange: Exchange, mut inbox: mpsc::Receiver<Request>) {
    while let Some(request) = inbox.recv().await {
        match request {
            Request::Submit {
                order,
                timestamp,
                reply,
            } => {
                let _ = reply.send(exchange.submit_order(order, timestamp));
            },
            Request::Cancel { order_id, reply } => {
                let _ = reply.send(exchange.cancel_order(order_id));
            },
            Request::TotalFees { reply } => {
                let _ = reply.send(exchange.get_total_fees());
            },
        }
    }
    info!("async exchange task stopped");
}

#[derive(Clone)]
pub struct AsyncExchangeHandle {
    requests: mpsc::Sender<Request>,
}

impl AsyncExchangeHandle {
    pub async fn submit(&self, order: Order, timestamp: u64) -> ExchangeResult<OrderOutcome> {
        let (reply, response) = oneshot::channel();
        self.send(Request::Submit {
            order,
            timestamp,
            reply,
        })
        .await?;
        response.await.map_err(|_| ExchangeError::ServiceStopped)?
    }

    pub async fn cancel(&self, order_id: OrderId) -> ExchangeResult<Order> {
        let (reply, response) = oneshot::channel();
        self.send(Request::Cancel { order_id, reply }).await?;
        response.await.map_err(|_| ExchangeError::ServiceStopped)?
    }

    pub async fn total_fees(&self) -> ExchangeResult<Cash> {
        let (reply, response) = oneshot::channel();
        self.send(Request::TotalFees { reply }).await?;
        response.await.map_err(|_| ExchangeError::ServiceStopped)
    }

    async fn send(&self, request: Request) -> ExchangeResult<()> {
        self.requests
            .send(request)
            .await
            .map_err(|_| ExchangeError::ServiceStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::factory::ExchangeBuilder;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_async_round_trip() {
        let exchange = ExchangeBuilder::new()
            .with_flat_fee_bps(Decimal::from(10))
            .list_security("XYZ")
            .open_account("a", 100_000)
            .open_account("b", 0)
            .with_position("b", "XYZ", 10)
            .build()
            .unwrap();
        let (handle, task) = spawn(exchange);

        handle.submit(Order::bid("a", "XYZ", 10, 500), 1).await.unwrap();
        let outcome = handle.submit(Order::ask("b", "XYZ", 10, 500), 2).await.unwrap();
        assert_eq!(outcome.resulting_trades.len(), 1);
        assert_eq!(handle.total_fees().await.unwrap(), 10);

        let missing = OrderId::new();
        assert_eq!(
            handle.cancel(missing).await.unwrap_err(),
            ExchangeError::OrderNotFound(missing)
        );

        drop(handle);
        task.await.unwrap();
    }
}
