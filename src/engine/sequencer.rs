// ============================================================================
// Sequencer
// Single matching thread fed by a command queue
// ============================================================================

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use super::exchange::Exchange;
use crate::domain::{Order, OrderId, OrderOutcome};
use crate::error::{ExchangeError, ExchangeResult};

enum Command {
    Submit {
        order: Order,
        timestamp: u64,
        reply: Sender<ExchangeResult<OrderOutcome>>,
    },
    Cancel {
        order_id: OrderId,
        reply: Sender<ExchangeResult<Order>>,
    },
    Shutdown,
}

/// Runs an [`Exchange`] on its own thread.
///
/// Submissions and cancels from any number of callers are queued and
/// applied one at a time in arrival order. Readers share the exchange
/// through a read lock and always see a fully committed state.
pub struct ExchangeService;

impl ExchangeService {
    pub fn spawn(exchange: Exchange) -> ExchangeResult<ExchangeHandle> {
        let exchange = Arc::new(RwLock::new(exchange));
        let (commands, queue) = channel::unbounded();

        let writer = Arc::clone(&exchange);
        let worker = thread::Builder::new()
            .name("exchange-sequencer".to_string())
            .spawn(move || run(writer, queue))
            .map_err(|e| ExchangeError::invariant(format!("failed to start sequencer: {}", e)))?;

        info!("exchange sequencer started");
        Ok(ExchangeHandle {
            commands,
            exchange,
            worker: Arc::new(Mutex::new(Some(worker))),
        })
    }
}

fn run(exchange: Arc<RwLock<Exchange>>, queue: Receiver<Command>) {
    for command in queue.iter() {
        match command {
            Command::Submit {
                order,
                timestamp,
                reply,
            } => {
                let result = exchange.write().submit_order(order, timestamp);
                // Caller may have given up waiting
                let _ = reply.send(result);
            },
            Command::Cancel { order_id, reply } => {
                let result = exchange.write().cancel_order(order_id);
                let _ = reply.send(result);
            },
            Command::Shutdown => {
                debug!("sequencer received shutdown");
                break;
            },
        }
    }
    info!("exchange sequencer stopped");
}

/// Cloneable client for an [`ExchangeService`]
#[derive(Clone)]
pub struct ExchangeHandle {
    commands: Sender<Command>,
    exchange: Arc<RwLock<Exchange>>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ExchangeHandle {
    /// Queue an order and wait for its outcome
    pub fn submit(&self, order: Order, timestamp: u64) -> ExchangeResult<OrderOutcome> {
        let (reply, response) = channel::bounded(1);
        self.send(Command::Submit {
            order,
            timestamp,
            reply,
        })?;
        response.recv().map_err(|_| ExchangeError::ServiceStopped)?
    }

    /// Queue a cancel and wait for the removed order
    pub fn cancel(&self, order_id: OrderId) -> ExchangeResult<Order> {
        let (reply, response) = channel::bounded(1);
        self.send(Command::Cancel { order_id, reply })?;
        response.recv().map_err(|_| ExchangeError::ServiceStopped)?
    }

    /// Run a read against the current committed state
    pub fn with_exchange<R>(&self, f: impl FnOnce(&Exchange) -> R) -> R {
        f(&self.exchange.read())
    }

    /// Stop accepting commands once everything already queued has run,
    /// then wait for the matching thread to exit.
    pub fn shutdown(&self) -> ExchangeResult<()> {
        let worker = self.worker.lock().take();
        let Some(worker) = worker else {
            return Ok(());
        };

        self.send(Command::Shutdown)?;
        worker
            .join()
            .map_err(|_| ExchangeError::invariant("sequencer thread panicked"))
    }

    fn send(&self, command: Command) -> ExchangeResult<()> {
        self.commands
            .send(command)
            .map_err(|_| ExchangeError::ServiceStopped)
    }
}
