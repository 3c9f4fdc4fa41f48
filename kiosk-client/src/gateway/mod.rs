//! Event gateway to the venue hub
//!
//! A thin send/receive wrapper over the hub's WebSocket channel. Outbound
//! commands are queued while the channel is down and flushed FIFO on
//! (re)connect; there is no acknowledgment or retry beyond that, so a
//! command can still be lost if the remote peer itself is unreachable.
//! Reconnection uses capped exponential backoff with jitter, and `nudge()`
//! lets the embedding application force an immediate retry when
//! connectivity is known to have returned (network online, display woken).

mod worker;

use std::sync::Arc;

use shared::WireMessage;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::api::CommandSink;
use crate::{ClientConfig, GatewayError};
use worker::GatewayWorker;

/// Inbound event fan-out capacity
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Handle to the gateway connection worker
#[derive(Debug, Clone)]
pub struct Gateway {
    cmd_tx: mpsc::UnboundedSender<WireMessage>,
    event_tx: broadcast::Sender<WireMessage>,
    nudge: Arc<Notify>,
    shutdown: CancellationToken,
}

impl Gateway {
    /// Spawn the connection worker and return its handle.
    ///
    /// The worker connects lazily in the background; `send` can be called
    /// immediately and queues until the channel opens.
    pub fn connect(config: &ClientConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let nudge = Arc::new(Notify::new());
        let shutdown = CancellationToken::new();

        let gateway_worker = GatewayWorker::new(
            config.gateway_url.clone(),
            config.branch_id.clone(),
            cmd_rx,
            event_tx.clone(),
            nudge.clone(),
            shutdown.clone(),
        );
        tokio::spawn(gateway_worker.run());

        Self {
            cmd_tx,
            event_tx,
            nudge,
            shutdown,
        }
    }

    /// Queue a message for delivery. Never blocks.
    pub fn enqueue(&self, msg: WireMessage) -> Result<(), GatewayError> {
        if self.shutdown.is_cancelled() {
            return Err(GatewayError::Closed);
        }
        self.cmd_tx.send(msg).map_err(|_| GatewayError::Closed)
    }

    /// Subscribe to inbound hub messages
    pub fn subscribe(&self) -> broadcast::Receiver<WireMessage> {
        self.event_tx.subscribe()
    }

    /// Ask the worker to retry connecting right now, skipping any backoff
    /// sleep in progress. No-op while connected.
    pub fn nudge(&self) {
        self.nudge.notify_one();
    }

    /// Close the channel. Queued outbound messages are dropped and further
    /// sends fail with `GatewayError::Closed`.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[async_trait::async_trait]
impl CommandSink for Gateway {
    async fn send(&self, msg: WireMessage) -> Result<(), GatewayError> {
        self.enqueue(msg)
    }
}
