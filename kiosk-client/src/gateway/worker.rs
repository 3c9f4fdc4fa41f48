//! Gateway connection worker
//!
//! Owns the WebSocket connection lifecycle: connect, hello, outbox flush,
//! frame pumping, keepalive, reconnect with capped jittered backoff.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rand::Rng;
use shared::WireMessage;
use tokio::net::TcpStream;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

/// Reconnect backoff base
const RECONNECT_BASE_MS: u64 = 500;
/// Reconnect backoff cap
const RECONNECT_MAX_MS: u64 = 30_000;
/// Connect attempt timeout
const CONNECT_TIMEOUT_SECS: u64 = 10;
/// Keepalive ping interval
const PING_INTERVAL_SECS: u64 = 30;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a session ended
enum SessionEnd {
    /// Connection lost, reconnect
    Retry,
    /// Shutdown requested, stop the worker
    Shutdown,
}

pub(crate) struct GatewayWorker {
    url: String,
    branch_id: String,
    cmd_rx: mpsc::UnboundedReceiver<WireMessage>,
    event_tx: broadcast::Sender<WireMessage>,
    nudge: Arc<Notify>,
    shutdown: CancellationToken,
    /// Messages that could not be delivered mid-session, replayed FIFO
    /// ahead of fresh traffic on the next connect.
    outbox: VecDeque<WireMessage>,
}

impl GatewayWorker {
    pub(crate) fn new(
        url: String,
        branch_id: String,
        cmd_rx: mpsc::UnboundedReceiver<WireMessage>,
        event_tx: broadcast::Sender<WireMessage>,
        nudge: Arc<Notify>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            url,
            branch_id,
            cmd_rx,
            event_tx,
            nudge,
            shutdown,
            outbox: VecDeque::new(),
        }
    }

    /// Main run loop — connect, run a session, reconnect on failure
    pub(crate) async fn run(mut self) {
        tracing::info!(url = %self.url, "Gateway worker started");
        let mut attempt: u32 = 0;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let connect = tokio::time::timeout(
                Duration::from_secs(CONNECT_TIMEOUT_SECS),
                connect_async(self.url.as_str()),
            );
            match connect.await {
                Ok(Ok((ws, _))) => {
                    tracing::info!("Gateway connected");
                    attempt = 0;
                    if let SessionEnd::Shutdown = self.run_session(ws).await {
                        break;
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Gateway connect failed");
                }
                Err(_) => {
                    tracing::warn!("Gateway connect timed out");
                }
            }

            let delay = Duration::from_millis(jittered_backoff_ms(attempt));
            attempt = attempt.saturating_add(1);
            tracing::debug!(delay_ms = delay.as_millis() as u64, attempt, "Gateway reconnect scheduled");

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.nudge.notified() => {
                    // Connectivity regained — retry immediately, reset backoff
                    attempt = 0;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!("Gateway worker stopped");
    }

    /// Run a single session until disconnect or shutdown
    async fn run_session(&mut self, ws: WsStream) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();

        // Announce the controller, then flush queued traffic FIFO
        let hello = WireMessage::controller_hello(&self.branch_id);
        if send_frame(&mut sink, &hello).await.is_err() {
            return SessionEnd::Retry;
        }
        while let Some(msg) = self.outbox.pop_front() {
            if send_frame(&mut sink, &msg).await.is_err() {
                self.outbox.push_front(msg);
                return SessionEnd::Retry;
            }
        }

        let mut ping_interval = tokio::time::interval(Duration::from_secs(PING_INTERVAL_SECS));
        ping_interval.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = sink.close().await;
                    return SessionEnd::Shutdown;
                }

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(msg) => {
                            if send_frame(&mut sink, &msg).await.is_err() {
                                // Keep it for the next session
                                self.outbox.push_back(msg);
                                return SessionEnd::Retry;
                            }
                        }
                        // All handles dropped
                        None => {
                            let _ = sink.close().await;
                            return SessionEnd::Shutdown;
                        }
                    }
                }

                _ = ping_interval.tick() => {
                    if sink.send(Message::Ping(Vec::new())).await.is_err() {
                        tracing::warn!("Gateway ping failed, reconnecting");
                        return SessionEnd::Retry;
                    }
                }

                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(msg) = WireMessage::parse(&text) {
                                // No subscribers is fine
                                let _ = self.event_tx.send(msg);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = sink.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Gateway closed by peer");
                            return SessionEnd::Retry;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Gateway stream error");
                            return SessionEnd::Retry;
                        }
                        None => {
                            tracing::info!("Gateway stream ended");
                            return SessionEnd::Retry;
                        }
                        _ => {} // Binary, Pong — ignore
                    }
                }
            }
        }
    }
}

/// Serialize and send one frame. Serialization failures are logged and the
/// message dropped (fire-and-forget); transport failures end the session.
async fn send_frame<S>(sink: &mut S, msg: &WireMessage) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = match msg.to_json() {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode gateway frame");
            return Ok(());
        }
    };
    match sink.send(Message::Text(text)).await {
        Ok(()) => {
            tracing::debug!(frame = ?msg, "Gateway >>>");
            Ok(())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Gateway send failed");
            Err(())
        }
    }
}

/// Exponential backoff with jitter in [0.5, 1.0), capped
fn jittered_backoff_ms(attempt: u32) -> u64 {
    let jitter = rand::thread_rng().gen_range(0.5..1.0);
    (backoff_ceiling_ms(attempt) as f64 * jitter) as u64
}

/// Backoff ceiling before jitter: base * 2^attempt, capped
fn backoff_ceiling_ms(attempt: u32) -> u64 {
    RECONNECT_BASE_MS
        .saturating_mul(1u64 << attempt.min(16))
        .min(RECONNECT_MAX_MS)
}
