//! Event feed lifecycle: connect, heartbeat, reconnect
//!
//! This module owns the single logical subscription to the cluster change
//! feed. The state machine lives in [`EventFeed`]; the wire transport hides
//! behind [`FeedTransport`] so the retry and heartbeat logic is testable
//! without a real network.

mod socket;

#[cfg(test)]
mod tests;

pub use socket::WsTransport;

use crate::models::WatchEvent;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// Keepalive frame sent on the heartbeat interval
const PING_FRAME: &str = r#"{"type":"ping"}"#;

/// Configuration for the event feed connection
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Feed endpoint URL (e.g. "ws://observatory-backend:8000/ws")
    pub url: String,
    /// Fixed delay before reconnecting after a lost connection
    pub reconnect_delay: Duration,
    /// Interval between outbound keepalive frames
    pub heartbeat_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".to_string(),
            reconnect_delay: Duration::from_millis(3000),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

/// Lifecycle state of the logical subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

/// What the feed reports to its consumer
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Connected,
    Disconnected,
    Event(WatchEvent),
    /// Diagnostic only; recovery always goes through the reconnect path.
    TransportError(String),
}

/// Dials the feed endpoint
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn FeedConnection>>;
}

/// One physical connection to the feed
#[async_trait]
pub trait FeedConnection: Send {
    /// Next inbound text frame; `None` means the peer closed the connection.
    async fn next_frame(&mut self) -> Option<Result<String>>;
    async fn send_text(&mut self, text: String) -> Result<()>;
    async fn close(&mut self);
}

/// The single logical subscription to the cluster change feed
///
/// `open` starts the connection loop (idempotent); `close` permanently
/// disables reconnection and is the only path to [`FeedState::Closed`].
pub struct EventFeed {
    config: FeedConfig,
    transport: Arc<dyn FeedTransport>,
    events: EventSink,
    state: Arc<watch::Sender<FeedState>>,
    state_rx: watch::Receiver<FeedState>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    opened: AtomicBool,
    closed: Arc<AtomicBool>,
}

impl EventFeed {
    /// Create the feed and the receiver its events are delivered on.
    pub fn new(
        config: FeedConfig,
        transport: Arc<dyn FeedTransport>,
    ) -> (Self, mpsc::UnboundedReceiver<FeedEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(FeedState::Idle);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let closed = Arc::new(AtomicBool::new(false));

        let feed = Self {
            config,
            transport,
            events: EventSink {
                tx: events_tx,
                closed: Arc::clone(&closed),
            },
            state: Arc::new(state_tx),
            state_rx,
            shutdown_tx,
            shutdown_rx,
            opened: AtomicBool::new(false),
            closed,
        };
        (feed, events_rx)
    }

    /// Start the connection loop.
    ///
    /// At most one physical connection is active at a time; calling `open`
    /// again while the loop is running, or after `close`, is a no-op.
    pub fn open(&self) {
        if self.closed.load(Ordering::SeqCst) {
            debug!("event feed is closed, not opening");
            return;
        }
        if self.opened.swap(true, Ordering::SeqCst) {
            debug!("event feed connection already in progress");
            return;
        }

        let worker = FeedWorker {
            config: self.config.clone(),
            transport: Arc::clone(&self.transport),
            events: self.events.clone(),
            state: Arc::clone(&self.state),
            shutdown: self.shutdown_rx.clone(),
            closed: Arc::clone(&self.closed),
        };
        tokio::spawn(worker.run());
    }

    /// Permanently tear down the subscription.
    ///
    /// Cancels a pending reconnect timer, closes a live connection, and
    /// suppresses any event delivery from this point on. Safe to call from
    /// any state, any number of times.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(true);
        let _ = self.state.send(FeedState::Closed);
    }

    pub fn state(&self) -> FeedState {
        *self.state_rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == FeedState::Open
    }
}

/// Event sender that goes quiet once the feed is closed
#[derive(Clone)]
struct EventSink {
    tx: mpsc::UnboundedSender<FeedEvent>,
    closed: Arc<AtomicBool>,
}

impl EventSink {
    fn emit(&self, event: FeedEvent) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(event);
    }
}

/// The connection loop: one worker task per feed
struct FeedWorker {
    config: FeedConfig,
    transport: Arc<dyn FeedTransport>,
    events: EventSink,
    state: Arc<watch::Sender<FeedState>>,
    shutdown: watch::Receiver<bool>,
    closed: Arc<AtomicBool>,
}

impl FeedWorker {
    async fn run(mut self) {
        loop {
            self.set_state(FeedState::Connecting);

            let conn = tokio::select! {
                _ = self.shutdown.changed() => return,
                conn = self.transport.connect(&self.config.url) => conn,
            };

            match conn {
                Ok(conn) => {
                    self.set_state(FeedState::Open);
                    self.events.emit(FeedEvent::Connected);

                    if self.serve_connection(conn).await {
                        return;
                    }
                    self.events.emit(FeedEvent::Disconnected);
                }
                Err(error) => {
                    warn!(error = %error, url = %self.config.url, "event feed connect failed");
                    self.events.emit(FeedEvent::TransportError(error.to_string()));
                }
            }

            self.set_state(FeedState::Reconnecting);
            tokio::select! {
                _ = self.shutdown.changed() => return,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
    }

    /// Pump one connection until it drops. Returns true on deliberate close.
    async fn serve_connection(&mut self, mut conn: Box<dyn FeedConnection>) -> bool {
        let mut heartbeat = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    conn.close().await;
                    return true;
                }
                _ = heartbeat.tick() => {
                    // A failed heartbeat is not a separate signal; the dead
                    // connection surfaces through the read side.
                    if let Err(error) = conn.send_text(PING_FRAME.to_string()).await {
                        debug!(error = %error, "heartbeat send failed");
                    }
                }
                frame = conn.next_frame() => match frame {
                    None => return false,
                    Some(Err(error)) => {
                        warn!(error = %error, "event feed transport error");
                        self.events.emit(FeedEvent::TransportError(error.to_string()));
                        return false;
                    }
                    Some(Ok(text)) => match serde_json::from_str::<WatchEvent>(&text) {
                        Ok(event) => self.events.emit(FeedEvent::Event(event)),
                        Err(error) => {
                            warn!(error = %error, "dropping malformed feed payload");
                        }
                    },
                },
            }
        }
    }

    fn set_state(&self, state: FeedState) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.state.send(state);
    }
}
