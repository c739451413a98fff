//! The reconciliation engine: single writer of cluster state
//!
//! Wires the snapshot source and the event feed into the store. The snapshot
//! fetch and the first feed events may race; both funnel through this one
//! task, so correctness comes from the store's idempotence rules rather than
//! locking.

use crate::feed::FeedEvent;
use crate::models::{EventKind, Node, Pod, WatchEvent};
use crate::notify::Notification;
use crate::observability::ObserverMetrics;
use crate::state::{ClusterStore, Resource};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, info, warn};

/// A point-in-time listing of all current resources
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub pods: Vec<Pod>,
}

/// Where full snapshots come from
///
/// Abstracted from the HTTP client so the engine's reconciliation behavior is
/// testable without a backend.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<Snapshot>;
}

/// The store handle shared with read-only consumers
pub type SharedStore = Arc<RwLock<ClusterStore>>;

/// What the engine surfaces to the presentation layer
pub struct EngineOutputs {
    pub notifications: mpsc::UnboundedReceiver<Notification>,
    pub connected: watch::Receiver<bool>,
}

/// Drives all store mutations from the snapshot source and the event feed
pub struct ClusterEngine {
    store: SharedStore,
    notifications: mpsc::UnboundedSender<Notification>,
    connected: watch::Sender<bool>,
    metrics: ObserverMetrics,
    first_connect: bool,
}

enum Step {
    Snapshot(Result<Snapshot>),
    Feed(Option<FeedEvent>),
}

impl ClusterEngine {
    pub fn new(store: SharedStore) -> (Self, EngineOutputs) {
        let (notifications_tx, notifications_rx) = mpsc::unbounded_channel();
        let (connected_tx, connected_rx) = watch::channel(false);

        (
            Self {
                store,
                notifications: notifications_tx,
                connected: connected_tx,
                metrics: ObserverMetrics::new(),
                first_connect: true,
            },
            EngineOutputs {
                notifications: notifications_rx,
                connected: connected_rx,
            },
        )
    }

    /// Run until the feed event channel closes.
    ///
    /// The initial snapshot is fetched while feed events are already being
    /// applied; a failed initial fetch is a blocking error. Later fetches
    /// (resyncs after a reconnect) are retried on the next reconnect instead.
    pub async fn run<S: SnapshotSource>(
        mut self,
        source: &S,
        mut events: mpsc::UnboundedReceiver<FeedEvent>,
    ) -> Result<()> {
        let mut pending: Option<BoxFuture<'_, Result<Snapshot>>> =
            Some(Box::pin(source.fetch()));
        let mut initial = true;

        loop {
            let step = match pending.as_mut() {
                Some(fetch) => tokio::select! {
                    result = fetch.as_mut() => Step::Snapshot(result),
                    event = events.recv() => Step::Feed(event),
                },
                None => Step::Feed(events.recv().await),
            };

            match step {
                Step::Snapshot(result) => {
                    pending = None;
                    match result {
                        Ok(snapshot) => self.load_snapshot(snapshot).await,
                        Err(error) if initial => {
                            return Err(error.context("initial cluster snapshot failed"));
                        }
                        Err(error) => warn!(error = %error, "snapshot resync failed"),
                    }
                    initial = false;
                }
                Step::Feed(None) => break,
                Step::Feed(Some(event)) => {
                    if self.handle_feed_event(event).await && pending.is_none() {
                        pending = Some(Box::pin(source.fetch()));
                    }
                }
            }
        }

        debug!("event feed channel closed, engine stopping");
        Ok(())
    }

    async fn load_snapshot(&mut self, snapshot: Snapshot) {
        let mut store = self.store.write().await;
        store.load_snapshot(snapshot.nodes, snapshot.pods);
        store.recompute_layout();
        self.metrics
            .set_store_sizes(store.node_count() as i64, store.pod_count() as i64);
        info!(
            nodes = store.node_count(),
            pods = store.pod_count(),
            "cluster snapshot reconciled"
        );
    }

    /// Returns true when a snapshot resync should be scheduled.
    async fn handle_feed_event(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::Connected => {
                let _ = self.connected.send(true);
                self.metrics.set_feed_connected(true);

                if self.first_connect {
                    // The initial snapshot covers this connection; announcing
                    // it would duplicate the startup path.
                    self.first_connect = false;
                    false
                } else {
                    self.notify(Notification::Reconnected);
                    // Events were missed while disconnected; reconcile.
                    true
                }
            }
            FeedEvent::Disconnected => {
                let _ = self.connected.send(false);
                self.metrics.set_feed_connected(false);
                self.metrics.inc_feed_disconnects();
                self.notify(Notification::ConnectionLost);
                false
            }
            FeedEvent::TransportError(message) => {
                debug!(error = %message, "event feed transport error");
                false
            }
            FeedEvent::Event(event) => {
                self.apply_watch_event(event).await;
                false
            }
        }
    }

    async fn apply_watch_event(&mut self, event: WatchEvent) {
        let WatchEvent { kind, data } = event;
        let mut store = self.store.write().await;

        let note = match kind {
            EventKind::NodeAdded => data.node.map(Resource::Node).and_then(|r| store.apply_added(r)),
            EventKind::NodeModified => data
                .node
                .map(Resource::Node)
                .and_then(|r| store.apply_modified(r)),
            EventKind::NodeDeleted => data
                .node
                .map(Resource::Node)
                .and_then(|r| store.apply_deleted(r)),
            EventKind::PodAdded => data.pod.map(Resource::Pod).and_then(|r| store.apply_added(r)),
            EventKind::PodModified => data
                .pod
                .map(Resource::Pod)
                .and_then(|r| store.apply_modified(r)),
            EventKind::PodDeleted => data
                .pod
                .map(Resource::Pod)
                .and_then(|r| store.apply_deleted(r)),
            EventKind::MetricsUpdate => {
                if let Some(samples) = &data.pods {
                    store.apply_metrics(samples);
                }
                None
            }
            EventKind::Ping | EventKind::Unknown => None,
        };

        // Metrics overlays never move anything; an applied add/modify/delete
        // can change the topology, so the layout is re-derived.
        if note.is_some() {
            store.recompute_layout();
        }
        self.metrics
            .set_store_sizes(store.node_count() as i64, store.pod_count() as i64);
        drop(store);

        if let Some(note) = note {
            self.metrics.inc_event_applied(note.kind, note.action);
            self.notify(Notification::Resource(note));
        }
    }

    fn notify(&self, notification: Notification) {
        let _ = self.notifications.send(notification);
    }
}
