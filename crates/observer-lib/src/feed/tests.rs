//! Tests for the event feed lifecycle
//!
//! A scripted transport stands in for the network so reconnect, heartbeat,
//! and teardown behavior can be driven deterministically under paused time.

use super::*;
use crate::models::EventKind;
use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Transport that hands out pre-scripted connections, then refuses
struct ScriptedTransport {
    connections: Mutex<VecDeque<ScriptedConnection>>,
    attempts: AtomicUsize,
}

impl ScriptedTransport {
    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedTransport for ScriptedTransport {
    async fn connect(&self, _url: &str) -> Result<Box<dyn FeedConnection>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.connections.lock().await.pop_front() {
            Some(conn) => Ok(Box::new(conn)),
            None => anyhow::bail!("connection refused"),
        }
    }
}

struct ScriptedConnection {
    frames: mpsc::UnboundedReceiver<Result<String>>,
    sent: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl FeedConnection for ScriptedConnection {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        self.frames.recv().await
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        self.sent
            .send(text)
            .map_err(|_| anyhow::anyhow!("send on closed connection"))
    }

    async fn close(&mut self) {
        self.frames.close();
    }
}

/// The test-side handle for one scripted connection
struct ConnectionScript {
    frames: mpsc::UnboundedSender<Result<String>>,
    sent: mpsc::UnboundedReceiver<String>,
}

fn scripted(count: usize) -> (Arc<ScriptedTransport>, Vec<ConnectionScript>) {
    let transport = Arc::new(ScriptedTransport {
        connections: Mutex::new(VecDeque::new()),
        attempts: AtomicUsize::new(0),
    });
    let mut scripts = Vec::new();
    for _ in 0..count {
        scripts.push(provision_connection_blocking(&transport));
    }
    (transport, scripts)
}

fn provision_connection_blocking(transport: &Arc<ScriptedTransport>) -> ConnectionScript {
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    transport
        .connections
        .try_lock()
        .expect("transport lock contended during setup")
        .push_back(ScriptedConnection {
            frames: frames_rx,
            sent: sent_tx,
        });
    ConnectionScript {
        frames: frames_tx,
        sent: sent_rx,
    }
}

fn pod_event(kind: &str, id: &str) -> String {
    format!(
        r#"{{"type":"{kind}","data":{{"pod":{{"id":"{id}","name":"{id}","namespace":"default","status":"Running","nodeName":"worker-1","createdAt":"2024-03-01T12:00:00Z"}}}}}}"#
    )
}

fn open_feed(
    transport: Arc<ScriptedTransport>,
) -> (EventFeed, mpsc::UnboundedReceiver<FeedEvent>) {
    let (feed, events) = EventFeed::new(FeedConfig::default(), transport);
    feed.open();
    (feed, events)
}

#[tokio::test(start_paused = true)]
async fn test_connect_delivers_parsed_events() {
    let (transport, mut scripts) = scripted(1);
    let (feed, mut events) = open_feed(transport);
    let script = scripts.remove(0);

    assert_eq!(events.recv().await, Some(FeedEvent::Connected));
    assert_eq!(feed.state(), FeedState::Open);
    assert!(feed.is_connected());

    script
        .frames
        .send(Ok(pod_event("pod_added", "p1")))
        .unwrap();

    match events.recv().await {
        Some(FeedEvent::Event(event)) => {
            assert_eq!(event.kind, EventKind::PodAdded);
            assert_eq!(event.data.pod.unwrap().id, "p1");
        }
        other => panic!("expected pod event, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payload_is_dropped_not_fatal() {
    let (transport, mut scripts) = scripted(1);
    let (_feed, mut events) = open_feed(transport);
    let script = scripts.remove(0);

    assert_eq!(events.recv().await, Some(FeedEvent::Connected));

    script.frames.send(Ok("{not json".to_string())).unwrap();
    script
        .frames
        .send(Ok(pod_event("pod_deleted", "p2")))
        .unwrap();

    // The garbage frame vanishes; the connection keeps delivering.
    match events.recv().await {
        Some(FeedEvent::Event(event)) => assert_eq!(event.kind, EventKind::PodDeleted),
        other => panic!("expected pod event, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_once_at_configured_delay() {
    let (transport, mut scripts) = scripted(2);
    let (_feed, mut events) = open_feed(Arc::clone(&transport));
    let script = scripts.remove(0);

    assert_eq!(events.recv().await, Some(FeedEvent::Connected));
    assert_eq!(transport.attempts(), 1);

    // Simulated network drop.
    drop(script.frames);
    assert_eq!(events.recv().await, Some(FeedEvent::Disconnected));
    let disconnected_at = Instant::now();

    assert_eq!(events.recv().await, Some(FeedEvent::Connected));
    assert_eq!(
        Instant::now().duration_since(disconnected_at),
        Duration::from_millis(3000)
    );
    assert_eq!(transport.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_retries_at_same_delay() {
    let (transport, _scripts) = scripted(0);
    let (_feed, mut events) = open_feed(Arc::clone(&transport));

    match events.recv().await {
        Some(FeedEvent::TransportError(_)) => {}
        other => panic!("expected transport error, got {other:?}"),
    }
    let failed_at = Instant::now();

    // Provision a connection for the retry.
    let _script = provision_connection_blocking(&transport);

    assert_eq!(events.recv().await, Some(FeedEvent::Connected));
    assert_eq!(
        Instant::now().duration_since(failed_at),
        Duration::from_millis(3000)
    );
    assert_eq!(transport.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_close_cancels_pending_reconnect() {
    let (transport, mut scripts) = scripted(1);
    let (feed, mut events) = open_feed(Arc::clone(&transport));
    let script = scripts.remove(0);

    assert_eq!(events.recv().await, Some(FeedEvent::Connected));
    drop(script.frames);
    assert_eq!(events.recv().await, Some(FeedEvent::Disconnected));

    feed.close();
    assert_eq!(feed.state(), FeedState::Closed);

    // Run well past the reconnect delay: nothing may fire.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.attempts(), 1);
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_close_is_idempotent_and_silences_events() {
    let (transport, mut scripts) = scripted(1);
    let (feed, mut events) = open_feed(transport);
    let script = scripts.remove(0);

    assert_eq!(events.recv().await, Some(FeedEvent::Connected));

    feed.close();
    feed.close();
    assert_eq!(feed.state(), FeedState::Closed);

    // Frames arriving during teardown are never surfaced.
    let _ = script.frames.send(Ok(pod_event("pod_added", "late")));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_open_is_idempotent() {
    let (transport, _scripts) = scripted(1);
    let (feed, mut events) = open_feed(Arc::clone(&transport));
    feed.open();

    assert_eq!(events.recv().await, Some(FeedEvent::Connected));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(transport.attempts(), 1);
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_open_after_close_is_noop() {
    let (transport, _scripts) = scripted(1);
    let (feed, mut events) = EventFeed::new(FeedConfig::default(), transport.clone());

    feed.close();
    feed.open();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(transport.attempts(), 0);
    assert_eq!(feed.state(), FeedState::Closed);
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_sent_on_interval() {
    let (transport, mut scripts) = scripted(1);
    let (_feed, mut events) = open_feed(transport);
    let mut script = scripts.remove(0);

    assert_eq!(events.recv().await, Some(FeedEvent::Connected));
    let connected_at = Instant::now();

    let ping = script.sent.recv().await.unwrap();
    assert_eq!(ping, r#"{"type":"ping"}"#);
    assert_eq!(
        Instant::now().duration_since(connected_at),
        Duration::from_secs(30)
    );

    let _ = script.sent.recv().await.unwrap();
    assert_eq!(
        Instant::now().duration_since(connected_at),
        Duration::from_secs(60)
    );
}
