//! Core library for the cluster observatory
//!
//! This crate provides the synchronization core behind the 3D cluster view:
//! - Reconciliation of point-in-time snapshots with incremental watch events
//! - A deterministic orbit layout derived from the reconciled model
//! - The event feed lifecycle (connect, heartbeat, reconnect)
//! - Change notifications, health checks, and observability

pub mod api;
pub mod engine;
pub mod feed;
pub mod health;
pub mod models;
pub mod notify;
pub mod observability;
pub mod state;

pub use engine::{ClusterEngine, EngineOutputs, SharedStore, Snapshot, SnapshotSource};
pub use models::*;
pub use notify::{ChangeAction, ChangeNotification, Notification, ResourceKind};
pub use observability::ObserverMetrics;
pub use state::{ClusterStore, Resource};
