//! Core data models for the cluster observatory
//!
//! These types mirror the backend wire format: snapshot endpoints return
//! arrays of [`Node`] and [`Pod`], and the event feed delivers [`WatchEvent`]
//! envelopes wrapping one resource each.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 3D coordinates in the scene
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
}

/// Resource consumption with its capacity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub used: f64,
    pub total: f64,
}

/// Node readiness as reported by the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Ready,
    NotReady,
    #[serde(other)]
    Unknown,
}

/// A cluster node
///
/// `position` is owned by this side of the wire: snapshot payloads seed it,
/// but a node modify event must never reset it (the store carries the stored
/// position forward).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub status: NodeStatus,
    pub cpu: ResourceUsage,
    pub memory: ResourceUsage,
    #[serde(default)]
    pub pods: Vec<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub position: Position,
}

/// Pod lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Container state within a pod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerStatus {
    Running,
    Waiting,
    Terminated,
    #[serde(other)]
    Unknown,
}

/// Container role, wire field `type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRole {
    #[default]
    Main,
    Sidecar,
    Init,
}

/// A container within a pod
///
/// `cpu` (millicores) and `memory` (MB) are the latest instantaneous samples,
/// overlaid by metrics updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub status: ContainerStatus,
    #[serde(default)]
    pub restarts: i32,
    #[serde(rename = "type", default)]
    pub role: ContainerRole,
    #[serde(default)]
    pub cpu: f64,
    #[serde(default)]
    pub memory: f64,
}

/// A cluster pod
///
/// `position` is derived: the layout recompute overwrites it on every
/// topology change. `cpu`/`memory` are aggregate usage in millicores/MB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub status: PodStatus,
    #[serde(default)]
    pub node_name: String,
    #[serde(default)]
    pub containers: Vec<Container>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub cpu: f64,
    #[serde(default)]
    pub memory: f64,
}

impl Pod {
    /// The node this pod is scheduled on, if any.
    ///
    /// The wire encodes "unscheduled" as an empty string.
    pub fn assigned_node(&self) -> Option<&str> {
        if self.node_name.is_empty() {
            None
        } else {
            Some(self.node_name.as_str())
        }
    }
}

/// Event type on the persistent feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PodAdded,
    PodModified,
    PodDeleted,
    NodeAdded,
    NodeModified,
    NodeDeleted,
    Ping,
    MetricsUpdate,
    #[serde(other)]
    Unknown,
}

/// Payload of a feed event; at most one of the fields is populated
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod: Option<Pod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<Vec<PodMetrics>>,
}

/// An incremental change event delivered over the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub data: EventData,
}

/// Latest usage sample for one pod, from a `metrics_update` batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodMetrics {
    pub pod_id: String,
    pub name: String,
    pub namespace: String,
    pub total_cpu: f64,
    pub total_memory: f64,
    #[serde(default)]
    pub containers: Vec<ContainerMetrics>,
    pub timestamp: DateTime<Utc>,
}

/// Per-container usage sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerMetrics {
    pub name: String,
    pub cpu: f64,
    pub memory: f64,
}
