//! Human-readable change notifications for the presentation layer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource kind a notification refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Node,
    Pod,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Node => "node",
            ResourceKind::Pod => "pod",
        }
    }
}

/// What happened to the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Created,
    Modified,
    Deleted,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Created => "created",
            ChangeAction::Modified => "modified",
            ChangeAction::Deleted => "deleted",
        }
    }
}

/// A single resource change, identified the way users know the resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub kind: ResourceKind,
    pub action: ChangeAction,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ChangeNotification {
    pub fn node(action: ChangeAction, name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Node,
            action,
            name: name.into(),
            namespace: None,
        }
    }

    pub fn pod(
        action: ChangeAction,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            kind: ResourceKind::Pod,
            action,
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }
}

impl fmt::Display for ChangeNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(
                f,
                "{} {}/{} {}",
                self.kind.as_str(),
                namespace,
                self.name,
                self.action.as_str()
            ),
            None => write!(
                f,
                "{} {} {}",
                self.kind.as_str(),
                self.name,
                self.action.as_str()
            ),
        }
    }
}

/// Everything the engine surfaces to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Resource(ChangeNotification),
    ConnectionLost,
    Reconnected,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Resource(change) => change.fmt(f),
            Notification::ConnectionLost => write!(f, "connection to cluster event feed lost"),
            Notification::Reconnected => write!(f, "reconnected to cluster event feed"),
        }
    }
}
