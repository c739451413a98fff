//! Reconciliation store: the authoritative in-memory cluster model
//!
//! Snapshot loads and incremental watch events both funnel through this type.
//! Every operation is synchronous and total: malformed records are ignored,
//! duplicate delivery is a no-op, and re-applying the last event leaves the
//! store unchanged.

use crate::models::{Node, Pod, PodMetrics};
use crate::notify::{ChangeAction, ChangeNotification};
use crate::state::layout;
use indexmap::IndexMap;
use tracing::debug;

/// A resource record as delivered by a snapshot or feed event
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Node(Node),
    Pod(Pod),
}

impl Resource {
    pub fn id(&self) -> &str {
        match self {
            Resource::Node(node) => &node.id,
            Resource::Pod(pod) => &pod.id,
        }
    }
}

/// In-memory mapping of resource id to record, per kind
///
/// Maps are insertion-ordered; the orbit layout assigns angles by iteration
/// order, so a stable order keeps pods from swapping places between
/// recomputes.
#[derive(Debug, Default)]
pub struct ClusterStore {
    nodes: IndexMap<String, Node>,
    pods: IndexMap<String, Pod>,
}

impl ClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the full node and pod mappings with a fresh snapshot.
    ///
    /// Both maps swap at once, so readers behind the shared lock observe
    /// either the old state or the fully-new one. Bulk loads emit no
    /// per-resource notifications.
    pub fn load_snapshot(&mut self, nodes: Vec<Node>, pods: Vec<Pod>) {
        self.nodes = nodes
            .into_iter()
            .filter(|node| !node.id.is_empty())
            .map(|node| (node.id.clone(), node))
            .collect();
        self.pods = pods
            .into_iter()
            .filter(|pod| !pod.id.is_empty())
            .map(|pod| (pod.id.clone(), pod))
            .collect();

        debug!(
            nodes = self.nodes.len(),
            pods = self.pods.len(),
            "loaded cluster snapshot"
        );
    }

    /// Insert a new record.
    ///
    /// If the id is already present the event is dropped: a snapshot item and
    /// an add event for the same resource can race, and the first delivery
    /// wins.
    pub fn apply_added(&mut self, resource: Resource) -> Option<ChangeNotification> {
        if resource.id().is_empty() {
            debug!("ignoring add event without resource id");
            return None;
        }

        match resource {
            Resource::Node(node) => {
                if self.nodes.contains_key(&node.id) {
                    return None;
                }
                let note = ChangeNotification::node(ChangeAction::Created, node.name.as_str());
                self.nodes.insert(node.id.clone(), node);
                Some(note)
            }
            Resource::Pod(pod) => {
                if self.pods.contains_key(&pod.id) {
                    return None;
                }
                let note =
                    ChangeNotification::pod(ChangeAction::Created, pod.name.as_str(), pod.namespace.as_str());
                self.pods.insert(pod.id.clone(), pod);
                Some(note)
            }
        }
    }

    /// Replace a record with the incoming one.
    ///
    /// The whole record is overwritten; there is no field-level merge. The
    /// one exception is a node's position, which is not wire authority and is
    /// carried forward from the stored record. A modify for an unknown id is
    /// treated as an add.
    pub fn apply_modified(&mut self, resource: Resource) -> Option<ChangeNotification> {
        if resource.id().is_empty() {
            debug!("ignoring modify event without resource id");
            return None;
        }

        match resource {
            Resource::Node(mut node) => match self.nodes.get(&node.id) {
                Some(prev) => {
                    node.position = prev.position;
                    let note = ChangeNotification::node(ChangeAction::Modified, node.name.as_str());
                    self.nodes.insert(node.id.clone(), node);
                    Some(note)
                }
                None => self.apply_added(Resource::Node(node)),
            },
            Resource::Pod(pod) => match self.pods.get(&pod.id) {
                Some(prev) => {
                    // A reassigned pod joins the end of its new node's orbit
                    // group; in-place modifies keep their slot so unrelated
                    // field changes do not shuffle angles.
                    if prev.node_name != pod.node_name {
                        self.pods.shift_remove(&pod.id);
                    }
                    let note = ChangeNotification::pod(
                        ChangeAction::Modified,
                        pod.name.as_str(),
                        pod.namespace.as_str(),
                    );
                    self.pods.insert(pod.id.clone(), pod);
                    Some(note)
                }
                None => self.apply_added(Resource::Pod(pod)),
            },
        }
    }

    /// Remove a record by id. Absent ids are a no-op.
    pub fn apply_deleted(&mut self, resource: Resource) -> Option<ChangeNotification> {
        match resource {
            Resource::Node(node) => self
                .nodes
                .shift_remove(&node.id)
                .map(|prev| ChangeNotification::node(ChangeAction::Deleted, prev.name)),
            Resource::Pod(pod) => self
                .pods
                .shift_remove(&pod.id)
                .map(|prev| ChangeNotification::pod(ChangeAction::Deleted, prev.name, prev.namespace)),
        }
    }

    /// Overlay the latest usage samples onto matching pods and containers.
    ///
    /// Only the most recent sample is retained. Samples for unknown pods or
    /// containers are dropped; topology and positions are untouched.
    pub fn apply_metrics(&mut self, samples: &[PodMetrics]) {
        for sample in samples {
            let Some(pod) = self.pods.get_mut(&sample.pod_id) else {
                continue;
            };
            pod.cpu = sample.total_cpu;
            pod.memory = sample.total_memory;

            for usage in &sample.containers {
                if let Some(container) =
                    pod.containers.iter_mut().find(|c| c.name == usage.name)
                {
                    container.cpu = usage.cpu;
                    container.memory = usage.memory;
                }
            }
        }
    }

    /// Re-derive every pod position from the current topology.
    pub fn recompute_layout(&mut self) {
        let positions = layout::orbit_positions(&self.nodes, &self.pods);
        for pod in self.pods.values_mut() {
            pod.position = positions.get(&pod.id).copied().unwrap_or_default();
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn pod(&self, id: &str) -> Option<&Pod> {
        self.pods.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn pods(&self) -> impl Iterator<Item = &Pod> {
        self.pods.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn pod_count(&self) -> usize {
        self.pods.len()
    }
}
