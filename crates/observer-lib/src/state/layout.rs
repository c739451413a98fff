//! Orbit layout: derive pod positions from the reconciled model
//!
//! Pure function of (nodes, pods); the store applies its output after every
//! topology change. Keeping the computation free of store access makes it
//! testable in isolation.

use crate::models::{Node, Pod, Position};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::f64::consts::PI;

/// Distance from a node's center to its orbiting pods
pub const ORBIT_RADIUS: f64 = 3.0;

/// Compute the orbit position for every pod, keyed by pod id.
///
/// Pods group by assigned node name in store iteration order; pod `i` of `n`
/// on a node sits at angle `i * 2π / n` on a circle of [`ORBIT_RADIUS`]
/// around the node. Unscheduled pods, and pods whose node is not (yet) known,
/// stay at the origin.
pub fn orbit_positions(
    nodes: &IndexMap<String, Node>,
    pods: &IndexMap<String, Pod>,
) -> HashMap<String, Position> {
    let node_positions: HashMap<&str, Position> = nodes
        .values()
        .map(|node| (node.name.as_str(), node.position))
        .collect();

    let mut positions = HashMap::with_capacity(pods.len());
    let mut groups: IndexMap<&str, Vec<&Pod>> = IndexMap::new();

    for pod in pods.values() {
        match pod.assigned_node() {
            Some(node_name) if node_positions.contains_key(node_name) => {
                groups.entry(node_name).or_default().push(pod);
            }
            // unscheduled, or the owning node has not arrived yet
            _ => {
                positions.insert(pod.id.clone(), Position::ORIGIN);
            }
        }
    }

    for (node_name, members) in groups {
        let center = node_positions[node_name];
        let count = members.len() as f64;

        for (index, pod) in members.into_iter().enumerate() {
            let angle = index as f64 * 2.0 * PI / count;
            positions.insert(
                pod.id.clone(),
                Position {
                    x: center.x + ORBIT_RADIUS * angle.cos(),
                    y: center.y,
                    z: center.z + ORBIT_RADIUS * angle.sin(),
                },
            );
        }
    }

    positions
}
