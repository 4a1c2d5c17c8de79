use serde::{Deserialize, Serialize};
use std::fmt;

use crate::NodeId;

/// Snapshot of node sizes, in ring order.
///
/// The ring never prints on its own. Embedders fetch a report when they
/// want a node-size dump and render it as text or JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingReport {
    /// One entry per node, in ring order
    pub nodes: Vec<NodeLoad>,
    /// Number of keys in the ownership map
    pub total_keys: usize,
    /// Long-jump distance for the current ring size
    pub k: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLoad {
    pub node: NodeId,
    pub load: usize,
}

impl RingReport {
    /// Sum of every node's load. Equals `total_keys` in a settled ring.
    pub fn total_load(&self) -> usize {
        self.nodes.iter().map(|n| n.load).sum()
    }

    /// True when every node holds between `lower` and `upper` keys.
    pub fn is_within(&self, lower: usize, upper: usize) -> bool {
        self.nodes
            .iter()
            .all(|n| (lower..=upper).contains(&n.load))
    }

    pub fn max_load(&self) -> Option<usize> {
        self.nodes.iter().map(|n| n.load).max()
    }

    pub fn min_load(&self) -> Option<usize> {
        self.nodes.iter().map(|n| n.load).min()
    }
}

impl fmt::Display for RingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Node sizes:")?;
        for entry in &self.nodes {
            writeln!(f, "Node {}: {} keys", entry.node, entry.load)?;
        }
        write!(f, "Total: {} keys on {} nodes", self.total_keys, self.nodes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(loads: &[(NodeId, usize)]) -> RingReport {
        RingReport {
            nodes: loads
                .iter()
                .map(|&(node, load)| NodeLoad { node, load })
                .collect(),
            total_keys: loads.iter().map(|(_, l)| l).sum(),
            k: loads.len().div_ceil(2),
        }
    }

    #[test]
    fn test_bounds_check() {
        let report = report(&[(0, 5), (1, 10), (2, 7)]);
        assert!(report.is_within(5, 10));
        assert!(!report.is_within(6, 10));
        assert!(!report.is_within(5, 9));
        assert_eq!(report.max_load(), Some(10));
        assert_eq!(report.min_load(), Some(5));
        assert_eq!(report.total_load(), 22);
    }

    #[test]
    fn test_display_lists_nodes_in_order() {
        let report = report(&[(3, 1), (0, 2)]);
        assert_eq!(
            report.to_string(),
            "Node sizes:\nNode 3: 1 keys\nNode 0: 2 keys\nTotal: 3 keys on 2 nodes"
        );
    }

    #[test]
    fn test_serializes_to_json() {
        let report = report(&[(0, 4)]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"nodes": [{"node": 0, "load": 4}], "total_keys": 4, "k": 1})
        );
    }
}
