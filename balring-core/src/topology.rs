use crate::traversal::{CursorSnapshot, StepCursor};
use crate::NodeId;

/// Ordered node sequence plus the cursor that steps over its positions.
///
/// A node's position is its index in the sequence, never its identifier.
/// Any membership change recomputes `k` immediately.
#[derive(Debug, Clone)]
pub struct RingTopology {
    nodes: Vec<NodeId>,
    cursor: StepCursor,
}

impl RingTopology {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        let cursor = StepCursor::new(nodes.len());
        Self { nodes, cursor }
    }

    /// Appends a node at the end of the sequence.
    pub fn push(&mut self, node: NodeId) {
        self.nodes.push(node);
        self.cursor.resize(self.nodes.len());
    }

    /// Drops a node from the sequence, returning whether it was present.
    pub fn remove(&mut self, node: NodeId) -> bool {
        match self.position_of(node) {
            Some(pos) => {
                self.nodes.remove(pos);
                self.cursor.resize(self.nodes.len());
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn position_of(&self, node: NodeId) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }

    pub fn node_at(&self, pos: usize) -> Option<NodeId> {
        self.nodes.get(pos).copied()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn k(&self) -> usize {
        self.cursor.k()
    }

    pub fn next_position(&mut self) -> Option<usize> {
        self.cursor.next()
    }

    pub fn previous_position(&mut self) -> Option<usize> {
        self.cursor.previous()
    }

    /// Identifier for a node the ring creates on its own: one past the
    /// largest live identifier, or 0 for an empty ring.
    pub fn next_node_id(&self) -> NodeId {
        self.nodes.iter().max().map_or(0, |max| max + 1)
    }

    pub fn cursor_snapshot(&self) -> CursorSnapshot {
        self.cursor.snapshot()
    }

    pub fn restore_cursor(&mut self, snapshot: CursorSnapshot) {
        self.cursor.restore(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_recomputes_k() {
        let mut topology = RingTopology::new(vec![0, 1, 2]);
        assert_eq!(topology.k(), 2);

        topology.push(3);
        assert_eq!(topology.len(), 4);
        assert_eq!(topology.k(), 2);

        topology.push(4);
        assert_eq!(topology.k(), 3);
        assert_eq!(topology.nodes(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_remove_recomputes_k() {
        let mut topology = RingTopology::new(vec![0, 1, 2, 3, 4]);
        assert!(topology.remove(2));
        assert_eq!(topology.nodes(), &[0, 1, 3, 4]);
        assert_eq!(topology.k(), 2);

        assert!(!topology.remove(2));
        assert_eq!(topology.len(), 4);
    }

    #[test]
    fn test_positions_are_indices_not_ids() {
        let topology = RingTopology::new(vec![40, 7, 19]);
        assert_eq!(topology.position_of(7), Some(1));
        assert_eq!(topology.node_at(2), Some(19));
        assert_eq!(topology.node_at(3), None);
    }

    #[test]
    fn test_next_node_id() {
        assert_eq!(RingTopology::new(vec![]).next_node_id(), 0);
        assert_eq!(RingTopology::new(vec![3, 9, 4]).next_node_id(), 10);
    }

    #[test]
    fn test_stepping_over_positions() {
        let mut topology = RingTopology::new(vec![10, 20, 30, 40]);
        let positions: Vec<usize> = (0..6).filter_map(|_| topology.next_position()).collect();
        assert_eq!(positions, vec![0, 2, 3, 1, 2, 0]);
        assert_eq!(topology.previous_position(), Some(2));
    }

    #[test]
    fn test_empty_topology_has_no_positions() {
        let mut topology = RingTopology::new(vec![]);
        assert!(topology.is_empty());
        assert_eq!(topology.next_position(), None);
    }
}
