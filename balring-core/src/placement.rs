use crate::key_index::KeyIndex;
use crate::topology::RingTopology;
use crate::{NodeId, RingKey};

/// Outcome of a placement search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Place the key on this existing node
    Node(NodeId),
    /// Every candidate is full (or the ring is empty): a node must be created
    Escalate,
}

/// Chooses the node for a new key.
///
/// Candidates come in pairs from the ring cursor: two `next()` calls and one
/// `previous()`, so every draw advances the cursor by a single step. When the
/// pair sits exactly `k` positions apart, the first node is accepted if its
/// load does not exceed the second's by more than `variance_factor`.
#[derive(Debug, Clone, Copy)]
pub struct PlacementPolicy {
    upper_bound: usize,
    variance_factor: usize,
}

impl PlacementPolicy {
    pub fn new(upper_bound: usize, variance_factor: usize) -> Self {
        Self {
            upper_bound,
            variance_factor,
        }
    }

    pub fn select<K: RingKey>(
        &self,
        topology: &mut RingTopology,
        index: &KeyIndex<K>,
    ) -> Placement {
        let selected = match topology.len() {
            0 => return Placement::Escalate,
            // A lone node has no opposite: it is eligible whenever it has room.
            1 => topology.node_at(0),
            _ => self.search(topology, index),
        };

        match selected {
            Some(node) if self.has_room(index, node) => Placement::Node(node),
            _ => Placement::Escalate,
        }
    }

    /// Walks up to `ring_size` draws. Falls back to the last drawn node when
    /// no pair satisfies the variance check.
    fn search<K: RingKey>(&self, topology: &mut RingTopology, index: &KeyIndex<K>) -> Option<NodeId> {
        let k = topology.k();
        let mut selected = None;

        for _ in 0..topology.len() {
            let (Some(first), Some(second)) = (topology.next_position(), topology.next_position())
            else {
                break;
            };
            topology.previous_position();

            selected = topology.node_at(first);

            if first.abs_diff(second) == k {
                let (Some(a), Some(b)) = (topology.node_at(first), topology.node_at(second)) else {
                    continue;
                };
                let load_a = index.load(a).unwrap_or(0);
                let load_b = index.load(b).unwrap_or(0);
                if load_a <= load_b.saturating_add(self.variance_factor) {
                    break;
                }
            }
        }

        selected
    }

    fn has_room<K: RingKey>(&self, index: &KeyIndex<K>, node: NodeId) -> bool {
        index.load(node).unwrap_or(0) < self.upper_bound
    }
}
