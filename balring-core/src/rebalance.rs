use tracing::{debug, info};

use crate::errors::{Result, RingError};
use crate::events::{notify, EventSink, JoinCause, MigrationCause, RingEvent};
use crate::key_index::KeyIndex;
use crate::topology::RingTopology;
use crate::{NodeId, RingKey};

/// Moves keys between nodes when membership changes.
///
/// ## Pull-in
/// A created node takes `ideal = settled_keys / live_nodes` keys, popped from
/// the front of every node above `ideal`, walking the ring in order.
///
/// ## Push-out
/// A node being removed is detached and its keys are placed, oldest first,
/// on the first node in ring order with room below `upper_bound`. When no
/// survivor has room a node is created and the key lands on it directly.
///
/// ## Remap
/// Unconditional move of one key to a chosen node. No capacity check.
#[derive(Debug, Clone, Copy)]
pub struct RebalanceEngine {
    upper_bound: usize,
    auto_create_nodes: bool,
}

impl RebalanceEngine {
    pub fn new(upper_bound: usize, auto_create_nodes: bool) -> Self {
        Self {
            upper_bound,
            auto_create_nodes,
        }
    }

    /// Appends a node to the ring and pulls its share of keys in.
    /// Returns the number of keys moved.
    pub fn admit_node<K: RingKey>(
        &self,
        topology: &mut RingTopology,
        index: &mut KeyIndex<K>,
        node: NodeId,
        cause: JoinCause,
        sink: Option<&dyn EventSink<K>>,
    ) -> usize {
        topology.push(node);
        index.add_node(node);

        info!(node_id = %node, cause = %cause, ring_size = topology.len(), "node inserted");
        notify(sink, || RingEvent::NodeJoined { node, cause });

        self.pull_in(topology, index, node, sink)
    }

    /// Fills `new_node` from the nodes loaded above the ideal share.
    pub fn pull_in<K: RingKey>(
        &self,
        topology: &RingTopology,
        index: &mut KeyIndex<K>,
        new_node: NodeId,
        sink: Option<&dyn EventSink<K>>,
    ) -> usize {
        // A node mid-drain is detached from the index and does not count.
        let live: Vec<NodeId> = topology
            .nodes()
            .iter()
            .copied()
            .filter(|&n| index.has_node(n))
            .collect();
        if live.is_empty() {
            return 0;
        }

        let ideal = index.total_load() / live.len();
        let mut moved = 0;

        for source in live.into_iter().filter(|&n| n != new_node) {
            while moved < ideal && index.load(source).unwrap_or(0) > ideal {
                let Some(key) = index.pop_oldest(source) else {
                    break;
                };
                notify(sink, || RingEvent::KeyMigrated {
                    key: key.clone(),
                    from: source,
                    to: new_node,
                    cause: MigrationCause::PullIn,
                });
                index.rehome(key, new_node);
                moved += 1;
            }
        }

        debug!(node_id = %new_node, ideal, moved, "pull-in rebalance completed");
        notify(sink, || RingEvent::PullInCompleted {
            node: new_node,
            ideal,
            moved,
        });

        moved
    }

    /// Spare room the other live nodes offer against `node`'s load.
    pub fn can_absorb<K: RingKey>(
        &self,
        topology: &RingTopology,
        index: &KeyIndex<K>,
        node: NodeId,
    ) -> bool {
        let load = index.load(node).unwrap_or(0);
        let spare: usize = topology
            .nodes()
            .iter()
            .filter(|&&n| n != node)
            .filter_map(|&n| index.load(n))
            .map(|l| self.upper_bound.saturating_sub(l))
            .sum();
        spare >= load
    }

    /// Drains every key out of `node`. The node stays in the ring sequence
    /// (so created nodes never reuse its id); the caller removes it after.
    /// Returns the nodes created along the way.
    pub fn push_out<K: RingKey>(
        &self,
        topology: &mut RingTopology,
        index: &mut KeyIndex<K>,
        node: NodeId,
        sink: Option<&dyn EventSink<K>>,
    ) -> Result<Vec<NodeId>> {
        if !topology.contains(node) || !index.has_node(node) {
            return Err(RingError::NodeNotFound(node));
        }
        if !self.auto_create_nodes && !self.can_absorb(topology, index, node) {
            return Err(RingError::NoCapacityAvailable);
        }

        let drained = index.detach_node(node).unwrap_or_default();
        let moved = drained.len();
        let mut created = Vec::new();

        for key in drained {
            let target = match self.first_fit(topology, index) {
                Some(target) => target,
                None => {
                    // Only reachable with auto-creation on: capacity was checked above.
                    let new_node = topology.next_node_id();
                    self.admit_node(
                        topology,
                        index,
                        new_node,
                        JoinCause::CapacityEscalation,
                        sink,
                    );
                    created.push(new_node);
                    new_node
                }
            };

            notify(sink, || RingEvent::KeyMigrated {
                key: key.clone(),
                from: node,
                to: target,
                cause: MigrationCause::PushOut,
            });
            index.rehome(key, target);
        }

        debug!(node_id = %node, moved, created = ?created, "push-out rebalance completed");
        notify(sink, || RingEvent::PushOutCompleted {
            node,
            moved,
            created: created.clone(),
        });

        Ok(created)
    }

    /// Moves `key` to `to` regardless of capacity. Returns the previous owner.
    pub fn remap<K: RingKey>(
        &self,
        index: &mut KeyIndex<K>,
        key: &K,
        to: NodeId,
        sink: Option<&dyn EventSink<K>>,
    ) -> Result<NodeId> {
        if !index.contains_key(key) {
            return Err(RingError::key_not_found(key));
        }
        if !index.has_node(to) {
            return Err(RingError::NodeNotFound(to));
        }

        let from = index
            .move_key(key, to)
            .ok_or_else(|| RingError::key_not_found(key))?;

        notify(sink, || RingEvent::KeyMigrated {
            key: key.clone(),
            from,
            to,
            cause: MigrationCause::Remap,
        });

        Ok(from)
    }

    /// First live node in ring order still below `upper_bound`.
    fn first_fit<K: RingKey>(&self, topology: &RingTopology, index: &KeyIndex<K>) -> Option<NodeId> {
        topology
            .nodes()
            .iter()
            .copied()
            .find(|&n| matches!(index.load(n), Some(load) if load < self.upper_bound))
    }
}

#[cfg(test)]
#[path = "rebalance_test.rs"]
mod rebalance_test;
