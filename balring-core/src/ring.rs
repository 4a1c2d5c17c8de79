use std::sync::Arc;

use tracing::{debug, info};

use crate::config::RingConfig;
use crate::errors::{Result, RingError};
use crate::events::{notify, EventSink, EvictionSkip, JoinCause, LeaveCause, RingEvent};
use crate::key_index::KeyIndex;
use crate::placement::{Placement, PlacementPolicy};
use crate::rebalance::RebalanceEngine;
use crate::report::{NodeLoad, RingReport};
use crate::topology::RingTopology;
use crate::{NodeId, RingKey};

/// Ring - self-balancing assignment of keys to nodes
///
/// ## Core Responsibilities:
/// - **Placement**: picks an owner for every new key, keeping loads within `upper_bound`
/// - **Membership**: nodes join explicitly or when every candidate is full, and leave
///   explicitly or when their load falls below `lower_bound`
/// - **Rebalancing**: joining nodes pull keys in, leaving nodes push all their keys out
///
/// ## Failure semantics:
/// Every operation validates before it mutates. A call that returns an error
/// leaves the ownership map, the load map, the ring sequence and the
/// traversal cursor exactly as they were.
///
/// ## Thread Safety:
/// Not synchronized. Share it behind one lock, or hand it to a
/// [`RingWorker`](crate::RingWorker) that owns it on a single task.
#[derive(Clone)]
pub struct Ring<K: RingKey> {
    config: RingConfig,
    topology: RingTopology,
    index: KeyIndex<K>,
    placement: PlacementPolicy,
    rebalancer: RebalanceEngine,
    event_sink: Option<Arc<dyn EventSink<K>>>,
}

impl<K: RingKey> std::fmt::Debug for Ring<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ring")
            .field("nodes", &self.topology.nodes())
            .field("keys", &self.index.key_count())
            .field("config", &self.config)
            .field("has_event_sink", &self.event_sink.is_some())
            .finish()
    }
}

impl<K: RingKey> Ring<K> {
    /// Builds a ring over `config.initial_nodes`, all starting empty.
    pub fn new(config: RingConfig) -> Result<Self> {
        config.validate()?;

        let topology = RingTopology::new(config.initial_nodes.clone());
        let index = KeyIndex::new(topology.nodes());
        let placement = PlacementPolicy::new(config.upper_bound, config.variance_factor);
        let rebalancer = RebalanceEngine::new(config.upper_bound, config.auto_create_nodes);

        debug!(
            nodes = ?topology.nodes(),
            upper_bound = config.upper_bound,
            lower_bound = config.lower_bound,
            variance_factor = config.variance_factor,
            "ring created"
        );

        Ok(Ring {
            config,
            topology,
            index,
            placement,
            rebalancer,
            event_sink: None,
        })
    }

    /// Installs a sink that receives every ring event
    pub fn with_event_sink<S>(mut self, sink: S) -> Self
    where
        S: EventSink<K> + 'static,
    {
        self.event_sink = Some(Arc::new(sink));
        self
    }

    /// Adds a node at the end of the ring and pulls its share of keys in.
    pub fn insert_node(&mut self, node: NodeId) -> Result<()> {
        if self.contains_node(node) {
            return Err(RingError::NodeAlreadyExists(node));
        }

        self.rebalancer.admit_node(
            &mut self.topology,
            &mut self.index,
            node,
            JoinCause::Explicit,
            self.event_sink.as_deref(),
        );
        Ok(())
    }

    /// Drains every key out of `node`, then drops it from the ring.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if !self.contains_node(node) {
            return Err(RingError::NodeNotFound(node));
        }
        self.evict(node, LeaveCause::Explicit)
    }

    /// Places a new key and returns its owner.
    pub fn insert_key(&mut self, key: K) -> Result<NodeId> {
        if self.index.contains_key(&key) {
            return Err(RingError::duplicate_key(&key));
        }

        let cursor = self.topology.cursor_snapshot();
        let node = match self.placement.select(&mut self.topology, &self.index) {
            Placement::Node(node) => node,
            Placement::Escalate if self.config.auto_create_nodes => {
                let node = self.topology.next_node_id();
                self.rebalancer.admit_node(
                    &mut self.topology,
                    &mut self.index,
                    node,
                    JoinCause::CapacityEscalation,
                    self.event_sink.as_deref(),
                );
                node
            }
            Placement::Escalate => {
                self.topology.restore_cursor(cursor);
                return Err(RingError::NoCapacityAvailable);
            }
        };

        notify(self.event_sink.as_deref(), || RingEvent::KeyPlaced {
            key: key.clone(),
            node,
        });
        self.index.assign(key, node);

        Ok(node)
    }

    /// Removes a key and returns the node that owned it.
    ///
    /// If the owner ends up below `lower_bound` it is evicted, pushing its
    /// remaining keys out, unless the ring is at `min_nodes` or the other
    /// nodes cannot take the keys while auto-creation is off.
    pub fn remove_key(&mut self, key: &K) -> Result<NodeId> {
        let node = self
            .index
            .unassign(key)
            .ok_or_else(|| RingError::key_not_found(key))?;

        notify(self.event_sink.as_deref(), || RingEvent::KeyRemoved {
            key: key.clone(),
            node,
        });

        let load = self.index.load(node).unwrap_or(0);
        if load < self.config.lower_bound {
            if self.topology.len() <= self.config.min_nodes {
                self.skip_eviction(node, load, EvictionSkip::NodeFloor);
            } else if !self.config.auto_create_nodes
                && !self.rebalancer.can_absorb(&self.topology, &self.index, node)
            {
                self.skip_eviction(node, load, EvictionSkip::NoCapacity);
            } else {
                self.evict(node, LeaveCause::Underflow)?;
            }
        }

        Ok(node)
    }

    /// Returns the node that owns `key`.
    pub fn lookup(&self, key: &K) -> Result<NodeId> {
        self.index
            .owner(key)
            .ok_or_else(|| RingError::key_not_found(key))
    }

    /// Moves `key` onto `node` without any capacity check.
    pub fn remap(&mut self, key: &K, node: NodeId) -> Result<()> {
        self.rebalancer
            .remap(&mut self.index, key, node, self.event_sink.as_deref())?;
        Ok(())
    }

    pub fn nodes(&self) -> &[NodeId] {
        self.topology.nodes()
    }

    pub fn node_count(&self) -> usize {
        self.topology.len()
    }

    pub fn key_count(&self) -> usize {
        self.index.key_count()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.topology.contains(node)
    }

    /// Number of keys `node` owns, `None` for an unknown node.
    pub fn load_of(&self, node: NodeId) -> Option<usize> {
        self.index.load(node)
    }

    /// Keys owned by `node`, oldest first.
    pub fn keys_of(&self, node: NodeId) -> Option<impl Iterator<Item = &K>> {
        self.index.keys_of(node)
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Current long-jump distance, `ceil(ring_size / 2)`.
    pub fn k(&self) -> usize {
        self.topology.k()
    }

    /// Node sizes in ring order.
    pub fn report(&self) -> RingReport {
        let nodes = self
            .topology
            .nodes()
            .iter()
            .map(|&node| NodeLoad {
                node,
                load: self.index.load(node).unwrap_or(0),
            })
            .collect();

        RingReport {
            nodes,
            total_keys: self.index.key_count(),
            k: self.topology.k(),
        }
    }

    fn evict(&mut self, node: NodeId, cause: LeaveCause) -> Result<()> {
        let sink = self.event_sink.as_deref();
        let created = self
            .rebalancer
            .push_out(&mut self.topology, &mut self.index, node, sink)?;
        self.topology.remove(node);

        info!(
            node_id = %node,
            cause = %cause,
            created = ?created,
            ring_size = self.topology.len(),
            "node removed"
        );
        notify(sink, || RingEvent::NodeLeft { node, cause });

        Ok(())
    }

    fn skip_eviction(&self, node: NodeId, load: usize, reason: EvictionSkip) {
        debug!(node_id = %node, load, reason = %reason, "underloaded node kept");
        notify(self.event_sink.as_deref(), || RingEvent::EvictionSkipped {
            node,
            load,
            reason,
        });
    }
}

#[cfg(test)]
#[path = "ring_test.rs"]
mod ring_test;
