//! Opt-in observability for ring mutations.
//!
//! The ring never prints. Embedders that want node-size dumps or per-action
//! traces install an [`EventSink`]; [`TracingSink`] forwards everything to
//! `tracing`.

use std::fmt;

use tracing::{debug, info, warn};

use crate::{NodeId, RingKey};

/// Why a node joined the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinCause {
    /// Requested through `insert_node`
    Explicit,
    /// Created because no candidate had spare capacity
    CapacityEscalation,
}

/// Why a node left the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveCause {
    /// Requested through `remove_node`
    Explicit,
    /// Its load dropped below `lower_bound` after a key removal
    Underflow,
}

/// Why a key changed owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationCause {
    /// Pulled into a freshly created node
    PullIn,
    /// Pushed out of a node being removed
    PushOut,
    /// Moved on caller request
    Remap,
}

/// Why an underflowing node was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionSkip {
    /// The ring is already at `min_nodes`
    NodeFloor,
    /// The survivors cannot absorb the load and auto-creation is disabled
    NoCapacity,
}

impl fmt::Display for JoinCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinCause::Explicit => write!(f, "explicit"),
            JoinCause::CapacityEscalation => write!(f, "capacity_escalation"),
        }
    }
}

impl fmt::Display for LeaveCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaveCause::Explicit => write!(f, "explicit"),
            LeaveCause::Underflow => write!(f, "underflow"),
        }
    }
}

impl fmt::Display for MigrationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationCause::PullIn => write!(f, "pull_in"),
            MigrationCause::PushOut => write!(f, "push_out"),
            MigrationCause::Remap => write!(f, "remap"),
        }
    }
}

impl fmt::Display for EvictionSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionSkip::NodeFloor => write!(f, "node_floor"),
            EvictionSkip::NoCapacity => write!(f, "no_capacity"),
        }
    }
}

/// Events emitted by the ring while it mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RingEvent<K> {
    NodeJoined {
        node: NodeId,
        cause: JoinCause,
    },
    NodeLeft {
        node: NodeId,
        cause: LeaveCause,
    },
    KeyPlaced {
        key: K,
        node: NodeId,
    },
    KeyRemoved {
        key: K,
        node: NodeId,
    },
    KeyMigrated {
        key: K,
        from: NodeId,
        to: NodeId,
        cause: MigrationCause,
    },
    /// A new node finished pulling keys in.
    PullInCompleted {
        node: NodeId,
        ideal: usize,
        moved: usize,
    },
    /// A node was fully drained before removal.
    PushOutCompleted {
        node: NodeId,
        moved: usize,
        /// Nodes created because no survivor had room
        created: Vec<NodeId>,
    },
    /// A node fell below `lower_bound` but stayed in the ring.
    EvictionSkipped {
        node: NodeId,
        load: usize,
        reason: EvictionSkip,
    },
}

/// Receiver of ring events.
pub trait EventSink<K>: Send + Sync {
    fn emit(&self, event: &RingEvent<K>);
}

impl<K, F> EventSink<K> for F
where
    F: Fn(&RingEvent<K>) + Send + Sync,
{
    fn emit(&self, event: &RingEvent<K>) {
        self(event)
    }
}

/// Builds and emits the event only when a sink is installed.
pub(crate) fn notify<K>(sink: Option<&dyn EventSink<K>>, event: impl FnOnce() -> RingEvent<K>) {
    if let Some(sink) = sink {
        sink.emit(&event());
    }
}

/// Forwards ring events to `tracing`: membership at `info`, key traffic at
/// `debug`, skipped evictions at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl<K: RingKey> EventSink<K> for TracingSink {
    fn emit(&self, event: &RingEvent<K>) {
        match event {
            RingEvent::NodeJoined { node, cause } => {
                info!(node_id = %node, cause = %cause, "node joined the ring");
            }
            RingEvent::NodeLeft { node, cause } => {
                info!(node_id = %node, cause = %cause, "node left the ring");
            }
            RingEvent::KeyPlaced { key, node } => {
                debug!(key = ?key, node_id = %node, "key placed");
            }
            RingEvent::KeyRemoved { key, node } => {
                debug!(key = ?key, node_id = %node, "key removed");
            }
            RingEvent::KeyMigrated {
                key,
                from,
                to,
                cause,
            } => {
                debug!(key = ?key, from = %from, to = %to, cause = %cause, "key migrated");
            }
            RingEvent::PullInCompleted { node, ideal, moved } => {
                info!(node_id = %node, ideal, moved, "node pulled keys in");
            }
            RingEvent::PushOutCompleted {
                node,
                moved,
                created,
            } => {
                info!(node_id = %node, moved, created = ?created, "node drained");
            }
            RingEvent::EvictionSkipped { node, load, reason } => {
                warn!(node_id = %node, load, reason = %reason, "underloaded node kept in the ring");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_closure_sink_receives_events() {
        let seen: Arc<Mutex<Vec<RingEvent<u32>>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_cloned = Arc::clone(&seen);
        let sink = move |event: &RingEvent<u32>| {
            seen_cloned.lock().unwrap().push(event.clone());
        };

        sink.emit(&RingEvent::KeyPlaced { key: 7, node: 1 });
        sink.emit(&RingEvent::NodeLeft {
            node: 1,
            cause: LeaveCause::Underflow,
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], RingEvent::KeyPlaced { key: 7, node: 1 });
    }

    #[test]
    fn test_tracing_sink_accepts_every_variant() {
        let sink = TracingSink;
        let events: Vec<RingEvent<&str>> = vec![
            RingEvent::NodeJoined {
                node: 3,
                cause: JoinCause::CapacityEscalation,
            },
            RingEvent::KeyMigrated {
                key: "k",
                from: 0,
                to: 3,
                cause: MigrationCause::PullIn,
            },
            RingEvent::PushOutCompleted {
                node: 0,
                moved: 2,
                created: vec![],
            },
            RingEvent::EvictionSkipped {
                node: 0,
                load: 1,
                reason: EvictionSkip::NodeFloor,
            },
        ];
        for event in &events {
            sink.emit(event);
        }
    }

    #[test]
    fn test_cause_display() {
        assert_eq!(JoinCause::CapacityEscalation.to_string(), "capacity_escalation");
        assert_eq!(LeaveCause::Underflow.to_string(), "underflow");
        assert_eq!(MigrationCause::PushOut.to_string(), "push_out");
        assert_eq!(EvictionSkip::NoCapacity.to_string(), "no_capacity");
    }
}
