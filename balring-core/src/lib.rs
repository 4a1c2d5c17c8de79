//! # Balring Core
//!
//! Self-balancing assignment of keys to a dynamic set of nodes arranged on a ring.
//!
//! ## Core Responsibilities
//!
//! - **Placement**: Picks an owner for each new key by stepping a deterministic cursor
//!   over the ring and comparing loads of nodes `k = ceil(n/2)` positions apart
//! - **Elastic Membership**: Creates nodes when every candidate is full and evicts nodes
//!   whose load falls below the lower bound
//! - **Rebalancing**: New nodes pull keys from overloaded peers; leaving nodes push all of
//!   their keys to survivors, oldest first
//! - **Serialized Access**: [`RingWorker`] owns a ring on one tokio task for concurrent callers
//!
//! ## Architecture
//!
//! A [`Ring`] is composed of:
//! 1. [`RingTopology`], the ordered node sequence and its traversal cursor
//! 2. [`KeyIndex`], the key → node and node → keys maps
//! 3. [`PlacementPolicy`], which draws candidates and applies the variance check
//! 4. [`RebalanceEngine`], which runs pull-in, push-out and remap
//!
//! Mutations are reported through an optional [`EventSink`]. The ring itself
//! never writes to stdout.

pub mod config;
pub mod errors;
pub mod events;
pub mod key_index;
pub mod placement;
pub mod rebalance;
pub mod report;
pub mod ring;
pub mod ring_worker;
pub mod sequence;
pub mod topology;
pub mod traversal;

use std::fmt::Debug;
use std::hash::Hash;

/// Node identifier. Distinct from the node's position in the ring.
pub type NodeId = u64;

/// Anything usable as a ring key.
pub trait RingKey: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> RingKey for T {}

// Re-export main types
pub use config::RingConfig;
pub use errors::{Result, RingError};
pub use events::{
    EventSink, EvictionSkip, JoinCause, LeaveCause, MigrationCause, RingEvent, TracingSink,
};
pub use key_index::KeyIndex;
pub use placement::{Placement, PlacementPolicy};
pub use rebalance::RebalanceEngine;
pub use report::{NodeLoad, RingReport};
pub use ring::Ring;
pub use ring_worker::{RingHandle, RingWorker};
pub use sequence::{reflect, reflect_and_reverse, reverse, Traversal, TraversalRun};
pub use topology::RingTopology;
pub use traversal::StepCursor;
