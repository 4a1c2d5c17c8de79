use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::{Result, RingError};
use crate::NodeId;

pub const DEFAULT_UPPER_BOUND: usize = 35;
pub const DEFAULT_LOWER_BOUND: usize = 5;
pub const DEFAULT_VARIANCE_FACTOR: usize = 2;

/// Ring configuration, fixed once the ring is constructed
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RingConfig {
    /// Ordered node identifiers the ring starts with
    #[serde(default)]
    pub initial_nodes: Vec<NodeId>,
    /// Max keys a node may own before placement spills into a new node
    #[serde(default = "default_upper_bound")]
    pub upper_bound: usize,
    /// A node whose load drops below this after a key removal is evicted
    #[serde(default = "default_lower_bound")]
    pub lower_bound: usize,
    /// Load skew tolerated between the two candidates of a placement draw
    #[serde(default = "default_variance_factor")]
    pub variance_factor: usize,
    /// Create nodes when every candidate is full, instead of failing
    #[serde(default = "default_auto_create_nodes")]
    pub auto_create_nodes: bool,
    /// Underflow eviction never shrinks the ring below this many nodes
    #[serde(default = "default_min_nodes")]
    pub min_nodes: usize,
}

fn default_upper_bound() -> usize {
    DEFAULT_UPPER_BOUND
}

fn default_lower_bound() -> usize {
    DEFAULT_LOWER_BOUND
}

fn default_variance_factor() -> usize {
    DEFAULT_VARIANCE_FACTOR
}

fn default_auto_create_nodes() -> bool {
    true
}

fn default_min_nodes() -> usize {
    1
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            initial_nodes: Vec::new(),
            upper_bound: DEFAULT_UPPER_BOUND,
            lower_bound: DEFAULT_LOWER_BOUND,
            variance_factor: DEFAULT_VARIANCE_FACTOR,
            auto_create_nodes: true,
            min_nodes: 1,
        }
    }
}

impl RingConfig {
    pub fn new(
        initial_nodes: impl IntoIterator<Item = NodeId>,
        upper_bound: usize,
        lower_bound: usize,
        variance_factor: usize,
    ) -> Self {
        Self {
            initial_nodes: initial_nodes.into_iter().collect(),
            upper_bound,
            lower_bound,
            variance_factor,
            ..Default::default()
        }
    }

    pub fn with_auto_create_nodes(mut self, enabled: bool) -> Self {
        self.auto_create_nodes = enabled;
        self
    }

    pub fn with_min_nodes(mut self, min_nodes: usize) -> Self {
        self.min_nodes = min_nodes;
        self
    }

    /// Checks the bounds are coherent and the initial nodes are distinct
    pub fn validate(&self) -> Result<()> {
        if self.upper_bound == 0 {
            return Err(RingError::InvalidConfig(
                "upper_bound must be at least 1".to_string(),
            ));
        }

        if self.lower_bound > self.upper_bound {
            return Err(RingError::InvalidConfig(format!(
                "lower_bound ({}) exceeds upper_bound ({})",
                self.lower_bound, self.upper_bound
            )));
        }

        if self.min_nodes == 0 {
            return Err(RingError::InvalidConfig(
                "min_nodes must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.initial_nodes.len());
        for node in &self.initial_nodes {
            if !seen.insert(*node) {
                return Err(RingError::InvalidConfig(format!(
                    "node {} listed twice in initial_nodes",
                    node
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_config_defaults() {
        let config = RingConfig::default();
        assert!(config.initial_nodes.is_empty());
        assert_eq!(config.upper_bound, 35);
        assert_eq!(config.lower_bound, 5);
        assert_eq!(config.variance_factor, 2);
        assert!(config.auto_create_nodes);
        assert_eq!(config.min_nodes, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = RingConfig::new(0..4, 10, 3, 1)
            .with_auto_create_nodes(false)
            .with_min_nodes(2);
        assert_eq!(config.initial_nodes, vec![0, 1, 2, 3]);
        assert_eq!(config.upper_bound, 10);
        assert_eq!(config.lower_bound, 3);
        assert_eq!(config.variance_factor, 1);
        assert!(!config.auto_create_nodes);
        assert_eq!(config.min_nodes, 2);
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let config = RingConfig::new(0..3, 4, 5, 2);
        assert!(matches!(
            config.validate(),
            Err(RingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_upper_bound() {
        let config = RingConfig::new(0..3, 0, 0, 2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_min_nodes() {
        let config = RingConfig::new(0..3, 10, 3, 2).with_min_nodes(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_initial_nodes() {
        let config = RingConfig::new([1, 2, 1], 10, 3, 2);
        let err = config.validate().unwrap_err();
        assert_eq!(
            err,
            RingError::InvalidConfig("node 1 listed twice in initial_nodes".to_string())
        );
    }

    #[test]
    fn test_deserialize_fills_missing_fields() {
        let config: RingConfig =
            serde_json::from_str(r#"{"initial_nodes":[0,1,2],"upper_bound":10}"#).unwrap();
        assert_eq!(config.initial_nodes, vec![0, 1, 2]);
        assert_eq!(config.upper_bound, 10);
        assert_eq!(config.lower_bound, DEFAULT_LOWER_BOUND);
        assert_eq!(config.variance_factor, DEFAULT_VARIANCE_FACTOR);
        assert!(config.auto_create_nodes);
    }
}
