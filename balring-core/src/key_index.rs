use std::collections::{HashMap, VecDeque};

use crate::{NodeId, RingKey};

/// Bidirectional ownership bookkeeping.
///
/// `owners` maps each key to its node; `loads` keeps, per node, the keys it
/// owns in the order they arrived there. A node being drained is detached
/// from `loads` while its keys keep their old owner until re-homed.
#[derive(Debug, Clone)]
pub struct KeyIndex<K: RingKey> {
    owners: HashMap<K, NodeId>,
    loads: HashMap<NodeId, VecDeque<K>>,
}

impl<K: RingKey> Default for KeyIndex<K> {
    fn default() -> Self {
        Self {
            owners: HashMap::new(),
            loads: HashMap::new(),
        }
    }
}

impl<K: RingKey> KeyIndex<K> {
    pub fn new(nodes: &[NodeId]) -> Self {
        let mut index = Self::default();
        for &node in nodes {
            index.add_node(node);
        }
        index
    }

    /// Starts an empty load collection for the node, if it has none.
    pub fn add_node(&mut self, node: NodeId) {
        self.loads.entry(node).or_default();
    }

    pub fn has_node(&self, node: NodeId) -> bool {
        self.loads.contains_key(&node)
    }

    /// Takes the node's load collection out of the index. Its keys stay
    /// owned by `node` until each one is re-homed.
    pub fn detach_node(&mut self, node: NodeId) -> Option<VecDeque<K>> {
        self.loads.remove(&node)
    }

    /// Records a new key at the back of the node's collection.
    pub fn assign(&mut self, key: K, node: NodeId) {
        self.owners.insert(key.clone(), node);
        self.loads.entry(node).or_default().push_back(key);
    }

    /// Forgets a key entirely, returning its former owner.
    pub fn unassign(&mut self, key: &K) -> Option<NodeId> {
        let node = self.owners.remove(key)?;
        if let Some(keys) = self.loads.get_mut(&node) {
            if let Some(pos) = keys.iter().position(|k| k == key) {
                keys.remove(pos);
            }
        }
        Some(node)
    }

    /// Pops the oldest key of a node. The key keeps its old owner until
    /// `rehome` is called for it.
    pub fn pop_oldest(&mut self, node: NodeId) -> Option<K> {
        self.loads.get_mut(&node)?.pop_front()
    }

    /// Points a key that is not in any load collection at `node` and
    /// appends it there.
    pub fn rehome(&mut self, key: K, node: NodeId) {
        self.assign(key, node);
    }

    /// Moves a key between two live collections, appending at the back of
    /// the target. Returns the previous owner.
    pub fn move_key(&mut self, key: &K, to: NodeId) -> Option<NodeId> {
        let from = self.unassign(key)?;
        self.assign(key.clone(), to);
        Some(from)
    }

    pub fn owner(&self, key: &K) -> Option<NodeId> {
        self.owners.get(key).copied()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.owners.contains_key(key)
    }

    pub fn load(&self, node: NodeId) -> Option<usize> {
        self.loads.get(&node).map(VecDeque::len)
    }

    pub fn keys_of(&self, node: NodeId) -> Option<impl Iterator<Item = &K>> {
        self.loads.get(&node).map(|keys| keys.iter())
    }

    pub fn key_count(&self) -> usize {
        self.owners.len()
    }

    /// Sum of every attached load collection.
    pub fn total_load(&self) -> usize {
        self.loads.values().map(VecDeque::len).sum()
    }

    pub fn node_count(&self) -> usize {
        self.loads.len()
    }
}
