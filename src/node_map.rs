// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Visited-node bookkeeping keyed by canonical node ID strings.
//!
//! [`NodeIdMap`] is the cycle guard for recursive walks and the accumulator
//! for flat subtree enumeration. Iteration order is unspecified.

use std::collections::hash_map::{self, HashMap};

use crate::types::NodeId;

/// Mapping from canonical node ID string to the node ID itself.
///
/// Keys come from [`NodeId::to_opc_string`], so two entries collide iff the
/// node IDs are equal.
///
/// # Examples
///
/// ```
/// use opcua_navigator::node_map::NodeIdMap;
/// use opcua_navigator::types::NodeId;
///
/// let mut visited = NodeIdMap::new();
/// visited.put(NodeId::numeric(2, 10));
/// visited.put(NodeId::numeric(2, 10));
/// assert_eq!(visited.len(), 1);
/// assert!(visited.contains(&NodeId::numeric(2, 10)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeIdMap {
    entries: HashMap<String, NodeId>,
}

impl NodeIdMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Inserts a node ID. Re-inserting an equal ID replaces it in place.
    ///
    /// Returns `true` if the ID was not present before.
    pub fn put(&mut self, node_id: NodeId) -> bool {
        self.entries.insert(node_id.to_opc_string(), node_id).is_none()
    }

    /// Returns `true` if the node ID is present.
    #[inline]
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.entries.contains_key(&node_id.to_opc_string())
    }

    /// Returns `true` if the canonical key is present.
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Looks up a node ID by canonical key.
    pub fn get(&self, key: &str) -> Option<&NodeId> {
        self.entries.get(key)
    }

    /// Removes a node ID, returning it if present.
    pub fn remove(&mut self, node_id: &NodeId) -> Option<NodeId> {
        self.entries.remove(&node_id.to_opc_string())
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates over the stored node IDs.
    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.entries.values()
    }

    /// Iterates over the canonical keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over entries outside namespace 0.
    pub fn non_standard(&self) -> impl Iterator<Item = &NodeId> {
        self.entries.values().filter(|id| !id.is_standard())
    }

    /// Returns the stored IDs sorted by canonical key.
    ///
    /// Useful for stable logging and tests.
    pub fn to_sorted_vec(&self) -> Vec<NodeId> {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|k| self.entries.get(k).cloned())
            .collect()
    }
}

impl Extend<NodeId> for NodeIdMap {
    fn extend<I: IntoIterator<Item = NodeId>>(&mut self, iter: I) {
        for node_id in iter {
            self.put(node_id);
        }
    }
}

impl FromIterator<NodeId> for NodeIdMap {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl IntoIterator for NodeIdMap {
    type Item = NodeId;
    type IntoIter = hash_map::IntoValues<String, NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}
