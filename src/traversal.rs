// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Depth-first walks over the remote address space.
//!
//! Three walks are built on [`ChildBrowser`]:
//!
//! - [`OpcUaClient::browse_children`]: flat enumeration into a [`NodeIdMap`],
//!   following only children in the same namespace as their parent.
//! - [`OpcUaClient::browse_tree`]: builds a [`UaNodeTree`] mirror, following
//!   every child outside namespace 0 and keying it by its BrowseName attribute.
//! - [`OpcUaClient::delete_tree`]: flat enumeration followed by one cascading
//!   delete per non-standard node.
//!
//! The two enumeration filters differ on purpose. The flat walk never leaves
//! the namespace it started in; the tree walk crosses into any non-zero
//! namespace.
//!
//! All walks use an explicit stack and hold the connection lock for one
//! remote call at a time. A failed call is counted in the returned
//! [`WalkStatus`] and the walk continues with the remaining nodes; whatever
//! was collected is kept.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::browse::ChildBrowser;
use crate::client::{OpcUaClient, OpcUaTransport};
use crate::error::{BrowseError, OpcUaError, OpcUaResult};
use crate::node_map::NodeIdMap;
use crate::tree::{NodeIndex, UaNodeTree};
use crate::types::{NodeId, StatusCode};

// =============================================================================
// WalkStatus
// =============================================================================

/// Summary of the remote calls made by one walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStatus {
    /// Status of the most recent remote call.
    pub last_status: StatusCode,

    /// Number of remote calls made.
    pub calls: usize,

    /// Number of remote calls that returned a bad status.
    pub failures: usize,
}

impl Default for WalkStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl WalkStatus {
    /// Creates a status with no calls recorded.
    pub fn new() -> Self {
        Self {
            last_status: StatusCode::GOOD,
            calls: 0,
            failures: 0,
        }
    }

    /// Records the status of one remote call.
    pub fn record(&mut self, status: StatusCode) {
        self.calls += 1;
        if status.is_bad() {
            self.failures += 1;
        }
        self.last_status = status;
    }

    /// Returns `true` if no remote call failed.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.failures == 0
    }

    /// Returns `true` if the most recent remote call succeeded.
    #[inline]
    pub fn last_ok(&self) -> bool {
        !self.last_status.is_bad()
    }
}

impl fmt::Display for WalkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} calls, {} failed, last {}",
            self.calls, self.failures, self.last_status
        )
    }
}

// =============================================================================
// Walks
// =============================================================================

impl<T: OpcUaTransport> OpcUaClient<T> {
    /// Collects every same-namespace descendant of `node_id` into `visited`.
    ///
    /// A child is followed only if its namespace equals that of the node it
    /// was found under, and only if it is not already in `visited`. The start
    /// node itself is not inserted; see [`browse_tree_flat`](Self::browse_tree_flat).
    ///
    /// Nodes already present in `visited` are treated as seen and not
    /// browsed again, so a map can be shared across several calls.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotConnected` if the client is not connected.
    pub async fn browse_children(
        &self,
        node_id: &NodeId,
        visited: &mut NodeIdMap,
    ) -> OpcUaResult<WalkStatus> {
        self.ensure_connected().await?;

        let mut walk = WalkStatus::new();
        let mut browser = ChildBrowser::new();
        let mut stack = vec![node_id.clone()];

        while let Some(current) = stack.pop() {
            let status = browser.browse_connected(self, &current).await;
            walk.record(status);

            let mut next: Vec<NodeId> = browser
                .list()
                .iter()
                .filter(|c| c.node_id.namespace_index == current.namespace_index)
                .filter(|c| visited.put(c.node_id.clone()))
                .map(|c| c.node_id.clone())
                .collect();

            // Reverse so the first child is popped first.
            next.reverse();
            stack.extend(next);
        }

        debug!(
            node_id = %node_id,
            visited = visited.len(),
            walk = %walk,
            "Flat browse complete"
        );

        Ok(walk)
    }

    /// Inserts `node_id` into `visited`, then collects its same-namespace
    /// descendants as [`browse_children`](Self::browse_children) does.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotConnected` if the client is not connected.
    pub async fn browse_tree_flat(
        &self,
        node_id: &NodeId,
        visited: &mut NodeIdMap,
    ) -> OpcUaResult<WalkStatus> {
        self.ensure_connected().await?;
        visited.put(node_id.clone());
        self.browse_children(node_id, visited).await
    }

    /// Mirrors the subtree under `node_id` into `tree`.
    ///
    /// The root of `tree` is given `node_id` as its identity. Every forward
    /// child outside namespace 0 has its BrowseName read; on success it is
    /// added under its parent keyed by that name and walked in turn. A child
    /// whose read fails is skipped along with its subtree.
    ///
    /// A child whose name is already taken under the same parent is logged
    /// and skipped. A child that already appears among its own ancestors is
    /// skipped, which stops the walk on cyclic graphs. A node reachable from
    /// two parents appears under both.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotConnected` if the client is not connected,
    /// or `BrowseError::DataAlreadySet` if the tree root already carries a
    /// different identity.
    pub async fn browse_tree(
        &self,
        node_id: &NodeId,
        tree: &mut UaNodeTree,
    ) -> OpcUaResult<WalkStatus> {
        self.ensure_connected().await?;

        let root = tree.root();
        if tree.data(root) != Some(node_id) {
            tree.set_data(root, node_id.clone())?;
        }

        let mut walk = WalkStatus::new();
        let mut browser = ChildBrowser::new();
        let mut stack: Vec<(NodeId, NodeIndex)> = vec![(node_id.clone(), root)];

        while let Some((current, index)) = stack.pop() {
            let status = browser.browse_connected(self, &current).await;
            walk.record(status);

            let candidates: Vec<NodeId> = browser
                .list()
                .iter()
                .filter(|c| c.node_id.namespace_index > 0)
                .map(|c| c.node_id.clone())
                .collect();

            let mut next = Vec::with_capacity(candidates.len());
            for child in candidates {
                if on_ancestor_chain(tree, index, &child) {
                    debug!(node_id = %child, "Skipping cyclic reference");
                    continue;
                }

                let (status, name) = self.read_browse_name(&child).await;
                walk.record(status);
                let Some(name) = name else {
                    continue;
                };

                let child_index = match tree.create_child(index, name.as_str()) {
                    Ok(child_index) => child_index,
                    Err(OpcUaError::Browse(BrowseError::DuplicateChild { .. })) => {
                        warn!(
                            parent = %current,
                            node_id = %child,
                            browse_name = %name,
                            "Duplicate browse name under one parent, skipping"
                        );
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                tree.set_data(child_index, child.clone())?;
                next.push((child, child_index));
            }

            next.reverse();
            stack.extend(next);
        }

        debug!(
            node_id = %node_id,
            nodes = tree.len(),
            walk = %walk,
            "Tree browse complete"
        );

        Ok(walk)
    }

    /// Deletes the subtree under `node_id`, including `node_id` itself.
    ///
    /// The subtree is enumerated with [`browse_tree_flat`](Self::browse_tree_flat),
    /// then every collected node outside namespace 0 receives one delete call
    /// with target references removed. Namespace 0 nodes are never deleted.
    /// Deletes are issued in no particular order and a failed delete does
    /// not stop the others.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotConnected` if the client is not connected.
    pub async fn delete_tree(&self, node_id: &NodeId) -> OpcUaResult<WalkStatus> {
        self.ensure_connected().await?;

        let mut visited = NodeIdMap::new();
        let mut walk = self.browse_tree_flat(node_id, &mut visited).await?;

        let mut deleted = 0usize;
        for target in visited.non_standard() {
            let status = self.delete_node(target, true).await;
            walk.record(status);
            if status.is_good() {
                deleted += 1;
            }
        }

        debug!(
            node_id = %node_id,
            collected = visited.len(),
            deleted = deleted,
            walk = %walk,
            "Tree delete complete"
        );

        Ok(walk)
    }
}

/// Returns `true` if `node_id` is attached to `index` or one of its ancestors.
fn on_ancestor_chain(tree: &UaNodeTree, index: NodeIndex, node_id: &NodeId) -> bool {
    let mut cursor = Some(index);
    while let Some(i) = cursor {
        if tree.data(i) == Some(node_id) {
            return true;
        }
        cursor = tree.parent(i);
    }
    false
}

// =============================================================================
// Tests
// =============================================================================
