// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Local mirror of a remote subtree.
//!
//! [`UaNodeTree`] is an arena: every node lives in one vector and is
//! addressed by a stable [`NodeIndex`]. Each node records its parent index
//! and a browse-name keyed map to its children, so removing a subtree never
//! leaves dangling references.
//!
//! # Invariants
//!
//! - The root exists for the whole life of the tree.
//! - Child browse names are unique within one parent;
//!   [`UaNodeTree::create_child`] fails fast on a duplicate.
//! - A node's [`NodeId`] is assigned at most once.
//!
//! ```
//! use opcua_navigator::tree::UaNodeTree;
//! use opcua_navigator::types::NodeId;
//!
//! let mut tree = UaNodeTree::with_root("Objects", NodeId::OBJECTS_FOLDER);
//! let line = tree.create_child(tree.root(), "Line1").unwrap();
//! tree.set_data(line, NodeId::numeric(2, 1)).unwrap();
//!
//! assert!(tree.create_child(tree.root(), "Line1").is_err());
//! assert_eq!(tree.path_of(line), vec!["Objects", "Line1"]);
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BrowseError, OpcUaError, OpcUaResult};
use crate::types::NodeId;

// =============================================================================
// NodeIndex
// =============================================================================

/// Stable handle to a node inside one [`UaNodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Returns the raw slot number.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// UaNode
// =============================================================================

/// One node of the local tree.
#[derive(Debug, Clone)]
pub struct UaNode {
    name: String,
    parent: Option<NodeIndex>,
    children: HashMap<String, NodeIndex>,
    order: Vec<NodeIndex>,
    data: Option<NodeId>,
}

impl UaNode {
    fn new(name: String, parent: Option<NodeIndex>) -> Self {
        Self {
            name,
            parent,
            children: HashMap::new(),
            order: Vec::new(),
            data: None,
        }
    }

    /// Browse name used as the key in the parent.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent index, `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// Attached remote identity.
    #[inline]
    pub fn data(&self) -> Option<&NodeId> {
        self.data.as_ref()
    }

    /// Number of direct children.
    #[inline]
    pub fn child_count(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the node has no children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.order.is_empty()
    }
}

// =============================================================================
// UaNodeTree
// =============================================================================

/// Arena-backed tree mirroring a remote subtree.
#[derive(Debug, Clone)]
pub struct UaNodeTree {
    slots: Vec<Option<UaNode>>,
    root: NodeIndex,
    live: usize,
}

impl UaNodeTree {
    /// Creates a tree with an unassigned root.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            slots: vec![Some(UaNode::new(root_name.into(), None))],
            root: NodeIndex(0),
            live: 1,
        }
    }

    /// Creates a tree whose root already carries `node_id`.
    pub fn with_root(root_name: impl Into<String>, node_id: NodeId) -> Self {
        let mut tree = Self::new(root_name);
        if let Some(Some(root)) = tree.slots.first_mut() {
            root.data = Some(node_id);
        }
        tree
    }

    /// Root index. Always valid.
    #[inline]
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Number of live nodes, root included.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if only the root exists.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 1
    }

    /// Returns the node at `index`, or `None` if it was removed.
    pub fn node(&self, index: NodeIndex) -> Option<&UaNode> {
        self.slots.get(index.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, index: NodeIndex) -> OpcUaResult<&mut UaNode> {
        self.slots
            .get_mut(index.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| OpcUaError::browse(BrowseError::UnknownTreeNode { index: index.0 }))
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Creates a child keyed by `name` under `parent`.
    ///
    /// # Errors
    ///
    /// - [`BrowseError::DuplicateChild`] if `parent` already has a child
    ///   with that name; the existing child is left untouched.
    /// - [`BrowseError::UnknownTreeNode`] if `parent` is not live.
    pub fn create_child(&mut self, parent: NodeIndex, name: impl Into<String>) -> OpcUaResult<NodeIndex> {
        let name = name.into();
        let index = NodeIndex(self.slots.len());

        let parent_node = self.node_mut(parent)?;
        if parent_node.children.contains_key(&name) {
            return Err(OpcUaError::browse(BrowseError::duplicate_child(parent.0, name)));
        }
        parent_node.children.insert(name.clone(), index);
        parent_node.order.push(index);

        self.slots.push(Some(UaNode::new(name, Some(parent))));
        self.live += 1;
        Ok(index)
    }

    /// Attaches the remote identity of a node.
    ///
    /// # Errors
    ///
    /// [`BrowseError::DataAlreadySet`] if the node already has an identity.
    pub fn set_data(&mut self, index: NodeIndex, node_id: NodeId) -> OpcUaResult<()> {
        let node = self.node_mut(index)?;
        if let Some(existing) = &node.data {
            return Err(OpcUaError::browse(BrowseError::DataAlreadySet {
                index: index.0,
                node_id: existing.to_string(),
            }));
        }
        node.data = Some(node_id);
        Ok(())
    }

    /// Removes the child `name` of `parent` together with its subtree.
    ///
    /// Returns the number of nodes removed; 0 if there was no such child.
    /// Indices of removed nodes become invalid.
    pub fn remove_child(&mut self, parent: NodeIndex, name: &str) -> OpcUaResult<usize> {
        let parent_node = self.node_mut(parent)?;
        let Some(child) = parent_node.children.remove(name) else {
            return Ok(0);
        };
        parent_node.order.retain(|c| *c != child);

        let mut removed = 0;
        let mut stack = vec![child];
        while let Some(index) = stack.pop() {
            if let Some(node) = self.slots.get_mut(index.0).and_then(Option::take) {
                stack.extend(node.order);
                removed += 1;
            }
        }
        self.live -= removed;
        Ok(removed)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Looks up a direct child by browse name.
    pub fn find_child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.node(parent).and_then(|n| n.children.get(name).copied())
    }

    /// Direct children of `parent` in creation order.
    pub fn children(&self, parent: NodeIndex) -> &[NodeIndex] {
        self.node(parent).map(|n| n.order.as_slice()).unwrap_or(&[])
    }

    /// Parent of `index`.
    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.node(index).and_then(UaNode::parent)
    }

    /// Remote identity attached to `index`.
    pub fn data(&self, index: NodeIndex) -> Option<&NodeId> {
        self.node(index).and_then(UaNode::data)
    }

    /// Browse names from the root down to `index`, both included.
    pub fn path_of(&self, index: NodeIndex) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = Some(index);
        while let Some(current) = cursor {
            match self.node(current) {
                Some(node) => {
                    names.push(node.name.clone());
                    cursor = node.parent;
                }
                None => break,
            }
        }
        names.reverse();
        names
    }

    /// Resolves a sequence of child names starting at the root.
    pub fn lookup_path<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeIndex> {
        path.iter()
            .try_fold(self.root, |current, name| self.find_child(current, name.as_ref()))
    }

    /// Depth of `index`; the root is 0.
    pub fn depth(&self, index: NodeIndex) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent(index);
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.parent(parent);
        }
        depth
    }

    /// Pre-order, depth-first listing of live nodes.
    pub fn depth_first(&self) -> Vec<NodeIndex> {
        let mut out = Vec::with_capacity(self.live);
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            out.push(index);
            stack.extend(self.children(index).iter().rev().copied());
        }
        out
    }

    /// Every attached identity in depth-first order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.depth_first()
            .into_iter()
            .filter_map(|index| self.data(index).cloned())
            .collect()
    }

    /// Renders the tree as indented text, one node per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for index in self.depth_first() {
            let Some(node) = self.node(index) else {
                continue;
            };
            let indent = "  ".repeat(self.depth(index));
            match &node.data {
                Some(id) => out.push_str(&format!("{}{} ({})\n", indent, node.name, id)),
                None => out.push_str(&format!("{}{}\n", indent, node.name)),
            }
        }
        out
    }
}

impl fmt::Display for UaNodeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// =============================================================================
// Tests
// =============================================================================
