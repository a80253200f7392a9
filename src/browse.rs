// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Single-step child discovery and browse paths.
//!
//! [`ChildBrowser`] wraps one discover-children call into an ordered list that
//! can be searched by browse name. It is the only component that issues
//! browse requests; traversal and path resolution are built on it.
//!
//! # Examples
//!
//! ```rust,ignore
//! use opcua_navigator::browse::ChildBrowser;
//! use opcua_navigator::types::NodeId;
//!
//! let mut browser = ChildBrowser::new();
//! browser.browse(&client, &NodeId::OBJECTS_FOLDER).await?;
//!
//! if let Some(index) = browser.find("Server") {
//!     println!("Server node: {}", browser.list()[index].node_id);
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::client::{OpcUaClient, OpcUaTransport};
use crate::error::{BrowseError, OpcUaError, OpcUaResult};
use crate::types::{NodeClass, NodeId, StatusCode};

// =============================================================================
// Standard Reference Type Node IDs (OPC UA Part 5)
// =============================================================================

/// Standard OPC UA reference type node IDs.
pub mod reference_types {
    use crate::types::NodeId;

    /// References (abstract base type) - i=31.
    pub fn references() -> NodeId {
        NodeId::numeric(0, 31)
    }

    /// HierarchicalReferences (abstract) - i=33.
    pub fn hierarchical_references() -> NodeId {
        NodeId::numeric(0, 33)
    }

    /// Organizes - i=35.
    pub fn organizes() -> NodeId {
        NodeId::numeric(0, 35)
    }

    /// HasTypeDefinition - i=40.
    pub fn has_type_definition() -> NodeId {
        NodeId::numeric(0, 40)
    }

    /// HasProperty - i=46.
    pub fn has_property() -> NodeId {
        NodeId::numeric(0, 46)
    }

    /// HasComponent - i=47.
    pub fn has_component() -> NodeId {
        NodeId::numeric(0, 47)
    }
}

/// Standard OPC UA type definition node IDs.
pub mod type_definitions {
    use crate::types::NodeId;

    /// FolderType - i=61.
    pub fn folder_type() -> NodeId {
        NodeId::numeric(0, 61)
    }

    /// BaseDataVariableType - i=63.
    pub fn base_data_variable_type() -> NodeId {
        NodeId::numeric(0, 63)
    }
}

// =============================================================================
// ChildReference
// =============================================================================

/// One forward child returned by a browse step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildReference {
    /// Child node.
    pub node_id: NodeId,

    /// Browse name of the child, without namespace prefix.
    pub browse_name: String,

    /// Reference type linking parent to child.
    pub reference_type_id: NodeId,

    /// Node class of the child.
    #[serde(default)]
    pub node_class: NodeClass,
}

impl fmt::Display for ChildReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.browse_name, self.node_id)
    }
}

// =============================================================================
// ChildBrowser
// =============================================================================

/// Ordered list of the forward children of one node.
///
/// Each call to [`browse`](Self::browse) replaces the list with the result of
/// exactly one remote call. Inverse references are dropped so the list only
/// ever holds descendants.
#[derive(Debug, Clone)]
pub struct ChildBrowser {
    children: Vec<ChildReference>,
    status: StatusCode,
}

impl Default for ChildBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl ChildBrowser {
    /// Creates an empty browser.
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            status: StatusCode::GOOD,
        }
    }

    /// Replaces the list with the forward children of `parent`.
    ///
    /// A failed call leaves the list empty; the status says why.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotConnected` if the client is not connected.
    pub async fn browse<T: OpcUaTransport>(
        &mut self,
        client: &OpcUaClient<T>,
        parent: &NodeId,
    ) -> OpcUaResult<StatusCode> {
        client.ensure_connected().await?;
        Ok(self.browse_connected(client, parent).await)
    }

    /// Browse step used inside operations that already checked the
    /// connection.
    pub(crate) async fn browse_connected<T: OpcUaTransport>(
        &mut self,
        client: &OpcUaClient<T>,
        parent: &NodeId,
    ) -> StatusCode {
        self.children.clear();

        let (status, references) = client.browse_references(parent).await;
        self.status = status;
        self.children.extend(
            references
                .into_iter()
                .filter(|r| r.is_forward)
                .map(|r| ChildReference {
                    node_id: r.node_id,
                    browse_name: r.browse_name.name,
                    reference_type_id: r.reference_type_id,
                    node_class: r.node_class,
                }),
        );
        status
    }

    /// Returns the index of the first child named exactly `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|c| c.browse_name == name)
    }

    /// Returns the first child named exactly `name`.
    pub fn find_child(&self, name: &str) -> Option<&ChildReference> {
        self.find(name).map(|i| &self.children[i])
    }

    /// Returns the child entries in server order.
    #[inline]
    pub fn list(&self) -> &[ChildReference] {
        &self.children
    }

    /// Returns the child at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&ChildReference> {
        self.children.get(index)
    }

    /// Status of the last browse call.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the number of children.
    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if the last browse found no children.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Consumes the browser, returning the children.
    pub fn into_children(self) -> Vec<ChildReference> {
        self.children
    }
}

// =============================================================================
// BrowsePath
// =============================================================================

/// A start node plus browse-name segments, parsed from `"Objects/Line1/Sensor3"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowsePath {
    /// Starting node.
    pub start_node: NodeId,

    /// Browse names to follow.
    pub segments: Vec<String>,
}

impl BrowsePath {
    /// Creates a browse path with a custom start node.
    pub fn new(start_node: NodeId, segments: Vec<String>) -> Self {
        Self {
            start_node,
            segments,
        }
    }

    /// Creates a browse path from the Objects folder.
    pub fn from_objects<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            NodeId::OBJECTS_FOLDER,
            segments.into_iter().map(Into::into).collect(),
        )
    }

    /// Parses a `/`-separated path.
    ///
    /// A leading `Objects`, `Root`, `Types` or `Views` segment (any case)
    /// selects the start node; otherwise the path starts at Objects.
    ///
    /// # Errors
    ///
    /// Returns `BrowseError::InvalidPath` if the path has no segments.
    pub fn from_string(path: &str) -> OpcUaResult<Self> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let Some(first) = parts.first() else {
            return Err(OpcUaError::browse(BrowseError::invalid_path(
                path,
                "Empty path",
            )));
        };

        let (start_node, skip) = match first.to_lowercase().as_str() {
            "objects" => (NodeId::OBJECTS_FOLDER, 1),
            "root" => (NodeId::ROOT_FOLDER, 1),
            "types" => (NodeId::TYPES_FOLDER, 1),
            "views" => (NodeId::VIEWS_FOLDER, 1),
            _ => (NodeId::OBJECTS_FOLDER, 0),
        };

        let segments = parts.iter().skip(skip).map(|s| s.to_string()).collect();

        Ok(Self {
            start_node,
            segments,
        })
    }

    /// Returns `true` if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Appends a segment.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    /// Returns the segments joined by `/`.
    pub fn to_path_string(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for BrowsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path_string())
    }
}

// =============================================================================
// BrowseStatistics
// =============================================================================

/// Statistics for browse calls.
#[derive(Debug, Default)]
pub struct BrowseStatistics {
    /// Total browse calls performed.
    pub browse_count: AtomicU64,

    /// Total references returned.
    pub nodes_discovered: AtomicU64,

    /// Failed browse calls.
    pub errors: AtomicU64,
}

impl BrowseStatistics {
    /// Creates new statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful browse call.
    pub fn record_browse(&self, node_count: usize) {
        self.browse_count.fetch_add(1, Ordering::Relaxed);
        self.nodes_discovered
            .fetch_add(node_count as u64, Ordering::Relaxed);
    }

    /// Records a failed browse call.
    pub fn record_error(&self) {
        self.browse_count.fetch_add(1, Ordering::Relaxed);
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the total number of browse calls.
    pub fn browses(&self) -> u64 {
        self.browse_count.load(Ordering::Relaxed)
    }

    /// Returns the fraction of browse calls that failed.
    pub fn error_rate(&self) -> f64 {
        let total = self.browse_count.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            self.errors.load(Ordering::Relaxed) as f64 / total as f64
        }
    }

    /// Resets all statistics.
    pub fn reset(&self) {
        self.browse_count.store(0, Ordering::Relaxed);
        self.nodes_discovered.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}

// =============================================================================
// Tests
// =============================================================================
