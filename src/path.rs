// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Browse-name path resolution and node creation.
//!
//! A path is a sequence of browse names followed one level at a time from a
//! start node. [`OpcUaClient::resolve_path`] only looks up;
//! [`OpcUaClient::resolve_or_create_path`] creates a folder for every
//! segment from the first one that is missing.
//!
//! # Concurrency
//!
//! Each browse and each add-node call takes the connection lock on its own.
//! Two tasks creating the same missing path at the same time can both see
//! the segment as missing and both create it, leaving duplicate folders.
//! Callers that need one folder per name must serialize path creation
//! themselves.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::browse::{reference_types, type_definitions, BrowsePath, ChildBrowser};
use crate::client::{
    AddNodeRequest, AddNodeResult, NodeAttributes, NodeKind, OpcUaClient, OpcUaTransport,
    OpcUaValue,
};
use crate::error::OpcUaResult;
use crate::types::{NodeId, QualifiedName, StatusCode};

// =============================================================================
// PathOutcome
// =============================================================================

/// Result of resolving a browse path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathOutcome {
    /// Identity of the final segment when the whole path resolved.
    pub node_id: Option<NodeId>,

    /// `Good`, `BadNoMatch` when a segment was missing, or the status of
    /// the remote call that failed.
    pub status: StatusCode,

    /// Folders created along the way, in path order. These are not removed
    /// when a later segment fails.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created: Vec<NodeId>,

    /// Bad status of a lookup browse that was treated as a missing segment
    /// by [`OpcUaClient::resolve_or_create_path`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_status: Option<StatusCode>,
}

impl PathOutcome {
    fn resolved(node_id: NodeId, created: Vec<NodeId>) -> Self {
        Self {
            node_id: Some(node_id),
            status: StatusCode::GOOD,
            created,
            lookup_status: None,
        }
    }

    fn failed(status: StatusCode, created: Vec<NodeId>) -> Self {
        Self {
            node_id: None,
            status,
            created,
            lookup_status: None,
        }
    }

    /// Returns `true` if every segment resolved.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.status.is_good() && self.node_id.is_some()
    }

    /// Returns the resolved identity.
    #[inline]
    pub fn node_id(&self) -> Option<&NodeId> {
        self.node_id.as_ref()
    }
}

impl fmt::Display for PathOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node_id {
            Some(id) => write!(f, "{} ({} created)", id, self.created.len()),
            None => write!(f, "unresolved: {}", self.status),
        }
    }
}

// =============================================================================
// Path Resolution
// =============================================================================

impl<T: OpcUaTransport> OpcUaClient<T> {
    /// Follows `path` from `start` by exact browse name.
    ///
    /// An empty path resolves to `start`. A missing segment ends resolution
    /// with `BadNoMatch`; a failed browse ends it with the browse status.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotConnected` if the client is not connected.
    pub async fn resolve_path<S: AsRef<str>>(
        &self,
        start: &NodeId,
        path: &[S],
    ) -> OpcUaResult<PathOutcome> {
        self.ensure_connected().await?;

        let mut current = start.clone();
        let mut browser = ChildBrowser::new();

        for segment in path {
            let segment = segment.as_ref();
            let status = browser.browse_connected(self, &current).await;
            if status.is_bad() {
                return Ok(PathOutcome::failed(status, Vec::new()));
            }
            match browser.find_child(segment) {
                Some(child) => current = child.node_id.clone(),
                None => {
                    debug!(parent = %current, segment = segment, "Path segment not found");
                    return Ok(PathOutcome::failed(StatusCode::BAD_NO_MATCH, Vec::new()));
                }
            }
        }

        Ok(PathOutcome::resolved(current, Vec::new()))
    }

    /// Follows `path` from `start`, creating folders for the missing tail.
    ///
    /// Segments are matched as in [`resolve_path`](Self::resolve_path) until
    /// the first one that is missing. From there on each remaining segment
    /// is created as a folder under the previous one, with a server-assigned
    /// identity in the namespace chosen by `namespace` (see
    /// [`create_folder`](Self::create_folder)). A path that already resolves
    /// issues no add-node call.
    ///
    /// A browse that fails during lookup leaves no children to match, so the
    /// segment counts as missing and creation starts under that node. The
    /// browse status is kept in [`PathOutcome::lookup_status`].
    ///
    /// Creation stops at the first failed add-node call. Folders created
    /// before it stay in place and are listed in [`PathOutcome::created`].
    ///
    /// This is not atomic: concurrent callers racing on the same missing
    /// path may each create their own folder.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotConnected` if the client is not connected.
    pub async fn resolve_or_create_path<S: AsRef<str>>(
        &self,
        start: &NodeId,
        path: &[S],
        namespace: Option<u16>,
    ) -> OpcUaResult<PathOutcome> {
        self.ensure_connected().await?;

        let mut current = start.clone();
        let mut browser = ChildBrowser::new();
        let mut level = 0;
        let mut lookup_status = None;

        while level < path.len() {
            let status = browser.browse_connected(self, &current).await;
            if status.is_bad() {
                debug!(parent = %current, status = %status, "Lookup browse failed, creating from here");
                lookup_status = Some(status);
                break;
            }
            match browser.find_child(path[level].as_ref()) {
                Some(child) => current = child.node_id.clone(),
                None => break,
            }
            level += 1;
        }

        let mut created = Vec::new();
        for segment in &path[level..] {
            let segment = segment.as_ref();
            let ns = self.creation_namespace(&current, namespace);
            let result = self
                .add_child(&current, segment, NodeId::auto(ns), ns, None)
                .await;

            match result.node_id {
                Some(new_id) if result.status.is_good() => {
                    created.push(new_id.clone());
                    current = new_id;
                }
                _ => {
                    let mut outcome = PathOutcome::failed(result.status, created);
                    outcome.lookup_status = lookup_status;
                    return Ok(outcome);
                }
            }
        }

        if !created.is_empty() {
            let joined = path.iter().map(|s| s.as_ref()).collect::<Vec<&str>>().join("/");
            info!(
                start = %start,
                path = %joined,
                created = created.len(),
                "Created missing path segments"
            );
        }

        let mut outcome = PathOutcome::resolved(current, created);
        outcome.lookup_status = lookup_status;
        Ok(outcome)
    }

    /// Looks up the direct child of `start` named `name`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotConnected` if the client is not connected.
    pub async fn get_child(&self, start: &NodeId, name: &str) -> OpcUaResult<PathOutcome> {
        self.resolve_path(start, &[name]).await
    }

    /// Resolves a parsed [`BrowsePath`].
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotConnected` if the client is not connected.
    pub async fn resolve_browse_path(&self, path: &BrowsePath) -> OpcUaResult<PathOutcome> {
        self.resolve_path(&path.start_node, path.segments.as_slice())
            .await
    }

    /// Resolves a parsed [`BrowsePath`], creating missing folders.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotConnected` if the client is not connected.
    pub async fn resolve_or_create_browse_path(
        &self,
        path: &BrowsePath,
        namespace: Option<u16>,
    ) -> OpcUaResult<PathOutcome> {
        self.resolve_or_create_path(&path.start_node, path.segments.as_slice(), namespace)
            .await
    }

    // =========================================================================
    // Node Creation
    // =========================================================================

    /// Creates a folder named `name` under `parent`.
    ///
    /// The folder is linked by an Organizes reference, typed FolderType, and
    /// gets `name` as browse name, display name and description. The browse
    /// name namespace is `namespace` if given and non-zero, else the
    /// configured `default_namespace` if non-zero, else the parent's.
    /// `requested_id` defaults to a server-assigned identity in that
    /// namespace.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotConnected` if the client is not connected.
    pub async fn create_folder(
        &self,
        parent: &NodeId,
        name: &str,
        requested_id: Option<NodeId>,
        namespace: Option<u16>,
    ) -> OpcUaResult<AddNodeResult> {
        self.ensure_connected().await?;
        let ns = self.creation_namespace(parent, namespace);
        let requested_id = requested_id.unwrap_or_else(|| NodeId::auto(ns));
        Ok(self.add_child(parent, name, requested_id, ns, None).await)
    }

    /// Creates a variable named `name` under `parent` holding `value`.
    ///
    /// Naming and namespace rules match [`create_folder`](Self::create_folder).
    /// No type definition is sent, so the server applies its default
    /// variable type.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotConnected` if the client is not connected.
    pub async fn create_variable(
        &self,
        parent: &NodeId,
        name: &str,
        value: OpcUaValue,
        requested_id: Option<NodeId>,
        namespace: Option<u16>,
    ) -> OpcUaResult<AddNodeResult> {
        self.ensure_connected().await?;
        let ns = self.creation_namespace(parent, namespace);
        let requested_id = requested_id.unwrap_or_else(|| NodeId::auto(ns));
        Ok(self
            .add_child(parent, name, requested_id, ns, Some(value))
            .await)
    }

    /// Namespace for a node created under `parent`.
    fn creation_namespace(&self, parent: &NodeId, explicit: Option<u16>) -> u16 {
        explicit
            .filter(|ns| *ns != 0)
            .or(Some(self.config().default_namespace).filter(|ns| *ns != 0))
            .unwrap_or(parent.namespace_index)
    }

    /// Issues the add-node call for a folder (`value` is `None`) or variable.
    async fn add_child(
        &self,
        parent: &NodeId,
        name: &str,
        requested_id: NodeId,
        namespace: u16,
        value: Option<OpcUaValue>,
    ) -> AddNodeResult {
        let kind = if value.is_some() {
            NodeKind::Variable
        } else {
            NodeKind::Object
        };
        let type_definition = match kind {
            NodeKind::Object => Some(type_definitions::folder_type()),
            NodeKind::Variable => None,
        };

        let request = AddNodeRequest {
            requested_id,
            parent: parent.clone(),
            reference_type_id: reference_types::organizes(),
            browse_name: QualifiedName::new(namespace, name),
            type_definition,
            attributes: NodeAttributes {
                display_name: name.to_string(),
                description: name.to_string(),
                value,
            },
        };

        self.add_node(&request, kind).await
    }
}

// =============================================================================
// Tests
// =============================================================================
