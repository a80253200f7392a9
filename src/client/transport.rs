// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport abstraction layer.
//!
//! [`OpcUaTransport`] is the connection contract the navigator is written
//! against: one method per remote service. The client holds the transport
//! behind a single mutex and issues exactly one of these calls per lock
//! acquisition.
//!
//! A transport reports a server-side rejection either as `Err` or, where the
//! response itself carries a status (reads, add-node, delete-node), as a bad
//! [`StatusCode`] inside the result. The client folds both into status codes.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OpcUaResult;
use crate::types::{AttributeId, BrowseDirection, NodeClass, NodeId, QualifiedName, StatusCode};

// =============================================================================
// TransportState
// =============================================================================

/// Connection state of the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    /// Transport is not connected.
    #[default]
    Disconnected,

    /// Transport is establishing connection.
    Connecting,

    /// Transport is connected and ready.
    Connected,

    /// Transport connection has failed.
    Failed,
}

impl TransportState {
    /// Returns `true` if the transport is connected.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if the transport has failed.
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// OpcUaValue
// =============================================================================

/// Attribute value exchanged with the transport.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OpcUaValue {
    /// Boolean value.
    Boolean(bool),

    /// 32-bit signed integer.
    Int32(i32),

    /// 32-bit unsigned integer.
    UInt32(u32),

    /// 64-bit signed integer.
    Int64(i64),

    /// 64-bit double.
    Double(f64),

    /// String value.
    String(String),

    /// Date/time value.
    DateTime(chrono::DateTime<chrono::Utc>),

    /// Qualified name, as returned for the BrowseName attribute.
    QualifiedName(QualifiedName),

    /// Localized text, as returned for DisplayName and Description.
    LocalizedText(String),

    /// Node ID value.
    NodeId(NodeId),

    /// Null value.
    #[default]
    Null,
}

impl OpcUaValue {
    /// Returns the node ID of the built-in data type of this value.
    ///
    /// `Null` maps to BaseDataType (i=24).
    pub fn data_type_id(&self) -> NodeId {
        let id = match self {
            Self::Boolean(_) => 1,
            Self::Int32(_) => 6,
            Self::UInt32(_) => 7,
            Self::Int64(_) => 8,
            Self::Double(_) => 11,
            Self::String(_) => 12,
            Self::DateTime(_) => 13,
            Self::NodeId(_) => 17,
            Self::QualifiedName(_) => 20,
            Self::LocalizedText(_) => 21,
            Self::Null => 24,
        };
        NodeId::numeric(0, id)
    }

    /// Returns `true` if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the textual name carried by the value, if any.
    ///
    /// Browse names arrive as qualified names, display names as localized
    /// text; some servers answer with a plain string.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::QualifiedName(qn) => Some(&qn.name),
            Self::LocalizedText(text) | Self::String(text) => Some(text),
            _ => None,
        }
    }

    /// Attempts to get the value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            Self::Int32(v) => Some(*v as f64),
            Self::UInt32(v) => Some(*v as f64),
            Self::Int64(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for OpcUaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) | Self::LocalizedText(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Self::QualifiedName(v) => write!(f, "{}", v),
            Self::NodeId(v) => write!(f, "{}", v),
            Self::Null => write!(f, "null"),
        }
    }
}

// =============================================================================
// ReadResult
// =============================================================================

/// Result of an attribute read.
#[derive(Debug, Clone)]
pub struct ReadResult {
    /// The node ID that was read.
    pub node_id: NodeId,

    /// The value read (if successful).
    pub value: Option<OpcUaValue>,

    /// Status code of the read operation.
    pub status: StatusCode,

    /// Server timestamp.
    pub server_timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

impl ReadResult {
    /// Creates a successful read result.
    pub fn success(node_id: NodeId, value: OpcUaValue) -> Self {
        Self {
            node_id,
            value: Some(value),
            status: StatusCode::GOOD,
            server_timestamp: Some(chrono::Utc::now()),
        }
    }

    /// Creates a failed read result.
    pub fn failure(node_id: NodeId, status: StatusCode) -> Self {
        Self {
            node_id,
            value: None,
            status,
            server_timestamp: Some(chrono::Utc::now()),
        }
    }

    /// Returns `true` if the read was successful.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }

    /// Returns `true` if the status is bad.
    #[inline]
    pub fn is_bad(&self) -> bool {
        self.status.is_bad()
    }
}

// =============================================================================
// ReferenceDescription
// =============================================================================

/// One reference returned by a browse call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDescription {
    /// Target node of the reference.
    pub node_id: NodeId,

    /// Reference type (e.g., Organizes, HasComponent).
    pub reference_type_id: NodeId,

    /// `true` for parent-to-child references.
    pub is_forward: bool,

    /// Browse name of the target.
    pub browse_name: QualifiedName,

    /// Display name of the target.
    pub display_name: String,

    /// Node class of the target.
    pub node_class: NodeClass,

    /// Type definition of the target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_definition: Option<NodeId>,
}

impl ReferenceDescription {
    /// Creates a forward reference to `node_id` named `name`.
    pub fn forward(node_id: NodeId, reference_type_id: NodeId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            browse_name: QualifiedName::new(node_id.namespace_index, name.clone()),
            node_id,
            reference_type_id,
            is_forward: true,
            display_name: name,
            node_class: NodeClass::Object,
            type_definition: None,
        }
    }

    /// Marks the reference as inverse (child-to-parent).
    pub fn inverse(mut self) -> Self {
        self.is_forward = false;
        self
    }

    /// Sets the node class.
    pub fn with_node_class(mut self, node_class: NodeClass) -> Self {
        self.node_class = node_class;
        self
    }
}

// =============================================================================
// EndpointDescription
// =============================================================================

/// Endpoint advertised by a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescription {
    /// Endpoint URL.
    pub endpoint_url: String,

    /// Security policy URI.
    pub security_policy_uri: String,

    /// Security mode name (None, Sign, SignAndEncrypt).
    pub security_mode: String,

    /// Relative security level; higher is stronger.
    pub security_level: u8,
}

impl EndpointDescription {
    /// Creates an unsecured endpoint description.
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            security_policy_uri: "http://opcfoundation.org/UA/SecurityPolicy#None".to_string(),
            security_mode: "None".to_string(),
            security_level: 0,
        }
    }
}

// =============================================================================
// AddNodeRequest / AddNodeResult
// =============================================================================

/// Attributes supplied when creating a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeAttributes {
    /// Display name.
    pub display_name: String,

    /// Description.
    pub description: String,

    /// Initial value (variables only).
    pub value: Option<OpcUaValue>,
}

/// Parameters of an add-node call.
#[derive(Debug, Clone, PartialEq)]
pub struct AddNodeRequest {
    /// Requested node ID; a zero numeric identifier lets the server choose.
    pub requested_id: NodeId,

    /// Parent node.
    pub parent: NodeId,

    /// Reference from parent to the new node.
    pub reference_type_id: NodeId,

    /// Browse name of the new node.
    pub browse_name: QualifiedName,

    /// Type definition; `None` lets the server apply its default.
    pub type_definition: Option<NodeId>,

    /// Node attributes.
    pub attributes: NodeAttributes,
}

/// Outcome of an add-node call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddNodeResult {
    /// Status reported by the server.
    pub status: StatusCode,

    /// Identity assigned to the new node when `status` is good.
    pub node_id: Option<NodeId>,
}

impl AddNodeResult {
    /// Creates a successful result.
    pub fn created(node_id: NodeId) -> Self {
        Self {
            status: StatusCode::GOOD,
            node_id: Some(node_id),
        }
    }

    /// Creates a failed result.
    pub fn failed(status: StatusCode) -> Self {
        Self {
            status,
            node_id: None,
        }
    }

    /// Returns `true` if the node was created.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.status.is_good() && self.node_id.is_some()
    }
}

// =============================================================================
// OpcUaTransport Trait
// =============================================================================

/// Abstract transport trait for OPC UA communication.
///
/// Implementations handle the wire protocol and session. Each method maps to
/// a single service call; the navigator never batches.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. The client serializes all calls
/// through one mutex, so implementations need no internal locking for
/// request ordering.
#[async_trait]
pub trait OpcUaTransport: Send + Sync {
    // =========================================================================
    // Connection Management
    // =========================================================================

    /// Establishes a connection and session with the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    async fn connect(&mut self) -> OpcUaResult<()>;

    /// Closes the connection to the server.
    async fn disconnect(&mut self) -> OpcUaResult<()>;

    /// Returns `true` if the transport is currently connected.
    fn is_connected(&self) -> bool;

    /// Returns the current transport state.
    fn state(&self) -> TransportState;

    // =========================================================================
    // View Services
    // =========================================================================

    /// Browses the references of a node in the given direction.
    ///
    /// Returns every reference type; filtering is left to the caller.
    async fn browse(
        &self,
        node_id: &NodeId,
        direction: BrowseDirection,
    ) -> OpcUaResult<Vec<ReferenceDescription>>;

    // =========================================================================
    // Attribute Services
    // =========================================================================

    /// Reads a single attribute of a node.
    async fn read_attribute(&self, node_id: &NodeId, attribute: AttributeId)
        -> OpcUaResult<ReadResult>;

    // =========================================================================
    // Node Management Services
    // =========================================================================

    /// Adds an object node.
    async fn add_object_node(&self, request: &AddNodeRequest) -> OpcUaResult<AddNodeResult>;

    /// Adds a variable node.
    async fn add_variable_node(&self, request: &AddNodeRequest) -> OpcUaResult<AddNodeResult>;

    /// Deletes a node; `delete_target_references` also removes references
    /// pointing at it, which servers treat as a cascading delete.
    async fn delete_node(
        &self,
        node_id: &NodeId,
        delete_target_references: bool,
    ) -> OpcUaResult<StatusCode>;

    // =========================================================================
    // Discovery Services
    // =========================================================================

    /// Returns the endpoints advertised by the server at `server_url`.
    async fn get_endpoints(&self, server_url: &str) -> OpcUaResult<Vec<EndpointDescription>>;

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Returns the transport display name for logging.
    fn display_name(&self) -> String;

    /// Returns the server endpoint URL.
    fn endpoint(&self) -> &str;
}

// =============================================================================
// Tests
// =============================================================================
