// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core value types for address space navigation.
//!
//! - **NodeId**: Node identity with canonical string form and parsing
//! - **QualifiedName**: Namespace-qualified browse names
//! - **StatusCode**: OPC UA status codes returned by every remote call
//! - **NavigatorConfig**: Client configuration with builder
//!
//! # Examples
//!
//! ```
//! use opcua_navigator::types::{NodeId, NavigatorConfig};
//!
//! let node_id = NodeId::string(2, "Line1.Sensor3");
//! assert_eq!(node_id.to_opc_string(), "ns=2;s=Line1.Sensor3");
//!
//! let config = NavigatorConfig::builder()
//!     .endpoint("opc.tcp://localhost:4840")
//!     .build()
//!     .unwrap();
//! assert_eq!(config.default_namespace, 0);
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigurationError, OpcUaError};

// =============================================================================
// NodeId
// =============================================================================

/// OPC UA Node Identifier.
///
/// A NodeId addresses a node within the server address space. Two NodeIds
/// are equal iff both the namespace index and the identifier match; the
/// canonical string from [`NodeId::to_opc_string`] is injective and is used
/// as the key in [`NodeIdMap`](crate::node_map::NodeIdMap).
///
/// The null NodeId (`i=0`) means "not assigned"; passing a NodeId with a
/// zero numeric identifier as a requested id lets the server choose.
///
/// # Examples
///
/// ```
/// use opcua_navigator::types::NodeId;
///
/// let numeric = NodeId::numeric(2, 1001);
/// let parsed: NodeId = "ns=2;i=1001".parse().unwrap();
/// assert_eq!(numeric, parsed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a numeric node ID.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque (byte string) node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// Creates a request for a server-assigned identifier in a namespace.
    ///
    /// The numeric identifier 0 tells the server to generate the id.
    #[inline]
    pub fn auto(namespace_index: u16) -> Self {
        Self::numeric(namespace_index, 0)
    }

    // =========================================================================
    // Standard Node IDs
    // =========================================================================

    /// Root folder node (ns=0, i=84).
    pub const ROOT_FOLDER: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(84),
    };

    /// Objects folder node (ns=0, i=85).
    pub const OBJECTS_FOLDER: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(85),
    };

    /// Types folder node (ns=0, i=86).
    pub const TYPES_FOLDER: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(86),
    };

    /// Views folder node (ns=0, i=87).
    pub const VIEWS_FOLDER: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(87),
    };

    /// Server node (ns=0, i=2253).
    pub const SERVER: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(2253),
    };

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns `true` if this is a numeric identifier.
    #[inline]
    pub const fn is_numeric(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::Numeric(_))
    }

    /// Returns `true` if this is a string identifier.
    #[inline]
    pub const fn is_string(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::String(_))
    }

    /// Returns `true` if this is in the standard namespace (ns=0).
    ///
    /// Standard nodes are never traversed into by the tree builder and
    /// never deleted.
    #[inline]
    pub const fn is_standard(&self) -> bool {
        self.namespace_index == 0
    }

    /// Returns `true` if this is a null node ID (ns=0, i=0).
    #[inline]
    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && matches!(self.identifier, NodeIdentifier::Numeric(0))
    }

    /// Returns `true` if the server should assign the identifier.
    #[inline]
    pub fn is_auto(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::Numeric(0))
    }

    /// Returns the null node ID (ns=0, i=0).
    #[inline]
    pub const fn null() -> Self {
        Self {
            namespace_index: 0,
            identifier: NodeIdentifier::Numeric(0),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the numeric value if this is a numeric identifier.
    #[inline]
    pub fn as_numeric(&self) -> Option<u32> {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value if this is a string identifier.
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match &self.identifier {
            NodeIdentifier::String(v) => Some(v),
            _ => None,
        }
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Converts to the canonical OPC UA string format.
    ///
    /// Format: `ns=<namespace>;{i|s|g|b}=<identifier>`, with the `ns=0;`
    /// prefix omitted.
    ///
    /// ```
    /// use opcua_navigator::types::NodeId;
    ///
    /// assert_eq!(NodeId::numeric(2, 1001).to_opc_string(), "ns=2;i=1001");
    /// assert_eq!(NodeId::OBJECTS_FOLDER.to_opc_string(), "i=85");
    /// ```
    pub fn to_opc_string(&self) -> String {
        let id_str = match &self.identifier {
            NodeIdentifier::Numeric(v) => format!("i={}", v),
            NodeIdentifier::String(v) => format!("s={}", v),
            NodeIdentifier::Guid(v) => format!("g={}", v),
            NodeIdentifier::Opaque(v) => format!("b={}", BASE64.encode(v)),
        };

        if self.namespace_index == 0 {
            id_str
        } else {
            format!("ns={};{}", self.namespace_index, id_str)
        }
    }

    /// Returns the identifier type as a string.
    pub const fn identifier_type(&self) -> &'static str {
        self.identifier.type_name()
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = OpcUaError;

    /// Parses a NodeId from OPC UA string format.
    ///
    /// Supported formats:
    /// - `ns=2;i=1001` (numeric)
    /// - `ns=2;s=MyNode` (string)
    /// - `ns=2;g=550e8400-e29b-41d4-a716-446655440000` (GUID)
    /// - `ns=2;b=SGVsbG8=` (opaque, base64 encoded)
    /// - `i=1001` / `s=MyNode` (namespace 0)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: String| {
            OpcUaError::configuration(ConfigurationError::invalid_node_id(s, reason))
        };

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns_str, id_part) = rest
                    .split_once(';')
                    .ok_or_else(|| invalid("Missing identifier after namespace".into()))?;
                let ns: u16 = ns_str
                    .parse()
                    .map_err(|_| invalid("Invalid namespace index".into()))?;
                (ns, id_part)
            }
            None => (0, s),
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            let value: u32 = id
                .parse()
                .map_err(|_| invalid("Invalid numeric identifier".into()))?;
            NodeIdentifier::Numeric(value)
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            let uuid = Uuid::parse_str(id).map_err(|e| invalid(format!("Invalid GUID: {}", e)))?;
            NodeIdentifier::Guid(uuid)
        } else if let Some(id) = identifier_part.strip_prefix("b=") {
            let bytes = BASE64
                .decode(id)
                .map_err(|e| invalid(format!("Invalid base64: {}", e)))?;
            NodeIdentifier::Opaque(bytes)
        } else {
            return Err(invalid(
                "Unknown identifier type. Expected i=, s=, g=, or b=".into(),
            ));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// Node identifier value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),
    /// String identifier.
    String(String),
    /// GUID identifier.
    Guid(Uuid),
    /// Opaque (byte string) identifier.
    Opaque(Vec<u8>),
}

impl NodeIdentifier {
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "Numeric",
            Self::String(_) => "String",
            Self::Guid(_) => "Guid",
            Self::Opaque(_) => "Opaque",
        }
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::Guid(v) => write!(f, "{}", v),
            Self::Opaque(v) => write!(f, "{}", BASE64.encode(v)),
        }
    }
}

// =============================================================================
// QualifiedName
// =============================================================================

/// OPC UA qualified name (namespace index + name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace index.
    pub namespace_index: u16,

    /// The name string.
    pub name: String,
}

impl QualifiedName {
    /// Creates a new qualified name.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }

    /// Creates a qualified name in namespace 0.
    pub fn standard(name: impl Into<String>) -> Self {
        Self::new(0, name)
    }

    /// Returns the `ns:name` representation.
    pub fn to_string_with_ns(&self) -> String {
        if self.namespace_index == 0 {
            self.name.clone()
        } else {
            format!("{}:{}", self.namespace_index, self.name)
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with_ns())
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        if let Some((ns, name)) = s.split_once(':') {
            if let Ok(ns_idx) = ns.parse::<u16>() {
                return Self::new(ns_idx, name);
            }
        }
        Self::standard(s)
    }
}

// =============================================================================
// StatusCode
// =============================================================================

/// OPC UA status code.
///
/// The top two bits carry the severity: `00` good, `01` uncertain,
/// `10` bad. Every remote call made by the client yields one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Good.
    pub const GOOD: StatusCode = StatusCode(0x0000_0000);
    /// Unexpected internal failure.
    pub const BAD_UNEXPECTED_ERROR: StatusCode = StatusCode(0x8001_0000);
    /// Internal failure.
    pub const BAD_INTERNAL_ERROR: StatusCode = StatusCode(0x8002_0000);
    /// Low-level communication failure.
    pub const BAD_COMMUNICATION_ERROR: StatusCode = StatusCode(0x8005_0000);
    /// Operation timed out.
    pub const BAD_TIMEOUT: StatusCode = StatusCode(0x800A_0000);
    /// Service not supported by the server.
    pub const BAD_SERVICE_UNSUPPORTED: StatusCode = StatusCode(0x800B_0000);
    /// Server is not connected.
    pub const BAD_SERVER_NOT_CONNECTED: StatusCode = StatusCode(0x800D_0000);
    /// User lacks access rights.
    pub const BAD_USER_ACCESS_DENIED: StatusCode = StatusCode(0x801F_0000);
    /// Session has been closed.
    pub const BAD_SESSION_CLOSED: StatusCode = StatusCode(0x8026_0000);
    /// Node ID syntax is invalid.
    pub const BAD_NODE_ID_INVALID: StatusCode = StatusCode(0x8033_0000);
    /// Node ID does not exist in the address space.
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);
    /// Attribute is not supported by the node.
    pub const BAD_ATTRIBUTE_ID_INVALID: StatusCode = StatusCode(0x8035_0000);
    /// Parent node id does not exist.
    pub const BAD_PARENT_NODE_ID_INVALID: StatusCode = StatusCode(0x805B_0000);
    /// Requested new node id is already in use.
    pub const BAD_NODE_ID_EXISTS: StatusCode = StatusCode(0x805E_0000);
    /// Browse name is invalid.
    pub const BAD_BROWSE_NAME_INVALID: StatusCode = StatusCode(0x8060_0000);
    /// Browse name is already used by a sibling.
    pub const BAD_BROWSE_NAME_DUPLICATED: StatusCode = StatusCode(0x8061_0000);
    /// Delete is not permitted on the node.
    pub const BAD_NO_DELETE_RIGHTS: StatusCode = StatusCode(0x8069_0000);
    /// No child matched the requested browse name.
    pub const BAD_NO_MATCH: StatusCode = StatusCode(0x806F_0000);
    /// Configuration is invalid.
    pub const BAD_CONFIGURATION_ERROR: StatusCode = StatusCode(0x8089_0000);

    /// Returns `true` if the severity is good.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` if the severity is uncertain.
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }

    /// Returns `true` if the severity is bad.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns the raw code.
    #[inline]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns the symbolic name, or a severity placeholder for codes
    /// outside the known table.
    pub fn name(&self) -> &'static str {
        match *self {
            Self::GOOD => "Good",
            Self::BAD_UNEXPECTED_ERROR => "BadUnexpectedError",
            Self::BAD_INTERNAL_ERROR => "BadInternalError",
            Self::BAD_COMMUNICATION_ERROR => "BadCommunicationError",
            Self::BAD_TIMEOUT => "BadTimeout",
            Self::BAD_SERVICE_UNSUPPORTED => "BadServiceUnsupported",
            Self::BAD_SERVER_NOT_CONNECTED => "BadServerNotConnected",
            Self::BAD_USER_ACCESS_DENIED => "BadUserAccessDenied",
            Self::BAD_SESSION_CLOSED => "BadSessionClosed",
            Self::BAD_NODE_ID_INVALID => "BadNodeIdInvalid",
            Self::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            Self::BAD_ATTRIBUTE_ID_INVALID => "BadAttributeIdInvalid",
            Self::BAD_PARENT_NODE_ID_INVALID => "BadParentNodeIdInvalid",
            Self::BAD_NODE_ID_EXISTS => "BadNodeIdExists",
            Self::BAD_BROWSE_NAME_INVALID => "BadBrowseNameInvalid",
            Self::BAD_BROWSE_NAME_DUPLICATED => "BadBrowseNameDuplicated",
            Self::BAD_NO_DELETE_RIGHTS => "BadNoDeleteRights",
            Self::BAD_NO_MATCH => "BadNoMatch",
            Self::BAD_CONFIGURATION_ERROR => "BadConfigurationError",
            _ if self.is_bad() => "Bad",
            _ if self.is_uncertain() => "Uncertain",
            _ => "Good",
        }
    }
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.0)
    }
}

// =============================================================================
// BrowseDirection
// =============================================================================

/// OPC UA browse direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowseDirection {
    /// Browse forward references.
    #[default]
    Forward,

    /// Browse inverse references.
    Inverse,

    /// Browse both forward and inverse references.
    Both,
}

impl BrowseDirection {
    /// Returns the OPC UA value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Forward => 0,
            Self::Inverse => 1,
            Self::Both => 2,
        }
    }
}

// =============================================================================
// NodeClass
// =============================================================================

/// OPC UA node class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    /// Unspecified.
    #[default]
    Unspecified,
    /// Object node.
    Object,
    /// Variable node.
    Variable,
    /// Method node.
    Method,
    /// Object type node.
    ObjectType,
    /// Variable type node.
    VariableType,
    /// Reference type node.
    ReferenceType,
    /// Data type node.
    DataType,
    /// View node.
    View,
}

impl NodeClass {
    /// Returns the OPC UA bit mask value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Unspecified => 0,
            Self::Object => 1,
            Self::Variable => 2,
            Self::Method => 4,
            Self::ObjectType => 8,
            Self::VariableType => 16,
            Self::ReferenceType => 32,
            Self::DataType => 64,
            Self::View => 128,
        }
    }

    /// Creates from OPC UA value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Unspecified),
            1 => Some(Self::Object),
            2 => Some(Self::Variable),
            4 => Some(Self::Method),
            8 => Some(Self::ObjectType),
            16 => Some(Self::VariableType),
            32 => Some(Self::ReferenceType),
            64 => Some(Self::DataType),
            128 => Some(Self::View),
            _ => None,
        }
    }
}

// =============================================================================
// AttributeId
// =============================================================================

/// OPC UA attribute IDs used by navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeId {
    /// Node ID attribute.
    NodeId,
    /// Node class attribute.
    NodeClass,
    /// Browse name attribute.
    BrowseName,
    /// Display name attribute.
    DisplayName,
    /// Description attribute.
    Description,
    /// Value attribute.
    Value,
    /// Data type attribute.
    DataType,
}

impl AttributeId {
    /// Returns the OPC UA numeric value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::NodeId => 1,
            Self::NodeClass => 2,
            Self::BrowseName => 3,
            Self::DisplayName => 4,
            Self::Description => 5,
            Self::Value => 13,
            Self::DataType => 14,
        }
    }
}

// =============================================================================
// LogFormat
// =============================================================================

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable multi-field lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
    /// Condensed single-line output.
    Compact,
}

impl FromStr for LogFormat {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(OpcUaError::configuration(ConfigurationError::parse(
                "log_format",
                format!("unknown log format '{}'", other),
            ))),
        }
    }
}

// =============================================================================
// NavigatorConfig
// =============================================================================

/// Client configuration for address space navigation.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use opcua_navigator::types::NavigatorConfig;
///
/// let config = NavigatorConfig::builder()
///     .endpoint("opc.tcp://plc-01:4840")
///     .default_namespace(2)
///     .request_timeout(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// assert_eq!(config.default_namespace, 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigatorConfig {
    /// Server endpoint URL (e.g., "opc.tcp://localhost:4840").
    pub endpoint: String,

    /// Application name announced to the server.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Session name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,

    /// Connection timeout.
    #[serde(default = "default_connect_timeout")]
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Request timeout for single remote calls.
    #[serde(default = "default_request_timeout")]
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Namespace used for created nodes when the caller passes 0.
    ///
    /// 0 means "inherit from the parent node".
    #[serde(default)]
    pub default_namespace: u16,

    /// Log filter directive (e.g. `info`, `opcua_navigator=debug`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_application_name() -> String {
    "OPC UA Navigator".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NavigatorConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> NavigatorConfigBuilder {
        NavigatorConfigBuilder::default()
    }

    /// Creates a simple configuration with just the endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), OpcUaError> {
        if self.endpoint.is_empty() {
            return Err(OpcUaError::configuration(ConfigurationError::missing_field(
                "endpoint",
            )));
        }

        if !self.endpoint.starts_with("opc.tcp://") {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_endpoint(
                &self.endpoint,
                "Endpoint must start with opc.tcp://",
            )));
        }

        if self.connect_timeout.is_zero() {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_timeout(
                self.connect_timeout,
                "Connect timeout must be greater than 0",
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(OpcUaError::configuration(ConfigurationError::invalid_timeout(
                self.request_timeout,
                "Request timeout must be greater than 0",
            )));
        }

        Ok(())
    }

    /// Returns the session name, falling back to the application name.
    pub fn effective_session_name(&self) -> &str {
        self.session_name.as_deref().unwrap_or(&self.application_name)
    }

    /// Returns the application URI derived from the application name.
    pub fn application_uri(&self) -> String {
        format!("urn:opcua-navigator:{}", self.application_name.replace(' ', ""))
    }
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            application_name: default_application_name(),
            session_name: None,
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            default_namespace: 0,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

// =============================================================================
// NavigatorConfigBuilder
// =============================================================================

/// Builder for [`NavigatorConfig`].
#[derive(Debug, Default)]
pub struct NavigatorConfigBuilder {
    endpoint: Option<String>,
    application_name: Option<String>,
    session_name: Option<String>,
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    default_namespace: Option<u16>,
    log_level: Option<String>,
    log_format: Option<LogFormat>,
}

impl NavigatorConfigBuilder {
    /// Sets the endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Sets the session name.
    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the namespace for created nodes.
    pub fn default_namespace(mut self, namespace: u16) -> Self {
        self.default_namespace = Some(namespace);
        self
    }

    /// Sets the log filter directive.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Sets the log output format.
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Some(format);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<NavigatorConfig, OpcUaError> {
        let endpoint = self.endpoint.ok_or_else(|| {
            OpcUaError::configuration(ConfigurationError::missing_field("endpoint"))
        })?;

        let config = NavigatorConfig {
            endpoint,
            application_name: self.application_name.unwrap_or_else(default_application_name),
            session_name: self.session_name,
            connect_timeout: self.connect_timeout.unwrap_or_else(default_connect_timeout),
            request_timeout: self.request_timeout.unwrap_or_else(default_request_timeout),
            default_namespace: self.default_namespace.unwrap_or(0),
            log_level: self.log_level.unwrap_or_else(default_log_level),
            log_format: self.log_format.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// humantime_serde helper
// =============================================================================

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        humantime::format_duration(*duration)
            .to_string()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // NodeId Tests
    // =========================================================================

    #[test]
    fn test_node_id_numeric() {
        let node = NodeId::numeric(2, 1001);
        assert_eq!(node.namespace_index, 2);
        assert!(node.is_numeric());
        assert_eq!(node.as_numeric(), Some(1001));
        assert_eq!(node.to_opc_string(), "ns=2;i=1001");
    }

    #[test]
    fn test_node_id_string() {
        let node = NodeId::string(2, "Line1.Sensor3");
        assert!(node.is_string());
        assert_eq!(node.as_string(), Some("Line1.Sensor3"));
        assert_eq!(node.to_string(), "ns=2;s=Line1.Sensor3");
    }

    #[test]
    fn test_node_id_parse() {
        let node: NodeId = "ns=2;i=1001".parse().unwrap();
        assert_eq!(node, NodeId::numeric(2, 1001));

        let node: NodeId = "ns=3;s=Plant;Area".parse().unwrap();
        assert_eq!(node.as_string(), Some("Plant;Area"));

        let node: NodeId = "i=85".parse().unwrap();
        assert_eq!(node, NodeId::OBJECTS_FOLDER);

        let node: NodeId = "ns=1;g=550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(node.identifier_type(), "Guid");

        let node: NodeId = "ns=1;b=AQIDBA==".parse().unwrap();
        assert_eq!(node.identifier, NodeIdentifier::Opaque(vec![1, 2, 3, 4]));
    }

    #[test]
    fn test_node_id_parse_invalid() {
        assert!("ns=2".parse::<NodeId>().is_err());
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("ns=2;i=abc".parse::<NodeId>().is_err());
        assert!("q=1".parse::<NodeId>().is_err());
        assert!("ns=2;g=not-a-guid".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_canonical_form_is_injective() {
        let numeric = NodeId::numeric(2, 5);
        let string = NodeId::string(2, "5");
        let other_ns = NodeId::numeric(3, 5);
        assert_ne!(numeric.to_opc_string(), string.to_opc_string());
        assert_ne!(numeric.to_opc_string(), other_ns.to_opc_string());

        for id in [numeric, string, other_ns] {
            let round: NodeId = id.to_opc_string().parse().unwrap();
            assert_eq!(round, id);
        }
    }

    #[test]
    fn test_node_id_null_and_auto() {
        assert!(NodeId::null().is_null());
        assert!(NodeId::default().is_null());
        assert!(!NodeId::OBJECTS_FOLDER.is_null());

        let auto = NodeId::auto(2);
        assert!(auto.is_auto());
        assert!(!auto.is_null());
        assert_eq!(auto.namespace_index, 2);
    }

    // =========================================================================
    // QualifiedName / StatusCode Tests
    // =========================================================================

    #[test]
    fn test_qualified_name() {
        let qn = QualifiedName::from("2:Line1");
        assert_eq!(qn, QualifiedName::new(2, "Line1"));
        assert_eq!(qn.to_string(), "2:Line1");

        let qn = QualifiedName::from("Objects");
        assert_eq!(qn.namespace_index, 0);
        assert_eq!(qn.to_string(), "Objects");
    }

    #[test]
    fn test_status_code_severity() {
        assert!(StatusCode::GOOD.is_good());
        assert!(!StatusCode::GOOD.is_bad());
        assert!(StatusCode::BAD_NODE_ID_UNKNOWN.is_bad());
        assert!(StatusCode(0x4000_0000).is_uncertain());
        assert!(!StatusCode(0x4000_0000).is_good());
    }

    #[test]
    fn test_status_code_display() {
        assert_eq!(
            StatusCode::BAD_BROWSE_NAME_DUPLICATED.to_string(),
            "BadBrowseNameDuplicated (0x80610000)"
        );
        assert_eq!(StatusCode(0x80FF_0000).name(), "Bad");
    }

    // =========================================================================
    // Config Tests
    // =========================================================================

    #[test]
    fn test_config_builder() {
        let config = NavigatorConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .session_name("navigator")
            .default_namespace(2)
            .build()
            .unwrap();

        assert_eq!(config.endpoint, "opc.tcp://localhost:4840");
        assert_eq!(config.effective_session_name(), "navigator");
        assert_eq!(config.default_namespace, 2);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_validation() {
        assert!(NavigatorConfig::builder().build().is_err());
        assert!(NavigatorConfig::builder()
            .endpoint("http://localhost:4840")
            .build()
            .is_err());
        assert!(NavigatorConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .request_timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn test_config_serde_humantime() {
        let json = r#"{"endpoint":"opc.tcp://host:4840","request_timeout":"2s 500ms"}"#;
        let config: NavigatorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
