// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for address space navigation.
//!
//! Remote failures reported by the server (a bad status code on a browse,
//! read, add-node or delete-node call) are *not* errors in this crate: they
//! are folded into the outcome types returned by each operation. The types
//! in this module cover the remaining cases:
//!
//! - **Precondition violations**: an operation issued while no connection is
//!   active ([`ConnectionError::NotConnected`])
//! - **Local structure misuse**: duplicate tree children, stale tree indices
//! - **Transport failures**: raised by [`OpcUaTransport`](crate::client::OpcUaTransport)
//!   implementations and converted to status codes by the client
//! - **Configuration problems**: bad endpoints, unreadable config files
//!
//! # Error Categories
//!
//! ```text
//! OpcUaError
//! ├── Connection    - Missing or broken connection
//! ├── Browse        - Browse, path and local tree failures
//! ├── Operation     - Remote calls rejected by the server
//! └── Configuration - Invalid settings or config files
//! ```
//!
//! # Examples
//!
//! ```
//! use opcua_navigator::error::{OpcUaError, ErrorSeverity};
//!
//! let error = OpcUaError::not_connected();
//! assert!(error.is_precondition_violation());
//! assert_eq!(error.severity(), ErrorSeverity::Critical);
//!
//! for hint in error.recovery_hints() {
//!     println!("Hint: {}", hint);
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

use crate::types::StatusCode;

// =============================================================================
// OpcUaError - Main Error Type
// =============================================================================

/// The main error type for navigation operations.
#[derive(Debug, Error)]
pub enum OpcUaError {
    /// Connection-related errors.
    #[error("{0}")]
    Connection(#[from] ConnectionError),

    /// Browse, path and local tree errors.
    #[error("{0}")]
    Browse(#[from] BrowseError),

    /// Remote operation errors.
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
}

impl OpcUaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a connection error.
    #[inline]
    pub fn connection(error: ConnectionError) -> Self {
        Self::Connection(error)
    }

    /// Creates a browse error.
    #[inline]
    pub fn browse(error: BrowseError) -> Self {
        Self::Browse(error)
    }

    /// Creates an operation error.
    #[inline]
    pub fn operation(error: OperationError) -> Self {
        Self::Operation(error)
    }

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    /// Creates a not connected error.
    pub fn not_connected() -> Self {
        Self::Connection(ConnectionError::NotConnected)
    }

    /// Creates a bad status error for a node.
    pub fn bad_status(node_id: impl Into<String>, status: StatusCode) -> Self {
        Self::Operation(OperationError::bad_status(node_id, status))
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns `true` if this error reports caller misuse rather than a
    /// remote condition.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, Self::Connection(ConnectionError::NotConnected))
    }

    /// Returns the OPC UA status code that best describes this error.
    ///
    /// Used when a transport error has to be folded into an outcome.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Connection(ConnectionError::NotConnected) => StatusCode::BAD_SERVER_NOT_CONNECTED,
            Self::Connection(_) => StatusCode::BAD_COMMUNICATION_ERROR,
            Self::Operation(e) => e.status_code(),
            Self::Browse(_) => StatusCode::BAD_COMMUNICATION_ERROR,
            Self::Configuration(_) => StatusCode::BAD_CONFIGURATION_ERROR,
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Connection(e) => e.severity(),
            Self::Browse(e) => e.severity(),
            Self::Operation(e) => e.severity(),
            Self::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Browse(_) => "browse",
            Self::Operation(_) => "operation",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Connection(e) => e.error_code(),
            Self::Browse(e) => e.error_code(),
            Self::Operation(e) => e.error_code(),
            Self::Configuration(e) => e.error_code(),
        }
    }

    /// Returns recovery hints for this error.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Connection(e) => e.recovery_hints(),
            Self::Browse(e) => e.recovery_hints(),
            Self::Operation(e) => e.recovery_hints(),
            Self::Configuration(e) => e.recovery_hints(),
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Connection(e) => e.user_message(),
            Self::Browse(e) => e.user_message(),
            Self::Operation(e) => e.user_message(),
            Self::Configuration(e) => e.user_message(),
        }
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();

        match self.severity().to_tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                "{self}"
            ),
        }
    }
}

// =============================================================================
// ConnectionError
// =============================================================================

/// Connection-related errors.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// No active connection. Operations require `connect()` first.
    #[error("Not connected to OPC UA server")]
    NotConnected,

    /// Connection refused.
    #[error("Connection refused to '{endpoint}'")]
    Refused {
        /// Target endpoint.
        endpoint: String,
    },

    /// Endpoint not found.
    #[error("Endpoint not found: '{endpoint}'")]
    EndpointNotFound {
        /// The endpoint URL.
        endpoint: String,
    },

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL: '{url}' - {reason}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Reason.
        reason: String,
    },

    /// Connection closed unexpectedly.
    #[error("Connection closed unexpectedly")]
    Closed {
        /// Reason for closure.
        reason: Option<String>,
    },
}

impl ConnectionError {
    /// Creates a connection refused error.
    pub fn refused(endpoint: impl Into<String>) -> Self {
        Self::Refused {
            endpoint: endpoint.into(),
        }
    }

    /// Creates an endpoint not found error.
    pub fn endpoint_not_found(endpoint: impl Into<String>) -> Self {
        Self::EndpointNotFound {
            endpoint: endpoint.into(),
        }
    }

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a connection closed error.
    pub fn closed(reason: Option<String>) -> Self {
        Self::Closed { reason }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotConnected => ErrorSeverity::Critical,
            Self::Closed { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotConnected => ErrorCode::new(1, 1),
            Self::Refused { .. } => ErrorCode::new(1, 2),
            Self::EndpointNotFound { .. } => ErrorCode::new(1, 3),
            Self::InvalidEndpoint { .. } => ErrorCode::new(1, 4),
            Self::Closed { .. } => ErrorCode::new(1, 5),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::NotConnected => vec!["Call connect() before performing operations"],
            Self::Refused { .. } => vec![
                "Check if the OPC UA server is running",
                "Verify the endpoint URL is correct",
            ],
            Self::EndpointNotFound { .. } => vec![
                "Verify the server URL is correct",
                "Try discovering endpoints using get_endpoints",
            ],
            Self::InvalidEndpoint { .. } => vec!["Use format: opc.tcp://hostname:port/path"],
            Self::Closed { .. } => vec![
                "Check server logs for disconnect reason",
                "Reconnect before retrying the operation",
            ],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotConnected => "OPC UA 서버에 연결되어 있지 않습니다".to_string(),
            Self::Refused { endpoint } => {
                format!("OPC UA 서버({})에 연결할 수 없습니다", endpoint)
            }
            Self::EndpointNotFound { endpoint } => {
                format!("엔드포인트를 찾을 수 없음: {}", endpoint)
            }
            Self::InvalidEndpoint { url, .. } => {
                format!("잘못된 엔드포인트 URL: {}", url)
            }
            Self::Closed { .. } => "연결이 끊어졌습니다".to_string(),
        }
    }
}

// =============================================================================
// BrowseError
// =============================================================================

/// Browse, path and local tree errors.
#[derive(Debug, Error)]
pub enum BrowseError {
    /// Browse failed at the transport level.
    #[error("Browse failed for node '{node_id}': {message}")]
    BrowseFailed {
        /// Node ID being browsed.
        node_id: String,
        /// Error message.
        message: String,
    },

    /// Invalid browse path.
    #[error("Invalid browse path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: String,
        /// Reason.
        reason: String,
    },

    /// A child with the same browse name already exists in the local tree.
    #[error("Duplicate child '{name}' under tree node {parent}")]
    DuplicateChild {
        /// Parent tree index.
        parent: usize,
        /// Browse name of the rejected child.
        name: String,
    },

    /// The tree index does not refer to a live node.
    #[error("Unknown tree node index {index}")]
    UnknownTreeNode {
        /// The stale or out-of-range index.
        index: usize,
    },

    /// The node identity of a tree node was already assigned.
    #[error("Tree node {index} already holds node ID '{node_id}'")]
    DataAlreadySet {
        /// Tree index.
        index: usize,
        /// Identity already attached.
        node_id: String,
    },
}

impl BrowseError {
    /// Creates a browse failed error.
    pub fn browse_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BrowseFailed {
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a duplicate child error.
    pub fn duplicate_child(parent: usize, name: impl Into<String>) -> Self {
        Self::DuplicateChild {
            parent,
            name: name.into(),
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownTreeNode { .. } | Self::DataAlreadySet { .. } => ErrorSeverity::Error,
            _ => ErrorSeverity::Warning,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::BrowseFailed { .. } => ErrorCode::new(2, 2),
            Self::InvalidPath { .. } => ErrorCode::new(2, 3),
            Self::DuplicateChild { .. } => ErrorCode::new(2, 4),
            Self::UnknownTreeNode { .. } => ErrorCode::new(2, 5),
            Self::DataAlreadySet { .. } => ErrorCode::new(2, 6),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::BrowseFailed { .. } => vec!["Check server connection", "Verify browse permissions"],
            Self::InvalidPath { .. } => vec![
                "Path format: Objects/Line1/Sensor3",
                "Start with Objects, Types, Views, or Root",
            ],
            Self::DuplicateChild { .. } => vec![
                "Browse names must be unique under one parent",
                "Use find_child() to reuse the existing node",
            ],
            Self::UnknownTreeNode { .. } => vec!["The node was removed or belongs to another tree"],
            Self::DataAlreadySet { .. } => vec!["Node identities are assigned once per tree node"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::BrowseFailed { node_id, .. } => format!("노드 탐색 실패: {}", node_id),
            Self::InvalidPath { path, .. } => format!("잘못된 탐색 경로: {}", path),
            Self::DuplicateChild { name, .. } => format!("중복된 자식 노드 이름: {}", name),
            Self::UnknownTreeNode { index } => format!("알 수 없는 트리 노드: {}", index),
            Self::DataAlreadySet { index, .. } => {
                format!("트리 노드에 이미 노드 ID가 설정됨: {}", index)
            }
        }
    }
}

// =============================================================================
// OperationError
// =============================================================================

/// Remote operation errors.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Bad status code in response.
    #[error("Bad status {status} for node '{node_id}'")]
    BadStatus {
        /// Node ID.
        node_id: String,
        /// Status code.
        status: StatusCode,
    },

    /// Attribute read failed at the transport level.
    #[error("Read failed for node '{node_id}': {message}")]
    ReadFailed {
        /// Node ID.
        node_id: String,
        /// Error message.
        message: String,
    },

    /// Add-node request failed at the transport level.
    #[error("Adding '{browse_name}' under '{parent}' failed: {message}")]
    AddNodeFailed {
        /// Parent node ID.
        parent: String,
        /// Requested browse name.
        browse_name: String,
        /// Error message.
        message: String,
    },

    /// Delete-node request failed at the transport level.
    #[error("Delete failed for node '{node_id}': {message}")]
    DeleteFailed {
        /// Node ID.
        node_id: String,
        /// Error message.
        message: String,
    },
}

impl OperationError {
    /// Creates a bad status error.
    pub fn bad_status(node_id: impl Into<String>, status: StatusCode) -> Self {
        Self::BadStatus {
            node_id: node_id.into(),
            status,
        }
    }

    /// Creates a read failed error.
    pub fn read_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    /// Creates an add-node failed error.
    pub fn add_node_failed(
        parent: impl Into<String>,
        browse_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::AddNodeFailed {
            parent: parent.into(),
            browse_name: browse_name.into(),
            message: message.into(),
        }
    }

    /// Creates a delete failed error.
    pub fn delete_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeleteFailed {
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    /// Returns the status code carried by this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadStatus { status, .. } => *status,
            _ => StatusCode::BAD_COMMUNICATION_ERROR,
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::BadStatus { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::BadStatus { .. } => ErrorCode::new(3, 1),
            Self::ReadFailed { .. } => ErrorCode::new(3, 2),
            Self::AddNodeFailed { .. } => ErrorCode::new(3, 3),
            Self::DeleteFailed { .. } => ErrorCode::new(3, 4),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::BadStatus { .. } => vec![
                "Check the OPC UA status code documentation",
                "Verify server state",
            ],
            Self::ReadFailed { .. } => vec!["Check if the node exists", "Verify read permissions"],
            Self::AddNodeFailed { .. } => vec![
                "Verify the server allows node management",
                "Check that the parent node exists",
                "Browse names must be unique under one parent",
            ],
            Self::DeleteFailed { .. } => vec![
                "Verify delete rights on the node",
                "Namespace 0 nodes are never deleted",
            ],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadStatus { node_id, status } => {
                format!("노드 상태 오류 ({}): {}", node_id, status.name())
            }
            Self::ReadFailed { node_id, .. } => format!("노드 읽기 실패: {}", node_id),
            Self::AddNodeFailed { browse_name, .. } => {
                format!("노드 생성 실패: {}", browse_name)
            }
            Self::DeleteFailed { node_id, .. } => format!("노드 삭제 실패: {}", node_id),
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Invalid endpoint URL.
    #[error("Invalid endpoint '{url}': {reason}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Reason.
        reason: String,
    },

    /// Invalid node ID string.
    #[error("Invalid node ID '{node_id}': {reason}")]
    InvalidNodeId {
        /// The invalid node ID.
        node_id: String,
        /// Reason.
        reason: String,
    },

    /// Invalid timeout value.
    #[error("Invalid timeout {duration:?}: {reason}")]
    InvalidTimeout {
        /// The duration.
        duration: Duration,
        /// Reason.
        reason: String,
    },

    /// Required field missing.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Field name.
        field: String,
    },

    /// Configuration file not found.
    #[error("Configuration file not found: {}", path.display())]
    FileNotFound {
        /// File path.
        path: PathBuf,
    },

    /// Unsupported configuration file format.
    #[error("Unsupported configuration format: {format}")]
    UnsupportedFormat {
        /// The rejected extension.
        format: String,
    },

    /// Configuration could not be read or parsed.
    #[error("Failed to parse configuration '{source_name}': {message}")]
    Parse {
        /// File path or source label.
        source_name: String,
        /// Parser message.
        message: String,
    },

    /// Environment variable override has an invalid value.
    #[error("Invalid environment variable {name}: {reason}")]
    InvalidEnvVar {
        /// Variable name.
        name: String,
        /// Reason.
        reason: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid node ID error.
    pub fn invalid_node_id(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid timeout error.
    pub fn invalid_timeout(duration: Duration, reason: impl Into<String>) -> Self {
        Self::InvalidTimeout {
            duration,
            reason: reason.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates a file not found error.
    pub fn file_not_found(path: &Path) -> Self {
        Self::FileNotFound {
            path: path.to_path_buf(),
        }
    }

    /// Creates an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid environment variable error.
    pub fn invalid_env_var(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidEndpoint { .. } => ErrorCode::new(4, 1),
            Self::InvalidNodeId { .. } => ErrorCode::new(4, 2),
            Self::InvalidTimeout { .. } => ErrorCode::new(4, 3),
            Self::MissingField { .. } => ErrorCode::new(4, 4),
            Self::FileNotFound { .. } => ErrorCode::new(4, 5),
            Self::UnsupportedFormat { .. } => ErrorCode::new(4, 6),
            Self::Parse { .. } => ErrorCode::new(4, 7),
            Self::InvalidEnvVar { .. } => ErrorCode::new(4, 8),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidEndpoint { .. } => vec![
                "Endpoint must start with opc.tcp://",
                "Example: opc.tcp://localhost:4840",
            ],
            Self::InvalidNodeId { .. } => vec![
                "Node ID format: ns=<namespace>;i=<numeric> or ns=<namespace>;s=<string>",
                "Example: ns=2;s=MyNode or i=85",
            ],
            Self::InvalidTimeout { .. } => vec!["Timeouts must be greater than zero"],
            Self::MissingField { .. } => vec!["Add the missing field to the configuration"],
            Self::FileNotFound { .. } => vec!["Check the configuration file path"],
            Self::UnsupportedFormat { .. } => vec!["Use a .yaml, .yml, .toml or .json file"],
            Self::Parse { .. } => vec!["Check the configuration file syntax"],
            Self::InvalidEnvVar { .. } => vec!["Check the environment variable value"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEndpoint { url, .. } => format!("잘못된 엔드포인트 설정: {}", url),
            Self::InvalidNodeId { node_id, .. } => format!("잘못된 노드 ID 형식: {}", node_id),
            Self::InvalidTimeout { duration, .. } => {
                format!("잘못된 타임아웃 값: {:?}", duration)
            }
            Self::MissingField { field } => format!("필수 설정 누락: {}", field),
            Self::FileNotFound { path } => {
                format!("설정 파일을 찾을 수 없음: {}", path.display())
            }
            Self::UnsupportedFormat { format } => format!("지원하지 않는 설정 형식: {}", format),
            Self::Parse { source_name, .. } => format!("설정 파싱 실패: {}", source_name),
            Self::InvalidEnvVar { name, .. } => format!("잘못된 환경 변수: {}", name),
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - caller misuse or unusable configuration.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code for categorization.
///
/// Format: `UA-XXYY` where XX is category and YY is specific error.
///
/// Categories:
/// - 1: Connection
/// - 2: Browse
/// - 3: Operation
/// - 4: Configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category (1-4).
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A Result type with OpcUaError.
pub type OpcUaResult<T> = Result<T, OpcUaError>;

// =============================================================================
// Error Context Extension
// =============================================================================

/// Extension trait for adding context to errors.
pub trait OpcUaErrorContext<T> {
    /// Adds endpoint context to errors.
    fn with_endpoint(self, endpoint: &str) -> Result<T, OpcUaError>;

    /// Adds node context to errors.
    fn with_node(self, node_id: &str) -> Result<T, OpcUaError>;
}

impl<T> OpcUaErrorContext<T> for Result<T, OpcUaError> {
    fn with_endpoint(self, endpoint: &str) -> Result<T, OpcUaError> {
        self.map_err(|e| {
            tracing::debug!(endpoint = endpoint, error = %e, "OPC UA error with endpoint context");
            e
        })
    }

    fn with_node(self, node_id: &str) -> Result<T, OpcUaError> {
        self.map_err(|e| {
            tracing::debug!(node_id = node_id, error = %e, "OPC UA error with node context");
            e
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_is_precondition_violation() {
        let error = OpcUaError::not_connected();
        assert!(error.is_precondition_violation());
        assert_eq!(error.severity(), ErrorSeverity::Critical);
        assert_eq!(error.category(), "connection");

        let remote = OpcUaError::bad_status("ns=2;i=1", StatusCode::BAD_NODE_ID_UNKNOWN);
        assert!(!remote.is_precondition_violation());
    }

    #[test]
    fn test_error_status_code_folding() {
        assert_eq!(
            OpcUaError::not_connected().status_code(),
            StatusCode::BAD_SERVER_NOT_CONNECTED
        );
        assert_eq!(
            OpcUaError::bad_status("ns=2;i=1", StatusCode::BAD_NO_DELETE_RIGHTS).status_code(),
            StatusCode::BAD_NO_DELETE_RIGHTS
        );
        assert_eq!(
            OpcUaError::operation(OperationError::read_failed("ns=2;i=1", "io")).status_code(),
            StatusCode::BAD_COMMUNICATION_ERROR
        );
    }

    #[test]
    fn test_bad_status_display() {
        let error = OperationError::bad_status("ns=2;s=Line1", StatusCode::BAD_BROWSE_NAME_DUPLICATED);
        let text = error.to_string();
        assert!(text.contains("ns=2;s=Line1"));
        assert!(text.contains("BadBrowseNameDuplicated"));
    }

    #[test]
    fn test_browse_error_codes() {
        assert_eq!(
            BrowseError::browse_failed("ns=2;i=1", "closed").error_code().to_string(),
            "UA-0202"
        );
        assert_eq!(
            BrowseError::duplicate_child(0, "Line1").error_code(),
            ErrorCode::new(2, 4)
        );
    }

    #[test]
    fn test_error_code() {
        let code = ErrorCode::new(1, 5);
        assert_eq!(code.to_string(), "UA-0105");
        assert_eq!(code.as_u16(), 0x0105);
    }

    #[test]
    fn test_recovery_hints() {
        let error = ConfigurationError::invalid_node_id("bad;format", "missing identifier");
        assert!(error.to_string().contains("bad;format"));
        assert!(error.recovery_hints().iter().any(|h| h.contains("ns=")));

        let error = OpcUaError::not_connected();
        assert!(error.recovery_hints().iter().any(|h| h.contains("connect()")));
    }

    #[test]
    fn test_user_messages() {
        let error = OpcUaError::connection(ConnectionError::refused("opc.tcp://192.168.1.100:4840"));
        assert!(error.user_message().contains("192.168.1.100"));
    }
}
