// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client-side address space navigation for OPC UA servers.
//!
//! This crate walks, mirrors and edits the address space of a connected
//! OPC UA server. It sits on top of an [`OpcUaTransport`], which performs
//! the individual service calls, and builds multi-step operations from them.
//!
//! # Features
//!
//! - Direct child enumeration with [`ChildBrowser`]
//! - Flat and tree-shaped subtree walks
//! - Recursive subtree deletion that never touches namespace 0
//! - Browse-name path resolution with on-demand folder creation
//! - Folder and variable creation
//! - Endpoint discovery
//!
//! # Error Handling
//!
//! Remote failures are reported as OPC UA [`StatusCode`]s inside the result
//! types. [`OpcUaError`] is returned for local problems:
//!
//! ```text
//! OpcUaError
//! ├── Connection    - Operation attempted without a live session
//! ├── Browse        - Local tree and path errors
//! ├── Operation     - Bad status from a single remote call
//! └── Configuration - Invalid settings or configuration files
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use opcua_navigator::{NavigatorConfig, NodeId, OpcUaClient, RealOpcUaTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NavigatorConfig::builder()
//!         .endpoint("opc.tcp://localhost:4840")
//!         .default_namespace(2)
//!         .build()?;
//!
//!     let client = OpcUaClient::new(config.clone(), RealOpcUaTransport::new(config));
//!     client.connect().await?;
//!
//!     let outcome = client
//!         .resolve_or_create_path(&NodeId::OBJECTS_FOLDER, &["Line1", "Sensor3"], None)
//!         .await?;
//!     println!("Sensor3: {}", outcome);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod browse;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod node_map;
pub mod path;
pub mod traversal;
pub mod tree;
pub mod types;

// Re-export commonly used types
pub use error::{
    BrowseError, ConfigurationError, ConnectionError, ErrorCode, ErrorSeverity, OpcUaError,
    OpcUaErrorContext, OpcUaResult, OperationError,
};

pub use types::{
    AttributeId, BrowseDirection, LogFormat, NavigatorConfig, NavigatorConfigBuilder, NodeClass,
    NodeId, NodeIdentifier, QualifiedName, StatusCode,
};

// Re-export client types
pub use client::{
    AddNodeRequest, AddNodeResult, ClientStats, EndpointDescription, EndpointList,
    NodeAttributes, OpcUaClient, OpcUaTransport, OpcUaValue, ReadResult, ReferenceDescription,
    TransportState,
};

// Re-export real transport when feature is enabled
#[cfg(feature = "real-transport")]
pub use client::RealOpcUaTransport;

// Re-export navigation types
pub use browse::{BrowsePath, BrowseStatistics, ChildBrowser, ChildReference};
pub use config::{ConfigFormat, ConfigLoader};
pub use node_map::NodeIdMap;
pub use path::PathOutcome;
pub use traversal::WalkStatus;
pub use tree::{NodeIndex, UaNode, UaNodeTree};
