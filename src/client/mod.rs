// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client and transport layer.
//!
//! - **Transport Layer**: the [`OpcUaTransport`] trait, one method per
//!   remote service
//! - **Client Wrapper**: [`OpcUaClient`], which serializes every remote call
//!   through one lock and turns transport errors into status codes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              traversal / path (impl OpcUaClient)                │
//! │     browse_children, browse_tree, delete_tree, resolve_path     │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        ChildBrowser                             │
//! │                 (one browse call per step)                      │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        OpcUaClient                              │
//! │           (lock per remote call, status folding)                │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       OpcUaTransport                            │
//! │                 (abstract transport layer)                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod transport;
mod wrapper;

#[cfg(feature = "real-transport")]
mod real_transport;

pub use transport::{
    AddNodeRequest, AddNodeResult, EndpointDescription, NodeAttributes, OpcUaTransport,
    OpcUaValue, ReadResult, ReferenceDescription, TransportState,
};
pub use wrapper::{ClientStats, EndpointList, OpcUaClient};

pub(crate) use wrapper::NodeKind;

#[cfg(feature = "real-transport")]
pub use real_transport::RealOpcUaTransport;
