// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! High-level OPC UA client wrapper.
//!
//! [`OpcUaClient`] owns the transport behind a single mutex. Every remote call
//! made by the navigator goes through one of the per-call wrappers below,
//! each of which holds the lock for exactly one transport call and converts
//! transport errors into a [`StatusCode`]. Multi-step operations built on top
//! (path creation, tree deletion) therefore interleave with other tasks at
//! every call boundary and are not atomic.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::browse::BrowseStatistics;
use crate::error::{ConnectionError, OpcUaError, OpcUaResult};
use crate::types::{AttributeId, BrowseDirection, NavigatorConfig, NodeId, StatusCode};

use super::transport::{
    AddNodeRequest, AddNodeResult, OpcUaTransport, ReferenceDescription, TransportState,
};

// =============================================================================
// ClientStats
// =============================================================================

/// Statistics for OPC UA client operations.
///
/// Per-browse detail is kept separately in [`BrowseStatistics`].
#[derive(Debug)]
pub struct ClientStats {
    /// Total number of browse calls.
    browses: AtomicU64,

    /// Total number of attribute reads.
    reads: AtomicU64,

    /// Total number of add-node calls.
    creates: AtomicU64,

    /// Total number of delete-node calls.
    deletes: AtomicU64,

    /// Total number of get-endpoints calls.
    endpoint_requests: AtomicU64,

    /// Total number of calls that returned a bad status.
    failures: AtomicU64,

    /// Total response time in microseconds.
    total_response_time_us: AtomicU64,

    /// Number of connections established.
    connections: AtomicU64,
}

impl ClientStats {
    /// Creates new statistics.
    pub fn new() -> Self {
        Self {
            browses: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            creates: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            endpoint_requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            connections: AtomicU64::new(0),
        }
    }

    fn record_time(&self, duration: Duration) {
        self.total_response_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Records a browse call.
    pub fn record_browse(&self) {
        self.browses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an attribute read.
    pub fn record_read(&self, duration: Duration) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.record_time(duration);
    }

    /// Records an add-node call.
    pub fn record_create(&self, duration: Duration) {
        self.creates.fetch_add(1, Ordering::Relaxed);
        self.record_time(duration);
    }

    /// Records a delete-node call.
    pub fn record_delete(&self, duration: Duration) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.record_time(duration);
    }

    /// Records a get-endpoints call.
    pub fn record_endpoint_request(&self) {
        self.endpoint_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a call that returned a bad status.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a connection.
    pub fn record_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the total number of browse calls.
    pub fn browses(&self) -> u64 {
        self.browses.load(Ordering::Relaxed)
    }

    /// Returns the total number of reads.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the total number of add-node calls.
    pub fn creates(&self) -> u64 {
        self.creates.load(Ordering::Relaxed)
    }

    /// Returns the total number of delete-node calls.
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Returns the total number of get-endpoints calls.
    pub fn endpoint_requests(&self) -> u64 {
        self.endpoint_requests.load(Ordering::Relaxed)
    }

    /// Returns the total number of failed calls.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns the number of connections established.
    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    /// Returns the success rate over every remote call.
    pub fn success_rate(&self) -> f64 {
        let total = self.browses()
            + self.reads()
            + self.creates()
            + self.deletes()
            + self.endpoint_requests();
        if total == 0 {
            return 1.0;
        }
        let failures = self.failures();
        (total - failures.min(total)) as f64 / total as f64
    }

    /// Returns the average response time of reads, creates and deletes.
    pub fn average_response_time(&self) -> Duration {
        let total_ops = self.reads() + self.creates() + self.deletes();
        if total_ops == 0 {
            return Duration::ZERO;
        }
        let total_us = self.total_response_time_us.load(Ordering::Relaxed);
        Duration::from_micros(total_us / total_ops)
    }

    /// Resets all statistics.
    pub fn reset(&self) {
        self.browses.store(0, Ordering::Relaxed);
        self.reads.store(0, Ordering::Relaxed);
        self.creates.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.endpoint_requests.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.total_response_time_us.store(0, Ordering::Relaxed);
        self.connections.store(0, Ordering::Relaxed);
    }
}

impl Default for ClientStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// EndpointList
// =============================================================================

/// Endpoint URLs returned by [`OpcUaClient::get_endpoints`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointList {
    /// Status of the get-endpoints call.
    pub status: StatusCode,

    /// Endpoint URLs in server order. Empty when `status` is bad.
    pub urls: Vec<String>,
}

impl EndpointList {
    /// Returns `true` if the call succeeded.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }

    /// Returns the number of endpoints.
    #[inline]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns `true` if no endpoint was returned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

// =============================================================================
// NodeKind
// =============================================================================

/// Class of node created by an add-node call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Object,
    Variable,
}

// =============================================================================
// OpcUaClient
// =============================================================================

/// OPC UA client serializing every remote call through one lock.
///
/// Address-space operations live in [`crate::traversal`] and [`crate::path`]
/// as further `impl` blocks on this type.
///
/// # Examples
///
/// ```rust,ignore
/// use opcua_navigator::client::OpcUaClient;
/// use opcua_navigator::types::NavigatorConfig;
///
/// let config = NavigatorConfig::builder()
///     .endpoint("opc.tcp://localhost:4840")
///     .build()?;
///
/// let client = OpcUaClient::new(config, transport);
/// client.connect().await?;
///
/// let endpoints = client.get_endpoints("opc.tcp://localhost:4840").await?;
/// for url in &endpoints.urls {
///     println!("{}", url);
/// }
/// ```
pub struct OpcUaClient<T: OpcUaTransport> {
    /// Configuration.
    config: NavigatorConfig,

    /// Transport layer.
    transport: Arc<Mutex<T>>,

    /// Client statistics.
    stats: ClientStats,

    /// Browse statistics.
    browse_stats: BrowseStatistics,
}

impl<T: OpcUaTransport> OpcUaClient<T> {
    /// Creates a new OPC UA client.
    pub fn new(config: NavigatorConfig, transport: T) -> Self {
        Self {
            config,
            transport: Arc::new(Mutex::new(transport)),
            stats: ClientStats::new(),
            browse_stats: BrowseStatistics::new(),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// Returns the client statistics.
    pub fn stats(&self) -> &ClientStats {
        &self.stats
    }

    /// Returns the browse statistics.
    pub fn browse_stats(&self) -> &BrowseStatistics {
        &self.browse_stats
    }

    /// Resets all statistics.
    pub fn reset_stats(&self) {
        self.stats.reset();
        self.browse_stats.reset();
    }

    // =========================================================================
    // Connection Management
    // =========================================================================

    /// Connects to the OPC UA server.
    pub async fn connect(&self) -> OpcUaResult<()> {
        {
            let mut transport = self.transport.lock().await;
            match tokio::time::timeout(self.config.connect_timeout, transport.connect()).await {
                Ok(result) => result?,
                Err(_) => {
                    let error = OpcUaError::connection(ConnectionError::closed(Some(format!(
                        "connect timed out after {:?}",
                        self.config.connect_timeout
                    ))));
                    error.log(&self.config.endpoint);
                    return Err(error);
                }
            }
        }

        self.stats.record_connection();

        tracing::info!(
            endpoint = %self.config.endpoint,
            "OPC UA client connected"
        );

        Ok(())
    }

    /// Disconnects from the OPC UA server.
    pub async fn disconnect(&self) -> OpcUaResult<()> {
        {
            let mut transport = self.transport.lock().await;
            transport.disconnect().await?;
        }

        tracing::info!(
            endpoint = %self.config.endpoint,
            "OPC UA client disconnected"
        );

        Ok(())
    }

    /// Returns `true` if the client is connected.
    pub async fn is_connected(&self) -> bool {
        let transport = self.transport.lock().await;
        transport.is_connected()
    }

    /// Returns the current connection state.
    pub async fn connection_state(&self) -> TransportState {
        let transport = self.transport.lock().await;
        transport.state()
    }

    /// Fails with `ConnectionError::NotConnected` unless the transport is up.
    ///
    /// Every public address-space operation calls this first.
    pub(crate) async fn ensure_connected(&self) -> OpcUaResult<()> {
        if self.is_connected().await {
            return Ok(());
        }
        let error = OpcUaError::not_connected();
        error.log(&self.config.endpoint);
        Err(error)
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Returns the endpoint URLs advertised by the server at `server_url`,
    /// in server order.
    ///
    /// A failed call is reported through [`EndpointList::status`] with an
    /// empty URL list.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NotConnected` if the client is not connected.
    pub async fn get_endpoints(&self, server_url: &str) -> OpcUaResult<EndpointList> {
        self.ensure_connected().await?;

        let result = {
            let transport = self.transport.lock().await;
            self.timed(server_url, transport.get_endpoints(server_url)).await
        };
        self.stats.record_endpoint_request();

        match result {
            Ok(endpoints) => {
                tracing::debug!(
                    server_url = server_url,
                    count = endpoints.len(),
                    "Endpoints discovered"
                );
                Ok(EndpointList {
                    status: StatusCode::GOOD,
                    urls: endpoints.into_iter().map(|e| e.endpoint_url).collect(),
                })
            }
            Err(error) => {
                let status = self.fail("get_endpoints", server_url, &error);
                Ok(EndpointList {
                    status,
                    urls: Vec::new(),
                })
            }
        }
    }

    // =========================================================================
    // Per-Call Wrappers
    // =========================================================================

    /// Browses forward references of `node_id` under the lock.
    pub(crate) async fn browse_references(
        &self,
        node_id: &NodeId,
    ) -> (StatusCode, Vec<ReferenceDescription>) {
        let node = node_id.to_string();
        let result = {
            let transport = self.transport.lock().await;
            self.timed(&node, transport.browse(node_id, BrowseDirection::Forward))
                .await
        };
        self.stats.record_browse();

        match result {
            Ok(references) => {
                self.browse_stats.record_browse(references.len());
                tracing::trace!(node_id = %node_id, count = references.len(), "Browsed node");
                (StatusCode::GOOD, references)
            }
            Err(error) => {
                self.browse_stats.record_error();
                (self.fail("browse", &node, &error), Vec::new())
            }
        }
    }

    /// Reads the BrowseName attribute of `node_id` under the lock.
    pub(crate) async fn read_browse_name(&self, node_id: &NodeId) -> (StatusCode, Option<String>) {
        let node = node_id.to_string();
        let start = Instant::now();
        let result = {
            let transport = self.transport.lock().await;
            self.timed(&node, transport.read_attribute(node_id, AttributeId::BrowseName))
                .await
        };
        self.stats.record_read(start.elapsed());

        match result {
            Ok(read) if read.is_good() => {
                match read.value.as_ref().and_then(|v| v.as_name()) {
                    Some(name) => (StatusCode::GOOD, Some(name.to_string())),
                    None => {
                        let error =
                            OpcUaError::bad_status(&node, StatusCode::BAD_ATTRIBUTE_ID_INVALID);
                        (self.fail("read_browse_name", &node, &error), None)
                    }
                }
            }
            Ok(read) => {
                let error = OpcUaError::bad_status(&node, read.status);
                (self.fail("read_browse_name", &node, &error), None)
            }
            Err(error) => (self.fail("read_browse_name", &node, &error), None),
        }
    }

    /// Issues one add-node call under the lock.
    pub(crate) async fn add_node(&self, request: &AddNodeRequest, kind: NodeKind) -> AddNodeResult {
        let parent = request.parent.to_string();
        let start = Instant::now();
        let result = {
            let transport = self.transport.lock().await;
            let call = async {
                match kind {
                    NodeKind::Object => transport.add_object_node(request).await,
                    NodeKind::Variable => transport.add_variable_node(request).await,
                }
            };
            self.timed(&parent, call).await
        };
        self.stats.record_create(start.elapsed());

        match result {
            Ok(added) if added.is_good() => {
                tracing::debug!(
                    parent = %request.parent,
                    browse_name = %request.browse_name,
                    node_id = ?added.node_id,
                    "Node created"
                );
                added
            }
            Ok(added) => {
                let status = if added.status.is_good() {
                    StatusCode::BAD_UNEXPECTED_ERROR
                } else {
                    added.status
                };
                let error = OpcUaError::bad_status(&parent, status);
                AddNodeResult::failed(self.fail("add_node", &parent, &error))
            }
            Err(error) => AddNodeResult::failed(self.fail("add_node", &parent, &error)),
        }
    }

    /// Issues one delete-node call under the lock.
    pub(crate) async fn delete_node(&self, node_id: &NodeId, cascade: bool) -> StatusCode {
        let node = node_id.to_string();
        let start = Instant::now();
        let result = {
            let transport = self.transport.lock().await;
            self.timed(&node, transport.delete_node(node_id, cascade)).await
        };
        self.stats.record_delete(start.elapsed());

        match result {
            Ok(status) if status.is_good() => {
                tracing::trace!(node_id = %node_id, "Node deleted");
                status
            }
            Ok(status) => {
                let error = OpcUaError::bad_status(&node, status);
                self.fail("delete_node", &node, &error)
            }
            Err(error) => self.fail("delete_node", &node, &error),
        }
    }

    // =========================================================================
    // Private Methods
    // =========================================================================

    /// Bounds a single transport call by the configured request timeout.
    async fn timed<F, R>(&self, node: &str, call: F) -> OpcUaResult<R>
    where
        F: Future<Output = OpcUaResult<R>>,
    {
        match tokio::time::timeout(self.config.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(OpcUaError::bad_status(node, StatusCode::BAD_TIMEOUT)),
        }
    }

    /// Logs a failed call and returns its status.
    fn fail(&self, operation: &str, node: &str, error: &OpcUaError) -> StatusCode {
        self.stats.record_failure();
        let status = error.status_code();
        tracing::warn!(
            operation = operation,
            node_id = node,
            status = %status,
            error = %error,
            "OPC UA call failed"
        );
        status
    }
}

impl<T: OpcUaTransport> fmt::Debug for OpcUaClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpcUaClient")
            .field("endpoint", &self.config.endpoint)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_stats() {
        let stats = ClientStats::new();

        stats.record_read(Duration::from_millis(10));
        stats.record_create(Duration::from_millis(20));
        stats.record_delete(Duration::from_millis(15));
        stats.record_failure();

        assert_eq!(stats.reads(), 1);
        assert_eq!(stats.creates(), 1);
        assert_eq!(stats.deletes(), 1);
        assert_eq!(stats.failures(), 1);

        // 3 calls, 1 failure
        let rate = stats.success_rate();
        assert!(rate > 0.6 && rate < 0.7);

        assert_eq!(stats.average_response_time(), Duration::from_millis(15));

        stats.reset();
        assert_eq!(stats.reads(), 0);
        assert_eq!(stats.success_rate(), 1.0);
    }

    #[test]
    fn test_success_rate_counts_browse_and_endpoint_calls() {
        let stats = ClientStats::new();

        // One failed browse, two good reads.
        stats.record_browse();
        stats.record_failure();
        stats.record_read(Duration::from_millis(5));
        stats.record_read(Duration::from_millis(5));

        let rate = stats.success_rate();
        assert!(rate > 0.6 && rate < 0.7);

        stats.record_endpoint_request();
        assert_eq!(stats.success_rate(), 0.75);
        assert_eq!(stats.browses(), 1);
    }

    #[test]
    fn test_endpoint_list() {
        let list = EndpointList {
            status: StatusCode::GOOD,
            urls: vec!["opc.tcp://host:4840".to_string()],
        };
        assert!(list.is_good());
        assert_eq!(list.len(), 1);

        let failed = EndpointList {
            status: StatusCode::BAD_COMMUNICATION_ERROR,
            urls: Vec::new(),
        };
        assert!(!failed.is_good());
        assert!(failed.is_empty());
    }
}
