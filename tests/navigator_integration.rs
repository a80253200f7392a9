// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Navigator Integration Tests
//!
//! Most tests run against an in-memory mock server. The tests at the bottom
//! need a live OPC UA server and the `real-transport` feature.
//!
//! # Environment Variables
//!
//! - `OPCUA_TEST_ENDPOINT`: OPC UA server endpoint (default: opc.tcp://localhost:4840)
//! - `OPCUA_TEST_NAMESPACE`: Namespace index for test nodes (default: 2)
//!
//! # Running Tests
//!
//! ```bash
//! # Mock-backed tests
//! cargo test --test navigator_integration
//!
//! # Live server tests
//! cargo test --features real-transport --test navigator_integration -- --ignored
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use opcua_navigator::browse::reference_types;
use opcua_navigator::client::{
    AddNodeRequest, AddNodeResult, EndpointDescription, OpcUaTransport, OpcUaValue, ReadResult,
    ReferenceDescription, TransportState,
};
use opcua_navigator::{
    AttributeId, BrowseDirection, BrowsePath, ChildBrowser, ConnectionError, NavigatorConfig,
    NodeClass, NodeId, NodeIdMap, OpcUaClient, OpcUaError, OpcUaResult, QualifiedName, StatusCode,
    UaNodeTree,
};

// =============================================================================
// Test Configuration
// =============================================================================

/// Default test endpoint
const DEFAULT_TEST_ENDPOINT: &str = "opc.tcp://localhost:4840";

/// Default test namespace
#[allow(dead_code)]
const DEFAULT_TEST_NAMESPACE: u16 = 2;

/// Get test endpoint from environment or use default
#[allow(dead_code)]
fn test_endpoint() -> String {
    std::env::var("OPCUA_TEST_ENDPOINT").unwrap_or_else(|_| DEFAULT_TEST_ENDPOINT.to_string())
}

/// Get test namespace from environment or use default
#[allow(dead_code)]
fn test_namespace() -> u16 {
    std::env::var("OPCUA_TEST_NAMESPACE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_TEST_NAMESPACE)
}

// =============================================================================
// Mock Server
// =============================================================================

/// In-memory address space shared between a test and its transport.
#[derive(Default)]
pub struct MockServer {
    connected: AtomicBool,
    graph: RwLock<HashMap<NodeId, Vec<ReferenceDescription>>>,
    names: RwLock<HashMap<NodeId, String>>,
    failing_browse: RwLock<HashSet<NodeId>>,
    failing_read: RwLock<HashSet<NodeId>>,
    fail_adds: AtomicBool,
    endpoints: RwLock<Option<Vec<String>>>,
    next_id: AtomicU32,
    deleted: RwLock<Vec<NodeId>>,
    browse_calls: AtomicUsize,
    read_calls: AtomicUsize,
    add_calls: AtomicUsize,
    events: RwLock<Vec<String>>,
}

impl MockServer {
    /// Creates an empty server with the Objects folder registered.
    pub fn new() -> Arc<Self> {
        let server = Self {
            next_id: AtomicU32::new(5000),
            ..Self::default()
        };
        server
            .names
            .write()
            .unwrap()
            .insert(NodeId::OBJECTS_FOLDER, "Objects".to_string());
        Arc::new(server)
    }

    /// Adds an Organizes reference from `parent` to `child` named `name`.
    pub fn link(&self, parent: &NodeId, child: &NodeId, name: &str) {
        self.graph
            .write()
            .unwrap()
            .entry(parent.clone())
            .or_default()
            .push(ReferenceDescription::forward(
                child.clone(),
                reference_types::organizes(),
                name,
            ));
        self.names
            .write()
            .unwrap()
            .insert(child.clone(), name.to_string());
    }

    /// Adds an inverse reference from `child` back to `parent`.
    pub fn link_back(&self, child: &NodeId, parent: &NodeId, name: &str) {
        self.graph
            .write()
            .unwrap()
            .entry(child.clone())
            .or_default()
            .push(
                ReferenceDescription::forward(parent.clone(), reference_types::organizes(), name)
                    .inverse(),
            );
    }

    pub fn fail_browse(&self, node_id: &NodeId) {
        self.failing_browse.write().unwrap().insert(node_id.clone());
    }

    pub fn fail_read(&self, node_id: &NodeId) {
        self.failing_read.write().unwrap().insert(node_id.clone());
    }

    pub fn fail_adds(&self, fail: bool) {
        self.fail_adds.store(fail, Ordering::SeqCst);
    }

    pub fn set_endpoints(&self, urls: Option<Vec<&str>>) {
        *self.endpoints.write().unwrap() =
            urls.map(|urls| urls.into_iter().map(String::from).collect());
    }

    pub fn deleted(&self) -> Vec<NodeId> {
        self.deleted.read().unwrap().clone()
    }

    pub fn browse_calls(&self) -> usize {
        self.browse_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    /// Browse and add calls in the order the server saw them.
    pub fn events(&self) -> Vec<String> {
        self.events.read().unwrap().clone()
    }

    fn record(&self, event: String) {
        self.events.write().unwrap().push(event);
    }

    fn add(&self, request: &AddNodeRequest, node_class: NodeClass) -> AddNodeResult {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("add {}", request.browse_name.name));
        if self.fail_adds.load(Ordering::SeqCst) {
            return AddNodeResult::failed(StatusCode::BAD_USER_ACCESS_DENIED);
        }

        let node_id = if request.requested_id.is_auto() {
            NodeId::numeric(
                request.requested_id.namespace_index,
                self.next_id.fetch_add(1, Ordering::SeqCst),
            )
        } else {
            request.requested_id.clone()
        };

        if self.names.read().unwrap().contains_key(&node_id) {
            return AddNodeResult::failed(StatusCode::BAD_NODE_ID_EXISTS);
        }

        let mut reference = ReferenceDescription::forward(
            node_id.clone(),
            request.reference_type_id.clone(),
            request.browse_name.name.clone(),
        )
        .with_node_class(node_class);
        reference.browse_name = request.browse_name.clone();

        self.graph
            .write()
            .unwrap()
            .entry(request.parent.clone())
            .or_default()
            .push(reference);
        self.names
            .write()
            .unwrap()
            .insert(node_id.clone(), request.browse_name.name.clone());

        AddNodeResult::created(node_id)
    }
}

// =============================================================================
// Mock Transport
// =============================================================================

/// Mock OPC UA transport for testing without a real server.
pub struct MockTransport {
    server: Arc<MockServer>,
    endpoint: String,
}

impl MockTransport {
    pub fn new(server: Arc<MockServer>) -> Self {
        Self {
            server,
            endpoint: DEFAULT_TEST_ENDPOINT.to_string(),
        }
    }

    fn check_connected(&self) -> OpcUaResult<()> {
        if self.server.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(OpcUaError::not_connected())
        }
    }
}

#[async_trait]
impl OpcUaTransport for MockTransport {
    async fn connect(&mut self) -> OpcUaResult<()> {
        self.server.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> OpcUaResult<()> {
        self.server.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.server.connected.load(Ordering::SeqCst)
    }

    fn state(&self) -> TransportState {
        if self.is_connected() {
            TransportState::Connected
        } else {
            TransportState::Disconnected
        }
    }

    async fn browse(
        &self,
        node_id: &NodeId,
        _direction: BrowseDirection,
    ) -> OpcUaResult<Vec<ReferenceDescription>> {
        self.check_connected()?;
        self.server.browse_calls.fetch_add(1, Ordering::SeqCst);
        self.server.record(format!("browse {}", node_id));
        // Give other tasks a chance to queue on the client while this call runs.
        tokio::task::yield_now().await;
        if self.server.failing_browse.read().unwrap().contains(node_id) {
            return Err(OpcUaError::bad_status(
                node_id.to_string(),
                StatusCode::BAD_NODE_ID_UNKNOWN,
            ));
        }
        Ok(self
            .server
            .graph
            .read()
            .unwrap()
            .get(node_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn read_attribute(
        &self,
        node_id: &NodeId,
        attribute: AttributeId,
    ) -> OpcUaResult<ReadResult> {
        self.check_connected()?;
        self.server.read_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(attribute, AttributeId::BrowseName);

        if self.server.failing_read.read().unwrap().contains(node_id) {
            return Ok(ReadResult::failure(
                node_id.clone(),
                StatusCode::BAD_NODE_ID_UNKNOWN,
            ));
        }
        match self.server.names.read().unwrap().get(node_id) {
            Some(name) => Ok(ReadResult::success(
                node_id.clone(),
                OpcUaValue::QualifiedName(QualifiedName::new(node_id.namespace_index, name.clone())),
            )),
            None => Ok(ReadResult::failure(
                node_id.clone(),
                StatusCode::BAD_NODE_ID_UNKNOWN,
            )),
        }
    }

    async fn add_object_node(&self, request: &AddNodeRequest) -> OpcUaResult<AddNodeResult> {
        self.check_connected()?;
        Ok(self.server.add(request, NodeClass::Object))
    }

    async fn add_variable_node(&self, request: &AddNodeRequest) -> OpcUaResult<AddNodeResult> {
        self.check_connected()?;
        Ok(self.server.add(request, NodeClass::Variable))
    }

    async fn delete_node(
        &self,
        node_id: &NodeId,
        delete_target_references: bool,
    ) -> OpcUaResult<StatusCode> {
        self.check_connected()?;
        assert!(delete_target_references);
        self.server.deleted.write().unwrap().push(node_id.clone());
        Ok(StatusCode::GOOD)
    }

    async fn get_endpoints(&self, server_url: &str) -> OpcUaResult<Vec<EndpointDescription>> {
        self.check_connected()?;
        match self.server.endpoints.read().unwrap().as_ref() {
            Some(urls) => Ok(urls.iter().map(EndpointDescription::new).collect()),
            None => Err(OpcUaError::connection(ConnectionError::refused(server_url))),
        }
    }

    fn display_name(&self) -> String {
        "MockTransport".to_string()
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn connected_client(server: &Arc<MockServer>) -> OpcUaClient<MockTransport> {
    let client = OpcUaClient::new(
        NavigatorConfig::new(DEFAULT_TEST_ENDPOINT),
        MockTransport::new(Arc::clone(server)),
    );
    client.connect().await.unwrap();
    client
}

fn ns2(id: u32) -> NodeId {
    NodeId::numeric(2, id)
}

/// Objects -> Plant(ns2) -> { Line1 -> Sensor1, Line2 }
fn plant_server() -> Arc<MockServer> {
    let server = MockServer::new();
    server.link(&NodeId::OBJECTS_FOLDER, &ns2(1), "Plant");
    server.link(&ns2(1), &ns2(10), "Line1");
    server.link(&ns2(10), &ns2(100), "Sensor1");
    server.link(&ns2(1), &ns2(20), "Line2");
    server.link_back(&ns2(1), &NodeId::OBJECTS_FOLDER, "Objects");
    server
}

// =============================================================================
// Precondition Tests
// =============================================================================

#[tokio::test]
async fn test_operations_require_connection() {
    let server = plant_server();
    let client = OpcUaClient::new(
        NavigatorConfig::new(DEFAULT_TEST_ENDPOINT),
        MockTransport::new(Arc::clone(&server)),
    );

    let err = client
        .resolve_path(&NodeId::OBJECTS_FOLDER, &["Plant"])
        .await
        .unwrap_err();
    assert!(err.is_precondition_violation());

    let mut visited = NodeIdMap::new();
    assert!(client
        .browse_children(&ns2(1), &mut visited)
        .await
        .unwrap_err()
        .is_precondition_violation());
    assert!(client.delete_tree(&ns2(1)).await.is_err());
    assert!(client.get_endpoints(DEFAULT_TEST_ENDPOINT).await.is_err());
    assert!(client
        .create_folder(&ns2(1), "New", None, None)
        .await
        .is_err());

    let mut browser = ChildBrowser::new();
    assert!(browser.browse(&client, &ns2(1)).await.is_err());

    assert_eq!(server.browse_calls(), 0);
    assert_eq!(server.add_calls(), 0);
}

#[tokio::test]
async fn test_disconnect_blocks_further_calls() {
    let server = plant_server();
    let client = connected_client(&server).await;
    assert!(client.is_connected().await);

    client.disconnect().await.unwrap();
    assert_eq!(client.connection_state().await, TransportState::Disconnected);
    assert!(client
        .get_child(&NodeId::OBJECTS_FOLDER, "Plant")
        .await
        .is_err());
}

// =============================================================================
// ChildBrowser Tests
// =============================================================================

#[tokio::test]
async fn test_child_browser_forward_only() {
    let server = plant_server();
    let client = connected_client(&server).await;

    let mut browser = ChildBrowser::new();
    let status = browser.browse(&client, &ns2(1)).await.unwrap();

    assert!(status.is_good());
    assert_eq!(browser.len(), 2);
    assert_eq!(browser.find("Line1"), Some(0));
    assert_eq!(browser.find("Line2"), Some(1));
    assert_eq!(browser.find("line1"), None);
    assert_eq!(browser.find("Objects"), None);
    assert_eq!(server.browse_calls(), 1);
}

#[tokio::test]
async fn test_child_browser_failure_leaves_list_empty() {
    let server = plant_server();
    server.fail_browse(&ns2(10));
    let client = connected_client(&server).await;

    let mut browser = ChildBrowser::new();
    browser.browse(&client, &ns2(1)).await.unwrap();
    assert_eq!(browser.len(), 2);

    let status = browser.browse(&client, &ns2(10)).await.unwrap();
    assert_eq!(status, StatusCode::BAD_NODE_ID_UNKNOWN);
    assert!(browser.is_empty());
    assert_eq!(client.browse_stats().errors.load(Ordering::Relaxed), 1);
}

// =============================================================================
// Path Resolution Tests
// =============================================================================

#[tokio::test]
async fn test_resolve_empty_path_returns_start() {
    let server = plant_server();
    let client = connected_client(&server).await;
    let empty: [&str; 0] = [];

    for start in [NodeId::OBJECTS_FOLDER, ns2(10), NodeId::string(3, "Nowhere")] {
        let outcome = client.resolve_path(&start, &empty).await.unwrap();
        assert!(outcome.is_resolved());
        assert_eq!(outcome.node_id(), Some(&start));
    }
    assert_eq!(server.browse_calls(), 0);
}

#[tokio::test]
async fn test_resolve_full_path() {
    let server = plant_server();
    let client = connected_client(&server).await;

    let outcome = client
        .resolve_path(&NodeId::OBJECTS_FOLDER, &["Plant", "Line1", "Sensor1"])
        .await
        .unwrap();
    assert!(outcome.is_resolved());
    assert_eq!(outcome.node_id, Some(ns2(100)));
    assert!(outcome.created.is_empty());

    let child = client.get_child(&ns2(1), "Line2").await.unwrap();
    assert_eq!(child.node_id, Some(ns2(20)));
}

#[tokio::test]
async fn test_resolve_missing_intermediate_segment() {
    let server = plant_server();
    let client = connected_client(&server).await;

    let outcome = client
        .resolve_path(&NodeId::OBJECTS_FOLDER, &["Plant", "Line9", "Sensor1"])
        .await
        .unwrap();
    assert!(!outcome.is_resolved());
    assert_eq!(outcome.status, StatusCode::BAD_NO_MATCH);
    assert_eq!(outcome.node_id, None);
    assert_eq!(server.add_calls(), 0);
}

#[tokio::test]
async fn test_resolve_reports_browse_failure() {
    let server = plant_server();
    server.fail_browse(&ns2(10));
    let client = connected_client(&server).await;

    let outcome = client
        .resolve_path(&NodeId::OBJECTS_FOLDER, &["Plant", "Line1", "Sensor1"])
        .await
        .unwrap();
    assert_eq!(outcome.status, StatusCode::BAD_NODE_ID_UNKNOWN);
}

#[tokio::test]
async fn test_resolve_browse_path() {
    let server = plant_server();
    let client = connected_client(&server).await;

    let path = BrowsePath::from_string("Objects/Plant/Line1").unwrap();
    let outcome = client.resolve_browse_path(&path).await.unwrap();
    assert_eq!(outcome.node_id, Some(ns2(10)));
}

#[tokio::test]
async fn test_resolve_or_create_existing_path_is_idempotent() {
    let server = plant_server();
    let client = connected_client(&server).await;

    let outcome = client
        .resolve_or_create_path(&NodeId::OBJECTS_FOLDER, &["Plant", "Line1"], None)
        .await
        .unwrap();
    assert!(outcome.is_resolved());
    assert_eq!(outcome.node_id, Some(ns2(10)));
    assert!(outcome.created.is_empty());
    assert_eq!(server.add_calls(), 0);
}

#[tokio::test]
async fn test_resolve_or_create_line1_sensor3() {
    let server = MockServer::new();
    let client = connected_client(&server).await;
    let path = ["Line1", "Sensor3"];

    let first = client
        .resolve_or_create_path(&NodeId::OBJECTS_FOLDER, &path, None)
        .await
        .unwrap();
    assert!(first.is_resolved());
    assert_eq!(first.created.len(), 2);
    assert_eq!(server.add_calls(), 2);

    // Sensor3 was created under the new Line1.
    let line1 = first.created[0].clone();
    let sensor3 = first.created[1].clone();
    assert_eq!(first.node_id, Some(sensor3.clone()));
    let lookup = client.get_child(&line1, "Sensor3").await.unwrap();
    assert_eq!(lookup.node_id, Some(sensor3.clone()));

    let second = client
        .resolve_or_create_path(&NodeId::OBJECTS_FOLDER, &path, None)
        .await
        .unwrap();
    assert!(second.is_resolved());
    assert!(second.created.is_empty());
    assert_eq!(second.node_id, Some(sensor3));
    assert_eq!(server.add_calls(), 2);
}

#[tokio::test]
async fn test_resolve_or_create_partial_path_uses_namespace() {
    let server = plant_server();
    let client = connected_client(&server).await;

    let outcome = client
        .resolve_or_create_path(&NodeId::OBJECTS_FOLDER, &["Plant", "Line3", "Cell"], Some(4))
        .await
        .unwrap();
    assert!(outcome.is_resolved());
    assert_eq!(outcome.created.len(), 2);
    assert!(outcome.created.iter().all(|id| id.namespace_index == 4));

    let check = client
        .resolve_path(&ns2(1), &["Line3", "Cell"])
        .await
        .unwrap();
    assert_eq!(check.node_id, outcome.node_id);
}

#[tokio::test]
async fn test_resolve_or_create_stops_on_add_failure() {
    let server = MockServer::new();
    server.fail_adds(true);
    let client = connected_client(&server).await;

    let outcome = client
        .resolve_or_create_path(&NodeId::OBJECTS_FOLDER, &["A", "B", "C"], Some(2))
        .await
        .unwrap();
    assert!(!outcome.is_resolved());
    assert_eq!(outcome.status, StatusCode::BAD_USER_ACCESS_DENIED);
    assert!(outcome.created.is_empty());
    assert_eq!(server.add_calls(), 1);
}

#[tokio::test]
async fn test_resolve_or_create_after_failed_lookup_browse() {
    let server = plant_server();
    server.fail_browse(&ns2(10));
    let client = connected_client(&server).await;

    let outcome = client
        .resolve_or_create_path(&NodeId::OBJECTS_FOLDER, &["Plant", "Line1", "NewCell"], None)
        .await
        .unwrap();
    assert!(outcome.is_resolved());
    assert_eq!(outcome.lookup_status, Some(StatusCode::BAD_NODE_ID_UNKNOWN));
    assert_eq!(outcome.created.len(), 1);
    assert_eq!(outcome.node_id, Some(outcome.created[0].clone()));
    assert_eq!(server.add_calls(), 1);

    // NewCell hangs off Line1, the node whose browse failed.
    assert_eq!(
        server.events().last().map(String::as_str),
        Some("add NewCell")
    );
    let parent = server
        .graph
        .read()
        .unwrap()
        .get(&ns2(10))
        .map(|refs| refs.iter().any(|r| r.browse_name.name == "NewCell"));
    assert_eq!(parent, Some(true));
}

#[tokio::test]
async fn test_resolve_or_create_clean_lookup_has_no_lookup_status() {
    let server = plant_server();
    let client = connected_client(&server).await;

    let outcome = client
        .resolve_or_create_path(&NodeId::OBJECTS_FOLDER, &["Plant", "Line1", "NewCell"], None)
        .await
        .unwrap();
    assert!(outcome.is_resolved());
    assert_eq!(outcome.lookup_status, None);
    assert_eq!(outcome.created.len(), 1);
}

#[tokio::test]
async fn test_concurrent_resolve_or_create_interleaves_calls() {
    let server = plant_server();
    let client = connected_client(&server).await;
    let plant = ns2(1);

    // Both calls look for the missing "Cell" under Plant. The lock is held
    // per remote call, so the second walk browses Plant before the first
    // one adds Cell, and both create it.
    let (first, second) = tokio::join!(
        client.resolve_or_create_path(&NodeId::OBJECTS_FOLDER, &["Plant", "Cell"], Some(2)),
        client.resolve_or_create_path(&plant, &["Cell"], Some(2)),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert!(first.is_resolved());
    assert!(second.is_resolved());
    assert!(server.add_calls() >= 2);
    assert_eq!(first.created.len(), 1);
    assert_eq!(second.created.len(), 1);
    assert_ne!(first.node_id, second.node_id);

    let events = server.events();
    let browse_plant = format!("browse {}", plant);
    let plant_browses: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| **e == browse_plant)
        .map(|(i, _)| i)
        .collect();
    let first_add = events.iter().position(|e| e == "add Cell").unwrap();
    assert_eq!(plant_browses.len(), 2);
    assert!(plant_browses[1] < first_add, "events: {:?}", events);

    let cells = server
        .graph
        .read()
        .unwrap()
        .get(&plant)
        .map(|refs| refs.iter().filter(|r| r.browse_name.name == "Cell").count());
    assert_eq!(cells, Some(2));
}

// =============================================================================
// Node Creation Tests
// =============================================================================

#[tokio::test]
async fn test_create_folder_and_variable() {
    let server = plant_server();
    let client = connected_client(&server).await;

    let folder = client
        .create_folder(&ns2(10), "Motors", None, None)
        .await
        .unwrap();
    assert!(folder.is_good());
    let folder_id = folder.node_id.clone().unwrap();
    assert_eq!(folder_id.namespace_index, 2);

    let variable = client
        .create_variable(
            &folder_id,
            "Speed",
            OpcUaValue::Double(1450.0),
            Some(NodeId::string(2, "Motors.Speed")),
            None,
        )
        .await
        .unwrap();
    assert_eq!(variable.node_id, Some(NodeId::string(2, "Motors.Speed")));

    let mut browser = ChildBrowser::new();
    browser.browse(&client, &folder_id).await.unwrap();
    let speed = browser.find_child("Speed").unwrap();
    assert_eq!(speed.node_class, NodeClass::Variable);
    assert_eq!(speed.reference_type_id, reference_types::organizes());
    assert_eq!(client.stats().creates(), 2);
}

#[tokio::test]
async fn test_create_with_existing_id_reports_status() {
    let server = plant_server();
    let client = connected_client(&server).await;

    let result = client
        .create_folder(&ns2(1), "Again", Some(ns2(10)), None)
        .await
        .unwrap();
    assert!(!result.is_good());
    assert_eq!(result.status, StatusCode::BAD_NODE_ID_EXISTS);
    assert_eq!(client.stats().failures(), 1);
}

// =============================================================================
// Traversal Tests
// =============================================================================

#[tokio::test]
async fn test_browse_children_dedups_shared_child() {
    let server = MockServer::new();
    // Diamond plus a cycle back to the top.
    server.link(&ns2(1), &ns2(2), "Left");
    server.link(&ns2(1), &ns2(3), "Right");
    server.link(&ns2(2), &ns2(4), "Shared");
    server.link(&ns2(3), &ns2(4), "Shared");
    server.link(&ns2(4), &ns2(1), "Top");
    let client = connected_client(&server).await;

    let mut visited = NodeIdMap::new();
    let walk = client.browse_children(&ns2(1), &mut visited).await.unwrap();

    assert!(walk.is_good());
    assert_eq!(visited.len(), 4);
    for id in [ns2(1), ns2(2), ns2(3), ns2(4)] {
        assert!(visited.contains(&id));
    }
    // The start node is browsed again when reached through the cycle.
    assert_eq!(server.browse_calls(), 5);
}

#[tokio::test]
async fn test_browse_children_stays_in_namespace() {
    let server = plant_server();
    server.link(&ns2(10), &NodeId::numeric(0, 2253), "Server");
    server.link(&ns2(10), &NodeId::numeric(3, 7), "Foreign");
    let client = connected_client(&server).await;

    let mut visited = NodeIdMap::new();
    client.browse_tree_flat(&ns2(1), &mut visited).await.unwrap();

    assert_eq!(visited.to_sorted_vec().len(), 4);
    assert!(visited.contains(&ns2(1)));
    assert!(visited.contains(&ns2(100)));
    assert!(!visited.contains(&NodeId::numeric(0, 2253)));
    assert!(!visited.contains(&NodeId::numeric(3, 7)));
}

#[tokio::test]
async fn test_browse_children_keeps_partial_results() {
    let server = plant_server();
    server.fail_browse(&ns2(10));
    let client = connected_client(&server).await;

    let mut visited = NodeIdMap::new();
    let walk = client.browse_children(&ns2(1), &mut visited).await.unwrap();

    assert!(!walk.is_good());
    assert_eq!(walk.failures, 1);
    assert!(visited.contains(&ns2(10)));
    assert!(visited.contains(&ns2(20)));
    assert!(!visited.contains(&ns2(100)));
}

#[tokio::test]
async fn test_browse_tree_prunes_namespace_zero() {
    let server = MockServer::new();
    let start = ns2(1);
    server.link(&start, &ns2(2), "Pump");
    server.link(&start, &ns2(3), "Valve");
    server.link(&start, &NodeId::numeric(0, 2253), "Server");
    let client = connected_client(&server).await;

    let mut tree = UaNodeTree::new("Root");
    let walk = client.browse_tree(&start, &mut tree).await.unwrap();

    assert!(walk.is_good());
    let root = tree.root();
    assert_eq!(tree.data(root), Some(&start));
    assert_eq!(tree.children(root).len(), 2);
    let pump = tree.find_child(root, "Pump").unwrap();
    assert_eq!(tree.data(pump), Some(&ns2(2)));
    assert!(tree.find_child(root, "Server").is_none());
}

#[tokio::test]
async fn test_browse_tree_crosses_nonzero_namespaces() {
    let server = plant_server();
    server.link(&ns2(20), &NodeId::string(3, "Robot"), "Robot");
    server.link(&NodeId::string(3, "Robot"), &NodeId::string(3, "Arm"), "Arm");
    let client = connected_client(&server).await;

    let mut tree = UaNodeTree::new("Plant");
    client.browse_tree(&ns2(1), &mut tree).await.unwrap();

    let arm = tree.lookup_path(&["Line2", "Robot", "Arm"]).unwrap();
    assert_eq!(tree.data(arm), Some(&NodeId::string(3, "Arm")));
    assert_eq!(tree.len(), 6);
}

#[tokio::test]
async fn test_browse_tree_skips_failed_reads() {
    let server = plant_server();
    server.fail_read(&ns2(10));
    let client = connected_client(&server).await;

    let mut tree = UaNodeTree::new("Plant");
    let walk = client.browse_tree(&ns2(1), &mut tree).await.unwrap();

    assert_eq!(walk.failures, 1);
    let root = tree.root();
    assert!(tree.find_child(root, "Line1").is_none());
    assert!(tree.find_child(root, "Line2").is_some());
    // The skipped branch is never browsed.
    assert_eq!(server.browse_calls(), 2);
}

#[tokio::test]
async fn test_browse_tree_terminates_on_cycle() {
    let server = MockServer::new();
    server.link(&ns2(1), &ns2(2), "Child");
    server.link(&ns2(2), &ns2(1), "Loop");
    let client = connected_client(&server).await;

    let mut tree = UaNodeTree::new("Root");
    client.browse_tree(&ns2(1), &mut tree).await.unwrap();

    assert_eq!(tree.len(), 2);
    assert_eq!(server.read_calls(), 1);
}

#[tokio::test]
async fn test_delete_tree_never_deletes_namespace_zero() {
    let server = plant_server();
    // A namespace 0 node linked as same-namespace child of a namespace 0 start.
    server.link(&NodeId::OBJECTS_FOLDER, &NodeId::numeric(0, 2253), "Server");
    let client = connected_client(&server).await;

    let walk = client.delete_tree(&NodeId::OBJECTS_FOLDER).await.unwrap();
    assert!(walk.is_good());
    assert!(server
        .deleted()
        .iter()
        .all(|id| id.namespace_index > 0));

    let walk = client.delete_tree(&ns2(1)).await.unwrap();
    assert!(walk.is_good());
    let deleted: HashSet<NodeId> = server.deleted().into_iter().collect();
    assert_eq!(
        deleted,
        [ns2(1), ns2(10), ns2(20), ns2(100)].into_iter().collect()
    );
    assert_eq!(client.stats().deletes(), 4);
}

// =============================================================================
// Endpoint Discovery Tests
// =============================================================================

#[tokio::test]
async fn test_get_endpoints_preserves_order() {
    let server = MockServer::new();
    server.set_endpoints(Some(vec![
        "opc.tcp://host:4840",
        "opc.tcp://host:4841/secure",
        "opc.tcp://10.0.0.5:4840",
    ]));
    let client = connected_client(&server).await;

    let list = client.get_endpoints("opc.tcp://host:4840").await.unwrap();
    assert!(list.is_good());
    assert_eq!(
        list.urls,
        vec![
            "opc.tcp://host:4840",
            "opc.tcp://host:4841/secure",
            "opc.tcp://10.0.0.5:4840",
        ]
    );
}

#[tokio::test]
async fn test_get_endpoints_error_returns_status() {
    let server = MockServer::new();
    server.set_endpoints(None);
    let client = connected_client(&server).await;

    let list = client.get_endpoints("opc.tcp://host:4840").await.unwrap();
    assert!(!list.is_good());
    assert!(list.is_empty());
    assert_eq!(client.stats().endpoint_requests(), 1);
}

// =============================================================================
// Live Server Tests
// =============================================================================

#[cfg(feature = "real-transport")]
mod live {
    use super::*;
    use opcua_navigator::RealOpcUaTransport;

    fn live_client() -> OpcUaClient<RealOpcUaTransport> {
        let config = NavigatorConfig::builder()
            .endpoint(test_endpoint())
            .default_namespace(test_namespace())
            .build()
            .unwrap();
        OpcUaClient::new(config.clone(), RealOpcUaTransport::new(config))
    }

    #[tokio::test]
    #[ignore = "Requires OPC UA server"]
    async fn test_live_get_endpoints() {
        let client = live_client();
        client.connect().await.unwrap();

        let list = client.get_endpoints(&test_endpoint()).await.unwrap();
        assert!(list.is_good());
        assert!(!list.is_empty());

        client.disconnect().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires OPC UA server"]
    async fn test_live_create_resolve_delete() {
        let client = live_client();
        client.connect().await.unwrap();

        let root = format!("NavigatorTest-{}", std::process::id());
        let path = [root.as_str(), "Line1", "Sensor3"];

        let created = client
            .resolve_or_create_path(&NodeId::OBJECTS_FOLDER, &path, None)
            .await
            .unwrap();
        assert!(created.is_resolved());

        let again = client
            .resolve_path(&NodeId::OBJECTS_FOLDER, &path)
            .await
            .unwrap();
        assert_eq!(again.node_id, created.node_id);

        let top = client
            .get_child(&NodeId::OBJECTS_FOLDER, &root)
            .await
            .unwrap();
        let top = top.node_id.unwrap();
        let walk = client.delete_tree(&top).await.unwrap();
        assert!(walk.is_good());

        client.disconnect().await.unwrap();
    }
}
