// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport backed by the `opcua` crate client.
//!
//! Connects anonymously to the unsecured endpoint of the configured server
//! and maps every [`OpcUaTransport`] method onto one service call of the
//! `opcua` session.
//!
//! # Example
//!
//! ```rust,ignore
//! use opcua_navigator::client::{OpcUaClient, RealOpcUaTransport};
//! use opcua_navigator::types::NavigatorConfig;
//!
//! let config = NavigatorConfig::builder()
//!     .endpoint("opc.tcp://localhost:4840")
//!     .build()?;
//!
//! let client = OpcUaClient::new(config.clone(), RealOpcUaTransport::new(config));
//! client.connect().await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, trace};

use opcua::client::prelude::{
    AttributeService, Client, ClientBuilder, IdentityToken,
    NodeManagementService, Session, ViewService,
};
use opcua::sync::RwLock as OpcUaRwLock;
use opcua::types as ua;

use crate::client::transport::{
    AddNodeRequest, AddNodeResult, EndpointDescription, OpcUaTransport, OpcUaValue, ReadResult,
    ReferenceDescription, TransportState,
};
use crate::error::{BrowseError, ConnectionError, OpcUaError, OpcUaResult, OperationError};
use crate::types::{
    AttributeId, BrowseDirection, NavigatorConfig, NodeClass, NodeId, NodeIdentifier,
    QualifiedName, StatusCode,
};

// =============================================================================
// RealOpcUaTransport
// =============================================================================

/// Transport over a live `opcua` session.
pub struct RealOpcUaTransport {
    config: NavigatorConfig,
    state: RwLock<TransportState>,
    session: RwLock<Option<Arc<OpcUaRwLock<Session>>>>,
}

impl RealOpcUaTransport {
    /// Creates a new transport for the configured endpoint.
    pub fn new(config: NavigatorConfig) -> Self {
        Self {
            config,
            state: RwLock::new(TransportState::Disconnected),
            session: RwLock::new(None),
        }
    }

    fn build_client(&self) -> OpcUaResult<Client> {
        ClientBuilder::new()
            .application_name(&self.config.application_name)
            .application_uri(&self.config.application_uri())
            .session_name(self.config.effective_session_name())
            .session_retry_limit(0)
            .session_timeout(self.config.request_timeout.as_millis() as u32)
            .trust_server_certs(true)
            .create_sample_keypair(false)
            .client()
            .ok_or_else(|| {
                OpcUaError::connection(ConnectionError::invalid_endpoint(
                    &self.config.endpoint,
                    "Failed to build OPC UA client",
                ))
            })
    }

    async fn get_session(&self) -> OpcUaResult<Arc<OpcUaRwLock<Session>>> {
        let session_guard = self.session.read().await;
        session_guard
            .clone()
            .ok_or_else(|| OpcUaError::connection(ConnectionError::NotConnected))
    }

    async fn set_state(&self, new_state: TransportState) {
        let mut state = self.state.write().await;
        *state = new_state;
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    fn to_ua_node_id(node_id: &NodeId) -> ua::NodeId {
        let ns = node_id.namespace_index;
        match &node_id.identifier {
            NodeIdentifier::Numeric(v) => ua::NodeId::new(ns, *v),
            NodeIdentifier::String(v) => ua::NodeId::new(ns, v.clone()),
            NodeIdentifier::Guid(v) => ua::NodeId::new(ns, ua::Guid::from(*v)),
            NodeIdentifier::Opaque(v) => ua::NodeId::new(ns, ua::ByteString::from(v.as_slice())),
        }
    }

    fn from_ua_node_id(node_id: &ua::NodeId) -> NodeId {
        let ns = node_id.namespace;
        match &node_id.identifier {
            ua::Identifier::Numeric(v) => NodeId::numeric(ns, *v),
            ua::Identifier::String(v) => NodeId::string(ns, v.as_ref()),
            ua::Identifier::Guid(v) => NodeId::guid(ns, uuid::Uuid::from_bytes(*v.as_bytes())),
            ua::Identifier::ByteString(v) => NodeId::opaque(ns, v.value.clone().unwrap_or_default()),
        }
    }

    fn from_ua_status(status: ua::StatusCode) -> StatusCode {
        StatusCode(status.bits())
    }

    fn from_ua_variant(variant: &ua::Variant) -> OpcUaValue {
        use ua::Variant;

        match variant {
            Variant::Empty => OpcUaValue::Null,
            Variant::Boolean(v) => OpcUaValue::Boolean(*v),
            Variant::Int32(v) => OpcUaValue::Int32(*v),
            Variant::UInt32(v) => OpcUaValue::UInt32(*v),
            Variant::Int64(v) => OpcUaValue::Int64(*v),
            Variant::Double(v) => OpcUaValue::Double(*v),
            Variant::String(v) => OpcUaValue::String(v.as_ref().to_string()),
            Variant::QualifiedName(v) => OpcUaValue::QualifiedName(QualifiedName::new(
                v.namespace_index,
                v.name.as_ref(),
            )),
            Variant::LocalizedText(v) => OpcUaValue::LocalizedText(v.text.as_ref().to_string()),
            Variant::NodeId(v) => OpcUaValue::NodeId(Self::from_ua_node_id(v)),
            Variant::DateTime(v) => OpcUaValue::DateTime(v.as_chrono()),
            other => OpcUaValue::String(format!("{:?}", other)),
        }
    }

    fn to_ua_variant(value: &OpcUaValue) -> ua::Variant {
        use ua::Variant;

        match value {
            OpcUaValue::Null => Variant::Empty,
            OpcUaValue::Boolean(v) => Variant::Boolean(*v),
            OpcUaValue::Int32(v) => Variant::Int32(*v),
            OpcUaValue::UInt32(v) => Variant::UInt32(*v),
            OpcUaValue::Int64(v) => Variant::Int64(*v),
            OpcUaValue::Double(v) => Variant::Double(*v),
            OpcUaValue::String(v) => Variant::String(ua::UAString::from(v.as_str())),
            OpcUaValue::LocalizedText(v) => {
                Variant::LocalizedText(Box::new(ua::LocalizedText::new("", v)))
            }
            OpcUaValue::QualifiedName(v) => Variant::QualifiedName(Box::new(
                ua::QualifiedName::new(v.namespace_index, v.name.as_str()),
            )),
            OpcUaValue::NodeId(v) => Variant::NodeId(Box::new(Self::to_ua_node_id(v))),
            OpcUaValue::DateTime(v) => Variant::DateTime(Box::new(ua::DateTime::from(*v))),
        }
    }

    fn from_ua_endpoint(endpoint: &ua::EndpointDescription) -> EndpointDescription {
        EndpointDescription {
            endpoint_url: endpoint.endpoint_url.as_ref().to_string(),
            security_policy_uri: endpoint.security_policy_uri.as_ref().to_string(),
            security_mode: format!("{:?}", endpoint.security_mode),
            security_level: endpoint.security_level,
        }
    }

    fn to_ua_attribute(attribute: AttributeId) -> ua::AttributeId {
        match attribute {
            AttributeId::NodeId => ua::AttributeId::NodeId,
            AttributeId::NodeClass => ua::AttributeId::NodeClass,
            AttributeId::BrowseName => ua::AttributeId::BrowseName,
            AttributeId::DisplayName => ua::AttributeId::DisplayName,
            AttributeId::Description => ua::AttributeId::Description,
            AttributeId::Value => ua::AttributeId::Value,
            AttributeId::DataType => ua::AttributeId::DataType,
        }
    }

    fn to_ua_direction(direction: BrowseDirection) -> ua::BrowseDirection {
        match direction {
            BrowseDirection::Forward => ua::BrowseDirection::Forward,
            BrowseDirection::Inverse => ua::BrowseDirection::Inverse,
            BrowseDirection::Both => ua::BrowseDirection::Both,
        }
    }

    fn add_nodes_item(
        request: &AddNodeRequest,
        node_class: ua::NodeClass,
        attributes: ua::ExtensionObject,
    ) -> ua::AddNodesItem {
        ua::AddNodesItem {
            parent_node_id: Self::to_ua_node_id(&request.parent).into(),
            reference_type_id: Self::to_ua_node_id(&request.reference_type_id),
            requested_new_node_id: Self::to_ua_node_id(&request.requested_id).into(),
            browse_name: ua::QualifiedName::new(
                request.browse_name.namespace_index,
                request.browse_name.name.as_str(),
            ),
            node_class,
            node_attributes: attributes,
            type_definition: request
                .type_definition
                .as_ref()
                .map(Self::to_ua_node_id)
                .unwrap_or_else(ua::NodeId::null)
                .into(),
        }
    }

    async fn add_node(&self, item: ua::AddNodesItem, request: &AddNodeRequest) -> OpcUaResult<AddNodeResult> {
        let session = self.get_session().await?;
        let session_locked = session.read();
        let results = session_locked.add_nodes(&[item]).map_err(|e| {
            OpcUaError::operation(OperationError::add_node_failed(
                request.parent.to_string(),
                request.browse_name.name.as_str(),
                format!("{}", e),
            ))
        })?;

        Ok(match results.first() {
            Some(r) if r.status_code.is_good() => {
                AddNodeResult::created(Self::from_ua_node_id(&r.added_node_id))
            }
            Some(r) => AddNodeResult::failed(Self::from_ua_status(r.status_code)),
            None => AddNodeResult::failed(StatusCode::BAD_UNEXPECTED_ERROR),
        })
    }
}

#[async_trait]
impl OpcUaTransport for RealOpcUaTransport {
    async fn connect(&mut self) -> OpcUaResult<()> {
        self.set_state(TransportState::Connecting).await;
        info!(endpoint = %self.config.endpoint, "Connecting to OPC UA server");

        let mut client = self.build_client()?;

        let endpoints = client
            .get_server_endpoints_from_url(&self.config.endpoint)
            .map_err(|e| {
                OpcUaError::connection(ConnectionError::endpoint_not_found(format!(
                    "{}: {}",
                    &self.config.endpoint, e
                )))
            })?;

        let none_policy = ua::SecurityPolicy::None.to_uri();
        let endpoint = endpoints
            .into_iter()
            .find(|e| {
                e.security_policy_uri.as_ref() == none_policy
                    && e.security_mode == ua::MessageSecurityMode::None
            })
            .ok_or_else(|| {
                OpcUaError::connection(ConnectionError::endpoint_not_found(format!(
                    "{} (no unsecured endpoint)",
                    &self.config.endpoint
                )))
            })?;

        debug!(endpoint_url = %endpoint.endpoint_url, "Found unsecured endpoint");

        let session = match client.connect_to_endpoint(endpoint, IdentityToken::Anonymous) {
            Ok(session) => session,
            Err(_) => {
                self.set_state(TransportState::Failed).await;
                return Err(OpcUaError::connection(ConnectionError::refused(
                    &self.config.endpoint,
                )));
            }
        };

        {
            let mut session_guard = self.session.write().await;
            *session_guard = Some(session);
        }
        self.set_state(TransportState::Connected).await;

        info!(endpoint = %self.config.endpoint, "Connected to OPC UA server");
        Ok(())
    }

    async fn disconnect(&mut self) -> OpcUaResult<()> {
        let session_opt = {
            let mut session_guard = self.session.write().await;
            session_guard.take()
        };

        if let Some(session) = session_opt {
            let session_locked = session.read();
            session_locked.disconnect();
        }

        self.set_state(TransportState::Disconnected).await;
        info!(endpoint = %self.config.endpoint, "Disconnected from OPC UA server");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state
            .try_read()
            .map(|state| state.is_connected())
            .unwrap_or(false)
    }

    fn state(&self) -> TransportState {
        self.state
            .try_read()
            .map(|state| *state)
            .unwrap_or(TransportState::Disconnected)
    }

    async fn browse(
        &self,
        node_id: &NodeId,
        direction: BrowseDirection,
    ) -> OpcUaResult<Vec<ReferenceDescription>> {
        let session = self.get_session().await?;
        trace!(node_id = %node_id, ?direction, "Browsing node");

        let description = ua::BrowseDescription {
            node_id: Self::to_ua_node_id(node_id),
            browse_direction: Self::to_ua_direction(direction),
            reference_type_id: ua::ReferenceTypeId::References.into(),
            include_subtypes: true,
            node_class_mask: 0,
            result_mask: ua::BrowseDescriptionResultMask::all().bits(),
        };

        let session_locked = session.read();
        let results = session_locked
            .browse(&[description])
            .map_err(|e| {
                OpcUaError::browse(BrowseError::browse_failed(node_id.to_string(), format!("{}", e)))
            })?
            .unwrap_or_default();

        let Some(result) = results.first() else {
            return Ok(Vec::new());
        };
        if !result.status_code.is_good() {
            return Err(OpcUaError::bad_status(
                node_id.to_string(),
                Self::from_ua_status(result.status_code),
            ));
        }

        Ok(result
            .references
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|r| ReferenceDescription {
                node_id: Self::from_ua_node_id(&r.node_id.node_id),
                reference_type_id: Self::from_ua_node_id(&r.reference_type_id),
                is_forward: r.is_forward,
                browse_name: QualifiedName::new(
                    r.browse_name.namespace_index,
                    r.browse_name.name.as_ref(),
                ),
                display_name: r.display_name.text.as_ref().to_string(),
                node_class: NodeClass::from_value(r.node_class as u32).unwrap_or_default(),
                type_definition: Some(Self::from_ua_node_id(&r.type_definition.node_id)),
            })
            .collect())
    }

    async fn read_attribute(
        &self,
        node_id: &NodeId,
        attribute: AttributeId,
    ) -> OpcUaResult<ReadResult> {
        let session = self.get_session().await?;
        trace!(node_id = %node_id, ?attribute, "Reading node attribute");

        let read_value_id = ua::ReadValueId {
            node_id: Self::to_ua_node_id(node_id),
            attribute_id: Self::to_ua_attribute(attribute) as u32,
            index_range: ua::UAString::null(),
            data_encoding: ua::QualifiedName::null(),
        };

        let session_locked = session.read();
        let values = session_locked
            .read(&[read_value_id], ua::TimestampsToReturn::Neither, 0.0)
            .map_err(|e| {
                OpcUaError::operation(OperationError::read_failed(
                    node_id.to_string(),
                    format!("{}", e),
                ))
            })?;

        let Some(data_value) = values.first() else {
            return Ok(ReadResult::failure(node_id.clone(), StatusCode::BAD_UNEXPECTED_ERROR));
        };
        let status = data_value
            .status
            .map(Self::from_ua_status)
            .unwrap_or(StatusCode::GOOD);

        match &data_value.value {
            Some(variant) if status.is_good() => Ok(ReadResult::success(
                node_id.clone(),
                Self::from_ua_variant(variant),
            )),
            _ if status.is_good() => Ok(ReadResult::failure(
                node_id.clone(),
                StatusCode::BAD_ATTRIBUTE_ID_INVALID,
            )),
            _ => Ok(ReadResult::failure(node_id.clone(), status)),
        }
    }

    async fn add_object_node(&self, request: &AddNodeRequest) -> OpcUaResult<AddNodeResult> {
        let attributes = ua::ObjectAttributes {
            specified_attributes: (ua::AttributesMask::DISPLAY_NAME | ua::AttributesMask::DESCRIPTION)
                .bits(),
            display_name: ua::LocalizedText::new("", &request.attributes.display_name),
            description: ua::LocalizedText::new("", &request.attributes.description),
            write_mask: 0,
            user_write_mask: 0,
            event_notifier: 0,
        };
        let encoded = ua::ExtensionObject::from_encodable(
            ua::ObjectId::ObjectAttributes_Encoding_DefaultBinary,
            &attributes,
        );
        let item = Self::add_nodes_item(request, ua::NodeClass::Object, encoded);
        self.add_node(item, request).await
    }

    async fn add_variable_node(&self, request: &AddNodeRequest) -> OpcUaResult<AddNodeResult> {
        let value = request.attributes.value.clone().unwrap_or_default();
        let attributes = ua::VariableAttributes {
            specified_attributes: (ua::AttributesMask::DISPLAY_NAME
                | ua::AttributesMask::DESCRIPTION
                | ua::AttributesMask::VALUE
                | ua::AttributesMask::DATA_TYPE
                | ua::AttributesMask::ACCESS_LEVEL
                | ua::AttributesMask::USER_ACCESS_LEVEL)
                .bits(),
            display_name: ua::LocalizedText::new("", &request.attributes.display_name),
            description: ua::LocalizedText::new("", &request.attributes.description),
            write_mask: 0,
            user_write_mask: 0,
            value: Self::to_ua_variant(&value),
            data_type: Self::to_ua_node_id(&value.data_type_id()),
            value_rank: -1,
            array_dimensions: None,
            access_level: 3,
            user_access_level: 3,
            minimum_sampling_interval: 0.0,
            historizing: false,
        };
        let encoded = ua::ExtensionObject::from_encodable(
            ua::ObjectId::VariableAttributes_Encoding_DefaultBinary,
            &attributes,
        );
        let item = Self::add_nodes_item(request, ua::NodeClass::Variable, encoded);
        self.add_node(item, request).await
    }

    async fn delete_node(
        &self,
        node_id: &NodeId,
        delete_target_references: bool,
    ) -> OpcUaResult<StatusCode> {
        let session = self.get_session().await?;
        trace!(node_id = %node_id, "Deleting node");

        let item = ua::DeleteNodesItem {
            node_id: Self::to_ua_node_id(node_id),
            delete_target_references,
        };

        let session_locked = session.read();
        let statuses = session_locked.delete_nodes(&[item]).map_err(|e| {
            OpcUaError::operation(OperationError::delete_failed(
                node_id.to_string(),
                format!("{}", e),
            ))
        })?;

        Ok(statuses
            .first()
            .copied()
            .map(Self::from_ua_status)
            .unwrap_or(StatusCode::BAD_UNEXPECTED_ERROR))
    }

    async fn get_endpoints(&self, server_url: &str) -> OpcUaResult<Vec<EndpointDescription>> {
        self.get_session().await?;
        trace!(server_url = server_url, "Requesting endpoints");

        // Discovery goes to `server_url`, which need not be the session endpoint.
        let client = self.build_client()?;
        let endpoints = client.get_server_endpoints_from_url(server_url).map_err(|e| {
            OpcUaError::connection(ConnectionError::endpoint_not_found(format!(
                "{}: {}",
                server_url, e
            )))
        })?;

        Ok(endpoints.iter().map(Self::from_ua_endpoint).collect())
    }

    fn display_name(&self) -> String {
        format!("RealOpcUaTransport({})", self.config.endpoint)
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

// =============================================================================
// Tests
// =============================================================================
