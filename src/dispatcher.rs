// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The service router (spec.md §4.4 Phase S): decodes a `SecureMessage`
//! body's type-id, looks it up in the service table (`ServiceId`), and
//! drives the matching session/internal-server call. Kept free of any
//! transport/connection-state concerns — [`crate::processor::Processor`]
//! supplies the decoded request bytes and sends whatever this module
//! returns.

use std::{future::Future, pin::Pin};

use anyhow::{Context, Result};
use tracing::warn;

use crate::{
    facade::{InternalServer, SessionFacade},
    services::{
        attributes::{ReadRequest, ReadResponse, WriteRequest, WriteResponse},
        common::{RequestHeader, ResponseHeader, ServiceFault},
        ids::ServiceId,
        session::{
            ActivateSessionRequest, ActivateSessionResponse, CloseSessionRequest, CloseSessionResponse,
            CreateSessionRequest, CreateSessionResponse, GetEndpointsRequest, GetEndpointsResponse,
        },
        subscription::{
            CreateMonitoredItemsRequest, CreateMonitoredItemsResponse, CreateSubscriptionRequest,
            CreateSubscriptionResponse, DeleteMonitoredItemsRequest, DeleteMonitoredItemsResponse,
            DeleteSubscriptionsRequest, DeleteSubscriptionsResponse, NotificationMessage, PublishRequest,
        },
        view::{
            AddNodesRequest, AddNodesResponse, BrowseRequest, BrowseResponse,
            TranslateBrowsePathsToNodeIdsRequest, TranslateBrowsePathsToNodeIdsResponse,
        },
    },
    wire::{
        codec::{Decode, Decoder, Encode, Encoder},
        node_id::NodeId,
        status_code::StatusCode,
    },
};

/// Everything the dispatcher needs out of a decoded `SecureMessage` body
/// before routing: the type-id NodeId and the still-undecoded remainder.
pub struct DecodedRequest<'a> {
    pub type_id: NodeId,
    pub body: Decoder<'a>,
}

impl<'a> DecodedRequest<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        let mut body = Decoder::new(buf);
        let type_id = NodeId::decode(&mut body)?;
        Ok(DecodedRequest { type_id, body })
    }
}

/// The result of dispatching one request: the encoded reply body (already
/// prefixed with its response type-id) plus the `request_id`/`request_handle`
/// the caller stamps into the transport framing. `new_subscription_rx` is set
/// only by `CreateSubscription`: the processor is the one that owns the
/// receiving half and drains it into `forward_publish_response` (spec.md §9
/// Design Notes, "Callbacks vs. channels").
pub struct DispatchResult {
    pub request_handle: u32,
    pub body: bytes::Bytes,
    pub new_subscription_rx: Option<(u32, tokio::sync::mpsc::Receiver<NotificationMessage>)>,
}

fn plain(request_handle: u32, body: bytes::Bytes) -> DispatchResult {
    DispatchResult { request_handle, body, new_subscription_rx: None }
}

/// The future a `publish_sink` call returns. Boxed so the sink can be a
/// plain `FnMut` closure over an async enqueue (the processor needs to hold
/// `self.state`'s lock across the `.await`, which a sync closure can't do).
pub type PublishSinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), crate::error::ProcessorError>> + Send + 'a>>;

/// Prefixes `body`'s encoding with its `*_Encoding_DefaultBinary` type id
/// (OPC UA Part 6 §5.2.2.1).
fn encode_typed(type_id: NodeId, body: &impl Encode) -> bytes::Bytes {
    let mut enc = Encoder::new();
    type_id.encode(&mut enc);
    body.encode(&mut enc);
    enc.into_bytes()
}

/// Routes one decoded `SecureMessage` body to its handler (spec.md §4.4's
/// dispatch table) and returns the encoded reply. `session` is `None` until
/// `CreateSession` succeeds; every session-scoped service before that point
/// answers `BadSessionIdInvalid` rather than panicking (spec.md §8 testable
/// property 5).
pub async fn dispatch(
    req: DecodedRequest<'_>,
    internal_server: &dyn InternalServer,
    session: &mut Option<Box<dyn SessionFacade>>,
    publish_sink: &mut dyn FnMut(crate::publish::PublishRequestSlot) -> PublishSinkFuture<'static>,
) -> Result<DispatchResult> {
    let DecodedRequest { type_id, mut body } = req;

    let Some(service_id) = ServiceId::from_node_id(type_id) else {
        // RequestHeader is still the first field of every unknown request
        // body, so we can recover `request_handle` for the fault even
        // though we don't know the rest of the shape.
        let request_handle = RequestHeader::decode(&mut body)
            .map(|h| h.request_handle)
            .unwrap_or(0);
        warn!("unrecognised service type id {:?}", type_id);
        let fault =
            ServiceFault { response_header: ResponseHeader::fault(request_handle, StatusCode::BAD_NOT_IMPLEMENTED) };
        return Ok(plain(
            request_handle,
            encode_typed(NodeId::new(0, crate::services::ids::object_ids::SERVICE_FAULT), &fault),
        ));
    };

    match service_id {
        ServiceId::CreateSession => {
            let request = CreateSessionRequest::decode(&mut body).context("decode CreateSessionRequest")?;
            let request_handle = request.request_header.request_handle;
            let name = request
                .session_name
                .clone()
                .unwrap_or_else(|| "anonymous-session".to_string());
            let new_session = internal_server.create_session(&name).await?;
            let created = new_session
                .create_session(request.client_nonce, request.requested_session_timeout)
                .await?;
            *session = Some(new_session);
            let response = CreateSessionResponse {
                response_header: ResponseHeader::for_request(request_handle),
                session_id: created.session_id,
                authentication_token: created.authentication_token,
                revised_session_timeout: created.revised_session_timeout,
                server_nonce: crate::utils::generate_server_nonce(32),
                server_certificate: None,
                max_request_message_size: 1 << 20,
            };
            Ok(plain(request_handle, encode_typed(service_id.response_node_id(), &response)))
        },
        ServiceId::ActivateSession => {
            let request = ActivateSessionRequest::decode(&mut body).context("decode ActivateSessionRequest")?;
            let request_handle = request.request_header.request_handle;
            let Some(s) = session.as_ref() else {
                return Ok(session_fault(request_handle, StatusCode::BAD_SESSION_ID_INVALID));
            };
            let server_nonce = s.activate_session(request.locale_ids).await?;
            let response = ActivateSessionResponse {
                response_header: ResponseHeader::for_request(request_handle),
                server_nonce,
            };
            Ok(plain(request_handle, encode_typed(service_id.response_node_id(), &response)))
        },
        ServiceId::CloseSession => {
            let request = CloseSessionRequest::decode(&mut body).context("decode CloseSessionRequest")?;
            let request_handle = request.request_header.request_handle;
            if let Some(s) = session.take() {
                s.close_session(request.delete_subscriptions).await?;
            }
            let response = CloseSessionResponse { response_header: ResponseHeader::for_request(request_handle) };
            Ok(plain(request_handle, encode_typed(service_id.response_node_id(), &response)))
        },
        ServiceId::Read => {
            let request = ReadRequest::decode(&mut body).context("decode ReadRequest")?;
            let request_handle = request.request_header.request_handle;
            let Some(s) = session.as_ref() else {
                return Ok(session_fault(request_handle, StatusCode::BAD_SESSION_ID_INVALID));
            };
            let results = s.read(request.nodes_to_read).await?;
            let response = ReadResponse { response_header: ResponseHeader::for_request(request_handle), results };
            Ok(plain(request_handle, encode_typed(service_id.response_node_id(), &response)))
        },
        ServiceId::Write => {
            let request = WriteRequest::decode(&mut body).context("decode WriteRequest")?;
            let request_handle = request.request_header.request_handle;
            let Some(s) = session.as_ref() else {
                return Ok(session_fault(request_handle, StatusCode::BAD_SESSION_ID_INVALID));
            };
            let results = s.write(request.nodes_to_write).await?;
            let response = WriteResponse { response_header: ResponseHeader::for_request(request_handle), results };
            Ok(plain(request_handle, encode_typed(service_id.response_node_id(), &response)))
        },
        ServiceId::Browse => {
            let request = BrowseRequest::decode(&mut body).context("decode BrowseRequest")?;
            let request_handle = request.request_header.request_handle;
            let Some(s) = session.as_ref() else {
                return Ok(session_fault(request_handle, StatusCode::BAD_SESSION_ID_INVALID));
            };
            let results = s.browse(request.nodes_to_browse).await?;
            let response = BrowseResponse { response_header: ResponseHeader::for_request(request_handle), results };
            Ok(plain(request_handle, encode_typed(service_id.response_node_id(), &response)))
        },
        ServiceId::TranslateBrowsePathsToNodeIds => {
            let request = TranslateBrowsePathsToNodeIdsRequest::decode(&mut body)
                .context("decode TranslateBrowsePathsToNodeIdsRequest")?;
            let request_handle = request.request_header.request_handle;
            let Some(s) = session.as_ref() else {
                return Ok(session_fault(request_handle, StatusCode::BAD_SESSION_ID_INVALID));
            };
            let results = s.translate_browsepaths_to_nodeids(request.browse_paths).await?;
            let response = TranslateBrowsePathsToNodeIdsResponse {
                response_header: ResponseHeader::for_request(request_handle),
                results,
            };
            Ok(plain(request_handle, encode_typed(service_id.response_node_id(), &response)))
        },
        ServiceId::AddNodes => {
            let request = AddNodesRequest::decode(&mut body).context("decode AddNodesRequest")?;
            let request_handle = request.request_header.request_handle;
            let Some(s) = session.as_ref() else {
                return Ok(session_fault(request_handle, StatusCode::BAD_SESSION_ID_INVALID));
            };
            let results = s.add_nodes(request.nodes_to_add).await?;
            let response =
                AddNodesResponse { response_header: ResponseHeader::for_request(request_handle), results };
            Ok(plain(request_handle, encode_typed(service_id.response_node_id(), &response)))
        },
        ServiceId::GetEndpoints => {
            let request = GetEndpointsRequest::decode(&mut body).context("decode GetEndpointsRequest")?;
            let request_handle = request.request_header.request_handle;
            let endpoints = internal_server.get_endpoints(request.endpoint_url.as_deref()).await?;
            let response =
                GetEndpointsResponse { response_header: ResponseHeader::for_request(request_handle), endpoints };
            Ok(plain(request_handle, encode_typed(service_id.response_node_id(), &response)))
        },
        ServiceId::CreateSubscription => {
            let request =
                CreateSubscriptionRequest::decode(&mut body).context("decode CreateSubscriptionRequest")?;
            let request_handle = request.request_header.request_handle;
            let Some(s) = session.as_ref() else {
                return Ok(session_fault(request_handle, StatusCode::BAD_SESSION_ID_INVALID));
            };
            // The notification channel is wired up by the processor, which
            // owns the receiving end and drains it into
            // `forward_publish_response`; the dispatcher only forwards the
            // subscription parameters.
            let (tx, rx) = tokio::sync::mpsc::channel::<NotificationMessage>(64);
            let created = s
                .create_subscription(
                    request.requested_publishing_interval,
                    request.requested_lifetime_count,
                    request.requested_max_keep_alive_count,
                    tx,
                )
                .await?;
            let response = CreateSubscriptionResponse {
                response_header: ResponseHeader::for_request(request_handle),
                subscription_id: created.subscription_id,
                revised_publishing_interval: created.revised_publishing_interval,
                revised_lifetime_count: created.revised_lifetime_count,
                revised_max_keep_alive_count: created.revised_max_keep_alive_count,
            };
            Ok(DispatchResult {
                request_handle,
                body: encode_typed(service_id.response_node_id(), &response),
                new_subscription_rx: Some((created.subscription_id, rx)),
            })
        },
        ServiceId::DeleteSubscriptions => {
            let request =
                DeleteSubscriptionsRequest::decode(&mut body).context("decode DeleteSubscriptionsRequest")?;
            let request_handle = request.request_header.request_handle;
            let Some(s) = session.as_ref() else {
                return Ok(session_fault(request_handle, StatusCode::BAD_SESSION_ID_INVALID));
            };
            let results = s.delete_subscriptions(request.subscription_ids).await?;
            let response = DeleteSubscriptionsResponse {
                response_header: ResponseHeader::for_request(request_handle),
                results,
            };
            Ok(plain(request_handle, encode_typed(service_id.response_node_id(), &response)))
        },
        ServiceId::CreateMonitoredItems => {
            let request =
                CreateMonitoredItemsRequest::decode(&mut body).context("decode CreateMonitoredItemsRequest")?;
            let request_handle = request.request_header.request_handle;
            let Some(s) = session.as_ref() else {
                return Ok(session_fault(request_handle, StatusCode::BAD_SESSION_ID_INVALID));
            };
            let results = s
                .create_monitored_items(request.subscription_id, request.items_to_create)
                .await?;
            let response = CreateMonitoredItemsResponse {
                response_header: ResponseHeader::for_request(request_handle),
                results,
            };
            Ok(plain(request_handle, encode_typed(service_id.response_node_id(), &response)))
        },
        ServiceId::DeleteMonitoredItems => {
            let request =
                DeleteMonitoredItemsRequest::decode(&mut body).context("decode DeleteMonitoredItemsRequest")?;
            let request_handle = request.request_header.request_handle;
            let Some(s) = session.as_ref() else {
                return Ok(session_fault(request_handle, StatusCode::BAD_SESSION_ID_INVALID));
            };
            let results = s
                .delete_monitored_items(request.subscription_id, request.monitored_item_ids)
                .await?;
            let response = DeleteMonitoredItemsResponse {
                response_header: ResponseHeader::for_request(request_handle),
                results,
            };
            Ok(plain(request_handle, encode_typed(service_id.response_node_id(), &response)))
        },
        ServiceId::PublishRequest => {
            let request = PublishRequest::decode(&mut body).context("decode PublishRequest")?;
            let request_handle = request.request_header.request_handle;
            let Some(s) = session.as_ref() else {
                return Ok(session_fault(request_handle, StatusCode::BAD_SESSION_ID_INVALID));
            };
            publish_sink(crate::publish::PublishRequestSlot {
                request_header: request.request_header.clone(),
                request_id: 0,
                sequence_number: 0,
            })
            .await?;
            s.publish(request.subscription_acknowledgements).await?;
            // No reply now (spec.md §4.4): the processor answers this later
            // through `forward_publish_response`.
            Ok(plain(request_handle, bytes::Bytes::new()))
        },
    }
}

fn session_fault(request_handle: u32, status: StatusCode) -> DispatchResult {
    let fault = ServiceFault { response_header: ResponseHeader::fault(request_handle, status) };
    plain(
        request_handle,
        encode_typed(NodeId::new(0, crate::services::ids::object_ids::SERVICE_FAULT), &fault),
    )
}
