// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The two external collaborators spec.md §6 names: the internal server
//! facade (channel/endpoint/session-factory operations) and the per-session
//! facade (everything scoped to one authenticated session). Both are
//! out-of-scope collaborators per spec.md §1 — this module only defines the
//! boundary the dispatcher calls through.
//!
//! Methods return a boxed future rather than using `async fn` in the trait,
//! mirroring the teacher's own hand-written async-trait shape
//! (`state_machine/common.rs`'s `StateMachine::StepResult`) so the traits
//! stay object-safe: the processor stores a `Box<dyn SessionFacade>` per
//! connection, which `async fn` in traits cannot produce.

use std::pin::Pin;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::services::{
    attributes::{DataValue, ReadValueId, WriteValue},
    session::EndpointDescription,
    subscription::NotificationMessage,
    view::{AddNodesItem, AddNodesResult, BrowseDescription, BrowseResult, BrowsePath, BrowsePathResult},
};

/// A boxed, `Send` future — the return type every facade method uses in
/// place of `async fn` (see module docs).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// A single `Read`/`Write` attribute outcome, as returned by the facade
/// before the dispatcher wraps it in wire framing.
pub type ReadResult = DataValue;
pub type WriteResult = crate::wire::status_code::StatusCode;

/// Operations the dispatcher calls that are not scoped to any session
/// (spec.md §6 "Internal server facade").
pub trait InternalServer: Send + Sync {
    /// Creates a new session context and returns the facade that will
    /// handle every subsequent session-scoped call on this connection.
    fn create_session(&self, name: &str) -> BoxFuture<'_, Box<dyn SessionFacade>>;

    /// Allocates a fresh `channel_id` for a first `OpenSecureChannel{Issue}`
    /// (spec.md §4.3).
    fn get_new_channel_id(&self) -> u32;

    /// `GetEndpoints` (spec.md §4.4 dispatch table).
    fn get_endpoints(&self, endpoint_url: Option<&str>) -> BoxFuture<'_, Vec<EndpointDescription>>;
}

/// Per-session operations (spec.md §6 "Session facade"). One instance is
/// bound to a connection at `CreateSession` time and lives until
/// `CloseSession` or connection loss (spec.md §4.5).
pub trait SessionFacade: Send + Sync {
    fn create_session(
        &self,
        client_nonce: Option<Vec<u8>>,
        requested_session_timeout: f64,
    ) -> BoxFuture<'_, SessionCreated>;

    fn activate_session(&self, locale_ids: Vec<String>) -> BoxFuture<'_, Vec<u8>>;

    fn close_session(&self, delete_subscriptions: bool) -> BoxFuture<'_, ()>;

    fn read(&self, nodes_to_read: Vec<ReadValueId>) -> BoxFuture<'_, Vec<ReadResult>>;

    fn write(&self, nodes_to_write: Vec<WriteValue>) -> BoxFuture<'_, Vec<WriteResult>>;

    fn browse(&self, nodes_to_browse: Vec<BrowseDescription>) -> BoxFuture<'_, Vec<BrowseResult>>;

    fn translate_browsepaths_to_nodeids(
        &self,
        browse_paths: Vec<BrowsePath>,
    ) -> BoxFuture<'_, Vec<BrowsePathResult>>;

    fn add_nodes(&self, nodes_to_add: Vec<AddNodesItem>) -> BoxFuture<'_, Vec<AddNodesResult>>;

    /// `publish_notifications` is the channel end the session pushes ready
    /// `NotificationMessage`s into; the processor owns the other end and
    /// drains it into `forward_publish_response` (spec.md §9 Design Notes,
    /// "Callbacks vs. channels").
    fn create_subscription(
        &self,
        requested_publishing_interval: f64,
        requested_lifetime_count: u32,
        requested_max_keep_alive_count: u32,
        publish_notifications: mpsc::Sender<NotificationMessage>,
    ) -> BoxFuture<'_, SubscriptionCreated>;

    fn delete_subscriptions(
        &self,
        subscription_ids: Vec<i32>,
    ) -> BoxFuture<'_, Vec<crate::wire::status_code::StatusCode>>;

    fn create_monitored_items(
        &self,
        subscription_id: u32,
        items: Vec<crate::services::subscription::MonitoredItemCreateRequest>,
    ) -> BoxFuture<'_, Vec<crate::services::subscription::MonitoredItemCreateResult>>;

    fn delete_monitored_items(
        &self,
        subscription_id: u32,
        monitored_item_ids: Vec<i32>,
    ) -> BoxFuture<'_, Vec<crate::wire::status_code::StatusCode>>;

    /// `PublishRequest` forwards only the client's acknowledgements; the
    /// actual reply is produced later via the `publish_notifications`
    /// channel (spec.md §4.4 "Do NOT reply now").
    fn publish(
        &self,
        acks: Vec<crate::services::subscription::SubscriptionAcknowledgement>,
    ) -> BoxFuture<'_, ()>;
}

/// What `SessionFacade::create_session` hands back to the dispatcher.
#[derive(Debug, Clone)]
pub struct SessionCreated {
    pub session_id: crate::wire::node_id::NodeId,
    pub authentication_token: crate::wire::node_id::NodeId,
    pub revised_session_timeout: f64,
}

/// What `SessionFacade::create_subscription` hands back to the dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionCreated {
    pub subscription_id: u32,
    pub revised_publishing_interval: f64,
    pub revised_lifetime_count: u32,
    pub revised_max_keep_alive_count: u32,
}
