// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Demo binary: accepts OPC UA TCP connections and drives each through
//! [`Processor`] against an in-memory facade. Useful for exercising the
//! handshake/channel/service-dispatch lifecycle against a real client
//! (e.g. a UaExpert-style test tool) without a full node-management backend
//! behind it.

use std::{
    sync::Arc,
    sync::atomic::{AtomicU32, Ordering},
};

use anyhow::Result;
use opcua_processor_rs::{
    cfg::config::ProcessorConfig,
    facade::{
        BoxFuture, InternalServer, ReadResult, SessionCreated, SessionFacade, SubscriptionCreated,
        WriteResult,
    },
    processor::Processor,
    services::{
        attributes::{ReadValueId, WriteValue},
        session::EndpointDescription,
        subscription::{
            MonitoredItemCreateRequest, MonitoredItemCreateResult, NotificationMessage,
            SubscriptionAcknowledgement,
        },
        view::{AddNodesItem, AddNodesResult, BrowseDescription, BrowseResult, BrowsePath, BrowsePathResult},
    },
    wire::{node_id::NodeId, status_code::StatusCode},
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// A channel-id/node-id allocator with nothing else behind it: no address
/// space, no real endpoint catalogue. Exercises the handshake and dispatch
/// plumbing end to end without a node-management backend.
struct DemoInternalServer {
    next_channel_id: AtomicU32,
}

impl InternalServer for DemoInternalServer {
    fn create_session(&self, _name: &str) -> BoxFuture<'_, Box<dyn SessionFacade>> {
        Box::pin(async move { Ok(Box::new(DemoSessionFacade) as Box<dyn SessionFacade>) })
    }

    fn get_new_channel_id(&self) -> u32 {
        self.next_channel_id.fetch_add(1, Ordering::Relaxed)
    }

    fn get_endpoints(&self, _endpoint_url: Option<&str>) -> BoxFuture<'_, Vec<EndpointDescription>> {
        Box::pin(async move { Ok(Vec::new()) })
    }
}

/// A session facade with no address space behind it: reads and browses
/// answer empty, writes report `Good`, and subscriptions never produce a
/// notification (the demo has nothing to publish).
struct DemoSessionFacade;

impl SessionFacade for DemoSessionFacade {
    fn create_session(
        &self,
        _client_nonce: Option<Vec<u8>>,
        requested_session_timeout: f64,
    ) -> BoxFuture<'_, SessionCreated> {
        Box::pin(async move {
            Ok(SessionCreated {
                session_id: NodeId::new(1, 1),
                authentication_token: NodeId::new(1, 2),
                revised_session_timeout: requested_session_timeout,
            })
        })
    }

    fn activate_session(&self, _locale_ids: Vec<String>) -> BoxFuture<'_, Vec<u8>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn close_session(&self, _delete_subscriptions: bool) -> BoxFuture<'_, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn read(&self, nodes_to_read: Vec<ReadValueId>) -> BoxFuture<'_, Vec<ReadResult>> {
        Box::pin(async move {
            Ok(nodes_to_read
                .iter()
                .map(|_| ReadResult { status: StatusCode::GOOD, value: None })
                .collect())
        })
    }

    fn write(&self, nodes_to_write: Vec<WriteValue>) -> BoxFuture<'_, Vec<WriteResult>> {
        Box::pin(async move { Ok(nodes_to_write.iter().map(|_| StatusCode::GOOD).collect()) })
    }

    fn browse(&self, _nodes_to_browse: Vec<BrowseDescription>) -> BoxFuture<'_, Vec<BrowseResult>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn translate_browsepaths_to_nodeids(
        &self,
        _browse_paths: Vec<BrowsePath>,
    ) -> BoxFuture<'_, Vec<BrowsePathResult>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn add_nodes(&self, _nodes_to_add: Vec<AddNodesItem>) -> BoxFuture<'_, Vec<AddNodesResult>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn create_subscription(
        &self,
        requested_publishing_interval: f64,
        requested_lifetime_count: u32,
        requested_max_keep_alive_count: u32,
        _publish_notifications: tokio::sync::mpsc::Sender<NotificationMessage>,
    ) -> BoxFuture<'_, SubscriptionCreated> {
        Box::pin(async move {
            Ok(SubscriptionCreated {
                subscription_id: 1,
                revised_publishing_interval: requested_publishing_interval,
                revised_lifetime_count: requested_lifetime_count,
                revised_max_keep_alive_count: requested_max_keep_alive_count,
            })
        })
    }

    fn delete_subscriptions(&self, subscription_ids: Vec<i32>) -> BoxFuture<'_, Vec<StatusCode>> {
        Box::pin(async move { Ok(subscription_ids.iter().map(|_| StatusCode::GOOD).collect()) })
    }

    fn create_monitored_items(
        &self,
        _subscription_id: u32,
        items: Vec<MonitoredItemCreateRequest>,
    ) -> BoxFuture<'_, Vec<MonitoredItemCreateResult>> {
        Box::pin(async move {
            Ok(items
                .iter()
                .enumerate()
                .map(|(i, item)| MonitoredItemCreateResult {
                    status: StatusCode::GOOD,
                    monitored_item_id: i as u32 + 1,
                    revised_sampling_interval: item.sampling_interval,
                    revised_queue_size: item.queue_size,
                })
                .collect())
        })
    }

    fn delete_monitored_items(
        &self,
        _subscription_id: u32,
        monitored_item_ids: Vec<i32>,
    ) -> BoxFuture<'_, Vec<StatusCode>> {
        Box::pin(async move { Ok(monitored_item_ids.iter().map(|_| StatusCode::GOOD).collect()) })
    }

    fn publish(&self, _acks: Vec<SubscriptionAcknowledgement>) -> BoxFuture<'_, ()> {
        Box::pin(async move { Ok(()) })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ProcessorConfig::default();
    let internal_server: Arc<dyn InternalServer> =
        Arc::new(DemoInternalServer { next_channel_id: AtomicU32::new(1) });

    let listener = TcpListener::bind("127.0.0.1:4840").await?;
    info!("opcua-processor-demo listening on 127.0.0.1:4840");

    loop {
        let (stream, peer) = listener.accept().await?;
        let internal_server = Arc::clone(&internal_server);
        let config = config.clone();
        tokio::spawn(async move {
            let processor = Processor::new(internal_server, stream, peer.to_string(), config);
            if let Err(err) = processor.run().await {
                info!(connection = %peer, error = %err, "connection ended");
            }
        });
    }
}
