// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared test harness for the scenario tests in `tests/processor_scenarios.rs`
//! (spec.md §8's S1-S6). Drives a [`Processor`] over a `tokio::io::duplex`
//! pair the same way the library's own inline tests drive `FrameReader`/
//! `FrameWriter` (`transport::frame`'s `round_trips_a_hello_frame`), except
//! the client side is hand-encoded wire bytes rather than the server's own
//! typed structs, since those are one-directional (`Decode` only on the
//! server's inbound types, `Encode` only on its outbound ones).

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

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
    transport::frame::{FrameReader, FrameWriter, RawFrame, build_frame},
    wire::{
        codec::{Decode, Decoder, Encode, Encoder},
        header::{ChunkType, Header, MessageType},
        node_id::NodeId,
        status_code::StatusCode,
    },
};
use tokio::{
    io::{DuplexStream, ReadHalf, WriteHalf, split},
    sync::{Mutex, mpsc},
};
use tokio_util::sync::CancellationToken;

pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// The client half of a test connection: raw frame read/write, independent
/// of the server's own typed wire structs.
pub struct TestClient {
    reader: FrameReader<ReadHalf<DuplexStream>>,
    writer: FrameWriter<WriteHalf<DuplexStream>>,
    cancel: CancellationToken,
}

impl TestClient {
    pub async fn write_frame(&mut self, message_type: MessageType, channel_id: Option<u32>, body: &[u8]) {
        let header = Header::new(message_type, ChunkType::single(), channel_id);
        let (header, framed) = build_frame(header, body);
        self.writer
            .write_frame(&header, &framed, IO_TIMEOUT, &self.cancel)
            .await
            .expect("test client write failed");
    }

    pub async fn read_frame(&mut self) -> RawFrame {
        self.reader
            .read_frame(IO_TIMEOUT, &self.cancel)
            .await
            .expect("test client read failed")
    }
}

/// Spawns a [`Processor`] over a fresh in-memory duplex pair and returns the
/// client-side harness plus the internal server mock driving it, so tests
/// can reach into the mock (e.g. to fire notifications for S5).
pub fn spawn_processor(internal_server: Arc<MockInternalServer>) -> TestClient {
    let (client, server) = tokio::io::duplex(1 << 16);
    let config = ProcessorConfig::default();
    let processor = Processor::new(
        internal_server as Arc<dyn InternalServer>,
        server,
        "test-connection",
        config,
    );
    tokio::spawn(processor.run());

    let (read_half, write_half) = split(client);
    TestClient {
        reader: FrameReader::new(read_half, 1 << 20),
        writer: FrameWriter::new(write_half),
        cancel: CancellationToken::new(),
    }
}

/// Channel-id allocator backing every scenario's server side.
pub struct MockInternalServer {
    next_channel_id: AtomicU32,
    pub session: Arc<MockSessionFacade>,
}

impl MockInternalServer {
    pub fn new() -> Arc<Self> {
        Arc::new(MockInternalServer {
            next_channel_id: AtomicU32::new(100),
            session: MockSessionFacade::new(),
        })
    }
}

impl InternalServer for MockInternalServer {
    fn create_session(&self, _name: &str) -> BoxFuture<'_, Box<dyn SessionFacade>> {
        let session = Arc::clone(&self.session);
        Box::pin(async move { Ok(Box::new(ClonedSessionFacade(session)) as Box<dyn SessionFacade>) })
    }

    fn get_new_channel_id(&self) -> u32 {
        self.next_channel_id.fetch_add(1, Ordering::Relaxed)
    }

    fn get_endpoints(&self, _endpoint_url: Option<&str>) -> BoxFuture<'_, Vec<EndpointDescription>> {
        Box::pin(async move { Ok(Vec::new()) })
    }
}

/// A `Box<dyn SessionFacade>` wrapper around a shared `Arc<MockSessionFacade>`
/// so the test keeps its own handle to fire notifications (S5) after the
/// dispatcher takes ownership of the boxed session.
struct ClonedSessionFacade(Arc<MockSessionFacade>);

impl SessionFacade for ClonedSessionFacade {
    fn create_session(&self, n: Option<Vec<u8>>, t: f64) -> BoxFuture<'_, SessionCreated> {
        self.0.create_session(n, t)
    }
    fn activate_session(&self, l: Vec<String>) -> BoxFuture<'_, Vec<u8>> {
        self.0.activate_session(l)
    }
    fn close_session(&self, d: bool) -> BoxFuture<'_, ()> {
        self.0.close_session(d)
    }
    fn read(&self, n: Vec<ReadValueId>) -> BoxFuture<'_, Vec<ReadResult>> {
        self.0.read(n)
    }
    fn write(&self, n: Vec<WriteValue>) -> BoxFuture<'_, Vec<WriteResult>> {
        self.0.write(n)
    }
    fn browse(&self, n: Vec<BrowseDescription>) -> BoxFuture<'_, Vec<BrowseResult>> {
        self.0.browse(n)
    }
    fn translate_browsepaths_to_nodeids(&self, p: Vec<BrowsePath>) -> BoxFuture<'_, Vec<BrowsePathResult>> {
        self.0.translate_browsepaths_to_nodeids(p)
    }
    fn add_nodes(&self, n: Vec<AddNodesItem>) -> BoxFuture<'_, Vec<AddNodesResult>> {
        self.0.add_nodes(n)
    }
    fn create_subscription(
        &self,
        a: f64,
        b: u32,
        c: u32,
        tx: mpsc::Sender<NotificationMessage>,
    ) -> BoxFuture<'_, SubscriptionCreated> {
        self.0.create_subscription(a, b, c, tx)
    }
    fn delete_subscriptions(&self, ids: Vec<i32>) -> BoxFuture<'_, Vec<StatusCode>> {
        self.0.delete_subscriptions(ids)
    }
    fn create_monitored_items(
        &self,
        sid: u32,
        items: Vec<MonitoredItemCreateRequest>,
    ) -> BoxFuture<'_, Vec<MonitoredItemCreateResult>> {
        self.0.create_monitored_items(sid, items)
    }
    fn delete_monitored_items(&self, sid: u32, ids: Vec<i32>) -> BoxFuture<'_, Vec<StatusCode>> {
        self.0.delete_monitored_items(sid, ids)
    }
    fn publish(&self, acks: Vec<SubscriptionAcknowledgement>) -> BoxFuture<'_, ()> {
        self.0.publish(acks)
    }
}

/// A session with no address space behind it. `publish()` pops the front of
/// a preloaded notification queue and fires it down the channel stashed by
/// `create_subscription` — called only *after* the dispatcher has already
/// enqueued the matching `PublishRequestSlot`, so test notifications never
/// race the slot they are meant to answer (spec.md §5's FIFO pairing).
pub struct MockSessionFacade {
    sender: Mutex<Option<mpsc::Sender<NotificationMessage>>>,
    pending: Mutex<VecDeque<NotificationMessage>>,
}

impl MockSessionFacade {
    pub fn new() -> Arc<Self> {
        Arc::new(MockSessionFacade { sender: Mutex::new(None), pending: Mutex::new(VecDeque::new()) })
    }

    pub async fn queue_notification(&self, message: NotificationMessage) {
        self.pending.lock().await.push_back(message);
    }
}

impl SessionFacade for MockSessionFacade {
    fn create_session(&self, _n: Option<Vec<u8>>, timeout: f64) -> BoxFuture<'_, SessionCreated> {
        Box::pin(async move {
            Ok(SessionCreated {
                session_id: NodeId::new(1, 1),
                authentication_token: NodeId::new(1, 2),
                revised_session_timeout: timeout,
            })
        })
    }

    fn activate_session(&self, _l: Vec<String>) -> BoxFuture<'_, Vec<u8>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn close_session(&self, _d: bool) -> BoxFuture<'_, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn read(&self, n: Vec<ReadValueId>) -> BoxFuture<'_, Vec<ReadResult>> {
        Box::pin(async move { Ok(n.iter().map(|_| ReadResult { status: StatusCode::GOOD, value: None }).collect()) })
    }

    fn write(&self, n: Vec<WriteValue>) -> BoxFuture<'_, Vec<WriteResult>> {
        Box::pin(async move { Ok(n.iter().map(|_| StatusCode::GOOD).collect()) })
    }

    fn browse(&self, _n: Vec<BrowseDescription>) -> BoxFuture<'_, Vec<BrowseResult>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn translate_browsepaths_to_nodeids(&self, _p: Vec<BrowsePath>) -> BoxFuture<'_, Vec<BrowsePathResult>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn add_nodes(&self, _n: Vec<AddNodesItem>) -> BoxFuture<'_, Vec<AddNodesResult>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn create_subscription(
        &self,
        publishing_interval: f64,
        lifetime_count: u32,
        max_keep_alive_count: u32,
        tx: mpsc::Sender<NotificationMessage>,
    ) -> BoxFuture<'_, SubscriptionCreated> {
        Box::pin(async move {
            *self.sender.lock().await = Some(tx);
            Ok(SubscriptionCreated {
                subscription_id: 1,
                revised_publishing_interval: publishing_interval,
                revised_lifetime_count: lifetime_count,
                revised_max_keep_alive_count: max_keep_alive_count,
            })
        })
    }

    fn delete_subscriptions(&self, ids: Vec<i32>) -> BoxFuture<'_, Vec<StatusCode>> {
        Box::pin(async move { Ok(ids.iter().map(|_| StatusCode::GOOD).collect()) })
    }

    fn create_monitored_items(
        &self,
        _sid: u32,
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

    fn delete_monitored_items(&self, _sid: u32, ids: Vec<i32>) -> BoxFuture<'_, Vec<StatusCode>> {
        Box::pin(async move { Ok(ids.iter().map(|_| StatusCode::GOOD).collect()) })
    }

    fn publish(&self, _acks: Vec<SubscriptionAcknowledgement>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let next = self.pending.lock().await.pop_front();
            if let (Some(message), Some(sender)) = (next, self.sender.lock().await.as_ref()) {
                let _ = sender.send(message).await;
            }
            Ok(())
        })
    }
}

/// Writes a minimal `RequestHeader`-shaped prefix (spec.md §4.1's
/// `RequestHeader` decode order: see `services::common::RequestHeader`).
pub fn write_request_header(enc: &mut Encoder, request_handle: u32) {
    NodeId::new(0, 0).encode(enc);
    enc.write_i64(0); // timestamp
    enc.write_u32(request_handle);
    enc.write_u32(0); // return diagnostics
    enc.write_string(None); // audit entry id
    enc.write_u32(30_000); // timeout hint
    opcua_processor_rs::services::common::write_null_extension_object(enc);
}

/// Decodes a `ResponseHeader`-shaped prefix, returning `(request_handle,
/// service_result)` and leaving the cursor positioned at the first
/// service-specific field that follows (mirrors `ResponseHeader::encode`'s
/// field order exactly).
pub fn read_response_header(dec: &mut Decoder) -> (u32, StatusCode) {
    let _timestamp = dec.read_i64().unwrap();
    let request_handle = dec.read_u32().unwrap();
    let service_result = StatusCode(dec.read_u32().unwrap());
    let _diag_mask = dec.read_u8().unwrap();
    let string_table_len = dec.read_i32().unwrap().max(0);
    for _ in 0..string_table_len {
        let _ = dec.read_string().unwrap();
    }
    let _extension_type_id = NodeId::decode(dec).unwrap();
    let _encoding = dec.read_u8().unwrap();
    (request_handle, service_result)
}

/// Reads the leading response type-id `NodeId` off a `SecureMessage` body.
pub fn read_response_type_id(dec: &mut Decoder) -> NodeId {
    NodeId::decode(dec).unwrap()
}
