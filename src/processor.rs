// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The Processor Loop (spec.md §4.5): orchestrates Phase H (Hello), Phase O
//! (SecureOpen), and Phase S (steady-state service dispatch) over one
//! accepted connection, and owns the per-subscription tasks that drain
//! notifications into `forward_publish_response` (spec.md §4.4).

use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf},
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    cfg::config::ProcessorConfig,
    connection::{ConnectionState, encode_error_body},
    dispatcher::{self, DecodedRequest},
    error::ProcessorError,
    facade::{InternalServer, SessionFacade},
    publish::PublishRequestSlot,
    services::{
        common::{ResponseHeader, ServiceFault},
        ids::object_ids,
        secure_channel::{OpenSecureChannelRequest, OpenSecureChannelResponse},
        subscription::{NotificationMessage, PublishResponse},
    },
    transport::frame::FrameReader,
    wire::{
        algo_header::{AsymmetricAlgorithmHeader, SymmetricAlgorithmHeader},
        codec::{Decode, Decoder, Encode, Encoder},
        header::MessageType,
        hello::{AcknowledgeMessage, HelloMessage},
        node_id::NodeId,
        sequence_header::SequenceHeader,
        status_code::StatusCode,
    },
};

/// Drives a single accepted connection through the full Hello →
/// SecureOpen → steady-state lifecycle (spec.md §4.5). Generic over the
/// stream type so tests can drive it over `tokio::io::duplex` the same way
/// the teacher's client tests drive `DuplexStream` (`transport::frame`'s
/// inline tests).
pub struct Processor<T> {
    reader: FrameReader<ReadHalf<T>>,
    state: Arc<Mutex<ConnectionState<WriteHalf<T>>>>,
    internal_server: Arc<dyn InternalServer>,
    session: Option<Box<dyn SessionFacade>>,
    cancel: CancellationToken,
    connection_name: String,
    config: ProcessorConfig,
    notification_tasks: Vec<JoinHandle<()>>,
}

impl<T> Processor<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Construction per spec.md §6: `(internal_server, stream,
    /// connection_name)`, plus the ambient `ProcessorConfig` this crate adds
    /// for buffer/timeout/queue policy (SPEC_FULL.md §AMBIENT/A.3).
    pub fn new(
        internal_server: Arc<dyn InternalServer>,
        stream: T,
        connection_name: impl Into<String>,
        config: ProcessorConfig,
    ) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let reader = FrameReader::new(read_half, config.buffers.max_receive_buffer_size);
        let state = Arc::new(Mutex::new(ConnectionState::new(
            write_half,
            config.channel.min_server_nonce_length,
            config.publish.max_queued_publish_requests,
        )));
        Processor {
            reader,
            state,
            internal_server,
            session: None,
            cancel: CancellationToken::new(),
            connection_name: connection_name.into(),
            config,
            notification_tasks: Vec::new(),
        }
    }

    /// A token the accept-loop owner can cancel to tear this connection down
    /// from the outside (e.g. on server shutdown).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Entry point: blocks until the connection terminates (spec.md §6
    /// "Processor boundary"). Always relinquishes the session binding and
    /// stops the notification forwarders on the way out (spec.md §4.5).
    pub async fn run(mut self) -> Result<(), ProcessorError> {
        let outcome = self.run_inner().await;
        self.shutdown().await;
        outcome
    }

    async fn run_inner(&mut self) -> Result<(), ProcessorError> {
        self.phase_hello().await?;
        loop {
            let frame = self
                .reader
                .read_frame(self.config.io.io_timeout, &self.cancel)
                .await?;
            match frame.header.message_type {
                MessageType::SecureOpen => {
                    self.phase_open(frame.header.channel_id, &frame.body).await?;
                },
                MessageType::SecureMessage => {
                    self.phase_steady(frame.header.channel_id, &frame.body).await?;
                },
                MessageType::SecureClose => {
                    self.phase_close(frame.header.channel_id, &frame.body).await?;
                    return Ok(());
                },
                MessageType::Error => {
                    warn!(connection = %self.connection_name, "peer sent an Error frame, closing");
                    return Ok(());
                },
                other => {
                    return Err(ProcessorError::BadHeader(format!(
                        "unexpected {other:?} after the handshake"
                    )));
                },
            }
        }
    }

    /// Phase H (spec.md §4.4): the first frame must be `Hello`, answered
    /// with an `Acknowledge` that echoes the buffer sizes, clamped to the
    /// configured maxima (spec.md §9 Open Question (c)).
    async fn phase_hello(&mut self) -> Result<(), ProcessorError> {
        let frame = self
            .reader
            .read_frame(self.config.io.io_timeout, &self.cancel)
            .await?;

        if frame.header.message_type != MessageType::Hello {
            let body = encode_error_body(StatusCode::BAD_TCP_MESSAGE_TYPE_INVALID);
            let mut state = self.state.lock().await;
            let _ = state
                .send_base_frame(MessageType::Error, &body, self.config.io.io_timeout, &self.cancel)
                .await;
            return Err(ProcessorError::NotHello);
        }

        let mut dec = Decoder::new(&frame.body);
        let hello = HelloMessage::decode(&mut dec).map_err(ProcessorError::Decode)?;
        let ack = AcknowledgeMessage::echoing(
            &hello,
            self.config.buffers.max_receive_buffer_size,
            self.config.buffers.max_send_buffer_size,
        );
        let mut enc = Encoder::new();
        ack.encode(&mut enc);
        let body = enc.into_bytes();

        let mut state = self.state.lock().await;
        state
            .send_base_frame(MessageType::Acknowledge, &body, self.config.io.io_timeout, &self.cancel)
            .await
    }

    /// Phase O (spec.md §4.4): routes `SecureOpen` to the Channel Manager
    /// and replies with the echoed asymmetric header plus
    /// `OpenSecureChannelResponse`.
    async fn phase_open(&mut self, channel_id: Option<u32>, body: &[u8]) -> Result<(), ProcessorError> {
        let mut dec = Decoder::new(body);
        let algo_header =
            AsymmetricAlgorithmHeader::decode(&mut dec).map_err(ProcessorError::Decode)?;
        let sequence_header = SequenceHeader::decode(&mut dec).map_err(ProcessorError::Decode)?;
        let request = OpenSecureChannelRequest::decode(&mut dec).map_err(ProcessorError::Decode)?;
        let request_handle = request.request_header.request_handle;

        let mut state = self.state.lock().await;
        if let Some(incoming_channel_id) = channel_id {
            if let Some(current) = state.channel.current() {
                if current.channel_id != incoming_channel_id {
                    return Err(ProcessorError::ChannelMismatch);
                }
            }
        }

        let internal_server = Arc::clone(&self.internal_server);
        let record = state
            .channel
            .handle_open(request.request_type, request.requested_lifetime_ms, || {
                internal_server.get_new_channel_id()
            })?
            .clone();

        let response = OpenSecureChannelResponse::from_record(request_handle, &record);
        let mut enc = Encoder::new();
        response.encode(&mut enc);
        let body = enc.into_bytes();

        state
            .send_secure_open(
                sequence_header.request_id,
                algo_header,
                &body,
                self.config.io.io_timeout,
                &self.cancel,
            )
            .await
    }

    /// Phase S (spec.md §4.4): decodes the symmetric header/sequence header,
    /// then hands the rest of the body to the service dispatcher. A
    /// malformed header is a framing error and ends the connection; a
    /// failure inside the dispatcher (unknown service, bad session, a
    /// malformed request body) is a service error and gets a `ServiceFault`
    /// reply instead (spec.md §7).
    async fn phase_steady(&mut self, channel_id: Option<u32>, body: &[u8]) -> Result<(), ProcessorError> {
        if let Some(incoming) = channel_id {
            self.state.lock().await.channel.verify_channel_id(incoming)?;
        }

        let mut dec = Decoder::new(body);
        let _symmetric_header =
            SymmetricAlgorithmHeader::decode(&mut dec).map_err(|e| ProcessorError::BadHeader(e.to_string()))?;
        let sequence_header =
            SequenceHeader::decode(&mut dec).map_err(|e| ProcessorError::BadHeader(e.to_string()))?;
        let rest = &body[dec.position()..];
        let decoded = DecodedRequest::parse(rest).map_err(|e| ProcessorError::BadHeader(e.to_string()))?;
        let request_id = sequence_header.request_id;

        let publish_state = Arc::clone(&self.state);
        let mut publish_sink = move |mut slot: PublishRequestSlot| -> dispatcher::PublishSinkFuture<'static> {
            slot.request_id = request_id;
            let publish_state = Arc::clone(&publish_state);
            Box::pin(async move { publish_state.lock().await.publish_queue.enqueue(slot) })
        };

        match dispatcher::dispatch(decoded, self.internal_server.as_ref(), &mut self.session, &mut publish_sink)
            .await
        {
            Ok(result) => {
                if let Some((subscription_id, rx)) = result.new_subscription_rx {
                    self.spawn_notification_forwarder(subscription_id, rx);
                }
                if result.body.is_empty() {
                    // PublishRequest: no immediate reply (spec.md §4.4).
                    return Ok(());
                }
                let mut state = self.state.lock().await;
                state
                    .send_secure_message(request_id, &result.body, self.config.io.io_timeout, &self.cancel)
                    .await
            },
            Err(err) => {
                warn!(
                    connection = %self.connection_name,
                    error = %err,
                    "service dispatch failed, replying with a fault"
                );
                // `dispatch` returns `anyhow::Error`; recover the typed cause when the
                // failure originated in this crate. A fatal cause (transport/framing,
                // not a service-layer problem) ends the connection instead of being
                // reported as a `ServiceFault` (spec.md §7).
                let status = match err.downcast::<ProcessorError>() {
                    Ok(typed) if typed.is_fatal() => return Err(typed),
                    Ok(typed) => typed.as_status_code(),
                    Err(_) => StatusCode::BAD_DECODING_ERROR,
                };
                let fault = ServiceFault { response_header: ResponseHeader::fault(request_id, status) };
                let mut enc = Encoder::new();
                NodeId::new(0, object_ids::SERVICE_FAULT).encode(&mut enc);
                fault.encode(&mut enc);
                let body = enc.into_bytes();
                let mut state = self.state.lock().await;
                state
                    .send_secure_message(request_id, &body, self.config.io.io_timeout, &self.cancel)
                    .await
            },
        }
    }

    /// `SecureClose` (spec.md §4.3): a channel id mismatch neither mutates
    /// state nor sends a reply (spec.md §8 testable property 6); a match
    /// drops the channel record and the caller terminates the loop.
    async fn phase_close(&mut self, channel_id: Option<u32>, body: &[u8]) -> Result<(), ProcessorError> {
        let mut dec = Decoder::new(body);
        let _symmetric_header =
            SymmetricAlgorithmHeader::decode(&mut dec).map_err(|e| ProcessorError::BadHeader(e.to_string()))?;
        let _sequence_header =
            SequenceHeader::decode(&mut dec).map_err(|e| ProcessorError::BadHeader(e.to_string()))?;

        let Some(incoming) = channel_id else {
            return Err(ProcessorError::ChannelMismatch);
        };
        let mut state = self.state.lock().await;
        state.channel.verify_channel_id(incoming)?;
        state.channel.close();
        info!(connection = %self.connection_name, "secure channel closed");
        Ok(())
    }

    /// Spawns the task that drains one subscription's notification channel
    /// into `forward_publish_response` (spec.md §9 "Callbacks vs. channels":
    /// delivery via a channel the processor owns, not a direct callback).
    fn spawn_notification_forwarder(
        &mut self,
        subscription_id: u32,
        mut rx: mpsc::Receiver<NotificationMessage>,
    ) {
        let state = Arc::clone(&self.state);
        let cancel = self.cancel.clone();
        let io_timeout = self.config.io.io_timeout;
        let connection_name = self.connection_name.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    maybe_message = rx.recv() => {
                        let Some(message) = maybe_message else { break };
                        forward_publish_response(
                            &state,
                            subscription_id,
                            message,
                            io_timeout,
                            &cancel,
                            &connection_name,
                        )
                        .await;
                    }
                }
            }
        });
        self.notification_tasks.push(handle);
    }

    /// Relinquishes the session binding and stops every notification
    /// forwarder so late callbacks become no-ops (spec.md §4.5, §5
    /// "Cancellation").
    async fn shutdown(&mut self) {
        self.cancel.cancel();
        for handle in self.notification_tasks.drain(..) {
            handle.abort();
        }
        self.state.lock().await.mark_closed();
        if let Some(session) = self.session.take() {
            if let Err(err) = session.close_session(false).await {
                warn!(connection = %self.connection_name, error = %err, "error relinquishing session on disconnect");
            }
        }
    }
}

/// Pops the oldest outstanding publish slot and answers it with `message`
/// (spec.md §4.4 "Publish fan-out callback"). An empty queue is logged and
/// dropped, never an error (spec.md §7 "Callback-on-empty-queue").
async fn forward_publish_response<W: AsyncWrite + Unpin>(
    state: &Arc<Mutex<ConnectionState<W>>>,
    subscription_id: u32,
    message: NotificationMessage,
    io_timeout: Duration,
    cancel: &CancellationToken,
    connection_name: &str,
) {
    let mut guard = state.lock().await;
    let Some(slot) = guard.publish_queue.dequeue() else {
        warn!(connection = %connection_name, "publish callback fired with an empty queue, dropping notification");
        return;
    };

    let response = PublishResponse {
        response_header: ResponseHeader::for_request(slot.request_header.request_handle),
        subscription_id,
        available_sequence_numbers: vec![message.sequence_number as i32],
        more_notifications: false,
        notification_message: message,
        results: Vec::new(),
    };
    let mut enc = Encoder::new();
    NodeId::new(0, object_ids::PUBLISH_RESPONSE).encode(&mut enc);
    response.encode(&mut enc);
    let body = enc.into_bytes();

    if let Err(err) = guard.send_secure_message(slot.request_id, &body, io_timeout, cancel).await {
        warn!(connection = %connection_name, error = %err, "failed to deliver publish response");
    }
}
