// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use crate::{
    channel::ChannelManager,
    error::ProcessorError,
    publish::PublishQueue,
    transport::frame::{FrameWriter, build_frame},
    wire::{
        algo_header::{AsymmetricAlgorithmHeader, SymmetricAlgorithmHeader},
        codec::{Encode, Encoder},
        header::{ChunkType, Header, MessageType},
        sequence_header::SequenceHeader,
    },
};

/// The single piece of shared mutable state a connection's processor owns:
/// the channel record, the outgoing sequence counter, the publish queue,
/// and the write half, all behind one mutex (spec.md §9 Design Notes,
/// "Shared mutable state" / §5 "send mutex guards stream writes + outgoing
/// sequence counter + current token id"). Acquiring this lock is the only
/// way to send a frame or observe channel/publish state consistently.
pub struct ConnectionState<W> {
    writer: FrameWriter<W>,
    send_counter: u32,
    pub channel: ChannelManager,
    pub publish_queue: PublishQueue,
    /// Set once the connection is tearing down; the send path becomes a
    /// silent no-op rather than writing to a half-closed stream (spec.md
    /// §5 "Cancellation").
    closed: bool,
}

impl<W: AsyncWrite + Unpin> ConnectionState<W> {
    pub fn new(writer: W, min_server_nonce_length: usize, max_queued_publish_requests: usize) -> Self {
        ConnectionState {
            writer: FrameWriter::new(writer),
            send_counter: 1,
            channel: ChannelManager::new(min_server_nonce_length),
            publish_queue: PublishQueue::new(max_queued_publish_requests),
            closed: false,
        }
    }

    pub fn mark_closed(&mut self) {
        self.closed = true;
    }

    /// Sends an `Acknowledge` or `Error` frame (Phase H — these never carry
    /// a channel id or sequence header).
    pub async fn send_base_frame(
        &mut self,
        message_type: MessageType,
        body: &[u8],
        io_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), ProcessorError> {
        if self.closed {
            return Ok(());
        }
        let header = Header::new(message_type, ChunkType::single(), None);
        let (header, body_bytes) = build_frame(header, body);
        self.writer.write_frame(&header, &body_bytes, io_timeout, cancel).await
    }

    /// Phase O reply: `SecureOpen` carrying the echoed `AsymmetricAlgorithmHeader`
    /// (with `token_id` stamped), a fresh `SequenceHeader`, and the response
    /// body (spec.md §4.4 Phase O).
    pub async fn send_secure_open(
        &mut self,
        request_id: u32,
        mut algo_header: AsymmetricAlgorithmHeader,
        body: &[u8],
        io_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), ProcessorError> {
        if self.closed {
            return Ok(());
        }
        let channel_id = self
            .channel
            .current()
            .map(|r| r.channel_id)
            .ok_or(ProcessorError::ChannelMismatch)?;
        algo_header.token_id = self.channel.current_token_id()?;
        let sequence_header = SequenceHeader { sequence_number: self.next_sequence_number(), request_id };

        let mut enc = Encoder::new();
        algo_header.encode(&mut enc);
        sequence_header.encode(&mut enc);
        enc.write_raw(body);
        let payload = enc.into_bytes();

        let header = Header::new(MessageType::SecureOpen, ChunkType::single(), Some(channel_id));
        let (header, framed) = build_frame(header, &payload);
        self.writer.write_frame(&header, &framed, io_timeout, cancel).await
    }

    /// Phase S reply: a `SecureMessage` carrying the `SymmetricAlgorithmHeader`
    /// (current `token_id`), a fresh `SequenceHeader`, and the response body
    /// (spec.md §4.4 "Response construction").
    pub async fn send_secure_message(
        &mut self,
        request_id: u32,
        body: &[u8],
        io_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), ProcessorError> {
        if self.closed {
            return Ok(());
        }
        let channel_id = self
            .channel
            .current()
            .map(|r| r.channel_id)
            .ok_or(ProcessorError::ChannelMismatch)?;
        let token_id = self.channel.current_token_id()?;
        let sequence_header = SequenceHeader { sequence_number: self.next_sequence_number(), request_id };

        let mut enc = Encoder::new();
        SymmetricAlgorithmHeader { token_id }.encode(&mut enc);
        sequence_header.encode(&mut enc);
        enc.write_raw(body);
        let payload = enc.into_bytes();

        let header = Header::new(MessageType::SecureMessage, ChunkType::single(), Some(channel_id));
        let (header, framed) = build_frame(header, &payload);
        self.writer.write_frame(&header, &framed, io_timeout, cancel).await
    }

    /// Assigns the next strictly-increasing outgoing sequence number (spec.md
    /// §3/§8 testable property 2). Only called while the connection state
    /// lock is held, which is what makes the monotonic guarantee hold across
    /// the read loop and the publish-forwarding task.
    fn next_sequence_number(&mut self) -> u32 {
        let n = self.send_counter;
        self.send_counter = self.send_counter.wrapping_add(1).max(1);
        n
    }
}

/// Encodes an `Error` frame body (`StatusCode` + an empty reason string) for
/// Phase H's "first frame was not Hello" and other framing failures
/// (spec.md §7).
pub fn encode_error_body(status: crate::wire::status_code::StatusCode) -> Bytes {
    let mut enc = Encoder::new();
    status.encode(&mut enc);
    enc.write_string(None);
    enc.into_bytes()
}

