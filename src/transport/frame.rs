// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time::timeout,
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::ProcessorError,
    wire::header::{BASE_HEADER_LEN, Header},
};

/// Races `fut` against `io_timeout` and against `cancel` being triggered.
/// Mirrors the teacher's `client::common::io_with_timeout` exactly, modulo
/// returning the crate's own error type instead of `anyhow`.
pub async fn io_with_timeout<F, T>(
    label: &'static str,
    fut: F,
    io_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T, ProcessorError>
where
    F: Future<Output = std::io::Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(ProcessorError::Cancelled),
        res = timeout(io_timeout, fut) => {
            match res {
                Ok(Ok(v)) => Ok(v),
                Ok(Err(e)) => Err(ProcessorError::Transport(e)),
                Err(_) => Err(ProcessorError::Timeout),
            }
        }
    }
}

/// A decoded frame: the header plus the raw, still-encoded body bytes
/// (spec.md §4.1 — `read_header`/`read_body`, kept separate so the caller
/// can branch on `message_type` before paying for a body decode).
#[derive(Debug)]
pub struct RawFrame {
    pub header: Header,
    pub body: Bytes,
}

/// Reads whole frames off an `AsyncRead` half (spec.md §4.1). The
/// `max_receive_buffer_size` bound rejects a frame whose declared `size`
/// exceeds the negotiated receive buffer before allocating for it, per
/// `BadTcpMessageTooLarge` (spec.md §7).
pub struct FrameReader<R> {
    reader: R,
    max_receive_buffer_size: u32,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, max_receive_buffer_size: u32) -> Self {
        FrameReader { reader, max_receive_buffer_size }
    }

    pub async fn read_frame(
        &mut self,
        io_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RawFrame, ProcessorError> {
        let mut base = [0u8; BASE_HEADER_LEN];
        io_with_timeout(
            "read base header",
            self.reader.read_exact(&mut base),
            io_timeout,
            cancel,
        )
        .await?;

        let mut header = Header::decode_base(&base)
            .map_err(|e| ProcessorError::BadHeader(e.to_string()))?;

        if header.message_type.carries_channel_id() {
            let mut chan = [0u8; 4];
            io_with_timeout(
                "read channel id",
                self.reader.read_exact(&mut chan),
                io_timeout,
                cancel,
            )
            .await?;
            header = header.with_channel_id(u32::from_le_bytes(chan));
        }

        if header.size > self.max_receive_buffer_size {
            return Err(ProcessorError::BodySizeMismatch);
        }

        let body_len = header
            .body_size()
            .map_err(|e| ProcessorError::BadHeader(e.to_string()))?;
        let mut body = BytesMut::zeroed(body_len);
        if body_len > 0 {
            io_with_timeout(
                "read body",
                self.reader.read_exact(&mut body),
                io_timeout,
                cancel,
            )
            .await?;
        }

        Ok(RawFrame { header, body: body.freeze() })
    }
}

/// Writes whole frames to an `AsyncWrite` half (spec.md §4.2). Callers hold
/// the connection's send mutex across header+body so a frame is never
/// interleaved with another writer's bytes (spec.md §4.3 testable
/// property 2).
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        FrameWriter { writer }
    }

    pub async fn write_frame(
        &mut self,
        header: &Header,
        body: &[u8],
        io_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), ProcessorError> {
        let mut enc = crate::wire::codec::Encoder::new();
        header.encode(&mut enc);
        let header_bytes = enc.into_bytes();

        io_with_timeout(
            "write header",
            self.writer.write_all(&header_bytes),
            io_timeout,
            cancel,
        )
        .await?;

        if !body.is_empty() {
            io_with_timeout("write body", self.writer.write_all(body), io_timeout, cancel)
                .await?;
        }

        io_with_timeout("flush", self.writer.flush(), io_timeout, cancel).await?;
        Ok(())
    }
}

/// Builds the complete on-wire bytes (header + body) for a single frame,
/// stamping `header.size` from the body length first (spec.md §4.2,
/// "Frame Writer" step 1).
pub fn build_frame(mut header: Header, body: &[u8]) -> (Header, Bytes) {
    header.size = (header.header_len() + body.len()) as u32;
    let mut enc = crate::wire::codec::Encoder::new();
    enc.write_raw(body);
    (header, enc.into_bytes())
}

#[cfg(test)]
mod tests {
    use tokio::io::duplex;

    use super::*;
    use crate::wire::header::{ChunkType, MessageType};

    #[tokio::test]
    async fn round_trips_a_hello_frame() {
        let (client, server) = duplex(4096);
        let (client_r, mut client_w) = tokio::io::split(client);
        let (server_r, _server_w) = tokio::io::split(server);
        let mut client_reader = FrameReader::new(client_r, 1 << 20);
        let mut server_reader = FrameReader::new(server_r, 1 << 20);
        let _ = &mut client_reader;

        let body = b"hello-body";
        let header = Header::new(MessageType::Hello, ChunkType::single(), None);
        let (header, body_bytes) = build_frame(header, body);

        let cancel = CancellationToken::new();
        let mut writer = FrameWriter::new(&mut client_w);
        writer
            .write_frame(&header, &body_bytes, Duration::from_secs(1), &cancel)
            .await
            .unwrap();

        let frame = server_reader
            .read_frame(Duration::from_secs(1), &cancel)
            .await
            .unwrap();
        assert_eq!(frame.header.message_type, MessageType::Hello);
        assert_eq!(&frame.body[..], body);
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_before_reading_body() {
        let (client, server) = duplex(4096);
        let (client_r, mut client_w) = tokio::io::split(client);
        let (server_r, _server_w) = tokio::io::split(server);
        let _ = client_r;

        let header = Header::new(MessageType::Hello, ChunkType::single(), None);
        let (header, body_bytes) = build_frame(header, &vec![0u8; 64]);

        let cancel = CancellationToken::new();
        let mut writer = FrameWriter::new(&mut client_w);
        writer
            .write_frame(&header, &body_bytes, Duration::from_secs(1), &cancel)
            .await
            .unwrap();

        let mut too_small_reader = FrameReader::new(server_r, 16);
        let result = too_small_reader
            .read_frame(Duration::from_secs(1), &cancel)
            .await;
        assert!(result.is_err());
    }
}
