// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

use crate::wire::status_code::StatusCode;

/// Failures a [`crate::processor::Processor`] can hit while driving a single
/// connection (spec.md §7). Transport-layer failures (§7's first bullet
/// group) end the connection outright; service-layer failures (§7's second
/// group) are reported to the client as a `ServiceFault` and the connection
/// stays open.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("transport I/O failed: {0}")]
    Transport(#[from] std::io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("malformed base/secure header: {0}")]
    BadHeader(String),

    #[error("declared body size does not match the bytes actually read")]
    BodySizeMismatch,

    #[error("failed to decode message body: {0}")]
    Decode(#[from] anyhow::Error),

    #[error("first frame on the connection was not Hello")]
    NotHello,

    #[error("secure message channel id does not match the open channel")]
    ChannelMismatch,

    #[error("request references a session that does not exist on this channel")]
    NoSession,

    #[error("publish request queue is full")]
    PublishQueueFull,

    #[error("I/O operation timed out")]
    Timeout,

    #[error("connection shutting down")]
    Cancelled,
}

impl ProcessorError {
    /// Maps this error onto the `StatusCode` a `ServiceFault` should carry,
    /// for the subset of errors spec.md §7 treats as recoverable
    /// service-layer faults.
    pub fn as_status_code(&self) -> StatusCode {
        match self {
            ProcessorError::Decode(_) => StatusCode::BAD_DECODING_ERROR,
            ProcessorError::NoSession => StatusCode::BAD_SESSION_ID_INVALID,
            ProcessorError::PublishQueueFull => StatusCode::BAD_TOO_MANY_PUBLISH_REQUESTS,
            ProcessorError::ChannelMismatch => StatusCode::BAD_TCP_MESSAGE_TYPE_INVALID,
            _ => StatusCode::BAD_NOT_IMPLEMENTED,
        }
    }

    /// Whether this error must end the connection (spec.md §7's transport
    /// group) rather than be reported as a `ServiceFault` and continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProcessorError::Transport(_)
                | ProcessorError::ConnectionClosed
                | ProcessorError::BadHeader(_)
                | ProcessorError::BodySizeMismatch
                | ProcessorError::NotHello
                | ProcessorError::Timeout
                | ProcessorError::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_are_not_fatal() {
        let err = ProcessorError::Decode(anyhow::anyhow!("bad string length"));
        assert!(!err.is_fatal());
        assert_eq!(err.as_status_code(), StatusCode::BAD_DECODING_ERROR);
    }

    #[test]
    fn bad_header_is_fatal() {
        assert!(ProcessorError::BadHeader("short tag".into()).is_fatal());
    }
}
