// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{error::ProcessorError, utils::generate_server_nonce};

/// Client-requested channel lifecycle action (spec.md §4.3's
/// `OpenSecureChannelRequest.RequestType`: `Issue` or `Renew`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRequestType {
    Issue,
    Renew,
}

impl ChannelRequestType {
    pub fn from_wire(v: u32) -> Option<Self> {
        match v {
            0 => Some(ChannelRequestType::Issue),
            1 => Some(ChannelRequestType::Renew),
            _ => None,
        }
    }
}

/// A single secure channel's server-side state (spec.md §4.3): the channel
/// id assigned at Issue time, the current security token id (incremented on
/// every Renew — testable property 3), and the most recently issued
/// server nonce.
#[derive(Debug, Clone)]
pub struct SecureChannelRecord {
    pub channel_id: u32,
    pub token_id: u32,
    pub server_nonce: Vec<u8>,
    pub revised_lifetime_ms: u32,
    /// When this token was issued/renewed, milliseconds since the Unix
    /// epoch (spec.md:36, spec.md:68 — updated on every Renew alongside
    /// `token_id`).
    pub created_at: i64,
}

/// Owns the secure channel state for one connection. A connection only ever
/// has one live channel at a time (spec.md §4.3: "a connection is bound to
/// exactly one channel once opened").
#[derive(Debug)]
pub struct ChannelManager {
    record: Option<SecureChannelRecord>,
    min_server_nonce_length: usize,
}

impl ChannelManager {
    pub fn new(min_server_nonce_length: usize) -> Self {
        ChannelManager { record: None, min_server_nonce_length }
    }

    pub fn current(&self) -> Option<&SecureChannelRecord> {
        self.record.as_ref()
    }

    /// Handles `OpenSecureChannelRequest` (spec.md §4.3 `handle_open`). On a
    /// fresh `Issue` (no channel yet), `allocate_channel_id` is called to
    /// obtain a channel id from the internal server (spec.md §6
    /// `InternalServer::get_new_channel_id`); `Renew`, and re-`Issue` on an
    /// existing channel, reuse the stored channel id. Every call
    /// unconditionally bumps `token_id` and regenerates `server_nonce` from
    /// a CSPRNG (spec.md §9 Open Questions (a)/(b), resolved per
    /// SPEC_FULL.md §AMBIENT/A.6).
    pub fn handle_open(
        &mut self,
        request_type: ChannelRequestType,
        requested_lifetime_ms: u32,
        allocate_channel_id: impl FnOnce() -> u32,
    ) -> Result<&SecureChannelRecord, ProcessorError> {
        let server_nonce = generate_server_nonce(self.min_server_nonce_length);
        let revised_lifetime_ms = requested_lifetime_ms.max(1);

        let (channel_id, next_token_id) = match (&self.record, request_type) {
            (None, ChannelRequestType::Renew) => return Err(ProcessorError::ChannelMismatch),
            (None, ChannelRequestType::Issue) => (allocate_channel_id(), 1),
            (Some(r), _) => (r.channel_id, r.token_id.wrapping_add(1).max(1)),
        };

        self.record = Some(SecureChannelRecord {
            channel_id,
            token_id: next_token_id,
            server_nonce,
            revised_lifetime_ms,
            created_at: chrono::Utc::now().timestamp_millis(),
        });

        Ok(self.record.as_ref().expect("record just assigned"))
    }

    /// `SecureClose` must name the channel it is closing (spec.md §4.3
    /// testable property — channel id mismatch is rejected).
    pub fn verify_channel_id(&self, channel_id: u32) -> Result<(), ProcessorError> {
        match &self.record {
            Some(r) if r.channel_id == channel_id => Ok(()),
            _ => Err(ProcessorError::ChannelMismatch),
        }
    }

    /// The token id every `SecureMessage` reply must be stamped with (spec.md
    /// §4.4 "Response construction" step 5).
    pub fn current_token_id(&self) -> Result<u32, ProcessorError> {
        self.record
            .as_ref()
            .map(|r| r.token_id)
            .ok_or(ProcessorError::ChannelMismatch)
    }

    pub fn close(&mut self) {
        self.record = None;
    }
}
