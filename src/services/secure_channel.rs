// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;

use crate::{
    channel::{ChannelRequestType, SecureChannelRecord},
    services::common::{RequestHeader, ResponseHeader},
    wire::codec::{Decode, Decoder, Encode, Encoder},
};

/// `OpenSecureChannelRequest` (spec.md §4.3/§4.4 Phase O). `security_mode`
/// is carried through opaquely — this processor does no signing/encryption,
/// only channel id/token bookkeeping (spec.md §1 Non-goals).
#[derive(Debug, Clone)]
pub struct OpenSecureChannelRequest {
    pub request_header: RequestHeader,
    pub request_type: ChannelRequestType,
    pub security_mode: u32,
    pub client_nonce: Option<Vec<u8>>,
    pub requested_lifetime_ms: u32,
}

impl Decode for OpenSecureChannelRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        let _client_protocol_version = dec.read_u32()?;
        let request_type_raw = dec.read_u32()?;
        let request_type = ChannelRequestType::from_wire(request_type_raw)
            .ok_or_else(|| anyhow::anyhow!("unsupported OpenSecureChannelRequest.RequestType {request_type_raw}"))?;
        let security_mode = dec.read_u32()?;
        let client_nonce = dec.read_byte_string()?;
        let requested_lifetime_ms = dec.read_u32()?;
        Ok(OpenSecureChannelRequest {
            request_header,
            request_type,
            security_mode,
            client_nonce,
            requested_lifetime_ms,
        })
    }
}

/// `OpenSecureChannelResponse`, built from the freshly issued/renewed
/// [`SecureChannelRecord`] (spec.md §4.3's `SecurityToken`).
#[derive(Debug, Clone)]
pub struct OpenSecureChannelResponse {
    pub response_header: ResponseHeader,
    pub channel_id: u32,
    pub token_id: u32,
    pub created_at: i64,
    pub revised_lifetime_ms: u32,
    pub server_nonce: Vec<u8>,
}

impl OpenSecureChannelResponse {
    pub fn from_record(request_handle: u32, record: &SecureChannelRecord) -> Self {
        OpenSecureChannelResponse {
            response_header: ResponseHeader::for_request(request_handle),
            channel_id: record.channel_id,
            token_id: record.token_id,
            created_at: record.created_at,
            revised_lifetime_ms: record.revised_lifetime_ms,
            server_nonce: record.server_nonce.clone(),
        }
    }
}

impl Encode for OpenSecureChannelResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        enc.write_u32(0); // ServerProtocolVersion
        // ChannelSecurityToken: ChannelId, TokenId, CreatedAt, RevisedLifetime.
        enc.write_u32(self.channel_id);
        enc.write_u32(self.token_id);
        enc.write_i64(self.created_at);
        enc.write_u32(self.revised_lifetime_ms);
        enc.write_byte_string(Some(&self.server_nonce));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_issue_request_type() {
        let mut enc = Encoder::new();
        crate::wire::node_id::NodeId::new(0, 0).encode(&mut enc);
        enc.write_i64(0);
        enc.write_u32(1);
        enc.write_u32(0);
        enc.write_string(None);
        enc.write_u32(1000);
        crate::services::common::write_null_extension_object(&mut enc);
        enc.write_u32(0); // client protocol version
        enc.write_u32(0); // Issue
        enc.write_u32(1); // SecurityMode
        enc.write_byte_string(None);
        enc.write_u32(600_000);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let req = OpenSecureChannelRequest::decode(&mut dec).unwrap();
        assert_eq!(req.request_type, ChannelRequestType::Issue);
        assert_eq!(req.requested_lifetime_ms, 600_000);
    }

    #[test]
    fn response_encodes_revised_lifetime_from_record() {
        let record = SecureChannelRecord {
            channel_id: 7,
            token_id: 1,
            server_nonce: vec![0u8; 32],
            revised_lifetime_ms: 600_000,
            created_at: 1_700_000_000_000,
        };
        let response = OpenSecureChannelResponse::from_record(1, &record);
        let mut enc = Encoder::new();
        response.encode(&mut enc);
        assert!(enc.len() > 0);
    }
}
