// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;

use crate::wire::{
    codec::{Decode, Decoder, Encode, Encoder},
    node_id::NodeId,
    status_code::StatusCode,
};

/// Common request envelope carried by every service request (OPC UA Part 4
/// §7.29). The dispatcher only reads `request_handle` (spec.md §4.4,
/// "Response construction" step 2), but the remaining fields are decoded so
/// the cursor lands exactly on the service-specific parameters that follow
/// (spec.md §4.1: "decoders must consume all bytes of a field they
/// describe").
#[derive(Debug, Clone)]
pub struct RequestHeader {
    pub authentication_token: NodeId,
    pub timestamp: i64,
    pub request_handle: u32,
    pub return_diagnostics: u32,
    pub audit_entry_id: Option<String>,
    pub timeout_hint: u32,
}

impl Decode for RequestHeader {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let authentication_token = NodeId::decode(dec)?;
        let timestamp = dec.read_i64()?;
        let request_handle = dec.read_u32()?;
        let return_diagnostics = dec.read_u32()?;
        let audit_entry_id = dec.read_string()?;
        let timeout_hint = dec.read_u32()?;
        skip_extension_object(dec)?;
        Ok(RequestHeader {
            authentication_token,
            timestamp,
            request_handle,
            return_diagnostics,
            audit_entry_id,
            timeout_hint,
        })
    }
}

/// Common response envelope. `service_result` carries the status the
/// dispatcher sets for a `ServiceFault` (spec.md §4.4 unknown-service arm,
/// §7).
#[derive(Debug, Clone)]
pub struct ResponseHeader {
    pub timestamp: i64,
    pub request_handle: u32,
    pub service_result: StatusCode,
    pub string_table: Vec<String>,
}

impl ResponseHeader {
    /// A fresh `Good` response header for the given request handle; the
    /// dispatcher fills `request_handle` in at send time regardless (spec.md
    /// §4.4 step 2), but service handlers build their response body against
    /// a header that already carries it for readability.
    pub fn for_request(request_handle: u32) -> Self {
        ResponseHeader {
            timestamp: 0,
            request_handle,
            service_result: StatusCode::GOOD,
            string_table: Vec::new(),
        }
    }

    pub fn with_result(mut self, result: StatusCode) -> Self {
        self.service_result = result;
        self
    }
}

impl Encode for ResponseHeader {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_i64(self.timestamp);
        enc.write_u32(self.request_handle);
        self.service_result.encode(enc);
        // DiagnosticInfo encoding mask, all fields absent.
        enc.write_u8(0x00);
        enc.write_array(&self.string_table, |e, s| e.write_string(Some(s)));
        write_null_extension_object(enc);
    }
}

/// `ServiceFault` (spec.md §4.4 unknown-service arm): a bare `ResponseHeader`
/// whose `ServiceResult` carries the fault status.
#[derive(Debug, Clone)]
pub struct ServiceFault {
    pub response_header: ResponseHeader,
}

impl Encode for ServiceFault {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
    }
}

/// Writes a null `ExtensionObject` (NodeId `ns=0;i=0` plus a "no body"
/// encoding byte) — used for `RequestHeader.AdditionalHeader` /
/// `ResponseHeader.AdditionalHeader`, which this processor never populates.
pub fn write_null_extension_object(enc: &mut Encoder) {
    NodeId::new(0, 0).encode(enc);
    enc.write_u8(0x00);
}

/// Reads and discards an `ExtensionObject`: a `NodeId` followed by a 1-byte
/// encoding selector and, if non-zero, a length-prefixed body.
pub fn skip_extension_object(dec: &mut Decoder) -> Result<()> {
    let _type_id = NodeId::decode(dec)?;
    let encoding = dec.read_u8()?;
    if encoding != 0x00 {
        let _ = dec.read_byte_string()?;
    }
    Ok(())
}
