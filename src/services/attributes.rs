// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;

use crate::{
    services::common::{RequestHeader, ResponseHeader},
    wire::{
        codec::{Decode, Decoder, Encode, Encoder},
        node_id::NodeId,
        status_code::StatusCode,
        variant::Variant,
    },
};

/// A `ReadValueId` / `WriteValue` target: the node and attribute a Read or
/// Write request names (OPC UA Part 4 §7.24/§7.37, trimmed to what
/// [`crate::facade::SessionFacade::read`]/`write` need).
#[derive(Debug, Clone)]
pub struct ReadValueId {
    pub node_id: NodeId,
    pub attribute_id: u32,
    pub index_range: Option<String>,
}

impl Decode for ReadValueId {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let node_id = NodeId::decode(dec)?;
        let attribute_id = dec.read_u32()?;
        let index_range = dec.read_string()?;
        // DataEncoding (QualifiedName: NamespaceIndex + Name).
        let _data_encoding_ns = dec.read_u16()?;
        let _data_encoding_name = dec.read_string()?;
        Ok(ReadValueId { node_id, attribute_id, index_range })
    }
}

/// `ReadRequest`.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    pub request_header: RequestHeader,
    pub max_age: f64,
    pub nodes_to_read: Vec<ReadValueId>,
}

impl Decode for ReadRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        let max_age = f64::from_bits(dec.read_u64()?);
        let _timestamps_to_return = dec.read_u32()?;
        let nodes_to_read = dec.read_array(ReadValueId::decode)?;
        Ok(ReadRequest { request_header, max_age, nodes_to_read })
    }
}

/// A `DataValue` (Part 6 §5.2.2.17), trimmed to the `Value`/`StatusCode`
/// fields this processor's facade populates; `SourceTimestamp` and
/// `ServerTimestamp` are out of scope (SPEC_FULL.md §AMBIENT/A.5).
#[derive(Debug, Clone)]
pub struct DataValue {
    pub status: StatusCode,
    pub value: Option<Variant>,
}

impl Decode for DataValue {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let mask = dec.read_u8()?;
        let value = if mask & 0x01 != 0 { Some(Variant::decode(dec)?) } else { None };
        let status = if mask & 0x02 != 0 { StatusCode::decode(dec)? } else { StatusCode::GOOD };
        Ok(DataValue { status, value })
    }
}

impl Encode for DataValue {
    fn encode(&self, enc: &mut Encoder) {
        match &self.value {
            None => enc.write_u8(0x00), // EncodingMask: no fields present
            Some(variant) => {
                enc.write_u8(0x01 | 0x02); // Value | StatusCode present
                variant.encode(enc);
                self.status.encode(enc);
            },
        }
    }
}

/// `ReadResponse`.
#[derive(Debug, Clone)]
pub struct ReadResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<DataValue>,
}

impl Encode for ReadResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        enc.write_array(&self.results, |e, v| v.encode(e));
        enc.write_array(&Vec::<()>::new(), |_, _: &()| {}); // DiagnosticInfos
    }
}

/// A `WriteValue`: target plus the already-encoded `Variant` to write.
#[derive(Debug, Clone)]
pub struct WriteValue {
    pub node_id: NodeId,
    pub attribute_id: u32,
    pub index_range: Option<String>,
    pub value: DataValue,
}

impl Decode for WriteValue {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let node_id = NodeId::decode(dec)?;
        let attribute_id = dec.read_u32()?;
        let index_range = dec.read_string()?;
        let value = DataValue::decode(dec)?;
        Ok(WriteValue { node_id, attribute_id, index_range, value })
    }
}

/// `WriteRequest`.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub request_header: RequestHeader,
    pub nodes_to_write: Vec<WriteValue>,
}

impl Decode for WriteRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        let nodes_to_write = dec.read_array(WriteValue::decode)?;
        Ok(WriteRequest { request_header, nodes_to_write })
    }
}

/// `WriteResponse`.
#[derive(Debug, Clone)]
pub struct WriteResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<StatusCode>,
}

impl Encode for WriteResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        enc.write_array(&self.results, |e, s| s.encode(e));
        enc.write_array(&Vec::<()>::new(), |_, _: &()| {}); // DiagnosticInfos
    }
}
