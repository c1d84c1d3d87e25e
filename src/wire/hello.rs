// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;

use crate::wire::codec::{Decode, Decoder, Encode, Encoder};

/// Body of the client's `Hello` frame (spec.md §3). The full OPC UA Hello
/// also carries protocol version, max message/chunk counts, and an endpoint
/// URL; this processor only needs the buffer-size negotiation fields (§4.4
/// Phase H), so the rest is decoded and discarded rather than modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelloMessage {
    pub receive_buffer_size: u32,
    pub send_buffer_size: u32,
}

impl Decode for HelloMessage {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let _protocol_version = dec.read_u32()?;
        let receive_buffer_size = dec.read_u32()?;
        let send_buffer_size = dec.read_u32()?;
        let _max_message_size = dec.read_u32()?;
        let _max_chunk_count = dec.read_u32()?;
        let _endpoint_url = dec.read_string()?;
        Ok(HelloMessage {
            receive_buffer_size,
            send_buffer_size,
        })
    }
}

/// Body of the server's `Acknowledge` reply (spec.md §3/§4.4 Phase H).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcknowledgeMessage {
    pub protocol_version: u32,
    pub receive_buffer_size: u32,
    pub send_buffer_size: u32,
    pub max_message_size: u32,
    pub max_chunk_count: u32,
}

impl AcknowledgeMessage {
    /// Echoes the Hello's buffer sizes, clamped to the configured maxima
    /// (SPEC_FULL.md §AMBIENT/A.6 — spec.md §9 Open Question (c) resolved
    /// in favour of the "hardened implementation" option).
    pub fn echoing(hello: &HelloMessage, max_receive: u32, max_send: u32) -> Self {
        AcknowledgeMessage {
            protocol_version: 0,
            receive_buffer_size: hello.receive_buffer_size.min(max_receive),
            send_buffer_size: hello.send_buffer_size.min(max_send),
            max_message_size: 0,
            max_chunk_count: 1,
        }
    }
}

impl Encode for AcknowledgeMessage {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u32(self.protocol_version);
        enc.write_u32(self.receive_buffer_size);
        enc.write_u32(self.send_buffer_size);
        enc.write_u32(self.max_message_size);
        enc.write_u32(self.max_chunk_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledge_echoes_unclamped_request() {
        let hello = HelloMessage {
            receive_buffer_size: 65536,
            send_buffer_size: 65536,
        };
        let ack = AcknowledgeMessage::echoing(&hello, 1 << 20, 1 << 20);
        assert_eq!(ack.receive_buffer_size, 65536);
        assert_eq!(ack.send_buffer_size, 65536);
    }

    #[test]
    fn acknowledge_clamps_oversized_request() {
        let hello = HelloMessage {
            receive_buffer_size: 10 << 20,
            send_buffer_size: 10 << 20,
        };
        let ack = AcknowledgeMessage::echoing(&hello, 65536, 65536);
        assert_eq!(ack.receive_buffer_size, 65536);
        assert_eq!(ack.send_buffer_size, 65536);
    }

    #[test]
    fn hello_decodes_buffer_fields() {
        let mut enc = Encoder::new();
        enc.write_u32(0); // protocol version
        enc.write_u32(8192);
        enc.write_u32(8192);
        enc.write_u32(0);
        enc.write_u32(0);
        enc.write_string(Some("opc.tcp://localhost:4840"));
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let hello = HelloMessage::decode(&mut dec).unwrap();
        assert_eq!(hello.receive_buffer_size, 8192);
        assert_eq!(hello.send_buffer_size, 8192);
    }
}
