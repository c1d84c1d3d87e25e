// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Result, bail};

use crate::wire::codec::{Decode, Decoder, Encode, Encoder};

/// A numeric-identifier `NodeId` (OPC UA Part 6 §5.2.2.9, encoding forms
/// two-byte/four-byte/numeric). spec.md §6 requires "numeric identifier
/// equality" for service dispatch — string/GUID/opaque NodeId forms are out
/// of scope for this crate's narrow codec (SPEC_FULL.md §AMBIENT/A.5); every
/// service type-id this processor dispatches on is a small namespace-0
/// numeric value, so this is sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub namespace: u16,
    pub numeric: u32,
}

impl NodeId {
    pub const fn new(namespace: u16, numeric: u32) -> Self {
        NodeId { namespace, numeric }
    }
}

impl Decode for NodeId {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let encoding = dec.read_u8()?;
        match encoding {
            0x00 => {
                let id = dec.read_u8()?;
                Ok(NodeId::new(0, id as u32))
            },
            0x01 => {
                let ns = dec.read_u8()?;
                let id = dec.read_u16()?;
                Ok(NodeId::new(ns as u16, id as u32))
            },
            0x02 => {
                let ns = dec.read_u16()?;
                let id = dec.read_u32()?;
                Ok(NodeId::new(ns, id))
            },
            other => bail!(
                "unsupported NodeId encoding byte 0x{other:02x}: only numeric forms \
                 (0x00/0x01/0x02) are implemented"
            ),
        }
    }
}

impl Encode for NodeId {
    fn encode(&self, enc: &mut Encoder) {
        if self.namespace == 0 && self.numeric <= u8::MAX as u32 {
            enc.write_u8(0x00);
            enc.write_u8(self.numeric as u8);
        } else if self.namespace <= u8::MAX as u16 && self.numeric <= u16::MAX as u32 {
            enc.write_u8(0x01);
            enc.write_u8(self.namespace as u8);
            enc.write_u16(self.numeric as u16);
        } else {
            enc.write_u8(0x02);
            enc.write_u16(self.namespace);
            enc.write_u32(self.numeric);
        }
    }
}
