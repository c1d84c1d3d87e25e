// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;

use crate::wire::codec::{Decode, Decoder, Encode, Encoder};

/// Carries `sequence_number` and `request_id` (spec.md §3). The
/// `sequence_number` is monotonic per channel *on send*; the processor
/// overwrites whatever the decoded value holds with its own outgoing
/// counter before encoding a reply (spec.md §4.4, "Response construction"
/// step 3; testable property 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceHeader {
    pub sequence_number: u32,
    pub request_id: u32,
}

impl Decode for SequenceHeader {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        Ok(SequenceHeader {
            sequence_number: dec.read_u32()?,
            request_id: dec.read_u32()?,
        })
    }
}

impl Encode for SequenceHeader {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u32(self.sequence_number);
        enc.write_u32(self.request_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let hdr = SequenceHeader { sequence_number: 7, request_id: 99 };
        let mut enc = Encoder::new();
        hdr.encode(&mut enc);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(SequenceHeader::decode(&mut dec).unwrap(), hdr);
    }
}
