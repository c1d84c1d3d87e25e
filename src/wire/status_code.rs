// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt;

use anyhow::Result;

use crate::wire::codec::{Decode, Decoder, Encode, Encoder};

/// A 32-bit OPC UA result code: `Good` (0x00000000) or one of the `Bad*`
/// values carried in a `ServiceFault.ResponseHeader.ServiceResult` (spec.md
/// §4.4/§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const GOOD: StatusCode = StatusCode(0x0000_0000);

    // Transport/framing (spec.md §4.1, §7).
    pub const BAD_TCP_MESSAGE_TYPE_INVALID: StatusCode = StatusCode(0x807C_0000);
    pub const BAD_TCP_MESSAGE_TOO_LARGE: StatusCode = StatusCode(0x807E_0000);
    pub const BAD_CONNECTION_CLOSED: StatusCode = StatusCode(0x80AE_0000);

    // Service-level (spec.md §4.4 dispatch table / §7).
    pub const BAD_NOT_IMPLEMENTED: StatusCode = StatusCode(0x8034_0000);
    pub const BAD_SESSION_ID_INVALID: StatusCode = StatusCode(0x8025_0000);
    pub const BAD_DECODING_ERROR: StatusCode = StatusCode(0x8007_0000);
    pub const BAD_TOO_MANY_PUBLISH_REQUESTS: StatusCode = StatusCode(0x80C5_0000);

    pub fn is_good(self) -> bool {
        self.0 & 0x8000_0000 == 0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl Decode for StatusCode {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        Ok(StatusCode(dec.read_u32()?))
    }
}

impl Encode for StatusCode {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u32(self.0);
    }
}
