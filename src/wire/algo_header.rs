// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;

use crate::wire::codec::{Decode, Decoder, Encode, Encoder};

/// Present only on `SecureOpen` bodies (spec.md §3). The processor treats
/// the certificate/policy-URI fields as opaque and only ever mutates
/// `token_id` before echoing the header back (spec.md §4.4 Phase O).
#[derive(Debug, Clone)]
pub struct AsymmetricAlgorithmHeader {
    pub security_policy_uri: Option<String>,
    pub sender_certificate: Option<Vec<u8>>,
    pub receiver_certificate_thumbprint: Option<Vec<u8>>,
    /// Not part of the wire struct itself; carried alongside it so
    /// `send_response` can stamp the current token id before encoding, the
    /// same way the `SymmetricAlgorithmHeader` does (spec.md §4.4 "Response
    /// construction", step 5).
    pub token_id: u32,
}

impl Decode for AsymmetricAlgorithmHeader {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        Ok(AsymmetricAlgorithmHeader {
            security_policy_uri: dec.read_string()?,
            sender_certificate: dec.read_byte_string()?,
            receiver_certificate_thumbprint: dec.read_byte_string()?,
            token_id: 0,
        })
    }
}

impl Encode for AsymmetricAlgorithmHeader {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_string(self.security_policy_uri.as_deref());
        enc.write_byte_string(self.sender_certificate.as_deref());
        enc.write_byte_string(self.receiver_certificate_thumbprint.as_deref());
    }
}

/// Present on `SecureMessage` bodies (spec.md §3): carries the `token_id`
/// the dispatcher must stamp with the channel's current token before every
/// reply (spec.md §4.4 "Response construction", step 5; testable property
/// 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SymmetricAlgorithmHeader {
    pub token_id: u32,
}

impl Decode for SymmetricAlgorithmHeader {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        Ok(SymmetricAlgorithmHeader { token_id: dec.read_u32()? })
    }
}

impl Encode for SymmetricAlgorithmHeader {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u32(self.token_id);
    }
}
