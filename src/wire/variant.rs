// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Result, bail};

use crate::wire::codec::{Decode, Decoder, Encode, Encoder};

/// An OPC UA `Variant` (Part 6 §5.2.2.16), narrowed to the scalar built-in
/// types a Read/Write attribute value actually carries in this processor's
/// scope (spec.md §6 — `SessionFacade::read`/`write` pass a `DataValue`
/// through without interpreting it beyond its type). Array variants,
/// `ExtendedObject`/`DataValue`/`DiagnosticInfo`-typed variants, and the
/// matrix dimension tail are out of scope (SPEC_FULL.md §AMBIENT/A.5).
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Boolean(bool),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    String(Option<String>),
    ByteString(Option<Vec<u8>>),
}

impl Variant {
    fn type_id(&self) -> u8 {
        match self {
            Variant::Boolean(_) => 1,
            Variant::Byte(_) => 3,
            Variant::Int16(_) => 4,
            Variant::UInt16(_) => 5,
            Variant::Int32(_) => 6,
            Variant::UInt32(_) => 7,
            Variant::Int64(_) => 8,
            Variant::UInt64(_) => 9,
            Variant::Double(_) => 11,
            Variant::String(_) => 12,
            Variant::ByteString(_) => 15,
        }
    }
}

impl Decode for Variant {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let mask = dec.read_u8()?;
        if mask & 0x80 != 0 {
            bail!("array and matrix Variants are not supported by this codec");
        }
        Ok(match mask {
            1 => Variant::Boolean(dec.read_bool()?),
            3 => Variant::Byte(dec.read_u8()?),
            4 => Variant::Int16(dec.read_u16()? as i16),
            5 => Variant::UInt16(dec.read_u16()?),
            6 => Variant::Int32(dec.read_i32()?),
            7 => Variant::UInt32(dec.read_u32()?),
            8 => Variant::Int64(dec.read_i64()?),
            9 => Variant::UInt64(dec.read_u64()?),
            11 => Variant::Double(f64::from_bits(dec.read_u64()?)),
            12 => Variant::String(dec.read_string()?),
            15 => Variant::ByteString(dec.read_byte_string()?),
            other => bail!("unsupported Variant built-in type id {other}"),
        })
    }
}

impl Encode for Variant {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u8(self.type_id());
        match self {
            Variant::Boolean(v) => enc.write_bool(*v),
            Variant::Byte(v) => enc.write_u8(*v),
            Variant::Int16(v) => enc.write_u16(*v as u16),
            Variant::UInt16(v) => enc.write_u16(*v),
            Variant::Int32(v) => enc.write_i32(*v),
            Variant::UInt32(v) => enc.write_u32(*v),
            Variant::Int64(v) => enc.write_i64(*v),
            Variant::UInt64(v) => enc.write_u64(*v),
            Variant::Double(v) => enc.write_u64(v.to_bits()),
            Variant::String(v) => enc.write_string(v.as_deref()),
            Variant::ByteString(v) => enc.write_byte_string(v.as_deref()),
        }
    }
}
