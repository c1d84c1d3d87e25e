// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Binary cursor primitives for the OPC UA Part 6 binary encoding:
//! little-endian integers, `Int32`-length-prefixed strings/byte strings
//! (`-1` denotes null), and `Int32`-length-prefixed arrays.

use anyhow::{Result, bail};
use bytes::{BufMut, Bytes, BytesMut};

/// A position-tracked read-only view over a decoded message body.
///
/// Mirrors the teacher's `Buffer`-style cursor (`client/client.rs`'s
/// `scratch`/`Bytes::slice` handling): every `read_*` call advances `pos`
/// and callers are expected to consume exactly the bytes their field
/// describes (spec.md §4.1).
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Decoder { buf, pos: 0 }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            bail!(
                "unexpected end of buffer: need {n} bytes, have {}",
                self.remaining()
            );
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes(b.try_into().expect("8-byte slice")))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    /// `String`: `Int32` length prefix, `-1` means null.
    pub fn read_string(&mut self) -> Result<Option<String>> {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(None);
        }
        let bytes = self.take(len as usize)?;
        Ok(Some(String::from_utf8(bytes.to_vec())?))
    }

    /// `ByteString`: same framing as `String` but raw bytes.
    pub fn read_byte_string(&mut self) -> Result<Option<Vec<u8>>> {
        let len = self.read_i32()?;
        if len < 0 {
            return Ok(None);
        }
        Ok(Some(self.take(len as usize)?.to_vec()))
    }

    /// `Int32[]`: used for the `PublishRequest` acknowledgement list.
    pub fn read_i32_array(&mut self) -> Result<Vec<i32>> {
        let len = self.read_i32()?;
        if len <= 0 {
            return Ok(Vec::new());
        }
        let mut v = Vec::with_capacity(len as usize);
        for _ in 0..len {
            v.push(self.read_i32()?);
        }
        Ok(v)
    }

    /// `T[]` via a per-element decode closure, for arrays of structures.
    pub fn read_array<T>(
        &mut self,
        mut decode_one: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let len = self.read_i32()?;
        if len <= 0 {
            return Ok(Vec::new());
        }
        let mut v = Vec::with_capacity(len as usize);
        for _ in 0..len {
            v.push(decode_one(self)?);
        }
        Ok(v)
    }
}

/// A growable write buffer producing the bytes for one encoded structure.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    pub fn new() -> Self {
        Encoder { buf: BytesMut::new() }
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_u32(v as u32);
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write_u64(v as u64);
    }

    pub fn write_string(&mut self, v: Option<&str>) {
        match v {
            None => self.write_i32(-1),
            Some(s) => {
                self.write_i32(s.len() as i32);
                self.buf.put_slice(s.as_bytes());
            },
        }
    }

    pub fn write_byte_string(&mut self, v: Option<&[u8]>) {
        match v {
            None => self.write_i32(-1),
            Some(b) => {
                self.write_i32(b.len() as i32);
                self.buf.put_slice(b);
            },
        }
    }

    pub fn write_i32_array(&mut self, v: &[i32]) {
        self.write_i32(v.len() as i32);
        for &x in v {
            self.write_i32(x);
        }
    }

    pub fn write_array<T>(&mut self, v: &[T], mut encode_one: impl FnMut(&mut Self, &T)) {
        self.write_i32(v.len() as i32);
        for item in v {
            encode_one(self, item);
        }
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }
}

/// Implemented by every wire structure that can be parsed out of a decoded
/// message body (spec.md §6: "the codec exposes `decode(buffer) → value`").
pub trait Decode: Sized {
    fn decode(dec: &mut Decoder) -> Result<Self>;
}

/// Implemented by every wire structure that serialises to bytes (spec.md
/// §6: "`encode(value) → bytes`").
pub trait Encode {
    fn encode(&self, enc: &mut Encoder);
}
