// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A protocol processor for the OPC UA (IEC 62541) binary TCP transport:
//! Hello/Acknowledge handshake, SecureChannel open/close, and steady-state
//! service dispatch over one accepted connection. See [`processor::Processor`]
//! for the entry point and [`facade`] for the boundary this crate calls out
//! through.

/// Runtime configuration: buffer/channel/publish/io policy knobs.
pub mod cfg;
/// Secure-channel lifecycle state (`Issue`/`Renew`, token bookkeeping).
pub mod channel;
/// Per-connection shared mutable state behind one mutex: the frame writer,
/// outgoing sequence counter, channel manager, and publish queue.
pub mod connection;
/// The service router: decodes a `SecureMessage` body's type-id and drives
/// the matching session/internal-server call.
pub mod dispatcher;
/// [`error::ProcessorError`], this crate's single error type, and its
/// fatal/non-fatal and `StatusCode` classifications.
pub mod error;
/// The two external collaborators: the internal server facade and the
/// per-session facade the dispatcher calls through.
pub mod facade;
/// Drives a single accepted connection through the Hello → SecureOpen →
/// steady-state lifecycle.
pub mod processor;
/// The bounded FIFO of outstanding `PublishRequest`s awaiting a
/// notification to answer them.
pub mod publish;
/// Typed request/response parameter structures for every service the
/// dispatcher routes.
pub mod services;
/// Frame-level read/write over an `AsyncRead`/`AsyncWrite` half.
pub mod transport;
/// Small helpers with no better home (nonce generation, ...).
pub mod utils;
/// Part 6 binary encoding: the `Decoder`/`Encoder` codec plus every wire
/// type (`Header`, `Hello`/`Acknowledge`, algorithm/sequence headers,
/// `NodeId`, `StatusCode`).
pub mod wire;
