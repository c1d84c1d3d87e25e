//! Minimal, concrete OPC UA binary codec.
//!
//! spec.md treats the structure codec as an external collaborator; this
//! module supplies exactly the pieces named in spec.md §3/§4.4 so the crate
//! compiles and tests itself end to end (see SPEC_FULL.md §AMBIENT/A.5). It
//! is intentionally narrow — a real deployment would swap it for a
//! general-purpose OPC UA type library.

/// Binary cursor primitives (`Decoder`/`Encoder`) and the `Decode`/`Encode`
/// traits every wire structure implements.
pub mod codec;
/// The fixed 8/12-byte transport header (`Header`, `MessageType`,
/// `ChunkType`).
pub mod header;
/// `HelloMessage` / `AcknowledgeMessage`.
pub mod hello;
/// `AsymmetricAlgorithmHeader` / `SymmetricAlgorithmHeader`.
pub mod algo_header;
/// `SequenceHeader`.
pub mod sequence_header;
/// Numeric-identifier `NodeId`.
pub mod node_id;
/// `StatusCode` constants used throughout the dispatcher.
pub mod status_code;
/// `Variant`, narrowed to the scalar built-in types Read/Write carry.
pub mod variant;
