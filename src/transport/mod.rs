//! Frame-level I/O: reading and writing whole OPC UA TCP frames over a
//! generic async stream, with the teacher's cancellation/timeout shape
//! (spec.md §4.1/§4.2).

/// `io_with_timeout`, `FrameReader`, `FrameWriter`.
pub mod frame;
