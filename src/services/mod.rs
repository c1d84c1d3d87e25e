//! Typed request/response parameter structures for every service the
//! dispatcher routes (spec.md §4.4's dispatch table), grouped the way OPC UA
//! Part 4 groups its service sets.

/// Shared `RequestHeader`/`ResponseHeader`/`ServiceFault` plumbing.
pub mod common;
/// Service type-id table (`ServiceId`) and the NodeId constants behind it.
pub mod ids;
/// Session service set: CreateSession, ActivateSession, CloseSession,
/// GetEndpoints.
pub mod session;
/// Attribute service set: Read, Write.
pub mod attributes;
/// View service set: Browse, TranslateBrowsePathsToNodeIds, AddNodes.
pub mod view;
/// Subscription/MonitoredItem/Publish service set.
pub mod subscription;
/// SecureChannel service set: OpenSecureChannel.
pub mod secure_channel;
