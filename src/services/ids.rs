// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::wire::node_id::NodeId;

/// Numeric identifiers for the `*_Encoding_DefaultBinary` NodeIds of every
/// request this processor dispatches on (spec.md §4.4's table). Namespace 0
/// throughout — these are the standard OPC UA object ids.
pub mod object_ids {
    pub const OPEN_SECURE_CHANNEL_REQUEST: u32 = 446;
    pub const OPEN_SECURE_CHANNEL_RESPONSE: u32 = 449;
    pub const CREATE_SESSION_REQUEST: u32 = 461;
    pub const CREATE_SESSION_RESPONSE: u32 = 464;
    pub const ACTIVATE_SESSION_REQUEST: u32 = 467;
    pub const ACTIVATE_SESSION_RESPONSE: u32 = 470;
    pub const CLOSE_SESSION_REQUEST: u32 = 473;
    pub const CLOSE_SESSION_RESPONSE: u32 = 476;
    pub const READ_REQUEST: u32 = 631;
    pub const READ_RESPONSE: u32 = 634;
    pub const WRITE_REQUEST: u32 = 673;
    pub const WRITE_RESPONSE: u32 = 676;
    pub const BROWSE_REQUEST: u32 = 527;
    pub const BROWSE_RESPONSE: u32 = 530;
    pub const TRANSLATE_BROWSE_PATHS_REQUEST: u32 = 557;
    pub const TRANSLATE_BROWSE_PATHS_RESPONSE: u32 = 560;
    pub const ADD_NODES_REQUEST: u32 = 491;
    pub const ADD_NODES_RESPONSE: u32 = 494;
    pub const GET_ENDPOINTS_REQUEST: u32 = 428;
    pub const GET_ENDPOINTS_RESPONSE: u32 = 431;
    pub const CREATE_SUBSCRIPTION_REQUEST: u32 = 785;
    pub const CREATE_SUBSCRIPTION_RESPONSE: u32 = 788;
    pub const DELETE_SUBSCRIPTIONS_REQUEST: u32 = 848;
    pub const DELETE_SUBSCRIPTIONS_RESPONSE: u32 = 851;
    pub const CREATE_MONITORED_ITEMS_REQUEST: u32 = 751;
    pub const CREATE_MONITORED_ITEMS_RESPONSE: u32 = 754;
    pub const DELETE_MONITORED_ITEMS_REQUEST: u32 = 778;
    pub const DELETE_MONITORED_ITEMS_RESPONSE: u32 = 781;
    pub const PUBLISH_REQUEST: u32 = 827;
    pub const PUBLISH_RESPONSE: u32 = 830;
    pub const SERVICE_FAULT: u32 = 397;
}

/// The service requests this processor's steady-state dispatch (spec.md
/// §4.4 Phase S) knows how to route. This is the "table mapping type-id ->
/// handler" spec.md §9's Design Notes calls for, rendered as a tagged enum
/// rather than a long `if`/`else` chain — `Dispatcher::route` matches on it
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceId {
    CreateSession,
    ActivateSession,
    CloseSession,
    Read,
    Write,
    Browse,
    TranslateBrowsePathsToNodeIds,
    AddNodes,
    GetEndpoints,
    CreateSubscription,
    DeleteSubscriptions,
    CreateMonitoredItems,
    DeleteMonitoredItems,
    PublishRequest,
}

impl ServiceId {
    /// Looks up the service table entry for a decoded request type-id.
    /// `None` means "unknown service" (spec.md §4.4's `(unknown)` arm).
    pub fn from_node_id(node_id: NodeId) -> Option<Self> {
        use object_ids::*;
        if node_id.namespace != 0 {
            return None;
        }
        Some(match node_id.numeric {
            CREATE_SESSION_REQUEST => ServiceId::CreateSession,
            ACTIVATE_SESSION_REQUEST => ServiceId::ActivateSession,
            CLOSE_SESSION_REQUEST => ServiceId::CloseSession,
            READ_REQUEST => ServiceId::Read,
            WRITE_REQUEST => ServiceId::Write,
            BROWSE_REQUEST => ServiceId::Browse,
            TRANSLATE_BROWSE_PATHS_REQUEST => ServiceId::TranslateBrowsePathsToNodeIds,
            ADD_NODES_REQUEST => ServiceId::AddNodes,
            GET_ENDPOINTS_REQUEST => ServiceId::GetEndpoints,
            CREATE_SUBSCRIPTION_REQUEST => ServiceId::CreateSubscription,
            DELETE_SUBSCRIPTIONS_REQUEST => ServiceId::DeleteSubscriptions,
            CREATE_MONITORED_ITEMS_REQUEST => ServiceId::CreateMonitoredItems,
            DELETE_MONITORED_ITEMS_REQUEST => ServiceId::DeleteMonitoredItems,
            PUBLISH_REQUEST => ServiceId::PublishRequest,
            _ => return None,
        })
    }

    /// The `*_Encoding_DefaultBinary` NodeId this service's response body
    /// must be tagged with on the wire.
    pub fn response_node_id(self) -> NodeId {
        use object_ids::*;
        let numeric = match self {
            ServiceId::CreateSession => CREATE_SESSION_RESPONSE,
            ServiceId::ActivateSession => ACTIVATE_SESSION_RESPONSE,
            ServiceId::CloseSession => CLOSE_SESSION_RESPONSE,
            ServiceId::Read => READ_RESPONSE,
            ServiceId::Write => WRITE_RESPONSE,
            ServiceId::Browse => BROWSE_RESPONSE,
            ServiceId::TranslateBrowsePathsToNodeIds => TRANSLATE_BROWSE_PATHS_RESPONSE,
            ServiceId::AddNodes => ADD_NODES_RESPONSE,
            ServiceId::GetEndpoints => GET_ENDPOINTS_RESPONSE,
            ServiceId::CreateSubscription => CREATE_SUBSCRIPTION_RESPONSE,
            ServiceId::DeleteSubscriptions => DELETE_SUBSCRIPTIONS_RESPONSE,
            ServiceId::CreateMonitoredItems => CREATE_MONITORED_ITEMS_RESPONSE,
            ServiceId::DeleteMonitoredItems => DELETE_MONITORED_ITEMS_RESPONSE,
            ServiceId::PublishRequest => PUBLISH_RESPONSE,
        };
        NodeId::new(0, numeric)
    }
}
