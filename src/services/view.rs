// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;

use crate::{
    services::common::{RequestHeader, ResponseHeader},
    wire::{
        codec::{Decode, Decoder, Encode, Encoder},
        node_id::NodeId,
        status_code::StatusCode,
    },
};

/// A `BrowseDescription`: the node to browse from plus the reference/result
/// filters (Part 4 §7.4), trimmed to what [`crate::facade::SessionFacade::
/// browse`] needs.
#[derive(Debug, Clone)]
pub struct BrowseDescription {
    pub node_id: NodeId,
    pub browse_direction: u32,
    pub reference_type_id: NodeId,
    pub include_subtypes: bool,
    pub node_class_mask: u32,
    pub result_mask: u32,
}

impl Decode for BrowseDescription {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        Ok(BrowseDescription {
            node_id: NodeId::decode(dec)?,
            browse_direction: dec.read_u32()?,
            reference_type_id: NodeId::decode(dec)?,
            include_subtypes: dec.read_bool()?,
            node_class_mask: dec.read_u32()?,
            result_mask: dec.read_u32()?,
        })
    }
}

/// `BrowseRequest`. `view` (the `ViewDescription`) is decoded and discarded
/// — this processor only ever browses the default view.
#[derive(Debug, Clone)]
pub struct BrowseRequest {
    pub request_header: RequestHeader,
    pub requested_max_references_per_node: u32,
    pub nodes_to_browse: Vec<BrowseDescription>,
}

impl Decode for BrowseRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        let _view_id = NodeId::decode(dec)?;
        let _view_timestamp = dec.read_i64()?;
        let _view_version = dec.read_u32()?;
        let requested_max_references_per_node = dec.read_u32()?;
        let nodes_to_browse = dec.read_array(BrowseDescription::decode)?;
        Ok(BrowseRequest {
            request_header,
            requested_max_references_per_node,
            nodes_to_browse,
        })
    }
}

/// A single `ReferenceDescription` in a `BrowseResult`.
#[derive(Debug, Clone)]
pub struct ReferenceDescription {
    pub reference_type_id: NodeId,
    pub is_forward: bool,
    pub target_node_id: NodeId,
    pub browse_name: String,
    pub display_name: String,
    pub node_class: u32,
}

impl Encode for ReferenceDescription {
    fn encode(&self, enc: &mut Encoder) {
        self.reference_type_id.encode(enc);
        enc.write_bool(self.is_forward);
        // ExpandedNodeId: NodeId plus NamespaceUri/ServerIndex, both absent.
        self.target_node_id.encode(enc);
        enc.write_u16(0); // BrowseName.NamespaceIndex
        enc.write_string(Some(&self.browse_name));
        enc.write_u32(0); // DisplayName.Locale encoding mask: none
        enc.write_string(Some(&self.display_name));
        enc.write_u32(self.node_class);
        // TypeDefinition (ExpandedNodeId), left at the null NodeId.
        NodeId::new(0, 0).encode(enc);
    }
}

/// One `BrowseResult` per requested node.
#[derive(Debug, Clone)]
pub struct BrowseResult {
    pub status: StatusCode,
    pub references: Vec<ReferenceDescription>,
}

impl Encode for BrowseResult {
    fn encode(&self, enc: &mut Encoder) {
        self.status.encode(enc);
        enc.write_byte_string(None); // ContinuationPoint: this processor never pages
        enc.write_array(&self.references, |e, r| r.encode(e));
    }
}

/// `BrowseResponse`.
#[derive(Debug, Clone)]
pub struct BrowseResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<BrowseResult>,
}

impl Encode for BrowseResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        enc.write_array(&self.results, |e, r| r.encode(e));
        enc.write_array(&Vec::<()>::new(), |_, _: &()| {}); // DiagnosticInfos
    }
}

/// A single element of a `BrowsePath` (Part 4 §7.5): a qualified-name hop.
#[derive(Debug, Clone)]
pub struct RelativePathElement {
    pub reference_type_id: NodeId,
    pub is_inverse: bool,
    pub include_subtypes: bool,
    pub target_namespace: u16,
    pub target_name: Option<String>,
}

impl Decode for RelativePathElement {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        Ok(RelativePathElement {
            reference_type_id: NodeId::decode(dec)?,
            is_inverse: dec.read_bool()?,
            include_subtypes: dec.read_bool()?,
            target_namespace: dec.read_u16()?,
            target_name: dec.read_string()?,
        })
    }
}

/// A `BrowsePath`: starting node plus a relative path of qualified-name
/// hops to resolve.
#[derive(Debug, Clone)]
pub struct BrowsePath {
    pub starting_node: NodeId,
    pub relative_path: Vec<RelativePathElement>,
}

impl Decode for BrowsePath {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        Ok(BrowsePath {
            starting_node: NodeId::decode(dec)?,
            relative_path: dec.read_array(RelativePathElement::decode)?,
        })
    }
}

/// `TranslateBrowsePathsToNodeIdsRequest`.
#[derive(Debug, Clone)]
pub struct TranslateBrowsePathsToNodeIdsRequest {
    pub request_header: RequestHeader,
    pub browse_paths: Vec<BrowsePath>,
}

impl Decode for TranslateBrowsePathsToNodeIdsRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        let browse_paths = dec.read_array(BrowsePath::decode)?;
        Ok(TranslateBrowsePathsToNodeIdsRequest { request_header, browse_paths })
    }
}

/// A single resolved target in a `BrowsePathResult`.
#[derive(Debug, Clone)]
pub struct BrowsePathTarget {
    pub target_id: NodeId,
    pub remaining_path_index: u32,
}

impl Encode for BrowsePathTarget {
    fn encode(&self, enc: &mut Encoder) {
        self.target_id.encode(enc);
        enc.write_u32(0); // ExpandedNodeId.ServerIndex
        enc.write_u32(self.remaining_path_index);
    }
}

/// One `BrowsePathResult` per requested browse path.
#[derive(Debug, Clone)]
pub struct BrowsePathResult {
    pub status: StatusCode,
    pub targets: Vec<BrowsePathTarget>,
}

impl Encode for BrowsePathResult {
    fn encode(&self, enc: &mut Encoder) {
        self.status.encode(enc);
        enc.write_array(&self.targets, |e, t| t.encode(e));
    }
}

/// `TranslateBrowsePathsToNodeIdsResponse`.
#[derive(Debug, Clone)]
pub struct TranslateBrowsePathsToNodeIdsResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<BrowsePathResult>,
}

impl Encode for TranslateBrowsePathsToNodeIdsResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        enc.write_array(&self.results, |e, r| r.encode(e));
        enc.write_array(&Vec::<()>::new(), |_, _: &()| {}); // DiagnosticInfos
    }
}

/// An `AddNodesItem` (Part 4 §7.2): the parent/reference to attach under
/// plus the new node's requested id and browse name. Attribute payloads
/// (`NodeAttributes`, a polymorphic `ExtensionObject`) are out of scope —
/// this processor creates nodes with their type's default attribute set.
#[derive(Debug, Clone)]
pub struct AddNodesItem {
    pub parent_node_id: NodeId,
    pub reference_type_id: NodeId,
    pub requested_new_node_id: NodeId,
    pub browse_name: Option<String>,
    pub node_class: u32,
    pub type_definition: NodeId,
}

impl Decode for AddNodesItem {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let parent_node_id = NodeId::decode(dec)?;
        let reference_type_id = NodeId::decode(dec)?;
        let requested_new_node_id = NodeId::decode(dec)?;
        let _expanded_server_index = dec.read_u32()?;
        let _browse_name_ns = dec.read_u16()?;
        let browse_name = dec.read_string()?;
        let node_class = dec.read_u32()?;
        crate::services::common::skip_extension_object(dec)?;
        let type_definition = NodeId::decode(dec)?;
        let _type_definition_server_index = dec.read_u32()?;
        Ok(AddNodesItem {
            parent_node_id,
            reference_type_id,
            requested_new_node_id,
            browse_name,
            node_class,
            type_definition,
        })
    }
}

/// `AddNodesRequest`.
#[derive(Debug, Clone)]
pub struct AddNodesRequest {
    pub request_header: RequestHeader,
    pub nodes_to_add: Vec<AddNodesItem>,
}

impl Decode for AddNodesRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        let nodes_to_add = dec.read_array(AddNodesItem::decode)?;
        Ok(AddNodesRequest { request_header, nodes_to_add })
    }
}

/// One `AddNodesResult` per requested node.
#[derive(Debug, Clone)]
pub struct AddNodesResult {
    pub status: StatusCode,
    pub added_node_id: NodeId,
}

impl Encode for AddNodesResult {
    fn encode(&self, enc: &mut Encoder) {
        self.status.encode(enc);
        self.added_node_id.encode(enc);
    }
}

/// `AddNodesResponse`.
#[derive(Debug, Clone)]
pub struct AddNodesResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<AddNodesResult>,
}

impl Encode for AddNodesResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        enc.write_array(&self.results, |e, r| r.encode(e));
        enc.write_array(&Vec::<()>::new(), |_, _: &()| {}); // DiagnosticInfos
    }
}
