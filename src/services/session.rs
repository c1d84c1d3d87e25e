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

/// `CreateSessionRequest` (spec.md §4.4 dispatch table). Client-supplied
/// security material (certificate, nonce) is carried through opaquely; this
/// processor does not validate application instance certificates.
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub request_header: RequestHeader,
    pub client_description_application_uri: Option<String>,
    pub server_uri: Option<String>,
    pub endpoint_url: Option<String>,
    pub session_name: Option<String>,
    pub client_nonce: Option<Vec<u8>>,
    pub client_certificate: Option<Vec<u8>>,
    pub requested_session_timeout: f64,
    pub max_response_message_size: u32,
}

impl Decode for CreateSessionRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        // ClientDescription (ApplicationDescription): ApplicationUri first,
        // then five more fields this processor never inspects.
        let client_description_application_uri = dec.read_string()?;
        let _product_uri = dec.read_string()?;
        let _application_name_locale = dec.read_string()?;
        let _application_name_text = dec.read_string()?;
        let _application_type = dec.read_u32()?;
        let _gateway_server_uri = dec.read_string()?;
        let _discovery_profile_uri = dec.read_string()?;
        let _discovery_urls = dec.read_array(|d| d.read_string())?;
        let server_uri = dec.read_string()?;
        let endpoint_url = dec.read_string()?;
        let session_name = dec.read_string()?;
        let client_nonce = dec.read_byte_string()?;
        let client_certificate = dec.read_byte_string()?;
        let requested_session_timeout = f64::from_bits(dec.read_u64()?);
        let max_response_message_size = dec.read_u32()?;
        Ok(CreateSessionRequest {
            request_header,
            client_description_application_uri,
            server_uri,
            endpoint_url,
            session_name,
            client_nonce,
            client_certificate,
            requested_session_timeout,
            max_response_message_size,
        })
    }
}

/// `CreateSessionResponse`. `session_id`/`authentication_token` are the
/// values the facade issues (spec.md §6 `SessionFacade::create_session`);
/// `server_nonce` comes from [`crate::utils::generate_server_nonce`].
#[derive(Debug, Clone)]
pub struct CreateSessionResponse {
    pub response_header: ResponseHeader,
    pub session_id: NodeId,
    pub authentication_token: NodeId,
    pub revised_session_timeout: f64,
    pub server_nonce: Vec<u8>,
    pub server_certificate: Option<Vec<u8>>,
    pub max_request_message_size: u32,
}

impl Encode for CreateSessionResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        self.session_id.encode(enc);
        self.authentication_token.encode(enc);
        enc.write_u64(self.revised_session_timeout.to_bits());
        enc.write_byte_string(Some(&self.server_nonce));
        enc.write_byte_string(self.server_certificate.as_deref());
        // ServerEndpoints, ServerSoftwareCertificates, SignedSoftwareCertificate,
        // ServerSignature: this processor negotiates neither, so all three
        // arrays/records are empty/absent.
        enc.write_array(&Vec::<()>::new(), |_, _: &()| {});
        enc.write_array(&Vec::<()>::new(), |_, _: &()| {});
        enc.write_byte_string(None);
        enc.write_string(None);
        enc.write_u32(self.max_request_message_size);
    }
}

/// `ActivateSessionRequest`.
#[derive(Debug, Clone)]
pub struct ActivateSessionRequest {
    pub request_header: RequestHeader,
    pub locale_ids: Vec<String>,
}

impl Decode for ActivateSessionRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        // ClientSignature (SignatureData: Algorithm, Signature).
        let _signature_algorithm = dec.read_string()?;
        let _signature = dec.read_byte_string()?;
        // ClientSoftwareCertificates: array of SignedSoftwareCertificate,
        // each a ByteString pair. This processor accepts none.
        let _client_software_certificates = dec.read_array(|d| {
            let _cert = d.read_byte_string()?;
            let _sig = d.read_byte_string()?;
            Ok(())
        })?;
        let locale_ids = dec
            .read_array(|d| d.read_string())?
            .into_iter()
            .flatten()
            .collect();
        // UserIdentityToken (ExtensionObject) + UserTokenSignature: this
        // processor accepts anonymous identity only and does not inspect it.
        crate::services::common::skip_extension_object(dec)?;
        let _user_token_signature_algorithm = dec.read_string()?;
        let _user_token_signature = dec.read_byte_string()?;
        Ok(ActivateSessionRequest { request_header, locale_ids })
    }
}

/// `ActivateSessionResponse`.
#[derive(Debug, Clone)]
pub struct ActivateSessionResponse {
    pub response_header: ResponseHeader,
    pub server_nonce: Vec<u8>,
}

impl Encode for ActivateSessionResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        enc.write_byte_string(Some(&self.server_nonce));
        // Results / DiagnosticInfos for the (empty) software certificate
        // list: both arrays absent.
        enc.write_i32_array(&[]);
        enc.write_array(&Vec::<()>::new(), |_, _: &()| {});
    }
}

/// `CloseSessionRequest`.
#[derive(Debug, Clone)]
pub struct CloseSessionRequest {
    pub request_header: RequestHeader,
    pub delete_subscriptions: bool,
}

impl Decode for CloseSessionRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        let delete_subscriptions = dec.read_bool()?;
        Ok(CloseSessionRequest { request_header, delete_subscriptions })
    }
}

/// `CloseSessionResponse`: bare response header, no body fields.
#[derive(Debug, Clone)]
pub struct CloseSessionResponse {
    pub response_header: ResponseHeader,
}

impl Encode for CloseSessionResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
    }
}

/// `GetEndpointsRequest`.
#[derive(Debug, Clone)]
pub struct GetEndpointsRequest {
    pub request_header: RequestHeader,
    pub endpoint_url: Option<String>,
}

impl Decode for GetEndpointsRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        let endpoint_url = dec.read_string()?;
        let _locale_ids = dec.read_array(|d| d.read_string())?;
        let _profile_uris = dec.read_array(|d| d.read_string())?;
        Ok(GetEndpointsRequest { request_header, endpoint_url })
    }
}

/// A single advertised endpoint (`EndpointDescription`, trimmed to the
/// fields spec.md §6's `InternalServer::get_endpoints` actually supplies).
#[derive(Debug, Clone)]
pub struct EndpointDescription {
    pub endpoint_url: String,
    pub security_policy_uri: String,
    pub security_mode_none: bool,
}

impl Encode for EndpointDescription {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_string(Some(&self.endpoint_url));
        // Server ApplicationDescription: seven fields, none of which this
        // processor's minimal advertisement populates.
        for _ in 0..7 {
            enc.write_string(None);
        }
        enc.write_byte_string(None); // ServerCertificate
        enc.write_u32(if self.security_mode_none { 1 } else { 3 }); // MessageSecurityMode
        enc.write_string(Some(&self.security_policy_uri));
        enc.write_array(&Vec::<()>::new(), |_, _: &()| {}); // UserIdentityTokens
        enc.write_string(Some("http://opcfoundation.org/UA-Profile/Transport/uatcp-uasc-uabinary"));
        enc.write_u8(0); // SecurityLevel
    }
}

/// `GetEndpointsResponse`.
#[derive(Debug, Clone)]
pub struct GetEndpointsResponse {
    pub response_header: ResponseHeader,
    pub endpoints: Vec<EndpointDescription>,
}

impl Encode for GetEndpointsResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        enc.write_array(&self.endpoints, |e, ep| ep.encode(e));
    }
}

impl ResponseHeader {
    /// Convenience used by every service handler that needs to answer a
    /// `BadSessionIdInvalid`/`BadNotImplemented` fault without a full body
    /// (spec.md §4.4 "unknown session" and "unimplemented service" arms).
    pub fn fault(request_handle: u32, result: StatusCode) -> Self {
        ResponseHeader::for_request(request_handle).with_result(result)
    }
}
