// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! End-to-end scenario tests over a real [`opcua_processor_rs::processor::Processor`]
//! driven through an in-memory duplex pair (spec.md §8's testable properties
//! S1-S6). Each scenario hand-encodes client-side requests and hand-decodes
//! server-side replies with the raw codec primitives, since every wire
//! structure in this crate is one-directional.

mod support;

use opcua_processor_rs::{
    services::{ids::object_ids, subscription::MonitoredItemNotification},
    wire::{
        codec::{Decode, Decoder, Encode, Encoder},
        header::MessageType,
        node_id::NodeId,
        status_code::StatusCode,
    },
};
use support::{
    MockInternalServer, read_response_header, read_response_type_id, spawn_processor, write_request_header,
};

fn hello_body(buffer_size: u32) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.write_u32(0); // protocol version
    enc.write_u32(buffer_size);
    enc.write_u32(buffer_size);
    enc.write_u32(0);
    enc.write_u32(0);
    enc.write_string(Some("opc.tcp://localhost:4840"));
    enc.into_bytes().to_vec()
}

async fn do_handshake(client: &mut support::TestClient) {
    client.write_frame(MessageType::Hello, None, &hello_body(65536)).await;
    let frame = client.read_frame().await;
    assert_eq!(frame.header.message_type, MessageType::Acknowledge);
    let mut dec = Decoder::new(&frame.body);
    let _protocol_version = dec.read_u32().unwrap();
    let receive_buffer_size = dec.read_u32().unwrap();
    let send_buffer_size = dec.read_u32().unwrap();
    assert_eq!(receive_buffer_size, 65536);
    assert_eq!(send_buffer_size, 65536);
}

fn open_secure_channel_body(request_handle: u32, requested_lifetime_ms: u32) -> Vec<u8> {
    let mut enc = Encoder::new();
    // AsymmetricAlgorithmHeader.
    enc.write_string(Some("http://opcfoundation.org/UA/SecurityPolicy#None"));
    enc.write_byte_string(None);
    enc.write_byte_string(None);
    // SequenceHeader.
    enc.write_u32(1); // sequence number
    enc.write_u32(request_handle); // request id
    // OpenSecureChannelRequest.
    write_request_header(&mut enc, request_handle);
    enc.write_u32(0); // client protocol version
    enc.write_u32(0); // RequestType::Issue
    enc.write_u32(1); // SecurityMode
    enc.write_byte_string(None); // client nonce
    enc.write_u32(requested_lifetime_ms);
    enc.into_bytes().to_vec()
}

/// S1: Hello{recv=65536,send=65536} is answered with an Acknowledge that
/// echoes the same buffer sizes.
#[tokio::test]
async fn s1_handshake_echoes_buffer_sizes() {
    let internal_server = MockInternalServer::new();
    let mut client = spawn_processor(internal_server);
    do_handshake(&mut client).await;
}

/// S2: sending anything other than Hello first gets a single Error frame
/// and the connection closes without ever sending an Acknowledge.
#[tokio::test]
async fn s2_wrong_first_frame_is_rejected() {
    let internal_server = MockInternalServer::new();
    let mut client = spawn_processor(internal_server);

    client.write_frame(MessageType::SecureOpen, Some(1), &open_secure_channel_body(1, 60_000)).await;
    let frame = client.read_frame().await;
    assert_eq!(frame.header.message_type, MessageType::Error);

    // The connection tears down after the Error frame; nothing else arrives.
    let result = tokio::time::timeout(std::time::Duration::from_millis(200), client.read_frame()).await;
    assert!(result.is_err(), "no further frames should follow the Error reply");
}

/// S3: Hello/Ack, then SecureOpen{Issue} is answered with a server-assigned
/// channel id, a nonzero token id, the revised lifetime, and a server nonce
/// of at least 32 bytes; a matching SecureClose then ends the connection
/// with no reply.
#[tokio::test]
async fn s3_open_and_close_channel() {
    let internal_server = MockInternalServer::new();
    let mut client = spawn_processor(internal_server);
    do_handshake(&mut client).await;

    client.write_frame(MessageType::SecureOpen, None, &open_secure_channel_body(1, 600_000)).await;
    let frame = client.read_frame().await;
    assert_eq!(frame.header.message_type, MessageType::SecureOpen);
    let channel_id = frame.header.channel_id.expect("SecureOpen reply carries a channel id");

    let mut dec = Decoder::new(&frame.body);
    // AsymmetricAlgorithmHeader echoed back.
    let _security_policy_uri = dec.read_string().unwrap();
    let _sender_certificate = dec.read_byte_string().unwrap();
    let _receiver_certificate_thumbprint = dec.read_byte_string().unwrap();
    // SequenceHeader.
    let _sequence_number = dec.read_u32().unwrap();
    let _request_id = dec.read_u32().unwrap();
    // ResponseHeader.
    let (request_handle, service_result) = read_response_header(&mut dec);
    assert_eq!(request_handle, 1);
    assert_eq!(service_result, StatusCode::GOOD);
    let _server_protocol_version = dec.read_u32().unwrap();
    let reply_channel_id = dec.read_u32().unwrap();
    let token_id = dec.read_u32().unwrap();
    let _created_at = dec.read_i64().unwrap();
    let revised_lifetime_ms = dec.read_u32().unwrap();
    let server_nonce = dec.read_byte_string().unwrap().unwrap();

    assert_eq!(reply_channel_id, channel_id);
    assert_ne!(token_id, 0);
    assert_eq!(revised_lifetime_ms, 600_000);
    assert!(server_nonce.len() >= 32);

    // SecureClose with the matching channel id.
    let mut enc = Encoder::new();
    enc.write_u32(token_id); // SymmetricAlgorithmHeader
    enc.write_u32(2); // sequence number
    enc.write_u32(2); // request id
    write_request_header(&mut enc, 2);
    let close_body = enc.into_bytes();
    client.write_frame(MessageType::SecureClose, Some(channel_id), &close_body).await;

    let result = tokio::time::timeout(std::time::Duration::from_millis(200), client.read_frame()).await;
    assert!(result.is_err(), "SecureClose must not produce a reply");
}

fn secure_message_body(token_id: u32, request_id: u32, service_body: &[u8]) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.write_u32(token_id); // SymmetricAlgorithmHeader
    enc.write_u32(request_id); // sequence number
    enc.write_u32(request_id); // request id
    enc.write_raw(service_body);
    enc.into_bytes().to_vec()
}

async fn open_channel(client: &mut support::TestClient) -> (u32, u32) {
    client.write_frame(MessageType::SecureOpen, None, &open_secure_channel_body(1, 600_000)).await;
    let frame = client.read_frame().await;
    let channel_id = frame.header.channel_id.unwrap();
    let mut dec = Decoder::new(&frame.body);
    let _ = dec.read_string().unwrap();
    let _ = dec.read_byte_string().unwrap();
    let _ = dec.read_byte_string().unwrap();
    let _ = dec.read_u32().unwrap();
    let _ = dec.read_u32().unwrap();
    let _ = read_response_header(&mut dec);
    let _ = dec.read_u32().unwrap();
    let _ = dec.read_u32().unwrap();
    let token_id = dec.read_u32().unwrap();
    (channel_id, token_id)
}

fn create_session_request_body(request_handle: u32, session_name: &str) -> Vec<u8> {
    let mut enc = Encoder::new();
    NodeId::new(0, object_ids::CREATE_SESSION_REQUEST).encode(&mut enc);
    write_request_header(&mut enc, request_handle);
    for _ in 0..5 {
        enc.write_string(None);
    }
    enc.write_u32(0);
    enc.write_string(None);
    enc.write_i32_array(&[]);
    enc.write_string(None);
    enc.write_string(None);
    enc.write_string(Some(session_name));
    enc.write_byte_string(None);
    enc.write_byte_string(None);
    enc.write_u64(30_000.0_f64.to_bits());
    enc.write_u32(1 << 20);
    enc.into_bytes().to_vec()
}

/// S4: CreateSession/ActivateSession/CloseSession each echo the request
/// handle they carried and report `Good`.
#[tokio::test]
async fn s4_create_activate_close_session() {
    let internal_server = MockInternalServer::new();
    let mut client = spawn_processor(internal_server);
    do_handshake(&mut client).await;
    let (channel_id, token_id) = open_channel(&mut client).await;

    // CreateSession(handle=7).
    let body = secure_message_body(token_id, 7, &create_session_request_body(7, "s4-session"));
    client.write_frame(MessageType::SecureMessage, Some(channel_id), &body).await;
    let frame = client.read_frame().await;
    assert_eq!(frame.header.message_type, MessageType::SecureMessage);
    let mut dec = Decoder::new(&frame.body);
    let _token_id = dec.read_u32().unwrap();
    let seq_create = dec.read_u32().unwrap();
    let _req_id = dec.read_u32().unwrap();
    let type_id = read_response_type_id(&mut dec);
    assert_eq!(type_id, NodeId::new(0, object_ids::CREATE_SESSION_RESPONSE));
    let (request_handle, service_result) = read_response_header(&mut dec);
    assert_eq!(request_handle, 7);
    assert_eq!(service_result, StatusCode::GOOD);

    // ActivateSession(handle=8).
    let mut activate = Encoder::new();
    NodeId::new(0, object_ids::ACTIVATE_SESSION_REQUEST).encode(&mut activate);
    write_request_header(&mut activate, 8);
    activate.write_string(None); // signature algorithm
    activate.write_byte_string(None); // signature
    activate.write_i32(0); // client software certificates
    activate.write_i32(0); // locale ids
    opcua_processor_rs::services::common::write_null_extension_object(&mut activate); // user identity token
    activate.write_string(None); // user token signature algorithm
    activate.write_byte_string(None); // user token signature
    let body = secure_message_body(token_id, 8, &activate.into_bytes());
    client.write_frame(MessageType::SecureMessage, Some(channel_id), &body).await;
    let frame = client.read_frame().await;
    let mut dec = Decoder::new(&frame.body);
    let _token_id = dec.read_u32().unwrap();
    let seq_activate = dec.read_u32().unwrap();
    let _req_id = dec.read_u32().unwrap();
    let type_id = read_response_type_id(&mut dec);
    assert_eq!(type_id, NodeId::new(0, object_ids::ACTIVATE_SESSION_RESPONSE));
    let (request_handle, service_result) = read_response_header(&mut dec);
    assert_eq!(request_handle, 8);
    assert_eq!(service_result, StatusCode::GOOD);
    assert_eq!(seq_activate, seq_create + 1, "outgoing sequence numbers must be gapless (spec.md §8 property 2)");

    // CloseSession(handle=9, deleteSubscriptions=true).
    let mut close = Encoder::new();
    NodeId::new(0, object_ids::CLOSE_SESSION_REQUEST).encode(&mut close);
    write_request_header(&mut close, 9);
    close.write_bool(true);
    let body = secure_message_body(token_id, 9, &close.into_bytes());
    client.write_frame(MessageType::SecureMessage, Some(channel_id), &body).await;
    let frame = client.read_frame().await;
    let mut dec = Decoder::new(&frame.body);
    let _token_id = dec.read_u32().unwrap();
    let seq_close = dec.read_u32().unwrap();
    let _req_id = dec.read_u32().unwrap();
    let type_id = read_response_type_id(&mut dec);
    assert_eq!(type_id, NodeId::new(0, object_ids::CLOSE_SESSION_RESPONSE));
    let (request_handle, service_result) = read_response_header(&mut dec);
    assert_eq!(request_handle, 9);
    assert_eq!(service_result, StatusCode::GOOD);
    assert_eq!(seq_close, seq_activate + 1, "outgoing sequence numbers must be gapless (spec.md §8 property 2)");
}

fn publish_request_body(request_handle: u32) -> Vec<u8> {
    let mut enc = Encoder::new();
    NodeId::new(0, object_ids::PUBLISH_REQUEST).encode(&mut enc);
    write_request_header(&mut enc, request_handle);
    enc.write_i32(0); // subscription acknowledgements
    enc.into_bytes().to_vec()
}

fn create_subscription_request_body(request_handle: u32) -> Vec<u8> {
    let mut enc = Encoder::new();
    NodeId::new(0, object_ids::CREATE_SUBSCRIPTION_REQUEST).encode(&mut enc);
    write_request_header(&mut enc, request_handle);
    enc.write_u64(1000.0_f64.to_bits());
    enc.write_u32(60);
    enc.write_u32(20);
    enc.write_u32(0);
    enc.write_bool(true);
    enc.write_u8(0);
    enc.into_bytes().to_vec()
}

/// S5: two PublishRequests are paired with two notifications in submission
/// order, with the resulting PublishResponses carrying successive sequence
/// numbers and each one's request handle.
#[tokio::test]
async fn s5_publish_requests_pair_with_notifications_in_order() {
    let internal_server = MockInternalServer::new();
    let session = std::sync::Arc::clone(&internal_server.session);
    let mut client = spawn_processor(internal_server);
    do_handshake(&mut client).await;
    let (channel_id, token_id) = open_channel(&mut client).await;

    let body = secure_message_body(token_id, 7, &create_session_request_body(7, "s5-session"));
    client.write_frame(MessageType::SecureMessage, Some(channel_id), &body).await;
    let _ = client.read_frame().await;

    let body = secure_message_body(token_id, 10, &create_subscription_request_body(10));
    client.write_frame(MessageType::SecureMessage, Some(channel_id), &body).await;
    let _ = client.read_frame().await;

    session
        .queue_notification(opcua_processor_rs::services::subscription::NotificationMessage {
            sequence_number: 1,
            notifications: vec![MonitoredItemNotification {
                client_handle: 1,
                value: opcua_processor_rs::services::attributes::DataValue { status: StatusCode::GOOD, value: None },
            }],
        })
        .await;
    session
        .queue_notification(opcua_processor_rs::services::subscription::NotificationMessage {
            sequence_number: 2,
            notifications: vec![MonitoredItemNotification {
                client_handle: 1,
                value: opcua_processor_rs::services::attributes::DataValue { status: StatusCode::GOOD, value: None },
            }],
        })
        .await;

    let body = secure_message_body(token_id, 20, &publish_request_body(20));
    client.write_frame(MessageType::SecureMessage, Some(channel_id), &body).await;
    let body = secure_message_body(token_id, 21, &publish_request_body(21));
    client.write_frame(MessageType::SecureMessage, Some(channel_id), &body).await;

    let frame = client.read_frame().await;
    let mut dec = Decoder::new(&frame.body);
    let _token_id = dec.read_u32().unwrap();
    let _seq = dec.read_u32().unwrap();
    let _req_id = dec.read_u32().unwrap();
    let type_id = read_response_type_id(&mut dec);
    assert_eq!(type_id, NodeId::new(0, object_ids::PUBLISH_RESPONSE));
    let (request_handle, service_result) = read_response_header(&mut dec);
    assert_eq!(request_handle, 20);
    assert_eq!(service_result, StatusCode::GOOD);
    let _subscription_id = dec.read_u32().unwrap();
    let available = dec.read_i32_array().unwrap();
    assert_eq!(available, vec![1]);

    let frame = client.read_frame().await;
    let mut dec = Decoder::new(&frame.body);
    let _token_id = dec.read_u32().unwrap();
    let _seq = dec.read_u32().unwrap();
    let _req_id = dec.read_u32().unwrap();
    let type_id = read_response_type_id(&mut dec);
    assert_eq!(type_id, NodeId::new(0, object_ids::PUBLISH_RESPONSE));
    let (request_handle, service_result) = read_response_header(&mut dec);
    assert_eq!(request_handle, 21);
    assert_eq!(service_result, StatusCode::GOOD);
    let _subscription_id = dec.read_u32().unwrap();
    let available = dec.read_i32_array().unwrap();
    assert_eq!(available, vec![2]);
}

/// S6: a request with an unrecognised type-id gets a ServiceFault carrying
/// the original request handle and `BadNotImplemented`.
#[tokio::test]
async fn s6_unknown_service_is_a_service_fault() {
    let internal_server = MockInternalServer::new();
    let mut client = spawn_processor(internal_server);
    do_handshake(&mut client).await;
    let (channel_id, token_id) = open_channel(&mut client).await;

    let mut unknown = Encoder::new();
    NodeId::new(0, 99_999).encode(&mut unknown); // not in the service table
    write_request_header(&mut unknown, 99);
    let body = secure_message_body(token_id, 99, &unknown.into_bytes());
    client.write_frame(MessageType::SecureMessage, Some(channel_id), &body).await;

    let frame = client.read_frame().await;
    let mut dec = Decoder::new(&frame.body);
    let _token_id = dec.read_u32().unwrap();
    let _seq = dec.read_u32().unwrap();
    let _req_id = dec.read_u32().unwrap();
    let type_id = read_response_type_id(&mut dec);
    assert_eq!(type_id, NodeId::new(0, object_ids::SERVICE_FAULT));
    let (request_handle, service_result) = read_response_header(&mut dec);
    assert_eq!(request_handle, 99);
    assert_eq!(service_result, StatusCode::BAD_NOT_IMPLEMENTED);
}
