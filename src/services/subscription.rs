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

/// `CreateSubscriptionRequest` (Part 4 §5.13.2).
#[derive(Debug, Clone)]
pub struct CreateSubscriptionRequest {
    pub request_header: RequestHeader,
    pub requested_publishing_interval: f64,
    pub requested_lifetime_count: u32,
    pub requested_max_keep_alive_count: u32,
    pub max_notifications_per_publish: u32,
    pub publishing_enabled: bool,
    pub priority: u8,
}

impl Decode for CreateSubscriptionRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        let requested_publishing_interval = f64::from_bits(dec.read_u64()?);
        let requested_lifetime_count = dec.read_u32()?;
        let requested_max_keep_alive_count = dec.read_u32()?;
        let max_notifications_per_publish = dec.read_u32()?;
        let publishing_enabled = dec.read_bool()?;
        let priority = dec.read_u8()?;
        Ok(CreateSubscriptionRequest {
            request_header,
            requested_publishing_interval,
            requested_lifetime_count,
            requested_max_keep_alive_count,
            max_notifications_per_publish,
            publishing_enabled,
            priority,
        })
    }
}

/// `CreateSubscriptionResponse`.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionResponse {
    pub response_header: ResponseHeader,
    pub subscription_id: u32,
    pub revised_publishing_interval: f64,
    pub revised_lifetime_count: u32,
    pub revised_max_keep_alive_count: u32,
}

impl Encode for CreateSubscriptionResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        enc.write_u32(self.subscription_id);
        enc.write_u64(self.revised_publishing_interval.to_bits());
        enc.write_u32(self.revised_lifetime_count);
        enc.write_u32(self.revised_max_keep_alive_count);
    }
}

/// `DeleteSubscriptionsRequest`.
#[derive(Debug, Clone)]
pub struct DeleteSubscriptionsRequest {
    pub request_header: RequestHeader,
    pub subscription_ids: Vec<i32>,
}

impl Decode for DeleteSubscriptionsRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        let subscription_ids = dec.read_i32_array()?;
        Ok(DeleteSubscriptionsRequest { request_header, subscription_ids })
    }
}

/// `DeleteSubscriptionsResponse`.
#[derive(Debug, Clone)]
pub struct DeleteSubscriptionsResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<StatusCode>,
}

impl Encode for DeleteSubscriptionsResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        enc.write_array(&self.results, |e, s| s.encode(e));
        enc.write_array(&Vec::<()>::new(), |_, _: &()| {}); // DiagnosticInfos
    }
}

/// A `MonitoredItemCreateRequest` (Part 4 §7.20), trimmed to the fields
/// [`crate::facade::SessionFacade::create_monitored_items`] needs.
#[derive(Debug, Clone)]
pub struct MonitoredItemCreateRequest {
    pub node_id: NodeId,
    pub attribute_id: u32,
    pub monitoring_mode: u32,
    pub sampling_interval: f64,
    pub queue_size: u32,
    pub discard_oldest: bool,
}

impl Decode for MonitoredItemCreateRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let node_id = NodeId::decode(dec)?;
        let attribute_id = dec.read_u32()?;
        let _index_range = dec.read_string()?;
        let _data_encoding_ns = dec.read_u16()?;
        let _data_encoding_name = dec.read_string()?;
        let monitoring_mode = dec.read_u32()?;
        let sampling_interval = f64::from_bits(dec.read_u64()?);
        // Filter (ExtensionObject): this processor supports no event/deadband
        // filters, only plain data-change monitoring.
        crate::services::common::skip_extension_object(dec)?;
        let queue_size = dec.read_u32()?;
        let discard_oldest = dec.read_bool()?;
        Ok(MonitoredItemCreateRequest {
            node_id,
            attribute_id,
            monitoring_mode,
            sampling_interval,
            queue_size,
            discard_oldest,
        })
    }
}

/// `CreateMonitoredItemsRequest`.
#[derive(Debug, Clone)]
pub struct CreateMonitoredItemsRequest {
    pub request_header: RequestHeader,
    pub subscription_id: u32,
    pub items_to_create: Vec<MonitoredItemCreateRequest>,
}

impl Decode for CreateMonitoredItemsRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        let subscription_id = dec.read_u32()?;
        let _timestamps_to_return = dec.read_u32()?;
        let items_to_create = dec.read_array(MonitoredItemCreateRequest::decode)?;
        Ok(CreateMonitoredItemsRequest { request_header, subscription_id, items_to_create })
    }
}

/// One `MonitoredItemCreateResult`.
#[derive(Debug, Clone)]
pub struct MonitoredItemCreateResult {
    pub status: StatusCode,
    pub monitored_item_id: u32,
    pub revised_sampling_interval: f64,
    pub revised_queue_size: u32,
}

impl Encode for MonitoredItemCreateResult {
    fn encode(&self, enc: &mut Encoder) {
        self.status.encode(enc);
        enc.write_u32(self.monitored_item_id);
        enc.write_u64(self.revised_sampling_interval.to_bits());
        enc.write_u32(self.revised_queue_size);
        crate::services::common::write_null_extension_object(enc); // FilterResult
    }
}

/// `CreateMonitoredItemsResponse`.
#[derive(Debug, Clone)]
pub struct CreateMonitoredItemsResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<MonitoredItemCreateResult>,
}

impl Encode for CreateMonitoredItemsResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        enc.write_array(&self.results, |e, r| r.encode(e));
        enc.write_array(&Vec::<()>::new(), |_, _: &()| {}); // DiagnosticInfos
    }
}

/// `DeleteMonitoredItemsRequest`.
#[derive(Debug, Clone)]
pub struct DeleteMonitoredItemsRequest {
    pub request_header: RequestHeader,
    pub subscription_id: u32,
    pub monitored_item_ids: Vec<i32>,
}

impl Decode for DeleteMonitoredItemsRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        let subscription_id = dec.read_u32()?;
        let monitored_item_ids = dec.read_i32_array()?;
        Ok(DeleteMonitoredItemsRequest { request_header, subscription_id, monitored_item_ids })
    }
}

/// `DeleteMonitoredItemsResponse`.
#[derive(Debug, Clone)]
pub struct DeleteMonitoredItemsResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<StatusCode>,
}

impl Encode for DeleteMonitoredItemsResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        enc.write_array(&self.results, |e, s| s.encode(e));
        enc.write_array(&Vec::<()>::new(), |_, _: &()| {}); // DiagnosticInfos
    }
}

/// A client's acknowledgement of a previously delivered sequence number
/// (Part 4 §5.13.5), carried in every `PublishRequest`.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionAcknowledgement {
    pub subscription_id: u32,
    pub sequence_number: u32,
}

impl Decode for SubscriptionAcknowledgement {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        Ok(SubscriptionAcknowledgement {
            subscription_id: dec.read_u32()?,
            sequence_number: dec.read_u32()?,
        })
    }
}

/// `PublishRequest`. Carries no data of its own beyond acknowledgements —
/// the dispatcher does not answer it immediately but enqueues a
/// [`crate::publish::PublishRequestSlot`] for the publish queue to drain
/// (spec.md §5 Publish/Notification model).
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub request_header: RequestHeader,
    pub subscription_acknowledgements: Vec<SubscriptionAcknowledgement>,
}

impl Decode for PublishRequest {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let request_header = RequestHeader::decode(dec)?;
        let subscription_acknowledgements = dec.read_array(SubscriptionAcknowledgement::decode)?;
        Ok(PublishRequest { request_header, subscription_acknowledgements })
    }
}

/// A single data-change notification value, keyed by its monitored item.
#[derive(Debug, Clone)]
pub struct MonitoredItemNotification {
    pub client_handle: u32,
    pub value: crate::services::attributes::DataValue,
}

impl Encode for MonitoredItemNotification {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u32(self.client_handle);
        self.value.encode(enc);
    }
}

/// A `NotificationMessage`: one batch of data-change notifications
/// delivered in response to a queued publish request (spec.md §5).
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub sequence_number: u32,
    pub notifications: Vec<MonitoredItemNotification>,
}

impl Encode for NotificationMessage {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u32(self.sequence_number);
        enc.write_i64(0); // PublishTime
        // NotificationData: one DataChangeNotification ExtensionObject, with
        // the items inlined as its body since this processor never needs to
        // round-trip a second decoder over its own output.
        if self.notifications.is_empty() {
            enc.write_array(&Vec::<()>::new(), |_, _: &()| {});
        } else {
            enc.write_i32(1);
            crate::services::common::write_null_extension_object(enc);
            enc.write_array(&self.notifications, |e, n| n.encode(e));
            enc.write_array(&Vec::<()>::new(), |_, _: &()| {}); // EventNotificationList events
        }
    }
}

/// `PublishResponse`.
#[derive(Debug, Clone)]
pub struct PublishResponse {
    pub response_header: ResponseHeader,
    pub subscription_id: u32,
    pub available_sequence_numbers: Vec<i32>,
    pub more_notifications: bool,
    pub notification_message: NotificationMessage,
    pub results: Vec<StatusCode>,
}

impl Encode for PublishResponse {
    fn encode(&self, enc: &mut Encoder) {
        self.response_header.encode(enc);
        enc.write_u32(self.subscription_id);
        enc.write_i32_array(&self.available_sequence_numbers);
        enc.write_bool(self.more_notifications);
        self.notification_message.encode(enc);
        enc.write_array(&self.results, |e, s| s.encode(e));
        enc.write_array(&Vec::<()>::new(), |_, _: &()| {}); // DiagnosticInfos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_acknowledgement_round_trips() {
        let mut enc = Encoder::new();
        enc.write_u32(3);
        enc.write_u32(9);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let ack = SubscriptionAcknowledgement::decode(&mut dec).unwrap();
        assert_eq!(ack.subscription_id, 3);
        assert_eq!(ack.sequence_number, 9);
    }

    #[test]
    fn empty_notification_message_encodes_empty_array() {
        let msg = NotificationMessage { sequence_number: 1, notifications: Vec::new() };
        let mut enc = Encoder::new();
        msg.encode(&mut enc);
        assert!(enc.len() > 0);
    }
}
