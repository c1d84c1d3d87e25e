// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

/// Runtime configuration for a single bound endpoint's protocol processor.
///
/// Unlike the OPC UA wire parameters exchanged during Hello/SecureOpen
/// (which are per-connection and negotiated live), this struct carries the
/// server-side policy knobs spec.md leaves as "no capping in this core" /
/// "acceptable extension point" (see SPEC_FULL.md §AMBIENT/A.3).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ProcessorConfig {
    /// Buffer-size negotiation limits applied to the Hello/Acknowledge
    /// exchange.
    pub buffers: BufferLimits,
    /// Secure-channel token bookkeeping policy.
    pub channel: ChannelLimits,
    /// Publish-queue flow control.
    pub publish: PublishLimits,
    /// I/O timeouts applied to every blocking read/write.
    pub io: IoLimits,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BufferLimits {
    #[serde(rename = "MaxReceiveBufferSize")]
    /// Upper bound clamped onto the client's requested `ReceiveBufferSize`.
    pub max_receive_buffer_size: u32,
    #[serde(rename = "MaxSendBufferSize")]
    /// Upper bound clamped onto the client's requested `SendBufferSize`.
    pub max_send_buffer_size: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ChannelLimits {
    #[serde(rename = "MinServerNonceLength")]
    /// Minimum number of CSPRNG bytes in a freshly issued `server_nonce`.
    pub min_server_nonce_length: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PublishLimits {
    #[serde(rename = "MaxQueuedPublishRequests")]
    /// High-water mark for the per-connection publish queue. A
    /// `PublishRequest` that would exceed this bound is answered with
    /// `ServiceFault{BadTooManyPublishRequests}` instead of being enqueued.
    pub max_queued_publish_requests: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct IoLimits {
    #[serde(rename = "IoTimeoutSecs", with = "serde_secs")]
    /// Timeout applied to every individual blocking read/write.
    pub io_timeout: Duration,
}

impl ProcessorConfig {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: ProcessorConfig =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            self.buffers.max_receive_buffer_size >= 8192,
            "MaxReceiveBufferSize must be >= 8192"
        );
        ensure!(
            self.buffers.max_send_buffer_size >= 8192,
            "MaxSendBufferSize must be >= 8192"
        );
        ensure!(
            self.channel.min_server_nonce_length >= 32,
            "MinServerNonceLength must be >= 32"
        );
        ensure!(
            self.publish.max_queued_publish_requests >= 1,
            "MaxQueuedPublishRequests must be >= 1"
        );
        Ok(())
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig {
            buffers: BufferLimits {
                max_receive_buffer_size: 65536,
                max_send_buffer_size: 65536,
            },
            channel: ChannelLimits {
                min_server_nonce_length: 32,
            },
            publish: PublishLimits {
                max_queued_publish_requests: 4096,
            },
            io: IoLimits {
                io_timeout: Duration::from_secs(30),
            },
        }
    }
}

/// Serde helper for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let mut cfg = ProcessorConfig::default();
        cfg.validate_and_normalize().expect("defaults must validate");
    }

    #[test]
    fn rejects_undersized_nonce_floor() {
        let mut cfg = ProcessorConfig::default();
        cfg.channel.min_server_nonce_length = 16;
        assert!(cfg.validate_and_normalize().is_err());
    }

    #[test]
    fn round_trips_through_yaml() {
        let cfg = ProcessorConfig::default();
        let yaml = serde_yaml::to_string(&cfg).expect("serialize");
        let back: ProcessorConfig = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(
            back.publish.max_queued_publish_requests,
            cfg.publish.max_queued_publish_requests
        );
    }
}
