//! Receiver timing and queue configuration.
//!
//! Defaults reproduce the reference firmware: a 6-slot queue, 200 ms
//! enqueue and poll bounds, and a short LED pulse followed by a 500 ms
//! settle delay.

use super::peer::{MacAddress, ESPNOW_CHANNEL, SENDER_MAC};
use std::fmt;
use std::time::Duration;

/// Event queue capacity.
pub const QUEUE_CAPACITY: usize = 6;

/// Longest a producer may wait for a free queue slot.
pub const ENQUEUE_TIMEOUT: Duration = Duration::from_millis(200);

/// Event loop dequeue timeout (polling interval).
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How long the indicator stays on.
pub const INDICATOR_PULSE: Duration = Duration::from_millis(50);

/// Delay after the indicator posts its completion, before the task exits.
pub const INDICATOR_SETTLE: Duration = Duration::from_millis(500);

/// Stack size for the indicator task thread.
pub const INDICATOR_STACK_SIZE: usize = 4096;

/// Largest payload an ESP-NOW frame can carry.
pub const ESPNOW_MAX_DATA_LEN: usize = 250;

/// Highest 2.4 GHz Wi-Fi channel.
pub const MAX_CHANNEL: u8 = 14;

/// Runtime configuration for the receiver event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Peer that receives acknowledgments.
    pub peer: MacAddress,
    /// Wi-Fi channel used to register the peer.
    pub channel: u8,
    /// Event queue capacity.
    pub queue_capacity: usize,
    /// Bounded wait for producers.
    pub enqueue_timeout: Duration,
    /// Event loop dequeue timeout.
    pub poll_interval: Duration,
    /// Indicator on-time.
    pub pulse: Duration,
    /// Indicator post-completion delay.
    pub settle: Duration,
    /// Indicator task stack size in bytes.
    pub indicator_stack_size: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            peer: SENDER_MAC,
            channel: ESPNOW_CHANNEL,
            queue_capacity: QUEUE_CAPACITY,
            enqueue_timeout: ENQUEUE_TIMEOUT,
            poll_interval: POLL_INTERVAL,
            pulse: INDICATOR_PULSE,
            settle: INDICATOR_SETTLE,
            indicator_stack_size: INDICATOR_STACK_SIZE,
        }
    }
}

impl ReceiverConfig {
    /// Set the acknowledged peer.
    pub fn with_peer(mut self, peer: MacAddress) -> Self {
        self.peer = peer;
        self
    }

    /// Set the Wi-Fi channel.
    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Set the queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the producer wait bound.
    pub fn with_enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.enqueue_timeout = timeout;
        self
    }

    /// Set the loop polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set indicator pulse and settle durations.
    pub fn with_indicator_timing(mut self, pulse: Duration, settle: Duration) -> Self {
        self.pulse = pulse;
        self.settle = settle;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.channel == 0 || self.channel > MAX_CHANNEL {
            return Err(ConfigError::InvalidChannel(self.channel));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.peer.is_broadcast() || self.peer.is_unset() {
            return Err(ConfigError::InvalidPeer(self.peer));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Queue capacity must be at least one slot.
    ZeroCapacity,
    /// Channel outside 1..=14.
    InvalidChannel(u8),
    /// Polling interval must be non-zero.
    ZeroPollInterval,
    /// Peer must be a unicast, non-zero address.
    InvalidPeer(MacAddress),
    /// Address string could not be parsed.
    InvalidMac(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => write!(f, "queue capacity must be at least 1"),
            Self::InvalidChannel(ch) => {
                write!(f, "invalid channel {} (must be 1-{})", ch, MAX_CHANNEL)
            }
            Self::ZeroPollInterval => write!(f, "poll interval must be non-zero"),
            Self::InvalidPeer(mac) => write!(f, "invalid peer address {}", mac),
            Self::InvalidMac(s) => write!(f, "invalid MAC address: {:?}", s),
        }
    }
}

impl std::error::Error for ConfigError {}
