//! Radio transport seam.
//!
//! The receiver only needs a narrow slice of the ESP-NOW driver: peer
//! registration, a raw send, and two notification hooks. [`Transport`]
//! captures that slice so the event loop runs unchanged on:
//!
//! - **ESP32** (`esp32` feature): [`EspNowTransport`] over `esp-idf-svc`
//! - **Host**: [`LoopbackTransport`], an in-memory driver for tests and
//!   the `host-receiver` simulation
//!
//! Callbacks receive raw slices exactly as the driver hands them over.
//! Validating them is the receiver's job.

#[cfg(feature = "esp32")]
mod espnow;
mod loopback;

#[cfg(feature = "esp32")]
pub use espnow::EspNowTransport;
pub use loopback::{LoopbackTransport, SentFrame, SENT_HISTORY};

use crate::config::{MacAddress, PeerInfo, ESPNOW_MAX_DATA_LEN};
use crate::event::SendOutcome;
use std::fmt;

/// Send-complete hook: `(peer_address, outcome)`.
pub type SendCallback = Box<dyn Fn(&[u8], SendOutcome) + Send + Sync + 'static>;

/// Receive hook: `(peer_address, payload)`.
///
/// The payload slice is only valid for the duration of the call.
pub type RecvCallback = Box<dyn Fn(&[u8], &[u8]) + Send + Sync + 'static>;

/// Connectionless, peer-addressed datagram transport.
pub trait Transport: Send + Sync {
    /// Install the send-complete hook, replacing any previous one.
    fn register_send_callback(&self, callback: SendCallback) -> Result<(), TransportError>;

    /// Install the receive hook, replacing any previous one.
    fn register_recv_callback(&self, callback: RecvCallback) -> Result<(), TransportError>;

    /// Add a peer to the driver's peer list.
    fn add_peer(&self, peer: &PeerInfo) -> Result<(), TransportError>;

    /// Number of registered peers.
    fn peer_count(&self) -> Result<usize, TransportError>;

    /// Transmit `payload` to `dest`.
    ///
    /// `Ok` means the driver accepted the frame; delivery is reported later
    /// through the send-complete hook.
    fn send(&self, dest: MacAddress, payload: &[u8]) -> Result<(), TransportError>;

    /// Shut the driver down. Later calls are no-ops.
    fn deinit(&self) -> Result<(), TransportError>;
}

/// Check a payload against ESP-NOW frame limits.
pub fn check_payload(payload: &[u8]) -> Result<(), TransportError> {
    if payload.is_empty() {
        return Err(TransportError::EmptyPayload);
    }
    if payload.len() > ESPNOW_MAX_DATA_LEN {
        return Err(TransportError::PayloadTooLarge {
            size: payload.len(),
            max: ESPNOW_MAX_DATA_LEN,
        });
    }
    Ok(())
}

/// Transport errors.
#[derive(Debug)]
pub enum TransportError {
    /// The driver is not initialized (or was deinitialized).
    NotInitialized,
    /// Destination is not in the peer list.
    UnknownPeer(MacAddress),
    /// Empty payload.
    EmptyPayload,
    /// Payload exceeds the frame limit.
    PayloadTooLarge { size: usize, max: usize },
    /// The driver refused the frame.
    SendFailed(String),
    /// ESP-IDF error.
    #[cfg(feature = "esp32")]
    Esp(esp_idf_sys::EspError),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "transport not initialized"),
            Self::UnknownPeer(mac) => write!(f, "unknown peer {}", mac),
            Self::EmptyPayload => write!(f, "empty payload"),
            Self::PayloadTooLarge { size, max } => {
                write!(f, "payload too large: {} bytes (max {})", size, max)
            }
            Self::SendFailed(reason) => write!(f, "send failed: {}", reason),
            #[cfg(feature = "esp32")]
            Self::Esp(e) => write!(f, "ESP error: {:?}", e),
        }
    }
}

impl std::error::Error for TransportError {}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for TransportError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Esp(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_payload_limits() {
        assert!(check_payload(b"ok").is_ok());
        assert!(check_payload(&[0u8; ESPNOW_MAX_DATA_LEN]).is_ok());
        let empty = check_payload(&[]);
        assert!(matches!(empty, Err(TransportError::EmptyPayload)));

        let oversized = check_payload(&[0u8; ESPNOW_MAX_DATA_LEN + 1]);
        assert!(matches!(
            oversized,
            Err(TransportError::PayloadTooLarge { size: 251, .. })
        ));
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::PayloadTooLarge {
            size: 300,
            max: 250,
        };
        assert_eq!(err.to_string(), "payload too large: 300 bytes (max 250)");
    }
}
