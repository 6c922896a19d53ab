//! Events flowing from the radio callbacks and the indicator task into the
//! receiver event loop.
//!
//! - [`queue`]: the bounded FIFO that carries them

mod queue;

pub use queue::{EventQueue, EventSender, QueueError};

use crate::config::MacAddress;

/// Delivery status reported by the radio for a finished transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The peer acknowledged the frame at the MAC layer.
    Success,
    /// The frame was not acknowledged.
    Failure,
}

/// A notification for the event loop.
///
/// Every event is well-formed by construction: malformed driver
/// notifications are rejected before an `Event` is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A transmission finished.
    SendComplete {
        peer: MacAddress,
        outcome: SendOutcome,
    },
    /// A datagram arrived. `payload` is a copy of the driver's buffer and is
    /// never empty.
    DatagramReceived { peer: MacAddress, payload: Vec<u8> },
    /// The indicator pulse finished.
    IndicatorDone,
}

impl Event {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendComplete { .. } => "send-complete",
            Self::DatagramReceived { .. } => "datagram-received",
            Self::IndicatorDone => "indicator-done",
        }
    }
}

/// Format bytes as space separated uppercase hex for logging.
pub(crate) fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SENDER_MAC;

    #[test]
    fn test_event_kind_names() {
        let sent = Event::SendComplete {
            peer: SENDER_MAC,
            outcome: SendOutcome::Success,
        };
        let received = Event::DatagramReceived {
            peer: SENDER_MAC,
            payload: vec![1],
        };
        assert_eq!(sent.kind(), "send-complete");
        assert_eq!(received.kind(), "datagram-received");
        assert_eq!(Event::IndicatorDone.kind(), "indicator-done");
    }

    #[test]
    fn test_hex_bytes() {
        assert_eq!(hex_bytes(&[0x01, 0xab, 0xff]), "01 AB FF");
        assert_eq!(hex_bytes(&[]), "");
    }
}
