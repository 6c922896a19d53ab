//! Callback-side producers.
//!
//! Runs in the radio driver's callback context. Each notification is
//! validated, copied into an owned [`Event`] and posted with a bounded
//! wait. Nothing here blocks longer than the configured enqueue timeout,
//! and malformed notifications never reach the queue.

use crate::config::{MacAddress, ESPNOW_MAX_DATA_LEN, MAC_LEN};
use crate::event::{hex_bytes, Event, EventSender, QueueError, SendOutcome};
use crate::stats::ReceiverStats;
use log::{error, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Turns driver notifications into queued events.
#[derive(Debug, Clone)]
pub struct CallbackBridge {
    events: EventSender,
    stats: Arc<ReceiverStats>,
    timeout: Duration,
}

impl CallbackBridge {
    pub fn new(events: EventSender, stats: Arc<ReceiverStats>, timeout: Duration) -> Self {
        Self {
            events,
            stats,
            timeout,
        }
    }

    /// Handle a send-complete notification.
    pub fn send_complete(&self, mac: &[u8], outcome: SendOutcome) -> Result<(), NotificationError> {
        let peer = match peer_address(mac) {
            Ok(peer) => peer,
            Err(e) => return Err(self.reject("Send cb arg error", e)),
        };

        self.post(Event::SendComplete { peer, outcome })
    }

    /// Handle a receive notification.
    ///
    /// `data` is copied before returning, so the driver may reuse its
    /// buffer right away.
    pub fn datagram_received(&self, mac: &[u8], data: &[u8]) -> Result<(), NotificationError> {
        let peer = match validate_datagram(mac, data) {
            Ok(peer) => peer,
            Err(e) => return Err(self.reject("Receive cb arg error", e)),
        };

        self.stats.record_datagram();
        self.post(Event::DatagramReceived {
            peer,
            payload: data.to_vec(),
        })
    }

    fn reject(&self, context: &str, err: NotificationError) -> NotificationError {
        error!("{}: {}", context, err);
        self.stats.record_malformed();
        err
    }

    fn post(&self, event: Event) -> Result<(), NotificationError> {
        self.events.post(event, self.timeout).map_err(|e| {
            if let QueueError::Full(Event::DatagramReceived { payload, .. }) = &e {
                warn!("Receive queue full, dropped [{}]", hex_bytes(payload));
            } else {
                warn!("Send queue fail: {}", e);
            }
            self.stats.record_dropped();
            NotificationError::Queue(e)
        })
    }
}

fn peer_address(mac: &[u8]) -> Result<MacAddress, NotificationError> {
    MacAddress::from_slice(mac)
        .ok_or(NotificationError::InvalidAddress { len: mac.len() })
}

fn validate_datagram(mac: &[u8], data: &[u8]) -> Result<MacAddress, NotificationError> {
    let peer = peer_address(mac)?;
    if data.is_empty() {
        return Err(NotificationError::EmptyPayload);
    }
    if data.len() > ESPNOW_MAX_DATA_LEN {
        return Err(NotificationError::PayloadTooLarge { len: data.len() });
    }
    Ok(peer)
}

/// Why a notification produced no event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// Source address missing or not [`MAC_LEN`] bytes.
    InvalidAddress { len: usize },
    /// Receive notification without payload.
    EmptyPayload,
    /// Payload longer than an ESP-NOW frame can carry.
    PayloadTooLarge { len: usize },
    /// Valid notification, but the queue did not accept it.
    Queue(QueueError),
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress { len } => write!(
                f,
                "invalid peer address ({} bytes, expected {})",
                len, MAC_LEN
            ),
            Self::EmptyPayload => write!(f, "empty payload"),
            Self::PayloadTooLarge { len } => write!(
                f,
                "payload too large: {} bytes (max {})",
                len, ESPNOW_MAX_DATA_LEN
            ),
            Self::Queue(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for NotificationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SENDER_MAC;
    use crate::event::EventQueue;
    use std::time::Instant;

    const SHORT: Duration = Duration::from_millis(20);

    fn bridge(queue: &EventQueue) -> (CallbackBridge, Arc<ReceiverStats>) {
        let stats = Arc::new(ReceiverStats::new());
        (
            CallbackBridge::new(queue.sender(), stats.clone(), SHORT),
            stats,
        )
    }

    #[test]
    fn test_valid_datagram_is_copied_into_queue() {
        let queue = EventQueue::new(6);
        let (bridge, stats) = bridge(&queue);

        let mut driver_buffer = vec![0x01, 0x02];
        bridge
            .datagram_received(&SENDER_MAC.octets(), &driver_buffer)
            .unwrap();
        // Driver reuses its buffer after the callback returns.
        driver_buffer.fill(0xee);

        assert_eq!(
            queue.recv(SHORT),
            Some(Event::DatagramReceived {
                peer: SENDER_MAC,
                payload: vec![0x01, 0x02],
            })
        );
        assert_eq!(stats.snapshot().datagrams, 1);
    }

    #[test]
    fn test_empty_payload_rejected_without_event() {
        let queue = EventQueue::new(6);
        let (bridge, stats) = bridge(&queue);

        let result = bridge.datagram_received(&SENDER_MAC.octets(), &[]);

        assert_eq!(result, Err(NotificationError::EmptyPayload));
        assert!(queue.is_empty());
        assert_eq!(stats.snapshot().malformed, 1);
        assert_eq!(stats.snapshot().datagrams, 0);
    }

    #[test]
    fn test_missing_address_rejected() {
        let queue = EventQueue::new(6);
        let (bridge, stats) = bridge(&queue);

        assert_eq!(
            bridge.datagram_received(&[], &[1]),
            Err(NotificationError::InvalidAddress { len: 0 })
        );
        assert_eq!(
            bridge.send_complete(&[1, 2, 3], SendOutcome::Success),
            Err(NotificationError::InvalidAddress { len: 3 })
        );
        assert!(queue.is_empty());
        assert_eq!(stats.snapshot().malformed, 2);
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let queue = EventQueue::new(6);
        let (bridge, _stats) = bridge(&queue);

        let mac = SENDER_MAC.octets();
        let oversized = [0; ESPNOW_MAX_DATA_LEN + 1];
        let result = bridge.datagram_received(&mac, &oversized);

        assert_eq!(
            result,
            Err(NotificationError::PayloadTooLarge {
                len: ESPNOW_MAX_DATA_LEN + 1
            })
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_send_complete_queued_for_both_outcomes() {
        let queue = EventQueue::new(6);
        let (bridge, _stats) = bridge(&queue);

        bridge
            .send_complete(&SENDER_MAC.octets(), SendOutcome::Success)
            .unwrap();
        bridge
            .send_complete(&SENDER_MAC.octets(), SendOutcome::Failure)
            .unwrap();

        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_full_queue_drops_and_returns_promptly() {
        let queue = EventQueue::new(6);
        let (bridge, stats) = bridge(&queue);
        for i in 0..6u8 {
            bridge
                .datagram_received(&SENDER_MAC.octets(), &[i])
                .unwrap();
        }

        let start = Instant::now();
        let result = bridge.datagram_received(&SENDER_MAC.octets(), &[6]);
        let elapsed = start.elapsed();

        let dropped = Event::DatagramReceived {
            peer: SENDER_MAC,
            payload: vec![6],
        };
        assert_eq!(
            result,
            Err(NotificationError::Queue(QueueError::Full(dropped)))
        );
        assert!(
            elapsed < Duration::from_secs(1),
            "callback stalled for {:?}",
            elapsed
        );
        assert_eq!(queue.len(), 6);
        assert_eq!(stats.snapshot().dropped, 1);
    }
}
