//! Acknowledgment datagram sent back to the peer after each receipt.

use crate::config::MacAddress;

/// Reply payload: two ASCII bytes, no terminator.
pub const ACK_PAYLOAD: &[u8] = b"ok";

/// A single acknowledgment ready to hand to the transport.
///
/// The payload is `'static`, so it outlives any transmission the radio
/// driver still has in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckRequest {
    /// Destination peer.
    pub dest: MacAddress,
    /// Bytes to transmit.
    pub payload: &'static [u8],
}

impl AckRequest {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Build the acknowledgment for `peer`.
pub fn build_ack(peer: MacAddress, payload: &'static [u8]) -> AckRequest {
    AckRequest {
        dest: peer,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SENDER_MAC;

    #[test]
    fn test_ack_is_two_byte_ok() {
        let ack = build_ack(SENDER_MAC, ACK_PAYLOAD);
        assert_eq!(ack.dest, SENDER_MAC);
        assert_eq!(ack.payload, b"ok");
        assert_eq!(ack.len(), 2);
        assert!(!ack.is_empty());
    }

    #[test]
    fn test_build_ack_is_pure() {
        assert_eq!(
            build_ack(SENDER_MAC, ACK_PAYLOAD),
            build_ack(SENDER_MAC, ACK_PAYLOAD)
        );
    }
}
