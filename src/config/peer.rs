//! Peer addressing for the two-node ESP-NOW link.
//!
//! Both peers are known at compile time. The peer table holds a single
//! entry: the sender this node acknowledges.
//!
//! # Example
//!
//! ```
//! use espnow_receiver::config::{MacAddress, SENDER_MAC};
//!
//! let mac: MacAddress = "3c:61:05:30:d8:f5".parse().unwrap();
//! assert_eq!(mac, SENDER_MAC);
//! assert_eq!(mac.to_string(), "3C:61:05:30:D8:F5");
//! ```

use super::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Length of an ESP-NOW peer address in bytes.
pub const MAC_LEN: usize = 6;

/// Wi-Fi channel shared by both peers.
pub const ESPNOW_CHANNEL: u8 = 1;

/// Primary master key installed before peers are added.
///
/// Only used if a peer is registered with encryption, which this node
/// never does.
pub const PRIMARY_MASTER_KEY: &[u8; 16] = b"PMK1233443433245";

/// Hardware address of this node.
pub const RECEIVER_MAC: MacAddress = MacAddress([0x3c, 0x61, 0x05, 0x30, 0x81, 0x21]);

/// Hardware address of the single correspondent.
pub const SENDER_MAC: MacAddress = MacAddress([0x3c, 0x61, 0x05, 0x30, 0xd8, 0xf5]);

/// A 6-byte ESP-NOW hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; MAC_LEN]);

impl MacAddress {
    /// The broadcast address `FF:FF:FF:FF:FF:FF`.
    pub const BROADCAST: Self = Self([0xff; MAC_LEN]);

    /// Build an address from a slice handed over by the radio driver.
    ///
    /// Returns `None` unless the slice is exactly [`MAC_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; MAC_LEN]>::try_from(bytes).ok().map(Self)
    }

    /// Raw address bytes.
    pub fn octets(&self) -> [u8; MAC_LEN] {
        self.0
    }

    /// True for `FF:FF:FF:FF:FF:FF`.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// True for `00:00:00:00:00:00`.
    pub fn is_unset(&self) -> bool {
        self.0 == [0; MAC_LEN]
    }
}

impl From<[u8; MAC_LEN]> for MacAddress {
    fn from(bytes: [u8; MAC_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

impl FromStr for MacAddress {
    type Err = ConfigError;

    /// Parse `aa:bb:cc:dd:ee:ff` (or `-` separated), case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidMac(s.to_string());

        let mut bytes = [0u8; MAC_LEN];
        let mut parts = s.trim().split([':', '-']);
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self(bytes))
    }
}

/// Peer registration record passed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerInfo {
    /// Peer hardware address.
    pub address: MacAddress,
    /// Wi-Fi channel the peer listens on.
    pub channel: u8,
    /// Whether frames to this peer are encrypted with a local master key.
    pub encrypt: bool,
}

impl PeerInfo {
    /// Unencrypted peer on the given channel.
    pub fn new(address: MacAddress, channel: u8) -> Self {
        Self {
            address,
            channel,
            encrypt: false,
        }
    }
}

/// The static peer table: the sender, unencrypted, on [`ESPNOW_CHANNEL`].
pub fn peer_table() -> [PeerInfo; 1] {
    [PeerInfo::new(SENDER_MAC, ESPNOW_CHANNEL)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uppercase_hex() {
        assert_eq!(SENDER_MAC.to_string(), "3C:61:05:30:D8:F5");
        assert_eq!(RECEIVER_MAC.to_string(), "3C:61:05:30:81:21");
    }

    #[test]
    fn test_parse_colon_and_dash() {
        let a: MacAddress = "3c:61:05:30:81:21".parse().unwrap();
        let b: MacAddress = "3C-61-05-30-81-21".parse().unwrap();
        assert_eq!(a, RECEIVER_MAC);
        assert_eq!(b, RECEIVER_MAC);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in [
            "",
            "3c:61:05:30:81",
            "3c:61:05:30:81:21:00",
            "3c:61:05:30:81:zz",
            "3c6:1:05:30:81:21",
        ] {
            let result = input.parse::<MacAddress>();
            assert!(
                matches!(result, Err(ConfigError::InvalidMac(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_from_slice_requires_six_bytes() {
        assert_eq!(
            MacAddress::from_slice(&SENDER_MAC.octets()),
            Some(SENDER_MAC)
        );
        assert_eq!(MacAddress::from_slice(&[1, 2, 3]), None);
        assert_eq!(MacAddress::from_slice(&[]), None);
        assert_eq!(MacAddress::from_slice(&[0; 7]), None);
    }

    #[test]
    fn test_special_addresses() {
        assert!(MacAddress::BROADCAST.is_broadcast());
        assert!(MacAddress::default().is_unset());
        assert!(!SENDER_MAC.is_broadcast());
        assert!(!SENDER_MAC.is_unset());
    }

    #[test]
    fn test_peer_table_has_single_unencrypted_sender() {
        let table = peer_table();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].address, SENDER_MAC);
        assert_eq!(table[0].channel, ESPNOW_CHANNEL);
        assert!(!table[0].encrypt);
    }
}
