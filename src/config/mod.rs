//! Node configuration.
//!
//! - [`peer`]: peer addresses, the static peer table, and link constants
//! - [`receiver`]: queue sizing and indicator timing for the event loop

mod peer;
mod receiver;

pub use peer::{
    peer_table, MacAddress, PeerInfo, ESPNOW_CHANNEL, MAC_LEN, PRIMARY_MASTER_KEY, RECEIVER_MAC,
    SENDER_MAC,
};
pub use receiver::{
    ConfigError, ReceiverConfig, ENQUEUE_TIMEOUT, ESPNOW_MAX_DATA_LEN, INDICATOR_PULSE,
    INDICATOR_SETTLE, INDICATOR_STACK_SIZE, MAX_CHANNEL, POLL_INTERVAL, QUEUE_CAPACITY,
};
