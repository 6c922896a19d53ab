//! ESP-NOW receiver library.
//!
//! Everything except the radio and GPIO drivers is platform independent
//! and tested on the host machine without ESP32 hardware.
//!
//! # Components
//!
//! - [`config`]: peer table, link constants, loop timing
//! - [`event`]: event types and the bounded event queue
//! - [`indicator`]: receipt pulse task
//! - [`receiver`]: callback bridge and the event loop
//! - [`transport`]: ESP-NOW driver seam and the loopback transport
//! - [`wifi`]: station-mode radio bring-up (ESP32 only)

pub mod ack;
pub mod config;
pub mod event;
pub mod indicator;
pub mod receiver;
pub mod stats;
pub mod transport;
pub mod wifi;

// Re-export commonly used items
pub use ack::{build_ack, AckRequest, ACK_PAYLOAD};
pub use config::{ConfigError, MacAddress, PeerInfo, ReceiverConfig, RECEIVER_MAC, SENDER_MAC};
pub use event::{Event, EventQueue, EventSender, QueueError, SendOutcome};
pub use indicator::{Indicator, IndicatorError, IndicatorPin, Level, RecordingPin, PIN_HISTORY};
pub use receiver::{CallbackBridge, NotificationError, Receiver, ReceiverError, ShutdownHandle};
pub use stats::{ReceiverStats, StatsSnapshot};
pub use transport::{LoopbackTransport, SentFrame, Transport, TransportError, SENT_HISTORY};

#[cfg(feature = "esp32")]
pub use indicator::GpioIndicator;
#[cfg(feature = "esp32")]
pub use transport::EspNowTransport;
#[cfg(feature = "esp32")]
pub use wifi::{WifiError, WifiRadio};
