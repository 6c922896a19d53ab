//! Wi-Fi radio bring-up for ESP-NOW.
//!
//! ESP-NOW rides on the Wi-Fi driver, so the station interface must be
//! started before the transport is initialized. No access point is ever
//! joined.
//!
//! - [`radio`]: ESP-IDF Wi-Fi driver wrapper (ESP32 only)

#[cfg(feature = "esp32")]
mod radio;

#[cfg(feature = "esp32")]
pub use radio::{WifiError, WifiRadio};
