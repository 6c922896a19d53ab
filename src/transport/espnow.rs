//! ESP-NOW transport over the ESP-IDF driver.
//!
//! Wi-Fi must already be started (see [`crate::wifi::WifiRadio`]) before
//! [`EspNowTransport::init`] is called.
//!
//! # Callback context
//!
//! ESP-IDF invokes both hooks from the Wi-Fi task. They must return
//! quickly, which the receiver guarantees by bounding its queue wait.

use super::{check_payload, RecvCallback, SendCallback, Transport, TransportError};
use crate::config::{MacAddress, PeerInfo, PRIMARY_MASTER_KEY};
use crate::event::SendOutcome;
use esp_idf_svc::espnow::{EspNow, PeerInfo as EspPeerInfo, ReceiveInfo, SendStatus};
use esp_idf_sys::wifi_interface_t_WIFI_IF_STA;
use log::{info, warn};
use std::sync::{Mutex, MutexGuard};

/// ESP-NOW driver handle.
///
/// Dropping the inner [`EspNow`] deinitializes the driver, which is what
/// [`Transport::deinit`] does.
pub struct EspNowTransport {
    espnow: Mutex<Option<EspNow<'static>>>,
}

impl EspNowTransport {
    /// Initialize ESP-NOW and install the primary master key.
    pub fn init() -> Result<Self, TransportError> {
        let espnow = EspNow::take()?;
        espnow.set_pmk(PRIMARY_MASTER_KEY)?;
        info!("ESP-NOW initialized (version {})", espnow.get_version()?);

        Ok(Self {
            espnow: Mutex::new(Some(espnow)),
        })
    }

    fn driver(&self) -> MutexGuard<'_, Option<EspNow<'static>>> {
        match self.espnow.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("ESP-NOW mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn with_driver<R>(
        &self,
        f: impl FnOnce(&EspNow<'static>) -> Result<R, TransportError>,
    ) -> Result<R, TransportError> {
        let guard = self.driver();
        let espnow = guard.as_ref().ok_or(TransportError::NotInitialized)?;
        f(espnow)
    }
}

impl Transport for EspNowTransport {
    fn register_send_callback(&self, callback: SendCallback) -> Result<(), TransportError> {
        self.with_driver(|espnow| {
            espnow.register_send_cb(move |mac: &[u8], status: SendStatus| {
                let outcome = match status {
                    SendStatus::SUCCESS => SendOutcome::Success,
                    SendStatus::FAIL => SendOutcome::Failure,
                };
                callback(mac, outcome);
            })?;
            Ok(())
        })
    }

    fn register_recv_callback(&self, callback: RecvCallback) -> Result<(), TransportError> {
        self.with_driver(|espnow| {
            espnow.register_recv_cb(move |info: &ReceiveInfo, data: &[u8]| {
                callback(&info.src_addr[..], data);
            })?;
            Ok(())
        })
    }

    fn add_peer(&self, peer: &PeerInfo) -> Result<(), TransportError> {
        self.with_driver(|espnow| {
            espnow.add_peer(EspPeerInfo {
                peer_addr: peer.address.octets(),
                channel: peer.channel,
                ifidx: wifi_interface_t_WIFI_IF_STA,
                encrypt: peer.encrypt,
                ..Default::default()
            })?;
            Ok(())
        })
    }

    fn peer_count(&self) -> Result<usize, TransportError> {
        self.with_driver(|espnow| {
            let (total, _encrypted) = espnow.get_peers_number()?;
            Ok(total)
        })
    }

    fn send(&self, dest: MacAddress, payload: &[u8]) -> Result<(), TransportError> {
        check_payload(payload)?;
        // esp_now_send copies the payload into driver memory before returning.
        self.with_driver(|espnow| Ok(espnow.send(dest.octets(), payload)?))
    }

    fn deinit(&self) -> Result<(), TransportError> {
        if let Some(espnow) = self.driver().take() {
            if let Err(e) = espnow.unregister_recv_cb() {
                warn!("Failed to unregister receive callback: {:?}", e);
            }
            if let Err(e) = espnow.unregister_send_cb() {
                warn!("Failed to unregister send callback: {:?}", e);
            }
            drop(espnow);
            info!("ESP-NOW deinitialized");
        }
        Ok(())
    }
}

// Note: Tests for this module require ESP32 hardware. The event loop is
// exercised on the host against `LoopbackTransport`.
