//! Station-mode Wi-Fi driver used as the ESP-NOW carrier.

use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use esp_idf_sys::{self as sys, esp, EspError};
use log::info;

/// Started Wi-Fi driver in station mode.
///
/// Keep it alive for as long as ESP-NOW is in use; dropping it stops the
/// radio.
pub struct WifiRadio {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl WifiRadio {
    /// Initialize Wi-Fi in station mode on `channel` and start it.
    ///
    /// Driver configuration is kept in RAM only. With the `long-range`
    /// feature the 802.11 LR protocol is enabled on top of b/g/n.
    pub fn start(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        channel: u8,
    ) -> Result<Self, WifiError> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

        esp!(unsafe {
            sys::esp_wifi_set_storage(sys::wifi_storage_t_WIFI_STORAGE_RAM)
        })?;
        wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
        wifi.start()?;

        esp!(unsafe {
            sys::esp_wifi_set_channel(channel, sys::wifi_second_chan_t_WIFI_SECOND_CHAN_NONE)
        })
        .map_err(|e| WifiError::Channel(channel, e))?;

        #[cfg(feature = "long-range")]
        {
            let protocols = sys::WIFI_PROTOCOL_11B
                | sys::WIFI_PROTOCOL_11G
                | sys::WIFI_PROTOCOL_11N
                | sys::WIFI_PROTOCOL_LR;
            esp!(unsafe {
                sys::esp_wifi_set_protocol(sys::wifi_interface_t_WIFI_IF_STA, protocols as u8)
            })
            .map_err(WifiError::Protocol)?;
            info!("Wi-Fi long range protocol enabled");
        }

        info!("Wi-Fi started in station mode on channel {}", channel);
        Ok(Self { wifi })
    }

    /// Stop the radio.
    pub fn stop(&mut self) -> Result<(), EspError> {
        info!("Stopping Wi-Fi");
        self.wifi.stop()
    }
}

/// Errors raised while bringing the radio up.
#[derive(Debug)]
pub enum WifiError {
    /// The driver refused the primary channel.
    Channel(u8, EspError),
    /// Enabling the long range protocol failed.
    Protocol(EspError),
    /// ESP-IDF error.
    EspError(EspError),
}

impl From<EspError> for WifiError {
    fn from(e: EspError) -> Self {
        Self::EspError(e)
    }
}

impl std::fmt::Display for WifiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(ch, e) => write!(f, "cannot set channel {}: {:?}", ch, e),
            Self::Protocol(e) => write!(f, "cannot enable long range: {:?}", e),
            Self::EspError(e) => write!(f, "ESP error: {:?}", e),
        }
    }
}

impl std::error::Error for WifiError {}

// Note: Tests for this module require ESP32 hardware.
