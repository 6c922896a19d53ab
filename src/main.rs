//! ESP-NOW receiver firmware binary.

#[cfg(feature = "esp32")]
fn main() {
    // Link ESP-IDF patches (must be first!)
    esp_idf_sys::link_patches();

    // Initialize ESP-IDF logger for log crate integration
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("=== ESP-NOW receiver starting ===");

    if let Err(e) = firmware::run() {
        log::error!("Receiver stopped: {}", e);
    }

    // Nothing left to do; keep the main task parked.
    loop {
        std::thread::sleep(std::time::Duration::from_secs(60));
    }
}

#[cfg(feature = "esp32")]
mod firmware {
    use esp_idf_hal::gpio::OutputPin;
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use espnow_receiver::config::peer_table;
    use espnow_receiver::{
        EspNowTransport, GpioIndicator, Receiver, ReceiverConfig, WifiRadio, RECEIVER_MAC,
    };
    use log::{info, warn};
    use std::error::Error;
    use std::sync::Arc;

    /// Stack for the event loop task.
    const LOOP_STACK_SIZE: usize = 8192;

    pub fn run() -> Result<(), Box<dyn Error>> {
        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        let config = ReceiverConfig::default();
        config.validate()?;

        let mut wifi = WifiRadio::start(peripherals.modem, sysloop, nvs, config.channel)?;
        let transport = Arc::new(EspNowTransport::init()?);
        let led = GpioIndicator::new(peripherals.pins.gpio2.downgrade_output())?;

        info!("This node: {}", RECEIVER_MAC);
        for peer in peer_table() {
            info!("Peer: {} (channel {})", peer.address, peer.channel);
        }

        let receiver = Receiver::new(config, transport, led)?;
        receiver.start()?;

        let task = std::thread::Builder::new()
            .name("espnow".to_string())
            .stack_size(LOOP_STACK_SIZE)
            .spawn(move || receiver.run())?;

        let result = task.join();
        if let Err(e) = wifi.stop() {
            warn!("Wi-Fi stop failed: {:?}", e);
        }

        match result {
            Ok(result) => Ok(result?),
            Err(_) => Err("event loop task panicked".into()),
        }
    }
}

#[cfg(not(feature = "esp32"))]
fn main() {
    println!("This binary requires the 'esp32' feature.");
    println!("For a host simulation run:");
    println!("  cargo run --bin host-receiver --features host");
}
