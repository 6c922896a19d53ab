//! Host simulation of the ESP-NOW receiver.
//!
//! Runs the real event loop against the in-memory loopback transport and
//! a recording indicator pin. A simulated sender injects a datagram every
//! second; each one should produce a pulse followed by an `"ok"` ack.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin host-receiver --features host
//! ESPNOW_PEER=3c:61:05:30:d8:f5 RUST_LOG=debug cargo run --bin host-receiver --features host
//! ```
//!
//! Press Ctrl+C to stop.

use espnow_receiver::{
    LoopbackTransport, MacAddress, Receiver, ReceiverConfig, RecordingPin, RECEIVER_MAC,
};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable overriding the peer address.
const PEER_ENV: &str = "ESPNOW_PEER";

/// Interval between simulated datagrams.
const SEND_INTERVAL: Duration = Duration::from_secs(1);

/// Peer from `ESPNOW_PEER`, falling back to the built-in sender.
fn configured_peer(config: &ReceiverConfig) -> MacAddress {
    match std::env::var(PEER_ENV) {
        Ok(value) => match value.parse() {
            Ok(mac) => mac,
            Err(e) => {
                warn!("Ignoring {}: {}", PEER_ENV, e);
                config.peer
            }
        },
        Err(_) => config.peer,
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("=== ESP-NOW host receiver starting ===");

    let defaults = ReceiverConfig::default();
    let peer = configured_peer(&defaults);
    let config = defaults.with_peer(peer);

    let transport = Arc::new(LoopbackTransport::new());
    let pin = RecordingPin::new();

    let receiver = match Receiver::new(config, transport.clone(), pin.clone()) {
        Ok(r) => r,
        Err(e) => {
            error!("Receiver setup failed: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = receiver.start() {
        error!("Receiver start failed: {}", e);
        std::process::exit(1);
    }
    info!("This node: {}, peer: {}", RECEIVER_MAC, peer);

    let stats = receiver.stats();
    let shutdown = receiver.shutdown_handle();
    let mut loop_task = tokio::task::spawn_blocking(move || receiver.run());

    // Simulated sender
    let sender_transport = transport.clone();
    let sender_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SEND_INTERVAL);
        let mut seq: u8 = 0;
        loop {
            ticker.tick().await;
            let payload = [seq, seq.wrapping_add(1), seq.wrapping_add(2)];
            if !sender_transport.inject_receive(&peer.octets(), &payload) {
                info!("Simulated sender: receiver is gone");
                break;
            }
            seq = seq.wrapping_add(1);
        }
    });

    info!("Entering main loop (Ctrl+C to exit)...");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            shutdown.shutdown();
            match (&mut loop_task).await {
                Ok(Err(e)) => error!("Receiver loop error: {}", e),
                Err(e) => error!("Receiver loop task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        result = &mut loop_task => {
            match result {
                Ok(Ok(())) => info!("Receiver loop finished"),
                Ok(Err(e)) => error!("Receiver loop stopped: {}", e),
                Err(e) => error!("Receiver loop task error: {}", e),
            }
        }
    }

    sender_task.abort();
    info!(
        "Shutdown complete: {} pulses, {} acks sent ({})",
        pin.pulse_count(),
        transport.sent_count(),
        stats.snapshot()
    );
}
