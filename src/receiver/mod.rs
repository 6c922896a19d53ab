//! Receiver event loop.
//!
//! The loop is the single consumer of the event queue. It dispatches each
//! event to exactly one action:
//!
//! | Event | Action |
//! |-------|--------|
//! | `SendComplete` | log outcome and peer |
//! | `DatagramReceived` | log payload, start an indicator pulse |
//! | `IndicatorDone` | send `"ok"` to the peer |
//!
//! A failed acknowledgment send is fatal: the loop tears down (destroys
//! the queue, deinitializes the transport) and returns the error. There
//! is no retry.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use espnow_receiver::{LoopbackTransport, ReceiverConfig, Receiver, RecordingPin};
//!
//! let transport = Arc::new(LoopbackTransport::new());
//! let receiver = Receiver::new(ReceiverConfig::default(), transport, RecordingPin::new()).unwrap();
//! receiver.start().unwrap();
//!
//! let shutdown = receiver.shutdown_handle();
//! let task = std::thread::spawn(move || receiver.run());
//! shutdown.shutdown();
//! assert!(task.join().unwrap().is_ok());
//! ```

mod bridge;

pub use bridge::{CallbackBridge, NotificationError};

use crate::ack::{build_ack, ACK_PAYLOAD};
use crate::config::{ConfigError, MacAddress, PeerInfo, ReceiverConfig};
use crate::event::{hex_bytes, Event, EventQueue, EventSender, SendOutcome};
use crate::indicator::{Indicator, IndicatorPin};
use crate::stats::ReceiverStats;
use crate::transport::{RecvCallback, SendCallback, Transport, TransportError};
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Requests an orderly stop of a running loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the loop to tear down. Takes effect within one poll interval.
    pub fn shutdown(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown was requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// ESP-NOW receiver: event queue, indicator, and the loop that drives them.
pub struct Receiver<T: Transport> {
    config: ReceiverConfig,
    transport: Arc<T>,
    queue: EventQueue,
    indicator: Indicator,
    stats: Arc<ReceiverStats>,
    shutdown: ShutdownHandle,
}

impl<T: Transport + 'static> Receiver<T> {
    /// Build a receiver. Validates `config` and creates the event queue.
    pub fn new(
        config: ReceiverConfig,
        transport: Arc<T>,
        pin: impl IndicatorPin + 'static,
    ) -> Result<Self, ReceiverError> {
        config.validate()?;
        let queue = EventQueue::new(config.queue_capacity);
        let indicator = Indicator::new(pin, &config);

        Ok(Self {
            config,
            transport,
            queue,
            indicator,
            stats: Arc::new(ReceiverStats::new()),
            shutdown: ShutdownHandle::default(),
        })
    }

    /// Install the driver callbacks and register the peer.
    pub fn start(&self) -> Result<(), ReceiverError> {
        let bridge = self.bridge();
        let on_sent = bridge.clone();
        let send_cb: SendCallback = Box::new(move |mac: &[u8], outcome: SendOutcome| {
            let _ = on_sent.send_complete(mac, outcome);
        });
        let recv_cb: RecvCallback = Box::new(move |mac: &[u8], data: &[u8]| {
            let _ = bridge.datagram_received(mac, data);
        });
        self.transport.register_send_callback(send_cb)?;
        self.transport.register_recv_callback(recv_cb)?;

        let peer = PeerInfo::new(self.config.peer, self.config.channel);
        self.transport.add_peer(&peer)?;
        info!(
            "Peer {} registered on channel {} ({} peers in list)",
            peer.address,
            peer.channel,
            self.transport.peer_count()?
        );
        Ok(())
    }

    /// Callback bridge posting into this receiver's queue.
    pub fn bridge(&self) -> CallbackBridge {
        CallbackBridge::new(
            self.queue.sender(),
            self.stats.clone(),
            self.config.enqueue_timeout,
        )
    }

    /// Producer handle for the event queue.
    pub fn sender(&self) -> EventSender {
        self.queue.sender()
    }

    /// Shared counters.
    pub fn stats(&self) -> Arc<ReceiverStats> {
        self.stats.clone()
    }

    /// Handle to stop [`run`](Self::run) from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Run until shutdown is requested or an acknowledgment fails.
    ///
    /// Blocks the calling thread. Returns `Ok` after a requested shutdown
    /// and the transport error after a fatal send failure. Either way the
    /// receiver is consumed and torn down once.
    pub fn run(self) -> Result<(), ReceiverError> {
        info!(
            "Receiver loop started (queue {}, poll {:?})",
            self.queue.capacity(),
            self.config.poll_interval
        );

        let result = loop {
            if self.shutdown.is_requested() {
                info!("Receiver shutdown requested");
                break Ok(());
            }

            let Some(event) = self.queue.recv(self.config.poll_interval) else {
                continue;
            };

            if let Err(e) = self.dispatch(event) {
                error!("Send error: {}", e);
                break Err(ReceiverError::Transport(e));
            }
        };

        self.teardown();
        result
    }

    /// Execute the action for one event.
    fn dispatch(&self, event: Event) -> Result<(), TransportError> {
        debug!("Dispatching {}", event.kind());
        match event {
            Event::SendComplete { peer, outcome } => {
                self.on_send_complete(peer, outcome);
                Ok(())
            }
            Event::DatagramReceived { peer, payload } => {
                self.on_datagram(peer, &payload);
                Ok(())
            }
            Event::IndicatorDone => self.on_indicator_done(),
        }
    }

    fn on_send_complete(&self, peer: MacAddress, outcome: SendOutcome) {
        let success = outcome == SendOutcome::Success;
        self.stats.record_send_complete(success);
        match outcome {
            SendOutcome::Success => info!("Send to {} complete", peer),
            // Logged only; delivery failures are not escalated.
            SendOutcome::Failure => warn!("Send to {} not acknowledged", peer),
        }
    }

    fn on_datagram(&self, peer: MacAddress, payload: &[u8]) {
        if payload.is_empty() {
            warn!("Ignoring empty datagram from {}", peer);
            return;
        }
        info!(
            "Data received from {}: {} bytes [{}]",
            peer,
            payload.len(),
            hex_bytes(payload)
        );

        let events = self.queue.sender();
        if let Err(e) = self.indicator.spawn(events, self.stats.clone()) {
            error!("Failed to start indicator task: {}", e);
        }
    }

    fn on_indicator_done(&self) -> Result<(), TransportError> {
        let ack = build_ack(self.config.peer, ACK_PAYLOAD);
        self.transport.send(ack.dest, ack.payload)?;
        self.stats.record_ack();
        debug!("Ack ({} bytes) submitted to {}", ack.len(), ack.dest);
        Ok(())
    }

    /// Release everything the loop owns.
    fn teardown(&self) {
        self.queue.destroy();
        if let Err(e) = self.transport.deinit() {
            warn!("Transport deinit failed: {}", e);
        }
        info!("Receiver stopped: {}", self.stats.snapshot());
    }
}

impl<T: Transport> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("config", &self.config)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

/// Receiver errors.
#[derive(Debug)]
pub enum ReceiverError {
    /// Invalid configuration.
    Config(ConfigError),
    /// Transport failure (fatal when raised by the acknowledgment send).
    Transport(TransportError),
}

impl fmt::Display for ReceiverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration error: {}", e),
            Self::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}

impl std::error::Error for ReceiverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Transport(e) => Some(e),
        }
    }
}

impl From<ConfigError> for ReceiverError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<TransportError> for ReceiverError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}
