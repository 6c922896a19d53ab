//! In-memory transport for host runs and tests.
//!
//! Frames handed to [`send`](Transport::send) are recorded instead of
//! transmitted, and a send-complete notification is delivered straight
//! away through the registered hook. Incoming traffic is simulated with
//! [`LoopbackTransport::inject_receive`].

use super::{check_payload, RecvCallback, SendCallback, Transport, TransportError};
use crate::config::{MacAddress, PeerInfo};
use crate::event::SendOutcome;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Number of most recent frames kept by [`LoopbackTransport::sent`].
pub const SENT_HISTORY: usize = 64;

type SharedSendCallback = Arc<dyn Fn(&[u8], SendOutcome) + Send + Sync>;
type SharedRecvCallback = Arc<dyn Fn(&[u8], &[u8]) + Send + Sync>;

/// A frame accepted by [`LoopbackTransport::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub dest: MacAddress,
    pub payload: Vec<u8>,
    pub at: Instant,
}

#[derive(Default)]
struct State {
    initialized: bool,
    peers: Vec<PeerInfo>,
    sent: VecDeque<SentFrame>,
    sent_total: usize,
    send_cb: Option<SharedSendCallback>,
    recv_cb: Option<SharedRecvCallback>,
    fail_sends: usize,
    deinit_count: usize,
}

/// Loopback transport.
pub struct LoopbackTransport {
    state: Mutex<State>,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackTransport {
    /// Create an initialized transport with an empty peer list.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                initialized: true,
                ..Default::default()
            }),
        }
    }

    /// Make the next `count` calls to `send` fail.
    pub fn fail_next_sends(&self, count: usize) {
        self.state().fail_sends = count;
    }

    /// Deliver a datagram through the receive hook.
    ///
    /// Returns `false` if no hook is installed.
    pub fn inject_receive(&self, src: &[u8], payload: &[u8]) -> bool {
        let callback = self.state().recv_cb.clone();
        match callback {
            Some(cb) => {
                cb(src, payload);
                true
            }
            None => {
                debug!("Loopback: no receive hook, {} bytes dropped", payload.len());
                false
            }
        }
    }

    /// Deliver a send-complete notification through the send hook.
    ///
    /// Returns `false` if no hook is installed.
    pub fn inject_send_complete(&self, peer: &[u8], outcome: SendOutcome) -> bool {
        let callback = self.state().send_cb.clone();
        match callback {
            Some(cb) => {
                cb(peer, outcome);
                true
            }
            None => false,
        }
    }

    /// The last [`SENT_HISTORY`] frames accepted, oldest first.
    pub fn sent(&self) -> Vec<SentFrame> {
        self.state().sent.iter().cloned().collect()
    }

    /// Number of frames accepted so far.
    pub fn sent_count(&self) -> usize {
        self.state().sent_total
    }

    /// Registered peers.
    pub fn peers(&self) -> Vec<PeerInfo> {
        self.state().peers.clone()
    }

    /// Whether the transport is still initialized.
    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    /// How many times `deinit` actually shut the transport down.
    pub fn deinit_count(&self) -> usize {
        self.state().deinit_count
    }

    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Loopback transport mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Transport for LoopbackTransport {
    fn register_send_callback(&self, callback: SendCallback) -> Result<(), TransportError> {
        let mut state = self.state();
        if !state.initialized {
            return Err(TransportError::NotInitialized);
        }
        state.send_cb = Some(Arc::from(callback));
        Ok(())
    }

    fn register_recv_callback(&self, callback: RecvCallback) -> Result<(), TransportError> {
        let mut state = self.state();
        if !state.initialized {
            return Err(TransportError::NotInitialized);
        }
        state.recv_cb = Some(Arc::from(callback));
        Ok(())
    }

    fn add_peer(&self, peer: &PeerInfo) -> Result<(), TransportError> {
        let mut state = self.state();
        if !state.initialized {
            return Err(TransportError::NotInitialized);
        }
        if !state.peers.iter().any(|p| p.address == peer.address) {
            state.peers.push(*peer);
        }
        Ok(())
    }

    fn peer_count(&self) -> Result<usize, TransportError> {
        let state = self.state();
        if !state.initialized {
            return Err(TransportError::NotInitialized);
        }
        Ok(state.peers.len())
    }

    fn send(&self, dest: MacAddress, payload: &[u8]) -> Result<(), TransportError> {
        let callback = {
            let mut state = self.state();
            if !state.initialized {
                return Err(TransportError::NotInitialized);
            }
            check_payload(payload)?;
            if !state.peers.iter().any(|p| p.address == dest) {
                return Err(TransportError::UnknownPeer(dest));
            }
            if state.fail_sends > 0 {
                state.fail_sends -= 1;
                return Err(TransportError::SendFailed("injected failure".to_string()));
            }
            if state.sent.len() == SENT_HISTORY {
                state.sent.pop_front();
            }
            state.sent.push_back(SentFrame {
                dest,
                payload: payload.to_vec(),
                at: Instant::now(),
            });
            state.sent_total += 1;
            state.send_cb.clone()
        };

        debug!("Loopback TX: {} bytes to {}", payload.len(), dest);
        // Synchronous on the loop thread: a full queue stalls it for the enqueue timeout.
        if let Some(cb) = callback {
            cb(&dest.octets(), SendOutcome::Success);
        }
        Ok(())
    }

    fn deinit(&self) -> Result<(), TransportError> {
        let mut state = self.state();
        if !state.initialized {
            return Ok(());
        }
        state.initialized = false;
        state.peers.clear();
        state.send_cb = None;
        state.recv_cb = None;
        state.deinit_count += 1;
        info!("Loopback transport deinitialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RECEIVER_MAC, SENDER_MAC};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn with_sender_peer() -> LoopbackTransport {
        let transport = LoopbackTransport::new();
        transport.add_peer(&PeerInfo::new(SENDER_MAC, 1)).unwrap();
        transport
    }

    #[test]
    fn test_add_peer_is_idempotent() {
        let transport = with_sender_peer();
        transport.add_peer(&PeerInfo::new(SENDER_MAC, 1)).unwrap();
        assert_eq!(transport.peer_count().unwrap(), 1);
    }

    #[test]
    fn test_send_records_and_reports_completion() {
        let transport = with_sender_peer();
        let completions = Arc::new(AtomicUsize::new(0));
        let seen = completions.clone();
        let callback: SendCallback = Box::new(move |mac: &[u8], outcome: SendOutcome| {
            assert_eq!(mac, &SENDER_MAC.octets());
            assert_eq!(outcome, SendOutcome::Success);
            seen.fetch_add(1, Ordering::SeqCst);
        });
        transport.register_send_callback(callback).unwrap();

        transport.send(SENDER_MAC, b"ok").unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].dest, SENDER_MAC);
        assert_eq!(sent[0].payload, b"ok");
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_send_to_unknown_peer_fails() {
        let transport = with_sender_peer();
        assert!(matches!(
            transport.send(RECEIVER_MAC, b"ok"),
            Err(TransportError::UnknownPeer(_))
        ));
        assert_eq!(transport.sent_count(), 0);
    }

    #[test]
    fn test_injected_send_failure() {
        let transport = with_sender_peer();
        transport.fail_next_sends(1);
        assert!(matches!(
            transport.send(SENDER_MAC, b"ok"),
            Err(TransportError::SendFailed(_))
        ));
        assert!(transport.send(SENDER_MAC, b"ok").is_ok());
        assert_eq!(transport.sent_count(), 1);
    }

    #[test]
    fn test_inject_receive_without_hook() {
        let transport = LoopbackTransport::new();
        assert!(!transport.inject_receive(&SENDER_MAC.octets(), b"hi"));
    }

    #[test]
    fn test_inject_receive_reaches_hook() {
        let transport = LoopbackTransport::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let callback: RecvCallback = Box::new(move |_: &[u8], data: &[u8]| {
            seen.fetch_add(data.len(), Ordering::SeqCst);
        });
        transport.register_recv_callback(callback).unwrap();

        assert!(transport.inject_receive(&SENDER_MAC.octets(), &[1, 2, 3]));
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_deinit_clears_state_once() {
        let transport = with_sender_peer();
        let callback: RecvCallback = Box::new(|_: &[u8], _: &[u8]| {});
        transport.register_recv_callback(callback).unwrap();

        transport.deinit().unwrap();
        transport.deinit().unwrap();

        assert_eq!(transport.deinit_count(), 1);
        assert!(!transport.is_initialized());
        assert!(!transport.inject_receive(&SENDER_MAC.octets(), b"late"));
        assert!(matches!(
            transport.send(SENDER_MAC, b"ok"),
            Err(TransportError::NotInitialized)
        ));
        assert!(transport.peer_count().is_err());
    }

    #[test]
    fn test_sent_history_is_capped() {
        let transport = with_sender_peer();
        for i in 0..SENT_HISTORY + 10 {
            let payload = [i as u8 + 1];
            transport.send(SENDER_MAC, &payload).unwrap();
        }

        let sent = transport.sent();
        assert_eq!(sent.len(), SENT_HISTORY);
        assert_eq!(sent[0].payload, vec![11]);
        assert_eq!(transport.sent_count(), SENT_HISTORY + 10);
    }
}
