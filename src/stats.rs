//! Receiver counters.
//!
//! Updated from callback context, the indicator task and the event loop, so
//! every field is atomic. A summary is logged when the event loop stops.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters shared by every part of the receiver.
#[derive(Debug, Default)]
pub struct ReceiverStats {
    /// Datagrams accepted at the callback boundary.
    pub datagrams: AtomicUsize,
    /// Notifications rejected as malformed.
    pub malformed: AtomicUsize,
    /// Events dropped because the queue stayed full or was destroyed.
    pub dropped: AtomicUsize,
    /// Events discarded by the indicator's queue reset.
    pub flushed: AtomicUsize,
    /// Indicator pulses completed.
    pub pulses: AtomicUsize,
    /// Send-complete notifications reporting success.
    pub send_ok: AtomicUsize,
    /// Send-complete notifications reporting failure.
    pub send_failed: AtomicUsize,
    /// Acknowledgments accepted by the transport.
    pub acks: AtomicUsize,
}

impl ReceiverStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_datagram(&self) {
        self.datagrams.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flushed(&self, count: usize) {
        self.flushed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_pulse(&self) {
        self.pulses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_complete(&self, success: bool) {
        if success {
            self.send_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.send_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_ack(&self) {
        self.acks.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            datagrams: self.datagrams.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            flushed: self.flushed.load(Ordering::Relaxed),
            pulses: self.pulses.load(Ordering::Relaxed),
            send_ok: self.send_ok.load(Ordering::Relaxed),
            send_failed: self.send_failed.load(Ordering::Relaxed),
            acks: self.acks.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`ReceiverStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub datagrams: usize,
    pub malformed: usize,
    pub dropped: usize,
    pub flushed: usize,
    pub pulses: usize,
    pub send_ok: usize,
    pub send_failed: usize,
    pub acks: usize,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rx={} malformed={} dropped={} flushed={} pulses={} tx_ok={} tx_fail={} acks={}",
            self.datagrams,
            self.malformed,
            self.dropped,
            self.flushed,
            self.pulses,
            self.send_ok,
            self.send_failed,
            self.acks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let stats = ReceiverStats::new();
        stats.record_datagram();
        stats.record_datagram();
        stats.record_malformed();
        stats.record_flushed(3);
        stats.record_send_complete(true);
        stats.record_send_complete(false);
        stats.record_ack();

        let snap = stats.snapshot();
        assert_eq!(snap.datagrams, 2);
        assert_eq!(snap.malformed, 1);
        assert_eq!(snap.flushed, 3);
        assert_eq!(snap.send_ok, 1);
        assert_eq!(snap.send_failed, 1);
        assert_eq!(snap.acks, 1);
        assert_eq!(snap.dropped, 0);
    }

    #[test]
    fn test_snapshot_display() {
        let snap = StatsSnapshot {
            datagrams: 1,
            acks: 1,
            ..Default::default()
        };
        assert_eq!(
            snap.to_string(),
            "rx=1 malformed=0 dropped=0 flushed=0 pulses=0 tx_ok=0 tx_fail=0 acks=1"
        );
    }
}
