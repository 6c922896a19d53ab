//! Bounded event queue between interrupt-side producers and the event loop.
//!
//! The queue is created once at start-up. The event loop owns the
//! [`EventQueue`]; radio callbacks and the indicator task hold cloned
//! [`EventSender`] handles. Producers never block longer than the timeout
//! they pass to [`EventSender::post`], so a full queue cannot stall the
//! radio driver's callback context.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use espnow_receiver::event::{Event, EventQueue};
//!
//! let queue = EventQueue::new(6);
//! let sender = queue.sender();
//!
//! sender.post(Event::IndicatorDone, Duration::from_millis(10)).unwrap();
//! assert_eq!(queue.recv(Duration::from_millis(10)), Some(Event::IndicatorDone));
//! assert_eq!(queue.recv(Duration::from_millis(10)), None);
//! ```

use super::Event;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use log::debug;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// State shared by every handle to one queue.
#[derive(Debug)]
struct Shared {
    capacity: usize,
    destroyed: AtomicBool,
}

/// Consumer side of the event queue.
#[derive(Debug)]
pub struct EventQueue {
    tx: Sender<Event>,
    rx: Receiver<Event>,
    shared: Arc<Shared>,
}

impl EventQueue {
    /// Create a queue holding at most `capacity` events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "event queue capacity must be at least 1");
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            shared: Arc::new(Shared {
                capacity,
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    /// Producer handle for callbacks and tasks.
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            shared: self.shared.clone(),
        }
    }

    /// Wait up to `timeout` for the next event.
    ///
    /// Returns `None` when the timeout elapses with nothing queued, or once
    /// the queue has been destroyed.
    pub fn recv(&self, timeout: Duration) -> Option<Event> {
        if self.is_destroyed() {
            return None;
        }
        let event = self.rx.recv_timeout(timeout).ok()?;
        if self.is_destroyed() {
            return None;
        }
        Some(event)
    }

    /// Destroy the queue.
    ///
    /// Pending events are discarded and every later post fails. Returns
    /// `false` if the queue was already destroyed.
    pub fn destroy(&self) -> bool {
        if self.shared.destroyed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let discarded = self.rx.try_iter().count();
        debug!(
            "Event queue destroyed ({} pending events discarded)",
            discarded
        );
        true
    }

    /// Whether [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.shared.destroyed.load(Ordering::SeqCst)
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Maximum number of queued events.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

/// Producer side of the event queue.
///
/// Cheap to clone. Safe to use from radio callbacks: [`post`](Self::post)
/// waits at most the given timeout.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<Event>,
    // Only used by `reset`.
    rx: Receiver<Event>,
    shared: Arc<Shared>,
}

impl EventSender {
    /// Enqueue an event, waiting at most `timeout` for a free slot.
    ///
    /// On failure the event is handed back inside the error so the caller
    /// can log what was dropped.
    pub fn post(&self, event: Event, timeout: Duration) -> Result<(), QueueError> {
        if self.is_destroyed() {
            return Err(QueueError::Destroyed(event));
        }
        self.tx.send_timeout(event, timeout).map_err(|e| match e {
            SendTimeoutError::Timeout(event) => QueueError::Full(event),
            SendTimeoutError::Disconnected(event) => QueueError::Destroyed(event),
        })
    }

    /// Discard every queued event. Returns how many were dropped.
    pub fn reset(&self) -> usize {
        self.rx.try_iter().count()
    }

    /// Whether the queue has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.shared.destroyed.load(Ordering::SeqCst)
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Why an event could not be queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// No slot freed up within the timeout.
    Full(Event),
    /// The queue was destroyed.
    Destroyed(Event),
}

impl QueueError {
    /// The event that was not queued.
    pub fn into_event(self) -> Event {
        match self {
            Self::Full(event) | Self::Destroyed(event) => event,
        }
    }
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(event) => write!(f, "queue full, dropped {} event", event.kind()),
            Self::Destroyed(event) => {
                write!(f, "queue destroyed, dropped {} event", event.kind())
            }
        }
    }
}

impl std::error::Error for QueueError {}
