//! Receipt indicator: a timed pulse on a binary output.
//!
//! The event loop starts one [`Indicator::spawn`] task per received
//! datagram. The task runs on its own thread:
//!
//! 1. drive the pin high, hold for the pulse duration, drive it low
//! 2. reset the event queue, discarding any backlog
//! 3. post [`Event::IndicatorDone`]
//! 4. sleep for the settle duration and exit
//!
//! The loop only learns that the pulse finished through the queue.
//!
//! - [`gpio`]: ESP32 GPIO output (ESP32 only)

#[cfg(feature = "esp32")]
mod gpio;

#[cfg(feature = "esp32")]
pub use gpio::GpioIndicator;

use crate::config::ReceiverConfig;
use crate::event::{Event, EventSender};
use crate::stats::ReceiverStats;
use log::{debug, error, warn};
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Output level of the indicator pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// A binary output the indicator can drive.
pub trait IndicatorPin: Send {
    /// Set the output level.
    fn set(&mut self, level: Level) -> Result<(), IndicatorError>;
}

type SharedPin = Arc<Mutex<Box<dyn IndicatorPin>>>;

/// Spawns indicator pulses on a shared output pin.
#[derive(Clone)]
pub struct Indicator {
    pin: SharedPin,
    pulse: Duration,
    settle: Duration,
    enqueue_timeout: Duration,
    stack_size: usize,
}

impl Indicator {
    /// Wrap `pin` using the timing from `config`.
    pub fn new(pin: impl IndicatorPin + 'static, config: &ReceiverConfig) -> Self {
        Self {
            pin: Arc::new(Mutex::new(Box::new(pin))),
            pulse: config.pulse,
            settle: config.settle,
            enqueue_timeout: config.enqueue_timeout,
            stack_size: config.indicator_stack_size,
        }
    }

    /// Start one pulse on a new thread.
    ///
    /// Returns as soon as the thread is running. Completion is reported
    /// only by the `IndicatorDone` event it posts to `events`.
    pub fn spawn(
        &self,
        events: EventSender,
        stats: Arc<ReceiverStats>,
    ) -> io::Result<JoinHandle<()>> {
        let task = self.clone();
        thread::Builder::new()
            .name("indicator".to_string())
            .stack_size(task.stack_size)
            .spawn(move || task.run(&events, &stats))
    }

    /// Body of the indicator task.
    fn run(&self, events: &EventSender, stats: &ReceiverStats) {
        self.pulse_once();
        stats.record_pulse();

        let flushed = events.reset();
        if flushed > 0 {
            debug!("Indicator flushed {} stale events", flushed);
            stats.record_flushed(flushed);
        }

        if let Err(e) = events.post(Event::IndicatorDone, self.enqueue_timeout) {
            warn!("Indicator: {}", e);
            stats.record_dropped();
        }

        thread::sleep(self.settle);
    }

    /// Drive the pin high for the pulse duration, then low.
    ///
    /// The pin stays locked for the whole pulse, so overlapping tasks
    /// pulse one after another.
    fn pulse_once(&self) {
        let mut pin = self.lock_pin();
        if let Err(e) = pin.set(Level::High) {
            error!("Indicator on failed: {}", e);
        }
        thread::sleep(self.pulse);
        if let Err(e) = pin.set(Level::Low) {
            error!("Indicator off failed: {}", e);
        }
    }

    fn lock_pin(&self) -> MutexGuard<'_, Box<dyn IndicatorPin>> {
        match self.pin.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Indicator pin mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl fmt::Debug for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indicator")
            .field("pulse", &self.pulse)
            .field("settle", &self.settle)
            .finish_non_exhaustive()
    }
}

/// Number of level changes kept by [`RecordingPin`].
pub const PIN_HISTORY: usize = 64;

/// In-memory pin that records level changes.
///
/// Used by the host simulation and by tests. Clones share one history,
/// which keeps the last [`PIN_HISTORY`] changes. Completed pulses are
/// counted separately and never forgotten.
#[derive(Debug, Clone, Default)]
pub struct RecordingPin {
    history: Arc<Mutex<PinHistory>>,
}

#[derive(Debug, Default)]
struct PinHistory {
    transitions: VecDeque<(Level, Instant)>,
    pulses: usize,
}

impl RecordingPin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recent levels, oldest first.
    pub fn levels(&self) -> Vec<Level> {
        self.history()
            .transitions
            .iter()
            .map(|(level, _)| *level)
            .collect()
    }

    /// Recent level changes with the instant each was applied.
    pub fn transitions(&self) -> Vec<(Level, Instant)> {
        self.history().transitions.iter().copied().collect()
    }

    /// Number of completed high-then-low pulses.
    pub fn pulse_count(&self) -> usize {
        self.history().pulses
    }

    fn history(&self) -> MutexGuard<'_, PinHistory> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl IndicatorPin for RecordingPin {
    fn set(&mut self, level: Level) -> Result<(), IndicatorError> {
        debug!("Indicator -> {:?}", level);
        let mut history = self.history();
        let last = history.transitions.back().map(|(last, _)| *last);
        if last == Some(Level::High) && level == Level::Low {
            history.pulses += 1;
        }
        if history.transitions.len() == PIN_HISTORY {
            history.transitions.pop_front();
        }
        history.transitions.push_back((level, Instant::now()));
        Ok(())
    }
}

/// Indicator output errors.
#[derive(Debug)]
pub enum IndicatorError {
    /// The pin driver rejected the level change.
    Pin(String),
    /// ESP-IDF GPIO error.
    #[cfg(feature = "esp32")]
    Gpio(esp_idf_sys::EspError),
}

impl fmt::Display for IndicatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pin(msg) => write!(f, "pin error: {}", msg),
            #[cfg(feature = "esp32")]
            Self::Gpio(e) => write!(f, "GPIO error: {:?}", e),
        }
    }
}

impl std::error::Error for IndicatorError {}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for IndicatorError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Gpio(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SENDER_MAC;
    use crate::event::EventQueue;

    const SHORT: Duration = Duration::from_millis(10);

    fn fast_config() -> ReceiverConfig {
        ReceiverConfig::default()
            .with_indicator_timing(SHORT, SHORT)
            .with_enqueue_timeout(SHORT)
    }

    /// Pin whose driver always fails.
    struct BrokenPin;

    impl IndicatorPin for BrokenPin {
        fn set(&mut self, _level: Level) -> Result<(), IndicatorError> {
            Err(IndicatorError::Pin("stuck".to_string()))
        }
    }

    #[test]
    fn test_pulse_then_indicator_done() {
        let pin = RecordingPin::new();
        let indicator = Indicator::new(pin.clone(), &fast_config());
        let queue = EventQueue::new(6);
        let stats = Arc::new(ReceiverStats::new());

        indicator
            .spawn(queue.sender(), stats.clone())
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(pin.levels(), vec![Level::High, Level::Low]);
        let transitions = pin.transitions();
        let held = transitions[1].1.duration_since(transitions[0].1);
        assert!(held >= SHORT);
        assert_eq!(queue.recv(SHORT), Some(Event::IndicatorDone));
        assert!(queue.is_empty());
        assert_eq!(stats.snapshot().pulses, 1);
    }

    #[test]
    fn test_flushes_backlog_before_posting() {
        let pin = RecordingPin::new();
        let indicator = Indicator::new(pin, &fast_config());
        let queue = EventQueue::new(6);
        let sender = queue.sender();
        let stats = Arc::new(ReceiverStats::new());

        for byte in [0xa, 0xb] {
            sender
                .post(
                    Event::DatagramReceived {
                        peer: SENDER_MAC,
                        payload: vec![byte],
                    },
                    SHORT,
                )
                .unwrap();
        }

        indicator
            .spawn(sender, stats.clone())
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.recv(SHORT), Some(Event::IndicatorDone));
        assert_eq!(stats.snapshot().flushed, 2);
    }

    #[test]
    fn test_pin_failure_still_posts_done() {
        let indicator = Indicator::new(BrokenPin, &fast_config());
        let queue = EventQueue::new(6);
        let stats = Arc::new(ReceiverStats::new());

        indicator
            .spawn(queue.sender(), stats)
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(queue.recv(SHORT), Some(Event::IndicatorDone));
    }

    #[test]
    fn test_destroyed_queue_counts_drop() {
        let indicator = Indicator::new(RecordingPin::new(), &fast_config());
        let queue = EventQueue::new(6);
        let stats = Arc::new(ReceiverStats::new());
        queue.destroy();

        indicator
            .spawn(queue.sender(), stats.clone())
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(stats.snapshot().dropped, 1);
        assert_eq!(queue.recv(SHORT), None);
    }

    #[test]
    fn test_overlapping_pulses_do_not_interleave() {
        let pin = RecordingPin::new();
        let indicator = Indicator::new(pin.clone(), &fast_config());
        let queue = EventQueue::new(6);
        let stats = Arc::new(ReceiverStats::new());

        let a = indicator.spawn(queue.sender(), stats.clone()).unwrap();
        let b = indicator.spawn(queue.sender(), stats.clone()).unwrap();
        a.join().unwrap();
        b.join().unwrap();

        assert_eq!(
            pin.levels(),
            vec![Level::High, Level::Low, Level::High, Level::Low]
        );
        assert_eq!(pin.pulse_count(), 2);
    }

    #[test]
    fn test_recording_pin_history_is_capped() {
        let mut pin = RecordingPin::new();
        for _ in 0..PIN_HISTORY {
            pin.set(Level::High).unwrap();
            pin.set(Level::Low).unwrap();
        }

        assert_eq!(pin.levels().len(), PIN_HISTORY);
        assert_eq!(pin.pulse_count(), PIN_HISTORY);
    }
}
