//! GPIO-driven receipt LED.
//!
//! The firmware drives the board LED on GPIO2 as a push-pull output with
//! no pulls and no interrupt.

use super::{IndicatorError, IndicatorPin, Level};
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use log::debug;

/// LED on an ESP32 output pin.
pub struct GpioIndicator<'d> {
    pin: PinDriver<'d, AnyOutputPin, Output>,
}

impl<'d> GpioIndicator<'d> {
    /// Configure `pin` as an output, starting low.
    pub fn new(pin: AnyOutputPin) -> Result<Self, IndicatorError> {
        let mut pin = PinDriver::output(pin)?;
        pin.set_low()?;
        debug!("Indicator GPIO{} configured", pin.pin());
        Ok(Self { pin })
    }
}

impl IndicatorPin for GpioIndicator<'static> {
    fn set(&mut self, level: Level) -> Result<(), IndicatorError> {
        match level {
            Level::High => self.pin.set_high()?,
            Level::Low => self.pin.set_low()?,
        }
        Ok(())
    }
}

// Note: Tests for this module require ESP32 hardware.
