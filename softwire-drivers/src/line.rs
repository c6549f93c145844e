//! embedded-hal pin adapter
//!
//! Wraps a pin that the board HAL already configured as open-drain output
//! with its input buffer enabled. Setting it high releases the line; reading
//! it returns the actual bus level.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use softwire_hal::gpio::OpenDrainLine;

/// Open-drain bus line on an embedded-hal pin
pub struct PinLine<P> {
    pin: P,
}

impl<P> PinLine<P>
where
    P: OutputPin + InputPin + ErrorType<Error = Infallible>,
{
    /// Wrap a pin and release it
    pub fn new(pin: P) -> Self {
        let mut line = Self { pin };
        line.release();
        line
    }

    /// Give the pin back
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> OpenDrainLine for PinLine<P>
where
    P: OutputPin + InputPin + ErrorType<Error = Infallible>,
{
    fn drive_low(&mut self) {
        match self.pin.set_low() {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    fn release(&mut self) {
        match self.pin.set_high() {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    fn is_high(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => high,
            Err(never) => match never {},
        }
    }
}
