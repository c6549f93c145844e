//! Open-drain line on an RP2040 GPIO
//!
//! RP2040 pads have no open-drain mode. The output latch is set low once;
//! driving the line enables the output driver, releasing it turns the pad
//! back into an input so the pull-up takes over.

use embassy_rp::gpio::{Flex, Pin, Pull};
use embassy_rp::Peri;
use softwire_hal::gpio::OpenDrainLine;

/// Bus line on a direction-switching GPIO
pub struct FlexLine<'d> {
    pin: Flex<'d>,
}

impl<'d> FlexLine<'d> {
    /// Configure `pin` as a released line
    ///
    /// The internal pull-up (~50 kOhm) is enabled as a fallback; boards
    /// should still fit proper external pull-ups for anything above a few
    /// kHz.
    pub fn new(pin: Peri<'d, impl Pin>) -> Self {
        let mut pin = Flex::new(pin);
        pin.set_pull(Pull::Up);
        pin.set_low();
        pin.set_as_input();
        Self { pin }
    }
}

impl OpenDrainLine for FlexLine<'_> {
    fn drive_low(&mut self) {
        self.pin.set_as_output();
    }

    fn release(&mut self) {
        self.pin.set_as_input();
    }

    fn is_high(&mut self) -> bool {
        self.pin.is_high()
    }
}
