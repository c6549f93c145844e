//! Open-drain line abstraction
//!
//! An I2C line can only be actively driven low. Releasing it lets the
//! pull-up resistor (or another device still driving it) decide the level,
//! so the level read back may differ from what this side asked for.

/// Logic level observed on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Line is pulled low by at least one device
    Low,
    /// Line is released by every device and pulled up
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// One open-drain bus line
///
/// Implementations typically switch the pin between "output, driving 0" and
/// "input" so that the line floats when released.
pub trait OpenDrainLine {
    /// Actively pull the line low
    fn drive_low(&mut self);

    /// Stop driving the line and let it float
    fn release(&mut self);

    /// Check if the line currently reads high
    ///
    /// Takes `&mut self` because reading a pin may touch hardware state
    /// (and does in `embedded-hal` 1.0).
    fn is_high(&mut self) -> bool;

    /// Check if the line currently reads low
    fn is_low(&mut self) -> bool {
        !self.is_high()
    }

    /// Read the current level
    fn level(&mut self) -> Level {
        Level::from(self.is_high())
    }
}

impl<T: OpenDrainLine + ?Sized> OpenDrainLine for &mut T {
    fn drive_low(&mut self) {
        T::drive_low(self)
    }

    fn release(&mut self) {
        T::release(self)
    }

    fn is_high(&mut self) -> bool {
        T::is_high(self)
    }
}
