//! I2C bus abstractions
//!
//! Provides the blocking master interface that client drivers are written
//! against, and the bus speed configuration shared by the engine.

/// I2C bus master
///
/// Provides basic I2C read/write operations for communicating with
/// peripheral devices.
pub trait I2cBus {
    /// Error type for I2C operations
    type Error;

    /// Write data to a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `data` - Bytes to write
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read data from a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `buf` - Buffer to read into
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write then read in a single transaction (repeated start)
    ///
    /// This is commonly used to write a register address then read data.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `write_data` - Bytes to write (typically register address)
    /// * `read_buf` - Buffer to read into
    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error>;
}

/// Highest bit rate a software master is specified for
pub const MAX_FREQUENCY: u32 = 400_000;

/// Number of tick-source periods per SCL period
pub const TICKS_PER_BIT: u32 = 4;

/// I2C configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { frequency: 100_000 };

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self {
        frequency: MAX_FREQUENCY,
    };

    /// Check the frequency is usable for a bit-banged master
    pub fn is_valid(&self) -> bool {
        self.frequency > 0 && self.frequency <= MAX_FREQUENCY
    }

    /// Frequency the tick source must run at
    pub fn tick_frequency(&self) -> u32 {
        self.frequency * TICKS_PER_BIT
    }

    /// Half of one SCL period, in nanoseconds
    pub fn half_period_ns(&self) -> u32 {
        1_000_000_000 / (self.frequency.max(1) * 2)
    }

    /// One tick-source period, in nanoseconds
    pub fn tick_period_ns(&self) -> u32 {
        1_000_000_000 / self.tick_frequency().max(1)
    }
}
