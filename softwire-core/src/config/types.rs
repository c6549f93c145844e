//! Configuration type definitions
//!
//! Bus timing and capacity parameters. Capacities are compile-time
//! constants because every buffer lives inside a fixed queue slot.

use softwire_hal::i2c::{I2cConfig, MAX_FREQUENCY, TICKS_PER_BIT};

use crate::error::BusError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum bytes per write or read buffer in one transaction
pub const MAX_TRANSFER_LEN: usize = 64;

/// Default queue depth per bus (one slot always stays empty)
pub const DEFAULT_QUEUE_DEPTH: usize = 8;

/// Deepest queue a handle can address (slot indices are stored as `u8`)
pub const MAX_QUEUE_DEPTH: usize = u8::MAX as usize + 1;

/// Default number of ticks a check phase may wait for a released line
pub const DEFAULT_ERROR_TIMEOUT_TICKS: u32 = 2_000_000;

/// Bus instance configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    /// SCL bit rate in Hz (tick source runs at 4x this)
    pub bit_rate_hz: u32,
    /// Ticks a check phase waits for a line before declaring a bus fault
    pub error_timeout_ticks: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl BusConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self {
        bit_rate_hz: 100_000,
        error_timeout_ticks: DEFAULT_ERROR_TIMEOUT_TICKS,
    };

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self {
        bit_rate_hz: MAX_FREQUENCY,
        error_timeout_ticks: DEFAULT_ERROR_TIMEOUT_TICKS,
    };

    /// Same bit rate, different fault timeout
    pub const fn with_timeout(self, error_timeout_ticks: u32) -> Self {
        Self {
            bit_rate_hz: self.bit_rate_hz,
            error_timeout_ticks,
        }
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), BusError> {
        if !self.i2c().is_valid() || self.error_timeout_ticks == 0 {
            return Err(BusError::InvalidConfig);
        }
        Ok(())
    }

    /// Frequency the tick source must be programmed with
    pub fn tick_rate_hz(&self) -> u32 {
        self.bit_rate_hz * TICKS_PER_BIT
    }

    /// Half of one SCL period in nanoseconds (bus reset pacing)
    pub fn half_period_ns(&self) -> u32 {
        self.i2c().half_period_ns()
    }

    /// View as the HAL-level bus speed
    pub fn i2c(&self) -> I2cConfig {
        I2cConfig {
            frequency: self.bit_rate_hz,
        }
    }

    /// Serialize for storage
    ///
    /// Returns the used part of `buf`.
    #[cfg(feature = "serde")]
    pub fn encode<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], BusError> {
        postcard::to_slice(self, buf).map_err(|_| BusError::InvalidConfig)
    }

    /// Deserialize and validate a stored configuration
    #[cfg(feature = "serde")]
    pub fn decode(bytes: &[u8]) -> Result<Self, BusError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| BusError::InvalidConfig)?;
        config.validate()?;
        Ok(config)
    }
}

impl From<I2cConfig> for BusConfig {
    fn from(config: I2cConfig) -> Self {
        Self {
            bit_rate_hz: config.frequency,
            error_timeout_ticks: DEFAULT_ERROR_TIMEOUT_TICKS,
        }
    }
}
