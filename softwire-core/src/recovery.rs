//! Bus recovery
//!
//! A slave reset in the middle of a read can be left driving DATA low,
//! waiting for clocks the master will never send. Clocking it through the
//! rest of its byte makes it let go; START and STOP then put every slave
//! back into its idle state.

use embedded_hal::delay::DelayNs;
use softwire_hal::gpio::OpenDrainLine;

use crate::error::BusError;

/// Clock pulses generated, enough to finish any byte plus its ACK slot
pub const RESET_CLOCK_PULSES: usize = 9;

/// Bit-bang START, nine clocks and STOP
///
/// Blocks for roughly ten SCL periods. Only call while the engine is idle;
/// the lines are driven directly. Returns [`BusError::BusStuck`] if DATA is
/// still low afterwards.
pub fn bus_reset<L, D>(scl: &mut L, sda: &mut L, delay: &mut D, half_period_ns: u32) -> Result<(), BusError>
where
    L: OpenDrainLine,
    D: DelayNs,
{
    scl.release();
    sda.release();
    delay.delay_ns(half_period_ns);

    // START then STOP
    sda.drive_low();
    delay.delay_ns(half_period_ns);
    sda.release();
    delay.delay_ns(half_period_ns);

    for _ in 0..RESET_CLOCK_PULSES {
        scl.drive_low();
        delay.delay_ns(half_period_ns);
        scl.release();
        delay.delay_ns(half_period_ns);
    }

    // Final STOP: DATA rises while CLOCK is high
    scl.drive_low();
    delay.delay_ns(half_period_ns);
    sda.drive_low();
    delay.delay_ns(half_period_ns);
    scl.release();
    delay.delay_ns(half_period_ns);
    sda.release();
    delay.delay_ns(half_period_ns);

    if sda.is_low() || scl.is_low() {
        warn!("bus still held low after reset");
        return Err(BusError::BusStuck);
    }
    info!("bus reset complete");
    Ok(())
}
