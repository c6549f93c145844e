//! Tick source on embassy-time
//!
//! The bus opens the gate when work arrives; [`run_ticker`] then steps the
//! engine once per tick period until the bus closes the gate again, and
//! parks on a signal in between.
//!
//! embassy-time rounds the period to its tick rate, so at 400 kHz (2.5 us
//! per tick) the effective bit rate is lower than configured unless the time
//! driver runs faster than the default 1 MHz.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};
use softwire_core::config::BusConfig;
use softwire_core::CompletionNotifier;
use softwire_drivers::{SharedBus, TickGate};
use softwire_hal::gpio::OpenDrainLine;
use softwire_hal::timer::TickSource;

/// Tick gate that also wakes the ticker task
pub struct WakingGate {
    gate: TickGate,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl WakingGate {
    pub const fn new() -> Self {
        Self {
            gate: TickGate::new(),
            wake: Signal::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.gate.is_open()
    }
}

impl Default for WakingGate {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for &WakingGate {
    fn start(&mut self) {
        let mut gate = &self.gate;
        gate.start();
        self.wake.signal(());
    }

    fn stop(&mut self) {
        let mut gate = &self.gate;
        gate.stop();
    }

    fn clear(&mut self) {
        let mut gate = &self.gate;
        gate.clear();
    }

    fn is_running(&self) -> bool {
        self.gate.is_open()
    }
}

/// Drive `bus` from an embassy task
///
/// Call from a task dedicated to this bus; never returns.
pub async fn run_ticker<L, C, const N: usize>(
    bus: &SharedBus<L, &'static WakingGate, C, N>,
    gate: &'static WakingGate,
    config: BusConfig,
) -> !
where
    L: OpenDrainLine,
    C: CompletionNotifier<N>,
{
    let period = Duration::from_nanos(u64::from(config.i2c().tick_period_ns()));
    #[cfg(feature = "defmt")]
    defmt::info!("bus ticker every {} us", period.as_micros());

    loop {
        gate.wake.wait().await;

        let mut ticker = Ticker::every(period);
        let mut ticks: u32 = 0;
        while gate.is_open() {
            bus.on_tick();
            ticks = ticks.wrapping_add(1);
            ticker.next().await;
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("bus burst done after {} ticks", ticks);
        #[cfg(not(feature = "defmt"))]
        let _ = ticks;
    }
}
