//! Tick sources without a dedicated timer
//!
//! [`SoftTick`] is a plain flag for code that pumps the engine itself (see
//! [`crate::polled`]). [`TickGate`] is shared between the bus and whatever
//! generates ticks (a timer interrupt or an async loop): the bus opens and
//! closes the gate, the generator only ticks while it is open.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};
use softwire_hal::timer::TickSource;

/// Tick source owned by the caller's own loop
#[derive(Debug, Default)]
pub struct SoftTick {
    running: bool,
}

impl SoftTick {
    pub const fn new() -> Self {
        Self { running: false }
    }
}

impl TickSource for SoftTick {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

/// Run flag shared with an interrupt or task
///
/// Usually a `static`; the bus holds a `&'static TickGate`.
#[derive(Debug, Default)]
pub struct TickGate {
    running: AtomicBool,
    /// Bumped on every `clear`, so a generator can restart its period
    epoch: AtomicU32,
}

impl TickGate {
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            epoch: AtomicU32::new(0),
        }
    }

    /// Check if the generator should tick
    pub fn is_open(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of times the bus asked for a fresh period
    pub fn epoch(&self) -> u32 {
        self.epoch.load(Ordering::Relaxed)
    }
}

impl TickSource for &TickGate {
    fn start(&mut self) {
        self.running.store(true, Ordering::Release);
        trace!("tick gate open");
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        trace!("tick gate closed");
    }

    fn clear(&mut self) {
        self.epoch.fetch_add(1, Ordering::Relaxed);
    }

    fn is_running(&self) -> bool {
        self.is_open()
    }
}
