//! Periodic tick source abstraction
//!
//! The bus engine never waits. A hardware timer (or any periodic source)
//! calls the engine once per tick, at 4x the bit rate, while it is running.
//! The engine starts the source when work arrives and stops it when the
//! queue drains or the bus faults.

/// Periodic tick generator driving one bus instance
pub trait TickSource {
    /// Start (or keep) generating ticks
    fn start(&mut self);

    /// Stop generating ticks
    fn stop(&mut self);

    /// Reset the timer count so the next tick is a full period away
    fn clear(&mut self) {}

    /// Check if ticks are currently being generated
    fn is_running(&self) -> bool;
}

impl<T: TickSource + ?Sized> TickSource for &mut T {
    fn start(&mut self) {
        T::start(self)
    }

    fn stop(&mut self) {
        T::stop(self)
    }

    fn clear(&mut self) {
        T::clear(self)
    }

    fn is_running(&self) -> bool {
        T::is_running(self)
    }
}
