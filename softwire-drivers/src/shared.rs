//! Bus shared between task and tick context
//!
//! The tick handler runs in an interrupt while tasks submit and poll. Both
//! sides go through a critical-section mutex around the bus, held only for
//! one call: a submit, a query, or a single engine step.
//!
//! Completions can be awaited through [`SignalNotifier`].

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embedded_hal::delay::DelayNs;
use softwire_core::{
    BitBangBus, BusError, Completion, CompletionNotifier, Phase, Request, Submitter,
    TransactionHandle, TransactionStatus,
};
use softwire_hal::gpio::OpenDrainLine;
use softwire_hal::timer::TickSource;

/// Bit-banged bus behind a critical-section mutex
pub struct SharedBus<L, T, C, const N: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<BitBangBus<L, T, C, N>>>,
}

impl<L, T, C, const N: usize> SharedBus<L, T, C, N>
where
    L: OpenDrainLine,
    T: TickSource,
    C: CompletionNotifier<N>,
{
    pub const fn new(bus: BitBangBus<L, T, C, N>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(bus)),
        }
    }

    /// Run `f` with exclusive access to the bus
    pub fn with<R>(&self, f: impl FnOnce(&mut BitBangBus<L, T, C, N>) -> R) -> R {
        self.inner.lock(|bus| f(&mut bus.borrow_mut()))
    }

    // Tick context

    /// Advance the engine by one sub-state; call from the timer interrupt
    pub fn on_tick(&self) {
        self.with(|bus| bus.on_tick());
    }

    // Task context

    pub fn submit(&self, request: Request<'_>) -> Result<TransactionHandle, BusError> {
        self.with(|bus| bus.submit(request))
    }

    pub fn submit_write(&self, address: u8, bytes: &[u8]) -> Result<TransactionHandle, BusError> {
        self.submit(Request::write(address, bytes))
    }

    pub fn submit_read(&self, address: u8, len: usize) -> Result<TransactionHandle, BusError> {
        self.submit(Request::read(address, len))
    }

    pub fn submit_write_then_read(
        &self,
        address: u8,
        bytes: &[u8],
        read_len: usize,
    ) -> Result<TransactionHandle, BusError> {
        self.submit(Request::write_then_read(address, bytes, read_len))
    }

    pub fn submit_forced_write(
        &self,
        address: u8,
        bytes: &[u8],
    ) -> Result<TransactionHandle, BusError> {
        self.submit(Request::forced_write(address, bytes))
    }

    pub fn status(&self, handle: TransactionHandle) -> Option<TransactionStatus> {
        self.with(|bus| bus.status(handle))
    }

    pub fn bytes_transferred(&self, handle: TransactionHandle) -> Option<usize> {
        self.with(|bus| bus.bytes_transferred(handle))
    }

    /// Copy received bytes into `buf`; returns how many were copied
    pub fn read_data(&self, handle: TransactionHandle, buf: &mut [u8]) -> Option<usize> {
        self.with(|bus| {
            let data = bus.read_data(handle)?;
            let len = data.len().min(buf.len());
            buf[..len].copy_from_slice(&data[..len]);
            Some(len)
        })
    }

    pub fn is_idle(&self) -> bool {
        self.with(|bus| bus.is_idle())
    }

    pub fn phase(&self) -> Phase {
        self.with(|bus| bus.phase())
    }

    /// Clock a stuck slave free
    ///
    /// Holds the lock for the whole reset (about ten bit periods), so ticks
    /// are held off meanwhile.
    pub fn bus_reset<D: DelayNs>(&self, delay: &mut D) -> Result<(), BusError> {
        self.with(|bus| bus.bus_reset(delay))
    }
}

/// Publishes every completion to a signal
///
/// A task awaits `signal.wait()`; only the latest completion is kept, so
/// submit the next transaction after the previous one has been consumed.
pub struct SignalNotifier<'a> {
    signal: &'a Signal<CriticalSectionRawMutex, Completion>,
}

impl<'a> SignalNotifier<'a> {
    pub const fn new(signal: &'a Signal<CriticalSectionRawMutex, Completion>) -> Self {
        Self { signal }
    }
}

impl<const N: usize> CompletionNotifier<N> for SignalNotifier<'_> {
    fn on_complete(&mut self, completion: Completion, _queue: &mut Submitter<'_, N>) {
        self.signal.signal(completion);
    }
}
