//! Blocking bus driven by the caller
//!
//! [`PolledBus`] has no timer: each call submits one transaction and then
//! pumps the engine itself, sleeping a quarter bit between ticks. Useful
//! during bring-up, in bootloaders and wherever no interrupt is spare.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c, Operation as HalOperation};
use softwire_core::config::BusConfig;
use softwire_core::{BitBangBus, BusError, NoopNotifier, Request, TransactionHandle, TransactionStatus};
use softwire_hal::gpio::OpenDrainLine;
use softwire_hal::i2c::I2cBus;
use softwire_hal::timer::TickSource;

use crate::tick::SoftTick;

/// One transaction in flight at a time, so a small queue is enough
const POLLED_QUEUE_DEPTH: usize = 2;

/// Bit-banged bus that completes every call before returning
pub struct PolledBus<L, D> {
    bus: BitBangBus<L, SoftTick, NoopNotifier, POLLED_QUEUE_DEPTH>,
    delay: D,
    tick_ns: u32,
}

impl<L, D> PolledBus<L, D>
where
    L: OpenDrainLine,
    D: DelayNs,
{
    pub fn new(scl: L, sda: L, delay: D, config: BusConfig) -> Result<Self, BusError> {
        let bus = BitBangBus::new(scl, sda, SoftTick::new(), NoopNotifier, config)?;
        Ok(Self {
            bus,
            delay,
            tick_ns: config.i2c().tick_period_ns(),
        })
    }

    /// Clock a stuck slave free
    pub fn bus_reset(&mut self) -> Result<(), BusError> {
        self.bus.bus_reset(&mut self.delay)
    }

    /// Check if a device answers at `address`
    pub fn probe(&mut self, address: u8) -> Result<bool, BusError> {
        match self.transfer(Request::write(address, &[])) {
            Ok(_) => Ok(true),
            Err(BusError::Transfer(softwire_core::ErrorKind::NackAddress)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Run one request to completion
    fn transfer(&mut self, request: Request<'_>) -> Result<TransactionHandle, BusError> {
        let handle = self.bus.submit(request)?;
        let mut ticks: u32 = 0;
        while self.bus.tick_source().is_running() {
            self.delay.delay_ns(self.tick_ns);
            self.bus.on_tick();
            ticks = ticks.wrapping_add(1);
        }
        trace!("transfer done in {} ticks", ticks);

        match self.bus.status(handle) {
            Some(TransactionStatus::Complete) => Ok(handle),
            Some(TransactionStatus::Error(kind)) => Err(BusError::Transfer(kind)),
            Some(TransactionStatus::Pending) | None => Err(BusError::Busy),
        }
    }

    fn copy_read(&self, handle: TransactionHandle, buf: &mut [u8]) {
        if let Some(data) = self.bus.read_data(handle) {
            let len = data.len().min(buf.len());
            buf[..len].copy_from_slice(&data[..len]);
        }
    }

    /// Give the lines and delay back
    pub fn release(self) -> (L, L, D) {
        let (scl, sda, _, _) = self.bus.release();
        (scl, sda, self.delay)
    }
}

impl<L, D> I2cBus for PolledBus<L, D>
where
    L: OpenDrainLine,
    D: DelayNs,
{
    type Error = BusError;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), BusError> {
        self.transfer(Request::write(address, data)).map(|_| ())
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), BusError> {
        let handle = self.transfer(Request::read(address, buf.len()))?;
        self.copy_read(handle, buf);
        Ok(())
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), BusError> {
        let handle = self.transfer(Request::write_then_read(
            address,
            write_data,
            read_buf.len(),
        ))?;
        self.copy_read(handle, read_buf);
        Ok(())
    }
}

impl<L, D> ErrorType for PolledBus<L, D> {
    type Error = BusError;
}

impl<L, D> I2c for PolledBus<L, D>
where
    L: OpenDrainLine,
    D: DelayNs,
{
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [HalOperation<'_>],
    ) -> Result<(), BusError> {
        match operations {
            [] => self.transfer(Request::write(address, &[])).map(|_| ()),
            [HalOperation::Write(data)] => I2cBus::write(self, address, data),
            [HalOperation::Read(buf)] => I2cBus::read(self, address, buf),
            [HalOperation::Write(data), HalOperation::Read(buf)] => {
                I2cBus::write_read(self, address, data, buf)
            }
            _ => Err(BusError::Unsupported),
        }
    }
}
