//! Bus engine
//!
//! Reproduces the I2C master protocol one sub-state per tick. The tick
//! source runs at four times the bit rate, so a data bit takes four ticks:
//! clock low, data set, clock released, clock sampled high.
//!
//! Every `*Check` phase polls a line it just changed (or released) and only
//! moves on once the line reads the expected level. A slave stretching the
//! clock simply keeps the engine in `SclHighDataCheck`. If a line never gets
//! there within the error timeout, the active transaction fails with
//! [`ErrorKind::BusTimeout`] and both lines are released. The tick source
//! stops unless more transactions are waiting.

use softwire_hal::gpio::OpenDrainLine;
use softwire_hal::timer::TickSource;

use super::phase::Phase;
use crate::error::ErrorKind;
use crate::notify::{Completion, CompletionNotifier};
use crate::queue::{SlotIndex, TransactionQueue};
use crate::submit::Submitter;
use crate::transaction::{Operation, Transaction};

/// Clocks per byte: 8 data bits and the ACK slot
pub const FRAME_BITS: u8 = 9;

/// Shift pattern while receiving; all ones keeps DATA released
const READ_PATTERN: u16 = 0x00FF;

/// What the shift register currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum ByteKind {
    Address,
    Write,
    Read,
}

/// Protocol state of one bus instance
#[derive(Debug)]
pub struct Engine {
    phase: Phase,
    shift: u16,
    bit_counter: u8,
    acked: bool,
    nack_pending: bool,
    timeout: u32,
    timeout_reload: u32,
    active: Option<SlotIndex>,
    byte: ByteKind,
}

impl Engine {
    /// Create an idle engine
    pub fn new(error_timeout_ticks: u32) -> Self {
        Self {
            phase: Phase::Idle,
            shift: 0,
            bit_counter: 0,
            acked: false,
            nack_pending: false,
            timeout: error_timeout_ticks,
            timeout_reload: error_timeout_ticks,
            active: None,
            byte: ByteKind::Address,
        }
    }

    /// Current sub-state
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Check if no transaction is on the bus
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Slot of the transaction on the bus
    pub fn active(&self) -> Option<SlotIndex> {
        self.active
    }

    /// Ticks left before the current check phase gives up
    pub fn timeout_remaining(&self) -> u32 {
        self.timeout
    }

    /// Begin a burst of transactions
    ///
    /// Releases both lines; the first tick waits for them to read high
    /// before generating START.
    pub(crate) fn arm<L: OpenDrainLine>(&mut self, scl: &mut L, sda: &mut L) {
        scl.release();
        sda.release();
        self.timeout = self.timeout_reload;
        self.phase = Phase::AwaitIdle;
        debug!("engine armed");
    }

    /// Advance by one sub-state
    pub(crate) fn step<L, T, C, const N: usize>(
        &mut self,
        scl: &mut L,
        sda: &mut L,
        tick: &mut T,
        queue: &mut TransactionQueue<N>,
        notifier: &mut C,
    ) where
        L: OpenDrainLine,
        T: TickSource,
        C: CompletionNotifier<N>,
    {
        use Phase::*;

        let timed_out = match self.phase {
            Idle => false,
            AwaitIdle => {
                let idle = scl.is_high() && sda.is_high();
                self.poll(idle, SdaLowStart)
            }

            // START
            SdaLowStart => {
                sda.drive_low();
                self.phase = SdaLowStartCheck;
                false
            }
            SdaLowStartCheck => {
                let low = sda.is_low();
                self.poll(low, SclLowStart)
            }
            SclLowStart => {
                scl.drive_low();
                self.phase = SclLowStartCheck;
                false
            }
            SclLowStartCheck => {
                let low = scl.is_low();
                let timed_out = self.poll(low, SclLowDataCheck);
                if low {
                    self.load_address(queue);
                }
                timed_out
            }

            // Repeated START
            SdaHighRestart => {
                sda.release();
                self.phase = SdaHighRestartCheck;
                false
            }
            SdaHighRestartCheck => {
                let high = sda.is_high();
                self.poll(high, SclHighRestart)
            }
            SclHighRestart => {
                scl.release();
                self.phase = SclHighRestartCheck;
                false
            }
            SclHighRestartCheck => {
                let high = scl.is_high();
                self.poll(high, SdaLowStart)
            }

            // Data bits
            SclLowData => {
                scl.drive_low();
                self.phase = SclLowDataCheck;
                false
            }
            SclLowDataCheck => {
                let low = scl.is_low();
                let timed_out = self.poll(low, SclHighData);
                if low {
                    self.set_data(sda, queue);
                }
                timed_out
            }
            SclHighData => {
                scl.release();
                self.phase = SclHighDataCheck;
                false
            }
            SclHighDataCheck => {
                let high = scl.is_high();
                let timed_out = self.poll(high, SclLowData);
                if high {
                    self.sample(sda);
                }
                timed_out
            }

            // STOP
            SclSdaLowStop => {
                scl.drive_low();
                sda.drive_low();
                self.phase = SclSdaLowStopCheck;
                false
            }
            SclSdaLowStopCheck => {
                let low = scl.is_low() && sda.is_low();
                self.poll(low, SclHighStop)
            }
            SclHighStop => {
                scl.release();
                self.phase = SclHighStopCheck;
                false
            }
            SclHighStopCheck => {
                let high = scl.is_high();
                self.poll(high, SdaHighStop)
            }
            SdaHighStop => {
                sda.release();
                self.phase = SdaHighStopCheck;
                false
            }
            SdaHighStopCheck => {
                let high = sda.is_high();
                let timed_out = self.poll(high, Idle);
                if high {
                    self.finish(tick, queue, notifier);
                }
                timed_out
            }
        };

        if timed_out {
            self.fault(scl, sda, tick, queue, notifier);
        }
    }

    /// Move to `next` once `reached`, otherwise burn one tick of the timeout
    ///
    /// Returns `true` when the timeout has run out.
    fn poll(&mut self, reached: bool, next: Phase) -> bool {
        if reached {
            self.timeout = self.timeout_reload;
            self.phase = next;
            return false;
        }
        self.timeout = self.timeout.saturating_sub(1);
        self.timeout == 0
    }

    fn load(&mut self, value: u16, kind: ByteKind) {
        self.shift = value;
        self.byte = kind;
        self.bit_counter = FRAME_BITS;
    }

    /// Pick up the transaction for this START and load its address byte
    fn load_address<const N: usize>(&mut self, queue: &mut TransactionQueue<N>) {
        let slot = match self.active {
            // Restart inside a write-then-read keeps the slot
            Some(slot) => {
                if let Some(tx) = queue.slot_mut(slot) {
                    tx.resume_as_read();
                }
                slot
            }
            None => match queue.dequeue() {
                Some(slot) => slot,
                None => {
                    warn!("START with nothing queued");
                    self.phase = Phase::SclSdaLowStop;
                    return;
                }
            },
        };

        let Some(tx) = queue.slot(slot) else {
            self.phase = Phase::SclSdaLowStop;
            return;
        };
        self.active = Some(slot);
        self.nack_pending = false;
        self.load(u16::from((tx.address() << 1) | tx.rw_bit()), ByteKind::Address);
        trace!("slot {} address {} rw {}", slot, tx.address(), tx.rw_bit());
    }

    /// Clock low: drive the next bit, the ACK slot, or decide what follows
    fn set_data<L: OpenDrainLine, const N: usize>(
        &mut self,
        sda: &mut L,
        queue: &mut TransactionQueue<N>,
    ) {
        match self.bit_counter {
            0 => self.decide(queue),
            1 => {
                if self.byte == ByteKind::Read && !self.nack_pending {
                    sda.drive_low();
                } else {
                    sda.release();
                }
            }
            _ => {
                if self.shift & 0x80 != 0 {
                    sda.release();
                } else {
                    sda.drive_low();
                }
            }
        }
    }

    /// Clock high: shift in the bit or record the slave's ACK
    fn sample<L: OpenDrainLine>(&mut self, sda: &mut L) {
        match self.bit_counter {
            0 => {}
            1 => {
                if self.byte != ByteKind::Read {
                    self.acked = sda.is_low();
                }
            }
            _ => {
                let bit = u16::from(self.byte == ByteKind::Read && sda.is_high());
                self.shift = (self.shift << 1) | bit;
            }
        }
        self.bit_counter = self.bit_counter.saturating_sub(1);
    }

    /// Ninth clock done: next byte, restart, or stop
    fn decide<const N: usize>(&mut self, queue: &mut TransactionQueue<N>) {
        let Some(slot) = self.active else {
            self.phase = Phase::SclSdaLowStop;
            return;
        };
        let Some(tx) = queue.slot_mut(slot) else {
            self.phase = Phase::SclSdaLowStop;
            return;
        };

        match self.byte {
            ByteKind::Address if !self.acked => {
                if tx.policy.ignores(ErrorKind::NackAddress) {
                    warn!("address {} NACKed, sending anyway", tx.address());
                } else {
                    debug!("address {} NACKed", tx.address());
                    tx.record_error(ErrorKind::NackAddress);
                    self.phase = Phase::SclSdaLowStop;
                    return;
                }
            }
            ByteKind::Address => {}
            ByteKind::Write => {
                if self.acked || tx.policy.ignores(ErrorKind::NackData) {
                    tx.bytes_transferred += 1;
                } else {
                    debug!("data NACKed after {} bytes", tx.bytes_transferred());
                    tx.record_error(ErrorKind::NackData);
                    self.phase = Phase::SclSdaLowStop;
                    return;
                }
            }
            ByteKind::Read => {
                tx.push_read_byte((self.shift & 0x00FF) as u8);
            }
        }

        self.next_byte(tx);
    }

    fn next_byte(&mut self, tx: &mut Transaction) {
        if tx.is_reading() {
            let remaining = tx.read_remaining();
            if remaining > 0 {
                self.nack_pending = remaining == 1;
                self.load(READ_PATTERN, ByteKind::Read);
                self.phase = Phase::SclLowDataCheck;
            } else {
                self.phase = Phase::SclSdaLowStop;
            }
        } else if let Some(byte) = tx.next_write_byte() {
            self.load(u16::from(byte), ByteKind::Write);
            self.phase = Phase::SclLowDataCheck;
        } else if tx.operation() == Operation::WriteThenRead {
            self.phase = Phase::SdaHighRestart;
        } else {
            self.phase = Phase::SclSdaLowStop;
        }
    }

    /// STOP is on the bus: publish the result and move to the next transaction
    fn finish<T, C, const N: usize>(
        &mut self,
        tick: &mut T,
        queue: &mut TransactionQueue<N>,
        notifier: &mut C,
    ) where
        T: TickSource,
        C: CompletionNotifier<N>,
    {
        if let Some(slot) = self.active.take() {
            complete(slot, queue, notifier);
        }

        if queue.is_empty() {
            tick.stop();
            self.phase = Phase::Idle;
            debug!("bus idle");
        } else {
            // Lines are already high after STOP
            self.phase = Phase::SdaLowStart;
        }
    }

    /// A line never reached its level: fail the transaction
    ///
    /// Anything still queued afterwards (including work the notifier just
    /// chained) gets a fresh attempt from `AwaitIdle`, so every queued
    /// transaction is completed one way or the other.
    fn fault<L, T, C, const N: usize>(
        &mut self,
        scl: &mut L,
        sda: &mut L,
        tick: &mut T,
        queue: &mut TransactionQueue<N>,
        notifier: &mut C,
    ) where
        L: OpenDrainLine,
        T: TickSource,
        C: CompletionNotifier<N>,
    {
        error!("bus timeout in {:?}", self.phase);

        scl.release();
        sda.release();
        self.phase = Phase::Idle;
        self.timeout = self.timeout_reload;

        if let Some(slot) = self.active.take().or_else(|| queue.dequeue()) {
            if let Some(tx) = queue.slot_mut(slot) {
                tx.record_error(ErrorKind::BusTimeout);
            }
            complete(slot, queue, notifier);
        }

        if queue.is_empty() {
            tick.stop();
        } else {
            warn!("{} queued after timeout, re-arming", queue.len());
            self.arm(scl, sda);
            tick.clear();
            tick.start();
        }
    }
}

/// Set the terminal status, retire the slot and notify
fn complete<C, const N: usize>(slot: SlotIndex, queue: &mut TransactionQueue<N>, notifier: &mut C)
where
    C: CompletionNotifier<N>,
{
    let Some(tx) = queue.slot_mut(slot) else {
        return;
    };
    tx.status = tx.final_status();
    let completion = Completion {
        handle: tx.handle(slot),
        status: tx.status,
        bytes_transferred: tx.bytes_transferred,
    };

    if let Err(e) = queue.retire() {
        error!("retire slot {} failed: {:?}", slot, e);
    }
    debug!("slot {} finished: {:?}", slot, completion.status);

    notifier.on_complete(completion, &mut Submitter::new(queue));
}
