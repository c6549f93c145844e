//! Bit-banged I2C master bus
//!
//! [`BitBangBus`] owns everything one bus instance needs: the two lines, the
//! tick source, the transaction queue, the engine and the completion
//! notifier. It is driven from two places:
//!
//! - task context: `submit_*`, status queries, [`BitBangBus::bus_reset`]
//! - tick context: [`BitBangBus::on_tick`], once per tick-source period
//!
//! Both take `&mut self`; when they run on different execution contexts the
//! bus has to sit behind a lock (see `softwire-drivers::shared`).

use embedded_hal::delay::DelayNs;
use softwire_hal::gpio::OpenDrainLine;
use softwire_hal::timer::TickSource;

use crate::config::{BusConfig, DEFAULT_QUEUE_DEPTH};
use crate::engine::{Engine, Phase};
use crate::error::BusError;
use crate::notify::CompletionNotifier;
use crate::queue::TransactionQueue;
use crate::recovery;
use crate::submit::Submitter;
use crate::transaction::{Request, Transaction, TransactionHandle, TransactionStatus};

/// One bit-banged I2C master
pub struct BitBangBus<L, T, C, const N: usize = DEFAULT_QUEUE_DEPTH> {
    scl: L,
    sda: L,
    tick: T,
    notifier: C,
    config: BusConfig,
    queue: TransactionQueue<N>,
    engine: Engine,
}

impl<L, T, C, const N: usize> BitBangBus<L, T, C, N>
where
    L: OpenDrainLine,
    T: TickSource,
    C: CompletionNotifier<N>,
{
    /// Create a bus on two released lines with the tick source stopped
    pub fn new(
        mut scl: L,
        mut sda: L,
        mut tick: T,
        notifier: C,
        config: BusConfig,
    ) -> Result<Self, BusError> {
        config.validate()?;

        scl.release();
        sda.release();
        tick.stop();

        info!(
            "bus at {} Hz, tick {} Hz, {} slots",
            config.bit_rate_hz,
            config.tick_rate_hz(),
            N
        );

        Ok(Self {
            scl,
            sda,
            tick,
            notifier,
            config,
            queue: TransactionQueue::new(),
            engine: Engine::new(config.error_timeout_ticks),
        })
    }

    /// Advance the engine by one sub-state
    ///
    /// Call from the tick source's interrupt (or loop) at
    /// [`BusConfig::tick_rate_hz`]. Does nothing while idle.
    pub fn on_tick(&mut self) {
        self.engine.step(
            &mut self.scl,
            &mut self.sda,
            &mut self.tick,
            &mut self.queue,
            &mut self.notifier,
        );
    }

    /// Queue a request, starting the bus if it is idle
    pub fn submit(&mut self, request: Request<'_>) -> Result<TransactionHandle, BusError> {
        let handle = Submitter::new(&mut self.queue).submit(request)?;
        self.kick();
        Ok(handle)
    }

    /// Queue a write
    pub fn submit_write(&mut self, address: u8, bytes: &[u8]) -> Result<TransactionHandle, BusError> {
        self.submit(Request::write(address, bytes))
    }

    /// Queue a read of `len` bytes; fetch them with [`read_data`](Self::read_data)
    pub fn submit_read(&mut self, address: u8, len: usize) -> Result<TransactionHandle, BusError> {
        self.submit(Request::read(address, len))
    }

    /// Queue a write followed by a read under one repeated start
    pub fn submit_write_then_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        read_len: usize,
    ) -> Result<TransactionHandle, BusError> {
        self.submit(Request::write_then_read(address, bytes, read_len))
    }

    /// Queue a write that ignores every NACK
    pub fn submit_forced_write(
        &mut self,
        address: u8,
        bytes: &[u8],
    ) -> Result<TransactionHandle, BusError> {
        self.submit(Request::forced_write(address, bytes))
    }

    /// Start the tick source if work is waiting and the engine is idle
    fn kick(&mut self) {
        if self.engine.is_idle() && !self.queue.is_empty() {
            self.engine.arm(&mut self.scl, &mut self.sda);
            self.tick.clear();
            self.tick.start();
        }
    }

    /// Clock a stuck slave free
    ///
    /// Blocking. Fails with [`BusError::Busy`] while a transaction is on the
    /// bus.
    pub fn bus_reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), BusError> {
        if !self.engine.is_idle() {
            return Err(BusError::Busy);
        }
        recovery::bus_reset(
            &mut self.scl,
            &mut self.sda,
            delay,
            self.config.half_period_ns(),
        )?;
        self.kick();
        Ok(())
    }

    fn transaction(&self, handle: TransactionHandle) -> Option<&Transaction> {
        self.queue.get(handle)
    }

    /// Status of a transaction, `None` once its slot has been reused
    pub fn status(&self, handle: TransactionHandle) -> Option<TransactionStatus> {
        self.transaction(handle).map(Transaction::status)
    }

    /// Data bytes moved so far
    pub fn bytes_transferred(&self, handle: TransactionHandle) -> Option<usize> {
        self.transaction(handle).map(Transaction::bytes_transferred)
    }

    /// Bytes received by a read
    pub fn read_data(&self, handle: TransactionHandle) -> Option<&[u8]> {
        self.transaction(handle).map(Transaction::read_data)
    }

    /// Replace the completion notifier, returning the old one
    pub fn set_completion_handler(&mut self, notifier: C) -> C {
        core::mem::replace(&mut self.notifier, notifier)
    }

    pub fn notifier(&self) -> &C {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut C {
        &mut self.notifier
    }

    /// Check if nothing is on the bus
    pub fn is_idle(&self) -> bool {
        self.engine.is_idle()
    }

    /// Current engine sub-state
    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    /// Transactions queued, including the one on the bus
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Transactions that can still be queued
    pub fn count_free(&self) -> usize {
        self.queue.count_free()
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn tick_source(&self) -> &T {
        &self.tick
    }

    /// Give the hardware back
    pub fn release(self) -> (L, L, T, C) {
        (self.scl, self.sda, self.tick, self.notifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PhaseGroup;
    use crate::error::ErrorKind;
    use crate::notify::{Completion, NoopNotifier};
    use crate::sim::{BusEvent, Frame, SimDelay, SimLine, SimSlave, SimTick, SimWire};
    use crate::transaction::ErrorPolicy;
    use heapless::Vec;

    const MAX_TICKS: usize = 10_000;

    type SimBus<'a, C = NoopNotifier> = BitBangBus<SimLine<'a>, SimTick, C, 4>;

    fn bus(wire: &SimWire) -> SimBus<'_> {
        bus_with(wire, NoopNotifier, BusConfig::STANDARD.with_timeout(64))
    }

    fn bus_with<C: CompletionNotifier<4>>(wire: &SimWire, notifier: C, config: BusConfig) -> SimBus<'_, C> {
        let (scl, sda) = wire.lines();
        BitBangBus::new(scl, sda, SimTick::new(), notifier, config).unwrap()
    }

    /// Tick until the tick source stops; returns the ticks used
    fn run<C: CompletionNotifier<4>>(bus: &mut SimBus<'_, C>) -> usize {
        let mut ticks = 0;
        while bus.tick_source().is_running() && ticks < MAX_TICKS {
            bus.on_tick();
            ticks += 1;
        }
        ticks
    }

    /// Tick until idle, recording the protocol steps in order
    fn run_groups(bus: &mut SimBus<'_>) -> Vec<PhaseGroup, 16> {
        let mut groups: Vec<PhaseGroup, 16> = Vec::new();
        let mut ticks = 0;
        while bus.tick_source().is_running() && ticks < MAX_TICKS {
            let group = bus.phase().group();
            if groups.last() != Some(&group) {
                let _ = groups.push(group);
            }
            bus.on_tick();
            ticks += 1;
        }
        groups
    }

    #[derive(Default)]
    struct Recorder {
        completions: Vec<Completion, 8>,
    }

    impl CompletionNotifier<4> for Recorder {
        fn on_complete(&mut self, completion: Completion, _queue: &mut Submitter<'_, 4>) {
            let _ = self.completions.push(completion);
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let wire = SimWire::new(SimSlave::new(0x50));
        let (scl, sda) = wire.lines();
        let config = BusConfig {
            bit_rate_hz: 1_000_000,
            ..BusConfig::STANDARD
        };
        let result: Result<SimBus<'_>, _> =
            BitBangBus::new(scl, sda, SimTick::new(), NoopNotifier, config);
        assert!(matches!(result, Err(BusError::InvalidConfig)));
    }

    #[test]
    fn test_write_end_to_end() {
        let wire = SimWire::new(SimSlave::new(0x50));
        let mut bus = bus(&wire);

        let handle = bus.submit_write(0x50, &[0x01, 0x02]).unwrap();
        assert!(bus.tick_source().is_running());
        assert_eq!(bus.status(handle), Some(TransactionStatus::Pending));
        assert!(bus.status(handle).is_some_and(|s| !s.is_terminal()));

        let groups = run_groups(&mut bus);
        assert_eq!(
            groups.as_slice(),
            &[PhaseGroup::Start, PhaseGroup::Data, PhaseGroup::Stop]
        );
        assert_eq!(bus.status(handle), Some(TransactionStatus::Complete));
        assert!(bus.status(handle).is_some_and(|s| s.is_terminal()));
        assert_eq!(bus.bytes_transferred(handle), Some(2));
        assert!(bus.is_idle());
        assert_eq!(bus.tick_source().stops, 2);

        assert_eq!(
            wire.frames().as_slice(),
            &[Frame::ack(0xA0), Frame::ack(0x01), Frame::ack(0x02)]
        );
        assert_eq!(wire.events().as_slice(), &[BusEvent::Start, BusEvent::Stop]);
        assert_eq!(wire.received().as_slice(), &[0x01, 0x02]);
    }

    #[test]
    fn test_four_ticks_per_bit() {
        let wire = SimWire::new(SimSlave::new(0x50));
        let mut bus = bus(&wire);
        bus.submit_write(0x50, &[0x01]).unwrap();
        // await + start (4) + 2 frames of 9 bits at 4 ticks + 2 decisions + stop (6)
        assert_eq!(run(&mut bus), 1 + 4 + 2 * 9 * 4 + 2 + 6);
    }

    #[test]
    fn test_read_nacks_last_byte_only() {
        let wire = SimWire::new(SimSlave::new(0x48).with_read_data(&[0x11, 0x22, 0x33, 0x44]));
        let mut bus = bus(&wire);

        let handle = bus.submit_read(0x48, 4).unwrap();
        run(&mut bus);

        assert_eq!(bus.status(handle), Some(TransactionStatus::Complete));
        assert_eq!(bus.read_data(handle), Some(&[0x11, 0x22, 0x33, 0x44][..]));
        assert_eq!(bus.bytes_transferred(handle), Some(4));
        assert_eq!(
            wire.frames().as_slice(),
            &[
                Frame::ack(0x91),
                Frame::ack(0x11),
                Frame::ack(0x22),
                Frame::ack(0x33),
                Frame::nack(0x44),
            ]
        );
    }

    #[test]
    fn test_write_then_read_end_to_end() {
        let wire = SimWire::new(SimSlave::new(0x50).with_read_data(&[0xDE, 0xAD, 0xBE]));
        let mut bus = bus(&wire);

        let handle = bus.submit_write_then_read(0x50, &[0xAA], 3).unwrap();
        run(&mut bus);

        assert_eq!(bus.status(handle), Some(TransactionStatus::Complete));
        assert_eq!(bus.bytes_transferred(handle), Some(4));
        assert_eq!(bus.read_data(handle), Some(&[0xDE, 0xAD, 0xBE][..]));
        assert_eq!(
            wire.events().as_slice(),
            &[BusEvent::Start, BusEvent::RepeatedStart, BusEvent::Stop]
        );
        assert_eq!(
            wire.frames().as_slice(),
            &[
                Frame::ack(0xA0),
                Frame::ack(0xAA),
                Frame::ack(0xA1),
                Frame::ack(0xDE),
                Frame::ack(0xAD),
                Frame::nack(0xBE),
            ]
        );
    }

    #[test]
    fn test_write_then_read_not_interleaved() {
        let wire = SimWire::new(SimSlave::new(0x50).with_read_data(&[0x42]));
        let mut bus = bus(&wire);

        let first = bus.submit_write_then_read(0x50, &[0x00], 1).unwrap();
        let second = bus.submit_write(0x50, &[0x07]).unwrap();
        run(&mut bus);

        assert_eq!(bus.status(first), Some(TransactionStatus::Complete));
        assert_eq!(bus.status(second), Some(TransactionStatus::Complete));
        assert_eq!(
            wire.events().as_slice(),
            &[
                BusEvent::Start,
                BusEvent::RepeatedStart,
                BusEvent::Stop,
                BusEvent::Start,
                BusEvent::Stop,
            ]
        );
        assert_eq!(wire.received().as_slice(), &[0x00, 0x07]);
    }

    #[test]
    fn test_address_nack() {
        let wire = SimWire::new(SimSlave::new(0x50).nack_address());
        let mut bus = bus(&wire);

        let handle = bus.submit_write(0x50, &[0x01, 0x02]).unwrap();
        run(&mut bus);

        assert_eq!(
            bus.status(handle),
            Some(TransactionStatus::Error(ErrorKind::NackAddress))
        );
        assert_eq!(bus.bytes_transferred(handle), Some(0));
        assert_eq!(wire.frames().as_slice(), &[Frame::nack(0xA0)]);
        assert_eq!(wire.events().as_slice(), &[BusEvent::Start, BusEvent::Stop]);
    }

    #[test]
    fn test_absent_device_nacks() {
        let wire = SimWire::new(SimSlave::new(0x50));
        let mut bus = bus(&wire);

        let handle = bus.submit_read(0x51, 2).unwrap();
        run(&mut bus);
        assert_eq!(
            bus.status(handle),
            Some(TransactionStatus::Error(ErrorKind::NackAddress))
        );
        assert_eq!(bus.read_data(handle), Some(&[][..]));
    }

    #[test]
    fn test_forced_write_ignores_nack() {
        let wire = SimWire::new(SimSlave::new(0x50).nack_address());
        let mut bus = bus(&wire);

        let handle = bus.submit_forced_write(0x50, &[0x01, 0x02]).unwrap();
        run(&mut bus);

        assert_eq!(bus.status(handle), Some(TransactionStatus::Complete));
        assert_eq!(bus.bytes_transferred(handle), Some(2));
        assert_eq!(
            wire.frames().as_slice(),
            &[Frame::nack(0xA0), Frame::nack(0x01), Frame::nack(0x02)]
        );
    }

    #[test]
    fn test_data_nack_stops_write() {
        let wire = SimWire::new(SimSlave::new(0x50).nack_data());
        let mut bus = bus(&wire);

        let handle = bus.submit_write(0x50, &[0x01, 0x02, 0x03]).unwrap();
        run(&mut bus);

        assert_eq!(
            bus.status(handle),
            Some(TransactionStatus::Error(ErrorKind::NackData))
        );
        assert_eq!(bus.bytes_transferred(handle), Some(0));
        assert_eq!(wire.received().as_slice(), &[0x01]);
    }

    #[test]
    fn test_policy_ignores_data_nack() {
        let wire = SimWire::new(SimSlave::new(0x50).nack_data());
        let mut bus = bus(&wire);

        let policy = ErrorPolicy {
            ignore_data_nack: true,
            ..ErrorPolicy::STRICT
        };
        let request = Request::write(0x50, &[0x01, 0x02, 0x03]).with_policy(policy);
        let handle = bus.submit(request).unwrap();
        run(&mut bus);

        assert_eq!(bus.status(handle), Some(TransactionStatus::Complete));
        assert_eq!(bus.bytes_transferred(handle), Some(3));
        assert_eq!(
            wire.frames().as_slice(),
            &[
                Frame::ack(0xA0),
                Frame::nack(0x01),
                Frame::nack(0x02),
                Frame::nack(0x03),
            ]
        );
    }

    #[test]
    fn test_address_probe() {
        let wire = SimWire::new(SimSlave::new(0x3C));
        let mut bus = bus(&wire);

        let present = bus.submit_write(0x3C, &[]).unwrap();
        let absent = bus.submit_write(0x3D, &[]).unwrap();
        run(&mut bus);

        assert_eq!(bus.status(present), Some(TransactionStatus::Complete));
        assert_eq!(
            bus.status(absent),
            Some(TransactionStatus::Error(ErrorKind::NackAddress))
        );
    }

    #[test]
    fn test_queue_full() {
        let wire = SimWire::new(SimSlave::new(0x50));
        let mut bus = bus(&wire);

        for _ in 0..3 {
            bus.submit_write(0x50, &[0]).unwrap();
        }
        assert_eq!(bus.count_free(), 0);
        assert_eq!(bus.submit_write(0x50, &[0]), Err(BusError::QueueFull));
        assert_eq!(bus.pending(), 3);

        run(&mut bus);
        assert_eq!(bus.pending(), 0);
        assert_eq!(bus.count_free(), 3);
    }

    #[test]
    fn test_fifo_back_to_back() {
        let wire = SimWire::new(SimSlave::new(0x50));
        let mut bus = bus_with(&wire, Recorder::default(), BusConfig::STANDARD);

        let a = bus.submit_write(0x50, &[0x0A]).unwrap();
        let b = bus.submit_write(0x50, &[0x0B]).unwrap();
        let c = bus.submit_write(0x50, &[0x0C]).unwrap();
        run(&mut bus);

        let order: Vec<TransactionHandle, 8> =
            bus.notifier().completions.iter().map(|c| c.handle).collect();
        assert_eq!(order.as_slice(), &[a, b, c]);
        assert_eq!(wire.received().as_slice(), &[0x0A, 0x0B, 0x0C]);
        // Tick source ran the whole burst without stopping
        assert_eq!(bus.tick_source().starts, 1);
    }

    #[test]
    fn test_stuck_clock_times_out() {
        let wire = SimWire::new(SimSlave::new(0x50));
        let mut bus = bus_with(&wire, Recorder::default(), BusConfig::STANDARD.with_timeout(32));

        let handle = bus.submit_write(0x50, &[0x01, 0x02]).unwrap();
        for _ in 0..20 {
            bus.on_tick();
        }
        wire.set_scl_stuck(true);
        let ticks = run(&mut bus);

        assert!(ticks < MAX_TICKS);
        assert!(!bus.tick_source().is_running());
        assert!(bus.is_idle());
        assert_eq!(
            bus.status(handle),
            Some(TransactionStatus::Error(ErrorKind::BusTimeout))
        );
        assert_eq!(bus.notifier().completions.len(), 1);
        // Lines are released on a fault
        wire.set_scl_stuck(false);
        assert!(wire.scl_high());
        assert!(wire.sda_high());
    }

    #[test]
    fn test_endless_stretch_times_out() {
        let wire = SimWire::new(SimSlave::new(0x50).with_stretch(u32::MAX));
        let mut bus = bus(&wire);

        let handle = bus.submit_write(0x50, &[0x01]).unwrap();
        run(&mut bus);
        assert_eq!(
            bus.status(handle),
            Some(TransactionStatus::Error(ErrorKind::BusTimeout))
        );
        assert_eq!(bus.bytes_transferred(handle), Some(0));
    }

    #[test]
    fn test_clock_stretching_tolerated() {
        let wire = SimWire::new(SimSlave::new(0x50).with_stretch(20));
        let mut bus = bus(&wire);

        let handle = bus.submit_write(0x50, &[0x01, 0x02]).unwrap();
        run(&mut bus);
        assert_eq!(bus.status(handle), Some(TransactionStatus::Complete));
        assert_eq!(wire.received().as_slice(), &[0x01, 0x02]);
    }

    #[test]
    fn test_fault_fails_queued_in_turn() {
        let wire = SimWire::new(SimSlave::new(0x50).stuck_sda());
        let mut bus = bus_with(&wire, Recorder::default(), BusConfig::STANDARD.with_timeout(64));

        let first = bus.submit_write(0x50, &[0x01]).unwrap();
        let second = bus.submit_write(0x50, &[0x02]).unwrap();
        let ticks = run(&mut bus);
        assert!(ticks < MAX_TICKS);
        for handle in [first, second] {
            assert_eq!(
                bus.status(handle),
                Some(TransactionStatus::Error(ErrorKind::BusTimeout))
            );
        }
        assert_eq!(bus.notifier().completions.len(), 2);
        assert_eq!(bus.pending(), 0);
        assert!(!bus.tick_source().is_running());

        wire.set_sda_stuck(false);
        wire.clear_log();
        bus.notifier_mut().completions.clear();
        let third = bus.submit_write(0x50, &[0x03]).unwrap();
        run(&mut bus);
        assert_eq!(bus.status(third), Some(TransactionStatus::Complete));
        assert_eq!(bus.notifier().completions.len(), 1);
        assert_eq!(wire.events().as_slice(), &[BusEvent::Start, BusEvent::Stop]);
        assert_eq!(wire.received().as_slice(), &[0x03]);
    }

    #[test]
    fn test_notifier_retry_after_timeout() {
        struct Retry {
            retries: u8,
            last: Option<TransactionStatus>,
        }

        impl CompletionNotifier<4> for Retry {
            fn on_complete(&mut self, completion: Completion, queue: &mut Submitter<'_, 4>) {
                self.last = Some(completion.status);
                if !completion.is_ok() && self.retries == 0 {
                    self.retries += 1;
                    let _ = queue.submit_write(0x50, &[0x01]);
                }
            }
        }

        let wire = SimWire::new(SimSlave::new(0x50));
        let retry = Retry {
            retries: 0,
            last: None,
        };
        let mut bus = bus_with(&wire, retry, BusConfig::STANDARD.with_timeout(32));

        wire.set_scl_stuck(true);
        bus.submit_write(0x50, &[0x01]).unwrap();
        let mut ticks = 0;
        while bus.notifier().retries == 0 && ticks < MAX_TICKS {
            bus.on_tick();
            ticks += 1;
        }
        assert_eq!(
            bus.notifier().last,
            Some(TransactionStatus::Error(ErrorKind::BusTimeout))
        );
        // The chained retry keeps the tick source going
        assert!(bus.tick_source().is_running());
        assert_eq!(bus.phase(), Phase::AwaitIdle);

        wire.set_scl_stuck(false);
        run(&mut bus);
        assert_eq!(bus.notifier().last, Some(TransactionStatus::Complete));
        assert_eq!(wire.received().as_slice(), &[0x01]);
        assert!(bus.is_idle());
        assert!(!bus.tick_source().is_running());
    }

    fn tick_until<C: CompletionNotifier<4>>(bus: &mut SimBus<'_, C>, phase: Phase) {
        let mut ticks = 0;
        while bus.phase() != phase && ticks < MAX_TICKS {
            bus.on_tick();
            ticks += 1;
        }
        assert_eq!(bus.phase(), phase);
    }

    /// Short a line right before `at` lets it go and expect a timeout in `check`
    fn assert_stuck_times_out(request: Request<'_>, at: Phase, check: Phase, clock: bool) {
        let wire = SimWire::new(SimSlave::new(0x50).with_read_data(&[0x42]));
        let mut bus = bus(&wire);

        let handle = bus.submit(request).unwrap();
        tick_until(&mut bus, at);
        if clock {
            wire.set_scl_stuck(true);
        } else {
            wire.set_sda_stuck(true);
        }
        bus.on_tick();
        assert_eq!(bus.phase(), check);

        let ticks = run(&mut bus);
        assert!(ticks < MAX_TICKS);
        assert_eq!(
            bus.status(handle),
            Some(TransactionStatus::Error(ErrorKind::BusTimeout))
        );
        assert!(!bus.tick_source().is_running());
        assert!(bus.is_idle());

        wire.set_scl_stuck(false);
        wire.set_sda_stuck(false);
        assert!(wire.scl_high());
        assert!(wire.sda_high());
    }

    #[test]
    fn test_restart_data_stuck_times_out() {
        assert_stuck_times_out(
            Request::write_then_read(0x50, &[0xAA], 1),
            Phase::SdaHighRestart,
            Phase::SdaHighRestartCheck,
            false,
        );
    }

    #[test]
    fn test_restart_clock_stuck_times_out() {
        assert_stuck_times_out(
            Request::write_then_read(0x50, &[0xAA], 1),
            Phase::SclHighRestart,
            Phase::SclHighRestartCheck,
            true,
        );
    }

    #[test]
    fn test_stop_clock_stuck_times_out() {
        assert_stuck_times_out(
            Request::write(0x50, &[0x01]),
            Phase::SclHighStop,
            Phase::SclHighStopCheck,
            true,
        );
    }

    #[test]
    fn test_stop_data_stuck_times_out() {
        assert_stuck_times_out(
            Request::write(0x50, &[0x01]),
            Phase::SdaHighStop,
            Phase::SdaHighStopCheck,
            false,
        );
    }

    #[test]
    fn test_bus_reset_frees_wedged_slave() {
        let wire = SimWire::new(SimSlave::new(0x50).wedged(6));
        let mut bus = bus(&wire);
        let mut delay = SimDelay::default();

        let first = bus.submit_write(0x50, &[0x01]).unwrap();
        run(&mut bus);
        assert_eq!(
            bus.status(first),
            Some(TransactionStatus::Error(ErrorKind::BusTimeout))
        );
        assert!(!wire.sda_high());

        assert_eq!(bus.bus_reset(&mut delay), Ok(()));
        assert!(wire.sda_high());
        let second = bus.submit_write(0x50, &[0x02]).unwrap();
        run(&mut bus);
        assert_eq!(bus.status(second), Some(TransactionStatus::Complete));
        assert_eq!(wire.received().as_slice(), &[0x02]);
    }

    #[test]
    fn test_bus_reset_reports_stuck_data() {
        let wire = SimWire::new(SimSlave::new(0x50).stuck_sda());
        let mut bus = bus(&wire);
        let mut delay = SimDelay::default();

        assert_eq!(bus.bus_reset(&mut delay), Err(BusError::BusStuck));
        assert!(!bus.tick_source().is_running());
    }

    #[test]
    fn test_bus_reset_busy() {
        let wire = SimWire::new(SimSlave::new(0x50));
        let mut bus = bus(&wire);
        let mut delay = SimDelay::default();

        bus.submit_write(0x50, &[0x01]).unwrap();
        bus.on_tick();
        assert_eq!(bus.bus_reset(&mut delay), Err(BusError::Busy));
        run(&mut bus);
        assert_eq!(bus.bus_reset(&mut delay), Ok(()));
    }

    #[test]
    fn test_notifier_chains_follow_up() {
        struct Chain;

        impl CompletionNotifier<4> for Chain {
            fn on_complete(&mut self, completion: Completion, queue: &mut Submitter<'_, 4>) {
                if completion.is_ok() && completion.bytes_transferred == 1 {
                    let _ = queue.submit_write(0x50, &[0x02, 0x03]);
                }
            }
        }

        let wire = SimWire::new(SimSlave::new(0x50));
        let mut bus = bus_with(&wire, Chain, BusConfig::STANDARD);
        bus.submit_write(0x50, &[0x01]).unwrap();
        run(&mut bus);

        assert_eq!(wire.received().as_slice(), &[0x01, 0x02, 0x03]);
        assert_eq!(
            wire.events().as_slice(),
            &[BusEvent::Start, BusEvent::Stop, BusEvent::Start, BusEvent::Stop]
        );
        assert!(bus.is_idle());
    }

    #[test]
    fn test_stale_handle() {
        let wire = SimWire::new(SimSlave::new(0x50));
        let mut bus = bus(&wire);

        let old = bus.submit_write(0x50, &[0x01]).unwrap();
        run(&mut bus);
        for _ in 0..4 {
            bus.submit_write(0x50, &[0x02]).unwrap();
            run(&mut bus);
        }
        assert_eq!(bus.status(old), None);
    }
}
