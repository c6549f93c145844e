//! Simulated bus for host tests
//!
//! [`SimWire`] models the two open-drain lines as a wired-AND between the
//! master (through [`SimLine`]) and one [`SimSlave`]. Every level change is
//! propagated immediately: the slave reacts to clock edges and to START/STOP
//! conditions, and a passive monitor records what went over the wire.
//!
//! The slave changes DATA only on a falling clock edge and samples it on the
//! rising edge, like a real device.

use core::cell::RefCell;

use heapless::Vec;
use softwire_hal::gpio::OpenDrainLine;
use softwire_hal::timer::TickSource;

/// Capacity of every recording buffer
pub const SIM_LOG_LEN: usize = 128;

/// Bus condition seen by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    RepeatedStart,
    Stop,
}

/// One byte and its ninth bit as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub byte: u8,
    /// DATA was low during the ninth clock
    pub acked: bool,
}

impl Frame {
    pub const fn ack(byte: u8) -> Self {
        Self { byte, acked: true }
    }

    pub const fn nack(byte: u8) -> Self {
        Self { byte, acked: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Scl,
    Sda,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlaveState {
    Idle,
    Address,
    Write,
    Read,
    Ignore,
}

/// Simulated slave device
#[derive(Debug, Clone)]
pub struct SimSlave {
    address: u8,
    nack_address: bool,
    nack_data: bool,
    stretch: u32,
    stuck_scl: bool,
    stuck_sda: bool,
    wedged_clocks: u32,
    read_data: Vec<u8, SIM_LOG_LEN>,
    read_pos: usize,
    received: Vec<u8, SIM_LOG_LEN>,

    state: SlaveState,
    /// START seen, its closing clock fall still to come
    started: bool,
    bit: u8,
    shift: u8,
    ack: bool,
    reading: bool,
    master_nacked: bool,
    tx_byte: u8,
    scl_low: bool,
    sda_low: bool,
    stretch_left: u32,
}

impl SimSlave {
    /// A slave at `address` that ACKs everything and answers reads with 0xFF
    pub fn new(address: u8) -> Self {
        Self {
            address,
            nack_address: false,
            nack_data: false,
            stretch: 0,
            stuck_scl: false,
            stuck_sda: false,
            wedged_clocks: 0,
            read_data: Vec::new(),
            read_pos: 0,
            received: Vec::new(),
            state: SlaveState::Idle,
            started: false,
            bit: 0,
            shift: 0,
            ack: false,
            reading: false,
            master_nacked: false,
            tx_byte: 0xFF,
            scl_low: false,
            sda_low: false,
            stretch_left: 0,
        }
    }

    /// Bytes returned to master reads, in order
    pub fn with_read_data(mut self, bytes: &[u8]) -> Self {
        self.read_data.clear();
        let _ = self.read_data.extend_from_slice(bytes);
        self
    }

    /// Never acknowledge the address
    pub fn nack_address(mut self) -> Self {
        self.nack_address = true;
        self
    }

    /// Acknowledge the address but no data byte
    pub fn nack_data(mut self) -> Self {
        self.nack_data = true;
        self
    }

    /// Hold CLOCK low after each acknowledged byte until the master has
    /// polled it `polls` times
    pub fn with_stretch(mut self, polls: u32) -> Self {
        self.stretch = polls;
        self
    }

    /// CLOCK is shorted low
    pub fn stuck_scl(mut self) -> Self {
        self.stuck_scl = true;
        self
    }

    /// DATA is shorted low
    pub fn stuck_sda(mut self) -> Self {
        self.stuck_sda = true;
        self
    }

    /// Slave lost track mid-byte and holds DATA low for `clocks` more clock
    /// pulses
    pub fn wedged(mut self, clocks: u32) -> Self {
        self.wedged_clocks = clocks;
        self
    }

    /// Data bytes written to this slave
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    fn holds_scl(&self) -> bool {
        self.stuck_scl || self.scl_low
    }

    fn holds_sda(&self) -> bool {
        self.stuck_sda || self.wedged_clocks > 0 || self.sda_low
    }

    fn on_start(&mut self) {
        self.state = SlaveState::Address;
        self.started = true;
        self.bit = 0;
        self.shift = 0;
        self.sda_low = false;
    }

    fn on_stop(&mut self) {
        self.state = SlaveState::Idle;
        self.started = false;
        self.sda_low = false;
    }

    fn on_scl_rise(&mut self, sda: bool) {
        match self.state {
            SlaveState::Address | SlaveState::Write if self.bit < 8 => {
                self.shift = (self.shift << 1) | u8::from(sda);
                if self.bit == 7 {
                    self.byte_done();
                }
            }
            SlaveState::Read if self.bit == 8 => self.master_nacked = sda,
            _ => {}
        }
    }

    fn byte_done(&mut self) {
        if self.state == SlaveState::Address {
            let matched = self.shift >> 1 == self.address;
            self.reading = self.shift & 1 == 1;
            self.ack = matched && !self.nack_address;
        } else {
            let _ = self.received.push(self.shift);
            self.ack = !self.nack_data;
        }
    }

    fn on_scl_fall(&mut self) {
        self.wedged_clocks = self.wedged_clocks.saturating_sub(1);

        // The fall that completes START is not a bit boundary
        if self.started {
            self.started = false;
            return;
        }

        match self.state {
            SlaveState::Idle | SlaveState::Ignore => {}
            SlaveState::Address | SlaveState::Write => {
                self.bit += 1;
                if self.bit == 8 {
                    self.sda_low = self.ack;
                } else if self.bit > 8 {
                    self.bit = 0;
                    self.shift = 0;
                    self.sda_low = false;
                    if self.state == SlaveState::Address {
                        self.state = match (self.ack, self.reading) {
                            (false, _) => SlaveState::Ignore,
                            (true, true) => SlaveState::Read,
                            (true, false) => SlaveState::Write,
                        };
                        if self.state == SlaveState::Read {
                            self.master_nacked = false;
                            self.load_tx();
                        }
                    }
                    if self.ack && self.stretch > 0 {
                        self.scl_low = true;
                        self.stretch_left = self.stretch;
                    }
                }
            }
            SlaveState::Read => {
                self.bit += 1;
                if self.bit < 8 {
                    self.drive_tx_bit();
                } else if self.bit == 8 {
                    self.sda_low = false;
                } else {
                    self.bit = 0;
                    if self.master_nacked {
                        self.state = SlaveState::Ignore;
                    } else {
                        self.load_tx();
                    }
                }
            }
        }
    }

    fn load_tx(&mut self) {
        self.tx_byte = self.read_data.get(self.read_pos).copied().unwrap_or(0xFF);
        self.read_pos += 1;
        self.drive_tx_bit();
    }

    fn drive_tx_bit(&mut self) {
        self.sda_low = (self.tx_byte >> (7 - self.bit)) & 1 == 0;
    }

    /// Master polled CLOCK while it had released it
    fn on_clock_poll(&mut self) {
        if self.scl_low {
            self.stretch_left = self.stretch_left.saturating_sub(1);
            if self.stretch_left == 0 {
                self.scl_low = false;
            }
        }
    }
}

/// Passive recorder of START/STOP conditions and bytes
#[derive(Debug, Default)]
struct Monitor {
    in_frame: bool,
    bit: u8,
    shift: u8,
    events: Vec<BusEvent, SIM_LOG_LEN>,
    frames: Vec<Frame, SIM_LOG_LEN>,
}

impl Monitor {
    fn on_start(&mut self) {
        let event = if self.in_frame {
            BusEvent::RepeatedStart
        } else {
            BusEvent::Start
        };
        let _ = self.events.push(event);
        self.in_frame = true;
        self.bit = 0;
        self.shift = 0;
    }

    fn on_stop(&mut self) {
        let _ = self.events.push(BusEvent::Stop);
        self.in_frame = false;
    }

    fn on_scl_rise(&mut self, sda: bool) {
        if !self.in_frame {
            return;
        }
        if self.bit < 8 {
            self.shift = (self.shift << 1) | u8::from(sda);
            self.bit += 1;
        } else {
            let _ = self.frames.push(Frame {
                byte: self.shift,
                acked: !sda,
            });
            self.bit = 0;
            self.shift = 0;
        }
    }
}

#[derive(Debug)]
struct WireState {
    master_scl_low: bool,
    master_sda_low: bool,
    slave: SimSlave,
    monitor: Monitor,
}

impl WireState {
    fn scl(&self) -> bool {
        !(self.master_scl_low || self.slave.holds_scl())
    }

    fn sda(&self) -> bool {
        !(self.master_sda_low || self.slave.holds_sda())
    }

    /// Dispatch edges until the levels stop changing
    fn settle(&mut self, mut scl: bool, mut sda: bool) {
        loop {
            let (new_scl, new_sda) = (self.scl(), self.sda());
            if new_scl == scl && new_sda == sda {
                break;
            }

            if new_scl != scl {
                if new_scl {
                    self.monitor.on_scl_rise(new_sda);
                    self.slave.on_scl_rise(new_sda);
                } else {
                    self.slave.on_scl_fall();
                }
            }
            if new_sda != sda && scl && new_scl {
                if new_sda {
                    self.monitor.on_stop();
                    self.slave.on_stop();
                } else {
                    self.monitor.on_start();
                    self.slave.on_start();
                }
            }

            scl = new_scl;
            sda = new_sda;
        }
    }
}

/// Two-line open-drain bus with one slave attached
#[derive(Debug)]
pub struct SimWire {
    state: RefCell<WireState>,
}

impl SimWire {
    pub fn new(slave: SimSlave) -> Self {
        Self {
            state: RefCell::new(WireState {
                master_scl_low: false,
                master_sda_low: false,
                slave,
                monitor: Monitor::default(),
            }),
        }
    }

    /// Master-side handles for CLOCK and DATA
    pub fn lines(&self) -> (SimLine<'_>, SimLine<'_>) {
        (
            SimLine {
                wire: self,
                line: Line::Scl,
            },
            SimLine {
                wire: self,
                line: Line::Sda,
            },
        )
    }

    fn drive(&self, line: Line, low: bool) {
        let mut state = self.state.borrow_mut();
        let (scl, sda) = (state.scl(), state.sda());
        match line {
            Line::Scl => state.master_scl_low = low,
            Line::Sda => state.master_sda_low = low,
        }
        state.settle(scl, sda);
    }

    fn read(&self, line: Line) -> bool {
        let mut state = self.state.borrow_mut();
        if line == Line::Scl && !state.master_scl_low {
            let (scl, sda) = (state.scl(), state.sda());
            state.slave.on_clock_poll();
            state.settle(scl, sda);
        }
        match line {
            Line::Scl => state.scl(),
            Line::Sda => state.sda(),
        }
    }

    /// Current CLOCK level
    pub fn scl_high(&self) -> bool {
        self.state.borrow().scl()
    }

    /// Current DATA level
    pub fn sda_high(&self) -> bool {
        self.state.borrow().sda()
    }

    /// START/STOP conditions seen so far
    pub fn events(&self) -> Vec<BusEvent, SIM_LOG_LEN> {
        self.state.borrow().monitor.events.clone()
    }

    /// Complete bytes seen so far, address bytes included
    pub fn frames(&self) -> Vec<Frame, SIM_LOG_LEN> {
        self.state.borrow().monitor.frames.clone()
    }

    /// Data bytes the slave accepted
    pub fn received(&self) -> Vec<u8, SIM_LOG_LEN> {
        self.state.borrow().slave.received.clone()
    }

    /// Short or free DATA at runtime
    pub fn set_sda_stuck(&self, stuck: bool) {
        let mut state = self.state.borrow_mut();
        let (scl, sda) = (state.scl(), state.sda());
        state.slave.stuck_sda = stuck;
        state.settle(scl, sda);
    }

    /// Short or free CLOCK at runtime
    pub fn set_scl_stuck(&self, stuck: bool) {
        let mut state = self.state.borrow_mut();
        let (scl, sda) = (state.scl(), state.sda());
        state.slave.stuck_scl = stuck;
        state.settle(scl, sda);
    }

    /// Forget everything recorded so far
    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.monitor.events.clear();
        state.monitor.frames.clear();
        state.slave.received.clear();
    }
}

/// Master side of one simulated line
#[derive(Debug)]
pub struct SimLine<'a> {
    wire: &'a SimWire,
    line: Line,
}

impl OpenDrainLine for SimLine<'_> {
    fn drive_low(&mut self) {
        self.wire.drive(self.line, true);
    }

    fn release(&mut self) {
        self.wire.drive(self.line, false);
    }

    fn is_high(&mut self) -> bool {
        self.wire.read(self.line)
    }
}

/// Tick source that only records whether it is running
#[derive(Debug, Default)]
pub struct SimTick {
    running: bool,
    pub starts: u32,
    pub stops: u32,
}

impl SimTick {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickSource for SimTick {
    fn start(&mut self) {
        self.running = true;
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.running = false;
        self.stops += 1;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

/// Delay that returns immediately and adds up what was asked for
#[derive(Debug, Default)]
pub struct SimDelay {
    pub total_ns: u64,
}

impl embedded_hal::delay::DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}
