//! Adapters around the softwire I2C master
//!
//! This crate connects the board-agnostic engine in softwire-core to real
//! hardware and to application code:
//!
//! - Open-drain line on an embedded-hal pin
//! - Tick sources without a dedicated timer (soft flag, shared gate)
//! - Polled blocking bus implementing `I2cBus` and embedded-hal `I2c`
//! - Shared bus with separate task and tick entry points

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod line;
pub mod polled;
pub mod shared;
pub mod tick;

pub use line::PinLine;
pub use polled::PolledBus;
pub use shared::{SharedBus, SignalNotifier};
pub use tick::{SoftTick, TickGate};
