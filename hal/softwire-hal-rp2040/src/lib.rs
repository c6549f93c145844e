//! RP2040 backend for the softwire I2C master
//!
//! Implements the `softwire-hal` collaborator traits on RP2040 hardware:
//!
//! - [`line::FlexLine`] - open-drain line emulated with a direction-switching GPIO
//! - [`ticker::WakingGate`] / [`ticker::run_ticker`] - tick source on an
//!   embassy-time `Ticker`, parked while the bus is idle

#![no_std]

pub mod line;
pub mod ticker;

pub use line::FlexLine;
pub use ticker::{run_ticker, WakingGate};
