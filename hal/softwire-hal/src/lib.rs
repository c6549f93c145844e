//! Softwire Hardware Abstraction Layer
//!
//! This crate defines the collaborator traits the bit-banged I2C engine is
//! written against. Chip-specific crates implement them for real GPIO lines
//! and timers; `softwire-core` ships simulated implementations for host tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application / device drivers           │
//! └─────────────────────────────────────────┘
//!                     │  I2cBus
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  softwire-core (queue + bus engine)     │
//! └─────────────────────────────────────────┘
//!                     │  OpenDrainLine, TickSource
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  softwire-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ softwire-hal- │       │ softwire-core │
//! │    rp2040     │       │   ::sim       │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OpenDrainLine`] - One open-drain bus line (SCL or SDA)
//! - [`timer::TickSource`] - Periodic tick at 4x the bit rate
//! - [`i2c::I2cBus`] - Blocking I2C master operations for client code

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod i2c;
pub mod timer;

// Re-export key traits at crate root for convenience
pub use gpio::{Level, OpenDrainLine};
pub use i2c::{I2cBus, I2cConfig};
pub use timer::TickSource;
