//! Board-agnostic core of the software I2C master
//!
//! This crate contains everything that does not depend on a particular chip:
//!
//! - Transaction model and fixed-capacity queue
//! - Tick-driven bus engine (START, bytes, ACK/NACK, repeated START, STOP)
//! - Completion notification and tick-context submission
//! - Bus recovery (clocking a wedged slave free)
//! - Registry of bus instances
//! - Configuration types
//! - Simulated bus for host tests (`sim` feature)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod queue;
pub mod recovery;
pub mod registry;
pub mod submit;
pub mod transaction;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use bus::BitBangBus;
pub use config::BusConfig;
pub use engine::Phase;
pub use error::{BusError, ErrorKind};
pub use notify::{Completion, CompletionNotifier, NoopNotifier};
pub use registry::{BusId, BusRegistry};
pub use submit::Submitter;
pub use transaction::{ErrorPolicy, Operation, Request, TransactionHandle, TransactionStatus};
