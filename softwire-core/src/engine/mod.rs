//! Bit-banged I2C master state machine
//!
//! [`Phase`] enumerates the per-tick sub-states; [`Engine`] holds the
//! protocol state of one bus and executes one phase per tick.

mod machine;
pub mod phase;

pub use machine::{Engine, FRAME_BITS};
pub use phase::{Phase, PhaseGroup};
