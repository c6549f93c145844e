//! Error types
//!
//! Two layers: [`ErrorKind`] is the terminal failure recorded on a
//! transaction by the bus engine; [`BusError`] is returned synchronously by
//! the API (submission, recovery, registry).

use embedded_hal::i2c::{Error as HalI2cError, ErrorKind as HalErrorKind, NoAcknowledgeSource};

/// Why a transaction ended in `Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// A released line never reached the expected level in time
    BusTimeout,
    /// Slave did not acknowledge its address
    NackAddress,
    /// Slave did not acknowledge a data byte
    NackData,
    /// STOP reached with bytes still left to transfer
    BufferIncomplete,
}

/// Errors returned by the bus API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// No free queue slot
    QueueFull,
    /// Buffer longer than a queue slot can hold
    TransferTooLong,
    /// Address does not fit in 7 bits
    InvalidAddress,
    /// Transaction with nothing to transfer
    EmptyTransfer,
    /// Operation needs an idle bus but a transaction is active
    Busy,
    /// DATA still held low after a bus reset
    BusStuck,
    /// Registry has no room for another bus instance
    RegistryFull,
    /// No bus instance registered under this id
    UnknownBus,
    /// Bus configuration out of range
    InvalidConfig,
    /// Operation sequence the engine cannot put on the wire as one transaction
    Unsupported,
    /// Transaction finished with an error
    Transfer(ErrorKind),
}

impl From<ErrorKind> for BusError {
    fn from(kind: ErrorKind) -> Self {
        BusError::Transfer(kind)
    }
}

impl HalI2cError for ErrorKind {
    fn kind(&self) -> HalErrorKind {
        match self {
            ErrorKind::BusTimeout => HalErrorKind::Bus,
            ErrorKind::NackAddress => HalErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            ErrorKind::NackData => HalErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
            ErrorKind::BufferIncomplete => HalErrorKind::Other,
        }
    }
}

impl HalI2cError for BusError {
    fn kind(&self) -> HalErrorKind {
        match self {
            BusError::Transfer(kind) => kind.kind(),
            BusError::BusStuck => HalErrorKind::Bus,
            _ => HalErrorKind::Other,
        }
    }
}
