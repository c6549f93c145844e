//! Transaction model
//!
//! A transaction is the unit of work a client submits. It lives in a queue
//! slot from submission until the engine retires it; the slot keeps its
//! final status and received bytes until the allocator wraps around to it.

use heapless::Vec;

use crate::config::MAX_TRANSFER_LEN;
use crate::error::ErrorKind;

/// Highest 7-bit address
pub const MAX_ADDRESS: u8 = 0x7F;

/// Byte buffer owned by a queue slot
pub type TransferBuffer = Vec<u8, MAX_TRANSFER_LEN>;

/// What the transaction does on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    /// Address + W, then write bytes
    #[default]
    Write,
    /// Address + R, then read bytes
    Read,
    /// Write bytes, repeated start, then read bytes
    WriteThenRead,
}

/// Transaction status as seen by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransactionStatus {
    /// Queued or in flight
    #[default]
    Pending,
    /// Every requested byte was transferred
    Complete,
    /// Terminated early
    Error(ErrorKind),
}

impl TransactionStatus {
    /// Check if the transaction has finished (either way)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// Which bus errors do not abort a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorPolicy {
    /// Keep sending after the address byte is NACKed
    pub ignore_address_nack: bool,
    /// Keep sending after a data byte is NACKed
    pub ignore_data_nack: bool,
}

impl ErrorPolicy {
    /// Abort on every NACK
    pub const STRICT: Self = Self {
        ignore_address_nack: false,
        ignore_data_nack: false,
    };

    /// Send the whole write buffer no matter what the slave answers
    pub const FORCED: Self = Self {
        ignore_address_nack: true,
        ignore_data_nack: true,
    };

    /// Check if a NACK on this kind of byte is tolerated
    pub fn ignores(&self, kind: ErrorKind) -> bool {
        match kind {
            ErrorKind::NackAddress => self.ignore_address_nack,
            ErrorKind::NackData => self.ignore_data_nack,
            _ => false,
        }
    }
}

/// Identifies a submitted transaction
///
/// The generation changes every time the slot is reused, so a handle kept
/// past that point stops resolving instead of reporting someone else's
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransactionHandle {
    pub(crate) slot: u8,
    pub(crate) generation: u16,
}

impl TransactionHandle {
    /// Queue slot index backing this transaction
    pub fn slot(&self) -> usize {
        self.slot as usize
    }
}

/// A request to be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    /// Bus operation
    pub operation: Operation,
    /// 7-bit device address
    pub address: u8,
    /// Bytes to send (Write and WriteThenRead)
    pub write: &'a [u8],
    /// Bytes to receive (Read and WriteThenRead)
    pub read_len: usize,
    /// NACK handling
    pub policy: ErrorPolicy,
}

impl<'a> Request<'a> {
    /// Plain write
    pub fn write(address: u8, bytes: &'a [u8]) -> Self {
        Self {
            operation: Operation::Write,
            address,
            write: bytes,
            read_len: 0,
            policy: ErrorPolicy::STRICT,
        }
    }

    /// Plain read of `len` bytes
    pub fn read(address: u8, len: usize) -> Self {
        Self {
            operation: Operation::Read,
            address,
            write: &[],
            read_len: len,
            policy: ErrorPolicy::STRICT,
        }
    }

    /// Write then read with a repeated start in between
    pub fn write_then_read(address: u8, bytes: &'a [u8], read_len: usize) -> Self {
        Self {
            operation: Operation::WriteThenRead,
            address,
            write: bytes,
            read_len,
            policy: ErrorPolicy::STRICT,
        }
    }

    /// Write that ignores every NACK
    pub fn forced_write(address: u8, bytes: &'a [u8]) -> Self {
        Self {
            policy: ErrorPolicy::FORCED,
            ..Self::write(address, bytes)
        }
    }

    /// Replace the NACK policy
    pub fn with_policy(self, policy: ErrorPolicy) -> Self {
        Self { policy, ..self }
    }
}

/// A transaction occupying a queue slot
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transaction {
    pub(crate) operation: Operation,
    pub(crate) address: u8,
    pub(crate) write: TransferBuffer,
    pub(crate) write_pos: usize,
    pub(crate) read: TransferBuffer,
    pub(crate) read_len: usize,
    pub(crate) bytes_transferred: usize,
    pub(crate) policy: ErrorPolicy,
    pub(crate) status: TransactionStatus,
    pub(crate) error: Option<ErrorKind>,
    /// Write half of a write-then-read is done; next START resumes as a read
    pub(crate) read_phase: bool,
    pub(crate) generation: u16,
}

impl Transaction {
    /// Operation requested at submission
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// 7-bit device address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Current status
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Data bytes moved so far
    pub fn bytes_transferred(&self) -> usize {
        self.bytes_transferred
    }

    /// Bytes received so far
    pub fn read_data(&self) -> &[u8] {
        &self.read
    }

    /// Write bytes not yet sent
    pub fn write_remaining(&self) -> usize {
        self.write.len() - self.write_pos
    }

    /// Read bytes not yet received
    pub fn read_remaining(&self) -> usize {
        self.read_len - self.read.len()
    }

    /// Check if NACKs are ignored for the whole write buffer
    pub fn is_forced(&self) -> bool {
        self.policy == ErrorPolicy::FORCED
    }

    /// Check if the engine is currently in the write half
    pub(crate) fn is_writing(&self) -> bool {
        match self.operation {
            Operation::Write => true,
            Operation::WriteThenRead => !self.read_phase,
            Operation::Read => false,
        }
    }

    /// Check if the engine is currently in the read half
    pub(crate) fn is_reading(&self) -> bool {
        match self.operation {
            Operation::Read => true,
            Operation::WriteThenRead => self.read_phase,
            Operation::Write => false,
        }
    }

    /// R/W bit for the next address byte
    pub(crate) fn rw_bit(&self) -> u8 {
        u8::from(self.is_reading())
    }

    /// Fill the slot from a validated request
    pub(crate) fn load(&mut self, request: &Request<'_>) {
        self.operation = request.operation;
        self.address = request.address;
        self.write.clear();
        // Length is checked before the slot is allocated
        let _ = self.write.extend_from_slice(request.write);
        self.write_pos = 0;
        self.read.clear();
        self.read_len = request.read_len;
        self.bytes_transferred = 0;
        self.policy = request.policy;
        self.status = TransactionStatus::Pending;
        self.error = None;
        self.read_phase = false;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Take the next byte to transmit
    pub(crate) fn next_write_byte(&mut self) -> Option<u8> {
        let byte = self.write.get(self.write_pos).copied()?;
        self.write_pos += 1;
        Some(byte)
    }

    /// Store a received byte
    pub(crate) fn push_read_byte(&mut self, byte: u8) {
        if self.read.push(byte).is_ok() {
            self.bytes_transferred += 1;
        }
    }

    /// Flip a write-then-read into its read half
    ///
    /// Called at the START following the internal restart. The transaction
    /// keeps its queue slot, so nothing can be dequeued in between.
    pub(crate) fn resume_as_read(&mut self) {
        self.read_phase = true;
    }

    /// Record the first error seen; later ones are consequences of it
    pub(crate) fn record_error(&mut self, kind: ErrorKind) {
        if self.error.is_none() {
            self.error = Some(kind);
        }
    }

    /// Terminal status once STOP has been sent
    pub(crate) fn final_status(&self) -> TransactionStatus {
        match self.error {
            Some(kind) => TransactionStatus::Error(kind),
            None if self.write_remaining() > 0 || self.read_remaining() > 0 => {
                TransactionStatus::Error(ErrorKind::BufferIncomplete)
            }
            None => TransactionStatus::Complete,
        }
    }

    pub(crate) fn handle(&self, slot: usize) -> TransactionHandle {
        TransactionHandle {
            slot: slot as u8,
            generation: self.generation,
        }
    }
}
