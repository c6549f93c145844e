//! Transaction submission
//!
//! [`Submitter`] validates a request, copies it into a free queue slot and
//! publishes the slot. It borrows the queue only, so the bus can hand one to
//! a completion notifier from inside the tick without re-entering itself.

use crate::config::MAX_TRANSFER_LEN;
use crate::error::BusError;
use crate::queue::TransactionQueue;
use crate::transaction::{Operation, Request, TransactionHandle, MAX_ADDRESS};

/// Submission entry point over a bus queue
pub struct Submitter<'a, const N: usize> {
    queue: &'a mut TransactionQueue<N>,
}

impl<'a, const N: usize> Submitter<'a, N> {
    /// Wrap a queue
    pub fn new(queue: &'a mut TransactionQueue<N>) -> Self {
        Self { queue }
    }

    /// Queue a request
    ///
    /// Nothing is queued when the request is rejected.
    pub fn submit(&mut self, request: Request<'_>) -> Result<TransactionHandle, BusError> {
        validate(&request)?;

        let slot = self.queue.allocate_slot().ok_or(BusError::QueueFull)?;
        let tx = self.queue.slot_mut(slot).ok_or(BusError::QueueFull)?;
        tx.load(&request);
        let handle = tx.handle(slot);
        self.queue
            .enqueue(slot)
            .map_err(|_| BusError::QueueFull)?;

        debug!(
            "queued {:?} to {} in slot {}",
            request.operation,
            request.address,
            slot
        );
        Ok(handle)
    }

    /// Queue a write
    pub fn submit_write(&mut self, address: u8, bytes: &[u8]) -> Result<TransactionHandle, BusError> {
        self.submit(Request::write(address, bytes))
    }

    /// Queue a read of `len` bytes
    pub fn submit_read(&mut self, address: u8, len: usize) -> Result<TransactionHandle, BusError> {
        self.submit(Request::read(address, len))
    }

    /// Queue a write followed by a read under a repeated start
    pub fn submit_write_then_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        read_len: usize,
    ) -> Result<TransactionHandle, BusError> {
        self.submit(Request::write_then_read(address, bytes, read_len))
    }

    /// Queue a write that is sent completely even if the slave NACKs
    pub fn submit_forced_write(
        &mut self,
        address: u8,
        bytes: &[u8],
    ) -> Result<TransactionHandle, BusError> {
        self.submit(Request::forced_write(address, bytes))
    }

    /// Free queue slots
    pub fn count_free(&self) -> usize {
        self.queue.count_free()
    }
}

fn validate(request: &Request<'_>) -> Result<(), BusError> {
    if request.address > MAX_ADDRESS {
        return Err(BusError::InvalidAddress);
    }
    if request.write.len() > MAX_TRANSFER_LEN || request.read_len > MAX_TRANSFER_LEN {
        return Err(BusError::TransferTooLong);
    }
    // A slave starts driving DATA right after a read address is ACKed, so a
    // zero-length read cannot be terminated cleanly.
    let reads = matches!(request.operation, Operation::Read | Operation::WriteThenRead);
    if reads && request.read_len == 0 {
        return Err(BusError::EmptyTransfer);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionStatus;

    #[test]
    fn test_submit_copies_request() {
        let mut queue = TransactionQueue::<4>::new();
        let mut submitter = Submitter::new(&mut queue);
        let handle = submitter.submit_write(0x50, &[1, 2]).unwrap();
        assert_eq!(submitter.count_free(), 2);

        let tx = queue.get(handle).unwrap();
        assert_eq!(tx.address(), 0x50);
        assert_eq!(tx.write_remaining(), 2);
        assert_eq!(tx.status(), TransactionStatus::Pending);
        assert_eq!(queue.dequeue(), Some(handle.slot()));
    }

    #[test]
    fn test_queue_full() {
        let mut queue = TransactionQueue::<2>::new();
        let mut submitter = Submitter::new(&mut queue);
        assert!(submitter.submit_read(0x20, 1).is_ok());
        assert_eq!(submitter.submit_read(0x20, 1), Err(BusError::QueueFull));
    }

    #[test]
    fn test_rejects_bad_requests() {
        let mut queue = TransactionQueue::<4>::new();
        let mut submitter = Submitter::new(&mut queue);
        assert_eq!(
            submitter.submit_write(0x80, &[0]),
            Err(BusError::InvalidAddress)
        );
        assert_eq!(
            submitter.submit_write(0x50, &[0; MAX_TRANSFER_LEN + 1]),
            Err(BusError::TransferTooLong)
        );
        assert_eq!(submitter.submit_read(0x50, 0), Err(BusError::EmptyTransfer));
        assert_eq!(
            submitter.submit_write_then_read(0x50, &[0], 0),
            Err(BusError::EmptyTransfer)
        );
        assert_eq!(submitter.count_free(), 3);
    }

    #[test]
    fn test_empty_write_is_an_address_probe() {
        let mut queue = TransactionQueue::<4>::new();
        let mut submitter = Submitter::new(&mut queue);
        assert!(submitter.submit_write(0x3C, &[]).is_ok());
    }

    #[test]
    fn test_forced_write() {
        let mut queue = TransactionQueue::<4>::new();
        let handle = Submitter::new(&mut queue)
            .submit_forced_write(0x10, &[0xFF])
            .unwrap();
        assert!(queue.get(handle).unwrap().is_forced());
    }
}
