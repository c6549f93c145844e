//! Completion notification
//!
//! The engine calls the notifier from inside the tick, right after STOP (or a
//! bus fault) has finalized a transaction and its slot has been retired. The
//! slot keeps its results until the allocator wraps around to it.
//! Implementations run in interrupt context: keep them short and never block.

use crate::submit::Submitter;
use crate::transaction::{TransactionHandle, TransactionStatus};

/// A finished transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Completion {
    pub handle: TransactionHandle,
    pub status: TransactionStatus,
    pub bytes_transferred: usize,
}

impl Completion {
    /// Check if the transaction completed without error
    pub fn is_ok(&self) -> bool {
        self.status == TransactionStatus::Complete
    }
}

/// Receives finished transactions
///
/// `queue` submits follow-up work from the tick context. Whatever is queued
/// there starts right after the current STOP, or, after a bus timeout, once
/// both lines read high again.
pub trait CompletionNotifier<const N: usize> {
    fn on_complete(&mut self, completion: Completion, queue: &mut Submitter<'_, N>);
}

impl<T: CompletionNotifier<N> + ?Sized, const N: usize> CompletionNotifier<N> for &mut T {
    fn on_complete(&mut self, completion: Completion, queue: &mut Submitter<'_, N>) {
        T::on_complete(self, completion, queue)
    }
}

/// Notifier that discards completions (status is polled instead)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl<const N: usize> CompletionNotifier<N> for NoopNotifier {
    fn on_complete(&mut self, _completion: Completion, _queue: &mut Submitter<'_, N>) {}
}
