//! Render scene handle and consumer side of the transaction queue

use super::transaction::{RenderItemId, RenderOp, Transaction};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{trace, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Producer side of the render scene
#[derive(Debug)]
pub struct RenderScene {
    next_item: AtomicU64,
    sender: Sender<Transaction>,
}

impl RenderScene {
    /// Create a scene and the receiver the render thread drains
    pub fn new() -> (Arc<Self>, TransactionReceiver) {
        let (sender, receiver) = unbounded();
        let scene = Arc::new(Self {
            next_item: AtomicU64::new(1),
            sender,
        });
        (scene, TransactionReceiver { receiver })
    }

    /// Allocate a fresh item id
    pub fn allocate_id(&self) -> RenderItemId {
        RenderItemId(self.next_item.fetch_add(1, Ordering::Relaxed))
    }

    /// Hand a transaction to the render thread; never blocks
    pub fn enqueue_transaction(&self, transaction: Transaction) {
        if transaction.is_empty() {
            return;
        }
        trace!("Enqueueing render transaction with {} ops", transaction.len());
        if self.sender.send(transaction).is_err() {
            warn!("Render consumer is gone, dropping transaction");
        }
    }
}

/// Consumer side of the render scene
#[derive(Debug)]
pub struct TransactionReceiver {
    receiver: Receiver<Transaction>,
}

impl TransactionReceiver {
    /// Take every transaction queued so far, flattened in order
    pub fn drain(&self) -> Vec<RenderOp> {
        self.receiver.try_iter().flat_map(Transaction::into_ops).collect()
    }

    /// Wait up to `timeout` for the next transaction; `None` on timeout or
    /// when every producer is gone
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Transaction> {
        match self.receiver.recv_timeout(timeout) {
            Ok(transaction) => Some(transaction),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}
