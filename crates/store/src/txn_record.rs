//! The version chains' back-pointer to their owning transaction.
//!
//! [`TxnRecord`] is deliberately the only piece of transaction state the
//! store crate knows about: an id for ordering, and the write-snapshot id a
//! committed transaction is stamped with. The concurrency crate builds its
//! richer `Transaction` type around an `Arc<TxnRecord>`, but everything the
//! store needs to decide visibility lives here.

use parking_lot::Mutex;
use std::sync::Arc;

/// Shared transaction identity, visible to both the versioned store and the
/// concurrency crate that allocates and commits it.
///
/// `write_snapshot` starts `None` (the transaction is still active, or was
/// aborted) and is set exactly once by a successful commit (§4.3) to the id
/// of the snapshot that commit published into. Snapshot collapse (§4.1) may
/// later rewrite it to an ancestor's id as committed transactions are
/// reparented onto the snapshot that absorbed them.
#[derive(Debug)]
pub struct TxnRecord {
    id: u64,
    write_snapshot: Mutex<Option<u64>>,
}

impl TxnRecord {
    /// Allocate a fresh, uncommitted transaction record.
    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id,
            write_snapshot: Mutex::new(None),
        })
    }

    /// The transaction's allocation-order id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this transaction has committed.
    pub fn is_committed(&self) -> bool {
        self.write_snapshot.lock().is_some()
    }

    /// The snapshot id a committed version is visible as of, if committed.
    pub fn write_snapshot_id(&self) -> Option<u64> {
        *self.write_snapshot.lock()
    }

    /// Stamp the transaction as committed into `snapshot_id`.
    ///
    /// Called once by the transaction engine, and again by snapshot collapse
    /// when this transaction's writes are reparented onto an ancestor.
    pub fn set_write_snapshot(&self, snapshot_id: u64) {
        *self.write_snapshot.lock() = Some(snapshot_id);
    }
}
