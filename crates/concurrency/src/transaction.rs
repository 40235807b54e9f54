//! The transaction lifecycle: allocate, buffer writes, commit or abort (§4.3).

use crate::snapshot::{Snapshot, SnapshotManager};
use mvccdb_core::{Error, KeyBytes, Result, ValueBytes};
use mvccdb_store::{TxnRecord, VersionedStore, WriteRecord};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{instrument, trace};

/// A transaction that has committed: its identity and the writes published
/// into some snapshot's transaction list.
///
/// Lives past the `Transaction` handle that created it — it is the unit
/// snapshot collapse moves between snapshots as it reparents surviving
/// writes onto an ancestor (§4.1).
pub struct CommittedTxn {
    /// Shared identity; also reachable from every [`mvccdb_store::Version`]
    /// this transaction wrote.
    pub record: Arc<TxnRecord>,
    writes: Mutex<Vec<WriteRecord>>,
}

impl CommittedTxn {
    pub(crate) fn new(record: Arc<TxnRecord>, writes: Vec<WriteRecord>) -> Self {
        Self {
            record,
            writes: Mutex::new(writes),
        }
    }

    pub(crate) fn take_writes(&self) -> Vec<WriteRecord> {
        std::mem::take(&mut self.writes.lock())
    }

    pub(crate) fn restore_writes(&self, writes: Vec<WriteRecord>) {
        *self.writes.lock() = writes;
    }
}

/// An open transaction: a read snapshot to resolve lookups against, and a
/// write buffer of not-yet-committed versions this transaction created.
///
/// The write buffer is owned exclusively by the thread holding the handle
/// until commit (§5: "no locking is needed for in-transaction reads of that
/// buffer"), so every method here except [`Transaction::commit`] borrows
/// `self`.
///
/// Dropping a `Transaction` without committing it is the caller-driven abort
/// path (§4.3): its writes are unlinked from the active chain and its read
/// snapshot is released.
pub struct Transaction {
    record: Arc<TxnRecord>,
    read_snapshot: Arc<Snapshot>,
    write_buffer: Vec<WriteRecord>,
    store: Arc<VersionedStore>,
    snapshots: Arc<SnapshotManager>,
    resolved: bool,
}

impl Transaction {
    fn new(record: Arc<TxnRecord>, read_snapshot: Arc<Snapshot>, store: Arc<VersionedStore>, snapshots: Arc<SnapshotManager>) -> Self {
        Self {
            record,
            read_snapshot,
            write_buffer: Vec::new(),
            store,
            snapshots,
            resolved: false,
        }
    }

    /// This transaction's allocation-order id.
    pub fn id(&self) -> u64 {
        self.record.id()
    }

    /// Write `value` under `key`, buffered until commit.
    pub fn insert(&mut self, key: KeyBytes, value: ValueBytes) {
        let record = self.store.insert(&self.record, key, value);
        self.write_buffer.push(record);
    }

    /// Register a tombstone for `key`, buffered until commit.
    ///
    /// Returns `Err(Error::NotFound)` when `key` had no prior entry in the
    /// index (§6); the tombstone is still buffered either way.
    pub fn delete(&mut self, key: KeyBytes) -> Result<()> {
        let (record, outcome) = self.store.delete(&self.record, key);
        self.write_buffer.push(record);
        outcome
    }

    /// Resolve `key` as of this transaction's read snapshot, preferring its
    /// own buffered writes, copying up to `buf.len()` bytes.
    pub fn lookup(&self, key: &KeyBytes, buf: &mut [u8]) -> Result<usize> {
        self.store.lookup(&self.write_buffer, key, self.read_snapshot.id(), buf)
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.resolved {
            self.store.abort_free(&self.write_buffer);
            self.snapshots.release(self.read_snapshot.clone());
        }
    }
}

/// Allocates transactions and runs their commit protocol against a shared
/// [`VersionedStore`] and [`SnapshotManager`].
pub struct TransactionEngine {
    store: Arc<VersionedStore>,
    snapshots: Arc<SnapshotManager>,
    commit_lock: Mutex<()>,
    next_txn_id: AtomicU64,
}

impl TransactionEngine {
    /// Build an engine over a freshly initialized store and snapshot chain.
    pub fn new(store: Arc<VersionedStore>, snapshots: Arc<SnapshotManager>) -> Self {
        Self {
            store,
            snapshots,
            commit_lock: Mutex::new(()),
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// Allocate a new transaction bound to the current read snapshot.
    #[instrument(skip(self))]
    pub fn alloc(&self) -> Transaction {
        let id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let record = TxnRecord::new(id);
        let read_snapshot = self.snapshots.current_read();
        trace!(txn = id, read_snapshot = read_snapshot.id(), "allocated transaction");
        Transaction::new(record, read_snapshot, self.store.clone(), self.snapshots.clone())
    }

    /// Commit `txn`, consuming it regardless of outcome (§6: "`txn_commit`
    /// consumes the transaction on any terminal result").
    ///
    /// An empty write buffer takes the fast path described in §4.3 and
    /// always succeeds. Otherwise the whole sequence — conflict test,
    /// promotion, attachment — runs under the single commit lock so commits
    /// are totally ordered by the order in which they acquire it.
    #[instrument(skip(self, txn), fields(txn = txn.id()))]
    pub fn commit(&self, mut txn: Transaction) -> Result<()> {
        if txn.write_buffer.is_empty() {
            txn.resolved = true;
            self.snapshots.release(txn.read_snapshot.clone());
            trace!("committed empty transaction, no-op");
            return Ok(());
        }

        let _commit_guard = self.commit_lock.lock();

        if self.store.conflicts(&txn.write_buffer, txn.read_snapshot.id()) {
            txn.resolved = true;
            self.store.abort_free(&txn.write_buffer);
            self.snapshots.release(txn.read_snapshot.clone());
            trace!("commit lost write-write race");
            return Err(Error::ConflictRetry);
        }

        // Promotion must precede attachment (§4.3's critical ordering): the
        // instant a version is reachable from the committed chain, readers
        // may observe it with no write-snapshot id stamped yet and must
        // skip it, never treat it as an error.
        self.store.commit_promote(&txn.write_buffer);

        let write_snapshot_id = self.snapshots.write_id();
        txn.record.set_write_snapshot(write_snapshot_id);

        txn.resolved = true;
        let writes = std::mem::take(&mut txn.write_buffer);
        let committed = Arc::new(CommittedTxn::new(txn.record.clone(), writes));
        self.snapshots.commit_and_rotate(committed);
        self.snapshots.release(txn.read_snapshot.clone());

        Ok(())
    }
}
