//! Snapshot isolation: the refcounted chain of point-in-time views (§4.1).
//!
//! At any moment there is a *write* snapshot that the next commit will
//! publish into, and — once some transaction has asked for one since the
//! last commit — a *read* snapshot that new transactions bind to. A commit
//! never mints anything itself; it just attaches into the current write
//! snapshot and forgets the current read snapshot, exactly as §4.1
//! describes `snap_add_txn`. The next call to [`SnapshotManager::current_read`]
//! notices the missing read snapshot and performs the actual rotation: the
//! write snapshot becomes the new read snapshot, and a fresh write snapshot
//! is minted ahead of it. Rotating lazily (rather than eagerly inside every
//! commit) keeps the write and read roles on two distinct objects at all
//! times past the very first rotation, which matters for §4.1's refcount
//! discipline below.
//!
//! # Parent direction
//!
//! A snapshot's `parent` points to the *newer* snapshot it will be folded
//! into once nothing references it anymore, not to an older ancestor. A
//! snapshot's own `id` is therefore smaller than its parent's. This mirrors
//! how the chain actually collapses: releasing the last reference to a
//! snapshot merges its committed transactions into its parent and recurses,
//! so the parent pointer has to lead toward the surviving snapshot.

use crate::transaction::CommittedTxn;
use mvccdb_store::VersionedStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A point-in-time view: an id, the committed transactions published into
/// it, and a forward link toward the snapshot it collapses into.
pub struct Snapshot {
    id: u64,
    /// The newer snapshot this one folds into when its refcount hits zero.
    /// `None` for the current write snapshot, which has no parent yet.
    parent: Mutex<Option<Arc<Snapshot>>>,
    /// Transactions committed into this snapshot, oldest first.
    txns: Mutex<Vec<Arc<CommittedTxn>>>,
    /// Logical reference count: one per transaction bound to this snapshot
    /// as its read snapshot, plus one held by the manager while it is the
    /// current read or write snapshot. Distinct from `Arc`'s own strong
    /// count, which also counts transient clones taken while walking the
    /// chain.
    refcount: AtomicUsize,
}

impl Snapshot {
    fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id,
            parent: Mutex::new(None),
            txns: Mutex::new(Vec::new()),
            refcount: AtomicUsize::new(0),
        })
    }

    /// This snapshot's allocation-order id. Lower ids are older.
    pub fn id(&self) -> u64 {
        self.id
    }

    fn acquire(self: &Arc<Self>) {
        self.refcount.fetch_add(1, Ordering::SeqCst);
    }

    fn release_count(&self) -> usize {
        self.refcount.fetch_sub(1, Ordering::SeqCst) - 1
    }

    fn add_txn(&self, txn: Arc<CommittedTxn>) {
        self.txns.lock().push(txn);
    }
}

/// Owns the live snapshot chain and mints new snapshots on each commit.
///
/// The manager's own lock is the "snap lock" of §5's three-lock hierarchy,
/// always acquired after the commit lock and the KV lock.
pub struct SnapshotManager {
    inner: Mutex<Inner>,
    next_id: AtomicUsize,
    store: Arc<VersionedStore>,
}

struct Inner {
    write: Arc<Snapshot>,
    /// `None` means no reader has requested a snapshot since the last
    /// commit attached into `write` — the next [`current_read`] call must
    /// rotate before it can hand one out.
    ///
    /// [`current_read`]: SnapshotManager::current_read
    read: Option<Arc<Snapshot>>,
}

impl SnapshotManager {
    /// Start a fresh chain over `store` with a single base write snapshot
    /// and no read snapshot yet (§4.1: "may be null meaning no reader has
    /// requested one since the last rotation" — true from the very first
    /// instant here too). Collapse needs `store` to purge shadowed versions
    /// as transactions are reparented onto an ancestor snapshot.
    pub fn new(store: Arc<VersionedStore>) -> Self {
        let base = Snapshot::new(0);
        base.acquire();
        Self {
            inner: Mutex::new(Inner {
                write: base,
                read: None,
            }),
            next_id: AtomicUsize::new(1),
            store,
        }
    }

    /// The snapshot new transactions should bind their reads to.
    ///
    /// Rotates the chain if nobody has asked since the last commit: the
    /// current write snapshot is demoted to read snapshot, and a fresh
    /// write snapshot is minted and made its parent (§4.1's rationale — the
    /// write snapshot is always strictly newer than any handed-out read
    /// snapshot). The demoted snapshot keeps the refcount it was minted
    /// with; the new write snapshot gets one more on top of its own mint
    /// refcount, for being pointed to as the demoted snapshot's parent.
    pub fn current_read(&self) -> Arc<Snapshot> {
        let mut inner = self.inner.lock();
        if inner.read.is_none() {
            let new_write = Snapshot::new(self.next_id.fetch_add(1, Ordering::SeqCst) as u64);
            new_write.acquire();

            let demoted = inner.write.clone();
            *demoted.parent.lock() = Some(new_write.clone());
            new_write.acquire();

            inner.write = new_write;
            inner.read = Some(demoted);
        }
        let read = inner.read.clone().expect("just ensured Some above");
        read.acquire();
        read
    }

    /// The id of the snapshot a commit right now would publish into.
    pub fn write_id(&self) -> u64 {
        self.inner.lock().write.id()
    }

    /// Release a reference a transaction no longer needs (its read snapshot
    /// once it has committed or aborted, or the old read snapshot replaced
    /// by a commit's rotation). Collapses the chain when a refcount reaches
    /// zero, per §4.1.
    pub fn release(&self, snapshot: Arc<Snapshot>) {
        if snapshot.release_count() != 0 {
            return;
        }
        self.collapse(snapshot);
    }

    fn collapse(&self, snapshot: Arc<Snapshot>) {
        let parent = snapshot.parent.lock().take();
        let Some(parent) = parent else {
            // The current write snapshot has no parent yet; nothing to fold
            // its (empty) transaction list into until a commit gives it one.
            return;
        };
        let txns = std::mem::take(&mut *snapshot.txns.lock());
        for txn in txns {
            let writes = txn.take_writes();
            let remaining = self.store.purge(writes, parent.id());
            if remaining.is_empty() {
                // Every version this transaction wrote was shadowed by a
                // version already on the parent snapshot; the transaction
                // itself is fully absorbed and can be dropped.
                continue;
            }
            txn.restore_writes(remaining);
            txn.record.set_write_snapshot(parent.id());
            parent.add_txn(txn);
        }
        self.release(parent);
    }

    /// Attach `txn` to the current write snapshot and forget the current
    /// read snapshot, forcing the next [`current_read`] call to rotate
    /// (§4.1's `snap_add_txn`).
    ///
    /// Must be called with the commit lock held, and only after `txn` has
    /// already been stamped with the write snapshot's id (§4.3's
    /// publish-then-attach ordering: a transaction becomes visible to
    /// readers walking the committed chain before it is reachable from the
    /// snapshot chain at all). Does not mint anything itself — minting is
    /// `current_read`'s job, performed lazily the next time someone asks.
    ///
    /// [`current_read`]: SnapshotManager::current_read
    pub fn commit_and_rotate(&self, txn: Arc<CommittedTxn>) {
        let mut inner = self.inner.lock();
        inner.write.add_txn(txn);
        let old_read = inner.read.take();

        drop(inner);
        if let Some(old_read) = old_read {
            self.release(old_read);
        }
    }
}
