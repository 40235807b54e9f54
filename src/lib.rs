//! # mvccdb
//!
//! An in-memory, multi-version, concurrency-controlled key-value store.
//! Transactions read a consistent snapshot of committed state, buffer their
//! writes locally, and either commit — publishing atomically under
//! optimistic write-write conflict detection — or are abandoned.
//!
//! # Quick start
//!
//! ```
//! use mvccdb::Engine;
//!
//! # fn main() -> mvccdb::Result<()> {
//! let engine = Engine::init();
//!
//! let mut txn = engine.alloc();
//! txn.insert(b"user:1", b"alice")?;
//! engine.commit(txn)?;
//!
//! let reader = engine.alloc();
//! let mut buf = [0u8; 32];
//! let n = reader.lookup(b"user:1", &mut buf)?;
//! assert_eq!(&buf[..n], b"alice");
//! # Ok(())
//! # }
//! ```
//!
//! # Isolation
//!
//! Every transaction reads through the snapshot it was allocated against;
//! concurrent commits to other keys, or to the same key from a snapshot
//! older than the reader's, never become visible mid-transaction. Two
//! transactions racing to write the same key resolve at commit time: the
//! first to acquire the commit lock wins, the other fails with
//! [`Error::ConflictRetry`] and is expected to retry against a fresh
//! transaction.
//!
//! # Crate layout
//!
//! The public surface here is a thin facade (§6 of the design spec) over
//! three internal crates: [`mvccdb_core`] (errors and length-checked byte
//! strings), [`mvccdb_store`] (the versioned key index), and
//! [`mvccdb_concurrency`] (the snapshot chain and transaction engine). Only
//! this crate's types are part of the stable API.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use mvccdb_core::{Error, Result, MAX_LEN};

use mvccdb_concurrency::{SnapshotManager, Transaction, TransactionEngine};
use mvccdb_core::{KeyBytes, ValueBytes};
use mvccdb_store::VersionedStore;
use std::sync::Arc;
use tracing::instrument;

/// The store: owns the versioned key index, the snapshot chain, and the
/// transaction engine that coordinates commits across them.
///
/// `Engine` is cheaply cloneable (it is a handle over `Arc`-shared state)
/// and safe to share across threads; see §5 for the lock ordering that
/// makes concurrent [`Engine::alloc`]/[`Engine::commit`] calls safe.
pub struct Engine {
    txns: Arc<TransactionEngine>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::init()
    }
}

impl Clone for Engine {
    fn clone(&self) -> Self {
        Self {
            txns: self.txns.clone(),
        }
    }
}

impl Engine {
    /// Bring up a fresh engine: an empty key index and a base snapshot
    /// (§4.1, "a base snapshot created at init"). There is no on-disk state
    /// to recover and no configuration to supply (§6) — the only knob is
    /// this constructor itself.
    #[instrument]
    pub fn init() -> Self {
        let store = Arc::new(VersionedStore::new());
        let snapshots = Arc::new(SnapshotManager::new(store.clone()));
        tracing::info!("mvccdb engine initialized");
        Self {
            txns: Arc::new(TransactionEngine::new(store, snapshots)),
        }
    }

    /// Allocate a new transaction, pinned to the current read snapshot.
    ///
    /// Corresponds to `txn_alloc` in §6. Never fails in this in-memory
    /// implementation (the `OutOfMemory` variant exists for the facade's
    /// contract but an allocator failure here would already have aborted
    /// the process via Rust's global allocator).
    pub fn alloc(&self) -> Txn {
        Txn {
            inner: self.txns.alloc(),
        }
    }

    /// Commit `txn`, consuming it regardless of outcome (§6).
    ///
    /// An empty write buffer commits as a no-op. Otherwise this runs the
    /// conflict test, promotes the transaction's writes, and publishes them
    /// into the current write snapshot; see [`mvccdb_concurrency`]'s commit
    /// protocol for the full ordering guarantee.
    pub fn commit(&self, txn: Txn) -> Result<()> {
        self.txns.commit(txn.inner)
    }
}

/// An open transaction handle: the public surface over
/// [`mvccdb_concurrency::Transaction`].
///
/// Keys and values passed to [`Txn::insert`]/[`Txn::delete`] are checked
/// against the 16-bit length ceiling from §6 and rejected with
/// [`Error::TooLarge`] before ever reaching the store.
pub struct Txn {
    inner: Transaction,
}

impl Txn {
    /// This transaction's allocation-order id.
    pub fn id(&self) -> u64 {
        self.inner.id()
    }

    /// Write `value` under `key`, buffered until commit (`txn_insert`, §6).
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let key = KeyBytes::new(key.to_vec())?;
        let value = ValueBytes::new(value.to_vec())?;
        self.inner.insert(key, value);
        Ok(())
    }

    /// Register a tombstone for `key`, buffered until commit (`txn_delete`,
    /// §6). Returns `Err(Error::NotFound)` when `key` had no prior entry —
    /// the tombstone is still buffered and will still commit.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        let key = KeyBytes::new(key.to_vec())?;
        self.inner.delete(key)
    }

    /// Resolve `key` as of this transaction's read snapshot, preferring its
    /// own buffered writes, copying up to `buf.len()` bytes (`txn_lookup`,
    /// §6). Returns the number of bytes copied, truncated to `buf`'s
    /// capacity rather than the stored value's length.
    pub fn lookup(&self, key: &[u8], buf: &mut [u8]) -> Result<usize> {
        let key = KeyBytes::new(key.to_vec())?;
        self.inner.lookup(&key, buf)
    }
}
