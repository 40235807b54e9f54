//! The ordered key index and per-key version chains (§4.2).
//!
//! Every key known to the store owns two chains: an *active* chain of
//! uncommitted versions (newest write first) and a *committed* chain of
//! versions visible to some snapshot (oldest first). The design notes license
//! a balanced tree in place of the original's intrusive linked lists —
//! "correctness depends only on order, not structure" — so the index here is
//! a `BTreeMap` guarded by a single `parking_lot::Mutex`: this is the KV lock
//! from §5's lock hierarchy.

use crate::txn_record::TxnRecord;
use crate::version::{Version, WriteRecord};
use mvccdb_core::{Error, KeyBytes, Result, ValueBytes};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

#[derive(Default)]
struct KeyEntry {
    active: VecDeque<Arc<Version>>,
    committed: Vec<Arc<Version>>,
}

/// The versioned key-value index shared by every transaction.
///
/// All methods take the transaction's own write buffer by reference rather
/// than owning it: the buffer belongs to the transaction engine, which
/// decides when to grow it (on a write), read it (on a lookup or a commit's
/// conflict test), or drain it (on commit or abort).
pub struct VersionedStore {
    index: Mutex<BTreeMap<KeyBytes, KeyEntry>>,
}

impl Default for VersionedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionedStore {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            index: Mutex::new(BTreeMap::new()),
        }
    }

    /// Record a write of `value` under `key` by `txn`, in the active chain.
    ///
    /// Always succeeds: the written version lands at the front of the key's
    /// active chain (§4.2, "most recently written wins among a transaction's
    /// own uncommitted writes") regardless of whether `key` already existed.
    pub fn insert(&self, txn: &Arc<TxnRecord>, key: KeyBytes, value: ValueBytes) -> WriteRecord {
        let version = Version::new(txn.clone(), Some(value));
        let mut index = self.index.lock();
        index
            .entry(key.clone())
            .or_default()
            .active
            .push_front(version.clone());
        WriteRecord { key, version }
    }

    /// Record a delete of `key` by `txn`, as a tombstone in the active chain.
    ///
    /// Returns `Err(Error::NotFound)` when `key` had no entry in the index at
    /// all before this call (§6: "tombstone still registered" even when the
    /// key was never seen before); the tombstone is written either way so a
    /// later reader of this transaction's own buffer still sees the delete.
    pub fn delete(&self, txn: &Arc<TxnRecord>, key: KeyBytes) -> (WriteRecord, Result<()>) {
        let version = Version::new(txn.clone(), None);
        let mut index = self.index.lock();
        let existed = index.contains_key(&key);
        index
            .entry(key.clone())
            .or_default()
            .active
            .push_front(version.clone());
        let record = WriteRecord { key, version };
        let outcome = if existed { Ok(()) } else { Err(Error::NotFound) };
        (record, outcome)
    }

    /// Resolve `key` as of `read_snapshot`, preferring `write_buffer`'s own
    /// uncommitted writes (§4.2's three-step read path).
    ///
    /// A key with no entry in the index at all, or whose committed chain has
    /// no version visible to any snapshot, is unreachable under the commit
    /// ordering this store enforces (§7): every key a caller can name was put
    /// there by some insert or delete, which always commits a version before
    /// any other transaction's snapshot can observe the key. Reaching either
    /// case is an invariant violation, not an ordinary miss, so this panics
    /// rather than returning an error.
    pub fn lookup(
        &self,
        write_buffer: &[WriteRecord],
        key: &KeyBytes,
        read_snapshot: u64,
        buf: &mut [u8],
    ) -> Result<usize> {
        if let Some(record) = write_buffer.iter().rev().find(|r| &r.key == key) {
            return Self::resolve(&record.version, buf);
        }

        let index = self.index.lock();
        let entry = index.get(key).unwrap_or_else(|| {
            panic!("{}", Error::Corruption);
        });
        let visible = entry
            .committed
            .iter()
            .rev()
            .find(|v| v.owner.write_snapshot_id().is_some_and(|id| id <= read_snapshot))
            .unwrap_or_else(|| {
                panic!("{}", Error::Corruption);
            });
        Self::resolve(visible, buf)
    }

    fn resolve(version: &Arc<Version>, buf: &mut [u8]) -> Result<usize> {
        match &version.value {
            Some(value) => Ok(value.copy_into(buf)),
            None => Err(Error::NotFound),
        }
    }

    /// True if committing `write_buffer` against `read_snapshot` would lose
    /// the optimistic write-write race (§4.3): some other transaction
    /// committed a newer version of one of these keys after `read_snapshot`
    /// was minted.
    pub fn conflicts(&self, write_buffer: &[WriteRecord], read_snapshot: u64) -> bool {
        let index = self.index.lock();
        write_buffer.iter().any(|record| {
            index
                .get(&record.key)
                .and_then(|entry| entry.committed.last())
                .and_then(|newest| newest.owner.write_snapshot_id())
                .is_some_and(|id| id > read_snapshot)
        })
    }

    /// Promote every version in `write_buffer` from active to committed.
    ///
    /// Must run *before* the owning transaction's `TxnRecord` is stamped with
    /// its write-snapshot id (§4.3's "promotion must precede attachment"):
    /// the instant a version becomes reachable from the committed chain, a
    /// concurrent reader walking it may see this version with no
    /// write-snapshot id stamped yet and must skip it rather than treat it
    /// as an error (§9's stale-read-window note).
    pub fn commit_promote(&self, write_buffer: &[WriteRecord]) {
        let mut index = self.index.lock();
        for record in write_buffer {
            let entry = index.get_mut(&record.key).expect("key present at insert time");
            if let Some(pos) = entry.active.iter().position(|v| Arc::ptr_eq(v, &record.version)) {
                let version = entry.active.remove(pos).expect("position just found");
                entry.committed.push(version);
            }
        }
    }

    /// Unlink every version in `write_buffer` from its key's active chain,
    /// without promoting it. Used to discard an aborted transaction's writes.
    pub fn abort_free(&self, write_buffer: &[WriteRecord]) {
        let mut index = self.index.lock();
        for record in write_buffer {
            if let Some(entry) = index.get_mut(&record.key) {
                if let Some(pos) = entry.active.iter().position(|v| Arc::ptr_eq(v, &record.version)) {
                    entry.active.remove(pos);
                }
            }
        }
    }

    /// Drop each version in `writes` whose successor in the committed chain
    /// already belongs to `parent_snapshot` (§4.1's collapse: those versions
    /// are now shadowed and can be freed), returning the versions that
    /// survive and must be reparented onto `parent_snapshot` instead.
    pub fn purge(&self, writes: Vec<WriteRecord>, parent_snapshot: u64) -> Vec<WriteRecord> {
        let mut index = self.index.lock();
        writes
            .into_iter()
            .filter(|record| {
                let entry = index.get_mut(&record.key).expect("key present at commit time");
                let pos = entry
                    .committed
                    .iter()
                    .position(|v| Arc::ptr_eq(v, &record.version))
                    .expect("version present in committed chain");
                let shadowed = entry
                    .committed
                    .get(pos + 1)
                    .is_some_and(|next| next.owner.write_snapshot_id() == Some(parent_snapshot));
                if shadowed {
                    entry.committed.remove(pos);
                }
                !shadowed
            })
            .collect()
    }
}
