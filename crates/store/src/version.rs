//! A single value version and its place in a transaction's write buffer.

use crate::txn_record::TxnRecord;
use mvccdb_core::{KeyBytes, ValueBytes};
use std::sync::Arc;

/// One write made by one transaction: either a value or a tombstone.
///
/// A version never outlives the `Arc`s that reference it: one from the key's
/// active-or-committed chain in the [`crate::VersionedStore`], and one from
/// its owning transaction's write buffer. When both drop, the version is
/// freed — there is no separate reclamation pass.
#[derive(Debug)]
pub struct Version {
    /// The transaction that created this version.
    pub owner: Arc<TxnRecord>,
    /// `None` marks a tombstone (§3: "a version is a zero-length value
    /// denoting a delete").
    pub value: Option<ValueBytes>,
}

impl Version {
    pub(crate) fn new(owner: Arc<TxnRecord>, value: Option<ValueBytes>) -> Arc<Self> {
        Arc::new(Self { owner, value })
    }

    /// True if this version is a delete marker rather than a value.
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// An entry in a transaction's write buffer: the key written, and the
/// version created for it.
///
/// Keeping the key alongside the version (rather than inside [`Version`]
/// itself) means the committed chain never needs to store it twice: the
/// key index already owns one copy as a `BTreeMap` key.
#[derive(Debug, Clone)]
pub struct WriteRecord {
    /// The key this version was written under.
    pub key: KeyBytes,
    /// The version created for it.
    pub version: Arc<Version>,
}
