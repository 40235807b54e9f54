//! Snapshot isolation and the transaction lifecycle on top of a versioned
//! store: the snapshot chain (§4.1) and the commit protocol (§4.3).

#![warn(missing_docs)]
#![warn(clippy::all)]

mod snapshot;
mod transaction;

pub use snapshot::{Snapshot, SnapshotManager};
pub use transaction::{CommittedTxn, Transaction, TransactionEngine};
