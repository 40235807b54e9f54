//! Randomized-workload invariants (§8).
//!
//! These don't reach into `mvccdb`'s internals — everything is checked
//! through the public `Engine`/`Txn` facade, the same surface a consumer
//! would use — but each property corresponds directly to one named in §8.

use mvccdb::Engine;
use proptest::prelude::*;

fn put(engine: &Engine, key: &[u8], value: &[u8]) {
    let mut txn = engine.alloc();
    txn.insert(key, value).unwrap();
    engine.commit(txn).unwrap();
}

fn get(engine: &Engine, key: &[u8]) -> Option<Vec<u8>> {
    let txn = engine.alloc();
    let mut buf = [0u8; 256];
    match txn.lookup(key, &mut buf) {
        Ok(n) => Some(buf[..n].to_vec()),
        Err(e) if e.is_not_found() => None,
        Err(e) => panic!("unexpected error: {e}"),
    }
}

proptest! {
    // Write-buffer preference (§8): within one transaction, a lookup after
    // an insert always returns the buffered value, never a stale committed
    // one, regardless of what else is committed for the same key.
    #[test]
    fn write_buffer_shadows_committed_state(
        committed in prop::collection::vec(0u8..=255, 1..16),
        buffered in prop::collection::vec(0u8..=255, 1..16),
    ) {
        let engine = Engine::init();
        put(&engine, b"K", &committed);

        let mut txn = engine.alloc();
        txn.insert(b"K", &buffered).unwrap();
        let mut buf = [0u8; 256];
        let n = txn.lookup(b"K", &mut buf).unwrap();
        prop_assert_eq!(&buf[..n], &buffered[..]);
    }

    // Write-buffer preference, delete half: a delete buffered in the same
    // transaction as a prior insert to the same key resolves to absent.
    #[test]
    fn buffered_delete_after_buffered_insert_is_absent(
        value in prop::collection::vec(0u8..=255, 1..16),
    ) {
        let engine = Engine::init();
        let mut txn = engine.alloc();
        txn.insert(b"K", &value).unwrap();
        let _ = txn.delete(b"K");
        let mut buf = [0u8; 256];
        let err = txn.lookup(b"K", &mut buf).unwrap_err();
        prop_assert!(err.is_not_found());
    }

    // Truncation law (§8): `lookup` with a buffer of length B copies
    // `min(B, stored_len)` bytes and reports that length, never more.
    #[test]
    fn lookup_truncates_to_buffer_capacity(
        value in prop::collection::vec(0u8..=255, 0..64),
        cap in 0usize..64,
    ) {
        let engine = Engine::init();
        put(&engine, b"K", &value);

        let txn = engine.alloc();
        let mut buf = vec![0u8; cap];
        let n = txn.lookup(b"K", &mut buf).unwrap();
        let expected = value.len().min(cap);
        prop_assert_eq!(n, expected);
        prop_assert_eq!(&buf[..n], &value[..expected]);
    }

    // At-most-one-write-wins (§8): among a batch of transactions that all
    // read the same snapshot and write the same key, at most one commits.
    #[test]
    fn at_most_one_writer_wins_among_racers(writer_count in 2usize..8) {
        let engine = Engine::init();
        put(&engine, b"K", b"seed");

        let txns: Vec<_> = (0..writer_count)
            .map(|i| {
                let mut t = engine.alloc();
                t.insert(b"K", format!("writer-{i}").as_bytes()).unwrap();
                t
            })
            .collect();

        let successes = txns
            .into_iter()
            .filter(|_| true)
            .fold(0usize, |acc, t| match engine.commit(t) {
                Ok(()) => acc + 1,
                Err(e) => {
                    assert!(e.is_conflict());
                    acc
                }
            });

        prop_assert_eq!(successes, 1);
    }

    // No torn commit (§8): two successive reads inside the same transaction
    // return the same value even if other transactions commit in between.
    #[test]
    fn repeated_reads_in_one_transaction_are_stable(
        first in prop::collection::vec(0u8..=255, 1..16),
        second in prop::collection::vec(0u8..=255, 1..16),
    ) {
        let engine = Engine::init();
        put(&engine, b"K", &first);

        let reader = engine.alloc();
        let mut buf1 = [0u8; 256];
        let n1 = reader.lookup(b"K", &mut buf1).unwrap();

        put(&engine, b"K", &second);

        let mut buf2 = [0u8; 256];
        let n2 = reader.lookup(b"K", &mut buf2).unwrap();

        prop_assert_eq!(&buf1[..n1], &buf2[..n2]);
        prop_assert_eq!(get(&engine, b"K"), Some(second));
    }
}
