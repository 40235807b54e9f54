//! Ten-thread money-transfer stress test (§8, seed scenario 5).
//!
//! Each thread owns one account key, seeded at 10_000. Threads repeatedly
//! pick a random peer and transfer a random portion of their own balance
//! into a single transaction, retrying on `ConflictRetry`. At every point
//! the sum across all ten accounts must equal 10_000 * 10 — no transfer can
//! be torn, double-applied, or lost.

use mvccdb::Engine;
use std::sync::Arc;
use std::thread;

const ACCOUNTS: usize = 10;
const INITIAL_BALANCE: u64 = 10_000;
const TRANSFERS_PER_THREAD: usize = 200;

fn account_key(id: usize) -> Vec<u8> {
    format!("A{id}").into_bytes()
}

fn read_balance(txn: &mvccdb::Txn, id: usize) -> u64 {
    let mut buf = [0u8; 8];
    let n = txn.lookup(&account_key(id), &mut buf).unwrap();
    assert_eq!(n, 8, "balance encoding must round-trip at full width");
    u64::from_le_bytes(buf)
}

fn total_balance(engine: &Engine) -> u64 {
    let txn = engine.alloc();
    (0..ACCOUNTS).map(|id| read_balance(&txn, id)).sum()
}

#[test]
fn total_balance_is_conserved_under_concurrent_transfers() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();

    let engine = Engine::init();

    let mut seed = engine.alloc();
    for id in 0..ACCOUNTS {
        seed.insert(&account_key(id), &INITIAL_BALANCE.to_le_bytes()).unwrap();
    }
    engine.commit(seed).unwrap();

    assert_eq!(total_balance(&engine), INITIAL_BALANCE * ACCOUNTS as u64);

    let engine = Arc::new(engine);
    let handles: Vec<_> = (0..ACCOUNTS)
        .map(|id| {
            let engine = engine.clone();
            thread::spawn(move || {
                let mut rng_state = 0x9E3779B97F4A7C15u64.wrapping_mul(id as u64 + 1);
                let mut next_rand = move || {
                    rng_state ^= rng_state << 13;
                    rng_state ^= rng_state >> 7;
                    rng_state ^= rng_state << 17;
                    rng_state
                };

                for _ in 0..TRANSFERS_PER_THREAD {
                    let peer = (next_rand() as usize) % ACCOUNTS;
                    if peer == id {
                        continue;
                    }

                    loop {
                        let mut txn = engine.alloc();
                        let from = read_balance(&txn, id);
                        let to = read_balance(&txn, peer);
                        if from == 0 {
                            break;
                        }
                        let amount = (next_rand() % from) + 1;

                        txn.insert(&account_key(id), &(from - amount).to_le_bytes()).unwrap();
                        txn.insert(&account_key(peer), &(to + amount).to_le_bytes()).unwrap();

                        match engine.commit(txn) {
                            Ok(()) => break,
                            Err(e) if e.is_conflict() => continue,
                            Err(e) => panic!("unexpected commit error: {e}"),
                        }
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(total_balance(&engine), INITIAL_BALANCE * ACCOUNTS as u64);
}
