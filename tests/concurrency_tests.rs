use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sovran_concurrent_map::{AnyConcurrentMap, ConcurrentMap, MapError, ShardedConcurrentMap};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const THREADS: u32 = 8;
const OPS_PER_THREAD: usize = 2_000;
const KEYS_PER_THREAD: u32 = 64;

#[derive(Clone, Copy, Debug)]
enum Op {
    Put(u32, u64),
    Get(u32),
    Remove(u32),
}

// Every thread owns the key range [thread * KEYS_PER_THREAD, (thread + 1) * KEYS_PER_THREAD).
fn op_log(thread: u32) -> Vec<Op> {
    let mut rng = StdRng::seed_from_u64(u64::from(thread) + 1);
    let base = thread * KEYS_PER_THREAD;
    (0..OPS_PER_THREAD)
        .map(|_| {
            let key = base + rng.random_range(0..KEYS_PER_THREAD);
            match rng.random_range(0..10) {
                0..=4 => Op::Put(key, rng.random()),
                5..=7 => Op::Get(key),
                _ => Op::Remove(key),
            }
        })
        .collect()
}

fn sequential_reference(logs: &[Vec<Op>]) -> HashMap<u32, u64> {
    let mut reference = HashMap::new();
    for log in logs {
        for op in log {
            match *op {
                Op::Put(k, v) => {
                    reference.insert(k, v);
                }
                Op::Get(_) => {}
                Op::Remove(k) => {
                    reference.remove(&k);
                }
            }
        }
    }
    reference
}

fn logs() -> Vec<Vec<Op>> {
    (0..THREADS).map(op_log).collect()
}

#[test]
fn test_disjoint_keys_match_sequential_replay() -> Result<(), MapError> {
    let logs = logs();
    let map = Arc::new(ConcurrentMap::<u32, u64>::new());

    let handles: Vec<_> = logs
        .iter()
        .cloned()
        .map(|log| {
            let map = Arc::clone(&map);
            thread::spawn(move || -> Result<(), MapError> {
                // each thread owns its keys, so a local model predicts every result
                let mut local = HashMap::new();
                for op in log {
                    match op {
                        Op::Put(k, v) => assert_eq!(map.put(k, v)?, local.insert(k, v)),
                        Op::Get(k) => assert_eq!(map.get(&k)?, local.get(&k).copied()),
                        Op::Remove(k) => assert_eq!(map.remove(&k)?, local.remove(&k)),
                    }
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap()?;
    }

    let reference = sequential_reference(&logs);
    assert_eq!(map.len()?, reference.len());
    assert_eq!(map.to_map()?, reference);
    Ok(())
}

#[test]
fn test_sharded_disjoint_keys_match_sequential_replay() -> Result<(), MapError> {
    let logs = logs();
    let map = Arc::new(ShardedConcurrentMap::<u32, u64>::with_shards(4));

    let handles: Vec<_> = logs
        .iter()
        .cloned()
        .map(|log| {
            let map = Arc::clone(&map);
            thread::spawn(move || -> Result<(), MapError> {
                let mut local = HashMap::new();
                for op in log {
                    match op {
                        Op::Put(k, v) => assert_eq!(map.put(k, v)?, local.insert(k, v)),
                        Op::Get(k) => assert_eq!(map.get(&k)?, local.get(&k).copied()),
                        Op::Remove(k) => assert_eq!(map.remove(&k)?, local.remove(&k)),
                    }
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap()?;
    }

    let reference = sequential_reference(&logs);
    assert_eq!(map.len()?, reference.len());
    assert_eq!(map.to_map()?, reference);
    Ok(())
}

#[test]
fn test_any_map_disjoint_keys_match_sequential_replay() -> Result<(), MapError> {
    let logs = logs();
    let map = Arc::new(AnyConcurrentMap::of::<u32, u64>());

    let handles: Vec<_> = logs
        .iter()
        .cloned()
        .map(|log| {
            let map = Arc::clone(&map);
            thread::spawn(move || -> Result<(), MapError> {
                for op in log {
                    match op {
                        Op::Put(k, v) => {
                            map.put(k, v)?;
                        }
                        Op::Get(k) => {
                            map.get::<u32, u64>(&k)?;
                        }
                        Op::Remove(k) => {
                            map.remove(&k)?;
                        }
                    }
                    // rejected pairs interleaved with real traffic never land
                    assert!(map.put(op_key(op) as u64, 0u64).is_err());
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap()?;
    }

    let reference = sequential_reference(&logs);
    assert_eq!(map.len()?, reference.len());
    for (k, v) in &reference {
        assert_eq!(map.get::<u32, u64>(k)?, Some(*v));
    }
    Ok(())
}

fn op_key(op: Op) -> u32 {
    match op {
        Op::Put(k, _) | Op::Get(k) | Op::Remove(k) => k,
    }
}

#[test]
fn test_readers_run_alongside_writer() -> Result<(), MapError> {
    let map = Arc::new(ConcurrentMap::<u32, u32>::new());
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let map = Arc::clone(&map);
            let done = Arc::clone(&done);
            thread::spawn(move || -> Result<(), MapError> {
                while !done.load(Ordering::Acquire) {
                    // every stored value equals its key doubled, in any snapshot
                    for (k, v) in map.to_map()? {
                        assert_eq!(v, k * 2);
                    }
                    let _ = map.to_string();
                }
                Ok(())
            })
        })
        .collect();

    for i in 0..2_000 {
        map.put(i, i * 2)?;
        if i % 3 == 0 {
            map.remove(&(i / 2))?;
        }
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap()?;
    }
    Ok(())
}

#[test]
fn test_sharded_snapshot_sees_a_prefix() -> Result<(), MapError> {
    let map = Arc::new(ShardedConcurrentMap::<u32, ()>::with_shards(16));
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let map = Arc::clone(&map);
        let done = Arc::clone(&done);
        thread::spawn(move || -> Result<(), MapError> {
            while !done.load(Ordering::Acquire) {
                // one writer inserts 0, 1, 2, ... so any instant holds 0..n exactly
                let mut keys = map.keys()?;
                keys.sort_unstable();
                for (expected, key) in keys.iter().enumerate() {
                    assert_eq!(*key, expected as u32);
                }
            }
            Ok(())
        })
    };

    for i in 0..5_000 {
        map.put(i, ())?;
    }
    done.store(true, Ordering::Release);
    reader.join().unwrap()?;

    assert_eq!(map.len()?, 5_000);
    Ok(())
}

#[test]
fn test_clear_while_writing() -> Result<(), MapError> {
    let map = Arc::new(ShardedConcurrentMap::<u32, u32>::new());

    let writers: Vec<_> = (0..4u32)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || -> Result<(), MapError> {
                for i in 0..500 {
                    map.put(t * 1_000 + i, i)?;
                }
                Ok(())
            })
        })
        .collect();

    for _ in 0..20 {
        map.clear()?;
    }
    for writer in writers {
        writer.join().unwrap()?;
    }

    assert!(map.len()? <= 2_000);
    map.clear()?;
    assert!(map.is_empty()?);
    Ok(())
}
