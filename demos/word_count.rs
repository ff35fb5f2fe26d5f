use sovran_concurrent_map::{ConcurrentMap, MapError, ShardedConcurrentMap};
use std::sync::Arc;
use std::thread;
use tracing::info;

const LINES: [&str; 3] = [
    "the quick brown fox jumps over the lazy dog",
    "the dog sleeps while the fox runs",
    "a quick fox and a lazy dog share the yard",
];

fn main() -> Result<(), MapError> {
    // RUST_LOG=debug shows the map's own diagnostics
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_thread_ids(true)
        .init();

    // Keyed by (worker, word): every worker owns its keys, so get-then-put
    // inside one worker cannot race with another.
    let per_worker = Arc::new(ShardedConcurrentMap::<(usize, &'static str), usize>::with_shards(4));

    let handles: Vec<_> = LINES
        .into_iter()
        .enumerate()
        .map(|(worker, line)| {
            let per_worker = Arc::clone(&per_worker);
            thread::spawn(move || -> Result<(), MapError> {
                for word in line.split_whitespace() {
                    let count = per_worker.get(&(worker, word))?.unwrap_or(0);
                    per_worker.put((worker, word), count + 1)?;
                }
                info!(worker, words = line.split_whitespace().count(), "line counted");
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        match handle.join() {
            Ok(result) => result?,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    let totals = ConcurrentMap::<&'static str, usize>::new();
    for ((_, word), count) in per_worker.to_map()? {
        let sum = totals.get(word)?.unwrap_or(0);
        totals.put(word, sum + count)?;
    }

    let mut words: Vec<_> = totals.to_map()?.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    println!("distinct words: {}", totals.len()?);
    for (word, count) in words.iter().take(5) {
        println!("{:>6} {}", count, word);
    }
    println!("{}", totals);

    Ok(())
}
