//! Bounded worker pool for per-object fan-out.
//!
//! Work items go through a `sync_channel` sized to the worker count, so the
//! producer never runs more than one queue-length ahead of the workers.
//! Results are collected over an unbounded channel and put back in input
//! order before returning.

use std::sync::{mpsc, Arc, Mutex};

use tracing::warn;

/// Resolve a configured worker count. `0` means hardware parallelism.
pub fn effective_workers(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}

/// Apply `f` to every item on at most `workers` threads.
///
/// The output has one result per input, in input order. With one worker
/// (or one item) everything runs on the calling thread.
pub fn run<T, R, F>(items: Vec<T>, workers: usize, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let total = items.len();
    let workers = workers.max(1).min(total.max(1));
    if workers == 1 {
        return items.into_iter().map(f).collect();
    }

    let f = &f;
    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();

    std::thread::scope(|scope| {
        let (work_tx, work_rx) = mpsc::sync_channel::<(usize, T)>(workers);
        let work_rx = Arc::new(Mutex::new(work_rx));
        let (result_tx, result_rx) = mpsc::channel::<(usize, R)>();

        for _ in 0..workers {
            let work_rx = Arc::clone(&work_rx);
            let result_tx = result_tx.clone();
            scope.spawn(move || loop {
                let work = match work_rx.lock() {
                    Ok(rx) => rx.recv(),
                    // Another worker panicked while holding the queue.
                    Err(_) => break,
                };
                let Ok((seq, item)) = work else { break };
                if result_tx.send((seq, f(item))).is_err() {
                    break;
                }
            });
        }
        drop(result_tx);

        for (seq, item) in items.into_iter().enumerate() {
            if work_tx.send((seq, item)).is_err() {
                warn!("worker pool shut down early");
                break;
            }
        }
        drop(work_tx);

        for (seq, result) in result_rx {
            slots[seq] = Some(result);
        }
    });

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn zero_means_hardware_parallelism() {
        assert!(effective_workers(0) >= 1);
        assert_eq!(effective_workers(3), 3);
    }

    #[test]
    fn preserves_input_order() {
        let items: Vec<u32> = (0..500).collect();
        let out = run(items.clone(), 8, |n| n * 2);
        let expected: Vec<u32> = items.iter().map(|n| n * 2).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn single_worker_runs_inline() {
        let caller = std::thread::current().id();
        let out = run(vec![1, 2, 3], 1, |_| std::thread::current().id());
        assert!(out.iter().all(|id| *id == caller));
    }

    #[test]
    fn every_item_is_processed_once() {
        let calls = AtomicUsize::new(0);
        let out = run((0..97).collect::<Vec<_>>(), 4, |n: usize| {
            calls.fetch_add(1, Ordering::Relaxed);
            n
        });
        assert_eq!(out.len(), 97);
        assert_eq!(calls.load(Ordering::Relaxed), 97);
    }

    #[test]
    fn empty_input() {
        let out: Vec<u8> = run(Vec::<u8>::new(), 4, |n| n);
        assert!(out.is_empty());
    }
}
