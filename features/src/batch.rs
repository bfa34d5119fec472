//! Bounded worker pool for bulk extraction.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{Extractor, FeatureCache, FeatureError, FeatureSequence};

/// Resolves a worker count: `0` means one worker per CPU.
pub fn resolve_workers(workers: usize) -> usize {
    if workers == 0 {
        num_cpus::get().max(1)
    } else {
        workers
    }
}

/// Runs `f` over `items` on up to `workers` scoped threads and returns the
/// results in input order. `on_done` is called once per finished item from
/// the worker thread.
///
/// A panic inside `f` is caught and reported as
/// [`FeatureError::WorkerPanic`] for that item; the other items still run.
pub fn run_pool<T, R, F, P>(
    items: &[T],
    workers: usize,
    f: F,
    on_done: P,
) -> Vec<Result<R, FeatureError>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
    P: Fn() + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }
    let workers = resolve_workers(workers).min(items.len());
    let next = AtomicUsize::new(0);
    let results: Mutex<Vec<Option<Result<R, FeatureError>>>> =
        Mutex::new((0..items.len()).map(|_| None).collect());

    std::thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| {
                loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(item) = items.get(i) else { break };
                    let r = panic::catch_unwind(AssertUnwindSafe(|| f(item)))
                        .map_err(|payload| {
                            let msg = panic_message(payload.as_ref());
                            warn!(item = i, error = %msg, "worker panicked");
                            FeatureError::WorkerPanic(msg)
                        });
                    results.lock()[i] = Some(r);
                    on_done();
                }
            });
        }
    });

    // Every index below items.len() was claimed by exactly one worker.
    results.into_inner().into_iter().flatten().collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Extracts every path through the cache in parallel.
///
/// Results are in input order; failures are logged and kept as `Err`.
pub fn extract_all(
    extractor: &Extractor,
    cache: &FeatureCache,
    paths: &[PathBuf],
    workers: usize,
) -> Vec<Result<Arc<FeatureSequence>, FeatureError>> {
    let results: Vec<_> = run_pool(
        paths,
        workers,
        |path: &PathBuf| cache.get_or_extract(extractor, path),
        || {},
    )
    .into_iter()
    .zip(paths)
    .map(|(r, path)| {
        let r = r.and_then(|inner| inner);
        if let Err(e) = &r {
            warn!(path = %path.display(), error = %e, "feature extraction failed");
        }
        r
    })
    .collect();
    debug!(files = paths.len(), "batch extraction finished");
    results
}

/// Like [`extract_all`] but drops failures, keeping successful sequences in
/// input order.
pub fn extract_ok(
    extractor: &Extractor,
    cache: &FeatureCache,
    paths: &[PathBuf],
    workers: usize,
) -> Vec<Arc<FeatureSequence>> {
    extract_all(extractor, cache, paths, workers)
        .into_iter()
        .filter_map(Result::ok)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_workers() {
        assert_eq!(resolve_workers(3), 3);
        assert!(resolve_workers(0) >= 1);
    }

    #[test]
    fn test_run_pool_preserves_order() {
        let items: Vec<u64> = (0..100).collect();
        let out: Vec<u64> = run_pool(&items, 4, |x| x * x, || {})
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(out, items.iter().map(|x| x * x).collect::<Vec<_>>());
    }

    #[test]
    fn test_run_pool_progress_callback() {
        let items = vec![1, 2, 3, 4, 5];
        let done = AtomicUsize::new(0);
        let _ = run_pool(&items, 2, |x| *x, || {
            done.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(done.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_run_pool_empty() {
        let out = run_pool(&[] as &[i32], 4, |x| *x, || {});
        assert!(out.is_empty());
    }

    #[test]
    fn test_run_pool_survives_a_panicking_item() {
        let items: Vec<u32> = (0..10).collect();
        let done = AtomicUsize::new(0);
        let out = run_pool(
            &items,
            3,
            |&x| {
                if x == 4 {
                    panic!("bad item {x}");
                }
                x + 1
            },
            || {
                done.fetch_add(1, Ordering::Relaxed);
            },
        );
        assert_eq!(out.len(), 10);
        assert_eq!(done.load(Ordering::Relaxed), 10);
        for (i, r) in out.iter().enumerate() {
            match r {
                Ok(v) => assert_eq!(*v, i as u32 + 1),
                Err(FeatureError::WorkerPanic(msg)) => {
                    assert_eq!(i, 4);
                    assert_eq!(msg, "bad item 4");
                }
                Err(e) => panic!("unexpected error {e}"),
            }
        }
        assert!(out[4].is_err());
    }

    #[test]
    fn test_extract_all_keeps_failures_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.wav");
        let samples: Vec<f32> = (0..8000).map(|i| (i as f32 * 0.05).sin() * 0.4).collect();
        voxgate_audio::write_wav(&good, &voxgate_audio::Waveform::new(samples, 16000)).unwrap();
        let missing = dir.path().join("missing.wav");

        let ex = Extractor::new(crate::FeatureConfig::default()).unwrap();
        let cache = FeatureCache::new();
        let paths = vec![missing.clone(), good.clone(), missing];
        let out = extract_all(&ex, &cache, &paths, 2);
        assert_eq!(out.len(), 3);
        assert!(out[0].is_err());
        assert!(out[1].is_ok());
        assert!(out[2].is_err());
        assert_eq!(extract_ok(&ex, &cache, &paths, 2).len(), 1);
    }
}
