//! Fixed-size worker pool that runs a batch of tasks in submission order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};

use crate::config::EngineConfig;
use crate::error::{Result, SortError};

/// A static number of workers taking tasks from one FIFO queue.
///
/// A task that blocks, for example while waiting on a latch, keeps its worker blocked. The pool
/// never lends that worker to other queued tasks, so a batch whose blocking tasks can occupy every
/// worker before the tasks they wait on were dequeued will not make progress.
pub struct WorkerPool {
    thread_pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(SortError::invalid_config(
                "workers",
                "worker pool needs at least one worker",
            ));
        }

        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("merge_comp_worker_{i}"))
            .build()
            .map_err(|err| SortError::invalid_config("workers", err.to_string()))?;

        log::debug!("worker pool started with {workers} workers");

        Ok(WorkerPool {
            thread_pool,
            workers,
        })
    }

    /// Returns the global shared instance, sized from [`EngineConfig::from_env`].
    ///
    /// The pool is lazily initialized on first call and shared across the application.
    pub fn global() -> Arc<WorkerPool> {
        static POOL: Lazy<Arc<WorkerPool>> = Lazy::new(|| {
            let config = EngineConfig::from_env_or_default();
            Arc::new(WorkerPool::new(config.workers).expect("worker pool"))
        });

        POOL.clone()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `run` on every task and blocks until all of them finished.
    ///
    /// Tasks are dequeued in the order of `tasks`. The results come back in the same order, one
    /// per task. A panic inside `run` is caught and reported as that task's error.
    pub fn invoke_all<I, F>(&self, tasks: Vec<I>, run: F) -> Vec<Result<()>>
    where
        I: Send,
        F: Fn(I) -> Result<()> + Sync,
    {
        let slots: Vec<OnceCell<Result<()>>> = tasks.iter().map(|_| OnceCell::new()).collect();

        let run = &run;
        self.thread_pool.scope_fifo(|scope| {
            for (task, slot) in tasks.into_iter().zip(&slots) {
                scope.spawn_fifo(move |_| {
                    let res = panic::catch_unwind(AssertUnwindSafe(|| run(task)))
                        .unwrap_or_else(|payload| Err(SortError::panicked(payload)));
                    let _ = slot.set(res);
                });
            }
        });

        collect_results(slots)
    }
}

// `scope_fifo` joins every spawned task, so a slot can only be empty if a task never ran.
fn collect_results(slots: Vec<OnceCell<Result<()>>>) -> Vec<Result<()>> {
    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.into_inner().unwrap_or_else(|| {
                Err(SortError::DependencyFailed {
                    task: format!("batch task {i}"),
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn zero_workers() {
        assert!(WorkerPool::new(0).err().unwrap().is_invalid_configuration());
    }

    #[test]
    fn results_in_submission_order() {
        let pool = WorkerPool::new(3).unwrap();
        let done = AtomicUsize::new(0);

        let results = pool.invoke_all((0..20).collect(), |i: usize| {
            done.fetch_add(1, Ordering::Relaxed);
            if i % 7 == 3 {
                Err(SortError::invalid_arg("task", format!("{i}")))
            } else {
                Ok(())
            }
        });

        assert_eq!(done.load(Ordering::Relaxed), 20);
        let failed: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|err| err.to_string())
            .collect();
        assert_eq!(
            failed,
            ["invalid argument task: 3", "invalid argument task: 10", "invalid argument task: 17"]
        );
    }

    #[test]
    fn single_worker_runs_fifo() {
        let pool = WorkerPool::new(1).unwrap();
        let seen = Mutex::new(Vec::new());

        let results = pool.invoke_all((0..10).collect(), |i: u32| {
            seen.lock().unwrap().push(i);
            Ok(())
        });

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(seen.into_inner().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn borrows_local_data() {
        let pool = WorkerPool::new(2).unwrap();
        let mut v = vec![0u64; 8];

        let results = pool.invoke_all(v.chunks_mut(2).collect(), |chunk: &mut [u64]| {
            chunk.fill(chunk.len() as u64);
            Ok(())
        });

        assert_eq!(results.len(), 4);
        assert_eq!(v, [2; 8]);
    }

    #[test]
    fn panic_is_contained() {
        let pool = WorkerPool::new(2).unwrap();

        let results = pool.invoke_all(vec![1, 2, 3], |i: i32| {
            if i == 2 {
                panic!("Explicit panic.");
            }
            Ok(())
        });

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(SortError::Panicked { .. })));
        assert!(results[2].is_ok());
    }

    #[test]
    fn unfilled_slot_is_a_dependency_failure() {
        let slots: Vec<OnceCell<Result<()>>> = vec![OnceCell::new(), OnceCell::new()];
        let _ = slots[0].set(Ok(()));

        let results = collect_results(slots);

        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert!(matches!(err, SortError::DependencyFailed { .. }));
        assert!(!err.is_invalid_argument());
        assert_eq!(err.to_string(), "a dependency of batch task 1 did not complete");
    }
}
