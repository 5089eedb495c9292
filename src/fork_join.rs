//! Recursive divide and conquer on a work-stealing pool.
//!
//! Every partition at or above the granularity forks its two halves with `rayon::join` and merges
//! them once both returned. A worker waiting in `join` keeps executing other queued halves, so
//! recursion depth never translates into parked threads.

use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use once_cell::sync::Lazy;
use rayon::ThreadPool;

use crate::config::{EngineConfig, DEFAULT_GRANULARITY};
use crate::error::{Result, SortError};
use crate::leaf::sort_leaf;
use crate::merge::merge_at;
use crate::order::TotalOrder;
use crate::{require_sequence, SortEngine};

pub struct ForkJoinSortEngine {
    pool: Arc<ThreadPool>,
    granularity: usize,
}

#[derive(Default)]
pub struct ForkJoinSortEngineBuilder {
    pool: Option<Arc<ThreadPool>>,
    granularity: Option<usize>,
}

impl ForkJoinSortEngineBuilder {
    pub fn pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Any positive value is accepted.
    pub fn granularity(mut self, granularity: usize) -> Self {
        self.granularity = Some(granularity);
        self
    }

    pub fn build(self) -> Result<ForkJoinSortEngine> {
        let pool = self
            .pool
            .ok_or_else(|| SortError::invalid_config("pool", "work-stealing pool is required"))?;

        let granularity = self.granularity.unwrap_or(DEFAULT_GRANULARITY);
        if granularity == 0 {
            return Err(SortError::invalid_config(
                "granularity",
                "granularity must be positive",
            ));
        }

        log::debug!(
            "fork/join engine: {} threads, granularity {granularity}",
            pool.current_num_threads()
        );

        Ok(ForkJoinSortEngine { pool, granularity })
    }
}

impl ForkJoinSortEngine {
    pub fn builder() -> ForkJoinSortEngineBuilder {
        ForkJoinSortEngineBuilder::default()
    }

    /// Engine with the default granularity on `pool`.
    pub fn new(pool: Arc<ThreadPool>) -> Result<Self> {
        Self::builder().pool(pool).build()
    }

    pub fn granularity(&self) -> usize {
        self.granularity
    }

    /// Process wide work-stealing pool sized from [`EngineConfig::from_env`].
    pub fn shared_pool() -> Arc<ThreadPool> {
        static POOL: Lazy<Arc<ThreadPool>> = Lazy::new(|| {
            let config = EngineConfig::from_env_or_default();
            Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.workers)
                    .thread_name(|i| format!("merge_comp_fork_join_{i}"))
                    .build()
                    .expect("thread pool"),
            )
        });

        POOL.clone()
    }
}

impl SortEngine for ForkJoinSortEngine {
    fn name(&self) -> String {
        "merge_fork_join".into()
    }

    fn sort_with<'a, T, O>(&self, v: Option<&'a mut [T]>, order: &O) -> Result<&'a mut [T]>
    where
        T: Send,
        O: TotalOrder<T>,
    {
        let v = require_sequence(v)?;
        let granularity = self.granularity;

        let outcome = {
            let v = &mut *v;
            panic::catch_unwind(AssertUnwindSafe(|| {
                self.pool
                    .install(|| fork_join_sort(v, granularity, order))
            }))
        };

        match outcome {
            Ok(res) => res?,
            Err(payload) => return Err(SortError::panicked(payload)),
        }

        Ok(v)
    }
}

fn fork_join_sort<T, O>(v: &mut [T], granularity: usize, order: &O) -> Result<()>
where
    T: Send,
    O: TotalOrder<T>,
{
    let len = v.len();

    // Partitions of one element cannot be split any further, whatever the granularity.
    if len < granularity || len < 2 {
        return sort_leaf(v, order);
    }

    let mid = len / 2;
    let (left, right) = v.split_at_mut(mid);
    let (left_res, right_res) = rayon::join(
        || fork_join_sort(left, granularity, order),
        || fork_join_sort(right, granularity, order),
    );
    left_res?;
    right_res?;

    merge_at(v, mid, order)
}

static DEFAULT_ENGINE: Lazy<ForkJoinSortEngine> = Lazy::new(|| ForkJoinSortEngine {
    pool: ForkJoinSortEngine::shared_pool(),
    granularity: EngineConfig::from_env_or_default().granularity,
});

pub fn sort<T: Ord + Send>(v: &mut [T]) -> Result<()> {
    DEFAULT_ENGINE.sort(v).map(|_| ())
}

pub fn sort_by<T, F>(v: &mut [T], compare: F) -> Result<()>
where
    T: Send,
    F: Fn(&T, &T) -> Ordering + Sync,
{
    DEFAULT_ENGINE.sort_by(v, compare).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Natural, Present};

    fn pool(threads: usize) -> Arc<ThreadPool> {
        Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn missing_pool() {
        let err = ForkJoinSortEngine::builder()
            .granularity(16)
            .build()
            .err()
            .unwrap();
        assert!(err.is_invalid_configuration());
    }

    #[test]
    fn granularity_floor() {
        assert!(ForkJoinSortEngine::builder()
            .pool(pool(2))
            .granularity(0)
            .build()
            .is_err());

        let engine = ForkJoinSortEngine::builder()
            .pool(pool(2))
            .granularity(1)
            .build()
            .unwrap();
        assert_eq!(engine.granularity(), 1);

        let mut v = [9, 8, 7, 6, 5, 4, 3, 2, 1, 0];
        engine.sort(&mut v).unwrap();
        assert_eq!(v, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn single_thread_pool_deep_recursion() {
        let engine = ForkJoinSortEngine::builder()
            .pool(pool(1))
            .granularity(2)
            .build()
            .unwrap();

        let mut v: Vec<u32> = (0..5_000).rev().collect();
        engine.sort(&mut v).unwrap();
        assert!(v.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn absent_element() {
        let engine = ForkJoinSortEngine::builder()
            .pool(pool(4))
            .granularity(4)
            .build()
            .unwrap();

        let mut v: Vec<Option<i32>> = (0..100).map(Some).collect();
        v[42] = None;

        let err = engine.sort_with(Some(v.as_mut_slice()), &Present(Natural)).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(v.iter().filter(|x| x.is_none()).count(), 1);
        assert_eq!(v.len(), 100);
    }

    #[test]
    fn panic_becomes_error() {
        let engine = ForkJoinSortEngine::new(pool(2)).unwrap();
        let mut v: Vec<i32> = (0..1_000).rev().collect();

        let err = engine
            .sort_by(&mut v, |a, b| {
                if *a == 500 {
                    panic!("Explicit panic.");
                }
                a.cmp(b)
            })
            .unwrap_err();

        assert!(matches!(err, SortError::Panicked { .. }));
        let mut sorted = v.clone();
        sorted.sort();
        assert_eq!(sorted, (0..1_000).collect::<Vec<_>>());
    }
}
