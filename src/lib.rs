//! In-place merge sort with three execution strategies: a sequential baseline, recursive
//! work-stealing fork/join, and a prebuilt task graph on a fixed worker pool gated by latches.

use std::cmp::Ordering;

pub mod config;
pub mod error;
pub mod fork_join;
pub mod merge;
pub mod order;
pub mod partition;
pub mod pool;
pub mod sequential;
pub mod task_graph;

mod leaf;

pub use config::{EngineConfig, DEFAULT_GRANULARITY, MIN_GRANULARITY};
pub use error::{Result, SortError};
pub use fork_join::ForkJoinSortEngine;
pub use order::{By, Natural, Present, TotalOrder, TryBy};
pub use pool::WorkerPool;
pub use sequential::SequentialSortEngine;
pub use task_graph::TaskGraphSortEngine;

/// Common interface of all merge sort engines.
pub trait SortEngine {
    fn name(&self) -> String;

    /// Sorts `v` in place under `order` and hands the same slice back.
    ///
    /// `None` stands for an absent sequence and fails with `InvalidArgument` without side effects.
    /// Any other failure leaves `v` as a permutation of its input in unspecified order.
    fn sort_with<'a, T, O>(&self, v: Option<&'a mut [T]>, order: &O) -> Result<&'a mut [T]>
    where
        T: Send,
        O: TotalOrder<T>;

    #[inline]
    fn sort<'a, T>(&self, v: &'a mut [T]) -> Result<&'a mut [T]>
    where
        T: Ord + Send,
    {
        self.sort_with(Some(v), &Natural)
    }

    #[inline]
    fn sort_by<'a, T, F>(&self, v: &'a mut [T], compare: F) -> Result<&'a mut [T]>
    where
        T: Send,
        F: Fn(&T, &T) -> Ordering + Sync,
    {
        self.sort_with(Some(v), &By(compare))
    }
}

pub(crate) fn require_sequence<T>(v: Option<&mut [T]>) -> Result<&mut [T]> {
    v.ok_or_else(|| SortError::invalid_arg("sequence", "sequence cannot be absent"))
}
