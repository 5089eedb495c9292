//! Merge sort as a prebuilt task graph on a fixed worker pool.
//!
//! The graph is built up front without any concurrency: every partition below the granularity
//! becomes a leaf sort, every other partition is split in half, both halves are wrapped in fork
//! wrappers sharing a fresh dependency gate, and the partition itself is resolved by a join that
//! waits on that gate before merging. All fork wrappers of all levels plus the root end up in one
//! flat list, which is handed to the pool in a single batch.
//!
//! # Operating constraint
//!
//! A join blocks its worker while it waits. The list is submitted in post-order, every task after
//! the tasks it depends on, and the pool dequeues in submission order, so the oldest unfinished
//! task can always run. Pools that reorder work lose that property, and then the pool needs more
//! workers than the join depth `log2(len / granularity)` or it can deadlock with every worker
//! parked on a gate. Sorts whose depth reaches the worker count are logged as a warning.

mod gate;
mod task;

use std::cmp::Ordering;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::config::{join_depth, EngineConfig, DEFAULT_GRANULARITY, MIN_GRANULARITY};
use crate::error::{Result, SortError};
use crate::order::TotalOrder;
use crate::partition::Partition;
use crate::pool::WorkerPool;
use crate::{require_sequence, SortEngine};

use gate::{DependencyGate, Side};
use task::{ForkWrapper, JoinWrapper, Range, Scheduled, Task};

pub struct TaskGraphSortEngine {
    pool: Arc<WorkerPool>,
    granularity: usize,
}

#[derive(Default)]
pub struct TaskGraphSortEngineBuilder {
    pool: Option<Arc<WorkerPool>>,
    granularity: Option<usize>,
}

impl TaskGraphSortEngineBuilder {
    pub fn pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Must be at least [`MIN_GRANULARITY`].
    pub fn granularity(mut self, granularity: usize) -> Self {
        self.granularity = Some(granularity);
        self
    }

    pub fn build(self) -> Result<TaskGraphSortEngine> {
        let pool = self
            .pool
            .ok_or_else(|| SortError::invalid_config("pool", "worker pool is required"))?;

        let granularity = self.granularity.unwrap_or(DEFAULT_GRANULARITY);
        if granularity < MIN_GRANULARITY {
            return Err(SortError::invalid_config(
                "granularity",
                format!("minimum granularity value is {MIN_GRANULARITY}, got {granularity}"),
            ));
        }

        log::debug!(
            "task graph engine: {} workers, granularity {granularity}",
            pool.workers()
        );

        Ok(TaskGraphSortEngine { pool, granularity })
    }
}

impl TaskGraphSortEngine {
    pub fn builder() -> TaskGraphSortEngineBuilder {
        TaskGraphSortEngineBuilder::default()
    }

    /// Engine with the default granularity on `pool`.
    pub fn new(pool: Arc<WorkerPool>) -> Result<Self> {
        Self::builder().pool(pool).build()
    }

    pub fn granularity(&self) -> usize {
        self.granularity
    }
}

impl SortEngine for TaskGraphSortEngine {
    fn name(&self) -> String {
        "merge_task_graph".into()
    }

    fn sort_with<'a, T, O>(&self, v: Option<&'a mut [T]>, order: &O) -> Result<&'a mut [T]>
    where
        T: Send,
        O: TotalOrder<T>,
    {
        let v = require_sequence(v)?;
        let len = v.len();
        if len < 2 {
            return Ok(v);
        }

        let depth = join_depth(len, self.granularity);
        if depth >= self.pool.workers() {
            log::warn!(
                "join depth {depth} for {len} elements reaches the {} pool workers",
                self.pool.workers()
            );
        }

        let results = {
            let mut tasks = Vec::new();
            let root = build_graph(Partition::whole(&mut *v), self.granularity, &mut tasks);
            tasks.push(Scheduled::Root(root));

            log::debug!(
                "task graph for {len} elements: {} tasks, join depth {depth}",
                tasks.len()
            );

            self.pool.invoke_all(tasks, |task| task.run(order))
        };

        // Every task has been awaited, report the first failure in submission order.
        if let Some(err) = results.into_iter().find_map(Result::err) {
            return Err(err);
        }

        Ok(v)
    }
}

/// Builds the tasks resolving `part` and returns the one that completes last.
///
/// Fork wrappers are appended to `tasks` in post-order: a fork's subtree comes before the fork.
fn build_graph<'a, T>(
    part: Partition<'a, T>,
    granularity: usize,
    tasks: &mut Vec<Scheduled<'a, T>>,
) -> Task<'a, T> {
    let len = part.len();
    if len < granularity {
        return Task::SortLeaf(part);
    }

    let range = Range {
        start: part.start(),
        end: part.end(),
    };
    let gate = Arc::new(DependencyGate::new());
    let (left, right) = part.split_at(len / 2);

    let left = build_graph(left, granularity, tasks);
    tasks.push(Scheduled::Fork(ForkWrapper::new(
        Side::Left,
        gate.clone(),
        left,
    )));

    let right = build_graph(right, granularity, tasks);
    tasks.push(Scheduled::Fork(ForkWrapper::new(
        Side::Right,
        gate.clone(),
        right,
    )));

    Task::Join(JoinWrapper::new(range, gate))
}

static DEFAULT_ENGINE: Lazy<TaskGraphSortEngine> = Lazy::new(|| {
    let config = EngineConfig::from_env_or_default();

    TaskGraphSortEngine::builder()
        .pool(WorkerPool::global())
        .granularity(config.granularity)
        .build()
        .unwrap_or_else(|err| {
            log::warn!("{err}, falling back to granularity {DEFAULT_GRANULARITY}");
            TaskGraphSortEngine {
                pool: WorkerPool::global(),
                granularity: DEFAULT_GRANULARITY,
            }
        })
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
