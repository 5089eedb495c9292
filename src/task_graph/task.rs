use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{Result, SortError};
use crate::leaf::sort_leaf;
use crate::merge::merge_at;
use crate::order::TotalOrder;
use crate::partition::Partition;

use super::gate::{DependencyGate, Side};

/// Full resolution of one partition: after it ran, the partition is sorted.
pub(crate) enum Task<'a, T> {
    SortLeaf(Partition<'a, T>),
    Join(JoinWrapper<'a, T>),
}

impl<'a, T> Task<'a, T> {
    /// Runs the task and hands its partition back, now sorted.
    pub(crate) fn run<O: TotalOrder<T>>(self, order: &O) -> Result<Partition<'a, T>> {
        match self {
            Task::SortLeaf(mut part) => {
                log::trace!("sort leaf {part}");
                sort_leaf(part.as_mut_slice(), order)?;
                Ok(part)
            }
            Task::Join(join) => join.run(order),
        }
    }
}

impl<T> fmt::Display for Task<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::SortLeaf(part) => write!(f, "sort leaf {part}"),
            Task::Join(join) => write!(f, "join {}", join.range),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct Range {
    pub start: usize,
    pub end: usize,
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Merges a branch once the gate shared with its two fork wrappers opened.
pub(crate) struct JoinWrapper<'a, T> {
    range: Range,
    gate: Arc<DependencyGate<'a, T>>,
}

impl<'a, T> JoinWrapper<'a, T> {
    pub(crate) fn new(range: Range, gate: Arc<DependencyGate<'a, T>>) -> Self {
        JoinWrapper { range, gate }
    }

    fn run<O: TotalOrder<T>>(self, order: &O) -> Result<Partition<'a, T>> {
        // Blocks this worker until both halves are sorted.
        let (left, right) = self.gate.wait().ok_or_else(|| SortError::DependencyFailed {
            task: format!("merge branch {}", self.range),
        })?;

        MergeBranch { left, right }.run(order)
    }
}

/// Merges two sibling partitions that are both sorted.
struct MergeBranch<'a, T> {
    left: Partition<'a, T>,
    right: Partition<'a, T>,
}

impl<'a, T> MergeBranch<'a, T> {
    fn run<O: TotalOrder<T>>(self, order: &O) -> Result<Partition<'a, T>> {
        let mid = self.left.len();
        let mut whole = Partition::join(self.left, self.right);

        log::trace!("merge branch {whole} at {}", whole.start() + mid);
        merge_at(whole.as_mut_slice(), mid, order)?;

        Ok(whole)
    }
}

/// Runs the resolution of one half and counts down the parent's gate, whatever the outcome.
pub(crate) struct ForkWrapper<'a, T> {
    side: Side,
    gate: Arc<DependencyGate<'a, T>>,
    task: Task<'a, T>,
}

impl<'a, T> ForkWrapper<'a, T> {
    pub(crate) fn new(side: Side, gate: Arc<DependencyGate<'a, T>>, task: Task<'a, T>) -> Self {
        ForkWrapper { side, gate, task }
    }

    fn run<O: TotalOrder<T>>(self, order: &O) -> Result<()> {
        let ForkWrapper { side, gate, task } = self;
        let name = task.to_string();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.run(order)))
            .unwrap_or_else(|payload| Err(SortError::panicked(payload)));

        match outcome {
            Ok(part) => {
                gate.arrive(side, Some(part));
                Ok(())
            }
            Err(err) => {
                gate.arrive(side, None);
                Err(SortError::task(format!("forked task {name}"), err))
            }
        }
    }
}

/// An entry of the flat list handed to the worker pool.
pub(crate) enum Scheduled<'a, T> {
    Fork(ForkWrapper<'a, T>),
    /// The task resolving the whole sequence, no gate waits for it.
    Root(Task<'a, T>),
}

impl<'a, T> Scheduled<'a, T> {
    pub(crate) fn run<O: TotalOrder<T>>(self, order: &O) -> Result<()> {
        match self {
            Scheduled::Fork(fork) => fork.run(order),
            Scheduled::Root(task) => {
                let name = task.to_string();
                task.run(order)
                    .map(|_| ())
                    .map_err(|err| SortError::task(format!("root task {name}"), err))
            }
        }
    }
}
