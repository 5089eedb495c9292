use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::partition::Partition;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// Countdown latch between the two halves of a branch and the merge of that branch.
///
/// Starts at 2. Each producer arrives exactly once, handing back its partition on success or
/// nothing on failure. The merge waits until both arrived and then owns both halves.
pub(crate) struct DependencyGate<'a, T> {
    state: Mutex<GateState<'a, T>>,
    opened: Condvar,
}

struct GateState<'a, T> {
    remaining: u8,
    left: Option<Partition<'a, T>>,
    right: Option<Partition<'a, T>>,
}

impl<'a, T> DependencyGate<'a, T> {
    pub(crate) fn new() -> Self {
        DependencyGate {
            state: Mutex::new(GateState {
                remaining: 2,
                left: None,
                right: None,
            }),
            opened: Condvar::new(),
        }
    }

    pub(crate) fn arrive(&self, side: Side, part: Option<Partition<'a, T>>) {
        let mut state = self.lock();
        debug_assert!(state.remaining > 0, "gate counted down more than twice");

        match side {
            Side::Left => state.left = part,
            Side::Right => state.right = part,
        }
        state.remaining -= 1;

        if state.remaining == 0 {
            self.opened.notify_all();
        }
    }

    /// Blocks until both sides arrived. `None` if either side failed.
    pub(crate) fn wait(&self) -> Option<(Partition<'a, T>, Partition<'a, T>)> {
        let mut state = self.lock();
        while state.remaining > 0 {
            state = self
                .opened
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        match (state.left.take(), state.right.take()) {
            (Some(left), Some(right)) => Some((left, right)),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState<'a, T>> {
        // Nothing panics while holding the lock, the state is consistent even if poisoned.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
