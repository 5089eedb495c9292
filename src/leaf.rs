use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};

use crate::error::Result;
use crate::order::TotalOrder;

/// Baseline sort for partitions below the granularity threshold.
///
/// Delegates to the standard library's stable sort. The first failed comparison is remembered
/// and every comparison after it reports `Equal`, so the sort winds down without touching more
/// of the order, then the error is returned. The partition is left as a permutation of its input.
pub(crate) fn sort_leaf<T, O>(part: &mut [T], order: &O) -> Result<()>
where
    O: TotalOrder<T>,
{
    let mut failure = None;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        part.sort_by(|a, b| {
            if failure.is_some() {
                return Ordering::Equal;
            }

            match order.compare(a, b) {
                Ok(ord) => ord,
                Err(err) => {
                    failure = Some(err);
                    Ordering::Equal
                }
            }
        })
    }));

    // The sort may reject the inconsistent order left behind by the latch, the recorded failure
    // is the error to report then.
    match (failure, outcome) {
        (Some(err), _) => Err(err),
        (None, Ok(())) => Ok(()),
        (None, Err(payload)) => panic::resume_unwind(payload),
    }
}
