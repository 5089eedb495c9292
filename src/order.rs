use std::cmp::Ordering;

use crate::error::{Result, SortError};

/// A total order over `T` whose comparisons may fail.
///
/// The order is shared by reference between worker threads, hence `Sync`. Failing comparisons
/// abort the sort with the returned error, the order of the elements is unspecified afterwards.
pub trait TotalOrder<T>: Sync {
    fn compare(&self, a: &T, b: &T) -> Result<Ordering>;
}

/// The intrinsic order of `T`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Natural;

impl<T: Ord> TotalOrder<T> for Natural {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Result<Ordering> {
        Ok(a.cmp(b))
    }
}

/// Infallible comparator closure, the shape `slice::sort_by` takes.
#[derive(Copy, Clone, Debug)]
pub struct By<F>(pub F);

impl<T, F> TotalOrder<T> for By<F>
where
    F: Fn(&T, &T) -> Ordering + Sync,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Result<Ordering> {
        Ok((self.0)(a, b))
    }
}

/// Fallible comparator closure.
#[derive(Copy, Clone, Debug)]
pub struct TryBy<F>(pub F);

impl<T, F> TotalOrder<T> for TryBy<F>
where
    F: Fn(&T, &T) -> Result<Ordering> + Sync,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Result<Ordering> {
        (self.0)(a, b)
    }
}

/// Orders `Option<T>` by the wrapped order and rejects absent elements.
///
/// `None` has no place in the order, comparing it is an `InvalidArgument` error.
#[derive(Copy, Clone, Debug, Default)]
pub struct Present<O>(pub O);

impl<T, O> TotalOrder<Option<T>> for Present<O>
where
    O: TotalOrder<T>,
{
    #[inline]
    fn compare(&self, a: &Option<T>, b: &Option<T>) -> Result<Ordering> {
        match (a, b) {
            (Some(a), Some(b)) => self.0.compare(a, b),
            _ => Err(SortError::invalid_arg(
                "element",
                "cannot compare an absent element",
            )),
        }
    }
}
