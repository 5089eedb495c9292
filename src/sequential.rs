//! Single threaded merge sort, the reference every parallel engine is checked against.

use std::cmp::Ordering;

use crate::error::Result;
use crate::merge::merge_at;
use crate::order::TotalOrder;
use crate::{require_sequence, SortEngine};

#[derive(Copy, Clone, Debug, Default)]
pub struct SequentialSortEngine;

impl SortEngine for SequentialSortEngine {
    fn name(&self) -> String {
        "merge_sequential".into()
    }

    fn sort_with<'a, T, O>(&self, v: Option<&'a mut [T]>, order: &O) -> Result<&'a mut [T]>
    where
        T: Send,
        O: TotalOrder<T>,
    {
        let v = require_sequence(v)?;

        if v.len() > 1 {
            let mid = v.len() / 2;
            split_and_merge(v, mid, order)?;
        }

        Ok(v)
    }
}

/// Brings `v[..mid]` and `v[mid..]` into sorted order, then merges them.
///
/// Each level resolves both of its halves before merging, so the call tree is the merge tree.
fn split_and_merge<T, O>(v: &mut [T], mid: usize, order: &O) -> Result<()>
where
    O: TotalOrder<T>,
{
    let (left, right) = v.split_at_mut(mid);
    resolve(left, order)?;
    resolve(right, order)?;

    merge_at(v, mid, order)
}

fn resolve<T, O>(part: &mut [T], order: &O) -> Result<()>
where
    O: TotalOrder<T>,
{
    match part.len() {
        0 | 1 => Ok(()),
        2 => compare_swap(part, order),
        len => split_and_merge(part, len / 2, order),
    }
}

fn compare_swap<T, O>(pair: &mut [T], order: &O) -> Result<()>
where
    O: TotalOrder<T>,
{
    if order.compare(&pair[0], &pair[1])? == Ordering::Greater {
        pair.swap(0, 1);
    }

    Ok(())
}

pub fn sort<T: Ord + Send>(v: &mut [T]) -> Result<()> {
    SequentialSortEngine.sort(v).map(|_| ())
}

pub fn sort_by<T, F>(v: &mut [T], compare: F) -> Result<()>
where
    T: Send,
    F: Fn(&T, &T) -> Ordering + Sync,
{
    SequentialSortEngine.sort_by(v, compare).map(|_| ())
}
