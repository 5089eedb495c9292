use std::cmp::Ordering;
use std::mem;
use std::ptr;

use crate::error::{Result, SortError};
use crate::order::TotalOrder;

/// Merges the sorted partitions `[left_start, left_start + left_len)` and
/// `[right_start, right_start + right_len)` of `v` in place.
///
/// The partitions must be adjacent, `left_start + left_len == right_start`, and each must already
/// be sorted under `order`. Afterwards the combined range is sorted. Only the shorter partition
/// is copied out, into a buffer of `min(left_len, right_len)` elements.
///
/// Equal elements are not guaranteed to keep their relative order.
pub fn merge<T, O>(
    v: &mut [T],
    left_start: usize,
    left_len: usize,
    right_start: usize,
    right_len: usize,
    order: &O,
) -> Result<()>
where
    O: TotalOrder<T>,
{
    let left_end = left_start.checked_add(left_len).ok_or_else(|| {
        SortError::invalid_arg(
            "right_start",
            format!("left partition {left_start} + {left_len} overflows usize"),
        )
    })?;
    if left_end != right_start {
        return Err(SortError::invalid_arg(
            "right_start",
            format!(
                "partitions must be adjacent, left ends at {left_end} but right starts at {right_start}"
            ),
        ));
    }

    let end = right_start.checked_add(right_len).ok_or_else(|| {
        SortError::invalid_arg(
            "right_len",
            format!("right partition {right_start} + {right_len} overflows usize"),
        )
    })?;
    if end > v.len() {
        return Err(SortError::invalid_arg(
            "right_len",
            format!("range end {end} out of bounds for length {}", v.len()),
        ));
    }

    merge_at(&mut v[left_start..end], left_len, order)
}

/// Merges the sorted runs `v[..mid]` and `v[mid..]` in place.
///
/// On error or panic in `order`, `v` still holds every element it held before exactly once.
pub(crate) fn merge_at<T, O>(v: &mut [T], mid: usize, order: &O) -> Result<()>
where
    O: TotalOrder<T>,
{
    let len = v.len();
    debug_assert!(mid <= len);

    // Sorting has no meaningful behavior on zero-sized types.
    if mem::size_of::<T>() == 0 || mid == 0 || mid == len {
        return Ok(());
    }

    let left_len = mid;
    let right_len = len - mid;

    // Keep the length 0 so the buffer only ever holds shallow copies, dropping it never runs a
    // destructor.
    let mut scratch = Vec::<T>::with_capacity(left_len.min(right_len));
    let buf = scratch.as_mut_ptr();

    let arr_ptr = v.as_mut_ptr();
    let (v_mid, v_end) = unsafe { (arr_ptr.add(mid), arr_ptr.add(len)) };

    // Intermediate state is tracked by `hole`. If `order` fails or panics, dropping `hole` copies
    // the unconsumed part of `buf` into the gap left in `v`.
    let mut hole;

    if left_len < right_len {
        // The left run is shorter, merge forwards.
        unsafe {
            ptr::copy_nonoverlapping(arr_ptr, buf, left_len);
            hole = MergeHole {
                start: buf,
                end: buf.add(left_len),
                dest: arr_ptr,
            };
        }

        let left = &mut hole.start;
        let mut right = v_mid;
        let out = &mut hole.dest;

        while *left < hole.end && right < v_end {
            // The buffered element goes first only if it is strictly less.
            let take_left = unsafe { order.compare(&**left, &*right)? } == Ordering::Less;
            unsafe {
                let to_copy = if take_left {
                    get_and_increment(left)
                } else {
                    get_and_increment(&mut right)
                };
                ptr::copy_nonoverlapping(to_copy, get_and_increment(out), 1);
            }
        }
    } else {
        // The right run is shorter or equal, merge backwards.
        unsafe {
            ptr::copy_nonoverlapping(v_mid, buf, right_len);
            hole = MergeHole {
                start: buf,
                end: buf.add(right_len),
                dest: v_mid,
            };
        }

        let left = &mut hole.dest;
        let right = &mut hole.end;
        let mut out = v_end;

        while arr_ptr < *left && buf < *right {
            // The buffered element goes last if it is greater or equal.
            let take_right =
                unsafe { order.compare(&*right.sub(1), &*left.sub(1))? } != Ordering::Less;
            unsafe {
                let to_copy = if take_right {
                    decrement_and_get(right)
                } else {
                    decrement_and_get(left)
                };
                ptr::copy_nonoverlapping(to_copy, decrement_and_get(&mut out), 1);
            }
        }
    }
    // Finally, `hole` gets dropped. If the shorter run was not fully consumed, whatever remains of
    // it will now be copied into the hole in `v`.

    Ok(())
}

unsafe fn get_and_increment<T>(ptr: &mut *mut T) -> *mut T {
    let old = *ptr;
    *ptr = unsafe { ptr.add(1) };
    old
}

unsafe fn decrement_and_get<T>(ptr: &mut *mut T) -> *mut T {
    *ptr = unsafe { ptr.sub(1) };
    *ptr
}

// When dropped, copies the range `start..end` into `dest..`.
struct MergeHole<T> {
    start: *mut T,
    end: *mut T,
    dest: *mut T,
}

impl<T> Drop for MergeHole<T> {
    fn drop(&mut self) {
        // `T` is not a zero-sized type, and these are pointers into a slice's elements.
        unsafe {
            let len = self.end.offset_from(self.start) as usize;
            ptr::copy_nonoverlapping(self.start, self.dest, len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{By, Natural, Present, TryBy};

    #[test]
    fn merge_interleaved() {
        let mut v = [1, 3, 5, 2, 4, 6];
        merge(&mut v, 0, 3, 3, 3, &Natural).unwrap();
        assert_eq!(v, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn merge_duplicates() {
        let mut v = [2, 2, 4, 2, 3];
        merge(&mut v, 0, 3, 3, 2, &Natural).unwrap();
        assert_eq!(v, [2, 2, 2, 3, 4]);

        let mut v = [2, 3, 2, 2, 4];
        merge(&mut v, 0, 2, 2, 3, &Natural).unwrap();
        assert_eq!(v, [2, 2, 2, 3, 4]);
    }

    #[test]
    fn merge_sub_range() {
        let mut v = [9, 9, 7, 8, 1, 5, 0, 0];
        merge(&mut v, 2, 2, 4, 2, &Natural).unwrap();
        assert_eq!(v, [9, 9, 1, 5, 7, 8, 0, 0]);
    }

    #[test]
    fn merge_empty_side() {
        let mut v = [1, 2, 3];
        merge(&mut v, 0, 0, 0, 3, &Natural).unwrap();
        merge(&mut v, 0, 3, 3, 0, &Natural).unwrap();
        assert_eq!(v, [1, 2, 3]);
    }

    #[test]
    fn merge_rejects_non_adjacent() {
        let mut v = [1, 3, 2, 4];
        let err = merge(&mut v, 0, 1, 2, 2, &Natural).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(v, [1, 3, 2, 4]);

        let err = merge(&mut v, 0, 2, 2, 3, &Natural).unwrap_err();
        assert!(err.is_invalid_argument());

        // Range sums that wrap around are rejected, not computed.
        let mut w = [1, 2, 3];
        let err = merge(&mut w, usize::MAX, 2, 1, 1, &Natural).unwrap_err();
        assert!(err.is_invalid_argument());
        let err = merge(&mut w, 0, 1, 1, usize::MAX, &Natural).unwrap_err();
        assert!(err.is_invalid_argument());
        let err = merge(&mut w, usize::MAX, 0, usize::MAX, 1, &Natural).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(w, [1, 2, 3]);
    }

    #[test]
    fn tie_break_differs_by_direction() {
        // (key, origin), ordered by key only. 0 marks the left run, 1 the right run.
        let by_key = By(|a: &(i32, u8), b: &(i32, u8)| a.0.cmp(&b.0));

        // Left is shorter: forward merge, the right run wins ties.
        let mut v = [(1, 0), (1, 1), (1, 1)];
        merge_at(&mut v, 1, &by_key).unwrap();
        assert_eq!(v, [(1, 1), (1, 1), (1, 0)]);

        // Right is shorter or equal: backward merge, the right run wins the tail.
        let mut v = [(1, 0), (1, 0), (1, 1)];
        merge_at(&mut v, 2, &by_key).unwrap();
        assert_eq!(v, [(1, 0), (1, 0), (1, 1)]);
    }

    #[test]
    fn absent_element_keeps_every_element() {
        let mut v = vec![Some(1), Some(4), None, Some(2), Some(3), Some(5), Some(6)];
        let mut expected = v.clone();

        let err = merge_at(&mut v, 3, &Present(Natural)).unwrap_err();
        assert!(err.is_invalid_argument());

        v.sort();
        expected.sort();
        assert_eq!(v, expected);
    }

    #[test]
    fn failing_order_keeps_every_element() {
        // Non-Copy elements, a lost or duplicated element would show up as a leak or double free.
        let mut v: Vec<String> = ["b", "d", "f", "h", "a", "c"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut calls = std::sync::atomic::AtomicUsize::new(0);
        let order = TryBy(|a: &String, b: &String| {
            if calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed) == 2 {
                Err(SortError::invalid_arg("element", "refused"))
            } else {
                Ok(a.cmp(b))
            }
        });

        assert!(merge_at(&mut v, 4, &order).is_err());
        assert_eq!(*calls.get_mut(), 3);

        v.sort();
        assert_eq!(v, ["a", "b", "c", "d", "f", "h"]);
    }

    #[test]
    fn panicking_order_keeps_every_element() {
        let mut v: Vec<Vec<i32>> = [1, 3, 5, 7, 2, 4].iter().map(|x| vec![*x]).collect();

        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            merge_at(
                &mut v,
                4,
                &By(|a: &Vec<i32>, b: &Vec<i32>| {
                    if a[0] == 4 && b[0] == 7 {
                        panic!("Explicit panic.");
                    }
                    a.cmp(b)
                }),
            )
        }));
        assert!(res.is_err());

        v.sort();
        assert_eq!(v, [[1], [2], [3], [4], [5], [7]]);
    }
}
