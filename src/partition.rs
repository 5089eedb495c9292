use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::slice;

/// Exclusive capability over the half-open range `[start, start + len)` of one sequence.
///
/// A `Partition` is move-only. New partitions only come from [`Partition::whole`], which takes
/// the exclusive borrow of the sequence, from [`Partition::split_at`], which consumes its parent,
/// and from [`Partition::join`], which consumes two adjacent siblings. Two live partitions of the
/// same sequence therefore never overlap, and whoever holds one may mutate its range while other
/// threads mutate theirs.
pub struct Partition<'a, T> {
    // Points at element 0 of the whole sequence, shared by all partitions split from it.
    base: *mut T,
    start: usize,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

// SAFETY: a partition is the only handle to its range, moving it moves exclusive access to `T`s.
unsafe impl<T: Send> Send for Partition<'_, T> {}

impl<'a, T> Partition<'a, T> {
    pub fn whole(v: &'a mut [T]) -> Self {
        Partition {
            base: v.as_mut_ptr(),
            start: 0,
            len: v.len(),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Splits into `[start, start + mid)` and `[start + mid, end)`.
    ///
    /// Panics if `mid > len`.
    pub fn split_at(self, mid: usize) -> (Self, Self) {
        assert!(mid <= self.len, "split point {mid} out of bounds for {self}");

        let left = Partition {
            base: self.base,
            start: self.start,
            len: mid,
            _marker: PhantomData,
        };
        let right = Partition {
            base: self.base,
            start: self.start + mid,
            len: self.len - mid,
            _marker: PhantomData,
        };

        (left, right)
    }

    /// Reunites two siblings, `left` must end where `right` starts.
    ///
    /// Panics if the partitions are not adjacent views of the same sequence.
    pub fn join(left: Self, right: Self) -> Self {
        assert!(
            ptr::eq(left.base, right.base) && left.end() == right.start,
            "cannot join non adjacent partitions {left} and {right}"
        );

        Partition {
            base: left.base,
            start: left.start,
            len: left.len + right.len,
            _marker: PhantomData,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: `base` comes from a `&'a mut [T]` that outlives this partition, the range is in
        // bounds by construction and no other live partition covers any index of it.
        unsafe { slice::from_raw_parts_mut(self.base.add(self.start), self.len) }
    }
}

impl<T> fmt::Display for Partition<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

impl<T> fmt::Debug for Partition<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("start", &self.start)
            .field("len", &self.len)
            .finish()
    }
}
