/// A sort implementation under test.
///
/// Implementations are expected to panic when the sort reports an error, the shared tests treat a
/// panic that escapes the sort the same way as a panicking comparison.
pub trait Sort {
    fn name() -> String;

    fn sort<T>(arr: &mut [T])
    where
        T: Ord + Send;

    fn sort_by<T, F>(arr: &mut [T], compare: F)
    where
        T: Send,
        F: Fn(&T, &T) -> std::cmp::Ordering + Sync;
}

pub mod patterns;
