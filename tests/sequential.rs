use sort_test_tools::instantiate_sort_tests;
use sort_test_tools::Sort;

use merge_comp::sequential as test_sort;

struct SortImpl {}

impl Sort for SortImpl {
    fn name() -> String {
        "merge_sequential".into()
    }

    fn sort<T>(arr: &mut [T])
    where
        T: Ord + Send,
    {
        test_sort::sort(arr).unwrap_or_else(|err| panic!("{err}"));
    }

    fn sort_by<T, F>(arr: &mut [T], compare: F)
    where
        T: Send,
        F: Fn(&T, &T) -> std::cmp::Ordering + Sync,
    {
        test_sort::sort_by(arr, compare).unwrap_or_else(|err| panic!("{err}"));
    }
}

instantiate_sort_tests!(SortImpl);
