//! The closed set of deferred stages a pipeline can carry.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use itertools::Itertools;
use rayon::prelude::*;

/// A boxed, sendable element stream.
pub type BoxIter<T> = Box<dyn Iterator<Item = T> + Send>;

pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
pub type Transform<T> = Arc<dyn Fn(T) -> T + Send + Sync>;
pub type Expand<T> = Arc<dyn Fn(T) -> Vec<T> + Send + Sync>;
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;
pub type Dedup<T> = Arc<dyn Fn(BoxIter<T>) -> BoxIter<T> + Send + Sync>;

/// One deferred transformation. Nothing here runs until a terminal operation
/// pulls elements through it.
pub enum Stage<T> {
    Filter(Predicate<T>),
    Map(Transform<T>),
    Flatten(Expand<T>),
    /// Stable; equal elements keep their relative order.
    Sort(Comparator<T>),
    /// Keeps the first occurrence of each element.
    Distinct(Dedup<T>),
}

impl<T> Clone for Stage<T> {
    fn clone(&self) -> Self {
        match self {
            Stage::Filter(f) => Stage::Filter(Arc::clone(f)),
            Stage::Map(f) => Stage::Map(Arc::clone(f)),
            Stage::Flatten(f) => Stage::Flatten(Arc::clone(f)),
            Stage::Sort(f) => Stage::Sort(Arc::clone(f)),
            Stage::Distinct(f) => Stage::Distinct(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for Stage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

impl<T> Stage<T> {
    pub fn kind(&self) -> &'static str {
        match self {
            Stage::Filter(_) => "filter",
            Stage::Map(_) => "map",
            Stage::Flatten(_) => "flatten",
            Stage::Sort(_) => "sort",
            Stage::Distinct(_) => "distinct",
        }
    }

    /// Barrier stages need every upstream element before emitting one.
    pub fn is_barrier(&self) -> bool {
        matches!(self, Stage::Sort(_) | Stage::Distinct(_))
    }
}

impl<T: Send + 'static> Stage<T> {
    pub fn filter<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Stage::Filter(Arc::new(predicate))
    }

    pub fn map<F>(transform: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        Stage::Map(Arc::new(transform))
    }

    pub fn flatten<F, I>(expand: F) -> Self
    where
        F: Fn(T) -> I + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
    {
        Stage::Flatten(Arc::new(move |item| expand(item).into_iter().collect()))
    }

    pub fn sort_by<F>(compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Stage::Sort(Arc::new(compare))
    }

    pub fn sort() -> Self
    where
        T: Ord,
    {
        Self::sort_by(|a: &T, b: &T| a.cmp(b))
    }

    pub fn distinct() -> Self
    where
        T: Eq + Hash + Clone,
    {
        Stage::Distinct(Arc::new(|iter: BoxIter<T>| -> BoxIter<T> { Box::new(iter.unique()) }))
    }

    /// Wraps `iter` in this stage. A sort drains `iter` as soon as it is applied.
    pub(crate) fn apply(&self, iter: BoxIter<T>) -> BoxIter<T> {
        match self {
            Stage::Filter(predicate) => {
                let predicate = Arc::clone(predicate);
                Box::new(iter.filter(move |item| predicate(item)))
            }
            Stage::Map(transform) => {
                let transform = Arc::clone(transform);
                Box::new(iter.map(move |item| transform(item)))
            }
            Stage::Flatten(expand) => {
                let expand = Arc::clone(expand);
                Box::new(iter.flat_map(move |item| expand(item)))
            }
            Stage::Sort(compare) => {
                let compare = Arc::clone(compare);
                Box::new(iter.sorted_by(move |a, b| compare(a, b)))
            }
            Stage::Distinct(dedup) => dedup(iter),
        }
    }

    /// Runs a barrier over fully gathered elements. Sorting uses the current
    /// rayon pool; call it from inside `ThreadPool::install`.
    pub(crate) fn apply_gathered(&self, mut items: Vec<T>) -> Vec<T> {
        match self {
            Stage::Sort(compare) => {
                items.par_sort_by(|a, b| compare(a, b));
                items
            }
            _ => self.apply(Box::new(items.into_iter())).collect(),
        }
    }
}

/// Pushes `items` through every stage in order.
pub(crate) fn run_stages<T: Send + 'static>(stages: &[Stage<T>], items: Vec<T>) -> Vec<T> {
    if stages.is_empty() {
        return items;
    }
    chain(stages, Box::new(items.into_iter())).collect()
}

pub(crate) fn chain<T: Send + 'static>(stages: &[Stage<T>], source: BoxIter<T>) -> BoxIter<T> {
    stages.iter().fold(source, |iter, stage| stage.apply(iter))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(stages: &[Stage<i32>], items: Vec<i32>) -> Vec<i32> {
        run_stages(stages, items)
    }

    #[test]
    fn test_filter_map_flatten_keep_order() {
        let stages = vec![
            Stage::filter(|x: &i32| x % 2 == 1),
            Stage::map(|x| x * 10),
            Stage::flatten(|x| vec![x, x + 1]),
        ];
        assert_eq!(run(&stages, vec![1, 2, 3]), vec![10, 11, 30, 31]);
    }

    #[test]
    fn test_sort_is_stable() {
        let stages = vec![Stage::sort_by(|a: &(i32, char), b: &(i32, char)| a.0.cmp(&b.0))];
        let sorted = run_stages(&stages, vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')]);
        assert_eq!(sorted, vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
    }

    #[test]
    fn test_distinct_keeps_first() {
        let stages = vec![Stage::distinct()];
        assert_eq!(run(&stages, vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }

    #[test]
    fn test_barrier_kinds() {
        assert!(Stage::<i32>::sort().is_barrier());
        assert!(Stage::<i32>::distinct().is_barrier());
        assert!(!Stage::filter(|_: &i32| true).is_barrier());
        assert_eq!(format!("{:?}", Stage::<i32>::map(|x| x)), "map");
    }

    #[test]
    fn test_apply_gathered_sort() {
        let sorted = Stage::sort_by(|a: &i32, b: &i32| b.cmp(a)).apply_gathered(vec![1, 5, 3]);
        assert_eq!(sorted, vec![5, 3, 1]);
        let unique = Stage::distinct().apply_gathered(vec![1, 1, 2]);
        assert_eq!(unique, vec![1, 2]);
    }

    #[test]
    fn test_stages_are_lazy() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let stage = Stage::map(move |x: i32| {
            seen.fetch_add(1, Ordering::SeqCst);
            x
        });
        let mut iter = chain(&[stage], Box::new(0..100));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        iter.next();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
