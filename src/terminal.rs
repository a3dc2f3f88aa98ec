//! Terminal operations and their outcomes.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::{PipelineError, Result};
use crate::stage::Predicate;

pub type Accumulator<T> = Arc<dyn Fn(T, T) -> T + Send + Sync>;
pub type Action<T> = Arc<dyn Fn(T) + Send + Sync>;

/// The operation that triggers evaluation.
pub enum Terminal<T> {
    Collect,
    Count,
    /// Left fold in encounter order sequentially. Concurrently, partitions fold
    /// independently and the partials are combined, so `op` must be associative.
    Reduce {
        identity: Option<T>,
        op: Accumulator<T>,
    },
    AnyMatch(Predicate<T>),
    AllMatch(Predicate<T>),
    NoneMatch(Predicate<T>),
    /// Sequential only.
    FindFirst,
    FindAny,
    ForEach(Action<T>),
}

impl<T> Terminal<T> {
    pub fn kind(&self) -> &'static str {
        match self {
            Terminal::Collect => "collect",
            Terminal::Count => "count",
            Terminal::Reduce { .. } => "reduce",
            Terminal::AnyMatch(_) => "any_match",
            Terminal::AllMatch(_) => "all_match",
            Terminal::NoneMatch(_) => "none_match",
            Terminal::FindFirst => "find_first",
            Terminal::FindAny => "find_any",
            Terminal::ForEach(_) => "for_each",
        }
    }

    pub fn is_short_circuit(&self) -> bool {
        matches!(
            self,
            Terminal::AnyMatch(_)
                | Terminal::AllMatch(_)
                | Terminal::NoneMatch(_)
                | Terminal::FindFirst
                | Terminal::FindAny
        )
    }
}

impl<T> fmt::Debug for Terminal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Elements(Vec<T>),
    Element(Option<T>),
    Count(usize),
    Matched(bool),
    Done,
}

impl<T> Outcome<T> {
    pub fn into_elements(self) -> Option<Vec<T>> {
        match self {
            Outcome::Elements(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_element(self) -> Option<Option<T>> {
        match self {
            Outcome::Element(item) => Some(item),
            _ => None,
        }
    }

    pub fn count(&self) -> Option<usize> {
        match self {
            Outcome::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn matched(&self) -> Option<bool> {
        match self {
            Outcome::Matched(b) => Some(*b),
            _ => None,
        }
    }
}

/// Collects into a map; a repeated key is an error.
pub fn to_map<T, K, V>(
    items: Vec<T>,
    key: impl Fn(&T) -> K,
    value: impl Fn(T) -> V,
) -> Result<HashMap<K, V>>
where
    K: Eq + Hash + fmt::Debug,
{
    let mut map = HashMap::with_capacity(items.len());
    for item in items {
        let k = key(&item);
        if map.contains_key(&k) {
            return Err(PipelineError::duplicate_key(k));
        }
        map.insert(k, value(item));
    }
    Ok(map)
}

/// Collects into a map, resolving repeated keys with `merge(existing, incoming)`.
pub fn to_map_merging<T, K, V>(
    items: Vec<T>,
    key: impl Fn(&T) -> K,
    value: impl Fn(T) -> V,
    merge: impl Fn(V, V) -> V,
) -> HashMap<K, V>
where
    K: Eq + Hash,
{
    let mut map: HashMap<K, V> = HashMap::with_capacity(items.len());
    for item in items {
        let k = key(&item);
        let incoming = value(item);
        let merged = match map.remove(&k) {
            Some(existing) => merge(existing, incoming),
            None => incoming,
        };
        map.insert(k, merged);
    }
    map
}

pub fn group_by<T, K>(items: Vec<T>, key: impl Fn(&T) -> K) -> HashMap<K, Vec<T>>
where
    K: Eq + Hash,
{
    let mut groups: HashMap<K, Vec<T>> = HashMap::new();
    for item in items {
        groups.entry(key(&item)).or_default().push(item);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_map_plus_ten() {
        let map = to_map(vec![1, 2, 3, 4], |i| *i, |i| i + 10).unwrap();
        assert_eq!(map, HashMap::from([(1, 11), (2, 12), (3, 13), (4, 14)]));
    }

    #[test]
    fn test_to_map_duplicate_key() {
        let err = to_map(vec!["ab", "ac"], |s| s.len(), |s| s).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateKey { ref key } if key == "2"));
    }

    #[test]
    fn test_to_map_merging_sums() {
        let map = to_map_merging(vec![1, 2, 3, 4, 5], |i| i % 2, |i| i, |a, b| a + b);
        assert_eq!(map, HashMap::from([(0, 6), (1, 9)]));
    }

    #[test]
    fn test_group_by_keeps_order_within_group() {
        let groups = group_by(vec!["apple", "avocado", "banana", "apricot"], |s| s.chars().next());
        assert_eq!(groups[&Some('a')], vec!["apple", "avocado", "apricot"]);
        assert_eq!(groups[&Some('b')], vec!["banana"]);
    }

    #[test]
    fn test_outcome_accessors() {
        assert_eq!(Outcome::Elements(vec![1]).into_elements(), Some(vec![1]));
        assert_eq!(Outcome::<i32>::Count(3).into_elements(), None);
        assert_eq!(Outcome::Element(Some(2)).into_element(), Some(Some(2)));
        assert_eq!(Outcome::<i32>::Count(3).count(), Some(3));
        assert_eq!(Outcome::<i32>::Matched(true).matched(), Some(true));
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(Terminal::<i32>::FindAny.is_short_circuit());
        assert!(!Terminal::<i32>::Collect.is_short_circuit());
        assert_eq!(format!("{:?}", Terminal::<i32>::Count), "count");
    }
}
