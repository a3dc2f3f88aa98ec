//! Pipeline views over a single-use source.
//!
//! A [`Pipeline`] is a cheap view: a shared handle to the source, its own stage
//! list and an evaluation mode. `attach` (and the `filter`/`map`/... wrappers)
//! return a new view and leave the old one untouched. All views of one source
//! share a consumed flag: the first terminal operation on any of them takes the
//! source, and every later attach or evaluation fails with
//! [`PipelineError::Consumed`].

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{self, AtomicBool};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::concurrent::{self, Partitions, WorkerPool};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::sequence::Sequence;
use crate::sequential;
use crate::stage::{BoxIter, Stage};
use crate::terminal::{self, Outcome, Terminal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sequential,
    Concurrent,
}

/// Where a pipeline's elements come from.
pub(crate) enum Origin<T> {
    Source(Sequence<T>),
    Linked(Box<dyn Upstream<T>>),
}

/// An upstream pipeline of another element type, already mapped into `T`.
pub(crate) trait Upstream<T>: Send {
    fn into_elements(self: Box<Self>) -> BoxIter<T>;
    fn into_partitions(self: Box<Self>, pool: &WorkerPool) -> Result<Partitions<T>>;
}

/// Expands one upstream element into zero or more downstream ones.
type Expander<S, T> = Arc<dyn Fn(S, &mut Vec<T>) + Send + Sync>;

struct Link<S, T> {
    origin: Origin<S>,
    stages: Vec<Stage<S>>,
    expand: Expander<S, T>,
}

impl<S: Send + 'static, T: Send + 'static> Upstream<T> for Link<S, T> {
    fn into_elements(self: Box<Self>) -> BoxIter<T> {
        let expand = self.expand;
        Box::new(sequential::elements(self.origin, &self.stages).flat_map(move |item| {
            let mut out = Vec::with_capacity(1);
            expand(item, &mut out);
            out
        }))
    }

    fn into_partitions(self: Box<Self>, pool: &WorkerPool) -> Result<Partitions<T>> {
        let expand = self.expand;
        let upstream = concurrent::partitions(self.origin, self.stages, pool)?;
        Ok(Box::new(upstream.map(move |job| {
            let expand = Arc::clone(&expand);
            Box::new(move || {
                let items = job();
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    expand(item, &mut out);
                }
                out
            }) as concurrent::Job<T>
        })))
    }
}

struct Shared<T> {
    consumed: AtomicBool,
    origin: Mutex<Option<Origin<T>>>,
}

pub struct Pipeline<T> {
    shared: Arc<Shared<T>>,
    stages: Vec<Stage<T>>,
    mode: Mode,
    config: PipelineConfig,
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            stages: self.stages.clone(),
            mode: self.mode,
            config: self.config.clone(),
        }
    }
}

impl<T> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .field("mode", &self.mode)
            .field("consumed", &self.shared.consumed.load(atomic::Ordering::Acquire))
            .finish()
    }
}

impl<T: Send + 'static> From<Sequence<T>> for Pipeline<T> {
    fn from(sequence: Sequence<T>) -> Self {
        Self::new(sequence)
    }
}

impl<T: Send + 'static> Pipeline<T> {
    pub fn new(sequence: Sequence<T>) -> Self {
        Self::from_origin(Origin::Source(sequence), Mode::Sequential, PipelineConfig::default())
    }

    fn from_origin(origin: Origin<T>, mode: Mode, config: PipelineConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                consumed: AtomicBool::new(false),
                origin: Mutex::new(Some(origin)),
            }),
            stages: Vec::new(),
            mode,
            config,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_parallel(&self) -> bool {
        self.mode == Mode::Concurrent
    }

    pub fn is_consumed(&self) -> bool {
        self.shared.consumed.load(atomic::Ordering::Acquire)
    }

    pub fn stages(&self) -> &[Stage<T>] {
        &self.stages
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_consumed() {
            warn!(stages = self.stages.len(), "pipeline reused after it was consumed");
            return Err(PipelineError::Consumed);
        }
        Ok(())
    }

    /// Marks every view of the source consumed and hands the source over.
    fn take_origin(&self) -> Result<Origin<T>> {
        if self.shared.consumed.swap(true, atomic::Ordering::AcqRel) {
            warn!(stages = self.stages.len(), "pipeline reused after it was consumed");
            return Err(PipelineError::Consumed);
        }
        self.shared
            .origin
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(PipelineError::Consumed)
    }

    fn view(&self, stages: Vec<Stage<T>>, mode: Mode, config: PipelineConfig) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            stages,
            mode,
            config,
        }
    }

    // ---------------------------------------------------------------------
    // Builder
    // ---------------------------------------------------------------------

    /// New view with `stage` appended.
    pub fn attach(&self, stage: Stage<T>) -> Result<Self> {
        self.ensure_open()?;
        let mut stages = self.stages.clone();
        stages.push(stage);
        Ok(self.view(stages, self.mode, self.config.clone()))
    }

    pub fn parallel(&self) -> Result<Self> {
        self.ensure_open()?;
        Ok(self.view(self.stages.clone(), Mode::Concurrent, self.config.clone()))
    }

    pub fn sequential(&self) -> Result<Self> {
        self.ensure_open()?;
        Ok(self.view(self.stages.clone(), Mode::Sequential, self.config.clone()))
    }

    /// Switches a freshly built pipeline to concurrent mode.
    pub fn into_parallel(mut self) -> Self {
        self.mode = Mode::Concurrent;
        self
    }

    pub fn with_config(&self, config: PipelineConfig) -> Result<Self> {
        self.ensure_open()?;
        config.validate()?;
        Ok(self.view(self.stages.clone(), self.mode, config))
    }

    pub fn filter<F>(&self, predicate: F) -> Result<Self>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.attach(Stage::filter(predicate))
    }

    pub fn map<F>(&self, transform: F) -> Result<Self>
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.attach(Stage::map(transform))
    }

    pub fn flat_map<F, I>(&self, expand: F) -> Result<Self>
    where
        F: Fn(T) -> I + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
    {
        self.attach(Stage::flatten(expand))
    }

    pub fn sorted(&self) -> Result<Self>
    where
        T: Ord,
    {
        self.attach(Stage::sort())
    }

    pub fn sorted_by<F>(&self, compare: F) -> Result<Self>
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.attach(Stage::sort_by(compare))
    }

    pub fn sorted_by_key<K, F>(&self, key: F) -> Result<Self>
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.attach(Stage::sort_by(move |a, b| key(a).cmp(&key(b))))
    }

    pub fn distinct(&self) -> Result<Self>
    where
        T: Eq + Hash + Clone,
    {
        self.attach(Stage::distinct())
    }

    /// Links a pipeline of another element type after this one. The source
    /// moves into the new pipeline, so this view is consumed afterwards.
    pub fn map_into<U, F>(&self, mapper: F) -> Result<Pipeline<U>>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.link(Arc::new(move |item: T, out: &mut Vec<U>| out.push(mapper(item))))
    }

    /// Like [`map_into`](Self::map_into), but each element may expand into any
    /// number of downstream elements.
    pub fn flat_map_into<U, F, I>(&self, expand: F) -> Result<Pipeline<U>>
    where
        U: Send + 'static,
        F: Fn(T) -> I + Send + Sync + 'static,
        I: IntoIterator<Item = U>,
    {
        self.link(Arc::new(move |item: T, out: &mut Vec<U>| out.extend(expand(item))))
    }

    fn link<U: Send + 'static>(&self, expand: Expander<T, U>) -> Result<Pipeline<U>> {
        let origin = self.take_origin()?;
        let link = Link {
            origin,
            stages: self.stages.clone(),
            expand,
        };
        Ok(Pipeline::from_origin(
            Origin::Linked(Box::new(link)),
            self.mode,
            self.config.clone(),
        ))
    }

    // ---------------------------------------------------------------------
    // Evaluation
    // ---------------------------------------------------------------------

    /// Runs `terminal` over this view. The source is consumed before the
    /// first element is pulled, whatever the result.
    pub fn evaluate(&self, terminal: Terminal<T>) -> Result<Outcome<T>> {
        if self.mode == Mode::Concurrent && matches!(terminal, Terminal::FindFirst) {
            return Err(PipelineError::Unordered {
                operation: terminal.kind(),
            });
        }
        let origin = self.take_origin()?;
        debug!(
            mode = ?self.mode,
            stages = self.stages.len(),
            terminal = terminal.kind(),
            "evaluating pipeline"
        );
        match self.mode {
            Mode::Sequential => sequential::evaluate(origin, &self.stages, terminal),
            Mode::Concurrent => {
                concurrent::evaluate(origin, self.stages.clone(), terminal, &self.config)
            }
        }
    }

    pub fn to_vec(&self) -> Result<Vec<T>> {
        match self.evaluate(Terminal::Collect)? {
            Outcome::Elements(items) => Ok(items),
            _ => unreachable!("collect always yields elements"),
        }
    }

    pub fn count(&self) -> Result<usize> {
        match self.evaluate(Terminal::Count)? {
            Outcome::Count(n) => Ok(n),
            _ => unreachable!("count always yields a count"),
        }
    }

    /// `None` when nothing survives the stages.
    pub fn reduce<F>(&self, op: F) -> Result<Option<T>>
    where
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        self.element(Terminal::Reduce {
            identity: None,
            op: Arc::new(op),
        })
    }

    pub fn fold<F>(&self, identity: T, op: F) -> Result<T>
    where
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        match self.evaluate(Terminal::Reduce {
            identity: Some(identity),
            op: Arc::new(op),
        })? {
            Outcome::Element(Some(folded)) => Ok(folded),
            _ => unreachable!("a fold with an identity always yields a value"),
        }
    }

    pub fn min_by<F>(&self, compare: F) -> Result<Option<T>>
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.reduce(move |a, b| if compare(&b, &a) == Ordering::Less { b } else { a })
    }

    pub fn max_by<F>(&self, compare: F) -> Result<Option<T>>
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.reduce(move |a, b| if compare(&b, &a) == Ordering::Greater { b } else { a })
    }

    pub fn any_match<F>(&self, predicate: F) -> Result<bool>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.matched(Terminal::AnyMatch(Arc::new(predicate)))
    }

    pub fn all_match<F>(&self, predicate: F) -> Result<bool>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.matched(Terminal::AllMatch(Arc::new(predicate)))
    }

    pub fn none_match<F>(&self, predicate: F) -> Result<bool>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.matched(Terminal::NoneMatch(Arc::new(predicate)))
    }

    pub fn find_first(&self) -> Result<Option<T>> {
        self.element(Terminal::FindFirst)
    }

    pub fn find_any(&self) -> Result<Option<T>> {
        self.element(Terminal::FindAny)
    }

    pub fn for_each<F>(&self, action: F) -> Result<()>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.evaluate(Terminal::ForEach(Arc::new(action)))?;
        Ok(())
    }

    fn element(&self, terminal: Terminal<T>) -> Result<Option<T>> {
        match self.evaluate(terminal)? {
            Outcome::Element(item) => Ok(item),
            _ => unreachable!("reduce and find always yield an element"),
        }
    }

    fn matched(&self, terminal: Terminal<T>) -> Result<bool> {
        match self.evaluate(terminal)? {
            Outcome::Matched(result) => Ok(result),
            _ => unreachable!("match terminals always yield a boolean"),
        }
    }

    // ---------------------------------------------------------------------
    // Collectors
    // ---------------------------------------------------------------------

    pub fn to_set(&self) -> Result<HashSet<T>>
    where
        T: Eq + Hash,
    {
        Ok(self.to_vec()?.into_iter().collect())
    }

    pub fn to_sorted_set(&self) -> Result<BTreeSet<T>>
    where
        T: Ord,
    {
        Ok(self.to_vec()?.into_iter().collect())
    }

    /// Fails with [`PipelineError::DuplicateKey`] when two elements share a key.
    pub fn to_map<K, V>(&self, key: impl Fn(&T) -> K, value: impl Fn(T) -> V) -> Result<HashMap<K, V>>
    where
        K: Eq + Hash + fmt::Debug,
    {
        terminal::to_map(self.to_vec()?, key, value)
    }

    pub fn to_map_merging<K, V>(
        &self,
        key: impl Fn(&T) -> K,
        value: impl Fn(T) -> V,
        merge: impl Fn(V, V) -> V,
    ) -> Result<HashMap<K, V>>
    where
        K: Eq + Hash,
    {
        Ok(terminal::to_map_merging(self.to_vec()?, key, value, merge))
    }

    pub fn group_by<K>(&self, key: impl Fn(&T) -> K) -> Result<HashMap<K, Vec<T>>>
    where
        K: Eq + Hash,
    {
        Ok(terminal::group_by(self.to_vec()?, key))
    }
}

impl<T: AsRef<str> + Send + 'static> Pipeline<T> {
    pub fn joining(&self, separator: &str) -> Result<String> {
        let items = self.to_vec()?;
        let parts: Vec<&str> = items.iter().map(|item| item.as_ref()).collect();
        Ok(parts.join(separator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers() -> Pipeline<i32> {
        Sequence::of([1, 2, 3, 4, 5]).pipeline()
    }

    #[test]
    fn test_attach_leaves_prior_view_alone() {
        let base = numbers();
        let doubled = base.map(|x| x * 2).unwrap();
        assert_eq!(base.stages().len(), 0);
        assert_eq!(doubled.stages().len(), 1);
        assert_eq!(doubled.to_vec().unwrap(), vec![2, 4, 6, 8, 10]);
    }

    #[test]
    fn test_consumed_after_terminal() {
        let base = numbers();
        let evens = base.filter(|x| x % 2 == 0).unwrap();
        assert_eq!(evens.count().unwrap(), 2);

        assert!(evens.is_consumed());
        assert!(base.is_consumed());
        assert!(evens.count().unwrap_err().is_consumed());
        assert!(base.to_vec().unwrap_err().is_consumed());
        assert!(base.map(|x| x + 1).unwrap_err().is_consumed());
        assert!(base.parallel().unwrap_err().is_consumed());
    }

    #[test]
    fn test_string_map_and_sort() {
        let names = Sequence::of(["aBc", "d", "ef"].map(String::from)).pipeline();
        let upper = names.map(|s| s.to_uppercase()).unwrap().to_vec().unwrap();
        assert_eq!(upper, vec!["ABC", "D", "EF"]);

        let names = Sequence::of(["aBc", "d", "ef", "123456"].map(String::from)).pipeline();
        let reverse = names.sorted_by(|a, b| b.cmp(a)).unwrap().to_vec().unwrap();
        assert_eq!(reverse, vec!["ef", "d", "aBc", "123456"]);
    }

    #[test]
    fn test_flat_map_nested_lists() {
        let nested = Sequence::of([vec!["Pankaj"], vec!["David", "Lisa"], vec!["Amit"]])
            .pipeline()
            .flat_map_into(|list| list.into_iter().map(String::from))
            .unwrap()
            .to_vec()
            .unwrap();
        assert_eq!(nested, vec!["Pankaj", "David", "Lisa", "Amit"]);
    }

    #[test]
    fn test_map_into_consumes_upstream() {
        let base = numbers();
        let labels = base.map_into(|n| format!("#{n}")).unwrap();
        assert!(base.is_consumed());
        assert!(!labels.is_consumed());
        assert_eq!(labels.joining(" ").unwrap(), "#1 #2 #3 #4 #5");
    }

    #[test]
    fn test_map_into_parallel_runs_upstream_stages() {
        let lengths = Sequence::new((0..1000usize).map(|i| "x".repeat(i % 7)))
            .parallel_pipeline()
            .filter(|s: &String| !s.is_empty())
            .unwrap()
            .map_into(|s| s.len())
            .unwrap();
        assert!(lengths.is_parallel());
        let total: usize = lengths.fold(0, |a, b| a + b).unwrap();
        let expected: usize = (0..1000usize).map(|i| i % 7).sum();
        assert_eq!(total, expected);
    }

    #[test]
    fn test_find_first_parallel_is_rejected_without_consuming() {
        let p = numbers().parallel().unwrap();
        assert!(matches!(p.find_first(), Err(PipelineError::Unordered { .. })));
        assert!(!p.is_consumed());
        assert!(p.find_any().unwrap().is_some());
    }

    #[test]
    fn test_find_first_with_filter() {
        let names = Sequence::of(["Pankaj", "Amit", "David", "Lisa"]).pipeline();
        let first = names.filter(|n| n.starts_with('D')).unwrap().find_first().unwrap();
        assert_eq!(first, Some("David"));
    }

    #[test]
    fn test_min_max_keep_first_on_ties() {
        let words = || Sequence::of(["bb", "a", "cc", "d"]).pipeline();
        assert_eq!(words().min_by(|a, b| a.len().cmp(&b.len())).unwrap(), Some("a"));
        assert_eq!(words().max_by(|a, b| a.len().cmp(&b.len())).unwrap(), Some("bb"));
    }

    #[test]
    fn test_collectors() {
        let set = Sequence::of([3, 1, 3]).pipeline().to_set().unwrap();
        assert_eq!(set, HashSet::from([1, 3]));

        let sorted = Sequence::of([3, 1, 2]).pipeline().to_sorted_set().unwrap();
        assert_eq!(sorted.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);

        let map = Sequence::of([1, 2, 3, 4]).pipeline().to_map(|i| *i, |i| i + 10).unwrap();
        assert_eq!(map[&4], 14);

        let err = Sequence::of([1, 1]).pipeline().to_map(|i| *i, |i| i).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateKey { .. }));

        let merged = Sequence::of([1, 1, 2])
            .pipeline()
            .to_map_merging(|i| *i, |i| i, |a, b| a + b)
            .unwrap();
        assert_eq!(merged, HashMap::from([(1, 2), (2, 2)]));
    }

    #[test]
    fn test_with_config_validates() {
        let p = numbers();
        assert!(matches!(
            p.with_config(PipelineConfig { workers: 0, partition_size: 1 }),
            Err(PipelineError::Config(_))
        ));
        let tuned = p
            .parallel()
            .unwrap()
            .with_config(PipelineConfig::new(2, 1).unwrap())
            .unwrap();
        assert_eq!(tuned.count().unwrap(), 5);
    }

    #[test]
    fn test_debug_shows_stages() {
        let p = numbers().filter(|x| *x > 1).unwrap().sorted().unwrap();
        let text = format!("{p:?}");
        assert!(text.contains("[filter, sort]"));
        assert!(text.contains("consumed: false"));
    }
}
