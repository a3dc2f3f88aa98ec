//! Unordered evaluation on a fixed-size worker pool.
//!
//! The calling thread pulls the source in contiguous partitions and hands each
//! one to a worker, which runs the stage chain over it. At most `workers`
//! partitions are in flight at once. Barrier stages (`sort`, `distinct`) split
//! the chain: the part before the barrier is gathered, the barrier runs once,
//! and the rest is partitioned again.
//!
//! Nothing about the order of results across partitions is guaranteed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crossbeam::channel::{bounded, unbounded, Sender};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace, warn};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::Origin;
use crate::stage::{run_stages, Stage};
use crate::terminal::{Outcome, Terminal};

/// Deferred work for one partition; runs on a worker.
pub(crate) type Job<T> = Box<dyn FnOnce() -> Vec<T> + Send>;
pub(crate) type Partitions<T> = Box<dyn Iterator<Item = Job<T>>>;

pub(crate) struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
    partition_size: usize,
}

impl WorkerPool {
    /// Builds the pool. The worker count never exceeds the machine's
    /// available parallelism.
    pub(crate) fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let available = num_cpus::get().max(1);
        let workers = config.workers.min(available);
        if workers < config.workers {
            warn!(requested = config.workers, workers, "worker count capped at available parallelism");
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pipeline-worker-{i}"))
            .build()?;
        Ok(Self {
            pool,
            workers,
            partition_size: config.partition_size,
        })
    }

    /// Feeds partitions to the pool until the source drains or `stop` is set.
    /// Partitions already running when `stop` flips are allowed to finish.
    /// `work` receives each partition's index in source order.
    fn dispatch<T, F>(&self, mut partitions: Partitions<T>, stop: &AtomicBool, work: F)
    where
        T: Send + 'static,
        F: Fn(usize, Vec<T>) + Send + Sync,
    {
        let (permit_tx, permit_rx) = bounded::<()>(self.workers);
        for _ in 0..self.workers {
            let _ = permit_tx.send(());
        }

        self.pool.in_place_scope(|scope| {
            let mut dispatched = 0usize;
            loop {
                if permit_rx.recv().is_err() {
                    break;
                }
                if stop.load(Ordering::Acquire) {
                    debug!(dispatched, "short-circuit reached, no further partitions dispatched");
                    break;
                }
                let Some(job) = partitions.next() else {
                    break;
                };
                let index = dispatched;
                dispatched += 1;
                trace!(partition = index, "dispatching partition");

                let permit = Permit(permit_tx.clone());
                let work = &work;
                scope.spawn(move |_| {
                    let _permit = permit;
                    work(index, job());
                });
            }
        });
    }

    fn run_barrier<T: Send + 'static>(&self, barrier: &Stage<T>, items: Vec<T>) -> Vec<T> {
        self.pool.install(|| barrier.apply_gathered(items))
    }
}

/// Returned to the dispatcher when a worker finishes, even by panicking.
struct Permit(Sender<()>);

impl Drop for Permit {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

/// Splits `origin` followed by `stages` into partition jobs.
pub(crate) fn partitions<T: Send + 'static>(
    origin: Origin<T>,
    stages: Vec<Stage<T>>,
    pool: &WorkerPool,
) -> Result<Partitions<T>> {
    let barrier_at = stages.iter().rposition(Stage::is_barrier);
    let (base, tail) = match barrier_at {
        None => (origin_partitions(origin, pool)?, stages),
        Some(at) => {
            let mut head = stages;
            let tail = head.split_off(at + 1);
            let barrier = head.remove(at);
            let gathered = gather(origin, head, pool)?;
            debug!(barrier = barrier.kind(), elements = gathered.len(), "running barrier stage");
            let gathered = pool.run_barrier(&barrier, gathered);
            (chunked(gathered, pool.partition_size), tail)
        }
    };

    if tail.is_empty() {
        return Ok(base);
    }
    Ok(Box::new(base.map(move |job| {
        let stages = tail.clone();
        Box::new(move || run_stages(&stages, job())) as Job<T>
    })))
}

fn origin_partitions<T: Send + 'static>(origin: Origin<T>, pool: &WorkerPool) -> Result<Partitions<T>> {
    match origin {
        Origin::Source(mut sequence) => {
            let size = pool.partition_size;
            Ok(Box::new(std::iter::from_fn(move || {
                let batch = sequence.next_partition(size);
                if batch.is_empty() {
                    None
                } else {
                    Some(Box::new(move || batch) as Job<T>)
                }
            })))
        }
        Origin::Linked(upstream) => upstream.into_partitions(pool),
    }
}

fn chunked<T: Send + 'static>(items: Vec<T>, size: usize) -> Partitions<T> {
    let mut items = items.into_iter();
    Box::new(std::iter::from_fn(move || {
        let batch: Vec<T> = items.by_ref().take(size).collect();
        if batch.is_empty() {
            None
        } else {
            Some(Box::new(move || batch) as Job<T>)
        }
    }))
}

/// Evaluates everything up to a barrier and collects it in source order, so
/// the barrier sees elements the way the sequential chain would.
fn gather<T: Send + 'static>(origin: Origin<T>, stages: Vec<Stage<T>>, pool: &WorkerPool) -> Result<Vec<T>> {
    let parts = partitions(origin, stages, pool)?;
    let (tx, rx) = unbounded();
    pool.dispatch(parts, &AtomicBool::new(false), |index, items| {
        let _ = tx.send((index, items));
    });
    drop(tx);
    let mut batches: Vec<(usize, Vec<T>)> = rx.into_iter().collect();
    batches.sort_unstable_by_key(|(index, _)| *index);
    Ok(batches.into_iter().flat_map(|(_, items)| items).collect())
}

pub(crate) fn evaluate<T: Send + 'static>(
    origin: Origin<T>,
    stages: Vec<Stage<T>>,
    terminal: Terminal<T>,
    config: &PipelineConfig,
) -> Result<Outcome<T>> {
    let pool = WorkerPool::new(config)?;
    let parts = partitions(origin, stages, &pool)?;
    let stop = AtomicBool::new(false);

    let outcome = match terminal {
        Terminal::Collect => {
            let (tx, rx) = unbounded();
            pool.dispatch(parts, &stop, |_, items| {
                let _ = tx.send(items);
            });
            drop(tx);
            Outcome::Elements(rx.into_iter().flatten().collect())
        }
        Terminal::Count => {
            let (tx, rx) = unbounded();
            pool.dispatch(parts, &stop, |_, items| {
                let _ = tx.send(items.len());
            });
            drop(tx);
            Outcome::Count(rx.into_iter().sum())
        }
        Terminal::Reduce { identity, op } => {
            let (tx, rx) = unbounded();
            pool.dispatch(parts, &stop, |index, items| {
                if let Some(partial) = items.into_iter().reduce(|a, b| op(a, b)) {
                    let _ = tx.send((index, partial));
                }
            });
            drop(tx);
            // Partials combine in source order, so `op` only has to be associative
            let mut partials: Vec<(usize, T)> = rx.into_iter().collect();
            partials.sort_unstable_by_key(|(index, _)| *index);
            let combined = partials.into_iter().map(|(_, partial)| partial).reduce(|a, b| op(a, b));
            match identity {
                None => Outcome::Element(combined),
                Some(identity) => Outcome::Element(Some(match combined {
                    Some(value) => op(identity, value),
                    None => identity,
                })),
            }
        }
        Terminal::AnyMatch(predicate) => {
            pool.dispatch(parts, &stop, |_, items| {
                if items.iter().any(|item| predicate(item)) {
                    stop.store(true, Ordering::Release);
                }
            });
            Outcome::Matched(stop.load(Ordering::Acquire))
        }
        Terminal::AllMatch(predicate) => {
            pool.dispatch(parts, &stop, |_, items| {
                if !items.iter().all(|item| predicate(item)) {
                    stop.store(true, Ordering::Release);
                }
            });
            Outcome::Matched(!stop.load(Ordering::Acquire))
        }
        Terminal::NoneMatch(predicate) => {
            pool.dispatch(parts, &stop, |_, items| {
                if items.iter().any(|item| predicate(item)) {
                    stop.store(true, Ordering::Release);
                }
            });
            Outcome::Matched(!stop.load(Ordering::Acquire))
        }
        Terminal::FindAny => {
            let found = Mutex::new(None);
            pool.dispatch(parts, &stop, |_, items| {
                if let Some(item) = items.into_iter().next() {
                    let mut slot = found.lock().unwrap_or_else(PoisonError::into_inner);
                    if slot.is_none() {
                        *slot = Some(item);
                    }
                    stop.store(true, Ordering::Release);
                }
            });
            Outcome::Element(found.into_inner().unwrap_or_else(PoisonError::into_inner))
        }
        Terminal::ForEach(action) => {
            pool.dispatch(parts, &stop, |_, items| {
                items.into_iter().for_each(|item| action(item));
            });
            Outcome::Done
        }
        Terminal::FindFirst => unreachable!("Pipeline::evaluate rejects find_first in concurrent mode"),
    };

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Sequence;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn config(workers: usize, partition_size: usize) -> PipelineConfig {
        PipelineConfig::new(workers, partition_size).unwrap()
    }

    fn run<T: Send + 'static>(
        items: Vec<T>,
        stages: Vec<Stage<T>>,
        terminal: Terminal<T>,
    ) -> Result<Outcome<T>> {
        evaluate(Origin::Source(Sequence::from_vec(items)), stages, terminal, &config(4, 7))
    }

    #[test]
    fn test_collect_same_multiset() {
        let stages = vec![Stage::filter(|x: &i32| x % 3 == 0), Stage::map(|x| x * 2)];
        let mut items = run((0..1000).collect(), stages, Terminal::Collect)
            .unwrap()
            .into_elements()
            .unwrap();
        items.sort();
        let expected: Vec<i32> = (0..1000).filter(|x| x % 3 == 0).map(|x| x * 2).collect();
        assert_eq!(items, expected);
    }

    #[test]
    fn test_count_and_product() {
        assert_eq!(run((0..1000).collect(), vec![], Terminal::Count).unwrap(), Outcome::Count(1000));

        let product = Terminal::Reduce {
            identity: None,
            op: Arc::new(|a: i64, b: i64| a * b),
        };
        assert_eq!(run(vec![1, 2, 3, 4, 5], vec![], product).unwrap(), Outcome::Element(Some(120)));
    }

    #[test]
    fn test_reduce_identity_applied_once() {
        let sum = Terminal::Reduce {
            identity: Some(0),
            op: Arc::new(|a: i32, b: i32| a + b),
        };
        assert_eq!(run((1..=100).collect(), vec![], sum).unwrap(), Outcome::Element(Some(5050)));

        let empty = Terminal::Reduce {
            identity: Some(7),
            op: Arc::new(|a: i32, b: i32| a + b),
        };
        assert_eq!(run(vec![], vec![], empty).unwrap(), Outcome::Element(Some(7)));
    }

    #[test]
    fn test_reduce_needs_only_associativity() {
        let concat = Terminal::Reduce {
            identity: Some(String::new()),
            op: Arc::new(|a: String, b: String| a + &b),
        };
        let letters: Vec<String> = ('a'..='z').map(String::from).collect();
        let outcome = run(letters, vec![], concat).unwrap();
        assert_eq!(outcome, Outcome::Element(Some("abcdefghijklmnopqrstuvwxyz".to_string())));
    }

    #[test]
    fn test_sort_barrier_then_filter() {
        let stages = vec![
            Stage::map(|x: i32| 100 - x),
            Stage::sort(),
            Stage::filter(|x: &i32| *x > 95),
        ];
        let mut items = run((0..100).collect(), stages, Terminal::Collect)
            .unwrap()
            .into_elements()
            .unwrap();
        items.sort();
        assert_eq!(items, vec![96, 97, 98, 99, 100]);
    }

    #[test]
    fn test_sorted_output_with_single_partition_pass() {
        let outcome = evaluate(
            Origin::Source(Sequence::from_vec(vec![5, 3, 9, 1])),
            vec![Stage::sort()],
            Terminal::Collect,
            &config(1, 100),
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Elements(vec![1, 3, 5, 9]));
    }

    #[test]
    fn test_distinct_barrier() {
        let stages = vec![Stage::map(|x: i32| x % 10), Stage::distinct()];
        let items: HashSet<i32> = run((0..500).collect(), stages, Terminal::Collect)
            .unwrap()
            .into_elements()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(items, (0..10).collect());
    }

    #[test]
    fn test_matches() {
        let any = Terminal::AnyMatch(Arc::new(|x: &i32| *x == 444));
        assert_eq!(run((0..1000).collect(), vec![], any).unwrap(), Outcome::Matched(true));

        let all = Terminal::AllMatch(Arc::new(|x: &i32| *x < 1000));
        assert_eq!(run((0..1000).collect(), vec![], all).unwrap(), Outcome::Matched(true));

        let all_fails = Terminal::AllMatch(Arc::new(|x: &i32| *x < 999));
        assert_eq!(run((0..1000).collect(), vec![], all_fails).unwrap(), Outcome::Matched(false));

        let none = Terminal::NoneMatch(Arc::new(|x: &i32| *x == 10_000));
        assert_eq!(run((0..1000).collect(), vec![], none).unwrap(), Outcome::Matched(true));
    }

    #[test]
    fn test_find_any_on_infinite_source() {
        let source = Sequence::iterate(0u64, |x| x + 1);
        let stages = vec![Stage::filter(|x: &u64| x % 1000 == 999)];
        let outcome = evaluate(Origin::Source(source), stages, Terminal::FindAny, &config(2, 64)).unwrap();
        let found = outcome.into_element().unwrap().unwrap();
        assert_eq!(found % 1000, 999);
    }

    #[test]
    fn test_any_match_stops_dispatching() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let source = Sequence::generate(move || counter.fetch_add(1, Ordering::SeqCst));
        let any = Terminal::AnyMatch(Arc::new(|x: &usize| *x == 5));
        let outcome = evaluate(Origin::Source(source), vec![], any, &config(2, 10)).unwrap();
        assert_eq!(outcome, Outcome::Matched(true));
        assert!(pulled.load(Ordering::SeqCst) < 1000);
    }

    #[test]
    fn test_workers_capped_at_available_parallelism() {
        let pool = WorkerPool::new(&config(10_000, 8)).unwrap();
        assert!(pool.workers <= num_cpus::get().max(1));
        assert_eq!(pool.pool.current_num_threads(), pool.workers);

        let single = WorkerPool::new(&config(1, 8)).unwrap();
        assert_eq!(single.workers, 1);
    }

    #[test]
    fn test_gather_keeps_source_order() {
        let pool = WorkerPool::new(&config(4, 3)).unwrap();
        let source = Origin::Source(Sequence::range(0, 100));
        let gathered = gather(source, vec![Stage::map(|x: i32| x * 2)], &pool).unwrap();
        assert_eq!(gathered, (0..100).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_sort_barrier_is_stable() {
        let pool = WorkerPool::new(&config(4, 5)).unwrap();
        // Key repeats every 4 elements; the position tags equal keys
        let tagged: Vec<(u8, usize)> = (0..200).map(|i| ((i % 4) as u8, i)).collect();
        let stages = vec![Stage::sort_by(|a: &(u8, usize), b: &(u8, usize)| a.0.cmp(&b.0))];
        let sorted: Vec<(u8, usize)> = partitions(Origin::Source(Sequence::from_vec(tagged)), stages, &pool)
            .unwrap()
            .flat_map(|job| job())
            .collect();

        assert_eq!(sorted.len(), 200);
        for pair in sorted.windows(2) {
            assert!(pair[0].0 <= pair[1].0);
            if pair[0].0 == pair[1].0 {
                assert!(pair[0].1 < pair[1].1, "equal keys reordered: {:?}", pair);
            }
        }
    }

    #[test]
    fn test_for_each_with_caller_lock() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let action = Terminal::ForEach(Arc::new(move |x: i32| sink.lock().unwrap().push(x)));
        assert_eq!(run((0..200).collect(), vec![], action).unwrap(), Outcome::Done);
        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_worker_panic_propagates() {
        let result = std::panic::catch_unwind(|| {
            let stages = vec![Stage::map(|x: i32| if x == 50 { panic!("bad element") } else { x })];
            let _ = run((0..100).collect(), stages, Terminal::Count);
        });
        assert!(result.is_err());
    }
}
