//! Sources a pipeline can pull elements from.
//!
//! Every constructor is lazy: nothing is produced until an evaluator pulls.
//! `generate` and `iterate` never end on their own, so pair them with
//! [`Sequence::limit`] or a short-circuiting terminal operation.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::ops::{Range, RangeInclusive};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::stage::BoxIter;

pub struct Sequence<T> {
    iter: BoxIter<T>,
}

impl<T: Send + 'static> Sequence<T> {
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self {
            iter: Box::new(items.into_iter()),
        }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self::new(items)
    }

    pub fn of<const N: usize>(items: [T; N]) -> Self {
        Self::new(items)
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Infinite: calls `supplier` once per element.
    pub fn generate<F>(supplier: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        Self::new(std::iter::repeat_with(supplier))
    }

    /// Infinite: `seed`, `next(seed)`, `next(next(seed))`, ...
    ///
    /// `next` runs only when the following element is pulled, so a capped
    /// sequence never computes the successor of its last element.
    pub fn iterate<F>(seed: T, mut next: F) -> Self
    where
        T: Clone,
        F: FnMut(&T) -> T + Send + 'static,
    {
        let mut seed = Some(seed);
        let mut prev: Option<T> = None;
        Self::new(std::iter::from_fn(move || {
            let item = match prev.take() {
                Some(prev) => next(&prev),
                None => seed.take()?,
            };
            prev = Some(item.clone());
            Some(item)
        }))
    }

    /// `start` inclusive, `end` exclusive.
    pub fn range(start: T, end: T) -> Self
    where
        Range<T>: Iterator<Item = T> + Send + 'static,
    {
        Self::new(start..end)
    }

    pub fn range_closed(start: T, end: T) -> Self
    where
        RangeInclusive<T>: Iterator<Item = T> + Send + 'static,
    {
        Self::new(start..=end)
    }

    /// Caps the source at `max` elements.
    pub fn limit(self, max: usize) -> Self {
        Self {
            iter: Box::new(self.iter.take(max)),
        }
    }

    pub fn pipeline(self) -> Pipeline<T> {
        Pipeline::new(self)
    }

    pub fn parallel_pipeline(self) -> Pipeline<T> {
        Pipeline::new(self).into_parallel()
    }

    pub(crate) fn into_boxed_iter(self) -> BoxIter<T> {
        self.iter
    }

    /// Pulls up to `size` elements; an empty vec means the source is drained.
    pub(crate) fn next_partition(&mut self, size: usize) -> Vec<T> {
        self.iter.by_ref().take(size).collect()
    }
}

impl<T: Send + 'static> From<Vec<T>> for Sequence<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl Sequence<char> {
    pub fn chars(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut at = 0;
        Self::new(std::iter::from_fn(move || {
            let c = text[at..].chars().next()?;
            at += c.len_utf8();
            Some(c)
        }))
    }
}

impl Sequence<String> {
    /// Lines of `reader`. Reading stops at the first I/O error.
    pub fn lines<R>(reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self::new(reader.lines().map_while(std::result::Result::ok))
    }

    pub fn file_lines(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::lines(BufReader::new(file)))
    }
}

impl Sequence<PathBuf> {
    /// Entries of one directory, not recursive. Unreadable entries are skipped.
    pub fn list_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let entries = fs::read_dir(dir.as_ref())?;
        Ok(Self::new(
            entries.filter_map(std::result::Result::ok).map(|entry| entry.path()),
        ))
    }

    /// Every path under `root`, `root` included, depth first.
    pub fn walk(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::metadata(root)?;
        Ok(Self::new(
            WalkDir::new(root)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .map(|entry| entry.into_path()),
        ))
    }
}
