//! Ordered evaluation on the calling thread.

use crate::error::Result;
use crate::pipeline::Origin;
use crate::stage::{chain, BoxIter, Stage};
use crate::terminal::{Outcome, Terminal};

/// Builds the lazy element chain for `origin` followed by `stages`.
pub(crate) fn elements<T: Send + 'static>(origin: Origin<T>, stages: &[Stage<T>]) -> BoxIter<T> {
    let source = match origin {
        Origin::Source(sequence) => sequence.into_boxed_iter(),
        Origin::Linked(upstream) => upstream.into_elements(),
    };
    chain(stages, source)
}

pub(crate) fn evaluate<T: Send + 'static>(
    origin: Origin<T>,
    stages: &[Stage<T>],
    terminal: Terminal<T>,
) -> Result<Outcome<T>> {
    let mut iter = elements(origin, stages);

    let outcome = match terminal {
        Terminal::Collect => Outcome::Elements(iter.collect()),
        Terminal::Count => Outcome::Count(iter.count()),
        Terminal::Reduce { identity: None, op } => Outcome::Element(iter.reduce(|a, b| op(a, b))),
        Terminal::Reduce {
            identity: Some(identity),
            op,
        } => Outcome::Element(Some(iter.fold(identity, |a, b| op(a, b)))),
        Terminal::AnyMatch(predicate) => Outcome::Matched(iter.any(|item| predicate(&item))),
        Terminal::AllMatch(predicate) => Outcome::Matched(iter.all(|item| predicate(&item))),
        Terminal::NoneMatch(predicate) => Outcome::Matched(!iter.any(|item| predicate(&item))),
        Terminal::FindFirst | Terminal::FindAny => Outcome::Element(iter.next()),
        Terminal::ForEach(action) => {
            iter.for_each(|item| action(item));
            Outcome::Done
        }
    };

    Ok(outcome)
}
