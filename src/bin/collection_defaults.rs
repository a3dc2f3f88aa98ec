//! In-place collection updates next to their pipeline equivalents.
//!
//! Run with: cargo run --bin collection_defaults

use dashmap::DashMap;
use lazy_pipeline::{logging, Sequence};
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    println!("=== retain (remove matching) ===\n");

    let mut numbers: Vec<i32> = (1..=10).collect();
    numbers.retain(|n| n % 3 != 0);
    println!("in place:  {:?}", numbers);

    let kept = Sequence::range_closed(1, 10).pipeline().filter(|n| n % 3 != 0)?.to_vec()?;
    println!("pipeline:  {:?}", kept);
    assert_eq!(numbers, kept);

    println!("\n=== replace all ===\n");

    let mut names = vec!["pankaj".to_string(), "david".to_string(), "lisa".to_string()];
    names.iter_mut().for_each(|name| *name = name.to_uppercase());
    println!("in place:  {:?}", names);

    let upper = Sequence::of(["pankaj", "david", "lisa"].map(String::from))
        .pipeline()
        .map(|name| name.to_uppercase())?
        .to_vec()?;
    println!("pipeline:  {:?}", upper);

    // Finish an iterator that was already advanced
    let mut cursor = names.into_iter();
    let first = cursor.next();
    print!("first = {:?}, remaining =", first);
    cursor.for_each(|name| print!(" {}", name));
    println!();

    println!("\n=== Map compute / merge ===\n");

    let text = "the quick brown fox jumps over the lazy dog the end";

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in text.split_whitespace() {
        *counts.entry(word).or_insert(0) += 1;
    }
    println!("entry().or_insert: the = {}", counts["the"]);

    // compute: rewrite an existing value, drop it when the function says so
    counts.entry("fox").and_modify(|n| *n *= 10);
    if let Some(n) = counts.get_mut("dog") {
        *n = 0;
    }
    counts.retain(|_, n| *n > 0);
    println!("after compute: fox = {:?}, dog = {:?}", counts.get("fox"), counts.get("dog"));

    let merged = Sequence::new(text.split_whitespace().map(String::from).collect::<Vec<_>>())
        .pipeline()
        .to_map_merging(|w| w.clone(), |_| 1usize, |a, b| a + b)?;
    println!("to_map_merging: the = {}", merged["the"]);

    let by_length = Sequence::new(text.split_whitespace().map(String::from).collect::<Vec<_>>())
        .pipeline()
        .distinct()?
        .group_by(|w| w.len())?;
    let mut lengths: Vec<_> = by_length.into_iter().collect();
    lengths.sort();
    println!("group_by(len): {:?}", lengths);

    println!("\n=== Concurrent merge ===\n");

    let shared: Arc<DashMap<String, usize>> = Arc::new(DashMap::new());
    let sink = Arc::clone(&shared);
    Sequence::new(format!("{text} ").repeat(1_000).split_whitespace().map(String::from).collect::<Vec<_>>())
        .parallel_pipeline()
        .for_each(move |word| {
            *sink.entry(word).or_insert(0) += 1;
        })?;
    let the = shared.get("the").map(|n| *n).unwrap_or(0);
    println!("DashMap from worker threads: the = {}", the);
    assert_eq!(the, 3_000);

    Ok(())
}
