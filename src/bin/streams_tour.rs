//! Tour of pipeline creation, stages and terminal operations.
//!
//! Run with: cargo run --bin streams_tour

use colored::Colorize;
use lazy_pipeline::{logging, PipelineError, Sequence};
use std::cmp::Reverse;
use std::error::Error;
use std::sync::{Arc, Mutex};

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    println!("=== Creating Pipelines ===\n");

    let my_list: Vec<i32> = (0..100).collect();
    let sequential = Sequence::from_vec(my_list.clone()).pipeline();
    let parallel = Sequence::from_vec(my_list).parallel_pipeline();
    println!("sequential view: {:?}", sequential);
    println!("parallel view:   {:?}", parallel);

    let abc: Vec<String> = Sequence::generate(|| "abc".to_string()).limit(3).pipeline().to_vec()?;
    println!("generate(\"abc\").limit(3) = {:?}", abc);

    let powers: Vec<u64> = Sequence::iterate(1u64, |n| n * 2).limit(8).pipeline().to_vec()?;
    println!("iterate(1, n * 2).limit(8) = {:?}", powers);

    let chars = Sequence::chars("abc").pipeline().map(|c| c.to_ascii_uppercase())?.to_vec()?;
    println!("chars(\"abc\") uppercased = {:?}", chars);

    println!("\n=== Collecting ===\n");

    let int_list = Sequence::of([1, 2, 3, 4]).pipeline().to_vec()?;
    println!("to_vec: {:?}", int_list);

    let int_map = Sequence::of([1, 2, 3, 4]).pipeline().to_map(|i| *i, |i| i + 10)?;
    let mut entries: Vec<_> = int_map.into_iter().collect();
    entries.sort();
    println!("to_map(i -> i + 10): {:?}", entries);

    let int_array: [i32; 4] = Sequence::of([1, 2, 3, 4])
        .pipeline()
        .to_vec()?
        .try_into()
        .map_err(|v: Vec<i32>| format!("expected 4 elements, got {}", v.len()))?;
    println!("to array: {:?}", int_array);

    let dup = Sequence::of([1, 2, 1]).pipeline().to_map(|i| *i, |i| i);
    match dup {
        Err(e @ PipelineError::DuplicateKey { .. }) => println!("{} {}", "to_map collision:".yellow(), e),
        other => println!("unexpected: {:?}", other),
    }
    let merged = Sequence::of([1, 2, 1]).pipeline().to_map_merging(|i| *i, |i| i, |a, b| a + b)?;
    println!("to_map_merging(a + b) of [1, 2, 1] -> key 1 = {}", merged[&1]);

    println!("\n=== Filter / Map / Sorted ===\n");

    let high_nums = sequential.filter(|p| *p > 90)?;
    print!("High nums greater than 90 = ");
    high_nums.for_each(|p| print!("{} ", p))?;
    println!();

    let upper = Sequence::of(["aBc", "d", "ef"].map(String::from))
        .pipeline()
        .map(|s| s.to_uppercase())?
        .to_vec()?;
    println!("map(to_uppercase): {:?}", upper);

    let names = || Sequence::of(["aBc", "d", "ef", "123456"].map(String::from)).pipeline();
    let reverse_sorted = names().sorted_by_key(|s| Reverse(s.clone()))?.to_vec()?;
    println!("reverse sorted: {:?}", reverse_sorted);
    let natural_sorted = names().sorted()?.to_vec()?;
    println!("natural sorted: {:?}", natural_sorted);

    println!("\n=== Flat Map ===\n");

    let nested = Sequence::of([vec!["Pankaj"], vec!["David", "Lisa"], vec!["Amit"]]).pipeline();
    let flat = nested.flat_map_into(|names| names.into_iter().map(String::from))?;
    flat.for_each(|name| println!("{}", name))?;

    println!("\n=== Reduce / Count / Matches ===\n");

    let product = Sequence::of([1, 2, 3, 4, 5]).pipeline().reduce(|i, j| i * j)?;
    if let Some(product) = product {
        println!("Multiplication = {}", product);
    }
    println!("Number of elements = {}", Sequence::of([1, 2, 3, 4, 5]).pipeline().count()?);

    let numbers = || Sequence::of([1, 2, 3, 4, 5]).pipeline();
    print!("for_each: ");
    numbers().for_each(|i| print!("{},", i))?;
    println!();
    println!("contains 4? {}", numbers().any_match(|i| *i == 4)?);
    println!("all less than 10? {}", numbers().all_match(|i| *i < 10)?);
    println!("doesn't contain 10? {}", numbers().none_match(|i| *i == 10)?);

    let first_d = Sequence::of(["Pankaj", "Amit", "David", "Lisa"])
        .pipeline()
        .filter(|name| name.starts_with('D'))?
        .find_first()?;
    if let Some(name) = first_d {
        println!("First name starting with D = {}", name);
    }

    println!("\n=== Single Use ===\n");

    let once = Sequence::of([1, 2, 3]).pipeline();
    println!("first count: {}", once.count()?);
    match once.count() {
        Err(e) if e.is_consumed() => println!("{} {}", "second count:".red(), e),
        other => println!("unexpected: {:?}", other),
    }
    match Sequence::of([1, 2, 3]).parallel_pipeline().find_first() {
        Err(e) => println!("{} {}", "parallel find_first:".red(), e),
        Ok(v) => println!("unexpected: {:?}", v),
    }

    println!("\n=== Shared State From Workers ===\n");

    // Capping a shared list from inside a parallel stage is caller misuse: which
    // ten elements land in it depends on scheduling. Guard it with a lock and
    // expect a different selection from run to run.
    let result = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&result);
    Sequence::range_closed(1, 15).parallel_pipeline().for_each(move |s| {
        let mut guard = sink.lock().unwrap_or_else(|e| e.into_inner());
        if guard.len() < 10 {
            guard.push(s);
        }
    })?;
    let kept = result.lock().unwrap_or_else(|e| e.into_inner()).clone();
    println!("kept {} of 15: {:?}", kept.len(), kept);

    println!("\n{}", "Done".green());
    Ok(())
}
