//! Timing the same pipeline in both evaluation modes.
//!
//! Run with: cargo run --release --bin parallel_vs_sequential
//! Tune with LAZY_PIPELINE_WORKERS / LAZY_PIPELINE_PARTITION_SIZE.

use colored::Colorize;
use lazy_pipeline::{logging, PipelineConfig, Sequence};
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::error::Error;
use std::time::Instant;

const SIZE: u64 = 20_000_000;

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let config = PipelineConfig::from_env()?;
    println!("=== Parallel vs Sequential ===\n");
    println!(
        "workers = {}, partition_size = {}",
        config.workers, config.partition_size
    );

    let start = Instant::now();
    let my_list: Vec<u64> = (0..SIZE).collect();
    println!("building {} elements: {:?}", SIZE, start.elapsed());

    // Filter + count
    println!("\n=== filter(p > 1).count() ===");

    let start = Instant::now();
    let seq_count = Sequence::from_vec(my_list.clone())
        .pipeline()
        .filter(|p| *p > 1)?
        .count()?;
    let seq_time = start.elapsed();
    println!("sequential: {} in {:?}", seq_count, seq_time);

    let start = Instant::now();
    let par_count = Sequence::from_vec(my_list)
        .parallel_pipeline()
        .with_config(config.clone())?
        .filter(|p| *p > 1)?
        .count()?;
    let par_time = start.elapsed();
    println!("parallel:   {} in {:?}", par_count, par_time);

    assert_eq!(seq_count, par_count);
    println!("Speedup: {:.2}x", seq_time.as_secs_f64() / par_time.as_secs_f64());

    // Heavier per-element work shows the pool better
    println!("\n=== map(collatz_steps).reduce(max) ===");

    let collatz_steps = |mut n: u64| {
        let mut steps = 0;
        while n > 1 {
            n = if n % 2 == 0 { n / 2 } else { 3 * n + 1 };
            steps += 1;
        }
        steps
    };

    let start = Instant::now();
    let seq_max = Sequence::range(1, 2_000_000u64)
        .pipeline()
        .map(collatz_steps)?
        .reduce(u64::max)?;
    let seq_time = start.elapsed();

    let start = Instant::now();
    let par_max = Sequence::range(1, 2_000_000u64)
        .parallel_pipeline()
        .with_config(config.clone())?
        .map(collatz_steps)?
        .reduce(u64::max)?;
    let par_time = start.elapsed();

    println!("sequential: {:?} in {:?}", seq_max, seq_time);
    println!("parallel:   {:?} in {:?}", par_max, par_time);
    assert_eq!(seq_max, par_max);

    // Sorting is a barrier: every partition is gathered first
    println!("\n=== sorted() over shuffled data ===");

    let mut shuffled: Vec<u64> = (0..2_000_000).collect();
    shuffled.shuffle(&mut thread_rng());

    let start = Instant::now();
    let seq_sorted = Sequence::from_vec(shuffled.clone()).pipeline().sorted()?.to_vec()?;
    let seq_time = start.elapsed();

    let start = Instant::now();
    let par_sorted = Sequence::from_vec(shuffled)
        .parallel_pipeline()
        .with_config(config)?
        .sorted()?
        .to_vec()?;
    let par_time = start.elapsed();

    println!("sequential: {:?}", seq_time);
    println!("parallel:   {:?}", par_time);

    // Sorted partitions come back in completion order
    let in_order = par_sorted.windows(2).all(|w| w[0] <= w[1]);
    println!("parallel output in order? {}", in_order);
    let mut par_sorted = par_sorted;
    par_sorted.sort_unstable();
    assert_eq!(seq_sorted, par_sorted);

    println!("\n{}", "Results match".green());
    Ok(())
}
