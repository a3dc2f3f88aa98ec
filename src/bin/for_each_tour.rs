//! External iteration vs `for_each` with closures and reusable consumers.
//!
//! Run with: cargo run --bin for_each_tour

use lazy_pipeline::{logging, Sequence};
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Business logic kept apart from the iteration that drives it.
trait Consumer<T>: Send + Sync {
    fn accept(&self, item: T);
}

struct LabelPrinter {
    label: &'static str,
}

impl Consumer<i32> for LabelPrinter {
    fn accept(&self, item: i32) {
        println!("{} Value::{}", self.label, item);
    }
}

/// A consumer with state, safe to share with worker threads.
#[derive(Default)]
struct Summer {
    total: AtomicU64,
}

impl Consumer<i32> for Summer {
    fn accept(&self, item: i32) {
        self.total.fetch_add(item as u64, Ordering::Relaxed);
    }
}

fn consume_with<C>(consumer: Arc<C>) -> impl Fn(i32) + Send + Sync + 'static
where
    C: Consumer<i32> + 'static,
{
    move |item| consumer.accept(item)
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    println!("=== External Iteration ===\n");

    let my_list: Vec<i32> = (0..10).collect();
    for i in my_list.iter() {
        println!("Iterator Value::{}", i);
    }

    println!("\n=== for_each With a Closure ===\n");

    Sequence::from_vec(my_list.clone())
        .pipeline()
        .for_each(|t| println!("for_each closure Value::{}", t))?;

    println!("\n=== for_each With a Reusable Consumer ===\n");

    let printer = Arc::new(LabelPrinter { label: "Consumer impl" });
    Sequence::from_vec(my_list.clone())
        .pipeline()
        .for_each(consume_with(Arc::clone(&printer)))?;

    // Same consumer type, different driver
    my_list.iter().copied().for_each(|t| printer.accept(t));

    println!("\n=== Stateful Consumer on Worker Threads ===\n");

    let summer = Arc::new(Summer::default());
    Sequence::range(0, 1_000)
        .parallel_pipeline()
        .for_each(consume_with(Arc::clone(&summer)))?;
    println!("sum of 0..1000 = {}", summer.total.load(Ordering::Relaxed));

    Ok(())
}
