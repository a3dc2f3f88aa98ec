//! # Lazy Pipelines
//!
//! Composable, lazily evaluated pipelines over finite or infinite sequences,
//! evaluated either in order on the calling thread or across a fixed pool of
//! worker threads.
//!
//! ## Building Blocks
//!
//! 1. **Sources** ([`Sequence`])
//!    - Literal values, vectors and ranges
//!    - Infinite `generate` / `iterate` sources
//!    - Lines of a reader or file, directory listings and recursive walks
//!
//! 2. **Stages** ([`Stage`])
//!    - `filter`, `map`, `flat_map`
//!    - Barrier stages: `sorted` (stable) and `distinct` (keeps first)
//!
//! 3. **Terminal operations** ([`Terminal`])
//!    - Collect, count, reduce/fold, min/max
//!    - Short-circuiting `any_match`, `all_match`, `none_match`, `find_first`, `find_any`
//!    - `for_each` and the map/set/group collectors
//!
//! 4. **Evaluation modes** ([`Mode`])
//!    - Sequential: encounter order, calling thread
//!    - Concurrent: partitions run on a `rayon` pool sized by [`PipelineConfig`]
//!
//! 5. **Date and time helpers** ([`temporal`])
//!
//! ```
//! use lazy_pipeline::Sequence;
//!
//! let high: Vec<i32> = Sequence::range(0, 100)
//!     .pipeline()
//!     .filter(|p| *p > 90)?
//!     .to_vec()?;
//! assert_eq!(high, (91..=99).collect::<Vec<_>>());
//! # Ok::<(), lazy_pipeline::PipelineError>(())
//! ```
//!
//! ## Running Examples
//!
//! ```bash
//! cargo run --bin streams_tour
//! cargo run --bin parallel_vs_sequential
//! cargo run --bin for_each_tour
//! cargo run --bin date_time_tour
//! cargo run --bin date_time_utilities
//! cargo run --bin io_streams_tour
//! cargo run --bin collection_defaults
//!
//! # with library logging
//! RUST_LOG=lazy_pipeline=debug cargo run --bin parallel_vs_sequential
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod sequence;
pub mod stage;
pub mod temporal;
pub mod terminal;

mod concurrent;
mod sequential;

pub use config::{ConfigError, PipelineConfig};
pub use error::{PipelineError, Result, TemporalError};
pub use pipeline::{Mode, Pipeline};
pub use sequence::Sequence;
pub use stage::Stage;
pub use terminal::{Outcome, Terminal};
