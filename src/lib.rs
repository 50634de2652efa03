//! `wavesort` is an external merge sorter for line-oriented text files that
//! do not fit in memory.
//!
//! Input lines have the shape `N. W1 W2 … Wk`: an integer prefix followed
//! by a dot and a space, then whitespace-separated words. Lines are ordered
//! by the word suffix first and the numeric prefix as tie-breaker, both
//! compared byte-ordinally.
//!
//! Sorting happens in two phases sharing one worker pool:
//!
//! * **Partitioning** streams the input in fixed-size chunks, sorts every
//!   chunk concurrently and persists each as an independent sorted run.
//! * **Merging** combines the runs pairwise in concurrent waves until a
//!   single file remains, which is moved onto the output path.
//!
//! Every intermediate file is tracked and removed when the run finishes,
//! whether it succeeded or failed. An existing output file is never
//! overwritten.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use env_logger;
//! use log;
//!
//! use wavesort::SorterBuilder;
//!
//! fn main() {
//!     env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();
//!
//!     let sorter = SorterBuilder::new()
//!         .with_chunk_size(10_000)
//!         .with_tmp_dir(Path::new("./"))
//!         .build()
//!         .unwrap();
//!
//!     match sorter.sort(Path::new("input.txt"), None).unwrap() {
//!         Some(output) => println!("sorted into {}", output.display()),
//!         None => println!("input holds no lines"),
//!     }
//! }
//! ```

pub mod generate;
pub mod record;
pub mod sort;

mod cleanup;
mod merger;
mod partition;
mod scratch;

pub use record::Record;
pub use sort::{SortError, Sorter, SorterBuilder, DEFAULT_CHUNK_SIZE};
