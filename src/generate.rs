//! Synthetic input generation.
//!
//! Fabricates `N. W1 W2 … Wk` lines on a producer thread and hands them to
//! the writing thread through a bounded channel, so the producer blocks
//! whenever the writer falls `channel_capacity` lines behind.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::Path;
use std::thread;

use crossbeam_channel;
use log;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Word bank the generator draws from. Every entry is eligible.
pub const WORD_BANK: [&str; 9] = [
    "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine",
];

/// Generator configuration.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Exact number of lines to emit.
    pub line_count: u64,
    /// Exclusive upper bound of the numeric line prefix.
    pub max_line_number: u64,
    /// Exclusive upper bound of words per line; every line carries at
    /// least one word, so this must be at least 2.
    pub max_words_per_line: usize,
    /// Capacity of the bounded channel between producer and writer.
    pub channel_capacity: usize,
    /// Seed for reproducible output. Entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        GenerateConfig {
            line_count: 1000,
            max_line_number: 100,
            max_words_per_line: 10,
            channel_capacity: 64,
            seed: None,
        }
    }
}

impl GenerateConfig {
    fn validate(&self) -> io::Result<()> {
        if self.max_line_number < 1 {
            return Err(invalid("max_line_number must be at least 1"));
        }
        if self.max_words_per_line < 2 {
            return Err(invalid("max_words_per_line must be at least 2"));
        }
        if self.channel_capacity < 1 {
            return Err(invalid("channel_capacity must be at least 1"));
        }
        return Ok(());
    }
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}

/// Writes exactly `config.line_count` generated lines to `path`.
pub fn write_file(path: &Path, config: &GenerateConfig) -> io::Result<()> {
    config.validate()?;

    let mut writer = io::BufWriter::new(fs::File::create(path)?);
    let (line_tx, line_rx) = crossbeam_channel::bounded::<String>(config.channel_capacity);

    let producer = {
        let config = config.clone();
        thread::spawn(move || {
            let mut rng = match config.seed {
                Some(seed) => SmallRng::seed_from_u64(seed),
                None => SmallRng::from_entropy(),
            };
            for _ in 0..config.line_count {
                // a send fails only when the writer hung up on an I/O error
                if line_tx.send(build_line(&mut rng, &config)).is_err() {
                    break;
                }
            }
        })
    };

    let mut written = 0u64;
    let mut write_result = Ok(());
    for line in line_rx.iter() {
        if let Err(err) = writeln!(writer, "{}", line) {
            write_result = Err(err);
            break;
        }
        written += 1;
    }

    drop(line_rx);
    producer
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "line producer thread panicked"))?;
    write_result?;
    writer.flush()?;

    log::info!("generated {} lines into {}", written, path.display());
    return Ok(());
}

/// Builds one `N. W1 … Wk` line.
fn build_line(rng: &mut SmallRng, config: &GenerateConfig) -> String {
    let number = rng.gen_range(0..config.max_line_number);
    let word_count = rng.gen_range(1..config.max_words_per_line);

    let mut line = format!("{}.", number);
    for _ in 0..word_count {
        line.push(' ');
        line.push_str(WORD_BANK[rng.gen_range(0..WORD_BANK.len())]);
    }

    return line;
}
