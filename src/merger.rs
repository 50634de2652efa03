//! Pairwise wave merger.
//!
//! Sorted runs are combined two at a time on the worker pool: each wave
//! drains the current queue into pair-merge tasks, an odd leftover passes
//! through to the next wave, and the wave's outputs reseed the queue. After
//! ⌈log₂ N⌉ waves a single run remains and is moved onto the output path.
//! Total I/O is O(T log N) bytes for T input bytes over N runs.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use crossbeam_channel;
use log;
use rayon;

use crate::record::{self, Record};
use crate::scratch::{buf_reader, buf_writer, Registry, Scratch};

/// Merges sorted runs into a single totally ordered file at `output_path`.
/// An empty run list produces no output file. Pair outputs are recorded in
/// the registry when their path is allocated, so a failed pair's partial
/// file is still swept by the janitor; the failure itself is surfaced only
/// after the whole wave has been awaited.
pub(crate) fn merge(
    pool: &rayon::ThreadPool,
    scratch: &Scratch,
    runs: Vec<PathBuf>,
    output_path: &Path,
    rw_buf_size: Option<usize>,
    registry: &mut Registry,
) -> io::Result<()> {
    let mut queue = VecDeque::from(runs);
    let mut wave = 0u32;

    loop {
        if queue.len() <= 1 {
            return match queue.pop_front() {
                Some(last) => {
                    log::debug!(
                        "moving final run {} to {}",
                        last.display(),
                        output_path.display()
                    );
                    persist(&last, output_path)
                }
                None => Ok(()),
            };
        }

        wave += 1;
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let mut dispatched = 0usize;
        let mut wave_error: Option<io::Error> = None;

        // invariant: every path in the queue is already registered (by
        // partition or an earlier wave), so runs popped here still reach
        // the janitor when dispatch stops mid-wave
        while queue.len() >= 2 {
            let (a, b) = match (queue.pop_front(), queue.pop_front()) {
                (Some(a), Some(b)) => (a, b),
                _ => break,
            };

            let (out_file, out_path) = match scratch.create_file() {
                Ok(parts) => parts,
                Err(err) => {
                    wave_error = Some(err);
                    break;
                }
            };
            registry.record(out_path.clone());

            let result_tx = result_tx.clone();
            pool.spawn(move || {
                let _ = result_tx.send(merge_pair(&a, &b, out_file, out_path, rw_buf_size));
            });
            dispatched += 1;
        }

        let passed_through = queue.pop_front();
        drop(result_tx);

        log::debug!(
            "merge wave {}: {} pair tasks, {} passed through",
            wave,
            dispatched,
            passed_through.iter().count()
        );

        let mut next_runs = Vec::with_capacity(dispatched + 1);
        for result in result_rx.iter().take(dispatched) {
            match result {
                Ok(path) => next_runs.push(path),
                Err(err) => {
                    if wave_error.is_none() {
                        wave_error = Some(err);
                    }
                }
            }
        }

        if let Some(err) = wave_error {
            return Err(err);
        }

        next_runs.extend(passed_through);
        queue = VecDeque::from(next_runs);
    }
}

/// Streams two sorted runs into a fresh run, always writing the lesser
/// record under the composite ordering and draining the survivor once one
/// side is exhausted. On failure the partially written output stays on disk
/// for the janitor.
fn merge_pair(
    a: &Path,
    b: &Path,
    out_file: fs::File,
    out_path: PathBuf,
    rw_buf_size: Option<usize>,
) -> io::Result<PathBuf> {
    let mut reader_a = RunReader::open(a, rw_buf_size)?;
    let mut reader_b = RunReader::open(b, rw_buf_size)?;
    let mut writer = buf_writer(out_file, rw_buf_size);

    let mut head_a = reader_a.next_record()?;
    let mut head_b = reader_b.next_record()?;

    loop {
        match (head_a.take(), head_b.take()) {
            (Some(ra), Some(rb)) => {
                if record::compare(&ra, &rb) != Ordering::Greater {
                    writeln!(writer, "{}", ra)?;
                    head_a = reader_a.next_record()?;
                    head_b = Some(rb);
                } else {
                    writeln!(writer, "{}", rb)?;
                    head_a = Some(ra);
                    head_b = reader_b.next_record()?;
                }
            }
            (Some(ra), None) => {
                writeln!(writer, "{}", ra)?;
                head_a = reader_a.next_record()?;
            }
            (None, Some(rb)) => {
                writeln!(writer, "{}", rb)?;
                head_b = reader_b.next_record()?;
            }
            (None, None) => break,
        }
    }
    writer.flush()?;

    log::debug!(
        "merged {} and {} into {}",
        a.display(),
        b.display(),
        out_path.display()
    );
    return Ok(out_path);
}

/// Lazily yields records from a sorted run.
struct RunReader {
    lines: io::Lines<io::BufReader<fs::File>>,
}

impl RunReader {
    fn open(path: &Path, buf_size: Option<usize>) -> io::Result<RunReader> {
        let file = fs::File::open(path)?;
        return Ok(RunReader {
            lines: buf_reader(file, buf_size).lines(),
        });
    }

    fn next_record(&mut self) -> io::Result<Option<Record>> {
        match self.lines.next() {
            Some(line) => Ok(Some(Record::parse(&line?))),
            None => Ok(None),
        }
    }
}

/// Moves the final run onto the output path. Renaming fails across
/// filesystems, in which case the run is copied and the original removed.
fn persist(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to)?;
    fs::remove_file(from)?;
    return Ok(());
}
