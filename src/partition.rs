//! Input partitioning: slice the input into fixed-size chunks, sort each
//! chunk on the worker pool and persist it as an independent sorted run.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use crossbeam_channel;
use log;
use rayon;

use crate::record::{self, Record};
use crate::scratch::{buf_writer, Registry, Scratch};

/// Streams `input_path` into chunks of at most `chunk_size` lines and
/// dispatches one sort-and-write task per chunk. The reader keeps slicing
/// while earlier chunks sort in the background; after end-of-stream every
/// dispatched task is awaited. Returns the produced run paths in completion
/// order.
///
/// A failed chunk task removes its own partial file and its error is
/// surfaced only after all sibling tasks have reported, so every surviving
/// run path reaches the registry.
pub(crate) fn partition(
    pool: &rayon::ThreadPool,
    scratch: &Scratch,
    input_path: &Path,
    chunk_size: usize,
    rw_buf_size: Option<usize>,
    registry: &mut Registry,
) -> io::Result<Vec<PathBuf>> {
    let chunk_size = chunk_size.max(1);
    let mut lines = io::BufReader::new(fs::File::open(input_path)?).lines();

    let (result_tx, result_rx) = crossbeam_channel::unbounded();
    let mut dispatched = 0usize;
    let mut read_error = None;

    loop {
        let (records, at_end) = match next_chunk(&mut lines, chunk_size) {
            Ok(chunk) => chunk,
            Err(err) => {
                read_error = Some(err);
                break;
            }
        };

        if !records.is_empty() {
            let scratch = scratch.clone();
            let result_tx = result_tx.clone();
            pool.spawn(move || {
                // the receiver only disappears once every task was awaited
                let _ = result_tx.send(write_sorted_run(records, &scratch, rw_buf_size));
            });
            dispatched += 1;
        }

        if at_end {
            break;
        }
    }
    drop(result_tx);

    let mut run_paths = Vec::with_capacity(dispatched);
    let mut task_error = None;
    for result in result_rx.iter().take(dispatched) {
        match result {
            Ok(path) => {
                registry.record(path.clone());
                run_paths.push(path);
            }
            Err(err) => {
                if task_error.is_none() {
                    task_error = Some(err);
                }
            }
        }
    }

    if let Some(err) = read_error.or(task_error) {
        return Err(err);
    }

    log::debug!(
        "partitioned {} into {} sorted runs",
        input_path.display(),
        run_paths.len()
    );
    return Ok(run_paths);
}

/// Collects the next chunk: up to `chunk_size` non-empty lines. A blank
/// line terminates the chunk early. The second value reports whether the
/// input is exhausted.
fn next_chunk(
    lines: &mut io::Lines<io::BufReader<fs::File>>,
    chunk_size: usize,
) -> io::Result<(Vec<Record>, bool)> {
    let mut records = Vec::with_capacity(chunk_size.min(1024));

    while records.len() < chunk_size {
        match lines.next() {
            None => return Ok((records, true)),
            Some(line) => {
                let line = line?;
                if line.trim().is_empty() {
                    break;
                }
                records.push(Record::parse(&line));
            }
        }
    }

    return Ok((records, false));
}

/// Chunk task body: sort the records in place and persist them as a run.
/// A partially written file is removed before the error is reported.
fn write_sorted_run(
    mut records: Vec<Record>,
    scratch: &Scratch,
    rw_buf_size: Option<usize>,
) -> io::Result<PathBuf> {
    records.sort_unstable_by(record::compare);

    let (file, path) = scratch.create_file()?;
    match dump(file, records, rw_buf_size) {
        Ok(lines) => {
            log::debug!("wrote sorted run {} ({} lines)", path.display(), lines);
            Ok(path)
        }
        Err(err) => {
            let _ = fs::remove_file(&path);
            Err(err)
        }
    }
}

fn dump(file: fs::File, records: Vec<Record>, rw_buf_size: Option<usize>) -> io::Result<usize> {
    let mut writer = buf_writer(file, rw_buf_size);
    let lines = records.len();

    for record in records {
        writeln!(writer, "{}", record)?;
    }
    writer.flush()?;

    return Ok(lines);
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    use rstest::*;

    use crate::record::{self, Record};
    use crate::scratch::{Registry, Scratch};

    use super::partition;

    #[fixture]
    fn pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn write_input(dir: &Path, lines: &[&str]) -> PathBuf {
        let path = dir.join("input.txt");
        let mut body = lines.join("\n");
        if !lines.is_empty() {
            body.push('\n');
        }
        fs::write(&path, body).unwrap();
        path
    }

    fn read_lines(path: &Path) -> Vec<String> {
        let body = fs::read_to_string(path).unwrap();
        Vec::from_iter(body.lines().map(str::to_owned))
    }

    fn is_sorted(lines: &[String]) -> bool {
        lines.windows(2).all(|pair| {
            record::compare(&Record::parse(&pair[0]), &Record::parse(&pair[1])).is_le()
        })
    }

    #[rstest]
    fn test_empty_input_produces_no_runs(pool: rayon::ThreadPool, tmp_dir: tempfile::TempDir) {
        let scratch = Scratch::new(Some(tmp_dir.path())).unwrap();
        let input = write_input(tmp_dir.path(), &[]);
        let mut registry = Registry::new();

        let runs = partition(&pool, &scratch, &input, 2, None, &mut registry).unwrap();

        assert!(runs.is_empty());
        assert!(registry.paths().is_empty());
    }

    #[rstest]
    fn test_runs_are_sorted_and_bounded(pool: rayon::ThreadPool, tmp_dir: tempfile::TempDir) {
        let scratch = Scratch::new(Some(tmp_dir.path())).unwrap();
        let input = write_input(
            tmp_dir.path(),
            &["5. Five", "3. Three", "4. Four", "1. One", "2. Two"],
        );
        let mut registry = Registry::new();

        let runs = partition(&pool, &scratch, &input, 2, None, &mut registry).unwrap();

        assert_eq!(runs.len(), 3);
        assert_eq!(registry.paths().len(), 3);

        let mut all_lines = Vec::new();
        let mut run_sizes = Vec::new();
        for run in &runs {
            let lines = read_lines(run);
            assert!(lines.len() <= 2, "chunk bound exceeded: {:?}", lines);
            assert!(is_sorted(&lines), "run not sorted: {:?}", lines);
            run_sizes.push(lines.len());
            all_lines.extend(lines);
        }

        run_sizes.sort_unstable();
        assert_eq!(run_sizes, vec![1, 2, 2]);

        all_lines.sort_unstable();
        assert_eq!(
            all_lines,
            vec!["1. One", "2. Two", "3. Three", "4. Four", "5. Five"]
        );
    }

    #[rstest]
    fn test_blank_line_ends_chunk_early(pool: rayon::ThreadPool, tmp_dir: tempfile::TempDir) {
        let scratch = Scratch::new(Some(tmp_dir.path())).unwrap();
        let input = write_input(tmp_dir.path(), &["3. Three", "", "1. One", "2. Two"]);
        let mut registry = Registry::new();

        let runs = partition(&pool, &scratch, &input, 10, None, &mut registry).unwrap();

        let mut run_sizes = Vec::from_iter(runs.iter().map(|run| read_lines(run).len()));
        run_sizes.sort_unstable();
        assert_eq!(run_sizes, vec![1, 2]);
    }

    #[rstest]
    fn test_consecutive_blank_lines_are_skipped(
        pool: rayon::ThreadPool,
        tmp_dir: tempfile::TempDir,
    ) {
        let scratch = Scratch::new(Some(tmp_dir.path())).unwrap();
        let input = write_input(tmp_dir.path(), &["2. Two", "", "", "   ", "1. One"]);
        let mut registry = Registry::new();

        let runs = partition(&pool, &scratch, &input, 10, None, &mut registry).unwrap();

        assert_eq!(runs.len(), 2);
    }

    #[rstest]
    fn test_missing_input_fails(pool: rayon::ThreadPool, tmp_dir: tempfile::TempDir) {
        let scratch = Scratch::new(Some(tmp_dir.path())).unwrap();
        let mut registry = Registry::new();

        let result = partition(
            &pool,
            &scratch,
            &tmp_dir.path().join("absent.txt"),
            2,
            None,
            &mut registry,
        );

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert!(registry.paths().is_empty());
    }
}
