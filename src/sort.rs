//! Sort orchestration.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};

use log;
use rayon;

use crate::cleanup;
use crate::merger;
use crate::partition;
use crate::scratch::{Registry, Scratch};

/// Number of lines sorted in memory at once unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// The input path does not exist or is not a regular file.
    InvalidInput(PathBuf),
    /// The output path already exists; the sorter never overwrites.
    OutputExists(PathBuf),
    /// Temporary directory or file creation error.
    TempDir(io::Error),
    /// Workers thread pool initialization error.
    ThreadPoolBuildError(rayon::ThreadPoolBuildError),
    /// I/O failure while partitioning the input into sorted runs.
    Partition(io::Error),
    /// I/O failure while merging sorted runs into the output.
    Merge(io::Error),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::InvalidInput(_) => None,
            SortError::OutputExists(_) => None,
            SortError::TempDir(err) => Some(err),
            SortError::ThreadPoolBuildError(err) => Some(err),
            SortError::Partition(err) => Some(err),
            SortError::Merge(err) => Some(err),
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::InvalidInput(path) => write!(f, "input file {} not found", path.display()),
            SortError::OutputExists(path) => {
                write!(f, "output file {} already exists", path.display())
            }
            SortError::TempDir(err) => write!(f, "temporary directory or file not created: {}", err),
            SortError::ThreadPoolBuildError(err) => {
                write!(f, "thread pool initialization failed: {}", err)
            }
            SortError::Partition(err) => write!(f, "input partitioning failed: {}", err),
            SortError::Merge(err) => write!(f, "run merging failed: {}", err),
        }
    }
}

/// Sorter builder. Provides methods for [`Sorter`] initialization.
#[derive(Clone, Default)]
pub struct SorterBuilder {
    /// Number of threads to be used to sort and merge runs in parallel.
    threads_number: Option<usize>,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// Number of lines per in-memory chunk.
    chunk_size: Option<usize>,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl SorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        SorterBuilder::default()
    }

    /// Builds a [`Sorter`] instance using provided configuration.
    pub fn build(self) -> Result<Sorter, SortError> {
        Sorter::new(
            self.threads_number,
            self.tmp_dir.as_deref(),
            self.chunk_size,
            self.rw_buf_size,
        )
    }

    /// Sets number of threads to be used to sort and merge runs in parallel.
    pub fn with_threads_number(mut self, threads_number: usize) -> SorterBuilder {
        self.threads_number = Some(threads_number);
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> SorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets the number of lines per in-memory chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> SorterBuilder {
        self.chunk_size = Some(chunk_size);
        return self;
    }

    /// Sets run file read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> SorterBuilder {
        self.rw_buf_size = Some(buf_size);
        return self;
    }
}

/// External line sorter.
///
/// Partitions the input into independently sorted runs, merges the runs
/// pairwise in concurrent waves and sweeps every intermediate file when the
/// run finishes, successfully or not.
pub struct Sorter {
    /// Worker thread pool shared by chunk-sort and pair-merge tasks.
    thread_pool: rayon::ThreadPool,
    /// Temporary file allocator.
    scratch: Scratch,
    /// Number of lines per in-memory chunk.
    chunk_size: usize,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl Sorter {
    /// Creates a new sorter instance.
    ///
    /// # Arguments
    /// * `threads_number` - Number of worker threads. If the parameter is
    ///   [`None`] threads number will be selected based on available CPU
    ///   core number.
    /// * `tmp_path` - Directory to be used to store temporary data. If the
    ///   parameter is [`None`] default OS temporary directory will be used.
    /// * `chunk_size` - Number of lines per in-memory chunk, at least 1.
    ///   Defaults to [`DEFAULT_CHUNK_SIZE`].
    /// * `rw_buf_size` - Run file read/write buffer size.
    pub fn new(
        threads_number: Option<usize>,
        tmp_path: Option<&Path>,
        chunk_size: Option<usize>,
        rw_buf_size: Option<usize>,
    ) -> Result<Self, SortError> {
        return Ok(Sorter {
            thread_pool: Self::init_thread_pool(threads_number)?,
            scratch: Scratch::new(tmp_path).map_err(|err| SortError::TempDir(err))?,
            chunk_size: chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1),
            rw_buf_size,
        });
    }

    fn init_thread_pool(threads_number: Option<usize>) -> Result<rayon::ThreadPool, SortError> {
        let mut thread_pool_builder = rayon::ThreadPoolBuilder::new();

        if let Some(threads_number) = threads_number {
            log::info!("initializing thread-pool (threads: {})", threads_number);
            thread_pool_builder = thread_pool_builder.num_threads(threads_number);
        } else {
            log::info!("initializing thread-pool (threads: default)");
        }
        let thread_pool = thread_pool_builder
            .build()
            .map_err(|err| SortError::ThreadPoolBuildError(err))?;

        return Ok(thread_pool);
    }

    /// Sorts the file at `input_path` into `output_path`, or into
    /// `<stem>-sorted<ext>` beside the input when no output is given.
    ///
    /// The resolved output must not already exist; the sorter refuses to
    /// overwrite. Returns the output path, or [`None`] when the input holds
    /// no lines (no output file is produced). Temporary files are swept
    /// before returning, on the error path too.
    pub fn sort(
        &self,
        input_path: &Path,
        output_path: Option<&Path>,
    ) -> Result<Option<PathBuf>, SortError> {
        if !input_path.is_file() {
            return Err(SortError::InvalidInput(input_path.to_path_buf()));
        }

        let output_path = match output_path {
            Some(output_path) => output_path.to_path_buf(),
            None => default_output_path(input_path),
        };
        if output_path.exists() {
            return Err(SortError::OutputExists(output_path));
        }

        log::info!(
            "sorting {} into {} (chunk size: {} lines)",
            input_path.display(),
            output_path.display(),
            self.chunk_size
        );

        let mut registry = Registry::new();
        let result = self.run(input_path, &output_path, &mut registry);
        cleanup::cleanup(registry.paths());

        return result;
    }

    fn run(
        &self,
        input_path: &Path,
        output_path: &Path,
        registry: &mut Registry,
    ) -> Result<Option<PathBuf>, SortError> {
        let runs = partition::partition(
            &self.thread_pool,
            &self.scratch,
            input_path,
            self.chunk_size,
            self.rw_buf_size,
            registry,
        )
        .map_err(|err| SortError::Partition(err))?;

        if runs.is_empty() {
            log::info!("{} holds no lines, no output produced", input_path.display());
            return Ok(None);
        }

        merger::merge(
            &self.thread_pool,
            &self.scratch,
            runs,
            output_path,
            self.rw_buf_size,
            registry,
        )
        .map_err(|err| SortError::Merge(err))?;

        log::info!("sorted output written to {}", output_path.display());
        return Ok(Some(output_path.to_path_buf()));
    }
}

/// Synthesizes `<stem>-sorted<ext>` in the input's directory.
fn default_output_path(input_path: &Path) -> PathBuf {
    let stem = input_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("input");

    let file_name = match input_path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{}-sorted.{}", stem, ext),
        None => format!("{}-sorted", stem),
    };

    input_path.with_file_name(file_name)
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::{Path, PathBuf};

    use rstest::*;

    use crate::record::{self, Record};

    use super::{default_output_path, SortError, Sorter, SorterBuilder};

    struct Workbench {
        /// Holds input and output files.
        data: tempfile::TempDir,
        /// Holds the sorter's scratch space, checked for leaks.
        tmp: tempfile::TempDir,
    }

    #[fixture]
    fn bench() -> Workbench {
        Workbench {
            data: tempfile::tempdir().unwrap(),
            tmp: tempfile::tempdir().unwrap(),
        }
    }

    fn sorter(bench: &Workbench, chunk_size: usize) -> Sorter {
        SorterBuilder::new()
            .with_threads_number(2)
            .with_tmp_dir(bench.tmp.path())
            .with_chunk_size(chunk_size)
            .build()
            .unwrap()
    }

    fn write_input(bench: &Workbench, lines: &[&str]) -> PathBuf {
        let path = bench.data.path().join("input.txt");
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

    fn sorted_by_key(lines: &[String]) -> Vec<String> {
        let mut records = Vec::from_iter(lines.iter().map(|line| Record::parse(line)));
        records.sort_by(record::compare);
        Vec::from_iter(records.iter().map(Record::to_string))
    }

    /// Counts files (not directories) under `dir`, recursively.
    fn file_count(dir: &Path) -> usize {
        let mut count = 0;
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                count += file_count(&path);
            } else {
                count += 1;
            }
        }
        count
    }

    #[rstest]
    fn test_three_lines_two_chunks(bench: Workbench) {
        let input = write_input(&bench, &["3. Three Four", "1. One Two", "2. Two Three"]);

        let output = sorter(&bench, 2).sort(&input, None).unwrap().unwrap();

        assert_eq!(
            read_lines(&output),
            vec!["1. One Two", "2. Two Three", "3. Three Four"]
        );
        assert_eq!(file_count(bench.tmp.path()), 0, "temp files leaked");
    }

    #[rstest]
    fn test_empty_input_produces_no_output(bench: Workbench) {
        let input = write_input(&bench, &[]);

        let result = sorter(&bench, 2).sort(&input, None).unwrap();

        assert_eq!(result, None);
        assert!(!bench.data.path().join("input-sorted.txt").exists());
        assert_eq!(file_count(bench.tmp.path()), 0, "temp files leaked");
    }

    #[rstest]
    fn test_single_line_single_run(bench: Workbench) {
        let input = write_input(&bench, &["1. One Two"]);

        let output = sorter(&bench, 2).sort(&input, None).unwrap().unwrap();

        assert_eq!(read_lines(&output), vec!["1. One Two"]);
        assert_eq!(file_count(bench.tmp.path()), 0, "temp files leaked");
    }

    #[rstest]
    fn test_existing_output_is_left_untouched(bench: Workbench) {
        let input = write_input(&bench, &["1. One Two"]);
        let output = bench.data.path().join("taken.txt");
        fs::write(&output, "Existing content").unwrap();

        let result = sorter(&bench, 2).sort(&input, Some(&output));

        assert!(matches!(result, Err(SortError::OutputExists(_))));
        assert_eq!(fs::read_to_string(&output).unwrap(), "Existing content");
        assert_eq!(file_count(bench.tmp.path()), 0, "temp files created");
    }

    #[rstest]
    fn test_prefix_breaks_suffix_ties(bench: Workbench) {
        let input = write_input(&bench, &["2. apple", "1. apple"]);

        let output = sorter(&bench, 2).sort(&input, None).unwrap().unwrap();

        assert_eq!(read_lines(&output), vec!["1. apple", "2. apple"]);
    }

    #[rstest]
    fn test_hundred_lines_ten_runs(bench: Workbench) {
        let lines = Vec::from_iter((0..100).map(|idx| {
            format!(
                "{}. {} {}",
                (idx * 37) % 100,
                ["One", "Two", "Three", "Four", "Five"][idx % 5],
                ["Six", "Seven", "Eight", "Nine"][(idx * 3) % 4],
            )
        }));
        let input = write_input(
            &bench,
            &Vec::from_iter(lines.iter().map(String::as_str)),
        );

        let output = sorter(&bench, 10).sort(&input, None).unwrap().unwrap();

        let merged = read_lines(&output);
        assert_eq!(merged.len(), 100);
        assert_eq!(merged, sorted_by_key(&lines));
        assert_eq!(file_count(bench.tmp.path()), 0, "temp files leaked");
    }

    #[rstest]
    fn test_resorting_sorted_output_is_identity(bench: Workbench) {
        let input = write_input(&bench, &["3. Three", "1. One", "2. Two", "4. Four", "5. Five"]);
        let sorter = sorter(&bench, 2);

        let first = sorter.sort(&input, None).unwrap().unwrap();
        let second_path = bench.data.path().join("second.txt");
        let second = sorter.sort(&first, Some(&second_path)).unwrap().unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[rstest]
    fn test_missing_input_is_rejected(bench: Workbench) {
        let missing = bench.data.path().join("absent.txt");

        let result = sorter(&bench, 2).sort(&missing, None);

        assert!(matches!(result, Err(SortError::InvalidInput(_))));
        assert_eq!(file_count(bench.tmp.path()), 0, "temp files created");
    }

    #[rstest]
    #[case("numbers.txt", "numbers-sorted.txt")]
    #[case("numbers", "numbers-sorted")]
    #[case("lines.data.txt", "lines.data-sorted.txt")]
    fn test_default_output_path(#[case] input: &str, #[case] expected: &str) {
        let dir = Path::new("/some/dir");
        assert_eq!(default_output_path(&dir.join(input)), dir.join(expected));
    }
}
