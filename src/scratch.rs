//! Per-run scratch space: unique temporary files and the removal registry.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log;
use tempfile;

/// Allocates uniquely named files inside a run's temporary directory.
/// Cloneable so chunk and pair-merge tasks can create files from pool
/// threads.
#[derive(Clone)]
pub(crate) struct Scratch {
    dir: Arc<tempfile::TempDir>,
}

impl Scratch {
    /// Creates the backing temporary directory, inside `tmp_path` when
    /// given, inside the OS default otherwise.
    pub(crate) fn new(tmp_path: Option<&Path>) -> io::Result<Scratch> {
        let dir = match tmp_path {
            Some(tmp_path) => tempfile::tempdir_in(tmp_path),
            None => tempfile::tempdir(),
        }?;

        log::info!("using {} as a temporary directory", dir.path().display());

        return Ok(Scratch { dir: Arc::new(dir) });
    }

    /// Creates a fresh uniquely named file. The file persists until it is
    /// renamed onto the final output or removed by the janitor.
    pub(crate) fn create_file(&self) -> io::Result<(fs::File, PathBuf)> {
        let tmp_file = tempfile::Builder::new()
            .prefix("run-")
            .tempfile_in(self.dir.path())?;

        tmp_file.keep().map_err(|err| err.error)
    }
}

/// Append-only collection of temporary paths scheduled for deletion at the
/// end of a run. Only the orchestrator thread writes to it: run paths are
/// recorded when their producing task reports back, pair-merge outputs when
/// their path is allocated at dispatch.
#[derive(Default)]
pub(crate) struct Registry {
    paths: Vec<PathBuf>,
}

impl Registry {
    pub(crate) fn new() -> Registry {
        Registry::default()
    }

    pub(crate) fn record(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    pub(crate) fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// Chunk file reader with an optional caller-provided buffer size.
pub(crate) fn buf_reader(file: fs::File, buf_size: Option<usize>) -> io::BufReader<fs::File> {
    match buf_size {
        Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
        None => io::BufReader::new(file),
    }
}

/// Chunk file writer with an optional caller-provided buffer size.
pub(crate) fn buf_writer(file: fs::File, buf_size: Option<usize>) -> io::BufWriter<fs::File> {
    match buf_size {
        Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
        None => io::BufWriter::new(file),
    }
}
