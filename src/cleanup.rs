//! Temporary file janitor.

use std::fs;
use std::io;
use std::path::Path;

use log;

/// Best-effort removal of every listed path. Missing files are ignored
/// silently, any other failure is logged and the sweep continues.
/// Idempotent.
pub(crate) fn cleanup<P: AsRef<Path>>(paths: &[P]) {
    for path in paths {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => log::debug!("removed temporary file {}", path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => (),
            Err(err) => log::warn!("temporary file {} not removed: {}", path.display(), err),
        }
    }
}
