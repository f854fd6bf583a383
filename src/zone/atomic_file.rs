//! Transactional replacement of a file's contents.
//!
//! Writes go to a `<target>.tmp` sibling. [`AtomicFile::commit`] renames it over the target in
//! one step, so a reader of the target sees either the old or the new contents and never a
//! partial write. [`AtomicFile::abort`] removes the temp file and leaves the target untouched.
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Suffix appended to the target path to name the temp file.
pub const TEMP_SUFFIX: &str = ".tmp";

enum State {
    Open(File),
    Committed,
    Aborted,
    Closed,
}

/// A pending replacement of a target file.
///
/// Exactly one of [`commit`](Self::commit), [`abort`](Self::abort) or [`close`](Self::close) may
/// be called. Afterwards the handle is inert: writes and further calls fail with a
/// "file is closed" error. Dropping a handle that is still open aborts it.
pub struct AtomicFile {
    path: PathBuf,
    temp_path: PathBuf,
    state: State,
}

impl AtomicFile {
    /// Create (or truncate) `<path>.tmp` for writing.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the temp file can't be created.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let temp_path = with_suffix(&path, TEMP_SUFFIX);
        let temp_file = File::create(&temp_path)?;
        Ok(Self {
            path,
            temp_path,
            state: State::Open(temp_file),
        })
    }

    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Close the temp file and rename it over the target.
    ///
    /// # Errors
    ///
    /// If the rename fails the temp file is left in place and the rename error is returned.
    /// Otherwise any error from flushing the temp file to disk is returned.
    pub fn commit(&mut self) -> io::Result<()> {
        let closed = self.close_temp(State::Committed)?;
        fs::rename(&self.temp_path, &self.path)?;
        closed
    }

    /// Close and remove the temp file, leaving the target as it was.
    ///
    /// # Errors
    ///
    /// Returns the error from removing the temp file, or failing that, from closing it.
    pub fn abort(&mut self) -> io::Result<()> {
        let closed = self.close_temp(State::Aborted)?;
        fs::remove_file(&self.temp_path)?;
        closed
    }

    /// Close the temp file without renaming or removing it.
    ///
    /// Generally you should call [`commit`](Self::commit) or [`abort`](Self::abort); this leaves
    /// `<target>.tmp` on disk for inspection.
    ///
    /// # Errors
    ///
    /// Returns any error from flushing the temp file to disk.
    pub fn close(&mut self) -> io::Result<()> {
        self.close_temp(State::Closed)?
    }

    // The outer result fails only when the handle was already finished. The inner one carries
    // the flush error, which callers report after their own rename/remove step.
    fn close_temp(&mut self, next: State) -> io::Result<io::Result<()>> {
        match std::mem::replace(&mut self.state, next) {
            State::Open(file) => Ok(file.sync_all()),
            finished => {
                self.state = finished;
                Err(closed_error())
            }
        }
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.state {
            State::Open(file) => file.write(buf),
            _ => Err(closed_error()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.state {
            State::Open(file) => file.flush(),
            _ => Err(closed_error()),
        }
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if matches!(self.state, State::Open(_)) {
            if let Err(err) = self.abort() {
                tracing::warn!(
                    path = %self.temp_path.display(),
                    error = %err,
                    "failed to remove abandoned temp file"
                );
            }
        }
    }
}

fn closed_error() -> io::Error {
    io::Error::other("file is closed")
}

/// Append `suffix` to the final component of `path`, e.g. `db.example` -> `db.example.tmp`.
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
