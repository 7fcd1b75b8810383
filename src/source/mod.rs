//! Commit sources
//!
//! A source produces commits one at a time on demand. Two kinds read a single
//! history: [`SeekableTextSource`] parses a log file or stream synchronously, and
//! [`LiveRepositorySource`] walks a git repository on a background thread. The
//! [`SourceMerger`](crate::merge::SourceMerger) combines any number of them and
//! is itself a source.

/// Concrete text log formats
pub mod formats;
/// Background-threaded git repository walker
pub mod live;
/// Buffered, optionally seekable text log reader
pub mod text;

pub use formats::{CustomFormat, GitLogFormat, LogFormat};
pub use live::{LiveOptions, LiveRepositorySource};
pub use text::SeekableTextSource;

use crate::commit::Commit;
use crate::error::SourceError;
use std::path::PathBuf;

/// Where a source is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    FormatVerified,
    Streaming,
    Finished,
}

/// Pull-based stream of commits
///
/// Operations a source cannot support have conservative defaults: no seeking,
/// zero progress, no buffering.
pub trait CommitSource: Send {
    /// Stable identifier, used to break timestamp ties when merging
    fn id(&self) -> &str;

    /// Next commit, if one is available right now.
    ///
    /// With `validate`, a commit that fails [`Commit::is_valid`] is consumed and
    /// `None` is returned; the caller decides whether to try again.
    fn next_commit(&mut self, validate: bool) -> Option<Commit>;

    fn is_finished(&self) -> bool;

    /// Parse one commit to confirm the input is in this source's format
    fn check_format(&mut self) -> bool {
        true
    }

    /// Up to `attempts` validated reads, returning the first valid commit
    fn find_next_commit(&mut self, attempts: usize) -> Option<Commit> {
        (0..attempts).find_map(|_| self.next_commit(true))
    }

    /// Hold `commit` so the next read returns it.
    ///
    /// Sources that cannot buffer hand the commit back.
    fn buffer_commit(&mut self, commit: Commit) -> Result<(), Commit> {
        Err(commit)
    }

    /// A commit is ready to be returned without further I/O
    fn has_buffered_commit(&self) -> bool {
        false
    }

    /// The first valid commit at or after `percent` of the input, leaving the
    /// read position untouched
    fn commit_at(&mut self, _percent: f32) -> Option<Commit> {
        None
    }

    fn seek_to(&mut self, _percent: f32) {}

    fn is_seekable(&self) -> bool {
        false
    }

    /// Read progress in `0.0..=1.0`
    fn percent(&self) -> f32 {
        0.0
    }

    /// Caught up with known history and waiting for more
    fn is_fetching(&self) -> bool {
        false
    }

    /// Command used to generate this source's log, if any
    fn log_command(&self) -> Option<&str> {
        None
    }

    fn lifecycle(&self) -> Lifecycle {
        if self.is_finished() {
            Lifecycle::Finished
        } else {
            Lifecycle::Streaming
        }
    }
}

impl<S: CommitSource + ?Sized> CommitSource for Box<S> {
    fn id(&self) -> &str {
        (**self).id()
    }
    fn next_commit(&mut self, validate: bool) -> Option<Commit> {
        (**self).next_commit(validate)
    }
    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
    fn check_format(&mut self) -> bool {
        (**self).check_format()
    }
    fn find_next_commit(&mut self, attempts: usize) -> Option<Commit> {
        (**self).find_next_commit(attempts)
    }
    fn buffer_commit(&mut self, commit: Commit) -> Result<(), Commit> {
        (**self).buffer_commit(commit)
    }
    fn has_buffered_commit(&self) -> bool {
        (**self).has_buffered_commit()
    }
    fn commit_at(&mut self, percent: f32) -> Option<Commit> {
        (**self).commit_at(percent)
    }
    fn seek_to(&mut self, percent: f32) {
        (**self).seek_to(percent)
    }
    fn is_seekable(&self) -> bool {
        (**self).is_seekable()
    }
    fn percent(&self) -> f32 {
        (**self).percent()
    }
    fn is_fetching(&self) -> bool {
        (**self).is_fetching()
    }
    fn log_command(&self) -> Option<&str> {
        (**self).log_command()
    }
    fn lifecycle(&self) -> Lifecycle {
        (**self).lifecycle()
    }
}

/// Locate `name` on `PATH`
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    let candidates: Vec<String> = if cfg!(windows) {
        vec![format!("{}.exe", name), name.to_string()]
    } else {
        vec![name.to_string()]
    };

    std::env::split_paths(&path)
        .flat_map(|dir| candidates.iter().map(move |c| dir.join(c)))
        .find(|candidate| candidate.is_file())
}

/// Fail with [`SourceError::ExecutableNotFound`] unless `name` is on `PATH`
pub fn require_executable(name: &str) -> Result<PathBuf, SourceError> {
    find_executable(name).ok_or_else(|| SourceError::ExecutableNotFound(name.to_string()))
}
