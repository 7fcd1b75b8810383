//! Synchronous text log source
//!
//! Commits are parsed on demand from a file, a stream, or the output of a log
//! command materialised into a temporary file.

mod reader;

pub use reader::{LineReader, ReadSeek};

use super::formats::LogFormat;
use super::{CommitSource, Lifecycle, require_executable};
use crate::commit::Commit;
use crate::error::SourceError;
use crate::filters::Filters;
use crate::paths::{PlatformPaths, TEMP_LOG_PREFIX};
use crate::timing::{TimingHook, timed};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Default number of parse attempts used by [`CommitSource::commit_at`]
pub const DEFAULT_FIND_ATTEMPTS: usize = 500;

/// Commit source backed by a text log
pub struct SeekableTextSource {
    id: String,
    format: Box<dyn LogFormat>,
    filters: Arc<Filters>,
    /// `None` when the first-character check rejected the input
    reader: Option<LineReader>,
    buffered: Option<Commit>,
    exhausted: bool,
    lifecycle: Lifecycle,
    find_attempts: usize,
    timing: Option<TimingHook>,
    log_command: Option<String>,
    // removed from disk when the source is dropped
    temp_log: Option<NamedTempFile>,
}

impl SeekableTextSource {
    fn from_reader(
        id: impl Into<String>,
        mut reader: LineReader,
        format: Box<dyn LogFormat>,
        filters: Arc<Filters>,
    ) -> Self {
        let id = id.into();
        let first_ok = match format.first_char() {
            None => true,
            Some(expected) => reader.peek_byte() == Some(expected),
        };
        if !first_ok {
            tracing::debug!("{} does not look like a {} log", id, format.name());
        }
        let exhausted = first_ok && reader.at_end();

        Self {
            id,
            format,
            filters,
            reader: first_ok.then_some(reader),
            buffered: None,
            exhausted,
            lifecycle: Lifecycle::Created,
            find_attempts: DEFAULT_FIND_ATTEMPTS,
            timing: None,
            log_command: None,
            temp_log: None,
        }
    }

    /// Source over random-access input
    pub fn from_seekable(
        id: impl Into<String>,
        input: impl ReadSeek + 'static,
        format: Box<dyn LogFormat>,
        filters: Arc<Filters>,
    ) -> Result<Self, SourceError> {
        let id = id.into();
        let reader = LineReader::seekable(input)
            .map_err(|e| SourceError::NotFound(format!("{}: {}", id, e)))?;
        Ok(Self::from_reader(id, reader, format, filters))
    }

    /// Source over forward-only input
    pub fn from_stream(
        id: impl Into<String>,
        input: impl Read + Send + 'static,
        format: Box<dyn LogFormat>,
        filters: Arc<Filters>,
    ) -> Self {
        Self::from_reader(id, LineReader::stream(BufReader::new(input)), format, filters)
    }

    /// Open a log file, or standard input when `location` is `-`
    pub fn open(
        location: &str,
        format: Box<dyn LogFormat>,
        filters: Arc<Filters>,
    ) -> Result<Self, SourceError> {
        if location == "-" {
            return Ok(Self::from_stream(location, std::io::stdin(), format, filters));
        }

        let path = Path::new(location);
        let metadata =
            std::fs::metadata(path).map_err(|_| SourceError::NotFound(location.to_string()))?;
        if metadata.is_dir() {
            return Err(SourceError::UnrecognizedFormat(format!(
                "{} is a directory",
                location
            )));
        }

        let file = File::open(path)
            .map_err(|e| SourceError::NotFound(format!("{}: {}", location, e)))?;
        tracing::info!("Opened {} log: {}", format.name(), location);
        Self::from_seekable(location, file, format, filters)
    }

    /// Run `program args..` in `dir`, capture its output in a temporary file
    /// and read that file as a log.
    ///
    /// The temporary file lives as long as the source.
    pub fn from_command(
        id: impl Into<String>,
        program: &str,
        args: &[&str],
        dir: &Path,
        format: Box<dyn LogFormat>,
        filters: Arc<Filters>,
    ) -> Result<Self, SourceError> {
        let id = id.into();
        let executable = require_executable(program)?;
        let command = format!("{} {}", program, args.join(" "));

        let temp = tempfile::Builder::new()
            .prefix(TEMP_LOG_PREFIX)
            .tempfile_in(PlatformPaths::temp_dir())
            .map_err(|e| SourceError::TempFile(e.to_string()))?;
        let stdout = temp
            .reopen()
            .map_err(|e| SourceError::TempFile(e.to_string()))?;

        tracing::info!("Generating log for {} with: {}", id, command);
        let status = Command::new(executable)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::null())
            .status()
            .map_err(|e| SourceError::CommandFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;
        if !status.success() {
            return Err(SourceError::CommandFailed {
                command,
                reason: format!("exited with {}", status),
            });
        }

        let log = temp
            .reopen()
            .map_err(|e| SourceError::TempFile(e.to_string()))?;
        let mut source = Self::from_seekable(id, log, format, filters)?;
        source.log_command = Some(command);
        source.temp_log = Some(temp);
        if let Some(path) = source.temp_log_path() {
            tracing::debug!("Log for {} written to {}", source.id, path.display());
        }
        Ok(source)
    }

    pub fn with_timing(mut self, hook: Option<TimingHook>) -> Self {
        self.timing = hook;
        self
    }

    pub fn with_find_attempts(mut self, attempts: usize) -> Self {
        self.find_attempts = attempts.max(1);
        self
    }

    /// Temporary file holding generated log output, if this source made one
    pub fn temp_log_path(&self) -> Option<&Path> {
        self.temp_log.as_ref().map(|file| file.path())
    }

    /// The input passed the first-character check
    pub fn is_usable(&self) -> bool {
        self.reader.is_some()
    }

    pub fn format_name(&self) -> &'static str {
        self.format.name()
    }

    /// Parse without validation or buffering
    fn parse_next(&mut self) -> Option<Commit> {
        let reader = self.reader.as_mut()?;
        let format = &self.format;
        let filters = &self.filters;

        let parsed = timed(self.timing.as_ref(), "text.parse_commit", || {
            format.parse_commit(reader, filters)
        });
        self.exhausted = reader.at_end();

        let mut commit = parsed?;
        commit.postprocess();
        Some(commit)
    }
}

impl CommitSource for SeekableTextSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn next_commit(&mut self, validate: bool) -> Option<Commit> {
        let commit = match self.buffered.take() {
            Some(commit) => commit,
            None => {
                if self.reader.is_none() {
                    return None;
                }
                self.lifecycle = Lifecycle::Streaming;
                self.parse_next()?
            }
        };

        if validate && !commit.is_valid(&self.filters) {
            tracing::debug!(
                "Discarding invalid commit from {} at {}",
                self.id,
                commit.timestamp
            );
            return None;
        }
        Some(commit)
    }

    fn is_finished(&self) -> bool {
        self.reader.is_none() || (self.exhausted && self.buffered.is_none())
    }

    fn check_format(&mut self) -> bool {
        if self.reader.is_none() {
            return false;
        }

        let Some(commit) = self.parse_next() else {
            return false;
        };

        if self.is_seekable() {
            // start over from the top
            self.seek_to(0.0);
        } else {
            self.buffered = Some(commit);
        }
        self.lifecycle = Lifecycle::FormatVerified;
        true
    }

    fn buffer_commit(&mut self, commit: Commit) -> Result<(), Commit> {
        if self.buffered.is_some() {
            return Err(commit);
        }
        self.buffered = Some(commit);
        Ok(())
    }

    fn has_buffered_commit(&self) -> bool {
        self.buffered.is_some()
    }

    fn commit_at(&mut self, percent: f32) -> Option<Commit> {
        if !self.is_seekable() {
            return None;
        }

        let (pos, lastline) = {
            let reader = self.reader.as_mut()?;
            (reader.position(), reader.take_lastline())
        };
        let exhausted = self.exhausted;
        let buffered = self.buffered.take();

        self.seek_to(percent);
        let found = self.find_next_commit(self.find_attempts);
        self.buffered = buffered;

        if let Some(reader) = self.reader.as_mut() {
            if let Err(e) = reader.set_position(pos) {
                tracing::warn!("Failed to restore position in {}: {}", self.id, e);
            }
            if let Some(line) = lastline {
                reader.push_back(line);
            }
        }
        self.exhausted = exhausted;
        found
    }

    fn seek_to(&mut self, percent: f32) {
        if let Some(reader) = self.reader.as_mut()
            && reader.is_seekable()
        {
            reader.seek_to(percent);
            self.exhausted = reader.at_end();
        }
    }

    fn is_seekable(&self) -> bool {
        self.reader.as_ref().is_some_and(|r| r.is_seekable())
    }

    fn percent(&self) -> f32 {
        self.reader.as_ref().map_or(0.0, |r| r.percent())
    }

    fn log_command(&self) -> Option<&str> {
        self.log_command.as_deref()
    }

    fn lifecycle(&self) -> Lifecycle {
        if self.is_finished() {
            Lifecycle::Finished
        } else {
            self.lifecycle
        }
    }
}
