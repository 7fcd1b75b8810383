//! Opening locations as commit sources
//!
//! A directory is read as a git repository, either walked live or through a
//! generated `git log`. Anything else is a log file (or `-` for standard
//! input) whose format is sniffed: git raw log first, then the custom format.

use crate::config::Config;
use crate::error::{LogmillError, SourceError};
use crate::filters::Filters;
use crate::merge::SourceMerger;
use crate::source::{
    CommitSource, CustomFormat, GitLogFormat, LiveOptions, LiveRepositorySource, LogFormat,
    SeekableTextSource,
};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// Open one location.
///
/// `prefix` places every path of a live repository under a logical directory.
pub fn open_source(
    location: &str,
    prefix: Option<&str>,
    filters: &Arc<Filters>,
    config: &Config,
) -> Result<Box<dyn CommitSource>, SourceError> {
    let path = Path::new(location);
    if location != "-" && path.is_dir() {
        return open_repository(path, prefix, filters, config);
    }

    let source = open_log(location, filters)?
        .with_timing(config.timing_hook())
        .with_find_attempts(config.sources.find_attempts);
    Ok(Box::new(source))
}

fn open_repository(
    path: &Path,
    prefix: Option<&str>,
    filters: &Arc<Filters>,
    config: &Config,
) -> Result<Box<dyn CommitSource>, SourceError> {
    if config.sources.live {
        let options = LiveOptions {
            prefix: prefix.map(str::to_string),
            timing: config.timing_hook(),
            ..LiveOptions::from_config(&config.sources)
        };
        let source = LiveRepositorySource::open(path, Arc::clone(filters), options)?;
        return Ok(Box::new(source));
    }

    if prefix.is_some() {
        tracing::debug!("Path prefix ignored for generated log of {}", path.display());
    }

    let mut source = SeekableTextSource::from_command(
        path.display().to_string(),
        "git",
        GitLogFormat::LOG_ARGS,
        path,
        Box::new(GitLogFormat),
        Arc::clone(filters),
    )?
    .with_timing(config.timing_hook())
    .with_find_attempts(config.sources.find_attempts);

    if !source.check_format() {
        return Err(SourceError::UnrecognizedFormat(format!(
            "{} produced no readable history",
            path.display()
        )));
    }
    Ok(Box::new(source))
}

fn open_log(location: &str, filters: &Arc<Filters>) -> Result<SeekableTextSource, SourceError> {
    if location == "-" {
        // stdin can only be read once, so pick the format from the first byte
        let mut stdin = BufReader::new(std::io::stdin());
        let first = stdin.fill_buf().ok().and_then(|bytes| bytes.first().copied());
        let format: Box<dyn LogFormat> = if first == GitLogFormat.first_char() {
            Box::new(GitLogFormat)
        } else {
            Box::new(CustomFormat)
        };

        let mut source =
            SeekableTextSource::from_stream(location, stdin, format, Arc::clone(filters));
        if !source.check_format() {
            return Err(SourceError::UnrecognizedFormat(location.to_string()));
        }
        return Ok(source);
    }

    let formats: [Box<dyn LogFormat>; 2] = [Box::new(GitLogFormat), Box::new(CustomFormat)];
    for format in formats {
        let mut source = SeekableTextSource::open(location, format, Arc::clone(filters))?;
        if source.check_format() {
            tracing::info!("Reading {} as a {} log", location, source.format_name());
            return Ok(source);
        }
        tracing::debug!("{} is not a {} log", location, source.format_name());
    }

    Err(SourceError::UnrecognizedFormat(location.to_string()))
}

/// Final path component of a location, used to keep repositories apart
pub fn location_prefix(location: &str) -> Option<String> {
    let path = Path::new(location);
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Open every location and merge them.
///
/// Locations that cannot be read are logged and skipped; only fatal errors
/// are returned. With more than one location each repository gets its
/// directory name as a path prefix.
pub fn open_sources(locations: &[String], config: &Config) -> Result<SourceMerger, LogmillError> {
    let filters = Arc::new(config.compile_filters()?);
    let multiple = locations.len() > 1;

    let mut sources = Vec::with_capacity(locations.len());
    for location in locations {
        let prefix = if multiple {
            location_prefix(location)
        } else {
            None
        };

        match open_source(location, prefix.as_deref(), &filters, config) {
            Ok(source) => sources.push(source),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => tracing::warn!("Skipping {}: {}", location, e),
        }
    }

    if sources.is_empty() && !locations.is_empty() {
        tracing::warn!("No readable sources among {} location(s)", locations.len());
    }

    Ok(SourceMerger::new(sources)
        .with_stale_timeout(config.sources.stale_timeout())
        .with_timing(config.timing_hook()))
}
