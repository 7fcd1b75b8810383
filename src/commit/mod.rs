//! Commit data model shared by every source and the merger

mod colour;

pub use colour::{Colour, extension};

use crate::filters::Filters;
use crate::sanitize::clean_username;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a commit did to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileAction {
    #[serde(rename = "A")]
    Added,
    #[serde(rename = "M")]
    Modified,
    #[serde(rename = "D")]
    Deleted,
}

impl FileAction {
    /// Classify a diff entry from whether the file exists on each side
    pub fn classify(old_exists: bool, new_exists: bool) -> Self {
        if !old_exists {
            FileAction::Added
        } else if !new_exists {
            FileAction::Deleted
        } else {
            FileAction::Modified
        }
    }

    /// Parse a single-letter status code (`A`, `M`, `D`)
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'A' => Some(FileAction::Added),
            'M' => Some(FileAction::Modified),
            'D' => Some(FileAction::Deleted),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            FileAction::Added => 'A',
            FileAction::Modified => 'M',
            FileAction::Deleted => 'D',
        }
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One file touched by a commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path, always starting with `/`
    pub path: String,
    pub action: FileAction,
    pub colour: Colour,
}

impl FileChange {
    pub fn new(path: &str, action: FileAction, colour: Colour) -> Self {
        Self {
            path: normalize_path(path),
            action,
            colour,
        }
    }
}

/// Prepend a `/` to paths that lack one
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Nest `path` under a logical directory `prefix`
pub fn prefixed_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let path = path.trim_start_matches('/');
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", prefix, path)
    }
}

/// A commit as delivered to the renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    pub username: String,
    /// Files in the order they were added
    pub files: Vec<FileChange>,
}

impl Commit {
    pub fn new(timestamp: i64, username: impl Into<String>) -> Self {
        Self {
            timestamp,
            username: username.into(),
            files: Vec::new(),
        }
    }

    /// Add a file coloured by its extension.
    ///
    /// Returns `false` when the filters reject the path.
    pub fn add_file(&mut self, path: &str, action: FileAction, filters: &Filters) -> bool {
        self.add_file_with_colour(path, action, Colour::for_path(path), filters)
    }

    /// Add a file with an explicit colour
    pub fn add_file_with_colour(
        &mut self,
        path: &str,
        action: FileAction,
        colour: Colour,
        filters: &Filters,
    ) -> bool {
        let change = FileChange::new(path, action, colour);
        if !filters.allows_file(&change.path) {
            return false;
        }
        self.files.push(change);
        true
    }

    /// Normalise fields after parsing
    pub fn postprocess(&mut self) {
        self.username = clean_username(&self.username);
    }

    /// A commit is valid when it touches at least one file and its author
    /// passes the user filters
    pub fn is_valid(&self, filters: &Filters) -> bool {
        filters.allows_user(&self.username) && !self.files.is_empty()
    }

    /// The commit in the custom log format, one line per file
    pub fn to_custom_log(&self) -> String {
        self.files
            .iter()
            .map(|file| {
                format!(
                    "{}|{}|{}|{}|{}\n",
                    self.timestamp,
                    self.username,
                    file.action,
                    file.path,
                    file.colour.to_hex()
                )
            })
            .collect()
    }

    /// Log the commit's files at debug level
    pub fn debug(&self) {
        let when = chrono::DateTime::from_timestamp(self.timestamp, 0)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| self.timestamp.to_string());
        tracing::debug!("commit by {} at {}:", self.username, when);
        for file in &self.files {
            tracing::debug!("  {} {}", file.action, file.path);
        }
    }
}
