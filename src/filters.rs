//! User and file filters applied while commits are ingested
//!
//! Deny lists always win. When an allow list is configured, a value must match
//! at least one of its patterns to be kept.

use crate::error::ConfigError;
use regex::Regex;

/// Compiled allow/deny patterns for usernames and file paths
#[derive(Debug, Clone, Default)]
pub struct Filters {
    user_deny: Vec<Regex>,
    user_allow: Vec<Regex>,
    file_deny: Vec<Regex>,
    file_allow: Vec<Regex>,
}

impl Filters {
    /// Filters that accept everything
    pub fn none() -> Self {
        Self::default()
    }

    /// Compile the four pattern lists
    pub fn new(
        user_deny: &[String],
        user_allow: &[String],
        file_deny: &[String],
        file_allow: &[String],
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            user_deny: compile("filters.user_deny", user_deny)?,
            user_allow: compile("filters.user_allow", user_allow)?,
            file_deny: compile("filters.file_deny", file_deny)?,
            file_allow: compile("filters.file_allow", file_allow)?,
        })
    }

    pub fn with_file_deny(mut self, pattern: Regex) -> Self {
        self.file_deny.push(pattern);
        self
    }

    pub fn with_file_allow(mut self, pattern: Regex) -> Self {
        self.file_allow.push(pattern);
        self
    }

    pub fn with_user_deny(mut self, pattern: Regex) -> Self {
        self.user_deny.push(pattern);
        self
    }

    pub fn with_user_allow(mut self, pattern: Regex) -> Self {
        self.user_allow.push(pattern);
        self
    }

    /// Whether a commit by `username` may be shown
    pub fn allows_user(&self, username: &str) -> bool {
        allowed(username, &self.user_deny, &self.user_allow)
    }

    /// Whether a file at `path` may be added to a commit
    pub fn allows_file(&self, path: &str) -> bool {
        allowed(path, &self.file_deny, &self.file_allow)
    }

    pub fn is_empty(&self) -> bool {
        self.user_deny.is_empty()
            && self.user_allow.is_empty()
            && self.file_deny.is_empty()
            && self.file_allow.is_empty()
    }
}

fn allowed(value: &str, deny: &[Regex], allow: &[Regex]) -> bool {
    if deny.iter().any(|r| r.is_match(value)) {
        return false;
    }
    allow.is_empty() || allow.iter().any(|r| r.is_match(value))
}

fn compile(key: &str, patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                key: key.to_string(),
                pattern: pattern.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}
