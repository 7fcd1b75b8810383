//! Live repository source
//!
//! A background worker walks the repository with git2 and hands commits to
//! the consumer through a [`BoundedChannel`]. Once the walk catches up the
//! worker flags itself as fetching, pauses, and walks again from every ref so
//! that new revisions are picked up.

use super::{CommitSource, Lifecycle};
use crate::channel::BoundedChannel;
use crate::commit::{Commit, FileAction, prefixed_path};
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::filters::Filters;
use crate::sanitize::filter_utf8;
use crate::timing::{TimingHook, timed};
use anyhow::{Context, Result};
use git2::{Oid, Repository, Revwalk, Sort};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Settings for a [`LiveRepositorySource`]
#[derive(Debug, Clone)]
pub struct LiveOptions {
    /// Channel capacity, `0` for unbounded
    pub capacity: usize,
    /// Pause between walks once the history has been consumed
    pub idle_pause: Duration,
    /// Keep walking after the first complete pass
    pub follow: bool,
    /// Logical directory every path is placed under
    pub prefix: Option<String>,
    pub timing: Option<TimingHook>,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self::from_config(&SourceConfig::default())
    }
}

impl LiveOptions {
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            capacity: config.channel_capacity,
            idle_pause: config.idle_pause(),
            follow: config.follow,
            prefix: None,
            timing: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Commit source fed by a worker thread walking a git repository
pub struct LiveRepositorySource {
    id: String,
    channel: Arc<BoundedChannel<Commit>>,
    fetching: Arc<AtomicBool>,
    filters: Arc<Filters>,
    buffered: Option<Commit>,
    worker: Option<JoinHandle<()>>,
}

impl LiveRepositorySource {
    /// Open the repository at `path` and start walking it.
    pub fn open(
        path: &Path,
        filters: Arc<Filters>,
        options: LiveOptions,
    ) -> Result<Self, SourceError> {
        let repo = Repository::open(path).map_err(|e| SourceError::RepositoryOpen {
            path: path.display().to_string(),
            reason: e.message().to_string(),
        })?;
        let id = path.display().to_string();

        let channel = Arc::new(BoundedChannel::new(options.capacity));
        let fetching = Arc::new(AtomicBool::new(false));

        let walker = Walker {
            repo,
            channel: Arc::clone(&channel),
            fetching: Arc::clone(&fetching),
            filters: Arc::clone(&filters),
            options,
        };

        let worker = std::thread::Builder::new()
            .name("logmill-walker".to_string())
            .spawn(move || walker.run())
            .map_err(|e| SourceError::RepositoryOpen {
                path: id.clone(),
                reason: format!("failed to start walker: {}", e),
            })?;

        tracing::info!("Opened live repository: {}", id);

        Ok(Self {
            id,
            channel,
            fetching,
            filters,
            buffered: None,
            worker: Some(worker),
        })
    }

    /// Stop the worker. Already queued commits can still be drained.
    pub fn close(&self) {
        self.channel.close();
    }

    /// Commits waiting in the channel
    pub fn queued(&self) -> usize {
        self.channel.size()
    }
}

impl CommitSource for LiveRepositorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn next_commit(&mut self, validate: bool) -> Option<Commit> {
        let commit = match self.buffered.take() {
            Some(commit) => commit,
            None => self.channel.get(false)?,
        };
        if validate && !commit.is_valid(&self.filters) {
            return None;
        }
        Some(commit)
    }

    fn is_finished(&self) -> bool {
        self.buffered.is_none() && self.channel.is_drained()
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

    fn is_fetching(&self) -> bool {
        self.fetching.load(Ordering::Acquire) && self.buffered.is_none() && self.channel.is_empty()
    }

    fn lifecycle(&self) -> Lifecycle {
        if self.is_finished() {
            Lifecycle::Finished
        } else {
            Lifecycle::Streaming
        }
    }
}

impl Drop for LiveRepositorySource {
    fn drop(&mut self) {
        self.channel.close();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::warn!("Walker for {} panicked", self.id);
        }
        tracing::debug!("Closed live repository: {}", self.id);
    }
}

/// Closes the channel however the worker exits
struct CloseOnExit(Arc<BoundedChannel<Commit>>);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        self.0.close();
    }
}

struct Walker {
    repo: Repository,
    channel: Arc<BoundedChannel<Commit>>,
    fetching: Arc<AtomicBool>,
    filters: Arc<Filters>,
    options: LiveOptions,
}

impl Walker {
    fn run(self) {
        let Walker {
            repo,
            channel,
            fetching,
            filters,
            options,
        } = self;
        let _close = CloseOnExit(Arc::clone(&channel));
        let mut seen: HashSet<Oid> = HashSet::new();

        'walk: loop {
            match new_revwalk(&repo) {
                Ok(revwalk) => {
                    for oid in revwalk {
                        if channel.is_closed() {
                            break 'walk;
                        }
                        let oid = match oid {
                            Ok(oid) => oid,
                            Err(e) => {
                                tracing::debug!("Revision walk error: {}", e);
                                continue;
                            }
                        };
                        if !seen.insert(oid) {
                            continue;
                        }
                        fetching.store(false, Ordering::Release);

                        let extracted = timed(options.timing.as_ref(), "live.extract_commit", || {
                            extract_commit(&repo, oid, &filters, options.prefix.as_deref())
                        });
                        let commit = match extracted {
                            Ok(commit) => commit,
                            Err(e) => {
                                tracing::warn!("Skipping revision {}: {:#}", oid, e);
                                continue;
                            }
                        };

                        if !channel.put(commit) {
                            break 'walk;
                        }
                    }
                }
                Err(e) => tracing::warn!("Failed to walk {}: {:#}", repo.path().display(), e),
            }

            if !options.follow {
                tracing::debug!("Walk of {} complete", repo.path().display());
                break;
            }

            fetching.store(true, Ordering::Release);
            if channel.wait_closed(options.idle_pause) {
                break;
            }
        }

        fetching.store(false, Ordering::Release);
    }
}

fn new_revwalk(repo: &Repository) -> Result<Revwalk<'_>> {
    let mut revwalk = repo.revwalk().context("Failed to create revision walker")?;
    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE)
        .context("Failed to sort revision walker")?;
    revwalk.push_glob("*").context("Failed to push refs")?;
    Ok(revwalk)
}

/// Build a commit from a revision and its first-parent diff
fn extract_commit(
    repo: &Repository,
    oid: Oid,
    filters: &Filters,
    prefix: Option<&str>,
) -> Result<Commit> {
    let revision = repo.find_commit(oid).context("Failed to look up commit")?;
    let author = revision.author();
    let mut commit = Commit::new(author.when().seconds(), filter_utf8(author.name_bytes()));

    let tree = revision.tree().context("Failed to resolve tree")?;
    let parent_tree = if revision.parent_count() > 0 {
        let parent = revision.parent(0).context("Failed to resolve first parent")?;
        Some(parent.tree().context("Failed to resolve parent tree")?)
    } else {
        None
    };

    let diff = repo
        .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
        .context("Failed to diff against first parent")?;

    for delta in diff.deltas() {
        let old_file = delta.old_file();
        let new_file = delta.new_file();
        let action = FileAction::classify(old_file.exists(), new_file.exists());

        let path_bytes = match action {
            FileAction::Deleted => old_file.path_bytes(),
            _ => new_file.path_bytes(),
        };
        let Some(path_bytes) = path_bytes else {
            continue;
        };
        let path = filter_utf8(path_bytes);

        match prefix {
            Some(prefix) => commit.add_file(&prefixed_path(prefix, &path), action, filters),
            None => commit.add_file(&path, action, filters),
        };
    }

    commit.postprocess();
    Ok(commit)
}
