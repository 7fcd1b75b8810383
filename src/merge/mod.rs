//! Multi-source merge
//!
//! [`SourceMerger`] combines any number of [`CommitSource`]s into one stream
//! ordered by timestamp, ties broken by source id. Every ordered source must
//! have a commit buffered before anything is emitted, so a slow source can
//! never be overtaken by a later commit from a fast one. Sources that report
//! themselves as fetching sit in a separate pool and are only drained once
//! the ordered group has nothing left.

use crate::commit::Commit;
use crate::source::CommitSource;
use crate::timing::{TimingHook, timed};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Identifier reported by the merged stream
pub const MERGED_ID: &str = "merged";

/// Ordering key: timestamp, then source id, then insertion sequence so equal
/// keys from the same id stay distinct.
type MergeKey = (i64, Arc<str>, u64);

/// What the merger knows about a source's next commit
#[derive(Debug)]
pub enum LaneState {
    /// Nothing read yet
    Unknown,
    /// A commit is held and takes part in ordering
    Buffered(Commit),
    /// The source finished
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pool {
    Ordered,
    Fetching,
}

struct Lane {
    id: Arc<str>,
    source: Box<dyn CommitSource>,
    state: LaneState,
    pool: Pool,
    /// Demoted by the stale timeout rather than by the source itself
    stale: bool,
    unready_since: Option<Instant>,
}

impl Lane {
    fn new(source: Box<dyn CommitSource>) -> Self {
        Self {
            id: Arc::from(source.id()),
            source,
            state: LaneState::Unknown,
            pool: Pool::Ordered,
            stale: false,
            unready_since: None,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self.state, LaneState::Unknown)
    }

    /// Read into an empty slot, returning the ordering key if a commit arrived
    fn fill(&mut self, validate: bool, seq: &mut u64) -> Option<MergeKey> {
        if !self.is_unknown() {
            return None;
        }
        match self.source.next_commit(validate) {
            Some(commit) => {
                let key = (commit.timestamp, Arc::clone(&self.id), *seq);
                *seq += 1;
                self.state = LaneState::Buffered(commit);
                self.unready_since = None;
                Some(key)
            }
            None => {
                if self.source.is_finished() {
                    tracing::debug!("Source {} exhausted", self.id);
                    self.state = LaneState::Exhausted;
                }
                None
            }
        }
    }

    fn is_finished(&self) -> bool {
        match self.state {
            LaneState::Unknown => self.source.is_finished(),
            LaneState::Buffered(_) => false,
            LaneState::Exhausted => true,
        }
    }
}

/// Time-ordered merge of several sources
pub struct SourceMerger {
    lanes: Vec<Lane>,
    queue: BTreeMap<MergeKey, usize>,
    seq: u64,
    fetch_cursor: usize,
    stale_timeout: Option<Duration>,
    timing: Option<TimingHook>,
}

impl SourceMerger {
    /// Take ownership of `sources`. Dropping the merger drops them.
    pub fn new(sources: Vec<Box<dyn CommitSource>>) -> Self {
        let merger = Self {
            lanes: sources.into_iter().map(Lane::new).collect(),
            queue: BTreeMap::new(),
            seq: 0,
            fetch_cursor: 0,
            stale_timeout: None,
            timing: None,
        };
        tracing::info!(
            "Merging {} source(s): {}",
            merger.len(),
            merger.source_ids().collect::<Vec<_>>().join(", ")
        );
        merger
    }

    /// Demote a source that stays unready for longer than `timeout`
    pub fn with_stale_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stale_timeout = timeout;
        self
    }

    pub fn with_timing(mut self, hook: Option<TimingHook>) -> Self {
        self.timing = hook;
        self
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.lanes.iter().map(|l| &*l.id)
    }

    /// Each source's id with what the merger holds for it
    pub fn states(&self) -> impl Iterator<Item = (&str, &LaneState)> {
        self.lanes.iter().map(|l| (&*l.id, &l.state))
    }

    /// Sources currently in the fetching pool
    pub fn fetching_count(&self) -> usize {
        self.lanes
            .iter()
            .filter(|l| l.pool == Pool::Fetching && !matches!(l.state, LaneState::Exhausted))
            .count()
    }

    /// Next commit together with the id of the source it came from.
    ///
    /// `None` while the merge is not ready or once it is finished; check
    /// [`CommitSource::is_finished`] to tell them apart.
    pub fn next_with_source(&mut self, validate: bool) -> Option<(Arc<str>, Commit)> {
        let hook = self.timing.clone();
        timed(hook.as_ref(), "merge.next_commit", || self.step(validate))
    }

    fn step(&mut self, validate: bool) -> Option<(Arc<str>, Commit)> {
        let now = Instant::now();
        self.triage(validate, now);

        let mut ready = true;
        for (idx, lane) in self.lanes.iter_mut().enumerate() {
            if lane.pool != Pool::Ordered {
                continue;
            }
            if let Some(key) = lane.fill(validate, &mut self.seq) {
                self.queue.insert(key, idx);
            }
            if lane.is_unknown() {
                lane.unready_since.get_or_insert(now);
                ready = false;
            }
        }
        if !ready {
            return None;
        }

        if let Some(((_, id, _), idx)) = self.queue.pop_first() {
            let lane = &mut self.lanes[idx];
            match std::mem::replace(&mut lane.state, LaneState::Unknown) {
                LaneState::Buffered(commit) => return Some((id, commit)),
                other => lane.state = other,
            }
        }

        self.poll_fetching(validate)
    }

    /// Move sources between the ordered group and the fetching pool
    fn triage(&mut self, validate: bool, now: Instant) {
        for (idx, lane) in self.lanes.iter_mut().enumerate() {
            if !lane.is_unknown() {
                continue;
            }
            match lane.pool {
                Pool::Ordered => {
                    if lane.source.is_fetching() {
                        tracing::debug!("Source {} is fetching", lane.id);
                        lane.pool = Pool::Fetching;
                    } else if let Some(timeout) = self.stale_timeout
                        && lane
                            .unready_since
                            .is_some_and(|since| now.duration_since(since) >= timeout)
                    {
                        tracing::warn!(
                            "Source {} unready for over {:?}, continuing without it",
                            lane.id,
                            timeout
                        );
                        lane.pool = Pool::Fetching;
                        lane.stale = true;
                    }
                }
                Pool::Fetching if lane.stale => {
                    if let Some(key) = lane.fill(validate, &mut self.seq) {
                        tracing::debug!("Source {} rejoined the merge", lane.id);
                        lane.pool = Pool::Ordered;
                        lane.stale = false;
                        self.queue.insert(key, idx);
                    }
                }
                Pool::Fetching => {
                    if !lane.source.is_fetching() {
                        tracing::debug!("Source {} rejoined the merge", lane.id);
                        lane.pool = Pool::Ordered;
                        lane.unready_since = None;
                    }
                }
            }
        }
    }

    /// Best-effort read from the fetching pool, rotating between sources
    fn poll_fetching(&mut self, validate: bool) -> Option<(Arc<str>, Commit)> {
        let count = self.lanes.len();
        for offset in 0..count {
            let idx = (self.fetch_cursor + offset) % count;
            let lane = &mut self.lanes[idx];
            if lane.pool != Pool::Fetching || !lane.is_unknown() {
                continue;
            }

            if let Some(commit) = lane.source.next_commit(validate) {
                self.fetch_cursor = (idx + 1) % count;
                return Some((Arc::clone(&lane.id), commit));
            }
            if lane.source.is_finished() {
                tracing::debug!("Source {} exhausted", lane.id);
                lane.state = LaneState::Exhausted;
            }
        }
        None
    }
}

impl CommitSource for SourceMerger {
    fn id(&self) -> &str {
        MERGED_ID
    }

    fn next_commit(&mut self, validate: bool) -> Option<Commit> {
        self.next_with_source(validate).map(|(_, commit)| commit)
    }

    fn is_finished(&self) -> bool {
        self.lanes.iter().all(Lane::is_finished)
    }

    fn find_next_commit(&mut self, _attempts: usize) -> Option<Commit> {
        None
    }

    fn is_fetching(&self) -> bool {
        self.fetching_count() > 0
    }
}
