//! Optional timing instrumentation
//!
//! Hot paths (parsing a commit, a merge step, a revision diff) can report how
//! long they took to a hook supplied by the caller. Without a hook the wrapped
//! closure runs directly and nothing is measured.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

type HookFn = dyn Fn(&'static str, Duration) + Send + Sync;

/// Cloneable handle to a timing callback
#[derive(Clone)]
pub struct TimingHook(Arc<HookFn>);

impl TimingHook {
    /// Wrap an arbitrary callback receiving `(label, elapsed)`
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&'static str, Duration) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Hook that reports every sample as a `trace` event
    pub fn tracing() -> Self {
        Self::new(|label, elapsed| {
            tracing::trace!(label = label, elapsed_us = elapsed.as_micros() as u64, "timing");
        })
    }

    /// Report one sample
    pub fn record(&self, label: &'static str, elapsed: Duration) {
        (self.0)(label, elapsed)
    }
}

impl fmt::Debug for TimingHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TimingHook")
    }
}

/// Run `f`, reporting its duration under `label` if a hook is installed
pub fn timed<T>(hook: Option<&TimingHook>, label: &'static str, f: impl FnOnce() -> T) -> T {
    match hook {
        None => f(),
        Some(hook) => {
            let start = Instant::now();
            let out = f();
            hook.record(label, start.elapsed());
            out
        }
    }
}
