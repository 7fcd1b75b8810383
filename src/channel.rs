//! Closable, bounded producer/consumer queue
//!
//! Used by the live repository worker to hand commits to the thread that
//! drives the merge. All queue state sits behind one mutex; a single condition
//! variable wakes producers waiting for space, consumers waiting for items and
//! anyone waiting for closure.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// FIFO queue with an optional capacity (`0` = unbounded)
pub struct BoundedChannel<T> {
    state: Mutex<State<T>>,
    cv: Condvar,
    max_size: usize,
}

impl<T> BoundedChannel<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            cv: Condvar::new(),
            max_size,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    // The state is never left half-updated, so a panic on another thread
    // does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueue `item`, waiting while the channel is full.
    ///
    /// Returns `false` without enqueuing once the channel is closed.
    pub fn put(&self, item: T) -> bool {
        let mut state = self.lock();
        if self.max_size > 0 {
            state = self
                .cv
                .wait_while(state, |s| !s.closed && s.items.len() >= self.max_size)
                .unwrap_or_else(|e| e.into_inner());
        }
        if state.closed {
            return false;
        }
        state.items.push_back(item);
        self.cv.notify_all();
        true
    }

    /// Dequeue the oldest item.
    ///
    /// With `blocking` the call waits until an item arrives or the channel is
    /// closed. `None` means the queue was empty (closed, or not blocking).
    pub fn get(&self, blocking: bool) -> Option<T> {
        let mut state = self.lock();
        if blocking {
            state = self
                .cv
                .wait_while(state, |s| !s.closed && s.items.is_empty())
                .unwrap_or_else(|e| e.into_inner());
        }
        let item = state.items.pop_front();
        self.cv.notify_all();
        item
    }

    /// Close the channel and wake every waiter. Idempotent.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        self.cv.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of queued items at the time of the call; advisory only
    pub fn size(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Closed with nothing left to drain
    pub fn is_drained(&self) -> bool {
        let state = self.lock();
        state.closed && state.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Sleep for up to `timeout`, returning early when the channel is closed.
    ///
    /// Returns whether the channel is closed.
    pub fn wait_closed(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .cv
            .wait_timeout_while(state, timeout, |s| !s.closed)
            .unwrap_or_else(|e| e.into_inner());
        state.closed
    }
}
