#![forbid(unsafe_code)]

//! One-shot timer queue with cancellable handles.
//!
//! Every "do X after N ms" effect is an entry in a [`TimerQueue`]. The
//! queue never fires anything on its own: the owner pops due entries with
//! [`TimerQueue::pop_due`] from inside its update cycle, so all effects run
//! serialized with regular input handling.
//!
//! # Invariants
//!
//! 1. Entries pop in `(due, id)` order; ids are strictly increasing, so
//!    timers scheduled for the same instant fire in scheduling order.
//! 2. A cancelled or popped id never fires again.
//! 3. [`TimerQueue::clear`] cancels everything atomically; an entry
//!    scheduled afterwards is unaffected.

use std::time::Duration;

/// Handle for a scheduled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct TimerEntry<A> {
    id: TimerId,
    due: Duration,
    action: A,
}

/// Pending one-shot actions keyed by due time.
#[derive(Debug, Clone)]
pub struct TimerQueue<A> {
    entries: Vec<TimerEntry<A>>,
    next_id: u64,
}

impl<A> Default for TimerQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> TimerQueue<A> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Schedule `action` to become due at `now + delay`.
    pub fn schedule(&mut self, now: Duration, delay: Duration, action: A) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(TimerEntry {
            id,
            due: now.saturating_add(delay),
            action,
        });
        id
    }

    /// Cancel one entry. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Cancel every entry whose action matches. Returns how many were dropped.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&A) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(&e.action));
        before - self.entries.len()
    }

    /// Cancel everything. Returns how many entries were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    /// Remove and return the earliest entry due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, A)> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= now)
            .min_by_key(|(_, e)| (e.due, e.id))
            .map(|(i, _)| i)?;
        let entry = self.entries.swap_remove(idx);
        Some((entry.id, entry.action))
    }

    /// Earliest pending due time.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        self.entries.iter().map(|e| e.due).min()
    }

    #[must_use]
    pub fn contains(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Whether any pending action matches.
    #[must_use]
    pub fn any(&self, mut pred: impl FnMut(&A) -> bool) -> bool {
        self.entries.iter().any(|e| pred(&e.action))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
