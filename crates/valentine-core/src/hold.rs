#![forbid(unsafe_code)]

//! Hold-to-confirm gesture.
//!
//! [`HoldGesture`] accumulates press time against a duration and reports
//! completion exactly once per session. It holds no timer of its own: the
//! caller samples it from whatever loop it has (animation frame, tick).
//!
//! # State Machine
//!
//! ```text
//!   Idle ──start──▶ Active ──sample(progress = 1)──▶ Idle   (Completed)
//!                     │
//!                     ├──release(progress < 1)────▶ Idle   (Released)
//!                     └──cancel───────────────────▶ Idle   (no report)
//! ```
//!
//! # Invariants
//!
//! 1. Progress is `clamp(elapsed / duration, 0, 1)` and never overshoots.
//! 2. A session reports [`HoldSample::Completed`] at most once; the gesture
//!    is idle immediately afterwards.
//! 3. `start` while active, or while blocked, is a no-op.
//! 4. `release` and `cancel` on an idle gesture are no-ops.

use std::time::Duration;

/// Result of [`HoldGesture::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldStart {
    Started,
    /// A session is already running; it was left untouched.
    AlreadyActive,
    /// The caller said the target can't be held right now.
    Blocked,
}

/// Result of [`HoldGesture::sample`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldSample {
    Idle,
    /// Still held; progress in `[0, 1)`.
    Progress(f32),
    /// Reached the threshold during this sample. The session is over.
    Completed,
}

/// Result of [`HoldGesture::release`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldRelease {
    /// Nothing was being held.
    Idle,
    /// Let go early at this progress.
    Released(f32),
    /// The threshold had already been reached; the release completes the
    /// session instead of abandoning it.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveHold {
    started: Duration,
    duration: Duration,
}

/// Time-accumulating confirmation primitive.
#[derive(Debug, Clone, Default)]
pub struct HoldGesture {
    active: Option<ActiveHold>,
    sessions: u64,
    completions: u64,
}

impl HoldGesture {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: None,
            sessions: 0,
            completions: 0,
        }
    }

    #[inline]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Number of sessions started since construction.
    #[inline]
    pub const fn sessions(&self) -> u64 {
        self.sessions
    }

    /// Number of sessions that completed.
    #[inline]
    pub const fn completions(&self) -> u64 {
        self.completions
    }

    /// Begin a session. `blocked` lets the caller veto (e.g. target boxed).
    pub fn start(&mut self, now: Duration, duration: Duration, blocked: bool) -> HoldStart {
        if self.active.is_some() {
            return HoldStart::AlreadyActive;
        }
        if blocked {
            return HoldStart::Blocked;
        }
        self.active = Some(ActiveHold {
            started: now,
            // Zero would divide by zero; clamp to 1ms.
            duration: duration.max(Duration::from_millis(1)),
        });
        self.sessions += 1;
        HoldStart::Started
    }

    /// Current progress without side effects; `0.0` when idle.
    #[must_use]
    pub fn progress(&self, now: Duration) -> f32 {
        match self.active {
            Some(hold) => {
                let elapsed = now.saturating_sub(hold.started);
                (elapsed.as_secs_f64() / hold.duration.as_secs_f64()).clamp(0.0, 1.0) as f32
            }
            None => 0.0,
        }
    }

    /// Sample the gesture. Reaching the threshold ends the session.
    pub fn sample(&mut self, now: Duration) -> HoldSample {
        if self.active.is_none() {
            return HoldSample::Idle;
        }
        let p = self.progress(now);
        if p >= 1.0 {
            self.active = None;
            self.completions += 1;
            HoldSample::Completed
        } else {
            HoldSample::Progress(p)
        }
    }

    /// Let go. Completing on release covers a sampling loop that hadn't
    /// fired since the threshold passed.
    pub fn release(&mut self, now: Duration) -> HoldRelease {
        if self.active.is_none() {
            return HoldRelease::Idle;
        }
        let p = self.progress(now);
        self.active = None;
        if p >= 1.0 {
            self.completions += 1;
            HoldRelease::Completed
        } else {
            HoldRelease::Released(p)
        }
    }

    /// Abort silently. Returns whether a session was running.
    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }
}
