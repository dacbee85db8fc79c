#![forbid(unsafe_code)]

//! Escalation counter and acceptance.
//!
//! The level counts confirmed "no" answers. It climbs to
//! [`TOP_LEVEL`](valentine_core::TOP_LEVEL) and stays there; confirming
//! again at the top arms a loop that the owner resolves with
//! [`Escalation::loop_reset`] after a delay. Acceptance is terminal until
//! [`Escalation::reset`].

use valentine_core::behavior::{TOP_LEVEL, clamp_level};

/// Result of [`Escalation::confirm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Level moved from `from` to `to`.
    Advanced { from: u8, to: u8 },
    /// Confirmed at the top: the caller should schedule a loop reset.
    LoopArmed,
    /// A loop reset is already pending.
    IgnoredLooping,
    /// Accepted; nothing counts any more.
    IgnoredAccepted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Escalation {
    level: u8,
    looping: bool,
    accepted: bool,
    confirmed_total: u64,
}

impl Escalation {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            level: 0,
            looping: false,
            accepted: false,
            confirmed_total: 0,
        }
    }

    /// Start at a specific level (clamped). Used by tests and replays.
    #[must_use]
    pub fn at_level(level: u8) -> Self {
        Self {
            level: clamp_level(level),
            ..Self::new()
        }
    }

    #[inline]
    pub const fn level(&self) -> u8 {
        self.level
    }

    #[inline]
    pub const fn is_looping(&self) -> bool {
        self.looping
    }

    #[inline]
    pub const fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Confirmed "no" answers across all cycles.
    #[inline]
    pub const fn confirmed_total(&self) -> u64 {
        self.confirmed_total
    }

    pub fn confirm(&mut self) -> ConfirmOutcome {
        if self.accepted {
            return ConfirmOutcome::IgnoredAccepted;
        }
        if self.looping {
            return ConfirmOutcome::IgnoredLooping;
        }
        self.confirmed_total += 1;
        if self.level >= TOP_LEVEL {
            self.looping = true;
            return ConfirmOutcome::LoopArmed;
        }
        let from = self.level;
        self.level = clamp_level(from + 1);
        ConfirmOutcome::Advanced {
            from,
            to: self.level,
        }
    }

    /// Resolve an armed loop. Returns `false` (no-op) when none is armed.
    pub fn loop_reset(&mut self) -> bool {
        if !self.looping || self.accepted {
            return false;
        }
        self.looping = false;
        self.level = 0;
        true
    }

    /// Enter the terminal state. Returns `false` if already accepted.
    pub fn accept(&mut self) -> bool {
        if self.accepted {
            return false;
        }
        self.accepted = true;
        self.looping = false;
        true
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
