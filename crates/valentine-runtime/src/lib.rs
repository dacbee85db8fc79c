#![forbid(unsafe_code)]

//! Valentine Runtime
//!
//! This crate owns the timers and flags that turn the pure pieces of
//! `valentine-core` into a running evasion state machine.
//!
//! # Key Components
//!
//! - [`Valentine`] - Explicit state container; every entry point takes `now`
//! - [`EvasionController`] - Guarded single writer of the control's position
//! - [`BoxGame`] - Box minigame lifecycle and in-flight lure items
//! - [`Escalation`] - Confirmed-"no" counter, loop, and acceptance
//! - [`TimerQueue`] - Cancellable one-shot timers drained by the owner
//! - [`ValentineConfig`] - Tunables as data, optionally loaded from TOML/JSON
//!
//! # Role in the system
//! The runtime is the center: hosts push [`HostEvent`]s and ticks into
//! [`Valentine::handle`], renderers read state back through accessors.
//! `valentine-web` wraps it with a clock and an event queue.
//!
//! [`HostEvent`]: valentine_core::HostEvent

pub mod app;
pub mod box_game;
pub mod config;
pub mod escalation;
pub mod evasion;
pub mod feedback;
pub mod timer;

pub use app::{BOX_MIN_LEVEL, Scheduled, Valentine};
pub use box_game::{BoxGame, BoxPhase, Delivery, LureItem, SpawnOutcome, SpawnParams, TapOutcome};
pub use config::{ChanceConfig, ConfigError, GeometryConfig, TimingConfig, ValentineConfig};
pub use escalation::{ConfirmOutcome, Escalation};
pub use evasion::{
    Capture, DiveDecision, DiveGates, EvasionController, EvasionPhase, MoveReason,
    RepositionOutcome, SteerOutcome,
};
pub use feedback::{Feedback, ShownFeedback};
pub use timer::{TimerId, TimerQueue};
