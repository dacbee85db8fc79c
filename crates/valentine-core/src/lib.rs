#![forbid(unsafe_code)]

//! Core: geometry, environment sensing, behavior selection, and spot picking.
//!
//! # Role
//! `valentine-core` holds the pure pieces of the evasive "No" control. None
//! of it owns a clock or a timer; callers pass `now` and a
//! [`rng::RandomSource`] explicitly.
//!
//! # Primary responsibilities
//! - **Geometry**: points, rects, viewport clamping with off-screen tolerance.
//! - **Environment**: viewport, pointer coarseness, hover, live cursor, obstacle.
//! - **HostEvent**: canonical input delivered by the embedding host.
//! - **Behavior**: escalation level to mode and continuous parameters.
//! - **Spot**: mode and environment to a clamped destination and layer.
//! - **Hold**: press-and-hold confirmation primitive.
//!
//! # How it fits in the system
//! `valentine-runtime` owns the state container and timers and calls into
//! this crate for every decision. `valentine-web` wraps the runtime for a
//! host-driven embedding.

pub mod behavior;
pub mod environment;
pub mod event;
pub mod geometry;
pub mod hold;
pub mod rng;
pub mod spot;

pub use behavior::{Behavior, BehaviorInputs, BehaviorParams, MAX_LEVEL, Mode, TOP_LEVEL};
pub use environment::{Environment, EnvironmentChange};
pub use event::{ActivationKey, HostEvent, KeyPhase, Target};
pub use geometry::{HIDE_OFFSCREEN_TOLERANCE, Point, Rect, Size};
pub use hold::{HoldGesture, HoldRelease, HoldSample, HoldStart};
pub use rng::{RandomSource, SeededRandom, SequenceRandom};
pub use spot::{HideHint, Layer, Spot, SpotRequest, SpotTuning};
