#![forbid(unsafe_code)]

//! `valentine-web` is a host-driven shell for embedding the Valentine toy.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment (JS) pushes pointer,
//!   keyboard, layout, and media events.
//! - **Deterministic time**: the host advances a monotonic clock explicitly,
//!   or uses [`MonotonicClock`] when replay is not needed.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! The crate does not bind to `wasm-bindgen`. A JS glue layer calls
//! [`WebSession::push_event`] from its listeners, [`WebSession::step`] from
//! `requestAnimationFrame`, and renders the returned [`FrameSnapshot`].

pub mod frame;
#[cfg(feature = "input-parser")]
pub mod input_parser;
pub mod record;

use core::time::Duration;
use std::collections::VecDeque;

use valentine_core::environment::Environment;
use valentine_core::event::HostEvent;
use valentine_core::rng::{RandomSource, SeededRandom};
use valentine_runtime::{Valentine, ValentineConfig};

pub use frame::{BoxFrame, ElementFrame, FrameSnapshot, ItemFrame, LureFrame};
#[cfg(feature = "input-parser")]
pub use input_parser::{InputParseError, parse_host_event};
pub use record::{ReplayResult, SessionRecorder, SessionTrace, TraceRecord, replay};

/// Web shell error type.
#[derive(Debug, Clone, PartialEq)]
pub enum WebError {
    /// A host message could not be decoded.
    #[cfg(feature = "input-parser")]
    Input(InputParseError),
    /// A trace is malformed (missing header, records out of order).
    Trace(&'static str),
}

impl core::fmt::Display for WebError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            #[cfg(feature = "input-parser")]
            Self::Input(err) => write!(f, "input: {err}"),
            Self::Trace(msg) => write!(f, "trace: {msg}"),
        }
    }
}

impl std::error::Error for WebError {}

#[cfg(feature = "input-parser")]
impl From<InputParseError> for WebError {
    fn from(err: InputParseError) -> Self {
        Self::Input(err)
    }
}

/// Source of monotonic time for a session.
pub trait SessionClock {
    /// Time since the session origin.
    fn now_mono(&self) -> Duration;
}

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Set current monotonic time.
    pub fn set(&mut self, now: Duration) {
        self.now = now;
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

impl SessionClock for DeterministicClock {
    fn now_mono(&self) -> Duration {
        self.now
    }
}

/// Wall clock backed by `web_time::Instant` (native and wasm32).
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: web_time::Instant,
}

impl MonotonicClock {
    /// Start a clock whose origin is the moment of the call.
    #[must_use]
    pub fn start() -> Self {
        Self {
            origin: web_time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::start()
    }
}

impl SessionClock for MonotonicClock {
    fn now_mono(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// One embedded toy: the runtime state container plus a host event queue.
///
/// Events are queued as they arrive and applied in order on the next
/// [`step`](Self::step), so every event of a frame sees the same `now`.
#[derive(Debug)]
pub struct WebSession<R: RandomSource = SeededRandom> {
    app: Valentine<R>,
    queue: VecDeque<HostEvent>,
    steps: u64,
}

impl WebSession<SeededRandom> {
    /// Create a session with a seeded random source.
    #[must_use]
    pub fn with_seed(config: ValentineConfig, env: Environment, seed: u64) -> Self {
        Self::from_app(Valentine::with_seed(config, env, seed, Duration::ZERO))
    }
}

impl<R: RandomSource> WebSession<R> {
    /// Create a session with an explicit random source, starting at `0`.
    #[must_use]
    pub fn new(config: ValentineConfig, env: Environment, rng: R) -> Self {
        Self::from_app(Valentine::new(config, env, rng, Duration::ZERO))
    }

    /// Wrap an existing runtime.
    #[must_use]
    pub fn from_app(app: Valentine<R>) -> Self {
        Self {
            app,
            queue: VecDeque::new(),
            steps: 0,
        }
    }

    /// Push a host event into the queue.
    pub fn push_event(&mut self, event: HostEvent) {
        self.queue.push_back(event);
    }

    /// Decode a host JSON message and queue it.
    ///
    /// Returns `Ok(false)` for message kinds the toy does not consume.
    #[cfg(feature = "input-parser")]
    pub fn push_json(&mut self, json: &str) -> Result<bool, WebError> {
        match parse_host_event(json)? {
            Some(event) => {
                self.push_event(event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Number of queued events.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of completed steps.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Apply queued events, run one tick and return the frame at `now`.
    pub fn step(&mut self, now: Duration) -> FrameSnapshot {
        #[cfg(feature = "tracing")]
        let drained = self.queue.len();
        while let Some(event) = self.queue.pop_front() {
            self.app.handle(&event, now);
        }
        self.app.handle(&HostEvent::Tick, now);
        self.steps += 1;

        #[cfg(feature = "tracing")]
        tracing::trace!(
            target: "valentine.web",
            step = self.steps,
            now_ms = now.as_millis() as u64,
            events = drained,
            "step"
        );

        FrameSnapshot::capture(&self.app, now)
    }

    /// [`step`](Self::step) at the clock's current time.
    pub fn step_with(&mut self, clock: &impl SessionClock) -> FrameSnapshot {
        self.step(clock.now_mono())
    }

    /// Frame at `now` without applying anything.
    #[must_use]
    pub fn snapshot(&self, now: Duration) -> FrameSnapshot {
        FrameSnapshot::capture(&self.app, now)
    }

    /// Drop queued events and restart the toy.
    pub fn restart(&mut self, now: Duration) {
        self.queue.clear();
        self.app.restart(now);
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "valentine.web", now_ms = now.as_millis() as u64, "session restarted");
    }

    #[must_use]
    pub const fn app(&self) -> &Valentine<R> {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut Valentine<R> {
        &mut self.app
    }
}
