#![forbid(unsafe_code)]

//! Deterministic session recording and replay.
//!
//! [`SessionRecorder`] wraps a seeded [`WebSession`] and logs every host
//! event and step as a [`TraceRecord`]. Each step appends a frame
//! checkpoint with an FNV-1a checksum of the [`FrameSnapshot`] chained to
//! the previous one. [`replay`] feeds the trace through a fresh session and
//! compares the checksums.
//!
//! # Determinism contract
//!
//! Given the same config, seed, and recorded inputs, replay produces the
//! same frame checksums on the same build:
//!
//! 1. Time only advances through recorded step timestamps.
//! 2. Events are replayed from the trace in their original order.
//! 3. Randomness comes from the recorded seed.
//!
//! # Trace shape
//!
//! ```text
//! Header (exactly one, first)
//! { Input* Frame }*
//! Summary (exactly one, last)
//! ```

use core::time::Duration;

use valentine_core::environment::Environment;
use valentine_core::event::HostEvent;
use valentine_core::geometry::{Point, Rect, Size};
use valentine_core::rng::SeededRandom;
use valentine_runtime::ValentineConfig;

use crate::frame::FrameSnapshot;
use crate::{WebError, WebSession};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a64_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn fnv1a64_pair(prev: u64, next: u64) -> u64 {
    let hash = fnv1a64_bytes(FNV_OFFSET_BASIS, &prev.to_le_bytes());
    fnv1a64_bytes(hash, &next.to_le_bytes())
}

struct FrameHasher(u64);

impl FrameHasher {
    fn u64(&mut self, v: u64) {
        self.0 = fnv1a64_bytes(self.0, &v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.0 = fnv1a64_bytes(self.0, &v.to_bits().to_le_bytes());
    }

    fn bool(&mut self, v: bool) {
        self.0 = fnv1a64_bytes(self.0, &[u8::from(v)]);
    }

    fn str(&mut self, v: &str) {
        self.u64(v.len() as u64);
        self.0 = fnv1a64_bytes(self.0, v.as_bytes());
    }

    fn point(&mut self, p: Point) {
        self.f32(p.x);
        self.f32(p.y);
    }

    fn opt_point(&mut self, p: Option<Point>) {
        self.bool(p.is_some());
        if let Some(p) = p {
            self.point(p);
        }
    }

    fn rect(&mut self, r: Rect) {
        self.f32(r.x);
        self.f32(r.y);
        self.f32(r.width);
        self.f32(r.height);
    }

    fn size(&mut self, s: Size) {
        self.f32(s.width);
        self.f32(s.height);
    }
}

/// Order-sensitive checksum of everything a frame renders.
#[must_use]
pub fn frame_checksum(frame: &FrameSnapshot) -> u64 {
    let mut h = FrameHasher(FNV_OFFSET_BASIS);
    h.u64(frame.now_ms);
    h.u64(u64::from(frame.level));
    h.bool(frame.accepted);
    h.bool(frame.calm);
    h.f32(frame.hold_progress);

    let e = &frame.element;
    h.point(e.position);
    h.size(e.size);
    h.str(match e.layer {
        valentine_core::Layer::Front => "front",
        valentine_core::Layer::Behind => "behind",
    });
    h.f32(e.scale);
    h.f32(e.opacity);
    h.str(e.mode.as_str());
    h.str(e.phase);
    h.point(e.peek_offset);
    h.opt_point(e.tunnel_target);
    h.str(e.hide_hint.map_or("", |hint| hint.as_str()));
    h.bool(e.hidden);

    h.bool(frame.hide_box.is_some());
    if let Some(b) = &frame.hide_box {
        h.rect(b.rect);
        h.str(b.phase);
        h.u64(u64::from(b.fed));
        h.u64(u64::from(b.needed));
        h.u64(b.expires_in_ms);
    }

    h.u64(frame.items.len() as u64);
    for item in &frame.items {
        h.u64(item.id);
        h.point(item.position);
        h.f32(item.progress);
    }

    h.bool(frame.lure.is_some());
    if let Some(lure) = &frame.lure {
        h.point(lure.position);
        h.bool(lure.held);
    }

    h.str(frame.feedback.as_deref().unwrap_or(""));
    h.0
}

/// A single record in a session trace.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceRecord {
    /// Session header (must be first).
    Header {
        seed: u64,
        viewport: Size,
        obstacle: Option<Rect>,
        coarse_pointer: bool,
        can_hover: bool,
    },
    /// A host event applied on the next step.
    Input { event: HostEvent },
    /// A step at `now_ms` and the frame it produced.
    Frame {
        frame_idx: u64,
        now_ms: u64,
        checksum: u64,
        checksum_chain: u64,
    },
    /// Trace summary (must be last).
    Summary {
        total_frames: u64,
        final_checksum_chain: u64,
    },
}

/// A complete recorded session.
#[derive(Debug, Clone, Default)]
pub struct SessionTrace {
    pub records: Vec<TraceRecord>,
}

impl SessionTrace {
    /// Number of frame checkpoints.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.records
            .iter()
            .filter(|r| matches!(r, TraceRecord::Frame { .. }))
            .count() as u64
    }

    /// Final checksum chain from the summary, if present.
    #[must_use]
    pub fn final_checksum_chain(&self) -> Option<u64> {
        self.records.iter().rev().find_map(|r| match r {
            TraceRecord::Summary {
                final_checksum_chain,
                ..
            } => Some(*final_checksum_chain),
            _ => None,
        })
    }
}

/// Records a live session.
#[derive(Debug)]
pub struct SessionRecorder {
    session: WebSession<SeededRandom>,
    trace: SessionTrace,
    chain: u64,
    frames: u64,
}

impl SessionRecorder {
    /// Start a recorded session. The header captures everything replay
    /// needs besides the config.
    #[must_use]
    pub fn new(config: ValentineConfig, env: Environment, seed: u64) -> Self {
        let header = TraceRecord::Header {
            seed,
            viewport: env.viewport(),
            obstacle: env.obstacle(),
            coarse_pointer: env.is_coarse_pointer(),
            can_hover: env.can_hover(),
        };
        Self {
            session: WebSession::with_seed(config, env, seed),
            trace: SessionTrace {
                records: vec![header],
            },
            chain: 0,
            frames: 0,
        }
    }

    /// Queue and record a host event.
    pub fn push_event(&mut self, event: HostEvent) {
        self.trace.records.push(TraceRecord::Input { event });
        self.session.push_event(event);
    }

    /// Step the session and checkpoint the frame.
    pub fn step(&mut self, now: Duration) -> FrameSnapshot {
        let frame = self.session.step(now);
        let checksum = frame_checksum(&frame);
        self.chain = fnv1a64_pair(self.chain, checksum);
        self.trace.records.push(TraceRecord::Frame {
            frame_idx: self.frames,
            now_ms: frame.now_ms,
            checksum,
            checksum_chain: self.chain,
        });
        self.frames += 1;
        frame
    }

    #[must_use]
    pub const fn session(&self) -> &WebSession<SeededRandom> {
        &self.session
    }

    /// Close the trace with a summary record.
    #[must_use]
    pub fn finish(mut self) -> SessionTrace {
        self.trace.records.push(TraceRecord::Summary {
            total_frames: self.frames,
            final_checksum_chain: self.chain,
        });
        self.trace
    }
}

/// Outcome of replaying a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayResult {
    pub total_frames: u64,
    pub final_checksum_chain: u64,
    /// First frame whose checksum differed: `(frame_idx, expected, actual)`.
    pub first_mismatch: Option<(u64, u64, u64)>,
}

impl ReplayResult {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.first_mismatch.is_none()
    }
}

/// Replay `trace` against a fresh session built from its header.
pub fn replay(config: ValentineConfig, trace: &SessionTrace) -> Result<ReplayResult, WebError> {
    let mut records = trace.records.iter();
    let Some(TraceRecord::Header {
        seed,
        viewport,
        obstacle,
        coarse_pointer,
        can_hover,
    }) = records.next()
    else {
        return Err(WebError::Trace("missing header"));
    };

    let mut env = Environment::new(*viewport).with_capabilities(*coarse_pointer, *can_hover);
    if let Some(rect) = obstacle {
        env = env.with_obstacle(*rect);
    }
    let mut session = WebSession::with_seed(config, env, *seed);

    let mut chain = 0;
    let mut frames = 0;
    let mut first_mismatch = None;
    let mut summary_seen = false;

    for record in records {
        if summary_seen {
            return Err(WebError::Trace("records after summary"));
        }
        match record {
            TraceRecord::Header { .. } => return Err(WebError::Trace("duplicate header")),
            TraceRecord::Input { event } => session.push_event(*event),
            TraceRecord::Frame {
                frame_idx,
                now_ms,
                checksum,
                ..
            } => {
                let frame = session.step(Duration::from_millis(*now_ms));
                let actual = frame_checksum(&frame);
                chain = fnv1a64_pair(chain, actual);
                if actual != *checksum && first_mismatch.is_none() {
                    first_mismatch = Some((*frame_idx, *checksum, actual));
                }
                frames += 1;
            }
            TraceRecord::Summary { .. } => summary_seen = true,
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "valentine.web",
        frames,
        ok = first_mismatch.is_none(),
        "replay finished"
    );

    Ok(ReplayResult {
        total_frames: frames,
        final_checksum_chain: chain,
        first_mismatch,
    })
}
