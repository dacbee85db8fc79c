#![forbid(unsafe_code)]

//! Declarative render descriptor.
//!
//! A [`FrameSnapshot`] is a pure function of the runtime state at `now`.
//! The host animates toward it; nothing in here feeds back into the state
//! machine.

use core::time::Duration;

use serde::Serialize;
use valentine_core::behavior::Mode;
use valentine_core::geometry::{Point, Rect, Size};
use valentine_core::rng::RandomSource;
use valentine_core::spot::{HideHint, Layer};
use valentine_runtime::Valentine;

/// The evasive control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementFrame {
    pub position: Point,
    /// Rendered (scaled) size.
    pub size: Size,
    pub layer: Layer,
    pub scale: f32,
    pub opacity: f32,
    pub mode: Mode,
    /// Phase label (`idle`, `frozen`, `fleeing`, ...).
    pub phase: &'static str,
    pub peek_offset: Point,
    pub tunnel_target: Option<Point>,
    pub hide_hint: Option<HideHint>,
    /// Hidden inside the box; the host should not draw it.
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxFrame {
    pub rect: Rect,
    pub phase: &'static str,
    pub fed: u8,
    pub needed: u8,
    /// Time left before the box expires, zero once past.
    pub expires_in_ms: u64,
}

/// A lure item in flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFrame {
    pub id: u64,
    pub position: Point,
    /// Flight fraction in `[0, 1]` for host-side easing.
    pub progress: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LureFrame {
    pub position: Point,
    pub held: bool,
}

/// Everything the rendering layer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub now_ms: u64,
    pub level: u8,
    pub accepted: bool,
    pub calm: bool,
    pub hold_progress: f32,
    pub element: ElementFrame,
    pub hide_box: Option<BoxFrame>,
    pub items: Vec<ItemFrame>,
    pub lure: Option<LureFrame>,
    pub feedback: Option<String>,
}

impl FrameSnapshot {
    /// Read the runtime state at `now`.
    #[must_use]
    pub fn capture<R: RandomSource>(app: &Valentine<R>, now: Duration) -> Self {
        let behavior = app.behavior();
        let evasion = app.evasion();
        let boxes = app.box_game();

        let element = ElementFrame {
            position: evasion.position(),
            size: app.element_size(),
            layer: evasion.layer(),
            scale: behavior.params.scale,
            opacity: behavior.params.opacity,
            mode: behavior.mode,
            phase: app.phase(now).as_str(),
            peek_offset: evasion.peek_offset(),
            tunnel_target: evasion.tunnel_target(),
            hide_hint: evasion.hide_hint(),
            hidden: boxes.is_occupied() && !evasion.is_free(),
        };

        let hide_box = boxes.is_present().then(|| BoxFrame {
            rect: boxes.rect(),
            phase: boxes.phase().as_str(),
            fed: boxes.fed(),
            needed: app.fish_needed(),
            expires_in_ms: boxes.expires_at().saturating_sub(now).as_millis() as u64,
        });

        let items = boxes
            .items()
            .iter()
            .map(|item| ItemFrame {
                id: item.id,
                position: item.position(now),
                progress: item.progress(now),
            })
            .collect();

        let lure = app.lure_point().map(|position| LureFrame {
            position,
            held: app.is_lure_held(),
        });

        Self {
            now_ms: now.as_millis() as u64,
            level: app.level(),
            accepted: app.is_accepted(),
            calm: app.is_calm(now),
            hold_progress: app.hold_progress(now),
            element,
            hide_box,
            items,
            lure,
            feedback: app.feedback(now).map(|shown| shown.feedback.text()),
        }
    }
}
