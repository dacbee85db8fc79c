#![forbid(unsafe_code)]

//! Canonical host events.
//!
//! The embedding host (browser, test harness, replay) translates its own
//! pointer, keyboard, resize, and media-query callbacks into [`HostEvent`]
//! values. Every event carries the coordinates it was observed at; the
//! runtime never queries the host.
//!
//! # Design Notes
//!
//! - Coordinates are viewport pixels (see [`crate::geometry`]).
//! - Keyboard activation (Enter/Space) is modeled as a separate variant so
//!   hosts do not have to synthesize fake pointer coordinates.
//! - `Tick` is the coarse (~100ms) heartbeat used only to re-evaluate
//!   time-windowed state.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// Interactive surfaces the host can route input to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Target {
    /// The evasive negative-response control.
    No,
    /// The positive-response control.
    Yes,
    /// The draggable lure attractor.
    Lure,
    /// The hide box.
    Box,
    /// The treat convenience control.
    Treat,
    /// Anything else (background, card body).
    Backdrop,
}

/// Keys that count as activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActivationKey {
    Enter,
    Space,
}

/// Whether a key went down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum KeyPhase {
    #[default]
    Down,
    Up,
}

/// Canonical host event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum HostEvent {
    /// A pointer went down over `target`.
    PointerDown { target: Target, pos: Point },

    /// A pointer was released over (or captured by) `target`.
    PointerUp { target: Target, pos: Point },

    /// The host aborted the pointer sequence (lost capture, blur, scroll).
    PointerCancel { target: Target },

    /// The pointer moved. `target` is the captured surface, if any.
    PointerMove { target: Option<Target>, pos: Point },

    /// Keyboard activation of a focused surface.
    Key {
        target: Target,
        key: ActivationKey,
        phase: KeyPhase,
    },

    /// The viewport was resized.
    Resize { width: f32, height: f32 },

    /// Pointer/hover media queries changed.
    MediaChange { coarse_pointer: bool, can_hover: bool },

    /// The central obstacle was (re)measured. `None` means it is not
    /// currently measurable (not laid out yet, display:none).
    ObstacleMeasured { rect: Option<Rect> },

    /// Coarse periodic heartbeat.
    Tick,
}

impl HostEvent {
    /// Short stable name for logs and traces.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PointerDown { .. } => "pointer_down",
            Self::PointerUp { .. } => "pointer_up",
            Self::PointerCancel { .. } => "pointer_cancel",
            Self::PointerMove { .. } => "pointer_move",
            Self::Key { .. } => "key",
            Self::Resize { .. } => "resize",
            Self::MediaChange { .. } => "media_change",
            Self::ObstacleMeasured { .. } => "obstacle_measured",
            Self::Tick => "tick",
        }
    }

    /// The surface this event is routed to, if it has one.
    #[must_use]
    pub const fn target(&self) -> Option<Target> {
        match self {
            Self::PointerDown { target, .. }
            | Self::PointerUp { target, .. }
            | Self::PointerCancel { target }
            | Self::Key { target, .. } => Some(*target),
            Self::PointerMove { target, .. } => *target,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_stable() {
        assert_eq!(HostEvent::Tick.name(), "tick");
        assert_eq!(
            HostEvent::Resize {
                width: 1.0,
                height: 1.0
            }
            .name(),
            "resize"
        );
    }

    #[test]
    fn target_routing() {
        let down = HostEvent::PointerDown {
            target: Target::No,
            pos: Point::new(1.0, 2.0),
        };
        assert_eq!(down.target(), Some(Target::No));
        let mv = HostEvent::PointerMove {
            target: None,
            pos: Point::default(),
        };
        assert_eq!(mv.target(), None);
        assert_eq!(HostEvent::Tick.target(), None);
    }
}
