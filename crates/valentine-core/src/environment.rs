#![forbid(unsafe_code)]

//! Environment sensing: viewport, pointer capability, live cursor.
//!
//! [`Environment`] is plain state pushed by the host. It never polls. Each
//! update reports whether anything changed so the caller can decide whether
//! dependent state (behavior mode, clamped positions) needs re-deriving.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Size};

/// What an environment update touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentChange {
    /// Nothing observable changed.
    Unchanged,
    /// Viewport dimensions changed.
    Viewport,
    /// Pointer coarseness and/or hover capability changed.
    Capabilities,
    /// The live pointer position was recorded.
    Pointer,
    /// The obstacle geometry changed.
    Obstacle,
}

/// Snapshot of everything the host has told us about its surroundings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Environment {
    viewport: Size,
    coarse_pointer: bool,
    can_hover: bool,
    pointer: Option<Point>,
    obstacle: Option<Rect>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Size::new(1024.0, 768.0))
    }
}

impl Environment {
    /// Fine pointer with hover, no cursor sample, no obstacle yet.
    #[must_use]
    pub const fn new(viewport: Size) -> Self {
        Self {
            viewport,
            coarse_pointer: false,
            can_hover: true,
            pointer: None,
            obstacle: None,
        }
    }

    /// Builder-style capability override.
    #[must_use]
    pub fn with_capabilities(mut self, coarse_pointer: bool, can_hover: bool) -> Self {
        self.set_capabilities(coarse_pointer, can_hover);
        self
    }

    /// Builder-style obstacle override.
    #[must_use]
    pub fn with_obstacle(mut self, obstacle: Rect) -> Self {
        self.set_obstacle(Some(obstacle));
        self
    }

    #[inline]
    pub const fn viewport(&self) -> Size {
        self.viewport
    }

    /// Touch-like input with no precise cursor.
    #[inline]
    pub const fn is_coarse_pointer(&self) -> bool {
        self.coarse_pointer
    }

    /// Mouse-like input that can hover without pressing.
    #[inline]
    pub const fn can_hover(&self) -> bool {
        self.can_hover
    }

    /// Last sampled cursor position. Always `None` on hover-less devices.
    #[inline]
    pub const fn pointer(&self) -> Option<Point> {
        self.pointer
    }

    /// The obstacle rectangle, if the host has measured a usable one.
    #[inline]
    pub const fn obstacle(&self) -> Option<Rect> {
        self.obstacle
    }

    pub fn resize(&mut self, width: f32, height: f32) -> EnvironmentChange {
        let next = Size::new(width.max(0.0), height.max(0.0));
        if next == self.viewport {
            return EnvironmentChange::Unchanged;
        }
        self.viewport = next;
        EnvironmentChange::Viewport
    }

    /// Apply a media-query change. Losing hover drops the cursor sample.
    pub fn set_capabilities(&mut self, coarse_pointer: bool, can_hover: bool) -> EnvironmentChange {
        if self.coarse_pointer == coarse_pointer && self.can_hover == can_hover {
            return EnvironmentChange::Unchanged;
        }
        self.coarse_pointer = coarse_pointer;
        self.can_hover = can_hover;
        if !can_hover {
            self.pointer = None;
        }
        EnvironmentChange::Capabilities
    }

    /// Record a cursor sample; ignored unless the device can hover.
    pub fn pointer_moved(&mut self, pos: Point) -> EnvironmentChange {
        if !self.can_hover {
            return EnvironmentChange::Unchanged;
        }
        self.pointer = Some(pos);
        EnvironmentChange::Pointer
    }

    /// Replace the obstacle geometry. Degenerate rectangles count as
    /// "not measurable".
    pub fn set_obstacle(&mut self, rect: Option<Rect>) -> EnvironmentChange {
        let next = rect.filter(Rect::is_measurable);
        if next == self.obstacle {
            return EnvironmentChange::Unchanged;
        }
        self.obstacle = next;
        EnvironmentChange::Obstacle
    }
}
