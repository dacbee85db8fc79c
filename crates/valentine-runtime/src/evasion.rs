#![forbid(unsafe_code)]

//! Evasion controller: the single writer of the control's position.
//!
//! [`EvasionController`] owns the position, layer, and fairness timers of
//! the evasive control. Every writer (mode change, confirm follow-up, fear,
//! lure, dive, hold abandonment) goes through a guarded method here.
//!
//! # State Machine
//!
//! ```text
//!            reposition / steer            dive (box)
//!   Idle ───────────────────────▶ Frozen ─────────────▶ EnteringBox ──▶ InBox
//!    ▲   (freeze window elapses)    │                                    │
//!    └──────────────────────────────┘◀──────── release (exit) ───────────┘
//! ```
//!
//! `Fleeing` and `Luring` are `Frozen` labelled by the move that started
//! the window; `Confirming` overlays any free state while a hold runs.
//!
//! # Invariants
//!
//! 1. While `now < freeze_until`, no reposition or steer changes position
//!    or layer.
//! 2. While captured by the box, only the box enter/exit methods move the
//!    control.
//! 3. `Layer::Behind` implies a hide hint or a tunnel target (inherited from
//!    [`Spot`]).
//!
//! # Failure Modes
//!
//! - Guard violations are reported as outcomes, never errors. They leave
//!   state untouched.

use std::time::Duration;

use valentine_core::behavior::Mode;
use valentine_core::geometry::{Point, Size, clamp_to_viewport};
use valentine_core::rng::RandomSource;
use valentine_core::spot::{HideHint, Layer, Spot, SpotRequest, pick_spot};

/// Minimum level at which the control starts diving into boxes.
pub const DIVE_MIN_LEVEL: u8 = 3;

/// Why the control last moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveReason {
    Initial,
    ModeChange,
    Resize,
    Confirm,
    Fear,
    Lure,
    HoldAbandon,
    Coax,
    Explicit,
    BoxEnter,
    BoxExit,
}

impl MoveReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::ModeChange => "mode_change",
            Self::Resize => "resize",
            Self::Confirm => "confirm",
            Self::Fear => "fear",
            Self::Lure => "lure",
            Self::HoldAbandon => "hold_abandon",
            Self::Coax => "coax",
            Self::Explicit => "explicit",
            Self::BoxEnter => "box_enter",
            Self::BoxExit => "box_exit",
        }
    }

    /// Reposition events that may be turned into a box dive.
    #[must_use]
    pub const fn allows_dive(self) -> bool {
        matches!(
            self,
            Self::ModeChange | Self::Confirm | Self::Fear | Self::Explicit
        )
    }
}

/// Box ownership of the control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capture {
    #[default]
    Free,
    /// Moving into the box opening.
    Entering,
    /// Hidden inside the box.
    Inside,
}

/// Result of a guarded reposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositionOutcome {
    Moved,
    /// Inside the fairness window.
    Frozen,
    /// Owned by the box.
    InBox,
    /// A box dive took the move over; the control heads for the box
    /// after the dive delay.
    Deferred,
}

/// Result of a lure steering step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteerOutcome {
    Steered,
    /// Already within snapping distance of the attractor.
    Arrived,
    Blocked,
}

/// Result of a dive gate draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiveDecision {
    Dive,
    /// Eligible, but the probability gate said no.
    Declined,
    /// Not eligible; no random sample was drawn.
    Ineligible,
}

/// Externally-owned conditions a dive depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiveGates {
    /// A box is visible, empty, and not being entered.
    pub box_ready: bool,
    pub holding: bool,
    pub calm: bool,
    pub level: u8,
}

/// Observable controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvasionPhase {
    Idle,
    Frozen,
    Fleeing,
    Luring,
    EnteringBox,
    InBox,
    Confirming,
}

impl EvasionPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Frozen => "frozen",
            Self::Fleeing => "fleeing",
            Self::Luring => "luring",
            Self::EnteringBox => "entering_box",
            Self::InBox => "in_box",
            Self::Confirming => "confirming",
        }
    }
}

/// Position, layer, and fairness timers of the evasive control.
#[derive(Debug, Clone)]
pub struct EvasionController {
    position: Point,
    layer: Layer,
    peek_offset: Point,
    tunnel_target: Option<Point>,
    hide_hint: Option<HideHint>,
    allow_off: f32,
    capture: Capture,
    freeze_until: Duration,
    last_move: MoveReason,
    last_flee: Option<Duration>,
    last_dive_attempt: Option<Duration>,
    moves: u64,
}

impl EvasionController {
    #[must_use]
    pub fn new(position: Point) -> Self {
        Self {
            position,
            layer: Layer::Front,
            peek_offset: Point::default(),
            tunnel_target: None,
            hide_hint: None,
            allow_off: 0.0,
            capture: Capture::Free,
            freeze_until: Duration::ZERO,
            last_move: MoveReason::Initial,
            last_flee: None,
            last_dive_attempt: None,
            moves: 0,
        }
    }

    /// Start at a resolved spot without a freeze window.
    #[must_use]
    pub fn from_spot(spot: Spot) -> Self {
        let mut ctl = Self::new(spot.position);
        ctl.set_spot(spot);
        ctl
    }

    #[inline]
    pub const fn position(&self) -> Point {
        self.position
    }

    #[inline]
    pub const fn layer(&self) -> Layer {
        self.layer
    }

    #[inline]
    pub const fn peek_offset(&self) -> Point {
        self.peek_offset
    }

    #[inline]
    pub const fn tunnel_target(&self) -> Option<Point> {
        self.tunnel_target
    }

    #[inline]
    pub const fn hide_hint(&self) -> Option<HideHint> {
        self.hide_hint
    }

    /// Off-screen tolerance the current position was clamped with.
    #[inline]
    pub const fn allow_off(&self) -> f32 {
        self.allow_off
    }

    #[inline]
    pub const fn capture(&self) -> Capture {
        self.capture
    }

    #[inline]
    pub const fn freeze_until(&self) -> Duration {
        self.freeze_until
    }

    #[inline]
    pub const fn last_move(&self) -> MoveReason {
        self.last_move
    }

    /// Number of applied moves (repositions, steers, box transitions).
    #[inline]
    pub const fn moves(&self) -> u64 {
        self.moves
    }

    #[inline]
    pub fn is_frozen(&self, now: Duration) -> bool {
        now < self.freeze_until
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.capture == Capture::Free
    }

    /// Center of the control for the given rendered size.
    #[must_use]
    pub fn center(&self, element: Size) -> Point {
        self.position
            .offset(element.width / 2.0, element.height / 2.0)
    }

    pub fn phase(&self, now: Duration, holding: bool) -> EvasionPhase {
        match self.capture {
            Capture::Inside => return EvasionPhase::InBox,
            Capture::Entering => return EvasionPhase::EnteringBox,
            Capture::Free => {}
        }
        if holding {
            return EvasionPhase::Confirming;
        }
        if self.is_frozen(now) {
            return match self.last_move {
                MoveReason::Fear => EvasionPhase::Fleeing,
                MoveReason::Lure => EvasionPhase::Luring,
                _ => EvasionPhase::Frozen,
            };
        }
        EvasionPhase::Idle
    }

    fn set_spot(&mut self, spot: Spot) {
        self.position = spot.position;
        self.layer = spot.layer;
        self.peek_offset = if spot.layer == Layer::Behind {
            spot.peek_offset
        } else {
            Point::default()
        };
        self.tunnel_target = spot.tunnel_target;
        self.hide_hint = spot.hide_hint;
        self.allow_off = spot.allow_off;
    }

    fn set_front(&mut self, position: Point) {
        self.set_spot(Spot {
            position,
            layer: Layer::Front,
            peek_offset: Point::default(),
            tunnel_target: None,
            hide_hint: None,
            allow_off: 0.0,
        });
    }

    fn commit(&mut self, now: Duration, freeze: Duration, reason: MoveReason) {
        self.freeze_until = now.saturating_add(freeze);
        self.last_move = reason;
        self.moves += 1;
    }

    fn guard(&self, now: Duration) -> Option<RepositionOutcome> {
        if !self.is_free() {
            return Some(RepositionOutcome::InBox);
        }
        if self.is_frozen(now) {
            return Some(RepositionOutcome::Frozen);
        }
        None
    }

    /// Pick a spot for `mode` and move there, starting a freeze window.
    pub fn reposition<R: RandomSource + ?Sized>(
        &mut self,
        now: Duration,
        mode: Mode,
        reason: MoveReason,
        req: &SpotRequest<'_>,
        freeze: Duration,
        rng: &mut R,
    ) -> RepositionOutcome {
        if let Some(blocked) = self.guard(now) {
            tracing::trace!(
                target: "valentine.evasion",
                reason = reason.as_str(),
                blocked = ?blocked,
                "reposition rejected"
            );
            return blocked;
        }
        let spot = pick_spot(mode, req, rng);
        self.apply(spot, now, freeze, reason);
        RepositionOutcome::Moved
    }

    /// Move to an already-resolved spot, subject to the same guards.
    pub fn reposition_to(
        &mut self,
        now: Duration,
        spot: Spot,
        reason: MoveReason,
        freeze: Duration,
    ) -> RepositionOutcome {
        if let Some(blocked) = self.guard(now) {
            return blocked;
        }
        self.apply(spot, now, freeze, reason);
        RepositionOutcome::Moved
    }

    fn apply(&mut self, spot: Spot, now: Duration, freeze: Duration, reason: MoveReason) {
        self.set_spot(spot);
        self.commit(now, freeze, reason);
        tracing::debug!(
            target: "valentine.evasion",
            reason = reason.as_str(),
            x = spot.position.x,
            y = spot.position.y,
            layer = ?spot.layer,
            hint = spot.hide_hint.map(HideHint::as_str),
            "control moved"
        );
    }

    /// Pull the current position back inside the viewport after a resize.
    ///
    /// This is not a reposition: layer and hints are kept and no freeze is
    /// started, so it is allowed while frozen or captured.
    pub fn reclamp(&mut self, element: Size, viewport: Size) -> bool {
        let clamped = clamp_to_viewport(self.position, element, viewport, self.allow_off);
        let changed = clamped != self.position;
        self.position = clamped;
        if let Some(end) = self.tunnel_target {
            self.tunnel_target = Some(clamp_to_viewport(end, element, viewport, self.allow_off));
        }
        changed
    }

    /// Decide whether pointer proximity should trigger a flight.
    ///
    /// Returns the mode to flee with: tunnel when hiding behind the card,
    /// random otherwise. A `Some` result records the flight for the
    /// cooldown.
    #[allow(clippy::too_many_arguments)]
    pub fn fear_check(
        &mut self,
        now: Duration,
        pointer: Point,
        element: Size,
        radius: f32,
        cooldown: Duration,
        fear_aura: bool,
        holding: bool,
    ) -> Option<Mode> {
        if !fear_aura || holding || !self.is_free() || self.is_frozen(now) {
            return None;
        }
        if self
            .last_flee
            .is_some_and(|last| now.saturating_sub(last) < cooldown)
        {
            return None;
        }
        if pointer.distance(self.center(element)) >= radius {
            return None;
        }
        self.last_flee = Some(now);
        Some(if self.layer == Layer::Behind {
            Mode::Tunnel
        } else {
            Mode::Random
        })
    }

    /// Move the control so its center sits on the attractor.
    #[allow(clippy::too_many_arguments)]
    pub fn steer_toward(
        &mut self,
        now: Duration,
        lure: Point,
        element: Size,
        viewport: Size,
        snap: f32,
        freeze: Duration,
        holding: bool,
    ) -> SteerOutcome {
        if holding || self.guard(now).is_some() {
            return SteerOutcome::Blocked;
        }
        if lure.distance(self.center(element)) <= snap {
            return SteerOutcome::Arrived;
        }
        let desired = lure.offset(-element.width / 2.0, -element.height / 2.0);
        self.set_front(clamp_to_viewport(desired, element, viewport, 0.0));
        self.commit(now, freeze, MoveReason::Lure);
        SteerOutcome::Steered
    }

    /// Draw the box-dive probability gate if every precondition holds.
    pub fn dive_gate<R: RandomSource + ?Sized>(
        &mut self,
        now: Duration,
        gates: DiveGates,
        cooldown: Duration,
        chance: f32,
        rng: &mut R,
    ) -> DiveDecision {
        let eligible = gates.box_ready
            && self.is_free()
            && !gates.holding
            && !gates.calm
            && gates.level >= DIVE_MIN_LEVEL
            && !self.is_frozen(now)
            && self
                .last_dive_attempt
                .is_none_or(|last| now.saturating_sub(last) >= cooldown);
        if !eligible {
            return DiveDecision::Ineligible;
        }
        self.last_dive_attempt = Some(now);
        if rng.chance(chance) {
            DiveDecision::Dive
        } else {
            DiveDecision::Declined
        }
    }

    /// Hand the control to the box: it heads for the opening.
    pub fn begin_capture(&mut self, now: Duration, opening: Point) -> bool {
        if !self.is_free() {
            return false;
        }
        self.set_front(opening);
        self.capture = Capture::Entering;
        self.commit(now, Duration::ZERO, MoveReason::BoxEnter);
        true
    }

    /// The entering transition finished.
    pub fn settle_in_box(&mut self) -> bool {
        if self.capture != Capture::Entering {
            return false;
        }
        self.capture = Capture::Inside;
        true
    }

    /// Carry a boxed control along with its box. Free controls are left to
    /// the guarded movers.
    pub fn follow_box(&mut self, position: Point) -> bool {
        if self.is_free() {
            return false;
        }
        self.position = position;
        true
    }

    /// Leave the box at `lip`, starting a freeze window.
    pub fn release_from_box(&mut self, now: Duration, lip: Point, freeze: Duration) -> bool {
        if self.capture == Capture::Free {
            return false;
        }
        self.capture = Capture::Free;
        self.set_front(lip);
        self.commit(now, freeze, MoveReason::BoxExit);
        true
    }
}
