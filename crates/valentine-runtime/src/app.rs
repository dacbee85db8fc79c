#![forbid(unsafe_code)]

//! The explicit state container.
//!
//! [`Valentine`] owns every timer and flag of the evasive control: the
//! escalation counter, the evasion controller, the hold gesture, the box
//! minigame, the calm window, the lure attractor, and the transient
//! feedback line. Hosts feed it [`HostEvent`]s and ticks; renderers read it
//! through the accessors.
//!
//! # Update cycle
//!
//! Every entry point takes `now` once. [`Valentine::handle`] first runs
//! [`Valentine::advance`] (due timers, hold sampling, box lifecycle,
//! derived behavior), then dispatches the event. Behavior is recomputed
//! from the latest inputs before any position write, so a resize and a
//! level change arriving together never apply a stale spot.
//!
//! # Invariants
//!
//! 1. The level stays in `[0, TOP_LEVEL]`.
//! 2. The control's position satisfies `within_viewport` for its current
//!    rendered size and tolerance after every call.
//! 3. Timers never outlive a restart or acceptance: both clear the queue
//!    atomically before scheduling anything new.
//! 4. A timer firing into a state that no longer wants it is a logged
//!    no-op.
//!
//! # Failure Modes
//!
//! - Guard violations return outcome values; nothing here returns an error.

use std::time::Duration;

use valentine_core::behavior::{
    Behavior, BehaviorInputs, Mode, fear_radius, fish_needed, select_behavior,
};
use valentine_core::environment::{Environment, EnvironmentChange};
use valentine_core::event::{HostEvent, KeyPhase, Target};
use valentine_core::geometry::{Point, Size, clamp_to_viewport};
use valentine_core::hold::{HoldGesture, HoldRelease, HoldSample, HoldStart};
use valentine_core::rng::{RandomSource, SeededRandom};
use valentine_core::spot::{HideHint, Layer, SpotRequest, SpotTuning, pick_spot};

use crate::box_game::{BoxGame, BoxPhase, Delivery, SpawnOutcome, SpawnParams, TapOutcome};
use crate::config::ValentineConfig;
use crate::escalation::{ConfirmOutcome, Escalation};
use crate::evasion::{
    DiveDecision, DiveGates, EvasionController, EvasionPhase, MoveReason, RepositionOutcome,
};
use crate::feedback::{Feedback, ShownFeedback};
use crate::timer::{TimerId, TimerQueue};

/// Minimum level at which boxes start appearing.
pub const BOX_MIN_LEVEL: u8 = 3;

/// Early releases below this progress may duck behind the card.
const ABANDON_THRESHOLD: f32 = 0.35;
/// Early releases at or above this progress get the strongest encouragement.
const SO_CLOSE_THRESHOLD: f32 = 0.75;

/// Deferred effects owned by the state container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    /// Follow-up move for the given reason.
    Reposition(MoveReason),
    /// The dive delay elapsed; head for the box.
    EnterBox,
    /// The entering transition finished.
    SettleInBox,
    /// Let the fed occupant out.
    ExitBox,
    /// A lure item arrives.
    FishLands(u64),
    ClearFeedback,
    /// Wrap the level from the top back to zero.
    LoopReset,
}

impl Scheduled {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reposition(_) => "reposition",
            Self::EnterBox => "enter_box",
            Self::SettleInBox => "settle_in_box",
            Self::ExitBox => "exit_box",
            Self::FishLands(_) => "fish_lands",
            Self::ClearFeedback => "clear_feedback",
            Self::LoopReset => "loop_reset",
        }
    }
}

fn spot_request<'a>(
    env: &'a Environment,
    tuning: &'a SpotTuning,
    behavior: &Behavior,
    level: u8,
    element: Size,
) -> SpotRequest<'a> {
    SpotRequest {
        env,
        level,
        element,
        scale: behavior.params.scale,
        wander_factor: behavior.params.wander_factor,
        tuning,
    }
}

/// State container for one greeting.
#[derive(Debug)]
pub struct Valentine<R: RandomSource = SeededRandom> {
    config: ValentineConfig,
    tuning: SpotTuning,
    env: Environment,
    rng: R,
    escalation: Escalation,
    evasion: EvasionController,
    hold: HoldGesture,
    boxes: BoxGame,
    timers: TimerQueue<Scheduled>,
    behavior: Behavior,
    calm_until: Duration,
    lure_point: Option<Point>,
    lure_held: bool,
    feedback: Option<ShownFeedback>,
    feedback_timer: Option<TimerId>,
    now: Duration,
}

impl Valentine<SeededRandom> {
    /// Convenience constructor with a seeded `SmallRng`.
    #[must_use]
    pub fn with_seed(config: ValentineConfig, env: Environment, seed: u64, now: Duration) -> Self {
        Self::new(config, env, SeededRandom::from_seed(seed), now)
    }
}

impl<R: RandomSource> Valentine<R> {
    #[must_use]
    pub fn new(config: ValentineConfig, env: Environment, mut rng: R, now: Duration) -> Self {
        let tuning = config.to_spot_tuning();
        let behavior = select_behavior(BehaviorInputs {
            level: 0,
            coarse_pointer: env.is_coarse_pointer(),
            can_hover: env.can_hover(),
            ..BehaviorInputs::default()
        });
        let element = config.element_size().scaled(behavior.params.scale);
        let spot = pick_spot(
            behavior.mode,
            &spot_request(&env, &tuning, &behavior, 0, element),
            &mut rng,
        );
        Self {
            tuning,
            env,
            rng,
            escalation: Escalation::new(),
            evasion: EvasionController::from_spot(spot),
            hold: HoldGesture::new(),
            boxes: BoxGame::new(now),
            timers: TimerQueue::new(),
            behavior,
            calm_until: Duration::ZERO,
            lure_point: None,
            lure_held: false,
            feedback: None,
            feedback_timer: None,
            now,
            config,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    #[inline]
    pub const fn config(&self) -> &ValentineConfig {
        &self.config
    }

    #[inline]
    pub const fn environment(&self) -> &Environment {
        &self.env
    }

    #[inline]
    pub const fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    #[inline]
    pub const fn evasion(&self) -> &EvasionController {
        &self.evasion
    }

    #[inline]
    pub const fn box_game(&self) -> &BoxGame {
        &self.boxes
    }

    #[inline]
    pub const fn escalation(&self) -> &Escalation {
        &self.escalation
    }

    #[inline]
    pub fn level(&self) -> u8 {
        self.escalation.level()
    }

    #[inline]
    pub fn is_accepted(&self) -> bool {
        self.escalation.is_accepted()
    }

    /// Timestamp of the latest update.
    #[inline]
    pub const fn now(&self) -> Duration {
        self.now
    }

    #[inline]
    pub const fn calm_until(&self) -> Duration {
        self.calm_until
    }

    #[inline]
    pub fn is_calm(&self, now: Duration) -> bool {
        now < self.calm_until
    }

    #[inline]
    pub const fn lure_point(&self) -> Option<Point> {
        self.lure_point
    }

    #[inline]
    pub const fn is_lure_held(&self) -> bool {
        self.lure_held
    }

    #[inline]
    pub fn is_holding(&self) -> bool {
        self.hold.is_active()
    }

    pub fn hold_progress(&self, now: Duration) -> f32 {
        self.hold.progress(now)
    }

    /// Lure items required to release the current occupant.
    pub fn fish_needed(&self) -> u8 {
        fish_needed(self.level())
    }

    /// The feedback line if it is still on screen at `now`.
    pub fn feedback(&self, now: Duration) -> Option<ShownFeedback> {
        self.feedback.filter(|shown| shown.is_visible(now))
    }

    /// Rendered (scaled) size of the control.
    pub fn element_size(&self) -> Size {
        self.config.element_size().scaled(self.behavior.params.scale)
    }

    pub fn phase(&self, now: Duration) -> EvasionPhase {
        self.evasion.phase(now, self.hold.is_active())
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    /// Whether any pending timer matches.
    pub fn has_pending(&self, pred: impl FnMut(&Scheduled) -> bool) -> bool {
        self.timers.any(pred)
    }

    // ── Update cycle ─────────────────────────────────────────────────────

    /// Dispatch one host event. Runs [`advance`](Self::advance) first.
    pub fn handle(&mut self, event: &HostEvent, now: Duration) {
        self.advance(now);
        if matches!(event, HostEvent::Tick) {
            return;
        }
        tracing::trace!(target: "valentine.evasion", event = event.name(), "host event");

        match *event {
            HostEvent::Resize { width, height } => {
                if self.env.resize(width, height) == EnvironmentChange::Viewport {
                    self.layout_changed(now);
                }
            }
            HostEvent::MediaChange {
                coarse_pointer,
                can_hover,
            } => {
                if self.env.set_capabilities(coarse_pointer, can_hover)
                    == EnvironmentChange::Capabilities
                {
                    self.sync_behavior(now);
                }
            }
            HostEvent::ObstacleMeasured { rect } => {
                if self.env.set_obstacle(rect) == EnvironmentChange::Obstacle {
                    self.layout_changed(now);
                }
            }
            HostEvent::PointerMove { pos, .. } => {
                if self.lure_held {
                    self.lure_move(now, pos);
                }
                if self.env.pointer_moved(pos) == EnvironmentChange::Pointer {
                    self.fear_check(now);
                }
            }
            HostEvent::PointerDown { target, pos } => {
                if self.is_accepted() && target != Target::Yes {
                    return;
                }
                match target {
                    Target::No => {
                        self.press_no(now);
                    }
                    Target::Lure => self.lure_grab(now, pos),
                    Target::Box => {
                        self.tap_box(now, Some(pos));
                    }
                    Target::Treat => self.give_treat(now),
                    Target::Yes => {
                        self.accept(now);
                    }
                    Target::Backdrop => {}
                }
            }
            HostEvent::PointerUp { target, .. } => {
                if target == Target::No {
                    self.release_no(now);
                }
                if self.lure_held {
                    self.lure_release(now);
                }
            }
            HostEvent::PointerCancel { target } => {
                if target == Target::No {
                    self.cancel_no();
                }
                if self.lure_held {
                    self.lure_release(now);
                }
            }
            HostEvent::Key { target, phase, .. } => {
                if self.is_accepted() && target != Target::Yes {
                    return;
                }
                match (target, phase) {
                    (Target::No, KeyPhase::Down) => {
                        self.press_no(now);
                    }
                    (Target::No, KeyPhase::Up) => {
                        self.release_no(now);
                    }
                    (Target::Box, KeyPhase::Down) => {
                        self.tap_box(now, None);
                    }
                    (Target::Treat, KeyPhase::Down) => self.give_treat(now),
                    (Target::Yes, KeyPhase::Down) => {
                        self.accept(now);
                    }
                    _ => {}
                }
            }
            HostEvent::Tick => {}
        }
    }

    /// Re-evaluate time-windowed state: due timers, the hold gesture, box
    /// expiry and spawning, lure steering, and fear.
    pub fn advance(&mut self, now: Duration) {
        self.now = self.now.max(now);
        self.sync_behavior(now);

        while let Some((id, action)) = self.timers.pop_due(now) {
            self.fire(now, id, action);
        }

        if let HoldSample::Completed = self.hold.sample(now) {
            tracing::debug!(target: "valentine.hold", "hold completed");
            self.confirm_no(now);
        }

        if self.boxes.expire(now) {
            self.sync_behavior(now);
        }
        self.maybe_spawn_box(now);

        self.steer(now);
        self.fear_check(now);
    }

    fn fire(&mut self, now: Duration, id: TimerId, action: Scheduled) {
        tracing::trace!(
            target: "valentine.timer",
            id = id.get(),
            action = action.as_str(),
            "timer fired"
        );
        match action {
            Scheduled::Reposition(reason) => {
                self.reposition(now, reason);
            }
            Scheduled::EnterBox => self.enter_box(now),
            Scheduled::SettleInBox => {
                if self.boxes.complete_enter(now, self.config.timing.box_occupied_extension())
                    && self.evasion.settle_in_box()
                {
                    self.sync_behavior(now);
                } else {
                    tracing::debug!(target: "valentine.timer", "settle fired without an entering box");
                }
            }
            Scheduled::ExitBox => self.exit_box(now),
            Scheduled::FishLands(item) => {
                if self.boxes.land(item).is_some() {
                    self.deliver_fish(now);
                }
            }
            Scheduled::ClearFeedback => {
                if self.feedback_timer == Some(id) {
                    self.feedback = None;
                    self.feedback_timer = None;
                }
            }
            Scheduled::LoopReset => {
                if self.escalation.loop_reset() {
                    tracing::debug!(target: "valentine.escalation", "level looped to 0");
                    self.sync_behavior(now);
                } else {
                    tracing::debug!(target: "valentine.timer", "loop reset fired without a loop");
                }
            }
        }
    }

    // ── Derived behavior ─────────────────────────────────────────────────

    fn behavior_inputs(&self, now: Duration) -> BehaviorInputs {
        BehaviorInputs {
            level: self.escalation.level(),
            coarse_pointer: self.env.is_coarse_pointer(),
            can_hover: self.env.can_hover(),
            calm: self.is_calm(now),
            lure_held: self.lure_held,
            occupied: !self.evasion.is_free(),
        }
    }

    /// Recompute behavior; a changed mode triggers a move unless one is
    /// already scheduled, a changed scale re-clamps in place.
    fn sync_behavior(&mut self, now: Duration) {
        let next = select_behavior(self.behavior_inputs(now));
        let previous = std::mem::replace(&mut self.behavior, next);
        if next.params.scale != previous.params.scale {
            self.realign();
        }
        if next.mode != previous.mode {
            tracing::debug!(
                target: "valentine.evasion",
                from = previous.mode.as_str(),
                to = next.mode.as_str(),
                "mode changed"
            );
            let pending = self
                .timers
                .any(|a| matches!(a, Scheduled::Reposition(_)));
            if !pending {
                self.reposition(now, MoveReason::ModeChange);
            }
        }
    }

    fn layout_changed(&mut self, now: Duration) {
        self.sync_behavior(now);
        self.realign();
        self.reposition(now, MoveReason::Resize);
    }

    /// Fit the box and the control into the current viewport. A boxed
    /// control stays seated in its box.
    fn realign(&mut self) {
        let viewport = self.env.viewport();
        self.boxes.clamp_into(viewport);
        let element = self.element_size();
        if self.evasion.is_free() {
            self.evasion.reclamp(element, viewport);
        } else {
            let seat = self.box_seat(element);
            self.evasion.follow_box(seat);
        }
    }

    /// Top-left position that centers the control on the box opening.
    fn box_seat(&self, element: Size) -> Point {
        let opening = self
            .boxes
            .opening()
            .offset(-element.width / 2.0, -element.height / 2.0);
        clamp_to_viewport(opening, element, self.env.viewport(), 0.0)
    }

    // ── Movement ─────────────────────────────────────────────────────────

    /// Explicit reposition request from the host.
    pub fn request_reposition(&mut self, now: Duration) -> RepositionOutcome {
        self.advance(now);
        self.reposition(now, MoveReason::Explicit)
    }

    fn reposition(&mut self, now: Duration, reason: MoveReason) -> RepositionOutcome {
        let mode = self.behavior.mode;
        self.reposition_with(now, mode, reason)
    }

    /// Guarded move with an explicit mode. Holding counts as frozen.
    fn reposition_with(&mut self, now: Duration, mode: Mode, reason: MoveReason) -> RepositionOutcome {
        if self.is_accepted() {
            return RepositionOutcome::Frozen;
        }
        if self.hold.is_active() && self.evasion.is_free() {
            tracing::trace!(target: "valentine.evasion", reason = reason.as_str(), "move suppressed while holding");
            return RepositionOutcome::Frozen;
        }
        if reason.allows_dive() && self.try_dive(now) {
            return RepositionOutcome::Deferred;
        }
        let element = self.element_size();
        let level = self.escalation.level();
        let req = spot_request(&self.env, &self.tuning, &self.behavior, level, element);
        self.evasion.reposition(
            now,
            mode,
            reason,
            &req,
            self.config.timing.freeze(),
            &mut self.rng,
        )
    }

    fn try_dive(&mut self, now: Duration) -> bool {
        let gates = DiveGates {
            box_ready: self.boxes.is_ready() && !self.timers.any(|a| *a == Scheduled::EnterBox),
            holding: self.hold.is_active(),
            calm: self.is_calm(now),
            level: self.escalation.level(),
        };
        let decision = self.evasion.dive_gate(
            now,
            gates,
            self.config.timing.dive_cooldown(),
            self.config.chance.dive,
            &mut self.rng,
        );
        if decision == DiveDecision::Dive {
            tracing::debug!(target: "valentine.evasion", "dive scheduled");
            self.timers
                .schedule(now, self.config.timing.dive_delay(), Scheduled::EnterBox);
            true
        } else {
            false
        }
    }

    fn steer(&mut self, now: Duration) {
        if self.is_accepted() || !self.behavior.params.lure_enabled {
            return;
        }
        let Some(lure) = self.lure_point else {
            return;
        };
        self.evasion.steer_toward(
            now,
            lure,
            self.element_size(),
            self.env.viewport(),
            self.config.geometry.lure_snap_px,
            self.config.timing.lure_freeze(),
            self.hold.is_active(),
        );
    }

    fn fear_check(&mut self, now: Duration) {
        if self.is_accepted() {
            return;
        }
        let Some(pointer) = self.env.pointer() else {
            return;
        };
        let flee = self.evasion.fear_check(
            now,
            pointer,
            self.element_size(),
            fear_radius(self.escalation.level()),
            self.config.timing.flee_cooldown(),
            self.behavior.params.fear_aura && !self.is_calm(now),
            self.hold.is_active(),
        );
        if let Some(mode) = flee {
            self.reposition_with(now, mode, MoveReason::Fear);
        }
    }

    // ── Hold to confirm ──────────────────────────────────────────────────

    /// Pointer or key down on the control.
    pub fn press_no(&mut self, now: Duration) -> HoldStart {
        let blocked = self.is_accepted() || !self.evasion.is_free();
        let outcome = self
            .hold
            .start(now, self.behavior.params.hold_duration, blocked);
        match outcome {
            HoldStart::Started => {
                tracing::debug!(
                    target: "valentine.hold",
                    duration_ms = self.behavior.params.hold_duration.as_millis() as u64,
                    "hold started"
                );
            }
            HoldStart::Blocked => {
                tracing::trace!(target: "valentine.hold", "hold blocked");
                if !self.is_accepted() {
                    self.show(now, Feedback::HoldRefused);
                }
            }
            HoldStart::AlreadyActive => {
                tracing::trace!(target: "valentine.hold", "hold already active");
            }
        }
        outcome
    }

    /// Pointer or key up on the control.
    pub fn release_no(&mut self, now: Duration) -> HoldRelease {
        let outcome = self.hold.release(now);
        match outcome {
            HoldRelease::Idle => {}
            HoldRelease::Completed => {
                tracing::debug!(target: "valentine.hold", "hold completed on release");
                self.confirm_no(now);
            }
            HoldRelease::Released(progress) => {
                tracing::debug!(target: "valentine.hold", progress, "hold released early");
                self.early_release(now, progress);
            }
        }
        outcome
    }

    /// Abort the hold without feedback.
    pub fn cancel_no(&mut self) -> bool {
        self.hold.cancel()
    }

    fn early_release(&mut self, now: Duration, progress: f32) {
        if progress >= SO_CLOSE_THRESHOLD {
            self.show(now, Feedback::SoClose);
            return;
        }
        if progress >= ABANDON_THRESHOLD {
            self.show(now, Feedback::AlmostHadIt);
            return;
        }
        let may_duck = !self.evasion.is_frozen(now)
            && self.escalation.level() >= 3
            && !self.is_calm(now);
        if may_duck
            && self.reposition_with(now, Mode::Hide, MoveReason::HoldAbandon)
                == RepositionOutcome::Moved
        {
            let hint = self.evasion.hide_hint().unwrap_or(HideHint::BottomCenter);
            self.show(now, Feedback::DuckedAway(hint));
        } else {
            self.show(now, Feedback::TooQuick);
        }
    }

    /// Count one confirmed "no".
    pub fn confirm_no(&mut self, now: Duration) -> ConfirmOutcome {
        let outcome = self.escalation.confirm();
        match outcome {
            ConfirmOutcome::Advanced { from, to } => {
                tracing::debug!(target: "valentine.escalation", from, to, "confirmed");
                self.show(now, Feedback::Counted { level: to });
                self.schedule_confirm_move(now);
            }
            ConfirmOutcome::LoopArmed => {
                tracing::debug!(target: "valentine.escalation", "loop armed");
                self.show(now, Feedback::Looping);
                self.timers
                    .schedule(now, self.config.timing.loop_reset(), Scheduled::LoopReset);
                self.schedule_confirm_move(now);
            }
            ConfirmOutcome::IgnoredLooping | ConfirmOutcome::IgnoredAccepted => {
                tracing::trace!(target: "valentine.escalation", outcome = ?outcome, "confirm ignored");
            }
        }
        self.sync_behavior(now);
        outcome
    }

    fn schedule_confirm_move(&mut self, now: Duration) {
        self.timers.schedule(
            now,
            self.config.timing.confirm_reposition_delay(),
            Scheduled::Reposition(MoveReason::Confirm),
        );
    }

    // ── Lure ─────────────────────────────────────────────────────────────

    pub fn lure_grab(&mut self, now: Duration, pos: Point) {
        self.lure_held = true;
        self.lure_point = Some(pos);
        self.sync_behavior(now);
        self.steer(now);
    }

    pub fn lure_move(&mut self, now: Duration, pos: Point) {
        if !self.lure_held {
            return;
        }
        self.lure_point = Some(pos);
        self.steer(now);
    }

    /// Let go of the attractor. The last point is kept as the throw origin.
    pub fn lure_release(&mut self, now: Duration) {
        if !self.lure_held {
            return;
        }
        self.lure_held = false;
        self.sync_behavior(now);
    }

    // ── Box minigame ─────────────────────────────────────────────────────

    fn maybe_spawn_box(&mut self, now: Duration) {
        if self.is_accepted()
            || self.escalation.level() < BOX_MIN_LEVEL
            || !self
                .boxes
                .can_spawn(now, self.config.timing.box_respawn_cooldown())
        {
            return;
        }
        self.spawn_box(now);
    }

    /// Place a box now, ignoring the respawn policy.
    pub fn spawn_box(&mut self, now: Duration) -> SpawnOutcome {
        let g = &self.config.geometry;
        let params = SpawnParams {
            size: self.config.box_size(),
            pad: if self.env.is_coarse_pointer() {
                g.box_pad_coarse
            } else {
                g.box_pad_fine
            },
            inset: g.box_edge_inset,
            attempts: g.box_spawn_attempts,
            lifetime: self.config.timing.box_lifetime(),
        };
        self.boxes.spawn(now, &self.env, params, &mut self.rng)
    }

    fn enter_box(&mut self, now: Duration) {
        if !self.evasion.is_free() || !self.boxes.begin_enter(self.hold.is_active()) {
            tracing::debug!(target: "valentine.timer", "dive fired but the box was not ready");
            return;
        }
        let opening = self.box_seat(self.element_size());
        self.evasion.begin_capture(now, opening);
        self.show(now, Feedback::Dove);
        self.timers
            .schedule(now, self.config.timing.box_enter(), Scheduled::SettleInBox);
        self.sync_behavior(now);
    }

    fn exit_box(&mut self, now: Duration) {
        if !self.boxes.exit(now, self.config.timing.box_exit_grace()) {
            tracing::debug!(target: "valentine.timer", "exit fired without an occupant");
            return;
        }
        let element = self.element_size();
        let lip = self
            .boxes
            .lip()
            .offset(-element.width / 2.0, -element.height / 2.0);
        let lip = clamp_to_viewport(lip, element, self.env.viewport(), 0.0);
        self.evasion
            .release_from_box(now, lip, self.config.timing.freeze());
        self.show(now, Feedback::BoxEscaped);
        self.sync_behavior(now);
    }

    /// Direct interaction with the box (tap, click, Enter/Space).
    pub fn tap_box(&mut self, now: Duration, pos: Option<Point>) -> TapOutcome {
        let outcome = self.boxes.tap(self.config.chance.box_tap_scare, &mut self.rng);
        match outcome {
            TapOutcome::Scared => {
                let free = self.evasion.is_free() && !self.hold.is_active();
                if free && !self.timers.any(|a| *a == Scheduled::EnterBox) {
                    tracing::debug!(target: "valentine.box", "tap scared the control");
                    self.timers
                        .schedule(now, self.config.timing.dive_delay(), Scheduled::EnterBox);
                }
            }
            TapOutcome::Feed => {
                let from = self.lure_point.or(pos).unwrap_or_else(|| self.throw_origin());
                self.throw_fish(now, from);
            }
            TapOutcome::Shrugged | TapOutcome::Busy | TapOutcome::Absent => {}
        }
        outcome
    }

    fn throw_origin(&self) -> Point {
        let view = self.env.viewport();
        Point::new(view.width / 2.0, view.height)
    }

    /// Throw a lure item from `from` toward the box. Always accepted; the
    /// arrival decides whether it counts. Returns the item id.
    pub fn throw_fish(&mut self, now: Duration, from: Point) -> u64 {
        let to = if self.boxes.is_present() {
            self.boxes.center()
        } else {
            from
        };
        let flight = self.config.timing.fish_flight();
        let id = self.boxes.throw(now, from, to, flight);
        self.timers.schedule(now, flight, Scheduled::FishLands(id));
        tracing::trace!(target: "valentine.box", id, "lure item thrown");
        id
    }

    /// Count one arrived lure item against the occupant.
    pub fn deliver_fish(&mut self, now: Duration) -> Delivery {
        let needed = self.fish_needed();
        let delivery = self.boxes.deliver(needed);
        match delivery {
            Delivery::Counted { fed, needed } => {
                self.show(now, Feedback::FishCounted { fed, needed });
            }
            Delivery::Released => {
                self.show(
                    now,
                    Feedback::FishCounted {
                        fed: self.boxes.fed(),
                        needed,
                    },
                );
                self.timers
                    .schedule(now, self.config.timing.box_exit_delay(), Scheduled::ExitBox);
            }
            Delivery::Ignored => self.show(now, Feedback::FishIgnored),
            Delivery::ExitPending => self.show(now, Feedback::FishWhileLeaving),
        }
        delivery
    }

    /// Calm everything down; feeds an occupant twice or coaxes a hiding
    /// control back to the front.
    pub fn give_treat(&mut self, now: Duration) {
        self.calm_until = now.saturating_add(self.config.timing.calm());
        self.show(now, Feedback::TreatGiven);
        tracing::debug!(
            target: "valentine.evasion",
            calm_until_ms = self.calm_until.as_millis() as u64,
            "treat given"
        );
        if self.boxes.phase() == BoxPhase::Occupied {
            let from = self.lure_point.unwrap_or_else(|| self.throw_origin());
            self.throw_fish(now, from);
            self.throw_fish(now, from);
        } else if self.evasion.layer() == Layer::Behind {
            self.reposition_with(now, Mode::Near, MoveReason::Coax);
        }
        self.sync_behavior(now);
    }

    // ── Terminal state ───────────────────────────────────────────────────

    /// Choose the positive response. Returns `false` if already accepted.
    pub fn accept(&mut self, now: Duration) -> bool {
        if !self.escalation.accept() {
            return false;
        }
        self.hold.cancel();
        self.lure_held = false;
        let dropped = self.timers.clear();
        self.feedback_timer = None;
        tracing::debug!(target: "valentine.escalation", cancelled_timers = dropped, "accepted");
        self.show(now, Feedback::Accepted);
        true
    }

    /// Return every field to its initial value. Idempotent.
    pub fn restart(&mut self, now: Duration) {
        let dropped = self.timers.clear();
        self.hold.cancel();
        self.escalation.reset();
        self.boxes.reset(now);
        self.calm_until = Duration::ZERO;
        self.lure_point = None;
        self.lure_held = false;
        self.feedback = None;
        self.feedback_timer = None;
        self.now = now;
        self.behavior = select_behavior(self.behavior_inputs_at_rest());
        let element = self.element_size();
        let spot = pick_spot(
            self.behavior.mode,
            &spot_request(&self.env, &self.tuning, &self.behavior, 0, element),
            &mut self.rng,
        );
        self.evasion = EvasionController::from_spot(spot);
        tracing::debug!(target: "valentine.escalation", cancelled_timers = dropped, "restarted");
    }

    fn behavior_inputs_at_rest(&self) -> BehaviorInputs {
        BehaviorInputs {
            level: 0,
            coarse_pointer: self.env.is_coarse_pointer(),
            can_hover: self.env.can_hover(),
            ..BehaviorInputs::default()
        }
    }

    // ── Feedback ─────────────────────────────────────────────────────────

    fn show(&mut self, now: Duration, feedback: Feedback) {
        if let Some(previous) = self.feedback_timer.take() {
            self.timers.cancel(previous);
        }
        let shown_for = self.config.timing.feedback();
        self.feedback = Some(ShownFeedback {
            feedback,
            shown_at: now,
            until: now.saturating_add(shown_for),
        });
        self.feedback_timer = Some(self.timers.schedule(now, shown_for, Scheduled::ClearFeedback));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valentine_core::geometry::{Rect, within_viewport};
    use valentine_core::rng::SequenceRandom;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn env() -> Environment {
        Environment::new(Size::new(1200.0, 900.0)).with_obstacle(Rect::new(350.0, 250.0, 500.0, 400.0))
    }

    fn app(rng: SequenceRandom) -> Valentine<SequenceRandom> {
        Valentine::new(ValentineConfig::default(), env(), rng, ms(0))
    }

    fn at_level(level: u8) -> Valentine<SequenceRandom> {
        let mut v = app(SequenceRandom::constant(0.9));
        for _ in 0..level {
            v.confirm_no(ms(0));
        }
        v.restart_timers_for_test();
        v
    }

    impl<R: RandomSource> Valentine<R> {
        fn restart_timers_for_test(&mut self) {
            self.timers.clear();
            self.feedback_timer = None;
        }
    }

    #[test]
    fn starts_near_the_card_without_freeze() {
        let v = app(SequenceRandom::constant(0.5));
        assert_eq!(v.behavior().mode, Mode::Near);
        assert_eq!(v.evasion().layer(), Layer::Front);
        assert!(!v.evasion().is_frozen(ms(0)));
        assert!(within_viewport(
            v.evasion().position(),
            v.element_size(),
            v.environment().viewport(),
            0.0
        ));
    }

    #[test]
    fn hold_completion_confirms_once() {
        let mut v = app(SequenceRandom::constant(0.9));
        assert_eq!(v.press_no(ms(0)), HoldStart::Started);
        v.advance(ms(339));
        assert_eq!(v.level(), 0);
        v.advance(ms(340));
        assert_eq!(v.level(), 1);
        v.advance(ms(500));
        assert_eq!(v.level(), 1);
        assert_eq!(v.release_no(ms(600)), HoldRelease::Idle);
    }

    #[test]
    fn moves_are_suppressed_while_holding() {
        let mut v = app(SequenceRandom::constant(0.9));
        v.press_no(ms(0));
        let before = v.evasion().position();
        assert_eq!(v.request_reposition(ms(10)), RepositionOutcome::Frozen);
        assert_eq!(v.evasion().position(), before);
        assert_eq!(v.phase(ms(10)), EvasionPhase::Confirming);
    }

    #[test]
    fn early_release_feedback_tiers() {
        let mut v = at_level(0);
        v.press_no(ms(0));
        v.release_no(ms(300));
        assert_eq!(v.feedback(ms(300)).map(|f| f.feedback), Some(Feedback::SoClose));

        v.press_no(ms(1_000));
        v.release_no(ms(1_200));
        assert_eq!(v.feedback(ms(1_200)).map(|f| f.feedback), Some(Feedback::AlmostHadIt));

        v.press_no(ms(2_000));
        v.release_no(ms(2_050));
        assert_eq!(v.feedback(ms(2_050)).map(|f| f.feedback), Some(Feedback::TooQuick));
    }

    #[test]
    fn abandoned_hold_ducks_behind_the_card() {
        let mut v = at_level(4);
        v.press_no(ms(10_000));
        v.release_no(ms(10_010));
        assert_eq!(v.evasion().layer(), Layer::Behind);
        assert!(matches!(
            v.feedback(ms(10_010)).map(|f| f.feedback),
            Some(Feedback::DuckedAway(_))
        ));
        assert_eq!(v.evasion().last_move(), MoveReason::HoldAbandon);
    }

    #[test]
    fn feedback_clears_after_display_time() {
        let mut v = app(SequenceRandom::constant(0.9));
        v.confirm_no(ms(0));
        assert!(v.feedback(ms(0)).is_some());
        v.advance(ms(1_600));
        assert!(v.feedback(ms(1_600)).is_none());
        assert!(!v.has_pending(|a| *a == Scheduled::ClearFeedback));
    }

    #[test]
    fn boxes_spawn_from_level_three_after_cooldown() {
        let mut v = at_level(2);
        v.advance(ms(5_000));
        assert!(!v.box_game().is_present());
        let mut v = at_level(3);
        v.advance(ms(3_999));
        assert!(!v.box_game().is_present());
        v.advance(ms(4_000));
        assert!(v.box_game().is_present());
    }

    #[test]
    fn accept_cancels_everything() {
        let mut v = app(SequenceRandom::constant(0.9));
        v.confirm_no(ms(0));
        v.press_no(ms(10));
        v.lure_grab(ms(10), Point::new(10.0, 10.0));
        assert!(v.accept(ms(20)));
        assert!(!v.is_holding());
        assert!(!v.is_lure_held());
        assert!(!v.has_pending(|a| matches!(a, Scheduled::Reposition(_))));
        assert!(!v.accept(ms(30)));
        assert_eq!(v.press_no(ms(40)), HoldStart::Blocked);
        assert_eq!(v.confirm_no(ms(40)), ConfirmOutcome::IgnoredAccepted);
    }

    #[test]
    fn restart_is_idempotent() {
        let mut v = at_level(5);
        v.give_treat(ms(100));
        v.restart(ms(200));
        let first = (v.level(), v.pending_timers(), v.calm_until());
        v.restart(ms(200));
        assert_eq!((v.level(), v.pending_timers(), v.calm_until()), first);
        assert_eq!(first, (0, 0, Duration::ZERO));
        assert!(!v.box_game().is_present());
    }

    #[test]
    fn lure_pulls_the_control() {
        let mut v = app(SequenceRandom::constant(0.9));
        let target = Point::new(200.0, 150.0);
        v.lure_grab(ms(0), target);
        let center = v.evasion().center(v.element_size());
        assert!(center.distance(target) < 1.0);
        assert_eq!(v.phase(ms(100)), EvasionPhase::Luring);
    }

    #[test]
    fn fish_without_occupant_is_acknowledged() {
        let mut v = app(SequenceRandom::constant(0.9));
        v.throw_fish(ms(0), Point::new(0.0, 0.0));
        v.advance(ms(450));
        assert_eq!(v.feedback(ms(450)).map(|f| f.feedback), Some(Feedback::FishIgnored));
        assert!(v.box_game().items().is_empty());
    }
}
