#![forbid(unsafe_code)]

//! Box minigame: a capture zone the control hides in until it is fed.
//!
//! # State Machine
//!
//! ```text
//!   Absent ──spawn──▶ Visible ──begin_enter──▶ Entering ──complete_enter──▶ Occupied
//!     ▲                  │  ▲                                                 │
//!     └────expire────────┘  └──────────────── exit (fed ≥ needed) ────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. The fed count is zero whenever occupancy toggles, in either direction.
//! 2. Only a `Visible` box expires; an occupied box waits for its occupant.
//! 3. Spawning always succeeds: when every sample overlaps the obstacle the
//!    last sample is used.
//! 4. Lure items in flight are independent of the phase; their arrival is
//!    judged against the phase at landing time.

use std::time::Duration;

use valentine_core::environment::Environment;
use valentine_core::geometry::{Point, Rect, Size, clamp_to_viewport};
use valentine_core::rng::RandomSource;

/// Lifecycle phase of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxPhase {
    #[default]
    Absent,
    /// Empty and waiting, with an expiry.
    Visible,
    /// The control is moving into the opening.
    Entering,
    Occupied,
}

impl BoxPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Visible => "visible",
            Self::Entering => "entering",
            Self::Occupied => "occupied",
        }
    }
}

/// Placement constraints for a spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnParams {
    pub size: Size,
    /// Clearance kept around the obstacle.
    pub pad: f32,
    /// Inset from the viewport edges.
    pub inset: f32,
    pub attempts: u32,
    pub lifetime: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// Placed after `attempts` samples. `fallback` is set when every sample
    /// overlapped and the last one was kept.
    Spawned { attempts: u32, fallback: bool },
    AlreadyPresent,
}

/// Result of a lure item landing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Counted; more are needed.
    Counted { fed: u8, needed: u8 },
    /// Reached the requirement; the owner should schedule the exit.
    Released,
    /// Nobody in the box.
    Ignored,
    /// The occupant is already leaving.
    ExitPending,
}

/// Result of tapping the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// The control got scared into the box.
    Scared,
    /// The scare gate said no.
    Shrugged,
    /// The box is occupied; the tap feeds it.
    Feed,
    /// Mid-transition; nothing to do.
    Busy,
    Absent,
}

/// A thrown lure item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LureItem {
    pub id: u64,
    pub from: Point,
    pub to: Point,
    pub spawned_at: Duration,
    pub lands_at: Duration,
}

impl LureItem {
    /// Flight fraction in `[0, 1]`.
    #[must_use]
    pub fn progress(&self, now: Duration) -> f32 {
        let total = self.lands_at.saturating_sub(self.spawned_at);
        if total.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.spawned_at);
        (elapsed.as_secs_f32() / total.as_secs_f32()).clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn position(&self, now: Duration) -> Point {
        self.from.lerp(self.to, self.progress(now))
    }
}

/// Box lifecycle, fed counter, and in-flight lure items.
#[derive(Debug, Clone)]
pub struct BoxGame {
    phase: BoxPhase,
    rect: Rect,
    expires_at: Duration,
    fed: u8,
    exit_pending: bool,
    vanished_at: Duration,
    items: Vec<LureItem>,
    next_item: u64,
    spawns: u64,
}

impl BoxGame {
    /// A fresh game; the respawn cooldown counts from `now`.
    #[must_use]
    pub fn new(now: Duration) -> Self {
        Self {
            phase: BoxPhase::Absent,
            rect: Rect::default(),
            expires_at: Duration::ZERO,
            fed: 0,
            exit_pending: false,
            vanished_at: now,
            items: Vec::new(),
            next_item: 1,
            spawns: 0,
        }
    }

    #[inline]
    pub const fn phase(&self) -> BoxPhase {
        self.phase
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.phase != BoxPhase::Absent
    }

    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.phase == BoxPhase::Occupied
    }

    /// Visible, empty, and not being entered.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.phase == BoxPhase::Visible
    }

    #[inline]
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    #[inline]
    pub fn center(&self) -> Point {
        self.rect.center()
    }

    #[inline]
    pub const fn expires_at(&self) -> Duration {
        self.expires_at
    }

    #[inline]
    pub const fn fed(&self) -> u8 {
        self.fed
    }

    #[inline]
    pub const fn exit_pending(&self) -> bool {
        self.exit_pending
    }

    #[inline]
    pub const fn spawns(&self) -> u64 {
        self.spawns
    }

    /// Lure items still in flight.
    #[inline]
    pub fn items(&self) -> &[LureItem] {
        &self.items
    }

    /// Where the control's center sits while entering.
    #[must_use]
    pub fn opening(&self) -> Point {
        Point::new(self.rect.center().x, self.rect.y + self.rect.height * 0.35)
    }

    /// Where the control's center lands after leaving.
    #[must_use]
    pub fn lip(&self) -> Point {
        Point::new(self.rect.center().x, self.rect.bottom() + 6.0)
    }

    /// Keep a present box inside a resized viewport. Returns whether it moved.
    pub fn clamp_into(&mut self, viewport: Size) -> bool {
        if !self.is_present() {
            return false;
        }
        let origin = Point::new(self.rect.x, self.rect.y);
        let clamped = clamp_to_viewport(origin, self.rect.size(), viewport, 0.0);
        if clamped == origin {
            return false;
        }
        self.rect = Rect::from_origin(clamped, self.rect.size());
        tracing::debug!(target: "valentine.box", x = clamped.x, y = clamped.y, "box clamped into viewport");
        true
    }

    /// Whether the respawn policy allows a new box at `now`.
    #[must_use]
    pub fn can_spawn(&self, now: Duration, cooldown: Duration) -> bool {
        self.phase == BoxPhase::Absent && now.saturating_sub(self.vanished_at) >= cooldown
    }

    /// Place the box by bounded rejection sampling.
    pub fn spawn<R: RandomSource + ?Sized>(
        &mut self,
        now: Duration,
        env: &Environment,
        params: SpawnParams,
        rng: &mut R,
    ) -> SpawnOutcome {
        if self.is_present() {
            return SpawnOutcome::AlreadyPresent;
        }
        let view = env.viewport();
        let max_x = view.width - params.size.width - params.inset;
        let max_y = view.height - params.size.height - params.inset;
        let blocked = env.obstacle().map(|o| o.inflate(params.pad));

        let attempts = params.attempts.max(1);
        let mut candidate = Rect::default();
        let mut used = 0;
        let mut clear = false;
        while used < attempts {
            used += 1;
            let x = rng.range(params.inset, max_x);
            let y = rng.range(params.inset, max_y);
            candidate = Rect::new(x, y, params.size.width, params.size.height);
            if !blocked.is_some_and(|b| b.intersects(&candidate)) {
                clear = true;
                break;
            }
        }

        self.rect = candidate;
        self.phase = BoxPhase::Visible;
        self.fed = 0;
        self.exit_pending = false;
        self.expires_at = now.saturating_add(params.lifetime);
        self.spawns += 1;
        tracing::debug!(
            target: "valentine.box",
            x = candidate.x,
            y = candidate.y,
            attempts = used,
            fallback = !clear,
            "box spawned"
        );
        SpawnOutcome::Spawned {
            attempts: used,
            fallback: !clear,
        }
    }

    /// Remove an empty box past its expiry.
    pub fn expire(&mut self, now: Duration) -> bool {
        if self.phase != BoxPhase::Visible || now < self.expires_at {
            return false;
        }
        self.phase = BoxPhase::Absent;
        self.vanished_at = now;
        tracing::debug!(target: "valentine.box", "box expired");
        true
    }

    /// Start the entering transition.
    pub fn begin_enter(&mut self, holding: bool) -> bool {
        if self.phase != BoxPhase::Visible || holding {
            tracing::trace!(
                target: "valentine.box",
                phase = self.phase.as_str(),
                holding,
                "enter rejected"
            );
            return false;
        }
        self.phase = BoxPhase::Entering;
        true
    }

    /// Finish entering: occupied, fed count zeroed, expiry extended.
    pub fn complete_enter(&mut self, now: Duration, extension: Duration) -> bool {
        if self.phase != BoxPhase::Entering {
            return false;
        }
        self.phase = BoxPhase::Occupied;
        self.fed = 0;
        self.exit_pending = false;
        self.expires_at = self.expires_at.max(now).saturating_add(extension);
        tracing::debug!(target: "valentine.box", "box occupied");
        true
    }

    /// Count one arrived lure item.
    pub fn deliver(&mut self, needed: u8) -> Delivery {
        if self.phase != BoxPhase::Occupied {
            return Delivery::Ignored;
        }
        if self.exit_pending {
            return Delivery::ExitPending;
        }
        self.fed = self.fed.saturating_add(1);
        if self.fed >= needed.max(1) {
            self.exit_pending = true;
            tracing::debug!(target: "valentine.box", fed = self.fed, needed, "occupant released");
            Delivery::Released
        } else {
            Delivery::Counted {
                fed: self.fed,
                needed,
            }
        }
    }

    /// Let the occupant out. The box stays visible for `grace`.
    pub fn exit(&mut self, now: Duration, grace: Duration) -> bool {
        if self.phase != BoxPhase::Occupied {
            return false;
        }
        self.phase = BoxPhase::Visible;
        self.fed = 0;
        self.exit_pending = false;
        self.expires_at = now.saturating_add(grace);
        tracing::debug!(target: "valentine.box", "box emptied");
        true
    }

    /// Classify a direct tap. Draws the scare gate only for an empty box.
    pub fn tap<R: RandomSource + ?Sized>(&mut self, scare_chance: f32, rng: &mut R) -> TapOutcome {
        match self.phase {
            BoxPhase::Absent => TapOutcome::Absent,
            BoxPhase::Entering => TapOutcome::Busy,
            BoxPhase::Occupied => TapOutcome::Feed,
            BoxPhase::Visible => {
                if rng.chance(scare_chance) {
                    TapOutcome::Scared
                } else {
                    TapOutcome::Shrugged
                }
            }
        }
    }

    /// Launch a lure item at `to`. Returns its id.
    pub fn throw(&mut self, now: Duration, from: Point, to: Point, flight: Duration) -> u64 {
        let id = self.next_item;
        self.next_item += 1;
        self.items.push(LureItem {
            id,
            from,
            to,
            spawned_at: now,
            lands_at: now.saturating_add(flight),
        });
        id
    }

    /// Remove an item on arrival.
    pub fn land(&mut self, id: u64) -> Option<LureItem> {
        let idx = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(idx))
    }

    /// Back to a fresh game at `now`.
    pub fn reset(&mut self, now: Duration) {
        *self = Self::new(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valentine_core::rng::SequenceRandom;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn params() -> SpawnParams {
        SpawnParams {
            size: Size::new(104.0, 80.0),
            pad: 16.0,
            inset: 12.0,
            attempts: 9,
            lifetime: ms(12_000),
        }
    }

    fn env() -> Environment {
        Environment::new(Size::new(1000.0, 800.0)).with_obstacle(Rect::new(300.0, 250.0, 400.0, 300.0))
    }

    #[test]
    fn shrinking_viewport_pulls_the_box_back_in() {
        let mut game = occupied(ms(0));
        let size = game.rect().size();
        assert_eq!(game.rect().x, 12.0);

        assert!(game.clamp_into(Size::new(100.0, 70.0)));
        assert_eq!(game.rect(), Rect::new(0.0, 0.0, size.width, size.height));
        assert!(!game.clamp_into(Size::new(100.0, 70.0)));

        let mut absent = BoxGame::new(ms(0));
        assert!(!absent.clamp_into(Size::new(10.0, 10.0)));
    }

    fn occupied(now: Duration) -> BoxGame {
        let mut game = BoxGame::new(Duration::ZERO);
        let mut rng = SequenceRandom::constant(0.0);
        game.spawn(now, &env(), params(), &mut rng);
        assert!(game.begin_enter(false));
        assert!(game.complete_enter(now, ms(20_000)));
        game
    }

    #[test]
    fn spawn_accepts_first_clear_sample() {
        let mut game = BoxGame::new(Duration::ZERO);
        // First sample lands on the obstacle, second in the top-left corner.
        let mut rng = SequenceRandom::new([0.5, 0.5, 0.0, 0.0], 0.0);
        let out = game.spawn(ms(0), &env(), params(), &mut rng);
        assert_eq!(
            out,
            SpawnOutcome::Spawned {
                attempts: 2,
                fallback: false
            }
        );
        assert_eq!(game.rect().x, 12.0);
        assert_eq!(game.phase(), BoxPhase::Visible);
        assert_eq!(game.expires_at(), ms(12_000));
        assert_eq!(game.spawn(ms(1), &env(), params(), &mut rng), SpawnOutcome::AlreadyPresent);
    }

    #[test]
    fn spawn_falls_back_to_last_sample() {
        let env = Environment::new(Size::new(1000.0, 800.0)).with_obstacle(Rect::new(0.0, 0.0, 1000.0, 800.0));
        let mut game = BoxGame::new(Duration::ZERO);
        let mut samples = vec![0.5; 16];
        samples.extend([0.25, 0.75]);
        let mut rng = SequenceRandom::new(samples, 0.0);
        let out = game.spawn(ms(0), &env, params(), &mut rng);
        assert_eq!(
            out,
            SpawnOutcome::Spawned {
                attempts: 9,
                fallback: true
            }
        );
        assert_eq!(rng.drawn(), 18);
        let expected_x = 12.0 + (1000.0 - 104.0 - 24.0) * 0.25;
        assert!((game.rect().x - expected_x).abs() < 1e-3);
        assert!(game.is_ready());
    }

    #[test]
    fn only_visible_boxes_expire() {
        let mut game = occupied(ms(0));
        assert!(!game.expire(ms(60_000)));
        assert!(game.exit(ms(60_000), ms(9_000)));
        assert!(!game.expire(ms(68_999)));
        assert!(game.expire(ms(69_000)));
        assert!(!game.can_spawn(ms(70_000), ms(4_000)));
        assert!(game.can_spawn(ms(73_000), ms(4_000)));
    }

    #[test]
    fn entering_requires_visible_and_no_hold() {
        let mut game = BoxGame::new(Duration::ZERO);
        assert!(!game.begin_enter(false));
        let mut rng = SequenceRandom::constant(0.0);
        game.spawn(ms(0), &env(), params(), &mut rng);
        assert!(!game.begin_enter(true));
        assert!(game.begin_enter(false));
        assert!(!game.begin_enter(false));
        assert!(game.complete_enter(ms(520), ms(20_000)));
        assert_eq!(game.expires_at(), ms(32_000));
    }

    #[test]
    fn deliveries_count_until_release() {
        let mut game = occupied(ms(0));
        assert_eq!(game.deliver(2), Delivery::Counted { fed: 1, needed: 2 });
        assert!(game.is_occupied());
        assert_eq!(game.deliver(2), Delivery::Released);
        assert_eq!(game.deliver(2), Delivery::ExitPending);
        assert_eq!(game.fed(), 2);
        assert!(game.exit(ms(300), ms(9_000)));
        assert_eq!(game.fed(), 0);
        assert_eq!(game.deliver(2), Delivery::Ignored);
    }

    #[test]
    fn tap_draws_only_for_an_empty_box() {
        let mut rng = SequenceRandom::new([0.2, 0.9], 0.0);
        let mut game = BoxGame::new(Duration::ZERO);
        assert_eq!(game.tap(0.35, &mut rng), TapOutcome::Absent);
        let mut spawn_rng = SequenceRandom::constant(0.0);
        game.spawn(ms(0), &env(), params(), &mut spawn_rng);
        assert_eq!(game.tap(0.35, &mut rng), TapOutcome::Scared);
        assert_eq!(game.tap(0.35, &mut rng), TapOutcome::Shrugged);
        assert_eq!(rng.drawn(), 2);

        let mut game = occupied(ms(0));
        assert_eq!(game.tap(0.35, &mut rng), TapOutcome::Feed);
        assert_eq!(rng.drawn(), 2);
    }

    #[test]
    fn items_interpolate_and_land_once() {
        let mut game = BoxGame::new(Duration::ZERO);
        let id = game.throw(ms(100), Point::new(0.0, 0.0), Point::new(100.0, 0.0), ms(450));
        let item = game.items()[0];
        assert_eq!(item.lands_at, ms(550));
        assert!((item.position(ms(325)).x - 50.0).abs() < 1e-3);
        assert_eq!(item.progress(ms(1_000)), 1.0);
        assert!(game.land(id).is_some());
        assert!(game.land(id).is_none());
    }
}
