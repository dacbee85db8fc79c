#![forbid(unsafe_code)]

//! End-to-end scenarios for the evasion state machine.
//!
//! Each test drives a [`Valentine`] through public entry points only, with
//! a scripted random source so every probability gate is forced.
//!
//! Run:
//!   cargo test -p valentine-runtime --test scenarios

use std::time::Duration;

use valentine_core::behavior::TOP_LEVEL;
use valentine_core::environment::Environment;
use valentine_core::event::HostEvent;
use valentine_core::geometry::{Point, Rect, Size};
use valentine_core::hold::HoldStart;
use valentine_core::rng::SequenceRandom;
use valentine_runtime::{
    BoxPhase, ConfirmOutcome, EvasionPhase, Feedback, MoveReason, RepositionOutcome, Scheduled,
    SpawnOutcome, TapOutcome, Valentine, ValentineConfig,
};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn env() -> Environment {
    Environment::new(Size::new(1200.0, 900.0)).with_obstacle(Rect::new(350.0, 250.0, 500.0, 400.0))
}

fn app_with(rng: SequenceRandom) -> Valentine<SequenceRandom> {
    Valentine::new(ValentineConfig::default(), env(), rng, ms(0))
}

fn confirm_to(v: &mut Valentine<SequenceRandom>, level: u8, now: Duration) {
    while v.level() < level {
        v.confirm_no(now);
    }
}

/// Drive a fresh app to `level` with an occupied box. Returns the time at
/// which the box became occupied.
///
/// The constant zero random source makes every gate succeed: the box spawns
/// in the top-left corner, clear of the card, and a tap always scares the
/// control into it.
fn occupied_at_level(level: u8) -> (Valentine<SequenceRandom>, Duration) {
    let mut v = app_with(SequenceRandom::constant(0.0));
    confirm_to(&mut v, level, ms(0));

    v.advance(ms(4_000));
    assert_eq!(v.box_game().phase(), BoxPhase::Visible);

    assert_eq!(v.tap_box(ms(4_000), None), TapOutcome::Scared);
    v.advance(ms(4_120));
    assert_eq!(v.box_game().phase(), BoxPhase::Entering);
    assert_eq!(v.phase(ms(4_120)), EvasionPhase::EnteringBox);

    v.advance(ms(4_640));
    assert_eq!(v.box_game().phase(), BoxPhase::Occupied);
    assert_eq!(v.phase(ms(4_640)), EvasionPhase::InBox);
    (v, ms(4_640))
}

// ═══ A. Confirm schedules a move and a freeze ═══════════════════════════

#[test]
fn scenario_a_confirm_from_zero_schedules_move_then_freezes() {
    let mut v = app_with(SequenceRandom::constant(0.9));
    assert_eq!(
        v.confirm_no(ms(0)),
        ConfirmOutcome::Advanced { from: 0, to: 1 }
    );
    assert_eq!(v.level(), 1);
    assert!(v.has_pending(|a| *a == Scheduled::Reposition(MoveReason::Confirm)));
    assert!(!v.evasion().is_frozen(ms(0)));

    v.advance(ms(69));
    assert!(!v.evasion().is_frozen(ms(69)));

    v.advance(ms(70));
    assert_eq!(v.evasion().last_move(), MoveReason::Confirm);
    assert_eq!(v.evasion().freeze_until(), ms(70 + 850));
    assert!(v.evasion().is_frozen(ms(500)));
    assert_eq!(
        v.feedback(ms(70)).map(|f| f.feedback),
        Some(Feedback::Counted { level: 1 })
    );
}

// ═══ B. Loop reset from the top level ═══════════════════════════════════

#[test]
fn scenario_b_top_level_loops_back_to_zero() {
    let mut v = app_with(SequenceRandom::constant(0.9));
    confirm_to(&mut v, TOP_LEVEL, ms(0));
    assert_eq!(v.level(), TOP_LEVEL);

    assert_eq!(v.confirm_no(ms(0)), ConfirmOutcome::LoopArmed);
    assert_eq!(v.confirm_no(ms(10)), ConfirmOutcome::IgnoredLooping);
    assert!(v.has_pending(|a| *a == Scheduled::LoopReset));

    v.advance(ms(2_199));
    assert_eq!(v.level(), TOP_LEVEL);

    v.advance(ms(2_200));
    assert_eq!(v.level(), 0);
    assert!(!v.escalation().is_looping());
}

#[test]
fn below_top_level_never_arms_a_loop() {
    let mut v = app_with(SequenceRandom::constant(0.9));
    confirm_to(&mut v, TOP_LEVEL - 1, ms(0));
    v.advance(ms(10_000));
    assert_eq!(v.level(), TOP_LEVEL - 1);
    assert!(!v.has_pending(|a| *a == Scheduled::LoopReset));
}

// ═══ C. Fish delivery with two needed ═══════════════════════════════════

#[test]
fn scenario_c_two_fish_release_the_occupant() {
    let (mut v, t0) = occupied_at_level(7);
    assert_eq!(v.fish_needed(), 2);

    v.throw_fish(t0, Point::new(600.0, 880.0));
    v.advance(t0 + ms(450));
    assert_eq!(v.box_game().fed(), 1);
    assert!(v.box_game().is_occupied());
    assert_eq!(
        v.feedback(t0 + ms(450)).map(|f| f.feedback),
        Some(Feedback::FishCounted { fed: 1, needed: 2 })
    );

    let t1 = t0 + ms(450);
    v.throw_fish(t1, Point::new(600.0, 880.0));
    v.advance(t1 + ms(450));
    assert!(v.box_game().is_occupied());
    assert!(v.box_game().exit_pending());

    v.advance(t1 + ms(450 + 259));
    assert!(v.box_game().is_occupied());

    v.advance(t1 + ms(450 + 260));
    assert!(!v.box_game().is_occupied());
    assert_eq!(v.box_game().fed(), 0);
    assert_eq!(v.box_game().phase(), BoxPhase::Visible);
    assert!(v.evasion().is_free());
    assert_eq!(v.evasion().last_move(), MoveReason::BoxExit);
}

// ═══ D. Hold refused while occupied ═════════════════════════════════════

#[test]
fn scenario_d_hold_is_refused_in_the_box() {
    let (mut v, t0) = occupied_at_level(4);
    let level = v.level();
    let position = v.evasion().position();

    assert_eq!(v.press_no(t0), HoldStart::Blocked);
    assert!(!v.is_holding());
    assert_eq!(v.hold_progress(t0 + ms(2_000)), 0.0);

    v.advance(t0 + ms(2_000));
    assert_eq!(v.level(), level);
    assert_eq!(v.evasion().position(), position);
    assert!(v.box_game().is_occupied());
}

// ═══ E. Spawn fallback ══════════════════════════════════════════════════

#[test]
fn scenario_e_spawn_keeps_the_last_sample_when_all_overlap() {
    let covered = Environment::new(Size::new(1200.0, 900.0))
        .with_obstacle(Rect::new(0.0, 0.0, 1200.0, 900.0));
    let mut samples = vec![0.5; 16];
    samples.extend([0.25, 0.75]);
    let rng = SequenceRandom::new(samples, 0.5);
    let mut v = Valentine::new(ValentineConfig::default(), covered, rng, ms(0));

    let outcome = v.spawn_box(ms(0));
    assert_eq!(
        outcome,
        SpawnOutcome::Spawned {
            attempts: 9,
            fallback: true
        }
    );
    assert_eq!(v.box_game().phase(), BoxPhase::Visible);

    let rect = v.box_game().rect();
    let expected_x = 12.0 + (1200.0 - 104.0 - 24.0) * 0.25;
    let expected_y = 12.0 + (900.0 - 80.0 - 24.0) * 0.75;
    assert!((rect.x - expected_x).abs() < 1e-3);
    assert!((rect.y - expected_y).abs() < 1e-3);
    assert_eq!(v.box_game().expires_at(), ms(12_000));
}

// ═══ F. Treat while occupied ════════════════════════════════════════════

#[test]
fn scenario_f_treat_feeds_twice_and_calms() {
    let (mut v, t0) = occupied_at_level(3);
    assert_eq!(v.fish_needed(), 1);

    v.give_treat(t0);
    assert_eq!(v.calm_until(), t0 + ms(5_000));
    assert_eq!(v.box_game().items().len(), 2);

    v.advance(t0 + ms(450));
    assert!(v.box_game().items().is_empty());
    assert!(v.box_game().is_occupied());
    assert_eq!(
        v.feedback(t0 + ms(450)).map(|f| f.feedback),
        Some(Feedback::FishWhileLeaving)
    );

    v.advance(t0 + ms(450 + 260));
    assert!(!v.box_game().is_occupied());
    assert_eq!(v.box_game().fed(), 0);
    assert!(v.is_calm(t0 + ms(4_999)));
    assert!(!v.is_calm(t0 + ms(5_000)));
}

// ═══ Automatic box dive ═════════════════════════════════════════════════

/// Level 4 with an empty box on screen and every gate forced open.
fn visible_box_at_level_four(config: ValentineConfig) -> Valentine<SequenceRandom> {
    let mut v = Valentine::new(config, env(), SequenceRandom::constant(0.0), ms(0));
    confirm_to(&mut v, 4, ms(0));
    v.advance(ms(4_000));
    assert_eq!(v.box_game().phase(), BoxPhase::Visible);
    assert!(!v.evasion().is_frozen(ms(4_000)));
    v
}

#[test]
fn reposition_dives_into_a_ready_box() {
    let mut v = visible_box_at_level_four(ValentineConfig::default());
    let before = v.evasion().position();

    assert_eq!(v.request_reposition(ms(5_000)), RepositionOutcome::Deferred);
    assert_eq!(v.evasion().position(), before);
    assert!(v.has_pending(|a| *a == Scheduled::EnterBox));

    v.advance(ms(5_119));
    assert_eq!(v.box_game().phase(), BoxPhase::Visible);
    assert!(v.evasion().is_free());

    v.advance(ms(5_120));
    assert_eq!(v.box_game().phase(), BoxPhase::Entering);
    assert_eq!(v.evasion().last_move(), MoveReason::BoxEnter);
    assert_eq!(
        v.feedback(ms(5_120)).map(|f| f.feedback),
        Some(Feedback::Dove)
    );

    v.advance(ms(5_640));
    assert_eq!(v.box_game().phase(), BoxPhase::Occupied);
}

#[test]
fn pending_dive_is_not_scheduled_twice() {
    let mut config = ValentineConfig::default();
    config.timing.dive_cooldown_ms = 0;
    let mut v = visible_box_at_level_four(config);

    assert_eq!(v.request_reposition(ms(5_000)), RepositionOutcome::Deferred);
    // The cooldown is gone, but the scheduled dive keeps the gate shut.
    assert_eq!(v.request_reposition(ms(5_010)), RepositionOutcome::Moved);
    assert_eq!(v.evasion().last_move(), MoveReason::Explicit);

    v.advance(ms(5_120));
    assert_eq!(v.box_game().phase(), BoxPhase::Entering);
    assert!(!v.has_pending(|a| *a == Scheduled::EnterBox));
}

#[test]
fn resize_and_lure_moves_never_dive() {
    let mut v = visible_box_at_level_four(ValentineConfig::default());

    v.handle(&HostEvent::Resize { width: 1_100.0, height: 850.0 }, ms(5_000));
    assert_eq!(v.evasion().last_move(), MoveReason::Resize);
    assert!(!v.has_pending(|a| *a == Scheduled::EnterBox));

    let lure = Point::new(700.0, 780.0);
    v.lure_grab(ms(6_000), lure);
    assert_eq!(v.evasion().last_move(), MoveReason::Lure);
    assert!(!v.has_pending(|a| *a == Scheduled::EnterBox));
    v.lure_release(ms(6_100));

    // Neither move consumed the dive cooldown: the next eligible move dives.
    assert_eq!(v.request_reposition(ms(7_000)), RepositionOutcome::Deferred);
    assert_eq!(v.box_game().phase(), BoxPhase::Visible);
}

// ═══ Layout changes while boxed ═════════════════════════════════════════

#[test]
fn shrinking_viewport_keeps_the_occupant_in_its_box() {
    let (mut v, t0) = occupied_at_level(4);

    v.handle(&HostEvent::Resize { width: 100.0, height: 70.0 }, t0 + ms(100));
    assert_eq!(v.box_game().phase(), BoxPhase::Occupied);
    assert!(!v.evasion().is_free());
    assert_eq!(v.box_game().rect().x, 0.0);
    assert_eq!(v.box_game().rect().y, 0.0);

    let center = v.evasion().center(v.element_size());
    let opening = v.box_game().opening();
    assert!((center.y - opening.y).abs() < 1.0, "center {center:?} opening {opening:?}");
    assert_eq!(v.evasion().last_move(), MoveReason::BoxEnter);
}

// ═══ Supplementary flows ════════════════════════════════════════════════

#[test]
fn treat_coaxes_a_hiding_control_to_the_front() {
    let mut v = app_with(SequenceRandom::constant(0.9));
    confirm_to(&mut v, 3, ms(0));
    v.advance(ms(100));
    assert_eq!(v.evasion().last_move(), MoveReason::Confirm);
    assert_eq!(v.evasion().layer(), valentine_core::Layer::Behind);

    // Frozen: the coax is a guarded move and does nothing yet.
    v.give_treat(ms(200));
    assert_eq!(v.evasion().layer(), valentine_core::Layer::Behind);

    v.give_treat(ms(1_000));
    assert_eq!(v.evasion().layer(), valentine_core::Layer::Front);
    assert_eq!(v.evasion().last_move(), MoveReason::Coax);
}

#[test]
fn occupied_box_tap_throws_a_fish() {
    let (mut v, t0) = occupied_at_level(3);
    assert_eq!(v.tap_box(t0, Some(Point::new(50.0, 50.0))), TapOutcome::Feed);
    assert_eq!(v.box_game().items().len(), 1);
    assert_eq!(v.box_game().items()[0].from, Point::new(50.0, 50.0));
    v.advance(t0 + ms(450));
    v.advance(t0 + ms(710));
    assert!(!v.box_game().is_occupied());
}

#[test]
fn empty_box_expires_and_respawns_after_cooldown() {
    let mut v = app_with(SequenceRandom::constant(0.9));
    confirm_to(&mut v, 3, ms(0));
    v.advance(ms(4_000));
    assert!(v.box_game().is_present());

    v.advance(ms(16_000));
    assert!(!v.box_game().is_present());

    v.advance(ms(19_999));
    assert!(!v.box_game().is_present());
    v.advance(ms(20_000));
    assert!(v.box_game().is_present());
}

#[test]
fn restart_after_acceptance_drops_stale_timers() {
    let (mut v, t0) = occupied_at_level(7);
    v.throw_fish(t0, Point::new(0.0, 0.0));
    assert!(v.accept(t0 + ms(10)));
    assert!(!v.has_pending(|a| matches!(a, Scheduled::FishLands(_))));

    v.restart(t0 + ms(20));
    v.advance(t0 + ms(5_000));
    assert_eq!(v.level(), 0);
    assert!(!v.is_accepted());
    assert!(v.evasion().is_free());
}
