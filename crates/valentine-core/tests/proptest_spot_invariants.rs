//! Property-based invariant tests for clamping, behavior selection, and
//! spot picking.
//!
//! 1. Clamped positions stay inside `[-tol, dim - elem + tol]` (or at the
//!    margin bound when the element is larger than the viewport)
//! 2. `select_behavior` is deterministic for identical inputs
//! 3. Every picked spot is in bounds for its own tolerance
//! 4. Behind-layer spots always carry a hide hint or tunnel target
//! 5. `fish_needed` matches `clamp(1 + floor(level/7), 1, 3)`

use proptest::prelude::*;
use valentine_core::behavior::{BehaviorInputs, fish_needed, select_behavior};
use valentine_core::geometry::{Point, Rect, Size, clamp_to_viewport, within_viewport};
use valentine_core::spot::{SpotRequest, SpotTuning, pick_spot};
use valentine_core::{Environment, Layer, Mode, SeededRandom};

// ── Strategies ──────────────────────────────────────────────────────────

fn mode_strategy() -> impl Strategy<Value = Mode> {
    prop_oneof![
        Just(Mode::Near),
        Just(Mode::Hide),
        Just(Mode::Tunnel),
        Just(Mode::Peek),
        Just(Mode::Slip),
        Just(Mode::Rage),
        Just(Mode::Orbit),
        Just(Mode::Random),
    ]
}

fn tolerance_strategy() -> impl Strategy<Value = f32> {
    prop_oneof![Just(0.0f32), Just(14.0f32)]
}

fn inputs_strategy() -> impl Strategy<Value = BehaviorInputs> {
    (0u8..20, any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(level, coarse_pointer, can_hover, calm, lure_held, occupied)| BehaviorInputs {
            level,
            coarse_pointer,
            can_hover,
            calm,
            lure_held,
            occupied,
        },
    )
}

// ═══════════════════════════════════════════════════════════════════════
// 1. Clamp bounds
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clamp_stays_in_bounds(
        x in -5_000.0f32..5_000.0,
        y in -5_000.0f32..5_000.0,
        vw in 200.0f32..2_000.0,
        vh in 200.0f32..2_000.0,
        tol in tolerance_strategy(),
    ) {
        let elem = Size::new(112.0, 48.0);
        let view = Size::new(vw, vh);
        let p = clamp_to_viewport(Point::new(x, y), elem, view, tol);
        prop_assert!(p.x >= -tol && p.x <= vw - elem.width + tol);
        prop_assert!(p.y >= -tol && p.y <= vh - elem.height + tol);
        prop_assert!(within_viewport(p, elem, view, tol));
    }

    #[test]
    fn clamp_never_panics_on_tiny_viewports(
        x in -100.0f32..100.0,
        vw in 0.0f32..20.0,
        tol in tolerance_strategy(),
    ) {
        let p = clamp_to_viewport(Point::new(x, x), Size::new(112.0, 48.0), Size::new(vw, vw), tol);
        prop_assert_eq!(p, Point::new(-tol, -tol));
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 2. Behavior determinism
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn select_behavior_is_pure(inputs in inputs_strategy()) {
        let a = select_behavior(inputs);
        let b = select_behavior(inputs);
        prop_assert_eq!(a, b);
        prop_assert!(a.params.scale >= 0.82 && a.params.scale <= 1.18);
        prop_assert!(a.params.opacity >= 0.78 && a.params.opacity <= 1.0);
    }

    #[test]
    fn fish_needed_contract(level in 0u8..20) {
        let expected = (1 + level / 7).clamp(1, 3);
        prop_assert_eq!(fish_needed(level), expected);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 3–4. Spot bounds and layer invariant
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn picked_spots_are_in_bounds(
        mode in mode_strategy(),
        level in 0u8..20,
        seed in any::<u64>(),
        vw in 320.0f32..1_920.0,
        vh in 480.0f32..1_080.0,
        coarse in any::<bool>(),
        has_obstacle in any::<bool>(),
    ) {
        let mut env = Environment::new(Size::new(vw, vh)).with_capabilities(coarse, !coarse);
        if has_obstacle {
            env.set_obstacle(Some(Rect::new(vw * 0.2, vh * 0.25, vw * 0.6, vh * 0.5)));
        }
        let tuning = SpotTuning::default();
        let behavior = select_behavior(BehaviorInputs { level, coarse_pointer: coarse, ..BehaviorInputs::default() });
        let req = SpotRequest {
            env: &env,
            level,
            element: Size::new(112.0, 48.0).scaled(behavior.params.scale),
            scale: behavior.params.scale,
            wander_factor: behavior.params.wander_factor,
            tuning: &tuning,
        };
        let mut rng = SeededRandom::from_seed(seed);
        let spot = pick_spot(mode, &req, &mut rng);

        prop_assert!(spot.allow_off == 0.0 || spot.allow_off == 14.0);
        prop_assert!(within_viewport(spot.position, req.element, env.viewport(), spot.allow_off));
        if let Some(end) = spot.tunnel_target {
            prop_assert!(within_viewport(end, req.element, env.viewport(), spot.allow_off));
        }
        if spot.layer == Layer::Behind {
            prop_assert!(spot.hide_hint.is_some() || spot.tunnel_target.is_some());
            prop_assert!(matches!(mode, Mode::Hide | Mode::Peek | Mode::Tunnel));
        }
        if !has_obstacle {
            prop_assert_eq!(spot.layer, Layer::Front);
        }
    }
}
