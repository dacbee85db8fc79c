#![forbid(unsafe_code)]

//! Spot picking: where the evasive control goes next.
//!
//! [`pick_spot`] turns a [`Mode`] plus the current [`Environment`] into a
//! [`Spot`]: a clamped top-left position, the render layer, a peek
//! oscillation vector, an optional tunnel endpoint, and a hide hint.
//!
//! # Invariants
//!
//! 1. Every returned position satisfies
//!    [`within_viewport`](crate::geometry::within_viewport) for the spot's
//!    own `allow_off` tolerance, which is either `0` or
//!    [`HIDE_OFFSCREEN_TOLERANCE`].
//! 2. `layer == Layer::Behind` implies `hide_hint.is_some() ||
//!    tunnel_target.is_some()`.
//! 3. Only hide, peek (hide branch), and tunnel spots are ever `Behind`.
//!
//! # Failure Modes
//!
//! - Obstacle not measurable: hide and peek degrade to an edge-of-viewport
//!   placement on the front layer; every other mode degrades to a free
//!   placement.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::behavior::Mode;
use crate::environment::Environment;
use crate::geometry::{HIDE_OFFSCREEN_TOLERANCE, Point, Rect, Size, clamp_to_viewport};
use crate::rng::RandomSource;

/// Render order relative to the obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Layer {
    #[default]
    Front,
    Behind,
}

/// Which obstacle edge the control is tucked behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HideHint {
    Left,
    Right,
    Top,
    Bottom,
    BottomCenter,
}

impl HideHint {
    /// The four plain edges, in the order uniform picks index them.
    pub const EDGES: [HideHint; 4] = [Self::Left, Self::Right, Self::Top, Self::Bottom];

    /// Unit vector pointing away from the obstacle through this edge.
    #[must_use]
    pub const fn outward(self) -> (f32, f32) {
        match self {
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
            Self::Top => (0.0, -1.0),
            Self::Bottom | Self::BottomCenter => (0.0, 1.0),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::BottomCenter => "bottom_center",
        }
    }
}

/// One of the four anchor points around the obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrbitSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl OrbitSide {
    pub const ALL: [OrbitSide; 4] = [Self::Left, Self::Right, Self::Top, Self::Bottom];
}

/// A resolved destination for the evasive control.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spot {
    /// Clamped top-left position.
    pub position: Point,
    pub layer: Layer,
    /// Oscillation vector for the partially-visible animation; zero on
    /// the front layer.
    pub peek_offset: Point,
    /// Far endpoint of the tunnel traversal.
    pub tunnel_target: Option<Point>,
    pub hide_hint: Option<HideHint>,
    /// Off-screen tolerance the position was clamped with.
    pub allow_off: f32,
}

impl Spot {
    fn front(position: Point, allow_off: f32) -> Self {
        Self {
            position,
            layer: Layer::Front,
            peek_offset: Point::default(),
            tunnel_target: None,
            hide_hint: None,
            allow_off,
        }
    }
}

/// Geometry knobs for spot generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotTuning {
    /// Fraction of the element that protrudes past the hidden edge.
    pub visible_pct: f32,
    /// Offset of the near spot from the obstacle's top-right corner.
    pub near_offset: Point,
    /// Gap between the obstacle edge and an orbit anchor.
    pub orbit_margin: f32,
    /// Jitter radius around an orbit anchor, before the wander factor.
    pub orbit_jitter: f32,
    /// Extra jitter applied by slip, before the wander factor.
    pub slip_jitter: f32,
    /// Vicinity radius for free placement on coarse pointers.
    pub free_vicinity: f32,
    /// Inset from obstacle edges for the tunnel endpoints.
    pub tunnel_inset: f32,
    /// Vertical jitter between the tunnel endpoints.
    pub tunnel_jitter: f32,
    /// Probability of choosing bottom-center for an unscripted hide.
    pub hide_bottom_center_bias: f32,
    /// Probability random mode uses an orbit anchor on fine pointers.
    pub random_orbit_bias: f32,
    /// Probability peek uses an edge-of-viewport placement.
    pub peek_edge_chance: f32,
}

impl Default for SpotTuning {
    fn default() -> Self {
        Self {
            visible_pct: 0.35,
            near_offset: Point::new(12.0, -12.0),
            orbit_margin: 18.0,
            orbit_jitter: 40.0,
            slip_jitter: 70.0,
            free_vicinity: 160.0,
            tunnel_inset: 8.0,
            tunnel_jitter: 24.0,
            hide_bottom_center_bias: 0.45,
            random_orbit_bias: 0.65,
            peek_edge_chance: 0.5,
        }
    }
}

/// Everything [`pick_spot`] reads besides the mode and the random source.
#[derive(Debug, Clone, Copy)]
pub struct SpotRequest<'a> {
    pub env: &'a Environment,
    /// Escalation level; selects scripted hide hints.
    pub level: u8,
    /// Rendered (already scaled) element size.
    pub element: Size,
    pub scale: f32,
    pub wander_factor: f32,
    pub tuning: &'a SpotTuning,
}

/// Hide hints pinned to specific escalation levels.
#[must_use]
pub const fn scripted_hide_hint(level: u8) -> Option<HideHint> {
    match level {
        3 => Some(HideHint::Bottom),
        6 => Some(HideHint::Right),
        9 => Some(HideHint::BottomCenter),
        12 => Some(HideHint::Left),
        14 | 17 => Some(HideHint::Top),
        18 => Some(HideHint::Right),
        _ => None,
    }
}

/// Peek oscillation magnitude: `clamp(22·scale, 14, 30)`.
#[must_use]
pub fn peek_magnitude(scale: f32) -> f32 {
    (22.0 * scale).clamp(14.0, 30.0)
}

/// Produce a spot for `mode`.
pub fn pick_spot<R: RandomSource + ?Sized>(mode: Mode, req: &SpotRequest<'_>, rng: &mut R) -> Spot {
    let Some(obstacle) = req.env.obstacle() else {
        return match mode {
            Mode::Hide | Mode::Peek => edge_spot(req, rng),
            _ => free_spot(req, None, rng),
        };
    };

    match mode {
        Mode::Near => near_spot(req, obstacle),
        Mode::Hide => hide_spot(req, obstacle, None, rng),
        Mode::Tunnel => tunnel_spot(req, obstacle, rng),
        Mode::Orbit => orbit_spot(req, obstacle, 0.0, rng),
        Mode::Slip => orbit_spot(req, obstacle, req.tuning.slip_jitter, rng),
        Mode::Peek => {
            if rng.chance(req.tuning.peek_edge_chance) {
                edge_spot(req, rng)
            } else {
                hide_spot(req, obstacle, None, rng)
            }
        }
        Mode::Random | Mode::Rage => {
            if req.env.is_coarse_pointer() || rng.chance(req.tuning.random_orbit_bias) {
                orbit_spot(req, obstacle, 0.0, rng)
            } else {
                free_spot(req, Some(obstacle), rng)
            }
        }
    }
}

/// Hide behind a specific edge, bypassing hint selection.
pub fn pick_hide_spot<R: RandomSource + ?Sized>(
    hint: HideHint,
    req: &SpotRequest<'_>,
    rng: &mut R,
) -> Spot {
    match req.env.obstacle() {
        Some(obstacle) => hide_spot(req, obstacle, Some(hint), rng),
        None => edge_spot(req, rng),
    }
}

fn clamp(req: &SpotRequest<'_>, desired: Point, allow_off: f32) -> Point {
    clamp_to_viewport(desired, req.element, req.env.viewport(), allow_off)
}

fn near_spot(req: &SpotRequest<'_>, obstacle: Rect) -> Spot {
    let el = req.element;
    let desired = Point::new(
        obstacle.right() - el.width / 2.0 + req.tuning.near_offset.x,
        obstacle.y - el.height / 2.0 + req.tuning.near_offset.y,
    );
    Spot::front(clamp(req, desired, 0.0), 0.0)
}

fn choose_hint<R: RandomSource + ?Sized>(req: &SpotRequest<'_>, rng: &mut R) -> HideHint {
    if let Some(hint) = scripted_hide_hint(req.level) {
        return hint;
    }
    if rng.chance(req.tuning.hide_bottom_center_bias) {
        HideHint::BottomCenter
    } else {
        HideHint::EDGES[rng.index(HideHint::EDGES.len())]
    }
}

/// Random coordinate along an obstacle span that keeps the element inside it.
fn along<R: RandomSource + ?Sized>(start: f32, span: f32, extent: f32, rng: &mut R) -> f32 {
    rng.range(start, start + (span - extent).max(0.0))
}

fn hide_spot<R: RandomSource + ?Sized>(
    req: &SpotRequest<'_>,
    obstacle: Rect,
    forced: Option<HideHint>,
    rng: &mut R,
) -> Spot {
    let hint = forced.unwrap_or_else(|| choose_hint(req, rng));
    let el = req.element;
    let vis = req.tuning.visible_pct;

    let desired = match hint {
        HideHint::Left => Point::new(
            obstacle.x - el.width * vis,
            along(obstacle.y, obstacle.height, el.height, rng),
        ),
        HideHint::Right => Point::new(
            obstacle.right() - el.width * (1.0 - vis),
            along(obstacle.y, obstacle.height, el.height, rng),
        ),
        HideHint::Top => Point::new(
            along(obstacle.x, obstacle.width, el.width, rng),
            obstacle.y - el.height * vis,
        ),
        HideHint::Bottom => Point::new(
            along(obstacle.x, obstacle.width, el.width, rng),
            obstacle.bottom() - el.height * (1.0 - vis),
        ),
        HideHint::BottomCenter => Point::new(
            obstacle.center().x - el.width / 2.0,
            obstacle.bottom() - el.height * (1.0 - vis),
        ),
    };

    let m = peek_magnitude(req.scale);
    let (ox, oy) = hint.outward();
    Spot {
        position: clamp(req, desired, HIDE_OFFSCREEN_TOLERANCE),
        layer: Layer::Behind,
        peek_offset: Point::new(ox * m, oy * m),
        tunnel_target: None,
        hide_hint: Some(hint),
        allow_off: HIDE_OFFSCREEN_TOLERANCE,
    }
}

fn tunnel_spot<R: RandomSource + ?Sized>(
    req: &SpotRequest<'_>,
    obstacle: Rect,
    rng: &mut R,
) -> Spot {
    let el = req.element;
    let inset = req.tuning.tunnel_inset;
    let top = obstacle.y;
    let bottom = (obstacle.bottom() - el.height).max(top);

    let start_y = (obstacle.y + obstacle.height * rng.range(0.35, 0.75) - el.height / 2.0)
        .clamp(top, bottom);
    let end_y = (start_y + rng.jitter(req.tuning.tunnel_jitter)).clamp(top, bottom);

    let start = Point::new(obstacle.x + inset, start_y);
    let end = Point::new(obstacle.right() - el.width - inset, end_y);

    Spot {
        position: clamp(req, start, HIDE_OFFSCREEN_TOLERANCE),
        layer: Layer::Behind,
        peek_offset: Point::default(),
        tunnel_target: Some(clamp(req, end, HIDE_OFFSCREEN_TOLERANCE)),
        hide_hint: Some(HideHint::BottomCenter),
        allow_off: HIDE_OFFSCREEN_TOLERANCE,
    }
}

/// Anchor just outside one obstacle edge, centered on the other axis.
#[must_use]
pub fn orbit_anchor(obstacle: Rect, element: Size, side: OrbitSide, margin: f32) -> Point {
    let c = obstacle.center();
    match side {
        OrbitSide::Left => Point::new(
            obstacle.x - element.width - margin,
            c.y - element.height / 2.0,
        ),
        OrbitSide::Right => Point::new(obstacle.right() + margin, c.y - element.height / 2.0),
        OrbitSide::Top => Point::new(
            c.x - element.width / 2.0,
            obstacle.y - element.height - margin,
        ),
        OrbitSide::Bottom => Point::new(c.x - element.width / 2.0, obstacle.bottom() + margin),
    }
}

fn orbit_spot<R: RandomSource + ?Sized>(
    req: &SpotRequest<'_>,
    obstacle: Rect,
    extra_jitter: f32,
    rng: &mut R,
) -> Spot {
    let side = OrbitSide::ALL[rng.index(OrbitSide::ALL.len())];
    let anchor = orbit_anchor(obstacle, req.element, side, req.tuning.orbit_margin);
    let radius = (req.tuning.orbit_jitter + extra_jitter) * req.wander_factor;
    let desired = anchor.offset(rng.jitter(radius), rng.jitter(radius));
    Spot::front(clamp(req, desired, 0.0), 0.0)
}

fn edge_spot<R: RandomSource + ?Sized>(req: &SpotRequest<'_>, rng: &mut R) -> Spot {
    let el = req.element;
    let vp = req.env.viewport();
    let tol = HIDE_OFFSCREEN_TOLERANCE;
    let free_x = rng.range(0.0, (vp.width - el.width).max(0.0));
    let free_y = rng.range(0.0, (vp.height - el.height).max(0.0));
    let desired = match OrbitSide::ALL[rng.index(OrbitSide::ALL.len())] {
        OrbitSide::Left => Point::new(-tol, free_y),
        OrbitSide::Right => Point::new(vp.width - el.width + tol, free_y),
        OrbitSide::Top => Point::new(free_x, -tol),
        OrbitSide::Bottom => Point::new(free_x, vp.height - el.height + tol),
    };
    Spot::front(clamp(req, desired, tol), tol)
}

fn free_spot<R: RandomSource + ?Sized>(
    req: &SpotRequest<'_>,
    obstacle: Option<Rect>,
    rng: &mut R,
) -> Spot {
    let el = req.element;
    let vp = req.env.viewport();
    let desired = if req.env.is_coarse_pointer() {
        let center = obstacle
            .map(|o| o.center())
            .unwrap_or_else(|| Point::new(vp.width / 2.0, vp.height / 2.0));
        let radius = req.tuning.free_vicinity * req.wander_factor;
        Point::new(
            center.x - el.width / 2.0 + rng.jitter(radius),
            center.y - el.height / 2.0 + rng.jitter(radius),
        )
    } else {
        Point::new(
            rng.range(0.0, (vp.width - el.width).max(0.0)),
            rng.range(0.0, (vp.height - el.height).max(0.0)),
        )
    };
    Spot::front(clamp(req, desired, 0.0), 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::within_viewport;
    use crate::rng::SequenceRandom;

    fn env() -> Environment {
        Environment::new(Size::new(1000.0, 800.0)).with_obstacle(Rect::new(300.0, 250.0, 400.0, 300.0))
    }

    fn request<'a>(env: &'a Environment, tuning: &'a SpotTuning, level: u8) -> SpotRequest<'a> {
        SpotRequest {
            env,
            level,
            element: Size::new(100.0, 40.0),
            scale: 1.0,
            wander_factor: 1.0,
            tuning,
        }
    }

    #[test]
    fn near_sits_on_top_right_corner() {
        let env = env();
        let tuning = SpotTuning::default();
        let req = request(&env, &tuning, 0);
        let spot = pick_spot(Mode::Near, &req, &mut SequenceRandom::constant(0.5));
        assert_eq!(spot.position, Point::new(700.0 - 50.0 + 12.0, 250.0 - 20.0 - 12.0));
        assert_eq!(spot.layer, Layer::Front);
    }

    #[test]
    fn scripted_hint_wins_at_level_three() {
        let env = env();
        let tuning = SpotTuning::default();
        let req = request(&env, &tuning, 3);
        let spot = pick_spot(Mode::Hide, &req, &mut SequenceRandom::constant(0.0));
        assert_eq!(spot.hide_hint, Some(HideHint::Bottom));
        assert_eq!(spot.layer, Layer::Behind);
        // 35% of 40px protrudes below the bottom edge at y=550.
        assert!((spot.position.y - (550.0 - 26.0)).abs() < 1e-3);
        assert_eq!(spot.peek_offset, Point::new(0.0, 22.0));
    }

    #[test]
    fn unscripted_hide_biases_bottom_center() {
        let env = env();
        let tuning = SpotTuning::default();
        let req = request(&env, &tuning, 13);
        let spot = pick_spot(Mode::Hide, &req, &mut SequenceRandom::new([0.2], 0.5));
        assert_eq!(spot.hide_hint, Some(HideHint::BottomCenter));
        assert_eq!(spot.position.x, 500.0 - 50.0);
    }

    #[test]
    fn unscripted_hide_uniform_edges() {
        let env = env();
        let tuning = SpotTuning::default();
        let req = request(&env, &tuning, 13);
        // Fail the bottom-center gate, then index 0 -> Left.
        let spot = pick_spot(Mode::Hide, &req, &mut SequenceRandom::new([0.9, 0.0, 0.0], 0.0));
        assert_eq!(spot.hide_hint, Some(HideHint::Left));
        assert!((spot.position.x - (300.0 - 35.0)).abs() < 1e-3);
        assert_eq!(spot.peek_offset, Point::new(-22.0, 0.0));
    }

    #[test]
    fn tunnel_spans_obstacle_behind() {
        let env = env();
        let tuning = SpotTuning::default();
        let req = request(&env, &tuning, 15);
        let spot = pick_spot(Mode::Tunnel, &req, &mut SequenceRandom::constant(0.5));
        let end = spot.tunnel_target.expect("tunnel has an endpoint");
        assert_eq!(spot.layer, Layer::Behind);
        assert_eq!(spot.position.x, 308.0);
        assert_eq!(end.x, 700.0 - 100.0 - 8.0);
        assert_eq!(spot.hide_hint, Some(HideHint::BottomCenter));
    }

    #[test]
    fn peek_edge_branch_is_front_and_off_screen() {
        let env = env();
        let tuning = SpotTuning::default();
        let req = request(&env, &tuning, 9);
        // Edge gate passes, free x/y, side index 0 -> left edge.
        let spot = pick_spot(Mode::Peek, &req, &mut SequenceRandom::new([0.1, 0.5, 0.5, 0.0], 0.5));
        assert_eq!(spot.layer, Layer::Front);
        assert_eq!(spot.position.x, -HIDE_OFFSCREEN_TOLERANCE);
        assert_eq!(spot.hide_hint, None);
    }

    #[test]
    fn peek_hide_branch_goes_behind() {
        let env = env();
        let tuning = SpotTuning::default();
        let req = request(&env, &tuning, 9);
        let spot = pick_spot(Mode::Peek, &req, &mut SequenceRandom::new([0.9], 0.5));
        assert_eq!(spot.layer, Layer::Behind);
        assert_eq!(spot.hide_hint, Some(HideHint::BottomCenter));
    }

    #[test]
    fn coarse_random_always_orbits() {
        let env = env().with_capabilities(true, false);
        let tuning = SpotTuning::default();
        let req = request(&env, &tuning, 4);
        let mut rng = SequenceRandom::new([0.0, 0.5, 0.5], 0.5);
        let spot = pick_spot(Mode::Random, &req, &mut rng);
        // Side index 0 -> left anchor, zero jitter at 0.5.
        assert_eq!(spot.position, Point::new(300.0 - 100.0 - 18.0, 400.0 - 20.0));
        assert_eq!(rng.drawn(), 3);
    }

    #[test]
    fn unmeasured_obstacle_degrades() {
        let env = Environment::new(Size::new(1000.0, 800.0));
        let tuning = SpotTuning::default();
        let req = request(&env, &tuning, 3);
        let hide = pick_spot(Mode::Hide, &req, &mut SequenceRandom::constant(0.3));
        assert_eq!(hide.layer, Layer::Front);
        assert_eq!(hide.allow_off, HIDE_OFFSCREEN_TOLERANCE);
        let tunnel = pick_spot(Mode::Tunnel, &req, &mut SequenceRandom::constant(0.3));
        assert_eq!(tunnel.layer, Layer::Front);
        assert_eq!(tunnel.tunnel_target, None);
    }

    #[test]
    fn all_modes_respect_bounds_and_layer_invariant() {
        let env = env();
        let tuning = SpotTuning::default();
        let modes = [
            Mode::Near,
            Mode::Hide,
            Mode::Tunnel,
            Mode::Peek,
            Mode::Slip,
            Mode::Rage,
            Mode::Orbit,
            Mode::Random,
        ];
        let mut rng = crate::rng::SeededRandom::from_seed(9);
        for level in 0..20 {
            let req = request(&env, &tuning, level);
            for mode in modes {
                let spot = pick_spot(mode, &req, &mut rng);
                assert!(within_viewport(
                    spot.position,
                    req.element,
                    env.viewport(),
                    spot.allow_off
                ));
                if spot.layer == Layer::Behind {
                    assert!(spot.hide_hint.is_some() || spot.tunnel_target.is_some());
                }
            }
        }
    }
}
