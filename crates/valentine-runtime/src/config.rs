#![forbid(unsafe_code)]

//! Tunables as data.
//!
//! [`ValentineConfig`] gathers every timing window, probability gate, and
//! geometry constant used by the runtime. `ValentineConfig::default()`
//! reproduces the stock behavior exactly.
//!
//! # Loading
//!
//! ```toml
//! # valentine.toml
//! [timing]
//! freeze_ms = 900
//!
//! [chance]
//! dive = 0.25
//! ```
//!
//! ```rust,ignore
//! let config = ValentineConfig::from_toml_file("valentine.toml")?;
//! let config = ValentineConfig::from_json_str(json)?;
//! ```

#[cfg(feature = "config-file")]
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "config-file")]
use serde::{Deserialize, Serialize};

use valentine_core::geometry::{Point, Size};
use valentine_core::spot::SpotTuning;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// All runtime tunables.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct ValentineConfig {
    pub timing: TimingConfig,
    pub chance: ChanceConfig,
    pub geometry: GeometryConfig,
}

impl ValentineConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-file")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Reject a config whose [`validate`](Self::validate) list is non-empty.
    pub fn into_validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            tracing::warn!(
                target: "valentine.config",
                error_count = errors.len(),
                "config rejected"
            );
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load a TOML file and validate it.
    #[cfg(feature = "config-file")]
    pub fn load_validated(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)?.into_validated()
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// An empty list means the config is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let probabilities = [
            ("chance.dive", self.chance.dive),
            ("chance.box_tap_scare", self.chance.box_tap_scare),
            ("chance.hide_bottom_center", self.chance.hide_bottom_center),
            ("chance.random_orbit", self.chance.random_orbit),
            ("chance.peek_edge", self.chance.peek_edge),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                errors.push(format!("{name} must be in [0, 1], got {p}"));
            }
        }

        let positive_durations = [
            ("timing.freeze_ms", self.timing.freeze_ms),
            ("timing.box_enter_ms", self.timing.box_enter_ms),
            ("timing.box_lifetime_ms", self.timing.box_lifetime_ms),
            ("timing.fish_flight_ms", self.timing.fish_flight_ms),
            ("timing.feedback_ms", self.timing.feedback_ms),
            ("timing.tick_ms", self.timing.tick_ms),
        ];
        for (name, ms) in positive_durations {
            if ms == 0 {
                errors.push(format!("{name} must be > 0"));
            }
        }

        let g = &self.geometry;
        if g.element_width <= 0.0 || g.element_height <= 0.0 {
            errors.push(format!(
                "geometry.element size must be positive, got {}x{}",
                g.element_width, g.element_height
            ));
        }
        if g.box_width <= 0.0 || g.box_height <= 0.0 {
            errors.push(format!(
                "geometry.box size must be positive, got {}x{}",
                g.box_width, g.box_height
            ));
        }
        if g.visible_pct <= 0.0 || g.visible_pct >= 1.0 {
            errors.push(format!(
                "geometry.visible_pct must be in (0, 1), got {}",
                g.visible_pct
            ));
        }
        if g.box_spawn_attempts == 0 {
            errors.push("geometry.box_spawn_attempts must be > 0".into());
        }
        if g.lure_snap_px < 0.0 {
            errors.push(format!(
                "geometry.lure_snap_px must be >= 0, got {}",
                g.lure_snap_px
            ));
        }

        errors
    }

    /// Unscaled size of the evasive control.
    #[must_use]
    pub fn element_size(&self) -> Size {
        Size::new(self.geometry.element_width, self.geometry.element_height)
    }

    #[must_use]
    pub fn box_size(&self) -> Size {
        Size::new(self.geometry.box_width, self.geometry.box_height)
    }

    /// Build the [`SpotTuning`] the spot picker reads.
    #[must_use]
    pub fn to_spot_tuning(&self) -> SpotTuning {
        let g = &self.geometry;
        SpotTuning {
            visible_pct: g.visible_pct,
            near_offset: Point::new(g.near_offset_x, g.near_offset_y),
            orbit_margin: g.orbit_margin,
            orbit_jitter: g.orbit_jitter,
            slip_jitter: g.slip_jitter,
            free_vicinity: g.free_vicinity,
            tunnel_inset: g.tunnel_inset,
            tunnel_jitter: g.tunnel_jitter,
            hide_bottom_center_bias: self.chance.hide_bottom_center,
            random_orbit_bias: self.chance.random_orbit,
            peek_edge_chance: self.chance.peek_edge,
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-configs (flat, serde-friendly)
// ---------------------------------------------------------------------------

/// Timing windows, all in milliseconds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct TimingConfig {
    /// Grace period after any reposition. Default: 850.
    pub freeze_ms: u64,
    /// Freeze after each lure steer step. Default: 420.
    pub lure_freeze_ms: u64,
    /// Delay between a confirmed "no" and the follow-up move. Default: 70.
    pub confirm_reposition_delay_ms: u64,
    /// Minimum gap between fear-triggered flights. Default: 520.
    pub flee_cooldown_ms: u64,
    /// Minimum gap between box-dive draws. Default: 2600.
    pub dive_cooldown_ms: u64,
    /// Deliberate pause before a dive starts. Default: 120.
    pub dive_delay_ms: u64,
    /// Entering-box transition. Default: 520.
    pub box_enter_ms: u64,
    /// Dramatic pause before the occupant leaves. Default: 260.
    pub box_exit_delay_ms: u64,
    /// Lifetime of an empty box. Default: 12000.
    pub box_lifetime_ms: u64,
    /// Expiry extension when the box becomes occupied. Default: 20000.
    pub box_occupied_extension_ms: u64,
    /// Grace before an emptied box may vanish. Default: 9000.
    pub box_exit_grace_ms: u64,
    /// Quiet period between a box vanishing and the next spawn. Default: 4000.
    pub box_respawn_cooldown_ms: u64,
    /// Flight time of a thrown lure item. Default: 450.
    pub fish_flight_ms: u64,
    /// Display time of transient feedback. Default: 1600.
    pub feedback_ms: u64,
    /// Delay before the level loops from the top back to zero. Default: 2200.
    pub loop_reset_ms: u64,
    /// Calm window granted by a treat. Default: 5000.
    pub calm_ms: u64,
    /// Expected host tick period. Default: 100.
    pub tick_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            freeze_ms: 850,
            lure_freeze_ms: 420,
            confirm_reposition_delay_ms: 70,
            flee_cooldown_ms: 520,
            dive_cooldown_ms: 2_600,
            dive_delay_ms: 120,
            box_enter_ms: 520,
            box_exit_delay_ms: 260,
            box_lifetime_ms: 12_000,
            box_occupied_extension_ms: 20_000,
            box_exit_grace_ms: 9_000,
            box_respawn_cooldown_ms: 4_000,
            fish_flight_ms: 450,
            feedback_ms: 1_600,
            loop_reset_ms: 2_200,
            calm_ms: 5_000,
            tick_ms: 100,
        }
    }
}

impl TimingConfig {
    #[inline]
    pub fn freeze(&self) -> Duration {
        Duration::from_millis(self.freeze_ms)
    }

    #[inline]
    pub fn lure_freeze(&self) -> Duration {
        Duration::from_millis(self.lure_freeze_ms)
    }

    #[inline]
    pub fn confirm_reposition_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_reposition_delay_ms)
    }

    #[inline]
    pub fn flee_cooldown(&self) -> Duration {
        Duration::from_millis(self.flee_cooldown_ms)
    }

    #[inline]
    pub fn dive_cooldown(&self) -> Duration {
        Duration::from_millis(self.dive_cooldown_ms)
    }

    #[inline]
    pub fn dive_delay(&self) -> Duration {
        Duration::from_millis(self.dive_delay_ms)
    }

    #[inline]
    pub fn box_enter(&self) -> Duration {
        Duration::from_millis(self.box_enter_ms)
    }

    #[inline]
    pub fn box_exit_delay(&self) -> Duration {
        Duration::from_millis(self.box_exit_delay_ms)
    }

    #[inline]
    pub fn box_lifetime(&self) -> Duration {
        Duration::from_millis(self.box_lifetime_ms)
    }

    #[inline]
    pub fn box_occupied_extension(&self) -> Duration {
        Duration::from_millis(self.box_occupied_extension_ms)
    }

    #[inline]
    pub fn box_exit_grace(&self) -> Duration {
        Duration::from_millis(self.box_exit_grace_ms)
    }

    #[inline]
    pub fn box_respawn_cooldown(&self) -> Duration {
        Duration::from_millis(self.box_respawn_cooldown_ms)
    }

    #[inline]
    pub fn fish_flight(&self) -> Duration {
        Duration::from_millis(self.fish_flight_ms)
    }

    #[inline]
    pub fn feedback(&self) -> Duration {
        Duration::from_millis(self.feedback_ms)
    }

    #[inline]
    pub fn loop_reset(&self) -> Duration {
        Duration::from_millis(self.loop_reset_ms)
    }

    #[inline]
    pub fn calm(&self) -> Duration {
        Duration::from_millis(self.calm_ms)
    }

    #[inline]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Probability gates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct ChanceConfig {
    /// Box dive on an eligible reposition. Default: 0.18.
    pub dive: f32,
    /// Tapping an empty box scares the control into it. Default: 0.35.
    pub box_tap_scare: f32,
    /// Unscripted hides pick bottom-center. Default: 0.45.
    pub hide_bottom_center: f32,
    /// Random mode uses an orbit anchor on fine pointers. Default: 0.65.
    pub random_orbit: f32,
    /// Peek uses the viewport edge instead of hiding. Default: 0.5.
    pub peek_edge: f32,
}

impl Default for ChanceConfig {
    fn default() -> Self {
        Self {
            dive: 0.18,
            box_tap_scare: 0.35,
            hide_bottom_center: 0.45,
            random_orbit: 0.65,
            peek_edge: 0.5,
        }
    }
}

/// Sizes, margins, and thresholds in viewport pixels.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct GeometryConfig {
    /// Unscaled control width. Default: 112.
    pub element_width: f32,
    /// Unscaled control height. Default: 48.
    pub element_height: f32,
    /// Default: 104.
    pub box_width: f32,
    /// Default: 80.
    pub box_height: f32,
    /// Fraction protruding past a hidden edge. Default: 0.35.
    pub visible_pct: f32,
    /// Default: 12.
    pub near_offset_x: f32,
    /// Default: -12.
    pub near_offset_y: f32,
    /// Default: 18.
    pub orbit_margin: f32,
    /// Default: 40.
    pub orbit_jitter: f32,
    /// Default: 70.
    pub slip_jitter: f32,
    /// Default: 160.
    pub free_vicinity: f32,
    /// Default: 8.
    pub tunnel_inset: f32,
    /// Default: 24.
    pub tunnel_jitter: f32,
    /// Lure steering stops inside this distance. Default: 18.
    pub lure_snap_px: f32,
    /// Box spawn clearance around the obstacle, fine pointers. Default: 16.
    pub box_pad_fine: f32,
    /// Box spawn clearance around the obstacle, coarse pointers. Default: 28.
    pub box_pad_coarse: f32,
    /// Box spawn inset from viewport edges. Default: 12.
    pub box_edge_inset: f32,
    /// Rejection-sampling budget for box spawns. Default: 9.
    pub box_spawn_attempts: u32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            element_width: 112.0,
            element_height: 48.0,
            box_width: 104.0,
            box_height: 80.0,
            visible_pct: 0.35,
            near_offset_x: 12.0,
            near_offset_y: -12.0,
            orbit_margin: 18.0,
            orbit_jitter: 40.0,
            slip_jitter: 70.0,
            free_vicinity: 160.0,
            tunnel_inset: 8.0,
            tunnel_jitter: 24.0,
            lure_snap_px: 18.0,
            box_pad_fine: 16.0,
            box_pad_coarse: 28.0,
            box_edge_inset: 12.0,
            box_spawn_attempts: 9,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from loading or validating a config.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-file")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config-file")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
