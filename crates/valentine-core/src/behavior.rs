#![forbid(unsafe_code)]

//! Behavior selection: escalation level to movement mode and parameters.
//!
//! [`select_behavior`] is a pure function. The mode table depends on the
//! level and pointer coarseness only; calm, lure, and occupancy flags feed
//! the derived parameters.
//!
//! | Level            | Mode                          |
//! |------------------|-------------------------------|
//! | 0, 1             | [`Mode::Near`]                |
//! | 5                | [`Mode::Rage`]                |
//! | 9, 14, 18        | [`Mode::Peek`]                |
//! | 7, 8, 10         | [`Mode::Slip`]                |
//! | 3, 6, 12, 17     | [`Mode::Hide`]                |
//! | 15               | [`Mode::Tunnel`]              |
//! | 11, 16 (fine)    | [`Mode::Orbit`]               |
//! | anything else    | [`Mode::Random`]              |

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of escalation steps per cycle.
pub const MAX_LEVEL: u8 = 20;

/// Highest reachable escalation level.
pub const TOP_LEVEL: u8 = MAX_LEVEL - 1;

/// Named movement behavior of the evasive control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Mode {
    Near,
    Hide,
    Tunnel,
    Peek,
    Slip,
    Rage,
    Orbit,
    Random,
}

impl Mode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Near => "near",
            Self::Hide => "hide",
            Self::Tunnel => "tunnel",
            Self::Peek => "peek",
            Self::Slip => "slip",
            Self::Rage => "rage",
            Self::Orbit => "orbit",
            Self::Random => "random",
        }
    }
}

/// Inputs to [`select_behavior`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BehaviorInputs {
    pub level: u8,
    pub coarse_pointer: bool,
    pub can_hover: bool,
    pub calm: bool,
    pub lure_held: bool,
    pub occupied: bool,
}

/// Continuous parameters derived from the escalation level and flags.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BehaviorParams {
    /// Render scale of the control.
    pub scale: f32,
    pub opacity: f32,
    /// Pointer proximity makes the control flee.
    pub fear_aura: bool,
    /// How long a press must be held to confirm.
    pub hold_duration: Duration,
    /// The lure attractor pulls the control.
    pub lure_enabled: bool,
    /// Multiplier on every jitter radius.
    pub wander_factor: f32,
}

/// Mode plus parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Behavior {
    pub mode: Mode,
    pub params: BehaviorParams,
}

/// Clamp a raw level into the valid range.
#[inline]
#[must_use]
pub fn clamp_level(level: u8) -> u8 {
    level.min(TOP_LEVEL)
}

/// Mode table lookup; first match wins.
#[must_use]
pub fn select_mode(level: u8, coarse_pointer: bool) -> Mode {
    let level = clamp_level(level);
    match level {
        0 | 1 => Mode::Near,
        5 => Mode::Rage,
        9 | 14 | 18 => Mode::Peek,
        7 | 8 | 10 => Mode::Slip,
        3 | 6 | 12 | 17 => Mode::Hide,
        15 => Mode::Tunnel,
        11 | 16 if !coarse_pointer => Mode::Orbit,
        _ => Mode::Random,
    }
}

#[must_use]
pub fn scale_for(level: u8) -> f32 {
    (1.04 - f32::from(clamp_level(level)) * 0.018).clamp(0.82, 1.18)
}

#[must_use]
pub fn opacity_for(level: u8) -> f32 {
    let level = clamp_level(level);
    let raw = if level > 14 {
        1.0 - f32::from(level - 14) * 0.04
    } else {
        1.0
    };
    raw.clamp(0.78, 1.0)
}

/// Hold duration before calm adjustment: `clamp(340 + 28·level, 340, 900)` ms.
#[must_use]
pub fn base_hold_ms(level: u8) -> u64 {
    (340 + u64::from(clamp_level(level)) * 28).clamp(340, 900)
}

#[must_use]
pub fn hold_duration_for(level: u8, calm: bool) -> Duration {
    let base = base_hold_ms(level) as f64;
    let ms = if calm { (base * 0.65).max(220.0) } else { base };
    Duration::from_micros((ms * 1000.0).round() as u64)
}

/// Fear radius around the control center: `clamp(155 − 2.3·level, 95, 155)`.
#[must_use]
pub fn fear_radius(level: u8) -> f32 {
    (155.0 - f32::from(clamp_level(level)) * 2.3).clamp(95.0, 155.0)
}

/// Lure items required to release the box occupant:
/// `clamp(1 + floor(level / 7), 1, 3)`.
#[must_use]
pub fn fish_needed(level: u8) -> u8 {
    (1 + clamp_level(level) / 7).clamp(1, 3)
}

/// Derive mode and parameters.
#[must_use]
pub fn select_behavior(inputs: BehaviorInputs) -> Behavior {
    let level = clamp_level(inputs.level);
    let mode = select_mode(level, inputs.coarse_pointer);
    let params = BehaviorParams {
        scale: scale_for(level),
        opacity: opacity_for(level),
        fear_aura: inputs.can_hover && level >= 3 && !inputs.calm && !inputs.occupied,
        hold_duration: hold_duration_for(level, inputs.calm),
        lure_enabled: (inputs.calm || inputs.lure_held) && !inputs.occupied,
        wander_factor: if inputs.coarse_pointer { 0.55 } else { 1.0 },
    };
    Behavior { mode, params }
}
