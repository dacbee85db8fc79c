#![forbid(unsafe_code)]

//! JSON input parser for host messages.
//!
//! [`parse_host_event`] accepts one JSON object posted by the JS glue layer
//! and returns the corresponding [`HostEvent`]. Messages the toy does not
//! consume (other keys, focus, wheel, unknown kinds) return `Ok(None)`.
//!
//! ```text
//! {"kind":"pointer_down","target":"no","x":812.5,"y":240}
//! {"kind":"pointer_move","x":10,"y":20}
//! {"kind":"key","target":"no","key":"Enter","phase":"down"}
//! {"kind":"resize","width":1280,"height":720}
//! {"kind":"media_change","coarse_pointer":true,"can_hover":false}
//! {"kind":"obstacle_measured","rect":{"x":0,"y":0,"width":500,"height":400}}
//! {"kind":"tick"}
//! ```

use serde::Deserialize;
use valentine_core::event::{ActivationKey, HostEvent, KeyPhase, Target};
use valentine_core::geometry::{Point, Rect};

/// Errors from parsing host JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputParseError {
    /// Malformed JSON.
    Json(String),
    /// Missing required field.
    MissingField(&'static str),
    /// Unknown target surface.
    UnknownTarget(String),
    /// Unknown key phase value.
    UnknownPhase(String),
}

impl core::fmt::Display for InputParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::UnknownTarget(target) => write!(f, "unknown target: {target}"),
            Self::UnknownPhase(phase) => write!(f, "unknown phase: {phase}"),
        }
    }
}

impl std::error::Error for InputParseError {}

#[derive(Debug, Deserialize)]
struct RawRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    kind: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    x: Option<f32>,
    #[serde(default)]
    y: Option<f32>,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    phase: Option<String>,
    #[serde(default)]
    width: Option<f32>,
    #[serde(default)]
    height: Option<f32>,
    #[serde(default)]
    coarse_pointer: Option<bool>,
    #[serde(default)]
    can_hover: Option<bool>,
    #[serde(default)]
    rect: Option<RawRect>,
}

/// Parse one host message into a [`HostEvent`].
///
/// Returns `Err` for malformed JSON, missing required fields, or unknown
/// targets and phases.
pub fn parse_host_event(json: &str) -> Result<Option<HostEvent>, InputParseError> {
    let raw: RawInput =
        serde_json::from_str(json).map_err(|e| InputParseError::Json(e.to_string()))?;

    let event = match raw.kind.as_str() {
        "pointer_down" => HostEvent::PointerDown {
            target: required_target(&raw)?,
            pos: required_pos(&raw)?,
        },
        "pointer_up" => HostEvent::PointerUp {
            target: required_target(&raw)?,
            pos: required_pos(&raw)?,
        },
        "pointer_cancel" => HostEvent::PointerCancel {
            target: required_target(&raw)?,
        },
        "pointer_move" => HostEvent::PointerMove {
            target: raw.target.as_deref().map(parse_target).transpose()?,
            pos: required_pos(&raw)?,
        },
        "key" => return parse_key(&raw),
        "resize" => HostEvent::Resize {
            width: raw.width.ok_or(InputParseError::MissingField("width"))?,
            height: raw.height.ok_or(InputParseError::MissingField("height"))?,
        },
        "media_change" => HostEvent::MediaChange {
            coarse_pointer: raw
                .coarse_pointer
                .ok_or(InputParseError::MissingField("coarse_pointer"))?,
            can_hover: raw.can_hover.ok_or(InputParseError::MissingField("can_hover"))?,
        },
        // A null or absent rect means the obstacle is not measurable.
        "obstacle_measured" => HostEvent::ObstacleMeasured {
            rect: raw
                .rect
                .as_ref()
                .map(|r| Rect::new(r.x, r.y, r.width, r.height)),
        },
        "tick" => HostEvent::Tick,
        _ => return Ok(None),
    };
    Ok(Some(event))
}

fn parse_target(name: &str) -> Result<Target, InputParseError> {
    match name {
        "no" => Ok(Target::No),
        "yes" => Ok(Target::Yes),
        "lure" | "fish" => Ok(Target::Lure),
        "box" => Ok(Target::Box),
        "treat" => Ok(Target::Treat),
        "backdrop" => Ok(Target::Backdrop),
        other => Err(InputParseError::UnknownTarget(other.to_string())),
    }
}

fn required_target(raw: &RawInput) -> Result<Target, InputParseError> {
    let name = raw
        .target
        .as_deref()
        .ok_or(InputParseError::MissingField("target"))?;
    parse_target(name)
}

fn required_pos(raw: &RawInput) -> Result<Point, InputParseError> {
    let x = raw.x.ok_or(InputParseError::MissingField("x"))?;
    let y = raw.y.ok_or(InputParseError::MissingField("y"))?;
    Ok(Point::new(x, y))
}

/// Only Enter and Space activate; other keys are not ours.
fn parse_key(raw: &RawInput) -> Result<Option<HostEvent>, InputParseError> {
    let key = match raw.key.as_deref() {
        Some("Enter" | "NumpadEnter") => ActivationKey::Enter,
        Some(" " | "Space" | "Spacebar") => ActivationKey::Space,
        Some(_) => return Ok(None),
        None => return Err(InputParseError::MissingField("key")),
    };
    let phase = match raw.phase.as_deref() {
        Some("down") => KeyPhase::Down,
        Some("up") => KeyPhase::Up,
        Some(other) => return Err(InputParseError::UnknownPhase(other.to_string())),
        None => return Err(InputParseError::MissingField("phase")),
    };
    Ok(Some(HostEvent::Key {
        target: required_target(raw)?,
        key,
        phase,
    }))
}
