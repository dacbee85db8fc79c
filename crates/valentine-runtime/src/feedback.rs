#![forbid(unsafe_code)]

//! Transient user-facing feedback.
//!
//! Feedback is typed so tests can assert on it; [`Feedback::text`] renders
//! the short line a host shows for [`TimingConfig::feedback`] before the
//! runtime clears it.
//!
//! [`TimingConfig::feedback`]: crate::config::TimingConfig::feedback

use std::time::Duration;

use valentine_core::spot::HideHint;

/// One transient message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    /// A "no" was confirmed; carries the new level.
    Counted { level: u8 },
    /// Confirmed at the top level; the counter will wrap.
    Looping,
    /// Released between 35% and 75% of the hold.
    AlmostHadIt,
    /// Released above 75% of the hold.
    SoClose,
    /// Released very early without a reaction.
    TooQuick,
    /// Released early and the control ducked behind the card.
    DuckedAway(HideHint),
    /// Hold refused because the control is in the box.
    HoldRefused,
    /// Lure item arrived while nobody was in the box.
    FishIgnored,
    /// Lure item counted toward release.
    FishCounted { fed: u8, needed: u8 },
    /// Lure item arrived while the occupant was already leaving.
    FishWhileLeaving,
    /// The control hopped into the box.
    Dove,
    /// The control left the box.
    BoxEscaped,
    /// A treat was given.
    TreatGiven,
    /// The positive response was chosen.
    Accepted,
}

impl Feedback {
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Counted { level } => format!("No #{level}. Are you sure?"),
            Self::Looping => "Okay, okay... starting over.".into(),
            Self::AlmostHadIt => "Almost had it!".into(),
            Self::SoClose => "So close!".into(),
            Self::TooQuick => "Too quick. Hold it down.".into(),
            Self::DuckedAway(hint) => format!("It ducked behind the card ({}).", hint.as_str()),
            Self::HoldRefused => "It's hiding in the box.".into(),
            Self::FishIgnored => "Nobody's home to eat that.".into(),
            Self::FishCounted { fed, needed } => format!("Nom! {fed}/{needed}"),
            Self::FishWhileLeaving => "Already on its way out.".into(),
            Self::Dove => "It dove into the box!".into(),
            Self::BoxEscaped => "It popped back out!".into(),
            Self::TreatGiven => "Treat given. Everyone relax.".into(),
            Self::Accepted => "Yay!".into(),
        }
    }
}

/// The message currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShownFeedback {
    pub feedback: Feedback,
    pub shown_at: Duration,
    pub until: Duration,
}

impl ShownFeedback {
    #[must_use]
    pub fn is_visible(&self, now: Duration) -> bool {
        now < self.until
    }
}
