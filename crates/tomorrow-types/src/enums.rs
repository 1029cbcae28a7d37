//! Enumeration types shared by the encounter core, the store, and hosts.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Encounter outcome
// ---------------------------------------------------------------------------

/// How far an encounter has progressed, or how it ended.
///
/// Variants are declared in progression order. [`Outcome::rank`] exposes that
/// order so callers can refuse backward transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Encounter created, nothing resolved yet.
    Pending,
    /// First visit resolved: the echo vanished in front of the participant.
    FirstVisitDone,
    /// The participant died while the encounter was active.
    PlayerDied,
    /// The participant ran out of levels and the encounter collapsed.
    NoLevelsEscape,
    /// Tomorrow branch completed and the echo compass was granted.
    TomorrowBranchCompass,
    /// Tomorrow branch completed without a compass.
    TomorrowBranchNoCompass,
}

impl Outcome {
    /// Progression rank. Terminal outcomes share the highest rank.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::FirstVisitDone => 1,
            Self::PlayerDied
            | Self::NoLevelsEscape
            | Self::TomorrowBranchCompass
            | Self::TomorrowBranchNoCompass => 2,
        }
    }

    /// Whether this outcome ends the encounter.
    pub const fn is_terminal(self) -> bool {
        self.rank() == 2
    }
}

impl core::fmt::Display for Outcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::FirstVisitDone => write!(f, "first_visit_done"),
            Self::PlayerDied => write!(f, "player_died"),
            Self::NoLevelsEscape => write!(f, "no_levels_escape"),
            Self::TomorrowBranchCompass => write!(f, "tomorrow_branch_compass"),
            Self::TomorrowBranchNoCompass => write!(f, "tomorrow_branch_no_compass"),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// Behavior mode of the echo compass. The only transition is
/// `Chaotic -> Calibrated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactMode {
    /// Pointer is re-randomized around the holder on an interval.
    Chaotic,
    /// Pointer is locked onto the echo point. Terminal.
    Calibrated,
}

impl ArtifactMode {
    /// Tag string stored on the item.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chaotic => "chaotic",
            Self::Calibrated => "calibrated",
        }
    }

    /// Parse the tag string stored on the item.
    pub fn from_tag(raw: &str) -> Option<Self> {
        match raw {
            "chaotic" => Some(Self::Chaotic),
            "calibrated" => Some(Self::Calibrated),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Side effects requested from the host
// ---------------------------------------------------------------------------

/// Audio/visual cue the host should play for a participant.
///
/// Presentation is entirely up to the host; the core only says which beat
/// of the encounter happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// An encounter was just triggered.
    TriggerConfirm,
    /// The echo appeared at the target.
    MarkerArrived,
    /// The echo vanished in front of the participant.
    MarkerVanished,
    /// Slow heartbeat signalling the echo's presence.
    Heartbeat,
    /// Levels were taken from the participant.
    LevelsDrained,
    /// Distortion around the participant while standing at the echo point.
    Distortion,
    /// The echo compass was granted or refreshed.
    ArtifactGranted,
    /// The tomorrow branch ended without a reward.
    RewardDenied,
    /// The encounter closed after the tomorrow branch.
    Departure,
    /// The echo compass settled onto its target.
    ArtifactCalibrated,
}

/// Timed status effect applied to a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Movement slowed.
    Slowness,
    /// Damage reduced.
    Weakness,
    /// Screen wobble.
    Nausea,
}
