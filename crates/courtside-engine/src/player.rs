// Player representation and position groups.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type PlayerId = u32;
pub type TeamId = u32;
pub type EventId = u32;

/// The two coarse position groups roster and lineup quotas are enforced against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionGroup {
    BackCourt,
    FrontCourt,
}

impl PositionGroup {
    /// Derive the group from a finer position label.
    ///
    /// Guards ("Guard", "Back Court", "G") are back court; everything else
    /// (forwards, centers, "Front Court") is front court.
    pub fn from_label(label: &str) -> Self {
        let lower = label.trim().to_lowercase();
        if lower.contains("guard") || lower.contains("back") || lower == "g" {
            PositionGroup::BackCourt
        } else {
            PositionGroup::FrontCourt
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            PositionGroup::BackCourt => "BC",
            PositionGroup::FrontCourt => "FC",
        }
    }
}

impl fmt::Display for PositionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// A candidate for the roster model. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team_id: TeamId,
    pub position: PositionGroup,
    /// Price in tenths: sale value for owned players, market price otherwise.
    pub cost: u32,
    /// Rolling per-game average; 0 for players retained while unavailable.
    pub projected_score: f64,
    /// False for players kept in the pool despite an unavailability verdict.
    /// Such players never get a starting slot.
    pub available: bool,
    pub owned: bool,
}
