// Wire types for the fantasy provider's JSON API and their conversion into
// engine types.
//
// Field names mirror the provider payloads. Every optional or
// occasionally-missing field carries a serde default so a partially
// populated payload still decodes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use courtside_engine::calendar::Phase;
use courtside_engine::ledger::{Pick, TeamSheet};
use courtside_engine::player::{EventId, PlayerId, PositionGroup, TeamId};
use courtside_engine::pool::CatalogEntry;
use courtside_engine::schedule::{Fixture, TeamRecord};
use courtside_engine::valuation::GameRecord;

/// Catalog status marking a player as removed from the game.
pub const STATUS_REMOVED: &str = "u";

// ---------------------------------------------------------------------------
// Bootstrap catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootstrapDto {
    #[serde(default)]
    pub elements: Vec<ElementDto>,
    #[serde(default)]
    pub teams: Vec<TeamDto>,
    #[serde(default)]
    pub element_types: Vec<ElementTypeDto>,
    #[serde(default)]
    pub phases: Vec<PhaseDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDto {
    pub id: PlayerId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub second_name: String,
    #[serde(default)]
    pub web_name: String,
    pub team: TeamId,
    pub element_type: u32,
    #[serde(default)]
    pub status: String,
    pub now_cost: u32,
    #[serde(default)]
    pub chance_of_playing_next_round: Option<u8>,
    #[serde(default)]
    pub total_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDto {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub win: u32,
    #[serde(default)]
    pub loss: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementTypeDto {
    pub id: u32,
    pub singular_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDto {
    pub id: u32,
    pub name: String,
    pub start_event: EventId,
    pub stop_event: EventId,
}

// ---------------------------------------------------------------------------
// Fixtures, histories, picks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureDto {
    /// Unscheduled fixtures carry no event.
    #[serde(default)]
    pub event: Option<EventId>,
    #[serde(default)]
    pub kickoff_time: Option<DateTime<Utc>>,
    pub team_h: TeamId,
    pub team_a: TeamId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSummaryDto {
    #[serde(default)]
    pub history: Vec<HistoryDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryDto {
    pub kickoff_time: DateTime<Utc>,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub total_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PicksDto {
    #[serde(default)]
    pub picks: Vec<PickDto>,
    #[serde(default)]
    pub entry_history: EntryHistoryDto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickDto {
    pub element: PlayerId,
    #[serde(default)]
    pub purchase_price: Option<u32>,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    #[serde(default)]
    pub is_captain: bool,
}

fn default_multiplier() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryHistoryDto {
    #[serde(default)]
    pub event: EventId,
    #[serde(default)]
    pub bank: u32,
    #[serde(default)]
    pub points: f64,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// The bootstrap catalog in engine terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bootstrap {
    pub players: Vec<CatalogEntry>,
    pub teams: Vec<TeamRecord>,
    pub phases: Vec<Phase>,
}

/// Three-letter abbreviation used when the provider sends no short code.
pub fn short_code(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase()
}

impl From<&TeamDto> for TeamRecord {
    fn from(dto: &TeamDto) -> Self {
        let short_name = match dto.short_name.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => short_code(&dto.name),
        };
        TeamRecord {
            id: dto.id,
            name: dto.name.clone(),
            short_name,
            wins: dto.win,
            losses: dto.loss,
        }
    }
}

impl From<&PhaseDto> for Phase {
    fn from(dto: &PhaseDto) -> Self {
        Phase {
            id: dto.id,
            name: dto.name.clone(),
            start_event: dto.start_event,
            stop_event: dto.stop_event,
        }
    }
}

impl ElementDto {
    /// "First Second", falling back to the web name.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.second_name);
        let full = full.trim();
        if full.is_empty() {
            self.web_name.clone()
        } else {
            full.to_string()
        }
    }
}

impl BootstrapDto {
    pub fn into_bootstrap(self) -> Bootstrap {
        let labels: HashMap<u32, &str> = self
            .element_types
            .iter()
            .map(|t| (t.id, t.singular_name.as_str()))
            .collect();

        let players = self
            .elements
            .iter()
            .map(|e| CatalogEntry {
                id: e.id,
                name: e.display_name(),
                team_id: e.team,
                position: labels
                    .get(&e.element_type)
                    .map_or(PositionGroup::FrontCourt, |label| PositionGroup::from_label(label)),
                now_cost: e.now_cost,
                season_points: e.total_points,
                chance_of_playing: e.chance_of_playing_next_round,
                removed: e.status == STATUS_REMOVED,
            })
            .collect();

        Bootstrap {
            players,
            teams: self.teams.iter().map(TeamRecord::from).collect(),
            phases: self.phases.iter().map(Phase::from).collect(),
        }
    }
}

impl FixtureDto {
    /// `None` for fixtures not yet assigned to an event.
    pub fn to_fixture(&self) -> Option<Fixture> {
        Some(Fixture {
            event_id: self.event?,
            kickoff: self.kickoff_time,
            home: self.team_h,
            away: self.team_a,
        })
    }
}

impl From<&HistoryDto> for GameRecord {
    fn from(dto: &HistoryDto) -> Self {
        GameRecord {
            kickoff: dto.kickoff_time,
            minutes: dto.minutes,
            total_points: dto.total_points,
        }
    }
}

impl PicksDto {
    pub fn into_sheet(self, event_id: EventId) -> TeamSheet {
        TeamSheet {
            event_id,
            picks: self
                .picks
                .iter()
                .map(|p| Pick {
                    player_id: p.element,
                    purchase_price: p.purchase_price,
                    multiplier: p.multiplier,
                    is_captain: p.is_captain,
                })
                .collect(),
            bank: self.entry_history.bank,
            points: self.entry_history.points,
        }
    }
}
