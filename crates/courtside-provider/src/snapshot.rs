// Offline provider backed by a JSON snapshot of every endpoint.
//
// A snapshot holds the raw provider payloads, so a file captured from the
// live API replays through the same decoding path as the HTTP provider.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use courtside_engine::ledger::TeamSheet;
use courtside_engine::player::{EventId, PlayerId};
use courtside_engine::schedule::Fixture;
use courtside_engine::valuation::GameRecord;

use crate::error::ProviderError;
use crate::types::{Bootstrap, BootstrapDto, FixtureDto, HistoryDto, PicksDto};
use crate::DataProvider;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub bootstrap: BootstrapDto,
    #[serde(default)]
    pub fixtures: Vec<FixtureDto>,
    /// Game history per player id.
    #[serde(default)]
    pub histories: HashMap<PlayerId, Vec<HistoryDto>>,
    /// Team picks per team id, then per event id.
    #[serde(default)]
    pub picks: HashMap<u32, HashMap<EventId, PicksDto>>,
}

pub struct SnapshotProvider {
    snapshot: Snapshot,
}

impl SnapshotProvider {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_file(path: &Path) -> Result<Self, ProviderError> {
        let shown = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ProviderError::Snapshot {
            path: shown.clone(),
            source,
        })?;
        let snapshot: Snapshot =
            serde_json::from_str(&raw).map_err(|source| ProviderError::Decode {
                what: format!("snapshot {shown}"),
                source,
            })?;
        info!(
            path = %shown,
            players = snapshot.bootstrap.elements.len(),
            histories = snapshot.histories.len(),
            "loaded snapshot"
        );
        Ok(Self::new(snapshot))
    }
}

#[async_trait]
impl DataProvider for SnapshotProvider {
    async fn bootstrap(&self) -> Result<Bootstrap, ProviderError> {
        Ok(self.snapshot.bootstrap.clone().into_bootstrap())
    }

    async fn fixtures(&self) -> Result<Vec<Fixture>, ProviderError> {
        Ok(self
            .snapshot
            .fixtures
            .iter()
            .filter_map(FixtureDto::to_fixture)
            .collect())
    }

    async fn player_history(&self, player: PlayerId) -> Result<Vec<GameRecord>, ProviderError> {
        Ok(self
            .snapshot
            .histories
            .get(&player)
            .map(|games| games.iter().map(GameRecord::from).collect())
            .unwrap_or_default())
    }

    async fn team_picks(
        &self,
        team_id: u32,
        event: EventId,
    ) -> Result<Option<TeamSheet>, ProviderError> {
        Ok(self
            .snapshot
            .picks
            .get(&team_id)
            .and_then(|events| events.get(&event))
            .cloned()
            .map(|dto| dto.into_sheet(event)))
    }
}
