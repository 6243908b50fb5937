// Data-provider collaborator: everything the optimizer reads from the
// fantasy game's API, behind one trait with a live and an offline backend.

pub mod cache;
pub mod client;
pub mod error;
pub mod snapshot;
pub mod types;

use async_trait::async_trait;

use courtside_engine::ledger::TeamSheet;
use courtside_engine::player::{EventId, PlayerId};
use courtside_engine::schedule::Fixture;
use courtside_engine::valuation::GameRecord;

pub use client::HttpProvider;
pub use error::ProviderError;
pub use snapshot::{Snapshot, SnapshotProvider};
pub use types::Bootstrap;

/// Read-only access to the fantasy game's data.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Player, team and phase catalogs.
    async fn bootstrap(&self) -> Result<Bootstrap, ProviderError>;

    /// Every scheduled fixture.
    async fn fixtures(&self) -> Result<Vec<Fixture>, ProviderError>;

    /// Completed games for one player.
    async fn player_history(&self, player: PlayerId) -> Result<Vec<GameRecord>, ProviderError>;

    /// A team's picks for an event; `None` when the event has no sheet yet.
    async fn team_picks(
        &self,
        team_id: u32,
        event: EventId,
    ) -> Result<Option<TeamSheet>, ProviderError>;
}
