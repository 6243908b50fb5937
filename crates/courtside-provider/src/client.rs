// HTTP implementation of the data provider.
//
// Catalog, fixtures and histories go through the TTL cache; team picks are
// always fetched fresh since they change as the user edits their team.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use courtside_core::config::ProviderConfig;
use courtside_engine::ledger::TeamSheet;
use courtside_engine::player::{EventId, PlayerId};
use courtside_engine::schedule::Fixture;
use courtside_engine::valuation::GameRecord;

use crate::cache::{CacheKey, TtlCache};
use crate::error::ProviderError;
use crate::types::{Bootstrap, BootstrapDto, ElementSummaryDto, FixtureDto, PicksDto};
use crate::DataProvider;

// ---------------------------------------------------------------------------
// HttpProvider
// ---------------------------------------------------------------------------

pub struct HttpProvider {
    http: reqwest::Client,
    base_url: String,
    bootstrap_ttl: Duration,
    fixtures_ttl: Duration,
    history_ttl: Duration,
    cache: TtlCache,
}

impl HttpProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ProviderError::Client)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bootstrap_ttl: Duration::from_secs(config.bootstrap_ttl_secs),
            fixtures_ttl: Duration::from_secs(config.fixtures_ttl_secs),
            history_ttl: Duration::from_secs(config.history_ttl_secs),
            cache: TtlCache::new(),
        })
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json(&self, url: String) -> Result<Value, ProviderError> {
        debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                url,
                status: status.as_u16(),
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|source| ProviderError::Transport { url, source })
    }

    async fn cached(
        &self,
        key: CacheKey,
        ttl: Duration,
        path: String,
    ) -> Result<Value, ProviderError> {
        let url = self.url(&path);
        self.cache
            .get_or_fetch(key, ttl, || self.get_json(url))
            .await
    }
}

fn decode<T: DeserializeOwned>(what: &str, body: Value) -> Result<T, ProviderError> {
    serde_json::from_value(body).map_err(|source| ProviderError::Decode {
        what: what.to_string(),
        source,
    })
}

#[async_trait]
impl DataProvider for HttpProvider {
    async fn bootstrap(&self) -> Result<Bootstrap, ProviderError> {
        let body = self
            .cached(
                CacheKey::new("bootstrap-static", ""),
                self.bootstrap_ttl,
                "bootstrap-static/".to_string(),
            )
            .await?;
        let dto: BootstrapDto = decode("bootstrap", body)?;
        info!(players = dto.elements.len(), teams = dto.teams.len(), "fetched catalog");
        Ok(dto.into_bootstrap())
    }

    async fn fixtures(&self) -> Result<Vec<Fixture>, ProviderError> {
        let body = self
            .cached(
                CacheKey::new("fixtures", ""),
                self.fixtures_ttl,
                "fixtures/".to_string(),
            )
            .await?;
        let dtos: Vec<FixtureDto> = decode("fixtures", body)?;
        Ok(dtos.iter().filter_map(FixtureDto::to_fixture).collect())
    }

    async fn player_history(&self, player: PlayerId) -> Result<Vec<GameRecord>, ProviderError> {
        let body = self
            .cached(
                CacheKey::new("element-summary", player.to_string()),
                self.history_ttl,
                format!("element-summary/{player}/"),
            )
            .await?;
        let dto: ElementSummaryDto = decode("player history", body)?;
        Ok(dto.history.iter().map(GameRecord::from).collect())
    }

    async fn team_picks(
        &self,
        team_id: u32,
        event: EventId,
    ) -> Result<Option<TeamSheet>, ProviderError> {
        let url = self.url(&format!("entry/{team_id}/event/{event}/picks/"));
        match self.get_json(url).await {
            Ok(body) => {
                let dto: PicksDto = decode("team picks", body)?;
                Ok(Some(dto.into_sheet(event)))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
