// Candidate pool selection and manual overrides.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::player::{EventId, Player, PlayerId, PositionGroup, TeamId};
use crate::valuation::{admit, Admission, Appraisal};

/// Manual overrides supplied with a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    /// Never hold these players on any day.
    #[serde(default)]
    pub force_drop: Vec<PlayerId>,
    /// Hold these players from the first future day.
    #[serde(default)]
    pub force_buy: Vec<PlayerId>,
    /// Hold these owned players on every day, even if unavailable.
    #[serde(default)]
    pub force_keep: Vec<PlayerId>,
    /// Remove from the candidate pool entirely.
    #[serde(default)]
    pub exclude: Vec<PlayerId>,
    /// Ignore the unavailability verdict for these players.
    #[serde(default)]
    pub force_available: Vec<PlayerId>,
    /// Event whose transfers do not count against the weekly allowance.
    #[serde(default)]
    pub wildcard_event: Option<EventId>,
    #[serde(default)]
    pub unlimited_budget: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverrideError {
    #[error("player {player} is listed in both {first} and {second}")]
    Conflict {
        player: PlayerId,
        first: &'static str,
        second: &'static str,
    },

    #[error("player {0} is not in the player catalog")]
    UnknownPlayer(PlayerId),

    #[error("force-keep player {0} is not on the current roster")]
    KeepNotOwned(PlayerId),

    #[error("force-buy player {0} is already on the current roster")]
    BuyAlreadyOwned(PlayerId),
}

impl Overrides {
    /// Check the overrides against each other, the catalog and the owned roster.
    pub fn validate(
        &self,
        catalog: &HashSet<PlayerId>,
        owned: &HashSet<PlayerId>,
    ) -> Result<(), OverrideError> {
        let lists: [(&'static str, &Vec<PlayerId>); 4] = [
            ("force_drop", &self.force_drop),
            ("force_buy", &self.force_buy),
            ("force_keep", &self.force_keep),
            ("exclude", &self.exclude),
        ];
        for (i, &(first, a)) in lists.iter().enumerate() {
            for &(second, b) in lists.iter().skip(i + 1) {
                if let Some(&player) = a.iter().find(|id| b.contains(*id)) {
                    return Err(OverrideError::Conflict {
                        player,
                        first,
                        second,
                    });
                }
            }
        }

        for &id in lists.iter().flat_map(|(_, ids)| ids.iter()) {
            if !catalog.contains(&id) {
                return Err(OverrideError::UnknownPlayer(id));
            }
        }
        if let Some(&id) = self.force_keep.iter().find(|id| !owned.contains(*id)) {
            return Err(OverrideError::KeepNotOwned(id));
        }
        if let Some(&id) = self.force_buy.iter().find(|id| owned.contains(*id)) {
            return Err(OverrideError::BuyAlreadyOwned(id));
        }
        Ok(())
    }
}

/// A player as listed in the provider catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: PlayerId,
    pub name: String,
    pub team_id: TeamId,
    pub position: PositionGroup,
    /// Current market price in tenths.
    pub now_cost: u32,
    pub season_points: f64,
    pub chance_of_playing: Option<u8>,
    /// Status flag marks the player as removed from the game.
    pub removed: bool,
}

/// Ids worth valuing: the top `pool_size` active players by season points,
/// plus every owned, forced-buy and forced-keep player, minus exclusions.
/// Sorted by id.
pub fn select_candidates(
    catalog: &[CatalogEntry],
    owned: &HashSet<PlayerId>,
    overrides: &Overrides,
    pool_size: usize,
) -> Vec<PlayerId> {
    let mut active: Vec<&CatalogEntry> = catalog.iter().filter(|e| !e.removed).collect();
    active.sort_by(|a, b| {
        b.season_points
            .total_cmp(&a.season_points)
            .then(a.id.cmp(&b.id))
    });

    let mut ids: HashSet<PlayerId> = active.iter().take(pool_size).map(|e| e.id).collect();
    ids.extend(owned.iter().copied());
    ids.extend(overrides.force_buy.iter().copied());
    ids.extend(overrides.force_keep.iter().copied());
    for id in &overrides.exclude {
        ids.remove(id);
    }

    let known: HashSet<PlayerId> = catalog.iter().map(|e| e.id).collect();
    let mut out: Vec<PlayerId> = ids.into_iter().filter(|id| known.contains(id)).collect();
    out.sort_unstable();
    out
}

/// Turn appraised catalog entries into the model's player list.
///
/// Owned players are priced at their sale value (`owned_sale_values`),
/// everyone else at market price. Unavailable players stay only if owned,
/// forced-keep or forced-buy, and then at score 0 with no starting eligibility.
pub fn build_pool(
    appraised: &[(CatalogEntry, Appraisal)],
    owned_sale_values: &HashMap<PlayerId, u32>,
    overrides: &Overrides,
) -> Vec<Player> {
    let excluded: HashSet<PlayerId> = overrides.exclude.iter().copied().collect();
    let mut pool: Vec<Player> = appraised
        .iter()
        .filter(|(entry, _)| !excluded.contains(&entry.id))
        .filter_map(|(entry, appraisal)| {
            let owned = owned_sale_values.contains_key(&entry.id);
            let retain = owned
                || overrides.force_keep.contains(&entry.id)
                || overrides.force_buy.contains(&entry.id);
            let force_available = overrides.force_available.contains(&entry.id);
            let (score, available) = match admit(appraisal, retain, force_available) {
                Admission::Active { score } => (score, true),
                Admission::Retained => (0.0, false),
                Admission::Excluded => return None,
            };
            Some(Player {
                id: entry.id,
                name: entry.name.clone(),
                team_id: entry.team_id,
                position: entry.position,
                cost: owned_sale_values
                    .get(&entry.id)
                    .copied()
                    .unwrap_or(entry.now_cost),
                projected_score: score,
                available,
                owned,
            })
        })
        .collect();
    pool.sort_by_key(|p| p.id);
    pool
}
