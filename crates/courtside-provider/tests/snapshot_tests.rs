// Integration tests for the offline snapshot provider.

use std::path::PathBuf;

use courtside_engine::player::PositionGroup;
use courtside_provider::{DataProvider, SnapshotProvider};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[tokio::test]
async fn snapshot_replays_every_endpoint() {
    let provider = SnapshotProvider::from_file(&fixture("mini_snapshot.json")).unwrap();

    let bootstrap = provider.bootstrap().await.unwrap();
    assert_eq!(bootstrap.players.len(), 3);
    assert_eq!(bootstrap.players[0].name, "Jalen Brunswick");
    assert_eq!(bootstrap.players[0].position, PositionGroup::BackCourt);
    assert_eq!(bootstrap.players[1].chance_of_playing, Some(25));
    assert!(bootstrap.players[2].removed);
    assert_eq!(bootstrap.teams[1].short_name, "BRO");
    assert_eq!(bootstrap.phases.len(), 2);

    let fixtures = provider.fixtures().await.unwrap();
    assert_eq!(fixtures.len(), 1);
    assert_eq!(fixtures[0].event_id, 43);

    let history = provider.player_history(1).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].minutes, 36);
    assert!(provider.player_history(2).await.unwrap().is_empty());

    let sheet = provider.team_picks(17, 42).await.unwrap().unwrap();
    assert_eq!(sheet.event_id, 42);
    assert_eq!(sheet.bank, 7);
    assert_eq!(sheet.player_ids(), vec![1, 2]);
    assert!(sheet.captain_played());
    assert!(provider.team_picks(17, 43).await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_snapshot_is_a_decode_error() {
    let dir = std::env::temp_dir().join(format!("courtside_snapshot_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("broken.json");
    std::fs::write(&path, "{\"bootstrap\": 12}").unwrap();

    let err = SnapshotProvider::from_file(&path).err().unwrap();
    assert!(err.to_string().contains("broken.json"));

    let _ = std::fs::remove_dir_all(&dir);
}
