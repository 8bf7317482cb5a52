pub mod config;
pub mod controller;

pub use config::{PrizeSeed, SessionConfig, DEFAULT_PRIZES};
pub use controller::{Applied, PendingSave, SessionController};

use crate::error::Result;
use crate::storage::{FileRemote, SqliteCache};
use crate::sync::StateStore;
use std::path::Path;
use std::sync::Arc;

/// Store backed by a SQLite cache under `data_dir` and a shared JSON document
/// under `remote_dir`.
pub async fn open_file_store(
    data_dir: &Path,
    remote_dir: &Path,
    config: &SessionConfig,
) -> Result<StateStore> {
    let cache = SqliteCache::open(&data_dir.join("luckydraw.db"))?;
    let remote = FileRemote::new(remote_dir, config.poll_interval()).await?;

    Ok(StateStore::with_key(
        Arc::new(cache),
        Arc::new(remote),
        config.document_key.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_backed_session_survives_restart() {
        let temp_dir = tempdir().unwrap();
        let data_dir = temp_dir.path().join("data");
        let remote_dir = temp_dir.path().join("shared");
        let config = SessionConfig {
            default_prizes: vec![PrizeSeed::new("一等奖", 1), PrizeSeed::new("二等奖", 3)],
            rng_seed: Some(5),
            poll_interval_ms: 20,
            ..SessionConfig::default()
        };

        let store = open_file_store(&data_dir, &remote_dir, &config).await.unwrap();
        let controller = SessionController::start(store, &config).await.unwrap();
        let won = controller.draw().await.unwrap().persisted().await.unwrap().unwrap();
        let before = controller.state();
        controller.shutdown().await.unwrap();

        let store = open_file_store(&data_dir, &remote_dir, &config).await.unwrap();
        let restarted = SessionController::start(store, &config).await.unwrap();
        let after = restarted.state();

        assert_eq!(after, before);
        assert_eq!(after.current_result, Some(won));
        assert_eq!(after.total_drawn, 1);
        assert!(remote_dir.join("lottery_state.json").exists());
        restarted.shutdown().await.unwrap();
    }
}
