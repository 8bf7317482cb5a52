//! luckydraw - Core library for live-event prize draws
//!
//! This library provides a weighted draw over a finite prize pool, keeps the
//! remaining inventory, and persists and syncs the lottery state between
//! replicas through a local cache and a shared remote document.

pub mod error;
pub mod prize;
pub mod session;
pub mod storage;
pub mod sync;
pub mod types;

pub use error::{DrawError, Result, ValidationError};
pub use prize::{DrawEngine, PrizeRegistry};
pub use session::{open_file_store, Applied, PrizeSeed, SessionConfig, SessionController};
pub use storage::{FileRemote, LocalTier, MemoryCache, MemoryRemote, RemoteTier, SqliteCache};
pub use sync::{StateStore, Subscription};
pub use types::{DrawHistoryEntry, LotteryAggregate, Prize};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_session_creation() {
        let store = StateStore::new(Arc::new(MemoryCache::new()), Arc::new(MemoryRemote::new()));
        let controller = SessionController::start(store, &SessionConfig::default())
            .await
            .unwrap();

        assert!(controller.has_available());
        assert_eq!(controller.state().total_drawn, 0);
        controller.shutdown().await.unwrap();
    }
}
