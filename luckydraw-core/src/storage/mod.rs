pub mod cache_store;
pub mod file_remote;
pub mod memory;

pub use cache_store::SqliteCache;
pub use file_remote::FileRemote;
pub use memory::{MemoryCache, MemoryRemote};

use crate::error::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;

/// Logical name of the one lottery document per deployment.
pub const DOCUMENT_KEY: &str = "lottery_state";

/// Fast local copy of the document. Only an accelerator: callers swallow its
/// failures.
pub trait LocalTier: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, document: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Authoritative shared copy of the document, with change notifications.
#[async_trait]
pub trait RemoteTier: Send + Sync {
    async fn write(&self, key: &str, document: &str) -> Result<()>;
    async fn read(&self, key: &str) -> Result<Option<String>>;

    /// Stream of full documents, one per change to `key`. The feed stops and
    /// releases its resources once the receiver is dropped.
    async fn on_change(&self, key: &str) -> Result<mpsc::UnboundedReceiver<String>>;
}

/// Hex SHA-256 of a document body, used to tell documents apart cheaply.
pub fn document_digest(document: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document.as_bytes());
    hex::encode(hasher.finalize())
}
