pub mod document;

pub use document::{check_document, DocumentCheck, RejectReason};

use crate::error::{DrawError, Result};
use crate::storage::{document_digest, LocalTier, RemoteTier, DOCUMENT_KEY};
use crate::types::LotteryAggregate;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Upper bound on own writes still waiting for their echo.
const RECENT_WRITES: usize = 16;

/// Persists the lottery aggregate to both tiers and turns remote changes
/// into a stream of validated snapshots.
pub struct StateStore {
    local: Arc<dyn LocalTier>,
    remote: Arc<dyn RemoteTier>,
    key: String,
    recent_writes: Arc<Mutex<VecDeque<String>>>,
}

impl StateStore {
    pub fn new(local: Arc<dyn LocalTier>, remote: Arc<dyn RemoteTier>) -> Self {
        Self::with_key(local, remote, DOCUMENT_KEY)
    }

    pub fn with_key(
        local: Arc<dyn LocalTier>,
        remote: Arc<dyn RemoteTier>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            local,
            remote,
            key: key.into(),
            recent_writes: Arc::new(Mutex::new(VecDeque::with_capacity(RECENT_WRITES))),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write to the local cache (best effort) and then the remote tier.
    /// Only a remote failure is returned.
    pub async fn save(&self, aggregate: &LotteryAggregate) -> Result<()> {
        let document = serde_json::to_string(aggregate)?;
        self.write_both(&document).await?;

        tracing::debug!(
            "Saved lottery state: {} prizes, {} drawn",
            aggregate.prizes.len(),
            aggregate.total_drawn
        );
        Ok(())
    }

    async fn write_both(&self, document: &str) -> Result<()> {
        if let Err(e) = self.local.write(&self.key, document) {
            tracing::warn!("Failed to write local lottery cache: {}", e);
        }

        // recorded before the write so the echo cannot outrun it
        self.remember(document);

        self.remote.write(&self.key, document).await.map_err(|e| {
            tracing::error!("Failed to write remote lottery state: {}", e);
            match e {
                DrawError::Persistence(_) => e,
                other => DrawError::persistence(other.to_string()),
            }
        })
    }

    fn remember(&self, document: &str) {
        let mut recent = self.recent_writes.lock();
        if recent.len() == RECENT_WRITES {
            recent.pop_front();
        }
        recent.push_back(document_digest(document));
    }

    /// Read the local cache. Missing, unreadable or invalid entries yield
    /// `None`; an invalid entry is deleted.
    pub fn load(&self) -> Option<LotteryAggregate> {
        let body = match self.local.read(&self.key) {
            Ok(Some(body)) => body,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read local lottery cache: {}", e);
                return None;
            }
        };

        match check_document(&body) {
            DocumentCheck::Valid(aggregate) => Some(aggregate),
            DocumentCheck::Rejected(reason) => {
                tracing::warn!("Discarding cached lottery state: {}", reason);
                if let Err(e) = self.local.remove(&self.key) {
                    tracing::warn!("Failed to delete corrupted lottery cache: {}", e);
                }
                None
            }
        }
    }

    /// Read the authoritative remote copy and refresh the cache from it.
    pub async fn fetch_remote(&self) -> Result<Option<LotteryAggregate>> {
        let body = match self.remote.read(&self.key).await? {
            Some(body) => body,
            None => return Ok(None),
        };

        match check_document(&body) {
            DocumentCheck::Valid(aggregate) => {
                if let Err(e) = self.local.write(&self.key, &body) {
                    tracing::warn!("Failed to refresh local lottery cache: {}", e);
                }
                Ok(Some(aggregate))
            }
            DocumentCheck::Rejected(reason) => {
                tracing::warn!("Ignoring invalid remote lottery state: {}", reason);
                Ok(None)
            }
        }
    }

    /// Subscribe to remote changes. Each change arrives as a full aggregate;
    /// the echo of each of the store's own writes is dropped once.
    pub async fn subscribe(&self, buffer: usize) -> Result<Subscription> {
        let mut feed = self.remote.on_change(&self.key).await?;
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let local = self.local.clone();
        let key = self.key.clone();
        let recent_writes = self.recent_writes.clone();

        let task = tokio::spawn(async move {
            while let Some(body) = feed.recv().await {
                if consume_echo(&mut recent_writes.lock(), &document_digest(&body)) {
                    tracing::debug!("Skipping echo of own lottery write");
                    continue;
                }

                match check_document(&body) {
                    DocumentCheck::Valid(aggregate) => {
                        if let Err(e) = local.write(&key, &body) {
                            tracing::warn!("Failed to refresh local lottery cache: {}", e);
                        }
                        if tx.send(aggregate).await.is_err() {
                            break;
                        }
                    }
                    DocumentCheck::Rejected(reason) => {
                        tracing::warn!("Ignoring invalid remote lottery state: {}", reason);
                    }
                }
            }
        });

        tracing::debug!("Subscribed to remote lottery state '{}'", self.key);
        Ok(Subscription {
            rx,
            task: Some(task),
        })
    }

    /// Reset the remote copy to the empty aggregate and drop the cache entry.
    /// The remote write is best effort; a cache failure is returned.
    pub async fn clear(&self) -> Result<()> {
        let document = serde_json::to_string(&LotteryAggregate::empty())?;

        self.remember(&document);
        if let Err(e) = self.remote.write(&self.key, &document).await {
            tracing::error!("Failed to clear remote lottery state: {}", e);
        }

        self.local.remove(&self.key)?;
        tracing::info!("Cleared lottery state '{}'", self.key);
        Ok(())
    }
}

/// Echoes arrive in write order. A matching digest consumes that entry and
/// every older one; any other document is a foreign change and forgets all
/// pending entries, so an identical foreign write later is still delivered.
fn consume_echo(pending: &mut VecDeque<String>, digest: &str) -> bool {
    match pending.iter().position(|d| d == digest) {
        Some(index) => {
            pending.drain(..=index);
            true
        }
        None => {
            pending.clear();
            false
        }
    }
}

/// Live feed of remote snapshots. Dropping it unsubscribes.
pub struct Subscription {
    rx: mpsc::Receiver<LotteryAggregate>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<LotteryAggregate> {
        self.rx.recv().await
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Stop the feed. Buffered snapshots are discarded, so `recv` returns
    /// `None` from here on. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Unsubscribed from remote lottery state");
        }
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
