use crate::error::Result;
use crate::storage::{LocalTier, RemoteTier};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalTier for MemoryCache {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &str, document: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), document.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

type Watchers = Vec<(String, mpsc::UnboundedSender<String>)>;

/// In-process remote tier. Clones share the same documents, so several
/// replicas in one process can sync through it.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    documents: Arc<RwLock<HashMap<String, String>>>,
    watchers: Arc<Mutex<Watchers>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watcher_count(&self) -> usize {
        let mut watchers = self.watchers.lock();
        watchers.retain(|(_, tx)| !tx.is_closed());
        watchers.len()
    }
}

#[async_trait]
impl RemoteTier for MemoryRemote {
    async fn write(&self, key: &str, document: &str) -> Result<()> {
        self.documents
            .write()
            .insert(key.to_string(), document.to_string());

        let mut watchers = self.watchers.lock();
        watchers.retain(|(watched, tx)| {
            if watched != key {
                return !tx.is_closed();
            }
            tx.send(document.to_string()).is_ok()
        });

        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.documents.read().get(key).cloned())
    }

    async fn on_change(&self, key: &str) -> Result<mpsc::UnboundedReceiver<String>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.watchers.lock().push((key.to_string(), tx));
        Ok(rx)
    }
}
