use crate::error::{DrawError, Result};
use crate::prize::{DrawEngine, PrizeRegistry};
use crate::session::config::SessionConfig;
use crate::sync::{StateStore, Subscription};
use crate::types::{DrawHistoryEntry, LotteryAggregate, Prize};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Result of a committed mutation plus the save it triggered.
#[derive(Debug)]
pub struct Applied<T> {
    value: T,
    save: PendingSave,
}

impl<T> Applied<T> {
    fn new(value: T, save: PendingSave) -> Self {
        Self { value, save }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Take the value without waiting for persistence. The save keeps running.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Wait for the remote write and return the value only if it landed.
    pub async fn persisted(self) -> Result<T> {
        self.save.wait().await?;
        Ok(self.value)
    }
}

#[derive(Debug)]
pub struct PendingSave(Option<oneshot::Receiver<Result<()>>>);

impl PendingSave {
    fn none() -> Self {
        Self(None)
    }

    pub async fn wait(self) -> Result<()> {
        match self.0 {
            None => Ok(()),
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(DrawError::internal("Save task ended without a result"))),
        }
    }
}

type Reply<T> = oneshot::Sender<Result<Applied<T>>>;

enum Command {
    AddPrize {
        name: String,
        count: f64,
        description: Option<String>,
        reply: Reply<Prize>,
    },
    UpdatePrize {
        id: String,
        remaining: f64,
        reply: Reply<Prize>,
    },
    RemovePrize {
        id: String,
        reply: Reply<Prize>,
    },
    DecrementPrize {
        id: String,
        reply: Reply<Prize>,
    },
    Draw {
        reply: Reply<Option<Prize>>,
    },
    Reset {
        reply: Reply<()>,
    },
    RestoreDefaults {
        reply: Reply<()>,
    },
    Clear {
        reply: Reply<()>,
    },
    Shutdown,
}

/// Storage work for the saver task, performed in the order it was queued.
enum SaveJob {
    Save(LotteryAggregate, oneshot::Sender<Result<()>>),
    Clear(oneshot::Sender<Result<()>>),
}

/// Owns the live lottery aggregate. Commands and remote snapshots are handled
/// one at a time on a single task.
pub struct SessionController {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<LotteryAggregate>,
    task: JoinHandle<()>,
}

impl SessionController {
    /// Load the cached state (or the remote copy, or the defaults), subscribe
    /// to remote changes and start the command task.
    pub async fn start(store: StateStore, config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(store);

        let subscription = store.subscribe(config.subscription_buffer).await?;

        let cached = store.load();
        let remote = if config.sync_on_start {
            match store.fetch_remote().await {
                Ok(remote) => remote,
                Err(e) => {
                    tracing::warn!("Could not read remote lottery state, using local copy: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let initial = match (remote, cached) {
            (Some(remote), _) => {
                tracing::info!("Starting from remote lottery state '{}'", store.key());
                remote
            }
            (None, Some(cached)) => {
                tracing::info!("Starting from cached lottery state '{}'", store.key());
                cached
            }
            (None, None) => {
                tracing::info!("No saved lottery state, stocking default prizes");
                config.default_aggregate()?
            }
        };

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let (state_tx, state_rx) = watch::channel(initial.clone());
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        let (save_tx, save_rx) = mpsc::unbounded_channel();
        let saver = tokio::spawn(run_saver(store, save_rx));

        let actor = SessionActor {
            state: initial,
            saves: save_tx,
            saver,
            rng,
            config: config.clone(),
            published: state_tx,
        };
        let task = tokio::spawn(actor.run(command_rx, subscription));

        Ok(Self {
            commands: command_tx,
            state: state_rx,
            task,
        })
    }

    pub fn state(&self) -> LotteryAggregate {
        self.state.borrow().clone()
    }

    /// Receiver that sees every published snapshot, including the brief
    /// `is_drawing` state of a draw.
    pub fn watch(&self) -> watch::Receiver<LotteryAggregate> {
        self.state.clone()
    }

    pub fn list_prizes(&self) -> Vec<Prize> {
        self.state.borrow().prizes.clone()
    }

    pub fn available_prizes(&self) -> Vec<Prize> {
        self.state
            .borrow()
            .prizes
            .iter()
            .filter(|p| p.is_available())
            .cloned()
            .collect()
    }

    pub fn has_available(&self) -> bool {
        self.state.borrow().prizes.iter().any(Prize::is_available)
    }

    pub fn history(&self) -> Vec<DrawHistoryEntry> {
        self.state.borrow().history.clone()
    }

    pub async fn add_prize(
        &self,
        name: &str,
        count: f64,
        description: Option<&str>,
    ) -> Result<Applied<Prize>> {
        self.request(|reply| Command::AddPrize {
            name: name.to_string(),
            count,
            description: description.map(str::to_string),
            reply,
        })
        .await?
    }

    pub async fn update_prize(&self, id: &str, remaining: f64) -> Result<Applied<Prize>> {
        self.request(|reply| Command::UpdatePrize {
            id: id.to_string(),
            remaining,
            reply,
        })
        .await?
    }

    pub async fn remove_prize(&self, id: &str) -> Result<Applied<Prize>> {
        self.request(|reply| Command::RemovePrize {
            id: id.to_string(),
            reply,
        })
        .await?
    }

    pub async fn decrement_prize(&self, id: &str) -> Result<Applied<Prize>> {
        self.request(|reply| Command::DecrementPrize {
            id: id.to_string(),
            reply,
        })
        .await?
    }

    /// Draw one prize. `None` when the pool is exhausted; nothing is saved then.
    pub async fn draw(&self) -> Result<Applied<Option<Prize>>> {
        self.request(|reply| Command::Draw { reply }).await?
    }

    /// Restock every current prize and forget counters, result and history.
    pub async fn reset(&self) -> Result<Applied<()>> {
        self.request(|reply| Command::Reset { reply }).await?
    }

    /// Replace the pool with a fresh copy of the configured default prizes.
    pub async fn restore_defaults(&self) -> Result<Applied<()>> {
        self.request(|reply| Command::RestoreDefaults { reply }).await?
    }

    /// Empty the pool here and in storage.
    pub async fn clear(&self) -> Result<()> {
        let applied = self.request(|reply| Command::Clear { reply }).await??;
        applied.persisted().await
    }

    /// Stop the command task and release the remote subscription.
    pub async fn shutdown(self) -> Result<()> {
        // a closed channel means the task is already gone
        let _ = self.commands.send(Command::Shutdown).await;
        self.task
            .await
            .map_err(|e| DrawError::internal(format!("Session task failed: {}", e)))
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| DrawError::internal("Session controller has stopped"))?;
        rx.await
            .map_err(|_| DrawError::internal("Session controller dropped the request"))
    }
}

struct SessionActor {
    state: LotteryAggregate,
    saves: mpsc::UnboundedSender<SaveJob>,
    saver: JoinHandle<()>,
    rng: StdRng,
    config: SessionConfig,
    published: watch::Sender<LotteryAggregate>,
}

impl SessionActor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, mut subscription: Subscription) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command).await,
                },
                snapshot = subscription.recv(), if subscription.is_active() => match snapshot {
                    Some(snapshot) => self.apply_remote(snapshot),
                    None => {
                        tracing::warn!("Remote lottery feed closed");
                        subscription.unsubscribe();
                    }
                },
            }
        }

        subscription.unsubscribe();

        // queued saves still run; the saver stops once the queue drains
        let SessionActor { saves, saver, .. } = self;
        drop(saves);
        if let Err(e) = saver.await {
            tracing::error!("Save task failed: {}", e);
        }
        tracing::info!("Session controller stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::AddPrize {
                name,
                count,
                description,
                reply,
            } => {
                let result = self.apply(|next| {
                    PrizeRegistry::new(&mut next.prizes).add(&name, count, description.as_deref())
                });
                if let Ok(applied) = &result {
                    tracing::info!(
                        "Added prize '{}' x{}",
                        applied.value.name,
                        applied.value.total_count
                    );
                }
                let _ = reply.send(result);
            }
            Command::UpdatePrize { id, remaining, reply } => {
                let result =
                    self.apply(|next| PrizeRegistry::new(&mut next.prizes).update(&id, remaining));
                let _ = reply.send(result);
            }
            Command::RemovePrize { id, reply } => {
                let result = self.apply(|next| {
                    let removed = PrizeRegistry::new(&mut next.prizes).remove(&id)?;
                    if next.current_result.as_ref().map(|p| p.id.as_str()) == Some(id.as_str()) {
                        next.current_result = None;
                    }
                    Ok(removed)
                });
                if let Ok(applied) = &result {
                    tracing::info!("Removed prize '{}'", applied.value.name);
                }
                let _ = reply.send(result);
            }
            Command::DecrementPrize { id, reply } => {
                let result = self.apply(|next| DrawEngine::new(&mut next.prizes).decrement(&id));
                let _ = reply.send(result);
            }
            Command::Draw { reply } => {
                let _ = reply.send(Ok(self.draw()));
            }
            Command::Reset { reply } => {
                let result = self.apply(|next| {
                    DrawEngine::new(&mut next.prizes).reset_all();
                    next.current_result = None;
                    next.is_drawing = false;
                    next.total_drawn = 0;
                    next.history.clear();
                    Ok(())
                });
                tracing::info!("Lottery reset");
                let _ = reply.send(result);
            }
            Command::RestoreDefaults { reply } => {
                let result = self.config.default_aggregate().map(|defaults| {
                    let save = self.commit(defaults);
                    tracing::info!("Restored default prizes");
                    Applied::new((), save)
                });
                let _ = reply.send(result);
            }
            Command::Clear { reply } => {
                self.state = LotteryAggregate::empty();
                self.published.send_replace(self.state.clone());
                let save = self.enqueue(SaveJob::Clear);
                let _ = reply.send(Ok(Applied::new((), save)));
            }
            Command::Shutdown => {}
        }
    }

    /// Run a mutation on a working copy; commit it only if it succeeds.
    fn apply<T>(
        &mut self,
        mutate: impl FnOnce(&mut LotteryAggregate) -> Result<T>,
    ) -> Result<Applied<T>> {
        let mut next = self.state.clone();
        let value = match mutate(&mut next) {
            Ok(value) => value,
            Err(e) => {
                if e.is_rejection() {
                    tracing::debug!("Command rejected: {}", e);
                } else {
                    tracing::warn!("Command failed: {}", e);
                }
                return Err(e);
            }
        };
        let save = self.commit(next);
        Ok(Applied::new(value, save))
    }

    fn draw(&mut self) -> Applied<Option<Prize>> {
        if !self.state.prizes.iter().any(Prize::is_available) {
            tracing::info!("Draw requested but no prizes remain");
            return Applied::new(None, PendingSave::none());
        }

        self.state.is_drawing = true;
        self.published.send_replace(self.state.clone());

        let mut next = self.state.clone();
        let selected = DrawEngine::new(&mut next.prizes).draw_with(&mut self.rng);

        let Some(prize) = selected else {
            self.state.is_drawing = false;
            self.published.send_replace(self.state.clone());
            return Applied::new(None, PendingSave::none());
        };

        let entry = DrawHistoryEntry::record(&prize.name, &next.prizes);
        next.history.push(entry);
        next.current_result = Some(prize.clone());
        next.total_drawn += 1;
        next.is_drawing = false;

        tracing::info!(
            "Drew '{}' ({} left, {} drawn in total)",
            prize.name,
            prize.remaining_count,
            next.total_drawn
        );

        let save = self.commit(next);
        Applied::new(Some(prize), save)
    }

    fn apply_remote(&mut self, snapshot: LotteryAggregate) {
        if snapshot == self.state {
            tracing::debug!("Remote lottery state matches the held state");
            return;
        }
        tracing::debug!(
            "Applying remote lottery state: {} prizes, {} drawn",
            snapshot.prizes.len(),
            snapshot.total_drawn
        );
        self.state = snapshot;
        self.published.send_replace(self.state.clone());
    }

    /// Replace the held aggregate, publish it and start saving it.
    fn commit(&mut self, next: LotteryAggregate) -> PendingSave {
        self.state = next;
        self.published.send_replace(self.state.clone());

        let snapshot = self.state.clone();
        self.enqueue(|tx| SaveJob::Save(snapshot, tx))
    }

    fn enqueue(&self, job: impl FnOnce(oneshot::Sender<Result<()>>) -> SaveJob) -> PendingSave {
        let (tx, rx) = oneshot::channel();
        if self.saves.send(job(tx)).is_err() {
            tracing::error!("Save task is gone; lottery state was not saved");
        }
        PendingSave(Some(rx))
    }
}

async fn run_saver(store: Arc<StateStore>, mut jobs: mpsc::UnboundedReceiver<SaveJob>) {
    while let Some(job) = jobs.recv().await {
        match job {
            SaveJob::Save(snapshot, done) => {
                let result = store.save(&snapshot).await;
                if let Err(e) = &result {
                    tracing::error!("Failed to save lottery state: {}", e);
                }
                let _ = done.send(result);
            }
            SaveJob::Clear(done) => {
                let _ = done.send(store.clear().await);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::storage::{LocalTier, MemoryCache, MemoryRemote, RemoteTier, DOCUMENT_KEY};
    use async_trait::async_trait;
    use std::time::Duration;

    struct OfflineRemote;

    #[async_trait]
    impl RemoteTier for OfflineRemote {
        async fn write(&self, _key: &str, _document: &str) -> Result<()> {
            Err(DrawError::persistence("network unreachable"))
        }
        async fn read(&self, _key: &str) -> Result<Option<String>> {
            Err(DrawError::persistence("network unreachable"))
        }
        async fn on_change(&self, _key: &str) -> Result<mpsc::UnboundedReceiver<String>> {
            let (_tx, rx) = mpsc::unbounded_channel();
            Ok(rx)
        }
    }

    fn empty_config() -> SessionConfig {
        SessionConfig {
            default_prizes: Vec::new(),
            rng_seed: Some(2024),
            ..SessionConfig::default()
        }
    }

    fn memory_store(remote: &MemoryRemote) -> (StateStore, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        let store = StateStore::new(cache.clone(), Arc::new(remote.clone()));
        (store, cache)
    }

    async fn start_empty(remote: &MemoryRemote) -> SessionController {
        let (store, _cache) = memory_store(remote);
        SessionController::start(store, &empty_config()).await.unwrap()
    }

    async fn wait_for<F>(rx: &mut watch::Receiver<LotteryAggregate>, mut done: F)
    where
        F: FnMut(&LotteryAggregate) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !done(&rx.borrow_and_update()) {
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("replica never converged");
    }

    #[tokio::test]
    async fn test_festival_scenario() {
        let remote = MemoryRemote::new();
        let controller = start_empty(&remote).await;

        let first = controller.add_prize("一等奖", 1.0, None).await.unwrap().into_value();
        controller.add_prize("二等奖", 3.0, None).await.unwrap();

        let mut first_exhausted = false;
        for _ in 0..4 {
            let won = controller.draw().await.unwrap().into_value().unwrap();
            if first_exhausted {
                assert_ne!(won.id, first.id);
            }
            if won.id == first.id {
                first_exhausted = true;
            }
        }

        assert!(first_exhausted);
        assert!(!controller.has_available());
        assert!(controller.draw().await.unwrap().into_value().is_none());

        let state = controller.state();
        assert_eq!(state.total_drawn, 4);
        assert_eq!(state.history.len(), 4);
        assert!(!state.is_drawing);
        assert!(state.prizes.iter().all(|p| p.remaining_count == 0));
        let last = state.history.last().unwrap();
        assert_eq!(last.remaining_inventory.get("一等奖"), Some(&0));
        assert_eq!(last.remaining_inventory.get("二等奖"), Some(&0));

        controller.reset().await.unwrap().persisted().await.unwrap();
        let state = controller.state();
        assert_eq!(state.total_drawn, 0);
        assert!(state.history.is_empty());
        assert!(state.current_result.is_none());
        assert_eq!(state.prizes[0].remaining_count, 1);
        assert_eq!(state.prizes[1].remaining_count, 3);

        controller.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_draw_records_result_and_history() {
        let remote = MemoryRemote::new();
        let controller = start_empty(&remote).await;
        controller.add_prize("三等奖", 2.0, Some("红包")).await.unwrap();

        let won = controller.draw().await.unwrap().persisted().await.unwrap().unwrap();
        assert_eq!(won.remaining_count, 1);

        let state = controller.state();
        assert_eq!(state.current_result, Some(won));
        assert_eq!(state.total_drawn, 1);
        assert_eq!(state.history[0].prize_name, "三等奖");
        assert_eq!(state.history[0].remaining_inventory.get("三等奖"), Some(&1));

        // the saved document matches the live state
        let body = remote.read(DOCUMENT_KEY).await.unwrap().unwrap();
        let saved: LotteryAggregate = serde_json::from_str(&body).unwrap();
        assert_eq!(saved, state);
    }

    #[tokio::test]
    async fn test_empty_draw_raises_no_flag() {
        let remote = MemoryRemote::new();
        let controller = start_empty(&remote).await;
        let mut watcher = controller.watch();
        watcher.borrow_and_update();

        let applied = controller.draw().await.unwrap();
        assert!(applied.value().is_none());
        applied.persisted().await.unwrap();

        assert!(!watcher.has_changed().unwrap());
        assert!(!controller.state().is_drawing);
        assert_eq!(remote.read(DOCUMENT_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejected_commands_leave_state_unchanged() {
        let remote = MemoryRemote::new();
        let controller = start_empty(&remote).await;
        let prize = controller.add_prize("一等奖", 1.0, None).await.unwrap().into_value();
        let before = controller.state();

        let cases = [
            (controller.add_prize("", 5.0, None).await, ValidationError::EmptyName),
            (controller.add_prize("x", 0.0, None).await, ValidationError::CountNotPositive),
            (controller.add_prize("x", 1.5, None).await, ValidationError::CountNotInteger),
            (controller.add_prize("x", 10001.0, None).await, ValidationError::CountTooLarge),
            (controller.update_prize(&prize.id, -2.0).await, ValidationError::CountNegative),
        ];
        for (result, expected) in cases {
            match result {
                Err(DrawError::Validation(reason)) => assert_eq!(reason, expected),
                other => panic!("expected {expected:?}, got {other:?}"),
            }
        }

        assert!(matches!(
            controller.remove_prize("prize-missing").await,
            Err(DrawError::NotFound { .. })
        ));

        controller.decrement_prize(&prize.id).await.unwrap();
        let drained = controller.state();
        assert!(matches!(
            controller.decrement_prize(&prize.id).await,
            Err(DrawError::Depleted { .. })
        ));

        assert_eq!(before.prizes[0].remaining_count, 1);
        assert_eq!(controller.state(), drained);
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let remote = MemoryRemote::new();
        let controller = start_empty(&remote).await;
        let prize = controller.add_prize("一等奖", 2.0, None).await.unwrap().into_value();

        let updated = controller.update_prize(&prize.id, 7.0).await.unwrap().into_value();
        assert_eq!(updated.remaining_count, 7);
        assert_eq!(updated.total_count, 2);

        controller.draw().await.unwrap();
        assert_eq!(controller.state().current_result.unwrap().id, prize.id);

        controller.remove_prize(&prize.id).await.unwrap();
        let state = controller.state();
        assert!(state.prizes.is_empty());
        assert!(state.current_result.is_none());
        assert_eq!(state.total_drawn, 1);
    }

    #[tokio::test]
    async fn test_start_prefers_saved_state() {
        let remote = MemoryRemote::new();
        let (store, cache) = memory_store(&remote);
        let mut saved = LotteryAggregate::with_prizes(vec![Prize::new(
            "prize-saved".into(),
            "特等奖".into(),
            1,
            None,
        )]);
        saved.total_drawn = 3;
        cache
            .write(DOCUMENT_KEY, &serde_json::to_string(&saved).unwrap())
            .unwrap();

        let controller = SessionController::start(store, &SessionConfig::default())
            .await
            .unwrap();
        assert_eq!(controller.state(), saved);
    }

    #[tokio::test]
    async fn test_start_with_corrupt_cache_uses_defaults() {
        let remote = MemoryRemote::new();
        let (store, cache) = memory_store(&remote);
        cache.write(DOCUMENT_KEY, "{\"prizes\": \"oops\"}").unwrap();

        let controller = SessionController::start(store, &SessionConfig::default())
            .await
            .unwrap();

        assert_eq!(controller.list_prizes().len(), 13);
        assert_eq!(cache.read(DOCUMENT_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_remote_copy_wins_on_start() {
        let remote = MemoryRemote::new();
        let (store, cache) = memory_store(&remote);
        cache
            .write(
                DOCUMENT_KEY,
                &serde_json::to_string(&LotteryAggregate::empty()).unwrap(),
            )
            .unwrap();

        let shared = LotteryAggregate::with_prizes(vec![Prize::new(
            "prize-remote".into(),
            "二等奖".into(),
            3,
            None,
        )]);
        remote
            .write(DOCUMENT_KEY, &serde_json::to_string(&shared).unwrap())
            .await
            .unwrap();

        let controller = SessionController::start(store, &empty_config()).await.unwrap();
        assert_eq!(controller.state(), shared);
    }

    #[tokio::test]
    async fn test_remote_failure_is_reported_after_commit() {
        let cache = Arc::new(MemoryCache::new());
        let store = StateStore::new(cache.clone(), Arc::new(OfflineRemote));
        let controller = SessionController::start(store, &empty_config()).await.unwrap();

        let applied = controller.add_prize("一等奖", 1.0, None).await.unwrap();
        // committed in memory before the save resolves
        assert_eq!(controller.list_prizes().len(), 1);

        let err = applied.persisted().await.unwrap_err();
        assert!(matches!(err, DrawError::Persistence(_)));
        assert_eq!(controller.list_prizes().len(), 1);
        assert!(cache.read(DOCUMENT_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_back_to_back_saves_land_in_order() {
        let remote = MemoryRemote::new();
        let controller = start_empty(&remote).await;

        let mut pending = Vec::new();
        for i in 0..10 {
            let name = format!("奖品{}", i);
            pending.push(controller.add_prize(&name, 1.0, None).await.unwrap());
        }
        for applied in pending {
            applied.persisted().await.unwrap();
        }

        let body = remote.read(DOCUMENT_KEY).await.unwrap().unwrap();
        let stored: LotteryAggregate = serde_json::from_str(&body).unwrap();
        assert_eq!(stored.prizes.len(), 10);
        assert_eq!(stored, controller.state());
        controller.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_replicas_converge_through_remote() {
        let remote = MemoryRemote::new();
        let a = start_empty(&remote).await;
        let b = start_empty(&remote).await;

        a.add_prize("一等奖", 1.0, None).await.unwrap().persisted().await.unwrap();
        let mut b_state = b.watch();
        wait_for(&mut b_state, |s| s.prizes.len() == 1).await;

        b.draw().await.unwrap().persisted().await.unwrap();
        let mut a_state = a.watch();
        wait_for(&mut a_state, |s| s.total_drawn == 1).await;

        assert_eq!(a.state(), b.state());
        assert!(!a.has_available());

        a.shutdown().await.unwrap();
        b.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_replica_follows_reset_matching_its_own_earlier_write() {
        let remote = MemoryRemote::new();
        let a = start_empty(&remote).await;
        let b = start_empty(&remote).await;

        a.add_prize("一等奖", 2.0, None).await.unwrap().persisted().await.unwrap();
        let mut b_state = b.watch();
        wait_for(&mut b_state, |s| s.prizes.len() == 1).await;

        b.draw().await.unwrap().persisted().await.unwrap();
        let mut a_state = a.watch();
        wait_for(&mut a_state, |s| s.total_drawn == 1).await;

        // restocks to the same bytes A wrote when adding the prize
        b.reset().await.unwrap().persisted().await.unwrap();
        wait_for(&mut a_state, |s| s.total_drawn == 0).await;

        let body = remote.read(DOCUMENT_KEY).await.unwrap().unwrap();
        let stored: LotteryAggregate = serde_json::from_str(&body).unwrap();
        assert_eq!(a.state(), stored);
        assert_eq!(b.state(), stored);
        assert_eq!(a.state().prizes[0].remaining_count, 2);
        assert!(a.history().is_empty());

        a.shutdown().await.unwrap();
        b.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_restore_defaults_and_clear() {
        let remote = MemoryRemote::new();
        let (store, cache) = memory_store(&remote);
        let controller = SessionController::start(store, &SessionConfig::default())
            .await
            .unwrap();

        let original_ids: Vec<String> = controller.list_prizes().into_iter().map(|p| p.id).collect();
        controller.draw().await.unwrap();

        controller.restore_defaults().await.unwrap().persisted().await.unwrap();
        let state = controller.state();
        assert_eq!(state.prizes.len(), 13);
        assert_eq!(state.total_drawn, 0);
        assert!(state.prizes.iter().all(|p| !original_ids.contains(&p.id)));

        controller.clear().await.unwrap();
        assert_eq!(controller.state(), LotteryAggregate::empty());
        assert_eq!(cache.read(DOCUMENT_KEY).unwrap(), None);
        let body = remote.read(DOCUMENT_KEY).await.unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<LotteryAggregate>(&body).unwrap(),
            LotteryAggregate::empty()
        );
    }

    #[tokio::test]
    async fn test_seeded_sessions_draw_identically() {
        let mut sequences = Vec::new();
        for _ in 0..2 {
            let remote = MemoryRemote::new();
            let (store, _cache) = memory_store(&remote);
            let config = SessionConfig {
                rng_seed: Some(88),
                ..SessionConfig::default()
            };
            let controller = SessionController::start(store, &config).await.unwrap();

            let mut names = Vec::new();
            for _ in 0..20 {
                names.push(controller.draw().await.unwrap().into_value().unwrap().name);
            }
            sequences.push(names);
        }

        assert_eq!(sequences[0], sequences[1]);
    }

    #[tokio::test]
    async fn test_shutdown_releases_subscription() {
        let remote = MemoryRemote::new();
        let controller = start_empty(&remote).await;
        assert_eq!(remote.watcher_count(), 1);

        controller.shutdown().await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while remote.watcher_count() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}
