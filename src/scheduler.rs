//! Periodic multi-page audits with a bounded run history.

use crate::crawler::{Crawler, DEFAULT_MAX_PAGES};
use crate::error::{ConfigError, StoreError, validate_target};
use crate::http_client::{DEFAULT_FETCH_TIMEOUT, Fetcher};
use crate::models::{RunEntry, SchedulerEvent};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use url::Url;

pub const HISTORY_CAPACITY: usize = 50;
pub const HISTORY_KEY: &str = "seowatch.history";

/// Newest-first ring buffer of completed runs
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<RunEntry>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts at the front, evicting the oldest entry once full
    pub fn push(&mut self, entry: RunEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> Vec<RunEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&RunEntry> {
        self.entries.front()
    }

    pub fn max_id(&self) -> u64 {
        self.entries.iter().map(|e| e.id).max().unwrap_or(0)
    }

    fn restore(entries: Vec<RunEntry>, capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        history.entries = entries.into_iter().take(capacity).collect();
        history
    }
}

/// Scoped key-value persistence for history snapshots
pub trait SessionStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Process-local store, optionally bounded to mimic a storage quota
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.quota_bytes.is_some_and(|quota| value.len() > quota) {
            return Err(StoreError::QuotaExceeded(key.to_string()));
        }
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per key inside a directory, unless a key is pinned to its own path
pub struct FileStore {
    dir: PathBuf,
    pinned: HashMap<String, PathBuf>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pinned: HashMap::new(),
        }
    }

    /// Stores every value of `key` at exactly `path`
    pub fn pin(mut self, key: &str, path: impl Into<PathBuf>) -> Self {
        self.pinned.insert(key.to_string(), path.into());
        self
    }

    /// `<data dir>/seowatch`, falling back to the working directory
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join("seowatch"))
            .unwrap_or_else(|| PathBuf::from(".seowatch"))
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        if let Some(path) = self.pinned.get(key) {
            return path.clone();
        }
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl SessionStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, value)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub fetch_timeout: Duration,
    pub max_pages: usize,
    pub history_capacity: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_pages: DEFAULT_MAX_PAGES,
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

struct Shared {
    history: History,
    next_id: u64,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ActiveSchedule {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs a site audit immediately and then on every interval tick
pub struct Scheduler {
    crawler: Arc<Crawler>,
    store: Arc<dyn SessionStore>,
    shared: Arc<Mutex<Shared>>,
    events: mpsc::UnboundedSender<SchedulerEvent>,
    active: Option<ActiveSchedule>,
}

impl Scheduler {
    /// Restores History from `store` when a previous session saved one
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn SessionStore>,
        options: SchedulerOptions,
    ) -> (Self, mpsc::UnboundedReceiver<SchedulerEvent>) {
        let history = Self::restore_history(store.as_ref(), options.history_capacity);
        let next_id = history.max_id() + 1;
        let (events, receiver) = mpsc::unbounded_channel();

        let scheduler = Self {
            crawler: Arc::new(Crawler::new(
                fetcher,
                options.max_pages,
                options.fetch_timeout,
            )),
            store,
            shared: Arc::new(Mutex::new(Shared { history, next_id })),
            events,
            active: None,
        };
        (scheduler, receiver)
    }

    fn restore_history(store: &dyn SessionStore, capacity: usize) -> History {
        let loaded = match store.load(HISTORY_KEY) {
            Ok(Some(json)) => {
                serde_json::from_str::<Vec<RunEntry>>(&json).map_err(StoreError::from)
            }
            Ok(None) => return History::new(capacity),
            Err(e) => Err(e),
        };
        match loaded {
            Ok(entries) => {
                tracing::info!(entries = entries.len(), "Restored run history");
                History::restore(entries, capacity)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable run history");
                History::new(capacity)
            }
        }
    }

    /// Newest run first
    pub fn history(&self) -> Vec<RunEntry> {
        lock(&self.shared).history.entries()
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// (Re)starts the schedule: one run now, then one per `interval`.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, url: &str, interval: Duration) -> Result<(), ConfigError> {
        let root = validate_target(url, interval)?;
        self.stop();

        let token = CancellationToken::new();
        let task = ScheduleTask {
            root,
            interval,
            crawler: Arc::clone(&self.crawler),
            store: Arc::clone(&self.store),
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
            token: token.clone(),
        };

        tracing::info!(
            url = %task.root,
            interval_secs = interval.as_secs_f64(),
            "Starting crawl scheduler"
        );
        let handle = tokio::spawn(task.run());
        self.active = Some(ActiveSchedule { token, handle });
        Ok(())
    }

    /// Cancels the timer and discards any run still in flight
    pub fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let _guard = lock(&self.shared);
        active.token.cancel();
        active.handle.abort();
        let _ = self.events.send(SchedulerEvent::Stopped);
        tracing::debug!("Crawl scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.token.cancel();
            active.handle.abort();
        }
    }
}

struct ScheduleTask {
    root: Url,
    interval: Duration,
    crawler: Arc<Crawler>,
    store: Arc<dyn SessionStore>,
    shared: Arc<Mutex<Shared>>,
    events: mpsc::UnboundedSender<SchedulerEvent>,
    token: CancellationToken,
}

impl ScheduleTask {
    async fn run(self) {
        self.run_once().await;

        // A run that overruns the interval swallows the missed ticks
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut idle_since = Instant::now();
        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                deadline = ticker.tick() => {
                    if deadline < idle_since {
                        tracing::debug!(
                            missed_by_secs = (idle_since - deadline).as_secs_f64(),
                            "Skipping overdue tick"
                        );
                        continue;
                    }
                    self.run_once().await;
                    idle_since = Instant::now();
                }
            }
        }
    }

    async fn run_once(&self) {
        self.send_unless_cancelled(SchedulerEvent::RunStarted {
            url: self.root.to_string(),
        });

        let outcome = tokio::select! {
            _ = self.token.cancelled() => return,
            outcome = self.crawler.crawl(&self.root) => outcome,
        };

        let (entry, snapshot) = {
            let mut shared = lock(&self.shared);
            if self.token.is_cancelled() {
                tracing::debug!(url = %self.root, "Discarding run that finished after stop");
                return;
            }

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(url = %self.root, error = %e, "Scheduled run failed");
                    let _ = self.events.send(SchedulerEvent::Error {
                        url: self.root.to_string(),
                        message: e.to_string(),
                    });
                    return;
                }
            };

            let entry = RunEntry {
                id: shared.next_id,
                timestamp: chrono::Utc::now(),
                url: self.root.to_string(),
                pages: outcome.pages,
                metrics: outcome.metrics,
            };
            shared.next_id += 1;
            shared.history.push(entry.clone());
            (entry, shared.history.entries())
        };

        // Saved before `Completed` goes out, so listeners can rely on the store
        self.persist(snapshot).await;

        tracing::info!(
            run = entry.id,
            pages = entry.pages.len(),
            avg_score = entry.metrics.avg_score,
            total_issues = entry.metrics.total_issues,
            elapsed = entry.metrics.elapsed,
            "Scheduled run completed"
        );

        let now = chrono::Utc::now();
        let next_run_at = chrono::Duration::from_std(self.interval)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(now);

        let _guard = lock(&self.shared);
        if self.token.is_cancelled() {
            return;
        }
        let _ = self.events.send(SchedulerEvent::Completed(Box::new(entry)));
        let _ = self.events.send(SchedulerEvent::Scheduled { next_run_at });
    }

    /// Best effort; a failed save never affects the run
    async fn persist(&self, entries: Vec<RunEntry>) {
        let store = Arc::clone(&self.store);
        let saved = tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let json = serde_json::to_string(&entries)?;
            store.save(HISTORY_KEY, &json)
        })
        .await;

        match saved {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Could not persist run history"),
            Err(e) => tracing::warn!(error = %e, "History persistence task failed"),
        }
    }

    fn send_unless_cancelled(&self, event: SchedulerEvent) {
        let _guard = lock(&self.shared);
        if !self.token.is_cancelled() {
            let _ = self.events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunMetrics;

    fn entry(id: u64) -> RunEntry {
        RunEntry {
            id,
            timestamp: chrono::Utc::now(),
            url: "https://example.com/".to_string(),
            pages: vec![],
            metrics: RunMetrics::default(),
        }
    }

    #[test]
    fn test_history_is_newest_first_and_bounded() {
        let mut history = History::new(HISTORY_CAPACITY);
        for id in 1..=51 {
            history.push(entry(id));
        }
        assert_eq!(history.len(), 50);
        let entries = history.entries();
        assert_eq!(entries[0].id, 51);
        assert_eq!(entries[49].id, 2);
        assert!(entries.iter().all(|e| e.id != 1));
    }

    #[test]
    fn test_memory_store_quota() {
        let store = MemoryStore::with_quota(4);
        assert!(store.save("k", "1234").is_ok());
        assert!(matches!(
            store.save("k", "12345"),
            Err(StoreError::QuotaExceeded(_))
        ));
        assert_eq!(store.load("k").unwrap(), Some("1234".to_string()));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert_eq!(store.load(HISTORY_KEY).unwrap(), None);
        store.save(HISTORY_KEY, "[]").unwrap();
        assert_eq!(store.load(HISTORY_KEY).unwrap(), Some("[]".to_string()));
    }

    #[test]
    fn test_file_store_pinned_key_uses_exact_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("runs").join("my-history.json");
        let store = FileStore::new(dir.path()).pin(HISTORY_KEY, &target);

        store.save(HISTORY_KEY, "[1]").unwrap();
        store.save("other.key", "{}").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "[1]");
        assert_eq!(store.load(HISTORY_KEY).unwrap(), Some("[1]".to_string()));
        assert!(dir.path().join("other_key.json").exists());
        assert!(!dir.path().join("seowatch_history.json").exists());
    }

    #[test]
    fn test_restore_history_ignores_garbage() {
        let store = MemoryStore::new();
        store.save(HISTORY_KEY, "not json").unwrap();
        let history = Scheduler::restore_history(&store, HISTORY_CAPACITY);
        assert!(history.is_empty());
    }

    #[test]
    fn test_restore_history_continues_ids() {
        let store = MemoryStore::new();
        let saved = vec![entry(7), entry(6)];
        store
            .save(HISTORY_KEY, &serde_json::to_string(&saved).unwrap())
            .unwrap();
        let history = Scheduler::restore_history(&store, HISTORY_CAPACITY);
        assert_eq!(history.len(), 2);
        assert_eq!(history.max_id(), 7);
        assert_eq!(history.latest().map(|e| e.id), Some(7));
    }
}
