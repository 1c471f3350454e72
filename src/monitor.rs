//! Watches a single URL for content drift.
//!
//! `start` fetches once to establish a baseline, then re-fetches on a fixed
//! interval. Each check hashes the HTML; when the hash moves, the previous and
//! current pages are diffed field by field and a `Changed` event is emitted
//! with a fresh audit of the new HTML.

use crate::audit::Auditor;
use crate::error::{ConfigError, validate_target};
use crate::extractor::Extractor;
use crate::http_client::{DEFAULT_FETCH_TIMEOUT, Fetcher, fetch_with_timeout};
use crate::models::{Baseline, ContentDiff, MonitorEvent, MonitorState, PageSnapshot};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

/// Word-count moves at or below this are noise
const WORD_COUNT_TOLERANCE: usize = 10;

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub fetch_timeout: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// djb2-style rolling hash over UTF-16 code units, rendered as lowercase hex
pub fn content_hash(html: &str) -> String {
    let hash = html.encode_utf16().fold(5381u32, |hash, code| {
        (hash << 5).wrapping_add(hash).wrapping_add(u32::from(code))
    });
    format!("{hash:x}")
}

/// One record per field that differs between two snapshots of the same page
pub fn diff_snapshots(before: &PageSnapshot, after: &PageSnapshot) -> Vec<ContentDiff> {
    let mut diffs = Vec::new();
    let mut record = |field: &str, before: String, after: String| {
        diffs.push(ContentDiff {
            field: field.to_string(),
            before,
            after,
        });
    };

    if before.title != after.title {
        record("title", before.title.clone(), after.title.clone());
    }
    if before.description != after.description {
        record(
            "description",
            before.description.clone(),
            after.description.clone(),
        );
    }

    let h1_before = before.h1_texts().collect::<Vec<_>>().join(" | ");
    let h1_after = after.h1_texts().collect::<Vec<_>>().join(" | ");
    if h1_before != h1_after {
        record("h1", h1_before, h1_after);
    }

    if before.word_count.abs_diff(after.word_count) > WORD_COUNT_TOLERANCE {
        record(
            "word_count",
            before.word_count.to_string(),
            after.word_count.to_string(),
        );
    }
    if before.images.len() != after.images.len() {
        record(
            "images",
            before.images.len().to_string(),
            after.images.len().to_string(),
        );
    }
    if before.links.len() != after.links.len() {
        record(
            "links",
            before.links.len().to_string(),
            after.links.len().to_string(),
        );
    }
    if before.structured_data.len() != after.structured_data.len() {
        record(
            "structured_data",
            before.structured_data.len().to_string(),
            after.structured_data.len().to_string(),
        );
    }

    diffs
}

struct Shared {
    state: MonitorState,
    baseline: Option<Baseline>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ActiveWatch {
    url: String,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Independent drift watcher for one URL at a time
pub struct ContentMonitor {
    fetcher: Arc<dyn Fetcher>,
    options: MonitorOptions,
    shared: Arc<Mutex<Shared>>,
    events: mpsc::UnboundedSender<MonitorEvent>,
    active: Option<ActiveWatch>,
}

impl ContentMonitor {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        options: MonitorOptions,
    ) -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let monitor = Self {
            fetcher,
            options,
            shared: Arc::new(Mutex::new(Shared {
                state: MonitorState::Idle,
                baseline: None,
            })),
            events,
            active: None,
        };
        (monitor, receiver)
    }

    pub fn state(&self) -> MonitorState {
        lock(&self.shared).state
    }

    pub fn baseline(&self) -> Option<Baseline> {
        lock(&self.shared).baseline.clone()
    }

    /// Begins watching `url`, replacing any previous watch.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, url: &str, interval: Duration) -> Result<(), ConfigError> {
        let target = validate_target(url, interval)?;
        self.stop();

        {
            let mut shared = lock(&self.shared);
            shared.state = MonitorState::BaselinePending;
            shared.baseline = None;
        }

        let token = CancellationToken::new();
        let task = WatchTask {
            url: target.to_string(),
            fetcher: Arc::clone(&self.fetcher),
            timeout: self.options.fetch_timeout,
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
            token: token.clone(),
        };

        tracing::info!(
            url = %task.url,
            interval_secs = interval.as_secs_f64(),
            "Starting content monitor"
        );
        let handle = tokio::spawn(task.run(interval));
        self.active = Some(ActiveWatch {
            url: target.to_string(),
            token,
            handle,
        });
        Ok(())
    }

    /// Cancels the timer and any in-flight check. Safe to call at any time.
    pub fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        let mut shared = lock(&self.shared);
        active.token.cancel();
        active.handle.abort();
        shared.state = MonitorState::Stopped;
        let _ = self.events.send(MonitorEvent::Stopped {
            url: active.url.clone(),
        });
        tracing::debug!(url = %active.url, "Content monitor stopped");
    }
}

impl Drop for ContentMonitor {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.token.cancel();
            active.handle.abort();
        }
    }
}

struct WatchTask {
    url: String,
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
    shared: Arc<Mutex<Shared>>,
    events: mpsc::UnboundedSender<MonitorEvent>,
    token: CancellationToken,
}

impl WatchTask {
    async fn run(self, interval: Duration) {
        self.check().await;

        // Overdue ticks are skipped, so checks never overlap or queue up
        let mut ticker = interval_at(Instant::now() + interval, interval);
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
                    self.check().await;
                    idle_since = Instant::now();
                }
            }
        }
    }

    async fn check(&self) {
        tracing::debug!(url = %self.url, "Checking for content changes");
        let fetched = tokio::select! {
            _ = self.token.cancelled() => return,
            result = fetch_with_timeout(self.fetcher.as_ref(), &self.url, self.timeout) => result,
        };

        let html = match fetched {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "Monitor fetch failed");
                self.emit_unless_cancelled(|_| {
                    Some(MonitorEvent::Error {
                        url: self.url.clone(),
                        message: e.to_string(),
                    })
                });
                return;
            }
        };

        let hash = content_hash(&html);
        let previous = lock(&self.shared).baseline.clone();

        let Some(previous) = previous else {
            self.emit_unless_cancelled(|shared| {
                shared.baseline = Some(Baseline {
                    url: self.url.clone(),
                    hash: hash.clone(),
                    html,
                });
                shared.state = MonitorState::Watching;
                tracing::info!(url = %self.url, hash = %hash, "Baseline established");
                Some(MonitorEvent::BaselineEstablished {
                    url: self.url.clone(),
                    hash: hash.clone(),
                })
            });
            return;
        };

        if previous.hash == hash {
            self.emit_unless_cancelled(|_| {
                Some(MonitorEvent::NoChange {
                    url: self.url.clone(),
                    checked_at: chrono::Utc::now(),
                })
            });
            return;
        }

        let before = Extractor::extract(&previous.html, &self.url);
        let after = Extractor::extract(&html, &self.url);
        let mut diffs = diff_snapshots(&before, &after);
        if diffs.is_empty() {
            diffs.push(ContentDiff {
                field: "content".to_string(),
                before: previous.hash.clone(),
                after: hash.clone(),
            });
        }
        let audit = Auditor::audit_html(&self.url, &html);

        self.emit_unless_cancelled(|shared| {
            tracing::info!(
                url = %self.url,
                changes = diffs.len(),
                hash = %hash,
                "Content change detected"
            );
            shared.baseline = Some(Baseline {
                url: self.url.clone(),
                hash: hash.clone(),
                html,
            });
            Some(MonitorEvent::Changed {
                url: self.url.clone(),
                diffs,
                audit: Box::new(audit),
                checked_at: chrono::Utc::now(),
            })
        });
    }

    /// Applies a state update and sends its event, unless `stop` won the race.
    /// Holding the lock across the check keeps events strictly before `Stopped`.
    fn emit_unless_cancelled(&self, update: impl FnOnce(&mut Shared) -> Option<MonitorEvent>) {
        let mut shared = lock(&self.shared);
        if self.token.is_cancelled() {
            tracing::debug!(url = %self.url, "Discarding result that arrived after stop");
            return;
        }
        if let Some(event) = update(&mut shared) {
            let _ = self.events.send(event);
        }
    }
}
