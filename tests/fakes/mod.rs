use async_trait::async_trait;
use seowatch::error::FetchError;
use seowatch::http_client::Fetcher;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Replays canned responses in order, repeating the last one once the script runs out
#[allow(dead_code)]
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    delay: Duration,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedFetcher {
    pub fn new(script: Vec<Result<&str, &str>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            last: Mutex::new(None),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(html: &str) -> Self {
        Self::new(vec![Ok(html)])
    }

    /// Each fetch sleeps on the tokio clock before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<String, String> {
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        last.clone().unwrap_or_else(|| Err("script is empty".to_string()))
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.next().map_err(FetchError::Other)
    }
}

/// Serves a fixed page per URL; unknown URLs get a small generic page
#[allow(dead_code)]
pub struct SiteFetcher {
    pages: HashMap<String, String>,
    failing: Mutex<HashMap<String, usize>>,
    delay: Duration,
    requests: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl SiteFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            failing: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    /// The next `times` fetches of `url` fail
    pub fn fail(self, url: &str, times: usize) -> Self {
        self.failing.lock().unwrap().insert(url.to_string(), times);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for SiteFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        {
            let mut failing = self.failing.lock().unwrap();
            if let Some(remaining) = failing.get_mut(url).filter(|n| **n > 0) {
                *remaining -= 1;
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: 503,
                });
            }
        }

        Ok(self.pages.get(url).cloned().unwrap_or_else(|| {
            format!("<html><head><title>{url}</title></head><body><h1>{url}</h1></body></html>")
        }))
    }
}

/// Root page linking to `count` same-origin pages plus some noise
#[allow(dead_code)]
pub fn site_root(count: usize) -> String {
    let links: String = (1..=count)
        .map(|n| format!(r#"<a href="/p{n}">Page {n}</a>"#))
        .collect();
    format!(
        r#"<html><head><title>Root</title></head><body><h1>Root</h1>{links}<a href="https://elsewhere.org/">x</a></body></html>"#
    )
}
