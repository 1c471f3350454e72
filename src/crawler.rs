use crate::audit::Auditor;
use crate::error::FetchError;
use crate::http_client::{Fetcher, fetch_with_timeout};
use crate::models::{AuditResult, IssueAction, RunMetrics};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Root page plus at most nine discovered pages per run
pub const DEFAULT_MAX_PAGES: usize = 10;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("a[href] selector should be valid"));

/// Hrefs that never point at a crawlable page
const SKIPPED_PREFIXES: &[&str] = &["#", "mailto:", "tel:", "javascript:"];

/// Drops query and fragment so `/a?x=1#top` and `/a` count as the same page
fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_query(None);
    normalized.set_fragment(None);
    normalized
}

/// Checks if a URL is on the same host as the root
fn is_same_origin(url: &Url, root: &Url) -> bool {
    url.host_str() == root.host_str()
}

/// Same-host http(s) links found on the root page, in document order,
/// deduplicated after normalization and excluding the root itself
pub fn discover_links(html: &str, root: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let root_normalized = normalize_url(root);
    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        let lowered = href.to_lowercase();
        if href.is_empty() || SKIPPED_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
            continue;
        }

        let Ok(absolute) = root.join(href) else {
            tracing::debug!(href = %href, "Skipping unparseable link");
            continue;
        };
        if !matches!(absolute.scheme(), "http" | "https") || !is_same_origin(&absolute, root) {
            continue;
        }

        let normalized = normalize_url(&absolute);
        if normalized == root_normalized {
            continue;
        }
        if seen.insert(normalized.to_string()) {
            links.push(normalized);
        }
    }

    links
}

/// Outcome of one multi-page audit, before it is numbered into History
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub pages: Vec<AuditResult>,
    pub metrics: RunMetrics,
}

/// Audits a root page and its same-origin neighbours, one hop deep
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    max_pages: usize,
    fetch_timeout: Duration,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn Fetcher>, max_pages: usize, fetch_timeout: Duration) -> Self {
        Self {
            fetcher,
            max_pages: max_pages.max(1),
            fetch_timeout,
        }
    }

    /// Fails only when the root page cannot be fetched
    pub async fn crawl(&self, root: &Url) -> Result<CrawlOutcome, FetchError> {
        let started = Instant::now();
        let root_html =
            fetch_with_timeout(self.fetcher.as_ref(), root.as_str(), self.fetch_timeout).await?;

        let discovered = discover_links(&root_html, root);
        tracing::info!(
            url = %root,
            discovered = discovered.len(),
            "Discovered same-origin links"
        );

        let mut pages = vec![Auditor::audit_html(root.as_str(), &root_html)];
        for link in discovered.iter().take(self.max_pages - 1) {
            match fetch_with_timeout(self.fetcher.as_ref(), link.as_str(), self.fetch_timeout)
                .await
            {
                Ok(html) => pages.push(Auditor::audit_html(link.as_str(), &html)),
                Err(e) => {
                    tracing::debug!(url = %link, error = %e, "Skipping page that failed to fetch");
                }
            }
        }

        let metrics = Self::aggregate(&pages, started.elapsed());
        Ok(CrawlOutcome { pages, metrics })
    }

    pub fn aggregate(pages: &[AuditResult], elapsed: Duration) -> RunMetrics {
        let avg_score = if pages.is_empty() {
            0
        } else {
            let total: u32 = pages.iter().map(|p| u32::from(p.score)).sum();
            (f64::from(total) / pages.len() as f64).round() as u8
        };

        RunMetrics {
            avg_score,
            total_issues: pages.iter().map(|p| p.issues.len()).sum(),
            auto_fixed: pages
                .iter()
                .map(|p| p.count_action(IssueAction::AutoFix))
                .sum(),
            escalated: pages
                .iter()
                .map(|p| p.count_action(IssueAction::Escalate))
                .sum(),
            elapsed: (elapsed.as_secs_f64() * 10.0).round() / 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_discover_links_filters_and_dedupes() {
        let html = r##"
            <a href="/about">About</a>
            <a href="/about?ref=nav#team">About again</a>
            <a href="blog/post-1">Post</a>
            <a href="https://example.com/">Home</a>
            <a href="/#top">Home anchor</a>
            <a href="#section">Anchor</a>
            <a href="mailto:hi@example.com">Mail</a>
            <a href="tel:+15551234">Call</a>
            <a href="JavaScript:void(0)">JS</a>
            <a href="https://other.com/page">Other</a>
            <a href="ftp://example.com/file">FTP</a>
            <a href="http://example.com/contact">Contact</a>
        "##;
        let links: Vec<String> = discover_links(html, &root())
            .into_iter()
            .map(|u| u.to_string())
            .collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/about",
                "https://example.com/blog/post-1",
                "http://example.com/contact",
            ]
        );
    }

    #[test]
    fn test_discover_links_same_host_different_port_is_same_origin() {
        let html = r#"<a href="https://example.com:8443/admin">Admin</a>"#;
        assert_eq!(discover_links(html, &root()).len(), 1);
    }

    #[test]
    fn test_aggregate_metrics() {
        let a = Auditor::audit_html("https://example.com/a", "<p>x</p>");
        let mut b = a.clone();
        b.score = 41;
        let metrics = Crawler::aggregate(&[a.clone(), b], Duration::from_millis(1249));
        assert_eq!(metrics.avg_score, 36); // (30 + 41) / 2 = 35.5
        assert_eq!(metrics.total_issues, a.issues.len() * 2);
        assert_eq!(
            metrics.auto_fixed + metrics.escalated,
            metrics.total_issues
        );
        assert_eq!(metrics.elapsed, 1.2);
    }

    #[test]
    fn test_aggregate_empty() {
        let metrics = Crawler::aggregate(&[], Duration::ZERO);
        assert_eq!(metrics.avg_score, 0);
        assert_eq!(metrics.total_issues, 0);
    }
}
