use crate::error::FetchError;
use crate::extractor::Extractor;
use crate::http_client::{Fetcher, fetch_with_timeout};
use crate::models::AuditResult;
use crate::seo_analyzer::SeoAnalyzer;
use crate::tag_generator::TagGenerator;
use std::time::Duration;

pub struct Auditor;

impl Auditor {
    /// Extraction -> rule evaluation -> scoring -> tag generation for one page
    pub fn audit_html(url: &str, html: &str) -> AuditResult {
        let snapshot = Extractor::extract(html, url);
        let issues = SeoAnalyzer::evaluate(&snapshot);
        let score = SeoAnalyzer::score(&issues);
        let tags = TagGenerator::generate(&snapshot);

        tracing::debug!(
            url = %url,
            score,
            issues = issues.len(),
            words = snapshot.word_count,
            "Audited page"
        );

        AuditResult {
            url: url.to_string(),
            issues,
            score,
            snapshot,
            tags,
            audited_at: chrono::Utc::now(),
        }
    }

    pub async fn audit_url(
        fetcher: &dyn Fetcher,
        url: &str,
        timeout: Duration,
    ) -> Result<AuditResult, FetchError> {
        let html = fetch_with_timeout(fetcher, url, timeout).await?;
        Ok(Self::audit_html(url, &html))
    }
}
