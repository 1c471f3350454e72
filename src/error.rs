//! Error types shared by the fetch, monitor and scheduler layers

use std::time::Duration;
use thiserror::Error;

/// Failure to obtain a page's HTML
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure from the HTTP client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    /// The fetch did not complete within the configured bound
    #[error("fetching {url} timed out after {}s", after.as_secs())]
    Timeout { url: String, after: Duration },

    #[error("{0}")]
    Other(String),
}

/// Recoverable parse failure inside an otherwise valid page
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid structured data block: {0}")]
    StructuredData(#[from] serde_json::Error),
}

/// Rejected arguments to `start` on a monitor or scheduler
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("Invalid URL scheme '{0}': only http and https are supported")]
    UnsupportedScheme(String),

    #[error("interval must be greater than zero")]
    InvalidInterval,
}

/// Session store failure; always non-fatal for callers
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store quota exceeded for key '{0}'")]
    QuotaExceeded(String),
}

/// Validates a watch/schedule target: absolute http(s) URL and a non-zero period
pub fn validate_target(url: &str, interval: Duration) -> Result<url::Url, ConfigError> {
    if interval.is_zero() {
        return Err(ConfigError::InvalidInterval);
    }

    let parsed = url::Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(ConfigError::UnsupportedScheme(scheme.to_string())),
    }
    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(url.to_string()));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_target_accepts_http_and_https() {
        assert!(validate_target("http://example.com", Duration::from_secs(1)).is_ok());
        assert!(validate_target("https://example.com/a?b=c", Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn test_validate_target_rejects_bad_input() {
        assert_eq!(
            validate_target("https://example.com", Duration::ZERO).unwrap_err(),
            ConfigError::InvalidInterval
        );
        assert_eq!(
            validate_target("ftp://example.com", Duration::from_secs(5)).unwrap_err(),
            ConfigError::UnsupportedScheme("ftp".to_string())
        );
        assert!(matches!(
            validate_target("example.com", Duration::from_secs(5)),
            Err(ConfigError::InvalidUrl(_))
        ));
    }
}
