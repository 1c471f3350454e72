//! Small string helpers shared by the rule evaluator and the tag generator.
//! Lengths are counted in characters, not bytes.

use url::Url;

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// First `keep` characters followed by "..."
pub fn cut_with_ellipsis(text: &str, keep: usize) -> String {
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Cuts to `limit - 3` characters plus an ellipsis when longer than `limit`
pub fn truncate_to_limit(text: &str, limit: usize) -> String {
    if char_len(text) > limit {
        cut_with_ellipsis(text, limit.saturating_sub(3))
    } else {
        text.to_string()
    }
}

/// Host name without a leading `www.`; empty when the URL has no host
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

/// Capitalized domain with its TLD suffix stripped: `www.acme-tools.co.uk` -> `Acme-tools`
pub fn brand_of(url: &str) -> String {
    let domain = domain_of(url);
    let first = domain.split('.').next().unwrap_or_default();
    if first.is_empty() {
        "Website".to_string()
    } else {
        capitalize(first)
    }
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits prose on `.`, `!` and `?`, trimming and dropping empty pieces
pub fn sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Escapes a value for use inside a double-quoted HTML attribute or text node
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
