use crate::models::{Keyword, Phrase};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_KEYWORD_LIMIT: usize = 10;
pub const DEFAULT_PHRASE_LIMIT: usize = 5;

/// Minimum combined length (exclusive) for a two-word phrase
const MIN_PHRASE_CHARS: usize = 7;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // function words
        "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
        "one", "our", "out", "day", "get", "has", "him", "his", "how", "man", "new", "now", "old",
        "see", "two", "way", "who", "boy", "did", "its", "let", "put", "say", "she", "too", "use",
        "that", "with", "have", "this", "will", "your", "from", "they", "know", "want", "been",
        "good", "much", "some", "time", "very", "when", "come", "here", "just", "like", "long",
        "make", "many", "more", "only", "over", "such", "take", "than", "them", "well", "were",
        "what", "which", "their", "there", "these", "those", "would", "about", "could", "other",
        "into", "then", "also", "each", "most", "must", "should", "because", "while", "where",
        "after", "before", "being", "both", "does", "doing", "during", "further", "having",
        "itself", "myself", "ourselves", "themselves", "yourself", "once", "same", "under",
        "until", "again", "against", "between", "through", "above", "below", "down", "off",
        "own", "why", "may", "might", "shall", "yet", "nor", "per", "via", "upon", "within",
        "without", "even", "every", "still", "though", "whom", "whose", "ever", "really",
        "thing", "things", "don't", "it's", "we're", "you're", "i'm", "can't", "won't",
        // markup and URL artifacts
        "html", "http", "https", "www", "com", "org", "net", "div", "span", "class", "href",
        "src", "img", "nbsp", "amp", "px", "css", "javascript", "null", "undefined",
    ]
    .into_iter()
    .collect()
});

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Lowercases, strips everything but letters, digits, apostrophes, hyphens
/// and whitespace, then splits on whitespace
fn clean_tokens(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '\'' || *c == '-' || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Top `limit` keywords by `frequency * (1 + 0.1 * length)`, ties in first-seen order
pub fn extract_keywords(text: &str, limit: usize) -> Vec<Keyword> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for token in clean_tokens(text) {
        if token.chars().count() <= 2 || is_stop_word(&token) {
            continue;
        }
        let count = counts.entry(token.clone()).or_insert(0);
        if *count == 0 {
            order.push(token);
        }
        *count += 1;
    }

    let mut keywords: Vec<Keyword> = order
        .into_iter()
        .map(|word| {
            let count = counts[&word];
            let score = count as f64 * (1.0 + 0.1 * word.chars().count() as f64);
            Keyword { word, count, score }
        })
        .collect();

    // Stable sort keeps first-seen order among equal scores
    keywords.sort_by(|a, b| b.score.total_cmp(&a.score));
    keywords.truncate(limit);
    keywords
}

/// Top `limit` repeated two-word phrases by frequency, ties in first-seen order
pub fn extract_phrases(text: &str, limit: usize) -> Vec<Phrase> {
    let words: Vec<String> = clean_tokens(text)
        .into_iter()
        .filter(|w| w.chars().count() > 2)
        .collect();

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for pair in words.windows(2) {
        let phrase = format!("{} {}", pair[0], pair[1]);
        if phrase.chars().count() <= MIN_PHRASE_CHARS {
            continue;
        }
        let count = counts.entry(phrase.clone()).or_insert(0);
        if *count == 0 {
            order.push(phrase);
        }
        *count += 1;
    }

    let mut phrases: Vec<Phrase> = order
        .into_iter()
        .filter_map(|phrase| {
            let count = counts[&phrase];
            (count > 1).then_some(Phrase { phrase, count })
        })
        .collect();

    phrases.sort_by(|a, b| b.count.cmp(&a.count));
    phrases.truncate(limit);
    phrases
}
