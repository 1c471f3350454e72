//! Synthesizes replacement metadata for a page.
//!
//! Title and description are chosen by walking an ordered list of strategies;
//! the first one that yields a value wins. Each strategy is a plain function so
//! the decision path can be tested one step at a time.

use crate::keywords::{
    DEFAULT_KEYWORD_LIMIT, DEFAULT_PHRASE_LIMIT, extract_keywords, extract_phrases,
};
use crate::models::{Keyword, OptimizedTagSet, PageSnapshot, Phrase, RankingTip, TipPriority};
use crate::seo_analyzer::{
    DESCRIPTION_MAX, DESCRIPTION_MIN, THIN_CONTENT_WORDS, TITLE_MAX, TITLE_MIN, canonical_for,
};
use crate::text::{
    brand_of, char_len, cut_with_ellipsis, domain_of, escape_html, sentences, title_case,
};

const HEADING_TITLE_MIN: usize = 15;
const HEADING_TITLE_MAX: usize = 50;
const PHRASE_TITLE_MAX: usize = 58;
const SENTENCE_MIN: usize = 20;
const SENTENCE_MAX: usize = 120;
const SENTENCE_SUFFIX_BELOW: usize = 110;
const RICH_CONTENT_WORDS: usize = 800;
const H2_EXPECTED_WORDS: usize = 200;
const MIN_INTERNAL_LINKS: usize = 3;

const DESCRIPTION_PADDING: &str =
    " Discover expert insights, practical tips and everything you need to know.";

/// Inputs shared by every strategy
pub struct TagContext<'a> {
    pub page: &'a PageSnapshot,
    pub keywords: &'a [Keyword],
    pub phrases: &'a [Phrase],
    /// Capitalized site name with the TLD stripped
    pub brand: String,
    /// Host name without `www.`
    pub domain: String,
}

impl<'a> TagContext<'a> {
    pub fn new(page: &'a PageSnapshot, keywords: &'a [Keyword], phrases: &'a [Phrase]) -> Self {
        let domain = domain_of(&page.url);
        Self {
            page,
            keywords,
            phrases,
            brand: brand_of(&page.url),
            domain: if domain.is_empty() {
                "this site".to_string()
            } else {
                domain
            },
        }
    }

    fn top_keywords(&self, n: usize) -> Vec<&str> {
        self.keywords.iter().take(n).map(|k| k.word.as_str()).collect()
    }
}

/// A strategy either produces a value or declines
pub type Strategy = fn(&TagContext<'_>) -> Option<String>;

pub const TITLE_STRATEGIES: &[(&str, Strategy)] = &[
    ("existing", title_from_existing),
    ("heading", title_from_heading),
    ("phrase", title_from_phrase),
    ("keywords", title_from_keywords),
    ("generic", title_generic),
];

pub const DESCRIPTION_STRATEGIES: &[(&str, Strategy)] = &[
    ("existing", description_from_existing),
    ("sentence", description_from_sentence),
    ("topics", description_from_topics),
    ("generic", description_generic),
];

/// Runs strategies in order and returns the first hit with its name
pub fn select(
    strategies: &[(&'static str, Strategy)],
    ctx: &TagContext<'_>,
) -> Option<(&'static str, String)> {
    strategies
        .iter()
        .find_map(|(name, strategy)| strategy(ctx).map(|value| (*name, value)))
}

pub fn title_from_existing(ctx: &TagContext<'_>) -> Option<String> {
    let len = char_len(&ctx.page.title);
    (TITLE_MIN..=TITLE_MAX)
        .contains(&len)
        .then(|| ctx.page.title.clone())
}

pub fn title_from_heading(ctx: &TagContext<'_>) -> Option<String> {
    let heading = ctx.page.headings.first()?;
    let len = char_len(&heading.text);
    (HEADING_TITLE_MIN..=HEADING_TITLE_MAX)
        .contains(&len)
        .then(|| format!("{} | {}", heading.text, ctx.brand))
}

pub fn title_from_phrase(ctx: &TagContext<'_>) -> Option<String> {
    let phrase = ctx.phrases.first()?;
    let mut title = title_case(&phrase.phrase);
    if ctx.keywords.len() >= 2 {
        let pair = ctx
            .top_keywords(2)
            .into_iter()
            .map(title_case)
            .collect::<Vec<_>>()
            .join(" & ");
        title = format!("{title} — {pair}");
    }
    if char_len(&title) > PHRASE_TITLE_MAX {
        Some(cut_with_ellipsis(&title, PHRASE_TITLE_MAX - 1))
    } else {
        Some(format!("{title} | {}", ctx.domain))
    }
}

pub fn title_from_keywords(ctx: &TagContext<'_>) -> Option<String> {
    if ctx.keywords.is_empty() {
        return None;
    }
    let joined = title_case(&ctx.top_keywords(3).join(" "));
    Some(format!("{joined} — {}", ctx.domain))
}

pub fn title_generic(ctx: &TagContext<'_>) -> Option<String> {
    Some(format!("{} — Your Trusted Source", ctx.domain))
}

pub fn description_from_existing(ctx: &TagContext<'_>) -> Option<String> {
    let len = char_len(&ctx.page.description);
    (DESCRIPTION_MIN..=DESCRIPTION_MAX)
        .contains(&len)
        .then(|| ctx.page.description.clone())
}

/// The body sentence mentioning the most top keywords; ties go to the earliest
pub fn description_from_sentence(ctx: &TagContext<'_>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for sentence in sentences(&ctx.page.body_text) {
        let len = char_len(sentence);
        if len <= SENTENCE_MIN || len >= SENTENCE_MAX {
            continue;
        }
        let lower = sentence.to_lowercase();
        let matches = ctx
            .keywords
            .iter()
            .filter(|k| lower.contains(k.word.as_str()))
            .count();
        if best.is_none_or(|(_, top)| matches > top) {
            best = Some((sentence, matches));
        }
    }

    let (sentence, _) = best?;
    let mut description = format!("{sentence}.");
    if char_len(&description) < SENTENCE_SUFFIX_BELOW && !ctx.keywords.is_empty() {
        description.push_str(&format!(" Learn about {}.", ctx.top_keywords(3).join(", ")));
    }
    Some(description)
}

pub fn description_from_topics(ctx: &TagContext<'_>) -> Option<String> {
    if ctx.phrases.is_empty() && ctx.keywords.is_empty() {
        return None;
    }
    let mut description = String::new();
    if !ctx.phrases.is_empty() {
        let topics = ctx
            .phrases
            .iter()
            .take(3)
            .map(|p| p.phrase.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        description.push_str(&format!("Explore {topics} on {}.", ctx.domain));
    }
    if !ctx.keywords.is_empty() {
        if !description.is_empty() {
            description.push(' ');
        }
        description.push_str(&format!(
            "Key topics include {}.",
            ctx.top_keywords(5).join(", ")
        ));
    }
    Some(description)
}

pub fn description_generic(ctx: &TagContext<'_>) -> Option<String> {
    Some(format!(
        "Welcome to {}. Explore our latest content, resources and insights designed to help you find exactly what you need.",
        ctx.domain
    ))
}

/// Clamps a description into the recommended window
fn finalize_description(description: String) -> String {
    if char_len(&description) > DESCRIPTION_MAX {
        cut_with_ellipsis(&description, DESCRIPTION_MAX - 3)
    } else if char_len(&description) < DESCRIPTION_MIN {
        format!("{description}{DESCRIPTION_PADDING}")
    } else {
        description
    }
}

pub struct TagGenerator;

impl TagGenerator {
    pub fn generate(page: &PageSnapshot) -> OptimizedTagSet {
        let keywords = extract_keywords(&page.body_text, DEFAULT_KEYWORD_LIMIT);
        let phrases = extract_phrases(&page.body_text, DEFAULT_PHRASE_LIMIT);
        Self::generate_with(page, &keywords, &phrases)
    }

    pub fn generate_with(
        page: &PageSnapshot,
        keywords: &[Keyword],
        phrases: &[Phrase],
    ) -> OptimizedTagSet {
        let ctx = TagContext::new(page, keywords, phrases);

        let title = Self::generate_title(&ctx);
        let description = Self::generate_description(&ctx);
        let canonical = if page.canonical.is_empty() {
            canonical_for(&page.url)
        } else {
            page.canonical.clone()
        };
        let og_title = non_empty_or(&page.open_graph.title, &title);
        let og_description = non_empty_or(&page.open_graph.description, &description);
        let og_image = Self::og_image(page);
        let schema = Self::schema(page, &title, &description, &canonical);

        let mut tags = OptimizedTagSet {
            title,
            description,
            keywords: keywords
                .iter()
                .take(DEFAULT_KEYWORD_LIMIT)
                .map(|k| k.word.clone())
                .collect(),
            phrases: phrases
                .iter()
                .take(DEFAULT_PHRASE_LIMIT)
                .map(|p| p.phrase.clone())
                .collect(),
            canonical,
            og_title,
            og_description,
            og_image,
            schema,
            html: String::new(),
            tips: Self::ranking_tips(page, keywords),
        };
        tags.html = Self::html_snippet(&tags);
        tags
    }

    pub fn generate_title(ctx: &TagContext<'_>) -> String {
        let (strategy, title) = select(TITLE_STRATEGIES, ctx)
            .unwrap_or_else(|| ("generic", format!("{} — Your Trusted Source", ctx.domain)));
        tracing::debug!(url = %ctx.page.url, strategy, "Generated title");
        title
    }

    pub fn generate_description(ctx: &TagContext<'_>) -> String {
        let (strategy, description) = select(DESCRIPTION_STRATEGIES, ctx)
            .unwrap_or_else(|| ("generic", String::new()));
        tracing::debug!(url = %ctx.page.url, strategy, "Generated description");
        finalize_description(description)
    }

    fn og_image(page: &PageSnapshot) -> String {
        if !page.open_graph.image.is_empty() {
            return page.open_graph.image.clone();
        }
        page.images
            .iter()
            .find(|img| !img.src.is_empty())
            .map(|img| {
                url::Url::parse(&page.url)
                    .and_then(|base| base.join(&img.src))
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| img.src.clone())
            })
            .unwrap_or_default()
    }

    fn schema(page: &PageSnapshot, title: &str, description: &str, canonical: &str) -> String {
        let value = page.structured_data.first().cloned().unwrap_or_else(|| {
            serde_json::json!({
                "@context": "https://schema.org",
                "@type": "WebPage",
                "name": title,
                "description": description,
                "url": canonical,
            })
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    }

    fn html_snippet(tags: &OptimizedTagSet) -> String {
        let og_image_line = if tags.og_image.is_empty() {
            "<!-- og:image: add a 1200x630 share image URL here -->".to_string()
        } else {
            format!(
                "<meta property=\"og:image\" content=\"{}\">",
                escape_html(&tags.og_image)
            )
        };

        [
            format!("<title>{}</title>", escape_html(&tags.title)),
            format!(
                "<meta name=\"description\" content=\"{}\">",
                escape_html(&tags.description)
            ),
            format!(
                "<meta name=\"keywords\" content=\"{}\">",
                escape_html(&tags.keywords.join(", "))
            ),
            format!(
                "<link rel=\"canonical\" href=\"{}\">",
                escape_html(&tags.canonical)
            ),
            String::new(),
            "<!-- Open Graph -->".to_string(),
            "<meta property=\"og:type\" content=\"website\">".to_string(),
            format!(
                "<meta property=\"og:title\" content=\"{}\">",
                escape_html(&tags.og_title)
            ),
            format!(
                "<meta property=\"og:description\" content=\"{}\">",
                escape_html(&tags.og_description)
            ),
            format!(
                "<meta property=\"og:url\" content=\"{}\">",
                escape_html(&tags.canonical)
            ),
            og_image_line,
            String::new(),
            "<!-- Twitter Card -->".to_string(),
            "<meta name=\"twitter:card\" content=\"summary_large_image\">".to_string(),
            format!(
                "<meta name=\"twitter:title\" content=\"{}\">",
                escape_html(&tags.og_title)
            ),
            format!(
                "<meta name=\"twitter:description\" content=\"{}\">",
                escape_html(&tags.og_description)
            ),
            String::new(),
            "<!-- Structured Data -->".to_string(),
            "<script type=\"application/ld+json\">".to_string(),
            tags.schema.clone(),
            "</script>".to_string(),
        ]
        .join("\n")
    }

    pub fn ranking_tips(page: &PageSnapshot, keywords: &[Keyword]) -> Vec<RankingTip> {
        let mut tips = Vec::new();

        if page.word_count < THIN_CONTENT_WORDS {
            tips.push(RankingTip {
                priority: TipPriority::High,
                message: format!("Content is thin ({} words)", page.word_count),
                action: format!(
                    "Expand the page to at least {RICH_CONTENT_WORDS} words covering the topic in depth"
                ),
            });
        } else if page.word_count < RICH_CONTENT_WORDS {
            tips.push(RankingTip {
                priority: TipPriority::Medium,
                message: format!("Content could be deeper ({} words)", page.word_count),
                action: format!("Aim for {RICH_CONTENT_WORDS}+ words on competitive topics"),
            });
        }

        if page.h1_count() == 0 {
            tips.push(RankingTip {
                priority: TipPriority::High,
                message: "No H1 heading found".to_string(),
                action: "Add one H1 that contains the primary keyword".to_string(),
            });
        }

        if page.word_count > H2_EXPECTED_WORDS && !page.headings.iter().any(|h| h.level == 2) {
            tips.push(RankingTip {
                priority: TipPriority::Medium,
                message: "No H2 subheadings structure the content".to_string(),
                action: "Break the copy into sections with descriptive H2 headings".to_string(),
            });
        }

        if page.internal_links.len() < MIN_INTERNAL_LINKS {
            tips.push(RankingTip {
                priority: TipPriority::Medium,
                message: format!(
                    "Weak internal linking ({} internal links)",
                    page.internal_links.len()
                ),
                action: format!("Link to at least {MIN_INTERNAL_LINKS} related pages on this site"),
            });
        }

        let missing_alt = page.images_missing_alt();
        if missing_alt > 0 {
            tips.push(RankingTip {
                priority: TipPriority::Medium,
                message: format!("{missing_alt} image(s) lack alt text"),
                action: "Describe each image in its alt attribute".to_string(),
            });
        }

        let top: Vec<&str> = keywords.iter().take(5).map(|k| k.word.as_str()).collect();
        tips.push(if top.is_empty() {
            RankingTip {
                priority: TipPriority::Info,
                message: "No dominant keywords detected".to_string(),
                action: "Focus the copy on one clear topic".to_string(),
            }
        } else {
            RankingTip {
                priority: TipPriority::Info,
                message: format!("Top keywords: {}", top.join(", ")),
                action: "Use them in the title, H1 and opening paragraph".to_string(),
            }
        });

        tips
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
