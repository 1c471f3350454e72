use crate::models::{IssueSeverity, IssueType, PageSnapshot, SeoIssue};
use crate::text::{brand_of, char_len, domain_of, sentences, truncate_to_limit};

pub const TITLE_MIN: usize = 30;
pub const TITLE_MAX: usize = 60;
pub const DESCRIPTION_MIN: usize = 70;
pub const DESCRIPTION_MAX: usize = 160;
pub const THIN_CONTENT_WORDS: usize = 300;

const CRITICAL_PENALTY: i32 = 15;
const WARNING_PENALTY: i32 = 8;
const INFO_PENALTY: i32 = 3;

const TITLE_FILLER: &str = " - Guides, Tips & Resources";
const DESCRIPTION_FILLER: &str =
    " Learn more about our services, resources and expert guidance to get started today.";

pub struct SeoAnalyzer;

/// Collects issues in catalog order and numbers them as they are pushed
struct IssueLog {
    issues: Vec<SeoIssue>,
}

impl IssueLog {
    fn push(
        &mut self,
        issue_type: IssueType,
        element: &str,
        current: impl Into<String>,
        suggested: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.issues.push(SeoIssue {
            id: self.issues.len(),
            issue_type,
            severity: issue_type.severity(),
            action: issue_type.action(),
            element: element.to_string(),
            current: current.into(),
            suggested: suggested.into(),
            reason: reason.into(),
        });
    }
}

impl SeoAnalyzer {
    /// Runs the full rule catalog against one snapshot
    pub fn evaluate(page: &PageSnapshot) -> Vec<SeoIssue> {
        let mut log = IssueLog { issues: Vec::new() };

        Self::check_title(page, &mut log);
        Self::check_description(page, &mut log);
        Self::check_headings(page, &mut log);
        Self::check_images(page, &mut log);
        Self::check_social_and_canonical(page, &mut log);

        // Thin content
        if page.word_count < THIN_CONTENT_WORDS {
            log.push(
                IssueType::ThinContent,
                "<body>",
                format!("{} words", page.word_count),
                format!("Expand the page to at least {THIN_CONTENT_WORDS} words of useful copy"),
                format!(
                    "Page has only {} words; pages under {THIN_CONTENT_WORDS} words rarely rank",
                    page.word_count
                ),
            );
        }

        if page.structured_data.is_empty() {
            log.push(
                IssueType::MissingSchema,
                "script[type=\"application/ld+json\"]",
                "",
                Self::suggest_schema(page),
                "No JSON-LD structured data found",
            );
        }

        if page.twitter_card.is_empty() {
            log.push(
                IssueType::MissingTwitterCard,
                "meta[name=\"twitter:card\"]",
                "",
                "<meta name=\"twitter:card\" content=\"summary_large_image\">",
                "No Twitter card meta tag found",
            );
        }

        log.issues
    }

    /// `100 - 15*critical - 8*warning - 3*info`, clamped to 0..=100
    pub fn score(issues: &[SeoIssue]) -> u8 {
        let penalty: i32 = issues
            .iter()
            .map(|issue| match issue.severity {
                IssueSeverity::Critical => CRITICAL_PENALTY,
                IssueSeverity::Warning => WARNING_PENALTY,
                IssueSeverity::Info => INFO_PENALTY,
            })
            .sum();
        (100 - penalty).clamp(0, 100) as u8
    }

    fn check_title(page: &PageSnapshot, log: &mut IssueLog) {
        let len = char_len(&page.title);
        if len == 0 {
            log.push(
                IssueType::MissingTitle,
                "<title>",
                "",
                Self::suggest_title(page),
                "Page is missing a title tag",
            );
        } else if len > TITLE_MAX {
            log.push(
                IssueType::TitleLength,
                "<title>",
                page.title.clone(),
                truncate_to_limit(&page.title, TITLE_MAX),
                format!("Title is too long ({len} chars, recommended: {TITLE_MIN}-{TITLE_MAX})"),
            );
        } else if len < TITLE_MIN {
            let mut suggested = format!("{} | {}", page.title, brand_of(&page.url));
            if char_len(&suggested) < TITLE_MIN {
                suggested.push_str(TITLE_FILLER);
            }
            log.push(
                IssueType::TitleLength,
                "<title>",
                page.title.clone(),
                truncate_to_limit(&suggested, TITLE_MAX),
                format!("Title is too short ({len} chars, recommended: {TITLE_MIN}-{TITLE_MAX})"),
            );
        }
    }

    fn check_description(page: &PageSnapshot, log: &mut IssueLog) {
        let len = char_len(&page.description);
        if len == 0 {
            log.push(
                IssueType::MissingDescription,
                "meta[name=\"description\"]",
                "",
                Self::suggest_description(page),
                "Page is missing a meta description",
            );
        } else if len > DESCRIPTION_MAX {
            log.push(
                IssueType::DescriptionLength,
                "meta[name=\"description\"]",
                page.description.clone(),
                truncate_to_limit(&page.description, DESCRIPTION_MAX),
                format!(
                    "Meta description is too long ({len} chars, recommended: {DESCRIPTION_MIN}-{DESCRIPTION_MAX})"
                ),
            );
        } else if len < DESCRIPTION_MIN {
            log.push(
                IssueType::DescriptionLength,
                "meta[name=\"description\"]",
                page.description.clone(),
                truncate_to_limit(
                    &format!("{}{DESCRIPTION_FILLER}", page.description),
                    DESCRIPTION_MAX,
                ),
                format!(
                    "Meta description is too short ({len} chars, recommended: {DESCRIPTION_MIN}-{DESCRIPTION_MAX})"
                ),
            );
        }
    }

    fn check_headings(page: &PageSnapshot, log: &mut IssueLog) {
        let h1s: Vec<&str> = page.h1_texts().collect();
        if h1s.is_empty() {
            let topic = page
                .headings
                .first()
                .map(|h| h.text.clone())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| page.title.clone());
            let suggested = if topic.is_empty() {
                "Add one <h1> that states the page topic".to_string()
            } else {
                format!("<h1>{topic}</h1>")
            };
            log.push(
                IssueType::H1Count,
                "<h1>",
                "0 H1 elements",
                suggested,
                "Page is missing an H1 tag",
            );
        } else if h1s.len() > 1 {
            log.push(
                IssueType::H1Count,
                "<h1>",
                h1s.join(" | "),
                format!("Keep a single <h1> (e.g. \"{}\") and demote the rest", h1s[0]),
                format!("Page has multiple H1 tags ({})", h1s.len()),
            );
        }

        // Only the first skipped level is reported
        if let Some(pair) = page
            .headings
            .windows(2)
            .find(|pair| pair[1].level > pair[0].level + 1)
        {
            let (from, to) = (pair[0].level, pair[1].level);
            log.push(
                IssueType::HeadingHierarchy,
                &format!("h{to}"),
                format!("h{from} -> h{to} (\"{}\")", pair[1].text),
                format!("h{from} -> h{}", from + 1),
                format!("Heading level jumps from h{from} to h{to}"),
            );
        }
    }

    fn check_images(page: &PageSnapshot, log: &mut IssueLog) {
        let missing: Vec<&str> = page
            .images
            .iter()
            .filter(|img| img.alt.is_empty())
            .map(|img| img.src.as_str())
            .collect();
        if missing.is_empty() {
            return;
        }

        let suggested = missing
            .iter()
            .map(|src| format!("alt=\"{}\"", alt_from_src(src)))
            .collect::<Vec<_>>()
            .join(", ");
        log.push(
            IssueType::ImagesMissingAlt,
            "img:not([alt])",
            format!("{} image(s) without alt", missing.len()),
            suggested,
            format!("{} image(s) missing alt text", missing.len()),
        );
    }

    fn check_social_and_canonical(page: &PageSnapshot, log: &mut IssueLog) {
        let og = &page.open_graph;
        if og.title.is_empty() || og.description.is_empty() {
            let title = if page.title.is_empty() {
                Self::suggest_title(page)
            } else {
                page.title.clone()
            };
            let description = if page.description.is_empty() {
                Self::suggest_description(page)
            } else {
                page.description.clone()
            };
            let mut missing = Vec::new();
            if og.title.is_empty() {
                missing.push("og:title");
            }
            if og.description.is_empty() {
                missing.push("og:description");
            }
            log.push(
                IssueType::MissingOpenGraph,
                "meta[property^=\"og:\"]",
                missing.join(", "),
                format!(
                    "<meta property=\"og:title\" content=\"{title}\"> <meta property=\"og:description\" content=\"{description}\">"
                ),
                format!("Missing Open Graph tags: {}", missing.join(", ")),
            );
        }

        if page.canonical.is_empty() {
            log.push(
                IssueType::MissingCanonical,
                "link[rel=\"canonical\"]",
                "",
                format!("<link rel=\"canonical\" href=\"{}\">", canonical_for(&page.url)),
                "No canonical URL declared",
            );
        }
    }

    /// First heading, else the opening sentence, else generic copy for the domain
    pub(crate) fn suggest_title(page: &PageSnapshot) -> String {
        let brand = brand_of(&page.url);
        if let Some(heading) = page.headings.first().filter(|h| !h.text.is_empty()) {
            return truncate_to_limit(&format!("{} | {brand}", heading.text), TITLE_MAX);
        }
        if let Some(sentence) = sentences(&page.body_text).first() {
            return truncate_to_limit(sentence, TITLE_MAX);
        }
        format!("{brand} - Official Website")
    }

    /// Opening sentences up to the length limit, else generic copy for the domain
    pub(crate) fn suggest_description(page: &PageSnapshot) -> String {
        let mut out = String::new();
        for sentence in sentences(&page.body_text) {
            let candidate = if out.is_empty() {
                format!("{sentence}.")
            } else {
                format!("{out} {sentence}.")
            };
            if char_len(&candidate) > DESCRIPTION_MAX {
                if out.is_empty() {
                    out = truncate_to_limit(&candidate, DESCRIPTION_MAX);
                }
                break;
            }
            out = candidate;
            if char_len(&out) >= DESCRIPTION_MIN {
                break;
            }
        }

        if out.is_empty() {
            let domain = domain_of(&page.url);
            let site = if domain.is_empty() { "this site".to_string() } else { domain };
            return format!(
                "Discover {site}: trusted information, helpful resources and services. Learn more about what we offer today."
            );
        }
        if char_len(&out) < DESCRIPTION_MIN {
            out.push_str(DESCRIPTION_FILLER);
        }
        truncate_to_limit(&out, DESCRIPTION_MAX)
    }

    fn suggest_schema(page: &PageSnapshot) -> String {
        serde_json::json!({
            "@context": "https://schema.org",
            "@type": "WebPage",
            "name": page.title,
            "url": canonical_for(&page.url),
        })
        .to_string()
    }
}

/// The page URL without query string or fragment
pub fn canonical_for(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// Human-readable alt text guessed from an image file name
fn alt_from_src(src: &str) -> String {
    let file = src
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let stem = file.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file);
    let words = stem
        .split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if words.is_empty() {
        "Describe this image".to_string()
    } else {
        crate::text::capitalize(&words)
    }
}
