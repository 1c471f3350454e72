use crate::error::ParseError;
use crate::models::{Heading, Image, OpenGraphTags, PageSnapshot};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

// Cached selectors
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("title selector should be valid"));
static META_DESC_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("meta[name='description']").expect("meta description selector should be valid")
});
static CANONICAL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("link[rel='canonical']").expect("canonical selector should be valid")
});
static OG_TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("meta[property='og:title']").expect("og:title selector should be valid")
});
static OG_DESC_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("meta[property='og:description']")
        .expect("og:description selector should be valid")
});
static OG_IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("meta[property='og:image']").expect("og:image selector should be valid")
});
static TWITTER_CARD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("meta[name='twitter:card']").expect("twitter:card selector should be valid")
});
static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6").expect("heading selector should be valid")
});
static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("img selector should be valid"));
static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("a[href] selector should be valid"));
static LD_JSON_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script[type='application/ld+json']")
        .expect("ld+json selector should be valid")
});
static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("body selector should be valid"));

/// Elements whose text never counts as visible body copy
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

pub struct Extractor;

impl Extractor {
    /// Builds a snapshot from raw markup. Missing elements yield empty defaults.
    pub fn extract(html: &str, url: &str) -> PageSnapshot {
        let document = Html::parse_document(html);

        let body_text = Self::extract_body_text(&document);
        let word_count = body_text.split_whitespace().count();
        let links = Self::extract_links(&document);
        let internal_links = links
            .iter()
            .filter(|href| is_internal_href(href))
            .cloned()
            .collect();

        PageSnapshot {
            url: url.to_string(),
            title: Self::extract_title(&document),
            description: attr_of_first(&document, &META_DESC_SELECTOR, "content"),
            canonical: attr_of_first(&document, &CANONICAL_SELECTOR, "href"),
            open_graph: OpenGraphTags {
                title: attr_of_first(&document, &OG_TITLE_SELECTOR, "content"),
                description: attr_of_first(&document, &OG_DESC_SELECTOR, "content"),
                image: attr_of_first(&document, &OG_IMAGE_SELECTOR, "content"),
            },
            twitter_card: attr_of_first(&document, &TWITTER_CARD_SELECTOR, "content"),
            headings: Self::extract_headings(&document),
            images: Self::extract_images(&document),
            body_text,
            word_count,
            links,
            internal_links,
            structured_data: Self::extract_structured_data(&document),
        }
    }

    fn extract_title(document: &Html) -> String {
        document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    }

    fn extract_headings(document: &Html) -> Vec<Heading> {
        document
            .select(&HEADING_SELECTOR)
            .filter_map(|el| {
                let level = el.value().name().strip_prefix('h')?.parse::<u8>().ok()?;
                Some(Heading {
                    level,
                    text: collapse_whitespace(&el.text().collect::<String>()),
                })
            })
            .collect()
    }

    fn extract_images(document: &Html) -> Vec<Image> {
        document
            .select(&IMG_SELECTOR)
            .map(|el| Image {
                src: el.value().attr("src").unwrap_or_default().trim().to_string(),
                alt: el.value().attr("alt").unwrap_or_default().trim().to_string(),
            })
            .collect()
    }

    fn extract_links(document: &Html) -> Vec<String> {
        document
            .select(&ANCHOR_SELECTOR)
            .filter_map(|el| el.value().attr("href"))
            .map(|href| href.trim().to_string())
            .collect()
    }

    fn extract_body_text(document: &Html) -> String {
        let root = document
            .select(&BODY_SELECTOR)
            .next()
            .unwrap_or_else(|| document.root_element());
        visible_text(root)
    }

    fn extract_structured_data(document: &Html) -> Vec<serde_json::Value> {
        document
            .select(&LD_JSON_SELECTOR)
            .filter_map(|el| {
                let raw = el.text().collect::<String>();
                match parse_structured_data(&raw) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::debug!(error = %e, "Dropping structured data block");
                        None
                    }
                }
            })
            .collect()
    }
}

/// An href is internal unless it is an absolute http(s), mailto: or tel: link.
/// Fragment-only and malformed hrefs therefore count as internal.
pub fn is_internal_href(href: &str) -> bool {
    !(href.starts_with("http") || href.starts_with("mailto:") || href.starts_with("tel:"))
}

fn parse_structured_data(raw: &str) -> Result<serde_json::Value, ParseError> {
    Ok(serde_json::from_str(raw.trim())?)
}

fn attr_of_first(document: &Html, selector: &Selector, attr: &str) -> String {
    document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut words: Vec<&str> = Vec::new();
    for node in root.descendants() {
        if let Node::Text(text) = node.value() {
            let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
                Node::Element(el) => NON_CONTENT_TAGS.contains(&el.name()),
                _ => false,
            });
            if !hidden {
                words.extend(text.split_whitespace());
            }
        }
    }
    words.join(" ")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
