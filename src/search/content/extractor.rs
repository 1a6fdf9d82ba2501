// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTML content extraction
//!
//! Turns raw page bytes into clean main text plus metadata:
//! 1. Reject binary / markup-free input
//! 2. Drop scripts, navigation chrome and ad blocks from visible text
//! 3. Pick the densest outermost content block (article, main, section,
//!    div, td), falling back to `<body>`
//! 4. Title, publish date and author from meta tags
//! 5. Frequency-based extractive summary, keywords and quoted figures

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use super::config::ContentFetchConfig;
use super::summarizer;
use crate::error::{ResearchError, Result};
use crate::search::types::ExtractedContent;

/// Elements whose text never counts as visible content
const DISCARDED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "form", "svg",
    "template", "button",
];

/// Elements that can hold the main content
const CANDIDATE_TAGS: &[&str] = &["article", "main", "section", "div", "td"];

/// class/id tokens that mark advertising or page chrome
const AD_TOKENS: &[&str] = &[
    "ad", "ads", "advert", "advertisement", "sponsor", "sponsored", "promo", "banner", "cookie",
    "consent", "popup", "newsletter", "subscribe",
];

const KEYWORD_COUNT: usize = 10;
const SNIFF_BYTES: usize = 8192;

/// Stateless HTML → [`ExtractedContent`] converter
#[derive(Debug, Clone)]
pub struct Extractor {
    max_text_chars: usize,
    summary_sentences: usize,
    min_block_chars: usize,
    min_text_density: f64,
}

impl Extractor {
    pub fn new(config: &ContentFetchConfig) -> Self {
        Self {
            max_text_chars: config.max_text_chars,
            summary_sentences: config.summary_sentences,
            min_block_chars: config.min_block_chars,
            min_text_density: config.min_text_density,
        }
    }

    /// Extract main text, metadata and summary from a page
    pub fn extract(&self, raw: &[u8], url: &str) -> Result<ExtractedContent> {
        if looks_binary(raw) {
            return Err(ResearchError::ParseError(format!("{} is not HTML", url)));
        }
        let html = String::from_utf8_lossy(raw);
        if !has_markup(&html) {
            return Err(ResearchError::ParseError(format!("{} has no markup", url)));
        }

        let document = Html::parse_document(&html);
        let root = document.root_element();
        let body = select_first(&document, "body").unwrap_or(root);

        let mut candidates = Vec::new();
        self.collect_candidates(body, &mut candidates);
        let main = candidates
            .into_iter()
            .max_by(|a, b| {
                a.density
                    .total_cmp(&b.density)
                    .then(a.chars.cmp(&b.chars))
            });

        let (main_el, full_text) = match main {
            Some(block) => (block.el, block.text),
            None => (body, visible_text(body)),
        };
        if full_text.is_empty() {
            return Err(ResearchError::ParseError(format!(
                "no readable text in {}",
                url
            )));
        }

        let main_text = truncate_chars(&full_text, self.max_text_chars);
        let title = meta_content(&document, "meta[property='og:title']")
            .or_else(|| select_first(&document, "title").map(collapsed_text))
            .filter(|t| !t.is_empty())
            .or_else(|| largest_heading(main_el))
            .unwrap_or_else(|| url.to_string());

        let publish_date = [
            "meta[property='article:published_time']",
            "meta[name='date']",
            "meta[name='pubdate']",
            "meta[itemprop='datePublished']",
            "meta[name='datePublished']",
        ]
        .iter()
        .filter_map(|sel| meta_content(&document, sel))
        .chain(select_first(&document, "time[datetime]").and_then(|t| {
            t.value().attr("datetime").map(str::to_string)
        }))
        .find_map(|raw| parse_timestamp(&raw));

        let author = ["meta[name='author']", "meta[property='article:author']"]
            .iter()
            .find_map(|sel| meta_content(&document, sel))
            .filter(|a| !a.is_empty());

        let summary = summarizer::summarize(&main_text, self.summary_sentences);
        let keywords = summarizer::keywords(&main_text, KEYWORD_COUNT);
        let key_facts = summarizer::key_facts(&main_text);
        let word_count = main_text.split_whitespace().count();

        Ok(ExtractedContent {
            url: url.to_string(),
            title,
            main_text,
            summary,
            publish_date,
            author,
            keywords,
            key_facts,
            word_count,
            extracted_at: Utc::now(),
        })
    }

    /// Outermost candidate blocks with enough text at acceptable density
    ///
    /// A candidate that is too sparse (a layout wrapper) is searched for
    /// denser children instead.
    fn collect_candidates<'a>(&self, el: ElementRef<'a>, out: &mut Vec<Block<'a>>) {
        for child in el.children().filter_map(ElementRef::wrap) {
            if is_discarded(&child) {
                continue;
            }
            let name = child.value().name();
            if CANDIDATE_TAGS.contains(&name) {
                let text = visible_text(child);
                let chars = text.chars().count();
                if chars < self.min_block_chars {
                    continue;
                }
                let density = chars as f64 / child.html().len().max(1) as f64;
                if density >= self.min_text_density {
                    out.push(Block {
                        el: child,
                        text,
                        chars,
                        density,
                    });
                    continue;
                }
            }
            self.collect_candidates(child, out);
        }
    }
}

struct Block<'a> {
    el: ElementRef<'a>,
    text: String,
    chars: usize,
    density: f64,
}

fn looks_binary(raw: &[u8]) -> bool {
    let head = &raw[..raw.len().min(SNIFF_BYTES)];
    head.contains(&0)
        || head.starts_with(b"%PDF-")
        || head.starts_with(b"\x89PNG")
        || head.starts_with(b"\xff\xd8\xff")
        || head.starts_with(b"GIF8")
        || head.starts_with(b"PK\x03\x04")
}

fn has_markup(text: &str) -> bool {
    text.as_bytes()
        .windows(2)
        .any(|w| w[0] == b'<' && (w[1].is_ascii_alphabetic() || w[1] == b'!'))
}

fn is_discarded(el: &ElementRef) -> bool {
    let value = el.value();
    if DISCARDED_TAGS.contains(&value.name()) {
        return true;
    }
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    [value.attr("class"), value.attr("id")]
        .into_iter()
        .flatten()
        .flat_map(|s| s.split(|c: char| c.is_whitespace() || c == '-' || c == '_'))
        .any(|token| AD_TOKENS.contains(&token.to_ascii_lowercase().as_str()))
}

/// Visible text of an element with discarded subtrees skipped
pub fn visible_text(el: ElementRef) -> String {
    let mut parts = Vec::new();
    push_visible(el, &mut parts);
    parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_visible<'a>(el: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if !is_discarded(&child_el) {
                push_visible(child_el, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push(&**text);
        }
    }
}

fn collapsed_text(el: ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    select_first(document, selector)
        .and_then(|m| m.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn largest_heading(el: ElementRef) -> Option<String> {
    ["h1", "h2", "h3", "h4", "h5", "h6"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        el.select(&selector)
            .map(collapsed_text)
            .find(|t| !t.is_empty())
    })
}

/// Parse the timestamp formats found in publish-date meta tags
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Truncate to at most `max_chars` characters, preferring a word boundary
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            let cut = &text[..byte_idx];
            match cut.rfind(' ') {
                Some(space) if space > 0 => cut[..space].to_string(),
                _ => cut.to_string(),
            }
        }
    }
}
