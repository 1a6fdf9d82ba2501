// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Relevance scoring for raw search hits
//!
//! Score = term overlap (title + snippet) + domain trust + freshness/type
//! bonus, weighted per [`ScoringConfig`] and clamped to [0, 1]. The scorer
//! holds a fixed reference date so the same inputs always score the same.

use chrono::{Duration, NaiveDate};
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

use super::config::ScoringConfig;
use super::types::{ContentKind, RawHit, SearchResult, SearchType};

pub const TRUST_HIGH: f64 = 1.0;
pub const TRUST_DEFAULT: f64 = 0.5;
pub const TRUST_LOW: f64 = 0.2;

/// Deterministic hit scorer
#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
    reference_date: NaiveDate,
}

impl Scorer {
    pub fn new(config: ScoringConfig, reference_date: NaiveDate) -> Self {
        Self {
            config,
            reference_date,
        }
    }

    /// Score one hit against the query terms
    pub fn score(&self, hit: &RawHit, query_terms: &[String], search_type: SearchType) -> f64 {
        let c = &self.config;
        let overlap = term_overlap(hit, query_terms);
        let trust = self.domain_trust(&domain_of(&hit.url));
        let bonus = self.freshness_bonus(hit, search_type);

        let score = c.term_overlap_weight * overlap
            + c.domain_trust_weight * trust
            + c.freshness_weight * bonus;
        score.clamp(0.0, 1.0)
    }

    /// Static trust weight for a host
    pub fn domain_trust(&self, domain: &str) -> f64 {
        let domain = domain.to_lowercase();
        if domain.is_empty() {
            return TRUST_DEFAULT;
        }

        if is_institutional(&domain) {
            return TRUST_HIGH;
        }
        if self
            .config
            .trusted_domains
            .iter()
            .any(|d| domain == *d || domain.ends_with(&format!(".{}", d)))
        {
            return TRUST_HIGH;
        }
        if self
            .config
            .low_quality_patterns
            .iter()
            .any(|p| domain.contains(p.as_str()))
        {
            return TRUST_LOW;
        }
        TRUST_DEFAULT
    }

    fn freshness_bonus(&self, hit: &RawHit, search_type: SearchType) -> f64 {
        let dated = [
            hit.published_date.as_deref().unwrap_or(""),
            &hit.title,
            &hit.snippet,
        ]
        .iter()
        .filter_map(|text| parse_date(text, self.reference_date))
        .any(|date| self.is_recent(date));

        if dated || matches_type_pattern(&hit.url, search_type) {
            1.0
        } else {
            0.0
        }
    }

    fn is_recent(&self, date: NaiveDate) -> bool {
        let age = self.reference_date.signed_duration_since(date);
        age <= Duration::days(self.config.recent_days) && age >= Duration::days(-1)
    }

    /// Score and sort hits
    ///
    /// Order: score desc, then domain trust desc, then URL asc. `rank` keeps
    /// the position the chain produced.
    pub fn rank_results(
        &self,
        hits: Vec<RawHit>,
        query_terms: &[String],
        search_type: SearchType,
    ) -> Vec<SearchResult> {
        let mut scored: Vec<(SearchResult, f64)> = hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| {
                let score = self.score(&hit, query_terms, search_type);
                let source_domain = domain_of(&hit.url);
                let trust = self.domain_trust(&source_domain);
                let content_kind = classify(&hit);
                (
                    SearchResult {
                        url: hit.url,
                        title: hit.title,
                        snippet: hit.snippet,
                        source_domain,
                        rank: i + 1,
                        score,
                        provider: hit.source,
                        published_date: hit.published_date,
                        content_kind,
                    },
                    trust,
                )
            })
            .collect();

        scored.sort_by(|(a, ta), (b, tb)| compare_ranked(a, *ta, b, *tb));
        scored.into_iter().map(|(r, _)| r).collect()
    }
}

/// Ordering used for result lists
pub fn compare_ranked(a: &SearchResult, trust_a: f64, b: &SearchResult, trust_b: f64) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| trust_b.total_cmp(&trust_a))
        .then_with(|| a.url.cmp(&b.url))
}

/// Host of a URL, lower-cased, without "www."
/// `.edu`/`.gov` TLD, or `edu`/`gov` directly under a country code
/// (`gov.uk`, `cs.edu.au`)
fn is_institutional(domain: &str) -> bool {
    let mut labels = domain.rsplit('.');
    let tld = labels.next().unwrap_or_default();
    if matches!(tld, "edu" | "gov") {
        return true;
    }
    tld.len() == 2 && matches!(labels.next(), Some("edu" | "gov"))
}

pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .map(|h| h.strip_prefix("www.").map(str::to_string).unwrap_or(h))
        .unwrap_or_default()
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Fraction of query terms present in title + snippet
pub fn term_overlap(hit: &RawHit, query_terms: &[String]) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let present = tokens(&format!("{} {}", hit.title, hit.snippet));
    let matched = query_terms.iter().filter(|t| present.contains(*t)).count();
    matched as f64 / query_terms.len() as f64
}

fn type_patterns(search_type: SearchType) -> &'static [&'static str] {
    match search_type {
        SearchType::General => &[],
        SearchType::Academic => &[
            "arxiv", "doi.org", ".pdf", "scholar", "research", "journal", "pubmed", "/paper",
        ],
        SearchType::News => &[
            "/news", "news.", "reuters", "apnews", "bbc.", "/article", "/story", "/20",
        ],
        SearchType::Technical => &[
            "docs.", "/docs", "documentation", "tutorial", "/guide", "github.com",
            "stackoverflow.com", "readthedocs",
        ],
    }
}

fn matches_type_pattern(url: &str, search_type: SearchType) -> bool {
    let url = url.to_lowercase();
    type_patterns(search_type).iter().any(|p| url.contains(p))
}

/// Classify what a hit points at from its URL and title
pub fn classify(hit: &RawHit) -> ContentKind {
    let url = hit.url.to_lowercase();
    let title = hit.title.to_lowercase();
    let any = |needles: &[&str], hay: &str| needles.iter().any(|n| hay.contains(n));

    if any(&["pdf", "scholar", "arxiv", "research", "paper"], &url)
        || any(&["research", "paper", "study"], &title)
    {
        ContentKind::Academic
    } else if any(&["news", "cnn", "bbc", "reuters"], &url) || title.contains("news") {
        ContentKind::News
    } else if any(&["youtube", "vimeo", "video"], &url) || title.contains("video") {
        ContentKind::Video
    } else if any(&["docs", "documentation", "tutorial", "guide"], &url)
        || any(&["documentation", "tutorial", "guide"], &title)
    {
        ContentKind::Documentation
    } else if any(&["reddit", "stackoverflow", "forum"], &url) || title.contains("stack") {
        ContentKind::Discussion
    } else {
        ContentKind::General
    }
}

struct DatePatterns {
    relative: Regex,
    iso: Regex,
    slashed: Regex,
    month_name: Regex,
}

fn date_patterns() -> &'static DatePatterns {
    static PATTERNS: OnceLock<DatePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| DatePatterns {
        relative: Regex::new(r"(?i)\b(\d+)\s+(minute|hour|day|week|month|year)s?\s+ago\b")
            .expect("static regex"),
        iso: Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})").expect("static regex"),
        slashed: Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").expect("static regex"),
        month_name: Regex::new(
            r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2}),?\s+(\d{4})\b",
        )
        .expect("static regex"),
    })
}

/// First parseable date in `text`
///
/// Understands "3 days ago", 2024-05-01, 05/01/2024 (month first) and
/// "May 1, 2024".
pub fn parse_date(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }
    let p = date_patterns();

    if let Some(c) = p.relative.captures(text) {
        let n: i64 = c[1].parse().ok()?;
        let days = match c[2].to_lowercase().as_str() {
            "minute" | "hour" => 0,
            "day" => n,
            "week" => n * 7,
            "month" => n * 30,
            _ => n * 365,
        };
        return reference.checked_sub_signed(Duration::days(days));
    }
    if let Some(c) = p.iso.captures(text) {
        return NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?);
    }
    if let Some(c) = p.slashed.captures(text) {
        return NaiveDate::from_ymd_opt(c[3].parse().ok()?, c[1].parse().ok()?, c[2].parse().ok()?);
    }
    if let Some(c) = p.month_name.captures(text) {
        let month = match c[1].to_lowercase().as_str() {
            "jan" => 1,
            "feb" => 2,
            "mar" => 3,
            "apr" => 4,
            "may" => 5,
            "jun" => 6,
            "jul" => 7,
            "aug" => 8,
            "sep" => 9,
            "oct" => 10,
            "nov" => 11,
            _ => 12,
        };
        return NaiveDate::from_ymd_opt(c[3].parse().ok()?, month, c[2].parse().ok()?);
    }
    None
}
