// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cross-source summary aggregation
//!
//! Merges the extractive summaries of several pages into one cited report.
//! Near-duplicate sentences from different sources collapse into a single
//! key point; points backed by more sources rank higher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{ResearchError, Result};
use crate::search::types::ExtractedContent;

const COMMON_KEYWORD_COUNT: usize = 10;

/// Aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Word-set Jaccard similarity above which two sentences are the same point
    pub similarity_threshold: f64,
    pub max_key_points: usize,
    /// Key points joined into the synthesized summary
    pub summary_points: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.6,
            max_key_points: 10,
            summary_points: 5,
        }
    }
}

impl AggregationConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err("similarity_threshold must be between 0 and 1".to_string());
        }
        if self.max_key_points == 0 || self.summary_points == 0 {
            return Err("max_key_points and summary_points must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Extracted page together with the score of the search hit it came from
#[derive(Debug, Clone)]
pub struct ScoredContent {
    pub content: ExtractedContent,
    pub score: f64,
}

/// Source cited by a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitedSource {
    pub url: String,
    pub title: String,
    pub score: f64,
    pub word_count: usize,
}

/// Source dropped from a report, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedSource {
    pub url: String,
    pub reason: String,
}

/// Multi-source research report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchReport {
    pub topic: String,
    /// Cited sources, highest score first
    pub sources: Vec<CitedSource>,
    pub synthesized_summary: String,
    pub key_points: Vec<String>,
    /// Page keywords shared by several sources, most widely shared first
    #[serde(default)]
    pub common_keywords: Vec<String>,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedSource>,
    pub total_words: usize,
}

struct KeyPoint {
    text: String,
    words: HashSet<String>,
    sources: HashSet<usize>,
}

/// Merges extracted sources into a [`ResearchReport`]
#[derive(Debug, Clone, Default)]
pub struct SummaryAggregator {
    config: AggregationConfig,
}

impl SummaryAggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    /// Build a report from `sources`
    ///
    /// Fails with `InsufficientSources` when there is nothing to cite.
    pub fn aggregate(&self, topic: &str, mut sources: Vec<ScoredContent>) -> Result<ResearchReport> {
        if sources.is_empty() {
            return Err(ResearchError::InsufficientSources(format!(
                "no usable sources for '{}'",
                topic
            )));
        }

        sources.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.content.url.cmp(&b.content.url))
        });

        let mut points: Vec<KeyPoint> = Vec::new();
        for (idx, source) in sources.iter().enumerate() {
            let mut sentences = source.content.summary_sentences();
            if sentences.is_empty() {
                sentences.push(source.content.title.clone());
            }

            for sentence in sentences {
                let words = word_set(&sentence);
                if words.is_empty() {
                    continue;
                }
                match points
                    .iter_mut()
                    .find(|p| jaccard(&p.words, &words) > self.config.similarity_threshold)
                {
                    Some(point) => {
                        point.sources.insert(idx);
                    }
                    None => points.push(KeyPoint {
                        text: sentence,
                        words,
                        sources: HashSet::from([idx]),
                    }),
                }
            }
        }

        // stable sort keeps first appearance as the tie-break
        points.sort_by(|a, b| b.sources.len().cmp(&a.sources.len()));
        let key_points: Vec<String> = points
            .into_iter()
            .take(self.config.max_key_points)
            .map(|p| p.text)
            .collect();

        let synthesized_summary = key_points
            .iter()
            .take(self.config.summary_points)
            .map(|p| terminate(p))
            .collect::<Vec<_>>()
            .join(" ");

        let common_keywords = common_keywords(&sources);
        let total_words = sources.iter().map(|s| s.content.word_count).sum();
        let cited = sources
            .into_iter()
            .map(|s| CitedSource {
                url: s.content.url,
                title: s.content.title,
                score: s.score,
                word_count: s.content.word_count,
            })
            .collect();

        Ok(ResearchReport {
            topic: topic.to_string(),
            sources: cited,
            synthesized_summary,
            key_points,
            common_keywords,
            generated_at: Utc::now(),
            skipped: Vec::new(),
            total_words,
        })
    }
}

/// Keywords named by at least two sources (any, for a single source),
/// ranked by how many sources name them, then by best keyword position
fn common_keywords(sources: &[ScoredContent]) -> Vec<String> {
    let mut tally: HashMap<&str, (usize, usize)> = HashMap::new();
    for source in sources {
        let mut named = HashSet::new();
        for (pos, keyword) in source.content.keywords.iter().enumerate() {
            if named.insert(keyword.as_str()) {
                let (count, best) = tally.entry(keyword.as_str()).or_insert((0, pos));
                *count += 1;
                *best = (*best).min(pos);
            }
        }
    }

    let shared_by = if sources.len() > 1 { 2 } else { 1 };
    let mut ranked: Vec<(&str, (usize, usize))> = tally
        .into_iter()
        .filter(|(_, (count, _))| *count >= shared_by)
        .collect();
    ranked.sort_by(|a, b| {
        b.1 .0
            .cmp(&a.1 .0)
            .then(a.1 .1.cmp(&b.1 .1))
            .then_with(|| a.0.cmp(b.0))
    });
    ranked
        .into_iter()
        .take(COMMON_KEYWORD_COUNT)
        .map(|(keyword, _)| keyword.to_string())
        .collect()
}

fn word_set(sentence: &str) -> HashSet<String> {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// |A ∩ B| / |A ∪ B|
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn terminate(sentence: &str) -> String {
    let trimmed = sentence.trim();
    if trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{}.", trimmed)
    }
}
