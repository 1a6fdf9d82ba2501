// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Frequency-based extractive summaries, keywords and key facts

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::search::types::KeyFacts;

/// Words shorter than this never count as keywords
const MIN_WORD_CHARS: usize = 4;

const MAX_FACT_NUMBERS: usize = 10;
const MAX_FACT_DATES: usize = 5;

const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "also", "among", "because", "been", "before",
    "being", "below", "between", "both", "could", "does", "doing", "down", "during", "each",
    "even", "from", "further", "have", "having", "here", "herself", "himself", "into", "itself",
    "just", "like", "made", "make", "many", "might", "more", "most", "much", "must", "only",
    "other", "ourselves", "over", "said", "same", "says", "should", "some", "such", "than",
    "that", "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this",
    "those", "through", "under", "until", "upon", "very", "were", "what", "when", "where",
    "which", "while", "whom", "whose", "will", "with", "within", "without", "would", "your",
    "yours", "yourself",
];

fn is_content_word(word: &str) -> bool {
    word.chars().count() >= MIN_WORD_CHARS
        && !word.chars().all(|c| c.is_ascii_digit())
        && !STOPWORDS.contains(&word)
}

/// Lower-cased content words of `text`, in order
pub fn content_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| is_content_word(w))
        .collect()
}

/// Occurrence count of every content word
pub fn word_frequencies(text: &str) -> HashMap<String, usize> {
    let mut freq = HashMap::new();
    for word in content_words(text) {
        *freq.entry(word).or_insert(0) += 1;
    }
    freq
}

/// Split prose into sentences on `.`, `!` or `?` followed by whitespace
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().map_or(true, |next| next.is_whitespace());
        if boundary {
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);

    sentences
}

fn push_sentence(out: &mut Vec<String>, raw: &str) {
    let sentence = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if sentence.chars().any(char::is_alphanumeric) {
        out.push(sentence);
    }
}

/// Pick the `k` highest scoring sentences, kept in document order
///
/// A sentence scores the summed document frequency of its content words.
pub fn summarize(text: &str, k: usize) -> String {
    let sentences = split_sentences(text);
    if sentences.len() <= k {
        return sentences.join(" ");
    }

    let freq = word_frequencies(text);
    let mut scored: Vec<(usize, usize)> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let score = content_words(s)
                .iter()
                .map(|w| freq.get(w).copied().unwrap_or(0))
                .sum();
            (i, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let mut chosen: Vec<usize> = scored.into_iter().take(k).map(|(i, _)| i).collect();
    chosen.sort_unstable();

    chosen
        .into_iter()
        .map(|i| sentences[i].as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The `n` most frequent content words, most frequent first
pub fn keywords(text: &str, n: usize) -> Vec<String> {
    let mut ranked: Vec<(String, usize)> = word_frequencies(text).into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(n).map(|(w, _)| w).collect()
}

struct FactPatterns {
    date: Regex,
    number: Regex,
}

fn fact_patterns() -> &'static FactPatterns {
    static PATTERNS: OnceLock<FactPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| FactPatterns {
        date: Regex::new(r"\b\d{1,2}/\d{1,2}/\d{4}\b|\b\d{4}-\d{2}-\d{2}\b").expect("static regex"),
        number: Regex::new(r"\b\d+(?:,\d{3})*(?:\.\d+)?\b").expect("static regex"),
    })
}

/// Distinct numbers and dates quoted in `text`, in order of appearance
///
/// Digits that are part of a date are not repeated as numbers.
pub fn key_facts(text: &str) -> KeyFacts {
    let patterns = fact_patterns();
    let date_spans: Vec<_> = patterns.date.find_iter(text).map(|m| m.range()).collect();

    let mut dates: Vec<String> = Vec::new();
    for span in &date_spans {
        push_distinct(&mut dates, &text[span.clone()], MAX_FACT_DATES);
    }

    let mut numbers: Vec<String> = Vec::new();
    for m in patterns.number.find_iter(text) {
        let in_date = date_spans
            .iter()
            .any(|span| span.start <= m.start() && m.end() <= span.end);
        if !in_date {
            push_distinct(&mut numbers, m.as_str(), MAX_FACT_NUMBERS);
        }
    }

    KeyFacts { numbers, dates }
}

fn push_distinct(out: &mut Vec<String>, value: &str, cap: usize) {
    if out.len() < cap && !out.iter().any(|v| v == value) {
        out.push(value.to_string());
    }
}
