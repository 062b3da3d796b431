//! Citation injection: rewrites answer prose with `(page N)` references.
//!
//! The citation text is a wire contract with the renderer, which turns
//! `(page N)` and `(pages N, M)` into navigation controls.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::HighlightConfig;
use crate::models::PageMapping;

static CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(pages? (\d+(?:, \d+)*)\)").unwrap());

/// Render ` (page N)` or ` (pages N, M)` for ascending `pages`.
pub fn format_citation(pages: &[u32]) -> String {
    match pages {
        [] => String::new(),
        [page] => format!(" (page {})", page),
        _ => format!(
            " (pages {})",
            pages
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Page numbers cited in `text`, ascending and deduplicated.
pub fn cited_pages(text: &str) -> Vec<u32> {
    let mut pages: Vec<u32> = CITATION
        .captures_iter(text)
        .flat_map(|caps| {
            caps[1]
                .split(", ")
                .filter_map(|p| p.parse().ok())
                .collect::<Vec<u32>>()
        })
        .collect();
    pages.sort_unstable();
    pages.dedup();
    pages
}

/// Lowercased words longer than `min_len` chars, edge punctuation removed.
fn significant_words(text: &str, min_len: usize) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.chars().count() > min_len)
        .collect()
}

fn prefix(word: &str, len: usize) -> Option<&str> {
    word.char_indices()
        .nth(len)
        .map(|(i, _)| &word[..i])
        .or_else(|| (word.chars().count() == len).then_some(word))
}

fn related(a: &str, b: &str, prefix_len: usize) -> bool {
    if a.contains(b) || b.contains(a) {
        return true;
    }
    matches!((prefix(a, prefix_len), prefix(b, prefix_len)), (Some(pa), Some(pb)) if pa == pb)
}

/// Best fuzzy match for `excerpt` among `mappings`, by related-word count.
fn fuzzy_match<'a>(
    excerpt: &str,
    mappings: &'a [PageMapping],
    config: &HighlightConfig,
) -> Option<&'a PageMapping> {
    let words = significant_words(excerpt, config.fuzzy_min_word_len);
    if words.is_empty() {
        return None;
    }

    let mut best: Option<(&PageMapping, usize)> = None;
    for mapping in mappings {
        let candidate = significant_words(&mapping.excerpt, config.fuzzy_min_word_len);
        if candidate.is_empty() {
            continue;
        }
        let matches = words
            .iter()
            .filter(|w| {
                candidate
                    .iter()
                    .any(|c| related(w, c, config.fuzzy_prefix_len))
            })
            .count();
        let needed = (config.fuzzy_min_matches as f64)
            .max(config.fuzzy_ratio * words.len().min(candidate.len()) as f64);
        if (matches as f64) < needed {
            continue;
        }
        if best.map_or(true, |(_, count)| matches > count) {
            best = Some((mapping, matches));
        }
    }
    best.map(|(mapping, _)| mapping)
}

/// Pages for the excerpt at `index`: exact, then fuzzy, then positional.
pub fn resolve_pages<'a>(
    index: usize,
    excerpt: &str,
    mappings: &'a [PageMapping],
    config: &HighlightConfig,
) -> Option<&'a PageMapping> {
    mappings
        .iter()
        .find(|m| m.excerpt == excerpt)
        .or_else(|| fuzzy_match(excerpt, mappings, config))
        .or_else(|| mappings.get(index))
}

/// Leading characters, text before the first `.`, and before the first `,`.
fn key_phrases(excerpt: &str, config: &HighlightConfig) -> Vec<String> {
    let excerpt = excerpt.trim();
    let lead: String = excerpt.chars().take(config.key_phrase_chars).collect();
    let candidates = [
        lead.as_str(),
        excerpt.split('.').next().unwrap_or(""),
        excerpt.split(',').next().unwrap_or(""),
    ];

    let mut phrases: Vec<String> = Vec::new();
    for phrase in candidates {
        let phrase = phrase.trim();
        if phrase.chars().count() > config.key_phrase_min_chars
            && !phrases.iter().any(|p| p == phrase)
        {
            phrases.push(phrase.to_string());
        }
    }
    phrases
}

fn key_words(excerpt: &str, config: &HighlightConfig) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for phrase in key_phrases(excerpt, config) {
        for word in phrase
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| w.chars().count() > config.fuzzy_min_word_len)
            .take(config.key_words_per_phrase)
        {
            if !words.iter().any(|w| w == word) {
                words.push(word.to_string());
            }
        }
    }
    words
}

/// Append `citation` to every uncited sentence containing `word`.
fn cite_sentences(text: &str, word: &str, citation: &str) -> String {
    let pattern = format!(r"(?i)([^.!?]*{}[^.!?]*)([.!?]|$)", regex::escape(word));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            tracing::debug!("Skipping key word {:?}: {}", word, e);
            return text.to_string();
        }
    };

    re.replace_all(text, |caps: &Captures| {
        let span = &caps[1];
        if span.contains("(page") {
            caps[0].to_string()
        } else {
            format!("{}{}{}", span.trim_end(), citation, &caps[2])
        }
    })
    .into_owned()
}

/// Rewrite `answer` so sentences supported by located excerpts carry page
/// citations. Best effort: excerpts that resolve to no pages, or whose key
/// words do not occur in the answer, leave it untouched. Running this on
/// its own output changes nothing.
pub fn inject_citations(
    answer: &str,
    excerpts: &[String],
    mappings: &[PageMapping],
    config: &HighlightConfig,
) -> String {
    let mut text = answer.to_string();
    if mappings.is_empty() {
        return text;
    }

    for (index, excerpt) in excerpts.iter().enumerate() {
        let Some(mapping) = resolve_pages(index, excerpt, mappings, config) else {
            continue;
        };
        if mapping.pages.is_empty() {
            continue;
        }
        let citation = format_citation(&mapping.pages);
        for word in key_words(excerpt, config) {
            text = cite_sentences(&text, &word, &citation);
        }
    }
    text
}
