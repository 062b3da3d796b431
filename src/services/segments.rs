//! Expansion of excerpts into ranked search strings.
//!
//! Model excerpts rarely match the page byte for byte, so each one is
//! searched as a whole, sentence by sentence, and as sliding word windows.
//! Longer strings are tried first.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::HighlightConfig;

static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// A search string and the excerpt it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    /// First excerpt (input order) that produced this string.
    pub excerpt: String,
}

/// Split text on `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    SENTENCE_BREAK
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Sliding windows of `size` words, advancing one word at a time.
pub fn word_windows(sentence: &str, size: usize) -> Vec<String> {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    if size == 0 || words.len() < size {
        return Vec::new();
    }
    words.windows(size).map(|w| w.join(" ")).collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Build the deduplicated, longest-first segment list for a set of excerpts.
pub fn build_segments(excerpts: &[String], config: &HighlightConfig) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    let mut push = |text: String, excerpt: &str| {
        if seen.contains_key(&text) {
            return;
        }
        seen.insert(text.clone(), segments.len());
        segments.push(Segment {
            text,
            excerpt: excerpt.to_string(),
        });
    };

    for excerpt in excerpts {
        let trimmed = excerpt.trim();
        if char_len(trimmed) <= config.min_excerpt_chars {
            tracing::debug!("Skipping short excerpt {:?}", trimmed);
            continue;
        }
        push(trimmed.to_string(), excerpt);

        for sentence in split_sentences(trimmed) {
            if char_len(sentence) <= config.min_excerpt_chars {
                continue;
            }
            push(sentence.to_string(), excerpt);

            for &size in &config.window_sizes {
                for window in word_windows(sentence, size) {
                    if char_len(&window) > config.min_window_chars {
                        push(window, excerpt);
                    }
                }
            }
        }
    }

    // Stable: equal lengths keep first appearance.
    segments.sort_by_key(|s| std::cmp::Reverse(char_len(&s.text)));

    if segments.len() > config.max_segments {
        tracing::debug!(
            "Capping {} segments at {}",
            segments.len(),
            config.max_segments
        );
        segments.truncate(config.max_segments);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excerpts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("One thing. Another thing! A third? Last"),
            vec!["One thing", "Another thing", "A third", "Last"]
        );
        // No whitespace after the stop: not a boundary
        assert_eq!(split_sentences("version 1.2 shipped."), vec!["version 1.2 shipped."]);
    }

    #[test]
    fn test_word_windows() {
        let windows = word_windows("a b c d e f g h", 6);
        assert_eq!(windows, vec!["a b c d e f", "b c d e f g", "c d e f g h"]);
        assert!(word_windows("too few words", 6).is_empty());
    }

    #[test]
    fn test_short_excerpt_skipped() {
        let config = HighlightConfig::default();
        // 15 chars exactly: not longer than the minimum
        assert!(build_segments(&excerpts(&["fifteen chars!!"]), &config).is_empty());
        assert!(build_segments(&excerpts(&["", "   "]), &config).is_empty());
    }

    #[test]
    fn test_single_sentence_collapses() {
        let config = HighlightConfig::default();
        let segments = build_segments(
            &excerpts(&["  Viruses cannot reproduce independently.  "]),
            &config,
        );
        // Sentence equals the whole excerpt; four words make no 6-word window
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Viruses cannot reproduce independently.");
        assert_eq!(segments[0].excerpt, "  Viruses cannot reproduce independently.  ");
    }

    #[test]
    fn test_segments_sorted_longest_first() {
        let config = HighlightConfig::default();
        let excerpt = "Cells divide by mitosis in most tissues. Meiosis produces the gametes we inherit.";
        let segments = build_segments(&excerpts(&[excerpt]), &config);

        assert_eq!(segments[0].text, excerpt);
        for pair in segments.windows(2) {
            assert!(char_len(&pair[0].text) >= char_len(&pair[1].text));
        }
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert!(texts.contains(&"Cells divide by mitosis in most tissues"));
        assert!(texts.contains(&"Meiosis produces the gametes we inherit."));
        assert!(texts.contains(&"Cells divide by mitosis in most"));
        // Windows must render longer than 20 chars
        assert!(segments.iter().all(|s| char_len(&s.text) > 20));
    }

    #[test]
    fn test_dedup_keeps_first_parent() {
        let config = HighlightConfig::default();
        let shared = "The membrane controls what enters the cell";
        let segments = build_segments(
            &excerpts(&[shared, &format!("Intro sentence here. {}", shared)]),
            &config,
        );
        let hit: Vec<&Segment> = segments.iter().filter(|s| s.text == shared).collect();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].excerpt, shared);
    }

    #[test]
    fn test_equal_length_ties_keep_input_order() {
        let config = HighlightConfig::default();
        let segments = build_segments(
            &excerpts(&["aaaaaaaaaaaaaaaaaaaa", "bbbbbbbbbbbbbbbbbbbb"]),
            &config,
        );
        assert_eq!(segments[0].text, "aaaaaaaaaaaaaaaaaaaa");
        assert_eq!(segments[1].text, "bbbbbbbbbbbbbbbbbbbb");
    }

    #[test]
    fn test_segment_cap() {
        let config = HighlightConfig {
            max_segments: 3,
            ..Default::default()
        };
        let excerpt = "one two three four five six seven eight nine ten eleven twelve";
        let segments = build_segments(&excerpts(&[excerpt]), &config);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text, excerpt);
    }

    #[test]
    fn test_richer_window_sizes() {
        let config = HighlightConfig {
            window_sizes: (6..=12).collect(),
            ..Default::default()
        };
        let excerpt = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu nu";
        let segments = build_segments(&excerpts(&[excerpt]), &config);
        assert!(segments
            .iter()
            .any(|s| s.text == "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu"));
    }
}
