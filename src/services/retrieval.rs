//! Lexical retrieval of page-tagged chunks for question answering.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::SourceDocument;

/// Page text split into chunks of roughly `chunk_chars`, on line boundaries.
/// Pages are 1-based in the returned documents.
pub fn chunk_pages(page_texts: &[String], chunk_chars: usize) -> Vec<SourceDocument> {
    let mut chunks = Vec::new();
    for (index, text) in page_texts.iter().enumerate() {
        let page = Some((index + 1) as u32);
        let mut current = String::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if !current.is_empty() && current.len() + line.len() + 1 > chunk_chars {
                chunks.push(SourceDocument::new(std::mem::take(&mut current), page));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(line);
        }
        if !current.is_empty() {
            chunks.push(SourceDocument::new(current, page));
        }
    }
    chunks
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 3)
        .map(|t| t.to_lowercase())
        .collect()
}

fn score(query_terms: &[String], chunk: &str) -> f32 {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for term in terms(chunk) {
        *counts.entry(term).or_insert(0) += 1;
    }
    query_terms
        .iter()
        .map(|t| (*counts.get(t).unwrap_or(&0) as f32).ln_1p())
        .sum()
}

/// Top `top_k` chunks by query-term frequency, best first. When no chunk
/// shares a term with the question the leading chunks are returned so the
/// model still sees some of the document.
pub fn retrieve(
    question: &str,
    page_texts: &[String],
    top_k: usize,
    chunk_chars: usize,
) -> Vec<SourceDocument> {
    let chunks = chunk_pages(page_texts, chunk_chars);
    let mut query_terms = terms(question);
    query_terms.sort();
    query_terms.dedup();

    let mut ranked: Vec<(usize, f32)> = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| (i, score(&query_terms, &chunk.page_content)))
        .filter(|(_, s)| *s > 0.0)
        .collect();

    if ranked.is_empty() {
        return chunks.into_iter().take(top_k).collect();
    }

    // Stable: equal scores keep document order.
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked
        .into_iter()
        .take(top_k)
        .map(|(i, _)| chunks[i].clone())
        .collect()
}
