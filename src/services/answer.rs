//! Normalization of raw model output into an answer and its excerpts.

use serde_json::Value;

use crate::models::ModelAnswer;

/// Split a period-joined source string into excerpts.
pub fn split_sources(sources: &str) -> Vec<String> {
    sources
        .split(". ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Remove a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn sources_from_value(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => split_sources(s),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse `{"answer": ..., "sources": ...}` from model output.
///
/// Tolerates code fences and prose around the object. Returns `None` when
/// no object with a string `answer` can be found.
pub fn try_parse_model_output(raw: &str) -> Option<ModelAnswer> {
    let text = strip_code_fence(raw);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let value: Value = serde_json::from_str(&text[start..=end]).ok()?;
    let answer = value.get("answer")?.as_str()?.trim().to_string();
    Some(ModelAnswer {
        answer,
        sources: sources_from_value(value.get("sources")),
    })
}

/// Parse model output, never failing: malformed output becomes the answer
/// with no sources.
pub fn parse_model_output(raw: &str) -> ModelAnswer {
    try_parse_model_output(raw).unwrap_or_else(|| {
        tracing::info!("Model output is not structured JSON; using raw text as answer");
        ModelAnswer {
            answer: raw.trim().to_string(),
            sources: Vec::new(),
        }
    })
}
