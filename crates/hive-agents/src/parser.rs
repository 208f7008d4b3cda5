use hive_models::opinion::clamp_finite;
use serde_json::Value;

use crate::brain::{MarketAnalysis, PostEvaluation};
use crate::error::AgentError;

/// Extract the first JSON object or array from text that may surround it.
///
/// Handles clean JSON, markdown-fenced blocks and leading prose.
pub fn extract_json(text: &str) -> Result<String, AgentError> {
    let trimmed = text.trim();

    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<Value>(trimmed).is_ok()
    {
        return Ok(trimmed.to_string());
    }

    if let Some(json_str) = extract_from_markdown_block(trimmed) {
        if serde_json::from_str::<Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    if let Some(json_str) = extract_first_value(trimmed) {
        if serde_json::from_str::<Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    Err(AgentError::Parse(format!(
        "No valid JSON found in response (length={})",
        text.len()
    )))
}

fn extract_from_markdown_block(text: &str) -> Option<String> {
    let start_markers = ["```json\n", "```json\r\n", "```\n", "```\r\n"];

    for marker in &start_markers {
        if let Some(start) = text.find(marker) {
            let body = start + marker.len();
            if let Some(end) = text[body..].find("```") {
                return Some(text[body..body + end].trim().to_string());
            }
        }
    }

    None
}

/// Find the first balanced `{...}` or `[...]`, ignoring brackets inside strings.
fn extract_first_value(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' if start.is_some() => in_string = !in_string,
            '{' | '[' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' | ']' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(text[s..=i].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// The list of items in a response: a bare array, an object wrapping one
/// under `key`, or a single object.
fn items(value: Value, key: &str) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            Some(_) => vec![],
            None => vec![Value::Object(map)],
        },
        _ => vec![],
    }
}

/// Numbers may arrive as JSON numbers or numeric strings; anything else is 0.
fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn normalize_token(raw: &str) -> Option<String> {
    let token = raw.trim().trim_start_matches('$').to_ascii_uppercase();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Parse market analyses. Entries without a token are dropped; sentiment
/// and confidence are clamped into range.
pub fn parse_analyses(raw: &str) -> Result<Vec<MarketAnalysis>, AgentError> {
    let value: Value = serde_json::from_str(&extract_json(raw)?)?;

    let analyses = items(value, "analyses")
        .into_iter()
        .filter_map(|item| {
            let token = item.get("token").and_then(Value::as_str).and_then(normalize_token)?;
            Some(MarketAnalysis {
                token,
                sentiment: clamp_finite(number(item.get("sentiment")), -1.0, 1.0),
                confidence: clamp_finite(number(item.get("confidence")), 0.0, 1.0),
                key_factors: item
                    .get("keyFactors")
                    .and_then(Value::as_array)
                    .map(|arr| {
                        arr.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                reasoning: text(item.get("reasoning")),
            })
        })
        .collect();

    Ok(analyses)
}

/// Parse post evaluations. Entries without a post id are dropped.
pub fn parse_evaluations(raw: &str) -> Result<Vec<PostEvaluation>, AgentError> {
    let value: Value = serde_json::from_str(&extract_json(raw)?)?;

    let evaluations = items(value, "evaluations")
        .into_iter()
        .filter_map(|item| {
            let post_id = match item.get("postId").or_else(|| item.get("tweetId")) {
                Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return None,
            };
            Some(PostEvaluation {
                post_id,
                agree: item.get("agree").and_then(Value::as_bool).unwrap_or(false),
                strength: clamp_finite(number(item.get("strength")), 0.0, 1.0),
                should_respond: item
                    .get("shouldRespond")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                reason: text(item.get("reason")),
            })
        })
        .collect();

    Ok(evaluations)
}
