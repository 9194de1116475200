//! Pull a JSON document out of free-form LLM replies.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

fn fenced_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?(.+)```").expect("valid fenced block regex"))
}

fn inline_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`(.+)`").expect("valid inline span regex"))
}

/// Returns the most likely JSON slice of `text`: the body of a fenced code
/// block, else an inline code span, else the text without surrounding backticks.
pub fn extract_json_str(text: &str) -> &str {
    if let Some(caps) = fenced_block().captures(text) {
        if let Some(body) = caps.get(1) {
            return body.as_str();
        }
    }

    if let Some(caps) = inline_span().captures(text) {
        if let Some(body) = caps.get(1) {
            return body.as_str();
        }
    }

    text.trim_matches('`')
}

pub fn extract_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    let json_str = extract_json_str(text).trim();
    if json_str.is_empty() {
        return None;
    }

    match serde_json::from_str::<T>(json_str) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                json_str = %json_str,
                target_type = std::any::type_name::<T>(),
                "Failed to validate JSON: {}",
                e
            );
            None
        }
    }
}
