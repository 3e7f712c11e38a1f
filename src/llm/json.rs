//! Cleanup and parsing of JSON returned by the model
//!
//! Models are told to answer with bare JSON but regularly wrap it in
//! Markdown fences or add a sentence around it.

use crate::error::{PipelineError, Result};
use crate::pipeline::PassName;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
});

/// Remove Markdown code fences around a JSON payload
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some(captures) = FENCED_BLOCK.captures(trimmed) {
        if let Some(body) = captures.get(1) {
            return body.as_str().trim().to_string();
        }
    }

    // Unterminated fence: drop the opening line and any stray backticks
    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
        return body.trim_end_matches('`').trim().to_string();
    }

    trimmed.to_string()
}

/// Narrow text to the outermost JSON object or array when prose surrounds it
fn isolate_json(text: &str) -> &str {
    if text.starts_with('{') || text.starts_with('[') {
        return text;
    }

    let object = text.find('{').zip(text.rfind('}'));
    let array = text.find('[').zip(text.rfind(']'));
    let span = match (object, array) {
        (Some(o), Some(a)) => Some(if o.0 < a.0 { o } else { a }),
        (o, a) => o.or(a),
    };

    match span {
        Some((start, end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Parse a model response into `T` after fence cleanup
///
/// Failures are reported as [`PipelineError::Parse`]; shape checks beyond
/// deserialization are the caller's job and use [`PipelineError::Schema`].
pub fn parse_json_response<T: DeserializeOwned>(pass: PassName, raw: &str) -> Result<T> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(PipelineError::parse(pass, "empty response"));
    }

    serde_json::from_str(isolate_json(&cleaned)).map_err(|e| PipelineError::parse(pass, e.to_string()))
}
