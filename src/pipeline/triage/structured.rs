//! Schema-checked decoding of the first-turn assessment.
//!
//! Generated JSON is never trusted: anything that fails to parse or lacks
//! an explanation becomes `OpeningAssessment::fallback()`.

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("No JSON object in response")]
    NoJson,

    #[error("JSON parsing error: {0}")]
    Json(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningAssessment {
    pub explanation: String,
    pub remedy: Option<String>,
    pub follow_up: Option<String>,
    pub serious: bool,
}

impl OpeningAssessment {
    pub fn fallback() -> Self {
        Self {
            explanation: "Thanks for telling me how you're feeling. \
                          I'll ask a few questions to understand it better."
                .to_string(),
            remedy: None,
            follow_up: None,
            serious: false,
        }
    }

    /// Remedy text to show, only for non-serious conditions.
    pub fn offered_remedy(&self) -> Option<&str> {
        if self.serious {
            return None;
        }
        self.remedy.as_deref()
    }
}

#[derive(Deserialize)]
struct RawAssessment {
    explanation: Option<String>,
    #[serde(default)]
    remedy: Option<serde_json::Value>,
    #[serde(default)]
    follow_up: Option<String>,
    #[serde(default)]
    serious: Option<serde_json::Value>,
}

pub fn parse_assessment(response: &str) -> Result<OpeningAssessment, DecodeError> {
    let json_str = extract_json_object(response).ok_or(DecodeError::NoJson)?;
    let raw: RawAssessment =
        serde_json::from_str(json_str).map_err(|e| DecodeError::Json(e.to_string()))?;

    let explanation = non_empty(raw.explanation).ok_or(DecodeError::MissingField("explanation"))?;

    Ok(OpeningAssessment {
        explanation,
        remedy: non_empty(raw.remedy.and_then(value_as_text)),
        follow_up: non_empty(raw.follow_up),
        serious: raw.serious.as_ref().map(lenient_bool).unwrap_or(false),
    })
}

/// Decode, substituting the fallback record on any failure.
pub fn decode_assessment(response: &str) -> OpeningAssessment {
    parse_assessment(response).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Malformed assessment, using fallback");
        OpeningAssessment::fallback()
    })
}

/// Body of a ```json fence, else the outermost `{ ... }` span.
fn extract_json_object(response: &str) -> Option<&str> {
    if let Some(start) = response.find("```json") {
        let body = &response[start + 7..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

fn value_as_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Accepts booleans and "yes"/"no"/"true"/"false" strings.
fn lenient_bool(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => {
            matches!(s.trim().to_lowercase().as_str(), "yes" | "true" | "serious")
        }
        _ => false,
    }
}
