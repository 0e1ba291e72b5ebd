//! Text generation behind a rotating credential pool.
//!
//! Every prompt in the crate goes through `GenerationClient`. Quota and
//! rate-limit failures rotate to the next credential; anything else fails
//! the call immediately. Callers always get text back from `generate`.

pub mod provider;
pub mod gemini;
pub mod credentials;
pub mod client;

pub use provider::*;
pub use gemini::*;
pub use credentials::*;
pub use client::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Empty prompt given")]
    EmptyPrompt,

    #[error("All {attempts} credentials are rate-limited or over quota")]
    Exhausted { attempts: usize },

    #[error("Provider error: {0}")]
    NonRetryable(String),
}

impl GenerationError {
    /// Text shown to the user in place of generated content.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyPrompt => "Empty prompt given.".to_string(),
            Self::Exhausted { .. } => {
                "All API keys have reached their limits. Please try again later.".to_string()
            }
            Self::NonRetryable(reason) => format!("Generation error: {reason}"),
        }
    }
}

/// Quota/rate-limit signature: case-insensitive "quota exceeded" or "limit".
pub fn is_quota_signature(error_text: &str) -> bool {
    let lower = error_text.to_lowercase();
    lower.contains("quota exceeded") || lower.contains("limit")
}
