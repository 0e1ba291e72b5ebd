//! Lexical helpers for the dialogue: keyword extraction, non-answer and
//! repeated-reply detection.

use crate::models::Conversation;
use crate::pipeline::generation::{GenerationClient, TextProvider};

/// Dismissive replies that count as "no new information".
pub const NON_ANSWERS: &[&str] = &["no", "nothing", "idk", "fine", "na", "nah"];

/// How many recent assistant turns a candidate reply is compared against.
pub const DUPLICATE_WINDOW: usize = 4;

const KEYWORD_SYSTEM: &str = "Clinical parser. No full sentences, just keyword.";

/// Trim, lower-case, and collapse internal whitespace.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn is_non_answer(utterance: &str) -> bool {
    let normalized = normalize(utterance);
    NON_ANSWERS.contains(&normalized.as_str())
}

/// True when `candidate` equals one of the last few assistant turns,
/// ignoring case and whitespace.
pub fn is_duplicate_reply(candidate: &str, conversation: &Conversation) -> bool {
    let candidate = normalize(candidate);
    if candidate.is_empty() {
        return false;
    }
    conversation
        .assistant_turns()
        .rev()
        .take(DUPLICATE_WINDOW)
        .any(|turn| normalize(&turn.text) == candidate)
}

/// Single clinical keyword for `utterance`, lower-cased.
///
/// Best effort: when generation fails or returns nothing usable, the
/// lower-cased utterance itself is the label.
pub fn extract_keyword<P: TextProvider>(client: &GenerationClient<P>, utterance: &str) -> String {
    let prompt = format!(
        "Extract a single-word or short medical phrase from: '{}'. Only output the keyword.",
        utterance.trim()
    );
    let generated = match client.try_generate(&prompt, KEYWORD_SYSTEM) {
        Ok(text) => clean_keyword(&text),
        Err(e) => {
            tracing::debug!(error = %e, "Keyword extraction fell back to raw utterance");
            String::new()
        }
    };
    if generated.is_empty() {
        normalize(utterance)
    } else {
        generated
    }
}

/// First non-empty line, stripped of quotes and trailing punctuation.
fn clean_keyword(raw: &str) -> String {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let line = line.strip_prefix("Keyword:").unwrap_or(line);
    let stripped = line.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '*' | '.' | ',' | ';' | ':' | '!')
    });
    normalize(stripped)
}

/// Keywords for every informative user turn, first occurrence order.
///
/// Re-derived on each call so a user's later correction is picked up.
pub fn known_symptoms<P: TextProvider>(
    client: &GenerationClient<P>,
    conversation: &Conversation,
) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for turn in conversation.user_turns() {
        if is_non_answer(&turn.text) {
            continue;
        }
        let keyword = extract_keyword(client, &turn.text);
        if !keyword.is_empty() && !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }
    keywords
}

/// Most recent assistant turn that is a question.
pub fn last_question(conversation: &Conversation) -> Option<&str> {
    conversation
        .assistant_turns()
        .rev()
        .map(|t| t.text.as_str())
        .find(|text| text.trim_end().ends_with('?'))
}
