use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use super::prompt::{
    build_health_summary_prompt, build_summary_prompt, HEALTH_SUMMARY_SYSTEM, SUMMARY_SYSTEM,
};
use super::types::TriageSession;
use crate::models::{role_label, Conversation, SymptomReport, Urgency};
use crate::pipeline::generation::{GenerationClient, TextProvider};
use crate::pipeline::lexical::known_symptoms;
use crate::pipeline::routing::Specialist;

/// Dialogue lines fed to the summarizer.
pub const SUMMARY_WINDOW: usize = 15;

pub const SUMMARY_FALLBACK: &str =
    "A summary isn't available right now. Please review the conversation above.";

/// Last `SUMMARY_WINDOW` non-empty turns as "User:/Assistant:" lines.
pub fn summary_dialogue(conversation: &Conversation) -> String {
    let lines: Vec<String> = conversation
        .turns()
        .iter()
        .filter(|t| !t.text.trim().is_empty())
        .map(|t| format!("{}: {}", role_label(t.role), t.text.trim()))
        .collect();
    let start = lines.len().saturating_sub(SUMMARY_WINDOW);
    lines[start..].join("\n")
}

/// 3–4 line summary of the conversation, or a fixed line on failure.
pub fn summarize_conversation<P: TextProvider>(
    client: &GenerationClient<P>,
    conversation: &Conversation,
) -> String {
    let dialogue = summary_dialogue(conversation);
    if dialogue.is_empty() {
        return SUMMARY_FALLBACK.to_string();
    }
    match client.try_generate(&build_summary_prompt(&dialogue), SUMMARY_SYSTEM) {
        Ok(summary) if !summary.is_empty() => summary,
        Ok(_) => SUMMARY_FALLBACK.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Conversation summary failed");
            SUMMARY_FALLBACK.to_string()
        }
    }
}

/// Shareable record of a triage session.
#[derive(Debug, Clone, Serialize)]
pub struct TriageReport {
    pub session_id: Uuid,
    pub created_at: NaiveDateTime,
    pub symptoms: Vec<String>,
    /// Last non-question assistant reply.
    pub ai_suggestion: String,
    pub specialist: Specialist,
    pub summary: String,
    pub emergency: bool,
    pub urgency: Urgency,
    /// Key the report is saved under. Unset until the patient gives it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl TriageReport {
    pub fn from_session<P: TextProvider>(client: &GenerationClient<P>, session: &TriageSession) -> Self {
        let conversation = session.conversation();
        let ai_suggestion = conversation
            .assistant_turns()
            .rev()
            .map(|t| t.text.clone())
            .find(|text| !text.trim_end().ends_with('?'))
            .unwrap_or_default();
        let emergency = session.emergency_seen();

        Self {
            session_id: session.id(),
            created_at: session.created_at(),
            symptoms: known_symptoms(client, conversation),
            ai_suggestion,
            specialist: session.specialist().clone(),
            summary: summarize_conversation(client, conversation),
            emergency,
            urgency: if emergency { Urgency::High } else { Urgency::Low },
            phone: None,
            user_name: None,
        }
    }

    /// Attaches the patient's phone (and name, when known). A blank phone
    /// leaves the report unkeyed.
    pub fn for_patient(mut self, phone: &str, user_name: Option<&str>) -> Self {
        let phone = phone.trim();
        self.phone = (!phone.is_empty()).then(|| phone.to_string());
        self.user_name = user_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        self
    }

    /// Storable form, or `None` when no phone is attached.
    pub fn to_record(&self) -> Option<SymptomReport> {
        Some(SymptomReport {
            id: Uuid::new_v4(),
            phone: self.phone.clone()?,
            user_name: self.user_name.clone(),
            session_id: self.session_id,
            symptoms: self.symptoms.clone(),
            ai_suggestion: self.ai_suggestion.clone(),
            specialist: self.specialist.as_str().to_string(),
            summary: self.summary.clone(),
            emergency: self.emergency,
            urgency: self.urgency,
            created_at: self.created_at,
        })
    }
}

/// Saved reports consulted for a health summary.
pub const HEALTH_HISTORY_LIMIT: usize = 3;

pub const NO_HISTORY: &str = "No recent reports found.";

/// One "🗓 01 Oct 2026: summary" line per report, oldest first. Reports
/// arrive newest first, as the store lists them.
pub fn health_history(reports: &[SymptomReport]) -> String {
    reports
        .iter()
        .rev()
        .filter(|r| !r.summary.trim().is_empty())
        .map(|r| format!("🗓 {}: {}", r.created_at.format("%d %b %Y"), r.summary.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Short summary across a patient's latest saved reports. Falls back to the
/// dated history itself when generation fails.
pub fn health_summary<P: TextProvider>(
    client: &GenerationClient<P>,
    reports: &[SymptomReport],
) -> String {
    let history = health_history(reports);
    if history.is_empty() {
        return NO_HISTORY.to_string();
    }
    let latest = reports.first().map_or("", |r| r.ai_suggestion.as_str());
    match client.try_generate(&build_health_summary_prompt(&history, latest), HEALTH_SUMMARY_SYSTEM) {
        Ok(summary) if !summary.is_empty() => summary,
        Ok(_) => history,
        Err(e) => {
            tracing::warn!(error = %e, "Health summary failed");
            history
        }
    }
}
