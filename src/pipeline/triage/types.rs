use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Conversation, DoctorRecord};
use crate::pipeline::lexical::{is_non_answer, normalize};
use crate::pipeline::routing::{Specialist, FALLBACK};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    /// No user turn handled yet.
    #[default]
    Opening,
    Probing,
    RedFlagPendingConsent,
    Resolving,
    /// A terminal action was returned; the session never resumes.
    Terminal,
}

/// Per-session counters carried between turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub turns_of_symptom_questions: u32,
    pub non_answer_count: u32,
    /// One-shot latch: the red-flag consent question is pending.
    pub emergency_prompted: bool,
    /// Unclear answers to the pending consent question so far.
    #[serde(default)]
    pub consent_reasks: u32,
}

impl Counters {
    /// Recount non-answers from the transcript.
    pub fn non_answers_in(conversation: &Conversation) -> u32 {
        conversation
            .user_turns()
            .filter(|t| is_non_answer(&t.text))
            .count() as u32
    }

    /// Enough has been asked; offer a remedy or a doctor.
    pub fn is_resolving(&self) -> bool {
        self.non_answer_count >= 2 || self.turns_of_symptom_questions >= 3
    }
}

/// What the user asked for once the dialogue is resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Remedy,
    Doctor,
    Undecided,
}

impl Intent {
    pub fn of(latest: &str) -> Self {
        let lower = latest.to_lowercase();
        if lower.contains("remedy") {
            Self::Remedy
        } else if lower.contains("doctor") || lower.contains("specialist") {
            Self::Doctor
        } else {
            Self::Undecided
        }
    }
}

pub const AFFIRMATIVE: &[&str] = &["yes", "yeah", "ok", "okay", "sure", "please", "yess"];
pub const NEGATIVE: &[&str] = &["no", "nah", "not now"];

/// Answer to the red-flag consent question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consent {
    Affirmative,
    Negative,
    Ambiguous,
}

impl Consent {
    /// A reply made only of affirmative (or only of negative) words.
    /// Punctuation is ignored; "not now" matches as a phrase.
    pub fn of(latest: &str) -> Self {
        let normalized = normalize(latest);
        let words: Vec<&str> = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return Self::Ambiguous;
        }
        if NEGATIVE.contains(&words.join(" ").as_str())
            || words.iter().all(|w| NEGATIVE.contains(w))
        {
            Self::Negative
        } else if words.iter().all(|w| AFFIRMATIVE.contains(w)) {
            Self::Affirmative
        } else {
            Self::Ambiguous
        }
    }
}

/// The controller's answer to one user turn.
///
/// Only constructible through `terminal` or `continuing`, so a terminal
/// action never carries a follow-up question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueAction {
    reply_text: String,
    follow_up_question: Option<String>,
    terminal: bool,
    specialist: Specialist,
    emergency: bool,
    recommended_doctors: Option<Vec<DoctorRecord>>,
}

impl DialogueAction {
    pub fn terminal(reply_text: impl Into<String>, specialist: Specialist) -> Self {
        Self {
            reply_text: reply_text.into(),
            follow_up_question: None,
            terminal: true,
            specialist,
            emergency: false,
            recommended_doctors: None,
        }
    }

    pub fn continuing(
        reply_text: impl Into<String>,
        follow_up_question: impl Into<String>,
        specialist: Specialist,
    ) -> Self {
        let follow_up: String = follow_up_question.into();
        Self {
            reply_text: reply_text.into(),
            follow_up_question: (!follow_up.trim().is_empty()).then_some(follow_up),
            terminal: false,
            specialist,
            emergency: false,
            recommended_doctors: None,
        }
    }

    pub fn with_emergency(mut self, emergency: bool) -> Self {
        self.emergency = emergency;
        self
    }

    pub fn with_doctors(mut self, doctors: Vec<DoctorRecord>) -> Self {
        self.recommended_doctors = Some(doctors);
        self
    }

    pub(crate) fn replace_reply(&mut self, reply_text: &str) {
        self.reply_text = reply_text.to_string();
    }

    pub fn reply_text(&self) -> &str {
        &self.reply_text
    }

    pub fn follow_up_question(&self) -> Option<&str> {
        self.follow_up_question.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn specialist(&self) -> &Specialist {
        &self.specialist
    }

    pub fn is_emergency(&self) -> bool {
        self.emergency
    }

    pub fn recommended_doctors(&self) -> Option<&[DoctorRecord]> {
        self.recommended_doctors.as_deref()
    }
}

/// One triage dialogue: transcript plus the state carried between turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageSession {
    id: Uuid,
    created_at: NaiveDateTime,
    conversation: Conversation,
    state: DialogueState,
    counters: Counters,
    specialist: Specialist,
    emergency_seen: bool,
}

impl Default for TriageSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TriageSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Local::now().naive_local(),
            conversation: Conversation::new(),
            state: DialogueState::Opening,
            counters: Counters::default(),
            specialist: FALLBACK,
            emergency_seen: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub(crate) fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    pub fn state(&self) -> DialogueState {
        self.state
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn specialist(&self) -> &Specialist {
        &self.specialist
    }

    pub fn is_terminal(&self) -> bool {
        self.state == DialogueState::Terminal
    }

    /// Any red flag was reported during the session.
    pub fn emergency_seen(&self) -> bool {
        self.emergency_seen
    }

    pub(crate) fn advance(&mut self, state: DialogueState, counters: Counters, action: &DialogueAction) {
        self.state = state;
        self.counters = counters;
        self.specialist = action.specialist().clone();
        self.emergency_seen |= action.is_emergency();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_action_has_no_follow_up() {
        let action = DialogueAction::terminal("Take care.", FALLBACK);
        assert!(action.is_terminal());
        assert!(action.follow_up_question().is_none());
    }

    #[test]
    fn blank_follow_up_is_dropped() {
        let action = DialogueAction::continuing("Rest.", "  ", FALLBACK);
        assert!(!action.is_terminal());
        assert!(action.follow_up_question().is_none());
    }

    #[test]
    fn non_answers_recounted_from_transcript() {
        let mut conversation = Conversation::new();
        for text in ["no", "idk", "fever"] {
            conversation.push_user(text).unwrap();
        }
        assert_eq!(Counters::non_answers_in(&conversation), 2);
    }

    #[test]
    fn resolving_thresholds() {
        let mut counters = Counters::default();
        assert!(!counters.is_resolving());
        counters.non_answer_count = 2;
        assert!(counters.is_resolving());
        let counters = Counters {
            turns_of_symptom_questions: 3,
            ..Counters::default()
        };
        assert!(counters.is_resolving());
    }

    #[test]
    fn intent_detection() {
        assert_eq!(Intent::of("A home remedy please"), Intent::Remedy);
        assert_eq!(Intent::of("Show me a DOCTOR"), Intent::Doctor);
        assert_eq!(Intent::of("which specialist?"), Intent::Doctor);
        assert_eq!(Intent::of("hmm"), Intent::Undecided);
    }

    #[test]
    fn consent_classification() {
        assert_eq!(Consent::of("Yes!"), Consent::Affirmative);
        assert_eq!(Consent::of(" okay "), Consent::Affirmative);
        assert_eq!(Consent::of("Not now"), Consent::Negative);
        assert_eq!(Consent::of("nah."), Consent::Negative);
        assert_eq!(Consent::of("maybe later"), Consent::Ambiguous);
        assert_eq!(Consent::of("yes but it hurts"), Consent::Ambiguous);
        assert_eq!(Consent::of("yes please"), Consent::Affirmative);
        assert_eq!(Consent::of("Okay, sure."), Consent::Affirmative);
        assert_eq!(Consent::of("yes, please"), Consent::Affirmative);
        assert_eq!(Consent::of("no, no"), Consent::Negative);
        assert_eq!(Consent::of("not sure"), Consent::Ambiguous);
        assert_eq!(Consent::of("..."), Consent::Ambiguous);
    }

    #[test]
    fn session_round_trips_through_json() {
        let mut session = TriageSession::new();
        session.conversation_mut().push_user("cough").unwrap();
        let json = serde_json::to_string(&session).unwrap();
        let back: TriageSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), session.id());
        assert_eq!(back.conversation().len(), 1);
        assert_eq!(back.state(), DialogueState::Opening);
    }
}
