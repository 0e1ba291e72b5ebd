//! Triage dialogue: explicit states, a pure transition function, and a
//! controller that executes each transition's effects.
//!
//! Opening → Probing ⇄ Resolving, with a detour through
//! RedFlagPendingConsent when a red-flag symptom appears. Every path ends
//! in Terminal, which never resumes.

pub mod types;
pub mod transition;
pub mod prompt;
pub mod structured;
pub mod controller;
pub mod summary;

pub use types::*;
pub use transition::{transition, Directive, Transition};
pub use structured::{decode_assessment, DecodeError, OpeningAssessment};
pub use controller::{format_doctor_list, DialogueController};
pub use summary::{health_summary, summarize_conversation, TriageReport, HEALTH_HISTORY_LIMIT};
pub use crate::models::Urgency;
