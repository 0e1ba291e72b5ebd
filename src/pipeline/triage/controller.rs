use super::prompt::*;
use super::structured::{decode_assessment, OpeningAssessment};
use super::transition::{transition, Directive};
use super::types::{DialogueAction, TriageSession};
use crate::directory::{DoctorDirectory, TerminologyLookup};
use crate::models::{Conversation, DoctorRecord, TurnError};
use crate::pipeline::generation::{GenerationClient, TextProvider};
use crate::pipeline::lexical::{
    extract_keyword, is_duplicate_reply, known_symptoms, last_question, normalize,
};
use crate::pipeline::routing::{route, Specialist};
use crate::pipeline::safety::{classify, render_messages};

/// Doctors shown per listing.
pub const DOCTOR_LIST_LIMIT: usize = 5;

/// Runs triage turns: pure transition, then the directive's effects.
pub struct DialogueController<'a, P: TextProvider, T: TerminologyLookup, D: DoctorDirectory> {
    client: &'a GenerationClient<P>,
    terminology: &'a T,
    directory: &'a D,
}

impl<'a, P: TextProvider, T: TerminologyLookup, D: DoctorDirectory> DialogueController<'a, P, T, D> {
    pub fn new(client: &'a GenerationClient<P>, terminology: &'a T, directory: &'a D) -> Self {
        Self {
            client,
            terminology,
            directory,
        }
    }

    /// Handle one user utterance.
    ///
    /// Appends the user turn, decides the transition, produces the action,
    /// and appends the reply and any follow-up as assistant turns. Only an
    /// empty utterance is an error; provider and directory failures degrade
    /// to fixed text.
    pub fn handle_turn(
        &self,
        session: &mut TriageSession,
        text: &str,
    ) -> Result<DialogueAction, TurnError> {
        session.conversation_mut().push_user(text)?;
        let latest = text.trim();

        let step = transition(session.state(), session.counters(), latest);
        tracing::info!(
            session = %session.id(),
            from = ?session.state(),
            to = ?step.state,
            directive = ?step.directive,
            "Triage transition"
        );

        let mut action = self.execute(step.directive, session, latest);

        if !action.is_terminal() && is_duplicate_reply(action.reply_text(), session.conversation()) {
            tracing::debug!("Duplicate reply replaced with acknowledgement");
            action.replace_reply(ACKNOWLEDGEMENT);
        }

        let conversation = session.conversation_mut();
        conversation.push_assistant(action.reply_text());
        if let Some(question) = action.follow_up_question() {
            conversation.push_assistant(question);
        }
        session.advance(step.state, step.counters, &action);

        Ok(action)
    }

    fn execute(&self, directive: Directive, session: &TriageSession, latest: &str) -> DialogueAction {
        let conversation = session.conversation();
        let specialist = match directive {
            Directive::Opening | Directive::SessionClosed => session.specialist().clone(),
            _ => self.reroute(session.specialist(), conversation, latest),
        };

        match directive {
            Directive::Opening => self.opening(latest),
            Directive::AskConsent => {
                let flags = render_messages(&classify(latest));
                let reply = join_lines(&self.advice(conversation), &flags);
                DialogueAction::continuing(reply, CONSENT_QUESTION, specialist).with_emergency(true)
            }
            Directive::ReaskConsent => {
                DialogueAction::continuing(CONSENT_REMINDER, CONSENT_QUESTION, specialist)
                    .with_emergency(true)
            }
            Directive::UrgentSummary => {
                let summary = self.generate_or(
                    &build_urgent_prompt(&conversation.transcript()),
                    URGENT_SYSTEM,
                    URGENT_FALLBACK,
                );
                let doctors = self.doctors_for(&specialist);
                DialogueAction::terminal(summary, specialist)
                    .with_emergency(true)
                    .with_doctors(doctors)
            }
            Directive::SafetyNet => DialogueAction::terminal(SAFETY_NET, specialist),
            Directive::Remedy => {
                let remedy = self.generate_or(
                    &build_remedy_prompt(&conversation.transcript()),
                    REMEDY_SYSTEM,
                    REMEDY_FALLBACK,
                );
                DialogueAction::terminal(remedy, specialist)
            }
            Directive::ListDoctors => {
                let doctors = self.doctors_for(&specialist);
                let reply = if doctors.is_empty() {
                    consult_fallback(specialist.as_str())
                } else {
                    format_doctor_list(&specialist, &doctors)
                };
                DialogueAction::terminal(reply, specialist).with_doctors(doctors)
            }
            Directive::OfferChoice { question } => {
                DialogueAction::continuing(self.advice(conversation), question, specialist)
            }
            Directive::FollowUp => {
                let question = self.follow_up_question(conversation, latest);
                DialogueAction::continuing(self.advice(conversation), question, specialist)
            }
            Directive::SessionClosed => DialogueAction::terminal(SESSION_CLOSED, specialist),
        }
    }

    /// First turn: keyword → condition → specialist, red flags, and one
    /// structured assessment call.
    fn opening(&self, utterance: &str) -> DialogueAction {
        let keyword = extract_keyword(self.client, utterance);
        let condition = self
            .terminology
            .lookup_condition(&keyword)
            .into_iter()
            .map(|m| m.name)
            .find(|name| !name.trim().is_empty())
            .unwrap_or_else(|| keyword.clone());

        let mut specialist = route(&condition);
        if specialist.is_fallback() {
            specialist = route(utterance);
        }

        let flags = classify(utterance);

        let assessment = match self.client.try_generate(
            &build_assessment_prompt(utterance, &keyword, &condition),
            ASSESSMENT_SYSTEM,
        ) {
            Ok(raw) => decode_assessment(&raw),
            Err(e) => {
                tracing::warn!(error = %e, "Assessment generation failed");
                OpeningAssessment::fallback()
            }
        };

        let mut reply = assessment.explanation.clone();
        if let Some(remedy) = assessment.offered_remedy() {
            reply = join_lines(&reply, &format!("💡 Remedy: {remedy}"));
        }
        reply = join_lines(&reply, &render_messages(&flags));

        let follow_up = assessment
            .follow_up
            .clone()
            .unwrap_or_else(|| DEFAULT_FOLLOW_UP.to_string());

        tracing::info!(%specialist, red_flags = flags.len(), "Opening assessment");
        DialogueAction::continuing(reply, follow_up, specialist).with_emergency(!flags.is_empty())
    }

    /// While still on the fallback specialist, try again from what the
    /// user has said so far.
    fn reroute(&self, current: &Specialist, conversation: &Conversation, latest: &str) -> Specialist {
        if !current.is_fallback() {
            return current.clone();
        }
        let from_latest = route(latest);
        if !from_latest.is_fallback() {
            return from_latest;
        }
        route(&known_symptoms(self.client, conversation).join(" "))
    }

    fn advice(&self, conversation: &Conversation) -> String {
        self.generate_or(
            &build_advice_prompt(&conversation.transcript()),
            ADVICE_SYSTEM,
            GENERIC_REPLY,
        )
    }

    fn follow_up_question(&self, conversation: &Conversation, latest: &str) -> String {
        let symptoms = known_symptoms(self.client, conversation);
        let previous = last_question(conversation);
        let prompt = build_follow_up_prompt(&conversation.transcript(), &symptoms, previous, latest);
        let question = self.generate_or(&prompt, FOLLOW_UP_SYSTEM, DETAIL_FOLLOW_UP);

        match previous {
            Some(prev) if normalize(prev) == normalize(&question) => ANYTHING_ELSE.to_string(),
            _ => question,
        }
    }

    fn doctors_for(&self, specialist: &Specialist) -> Vec<DoctorRecord> {
        match self.directory.find_doctors(specialist.as_str(), None, None) {
            Ok(doctors) => {
                // Substring search lets "ent" match "gastroenterologist".
                let exact: Vec<DoctorRecord> = doctors
                    .iter()
                    .filter(|d| d.specialization.eq_ignore_ascii_case(specialist.as_str()))
                    .cloned()
                    .collect();
                let mut doctors = if exact.is_empty() { doctors } else { exact };
                doctors.truncate(DOCTOR_LIST_LIMIT);
                doctors
            }
            Err(e) => {
                tracing::warn!(error = %e, %specialist, "Doctor lookup failed");
                Vec::new()
            }
        }
    }

    /// Generated text, or `fallback` when generation fails or comes back empty.
    fn generate_or(&self, prompt: &str, system: &str, fallback: &str) -> String {
        match self.client.try_generate(prompt, system) {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => fallback.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Generation failed, using fallback text");
                fallback.to_string()
            }
        }
    }
}

/// "Here are some Cardiologists near you:" followed by one line per doctor.
pub fn format_doctor_list(specialist: &Specialist, doctors: &[DoctorRecord]) -> String {
    let mut lines = vec![format!("Here are some {} near you:", specialist.plural_title())];
    for doctor in doctors {
        let place = doctor
            .location
            .as_deref()
            .or(doctor.city.as_deref())
            .unwrap_or("location not listed");
        lines.push(format!("- Dr. {} ({})", doctor.name, place));
    }
    lines.join("\n")
}

fn join_lines(first: &str, second: &str) -> String {
    match (first.trim().is_empty(), second.trim().is_empty()) {
        (_, true) => first.to_string(),
        (true, false) => second.to_string(),
        (false, false) => format!("{first}\n{second}"),
    }
}
