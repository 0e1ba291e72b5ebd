//! Pure state transition for the triage dialogue.
//!
//! `transition` decides *what* happens on a turn from the current state,
//! counters and latest utterance. It performs no I/O; the controller turns
//! the resulting `Directive` into text.

use super::types::{Consent, Counters, DialogueState, Intent};
use crate::pipeline::lexical::is_non_answer;
use crate::pipeline::safety::has_red_flags;

pub const RESOLVING_CHOICE: &str = "Would you like a specialist or a home remedy suggestion?";

/// Unclear consent answers tolerated before falling back to the safety net.
pub const MAX_CONSENT_REASKS: u32 = 2;

/// Effect the controller must carry out for this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// First turn: keyword, routing, combined assessment.
    Opening,
    /// Red flag found: ask whether to suggest a doctor now.
    AskConsent,
    /// Consent answer was neither yes nor no.
    ReaskConsent,
    /// Consent given: urgent summary plus doctors. Terminal.
    UrgentSummary,
    /// Consent declined. Terminal.
    SafetyNet,
    /// One home remedy. Terminal.
    Remedy,
    /// Doctor list for the session specialist. Terminal.
    ListDoctors,
    /// Ask whether the user wants a specialist or a remedy.
    OfferChoice { question: &'static str },
    /// Generate a new, non-repeating follow-up question.
    FollowUp,
    /// Input after a terminal turn.
    SessionClosed,
}

impl Directive {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::UrgentSummary | Self::SafetyNet | Self::Remedy | Self::ListDoctors | Self::SessionClosed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: DialogueState,
    pub counters: Counters,
    pub directive: Directive,
}

pub fn transition(state: DialogueState, counters: &Counters, latest: &str) -> Transition {
    let mut counters = counters.clone();

    if state != DialogueState::Terminal && is_non_answer(latest) {
        counters.non_answer_count += 1;
    }

    let (state, directive) = match state {
        DialogueState::Terminal => (DialogueState::Terminal, Directive::SessionClosed),
        DialogueState::Opening => {
            counters.turns_of_symptom_questions += 1;
            (DialogueState::Probing, Directive::Opening)
        }
        DialogueState::RedFlagPendingConsent => match Consent::of(latest) {
            Consent::Affirmative => {
                counters.emergency_prompted = false;
                counters.consent_reasks = 0;
                (DialogueState::Terminal, Directive::UrgentSummary)
            }
            Consent::Negative => {
                counters.emergency_prompted = false;
                counters.consent_reasks = 0;
                (DialogueState::Terminal, Directive::SafetyNet)
            }
            Consent::Ambiguous if counters.consent_reasks >= MAX_CONSENT_REASKS => {
                tracing::info!(reasks = counters.consent_reasks, "No clear consent, closing with safety net");
                counters.emergency_prompted = false;
                counters.consent_reasks = 0;
                (DialogueState::Terminal, Directive::SafetyNet)
            }
            // Keep the latch and ask again rather than dropping the question.
            Consent::Ambiguous => {
                counters.consent_reasks += 1;
                (DialogueState::RedFlagPendingConsent, Directive::ReaskConsent)
            }
        },
        DialogueState::Probing | DialogueState::Resolving => probe(&mut counters, latest),
    };

    Transition {
        state,
        counters,
        directive,
    }
}

fn probe(counters: &mut Counters, latest: &str) -> (DialogueState, Directive) {
    if has_red_flags(latest) && !counters.emergency_prompted {
        counters.emergency_prompted = true;
        return (DialogueState::RedFlagPendingConsent, Directive::AskConsent);
    }

    if counters.is_resolving() {
        return match Intent::of(latest) {
            Intent::Remedy => (DialogueState::Terminal, Directive::Remedy),
            Intent::Doctor => (DialogueState::Terminal, Directive::ListDoctors),
            Intent::Undecided => (
                DialogueState::Resolving,
                Directive::OfferChoice {
                    question: RESOLVING_CHOICE,
                },
            ),
        };
    }

    counters.turns_of_symptom_questions += 1;
    (DialogueState::Probing, Directive::FollowUp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(turns: u32, non_answers: u32, prompted: bool) -> Counters {
        Counters {
            turns_of_symptom_questions: turns,
            non_answer_count: non_answers,
            emergency_prompted: prompted,
            consent_reasks: 0,
        }
    }

    #[test]
    fn opening_counts_first_question() {
        let t = transition(DialogueState::Opening, &Counters::default(), "I have a cough");
        assert_eq!(t.directive, Directive::Opening);
        assert_eq!(t.state, DialogueState::Probing);
        assert_eq!(t.counters.turns_of_symptom_questions, 1);
        assert_eq!(t.counters.non_answer_count, 0);
    }

    #[test]
    fn red_flag_in_probing_asks_consent_and_sets_latch() {
        let t = transition(DialogueState::Probing, &counters(1, 0, false), "now I have chest pain");
        assert_eq!(t.directive, Directive::AskConsent);
        assert_eq!(t.state, DialogueState::RedFlagPendingConsent);
        assert!(t.counters.emergency_prompted);
    }

    #[test]
    fn red_flag_takes_priority_over_resolving() {
        let t = transition(DialogueState::Resolving, &counters(3, 2, false), "doctor, I feel numbness");
        assert_eq!(t.directive, Directive::AskConsent);
    }

    #[test]
    fn consent_yes_is_terminal_and_resets_latch() {
        let t = transition(DialogueState::RedFlagPendingConsent, &counters(2, 0, true), "yes");
        assert_eq!(t.directive, Directive::UrgentSummary);
        assert_eq!(t.state, DialogueState::Terminal);
        assert!(!t.counters.emergency_prompted);
    }

    #[test]
    fn consent_no_is_safety_net() {
        let t = transition(DialogueState::RedFlagPendingConsent, &counters(2, 0, true), "not now");
        assert_eq!(t.directive, Directive::SafetyNet);
        assert_eq!(t.state, DialogueState::Terminal);
        assert!(!t.counters.emergency_prompted);
    }

    #[test]
    fn ambiguous_consent_reasks_and_keeps_latch() {
        let t = transition(DialogueState::RedFlagPendingConsent, &counters(2, 0, true), "what do you mean");
        assert_eq!(t.directive, Directive::ReaskConsent);
        assert_eq!(t.state, DialogueState::RedFlagPendingConsent);
        assert!(t.counters.emergency_prompted);
    }

    #[test]
    fn affirmative_word_combinations_give_consent() {
        for reply in ["yes please", "okay sure", "yes, please"] {
            let t = transition(DialogueState::RedFlagPendingConsent, &counters(2, 0, true), reply);
            assert_eq!(t.directive, Directive::UrgentSummary, "{reply}");
            assert_eq!(t.state, DialogueState::Terminal);
        }
    }

    #[test]
    fn repeated_unclear_consent_ends_with_safety_net() {
        let mut state = DialogueState::RedFlagPendingConsent;
        let mut current = counters(2, 0, true);
        for _ in 0..MAX_CONSENT_REASKS {
            let t = transition(state, &current, "idk");
            assert_eq!(t.directive, Directive::ReaskConsent);
            state = t.state;
            current = t.counters;
        }
        let t = transition(state, &current, "idk");
        assert_eq!(t.directive, Directive::SafetyNet);
        assert_eq!(t.state, DialogueState::Terminal);
        assert!(!t.counters.emergency_prompted);
        assert_eq!(t.counters.consent_reasks, 0);
    }

    #[test]
    fn long_probing_offers_the_resolving_choice() {
        let t = transition(DialogueState::Probing, &counters(4, 0, false), "it comes and goes");
        assert_eq!(
            t.directive,
            Directive::OfferChoice {
                question: RESOLVING_CHOICE
            }
        );
        assert_eq!(t.state, DialogueState::Resolving);
        assert_eq!(t.counters.turns_of_symptom_questions, 4);
    }

    #[test]
    fn two_non_answers_plus_doctor_lists_doctors() {
        let t = transition(DialogueState::Probing, &counters(2, 2, false), "I want to see a doctor");
        assert_eq!(t.directive, Directive::ListDoctors);
        assert!(t.directive.is_terminal());
    }

    #[test]
    fn third_question_resolves_with_remedy() {
        let t = transition(DialogueState::Probing, &counters(3, 0, false), "any home remedy?");
        assert_eq!(t.directive, Directive::Remedy);
        assert_eq!(t.state, DialogueState::Terminal);
    }

    #[test]
    fn undecided_resolving_offers_choice() {
        let t = transition(DialogueState::Probing, &counters(3, 0, false), "it still hurts");
        assert_eq!(
            t.directive,
            Directive::OfferChoice {
                question: RESOLVING_CHOICE
            }
        );
        assert_eq!(t.state, DialogueState::Resolving);
    }

    #[test]
    fn default_continuation_counts_question() {
        let t = transition(DialogueState::Probing, &counters(1, 0, false), "since yesterday");
        assert_eq!(t.directive, Directive::FollowUp);
        assert_eq!(t.counters.turns_of_symptom_questions, 2);
    }

    #[test]
    fn non_answer_is_counted_on_every_turn() {
        let t = transition(DialogueState::Probing, &counters(1, 0, false), "idk");
        assert_eq!(t.counters.non_answer_count, 1);
        let t = transition(t.state, &t.counters, "nothing");
        assert_eq!(t.counters.non_answer_count, 2);
        assert_eq!(t.state, DialogueState::Resolving);
    }

    #[test]
    fn terminal_never_resumes() {
        let before = counters(3, 1, false);
        let t = transition(DialogueState::Terminal, &before, "no");
        assert_eq!(t.directive, Directive::SessionClosed);
        assert_eq!(t.state, DialogueState::Terminal);
        assert_eq!(t.counters, before);
    }

    #[test]
    fn counters_never_decrease() {
        let mut state = DialogueState::Opening;
        let mut current = Counters::default();
        for input in ["cough", "no", "two days", "idk", "dry cough", "remedy"] {
            let t = transition(state, &current, input);
            assert!(t.counters.turns_of_symptom_questions >= current.turns_of_symptom_questions);
            assert!(t.counters.non_answer_count >= current.non_answer_count);
            state = t.state;
            current = t.counters;
        }
        assert_eq!(state, DialogueState::Terminal);
    }
}
