//! Prompt text for the triage dialogue.

pub const ASSESSMENT_SYSTEM: &str = "You are a friendly, non-robotic rural health assistant. \
Use short, kind sentences and avoid medical jargon. Reply with JSON only.";

pub const ADVICE_SYSTEM: &str = "You're a neutral, responsible doctor. Give concise advice. \
Do NOT offer to book or meet. Stay grounded and realistic.";

pub const FOLLOW_UP_SYSTEM: &str =
    "You're a kind doctor. Don't repeat. Ask a single, helpful question to get more detail.";

pub const URGENT_SYSTEM: &str = "You are a doctor responding to a possible emergency. \
Summarize the key issue briefly and explain what should be done immediately. \
Do NOT suggest waiting. Be clear, kind, and take the issue seriously.";

pub const REMEDY_SYSTEM: &str =
    "You're a caring doctor. Suggest only 1 simple home remedy clearly.";

pub const SUMMARY_SYSTEM: &str =
    "You are a doctor. Summarize the following health chat in 3-4 short lines.";

pub const HEALTH_SUMMARY_SYSTEM: &str = "You are a compassionate and knowledgeable doctor. \
Write a short health summary based on the user's symptom history. \
Use a friendly tone, avoid false reassurance and jargon, and never prescribe.";

pub const CONSENT_QUESTION: &str = "Is it urgent? Can I suggest a doctor now?";
pub const CONSENT_REMINDER: &str = "I want to make sure you get the right help.";
pub const DEFAULT_FOLLOW_UP: &str = "Can you tell me how long this has been happening?";
pub const DETAIL_FOLLOW_UP: &str =
    "Can you tell me more details about duration, severity, or triggers?";
pub const ANYTHING_ELSE: &str =
    "Is there anything else you'd like to tell me about how you're feeling?";
pub const ACKNOWLEDGEMENT: &str =
    "Thanks for the update. Be sure to keep resting and staying hydrated.";
pub const SAFETY_NET: &str =
    "Okay, no pressure, but if symptoms get worse please seek medical help.";
pub const GENERIC_REPLY: &str =
    "Thanks for sharing. Let me know if you'd like to talk to a doctor or get a remedy.";
pub const REMEDY_FALLBACK: &str =
    "Try sipping warm water with a pinch of turmeric – it might help ease things naturally.";
pub const URGENT_FALLBACK: &str = "Your symptoms may need prompt medical attention. \
Please contact a doctor or visit the nearest clinic as soon as possible.";
pub const SESSION_CLOSED: &str =
    "This conversation has ended. Please start a new session if you need more help.";

pub fn consult_fallback(specialist: &str) -> String {
    format!("You can consult a {specialist} for a more thorough checkup.")
}

/// Combined first-turn assessment, answered as one JSON object.
pub fn build_assessment_prompt(utterance: &str, keyword: &str, condition: &str) -> String {
    format!(
        "User said: \"{utterance}\"\n\
         Clinical keyword: \"{keyword}\"\n\
         Top condition: \"{condition}\"\n\n\
         Task:\n\
         1. Explain the condition in 2 lines (avoid jargon).\n\
         2. Say whether it could be serious.\n\
         3. Suggest a 1-line home remedy if it is not serious.\n\
         4. Ask 1 polite follow-up question (duration, severity or triggers).\n\n\
         Return JSON with keys: explanation (string), serious (true/false), \
         remedy (string or null), follow_up (string)."
    )
}

pub fn build_advice_prompt(transcript: &str) -> String {
    format!(
        "{transcript}\n\
         Give clear and useful health advice based on the above conversation in 1-2 lines. \
         Do NOT include any questions, bookings, or suggestions like 'see me soon'. \
         Be kind but stay factual."
    )
}

pub fn build_follow_up_prompt(
    transcript: &str,
    known_symptoms: &[String],
    last_question: Option<&str>,
    latest: &str,
) -> String {
    format!(
        "Conversation so far:\n{transcript}\n\n\
         Known symptoms: {}\n\
         Last assistant question: \"{}\"\n\
         Latest user input: \"{latest}\"\n\n\
         Ask a *new* follow-up question to clarify one of:\n\
         - Duration\n\
         - Type (dry, sharp, dull, etc.)\n\
         - Trigger (cold, light, stress, etc.)\n\
         - Red flags (pain, blood, fever, etc.)\n\
         Do not repeat the last question.",
        known_symptoms.join(", "),
        last_question.unwrap_or(""),
    )
}

pub fn build_urgent_prompt(transcript: &str) -> String {
    format!("{transcript}\nSummarize the issue urgently in 2 lines:")
}

pub fn build_remedy_prompt(transcript: &str) -> String {
    format!("{transcript}\nGive 1 best home remedy for the symptoms above.")
}

pub fn build_summary_prompt(dialogue: &str) -> String {
    format!(
        "You are a doctor. Summarize the following health chat in 3-4 short lines.\n\n\
         {dialogue}\n\n\
         Use empathetic and simple language.\n\
         Avoid giving false hope. No prescriptions.\n\
         Just tell the issue, cause (if known), and what to do."
    )
}

/// `history` is one dated line per saved report, oldest first.
pub fn build_health_summary_prompt(history: &str, latest_suggestion: &str) -> String {
    format!(
        "Based on the user's previous health summaries, write a short and simple health summary.\n\n\
         Previous summaries:\n{history}\n\n\
         Most recent advice given: {latest_suggestion}\n\n\
         Use simple, short language (2-3 lines).\n\
         Be friendly, clear, and non-alarming.\n\
         Mention if there is improvement or concern.\n\
         End with one actionable advice (no prescription).\n\
         Only reply with the summary."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_up_prompt_lists_negative_examples() {
        let prompt = build_follow_up_prompt(
            "User: cough",
            &["cough".into(), "fever".into()],
            Some("How long has it lasted?"),
            "two days",
        );
        assert!(prompt.contains("Known symptoms: cough, fever"));
        assert!(prompt.contains("\"How long has it lasted?\""));
        assert!(prompt.contains("\"two days\""));
    }

    #[test]
    fn assessment_prompt_names_every_key() {
        let prompt = build_assessment_prompt("my head hurts", "headache", "Headache");
        for key in ["explanation", "serious", "remedy", "follow_up"] {
            assert!(prompt.contains(key));
        }
    }
}
