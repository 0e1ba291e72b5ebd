use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// A compiled red-flag pattern with the message it triggers.
pub struct RedFlagRule {
    pub symptom: &'static str,
    pub message: &'static str,
    regex: Regex,
}

/// Safety note attached to a reply when a red-flag symptom is mentioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetyMessage {
    pub symptom: &'static str,
    pub message: &'static str,
}

/// Red-flag catalog. Order is the order messages are reported in.
static RED_FLAG_RULES: LazyLock<Vec<RedFlagRule>> = LazyLock::new(|| {
    vec![
        rule(
            "chest pain",
            "⚠️ Chest pain can be serious. Please consult a doctor immediately.",
        ),
        rule(
            "loss of smell",
            "👃 Loss of smell might mean a sinus issue or post-viral symptom. Keep monitoring.",
        ),
        rule(
            "smell",
            "👃 Smell issues often point to congestion or sinus problems.",
        ),
        rule(
            "dizziness",
            "⚠️ Dizziness may be a sign of dehydration or something more serious. Please rest and monitor.",
        ),
        rule(
            "shortness of breath",
            "⚠️ Trouble breathing could be a sign of something serious. See a doctor if it continues.",
        ),
        rule(
            "numbness",
            "⚠️ Numbness can be a nerve issue. Please get checked if it continues.",
        ),
        rule(
            "severe headache",
            "⚠️ Severe headaches that don't go away might need medical attention.",
        ),
        rule(
            "vomiting",
            "⚠️ Persistent vomiting can lead to dehydration. Keep fluids up, and see a doctor if it doesn't improve.",
        ),
    ]
});

fn rule(symptom: &'static str, message: &'static str) -> RedFlagRule {
    RedFlagRule {
        symptom,
        message,
        regex: Regex::new(&format!(r"(?i)\b{}\b", regex::escape(symptom)))
            .expect("Invalid red-flag pattern"),
    }
}

pub fn red_flag_rules() -> &'static [RedFlagRule] {
    &RED_FLAG_RULES
}

/// Messages for every catalog rule that matches `text` on word boundaries.
///
/// Catalog order, no duplicate messages. An empty result only means no
/// known pattern matched.
pub fn classify(text: &str) -> Vec<SafetyMessage> {
    let mut found: Vec<SafetyMessage> = Vec::new();
    for rule in RED_FLAG_RULES.iter() {
        if rule.regex.is_match(text) && !found.iter().any(|m| m.message == rule.message) {
            found.push(SafetyMessage {
                symptom: rule.symptom,
                message: rule.message,
            });
        }
    }
    found
}

pub fn has_red_flags(text: &str) -> bool {
    RED_FLAG_RULES.iter().any(|rule| rule.regex.is_match(text))
}

/// One message per line, ready to append to a reply.
pub fn render_messages(messages: &[SafetyMessage]) -> String {
    messages
        .iter()
        .map(|m| m.message)
        .collect::<Vec<_>>()
        .join("\n")
}
