//! Keyword → specialist routing.
//!
//! Ordered rule table, first substring match wins. A keyword that contains
//! an earlier keyword would never fire, so specific phrases come first.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Specialist {
    GeneralPhysician,
    Cardiologist,
    Neurologist,
    Pulmonologist,
    Dermatologist,
    Endocrinologist,
    Orthopedist,
    Therapist,
    Psychiatrist,
    Gastroenterologist,
    Ent,
    Ophthalmologist,
    Urologist,
    Gynecologist,
    Oncologist,
    /// Free-text label outside the known catalog.
    Other(String),
}

const KNOWN: &[(&str, Specialist)] = &[
    ("general physician", Specialist::GeneralPhysician),
    ("cardiologist", Specialist::Cardiologist),
    ("neurologist", Specialist::Neurologist),
    ("pulmonologist", Specialist::Pulmonologist),
    ("dermatologist", Specialist::Dermatologist),
    ("endocrinologist", Specialist::Endocrinologist),
    ("orthopedist", Specialist::Orthopedist),
    ("therapist", Specialist::Therapist),
    ("psychiatrist", Specialist::Psychiatrist),
    ("gastroenterologist", Specialist::Gastroenterologist),
    ("ent", Specialist::Ent),
    ("ophthalmologist", Specialist::Ophthalmologist),
    ("urologist", Specialist::Urologist),
    ("gynecologist", Specialist::Gynecologist),
    ("oncologist", Specialist::Oncologist),
];

impl Specialist {
    pub fn as_str(&self) -> &str {
        match self {
            Self::GeneralPhysician => "general physician",
            Self::Cardiologist => "cardiologist",
            Self::Neurologist => "neurologist",
            Self::Pulmonologist => "pulmonologist",
            Self::Dermatologist => "dermatologist",
            Self::Endocrinologist => "endocrinologist",
            Self::Orthopedist => "orthopedist",
            Self::Therapist => "therapist",
            Self::Psychiatrist => "psychiatrist",
            Self::Gastroenterologist => "gastroenterologist",
            Self::Ent => "ENT",
            Self::Ophthalmologist => "ophthalmologist",
            Self::Urologist => "urologist",
            Self::Gynecologist => "gynecologist",
            Self::Oncologist => "oncologist",
            Self::Other(label) => label,
        }
    }

    pub fn is_fallback(&self) -> bool {
        *self == FALLBACK
    }

    /// Title-cased plural for list headings, e.g. "General Physicians".
    pub fn plural_title(&self) -> String {
        if *self == Self::Ent {
            return "ENT specialists".to_string();
        }
        let titled: Vec<String> = self
            .as_str()
            .split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect();
        format!("{}s", titled.join(" "))
    }
}

impl FromStr for Specialist {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized.is_empty() {
            return Ok(FALLBACK);
        }
        Ok(KNOWN
            .iter()
            .find(|(label, _)| *label == normalized)
            .map(|(_, specialist)| specialist.clone())
            .unwrap_or_else(|| Self::Other(s.trim().to_string())))
    }
}

impl From<String> for Specialist {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(specialist) => specialist,
            Err(never) => match never {},
        }
    }
}

impl From<Specialist> for String {
    fn from(s: Specialist) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for Specialist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const FALLBACK: Specialist = Specialist::GeneralPhysician;

pub struct SpecialistRule {
    pub keyword: &'static str,
    pub specialist: Specialist,
}

static SPECIALIST_RULES: LazyLock<Vec<SpecialistRule>> = LazyLock::new(|| {
    use Specialist::*;
    [
        ("chest pain", Cardiologist),
        ("palpitation", Cardiologist),
        ("heart", Cardiologist),
        ("headache", Neurologist),
        ("migraine", Neurologist),
        ("dizz", Neurologist),
        ("numbness", Neurologist),
        ("breath", Pulmonologist),
        ("asthma", Pulmonologist),
        ("cough", Pulmonologist),
        ("rash", Dermatologist),
        ("skin", Dermatologist),
        ("itch", Dermatologist),
        ("diabetes", Endocrinologist),
        ("sugar", Endocrinologist),
        ("back", Orthopedist),
        ("knee", Orthopedist),
        ("leg", Orthopedist),
        ("joint", Orthopedist),
        ("anxiety", Therapist),
        ("depression", Therapist),
        ("mental", Therapist),
        ("stress", Therapist),
        ("vomiting", Gastroenterologist),
        ("stomach", Gastroenterologist),
        ("abdomen", Gastroenterologist),
        ("throat", Ent),
        ("ear", Ent),
        ("nose", Ent),
        ("sinus", Ent),
        ("eye", Ophthalmologist),
        ("vision", Ophthalmologist),
        ("blurry", Ophthalmologist),
        ("fever", GeneralPhysician),
        ("cold", GeneralPhysician),
        ("tired", GeneralPhysician),
        ("pain", GeneralPhysician),
    ]
    .into_iter()
    .map(|(keyword, specialist)| SpecialistRule { keyword, specialist })
    .collect()
});

pub fn specialist_rules() -> &'static [SpecialistRule] {
    &SPECIALIST_RULES
}

/// First rule whose keyword is a substring of the lower-cased input;
/// `FALLBACK` when none matches.
pub fn route(condition_or_keyword: &str) -> Specialist {
    let lower = condition_or_keyword.to_lowercase();
    SPECIALIST_RULES
        .iter()
        .find(|rule| lower.contains(rule.keyword))
        .map(|rule| rule.specialist.clone())
        .unwrap_or(FALLBACK)
}
