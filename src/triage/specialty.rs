//! Specialty advisor: which clinical services should see the patient first.
//!
//! Every rule is evaluated independently and the results are unioned; there
//! is no priority between rules. If nothing fires, General Medicine.

use std::collections::BTreeSet;

use crate::models::{Condition, Specialty, Symptom};

/// Condition under which a specialty rule fires.
enum SpecialtyTrigger {
    AnySymptom(&'static [Symptom]),
    AnyCondition(&'static [Condition]),
    VisualIrregularity,
}

struct SpecialtyRule {
    /// Fires when any trigger matches.
    triggers: &'static [SpecialtyTrigger],
    specialty: Specialty,
}

const FALLBACK: Specialty = Specialty::GeneralMedicine;

static RULES: &[SpecialtyRule] = &[
    SpecialtyRule {
        triggers: &[
            SpecialtyTrigger::AnySymptom(&[Symptom::ChestPain]),
            SpecialtyTrigger::AnyCondition(&[Condition::HeartDisease]),
        ],
        specialty: Specialty::Cardiology,
    },
    SpecialtyRule {
        triggers: &[SpecialtyTrigger::AnySymptom(&[Symptom::Fever, Symptom::Cough])],
        specialty: Specialty::GeneralMedicine,
    },
    SpecialtyRule {
        triggers: &[SpecialtyTrigger::AnySymptom(&[Symptom::Breathlessness])],
        specialty: Specialty::Pulmonology,
    },
    SpecialtyRule {
        triggers: &[SpecialtyTrigger::AnySymptom(&[Symptom::Dizziness])],
        specialty: Specialty::Neurology,
    },
    SpecialtyRule {
        triggers: &[SpecialtyTrigger::VisualIrregularity],
        specialty: Specialty::Dermatology,
    },
];

impl SpecialtyTrigger {
    fn matches(
        &self,
        symptoms: &BTreeSet<Symptom>,
        conditions: &BTreeSet<Condition>,
        visual_flag: bool,
    ) -> bool {
        match self {
            Self::AnySymptom(wanted) => wanted.iter().any(|s| symptoms.contains(s)),
            Self::AnyCondition(wanted) => wanted.iter().any(|c| conditions.contains(c)),
            Self::VisualIrregularity => visual_flag,
        }
    }
}

/// Suggested specialties, distinct and sorted by name. Never empty.
pub fn suggest_specialties(
    symptoms: &BTreeSet<Symptom>,
    conditions: &BTreeSet<Condition>,
    visual_flag: bool,
) -> Vec<Specialty> {
    let mut fired: BTreeSet<Specialty> = RULES
        .iter()
        .filter(|rule| {
            rule.triggers
                .iter()
                .any(|t| t.matches(symptoms, conditions, visual_flag))
        })
        .map(|rule| rule.specialty)
        .collect();

    if fired.is_empty() {
        fired.insert(FALLBACK);
    }

    let mut specialties: Vec<Specialty> = fired.into_iter().collect();
    specialties.sort_by_key(|s| s.as_str());
    specialties
}
