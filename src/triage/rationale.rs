use crate::models::{PatientRecord, Symptom};

pub const HEART_RATE_ALERT_BPM: u32 = 110;
pub const SYSTOLIC_BP_ALERT_MMHG: u32 = 150;
pub const TEMPERATURE_ALERT_F: f64 = 101.0;

/// A vital/symptom check and the sentence it contributes when it passes.
struct FactorRule {
    check: fn(&PatientRecord) -> bool,
    sentence: &'static str,
}

static FACTOR_RULES: &[FactorRule] = &[
    FactorRule {
        check: elevated_heart_rate,
        sentence: "Elevated heart rate increases immediate clinical risk.",
    },
    FactorRule {
        check: high_blood_pressure,
        sentence: "High blood pressure contributes to cardiovascular stress.",
    },
    FactorRule {
        check: high_temperature,
        sentence: "High body temperature indicates possible systemic stress.",
    },
    FactorRule {
        check: chest_pain,
        sentence: "Chest pain is a high-priority triage symptom.",
    },
];

fn elevated_heart_rate(record: &PatientRecord) -> bool {
    record.heart_rate > HEART_RATE_ALERT_BPM
}

fn high_blood_pressure(record: &PatientRecord) -> bool {
    record.systolic_bp > SYSTOLIC_BP_ALERT_MMHG
}

fn high_temperature(record: &PatientRecord) -> bool {
    record.temperature > TEMPERATURE_ALERT_F
}

fn chest_pain(record: &PatientRecord) -> bool {
    record.has_symptom(Symptom::ChestPain)
}

/// Plain-language rationale, one sentence per passing check, in fixed order.
/// Independent of the risk tier and of escalation.
pub fn key_factors(record: &PatientRecord) -> Vec<String> {
    FACTOR_RULES
        .iter()
        .filter(|rule| (rule.check)(record))
        .map(|rule| rule.sentence.to_string())
        .collect()
}
