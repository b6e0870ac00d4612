use serde::Serialize;

use crate::models::{Condition, Gender, PatientRecord, Symptom};

pub const FEATURE_COUNT: usize = 8;

/// Order-stable feature schema shared with the offline training pipeline.
/// Any replacement model must be trained on exactly these columns.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Age",
    "Gender",
    "Heart_Rate",
    "Systolic_BP",
    "Temperature",
    "Has_Chest_Pain",
    "Has_Fever",
    "Has_Heart_Disease",
];

/// Numeric encoding of a [`PatientRecord`]. Pure function of the record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_record(record: &PatientRecord) -> Self {
        Self([
            f64::from(record.age),
            encode_gender(record.gender),
            f64::from(record.heart_rate),
            f64::from(record.systolic_bp),
            record.temperature,
            indicator(record.has_symptom(Symptom::ChestPain)),
            indicator(record.has_symptom(Symptom::Fever)),
            indicator(record.has_condition(Condition::HeartDisease)),
        ])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Male = 0, Female = 1, as in the training set.
fn encode_gender(gender: Gender) -> f64 {
    match gender {
        Gender::Male => 0.0,
        Gender::Female => 1.0,
    }
}

fn indicator(present: bool) -> f64 {
    if present {
        1.0
    } else {
        0.0
    }
}
