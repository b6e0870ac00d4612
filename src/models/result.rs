use serde::{Deserialize, Serialize};

use super::{CareLevel, ConfidenceLabel, RiskTier, Specialty};

/// What happened to the optional skin image during an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum VisualObservation {
    /// No image was attached to the request.
    NotSupplied,
    /// The image decoded and was scored.
    Analyzed { score: f64, irregular: bool },
    /// The image could not be decoded; the assessment proceeded without it.
    Unreadable { reason: String },
}

impl VisualObservation {
    /// Whether the observation contributes a visual irregularity flag.
    pub fn is_irregular(&self) -> bool {
        matches!(self, Self::Analyzed { irregular: true, .. })
    }
}

/// Outcome of one assessment. Built once, never mutated, not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    #[serde(rename = "Risk_Level")]
    pub risk_level: RiskTier,
    #[serde(rename = "Confidence")]
    pub confidence: ConfidenceLabel,
    #[serde(rename = "Recommended_Department")]
    pub recommended_department: String,
    #[serde(rename = "Recommended_Care_Level")]
    pub recommended_care_level: CareLevel,
    /// One plain-language sentence per fired vital/symptom check.
    #[serde(rename = "Key_Factors")]
    pub key_factors: Vec<String>,
    /// Why the care level was raised above the tier's base level, in firing order.
    #[serde(rename = "Escalation_Reasons")]
    pub escalation_reasons: Vec<String>,
    /// Sorted by name, distinct, never empty.
    #[serde(rename = "Suggested_Specialties")]
    pub suggested_specialties: Vec<Specialty>,
    #[serde(rename = "Visual_Observation")]
    pub visual_observation: VisualObservation,
}

impl TriageResult {
    /// Notice for the display layer when a supplied image had to be skipped.
    pub fn image_notice(&self) -> Option<&'static str> {
        match self.visual_observation {
            VisualObservation::Unreadable { .. } => {
                Some("Image could not be analyzed, proceeding without it.")
            }
            _ => None,
        }
    }
}
