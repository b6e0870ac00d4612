//! Public entry point: one patient record (plus optional image) in, one
//! [`TriageResult`] out.

use std::sync::Arc;

use tracing::{debug, warn};

use super::classifier::{shared_model, RiskClassifier};
use super::confidence::confidence_label;
use super::escalation::{base_routing, escalate, EscalationSignals};
use super::features::FeatureVector;
use super::rationale::key_factors;
use super::specialty::suggest_specialties;
use super::visual::{IrregularityDetector, VariationDetector};
use super::TriageError;
use crate::models::{PatientRecord, TriageResult, VisualObservation};

/// Composes the triage stages. Read-only after construction, so one instance
/// can serve concurrent assessments.
pub struct TriageOrchestrator {
    classifier: Arc<dyn RiskClassifier>,
    detector: Box<dyn IrregularityDetector>,
}

impl TriageOrchestrator {
    /// Build around an already-loaded classifier.
    pub fn new(classifier: Arc<dyn RiskClassifier>) -> Self {
        Self {
            classifier,
            detector: Box::new(VariationDetector::default()),
        }
    }

    /// Replace the image detector.
    pub fn with_detector(mut self, detector: Box<dyn IrregularityDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Build around the process-wide model handle.
    pub fn from_shared_model() -> Result<Self, TriageError> {
        let model = shared_model()?;
        Ok(Self::new(model))
    }

    /// Assess one patient.
    ///
    /// Fails only on an invalid record or a classifier defect. An image that
    /// cannot be decoded is treated as absent and reported through
    /// `visual_observation`.
    pub fn assess(
        &self,
        record: &PatientRecord,
        image: Option<&[u8]>,
    ) -> Result<TriageResult, TriageError> {
        // 1. Validate before anything reaches the classifier
        record.validate()?;

        // 2. Features → classifier
        let features = FeatureVector::from_record(record);
        let classification = self.classifier.classify(&features)?;
        let top_probability = classification.top_probability();

        // 3. Base routing from tier
        let routing = base_routing(classification.tier, &record.symptoms);

        // 4. Optional image
        let visual_observation = self.observe(image);
        let visual_irregularity = visual_observation.is_irregular();

        // 5. Escalation
        let outcome = escalate(
            routing.care_level,
            &EscalationSignals {
                top_probability,
                visual_irregularity,
            },
        );

        // 6. Specialties + rationale
        let suggested_specialties = suggest_specialties(
            &record.symptoms,
            &record.pre_existing_conditions,
            visual_irregularity,
        );

        debug!(
            tier = %classification.tier,
            top = top_probability,
            base = %routing.care_level,
            care_level = %outcome.care_level,
            escalations = outcome.reasons.len(),
            "Assessment complete"
        );

        Ok(TriageResult {
            risk_level: classification.tier,
            confidence: confidence_label(top_probability),
            recommended_department: routing.department.to_string(),
            recommended_care_level: outcome.care_level,
            key_factors: key_factors(record),
            escalation_reasons: outcome.reasons,
            suggested_specialties,
            visual_observation,
        })
    }

    fn observe(&self, image: Option<&[u8]>) -> VisualObservation {
        let Some(bytes) = image else {
            return VisualObservation::NotSupplied;
        };
        match self.detector.analyze(bytes) {
            Ok(report) => VisualObservation::Analyzed {
                score: report.score,
                irregular: report.irregular,
            },
            Err(e) => {
                warn!(error = %e, "Skin image could not be analyzed, continuing without it");
                VisualObservation::Unreadable {
                    reason: e.to_string(),
                }
            }
        }
    }
}
