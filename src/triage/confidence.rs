use crate::models::ConfidenceLabel;

/// Top-probability cut-offs for the confidence label.
pub mod thresholds {
    /// At or above this: High.
    pub const HIGH: f64 = 0.85;

    /// At or above this: Medium. Below: Low.
    pub const MEDIUM: f64 = 0.65;
}

/// Label the classifier's top class probability.
///
/// Informational only; escalation compares the raw probability against its
/// own threshold.
pub fn confidence_label(top_probability: f64) -> ConfidenceLabel {
    if top_probability >= thresholds::HIGH {
        ConfidenceLabel::High
    } else if top_probability >= thresholds::MEDIUM {
        ConfidenceLabel::Medium
    } else {
        ConfidenceLabel::Low
    }
}
