//! Base routing and care-level escalation.
//!
//! The risk tier fixes a base department and care level. Escalation rules
//! then run in a fixed order, each able to raise (never lower) the care level
//! and append one reason:
//!
//! 1. ESC-CONF: top class probability below 0.65 → one step up.
//! 2. ESC-VIS: visual irregularity while the level is still OPD → Ward.
//!
//! ESC-VIS sees the level left by ESC-CONF, so once low confidence has moved
//! a patient off OPD the visual rule cannot fire.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::{CareLevel, RiskTier, Symptom};

/// Escalate when the top class probability is strictly below this.
pub const CONFIDENCE_ESCALATION_THRESHOLD: f64 = 0.65;

pub const LOW_CONFIDENCE_REASON: &str = "Low model confidence – clinician review advised";
pub const VISUAL_IRREGULARITY_REASON: &str = "Visual skin irregularity detected";

// ── Base routing ────────────────────────────────────────────

/// Department and care level implied by the risk tier alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseRouting {
    pub department: &'static str,
    pub care_level: CareLevel,
}

pub fn base_care_level(tier: RiskTier) -> CareLevel {
    match tier {
        RiskTier::High => CareLevel::Icu,
        RiskTier::Medium => CareLevel::Ward,
        RiskTier::Low => CareLevel::Opd,
    }
}

pub fn base_department(tier: RiskTier, symptoms: &BTreeSet<Symptom>) -> &'static str {
    match tier {
        RiskTier::High if symptoms.contains(&Symptom::ChestPain) => "Emergency / Cardiology",
        RiskTier::High => "Emergency",
        RiskTier::Medium => "General Medicine",
        RiskTier::Low => "Outpatient / General Medicine",
    }
}

pub fn base_routing(tier: RiskTier, symptoms: &BTreeSet<Symptom>) -> BaseRouting {
    BaseRouting {
        department: base_department(tier, symptoms),
        care_level: base_care_level(tier),
    }
}

// ── Escalation rules ────────────────────────────────────────

/// Evidence the escalation rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscalationSignals {
    pub top_probability: f64,
    pub visual_irregularity: bool,
}

/// Final care level plus the reasons, in the order the rules fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscalationOutcome {
    pub care_level: CareLevel,
    pub reasons: Vec<String>,
}

enum EscalationCondition {
    ConfidenceBelow(f64),
    VisualIrregularity,
}

enum EscalationEffect {
    /// One step up the care order; fires at ICU too (ICU absorbs).
    StepUp,
    /// Move `from` → `to`; any other level is left alone and the rule does not fire.
    Raise { from: CareLevel, to: CareLevel },
}

struct EscalationRule {
    /// Identifier for the audit log.
    id: &'static str,
    condition: EscalationCondition,
    effect: EscalationEffect,
    reason: &'static str,
}

/// Evaluation order is part of the contract.
static RULES: &[EscalationRule] = &[
    EscalationRule {
        id: "ESC-CONF",
        condition: EscalationCondition::ConfidenceBelow(CONFIDENCE_ESCALATION_THRESHOLD),
        effect: EscalationEffect::StepUp,
        reason: LOW_CONFIDENCE_REASON,
    },
    EscalationRule {
        id: "ESC-VIS",
        condition: EscalationCondition::VisualIrregularity,
        effect: EscalationEffect::Raise {
            from: CareLevel::Opd,
            to: CareLevel::Ward,
        },
        reason: VISUAL_IRREGULARITY_REASON,
    },
];

impl EscalationCondition {
    fn holds(&self, signals: &EscalationSignals) -> bool {
        match self {
            Self::ConfidenceBelow(threshold) => signals.top_probability < *threshold,
            Self::VisualIrregularity => signals.visual_irregularity,
        }
    }
}

impl EscalationEffect {
    /// New level, or `None` when the effect does not apply at `current`.
    fn apply(&self, current: CareLevel) -> Option<CareLevel> {
        match self {
            Self::StepUp => Some(current.escalate()),
            Self::Raise { from, to } if current == *from => Some(*to),
            Self::Raise { .. } => None,
        }
    }
}

/// Run the escalation rules over a base care level.
pub fn escalate(base: CareLevel, signals: &EscalationSignals) -> EscalationOutcome {
    let mut care_level = base;
    let mut reasons = Vec::new();

    for rule in RULES {
        if !rule.condition.holds(signals) {
            continue;
        }
        let Some(raised) = rule.effect.apply(care_level) else {
            continue;
        };

        tracing::warn!(
            rule_id = rule.id,
            from = %care_level,
            to = %raised,
            "Care level escalation rule fired"
        );

        // Rules only ever raise.
        care_level = raised.max(care_level);
        reasons.push(rule.reason.to_string());
    }

    EscalationOutcome {
        care_level,
        reasons,
    }
}
