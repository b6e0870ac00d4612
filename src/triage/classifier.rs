//! Classifier adapter over the pre-trained risk model.
//!
//! The artifact is a fitted CART decision tree exported as JSON:
//!
//! ```text
//! {
//!   "feature_names": ["Age", "Gender", ..., "Has_Heart_Disease"],
//!   "classes": ["High", "Low", "Medium"],
//!   "nodes": [
//!     { "feature": 2, "threshold": 110.5, "left": 1, "right": 2 },
//!     { "value": [0.0, 92.0, 8.0] },
//!     ...
//!   ]
//! }
//! ```
//!
//! Node 0 is the root. A split sends a row left when
//! `row[feature] <= threshold`. A leaf holds per-class training counts in
//! `classes` order; normalized, they are the class probabilities.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use super::{ModelInputError, ModelLoadError};
use crate::config;
use crate::models::RiskTier;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Probability per risk tier. Tiers absent from the model carry 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TierProbabilities {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl TierProbabilities {
    pub fn get(&self, tier: RiskTier) -> f64 {
        match tier {
            RiskTier::Low => self.low,
            RiskTier::Medium => self.medium,
            RiskTier::High => self.high,
        }
    }

    fn set(&mut self, tier: RiskTier, p: f64) {
        match tier {
            RiskTier::Low => self.low = p,
            RiskTier::Medium => self.medium = p,
            RiskTier::High => self.high = p,
        }
    }

    /// Largest class probability.
    pub fn top(&self) -> f64 {
        self.low.max(self.medium).max(self.high)
    }
}

/// Classifier output for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub tier: RiskTier,
    pub probabilities: TierProbabilities,
}

impl Classification {
    pub fn top_probability(&self) -> f64 {
        self.probabilities.top()
    }
}

/// Maps a feature vector to a risk tier plus a distribution over tiers.
///
/// Implementations are read-only after construction and shared across
/// concurrent assessments.
pub trait RiskClassifier: Send + Sync {
    fn classify(&self, features: &FeatureVector) -> Result<Classification, ModelInputError>;
}

/// One node of the exported tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

/// On-disk artifact layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    pub nodes: Vec<TreeNode>,
}

/// Validated decision tree, immutable once built.
#[derive(Debug, Clone)]
pub struct DecisionTreeModel {
    classes: Vec<RiskTier>,
    nodes: Vec<TreeNode>,
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

impl DecisionTreeModel {
    /// Load and validate the artifact at `path`.
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: ModelArtifact =
            serde_json::from_str(&raw).map_err(|source| ModelLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let model = Self::from_artifact(artifact)?;

        info!(
            path = %path.display(),
            nodes = model.nodes.len(),
            classes = model.classes.len(),
            "Risk classifier loaded"
        );
        Ok(model)
    }

    /// Parse and validate an artifact held in memory.
    pub fn from_json(json: &str) -> Result<Self, ModelLoadError> {
        let artifact: ModelArtifact =
            serde_json::from_str(json).map_err(|source| ModelLoadError::Parse {
                path: "<memory>".into(),
                source,
            })?;
        Self::from_artifact(artifact)
    }

    /// Validate schema, class labels and tree structure.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelLoadError> {
        if artifact.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES) {
            return Err(ModelLoadError::SchemaMismatch {
                expected: FEATURE_NAMES.join(", "),
                found: artifact.feature_names.join(", "),
            });
        }

        let mut classes = Vec::with_capacity(artifact.classes.len());
        for label in &artifact.classes {
            let tier: RiskTier = label
                .parse()
                .map_err(|_| ModelLoadError::UnknownClass(label.clone()))?;
            if classes.contains(&tier) {
                return Err(ModelLoadError::InvalidTree(format!(
                    "class '{label}' listed twice"
                )));
            }
            classes.push(tier);
        }
        if classes.is_empty() {
            return Err(ModelLoadError::InvalidTree("no classes".into()));
        }

        validate_nodes(&artifact.nodes, classes.len())?;

        Ok(Self {
            classes,
            nodes: artifact.nodes,
        })
    }

    pub fn classes(&self) -> &[RiskTier] {
        &self.classes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Walk the tree and return the leaf's class counts.
    pub fn predict_row(&self, row: &[f64]) -> Result<&[f64], ModelInputError> {
        if row.len() != FEATURE_COUNT {
            return Err(ModelInputError::Dimension {
                expected: FEATURE_COUNT,
                found: row.len(),
            });
        }
        if let Some(index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ModelInputError::NonFinite { index });
        }

        // Children always follow their parent, so this walk terminates.
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => return Ok(value.as_slice()),
            }
        }
    }
}

/// Structural checks: non-empty, children in range and after their parent,
/// split features inside the schema, leaves sized to the class list with
/// non-negative counts that sum above zero.
fn validate_nodes(nodes: &[TreeNode], class_count: usize) -> Result<(), ModelLoadError> {
    if nodes.is_empty() {
        return Err(ModelLoadError::InvalidTree("no nodes".into()));
    }

    for (i, node) in nodes.iter().enumerate() {
        match node {
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= FEATURE_COUNT {
                    return Err(ModelLoadError::InvalidTree(format!(
                        "node {i} splits on feature {feature}, schema has {FEATURE_COUNT}"
                    )));
                }
                if !threshold.is_finite() {
                    return Err(ModelLoadError::InvalidTree(format!(
                        "node {i} has a non-finite threshold"
                    )));
                }
                for child in [*left, *right] {
                    if child <= i || child >= nodes.len() {
                        return Err(ModelLoadError::InvalidTree(format!(
                            "node {i} points to invalid child {child}"
                        )));
                    }
                }
            }
            TreeNode::Leaf { value } => {
                if value.len() != class_count {
                    return Err(ModelLoadError::InvalidTree(format!(
                        "leaf {i} has {} counts for {class_count} classes",
                        value.len()
                    )));
                }
                if value.iter().any(|c| !c.is_finite() || *c < 0.0) {
                    return Err(ModelLoadError::InvalidTree(format!(
                        "leaf {i} has a negative or non-finite count"
                    )));
                }
                let total: f64 = value.iter().sum();
                if total <= 0.0 {
                    return Err(ModelLoadError::InvalidTree(format!(
                        "leaf {i} has no samples"
                    )));
                }
                if !total.is_finite() {
                    return Err(ModelLoadError::InvalidTree(format!(
                        "leaf {i} counts overflow when summed"
                    )));
                }
            }
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Inference
// ═══════════════════════════════════════════════════════════

impl RiskClassifier for DecisionTreeModel {
    fn classify(&self, features: &FeatureVector) -> Result<Classification, ModelInputError> {
        let counts = self.predict_row(features.as_slice())?;
        let total: f64 = counts.iter().sum();

        let mut probabilities = TierProbabilities::default();
        // Arg-max; on a tie the class listed first in the artifact wins.
        let mut best = 0;
        for (i, (tier, count)) in self.classes.iter().zip(counts).enumerate() {
            probabilities.set(*tier, count / total);
            if *count > counts[best] {
                best = i;
            }
        }
        let tier = self.classes[best];

        debug!(
            tier = %tier,
            top = probabilities.top(),
            "Risk classified"
        );
        Ok(Classification { tier, probabilities })
    }
}

// ═══════════════════════════════════════════════════════════
// Process-wide handle
// ═══════════════════════════════════════════════════════════

static SHARED_MODEL: OnceCell<Arc<DecisionTreeModel>> = OnceCell::new();

/// The artifact at [`config::model_path`], loaded on first use.
///
/// Concurrent first callers block on a single load. A failed load is not
/// memoized, so every caller sees the error until the artifact is fixed.
pub fn shared_model() -> Result<Arc<DecisionTreeModel>, ModelLoadError> {
    SHARED_MODEL
        .get_or_try_init(|| DecisionTreeModel::load(&config::model_path()).map(Arc::new))
        .cloned()
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::io::Write;

    use super::*;
    use crate::models::{Condition, Gender, PatientRecord, Symptom};

    const REFERENCE_MODEL: &str = include_str!("../../data/risk_classifier.json");

    /// Single split on heart rate: <= 100 is Low (9:1), otherwise High (3:2).
    fn make_stump_json() -> String {
        serde_json::json!({
            "feature_names": FEATURE_NAMES,
            "classes": ["High", "Low", "Medium"],
            "nodes": [
                { "feature": 2, "threshold": 100.0, "left": 1, "right": 2 },
                { "value": [0.0, 9.0, 1.0] },
                { "value": [3.0, 0.0, 2.0] }
            ]
        })
        .to_string()
    }

    fn features(heart_rate: u32) -> FeatureVector {
        FeatureVector::from_record(&PatientRecord {
            heart_rate,
            ..Default::default()
        })
    }

    #[test]
    fn stump_routes_on_threshold() {
        let model = DecisionTreeModel::from_json(&make_stump_json()).unwrap();

        let low = model.classify(&features(100)).unwrap();
        assert_eq!(low.tier, RiskTier::Low);
        assert!((low.probabilities.low - 0.9).abs() < 1e-9);
        assert!((low.probabilities.medium - 0.1).abs() < 1e-9);
        assert_eq!(low.probabilities.high, 0.0);

        let high = model.classify(&features(101)).unwrap();
        assert_eq!(high.tier, RiskTier::High);
        assert!((high.top_probability() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let model = DecisionTreeModel::from_json(REFERENCE_MODEL).unwrap();
        for hr in [45, 90, 111, 150] {
            let c = model.classify(&features(hr)).unwrap();
            let p = c.probabilities;
            assert!((p.low + p.medium + p.high - 1.0).abs() < 1e-9);
            assert!([p.low, p.medium, p.high].iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn tie_goes_to_first_listed_class() {
        let json = serde_json::json!({
            "feature_names": FEATURE_NAMES,
            "classes": ["Medium", "High"],
            "nodes": [{ "value": [5.0, 5.0] }]
        })
        .to_string();
        let model = DecisionTreeModel::from_json(&json).unwrap();
        let c = model.classify(&features(80)).unwrap();
        assert_eq!(c.tier, RiskTier::Medium);
        assert_eq!(c.probabilities.low, 0.0);
    }

    #[test]
    fn reference_model_low_risk_patient() {
        let model = DecisionTreeModel::from_json(REFERENCE_MODEL).unwrap();
        let record = PatientRecord {
            age: 25,
            heart_rate: 78,
            systolic_bp: 120,
            temperature: 98.6,
            ..Default::default()
        };
        let c = model.classify(&FeatureVector::from_record(&record)).unwrap();
        assert_eq!(c.tier, RiskTier::Low);
        assert!(c.top_probability() >= 0.85);
    }

    #[test]
    fn reference_model_high_risk_patient() {
        let model = DecisionTreeModel::from_json(REFERENCE_MODEL).unwrap();
        let record = PatientRecord {
            age: 70,
            gender: Gender::Male,
            heart_rate: 130,
            systolic_bp: 170,
            temperature: 102.5,
            symptoms: BTreeSet::from([Symptom::ChestPain]),
            pre_existing_conditions: BTreeSet::from([Condition::HeartDisease]),
        };
        let c = model.classify(&FeatureVector::from_record(&record)).unwrap();
        assert_eq!(c.tier, RiskTier::High);
    }

    #[test]
    fn rejects_wrong_width_and_non_finite_rows() {
        let model = DecisionTreeModel::from_json(&make_stump_json()).unwrap();
        assert_eq!(
            model.predict_row(&[1.0, 2.0]),
            Err(ModelInputError::Dimension {
                expected: 8,
                found: 2
            })
        );
        let mut row = [0.0; 8];
        row[4] = f64::NAN;
        assert_eq!(
            model.predict_row(&row),
            Err(ModelInputError::NonFinite { index: 4 })
        );
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let json = serde_json::json!({
            "feature_names": ["Age", "Gender"],
            "classes": ["Low"],
            "nodes": [{ "value": [1.0] }]
        })
        .to_string();
        let err = DecisionTreeModel::from_json(&json).unwrap_err();
        assert!(matches!(err, ModelLoadError::SchemaMismatch { .. }), "got {err}");
    }

    #[test]
    fn unknown_class_is_rejected() {
        let json = serde_json::json!({
            "feature_names": FEATURE_NAMES,
            "classes": ["Low", "Critical"],
            "nodes": [{ "value": [1.0, 1.0] }]
        })
        .to_string();
        let err = DecisionTreeModel::from_json(&json).unwrap_err();
        assert!(matches!(err, ModelLoadError::UnknownClass(ref c) if c == "Critical"));
    }

    #[test]
    fn structural_defects_are_rejected() {
        let cases = [
            // child points backwards (would loop)
            serde_json::json!([
                { "feature": 0, "threshold": 1.0, "left": 1, "right": 0 },
                { "value": [1.0] }
            ]),
            // child out of range
            serde_json::json!([
                { "feature": 0, "threshold": 1.0, "left": 1, "right": 9 },
                { "value": [1.0] }
            ]),
            // feature outside schema
            serde_json::json!([
                { "feature": 8, "threshold": 1.0, "left": 1, "right": 2 },
                { "value": [1.0] },
                { "value": [1.0] }
            ]),
            // leaf width != class count
            serde_json::json!([{ "value": [1.0, 2.0] }]),
            // empty leaf
            serde_json::json!([{ "value": [0.0] }]),
            // no nodes
            serde_json::json!([]),
        ];
        for nodes in cases {
            let json = serde_json::json!({
                "feature_names": FEATURE_NAMES,
                "classes": ["Low"],
                "nodes": nodes
            })
            .to_string();
            let err = DecisionTreeModel::from_json(&json).unwrap_err();
            assert!(matches!(err, ModelLoadError::InvalidTree(_)), "got {err}");
        }
    }

    #[test]
    fn leaf_counts_summing_to_infinity_are_rejected() {
        let json = serde_json::json!({
            "feature_names": FEATURE_NAMES,
            "classes": ["Low", "High"],
            "nodes": [{ "value": [1e308, 1e308] }]
        })
        .to_string();
        let err = DecisionTreeModel::from_json(&json).unwrap_err();
        assert!(
            matches!(&err, ModelLoadError::InvalidTree(msg) if msg.contains("overflow")),
            "got {err}"
        );
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DecisionTreeModel::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ModelLoadError::Io { .. }));
    }

    #[test]
    fn load_corrupt_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x80\x04\x95 not json").unwrap();
        let err = DecisionTreeModel::load(file.path()).unwrap_err();
        // Non-UTF-8 bytes fail at read time; either way it is not a usable model.
        assert!(matches!(
            err,
            ModelLoadError::Parse { .. } | ModelLoadError::Io { .. }
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"feature_names\": [").unwrap();
        let err = DecisionTreeModel::load(file.path()).unwrap_err();
        assert!(matches!(err, ModelLoadError::Parse { .. }));
    }

    #[test]
    fn load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(make_stump_json().as_bytes()).unwrap();
        let model = DecisionTreeModel::load(file.path()).unwrap();
        assert_eq!(model.node_count(), 3);
        assert_eq!(
            model.classes(),
            &[RiskTier::High, RiskTier::Low, RiskTier::Medium]
        );
    }

    #[test]
    fn reference_artifact_loads_from_disk() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/risk_classifier.json");
        let model = DecisionTreeModel::load(&path).unwrap();
        assert!(model.node_count() > 1);
    }

    #[test]
    fn shared_model_is_loaded_once() {
        if std::env::var_os("TRIAGE_MODEL_PATH").is_some() {
            return;
        }
        let handles: Vec<_> = (0..4).map(|_| std::thread::spawn(shared_model)).collect();
        let models: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        for m in &models[1..] {
            assert!(Arc::ptr_eq(&models[0], m));
        }
    }
}
