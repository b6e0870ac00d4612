//! Triage decision engine.
//!
//! Record → features → classifier → base routing → escalation → specialties
//! → rationale. Only `orchestrator` wires the stages together; each stage is a
//! pure function or a trait object so it can be exercised on its own.

pub mod classifier;
pub mod confidence;
pub mod escalation;
pub mod features;
pub mod orchestrator;
pub mod rationale;
pub mod specialty;
pub mod visual;

pub use classifier::*;
pub use confidence::*;
pub use escalation::*;
pub use features::*;
pub use orchestrator::*;
pub use rationale::*;
pub use specialty::*;
pub use visual::*;

use std::path::PathBuf;

use thiserror::Error;

use crate::models::ValidationError;

/// Classifier artifact missing or corrupt. Fatal at startup.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("cannot read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model artifact {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model feature schema mismatch: expected [{expected}], found [{found}]")]
    SchemaMismatch { expected: String, found: String },

    #[error("model declares unknown risk class '{0}'")]
    UnknownClass(String),

    #[error("invalid decision tree: {0}")]
    InvalidTree(String),
}

/// Feature vector does not fit the loaded model. A programming defect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelInputError {
    #[error("feature vector has {found} values, model expects {expected}")]
    Dimension { expected: usize, found: usize },

    #[error("feature {index} is not a finite number")]
    NonFinite { index: usize },
}

/// Optional image could not be read. Recovered locally by the orchestrator.
#[derive(Error, Debug)]
pub enum ImageDecodeError {
    #[error("image data is empty")]
    Empty,

    #[error("image data is {bytes} bytes, limit is {limit}")]
    TooLarge { bytes: usize, limit: usize },

    #[error("image is {width}x{height} pixels, limit is {limit}x{limit}")]
    DimensionsTooLarge { width: u32, height: u32, limit: u32 },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Errors that abort a single assessment.
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("invalid patient record: {0}")]
    Validation(#[from] ValidationError),

    #[error("classifier unavailable: {0}")]
    ModelLoad(#[from] ModelLoadError),

    #[error("classifier input rejected: {0}")]
    ModelInput(#[from] ModelInputError),
}
