//! Data model exchanged with the intake collaborator.
//!
//! Field names on the wire follow the intake form (`Heart_Rate`,
//! `Risk_Level`, ...), not Rust naming.

pub mod enums;
pub mod patient;
pub mod result;

pub use enums::*;
pub use patient::*;
pub use result::*;

use thiserror::Error;

/// A malformed or out-of-range patient record. Never silently coerced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} out of range: {value} (allowed {min} to {max})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("{field}: unrecognised value '{token}'")]
    UnknownToken { field: &'static str, token: String },
}
