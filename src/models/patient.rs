use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::{Condition, Gender, Symptom, ValidationError};

/// Accepted input ranges, matching the bounds offered by the intake form.
pub mod ranges {
    use std::ops::RangeInclusive;

    pub const AGE: RangeInclusive<u32> = 1..=100;
    pub const HEART_RATE_BPM: RangeInclusive<u32> = 40..=160;
    pub const SYSTOLIC_BP_MMHG: RangeInclusive<u32> = 80..=200;
    pub const TEMPERATURE_F: RangeInclusive<f64> = 95.0..=105.0;
}

/// Token that stands for "nothing reported" in collaborator lists.
const NONE_TOKEN: &str = "none";

/// Immutable snapshot of one assessment request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "Age")]
    pub age: u32,
    #[serde(rename = "Gender")]
    pub gender: Gender,
    #[serde(rename = "Heart_Rate")]
    pub heart_rate: u32,
    #[serde(rename = "Systolic_BP")]
    pub systolic_bp: u32,
    /// Degrees Fahrenheit.
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Symptoms", default, deserialize_with = "deserialize_token_set")]
    pub symptoms: BTreeSet<Symptom>,
    #[serde(
        rename = "Pre_Existing_Conditions",
        default,
        deserialize_with = "deserialize_token_set"
    )]
    pub pre_existing_conditions: BTreeSet<Condition>,
}

impl Default for PatientRecord {
    /// The intake form's pre-filled values.
    fn default() -> Self {
        Self {
            age: 45,
            gender: Gender::Male,
            heart_rate: 80,
            systolic_bp: 120,
            temperature: 98.6,
            symptoms: BTreeSet::new(),
            pre_existing_conditions: BTreeSet::new(),
        }
    }
}

impl PatientRecord {
    /// Check every numeric field against its accepted range.
    ///
    /// The first failing field is reported. Set-valued fields are closed
    /// vocabularies and cannot hold invalid tokens once constructed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("Age", self.age, &ranges::AGE)?;
        check_range("Heart_Rate", self.heart_rate, &ranges::HEART_RATE_BPM)?;
        check_range("Systolic_BP", self.systolic_bp, &ranges::SYSTOLIC_BP_MMHG)?;

        if !self.temperature.is_finite() {
            return Err(ValidationError::NonFinite {
                field: "Temperature",
            });
        }
        if !ranges::TEMPERATURE_F.contains(&self.temperature) {
            return Err(ValidationError::OutOfRange {
                field: "Temperature",
                value: self.temperature,
                min: *ranges::TEMPERATURE_F.start(),
                max: *ranges::TEMPERATURE_F.end(),
            });
        }
        Ok(())
    }

    pub fn has_symptom(&self, symptom: Symptom) -> bool {
        self.symptoms.contains(&symptom)
    }

    pub fn has_condition(&self, condition: Condition) -> bool {
        self.pre_existing_conditions.contains(&condition)
    }
}

fn check_range(
    field: &'static str,
    value: u32,
    range: &RangeInclusive<u32>,
) -> Result<(), ValidationError> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(ValidationError::OutOfRange {
        field,
        value: f64::from(value),
        min: f64::from(*range.start()),
        max: f64::from(*range.end()),
    })
}

/// Parse a comma-separated symptom list such as `"chest pain, fever"`.
pub fn parse_symptoms(raw: &str) -> Result<BTreeSet<Symptom>, ValidationError> {
    parse_token_list(raw)
}

/// Parse a comma-separated condition list. `"none"` means no conditions.
pub fn parse_conditions(raw: &str) -> Result<BTreeSet<Condition>, ValidationError> {
    parse_token_list(raw)
}

/// Split on commas, trim, drop empty items and the `none` placeholder.
fn parse_token_list<T>(raw: &str) -> Result<BTreeSet<T>, ValidationError>
where
    T: FromStr<Err = ValidationError> + Ord,
{
    collect_tokens(raw.split(','))
}

fn collect_tokens<'a, T, I>(items: I) -> Result<BTreeSet<T>, ValidationError>
where
    T: FromStr<Err = ValidationError> + Ord,
    I: IntoIterator<Item = &'a str>,
{
    items
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty() && !item.eq_ignore_ascii_case(NONE_TOKEN))
        .map(T::from_str)
        .collect()
}

/// Accept a token set either as a JSON array or as the collaborator's
/// comma-separated string (`"chest pain, fever"`, `"none"`).
fn deserialize_token_set<'de, D, T>(deserializer: D) -> Result<BTreeSet<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = ValidationError> + Ord,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TokenList {
        Joined(String),
        Items(Vec<String>),
    }

    let parsed = match TokenList::deserialize(deserializer)? {
        TokenList::Joined(raw) => parse_token_list(&raw),
        TokenList::Items(items) => collect_tokens(items.iter().map(String::as_str)),
    };
    parsed.map_err(serde::de::Error::custom)
}
