use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::ValidationError;

/// Macro to generate a closed vocabulary enum with as_str + std::str::FromStr.
///
/// The string form is the wire form: serde renames each variant to it on
/// output. Input, from JSON or `FromStr`, is case-insensitive so collaborator
/// input like "chest pain" lands.
/// The `in "Field"` part names the record field reported on a bad token.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident in $field:literal { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($s) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(ValidationError::UnknownToken {
                    field: $field,
                    token: s.into(),
                })
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

str_enum!(Gender in "Gender" {
    Male => "Male",
    Female => "Female",
});

str_enum!(
    /// Reported symptom vocabulary offered by the intake form.
    Symptom in "Symptoms" {
        ChestPain => "chest pain",
        Fever => "fever",
        Cough => "cough",
        Breathlessness => "breathlessness",
        Fatigue => "fatigue",
        Dizziness => "dizziness",
        Headache => "headache",
        Nausea => "nausea",
    }
);

str_enum!(Condition in "Pre_Existing_Conditions" {
    HeartDisease => "heart disease",
    Diabetes => "diabetes",
    Hypertension => "hypertension",
    Asthma => "asthma",
});

str_enum!(
    /// Discrete urgency class produced by the classifier. Ordered Low < Medium < High.
    RiskTier in "Risk_Level" {
        Low => "Low",
        Medium => "Medium",
        High => "High",
    }
);

str_enum!(
    /// Informational label derived from the top class probability.
    ConfidenceLabel in "Confidence" {
        Low => "Low",
        Medium => "Medium",
        High => "High",
    }
);

str_enum!(
    /// Operational disposition, ordered by intensity.
    ///
    /// The derived `Ord` is the escalation order: OPD < Ward < ICU.
    CareLevel in "Recommended_Care_Level" {
        Opd => "OPD-level care",
        Ward => "Ward / Observation",
        Icu => "ICU-level attention",
    }
);

impl CareLevel {
    /// One step up the escalation order. ICU is absorbing.
    pub fn escalate(self) -> Self {
        match self {
            Self::Opd => Self::Ward,
            Self::Ward => Self::Icu,
            Self::Icu => Self::Icu,
        }
    }
}

str_enum!(
    /// Clinical specialty suggested for initial evaluation.
    Specialty in "Suggested_Specialties" {
        Cardiology => "Cardiology",
        Dermatology => "Dermatology",
        GeneralMedicine => "General Medicine",
        Neurology => "Neurology",
        Pulmonology => "Pulmonology",
    }
);
