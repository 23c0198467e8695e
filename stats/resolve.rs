//! Converts a gender classification into a probability that the author is female.
//!
//! Classifiers report confidence relative to the label they predicted. A name that
//! is "90% male" therefore carries `confidence = 0.9` and must become
//! `p_female = 0.1`. Reading the confidence as if it were always about the female
//! class flips the direction of every downstream estimate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ResolveError {
    #[error("Classifier confidence {0} lies outside [0, 1].")]
    InvalidConfidence(f64),
    #[error("'{0}' is not a recognized gender label (expected female, male, or unknown).")]
    UnrecognizedLabel(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderLabel {
    Female,
    Male,
    Unknown,
}

impl fmt::Display for GenderLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Female => "female",
            Self::Male => "male",
            Self::Unknown => "unknown",
        })
    }
}

impl FromStr for GenderLabel {
    type Err = ResolveError;

    /// Stored labels use lowercase words; an empty string is how older
    /// records mark an unresolved name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "female" | "f" => Ok(Self::Female),
            "male" | "m" => Ok(Self::Male),
            "unknown" | "" => Ok(Self::Unknown),
            _ => Err(ResolveError::UnrecognizedLabel(s.to_string())),
        }
    }
}

/// Outcome of name-based gender classification for one author.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: GenderLabel,
    /// Confidence in `label`, not in "female".
    pub confidence: Option<f64>,
}

impl Classification {
    pub fn new(label: GenderLabel, confidence: Option<f64>) -> Self {
        Self { label, confidence }
    }

    pub fn unknown() -> Self {
        Self::new(GenderLabel::Unknown, None)
    }

    pub fn p_female(&self) -> Result<Option<f64>, ResolveError> {
        resolve_p_female(self)
    }
}

/// Maps a classification onto `p_female ∈ [0, 1]`, or `None` for unknown.
///
/// A missing confidence on a female or male label is read as certainty.
/// Unknown labels always resolve to `None`, whatever confidence they carry.
pub fn resolve_p_female(classification: &Classification) -> Result<Option<f64>, ResolveError> {
    let confidence = match classification.label {
        GenderLabel::Unknown => return Ok(None),
        GenderLabel::Female | GenderLabel::Male => classification.confidence.unwrap_or(1.0),
    };
    if !(0.0..=1.0).contains(&confidence) {
        return Err(ResolveError::InvalidConfidence(confidence));
    }
    let p_female = match classification.label {
        GenderLabel::Female => confidence,
        _ => 1.0 - confidence,
    };
    Ok(Some(p_female))
}
