use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of conditions the service can score.
///
/// Each variant selects a model artifact, a feature schema and an advisory
/// sub-table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disease {
    Cardiovascular,
    Diabetes,
    Copd,
    Depression,
    Kidney,
}

impl Disease {
    /// Every disease, in registry load order.
    pub const ALL: [Disease; 5] = [
        Disease::Cardiovascular,
        Disease::Diabetes,
        Disease::Copd,
        Disease::Depression,
        Disease::Kidney,
    ];

    /// Route segment and advisory key (`/predict/<slug>`).
    pub fn slug(self) -> &'static str {
        match self {
            Disease::Cardiovascular => "cardiovascular",
            Disease::Diabetes => "diabetes",
            Disease::Copd => "copd",
            Disease::Depression => "depression",
            Disease::Kidney => "kidney",
        }
    }

    /// Human-readable name returned in prediction responses.
    pub fn display_name(self) -> &'static str {
        match self {
            Disease::Cardiovascular => "Cardiovascular Disease",
            Disease::Diabetes => "Diabetes",
            Disease::Copd => "COPD",
            Disease::Depression => "Depression",
            Disease::Kidney => "Kidney Disease",
        }
    }

    /// File stem of the model artifact inside the model directory.
    pub fn artifact_stem(self) -> &'static str {
        match self {
            Disease::Cardiovascular => "cardio",
            other => other.slug(),
        }
    }

    /// Preferred artifact file name, `<stem>.json`.
    pub fn artifact_file_name(self) -> String {
        format!("{}.json", self.artifact_stem())
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Binary classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Class 0: low risk.
    Low,
    /// Class 1: elevated risk.
    Elevated,
}

impl Outcome {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Outcome::Low),
            1 => Some(Outcome::Elevated),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Outcome::Low => 0,
            Outcome::Elevated => 1,
        }
    }
}

/// Returned when a path segment or query value names no known disease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDisease(pub String);

impl fmt::Display for UnknownDisease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown disease '{}'", self.0)
    }
}

impl std::error::Error for UnknownDisease {}

impl FromStr for Disease {
    type Err = UnknownDisease;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Disease::ALL
            .into_iter()
            .find(|d| d.slug() == wanted)
            .ok_or_else(|| UnknownDisease(s.to_string()))
    }
}
