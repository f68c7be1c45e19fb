//! Score breakdowns, scoring properties, and per-version score snapshots.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::str::FromStr;

use crate::error::ScoringError;

/// Named component of a manoeuvre score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreGroup {
    /// Downgrades for errors inside each element
    Intra,
    /// Downgrades for errors between elements
    Inter,
    /// Downgrades for placement in the box
    Positioning,
    /// Final manoeuvre score
    Total,
}

impl ScoreGroup {
    pub const ALL: [Self; 4] = [Self::Intra, Self::Inter, Self::Positioning, Self::Total];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Intra => "intra",
            Self::Inter => "inter",
            Self::Positioning => "positioning",
            Self::Total => "total",
        }
    }
}

impl std::fmt::Display for ScoreGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreGroup {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "intra" => Ok(Self::Intra),
            "inter" => Ok(Self::Inter),
            "positioning" => Ok(Self::Positioning),
            "total" => Ok(Self::Total),
            _ => Err(ScoringError::InvalidGroup(s.to_string())),
        }
    }
}

/// Which score groups a table should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupSelection {
    Single(ScoreGroup),
    All,
}

impl GroupSelection {
    /// Requested groups in column order.
    #[must_use]
    pub fn groups(self) -> SmallVec<[ScoreGroup; 4]> {
        match self {
            Self::Single(group) => SmallVec::from_slice(&[group]),
            Self::All => SmallVec::from_slice(&ScoreGroup::ALL),
        }
    }
}

impl Default for GroupSelection {
    fn default() -> Self {
        Self::Single(ScoreGroup::Total)
    }
}

impl From<ScoreGroup> for GroupSelection {
    fn from(group: ScoreGroup) -> Self {
        Self::Single(group)
    }
}

impl FromStr for GroupSelection {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Single)
    }
}

/// Score breakdown of one manoeuvre.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Score {
    #[serde(default)]
    pub intra: f64,
    #[serde(default)]
    pub inter: f64,
    #[serde(default)]
    pub positioning: f64,
    #[serde(default)]
    pub total: f64,
}

impl Score {
    #[must_use]
    pub const fn get(&self, group: ScoreGroup) -> f64 {
        match group {
            ScoreGroup::Intra => self.intra,
            ScoreGroup::Inter => self.inter,
            ScoreGroup::Positioning => self.positioning,
            ScoreGroup::Total => self.total,
        }
    }
}

/// Judging configuration a score was computed under.
///
/// The default is the competition convention: difficulty 3 with truncation
/// disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreProperties {
    #[serde(default = "ScoreProperties::default_difficulty")]
    pub difficulty: u8,
    #[serde(default)]
    pub truncate: bool,
}

impl ScoreProperties {
    const fn default_difficulty() -> u8 {
        3
    }

    #[must_use]
    pub const fn new(difficulty: u8, truncate: bool) -> Self {
        Self {
            difficulty,
            truncate,
        }
    }
}

impl Default for ScoreProperties {
    fn default() -> Self {
        Self {
            difficulty: Self::default_difficulty(),
            truncate: false,
        }
    }
}

impl std::fmt::Display for ScoreProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "difficulty={} truncate={}", self.difficulty, self.truncate)
    }
}

/// A score computed under one set of properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    #[serde(default)]
    pub properties: ScoreProperties,
    pub score: Score,
}

/// Everything one scoring pass produced for a manoeuvre under a single
/// scoring version.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    #[serde(default)]
    pub results: Vec<ScoreResult>,
}

impl ScoreSnapshot {
    #[must_use]
    pub fn new(results: Vec<ScoreResult>) -> Self {
        Self { results }
    }

    /// Snapshot holding a single score under the given properties.
    #[must_use]
    pub fn single(properties: ScoreProperties, score: Score) -> Self {
        Self::new(vec![ScoreResult { properties, score }])
    }

    /// Look up the result computed under `props`, if the pass produced one.
    #[must_use]
    pub fn get_score(&self, props: &ScoreProperties) -> Option<&ScoreResult> {
        self.results.iter().find(|result| result.properties == *props)
    }
}
