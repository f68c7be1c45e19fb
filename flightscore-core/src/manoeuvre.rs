//! Manoeuvre records and their per-version score history.
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::ScoringError;
use crate::schedule::ScheduleRef;
use crate::score::{Score, ScoreProperties, ScoreSnapshot};

/// Where in the box a manoeuvre is flown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    Centre,
    End,
}

/// Placement metadata for a manoeuvre definition.
///
/// Box locations and centring hints are produced by the geometry layer and
/// carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManInfo {
    pub name: String,
    pub short_name: String,
    pub k: f64,
    pub position: Position,
    #[serde(default)]
    pub start: serde_json::Value,
    #[serde(default)]
    pub end: serde_json::Value,
    /// Points that should be centred; ids refer to the preceding element.
    #[serde(default)]
    pub centre_points: Vec<u32>,
    /// Element ids that should be centred, with their centring fraction.
    #[serde(default)]
    pub centred_els: Vec<(u32, f64)>,
}

/// One judged manoeuvre of a flight plus every score computed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManoeuvreRecord {
    pub name: String,
    /// Short identifier, e.g. the schedule slot.
    #[serde(alias = "short_name")]
    pub id: String,
    /// Difficulty coefficient applied to factored totals.
    pub k: f64,
    #[serde(default)]
    pub info: Option<ManInfo>,
    pub schedule: ScheduleRef,
    #[serde(default)]
    pub schedule_direction: Option<String>,
    /// Raw flown telemetry for the manoeuvre.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flown: Option<serde_json::Value>,
    /// Fitted manoeuvre geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manoeuvre: Option<serde_json::Value>,
    /// Template generated from the fitted geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<serde_json::Value>,
    /// Score snapshots keyed by scoring version.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub history: BTreeMap<String, ScoreSnapshot>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, ScoreSnapshot>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<BTreeMap<String, ScoreSnapshot>>::deserialize(deserializer)
        .map(Option::unwrap_or_default)
}

impl ManoeuvreRecord {
    /// Create a record with an empty history.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        k: f64,
        schedule: ScheduleRef,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            k,
            info: None,
            schedule,
            schedule_direction: None,
            flown: None,
            manoeuvre: None,
            template: None,
            history: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_info(mut self, info: ManInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// Builder-style [`Self::add_snapshot`] for fixtures and ingestion code.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::DuplicateVersion`] if `version` is already present.
    pub fn with_snapshot(
        mut self,
        version: impl Into<String>,
        snapshot: ScoreSnapshot,
    ) -> Result<Self, ScoringError> {
        self.add_snapshot(version, snapshot)?;
        Ok(self)
    }

    /// Record the result of a new scoring pass.
    ///
    /// History is append-only, so an existing version is never replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::DuplicateVersion`] if `version` is already present.
    pub fn add_snapshot(
        &mut self,
        version: impl Into<String>,
        snapshot: ScoreSnapshot,
    ) -> Result<(), ScoringError> {
        let version = version.into();
        if self.history.contains_key(&version) {
            return Err(ScoringError::DuplicateVersion {
                manoeuvre: self.name.clone(),
                version,
            });
        }
        self.history.insert(version, snapshot);
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self, version: &str) -> Option<&ScoreSnapshot> {
        self.history.get(version)
    }

    /// Score for `version` under `props`, if that pass produced one.
    #[must_use]
    pub fn score(&self, version: &str, props: &ScoreProperties) -> Option<&Score> {
        self.snapshot(version)
            .and_then(|snapshot| snapshot.get_score(props))
            .map(|result| &result.score)
    }

    /// Total score for `version` multiplied by the difficulty coefficient.
    #[must_use]
    pub fn k_factored_score(&self, version: &str, props: &ScoreProperties) -> Option<f64> {
        self.score(version, props).map(|score| score.total * self.k)
    }

    /// Lighter copy without telemetry, geometry, or template payloads.
    #[must_use]
    pub fn basic(&self) -> Self {
        Self {
            name: self.name.clone(),
            id: self.id.clone(),
            k: self.k,
            info: self.info.clone(),
            schedule: self.schedule.clone(),
            schedule_direction: self.schedule_direction.clone(),
            flown: None,
            manoeuvre: None,
            template: None,
            history: self.history.clone(),
        }
    }
}
