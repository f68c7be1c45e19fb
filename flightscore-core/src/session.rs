//! Flight-level container of scored manoeuvres.
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::ops::Index;

use crate::aggregate::{self, FlightTotal, MissingPolicy, ScoreTable};
use crate::error::ScoringError;
use crate::manoeuvre::ManoeuvreRecord;
use crate::schedule::FlightSchedule;
use crate::score::{GroupSelection, ScoreProperties};
use crate::version::{self, VersionSelector};

/// Geographic origin of the flight box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Origin {
    pub lat: f64,
    pub lng: f64,
    pub alt: f64,
    /// Box heading in degrees.
    pub heading: f64,
}

/// Manoeuvre identifier accepted by [`FlightSession::get_man`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ManId {
    Name(String),
    Index(usize),
}

impl From<&str> for ManId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ManId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for ManId {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A judged flight: metadata plus its manoeuvres in flight order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSession {
    #[serde(default)]
    pub origin: Option<Origin>,
    #[serde(rename = "isComp")]
    pub is_comp: bool,
    #[serde(default, rename = "sourceBin")]
    pub source_bin: Option<String>,
    #[serde(default, rename = "sourceFCJ")]
    pub source_fcj: Option<String>,
    /// Logger boot time; timestamps without an offset are read as UTC.
    #[serde(default, rename = "bootTime", deserialize_with = "utc_or_naive")]
    pub boot_time: Option<DateTime<Utc>>,
    pub mans: Vec<ManoeuvreRecord>,
}

fn utc_or_naive<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(stamp) = text.parse::<DateTime<FixedOffset>>() {
        return Ok(Some(stamp.with_timezone(&Utc)));
    }
    text.parse::<NaiveDateTime>()
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}

impl FlightSession {
    /// Session with no metadata around the given manoeuvres.
    #[must_use]
    pub const fn new(is_comp: bool, mans: Vec<ManoeuvreRecord>) -> Self {
        Self {
            origin: None,
            is_comp,
            source_bin: None,
            source_fcj: None,
            boot_time: None,
            mans,
        }
    }

    /// Parse and validate a flight document.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Parse`] if the document is not valid JSON or
    /// does not match the flight schema.
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate an already-parsed flight document.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Parse`] if the value does not match the flight
    /// schema.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ScoringError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize back into the flight document format.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Serialize`] if a value cannot be represented in
    /// JSON.
    pub fn to_json_pretty(&self) -> Result<String, ScoringError> {
        serde_json::to_string_pretty(self).map_err(ScoringError::Serialize)
    }

    /// Same flight metadata with every manoeuvre reduced to its basic form.
    #[must_use]
    pub fn basic(&self) -> Self {
        Self {
            origin: self.origin,
            is_comp: self.is_comp,
            source_bin: self.source_bin.clone(),
            source_fcj: self.source_fcj.clone(),
            boot_time: self.boot_time,
            mans: self.mans.iter().map(ManoeuvreRecord::basic).collect(),
        }
    }

    #[must_use]
    pub fn man_names(&self) -> Vec<&str> {
        self.mans.iter().map(|m| m.name.as_str()).collect()
    }

    /// Look up a manoeuvre by name (first match) or position.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::ManoeuvreNotFound`] for an unknown name and
    /// [`ScoringError::IndexOutOfRange`] for an index past the end.
    pub fn get_man(&self, id: impl Into<ManId>) -> Result<&ManoeuvreRecord, ScoringError> {
        match id.into() {
            ManId::Name(name) => self
                .mans
                .iter()
                .find(|m| m.name == name)
                .ok_or(ScoringError::ManoeuvreNotFound { name }),
            ManId::Index(index) => self.mans.get(index).ok_or(ScoringError::IndexOutOfRange {
                index,
                len: self.mans.len(),
            }),
        }
    }

    /// Mutable lookup, used when appending a new scoring pass.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_man`].
    pub fn get_man_mut(
        &mut self,
        id: impl Into<ManId>,
    ) -> Result<&mut ManoeuvreRecord, ScoringError> {
        let len = self.mans.len();
        match id.into() {
            ManId::Name(name) => self
                .mans
                .iter_mut()
                .find(|m| m.name == name)
                .ok_or(ScoringError::ManoeuvreNotFound { name }),
            ManId::Index(index) => self
                .mans
                .get_mut(index)
                .ok_or(ScoringError::IndexOutOfRange { index, len }),
        }
    }

    /// Schedule shared by every manoeuvre, or [`FlightSchedule::Mixed`].
    ///
    /// Schedules are compared by value.
    #[must_use]
    pub fn schedule(&self) -> FlightSchedule {
        let Some((first, rest)) = self.mans.split_first() else {
            return FlightSchedule::Mixed;
        };
        if rest.iter().all(|m| m.schedule == first.schedule) {
            FlightSchedule::Single(first.schedule.to_info())
        } else {
            log::debug!("flight mixes schedules; first is {}", first.schedule.name);
            FlightSchedule::Mixed
        }
    }

    #[must_use]
    pub fn all_versions(&self) -> BTreeSet<String> {
        version::list_versions(&self.mans)
    }

    #[must_use]
    pub fn all_valid_versions(&self) -> Vec<String> {
        version::list_valid_versions(&self.mans)
    }

    /// True when every manoeuvre has a snapshot for `version` (a leading
    /// `v` is ignored).
    #[must_use]
    pub fn check_version(&self, version: &str) -> bool {
        version::check_version(&self.mans, version)
    }

    /// Per-manoeuvre scores for one version; see [`aggregate::get_scores`].
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::MissingScore`] under [`MissingPolicy::Raise`].
    pub fn get_scores(
        &self,
        version: &str,
        props: Option<&ScoreProperties>,
        groups: GroupSelection,
        missing: MissingPolicy,
    ) -> Result<ScoreTable, ScoringError> {
        let props = props.copied().unwrap_or_default();
        aggregate::get_scores(&self.mans, version, &props, groups, missing)
    }

    /// Score table across versions; see [`aggregate::create_score_df`].
    ///
    /// # Errors
    ///
    /// Propagates errors from [`aggregate::get_scores`].
    pub fn create_score_df(
        &self,
        props: Option<&ScoreProperties>,
        groups: GroupSelection,
        selector: &VersionSelector,
    ) -> Result<ScoreTable, ScoringError> {
        let props = props.copied().unwrap_or_default();
        aggregate::create_score_df(&self.mans, &props, groups, selector)
    }

    /// K-factored manoeuvre totals, one column per resolved version.
    #[must_use]
    pub fn k_factored_scores(
        &self,
        props: Option<&ScoreProperties>,
        selector: &VersionSelector,
    ) -> ScoreTable {
        let props = props.copied().unwrap_or_default();
        aggregate::k_factored_scores(&self.mans, &props, selector)
    }

    /// Flight totals per resolved version.
    #[must_use]
    pub fn total_score(
        &self,
        props: Option<&ScoreProperties>,
        selector: &VersionSelector,
    ) -> Vec<FlightTotal> {
        let props = props.copied().unwrap_or_default();
        aggregate::total_score(&self.mans, &props, selector)
    }
}

impl Index<usize> for FlightSession {
    type Output = ManoeuvreRecord;

    fn index(&self, index: usize) -> &Self::Output {
        &self.mans[index]
    }
}

impl Index<&str> for FlightSession {
    type Output = ManoeuvreRecord;

    /// # Panics
    ///
    /// Panics if no manoeuvre has the given name.
    fn index(&self, name: &str) -> &Self::Output {
        match self.get_man(name) {
            Ok(man) => man,
            Err(err) => panic!("{err}"),
        }
    }
}
