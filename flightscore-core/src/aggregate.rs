//! Score aggregation across manoeuvres and scoring versions.
//!
//! Every function here reads records without mutating them and builds a
//! [`ScoreTable`] whose rows follow record order.
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ScoringError;
use crate::manoeuvre::ManoeuvreRecord;
use crate::score::{GroupSelection, ScoreGroup, ScoreProperties};
use crate::version::{VersionSelector, list_valid_versions};

/// What to do when a manoeuvre has no score for the requested version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Fail with [`ScoringError::MissingScore`]
    Raise,
    /// Substitute zeros
    #[default]
    Zero,
    /// Substitute NaN
    Nan,
}

impl MissingPolicy {
    fn fill(self) -> Option<f64> {
        match self {
            Self::Raise => None,
            Self::Zero => Some(0.0),
            Self::Nan => Some(f64::NAN),
        }
    }
}

impl FromStr for MissingPolicy {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raise" => Ok(Self::Raise),
            "zero" => Ok(Self::Zero),
            "nan" => Ok(Self::Nan),
            _ => Err(ScoringError::InvalidPolicy(s.to_string())),
        }
    }
}

impl std::fmt::Display for MissingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raise => write!(f, "raise"),
            Self::Zero => write!(f, "zero"),
            Self::Nan => write!(f, "nan"),
        }
    }
}

/// Row-major table of scores, rows labelled by manoeuvre.
///
/// Every row holds exactly one value per column; deserialization rejects
/// tables that break this.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "TableParts")]
pub struct ScoreTable {
    rows: Vec<String>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

#[derive(Deserialize)]
struct TableParts {
    rows: Vec<String>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl TryFrom<TableParts> for ScoreTable {
    type Error = ScoringError;

    fn try_from(parts: TableParts) -> Result<Self, Self::Error> {
        if parts.values.len() != parts.rows.len() {
            return Err(ScoringError::TableShape(format!(
                "{} rows but {} value rows",
                parts.rows.len(),
                parts.values.len()
            )));
        }
        if let Some((label, values)) = parts
            .rows
            .iter()
            .zip(&parts.values)
            .find(|(_, values)| values.len() != parts.columns.len())
        {
            return Err(ScoringError::TableShape(format!(
                "row {label} has {} values for {} columns",
                values.len(),
                parts.columns.len()
            )));
        }
        Ok(Self {
            rows: parts.rows,
            columns: parts.columns,
            values: parts.values,
        })
    }
}

impl ScoreTable {
    /// Table with the given row labels and no columns.
    #[must_use]
    pub fn with_rows(rows: Vec<String>) -> Self {
        let values = vec![Vec::new(); rows.len()];
        Self {
            rows,
            columns: Vec::new(),
            values,
        }
    }

    fn push_row(&mut self, label: String, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.push(label);
        self.values.push(values);
    }

    #[must_use]
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    fn row_index(&self, row: &str) -> Option<usize> {
        self.rows.iter().position(|label| label == row)
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|label| label == column)
    }

    /// Cell value; the first row with a matching label wins.
    #[must_use]
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.row_index(row)?;
        let c = self.column_index(column)?;
        self.values.get(r).and_then(|values| values.get(c)).copied()
    }

    #[must_use]
    pub fn row(&self, row: &str) -> Option<&[f64]> {
        self.row_index(row)
            .and_then(|r| self.values.get(r))
            .map(Vec::as_slice)
    }

    #[must_use]
    pub fn column(&self, column: &str) -> Option<Vec<f64>> {
        let c = self.column_index(column)?;
        self.values
            .iter()
            .map(|values| values.get(c).copied())
            .collect()
    }

    /// Sum of a column, skipping NaN cells.
    #[must_use]
    pub fn column_sum(&self, column: &str) -> Option<f64> {
        self.column(column)
            .map(|values| values.into_iter().filter(|v| !v.is_nan()).sum())
    }

    /// Append the columns of `other` to the right of this table.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::TableShape`] unless both tables share the same
    /// rows in the same order.
    pub fn hconcat(mut self, other: Self) -> Result<Self, ScoringError> {
        if self.rows != other.rows {
            return Err(ScoringError::TableShape(format!(
                "cannot join {} rows onto {} rows with different labels",
                other.rows.len(),
                self.rows.len()
            )));
        }
        self.columns.extend(other.columns);
        for (mine, theirs) in self.values.iter_mut().zip(other.values) {
            mine.extend(theirs);
        }
        Ok(self)
    }

    fn relabel_columns(mut self, label: impl Fn(&str) -> String) -> Self {
        self.columns = self.columns.iter().map(|c| label(c)).collect();
        self
    }
}

/// Per-manoeuvre scores for one version.
///
/// Columns are the selected groups; a manoeuvre without a score for
/// `version` under `props` is handled according to `missing`.
///
/// # Errors
///
/// Returns [`ScoringError::MissingScore`] for the first manoeuvre without a
/// score when `missing` is [`MissingPolicy::Raise`].
pub fn get_scores(
    records: &[ManoeuvreRecord],
    version: &str,
    props: &ScoreProperties,
    groups: GroupSelection,
    missing: MissingPolicy,
) -> Result<ScoreTable, ScoringError> {
    let groups = groups.groups();
    let mut table = ScoreTable {
        columns: groups.iter().map(ScoreGroup::to_string).collect(),
        ..ScoreTable::default()
    };
    for record in records {
        let row = if let Some(score) = record.score(version, props) {
            groups.iter().map(|group| score.get(*group)).collect()
        } else if let Some(fill) = missing.fill() {
            log::debug!(
                "no score for {} at version {version} ({props}); filling with {missing}",
                record.name
            );
            vec![fill; groups.len()]
        } else {
            log::warn!("no score for {} at version {version} ({props})", record.name);
            return Err(ScoringError::MissingScore {
                version: version.to_string(),
                manoeuvre: record.name.clone(),
            });
        };
        table.push_row(record.name.clone(), row);
    }
    Ok(table)
}

/// Versions a selector resolves to over `records`.
#[must_use]
pub fn resolve_versions(records: &[ManoeuvreRecord], selector: &VersionSelector) -> Vec<String> {
    match selector {
        VersionSelector::Explicit(version) => vec![version.clone()],
        VersionSelector::AllValid => list_valid_versions(records),
    }
}

/// Score table across one or many versions.
///
/// With [`VersionSelector::AllValid`] each valid version contributes one
/// block of columns, in ascending version order, equal to [`get_scores`]
/// for that version with zero-filled gaps. Columns are labelled by version
/// for a single group and `version:group` otherwise. An explicit version
/// keeps the plain group labels.
///
/// # Errors
///
/// Propagates errors from [`get_scores`] and [`ScoreTable::hconcat`];
/// zero-filling never raises.
pub fn create_score_df(
    records: &[ManoeuvreRecord],
    props: &ScoreProperties,
    groups: GroupSelection,
    selector: &VersionSelector,
) -> Result<ScoreTable, ScoringError> {
    if let VersionSelector::Explicit(version) = selector {
        return get_scores(records, version, props, groups, MissingPolicy::Zero);
    }
    let single_group = matches!(groups, GroupSelection::Single(_));
    let mut table = ScoreTable::with_rows(records.iter().map(|r| r.name.clone()).collect());
    for version in resolve_versions(records, selector) {
        let block = get_scores(records, &version, props, groups, MissingPolicy::Zero)?;
        let block = if single_group {
            block.relabel_columns(|_| version.clone())
        } else {
            block.relabel_columns(|group| format!("{version}:{group}"))
        };
        table = table.hconcat(block)?;
    }
    Ok(table)
}

/// K-factored totals, one column per resolved version.
///
/// Manoeuvres lacking a score for a version contribute zero.
#[must_use]
pub fn k_factored_scores(
    records: &[ManoeuvreRecord],
    props: &ScoreProperties,
    selector: &VersionSelector,
) -> ScoreTable {
    let versions = resolve_versions(records, selector);
    let mut table = ScoreTable {
        columns: versions.clone(),
        ..ScoreTable::default()
    };
    for record in records {
        let row = versions
            .iter()
            .map(|version| record.k_factored_score(version, props).unwrap_or(0.0))
            .collect();
        table.push_row(record.name.clone(), row);
    }
    table
}

/// Flight total under one scoring version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightTotal {
    pub version: String,
    pub total: f64,
}

/// Sum of k-factored totals per resolved version.
#[must_use]
pub fn total_score(
    records: &[ManoeuvreRecord],
    props: &ScoreProperties,
    selector: &VersionSelector,
) -> Vec<FlightTotal> {
    let table = k_factored_scores(records, props, selector);
    table
        .columns()
        .iter()
        .map(|version| FlightTotal {
            version: version.clone(),
            total: table.column_sum(version).unwrap_or(0.0),
        })
        .collect()
}
