//! Flightscore Core
//!
//! Platform-agnostic scoring model for judged competition flights.
//! This crate keeps versioned score history per manoeuvre and aggregates it
//! into flight tables and totals without any I/O of its own.

pub mod aggregate;
pub mod error;
pub mod manoeuvre;
pub mod schedule;
pub mod score;
pub mod session;
pub mod version;

// Re-export commonly used types
pub use aggregate::{
    FlightTotal, MissingPolicy, ScoreTable, create_score_df, get_scores, k_factored_scores,
    resolve_versions, total_score,
};
pub use error::ScoringError;
pub use manoeuvre::{ManInfo, ManoeuvreRecord, Position};
pub use schedule::{FlightSchedule, ScheduleInfo, ScheduleRef};
pub use score::{GroupSelection, Score, ScoreGroup, ScoreProperties, ScoreResult, ScoreSnapshot};
pub use session::{FlightSession, ManId, Origin};
pub use version::{
    InvalidVersion, ScoringVersion, VersionSelector, check_version, is_valid_version,
    list_valid_versions, list_versions,
};

/// Trait for abstracting where flight documents come from
/// Platform-specific implementations should provide this
pub trait FlightSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the raw flight document identified by `name`
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    fn read_document(&self, name: &str) -> Result<String, Self::Error>;

    /// Load and validate a flight
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or does not describe a
    /// valid flight.
    fn load_flight(&self, name: &str) -> Result<FlightSession, Self::Error>
    where
        Self::Error: From<ScoringError>,
    {
        let raw = self.read_document(name)?;
        Ok(FlightSession::from_json(&raw)?)
    }
}
