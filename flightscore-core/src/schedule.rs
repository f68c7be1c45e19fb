//! Schedule association for manoeuvres and flights.
use serde::{Deserialize, Serialize};

/// Schedule a manoeuvre was flown against, as recorded by the flight
/// coordinate file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleRef {
    pub category: String,
    pub name: String,
}

impl ScheduleRef {
    #[must_use]
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }

    /// Convert the recorded naming into the canonical schedule-library form.
    #[must_use]
    pub fn to_info(&self) -> ScheduleInfo {
        ScheduleInfo {
            category: canonical_token(&self.category),
            name: canonical_token(&self.name),
        }
    }
}

/// Canonical schedule identity used by the schedule library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleInfo {
    pub category: String,
    pub name: String,
}

impl std::fmt::Display for ScheduleInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// Schedule of a whole flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FlightSchedule {
    /// Every manoeuvre belongs to the same schedule.
    Single(ScheduleInfo),
    /// Manoeuvres reference different schedules (or there are none).
    Mixed,
}

impl FlightSchedule {
    #[must_use]
    pub const fn is_mixed(&self) -> bool {
        matches!(self, Self::Mixed)
    }

    #[must_use]
    pub const fn info(&self) -> Option<&ScheduleInfo> {
        match self {
            Self::Single(info) => Some(info),
            Self::Mixed => None,
        }
    }
}

impl std::fmt::Display for FlightSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(info) => info.fmt(f),
            Self::Mixed => f.write_str("mixed"),
        }
    }
}

fn canonical_token(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_normalises_case_and_separators() {
        let info = ScheduleRef::new(" F3A ", "P-25  Preliminary").to_info();
        assert_eq!(info.category, "f3a");
        assert_eq!(info.name, "p_25_preliminary");
        assert_eq!(info.to_string(), "f3a/p_25_preliminary");
    }

    #[test]
    fn mixed_has_no_info() {
        assert!(FlightSchedule::Mixed.is_mixed());
        assert!(FlightSchedule::Mixed.info().is_none());
        let single = FlightSchedule::Single(ScheduleRef::new("f3a", "p25").to_info());
        assert_eq!(single.info().map(|i| i.name.as_str()), Some("p25"));
    }
}
