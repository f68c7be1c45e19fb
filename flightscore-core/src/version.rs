//! Scoring-version identifiers and flight-wide version coverage.
//!
//! Version keys in a manoeuvre history are free-form strings. Only keys that
//! parse as public release versions (`1.2`, `0.3.1rc2`, `v2.0.post1`, ...)
//! take part in automatic version scans; anything else stays addressable by
//! its exact key but is skipped when listing valid versions.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::manoeuvre::ManoeuvreRecord;

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?ix)^
            v?
            (?:(?P<epoch>\d+)!)?
            (?P<release>\d+(?:\.\d+)*)
            (?P<pre>
                [-_.]?
                (?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)
                [-_.]?
                (?P<pre_n>\d+)?
            )?
            (?P<post>
                (?:-(?P<post_n1>\d+))
                |
                (?:[-_.]?(?:post|rev|r)[-_.]?(?P<post_n2>\d+)?)
            )?
            (?P<dev>[-_.]?dev[-_.]?(?P<dev_n>\d+)?)?
            (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
            $",
        )
        .unwrap_or_else(|err| unreachable!("version pattern is valid: {err}"))
    })
}

/// Pre-release phase marker; `c`, `pre`, and `preview` spell a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreRelease {
    Alpha,
    Beta,
    Candidate,
}

/// A parsed scoring version.
///
/// Ordering follows release-version precedence: epoch, numeric release
/// segments (trailing zeros ignored), then dev builds, pre-releases, the final
/// release, and post releases.
#[derive(Debug, Clone)]
pub struct ScoringVersion {
    raw: String,
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreRelease, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Option<String>,
}

/// Error returned when a version key does not follow the release grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed version identifier {0:?}")]
pub struct InvalidVersion(pub String);

impl ScoringVersion {
    /// The key exactly as it appeared in the history.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    #[must_use]
    pub const fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    fn trimmed_release(&self) -> &[u64] {
        let end = self
            .release
            .iter()
            .rposition(|segment| *segment != 0)
            .map_or(0, |idx| idx + 1);
        &self.release[..end]
    }

    // dev-only builds sort ahead of every pre-release of the same release
    fn pre_key(&self) -> (u8, Option<PreRelease>, u64) {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => (0, None, 0),
            (Some((phase, n)), _, _) => (1, Some(phase), n),
            (None, _, _) => (2, None, 0),
        }
    }

    fn post_key(&self) -> (u8, u64) {
        self.post.map_or((0, 0), |n| (1, n))
    }

    fn dev_key(&self) -> (u8, u64) {
        self.dev.map_or((1, 0), |n| (0, n))
    }
}

fn parse_number(text: &str) -> Result<u64, InvalidVersion> {
    text.parse::<u64>()
        .map_err(|_| InvalidVersion(text.to_string()))
}

// Markers written without a number (`1.0a`, `1.0.post`) count as 0.
fn implicit_number(number: Option<regex::Match<'_>>) -> Result<u64, InvalidVersion> {
    number.map_or(Ok(0), |m| parse_number(m.as_str()))
}

impl FromStr for ScoringVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidVersion(s.to_string());
        let caps = version_pattern().captures(s.trim()).ok_or_else(invalid)?;
        let epoch = implicit_number(caps.name("epoch")).map_err(|_| invalid())?;
        let release = caps
            .name("release")
            .ok_or_else(invalid)?
            .as_str()
            .split('.')
            .map(parse_number)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        let pre = match caps.name("pre_l") {
            Some(label) => {
                let phase = match label.as_str().to_ascii_lowercase().as_str() {
                    "a" | "alpha" => PreRelease::Alpha,
                    "b" | "beta" => PreRelease::Beta,
                    _ => PreRelease::Candidate,
                };
                let number = implicit_number(caps.name("pre_n")).map_err(|_| invalid())?;
                Some((phase, number))
            }
            None => None,
        };
        let post = match caps.name("post") {
            Some(_) => Some(
                implicit_number(caps.name("post_n1").or_else(|| caps.name("post_n2")))
                    .map_err(|_| invalid())?,
            ),
            None => None,
        };
        let dev = match caps.name("dev") {
            Some(_) => Some(implicit_number(caps.name("dev_n")).map_err(|_| invalid())?),
            None => None,
        };
        let local = caps.name("local").map(|m| m.as_str().to_ascii_lowercase());
        Ok(Self {
            raw: s.to_string(),
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

impl Ord for ScoringVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.trimmed_release().cmp(other.trimmed_release()))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post_key().cmp(&other.post_key()))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for ScoringVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScoringVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoringVersion {}

impl std::fmt::Display for ScoringVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Which scoring version(s) an aggregation should read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSelector {
    /// One history key, used verbatim.
    Explicit(String),
    /// Every valid version found across the flight, ascending.
    #[default]
    AllValid,
}

impl VersionSelector {
    #[must_use]
    pub fn explicit(version: impl Into<String>) -> Self {
        Self::Explicit(version.into())
    }
}

impl FromStr for VersionSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            Ok(Self::AllValid)
        } else {
            Ok(Self::Explicit(trimmed.to_string()))
        }
    }
}

impl std::fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(version) => f.write_str(version),
            Self::AllValid => f.write_str("all"),
        }
    }
}

/// Whether `version` follows the release grammar.
#[must_use]
pub fn is_valid_version(version: &str) -> bool {
    version.parse::<ScoringVersion>().is_ok()
}

/// Union of every history key across `records`.
#[must_use]
pub fn list_versions(records: &[ManoeuvreRecord]) -> BTreeSet<String> {
    records
        .iter()
        .flat_map(|record| record.history.keys().cloned())
        .collect()
}

/// Valid history keys across `records`, ascending by version precedence.
///
/// Malformed keys are dropped without error. Keys with equal precedence
/// (`1.0` and `1.0.0`) are both kept, ordered by their text.
#[must_use]
pub fn list_valid_versions(records: &[ManoeuvreRecord]) -> Vec<String> {
    let mut parsed: Vec<ScoringVersion> = list_versions(records)
        .into_iter()
        .filter_map(|key| match key.parse::<ScoringVersion>() {
            Ok(version) => Some(version),
            Err(err) => {
                log::debug!("skipping version key: {err}");
                None
            }
        })
        .collect();
    parsed.sort_by(|a, b| a.cmp(b).then_with(|| a.raw.cmp(&b.raw)));
    parsed.into_iter().map(|version| version.raw).collect()
}

/// Strip a single leading `v` from a requested version key.
#[must_use]
pub fn normalize_version_key(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

/// True when every record carries a snapshot for `version`.
#[must_use]
pub fn check_version(records: &[ManoeuvreRecord], version: &str) -> bool {
    let key = normalize_version_key(version);
    records.iter().all(|record| record.history.contains_key(key))
}
