//! Query vocabulary for top-item listings

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::TuneStatsError;

/// Which kind of top items to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Artists,
    Tracks,
}

impl ItemKind {
    /// Path segment used by `/me/top/{kind}`.
    pub const fn as_path(self) -> &'static str {
        match self {
            Self::Artists => "artists",
            Self::Tracks => "tracks",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

impl FromStr for ItemKind {
    type Err = TuneStatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "artists" | "artist" => Ok(Self::Artists),
            "tracks" | "track" => Ok(Self::Tracks),
            other => Err(TuneStatsError::InvalidInput(format!("unknown item kind: {other}"))),
        }
    }
}

/// Listening period the statistics are computed over.
///
/// `ShortTerm` covers roughly the last four weeks, `MediumTerm` six months
/// and `LongTerm` several years.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    ShortTerm,
    #[default]
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub const ALL: [Self; 3] = [Self::ShortTerm, Self::MediumTerm, Self::LongTerm];

    /// Value of the `time_range` query parameter.
    pub const fn as_query(self) -> &'static str {
        match self {
            Self::ShortTerm => "short_term",
            Self::MediumTerm => "medium_term",
            Self::LongTerm => "long_term",
        }
    }

    /// Human-readable label for period selectors.
    pub const fn label(self) -> &'static str {
        match self {
            Self::ShortTerm => "Very Recent",
            Self::MediumTerm => "Recent",
            Self::LongTerm => "Long Term",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for TimeRange {
    type Err = TuneStatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "short_term" | "short" => Ok(Self::ShortTerm),
            "medium_term" | "medium" => Ok(Self::MediumTerm),
            "long_term" | "long" => Ok(Self::LongTerm),
            other => Err(TuneStatsError::InvalidInput(format!("unknown time range: {other}"))),
        }
    }
}
