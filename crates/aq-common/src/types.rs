//! Core enumerations for providers, stations and measurement quality.

use serde::{Deserialize, Serialize};

/// What kind of data a provider produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Observed,
    Model,
    Satellite,
    Aggregate,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Observed => "observed",
            SourceKind::Model => "model",
            SourceKind::Satellite => "satellite",
            SourceKind::Aggregate => "aggregate",
        }
    }
}

/// How authoritative a provider's numeric values are. Drives the
/// measurement conflict policy: observed and model sources overwrite,
/// aggregate sources never replace a populated value with a null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceQuality {
    Observed,
    Model,
    Aggregate,
}

impl SourceQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceQuality::Observed => "observed",
            SourceQuality::Model => "model",
            SourceQuality::Aggregate => "aggregate",
        }
    }
}

/// Kind of sampling point. Grid points are synthetic stations created
/// one per sampled model coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationKind {
    Station,
    GridPoint,
    Model,
}

impl StationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationKind::Station => "station",
            StationKind::GridPoint => "grid_point",
            StationKind::Model => "model",
        }
    }

    /// Parse a stored kind string; unknown strings fall back to Station.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "grid_point" => StationKind::GridPoint,
            "model" => StationKind::Model,
            _ => StationKind::Station,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trip() {
        for kind in [StationKind::Station, StationKind::GridPoint, StationKind::Model] {
            assert_eq!(StationKind::from_str_lossy(kind.as_str()), kind);
        }
        assert_eq!(StationKind::from_str_lossy("unknown"), StationKind::Station);
    }
}
