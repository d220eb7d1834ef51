//! Air-quality grade derivation and badge rules.
//!
//! Grades follow the Korean CAI four-level bucketing. When both
//! pollutants are present the worse (numerically higher) bucket wins.

use crate::types::StationKind;

/// Badge shown for readings backed by a domestic ground station.
pub const BADGE_GROUND_STATION: &str = "국내 측정소";
/// Badge shown for model- or satellite-derived readings.
pub const BADGE_MODEL_ANALYSIS: &str = "위성/모델 분석";
/// Alert badge for PM10 above the worst-bucket threshold.
pub const BADGE_DUST_ADVECTION: &str = "⚠️ 황사 유입";
/// Alert badge for PM2.5 above the worst-bucket threshold.
pub const BADGE_FINE_DUST_SEVERE: &str = "🚨 초미세먼지 심화";

fn pm10_bucket(v: f64) -> u8 {
    if v <= 30.0 {
        1
    } else if v <= 80.0 {
        2
    } else if v <= 150.0 {
        3
    } else {
        4
    }
}

fn pm25_bucket(v: f64) -> u8 {
    if v <= 15.0 {
        1
    } else if v <= 35.0 {
        2
    } else if v <= 75.0 {
        3
    } else {
        4
    }
}

/// Derive the 1-4 grade from pollutant concentrations.
///
/// Returns None when both pollutants are absent. With a single
/// pollutant present its bucket is the grade; with both present the
/// worst pollutant dominates.
pub fn grade(pm10: Option<f64>, pm25: Option<f64>) -> Option<u8> {
    match (pm10, pm25) {
        (None, None) => None,
        (Some(p10), None) => Some(pm10_bucket(p10)),
        (None, Some(p25)) => Some(pm25_bucket(p25)),
        (Some(p10), Some(p25)) => Some(pm10_bucket(p10).max(pm25_bucket(p25))),
    }
}

/// Derive human-readable badges for a resolved reading.
///
/// Rules are additive and order-preserving: the source-kind label
/// first, then threshold-crossing alerts.
pub fn badges(kind: StationKind, pm10: Option<f64>, pm25: Option<f64>) -> Vec<String> {
    let mut out = Vec::new();
    match kind {
        StationKind::Station => out.push(BADGE_GROUND_STATION.to_string()),
        StationKind::GridPoint | StationKind::Model => {
            out.push(BADGE_MODEL_ANALYSIS.to_string())
        }
    }
    if pm10.unwrap_or(0.0) > 150.0 {
        out.push(BADGE_DUST_ADVECTION.to_string());
    }
    if pm25.unwrap_or(0.0) > 75.0 {
        out.push(BADGE_FINE_DUST_SEVERE.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_pm10_alone_is_grade_one() {
        for v in [0.0, 12.5, 30.0] {
            assert_eq!(grade(Some(v), None), Some(1));
        }
    }

    #[test]
    fn worst_pollutant_dominates() {
        // pm10 in the worst bucket dominates even a clean pm25
        assert_eq!(grade(Some(151.0), Some(10.0)), Some(4));
        assert_eq!(grade(Some(200.0), Some(15.0)), Some(4));
        // and the other way around
        assert_eq!(grade(Some(20.0), Some(60.0)), Some(3));
        assert_eq!(grade(Some(20.0), Some(80.0)), Some(4));
    }

    #[test]
    fn both_absent_is_absent() {
        assert_eq!(grade(None, None), None);
    }

    #[test]
    fn single_pollutant_buckets() {
        assert_eq!(grade(None, Some(15.0)), Some(1));
        assert_eq!(grade(None, Some(35.0)), Some(2));
        assert_eq!(grade(None, Some(75.0)), Some(3));
        assert_eq!(grade(None, Some(76.0)), Some(4));
        assert_eq!(grade(Some(80.0), None), Some(2));
        assert_eq!(grade(Some(81.0), None), Some(3));
    }

    #[test]
    fn badges_for_ground_station() {
        let b = badges(StationKind::Station, Some(40.0), Some(20.0));
        assert_eq!(b, vec![BADGE_GROUND_STATION.to_string()]);
    }

    #[test]
    fn badges_accumulate_in_order() {
        let b = badges(StationKind::Model, Some(160.0), Some(80.0));
        assert_eq!(
            b,
            vec![
                BADGE_MODEL_ANALYSIS.to_string(),
                BADGE_DUST_ADVECTION.to_string(),
                BADGE_FINE_DUST_SEVERE.to_string(),
            ]
        );
    }

    #[test]
    fn absent_pollutants_trigger_no_alerts() {
        let b = badges(StationKind::GridPoint, None, None);
        assert_eq!(b, vec![BADGE_MODEL_ANALYSIS.to_string()]);
    }
}
