//! Temporal alignment of hourly series on the KST civil time axis.
//!
//! Upstream hourly feeds report timestamps as minute-precision ISO
//! strings ("YYYY-MM-DDTHH:MM") in Asia/Seoul local time. Alignment
//! compares those strings lexicographically, which is valid for a
//! fixed zone and a fixed format.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::Serialize;

/// Fixed confidence placeholder attached to every forecast record,
/// as reported by the model provider.
pub const FORECAST_CONFIDENCE: f64 = 0.8;

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Current KST time floored to the hour, in minute-precision ISO form.
pub fn kst_floor_hour(now_utc: DateTime<Utc>) -> String {
    let kst = now_utc.with_timezone(&kst_offset());
    let floored = kst
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(kst);
    floored.format("%Y-%m-%dT%H:%M").to_string()
}

fn kst_offset() -> FixedOffset {
    // 9 * 3600 is always in range
    FixedOffset::east_opt(KST_OFFSET_SECS).unwrap()
}

/// Select the index representing "now" in an ascending hourly axis.
///
/// Returns the latest index whose timestamp is <= the reference
/// minute; if none qualifies, index 0 (earliest available) as a
/// conservative fallback; None when the axis is empty.
pub fn select_latest_index(times: &[String], reference_minute: &str) -> Option<usize> {
    if times.is_empty() {
        return None;
    }
    let latest = times
        .iter()
        .enumerate()
        .filter(|(_, t)| t.as_str() <= reference_minute)
        .map(|(i, _)| i)
        .last();
    Some(latest.unwrap_or(0))
}

/// Normalize a minute-precision timestamp to second precision by
/// appending ":00". Timestamps already carrying seconds pass through.
pub fn to_second_precision(ts: &str) -> String {
    if ts.len() == 16 {
        format!("{}:00", ts)
    } else {
        ts.to_string()
    }
}

/// Hourly pollutant concentrations on a shared KST time axis.
#[derive(Debug, Clone, Default)]
pub struct PollutantHourly {
    pub time: Vec<String>,
    pub pm10: Vec<Option<f64>>,
    pub pm25: Vec<Option<f64>>,
    pub o3: Vec<Option<f64>>,
    pub no2: Vec<Option<f64>>,
    pub so2: Vec<Option<f64>>,
    pub co: Vec<Option<f64>>,
}

impl PollutantHourly {
    fn get(arr: &[Option<f64>], i: usize) -> Option<f64> {
        arr.get(i).copied().flatten()
    }
}

/// Hourly wind and precipitation on the same KST time axis.
#[derive(Debug, Clone, Default)]
pub struct WeatherHourly {
    pub time: Vec<String>,
    pub wind_speed: Vec<Option<f64>>,
    pub wind_dir: Vec<Option<f64>>,
    pub precip: Vec<Option<f64>>,
}

/// One combined hourly forecast record.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRecord {
    /// KST, second precision.
    pub ts: String,
    pub pm10: Option<f64>,
    pub pm25: Option<f64>,
    pub grade: Option<u8>,
    pub conf: f64,
    pub wind_dir: Option<f64>,
    pub wind_spd: Option<f64>,
    pub precip: Option<f64>,
}

/// Merge pollutant and weather hourly series into combined records
/// over `[start, start + horizon)`, clamped to the shorter series.
///
/// Fields absent in one series stay absent rather than defaulting to
/// zero. Each record carries the derived grade and the fixed
/// provider-reported confidence.
pub fn merge_hourly(
    aq: &PollutantHourly,
    wx: &WeatherHourly,
    start: usize,
    horizon: usize,
) -> Vec<ForecastRecord> {
    let extent = aq.time.len().min(wx.time.len());
    let end = (start + horizon).min(extent);
    if start >= end {
        return Vec::new();
    }

    let w = |arr: &[Option<f64>], i: usize| arr.get(i).copied().flatten();

    (start..end)
        .map(|i| {
            let pm10 = PollutantHourly::get(&aq.pm10, i);
            let pm25 = PollutantHourly::get(&aq.pm25, i);
            ForecastRecord {
                ts: to_second_precision(&aq.time[i]),
                pm10,
                pm25,
                grade: crate::grade::grade(pm10, pm25),
                conf: FORECAST_CONFIDENCE,
                wind_dir: w(&wx.wind_dir, i),
                wind_spd: w(&wx.wind_speed, i),
                precip: w(&wx.precip, i),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(specs: &[&str]) -> Vec<String> {
        specs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn latest_index_picks_reference_hour() {
        let axis = times(&[
            "2025-01-15T08:00",
            "2025-01-15T09:00",
            "2025-01-15T10:00",
        ]);
        assert_eq!(select_latest_index(&axis, "2025-01-15T09:00"), Some(1));
    }

    #[test]
    fn latest_index_before_all_entries_falls_back_to_earliest() {
        let axis = times(&["2025-01-15T08:00", "2025-01-15T09:00"]);
        assert_eq!(select_latest_index(&axis, "2025-01-15T07:00"), Some(0));
    }

    #[test]
    fn latest_index_on_empty_axis_is_none() {
        assert_eq!(select_latest_index(&[], "2025-01-15T09:00"), None);
    }

    #[test]
    fn latest_index_past_the_end_picks_last() {
        let axis = times(&["2025-01-15T08:00", "2025-01-15T09:00"]);
        assert_eq!(select_latest_index(&axis, "2025-01-16T00:00"), Some(1));
    }

    #[test]
    fn second_precision_appends_only_to_minute_form() {
        assert_eq!(to_second_precision("2025-01-15T09:00"), "2025-01-15T09:00:00");
        assert_eq!(
            to_second_precision("2025-01-15T09:00:00"),
            "2025-01-15T09:00:00"
        );
    }

    #[test]
    fn kst_floor_hour_shifts_and_floors() {
        let now = "2025-01-15T03:42:17Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(kst_floor_hour(now), "2025-01-15T12:00");
    }

    fn series(n: usize) -> (PollutantHourly, WeatherHourly) {
        let axis: Vec<String> = (0..n).map(|i| format!("2025-01-15T{:02}:00", i % 24)).collect();
        let aq = PollutantHourly {
            time: axis.clone(),
            pm10: (0..n).map(|i| Some(i as f64)).collect(),
            pm25: vec![None; n],
            ..Default::default()
        };
        let wx = WeatherHourly {
            time: axis,
            wind_speed: (0..n).map(|i| Some(i as f64 / 2.0)).collect(),
            wind_dir: vec![Some(180.0); n],
            precip: vec![None; n],
        };
        (aq, wx)
    }

    #[test]
    fn merge_clamps_to_shorter_series() {
        let (aq, _) = series(30);
        let (_, wx) = series(20);
        let merged = merge_hourly(&aq, &wx, 0, 24);
        assert_eq!(merged.len(), 20);
    }

    #[test]
    fn merge_respects_horizon() {
        let (aq, wx) = series(48);
        let merged = merge_hourly(&aq, &wx, 3, 6);
        assert_eq!(merged.len(), 6);
        assert_eq!(merged[0].pm10, Some(3.0));
        assert_eq!(merged[0].conf, FORECAST_CONFIDENCE);
    }

    #[test]
    fn merge_keeps_absent_fields_absent() {
        let (aq, wx) = series(4);
        let merged = merge_hourly(&aq, &wx, 0, 4);
        assert!(merged.iter().all(|r| r.pm25.is_none() && r.precip.is_none()));
        assert!(merged.iter().all(|r| r.wind_dir == Some(180.0)));
    }

    #[test]
    fn merge_timestamps_are_second_precision() {
        let (aq, wx) = series(2);
        let merged = merge_hourly(&aq, &wx, 0, 2);
        assert_eq!(merged[0].ts, "2025-01-15T00:00:00");
    }

    #[test]
    fn merge_start_past_extent_is_empty() {
        let (aq, wx) = series(5);
        assert!(merge_hourly(&aq, &wx, 10, 24).is_empty());
    }
}
