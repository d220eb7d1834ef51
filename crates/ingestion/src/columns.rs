//! Declarative column matching for free-form CSV feeds.
//!
//! Feeds with inconsistent, mixed-language headers are mapped by data:
//! each logical field has a fixed candidate-name set, matched
//! case-insensitively against the actual header row. The first header
//! that matches any candidate wins; no match yields an absent field.

/// Candidate header names for one logical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldCandidates {
    pub field: &'static str,
    pub names: &'static [&'static str],
}

/// Station-name column candidates for the KMA CSV feed.
pub const KMA_STATION: FieldCandidates = FieldCandidates {
    field: "station",
    names: &["측정소명", "지점명", "station", "station_name", "측정소"],
};

pub const KMA_DATETIME: FieldCandidates = FieldCandidates {
    field: "datetime",
    names: &["측정일시", "일시", "date", "datetime", "datatime"],
};

pub const KMA_PM10: FieldCandidates = FieldCandidates {
    field: "pm10",
    names: &["pm10", "미세먼지", "미세먼지(pm10)"],
};

pub const KMA_PM25: FieldCandidates = FieldCandidates {
    field: "pm25",
    names: &["pm25", "pm2.5", "초미세먼지", "초미세먼지(pm2.5)"],
};

pub const KMA_PM10_GRADE: FieldCandidates = FieldCandidates {
    field: "pm10_grade",
    names: &["pm10grade", "pm10_grade", "등급", "pm10등급"],
};

pub const KMA_PM25_GRADE: FieldCandidates = FieldCandidates {
    field: "pm25_grade",
    names: &["pm25grade", "pm25_grade", "pm25등급"],
};

/// Detection-date column candidates for the FIRMS CSV feed.
pub const FIRMS_DATE: FieldCandidates = FieldCandidates {
    field: "acq_date",
    names: &["acq_date", "acquisition_date", "date"],
};

pub const FIRMS_TIME: FieldCandidates = FieldCandidates {
    field: "acq_time",
    names: &["acq_time", "acquisition_time", "acq_time_utc", "time"],
};

impl FieldCandidates {
    /// Index of the first header matching any candidate name,
    /// compared case-insensitively after trimming.
    pub fn match_header(&self, headers: &csv::StringRecord) -> Option<usize> {
        headers.iter().position(|h| {
            let h = h.trim();
            self.names
                .iter()
                .any(|cand| h.eq_ignore_ascii_case(cand) || h == *cand || h.to_lowercase() == *cand)
        })
    }

    /// The matched cell value for a row, absent when no header
    /// matches or the cell is missing.
    pub fn pick<'r>(&self, headers: &csv::StringRecord, row: &'r csv::StringRecord) -> Option<&'r str> {
        let idx = self.match_header(headers)?;
        row.get(idx).map(str::trim)
    }
}

/// Preserve a CSV row verbatim as a JSON object keyed by header.
pub fn row_to_json(headers: &csv::StringRecord, row: &csv::StringRecord) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = headers
        .iter()
        .zip(row.iter())
        .map(|(h, v)| (h.trim().to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    serde_json::Value::Object(map)
}
