//! Timestamp normalization to absolute time.
//!
//! Providers report sample times in several formats and zones. Each
//! feed gets an ordered list of known formats; a row matching none is
//! skipped by its normalizer, never fatal.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Formats seen in KMA CSV exports, most common first.
pub const KMA_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M", "%Y-%m-%d %H", "%Y/%m/%d %H"];

/// Formats seen in FIRMS detection feeds ("HHMM" in the area API,
/// full time in the public CSV).
pub const FIRMS_FORMATS: &[&str] = &["%Y-%m-%d %H%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Try an ordered list of formats against a naive timestamp string.
pub fn parse_with_formats(s: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in formats {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
        // Hour-only formats lack the minute chrono requires.
        if !fmt.contains("%M") {
            let padded = format!("{}:00", s);
            let padded_fmt = format!("{}:%M", fmt);
            if let Ok(ts) = NaiveDateTime::parse_from_str(&padded, &padded_fmt) {
                return Some(ts);
            }
        }
    }
    None
}

/// Interpret a naive provider timestamp as KST civil time.
pub fn kst_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    let kst = FixedOffset::east_opt(KST_OFFSET_SECS).unwrap();
    match kst.from_local_datetime(&naive) {
        chrono::LocalResult::Single(t) => t.with_timezone(&Utc),
        // Fixed offsets have no gaps or folds; keep a total function anyway.
        chrono::LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
        chrono::LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

/// Interpret a naive provider timestamp as already-UTC.
pub fn utc_naive(naive: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&naive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kma_formats_ladder() {
        let cases = [
            "2025-01-15 09:00",
            "2025/01/15 09:00",
            "2025-01-15 09",
            "2025/01/15 09",
        ];
        for s in cases {
            let ts = parse_with_formats(s, KMA_FORMATS).expect(s);
            assert_eq!(ts.format("%Y-%m-%d %H:%M").to_string(), "2025-01-15 09:00");
        }
    }

    #[test]
    fn firms_hhmm_format() {
        let ts = parse_with_formats("2025-01-15 0312", FIRMS_FORMATS).unwrap();
        assert_eq!(ts.format("%H:%M").to_string(), "03:12");
    }

    #[test]
    fn unknown_format_is_none() {
        assert_eq!(parse_with_formats("15.01.2025 09h", KMA_FORMATS), None);
        assert_eq!(parse_with_formats("", KMA_FORMATS), None);
    }

    #[test]
    fn kst_conversion_shifts_back_nine_hours() {
        let naive = parse_with_formats("2025-01-15 09:00", KMA_FORMATS).unwrap();
        let utc = kst_to_utc(naive);
        assert_eq!(utc.to_rfc3339(), "2025-01-15T00:00:00+00:00");
    }
}
