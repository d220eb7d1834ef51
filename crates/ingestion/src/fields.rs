//! Numeric field parsing with provider sentinel handling.

/// Sentinels providers use for "missing". Parsed as absent, not zero.
const MISSING_SENTINELS: &[&str] = &["", "-", "NA", "null"];

/// Unit suffixes some feeds glue onto numeric values ("20㎍/m3").
const UNIT_SUFFIXES: &[&str] = &["㎍/m3", "㎍/㎥", "ug/m3", "μg/m³", "µg/m³"];

fn clean(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if MISSING_SENTINELS.contains(&trimmed) {
        return None;
    }
    let mut out = trimmed.to_string();
    for suffix in UNIT_SUFFIXES {
        out = out.replace(suffix, "");
    }
    out = out.replace(',', "");
    let out = out.trim().to_string();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Parse a pollutant concentration, treating sentinels as absent.
pub fn parse_concentration(s: &str) -> Option<f64> {
    clean(s)?.parse::<f64>().ok()
}

/// Parse an integer grade field, treating sentinels as absent.
pub fn parse_grade(s: &str) -> Option<i16> {
    let cleaned = clean(s)?;
    cleaned
        .parse::<f64>()
        .ok()
        .map(|v| v as i16)
        .filter(|g| (1..=4).contains(g))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_absent_not_zero() {
        for s in ["", "-", "NA", "null", "  - "] {
            assert_eq!(parse_concentration(s), None, "sentinel {:?}", s);
        }
    }

    #[test]
    fn unit_suffixes_are_stripped() {
        assert_eq!(parse_concentration("20㎍/m3"), Some(20.0));
        assert_eq!(parse_concentration("35ug/m3"), Some(35.0));
    }

    #[test]
    fn thousands_separator_is_removed() {
        assert_eq!(parse_concentration("1,024"), Some(1024.0));
    }

    #[test]
    fn plain_numbers_parse() {
        assert_eq!(parse_concentration("42"), Some(42.0));
        assert_eq!(parse_concentration("17.5"), Some(17.5));
    }

    #[test]
    fn garbage_is_absent() {
        assert_eq!(parse_concentration("n/a*"), None);
    }

    #[test]
    fn grades_are_bounded() {
        assert_eq!(parse_grade("2"), Some(2));
        assert_eq!(parse_grade("0"), None);
        assert_eq!(parse_grade("5"), None);
        assert_eq!(parse_grade("-"), None);
    }
}
