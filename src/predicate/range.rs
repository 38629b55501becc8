//! Value parsing for range and full-text predicates

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

fn comparison_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(>=|<=|>|<|=)?(-?\d+)$").expect("valid regex"))
}

fn interval_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(-?\d+)\.\.(-?\d+)$").expect("valid regex"))
}

fn age_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+)(s|secs?|seconds?|m|mins?|minutes?|h|hrs?|hours?|d|days?|w|weeks?|mon|mons|months?|y|years?)$")
            .expect("valid regex")
    })
}

/// Inclusive integer interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

impl IntRange {
    /// Parse `N`, `=N`, `>N`, `>=N`, `<N`, `<=N` or `A..B`
    pub fn parse(value: &str) -> Option<IntRange> {
        let value = value.trim();
        if let Some(caps) = interval_regex().captures(value) {
            let min: i64 = caps[1].parse().ok()?;
            let max: i64 = caps[2].parse().ok()?;
            return (min <= max).then_some(IntRange { min, max });
        }
        let caps = comparison_regex().captures(value)?;
        let n: i64 = caps[2].parse().ok()?;
        let range = match caps.get(1).map(|m| m.as_str()) {
            Some(">") => IntRange {
                min: n.checked_add(1)?,
                max: i64::MAX,
            },
            Some(">=") => IntRange { min: n, max: i64::MAX },
            Some("<") => IntRange {
                min: i64::MIN,
                max: n.checked_sub(1)?,
            },
            Some("<=") => IntRange { min: i64::MIN, max: n },
            _ => IntRange { min: n, max: n },
        };
        Some(range)
    }

    pub fn contains(&self, v: i64) -> bool {
        self.min <= v && v <= self.max
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (min, max) if min == max => write!(f, "{}", min),
            (i64::MIN, max) => write!(f, "<={}", max),
            (min, i64::MAX) => write!(f, ">={}", min),
            (min, max) => write!(f, "{}..{}", min, max),
        }
    }
}

/// Inclusive instant interval; a missing bound is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimestampRange {
    pub min: Option<DateTime<Utc>>,
    pub max: Option<DateTime<Utc>>,
}

impl TimestampRange {
    pub fn at_or_after(min: DateTime<Utc>) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_or_before(max: DateTime<Utc>) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    /// Parse a comparison (`>=T`, `<T`, ...) or a bare instant
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (op, rest) = ["<=", ">=", "<", ">", "="]
            .iter()
            .find_map(|op| value.strip_prefix(op).map(|rest| (*op, rest)))
            .unwrap_or(("=", value));
        let t = parse_timestamp(rest)?;
        let one = Duration::milliseconds(1);
        Some(match op {
            ">" => Self::at_or_after(t + one),
            ">=" => Self::at_or_after(t),
            "<" => Self::at_or_before(t - one),
            "<=" => Self::at_or_before(t),
            _ => Self {
                min: Some(t),
                max: Some(t),
            },
        })
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.min.map_or(true, |min| min <= t) && self.max.map_or(true, |max| t <= max)
    }

    /// Interval satisfying both ranges
    pub fn intersect(&self, other: &TimestampRange) -> TimestampRange {
        let min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        TimestampRange { min, max }
    }
}

impl fmt::Display for TimestampRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |t: Option<DateTime<Utc>>| t.map(|t| t.to_rfc3339()).unwrap_or_default();
        write!(f, "[{}..{}]", bound(self.min), bound(self.max))
    }
}

/// Parse an instant: RFC 3339, `YYYY-MM-DD HH:MM[:SS]` or `YYYY-MM-DD`
///
/// Values without an offset are read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(value, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Parse a relative age such as `30s`, `2h`, `3d`, `1week` or `2months`
///
/// Months count as 30 days and years as 365 days.
pub fn parse_age(value: &str) -> Option<Duration> {
    let caps = age_regex().captures(value.trim())?;
    let n: i64 = caps[1].parse().ok()?;
    let unit = &caps[2];
    let seconds_per_unit = match unit {
        u if u.starts_with("mon") => 30 * 86_400,
        u if u.starts_with('s') => 1,
        u if u.starts_with('m') => 60,
        u if u.starts_with('h') => 3_600,
        u if u.starts_with('d') => 86_400,
        u if u.starts_with('w') => 7 * 86_400,
        _ => 365 * 86_400,
    };
    n.checked_mul(seconds_per_unit).and_then(Duration::try_seconds)
}

/// Split text into case-folded alphanumeric tokens
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_int_range_comparisons() {
        assert_eq!(IntRange::parse(">5"), Some(IntRange { min: 6, max: i64::MAX }));
        assert_eq!(IntRange::parse("<=5"), Some(IntRange { min: i64::MIN, max: 5 }));
        assert_eq!(IntRange::parse("=7"), Some(IntRange { min: 7, max: 7 }));
        assert_eq!(IntRange::parse("-3"), Some(IntRange { min: -3, max: -3 }));
    }

    #[test]
    fn test_int_range_interval() {
        let r = IntRange::parse("10..20").unwrap();
        assert!(r.contains(10));
        assert!(r.contains(20));
        assert!(!r.contains(21));
        assert_eq!(IntRange::parse("20..10"), None);
    }

    #[test]
    fn test_int_range_rejects_garbage() {
        assert_eq!(IntRange::parse("abc"), None);
        assert_eq!(IntRange::parse(">>5"), None);
        assert_eq!(IntRange::parse(""), None);
    }

    #[test]
    fn test_int_range_display() {
        assert_eq!(IntRange::parse(">=4").unwrap().to_string(), ">=4");
        assert_eq!(IntRange::parse("1..3").unwrap().to_string(), "1..3");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let day = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01"), Some(day));
        assert_eq!(
            parse_timestamp("2024-03-01 12:30"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
        );
        assert_eq!(
            parse_timestamp("2024-03-01T12:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_timestamp_range_intersection() {
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let r = TimestampRange::at_or_after(a).intersect(&TimestampRange::at_or_before(b));
        assert_eq!(r, TimestampRange { min: Some(a), max: Some(b) });
        assert!(r.contains(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()));
        assert!(!r.contains(Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_age_units() {
        assert_eq!(parse_age("30s"), Some(Duration::seconds(30)));
        assert_eq!(parse_age("2h"), Some(Duration::hours(2)));
        assert_eq!(parse_age("3d"), Some(Duration::days(3)));
        assert_eq!(parse_age("1week"), Some(Duration::days(7)));
        assert_eq!(parse_age("2mon"), Some(Duration::days(60)));
        assert_eq!(parse_age("5min"), Some(Duration::minutes(5)));
        assert_eq!(parse_age("1y"), Some(Duration::days(365)));
        assert_eq!(parse_age("3 fortnights"), None);
    }

    #[test]
    fn test_tokenize_folds_case_and_punctuation() {
        let tokens = tokenize("The Quick, brown-fox!");
        let expected: BTreeSet<String> = ["the", "quick", "brown", "fox"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tokens, expected);
    }
}
