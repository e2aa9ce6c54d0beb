use std::sync::OnceLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use super::RecordError;

/// Date-only inputs accepted besides RFC 3339 timestamps. `%B` also accepts
/// abbreviated month names when parsing.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%A, %B %d, %Y",
];

/// Offset-less date-times, read as UTC.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

fn non_slug_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9_\s-]").unwrap())
}

fn slug_separators() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\s_-]+").unwrap())
}

fn clock_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([0-9]{1,2}):([0-9]{2})\s*(am|pm)?$").unwrap())
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

/// Derives the URL slug of a title.
///
/// Only ASCII letters, digits and separators survive; runs of whitespace,
/// underscores and hyphens become one hyphen, and edge hyphens are dropped.
/// A title with nothing left after stripping yields an empty slug.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = non_slug_chars().replace_all(lowered.trim(), "");
    let hyphenated = slug_separators().replace_all(&stripped, "-");
    hyphenated.trim_matches('-').to_string()
}

/// Parses a calendar date and returns its UTC day as `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Result<String, RecordError> {
    let input = raw.trim();
    let invalid = || RecordError::InvalidDateFormat(raw.to_string());

    let day = parse_day(input).ok_or_else(invalid)?;
    if !(0..=9999).contains(&day.year()) {
        return Err(invalid());
    }
    Ok(day.format("%Y-%m-%d").to_string())
}

fn parse_day(input: &str) -> Option<NaiveDate> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(input) {
        return Some(stamp.with_timezone(&Utc).date_naive());
    }
    if let Some(stamp) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
    {
        return Some(stamp.date());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
}

/// Converts `HH:MM` (24-hour) or `HH:MM am/pm` into zero-padded 24-hour
/// `HH:MM`.
///
/// The 12-hour form requires an hour in 1..=12, so `0:30am` is rejected even
/// though `0:30` is accepted.
pub fn normalize_time(raw: &str) -> Result<String, RecordError> {
    let invalid = || RecordError::InvalidTimeFormat(raw.to_string());
    let input = raw.trim().to_lowercase();

    let captures = clock_pattern().captures(&input).ok_or_else(invalid)?;
    let hours: u32 = captures[1].parse().map_err(|_| invalid())?;
    let minutes: u32 = captures[2].parse().map_err(|_| invalid())?;
    if minutes > 59 {
        return Err(invalid());
    }

    let hours = match captures.get(3).map(|m| m.as_str()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hours) {
                return Err(invalid());
            }
            match (meridiem, hours) {
                ("am", 12) => 0,
                ("am", h) => h,
                (_, 12) => 12,
                (_, h) => h + 12,
            }
        }
        None => {
            if hours > 23 {
                return Err(invalid());
            }
            hours
        }
    };

    Ok(format!("{:02}:{:02}", hours, minutes))
}

/// Trims and lowercases an email address, then checks its shape.
pub fn normalize_email(raw: &str) -> Result<String, RecordError> {
    let email = raw.trim().to_lowercase();
    if !email_pattern().is_match(&email) {
        return Err(RecordError::InvalidEmailFormat(raw.to_string()));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_slugify_basic_titles() {
        assert_eq!(slugify("RustConf 2025"), "rustconf-2025");
        assert_eq!(slugify("  Hello,   World!  "), "hello-world");
        assert_eq!(slugify("Next.js & React Summit"), "nextjs-react-summit");
        assert_eq!(slugify("snake_case -- and -- dashes"), "snake-case-and-dashes");
        assert_eq!(slugify("--Leading and trailing--"), "leading-and-trailing");
    }

    #[test]
    fn test_slugify_drops_non_ascii_letters() {
        assert_eq!(slugify("Café Meetup"), "caf-meetup");
    }

    #[test]
    fn test_slugify_symbol_only_title_is_empty() {
        assert_eq!(slugify("!!! ???"), "");
    }

    #[test]
    fn test_normalize_date_accepts_common_forms() {
        assert_eq!(normalize_date("2025-03-15").unwrap(), "2025-03-15");
        assert_eq!(normalize_date("2025-3-5").unwrap(), "2025-03-05");
        assert_eq!(normalize_date("March 15, 2025").unwrap(), "2025-03-15");
        assert_eq!(normalize_date("Mar 15, 2025").unwrap(), "2025-03-15");
        assert_eq!(normalize_date("03/15/2025").unwrap(), "2025-03-15");
        assert_eq!(normalize_date("2025-03-15T10:00:00").unwrap(), "2025-03-15");
    }

    #[test]
    fn test_normalize_date_uses_utc_day_of_timestamps() {
        assert_eq!(
            normalize_date("2025-03-15T23:30:00-05:00").unwrap(),
            "2025-03-16"
        );
        assert_eq!(normalize_date("2025-03-15T00:30:00Z").unwrap(), "2025-03-15");
    }

    #[test]
    fn test_normalize_date_rejects_garbage() {
        for raw in ["", "tomorrow", "2025-13-01", "2025-02-30", "15.03"] {
            assert!(
                matches!(normalize_date(raw), Err(RecordError::InvalidDateFormat(_))),
                "'{}' should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_normalize_time_conversions() {
        assert_eq!(normalize_time("2:30pm").unwrap(), "14:30");
        assert_eq!(normalize_time("12:00am").unwrap(), "00:00");
        assert_eq!(normalize_time("12:00pm").unwrap(), "12:00");
        assert_eq!(normalize_time("9:05").unwrap(), "09:05");
        assert_eq!(normalize_time("11:59 PM").unwrap(), "23:59");
        assert_eq!(normalize_time(" 7:15 Am ").unwrap(), "07:15");
        assert_eq!(normalize_time("0:00").unwrap(), "00:00");
        assert_eq!(normalize_time("23:59").unwrap(), "23:59");
    }

    #[test]
    fn test_normalize_time_rejects_out_of_range() {
        for raw in ["13:00am", "0:00am", "0:30pm", "24:00", "9:60", "9:5", "930", "noon", ""] {
            assert!(
                matches!(normalize_time(raw), Err(RecordError::InvalidTimeFormat(_))),
                "'{}' should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Ada.Lovelace@Example.COM ").unwrap(),
            "ada.lovelace@example.com"
        );
        for raw in ["", "plain", "a@b", "a b@c.d", "a@@b.c", "@b.c"] {
            assert!(
                matches!(normalize_email(raw), Err(RecordError::InvalidEmailFormat(_))),
                "'{}' should be rejected",
                raw
            );
        }
    }

    proptest! {
        #[test]
        fn prop_slug_is_lowercase_ascii_without_edge_hyphens(title in "\\PC{0,80}") {
            let slug = slugify(&title);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }

        #[test]
        fn prop_slugify_is_deterministic_and_stable(title in "\\PC{0,80}") {
            let slug = slugify(&title);
            prop_assert_eq!(&slugify(&title), &slug);
            prop_assert_eq!(slugify(&slug), slug);
        }

        #[test]
        fn prop_normalized_dates_are_canonical(y in 1i32..9999, m in 1u32..=12, d in 1u32..=28) {
            let raw = format!("{}-{}-{}", y, m, d);
            let day = normalize_date(&raw).unwrap();
            prop_assert_eq!(day.len(), 10);
            prop_assert_eq!(day, format!("{:04}-{:02}-{:02}", y, m, d));
        }
    }
}
