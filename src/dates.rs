//! Timestamp normalization.
//!
//! Jira and its plugins emit timestamps in several shapes:
//!
//! ```text
//! 2024-01-15T10:30:00.123+0000     (REST API default)
//! 2024-01-15T10:30:00.123456Z
//! 2024-01-15T10:30:00-05:00
//! 2024-01-15 10:30:00              (no offset, assumed UTC)
//! 2024-01-15                       (midnight UTC)
//! ```
//!
//! [`parse`] accepts all of them. The fractional-second run is cut out before
//! the offset is looked for, so millisecond digits are never read as an
//! offset. Parsing never fails: unparseable input yields the current instant
//! and a warning, because callers only use the value for filtering.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;

const LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp into an offset-aware instant, falling back to now.
pub fn parse(raw: &str) -> DateTime<FixedOffset> {
    match try_parse(raw) {
        Some(dt) => dt,
        None => {
            warn!(input = %raw, "unparseable timestamp, using current time");
            Utc::now().fixed_offset()
        }
    }
}

/// Strict variant of [`parse`]: `None` on unparseable input.
pub fn try_parse(raw: &str) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if s.len() == 10 {
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset());
    }

    let (without_fraction, nanos) = split_fraction(s);
    let (base, offset) = split_offset(&without_fraction)?;

    let naive = LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(base, layout).ok())?;
    let naive = naive.checked_add_signed(chrono::Duration::nanoseconds(nanos as i64))?;

    naive.and_local_timezone(offset).single()
}

/// Remove the `.ddd…` run following the seconds field.
///
/// Returns the remaining string and the fraction as nanoseconds (digits past
/// the ninth are dropped).
fn split_fraction(s: &str) -> (String, u32) {
    // The fraction can only appear after the time part starts.
    let time_start = s.find(['T', ' ']).unwrap_or(0);
    let Some(dot) = s[time_start..].find('.').map(|i| i + time_start) else {
        return (s.to_string(), 0);
    };

    let digits: String = s[dot + 1..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let rest = &s[dot + 1 + digits.len()..];

    let mut padded: String = digits.chars().take(9).collect();
    while padded.len() < 9 {
        padded.push('0');
    }
    let nanos = padded.parse::<u32>().unwrap_or(0);

    (format!("{}{}", &s[..dot], rest), nanos)
}

/// Split a trailing `Z`, `±HH:MM`, `±HHMM` or `±HH` offset from the base.
/// A missing offset means UTC.
fn split_offset(s: &str) -> Option<(&str, FixedOffset)> {
    let utc = FixedOffset::east_opt(0)?;

    if let Some(base) = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        return Some((base, utc));
    }

    // The offset sign must follow the time part, never the date dashes.
    let time_start = s.find(['T', ' '])?;
    let Some(sign_pos) = s[time_start..].rfind(['+', '-']).map(|i| i + time_start) else {
        return Some((s, utc));
    };

    let base = &s[..sign_pos];
    let sign = if &s[sign_pos..sign_pos + 1] == "-" { -1 } else { 1 };
    let digits: String = s[sign_pos + 1..].chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (
            digits[..2].parse::<i32>().ok()?,
            digits[2..].parse::<i32>().ok()?,
        ),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }

    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    Some((base, offset))
}
