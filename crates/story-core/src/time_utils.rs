use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use regex::Regex;
use tracing::debug;

use crate::error::{Result, StoryError};

// ── Timezone resolution ───────────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a timezone setting to a [`Tz`].
///
/// `"auto"` resolves to the system timezone (UTC when the system reports a
/// name chrono-tz does not know); anything else must be a valid IANA
/// identifier.
pub fn resolve_timezone(name: &str) -> Result<Tz> {
    let name = if name.eq_ignore_ascii_case("auto") {
        let system = get_system_timezone();
        if validate_timezone(&system) {
            system
        } else {
            debug!("System timezone {} is not recognised; using UTC", system);
            "UTC".to_string()
        }
    } else {
        name.to_string()
    };
    name.parse::<Tz>()
        .map_err(|_| StoryError::Config(format!("unknown timezone {name}")))
}

/// Validate that `tz_name` is a recognised IANA timezone identifier.
pub fn validate_timezone(tz_name: &str) -> bool {
    tz_name.parse::<Tz>().is_ok()
}

// ── DateParser ────────────────────────────────────────────────────────────────

/// Naive date-time layouts, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Offset-carrying layouts not covered by RFC 3339 / RFC 2822.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Date-only layouts. Month-first readings come before day-first ones,
/// two-digit years before four-digit ones, and year-leading layouts last so a
/// short leading number is never read as a year.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%d/%m/%y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%y",
    "%d-%m-%y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%m.%d.%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%d %b %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%B %d %Y",
    "%B %d, %Y",
];

fn year_month_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{1,2})$").expect("regex is valid"))
}

/// Parses date/time strings into wall-clock [`NaiveDateTime`]s.
///
/// Values carrying a UTC offset keep their own wall-clock time unless a
/// target timezone is set, in which case they are converted to it first.
/// Naive values are always taken as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateParser {
    tz: Option<Tz>,
}

impl DateParser {
    /// A parser that converts offset-aware values to `tz`.
    pub fn new(tz: Tz) -> Self {
        Self { tz: Some(tz) }
    }

    /// A parser with an optional target timezone; `None` keeps each value's
    /// own offset.
    pub fn with_timezone(tz: Option<Tz>) -> Self {
        Self { tz }
    }

    /// Parse `s`, returning `None` for empty or unrecognised input.
    pub fn parse(&self, s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(self.localize(dt));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(self.localize(dt));
        }
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(self.localize(dt));
            }
        }

        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive);
            }
        }
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return date.and_hms_opt(0, 0, 0);
            }
        }

        if let Some(caps) = year_month_regex().captures(s) {
            let year: i32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            return NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0);
        }

        debug!("DateParser: no layout matched \"{}\"", s);
        None
    }

    /// Interpret `nanos` as nanoseconds since the Unix epoch (UTC wall clock).
    pub fn from_epoch_nanos(nanos: i64) -> NaiveDateTime {
        DateTime::from_timestamp_nanos(nanos).naive_utc()
    }

    fn localize(&self, dt: DateTime<FixedOffset>) -> NaiveDateTime {
        match self.tz {
            Some(tz) => dt.with_timezone(&tz).naive_local(),
            None => dt.naive_local(),
        }
    }
}

/// Midnight on the first day of the month containing `ts`.
pub fn month_start(ts: NaiveDateTime) -> NaiveDateTime {
    use chrono::Datelike as _;
    ts.date()
        .with_day(1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(ts)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
