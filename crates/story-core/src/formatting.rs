use chrono::{NaiveDateTime, Timelike};

/// Render `value` with `decimals` fractional digits and comma-grouped
/// thousands.
///
/// ```
/// use story_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(-9876.6, 0), "-9,877");
/// assert_eq!(format_number(-0.001, 2), "0.00");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let digits = format!("{:.*}", decimals as usize, value.abs());
    let (int_digits, frac_digits) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits.as_str(), None),
    };

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    // Values that round to zero print without a sign.
    if value.is_sign_negative() && digits.bytes().any(|b| (b'1'..=b'9').contains(&b)) {
        out.push('-');
    }
    out.push_str(&insert_separators(int_digits));
    if let Some(frac) = frac_digits {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Two-decimal rendering of a KPI or monthly figure; the empty-set sentinel
/// `NaN` prints as `n/a`.
///
/// ```
/// use story_core::formatting::format_metric;
///
/// assert_eq!(format_metric(22.0 / 3.0), "7.33");
/// assert_eq!(format_metric(f64::NAN), "n/a");
/// ```
pub fn format_metric(value: f64) -> String {
    match value {
        v if v.is_nan() => "n/a".to_string(),
        v if v == f64::INFINITY => "inf".to_string(),
        v if v == f64::NEG_INFINITY => "-inf".to_string(),
        v => format_number(v, 2),
    }
}

/// `"YYYY-MM"` label for a month start.
pub fn format_month(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m").to_string()
}

/// Date only at midnight, date and time otherwise.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    let layout = if ts.time().num_seconds_from_midnight() == 0 && ts.nanosecond() == 0 {
        "%Y-%m-%d"
    } else {
        "%Y-%m-%d %H:%M:%S"
    };
    ts.format(layout).to_string()
}

/// Share of `part` in `whole` as a percentage rounded to `decimal_places`.
/// A zero `whole` gives 0.
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let scale = 10_f64.powi(decimal_places as i32);
    (part * 100.0 / whole * scale).round() / scale
}

fn insert_separators(int_digits: &str) -> String {
    let bytes = int_digits.as_bytes();
    let head = bytes.len() % 3;
    let mut groups: Vec<&str> = Vec::with_capacity(bytes.len() / 3 + 1);
    if head > 0 {
        groups.push(&int_digits[..head]);
    }
    groups.extend(
        (head..bytes.len())
            .step_by(3)
            .map(|start| &int_digits[start..start + 3]),
    );
    groups.join(",")
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_number_grouping() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(999.0, 0), "999");
        assert_eq!(format_number(1_000.0, 0), "1,000");
        assert_eq!(format_number(123_456.0, 0), "123,456");
        assert_eq!(format_number(1_234_567.891, 2), "1,234,567.89");
    }

    #[test]
    fn test_format_number_sign() {
        assert_eq!(format_number(-2_500.26, 1), "-2,500.3");
        assert_eq!(format_number(-0.004, 2), "0.00");
        assert_eq!(format_number(-0.0, 0), "0");
    }

    #[test]
    fn test_format_number_decimals() {
        assert_eq!(format_number(15.0, 2), "15.00");
        assert_eq!(format_number(7.333_333, 2), "7.33");
        assert_eq!(format_number(0.5, 3), "0.500");
    }

    #[test]
    fn test_format_metric() {
        assert_eq!(format_metric(22.0), "22.00");
        assert_eq!(format_metric(-1_234.5), "-1,234.50");
        assert_eq!(format_metric(f64::NAN), "n/a");
        assert_eq!(format_metric(f64::INFINITY), "inf");
        assert_eq!(format_metric(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_format_month_and_timestamp() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let midnight = day.and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(format_month(&midnight), "2024-02");
        assert_eq!(format_timestamp(&midnight), "2024-02-01");
        assert_eq!(
            format_timestamp(&day.and_hms_opt(9, 30, 0).unwrap()),
            "2024-02-01 09:30:00"
        );
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(3.0, 3.0, 1), 100.0);
        assert_eq!(percentage(1.0, 3.0, 1), 33.3);
        assert_eq!(percentage(5.0, 0.0, 1), 0.0);
    }
}
