use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Converts an ISO-8601 date or datetime to unix seconds. Values without an
/// offset are read as UTC.
pub fn convert_iso_to_timestamp(iso_date_str: &str) -> Option<i64> {
    let parsed = parse_iso_timestamp(iso_date_str);
    if parsed.is_none() {
        tracing::error!("Failed to convert date: {}", iso_date_str);
    }
    parsed
}

/// Same as [`convert_iso_to_timestamp`] without logging failures.
pub fn parse_iso_timestamp(iso_date_str: &str) -> Option<i64> {
    let trimmed = iso_date_str.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc().timestamp());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp())
}

pub fn format_current_time() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
