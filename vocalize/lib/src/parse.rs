//! Parsing utilities for shift settings.

use chrono::NaiveTime;

/// Parses a time-of-day string into a `NaiveTime`.
///
/// ## Supported Formats
///
/// - 12-hour format: `6:00pm`, `11:30am`, `6pm`
/// - 24-hour format: `18:00`, `07:30`, `17:59:30`
///
/// ## Errors
///
/// Returns an error string if the time cannot be parsed.
///
/// ## Examples
///
/// ```
/// use vocalize_lib::parse_at_time;
/// use chrono::NaiveTime;
///
/// let time = parse_at_time("6:00pm").unwrap();
/// assert_eq!(time, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
///
/// let time = parse_at_time("5pm").unwrap();
/// assert_eq!(time, NaiveTime::from_hms_opt(17, 0, 0).unwrap());
///
/// let time = parse_at_time("07:30").unwrap();
/// assert_eq!(time, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
/// ```
pub fn parse_at_time(value: &str) -> Result<NaiveTime, String> {
    let normalized = value.trim().to_lowercase().replace(' ', "");

    if normalized.is_empty() {
        return Err("time cannot be empty".to_string());
    }

    let formats = ["%H:%M", "%H:%M:%S", "%I:%M%P"];
    let candidate = with_minutes(&normalized);

    for format in formats {
        if let Ok(time) = NaiveTime::parse_from_str(&candidate, format) {
            return Ok(time);
        }
    }

    Err("expected time like 6:00pm or 18:00".to_string())
}

/// Expands an hour-only 12-hour time (`6pm`) to `6:00pm`.
///
/// `NaiveTime` needs a minute, so the short form cannot be parsed directly.
fn with_minutes(value: &str) -> String {
    let suffix = ["am", "pm"]
        .into_iter()
        .find(|suffix| value.ends_with(suffix));

    match suffix {
        Some(suffix) if !value.contains(':') => {
            let hour = &value[..value.len() - suffix.len()];
            format!("{hour}:00{suffix}")
        }
        _ => value.to_string(),
    }
}

/// Parses a shift length in hours, e.g. `8`, `7.5` or `8h`.
///
/// ## Errors
///
/// Returns an error string when the value is not a finite number greater
/// than zero.
///
/// ## Examples
///
/// ```
/// use vocalize_lib::parse_hours;
///
/// assert_eq!(parse_hours("8").unwrap(), 8.0);
/// assert_eq!(parse_hours("7.5h").unwrap(), 7.5);
/// assert!(parse_hours("0").is_err());
/// ```
pub fn parse_hours(value: &str) -> Result<f64, String> {
    let normalized = value.trim().to_lowercase().replace(' ', "");

    if normalized.is_empty() {
        return Err("hours cannot be empty".to_string());
    }

    let amount = normalized.strip_suffix('h').unwrap_or(&normalized);
    let hours: f64 = amount
        .parse()
        .map_err(|_| "hours must be a number".to_string())?;

    if !hours.is_finite() || hours <= 0.0 {
        return Err("hours must be greater than zero".to_string());
    }

    Ok(hours)
}
