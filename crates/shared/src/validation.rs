//! Common validation utilities.

use chrono::{DateTime, NaiveDate};
use validator::ValidationError;

/// Date format accepted for explicit calendar dates.
pub const CALENDAR_DATE_FORMAT: &str = "%Y-%m-%d";

/// Validates an optional `min`/`max` pair.
///
/// Both bounds must be non-negative, and when both are present
/// `min` must not exceed `max`. `label` names the range in the message
/// (e.g. "Price range").
pub fn validate_numeric_range(
    label: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(), ValidationError> {
    for bound in [min, max].into_iter().flatten() {
        if bound.is_nan() || bound < 0.0 {
            let mut err = ValidationError::new("range_negative");
            err.message = Some(format!("{} bounds must be non-negative", label).into());
            return Err(err);
        }
    }

    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            let mut err = ValidationError::new("range_order");
            err.message = Some(
                format!(
                    "{} minimum must be less than or equal to maximum",
                    label
                )
                .into(),
            );
            return Err(err);
        }
    }

    Ok(())
}

/// Parses a calendar date from either `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// Timestamps keep their own calendar date (no timezone shifting).
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(trimmed, CALENDAR_DATE_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Validates that a string holds a parseable calendar date.
pub fn validate_calendar_date(value: &str) -> Result<(), ValidationError> {
    if parse_calendar_date(value).is_some() {
        Ok(())
    } else {
        let mut err = ValidationError::new("date_invalid");
        err.message = Some(format!("Invalid date: {} (expected YYYY-MM-DD)", value).into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_range_accepts_ordered_bounds() {
        assert!(validate_numeric_range("Price range", Some(50.0), Some(100.0)).is_ok());
        assert!(validate_numeric_range("Price range", Some(50.0), Some(50.0)).is_ok());
    }

    #[test]
    fn test_numeric_range_accepts_open_bounds() {
        assert!(validate_numeric_range("Price range", None, None).is_ok());
        assert!(validate_numeric_range("Price range", Some(10.0), None).is_ok());
        assert!(validate_numeric_range("Price range", None, Some(10.0)).is_ok());
    }

    #[test]
    fn test_numeric_range_rejects_inverted_bounds() {
        let err = validate_numeric_range("Price range", Some(100.0), Some(50.0)).unwrap_err();
        assert_eq!(err.code, "range_order");
        assert_eq!(
            err.message.unwrap().to_string(),
            "Price range minimum must be less than or equal to maximum"
        );
    }

    #[test]
    fn test_numeric_range_rejects_negative() {
        let err = validate_numeric_range("Experience range", Some(-1.0), None).unwrap_err();
        assert_eq!(err.code, "range_negative");
    }

    #[test]
    fn test_parse_calendar_date_plain() {
        assert_eq!(
            parse_calendar_date("2024-03-15"),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }

    #[test]
    fn test_parse_calendar_date_rfc3339() {
        assert_eq!(
            parse_calendar_date("2024-03-15T10:30:00Z"),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }

    #[test]
    fn test_parse_calendar_date_invalid() {
        assert!(parse_calendar_date("").is_none());
        assert!(parse_calendar_date("not-a-date").is_none());
        assert!(parse_calendar_date("2024-13-40").is_none());
    }

    #[test]
    fn test_validate_calendar_date_message() {
        let err = validate_calendar_date("tomorrow").unwrap_err();
        assert!(err.message.unwrap().contains("tomorrow"));
    }
}
