//! Filter normalization for export jobs.
//!
//! Turns a submitted `RawExportFilters` document into the closed
//! `CanonicalFilterSet` the collectors consume. Pure: the caller supplies
//! the instant used as "now" for relative date presets.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use shared::validation::{parse_calendar_date, validate_numeric_range};

use crate::error::ExportValidationError;
use crate::models::export_filter::{
    ApplicationFilters, ApplicationStatus, CanonicalFilterSet, CourseFilters, DateRange,
    EmployeeFilters, NumericRange, RawExportFilters,
};

/// Window used when a date expression cannot be resolved.
pub const DEFAULT_RANGE_DAYS: i64 = 30;

const CUSTOM_PRESET: &str = "custom";

/// Named relative date ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePreset {
    Today,
    Yesterday,
    LastDays(i64),
    ThisWeek,
    ThisMonth,
    ThisYear,
    LastYear,
    LastMonth,
    CurrentQuarter,
    LastQuarter,
}

impl DatePreset {
    /// Matches a preset name, ignoring case and hyphens.
    pub fn parse(name: &str) -> Option<Self> {
        let key: String = name
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| *c != '-')
            .collect();

        match key.as_str() {
            "today" => Some(Self::Today),
            "yesterday" => Some(Self::Yesterday),
            "last7days" => Some(Self::LastDays(7)),
            "last30days" => Some(Self::LastDays(30)),
            "last90days" => Some(Self::LastDays(90)),
            "thisweek" => Some(Self::ThisWeek),
            "thismonth" | "currentmonth" => Some(Self::ThisMonth),
            "thisyear" | "currentyear" => Some(Self::ThisYear),
            "lastyear" => Some(Self::LastYear),
            "lastmonth" => Some(Self::LastMonth),
            "currentquarter" => Some(Self::CurrentQuarter),
            "lastquarter" => Some(Self::LastQuarter),
            _ => None,
        }
    }

    /// Resolves the preset against `now` (UTC calendar dates).
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateRange> {
        let today = now.date_naive();

        let range = match self {
            Self::Today => DateRange::new(today, today),
            Self::Yesterday => {
                let day = today.pred_opt()?;
                DateRange::new(day, day)
            }
            Self::LastDays(days) => {
                DateRange::new((now - Duration::days(*days)).date_naive(), today)
            }
            Self::ThisWeek => {
                let offset = today.weekday().num_days_from_sunday() as i64;
                DateRange::new(today - Duration::days(offset), today)
            }
            Self::ThisMonth => DateRange::new(today.with_day(1)?, today),
            Self::ThisYear => DateRange::new(NaiveDate::from_ymd_opt(today.year(), 1, 1)?, today),
            Self::LastYear => {
                let year = today.year() - 1;
                DateRange::new(
                    NaiveDate::from_ymd_opt(year, 1, 1)?,
                    NaiveDate::from_ymd_opt(year, 12, 31)?,
                )
            }
            Self::LastMonth => {
                let end = today.with_day(1)?.pred_opt()?;
                DateRange::new(end.with_day(1)?, end)
            }
            Self::CurrentQuarter => DateRange::new(quarter_start(today)?, today),
            Self::LastQuarter => {
                let end = quarter_start(today)?.pred_opt()?;
                DateRange::new(quarter_start(end)?, end)
            }
        };

        Some(range)
    }
}

fn quarter_start(date: NaiveDate) -> Option<NaiveDate> {
    let month = (date.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), month, 1)
}

fn default_range(now: DateTime<Utc>) -> DateRange {
    DateRange::new(
        (now - Duration::days(DEFAULT_RANGE_DAYS)).date_naive(),
        now.date_naive(),
    )
}

/// Parses a literal `YYYY-MM-DD` or `YYYY-MM-DD to YYYY-MM-DD` expression.
fn parse_literal_range(expression: &str) -> Option<DateRange> {
    let range = match expression.split_once(" to ") {
        Some((start, end)) => DateRange::new(parse_calendar_date(start)?, parse_calendar_date(end)?),
        None => {
            let day = parse_calendar_date(expression)?;
            DateRange::new(day, day)
        }
    };

    (range.start <= range.end).then_some(range)
}

fn parse_explicit_date(label: &str, value: &str) -> Result<NaiveDate, ExportValidationError> {
    parse_calendar_date(value).ok_or_else(|| {
        ExportValidationError::validation(format!(
            "{} is not a valid date (expected YYYY-MM-DD): {}",
            label, value
        ))
    })
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Resolves the date range of a filter document.
///
/// `custom` requires both explicit dates. Any other expression that cannot
/// be resolved falls back to the last 30 days.
pub fn resolve_date_range(
    raw: &RawExportFilters,
    now: DateTime<Utc>,
) -> Result<Option<DateRange>, ExportValidationError> {
    let start = present(&raw.start_date);
    let end = present(&raw.end_date);

    let Some(expression) = present(&raw.date_range) else {
        return match (start, end) {
            (Some(start), Some(end)) => explicit_range(start, end).map(Some),
            (None, None) => Ok(None),
            _ => {
                tracing::warn!(
                    start_date = ?start,
                    end_date = ?end,
                    "Ignoring single-sided date bound without a date range"
                );
                Ok(None)
            }
        };
    };

    if expression.eq_ignore_ascii_case(CUSTOM_PRESET) {
        return match (start, end) {
            (Some(start), Some(end)) => explicit_range(start, end).map(Some),
            _ => Err(ExportValidationError::validation(
                "startDate and endDate are required when dateRange is 'custom'",
            )),
        };
    }

    let resolved = match DatePreset::parse(expression) {
        Some(preset) => preset.resolve(now),
        None => parse_literal_range(expression),
    };

    Ok(Some(resolved.unwrap_or_else(|| {
        tracing::warn!(
            date_range = expression,
            fallback_days = DEFAULT_RANGE_DAYS,
            "Unparseable date range, using default window"
        );
        default_range(now)
    })))
}

fn explicit_range(start: &str, end: &str) -> Result<DateRange, ExportValidationError> {
    let start = parse_explicit_date("startDate", start)?;
    let end = parse_explicit_date("endDate", end)?;
    if start > end {
        return Err(ExportValidationError::validation(
            "startDate must be on or before endDate",
        ));
    }
    Ok(DateRange::new(start, end))
}

fn check_range(
    label: &str,
    range: Option<NumericRange>,
) -> Result<Option<NumericRange>, ExportValidationError> {
    match range {
        Some(range) => {
            validate_numeric_range(label, range.min, range.max)?;
            Ok((!range.is_unbounded()).then_some(range))
        }
        None => Ok(None),
    }
}

/// Trims entries, drops blanks and duplicates while keeping order.
fn clean_strings(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !cleaned.iter().any(|v| v == value) {
            cleaned.push(value.to_string());
        }
    }
    cleaned
}

fn dedup<T: PartialEq + Copy>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

/// Normalizes a submitted filter document.
///
/// Fails on structurally invalid input (custom range without dates, inverted
/// or negative numeric ranges, unknown legacy statuses, negative paging).
pub fn normalize_filters(
    raw: &RawExportFilters,
    now: DateTime<Utc>,
) -> Result<CanonicalFilterSet, ExportValidationError> {
    let date_range = resolve_date_range(raw, now)?;

    let mut statuses = raw.application_status.clone();
    for legacy in &raw.status {
        let status = legacy
            .parse::<ApplicationStatus>()
            .map_err(ExportValidationError::Validation)?;
        statuses.push(status);
    }

    let price_range = check_range("Price range", raw.price_range)?;
    let experience_range = check_range("Experience range", raw.experience_range)?;

    if let Some(limit) = raw.limit {
        if limit < 1 {
            return Err(ExportValidationError::validation("limit must be at least 1"));
        }
    }
    if let Some(offset) = raw.offset {
        if offset < 0 {
            return Err(ExportValidationError::validation("offset must not be negative"));
        }
    }

    let applications = ApplicationFilters {
        statuses: dedup(statuses),
        priorities: dedup(raw.application_priority.iter().copied()),
        departments: clean_strings(raw.applicant_department.iter().cloned()),
        sub_organizations: clean_strings(
            raw.applicant_sub_organization
                .iter()
                .chain(raw.organizations.iter())
                .cloned(),
        ),
        course_categories: clean_strings(raw.course_categories.iter().cloned()),
        reviewed_by: clean_strings(raw.reviewed_by.iter().cloned()),
    };

    let courses = CourseFilters {
        levels: dedup(raw.course_level.iter().copied()),
        formats: clean_strings(raw.course_format.iter().cloned()),
        categories: clean_strings(raw.course_category.iter().cloned()),
        course_ids: dedup(raw.course_ids.iter().copied()),
        price_range,
        active: raw.course_active,
    };

    let employees = EmployeeFilters {
        departments: clean_strings(raw.employee_department.iter().cloned()),
        roles: dedup(raw.employee_role.iter().copied()),
        sub_organizations: clean_strings(raw.employee_sub_organization.iter().cloned()),
        experience_range,
        job_titles: clean_strings(raw.job_title.iter().cloned()),
        manager_names: clean_strings(raw.manager_name.iter().cloned()),
    };

    Ok(CanonicalFilterSet {
        date_range,
        date_fields: raw.date_field,
        applications,
        courses,
        employees,
        text_search: present(&raw.text_search).map(str::to_string),
        exclude_inactive: raw.exclude_inactive,
        include_deleted: raw.include_deleted,
        limit: raw.limit,
        offset: raw.offset,
    })
}
