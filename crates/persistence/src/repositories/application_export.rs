//! Application export query.
//!
//! Builds the filtered join behind the applications export. Every present
//! filter becomes an AND-combined predicate; array filters use `= ANY(...)`.

use domain::models::{ApplicationRecord, CanonicalFilterSet};
use sqlx::{PgExecutor, Postgres, QueryBuilder};

use crate::entities::ApplicationExportEntity;
use crate::error::StorageError;
use crate::metrics::QueryTimer;

const APPLICATION_EXPORT_SELECT: &str = r#"
    SELECT
        a.id, a.applicant_id, a.course_id, a.status, a.priority, a.notes, a.reviewed_by,
        a.submitted_at, a.reviewed_at, a.created_at, a.updated_at,
        up.full_name AS applicant_name,
        u.email AS applicant_email,
        up.employee_id, up.department, up.sub_organization, up.job_title,
        up.experience_years, up.manager_name, up.manager_email,
        c.title AS course_title,
        c.category AS course_category,
        c.level AS course_level,
        c.format AS course_format,
        c.duration AS course_duration,
        c.price::float8 AS course_price,
        c.is_active AS course_is_active,
        c.is_tamkeen_support AS course_is_tamkeen_support,
        rp.full_name AS reviewer_name
    FROM applications a
    JOIN users u ON a.applicant_id = u.id
    JOIN user_profiles up ON up.id = a.applicant_id
    JOIN courses c ON c.id = a.course_id
    LEFT JOIN user_profiles rp ON rp.id = a.reviewed_by
    WHERE TRUE"#;

/// Escapes `LIKE` metacharacters so user input matches literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds the applications export query for a canonical filter set.
pub fn build_application_export_query(
    filters: &CanonicalFilterSet,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(APPLICATION_EXPORT_SELECT);
    let date_column = filters.date_fields.applications.column();

    if let Some(range) = filters.date_range {
        builder.push(format!(" AND a.{} >= ", date_column));
        builder.push_bind(range.start);
        builder.push(format!(" AND a.{} < ", date_column));
        builder.push_bind(range.end_exclusive());
    }

    let apps = &filters.applications;
    if !apps.statuses.is_empty() {
        let statuses: Vec<String> = apps.statuses.iter().map(|s| s.as_str().to_string()).collect();
        builder.push(" AND a.status = ANY(");
        builder.push_bind(statuses);
        builder.push(")");
    }
    if !apps.priorities.is_empty() {
        let priorities: Vec<String> = apps
            .priorities
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();
        builder.push(" AND a.priority = ANY(");
        builder.push_bind(priorities);
        builder.push(")");
    }
    if !apps.departments.is_empty() {
        builder.push(" AND up.department = ANY(");
        builder.push_bind(apps.departments.clone());
        builder.push(")");
    }
    if !apps.sub_organizations.is_empty() {
        builder.push(" AND up.sub_organization = ANY(");
        builder.push_bind(apps.sub_organizations.clone());
        builder.push(")");
    }

    let mut categories = apps.course_categories.clone();
    for category in &filters.courses.categories {
        if !categories.contains(category) {
            categories.push(category.clone());
        }
    }
    if !categories.is_empty() {
        builder.push(" AND c.category = ANY(");
        builder.push_bind(categories);
        builder.push(")");
    }

    if !apps.reviewed_by.is_empty() {
        // Reviewers may be given by id or by name.
        builder.push(" AND (a.reviewed_by::text = ANY(");
        builder.push_bind(apps.reviewed_by.clone());
        builder.push(") OR rp.full_name = ANY(");
        builder.push_bind(apps.reviewed_by.clone());
        builder.push("))");
    }

    let courses = &filters.courses;
    if !courses.course_ids.is_empty() {
        builder.push(" AND c.id = ANY(");
        builder.push_bind(courses.course_ids.clone());
        builder.push(")");
    }
    if !courses.levels.is_empty() {
        let levels: Vec<String> = courses.levels.iter().map(|l| l.as_str().to_string()).collect();
        builder.push(" AND c.level = ANY(");
        builder.push_bind(levels);
        builder.push(")");
    }
    if !courses.formats.is_empty() {
        builder.push(" AND c.format = ANY(");
        builder.push_bind(courses.formats.clone());
        builder.push(")");
    }
    if let Some(range) = courses.price_range {
        if let Some(min) = range.min {
            builder.push(" AND c.price::float8 >= ");
            builder.push_bind(min);
        }
        if let Some(max) = range.max {
            builder.push(" AND c.price::float8 <= ");
            builder.push_bind(max);
        }
    }
    if let Some(range) = filters.employees.experience_range {
        if let Some(min) = range.min {
            builder.push(" AND up.experience_years >= ");
            builder.push_bind(min);
        }
        if let Some(max) = range.max {
            builder.push(" AND up.experience_years <= ");
            builder.push_bind(max);
        }
    }
    if let Some(active) = courses.active {
        builder.push(" AND c.is_active = ");
        builder.push_bind(active);
    }
    if filters.exclude_inactive {
        builder.push(" AND c.is_active = TRUE");
    }

    if let Some(term) = &filters.text_search {
        let pattern = format!("%{}%", escape_like(term));
        builder.push(" AND (");
        let mut any = builder.separated(" OR ");
        for column in ["up.full_name", "up.employee_id", "c.title", "c.category", "a.notes"] {
            any.push(format!("{} ILIKE ", column));
            any.push_bind_unseparated(pattern.clone());
        }
        builder.push(")");
    }

    builder.push(format!(" ORDER BY a.{} DESC NULLS LAST, a.id", date_column));

    if let Some(limit) = filters.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }
    if let Some(offset) = filters.offset {
        builder.push(" OFFSET ");
        builder.push_bind(offset);
    }

    builder
}

/// Runs the applications export query.
pub async fn fetch_application_records<'e, E>(
    executor: E,
    filters: &CanonicalFilterSet,
) -> Result<Vec<ApplicationRecord>, StorageError>
where
    E: PgExecutor<'e>,
{
    let mut builder = build_application_export_query(filters);

    let timer = QueryTimer::new("export_applications");
    let result = builder
        .build_query_as::<ApplicationExportEntity>()
        .fetch_all(executor)
        .await;
    timer.record();

    Ok(result?.into_iter().map(ApplicationRecord::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use domain::models::{
        ApplicationDateField, ApplicationStatus, DateRange, NumericRange, Priority,
    };

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_no_filters_has_no_limit() {
        let builder = build_application_export_query(&CanonicalFilterSet::default());
        let sql = builder.sql();
        assert!(sql.contains("LEFT JOIN user_profiles rp ON rp.id = a.reviewed_by"));
        assert!(sql.ends_with("ORDER BY a.created_at DESC NULLS LAST, a.id"));
        assert!(!sql.contains("LIMIT"));
        assert!(!sql.contains("$1"));
    }

    #[test]
    fn test_date_range_uses_selected_field() {
        let mut filters = CanonicalFilterSet::default();
        filters.date_fields.applications = ApplicationDateField::SubmittedAt;
        filters.date_range = Some(DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        ));

        let builder = build_application_export_query(&filters);
        let sql = builder.sql();
        assert!(sql.contains("a.submitted_at >= $1 AND a.submitted_at < $2"));
        assert!(sql.contains("ORDER BY a.submitted_at DESC"));
    }

    #[test]
    fn test_array_and_range_predicates() {
        let mut filters = CanonicalFilterSet::default();
        filters.applications.statuses = vec![ApplicationStatus::Approved];
        filters.applications.priorities = vec![Priority::High, Priority::Low];
        filters.applications.departments = vec!["IT".to_string()];
        filters.courses.price_range = Some(NumericRange {
            min: Some(10.0),
            max: None,
        });
        filters.exclude_inactive = true;
        filters.limit = Some(50);

        let builder = build_application_export_query(&filters);
        let sql = builder.sql();
        assert!(sql.contains("a.status = ANY($1)"));
        assert!(sql.contains("a.priority = ANY($2)"));
        assert!(sql.contains("up.department = ANY($3)"));
        assert!(sql.contains("c.price::float8 >= $4"));
        assert!(!sql.contains("c.price::float8 <="));
        assert!(sql.contains("c.is_active = TRUE"));
        assert!(sql.contains("LIMIT $5"));
    }

    #[test]
    fn test_text_search_spans_fixed_columns() {
        let filters = CanonicalFilterSet {
            text_search: Some("rust".to_string()),
            ..Default::default()
        };
        let builder = build_application_export_query(&filters);
        let sql = builder.sql();
        assert!(sql.contains(
            "(up.full_name ILIKE $1 OR up.employee_id ILIKE $2 OR c.title ILIKE $3 \
             OR c.category ILIKE $4 OR a.notes ILIKE $5)"
        ));
    }
}
