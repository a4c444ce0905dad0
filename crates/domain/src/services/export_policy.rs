//! Export request policy: permission rules and request validation.

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::error::ExportValidationError;
use crate::models::export_filter::{CanonicalFilterSet, RawExportFilters};
use crate::models::export_job::{CreateExportRequest, DataTypes};
use crate::models::user_role::UserRole;

use super::filter_normalizer::normalize_filters;

/// Checks whether `role` may export the requested data types.
///
/// Super admins may export everything, admins everything except employee
/// data, and any other role nothing.
pub fn check_export_permission(
    role: UserRole,
    data_types: &DataTypes,
) -> Result<(), ExportValidationError> {
    match role {
        UserRole::SuperAdmin => Ok(()),
        UserRole::Admin if !data_types.employees => Ok(()),
        UserRole::Admin => Err(ExportValidationError::permission(
            "Admins cannot export employee data",
        )),
        UserRole::Applicant => Err(ExportValidationError::permission(
            "Insufficient permissions to export data",
        )),
    }
}

/// Validates a create-export request end to end.
///
/// Order: field validation, data type selection, permission, filters.
/// Returns the normalized filters so callers can log or inspect them; the
/// job itself stores the submitted document.
pub fn validate_export_request(
    request: &CreateExportRequest,
    role: UserRole,
    now: DateTime<Utc>,
) -> Result<CanonicalFilterSet, ExportValidationError> {
    request.validate()?;

    if request.name.trim().is_empty() {
        return Err(ExportValidationError::validation("Export name is required"));
    }

    if !request.data_types.any_selected() {
        return Err(ExportValidationError::validation(
            "At least one data type must be selected",
        ));
    }

    check_export_permission(role, &request.data_types)?;

    let raw = RawExportFilters::from_json(&request.filters)?;
    normalize_filters(&raw, now)
}
