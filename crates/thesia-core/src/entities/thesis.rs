use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::ThesisStatus;
use crate::errors::CoreError;

/// Lowest accepted final grade.
pub const MIN_FINAL_GRADE: f64 = 0.0;
/// Highest accepted final grade.
pub const MAX_FINAL_GRADE: f64 = 10.0;

/// Administrative approval record required before a thesis activates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct GeneralAssembly {
    pub number: i64,
    pub year: i64,
}

/// The binding of one student to one topic under one supervisor, tracked
/// through its lifecycle.
///
/// A thesis is never physically deleted; it ends in a terminal status
/// (`completed` or `cancelled`) and stays on record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Thesis {
    pub id: String,
    pub topic_id: String,
    pub student_id: String,
    pub supervisor_id: String,
    pub status: ThesisStatus,
    pub assigned_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub examination_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub general_assembly: Option<GeneralAssembly>,
    pub final_grade: Option<f64>,
    pub repository_link: Option<String>,
}

/// Check a final grade against the accepted range.
///
/// # Errors
///
/// Returns `CoreError::GuardFailed` when the grade is non-finite or outside
/// `0.0..=10.0`.
pub fn validate_final_grade(grade: f64) -> Result<(), CoreError> {
    if grade.is_finite() && (MIN_FINAL_GRADE..=MAX_FINAL_GRADE).contains(&grade) {
        Ok(())
    } else {
        Err(CoreError::guard_failed(format!(
            "final grade {grade} outside {MIN_FINAL_GRADE}-{MAX_FINAL_GRADE}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_range_bounds_inclusive() {
        assert!(validate_final_grade(0.0).is_ok());
        assert!(validate_final_grade(10.0).is_ok());
        assert!(validate_final_grade(8.5).is_ok());
    }

    #[test]
    fn grade_out_of_range_rejected() {
        assert!(validate_final_grade(-0.1).is_err());
        assert!(validate_final_grade(10.5).is_err());
        assert!(validate_final_grade(f64::NAN).is_err());
    }
}
