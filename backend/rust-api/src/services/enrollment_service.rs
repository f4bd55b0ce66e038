use anyhow::Context;
use chrono::Utc;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::Database;

use crate::authz;
use crate::error::ApiError;
use crate::middlewares::auth::JwtClaims;
use crate::models::course::Course;
use crate::models::enrollment::{Enrollment, EnrollmentView};
use crate::models::user::UserRole;

use super::course_service::{parse_actor_id, parse_course_id};
use super::is_duplicate_key_error;

pub struct EnrollmentService {
    mongo: Database,
}

impl EnrollmentService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Whether the acting student is enrolled in the course
    pub async fn check_enrollment(
        &self,
        claims: &JwtClaims,
        course_id: &str,
    ) -> Result<bool, ApiError> {
        authz::require_role(claims, &[UserRole::Student])?;

        let student = parse_actor_id(claims)?;
        let course = parse_course_id(course_id)?;

        let enrollments_collection = self.mongo.collection::<Enrollment>("enrollments");
        let existing = enrollments_collection
            .find_one(doc! { "student": student, "course": course })
            .await
            .context("Failed to query enrollment")?;

        Ok(existing.is_some())
    }

    /// Enroll the acting student. Uniqueness is enforced by the storage-layer
    /// index: two concurrent enrolls race to the insert and the loser gets
    /// E11000, which surfaces as Conflict.
    pub async fn enroll(
        &self,
        claims: &JwtClaims,
        course_id: &str,
    ) -> Result<EnrollmentView, ApiError> {
        authz::require_role(claims, &[UserRole::Student])?;

        let student = parse_actor_id(claims)?;
        let course_oid = parse_course_id(course_id)?;

        // The course must exist before an enrollment can reference it
        let courses_collection = self.mongo.collection::<Course>("courses");
        courses_collection
            .find_one(doc! { "_id": course_oid })
            .await
            .context("Failed to query course")?
            .ok_or_else(|| ApiError::not_found("Course not found"))?;

        let enrollment = Enrollment {
            id: None,
            student,
            course: course_oid,
            progress: 0,
            enrolled_at: Utc::now(),
        };

        let enrollments_collection = self.mongo.collection::<Enrollment>("enrollments");
        let insert_result = match enrollments_collection.insert_one(&enrollment).await {
            Ok(result) => result,
            Err(err) if is_duplicate_key_error(&err) => {
                return Err(ApiError::conflict("Already enrolled in this course"))
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context("Failed to insert enrollment")
                    .into())
            }
        };

        let enrollment_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow::anyhow!("Failed to get inserted enrollment ID"))?;

        crate::metrics::ENROLLMENTS_CREATED_TOTAL.inc();
        tracing::info!(
            student = %claims.sub,
            course_id = %course_id,
            "Student enrolled"
        );

        let mut enrollment_with_id = enrollment;
        enrollment_with_id.id = Some(enrollment_id);
        Ok(EnrollmentView::from(enrollment_with_id))
    }

    /// Set the acting student's progress for a course, clamped to [0, 100]
    pub async fn update_progress(
        &self,
        claims: &JwtClaims,
        course_id: &str,
        progress: i64,
    ) -> Result<EnrollmentView, ApiError> {
        authz::require_role(claims, &[UserRole::Student])?;

        let student = parse_actor_id(claims)?;
        let course = parse_course_id(course_id)?;
        let clamped = clamp_progress(progress);

        let enrollments_collection = self.mongo.collection::<Enrollment>("enrollments");
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = enrollments_collection
            .find_one_and_update(
                doc! { "student": student, "course": course },
                doc! { "$set": { "progress": clamped } },
            )
            .with_options(options)
            .await
            .context("Failed to update progress")?
            .ok_or_else(|| ApiError::not_found("Enrollment not found"))?;

        Ok(EnrollmentView::from(updated))
    }
}

/// Progress is a percentage; anything outside [0, 100] is clamped, never
/// rejected.
pub(crate) fn clamp_progress(value: i64) -> i32 {
    value.clamp(0, 100) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_clamped_to_percentage_range() {
        assert_eq!(clamp_progress(-5), 0);
        assert_eq!(clamp_progress(0), 0);
        assert_eq!(clamp_progress(42), 42);
        assert_eq!(clamp_progress(100), 100);
        assert_eq!(clamp_progress(150), 100);
        assert_eq!(clamp_progress(i64::MAX), 100);
        assert_eq!(clamp_progress(i64::MIN), 0);
    }
}
