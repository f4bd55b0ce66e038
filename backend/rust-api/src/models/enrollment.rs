use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::course::CourseSummary;
use super::user::bson_datetime_as_chrono;

/// Enrollment model stored in MongoDB "enrollments" collection.
/// A unique compound index on (student, course) is created at startup;
/// duplicate inserts surface as E11000 and map to Conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub student: ObjectId,
    pub course: ObjectId,

    /// Completion percentage, always within [0, 100]
    #[serde(default)]
    pub progress: i32,

    #[serde(rename = "enrolledAt", with = "bson_datetime_as_chrono")]
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentView {
    pub id: String,
    pub course: String,
    pub progress: i32,
    pub enrolled_at: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentView {
    fn from(enrollment: Enrollment) -> Self {
        EnrollmentView {
            id: enrollment.id.map(|id| id.to_hex()).unwrap_or_default(),
            course: enrollment.course.to_hex(),
            progress: enrollment.progress,
            enrolled_at: enrollment.enrolled_at,
        }
    }
}

/// `GET /api/courses/:id/enrollment` response
#[derive(Debug, Serialize)]
pub struct EnrollmentStatus {
    pub enrolled: bool,
}

/// One row of `GET /api/courses/my-enrolled-courses`
#[derive(Debug, Serialize)]
pub struct EnrolledCourse {
    pub id: String,
    pub progress: i32,
    pub enrolled_at: DateTime<Utc>,
    pub course: CourseSummary,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProgressRequest {
    /// Target percentage; out-of-range values are clamped to [0, 100]
    pub progress: i64,
}
