//! Capability checks shared by every mutating course operation. Handlers and
//! services call these instead of comparing role strings inline.

use crate::error::ApiError;
use crate::middlewares::auth::JwtClaims;
use crate::models::course::{Course, Lesson};
use crate::models::user::UserRole;

/// True iff the actor is an admin or the course's owning instructor.
pub fn can_modify(claims: &JwtClaims, course: &Course) -> bool {
    claims.role == UserRole::Admin || course.instructor.to_hex() == claims.sub
}

/// A lesson is viewable when it is free, the viewer is enrolled, or the
/// viewer could modify the course anyway (owner/admin).
pub fn can_view_lesson(
    claims: Option<&JwtClaims>,
    course: &Course,
    lesson: &Lesson,
    enrolled: bool,
) -> bool {
    lesson.is_free || enrolled || claims.map(|c| can_modify(c, course)).unwrap_or(false)
}

/// Guard for role-gated operations; Forbidden unless the actor's role is in
/// the allowed set.
pub fn require_role(claims: &JwtClaims, allowed: &[UserRole]) -> Result<(), ApiError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        let roles = allowed
            .iter()
            .map(UserRole::as_str)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(ApiError::forbidden(format!("{} role required", roles)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mongodb::bson::oid::ObjectId;
    use crate::models::course::LessonType;

    fn claims(sub: &str, role: UserRole) -> JwtClaims {
        JwtClaims {
            sub: sub.to_string(),
            role,
            exp: (Utc::now().timestamp() + 3600) as usize,
            iat: Utc::now().timestamp() as usize,
        }
    }

    fn course(instructor: ObjectId) -> Course {
        let now = Utc::now();
        Course {
            id: Some(ObjectId::new()),
            title: "Algebra".into(),
            description: "Numbers".into(),
            category: "Math".into(),
            price: 499.0,
            thumbnail: None,
            instructor,
            lessons: Vec::new(),
            quizzes: Vec::new(),
            assignments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn lesson(is_free: bool) -> Lesson {
        Lesson {
            id: ObjectId::new(),
            title: "L".into(),
            kind: LessonType::Text,
            content: "body".into(),
            duration: 1,
            is_free,
        }
    }

    #[test]
    fn can_modify_truth_table() {
        let owner = ObjectId::new();
        let course = course(owner);

        // Owning instructor
        assert!(can_modify(&claims(&owner.to_hex(), UserRole::Instructor), &course));
        // Any admin, owner or not
        assert!(can_modify(&claims(&ObjectId::new().to_hex(), UserRole::Admin), &course));
        // Other instructor
        assert!(!can_modify(
            &claims(&ObjectId::new().to_hex(), UserRole::Instructor),
            &course
        ));
        // Student, even with the owner's id under a student role
        assert!(!can_modify(&claims(&owner.to_hex(), UserRole::Student), &course));
    }

    #[test]
    fn free_lessons_are_always_viewable() {
        let course = course(ObjectId::new());
        assert!(can_view_lesson(None, &course, &lesson(true), false));
    }

    #[test]
    fn locked_lessons_require_enrollment_or_ownership() {
        let owner = ObjectId::new();
        let course = course(owner);
        let paid = lesson(false);

        // Anonymous viewer
        assert!(!can_view_lesson(None, &course, &paid, false));
        // Non-enrolled student
        let student = claims(&ObjectId::new().to_hex(), UserRole::Student);
        assert!(!can_view_lesson(Some(&student), &course, &paid, false));
        // Enrolled student
        assert!(can_view_lesson(Some(&student), &course, &paid, true));
        // Owner and admin see everything
        let owner_claims = claims(&owner.to_hex(), UserRole::Instructor);
        assert!(can_view_lesson(Some(&owner_claims), &course, &paid, false));
        let admin = claims(&ObjectId::new().to_hex(), UserRole::Admin);
        assert!(can_view_lesson(Some(&admin), &course, &paid, false));
    }

    #[test]
    fn require_role_rejects_outsiders() {
        let student = claims("s", UserRole::Student);
        assert!(require_role(&student, &[UserRole::Student]).is_ok());

        let err = require_role(&student, &[UserRole::Instructor, UserRole::Admin]).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
