use std::collections::HashMap;

use anyhow::Context;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::FindOptions;
use mongodb::Database;

use crate::authz;
use crate::error::ApiError;
use crate::middlewares::auth::JwtClaims;
use crate::models::course::{
    AddAssignmentRequest, AddLessonRequest, AddQuizRequest, Assignment, AssignmentView, Course,
    CourseDetail, CourseSummary, CreateCourseRequest, Lesson, LessonView, Quiz, QuizView,
    UpdateCourseRequest,
};
use crate::models::enrollment::{EnrolledCourse, Enrollment};
use crate::models::user::UserRole;

const MAX_BROWSE_RESULTS: i64 = 200;

pub struct CourseService {
    mongo: Database,
}

impl CourseService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Create a course owned by the acting instructor/admin
    pub async fn create_course(
        &self,
        claims: &JwtClaims,
        req: CreateCourseRequest,
    ) -> Result<CourseDetail, ApiError> {
        authz::require_role(claims, &[UserRole::Instructor, UserRole::Admin])?;

        let instructor = parse_actor_id(claims)?;

        let now = Utc::now();
        let course = Course {
            id: None,
            title: req.title,
            description: req.description,
            category: req.category,
            price: req.price,
            thumbnail: req.thumbnail,
            instructor,
            lessons: Vec::new(),
            quizzes: Vec::new(),
            assignments: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let courses_collection = self.mongo.collection::<Course>("courses");
        let insert_result = courses_collection
            .insert_one(&course)
            .await
            .context("Failed to insert course")?;

        let course_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow::anyhow!("Failed to get inserted course ID"))?;

        crate::metrics::COURSES_CREATED_TOTAL.inc();
        tracing::info!(course_id = %course_id.to_hex(), instructor = %claims.sub, "Course created");

        let created = self.load_course(&course_id).await?;
        Ok(self.course_detail(created, 0, Some(claims), false))
    }

    /// Course detail with nested content, gated for the viewer
    pub async fn get_course(
        &self,
        viewer: Option<&JwtClaims>,
        course_id: &str,
    ) -> Result<CourseDetail, ApiError> {
        let object_id = parse_course_id(course_id)?;
        let course = self.load_course(&object_id).await?;

        let enrolled = match viewer {
            Some(claims) if claims.role == UserRole::Student => {
                self.is_enrolled(claims, &object_id).await?
            }
            _ => false,
        };

        let enrollment_count = self.enrollment_count(&object_id).await?;
        Ok(self.course_detail(course, enrollment_count, viewer, enrolled))
    }

    /// Public browse listing, newest first
    pub async fn list_courses(&self) -> Result<Vec<CourseSummary>, ApiError> {
        self.list_summaries(doc! {}).await
    }

    /// Courses owned by the acting instructor/admin
    pub async fn list_created_courses(
        &self,
        claims: &JwtClaims,
    ) -> Result<Vec<CourseSummary>, ApiError> {
        authz::require_role(claims, &[UserRole::Instructor, UserRole::Admin])?;
        let instructor = parse_actor_id(claims)?;
        self.list_summaries(doc! { "instructor": instructor }).await
    }

    /// The acting student's enrollments joined with their courses
    pub async fn list_enrolled_courses(
        &self,
        claims: &JwtClaims,
    ) -> Result<Vec<EnrolledCourse>, ApiError> {
        authz::require_role(claims, &[UserRole::Student])?;
        let student = parse_actor_id(claims)?;

        let enrollments_collection = self.mongo.collection::<Enrollment>("enrollments");
        let mut cursor = enrollments_collection
            .find(doc! { "student": student })
            .await
            .context("Failed to query enrollments")?;

        let mut enrollments = Vec::new();
        while let Some(enrollment) = cursor
            .try_next()
            .await
            .context("Enrollment cursor error")?
        {
            enrollments.push(enrollment);
        }

        if enrollments.is_empty() {
            return Ok(Vec::new());
        }

        // Single $in batch fetch, not one query per enrollment
        let course_ids: Vec<ObjectId> = enrollments.iter().map(|e| e.course).collect();
        let courses_collection = self.mongo.collection::<Course>("courses");
        let mut courses_cursor = courses_collection
            .find(doc! { "_id": { "$in": course_ids.clone() } })
            .await
            .context("Failed to query enrolled courses")?;

        let mut courses = HashMap::new();
        while let Some(course) = courses_cursor
            .try_next()
            .await
            .context("Course cursor error")?
        {
            if let Some(id) = course.id {
                courses.insert(id, course);
            }
        }

        let counts = self.enrollment_counts(&course_ids).await?;

        // Enrollments whose course has since disappeared are skipped
        let rows = enrollments
            .into_iter()
            .filter_map(|enrollment| {
                let course = courses.remove(&enrollment.course)?;
                let count = counts.get(&enrollment.course).copied().unwrap_or(0);
                Some(EnrolledCourse {
                    id: enrollment.id.map(|id| id.to_hex()).unwrap_or_default(),
                    progress: enrollment.progress,
                    enrolled_at: enrollment.enrolled_at,
                    course: CourseSummary::new(course, count),
                })
            })
            .collect();

        Ok(rows)
    }

    /// Patch course attributes; owner/admin only
    pub async fn update_course(
        &self,
        claims: &JwtClaims,
        course_id: &str,
        req: UpdateCourseRequest,
    ) -> Result<CourseDetail, ApiError> {
        let object_id = parse_course_id(course_id)?;
        let course = self.load_course(&object_id).await?;

        if !authz::can_modify(claims, &course) {
            return Err(ApiError::forbidden("Only the course owner may modify it"));
        }

        let mut set_doc = doc! {
            "updatedAt": mongodb::bson::DateTime::now(),
        };
        if let Some(title) = req.title {
            set_doc.insert("title", title);
        }
        if let Some(description) = req.description {
            set_doc.insert("description", description);
        }
        if let Some(category) = req.category {
            set_doc.insert("category", category);
        }
        if let Some(price) = req.price {
            set_doc.insert("price", Bson::Double(price));
        }
        if let Some(thumbnail) = req.thumbnail {
            set_doc.insert("thumbnail", thumbnail);
        }

        let courses_collection = self.mongo.collection::<Course>("courses");
        courses_collection
            .update_one(doc! { "_id": object_id }, doc! { "$set": set_doc })
            .await
            .context("Failed to update course")?;

        let updated = self.load_course(&object_id).await?;
        let enrollment_count = self.enrollment_count(&object_id).await?;
        Ok(self.course_detail(updated, enrollment_count, Some(claims), false))
    }

    /// Delete a course and its enrollments; owner/admin only
    pub async fn delete_course(&self, claims: &JwtClaims, course_id: &str) -> Result<(), ApiError> {
        let object_id = parse_course_id(course_id)?;
        let course = self.load_course(&object_id).await?;

        if !authz::can_modify(claims, &course) {
            return Err(ApiError::forbidden("Only the course owner may delete it"));
        }

        let courses_collection = self.mongo.collection::<Course>("courses");
        courses_collection
            .delete_one(doc! { "_id": object_id })
            .await
            .context("Failed to delete course")?;

        // No dangling enrollment rows feeding my-enrolled-courses
        let enrollments_collection = self.mongo.collection::<Enrollment>("enrollments");
        enrollments_collection
            .delete_many(doc! { "course": object_id })
            .await
            .context("Failed to delete course enrollments")?;

        tracing::info!(course_id = %course_id, actor = %claims.sub, "Course deleted");
        Ok(())
    }

    /// Append a lesson to the course's ordered sequence
    pub async fn add_lesson(
        &self,
        claims: &JwtClaims,
        course_id: &str,
        req: AddLessonRequest,
    ) -> Result<CourseDetail, ApiError> {
        let lesson = Lesson::from(req);
        let value = mongodb::bson::to_bson(&lesson).context("Failed to serialize lesson")?;
        self.append_to_course(claims, course_id, "lessons", value)
            .await
    }

    /// Append a quiz; every question needs at least two choices and an
    /// in-range correct index.
    pub async fn add_quiz(
        &self,
        claims: &JwtClaims,
        course_id: &str,
        req: AddQuizRequest,
    ) -> Result<CourseDetail, ApiError> {
        for (index, question) in req.questions.iter().enumerate() {
            if question.text.trim().is_empty() {
                return Err(ApiError::validation(format!(
                    "Question {} has no text",
                    index + 1
                )));
            }
            if question.choices.len() < 2 {
                return Err(ApiError::validation(format!(
                    "Question {} must have at least 2 choices",
                    index + 1
                )));
            }
            if question.correct_choice as usize >= question.choices.len() {
                return Err(ApiError::validation(format!(
                    "Question {} correct choice is out of range",
                    index + 1
                )));
            }
        }

        let quiz = Quiz::from(req);
        let value = mongodb::bson::to_bson(&quiz).context("Failed to serialize quiz")?;
        self.append_to_course(claims, course_id, "quizzes", value)
            .await
    }

    /// Append an assignment to the course's ordered sequence
    pub async fn add_assignment(
        &self,
        claims: &JwtClaims,
        course_id: &str,
        req: AddAssignmentRequest,
    ) -> Result<CourseDetail, ApiError> {
        let assignment = Assignment::from(req);
        let value = mongodb::bson::to_bson(&assignment).context("Failed to serialize assignment")?;
        self.append_to_course(claims, course_id, "assignments", value)
            .await
    }

    /// Shared append path: embedded sequences are only ever mutated through
    /// the owning course document.
    async fn append_to_course(
        &self,
        claims: &JwtClaims,
        course_id: &str,
        field: &str,
        value: Bson,
    ) -> Result<CourseDetail, ApiError> {
        let object_id = parse_course_id(course_id)?;
        let course = self.load_course(&object_id).await?;

        if !authz::can_modify(claims, &course) {
            return Err(ApiError::forbidden("Only the course owner may modify it"));
        }

        let courses_collection = self.mongo.collection::<Course>("courses");
        courses_collection
            .update_one(
                doc! { "_id": object_id },
                doc! {
                    "$push": { field: value },
                    "$set": { "updatedAt": mongodb::bson::DateTime::now() },
                },
            )
            .await
            .with_context(|| format!("Failed to append to course {}", field))?;

        let updated = self.load_course(&object_id).await?;
        let enrollment_count = self.enrollment_count(&object_id).await?;
        Ok(self.course_detail(updated, enrollment_count, Some(claims), false))
    }

    pub(crate) async fn load_course(&self, object_id: &ObjectId) -> Result<Course, ApiError> {
        let courses_collection = self.mongo.collection::<Course>("courses");
        courses_collection
            .find_one(doc! { "_id": *object_id })
            .await
            .context("Failed to query course")?
            .ok_or_else(|| ApiError::not_found("Course not found"))
    }

    async fn is_enrolled(&self, claims: &JwtClaims, course_id: &ObjectId) -> Result<bool, ApiError> {
        let student = parse_actor_id(claims)?;
        let enrollments_collection = self.mongo.collection::<Enrollment>("enrollments");
        let existing = enrollments_collection
            .find_one(doc! { "student": student, "course": *course_id })
            .await
            .context("Failed to query enrollment")?;
        Ok(existing.is_some())
    }

    async fn enrollment_count(&self, course_id: &ObjectId) -> Result<u64, ApiError> {
        let enrollments_collection = self.mongo.collection::<Enrollment>("enrollments");
        Ok(enrollments_collection
            .count_documents(doc! { "course": *course_id })
            .await
            .context("Failed to count enrollments")?)
    }

    /// Per-course enrollment counts for a batch of ids in one aggregation
    async fn enrollment_counts(
        &self,
        course_ids: &[ObjectId],
    ) -> Result<HashMap<ObjectId, u64>, ApiError> {
        if course_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let enrollments_collection = self.mongo.collection::<Document>("enrollments");
        let pipeline = vec![
            doc! { "$match": { "course": { "$in": course_ids.to_vec() } } },
            doc! { "$group": { "_id": "$course", "count": { "$sum": 1 } } },
        ];

        let mut cursor = enrollments_collection
            .aggregate(pipeline)
            .await
            .context("Failed to aggregate enrollment counts")?;

        let mut counts = HashMap::new();
        while let Some(row) = cursor
            .try_next()
            .await
            .context("Enrollment count cursor error")?
        {
            let course_id = row
                .get_object_id("_id")
                .context("Enrollment count row missing course id")?;
            let count = row
                .get_i32("count")
                .map(i64::from)
                .or_else(|_| row.get_i64("count"))
                .unwrap_or(0);
            counts.insert(course_id, count.max(0) as u64);
        }

        Ok(counts)
    }

    async fn list_summaries(&self, filter: Document) -> Result<Vec<CourseSummary>, ApiError> {
        let courses_collection = self.mongo.collection::<Course>("courses");
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .limit(MAX_BROWSE_RESULTS)
            .build();

        let mut cursor = courses_collection
            .find(filter)
            .with_options(options)
            .await
            .context("Failed to query courses")?;

        let mut courses = Vec::new();
        while let Some(course) = cursor.try_next().await.context("Course cursor error")? {
            courses.push(course);
        }

        let course_ids: Vec<ObjectId> = courses.iter().filter_map(|c| c.id).collect();
        let counts = self.enrollment_counts(&course_ids).await?;

        Ok(courses
            .into_iter()
            .map(|course| {
                let count = course
                    .id
                    .and_then(|id| counts.get(&id).copied())
                    .unwrap_or(0);
                CourseSummary::new(course, count)
            })
            .collect())
    }

    fn course_detail(
        &self,
        course: Course,
        enrollment_count: u64,
        viewer: Option<&JwtClaims>,
        enrolled: bool,
    ) -> CourseDetail {
        let lessons = course
            .lessons
            .iter()
            .map(|lesson| {
                let visible = authz::can_view_lesson(viewer, &course, lesson, enrolled);
                LessonView::new(lesson, visible)
            })
            .collect();

        let quizzes = course.quizzes.iter().map(QuizView::from).collect();
        let assignments = course.assignments.iter().map(AssignmentView::from).collect();

        CourseDetail {
            id: course.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: course.title,
            description: course.description,
            category: course.category,
            price: course.price,
            thumbnail: course.thumbnail,
            instructor: course.instructor.to_hex(),
            enrollment_count,
            lessons,
            quizzes,
            assignments,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

/// Path parameter ids that don't parse as ObjectIds behave like absent
/// documents.
pub(crate) fn parse_course_id(course_id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(course_id).map_err(|_| ApiError::not_found("Course not found"))
}

pub(crate) fn parse_actor_id(claims: &JwtClaims) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(&claims.sub).map_err(|_| ApiError::unauthorized("Invalid token subject"))
}
