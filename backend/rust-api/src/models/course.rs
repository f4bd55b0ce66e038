use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::bson_datetime_as_chrono;

/// Course model stored in MongoDB "courses" collection. Lessons, quizzes and
/// assignments are embedded, ordered, and owned exclusively by their course:
/// every mutation goes through the course's own write path ($push / $set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub title: String,
    pub description: String,
    pub category: String,

    #[serde(default)]
    pub price: f64,

    /// Public path under /uploads, set via the upload endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    /// Owning instructor (ref: users)
    pub instructor: ObjectId,

    #[serde(default)]
    pub lessons: Vec<Lesson>,

    #[serde(default)]
    pub quizzes: Vec<Quiz>,

    #[serde(default)]
    pub assignments: Vec<Assignment>,

    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: LessonType,
    /// URL for video/pdf lessons, the body itself for text lessons
    pub content: String,
    /// Duration in minutes
    #[serde(default)]
    pub duration: u32,
    #[serde(rename = "isFree", default)]
    pub is_free: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LessonType {
    Video,
    Pdf,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub choices: Vec<String>,
    /// Index into `choices`; never serialized back to clients
    #[serde(rename = "correctChoice")]
    pub correct_choice: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    #[serde(rename = "dueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// Request to create a course
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Category must be between 1 and 100 characters"
    ))]
    pub category: String,

    #[serde(default)]
    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: f64,

    pub thumbnail: Option<String>,
}

/// Request to update a course (all fields optional)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Category must be between 1 and 100 characters"
    ))]
    pub category: Option<String>,

    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: Option<f64>,

    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddLessonRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: String,

    #[serde(rename = "type")]
    pub kind: LessonType,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,

    #[serde(default)]
    pub duration: u32,

    #[serde(rename = "isFree", default)]
    pub is_free: bool,
}

impl From<AddLessonRequest> for Lesson {
    fn from(req: AddLessonRequest) -> Self {
        Lesson {
            id: ObjectId::new(),
            title: req.title,
            kind: req.kind,
            content: req.content,
            duration: req.duration,
            is_free: req.is_free,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddQuizRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: String,

    #[serde(default)]
    pub questions: Vec<QuestionInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionInput {
    pub text: String,
    pub choices: Vec<String>,
    #[serde(rename = "correctChoice")]
    pub correct_choice: u32,
}

impl From<AddQuizRequest> for Quiz {
    fn from(req: AddQuizRequest) -> Self {
        Quiz {
            id: ObjectId::new(),
            title: req.title,
            questions: req
                .questions
                .into_iter()
                .map(|q| Question {
                    text: q.text,
                    choices: q.choices,
                    correct_choice: q.correct_choice,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddAssignmentRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[serde(rename = "dueDate", default)]
    pub due_date: Option<NaiveDate>,
}

impl From<AddAssignmentRequest> for Assignment {
    fn from(req: AddAssignmentRequest) -> Self {
        Assignment {
            id: ObjectId::new(),
            title: req.title,
            description: req.description,
            due_date: req.due_date,
        }
    }
}

/// Positional quiz submission; `null`/missing entries count as unanswered.
#[derive(Debug, Deserialize)]
pub struct QuizSubmissionRequest {
    pub answers: Vec<Option<u32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizScoreResponse {
    pub score: f64,
    pub correct: u32,
    pub total: u32,
}

/// Course summary for list endpoints (no nested content)
#[derive(Debug, Serialize)]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub instructor: String,
    pub enrollment_count: u64,
    pub lesson_count: usize,
    pub created_at: DateTime<Utc>,
}

impl CourseSummary {
    pub fn new(course: Course, enrollment_count: u64) -> Self {
        CourseSummary {
            id: course.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: course.title,
            description: course.description,
            category: course.category,
            price: course.price,
            thumbnail: course.thumbnail,
            instructor: course.instructor.to_hex(),
            enrollment_count,
            lesson_count: course.lessons.len(),
            created_at: course.created_at,
        }
    }
}

/// Full course detail; lesson content is withheld for viewers that may not
/// access it, and correct quiz choices are never included.
#[derive(Debug, Serialize)]
pub struct CourseDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub instructor: String,
    pub enrollment_count: u64,
    pub lessons: Vec<LessonView>,
    pub quizzes: Vec<QuizView>,
    pub assignments: Vec<AssignmentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LessonView {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: LessonType,
    /// Present only when the viewer may access this lesson
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub duration: u32,
    #[serde(rename = "isFree")]
    pub is_free: bool,
    pub locked: bool,
}

impl LessonView {
    pub fn new(lesson: &Lesson, visible: bool) -> Self {
        LessonView {
            id: lesson.id.to_hex(),
            title: lesson.title.clone(),
            kind: lesson.kind,
            content: visible.then(|| lesson.content.clone()),
            duration: lesson.duration,
            is_free: lesson.is_free,
            locked: !visible,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuizView {
    pub id: String,
    pub title: String,
    pub questions: Vec<QuestionView>,
}

/// Question as shown to takers: the correct index stays server-side
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub text: String,
    pub choices: Vec<String>,
}

impl From<&Quiz> for QuizView {
    fn from(quiz: &Quiz) -> Self {
        QuizView {
            id: quiz.id.to_hex(),
            title: quiz.title.clone(),
            questions: quiz
                .questions
                .iter()
                .map(|q| QuestionView {
                    text: q.text.clone(),
                    choices: q.choices.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssignmentView {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "dueDate", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl From<&Assignment> for AssignmentView {
    fn from(assignment: &Assignment) -> Self {
        AssignmentView {
            id: assignment.id.to_hex(),
            title: assignment.title.clone(),
            description: assignment.description.clone(),
            due_date: assignment.due_date,
        }
    }
}
