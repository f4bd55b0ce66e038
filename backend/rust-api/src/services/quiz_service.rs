use mongodb::bson::oid::ObjectId;
use mongodb::Database;

use crate::authz;
use crate::error::ApiError;
use crate::metrics::{quiz_outcome_label, QUIZ_SUBMISSIONS_TOTAL};
use crate::middlewares::auth::JwtClaims;
use crate::models::course::{Question, QuizScoreResponse};
use crate::models::user::UserRole;

use super::course_service::{parse_course_id, CourseService};

pub struct QuizService {
    mongo: Database,
}

impl QuizService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Grade a student's submission against a quiz embedded in the course.
    /// The submission itself is not persisted; the score goes back to the
    /// caller and only shows up in aggregate metrics.
    pub async fn submit_quiz(
        &self,
        claims: &JwtClaims,
        course_id: &str,
        quiz_id: &str,
        answers: &[Option<u32>],
    ) -> Result<QuizScoreResponse, ApiError> {
        authz::require_role(claims, &[UserRole::Student])?;

        let course_oid = parse_course_id(course_id)?;
        let course = CourseService::new(self.mongo.clone())
            .load_course(&course_oid)
            .await?;

        let quiz_oid = ObjectId::parse_str(quiz_id)
            .map_err(|_| ApiError::not_found("Quiz not found"))?;
        let quiz = course
            .quizzes
            .iter()
            .find(|quiz| quiz.id == quiz_oid)
            .ok_or_else(|| ApiError::not_found("Quiz not found"))?;

        let result = grade(&quiz.questions, answers);

        QUIZ_SUBMISSIONS_TOTAL
            .with_label_values(&[quiz_outcome_label(result.score)])
            .inc();
        tracing::info!(
            student = %claims.sub,
            course_id = %course_id,
            quiz_id = %quiz_id,
            score = result.score,
            "Quiz graded"
        );

        Ok(result)
    }
}

/// Positional grading: answer i is correct iff it equals question i's correct
/// choice index. Missing or extra answers count as unanswered. An empty
/// question set scores 0 rather than dividing by zero.
pub fn grade(questions: &[Question], answers: &[Option<u32>]) -> QuizScoreResponse {
    let total = questions.len() as u32;
    let correct = questions
        .iter()
        .zip(answers.iter().chain(std::iter::repeat(&None)))
        .filter(|(question, answer)| **answer == Some(question.correct_choice))
        .count() as u32;

    let score = if total == 0 {
        0.0
    } else {
        round2(100.0 * f64::from(correct) / f64::from(total))
    };

    QuizScoreResponse {
        score,
        correct,
        total,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
