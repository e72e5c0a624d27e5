use crate::dto::exam_dto::{CreateExamPayload, CreateQuestion};
use crate::error::Result;
use crate::models::answer::Answer;
use crate::models::exam::{Exam, CATEGORIES, DEFAULT_CATEGORY};
use crate::models::question::{Question, QuestionType, TRUE_FALSE_OPTIONS};
use crate::utils::{time, token, validation};

pub struct ExamService;

impl ExamService {
    /// Builds a publishable exam from the authoring payload.
    pub fn create_exam(payload: CreateExamPayload) -> Result<Exam> {
        validation::validate(&payload)?;
        for (position, q) in payload.questions.iter().enumerate() {
            validation::check_question(position, q)?;
        }

        let questions = assign_question_ids(payload.questions);
        let total_marks = Exam::marks_sum(&questions);
        let category = canonical_category(&payload.category);

        let exam = Exam {
            id: token::generate_id(token::ID_LENGTH),
            title: payload.title.trim().to_string(),
            category,
            description: payload.description,
            duration_minutes: payload.duration_minutes,
            total_marks,
            passing_marks: payload.passing_marks,
            questions,
            created_at: time::now(),
        };

        tracing::info!(
            exam_id = %exam.id,
            questions = exam.questions.len(),
            total_marks = exam.total_marks,
            "Exam created"
        );
        Ok(exam)
    }
}

fn assign_question_ids(questions: Vec<CreateQuestion>) -> Vec<Question> {
    let stamp = time::now().timestamp_millis();
    questions
        .into_iter()
        .enumerate()
        .map(|(idx, q)| {
            let (options, correct_answer) = match q.question_type {
                QuestionType::TrueFalse => (
                    TRUE_FALSE_OPTIONS.iter().map(|s| s.to_string()).collect(),
                    q.correct_answer,
                ),
                QuestionType::MultiSelect => (q.options, Answer::Multiple(q.correct_answer.indices())),
                QuestionType::SingleSelect => (q.options, q.correct_answer),
            };
            Question {
                id: q
                    .id
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| format!("{}-{}", stamp, idx + 1)),
                question_type: q.question_type,
                text: q.text.trim().to_string(),
                options,
                correct_answer,
                explanation: q.explanation,
                marks: q.marks,
            }
        })
        .collect()
}

/// Known categories keep their canonical spelling; blank falls back to the
/// default, anything else is kept as typed.
fn canonical_category(raw: &str) -> String {
    match raw.trim() {
        "" => DEFAULT_CATEGORY.to_string(),
        other => CATEGORIES
            .iter()
            .find(|known| known.eq_ignore_ascii_case(other))
            .map_or_else(|| other.to_string(), |known| known.to_string()),
    }
}
