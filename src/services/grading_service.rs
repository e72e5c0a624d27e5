use crate::models::answer::Answer;
use crate::models::exam::Exam;
use crate::models::question::Question;
use crate::models::submission::{Submission, SubmissionStatus};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub score: u32,
    pub percentage: u32,
    pub status: SubmissionStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub question_id: String,
    pub question_text: String,
    pub chosen: Option<Answer>,
    pub correct: Answer,
    pub is_correct: bool,
    pub marks_earned: u32,
    pub max_marks: u32,
    pub explanation: String,
}

pub struct GradingService;

impl GradingService {
    /// Whether `answer` satisfies `question`.
    ///
    /// Multi-select compares sorted unique index sets; single-select and
    /// true/false require the exact index.
    pub fn is_correct(question: &Question, answer: Option<&Answer>) -> bool {
        let Some(answer) = answer else {
            return false;
        };

        if question.question_type.is_multi() {
            return answer.indices() == question.correct_answer.indices();
        }

        match (answer, &question.correct_answer) {
            (Answer::Single(given), Answer::Single(expected)) => given == expected,
            _ => false,
        }
    }

    pub fn score(exam: &Exam, answers: &BTreeMap<String, Answer>) -> u32 {
        exam.questions
            .iter()
            .filter(|q| Self::is_correct(q, answers.get(&q.id)))
            .map(|q| q.marks)
            .sum()
    }

    /// Rounded half-up share of `part` in `whole`, 0 when `whole` is 0.
    pub fn percent_of(part: u64, whole: u64) -> u32 {
        if whole == 0 {
            return 0;
        }
        ((part * 200 + whole) / (whole * 2)) as u32
    }

    pub fn evaluate(exam: &Exam, answers: &BTreeMap<String, Answer>) -> Evaluation {
        let score = Self::score(exam, answers);
        let percentage = Self::percent_of(score as u64, exam.total_marks as u64).min(100);
        let status = SubmissionStatus::from_percentage(percentage, exam.passing_marks);

        Evaluation {
            score,
            percentage,
            status,
        }
    }

    pub fn review(exam: &Exam, submission: &Submission) -> Vec<ReviewItem> {
        exam.questions
            .iter()
            .map(|q| {
                let chosen = submission.answers.get(&q.id).filter(|a| !a.is_empty());
                let is_correct = Self::is_correct(q, chosen);
                ReviewItem {
                    question_id: q.id.clone(),
                    question_text: q.text.clone(),
                    chosen: chosen.cloned(),
                    correct: q.correct_answer.clone(),
                    is_correct,
                    marks_earned: if is_correct { q.marks } else { 0 },
                    max_marks: q.marks,
                    explanation: q.explanation.clone(),
                }
            })
            .collect()
    }
}
