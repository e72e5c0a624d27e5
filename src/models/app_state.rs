use crate::models::answer::Answer;
use crate::models::exam::Exam;
use crate::models::question::{Question, QuestionType};
use crate::models::submission::Submission;
use crate::models::user::User;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Root application state, persisted as a single blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub current_user: Option<User>,
    /// Most recent first.
    pub exams: Vec<Exam>,
    pub submissions: Vec<Submission>,
}

impl AppState {
    /// State used when nothing has been stored yet.
    pub fn seed() -> Self {
        Self {
            current_user: None,
            exams: vec![Exam {
                id: "exam-1".to_string(),
                title: "General Science & Environment".to_string(),
                category: "Science".to_string(),
                description: "Test your basic knowledge of physical sciences and sustainability."
                    .to_string(),
                duration_minutes: 10,
                total_marks: 4,
                passing_marks: 50,
                created_at: Utc::now(),
                questions: vec![
                    Question {
                        id: "q1".to_string(),
                        question_type: QuestionType::SingleSelect,
                        text: "What is the most common gas in the Earth atmosphere?".to_string(),
                        options: vec![
                            "Oxygen".to_string(),
                            "Nitrogen".to_string(),
                            "Carbon Dioxide".to_string(),
                            "Hydrogen".to_string(),
                        ],
                        correct_answer: Answer::Single(1),
                        explanation:
                            "Nitrogen makes up approximately 78% of the Earth's atmosphere."
                                .to_string(),
                        marks: 2,
                    },
                    Question {
                        id: "q2".to_string(),
                        question_type: QuestionType::SingleSelect,
                        text: "Which planet is known as the Red Planet?".to_string(),
                        options: vec![
                            "Venus".to_string(),
                            "Mars".to_string(),
                            "Jupiter".to_string(),
                            "Saturn".to_string(),
                        ],
                        correct_answer: Answer::Single(1),
                        explanation:
                            "Mars is known as the Red Planet due to iron oxide on its surface."
                                .to_string(),
                        marks: 2,
                    },
                ],
            }],
            submissions: Vec::new(),
        }
    }

    pub fn exam(&self, exam_id: &str) -> Option<&Exam> {
        self.exams.iter().find(|e| e.id == exam_id)
    }

    pub fn submission(&self, submission_id: &str) -> Option<&Submission> {
        self.submissions.iter().find(|s| s.id == submission_id)
    }

    pub fn submissions_for_user<'a>(
        &'a self,
        user_id: &'a str,
    ) -> impl Iterator<Item = &'a Submission> + 'a {
        self.submissions.iter().filter(move |s| s.user_id == user_id)
    }

    /// Students are steered to a single attempt per exam.
    pub fn has_attempted(&self, user_id: &str, exam_id: &str) -> bool {
        self.submissions_for_user(user_id)
            .any(|s| s.exam_id == exam_id)
    }
}
