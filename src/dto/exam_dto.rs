use crate::models::answer::Answer;
use crate::models::question::QuestionType;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestion {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(length(min = 2))]
    pub options: Vec<String>,
    pub correct_answer: Answer,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub explanation: String,
    #[validate(range(min = 1))]
    pub marks: u32,
}

impl CreateQuestion {
    /// Blank question of the given type, matching the authoring form defaults.
    pub fn blank(question_type: QuestionType) -> Self {
        let (options, correct_answer) = match question_type {
            QuestionType::TrueFalse => (vec!["True".to_string(), "False".to_string()], Answer::Single(0)),
            QuestionType::MultiSelect => (vec![String::new(); 4], Answer::multiple([0])),
            QuestionType::SingleSelect => (vec![String::new(); 4], Answer::Single(0)),
        };
        Self {
            id: None,
            question_type,
            text: String::new(),
            options,
            correct_answer,
            explanation: String::new(),
            marks: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1, message = "Duration must be at least 1 minute"))]
    pub duration_minutes: u32,
    #[validate(range(max = 100, message = "Passing marks is a percentage"))]
    pub passing_marks: u32,
    #[validate(length(min = 1), nested)]
    pub questions: Vec<CreateQuestion>,
}
