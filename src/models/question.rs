use crate::models::answer::Answer;
use serde::{Deserialize, Serialize};

pub const TRUE_FALSE_OPTIONS: [&str; 2] = ["True", "False"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: Answer,
    #[serde(default)]
    pub explanation: String,
    #[serde(default = "default_marks")]
    pub marks: u32,
}

fn default_marks() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "mcq-single", alias = "single-select")]
    SingleSelect,
    #[serde(rename = "mcq-multi", alias = "multi-select")]
    MultiSelect,
    #[serde(rename = "true-false")]
    TrueFalse,
}

impl QuestionType {
    pub fn is_multi(self) -> bool {
        matches!(self, QuestionType::MultiSelect)
    }
}

impl Question {
    /// Option text for the correct answer(s), comma separated.
    pub fn correct_answer_text(&self) -> String {
        self.correct_answer
            .indices()
            .into_iter()
            .filter_map(|idx| self.options.get(idx).cloned())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn has_option(&self, option_index: usize) -> bool {
        option_index < self.options.len()
    }
}
