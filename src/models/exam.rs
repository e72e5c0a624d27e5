use crate::models::question::Question;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "Other";

pub const CATEGORIES: [&str; 6] = [
    "Science",
    "Technology",
    "Mathematics",
    "Language",
    "History",
    "Other",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub duration_minutes: u32,
    pub total_marks: u32,
    /// Pass threshold as a percentage (0-100).
    pub passing_marks: u32,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

impl Exam {
    pub fn marks_sum(questions: &[Question]) -> u32 {
        questions.iter().map(|q| q.marks).sum()
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_minutes.saturating_mul(60)
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Category used for grouping; blank categories fall back to `fallback`.
    pub fn category_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        let trimmed = self.category.trim();
        if trimmed.is_empty() {
            fallback
        } else {
            trimmed
        }
    }
}
