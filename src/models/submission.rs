use crate::models::answer::Answer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub user_id: String,
    pub exam_id: String,
    /// Keyed by question id.
    pub answers: BTreeMap<String, Answer>,
    pub score: u32,
    pub percentage: u32,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub integrity_violations: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Passed,
    Failed,
}

impl SubmissionStatus {
    pub fn from_percentage(percentage: u32, passing_marks: u32) -> Self {
        if percentage >= passing_marks {
            SubmissionStatus::Passed
        } else {
            SubmissionStatus::Failed
        }
    }
}

impl Submission {
    pub fn passed(&self) -> bool {
        self.status == SubmissionStatus::Passed
    }
}
