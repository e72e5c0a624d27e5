use crate::models::exam::{Exam, DEFAULT_CATEGORY};
use crate::models::submission::Submission;
use crate::services::grading_service::GradingService;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const TOP_N: usize = 5;
/// Questions with this many attempts or fewer are left out of difficulty rankings.
pub const MIN_QUESTION_ATTEMPTS: u32 = 3;
/// Category label on the student dashboard when an exam has none.
pub const STUDENT_DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub name: String,
    pub avg_percentage: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPopularity {
    pub exam_id: String,
    pub title: String,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDifficulty {
    pub exam_id: String,
    pub question_id: String,
    pub text: String,
    pub exam_title: String,
    pub correct: u32,
    pub total: u32,
    pub accuracy: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub category_stats: Vec<CategoryStat>,
    pub popular_exams: Vec<ExamPopularity>,
    pub difficult_questions: Vec<QuestionDifficulty>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub exam_count: usize,
    pub submission_count: usize,
    pub item_bank_size: usize,
    pub pass_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOverview {
    pub completed: usize,
    pub pass_rate: u32,
    pub attempted_exam_ids: Vec<String>,
    pub categories: Vec<CategoryCount>,
}

#[derive(Default)]
struct CategoryTotals {
    score: u64,
    possible: u64,
    count: u32,
}

#[derive(Default)]
struct QuestionTotals {
    correct: u32,
    total: u32,
}

pub struct AnalyticsService;

impl AnalyticsService {
    /// Full recomputation over the whole history; nothing is cached.
    pub fn compute(exams: &[Exam], submissions: &[Submission]) -> Analytics {
        Analytics {
            category_stats: Self::category_stats(exams, submissions),
            popular_exams: Self::popular_exams(exams, submissions),
            difficult_questions: Self::difficult_questions(exams, submissions),
        }
    }

    /// Average is `sum(scores) / sum(totalMarks)`, not a mean of percentages.
    pub fn category_stats(exams: &[Exam], submissions: &[Submission]) -> Vec<CategoryStat> {
        let by_id = index_exams(exams);
        let mut order: Vec<String> = Vec::new();
        let mut totals: HashMap<String, CategoryTotals> = HashMap::new();

        for sub in submissions {
            let Some(exam) = by_id.get(sub.exam_id.as_str()) else {
                continue;
            };
            let name = exam.category_or(DEFAULT_CATEGORY).to_string();
            let entry = totals.entry(name.clone()).or_insert_with(|| {
                order.push(name);
                CategoryTotals::default()
            });
            entry.score += sub.score as u64;
            entry.possible += exam.total_marks as u64;
            entry.count += 1;
        }

        let mut stats: Vec<CategoryStat> = order
            .into_iter()
            .map(|name| {
                let t = &totals[&name];
                CategoryStat {
                    avg_percentage: GradingService::percent_of(t.score, t.possible),
                    count: t.count,
                    name,
                }
            })
            .collect();
        stats.sort_by(|a, b| b.avg_percentage.cmp(&a.avg_percentage));
        stats
    }

    /// Top exams by attempt count; ties keep exam order.
    pub fn popular_exams(exams: &[Exam], submissions: &[Submission]) -> Vec<ExamPopularity> {
        let mut attempts: HashMap<&str, u32> = HashMap::new();
        for sub in submissions {
            *attempts.entry(sub.exam_id.as_str()).or_default() += 1;
        }

        let mut popular: Vec<ExamPopularity> = exams
            .iter()
            .map(|e| ExamPopularity {
                exam_id: e.id.clone(),
                title: e.title.clone(),
                attempts: attempts.get(e.id.as_str()).copied().unwrap_or(0),
            })
            .collect();
        popular.sort_by(|a, b| b.attempts.cmp(&a.attempts));
        popular.truncate(TOP_N);
        popular
    }

    /// Hardest questions first.
    ///
    /// Every submission against an exam counts as an attempt on each of its
    /// questions, answered or not.
    pub fn difficult_questions(
        exams: &[Exam],
        submissions: &[Submission],
    ) -> Vec<QuestionDifficulty> {
        let by_id = index_exams(exams);
        let mut order: Vec<(&Exam, usize)> = Vec::new();
        let mut totals: HashMap<(&str, &str), QuestionTotals> = HashMap::new();

        for sub in submissions {
            let Some(exam) = by_id.get(sub.exam_id.as_str()).copied() else {
                continue;
            };
            for (idx, q) in exam.questions.iter().enumerate() {
                let entry = totals
                    .entry((exam.id.as_str(), q.id.as_str()))
                    .or_insert_with(|| {
                        order.push((exam, idx));
                        QuestionTotals::default()
                    });
                entry.total += 1;
                if GradingService::is_correct(q, sub.answers.get(&q.id)) {
                    entry.correct += 1;
                }
            }
        }

        let mut ranked: Vec<QuestionDifficulty> = order
            .into_iter()
            .filter_map(|(exam, idx)| {
                let q = &exam.questions[idx];
                let t = &totals[&(exam.id.as_str(), q.id.as_str())];
                (t.total > MIN_QUESTION_ATTEMPTS).then(|| QuestionDifficulty {
                    exam_id: exam.id.clone(),
                    question_id: q.id.clone(),
                    text: q.text.clone(),
                    exam_title: exam.title.clone(),
                    correct: t.correct,
                    total: t.total,
                    accuracy: GradingService::percent_of(t.correct as u64, t.total as u64),
                })
            })
            .collect();
        ranked.sort_by(|a, b| a.accuracy.cmp(&b.accuracy));
        ranked.truncate(TOP_N);
        ranked
    }

    pub fn overview(exams: &[Exam], submissions: &[Submission]) -> Overview {
        let passed = submissions.iter().filter(|s| s.passed()).count();
        Overview {
            exam_count: exams.len(),
            submission_count: submissions.len(),
            item_bank_size: exams.iter().map(|e| e.questions.len()).sum(),
            pass_rate: GradingService::percent_of(passed as u64, submissions.len() as u64),
        }
    }

    pub fn student_overview(
        exams: &[Exam],
        submissions: &[Submission],
        user_id: &str,
    ) -> StudentOverview {
        let own: Vec<&Submission> = submissions.iter().filter(|s| s.user_id == user_id).collect();
        let passed = own.iter().filter(|s| s.passed()).count();

        let mut attempted_exam_ids: Vec<String> = Vec::new();
        for sub in &own {
            if !attempted_exam_ids.contains(&sub.exam_id) {
                attempted_exam_ids.push(sub.exam_id.clone());
            }
        }

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for exam in exams {
            *counts
                .entry(exam.category_or(STUDENT_DEFAULT_CATEGORY).to_string())
                .or_default() += 1;
        }

        StudentOverview {
            completed: own.len(),
            pass_rate: GradingService::percent_of(passed as u64, own.len() as u64),
            attempted_exam_ids,
            categories: counts
                .into_iter()
                .map(|(name, count)| CategoryCount { name, count })
                .collect(),
        }
    }
}

fn index_exams(exams: &[Exam]) -> HashMap<&str, &Exam> {
    exams.iter().map(|e| (e.id.as_str(), e)).collect()
}
