use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::exam::Exam;
use crate::models::question::Question;
use crate::models::submission::Submission;
use crate::services::grading_service::GradingService;
use crate::utils::time;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Seconds below which the countdown is flagged as running out.
pub const LOW_TIME_SECONDS: u32 = 60;
/// Violation count above which the session is flagged.
pub const VIOLATION_ALERT_THRESHOLD: u32 = 2;

pub type CompletionCallback = Box<dyn FnMut(&Submission) -> Result<()> + Send>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    Initializing,
    InProgress,
    Submitting,
    Submitted,
    /// Emission failed; the guard is released so the submission can be retried.
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionTrigger {
    User,
    Timer,
    Teardown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub exam_id: String,
    pub phase: SessionPhase,
    pub current_index: usize,
    pub question_count: usize,
    pub current_question_id: Option<String>,
    pub time_left: u32,
    pub countdown: String,
    pub low_time: bool,
    pub violations: u32,
    pub integrity_at_risk: bool,
    /// Answered flag per position in presentation order.
    pub answered: Vec<bool>,
}

/// One student's attempt at one exam.
///
/// Exactly one `Submission` leaves a session: user submission, timer expiry
/// and teardown all race for the same claim on the phase, and only the first
/// caller that finds the session open gets to grade and emit.
pub struct ExamSession {
    exam: Exam,
    student_id: String,
    order: Vec<usize>,
    current: usize,
    answers: BTreeMap<String, Answer>,
    time_left: u32,
    violations: u32,
    phase: SessionPhase,
    trigger: Option<SubmissionTrigger>,
    submission: Option<Submission>,
    on_complete: CompletionCallback,
}

impl std::fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExamSession")
            .field("exam_id", &self.exam.id)
            .field("student_id", &self.student_id)
            .field("phase", &self.phase)
            .field("current", &self.current)
            .field("time_left", &self.time_left)
            .field("violations", &self.violations)
            .finish()
    }
}

impl ExamSession {
    pub fn start(exam: Exam, student_id: impl Into<String>) -> Self {
        Self::start_with_rng(exam, student_id, &mut rand::thread_rng())
    }

    pub fn start_with_rng<R: Rng + ?Sized>(
        exam: Exam,
        student_id: impl Into<String>,
        rng: &mut R,
    ) -> Self {
        let mut session = Self {
            time_left: exam.duration_seconds(),
            order: (0..exam.questions.len()).collect(),
            exam,
            student_id: student_id.into(),
            current: 0,
            answers: BTreeMap::new(),
            violations: 0,
            phase: SessionPhase::Initializing,
            trigger: None,
            submission: None,
            on_complete: Box::new(|_| Ok(())),
        };

        // Fisher-Yates; every permutation equally likely.
        session.order.shuffle(rng);
        session.phase = SessionPhase::InProgress;

        tracing::info!(
            exam_id = %session.exam.id,
            student_id = %session.student_id,
            questions = session.order.len(),
            time_left = session.time_left,
            "Exam session started"
        );
        session
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Submission) -> Result<()> + Send + 'static,
    {
        self.on_complete = Box::new(callback);
        self
    }

    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn is_submitted(&self) -> bool {
        self.phase == SessionPhase::Submitted
    }

    /// Answers, navigation and the timer are live.
    fn is_open(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::InProgress | SessionPhase::Failed { .. }
        )
    }

    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    pub fn trigger(&self) -> Option<SubmissionTrigger> {
        self.trigger
    }

    pub fn question_count(&self) -> usize {
        self.order.len()
    }

    /// Questions in presentation order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> + '_ {
        self.order.iter().map(move |&idx| &self.exam.questions[idx])
    }

    pub fn question_at(&self, position: usize) -> Option<&Question> {
        self.order
            .get(position)
            .map(|&idx| &self.exam.questions[idx])
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.question_at(self.current)
    }

    pub fn answers(&self) -> &BTreeMap<String, Answer> {
        &self.answers
    }

    pub fn answer(&self, question_id: &str) -> Option<&Answer> {
        self.answers.get(question_id)
    }

    pub fn is_answered(&self, question_id: &str) -> bool {
        self.answers
            .get(question_id)
            .is_some_and(|answer| !answer.is_empty())
    }

    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| !a.is_empty()).count()
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn is_low_time(&self) -> bool {
        self.time_left < LOW_TIME_SECONDS
    }

    pub fn violations(&self) -> u32 {
        self.violations
    }

    pub fn integrity_at_risk(&self) -> bool {
        self.violations > VIOLATION_ALERT_THRESHOLD
    }

    pub fn select_answer(&mut self, question_id: &str, option_index: usize) -> Result<()> {
        if !self.is_open() {
            tracing::debug!(question_id, phase = ?self.phase, "Answer ignored, session closed");
            return Ok(());
        }

        let question = self
            .exam
            .question(question_id)
            .ok_or_else(|| Error::NotFound(format!("Question {} not in exam", question_id)))?;
        if !question.has_option(option_index) {
            return Err(Error::BadRequest(format!(
                "Option {} out of range for question {}",
                option_index, question_id
            )));
        }

        if question.question_type.is_multi() {
            let mut chosen = self
                .answers
                .remove(question_id)
                .map(|a| a.indices())
                .unwrap_or_default();
            if !chosen.remove(&option_index) {
                chosen.insert(option_index);
            }
            self.answers
                .insert(question_id.to_string(), Answer::Multiple(chosen));
        } else {
            self.answers
                .insert(question_id.to_string(), Answer::Single(option_index));
        }
        Ok(())
    }

    pub fn go_to(&mut self, position: usize) -> Result<()> {
        if !self.is_open() {
            tracing::debug!(position, "Navigation ignored, session closed");
            return Ok(());
        }
        if position >= self.order.len() {
            return Err(Error::BadRequest(format!(
                "Question position {} out of range (0..{})",
                position,
                self.order.len()
            )));
        }
        self.current = position;
        Ok(())
    }

    pub fn next(&mut self) -> Result<()> {
        self.go_to(self.current + 1)
    }

    pub fn previous(&mut self) -> Result<()> {
        match self.current.checked_sub(1) {
            Some(position) => self.go_to(position),
            None => Err(Error::BadRequest("Already at the first question".to_string())),
        }
    }

    /// Records one integrity violation. Never submits.
    pub fn report_violation(&mut self) -> u32 {
        if self.is_submitted() {
            return self.violations;
        }
        self.violations = self.violations.saturating_add(1);
        tracing::warn!(
            exam_id = %self.exam.id,
            student_id = %self.student_id,
            violations = self.violations,
            "Integrity violation recorded"
        );
        self.violations
    }

    /// One elapsed second. Submits when the clock reaches zero.
    ///
    /// A session that starts with no time left submits on its first tick.
    /// After a failed timer emission the clock stays at zero and the retry
    /// is left to the user or teardown.
    pub fn tick(&mut self) -> Result<Option<Submission>> {
        if !self.is_open() {
            return Ok(None);
        }
        if self.time_left == 0 {
            if self.phase != SessionPhase::InProgress {
                return Ok(None);
            }
            tracing::info!(exam_id = %self.exam.id, "No time budget, submitting");
            return self.finish(SubmissionTrigger::Timer);
        }
        self.time_left -= 1;
        if self.time_left == 0 {
            tracing::info!(exam_id = %self.exam.id, "Time expired, submitting");
            return self.finish(SubmissionTrigger::Timer);
        }
        Ok(None)
    }

    /// User-initiated submission. `Ok(None)` when a submission already left.
    pub fn submit(&mut self) -> Result<Option<Submission>> {
        self.finish(SubmissionTrigger::User)
    }

    /// Cleanup path for a host tearing the session down.
    pub fn teardown(&mut self) -> Result<Option<Submission>> {
        self.finish(SubmissionTrigger::Teardown)
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            exam_id: self.exam.id.clone(),
            phase: self.phase.clone(),
            current_index: self.current,
            question_count: self.order.len(),
            current_question_id: self.current_question().map(|q| q.id.clone()),
            time_left: self.time_left,
            countdown: time::format_countdown(self.time_left),
            low_time: self.is_low_time(),
            violations: self.violations,
            integrity_at_risk: self.integrity_at_risk(),
            answered: self.questions().map(|q| self.is_answered(&q.id)).collect(),
        }
    }

    /// Check-and-set on the phase. Only one caller can win while open.
    fn claim(&mut self, trigger: SubmissionTrigger) -> bool {
        if !self.is_open() {
            return false;
        }
        self.phase = SessionPhase::Submitting;
        self.trigger = Some(trigger);
        true
    }

    fn finish(&mut self, trigger: SubmissionTrigger) -> Result<Option<Submission>> {
        if !self.claim(trigger) {
            tracing::debug!(?trigger, phase = ?self.phase, "Submission trigger ignored");
            return Ok(None);
        }

        let answers = self.answers.clone();
        let evaluation = GradingService::evaluate(&self.exam, &answers);
        let submission = Submission {
            id: Uuid::new_v4().to_string(),
            user_id: self.student_id.clone(),
            exam_id: self.exam.id.clone(),
            answers,
            score: evaluation.score,
            percentage: evaluation.percentage,
            status: evaluation.status,
            submitted_at: time::now(),
            integrity_violations: self.violations,
        };

        match (self.on_complete)(&submission) {
            Ok(()) => {
                tracing::info!(
                    submission_id = %submission.id,
                    exam_id = %submission.exam_id,
                    ?trigger,
                    score = submission.score,
                    percentage = submission.percentage,
                    status = ?submission.status,
                    violations = submission.integrity_violations,
                    "Exam submitted"
                );
                self.phase = SessionPhase::Submitted;
                self.submission = Some(submission.clone());
                Ok(Some(submission))
            }
            Err(e) => {
                tracing::error!(exam_id = %self.exam.id, ?trigger, error = %e, "Submission failed");
                self.phase = SessionPhase::Failed {
                    reason: e.to_string(),
                };
                self.trigger = None;
                Err(e)
            }
        }
    }
}
