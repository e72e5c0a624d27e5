use crate::error::{Error, Result};
use crate::models::app_state::AppState;
use crate::models::exam::Exam;
use crate::models::submission::Submission;
use crate::models::user::User;
use crate::services::persistence_service::PersistenceService;
use crate::services::session_service::ExamSession;
use std::sync::Arc;
use tokio::sync::watch;

/// State transitions. Each one produces a new snapshot and is persisted.
#[derive(Debug, Clone)]
pub enum Action {
    Login(User),
    Logout,
    AddExam(Exam),
    DeleteExam(String),
    AddSubmission(Submission),
}

/// Pure transition function.
pub fn reduce(state: &AppState, action: Action) -> AppState {
    let mut next = state.clone();
    match action {
        Action::Login(user) => next.current_user = Some(user),
        Action::Logout => next.current_user = None,
        Action::AddExam(exam) => next.exams.insert(0, exam),
        Action::DeleteExam(id) => next.exams.retain(|e| e.id != id),
        Action::AddSubmission(submission) => next.submissions.push(submission),
    }
    next
}

/// Single-writer container for the application state.
///
/// Readers hold `Arc<AppState>` snapshots which are never mutated; every
/// transition swaps in a whole new snapshot.
#[derive(Clone)]
pub struct StateStore {
    tx: Arc<watch::Sender<Arc<AppState>>>,
    persistence: PersistenceService,
}

impl StateStore {
    pub fn new(initial: AppState, persistence: PersistenceService) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self {
            tx: Arc::new(tx),
            persistence,
        }
    }

    /// Loads persisted state (or the seed) and wraps it.
    pub fn open(persistence: PersistenceService) -> Self {
        let initial = persistence.load();
        Self::new(initial, persistence)
    }

    pub fn snapshot(&self) -> Arc<AppState> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AppState>> {
        self.tx.subscribe()
    }

    pub fn dispatch(&self, action: Action) -> Arc<AppState> {
        let label = action_label(&action);
        let mut next = Arc::default();
        self.tx.send_modify(|current| {
            *current = Arc::new(reduce(current, action));
            next = current.clone();
        });

        if let Err(e) = self.persistence.save(&next) {
            tracing::error!(action = label, error = %e, "Failed to persist application state");
        } else {
            tracing::debug!(action = label, "Application state persisted");
        }
        next
    }

    pub fn login(&self, user: User) -> Arc<AppState> {
        self.dispatch(Action::Login(user))
    }

    pub fn logout(&self) -> Arc<AppState> {
        self.dispatch(Action::Logout)
    }

    pub fn add_exam(&self, exam: Exam) -> Arc<AppState> {
        self.dispatch(Action::AddExam(exam))
    }

    pub fn delete_exam(&self, exam_id: impl Into<String>) -> Arc<AppState> {
        self.dispatch(Action::DeleteExam(exam_id.into()))
    }

    /// Appends a finished submission and keeps a copy under the recovery key.
    pub fn add_submission(&self, submission: Submission) -> Arc<AppState> {
        if let Err(e) = self.persistence.save_last_submission(&submission) {
            tracing::warn!(submission_id = %submission.id, error = %e, "Failed to store last submission");
        }
        self.dispatch(Action::AddSubmission(submission))
    }

    /// Looks up a submission, falling back to the recovery copy.
    pub fn find_submission(&self, submission_id: &str) -> Option<Submission> {
        self.snapshot()
            .submission(submission_id)
            .cloned()
            .or_else(|| self.persistence.last_submission(submission_id))
    }

    /// Starts a session for the logged-in user. Its submission lands back
    /// in this store.
    pub fn begin_session(&self, exam_id: &str) -> Result<ExamSession> {
        let state = self.snapshot();
        let user = state
            .current_user
            .as_ref()
            .ok_or_else(|| Error::BadRequest("Log in to take an exam".to_string()))?;
        let exam = state
            .exam(exam_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Exam {} not found", exam_id)))?;
        if exam.questions.is_empty() {
            return Err(Error::BadRequest("Exam has no questions".to_string()));
        }

        let store = self.clone();
        Ok(ExamSession::start(exam, user.id.clone()).on_complete(move |submission| {
            store.add_submission(submission.clone());
            Ok(())
        }))
    }
}

fn action_label(action: &Action) -> &'static str {
    match action {
        Action::Login(_) => "login",
        Action::Logout => "logout",
        Action::AddExam(_) => "add_exam",
        Action::DeleteExam(_) => "delete_exam",
        Action::AddSubmission(_) => "add_submission",
    }
}
