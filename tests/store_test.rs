use std::path::PathBuf;
use std::sync::Arc;

use exampro::dto::auth_dto::LoginRequest;
use exampro::dto::exam_dto::{CreateExamPayload, CreateQuestion};
use exampro::error::Error;
use exampro::models::answer::Answer;
use exampro::models::question::QuestionType;
use exampro::models::user::UserRole;
use exampro::services::auth_service::AuthService;
use exampro::services::exam_service::ExamService;
use exampro::services::persistence_service::{
    FileStorage, MemoryStorage, PersistenceService, Storage, LAST_SUBMISSION_KEY,
};
use exampro::services::store_service::{reduce, Action, StateStore};
use uuid::Uuid;

const KEY: &str = "exampro_db_v1";

fn memory_store() -> (StateStore, MemoryStorage) {
    let storage = MemoryStorage::new();
    let persistence = PersistenceService::new(Arc::new(storage.clone()), KEY);
    (StateStore::open(persistence), storage)
}

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("exampro-test-{}", Uuid::new_v4()))
}

fn payload(title: &str) -> CreateExamPayload {
    let mut question = CreateQuestion::blank(QuestionType::SingleSelect);
    question.text = "2 + 2?".to_string();
    question.options = vec!["3".into(), "4".into()];
    question.correct_answer = Answer::Single(1);
    CreateExamPayload {
        title: title.to_string(),
        category: "Mathematics".to_string(),
        description: String::new(),
        duration_minutes: 5,
        passing_marks: 50,
        questions: vec![question],
    }
}

fn student_login(store: &StateStore) {
    let user = AuthService::login(LoginRequest {
        name: None,
        email: "sam@example.com".to_string(),
        role: UserRole::Student,
    })
    .unwrap();
    store.login(user);
}

#[test]
fn empty_storage_loads_seed() {
    let (store, _) = memory_store();
    let state = store.snapshot();
    assert!(state.current_user.is_none());
    assert_eq!(state.exams.len(), 1);
    assert_eq!(state.exams[0].id, "exam-1");
    assert!(state.submissions.is_empty());
}

#[test]
fn garbage_storage_loads_seed() {
    let storage = MemoryStorage::new();
    storage.set(KEY, "{not json").unwrap();
    let persistence = PersistenceService::new(Arc::new(storage), KEY);
    let state = persistence.load();
    assert_eq!(state.exams.len(), 1);
    assert_eq!(state.exams[0].id, "exam-1");
}

#[test]
fn reducer_prepends_exams_and_appends_submissions() {
    let (store, _) = memory_store();
    let first = ExamService::create_exam(payload("First")).unwrap();
    let second = ExamService::create_exam(payload("Second")).unwrap();

    let state = reduce(&store.snapshot(), Action::AddExam(first.clone()));
    let state = reduce(&state, Action::AddExam(second.clone()));
    let titles: Vec<&str> = state.exams.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Second", "First", "General Science & Environment"]);

    let state = reduce(&state, Action::DeleteExam(first.id.clone()));
    assert!(state.exam(&first.id).is_none());
    // The input snapshot is untouched.
    assert_eq!(store.snapshot().exams.len(), 1);
}

#[test]
fn every_transition_is_persisted() {
    let (store, storage) = memory_store();
    student_login(&store);
    store.add_exam(ExamService::create_exam(payload("Algebra")).unwrap());

    let reloaded = PersistenceService::new(Arc::new(storage), KEY).load();
    assert_eq!(reloaded.exams.len(), 2);
    assert_eq!(reloaded.exams[0].title, "Algebra");
    assert_eq!(
        reloaded.current_user.map(|u| u.name),
        Some("sam".to_string())
    );

    store.logout();
    assert!(store.snapshot().current_user.is_none());
}

#[test]
fn session_submission_lands_in_store() {
    let (store, storage) = memory_store();
    assert!(matches!(store.begin_session("exam-1"), Err(Error::BadRequest(_))));

    student_login(&store);
    assert!(matches!(store.begin_session("missing"), Err(Error::NotFound(_))));

    let mut rx = store.subscribe();
    let mut session = store.begin_session("exam-1").unwrap();
    session.select_answer("q1", 1).unwrap();
    session.select_answer("q2", 0).unwrap();
    let sub = session.submit().unwrap().unwrap();
    assert_eq!(sub.score, 2);
    assert_eq!(sub.percentage, 50);

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.submissions.len(), 1);
    assert_eq!(state.submissions[0].id, sub.id);
    let user_id = state.current_user.as_ref().map(|u| u.id.clone()).unwrap();
    assert!(state.has_attempted(&user_id, "exam-1"));

    assert!(storage.get(LAST_SUBMISSION_KEY).unwrap().is_some());
    assert_eq!(store.find_submission(&sub.id), Some(sub));
}

#[test]
fn recovery_copy_is_used_when_state_lacks_submission() {
    let storage = MemoryStorage::new();
    let store = StateStore::open(PersistenceService::new(Arc::new(storage.clone()), KEY));
    student_login(&store);
    let mut session = store.begin_session("exam-1").unwrap();
    let sub = session.submit().unwrap().unwrap();

    // Fresh state blob without the submission, recovery key still present.
    let other = PersistenceService::new(Arc::new(storage.clone()), "another_key");
    let recovered = StateStore::open(other);
    assert!(recovered.snapshot().submission(&sub.id).is_none());
    assert_eq!(recovered.find_submission(&sub.id).map(|s| s.id), Some(sub.id));
    assert!(recovered.find_submission("unknown").is_none());
}

#[test]
fn file_storage_roundtrip() {
    let dir = temp_dir();
    let persistence = PersistenceService::new(Arc::new(FileStorage::new(&dir)), KEY);
    let store = StateStore::open(persistence);
    store.add_exam(ExamService::create_exam(payload("On disk")).unwrap());

    assert!(dir.join(format!("{}.json", KEY)).exists());
    let reopened = PersistenceService::new(Arc::new(FileStorage::new(&dir)), KEY).load();
    assert_eq!(reopened.exams[0].title, "On disk");
    assert_eq!(reopened.exams[0].questions[0].correct_answer, Answer::Single(1));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn file_storage_rejects_path_like_keys() {
    let storage = FileStorage::new(temp_dir());
    assert!(matches!(storage.set("../escape", "{}"), Err(Error::BadRequest(_))));
    assert!(matches!(storage.get(""), Err(Error::BadRequest(_))));
}

#[test]
fn unwritable_storage_does_not_break_transitions() {
    // A regular file where the data directory should be.
    let blocker = temp_dir();
    std::fs::write(&blocker, "not a directory").unwrap();
    let persistence = PersistenceService::new(Arc::new(FileStorage::new(&blocker)), KEY);
    let store = StateStore::open(persistence);

    let state = store.add_exam(ExamService::create_exam(payload("Memory only")).unwrap());
    assert_eq!(state.exams.len(), 2);
    assert_eq!(store.snapshot().exams[0].title, "Memory only");

    std::fs::remove_file(&blocker).ok();
}
