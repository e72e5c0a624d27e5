use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use exampro::error::Error;
use exampro::models::answer::Answer;
use exampro::models::exam::Exam;
use exampro::models::question::{Question, QuestionType};
use exampro::models::submission::SubmissionStatus;
use exampro::services::session_service::{ExamSession, SessionPhase, SubmissionTrigger};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn exam(question_count: usize, duration_minutes: u32) -> Exam {
    let questions: Vec<Question> = (0..question_count)
        .map(|i| Question {
            id: format!("q{}", i),
            question_type: QuestionType::SingleSelect,
            text: format!("Question {}", i),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer: Answer::Single(1),
            explanation: String::new(),
            marks: 1,
        })
        .collect();
    Exam {
        id: "exam".to_string(),
        title: "Session".to_string(),
        category: "Science".to_string(),
        description: String::new(),
        duration_minutes,
        total_marks: Exam::marks_sum(&questions),
        passing_marks: 50,
        questions,
        created_at: Utc::now(),
    }
}

fn counted(exam: Exam) -> (ExamSession, Arc<AtomicUsize>) {
    let emitted = Arc::new(AtomicUsize::new(0));
    let counter = emitted.clone();
    let session = ExamSession::start(exam, "student").on_complete(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (session, emitted)
}

#[test]
fn timer_expiry_submits_exactly_once() {
    let (mut session, emitted) = counted(exam(2, 1));
    session.select_answer("q0", 1).unwrap();

    let mut submissions = Vec::new();
    for _ in 0..60 {
        if let Some(sub) = session.tick().unwrap() {
            submissions.push(sub);
        }
    }
    assert_eq!(submissions.len(), 1);
    assert_eq!(session.time_left(), 0);
    assert_eq!(session.trigger(), Some(SubmissionTrigger::Timer));
    assert_eq!(submissions[0].score, 1);
    assert_eq!(submissions[0].percentage, 50);
    assert_eq!(submissions[0].status, SubmissionStatus::Passed);

    // Expiry then a late click or a teardown.
    assert!(session.tick().unwrap().is_none());
    assert!(session.submit().unwrap().is_none());
    assert!(session.teardown().unwrap().is_none());
    assert_eq!(emitted.load(Ordering::SeqCst), 1);
}

#[test]
fn repeated_submit_emits_once() {
    let (mut session, emitted) = counted(exam(3, 5));
    let first = session.submit().unwrap();
    assert!(first.is_some());
    for _ in 0..5 {
        assert!(session.submit().unwrap().is_none());
        assert!(session.tick().unwrap().is_none());
    }
    assert_eq!(session.time_left(), 300);
    assert_eq!(session.phase(), &SessionPhase::Submitted);
    assert_eq!(emitted.load(Ordering::SeqCst), 1);
}

#[test]
fn teardown_submits_open_session() {
    let (mut session, emitted) = counted(exam(2, 5));
    session.report_violation();
    let sub = session.teardown().unwrap().expect("teardown submission");
    assert_eq!(sub.integrity_violations, 1);
    assert_eq!(sub.score, 0);
    assert_eq!(sub.status, SubmissionStatus::Failed);
    assert_eq!(session.trigger(), Some(SubmissionTrigger::Teardown));
    assert_eq!(emitted.load(Ordering::SeqCst), 1);
}

#[test]
fn submission_snapshots_answers_at_claim_time() {
    let (mut session, _) = counted(exam(2, 5));
    session.select_answer("q0", 1).unwrap();
    session.select_answer("q1", 0).unwrap();
    let sub = session.submit().unwrap().unwrap();
    session.select_answer("q1", 1).unwrap();

    assert_eq!(sub.answers.get("q1"), Some(&Answer::Single(0)));
    assert_eq!(session.answer("q1"), Some(&Answer::Single(0)));
    assert_eq!(sub.user_id, "student");
    assert_eq!(sub.exam_id, "exam");
}

#[test]
fn violations_past_threshold_flag_the_session() {
    let (mut session, emitted) = counted(exam(1, 5));
    session.report_violation();
    session.report_violation();
    assert!(!session.integrity_at_risk());
    assert_eq!(session.report_violation(), 3);
    assert!(session.integrity_at_risk());
    assert!(session.view().integrity_at_risk);
    assert!(!session.is_submitted());
    assert_eq!(emitted.load(Ordering::SeqCst), 0);
}

#[test]
fn low_time_flag_under_a_minute() {
    let (mut session, _) = counted(exam(1, 2));
    for _ in 0..60 {
        session.tick().unwrap();
    }
    assert_eq!(session.time_left(), 60);
    assert!(!session.is_low_time());
    session.tick().unwrap();
    assert!(session.is_low_time());
    assert_eq!(session.view().countdown, "00:59");
}

#[test]
fn navigation_is_bounded() {
    let (mut session, _) = counted(exam(3, 5));
    session.next().unwrap();
    session.next().unwrap();
    assert_eq!(session.current_index(), 2);
    assert!(matches!(session.next(), Err(Error::BadRequest(_))));
    session.previous().unwrap();
    assert_eq!(session.current_index(), 1);
    session.go_to(0).unwrap();
    assert!(session.previous().is_err());
}

#[test]
fn retry_after_failed_emission_keeps_answers() {
    let mut fail_next = true;
    let mut session = ExamSession::start(exam(2, 5), "student").on_complete(move |_| {
        if std::mem::take(&mut fail_next) {
            return Err(Error::Internal("disk full".to_string()));
        }
        Ok(())
    });
    session.select_answer("q0", 1).unwrap();

    assert!(session.teardown().is_err());
    assert!(session.trigger().is_none());
    session.select_answer("q1", 1).unwrap();

    let sub = session.submit().unwrap().unwrap();
    assert_eq!(sub.score, 2);
    assert_eq!(session.trigger(), Some(SubmissionTrigger::User));
    assert!(session.submit().unwrap().is_none());
}

#[test]
fn shuffle_is_uniform_over_permutations() {
    const RUNS: usize = 48_000;
    let template = exam(4, 1);
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut counts: HashMap<Vec<String>, usize> = HashMap::new();

    for _ in 0..RUNS {
        let session = ExamSession::start_with_rng(template.clone(), "student", &mut rng);
        let order: Vec<String> = session.questions().map(|q| q.id.clone()).collect();
        *counts.entry(order).or_default() += 1;
    }

    assert_eq!(counts.len(), 24);
    let expected = RUNS / 24;
    for (order, count) in &counts {
        let deviation = count.abs_diff(expected);
        assert!(
            deviation * 10 <= expected,
            "permutation {:?} seen {} times, expected about {}",
            order,
            count,
            expected
        );
    }
}

#[test]
fn shuffle_keeps_every_question_once() {
    let session = ExamSession::start(exam(10, 5), "student");
    let mut ids: Vec<String> = session.questions().map(|q| q.id.clone()).collect();
    ids.sort();
    let mut expected: Vec<String> = (0..10).map(|i| format!("q{}", i)).collect();
    expected.sort();
    assert_eq!(ids, expected);
}
