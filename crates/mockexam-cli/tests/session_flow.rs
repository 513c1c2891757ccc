//! End-to-end session tests wiring the engine to the scripted remote and the
//! in-memory store, driven by the real interval scheduler under paused time.

use std::sync::Arc;

use mockexam_core::archive::ResultArchive;
use mockexam_core::error::{RemoteError, SessionError};
use mockexam_core::model::{ExamPart, ExamProfile, Question, QuestionOption};
use mockexam_core::session::{ExamSession, Navigation, SessionPhase, StartOutcome, TickOutcome};
use mockexam_core::submission::{DetailRowOutcome, LegacyOutcome};
use mockexam_core::traits::SnapshotStore;
use mockexam_remote::{MockOp, MockRemote};
use mockexam_store::MemoryStore;

fn question(n: usize) -> Question {
    Question {
        id: format!("q{n}"),
        prompt: format!("Question {n}"),
        options: vec![
            QuestionOption {
                id: format!("q{n}-a"),
                text: "right".into(),
                is_correct: true,
            },
            QuestionOption {
                id: format!("q{n}-b"),
                text: "wrong".into(),
                is_correct: false,
            },
        ],
        explanation: None,
        category: None,
    }
}

fn one_minute_profile() -> ExamProfile {
    ExamProfile {
        duration_minutes: 1,
        ..ExamProfile::default_for(ExamPart::PartA)
    }
}

fn session(remote: &Arc<MockRemote>, store: &MemoryStore) -> ExamSession {
    ExamSession::new(
        "candidate",
        one_minute_profile(),
        remote.clone(),
        Arc::new(store.clone()),
        ResultArchive::new(Arc::new(store.clone())),
    )
}

fn remote() -> Arc<MockRemote> {
    Arc::new(
        MockRemote::new()
            .with_questions(ExamPart::PartA, (1..=3).map(question).collect())
            .with_legacy(),
    )
}

#[tokio::test(start_paused = true)]
async fn countdown_expiry_submits_everything() {
    let remote = remote();
    let store = MemoryStore::new();
    let mut session = session(&remote, &store);

    session.start().await.unwrap();
    session.select_option("q1", "q1-a").unwrap();
    session.check_answer().unwrap();
    session.next().await.unwrap();
    // pending but unchecked when time runs out
    session.select_option("q2", "q2-a").unwrap();

    let report = loop {
        session.next_tick().await;
        if let TickOutcome::Expired(report) = session.tick().await.unwrap() {
            break report;
        }
    };

    let result = &report.result;
    assert!(result.time_expired);
    assert_eq!(result.time_taken_seconds, 60);
    assert_eq!(result.correct_answers, 2);
    assert_eq!(result.score_percentage, 67);
    assert!(!result.passed);

    assert_eq!(remote.summaries().len(), 1);
    assert_eq!(remote.legacy_summaries().len(), 1);
    assert_eq!(report.legacy, LegacyOutcome::Mirrored);
    assert!(matches!(
        report.detail_rows,
        DetailRowOutcome::Written { rows: 2, .. }
    ));
    assert_eq!(remote.detail_rows().len(), 2);

    assert_eq!(session.phase(), SessionPhase::Completed);
    assert!(store.load_snapshot("candidate").unwrap().is_none());
    let history = ResultArchive::new(Arc::new(store.clone()))
        .history("candidate")
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].session_id, result.session_id);
}

#[tokio::test(start_paused = true)]
async fn crashed_session_resumes_where_it_stopped() {
    let remote = remote();
    let store = MemoryStore::new();

    let mut first = session(&remote, &store);
    first.start().await.unwrap();
    first.select_option("q1", "q1-b").unwrap();
    first.check_answer().unwrap();
    for _ in 0..10 {
        first.next_tick().await;
        first.tick().await.unwrap();
    }
    drop(first);

    let mut second = session(&remote, &store);
    let outcome = second.start().await.unwrap();
    assert!(matches!(
        outcome,
        StartOutcome::Resumed {
            current_index: 0,
            ..
        }
    ));
    assert_eq!(remote.sessions_created(), 1);
    assert_eq!(second.time_left(), 50);
    assert_eq!(second.answered_count(), 1);

    for _ in 0..2 {
        match second.next().await.unwrap() {
            Navigation::Moved { .. } => {
                second.skip().unwrap();
            }
            Navigation::Finished(_) => panic!("finished early"),
        }
    }
    let Navigation::Finished(report) = second.next().await.unwrap() else {
        panic!("expected the last `next` to finish");
    };
    assert_eq!(report.result.score_percentage, 0);
    assert_eq!(report.result.answered_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_summary_can_be_retried() {
    let remote = remote();
    let store = MemoryStore::new();
    let mut session = session(&remote, &store);

    session.start().await.unwrap();
    session.select_option("q1", "q1-a").unwrap();
    remote.fail_next(
        MockOp::UpdateSummary,
        RemoteError::Network("connection reset".into()),
    );

    let err = session.finish(false).await.unwrap_err();
    assert!(matches!(err, SessionError::SummaryWriteFailed(_)));
    assert!(err.is_retryable());
    assert_eq!(session.phase(), SessionPhase::Failed { retryable: true });
    assert!(store.load_snapshot("candidate").unwrap().is_some());

    let report = session.finish(false).await.unwrap();
    assert_eq!(report.result.correct_answers, 1);
    assert_eq!(remote.summaries().len(), 1);
    assert!(store.load_snapshot("candidate").unwrap().is_none());
}
