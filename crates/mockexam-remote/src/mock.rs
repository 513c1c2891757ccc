//! Mock remote store for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use mockexam_core::error::{RemoteError, SchemaErrorKind};
use mockexam_core::model::{CreatedSession, ExamPart, Question, SessionSummary};
use mockexam_core::traits::RemoteStore;

/// Which remote operation a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    FetchQuestions,
    CreateSession,
    UpdateSummary,
    UpdateLegacy,
    InsertDetailRows,
}

/// A scripted remote store for exercising the session engine without a
/// backend.
///
/// Failures are queued per operation and consumed one call at a time.
pub struct MockRemote {
    questions: HashMap<ExamPart, Vec<Question>>,
    with_legacy: bool,
    failures: Mutex<HashMap<MockOp, Vec<RemoteError>>>,
    /// Number of calls made, across all operations.
    call_count: AtomicU32,
    created: AtomicU32,
    summaries: Mutex<Vec<(String, SessionSummary)>>,
    legacy_summaries: Mutex<Vec<(String, SessionSummary)>>,
    detail_rows: Mutex<Vec<serde_json::Value>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            questions: HashMap::new(),
            with_legacy: false,
            failures: Mutex::new(HashMap::new()),
            call_count: AtomicU32::new(0),
            created: AtomicU32::new(0),
            summaries: Mutex::new(Vec::new()),
            legacy_summaries: Mutex::new(Vec::new()),
            detail_rows: Mutex::new(Vec::new()),
        }
    }

    pub fn with_questions(mut self, part: ExamPart, questions: Vec<Question>) -> Self {
        self.questions.insert(part, questions);
        self
    }

    /// Return a legacy id from `create_session`.
    pub fn with_legacy(mut self) -> Self {
        self.with_legacy = true;
        self
    }

    /// Fail the next call to `op` with `error`.
    pub fn fail_next(&self, op: MockOp, error: RemoteError) {
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push(error);
    }

    /// Reject the next `n` detail-row inserts as a schema mismatch.
    pub fn reject_detail_rows(&self, n: usize) {
        for _ in 0..n {
            self.fail_next(
                MockOp::InsertDetailRows,
                RemoteError::Schema {
                    kind: SchemaErrorKind::ColumnNotFound,
                    message: "column does not exist".into(),
                },
            );
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn sessions_created(&self) -> u32 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn summaries(&self) -> Vec<(String, SessionSummary)> {
        self.summaries.lock().unwrap().clone()
    }

    pub fn legacy_summaries(&self) -> Vec<(String, SessionSummary)> {
        self.legacy_summaries.lock().unwrap().clone()
    }

    pub fn detail_rows(&self) -> Vec<serde_json::Value> {
        self.detail_rows.lock().unwrap().clone()
    }

    fn enter(&self, op: MockOp) -> anyhow::Result<()> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&op) {
            Some(queue) if !queue.is_empty() => Err(queue.remove(0).into()),
            _ => Ok(()),
        }
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_questions(&self, part: ExamPart) -> anyhow::Result<Vec<Question>> {
        self.enter(MockOp::FetchQuestions)?;
        Ok(self.questions.get(&part).cloned().unwrap_or_default())
    }

    async fn create_session(
        &self,
        _user_id: &str,
        _part: ExamPart,
        _total_questions: usize,
    ) -> anyhow::Result<CreatedSession> {
        self.enter(MockOp::CreateSession)?;
        let n = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(CreatedSession {
            session_id: format!("mock-session-{n}"),
            legacy_session_id: self.with_legacy.then(|| format!("mock-legacy-{n}")),
        })
    }

    async fn update_session_summary(
        &self,
        session_id: &str,
        summary: &SessionSummary,
    ) -> anyhow::Result<()> {
        self.enter(MockOp::UpdateSummary)?;
        self.summaries
            .lock()
            .unwrap()
            .push((session_id.to_string(), summary.clone()));
        Ok(())
    }

    async fn update_legacy_summary(
        &self,
        legacy_session_id: &str,
        summary: &SessionSummary,
    ) -> anyhow::Result<()> {
        self.enter(MockOp::UpdateLegacy)?;
        self.legacy_summaries
            .lock()
            .unwrap()
            .push((legacy_session_id.to_string(), summary.clone()));
        Ok(())
    }

    async fn insert_answer_detail_rows(
        &self,
        _session_id: &str,
        rows: &[serde_json::Value],
    ) -> anyhow::Result<()> {
        self.enter(MockOp::InsertDetailRows)?;
        self.detail_rows.lock().unwrap().extend_from_slice(rows);
        Ok(())
    }
}
