//! Collaborator traits for the session engine.
//!
//! The remote data store is implemented by `mockexam-remote`, the local
//! snapshot and result stores by `mockexam-store`. Tick scheduling lives in
//! [`crate::countdown`].

use async_trait::async_trait;

use crate::model::{
    CreatedSession, ExamPart, Question, SessionResult, SessionSnapshot, SessionSummary,
};

// ---------------------------------------------------------------------------
// Remote data store
// ---------------------------------------------------------------------------

/// The narrow contract consumed from the hosted backend.
///
/// Implementations should return [`crate::error::RemoteError`] wrapped in
/// `anyhow::Error` so callers can classify failures.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Human-readable backend name (e.g. "rest").
    fn name(&self) -> &str;

    /// Fetch the question set for an exam part.
    async fn fetch_questions(&self, part: ExamPart) -> anyhow::Result<Vec<Question>>;

    /// Create a remote session record for a fresh attempt.
    async fn create_session(
        &self,
        user_id: &str,
        part: ExamPart,
        total_questions: usize,
    ) -> anyhow::Result<CreatedSession>;

    /// Write the final summary to the primary session record.
    async fn update_session_summary(
        &self,
        session_id: &str,
        summary: &SessionSummary,
    ) -> anyhow::Result<()>;

    /// Mirror the summary into the legacy record.
    async fn update_legacy_summary(
        &self,
        legacy_session_id: &str,
        summary: &SessionSummary,
    ) -> anyhow::Result<()>;

    /// Insert one detail row per answer. `rows` are already shaped for the
    /// remote table.
    async fn insert_answer_detail_rows(
        &self,
        session_id: &str,
        rows: &[serde_json::Value],
    ) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Local persistence
// ---------------------------------------------------------------------------

/// Durable per-user storage of the in-progress snapshot.
pub trait SnapshotStore: Send + Sync {
    fn load_snapshot(&self, user_id: &str) -> anyhow::Result<Option<SessionSnapshot>>;

    /// Replace the user's snapshot.
    fn save_snapshot(&self, user_id: &str, snapshot: &SessionSnapshot) -> anyhow::Result<()>;

    /// Remove the user's snapshot. Clearing a missing snapshot is not an error.
    fn clear_snapshot(&self, user_id: &str) -> anyhow::Result<()>;
}

/// Append-only storage of completed results.
pub trait ResultStore: Send + Sync {
    fn append_result(&self, user_id: &str, result: &SessionResult) -> anyhow::Result<()>;

    /// All results for a user, in no particular order.
    fn load_history(&self, user_id: &str) -> anyhow::Result<Vec<SessionResult>>;

    fn load_result(&self, user_id: &str, session_id: &str)
        -> anyhow::Result<Option<SessionResult>>;
}
