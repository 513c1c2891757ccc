//! Error types.
//!
//! `RemoteError` is defined here rather than in `mockexam-remote` so the
//! submission pipeline can downcast and classify backend failures (schema
//! rejections in particular) without string matching.

use std::fmt;

use thiserror::Error;

use crate::model::ExamPart;
use crate::session::{AnswerMode, SessionPhase};

/// Known classes of schema rejection from the remote detail table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    ColumnNotFound,
    TypeMismatch,
    NotNullViolation,
}

impl SchemaErrorKind {
    /// Map a PostgreSQL / PostgREST error code to a schema error class.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "42703" | "PGRST204" => Some(SchemaErrorKind::ColumnNotFound),
            "42804" | "22P02" => Some(SchemaErrorKind::TypeMismatch),
            "23502" => Some(SchemaErrorKind::NotNullViolation),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaErrorKind::ColumnNotFound => write!(f, "column not found"),
            SchemaErrorKind::TypeMismatch => write!(f, "type mismatch"),
            SchemaErrorKind::NotNullViolation => write!(f, "not-null violation"),
        }
    }
}

/// Errors that can occur when talking to the remote data store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote schema rejected the shape of a write.
    #[error("schema rejected write ({kind}): {message}")]
    Schema {
        kind: SchemaErrorKind,
        message: String,
    },

    /// The addressed record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),
}

impl RemoteError {
    pub fn schema_kind(&self) -> Option<SchemaErrorKind> {
        match self {
            RemoteError::Schema { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Schema class of an error returned across the `RemoteStore` boundary, if any.
pub fn schema_kind_of(err: &anyhow::Error) -> Option<SchemaErrorKind> {
    err.downcast_ref::<RemoteError>()
        .and_then(RemoteError::schema_kind)
}

/// Errors surfaced by the session state machine.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("`{operation}` is not allowed while the session is {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: SessionPhase,
    },

    #[error("`{operation}` is not allowed while the current question is {mode}")]
    NotPermitted {
        operation: &'static str,
        mode: AnswerMode,
    },

    #[error("no option selected for the current question")]
    NoSelection,

    #[error("cannot navigate {0}")]
    OutOfBounds(&'static str),

    #[error("unknown question: {0}")]
    UnknownQuestion(String),

    #[error("option {option_id} does not belong to question {question_id}")]
    UnknownOption {
        question_id: String,
        option_id: String,
    },

    #[error("an in-progress {existing} attempt exists; resume or discard it before starting {requested}")]
    ConflictingSnapshot {
        existing: ExamPart,
        requested: ExamPart,
    },

    #[error("no questions available for {0}")]
    NoQuestions(ExamPart),

    #[error("failed to fetch questions: {0}")]
    QuestionFetchFailed(String),

    #[error("failed to create remote session: {0}")]
    SessionCreationFailed(String),

    #[error("failed to write session summary: {0}")]
    SummaryWriteFailed(String),

    #[error("session summary write timed out after {0}s")]
    SubmissionTimedOut(u64),

    #[error("session has no remote id")]
    MissingSessionId,

    #[error("local persistence failed: {0}")]
    Persistence(String),
}

impl SessionError {
    /// Rejected caller input; the session state is unchanged.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidPhase { .. }
                | SessionError::NotPermitted { .. }
                | SessionError::NoSelection
                | SessionError::OutOfBounds(_)
                | SessionError::UnknownQuestion(_)
                | SessionError::UnknownOption { .. }
                | SessionError::ConflictingSnapshot { .. }
        )
    }

    /// Submission failed but the attempt is preserved and `finish` may be
    /// invoked again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::SummaryWriteFailed(_) | SessionError::SubmissionTimedOut(_)
        )
    }
}
