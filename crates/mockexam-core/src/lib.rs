//! mockexam-core — Timed mock-exam session engine.
//!
//! This crate defines the data model, the collaborator traits, and the
//! session state machine (answer ledger, countdown, submission pipeline)
//! that the rest of mockexam builds on.

pub mod archive;
pub mod countdown;
pub mod error;
pub mod ledger;
pub mod model;
pub mod parser;
pub mod session;
pub mod submission;
pub mod traits;

pub use archive::ResultArchive;
pub use error::{RemoteError, SchemaErrorKind, SessionError};
pub use session::{ExamSession, SessionConfig, SessionPhase};
