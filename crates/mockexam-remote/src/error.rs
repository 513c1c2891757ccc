//! Remote error types.
//!
//! The error enum lives in `mockexam-core` so the submission pipeline can
//! classify failures; it is re-exported here for backend implementors.

pub use mockexam_core::error::{schema_kind_of, RemoteError, SchemaErrorKind};
