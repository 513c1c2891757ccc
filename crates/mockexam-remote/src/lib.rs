//! mockexam-remote — Remote data-store backends.
//!
//! Implements the `RemoteStore` trait for a PostgREST (Supabase-style) HTTP
//! endpoint and for an offline directory-backed store, plus a scripted mock
//! for tests and the configuration that selects between them.

pub mod config;
pub mod error;
pub mod local;
pub mod mock;
pub mod rest;

pub use config::{create_remote, load_config, load_config_from, MockexamConfig, RemoteConfig};
pub use error::RemoteError;
pub use local::LocalRemote;
pub use mock::{MockOp, MockRemote};
pub use rest::{RestRemote, RestTables};
