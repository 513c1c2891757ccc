//! Error types for local persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the file-backed stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded or decoded.
    #[error("malformed record in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The user id cannot be used as a storage key.
    #[error("invalid user id: {0:?}")]
    InvalidUser(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Malformed {
            path: path.into(),
            source,
        }
    }
}

/// Turn a user id into a file stem.
///
/// `[A-Za-z0-9-]` pass through, as does `.` after the first character; every
/// other byte, `_` included, becomes `_XX` (uppercase hex). Distinct ids
/// therefore always map to distinct stems.
pub(crate) fn user_key(user_id: &str) -> Result<String, StoreError> {
    if user_id.is_empty() {
        return Err(StoreError::InvalidUser(user_id.to_string()));
    }

    let mut key = String::with_capacity(user_id.len());
    for (i, b) in user_id.bytes().enumerate() {
        if b.is_ascii_alphanumeric() || b == b'-' || (b == b'.' && i > 0) {
            key.push(char::from(b));
        } else {
            key.push_str(&format!("_{b:02X}"));
        }
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_key_escapes() {
        assert_eq!(user_key("alice").unwrap(), "alice");
        assert_eq!(user_key("a/b c").unwrap(), "a_2Fb_20c");
        assert_eq!(
            user_key("0b8f-user@example.com").unwrap(),
            "0b8f-user_40example.com"
        );
        assert_eq!(user_key("../etc").unwrap(), "_2E._2Fetc");
        assert_eq!(user_key("é").unwrap(), "_C3_A9");
    }

    #[test]
    fn distinct_ids_get_distinct_keys() {
        let ids = ["a/b", "a_b", "a_2Fb", "a b", " a", "a", "a.", ".a", "_2Ea"];
        let keys: std::collections::HashSet<String> =
            ids.iter().map(|id| user_key(id).unwrap()).collect();
        assert_eq!(keys.len(), ids.len());
    }

    #[test]
    fn user_key_rejects_empty() {
        assert!(matches!(user_key(""), Err(StoreError::InvalidUser(_))));
    }
}
