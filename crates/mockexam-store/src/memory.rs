//! In-memory stores for tests and ephemeral sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use mockexam_core::model::{SessionResult, SessionSnapshot};
use mockexam_core::traits::{ResultStore, SnapshotStore};

/// Snapshot and result store that lives only as long as the process.
///
/// Cloning shares the underlying maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshots: Arc<Mutex<HashMap<String, SessionSnapshot>>>,
    results: Arc<Mutex<HashMap<String, Vec<SessionResult>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SnapshotStore for MemoryStore {
    fn load_snapshot(&self, user_id: &str) -> Result<Option<SessionSnapshot>> {
        Ok(Self::lock(&self.snapshots).get(user_id).cloned())
    }

    fn save_snapshot(&self, user_id: &str, snapshot: &SessionSnapshot) -> Result<()> {
        Self::lock(&self.snapshots).insert(user_id.to_string(), snapshot.clone());
        Ok(())
    }

    fn clear_snapshot(&self, user_id: &str) -> Result<()> {
        Self::lock(&self.snapshots).remove(user_id);
        Ok(())
    }
}

impl ResultStore for MemoryStore {
    fn append_result(&self, user_id: &str, result: &SessionResult) -> Result<()> {
        Self::lock(&self.results)
            .entry(user_id.to_string())
            .or_default()
            .push(result.clone());
        Ok(())
    }

    fn load_history(&self, user_id: &str) -> Result<Vec<SessionResult>> {
        Ok(Self::lock(&self.results)
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    fn load_result(&self, user_id: &str, session_id: &str) -> Result<Option<SessionResult>> {
        Ok(Self::lock(&self.results)
            .get(user_id)
            .and_then(|rs| rs.iter().find(|r| r.session_id == session_id).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockexam_core::model::{ExamPart, SessionState};

    #[test]
    fn clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        let snapshot = SessionSnapshot {
            exam_id: None,
            exam_part: ExamPart::PartA,
            exam_title: "A".into(),
            duration_minutes: 30,
            question_count: 1,
            started_at: Utc::now(),
            legacy_exam_id: None,
            question_ids: vec![],
            saved_at: None,
            state: SessionState::default(),
        };

        store.save_snapshot("u1", &snapshot).unwrap();
        assert_eq!(other.load_snapshot("u1").unwrap(), Some(snapshot));
        other.clear_snapshot("u1").unwrap();
        assert_eq!(store.load_snapshot("u1").unwrap(), None);
        assert!(store.load_history("u1").unwrap().is_empty());
    }
}
