//! Local archive of completed results.
//!
//! Thin policy layer over a [`ResultStore`]: ordering, lookup of the previous
//! attempt for trend display, and the "already archived" check used when
//! deciding whether a snapshot is stale.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ExamPart, SessionResult};
use crate::traits::ResultStore;

/// Change against the previous attempt at the same part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub previous_session_id: String,
    pub previous_score: u32,
    /// Percentage points, positive when the new attempt scored higher.
    pub score_change: i64,
    /// Seconds, positive when the new attempt took longer.
    pub time_change: i64,
}

/// Append-only history of completed sessions.
#[derive(Clone)]
pub struct ResultArchive {
    store: Arc<dyn ResultStore>,
}

impl ResultArchive {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self { store }
    }

    pub fn append(&self, result: &SessionResult) -> Result<()> {
        self.store.append_result(&result.user_id, result)
    }

    pub fn get_by_id(&self, user_id: &str, session_id: &str) -> Result<Option<SessionResult>> {
        self.store.load_result(user_id, session_id)
    }

    pub fn contains(&self, user_id: &str, session_id: &str) -> Result<bool> {
        Ok(self.get_by_id(user_id, session_id)?.is_some())
    }

    /// All results for the user, most recent first.
    pub fn history(&self, user_id: &str) -> Result<Vec<SessionResult>> {
        let mut results = self.store.load_history(user_id)?;
        results.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(results)
    }

    /// Most recent result for `part` completed strictly before `before`.
    pub fn previous_attempt(
        &self,
        user_id: &str,
        part: ExamPart,
        before: DateTime<Utc>,
    ) -> Result<Option<SessionResult>> {
        Ok(self
            .history(user_id)?
            .into_iter()
            .find(|r| r.exam_part == part && r.completed_at < before))
    }

    /// Compare `result` with the attempt at the same part that preceded it.
    pub fn score_delta(&self, result: &SessionResult) -> Result<Option<ScoreDelta>> {
        let previous =
            self.previous_attempt(&result.user_id, result.exam_part, result.completed_at)?;
        Ok(previous.map(|prev| ScoreDelta {
            score_change: i64::from(result.score_percentage) - i64::from(prev.score_percentage),
            time_change: i64::from(result.time_taken_seconds)
                - i64::from(prev.time_taken_seconds),
            previous_score: prev.score_percentage,
            previous_session_id: prev.session_id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::{Duration, TimeZone, Utc};

    #[derive(Default)]
    struct VecStore {
        results: Mutex<Vec<SessionResult>>,
    }

    impl ResultStore for VecStore {
        fn append_result(&self, _user_id: &str, result: &SessionResult) -> Result<()> {
            self.results.lock().unwrap().push(result.clone());
            Ok(())
        }

        fn load_history(&self, user_id: &str) -> Result<Vec<SessionResult>> {
            Ok(self
                .results
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect())
        }

        fn load_result(&self, user_id: &str, session_id: &str) -> Result<Option<SessionResult>> {
            Ok(self
                .load_history(user_id)?
                .into_iter()
                .find(|r| r.session_id == session_id))
        }
    }

    fn result(id: &str, part: ExamPart, minutes_ago: i64, score: u32) -> SessionResult {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        SessionResult {
            session_id: id.into(),
            user_id: "u1".into(),
            exam_part: part,
            exam_title: "t".into(),
            completed_at: base - Duration::minutes(minutes_ago),
            score_percentage: score,
            total_questions: 10,
            correct_answers: (score / 10) as usize,
            time_taken_seconds: 100 + score,
            duration_minutes: 30,
            flagged_count: 0,
            passed: false,
            time_expired: false,
            answers: vec![],
            questions: vec![],
        }
    }

    #[test]
    fn history_is_most_recent_first() {
        let archive = ResultArchive::new(Arc::new(VecStore::default()));
        archive.append(&result("old", ExamPart::PartA, 60, 40)).unwrap();
        archive.append(&result("new", ExamPart::PartA, 5, 70)).unwrap();
        archive.append(&result("mid", ExamPart::PartB, 30, 50)).unwrap();

        let ids: Vec<String> = archive
            .history("u1")
            .unwrap()
            .into_iter()
            .map(|r| r.session_id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        assert!(archive.history("someone-else").unwrap().is_empty());
    }

    #[test]
    fn score_delta_uses_previous_attempt_of_same_part() {
        let archive = ResultArchive::new(Arc::new(VecStore::default()));
        archive.append(&result("a1", ExamPart::PartA, 60, 40)).unwrap();
        archive.append(&result("b1", ExamPart::PartB, 30, 90)).unwrap();
        let latest = result("a2", ExamPart::PartA, 0, 70);
        archive.append(&latest).unwrap();

        let delta = archive.score_delta(&latest).unwrap().unwrap();
        assert_eq!(delta.previous_session_id, "a1");
        assert_eq!(delta.score_change, 30);
        assert_eq!(delta.time_change, 30);
    }

    #[test]
    fn score_delta_of_older_result_ignores_newer_attempts() {
        let archive = ResultArchive::new(Arc::new(VecStore::default()));
        let first = result("a1", ExamPart::PartA, 120, 40);
        let middle = result("a2", ExamPart::PartA, 60, 50);
        archive.append(&first).unwrap();
        archive.append(&middle).unwrap();
        archive.append(&result("a3", ExamPart::PartA, 0, 90)).unwrap();

        let delta = archive.score_delta(&middle).unwrap().unwrap();
        assert_eq!(delta.previous_session_id, "a1");
        assert_eq!(delta.score_change, 10);
        assert!(archive.score_delta(&first).unwrap().is_none());

        let before = Utc.with_ymd_and_hms(2025, 6, 1, 11, 30, 0).unwrap();
        let previous = archive
            .previous_attempt("u1", ExamPart::PartA, before)
            .unwrap()
            .unwrap();
        assert_eq!(previous.session_id, "a2");
    }

    #[test]
    fn first_attempt_has_no_delta() {
        let archive = ResultArchive::new(Arc::new(VecStore::default()));
        let only = result("a1", ExamPart::PartA, 0, 70);
        archive.append(&only).unwrap();
        assert!(archive.score_delta(&only).unwrap().is_none());
        assert!(archive.contains("u1", "a1").unwrap());
        assert!(!archive.contains("u1", "zzz").unwrap());
    }
}
