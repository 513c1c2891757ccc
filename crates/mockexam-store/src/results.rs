//! File-backed result archive.
//!
//! Results are appended as JSON lines to `<data_dir>/results/<user>.jsonl`.
//! Malformed lines are skipped on read.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;

use mockexam_core::model::SessionResult;
use mockexam_core::traits::ResultStore;

use crate::error::{user_key, StoreError};

#[derive(Debug, Clone)]
pub struct FileResultStore {
    dir: PathBuf,
}

impl FileResultStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("results"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.dir.join(format!("{}.jsonl", user_key(user_id)?)))
    }
}

impl ResultStore for FileResultStore {
    fn append_result(&self, user_id: &str, result: &SessionResult) -> Result<()> {
        let path = self.path_for(user_id)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let mut line = serde_json::to_string(result).map_err(|e| StoreError::malformed(&path, e))?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|e| StoreError::io(&path, e))?;

        tracing::debug!(
            user = user_id,
            session = %result.session_id,
            "result archived to {}",
            path.display()
        );
        Ok(())
    }

    fn load_history(&self, user_id: &str) -> Result<Vec<SessionResult>> {
        let path = self.path_for(user_id)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&path, e).into()),
        };

        let mut results = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SessionResult>(line) {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::warn!("skipping {}:{}: {e}", path.display(), lineno + 1);
                }
            }
        }
        Ok(results)
    }

    fn load_result(&self, user_id: &str, session_id: &str) -> Result<Option<SessionResult>> {
        Ok(self
            .load_history(user_id)?
            .into_iter()
            .rev()
            .find(|r| r.session_id == session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockexam_core::model::ExamPart;
    use uuid::Uuid;

    fn result(user_id: &str, score: u32) -> SessionResult {
        SessionResult {
            session_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            exam_part: ExamPart::PartB,
            exam_title: "Part B".into(),
            completed_at: Utc::now(),
            score_percentage: score,
            total_questions: 100,
            correct_answers: score as usize,
            time_taken_seconds: 4000,
            duration_minutes: 150,
            flagged_count: 3,
            passed: score >= 60,
            time_expired: false,
            answers: vec![],
            questions: vec![],
        }
    }

    #[test]
    fn append_and_load_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path());
        let first = result("u1", 55);
        let second = result("u1", 72);

        store.append_result("u1", &first).unwrap();
        store.append_result("u1", &second).unwrap();
        store.append_result("u2", &result("u2", 10)).unwrap();

        let history = store.load_history("u1").unwrap();
        assert_eq!(history, vec![first.clone(), second]);
        assert_eq!(
            store.load_result("u1", &first.session_id).unwrap(),
            Some(first)
        );
        assert_eq!(store.load_result("u2", "missing").unwrap(), None);
    }

    #[test]
    fn empty_history_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path());
        assert!(store.load_history("nobody").unwrap().is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileResultStore::new(dir.path());
        let good = result("u1", 80);
        store.append_result("u1", &good).unwrap();

        let path = store.dir().join("u1.jsonl");
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{\"truncated\": \n\n");
        std::fs::write(&path, content).unwrap();

        assert_eq!(store.load_history("u1").unwrap(), vec![good]);
    }
}
