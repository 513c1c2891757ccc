//! Offline backend.
//!
//! Serves questions from a directory of TOML question banks and records
//! sessions, summaries and detail rows as JSON under a data directory.
//! Session ids are UUID v4; legacy records are never created.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use mockexam_core::error::RemoteError;
use mockexam_core::model::{CreatedSession, ExamPart, Question, SessionSummary};
use mockexam_core::parser::load_bank_directory;
use mockexam_core::traits::RemoteStore;

/// A session record as stored by the offline backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSessionRecord {
    pub id: String,
    pub user_id: String,
    pub exam_part: ExamPart,
    pub total_questions: usize,
    pub status: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub summary: Option<SessionSummary>,
}

pub struct LocalRemote {
    bank_dir: PathBuf,
    records_dir: PathBuf,
}

impl LocalRemote {
    /// Records are written under `<data_dir>/remote`.
    pub fn new(bank_dir: &Path, data_dir: &Path) -> Self {
        Self {
            bank_dir: bank_dir.to_path_buf(),
            records_dir: data_dir.join("remote"),
        }
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.records_dir
            .join("sessions")
            .join(format!("{session_id}.json"))
    }

    fn answers_path(&self, session_id: &str) -> PathBuf {
        self.records_dir
            .join("answers")
            .join(format!("{session_id}.jsonl"))
    }

    /// Read a session record back, e.g. for inspection in tests.
    pub async fn load_session(&self, session_id: &str) -> anyhow::Result<LocalSessionRecord> {
        if Uuid::parse_str(session_id).is_err() {
            return Err(RemoteError::NotFound(session_id.to_string()).into());
        }
        let path = self.session_path(session_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RemoteError::NotFound(session_id.to_string()).into())
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse session record {}", path.display()))
    }

    /// Detail rows written for a session, in insertion order.
    pub async fn load_detail_rows(
        &self,
        session_id: &str,
    ) -> anyhow::Result<Vec<serde_json::Value>> {
        let path = self.answers_path(session_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).context("malformed detail row"))
            .collect()
    }

    async fn write_session(&self, record: &LocalSessionRecord) -> anyhow::Result<()> {
        let path = self.session_path(&record.id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

#[async_trait]
impl RemoteStore for LocalRemote {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch_questions(&self, part: ExamPart) -> anyhow::Result<Vec<Question>> {
        let banks = load_bank_directory(&self.bank_dir)
            .with_context(|| format!("failed to load question banks for {part}"))?;

        let questions: Vec<Question> = banks
            .into_iter()
            .filter(|b| b.part == part)
            .flat_map(|b| b.questions)
            .collect();
        tracing::debug!(%part, count = questions.len(), "loaded offline questions");
        Ok(questions)
    }

    async fn create_session(
        &self,
        user_id: &str,
        part: ExamPart,
        total_questions: usize,
    ) -> anyhow::Result<CreatedSession> {
        let record = LocalSessionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            exam_part: part,
            total_questions,
            status: "in_progress".into(),
            started_at: Utc::now(),
            summary: None,
        };
        self.write_session(&record).await?;

        Ok(CreatedSession {
            session_id: record.id,
            legacy_session_id: None,
        })
    }

    async fn update_session_summary(
        &self,
        session_id: &str,
        summary: &SessionSummary,
    ) -> anyhow::Result<()> {
        let mut record = self.load_session(session_id).await?;
        record.status = "completed".into();
        record.summary = Some(summary.clone());
        self.write_session(&record).await
    }

    async fn update_legacy_summary(
        &self,
        legacy_session_id: &str,
        _summary: &SessionSummary,
    ) -> anyhow::Result<()> {
        Err(RemoteError::NotFound(format!("legacy record {legacy_session_id}")).into())
    }

    async fn insert_answer_detail_rows(
        &self,
        session_id: &str,
        rows: &[serde_json::Value],
    ) -> anyhow::Result<()> {
        let path = self.answers_path(session_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut buf = String::new();
        for row in rows {
            buf.push_str(&serde_json::to_string(row)?);
            buf.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK: &str = r#"
[bank]
part = "part_b"
title = "Clinical"

[[questions]]
id = "b1"
prompt = "First-line treatment?"
[[questions.options]]
id = "b1-a"
text = "Fluids"
correct = true
[[questions.options]]
id = "b1-b"
text = "Rest"
"#;

    fn remote() -> (tempfile::TempDir, LocalRemote) {
        let dir = tempfile::tempdir().unwrap();
        let banks = dir.path().join("banks");
        std::fs::create_dir_all(&banks).unwrap();
        std::fs::write(banks.join("part_b.toml"), BANK).unwrap();
        let remote = LocalRemote::new(&banks, &dir.path().join("data"));
        (dir, remote)
    }

    #[tokio::test]
    async fn fetch_filters_by_part() {
        let (_dir, remote) = remote();
        assert_eq!(remote.fetch_questions(ExamPart::PartB).await.unwrap().len(), 1);
        assert!(remote.fetch_questions(ExamPart::PartA).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let (_dir, remote) = remote();
        let created = remote
            .create_session("u1", ExamPart::PartB, 1)
            .await
            .unwrap();
        assert!(Uuid::parse_str(&created.session_id).is_ok());
        assert_eq!(created.legacy_session_id, None);

        let summary = SessionSummary {
            score_percentage: 100,
            correct_answers: 1,
            total_questions: 1,
            time_spent_seconds: 20,
            passed: true,
            time_expired: false,
            completed_at: Utc::now(),
        };
        remote
            .update_session_summary(&created.session_id, &summary)
            .await
            .unwrap();
        remote
            .insert_answer_detail_rows(
                &created.session_id,
                &[serde_json::json!({"question_id": "b1", "is_correct": true})],
            )
            .await
            .unwrap();

        let record = remote.load_session(&created.session_id).await.unwrap();
        assert_eq!(record.status, "completed");
        assert_eq!(record.summary, Some(summary));
        let rows = remote.load_detail_rows(&created.session_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["question_id"], "b1");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (_dir, remote) = remote();
        let summary = SessionSummary {
            score_percentage: 0,
            correct_answers: 0,
            total_questions: 1,
            time_spent_seconds: 0,
            passed: false,
            time_expired: true,
            completed_at: Utc::now(),
        };
        for id in [Uuid::new_v4().to_string(), "../escape".to_string()] {
            let err = remote.update_session_summary(&id, &summary).await.unwrap_err();
            assert!(matches!(
                err.downcast_ref::<RemoteError>(),
                Some(RemoteError::NotFound(_))
            ));
        }
        assert!(remote.update_legacy_summary("1", &summary).await.is_err());
    }
}
