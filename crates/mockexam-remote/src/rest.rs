//! PostgREST (Supabase-style) remote backend.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use mockexam_core::error::{RemoteError, SchemaErrorKind};
use mockexam_core::model::{CreatedSession, ExamPart, Question, QuestionOption, SessionSummary};
use mockexam_core::traits::RemoteStore;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Table names used by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestTables {
    pub questions: String,
    pub sessions: String,
    /// Legacy summary table. Empty disables the legacy mirror.
    pub legacy_sessions: String,
    pub answers: String,
}

impl Default for RestTables {
    fn default() -> Self {
        Self {
            questions: "questions".into(),
            sessions: "exam_sessions".into(),
            legacy_sessions: "mock_exams".into(),
            answers: "exam_answers".into(),
        }
    }
}

/// HTTP client for a PostgREST endpoint.
pub struct RestRemote {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    tables: RestTables,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl RestRemote {
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        Self::build(base_url, api_key, DEFAULT_TIMEOUT_SECS)
    }

    fn build(base_url: &str, api_key: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RemoteError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: None,
            tables: RestTables::default(),
            timeout_secs,
            client,
        })
    }

    /// Bearer token for row-level security. Defaults to the API key.
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    pub fn with_tables(mut self, tables: RestTables) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_timeout(self, timeout_secs: u64) -> anyhow::Result<Self> {
        let rebuilt = Self::build(&self.base_url, &self.api_key, timeout_secs)?;
        Ok(Self {
            access_token: self.access_token,
            tables: self.tables,
            ..rebuilt
        })
    }

    fn url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout(self.timeout_secs)
            } else {
                RemoteError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status < 400 {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }

    async fn insert_returning_id(
        &self,
        table: &str,
        row: &serde_json::Value,
    ) -> Result<String, RemoteError> {
        let response = self
            .send(
                self.request(reqwest::Method::POST, self.url(table))
                    .header("Prefer", "return=representation")
                    .json(row),
            )
            .await?;

        let rows: Vec<IdRow> = response.json().await.map_err(|e| RemoteError::Api {
            status: 0,
            message: format!("failed to parse response: {e}"),
        })?;
        rows.into_iter()
            .next()
            .map(|r| r.id.into_string())
            .ok_or_else(|| RemoteError::Api {
                status: 0,
                message: format!("insert into {table} returned no rows"),
            })
    }

    async fn patch_by_id(
        &self,
        table: &str,
        id: &str,
        body: &serde_json::Value,
    ) -> Result<(), RemoteError> {
        let response = self
            .send(
                self.request(
                    reqwest::Method::PATCH,
                    format!("{}?id=eq.{}", self.url(table), id),
                )
                .header("Prefer", "return=representation")
                .json(body),
            )
            .await?;

        let rows: Vec<serde_json::Value> = response.json().await.unwrap_or_default();
        if rows.is_empty() {
            return Err(RemoteError::NotFound(format!("{table}/{id}")));
        }
        Ok(())
    }
}

/// Map an HTTP error response to a [`RemoteError`].
fn classify_error(status: u16, body: &str) -> RemoteError {
    let parsed: Option<PostgrestError> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|p| p.message.clone())
        .unwrap_or_else(|| body.to_string());

    if let Some(kind) = parsed
        .as_ref()
        .and_then(|p| p.code.as_deref())
        .and_then(SchemaErrorKind::from_code)
    {
        return RemoteError::Schema { kind, message };
    }
    if status == 404 {
        return RemoteError::NotFound(message);
    }
    RemoteError::Api { status, message }
}

#[derive(Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Primary keys come back as numbers or strings depending on the table.
#[derive(Deserialize)]
#[serde(untagged)]
enum RowId {
    Text(String),
    Number(i64),
}

impl RowId {
    fn into_string(self) -> String {
        match self {
            RowId::Text(s) => s,
            RowId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct IdRow {
    id: RowId,
}

#[derive(Deserialize)]
struct QuestionRow {
    id: RowId,
    #[serde(alias = "question_text")]
    prompt: String,
    #[serde(default)]
    options: Vec<OptionRow>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default, alias = "subdivision")]
    category: Option<String>,
}

#[derive(Deserialize)]
struct OptionRow {
    id: RowId,
    text: String,
    #[serde(default)]
    is_correct: bool,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: row.id.into_string(),
            prompt: row.prompt,
            options: row
                .options
                .into_iter()
                .map(|o| QuestionOption {
                    id: o.id.into_string(),
                    text: o.text,
                    is_correct: o.is_correct,
                })
                .collect(),
            explanation: row.explanation,
            category: row.category,
        }
    }
}

#[async_trait]
impl RemoteStore for RestRemote {
    fn name(&self) -> &str {
        "rest"
    }

    #[instrument(skip(self))]
    async fn fetch_questions(&self, part: ExamPart) -> anyhow::Result<Vec<Question>> {
        let url = format!(
            "{}?exam_part=eq.{}&select=*&order=position.asc",
            self.url(&self.tables.questions),
            part.as_str()
        );
        let response = self.send(self.request(reqwest::Method::GET, url)).await?;

        let rows: Vec<QuestionRow> = response.json().await.map_err(|e| RemoteError::Api {
            status: 0,
            message: format!("failed to parse questions: {e}"),
        })?;
        tracing::debug!(count = rows.len(), "fetched questions");
        Ok(rows.into_iter().map(Question::from).collect())
    }

    #[instrument(skip(self))]
    async fn create_session(
        &self,
        user_id: &str,
        part: ExamPart,
        total_questions: usize,
    ) -> anyhow::Result<CreatedSession> {
        let started_at = Utc::now();
        let session_id = self
            .insert_returning_id(
                &self.tables.sessions,
                &json!({
                    "user_id": user_id,
                    "exam_part": part.as_str(),
                    "total_questions": total_questions,
                    "status": "in_progress",
                    "started_at": started_at,
                }),
            )
            .await?;

        let legacy_session_id = if self.tables.legacy_sessions.is_empty() {
            None
        } else {
            match self
                .insert_returning_id(
                    &self.tables.legacy_sessions,
                    &json!({
                        "user_id": user_id,
                        "exam_type": part.as_str(),
                        "total_questions": total_questions,
                        "started_at": started_at,
                    }),
                )
                .await
            {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!("legacy session record not created: {e}");
                    None
                }
            }
        };

        Ok(CreatedSession {
            session_id,
            legacy_session_id,
        })
    }

    #[instrument(skip(self, summary))]
    async fn update_session_summary(
        &self,
        session_id: &str,
        summary: &SessionSummary,
    ) -> anyhow::Result<()> {
        self.patch_by_id(
            &self.tables.sessions,
            session_id,
            &json!({
                "status": "completed",
                "score_percentage": summary.score_percentage,
                "correct_answers": summary.correct_answers,
                "total_questions": summary.total_questions,
                "time_spent_seconds": summary.time_spent_seconds,
                "passed": summary.passed,
                "time_expired": summary.time_expired,
                "completed_at": summary.completed_at,
            }),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, summary))]
    async fn update_legacy_summary(
        &self,
        legacy_session_id: &str,
        summary: &SessionSummary,
    ) -> anyhow::Result<()> {
        self.patch_by_id(
            &self.tables.legacy_sessions,
            legacy_session_id,
            &json!({
                "score": summary.score_percentage,
                "correct_answers": summary.correct_answers,
                "total_questions": summary.total_questions,
                "time_spent": summary.time_spent_seconds,
                "completed_at": summary.completed_at,
            }),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn insert_answer_detail_rows(
        &self,
        session_id: &str,
        rows: &[serde_json::Value],
    ) -> anyhow::Result<()> {
        self.send(
            self.request(reqwest::Method::POST, self.url(&self.tables.answers))
                .header("Prefer", "return=minimal")
                .json(rows),
        )
        .await?;
        Ok(())
    }
}
