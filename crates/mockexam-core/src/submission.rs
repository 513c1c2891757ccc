//! Submission pipeline.
//!
//! Turns the final state of an attempt into a remote summary write, a
//! best-effort legacy mirror, best-effort detail rows, a locally archived
//! result and a cleared snapshot. Only the summary write can fail the
//! submission; the snapshot is cleared only once the result is archived.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::archive::ResultArchive;
use crate::error::{schema_kind_of, RemoteError, SessionError};
use crate::model::{score_percentage, Answer, ExamProfile, Question, SessionResult, SessionSummary};
use crate::traits::{RemoteStore, SnapshotStore};

/// Context available to detail-row strategies.
pub struct DetailRowContext<'a> {
    pub session_id: &'a str,
    pub questions: &'a [Question],
    pub answered_at: DateTime<Utc>,
}

impl DetailRowContext<'_> {
    fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

/// One candidate shape for detail rows.
#[derive(Clone, Copy)]
pub struct DetailRowStrategy {
    pub name: &'static str,
    pub build: fn(&DetailRowContext<'_>, &Answer) -> serde_json::Value,
}

impl std::fmt::Debug for DetailRowStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailRowStrategy")
            .field("name", &self.name)
            .finish()
    }
}

fn full_row(ctx: &DetailRowContext<'_>, answer: &Answer) -> serde_json::Value {
    json!({
        "session_id": ctx.session_id,
        "question_id": answer.question_id,
        "selected_option_id": answer.selected_option_id,
        "is_correct": answer.is_correct,
        "time_taken_seconds": answer.time_taken_seconds,
        "answered_at": ctx.answered_at,
    })
}

fn normalized_row(ctx: &DetailRowContext<'_>, answer: &Answer) -> serde_json::Value {
    let selected_answer = answer.selected_option_id.as_deref().and_then(|option_id| {
        ctx.question(&answer.question_id)
            .and_then(|q| q.option(option_id))
            .map(|o| o.text.clone())
    });
    json!({
        "session_id": ctx.session_id,
        "question_id": answer.question_id,
        "selected_answer": selected_answer,
        "is_correct": answer.is_correct,
    })
}

/// Full row first, then one normalized fallback.
pub fn default_strategies() -> Vec<DetailRowStrategy> {
    vec![
        DetailRowStrategy {
            name: "full",
            build: full_row,
        },
        DetailRowStrategy {
            name: "normalized",
            build: normalized_row,
        },
    ]
}

/// Everything the pipeline needs from the finished attempt.
pub struct SubmissionRequest<'a> {
    pub user_id: &'a str,
    pub exam_id: &'a str,
    pub legacy_exam_id: Option<&'a str>,
    pub profile: &'a ExamProfile,
    pub questions: &'a [Question],
    pub answers: &'a [Answer],
    pub correct_answers: usize,
    pub flagged_count: usize,
    pub elapsed_seconds: u32,
    pub time_expired: bool,
    pub completed_at: DateTime<Utc>,
}

/// Outcome of the legacy mirror step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyOutcome {
    NotConfigured,
    Mirrored,
    Failed(String),
}

/// Outcome of the detail-row step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailRowOutcome {
    NoAnswers,
    Written { strategy: &'static str, rows: usize },
    Abandoned(String),
}

/// What a successful submission produced.
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    pub result: SessionResult,
    pub summary: SessionSummary,
    pub legacy: LegacyOutcome,
    pub detail_rows: DetailRowOutcome,
    /// Set when the local archive write failed. The snapshot is then kept so
    /// the attempt can be resumed and submitted again.
    pub archive_error: Option<String>,
}

/// Run `fut` under an optional deadline, mapping elapse to `RemoteError::Timeout`.
pub(crate) async fn with_watchdog<T, F>(limit: Option<Duration>, fut: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(limit.as_secs()).into()),
        },
        None => fut.await,
    }
}

/// Writes a finished attempt to the remote store and local archive.
pub struct SubmissionPipeline {
    remote: Arc<dyn RemoteStore>,
    snapshots: Arc<dyn SnapshotStore>,
    archive: ResultArchive,
    timeout: Option<Duration>,
    strategies: Vec<DetailRowStrategy>,
}

impl SubmissionPipeline {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        snapshots: Arc<dyn SnapshotStore>,
        archive: ResultArchive,
    ) -> Self {
        Self {
            remote,
            snapshots,
            archive,
            timeout: None,
            strategies: default_strategies(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<DetailRowStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Run the pipeline. On error nothing local has been touched, so the
    /// snapshot stays loadable and the attempt can be submitted again.
    pub async fn submit(
        &self,
        request: SubmissionRequest<'_>,
    ) -> Result<SubmissionReport, SessionError> {
        let total = request.questions.len();
        let score = score_percentage(request.correct_answers, total);
        let time_spent = request
            .elapsed_seconds
            .min(request.profile.duration_seconds());

        let summary = SessionSummary {
            score_percentage: score,
            correct_answers: request.correct_answers,
            total_questions: total,
            time_spent_seconds: time_spent,
            passed: request.profile.is_pass(score),
            time_expired: request.time_expired,
            completed_at: request.completed_at,
        };

        tracing::info!(
            session = request.exam_id,
            score,
            correct = request.correct_answers,
            total,
            "writing session summary"
        );

        with_watchdog(
            self.timeout,
            self.remote
                .update_session_summary(request.exam_id, &summary),
        )
        .await
        .map_err(|e| {
            tracing::error!(session = request.exam_id, "summary write failed: {e:#}");
            match e.downcast_ref::<RemoteError>() {
                Some(RemoteError::Timeout(secs)) => SessionError::SubmissionTimedOut(*secs),
                _ => SessionError::SummaryWriteFailed(format!("{e:#}")),
            }
        })?;

        let (legacy, detail_rows) = futures::join!(
            self.mirror_legacy(request.legacy_exam_id, &summary),
            self.write_detail_rows(&request),
        );

        let result = SessionResult {
            session_id: request.exam_id.to_string(),
            user_id: request.user_id.to_string(),
            exam_part: request.profile.part,
            exam_title: request.profile.title.clone(),
            completed_at: request.completed_at,
            score_percentage: score,
            total_questions: total,
            correct_answers: request.correct_answers,
            time_taken_seconds: time_spent,
            duration_minutes: request.profile.duration_minutes,
            flagged_count: request.flagged_count,
            passed: summary.passed,
            time_expired: request.time_expired,
            answers: request.answers.to_vec(),
            questions: request.questions.to_vec(),
        };

        let archive_error = match self.archive.append(&result) {
            Ok(()) => {
                if let Err(e) = self.snapshots.clear_snapshot(request.user_id) {
                    tracing::warn!(user = request.user_id, "failed to clear snapshot: {e:#}");
                }
                None
            }
            Err(e) => {
                tracing::error!(
                    session = request.exam_id,
                    "failed to archive result, keeping snapshot: {e:#}"
                );
                Some(format!("{e:#}"))
            }
        };

        Ok(SubmissionReport {
            result,
            summary,
            legacy,
            detail_rows,
            archive_error,
        })
    }

    async fn mirror_legacy(
        &self,
        legacy_exam_id: Option<&str>,
        summary: &SessionSummary,
    ) -> LegacyOutcome {
        let Some(legacy_id) = legacy_exam_id else {
            return LegacyOutcome::NotConfigured;
        };

        match with_watchdog(
            self.timeout,
            self.remote.update_legacy_summary(legacy_id, summary),
        )
        .await
        {
            Ok(()) => LegacyOutcome::Mirrored,
            Err(e) => {
                tracing::warn!(legacy = legacy_id, "legacy summary mirror failed: {e:#}");
                LegacyOutcome::Failed(format!("{e:#}"))
            }
        }
    }

    async fn write_detail_rows(&self, request: &SubmissionRequest<'_>) -> DetailRowOutcome {
        if request.answers.is_empty() {
            return DetailRowOutcome::NoAnswers;
        }

        let ctx = DetailRowContext {
            session_id: request.exam_id,
            questions: request.questions,
            answered_at: request.completed_at,
        };

        let mut last_error = String::from("no detail row strategies configured");
        for strategy in &self.strategies {
            let rows: Vec<serde_json::Value> = request
                .answers
                .iter()
                .map(|a| (strategy.build)(&ctx, a))
                .collect();

            match with_watchdog(
                self.timeout,
                self.remote
                    .insert_answer_detail_rows(request.exam_id, &rows),
            )
            .await
            {
                Ok(()) => {
                    tracing::debug!(
                        session = request.exam_id,
                        strategy = strategy.name,
                        rows = rows.len(),
                        "detail rows written"
                    );
                    return DetailRowOutcome::Written {
                        strategy: strategy.name,
                        rows: rows.len(),
                    };
                }
                Err(e) => match schema_kind_of(&e) {
                    Some(kind) => {
                        tracing::warn!(
                            session = request.exam_id,
                            strategy = strategy.name,
                            "detail rows rejected ({kind}), trying next shape"
                        );
                        last_error = format!("{e:#}");
                    }
                    None => {
                        tracing::warn!(
                            session = request.exam_id,
                            "detail row insert failed, continuing without: {e:#}"
                        );
                        return DetailRowOutcome::Abandoned(format!("{e:#}"));
                    }
                },
            }
        }

        tracing::warn!(
            session = request.exam_id,
            "no detail row shape accepted, continuing without: {last_error}"
        );
        DetailRowOutcome::Abandoned(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionOption;

    fn question() -> Question {
        Question {
            id: "q1".into(),
            prompt: "Pick".into(),
            options: vec![
                QuestionOption {
                    id: "o1".into(),
                    text: "Ten".into(),
                    is_correct: true,
                },
                QuestionOption {
                    id: "o2".into(),
                    text: "Five".into(),
                    is_correct: false,
                },
            ],
            explanation: None,
            category: None,
        }
    }

    #[test]
    fn full_row_shape() {
        let questions = vec![question()];
        let ctx = DetailRowContext {
            session_id: "s-1",
            questions: &questions,
            answered_at: Utc::now(),
        };
        let answer = Answer {
            question_id: "q1".into(),
            selected_option_id: Some("o2".into()),
            is_correct: false,
            time_taken_seconds: 42,
        };
        let row = full_row(&ctx, &answer);
        assert_eq!(row["session_id"], "s-1");
        assert_eq!(row["selected_option_id"], "o2");
        assert_eq!(row["time_taken_seconds"], 42);
        assert!(row.get("answered_at").is_some());
    }

    #[test]
    fn normalized_row_uses_option_text() {
        let questions = vec![question()];
        let ctx = DetailRowContext {
            session_id: "s-1",
            questions: &questions,
            answered_at: Utc::now(),
        };
        let answer = Answer {
            question_id: "q1".into(),
            selected_option_id: Some("o1".into()),
            is_correct: true,
            time_taken_seconds: 3,
        };
        let row = normalized_row(&ctx, &answer);
        assert_eq!(row["selected_answer"], "Ten");
        assert!(row.get("selected_option_id").is_none());

        let skipped = Answer {
            selected_option_id: None,
            ..answer
        };
        assert!(normalized_row(&ctx, &skipped)["selected_answer"].is_null());
    }

    #[test]
    fn default_strategy_order() {
        let names: Vec<&str> = default_strategies().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["full", "normalized"]);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, anyhow::Error>(())
        };
        let err = with_watchdog(Some(Duration::from_secs(5)), slow)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RemoteError>(),
            Some(RemoteError::Timeout(5))
        ));
    }
}
