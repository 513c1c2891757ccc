//! Core data model types for mockexam.
//!
//! These are the types the whole system passes around: questions as fetched
//! from the remote store, answers held by the ledger, the resumable snapshot
//! and the archived result of a completed attempt.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the two independently timed sub-assessments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamPart {
    /// Numeracy-focused part.
    PartA,
    /// Clinical-knowledge-focused part.
    PartB,
}

impl ExamPart {
    pub const ALL: [ExamPart; 2] = [ExamPart::PartA, ExamPart::PartB];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExamPart::PartA => "part_a",
            ExamPart::PartB => "part_b",
        }
    }
}

impl fmt::Display for ExamPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamPart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "part_a" | "a" => Ok(ExamPart::PartA),
            "part_b" | "b" => Ok(ExamPart::PartB),
            other => Err(format!("unknown exam part: {other}")),
        }
    }
}

/// A selectable answer for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// A single multiple-choice question. Immutable once fetched for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the question set.
    pub id: String,
    /// The question text shown to the candidate.
    pub prompt: String,
    /// Options in display order.
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    /// Shown after the answer has been checked.
    #[serde(default)]
    pub explanation: Option<String>,
    /// Category or subdivision tag.
    #[serde(default)]
    pub category: Option<String>,
}

impl Question {
    /// The first option flagged as correct. The source set is trusted to
    /// carry exactly one.
    pub fn correct_option(&self) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.is_correct)
    }

    pub fn option(&self, option_id: &str) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// Whether `option_id` matches the correct option.
    pub fn is_correct(&self, option_id: &str) -> bool {
        self.correct_option().is_some_and(|o| o.id == option_id)
    }
}

/// A recorded response to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    /// `None` means the question was skipped.
    pub selected_option_id: Option<String>,
    pub is_correct: bool,
    /// Seconds since exam start when the answer was recorded.
    pub time_taken_seconds: u32,
}

impl Answer {
    pub fn is_skipped(&self) -> bool {
        self.selected_option_id.is_none()
    }
}

/// Static description of an exam part: size, duration and pass mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamProfile {
    pub part: ExamPart,
    pub title: String,
    /// Upper bound on questions taken from the fetched set.
    pub question_count: usize,
    pub duration_minutes: u32,
    /// Minimum score percentage for a pass.
    pub pass_mark: u32,
}

impl ExamProfile {
    /// Built-in profile for a part.
    pub fn default_for(part: ExamPart) -> Self {
        match part {
            ExamPart::PartA => Self {
                part,
                title: "Part A — Numeracy".to_string(),
                question_count: 15,
                duration_minutes: 30,
                pass_mark: 100,
            },
            ExamPart::PartB => Self {
                part,
                title: "Part B — Clinical Knowledge".to_string(),
                question_count: 100,
                duration_minutes: 150,
                pass_mark: 60,
            },
        }
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_minutes.saturating_mul(60)
    }

    pub fn is_pass(&self, score_percentage: u32) -> bool {
        score_percentage >= self.pass_mark
    }
}

/// The mutable part of an in-progress attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub current_index: usize,
    /// Whether the current question has been checked.
    #[serde(default)]
    pub submitted: bool,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub flagged: BTreeSet<String>,
    pub time_left_seconds: u32,
    pub elapsed_seconds: u32,
}

/// Durable, resumable serialization of an in-progress attempt.
///
/// At most one snapshot exists per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Remote session id; absent until remote creation succeeded.
    pub exam_id: Option<String>,
    pub exam_part: ExamPart,
    pub exam_title: String,
    pub duration_minutes: u32,
    pub question_count: usize,
    pub started_at: DateTime<Utc>,
    /// Id of the mirrored record in the legacy table.
    #[serde(default)]
    pub legacy_exam_id: Option<String>,
    /// Ordered ids of the question set in play.
    #[serde(default)]
    pub question_ids: Vec<String>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    pub state: SessionState,
}

/// Identifiers returned by the remote layer when a session record is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedSession {
    pub session_id: String,
    #[serde(default)]
    pub legacy_session_id: Option<String>,
}

/// Aggregate written to the remote session record on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub score_percentage: u32,
    pub correct_answers: usize,
    pub total_questions: usize,
    pub time_spent_seconds: u32,
    pub passed: bool,
    pub time_expired: bool,
    pub completed_at: DateTime<Utc>,
}

/// Archived outcome of a completed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_id: String,
    pub user_id: String,
    pub exam_part: ExamPart,
    pub exam_title: String,
    pub completed_at: DateTime<Utc>,
    pub score_percentage: u32,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub time_taken_seconds: u32,
    pub duration_minutes: u32,
    pub flagged_count: usize,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub time_expired: bool,
    pub answers: Vec<Answer>,
    /// Frozen copy of the question set, for review without re-fetching.
    pub questions: Vec<Question>,
}

impl SessionResult {
    /// Answers with a selection; skipped entries are excluded.
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| !a.is_skipped()).count()
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&Answer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }
}

/// `round(correct / total * 100)`, or 0 for an empty set.
pub fn score_percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> Question {
        Question {
            id: "q1".into(),
            prompt: "2 + 2?".into(),
            options: vec![
                QuestionOption {
                    id: "a".into(),
                    text: "3".into(),
                    is_correct: false,
                },
                QuestionOption {
                    id: "b".into(),
                    text: "4".into(),
                    is_correct: true,
                },
            ],
            explanation: None,
            category: Some("arithmetic".into()),
        }
    }

    #[test]
    fn exam_part_display_and_parse() {
        assert_eq!(ExamPart::PartA.to_string(), "part_a");
        assert_eq!("part_b".parse::<ExamPart>().unwrap(), ExamPart::PartB);
        assert_eq!("Part-A".parse::<ExamPart>().unwrap(), ExamPart::PartA);
        assert_eq!("b".parse::<ExamPart>().unwrap(), ExamPart::PartB);
        assert!("part_c".parse::<ExamPart>().is_err());
    }

    #[test]
    fn exam_part_serializes_snake_case() {
        let json = serde_json::to_string(&ExamPart::PartB).unwrap();
        assert_eq!(json, "\"part_b\"");
    }

    #[test]
    fn correct_option_lookup() {
        let q = question();
        assert_eq!(q.correct_option().map(|o| o.id.as_str()), Some("b"));
        assert!(q.is_correct("b"));
        assert!(!q.is_correct("a"));
        assert!(!q.is_correct("missing"));
    }

    #[test]
    fn score_rounds_to_nearest() {
        assert_eq!(score_percentage(1, 3), 33);
        assert_eq!(score_percentage(2, 3), 67);
        assert_eq!(score_percentage(15, 15), 100);
        assert_eq!(score_percentage(0, 0), 0);
    }

    #[test]
    fn default_profiles() {
        let a = ExamProfile::default_for(ExamPart::PartA);
        assert_eq!(a.duration_seconds(), 1800);
        assert!(a.is_pass(100));
        assert!(!a.is_pass(99));

        let b = ExamProfile::default_for(ExamPart::PartB);
        assert_eq!(b.question_count, 100);
        assert!(b.is_pass(60));
    }

    #[test]
    fn snapshot_tolerates_missing_optional_fields() {
        let json = r#"{
            "exam_id": "s-1",
            "exam_part": "part_a",
            "exam_title": "Part A",
            "duration_minutes": 30,
            "question_count": 15,
            "started_at": "2025-01-01T00:00:00Z",
            "state": {
                "current_index": 2,
                "time_left_seconds": 1700,
                "elapsed_seconds": 100
            }
        }"#;
        let snapshot: SessionSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.legacy_exam_id.is_none());
        assert!(snapshot.question_ids.is_empty());
        assert!(snapshot.state.answers.is_empty());
        assert_eq!(snapshot.state.current_index, 2);
    }
}
