//! Session state machine.
//!
//! One [`ExamSession`] runs one attempt at one exam part:
//! `Uninitialized → Hydrating → Active → Submitting → Completed`, with
//! `Failed` reachable from hydration and submission. All operations take
//! `&mut self`; the countdown tick is the only recurring event and is fed
//! in by the host through [`ExamSession::tick`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::archive::ResultArchive;
use crate::countdown::{Countdown, CountdownEvent, IntervalScheduler, TickScheduler};
use crate::error::SessionError;
use crate::ledger::AnswerLedger;
use crate::model::{Answer, ExamProfile, Question, SessionSnapshot, SessionState};
use crate::submission::{with_watchdog, SubmissionPipeline, SubmissionReport, SubmissionRequest};
use crate::traits::{RemoteStore, SnapshotStore};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Hydrating,
    Active,
    Submitting,
    Completed,
    /// `retryable` means the ledger is intact and `finish` may run again.
    Failed { retryable: bool },
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Uninitialized => write!(f, "uninitialized"),
            SessionPhase::Hydrating => write!(f, "hydrating"),
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::Submitting => write!(f, "submitting"),
            SessionPhase::Completed => write!(f, "completed"),
            SessionPhase::Failed { .. } => write!(f, "failed"),
        }
    }
}

/// Sub-mode of the current question while Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    Unanswered,
    /// Checked; feedback is shown and the answer can no longer change.
    Submitted,
}

impl fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerMode::Unanswered => write!(f, "unanswered"),
            AnswerMode::Submitted => write!(f, "submitted"),
        }
    }
}

/// How elapsed time is treated when resuming from a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockPolicy {
    /// Only delivered ticks count; time spent suspended is not charged.
    #[default]
    TickCounted,
    /// Charge wall-clock time since `started_at` on resume.
    WallClock,
}

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline for each remote call; `None` waits indefinitely.
    pub remote_timeout: Option<Duration>,
    /// Persist the snapshot every N ticks (0 disables tick persistence).
    pub persist_every_ticks: u32,
    pub clock_policy: ClockPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            remote_timeout: Some(Duration::from_secs(30)),
            persist_every_ticks: 1,
            clock_policy: ClockPolicy::TickCounted,
        }
    }
}

/// How `start` got to Active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Fresh { exam_id: String },
    Resumed { exam_id: String, current_index: usize },
}

/// Returned by `check_answer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub question_id: String,
    pub selected_option_id: Option<String>,
    pub is_correct: bool,
    pub correct_option_id: Option<String>,
    pub explanation: Option<String>,
}

/// Result of `next`.
#[derive(Debug)]
pub enum Navigation {
    Moved { index: usize, mode: AnswerMode },
    Finished(Box<SubmissionReport>),
}

/// Result of `tick`.
#[derive(Debug)]
pub enum TickOutcome {
    Inert,
    Ticked { time_left: u32 },
    Expired(Box<SubmissionReport>),
}

/// A resumable, countdown-bound attempt at one exam part.
pub struct ExamSession {
    user_id: String,
    profile: ExamProfile,
    config: SessionConfig,
    remote: Arc<dyn RemoteStore>,
    snapshots: Arc<dyn SnapshotStore>,
    archive: ResultArchive,
    scheduler: Box<dyn TickScheduler>,

    phase: SessionPhase,
    questions: Vec<Question>,
    ledger: AnswerLedger,
    flags: BTreeSet<String>,
    current_index: usize,
    mode: AnswerMode,
    pending: Option<String>,
    countdown: Countdown,
    exam_id: Option<String>,
    legacy_exam_id: Option<String>,
    started_at: chrono::DateTime<Utc>,
    ticks_since_persist: u32,
    /// Sticky once a submission was forced by expiry, so retries report it.
    time_expired: bool,
}

impl ExamSession {
    pub fn new(
        user_id: impl Into<String>,
        profile: ExamProfile,
        remote: Arc<dyn RemoteStore>,
        snapshots: Arc<dyn SnapshotStore>,
        archive: ResultArchive,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            profile,
            config: SessionConfig::default(),
            remote,
            snapshots,
            archive,
            scheduler: Box::new(IntervalScheduler::every_second()),
            phase: SessionPhase::Uninitialized,
            questions: Vec::new(),
            ledger: AnswerLedger::new(),
            flags: BTreeSet::new(),
            current_index: 0,
            mode: AnswerMode::Unanswered,
            pending: None,
            countdown: Countdown::new(),
            exam_id: None,
            legacy_exam_id: None,
            started_at: Utc::now(),
            ticks_since_persist: 0,
            time_expired: false,
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Box<dyn TickScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    // -----------------------------------------------------------------------
    // Hydration
    // -----------------------------------------------------------------------

    /// Resume the user's snapshot for this part, or create a fresh remote
    /// session. Refuses without a state change if the user has an
    /// in-progress attempt at the other part.
    pub async fn start(&mut self) -> Result<StartOutcome, SessionError> {
        self.require_phase("start", SessionPhase::Uninitialized)?;

        let existing = self.load_snapshot();
        if let Some(snapshot) = &existing {
            if snapshot.exam_part != self.profile.part {
                return Err(SessionError::ConflictingSnapshot {
                    existing: snapshot.exam_part,
                    requested: self.profile.part,
                });
            }
        }

        self.phase = SessionPhase::Hydrating;
        tracing::info!(user = %self.user_id, part = %self.profile.part, "hydrating session");

        let fetched = match with_watchdog(
            self.config.remote_timeout,
            self.remote.fetch_questions(self.profile.part),
        )
        .await
        {
            Ok(questions) => questions,
            Err(e) => {
                tracing::error!(part = %self.profile.part, "question fetch failed: {e:#}");
                self.phase = SessionPhase::Failed { retryable: false };
                return Err(SessionError::QuestionFetchFailed(format!("{e:#}")));
            }
        };
        if fetched.is_empty() {
            self.phase = SessionPhase::Failed { retryable: false };
            return Err(SessionError::NoQuestions(self.profile.part));
        }

        if let Some(snapshot) = existing {
            match self.resumable_questions(&snapshot, &fetched) {
                Ok(questions) => return self.resume_from(snapshot, questions).await,
                Err(reason) => {
                    tracing::warn!(user = %self.user_id, "discarding stale snapshot: {reason}");
                    if let Err(e) = self.snapshots.clear_snapshot(&self.user_id) {
                        tracing::warn!(
                            user = %self.user_id,
                            "failed to clear stale snapshot: {e:#}"
                        );
                    }
                }
            }
        }

        self.begin_fresh(fetched).await
    }

    /// Order the fetched set the way the snapshot saw it, or explain why the
    /// snapshot cannot be resumed.
    fn resumable_questions(
        &self,
        snapshot: &SessionSnapshot,
        fetched: &[Question],
    ) -> Result<Vec<Question>, String> {
        if let Some(exam_id) = &snapshot.exam_id {
            match self.archive.contains(&self.user_id, exam_id) {
                Ok(true) => return Err(format!("session {exam_id} is already archived")),
                Ok(false) => {}
                Err(e) => tracing::warn!("archive lookup failed, assuming not archived: {e:#}"),
            }
        }

        if snapshot.question_ids.is_empty() {
            let count = snapshot.question_count.clamp(1, fetched.len());
            return Ok(fetched[..count].to_vec());
        }

        snapshot
            .question_ids
            .iter()
            .map(|id| {
                fetched
                    .iter()
                    .find(|q| &q.id == id)
                    .cloned()
                    .ok_or_else(|| format!("question {id} is no longer in the question set"))
            })
            .collect()
    }

    async fn resume_from(
        &mut self,
        snapshot: SessionSnapshot,
        questions: Vec<Question>,
    ) -> Result<StartOutcome, SessionError> {
        let state = snapshot.state;
        let total = snapshot.duration_minutes.saturating_mul(60);

        self.profile.title = snapshot.exam_title;
        self.profile.duration_minutes = snapshot.duration_minutes;
        self.questions = questions;
        self.current_index = state.current_index.min(self.questions.len() - 1);
        self.ledger = AnswerLedger::from_answers(state.answers);
        self.flags = state.flagged;
        self.started_at = snapshot.started_at;
        self.legacy_exam_id = snapshot.legacy_exam_id;
        self.pending = None;
        self.mode = self.derive_mode();

        let (time_left, elapsed) = match self.config.clock_policy {
            ClockPolicy::TickCounted => {
                (state.time_left_seconds.min(total), state.elapsed_seconds)
            }
            ClockPolicy::WallClock => {
                let wall = (Utc::now() - self.started_at).num_seconds().max(0);
                let wall = u32::try_from(wall).unwrap_or(u32::MAX);
                let elapsed = state.elapsed_seconds.max(wall).min(total);
                (total - elapsed, elapsed)
            }
        };
        self.countdown.resume(total, time_left, elapsed);

        let exam_id = match snapshot.exam_id {
            Some(id) => id,
            None => {
                // Remote creation never succeeded for this attempt.
                self.create_remote_session().await?
            }
        };
        self.exam_id = Some(exam_id.clone());

        self.activate();
        tracing::info!(
            user = %self.user_id,
            session = %exam_id,
            index = self.current_index,
            answered = self.ledger.len(),
            time_left,
            "resumed session"
        );

        Ok(StartOutcome::Resumed {
            exam_id,
            current_index: self.current_index,
        })
    }

    async fn begin_fresh(
        &mut self,
        mut fetched: Vec<Question>,
    ) -> Result<StartOutcome, SessionError> {
        fetched.truncate(self.profile.question_count.max(1));
        self.questions = fetched;
        self.ledger.clear();
        self.flags.clear();
        self.current_index = 0;
        self.mode = AnswerMode::Unanswered;
        self.pending = None;
        self.legacy_exam_id = None;

        let exam_id = self.create_remote_session().await?;
        self.exam_id = Some(exam_id.clone());
        self.started_at = Utc::now();
        self.countdown.start(self.profile.duration_seconds());

        self.activate();
        self.persist();
        tracing::info!(
            user = %self.user_id,
            session = %exam_id,
            questions = self.questions.len(),
            "started fresh session"
        );

        Ok(StartOutcome::Fresh { exam_id })
    }

    async fn create_remote_session(&mut self) -> Result<String, SessionError> {
        match with_watchdog(
            self.config.remote_timeout,
            self.remote
                .create_session(&self.user_id, self.profile.part, self.questions.len()),
        )
        .await
        {
            Ok(created) => {
                if created.legacy_session_id.is_some() {
                    self.legacy_exam_id = created.legacy_session_id;
                }
                Ok(created.session_id)
            }
            Err(e) => {
                tracing::error!(user = %self.user_id, "remote session creation failed: {e:#}");
                self.phase = SessionPhase::Failed { retryable: false };
                Err(SessionError::SessionCreationFailed(format!("{e:#}")))
            }
        }
    }

    fn activate(&mut self) {
        self.phase = SessionPhase::Active;
        self.ticks_since_persist = 0;
        self.scheduler.arm();
    }

    // -----------------------------------------------------------------------
    // Answering and navigation
    // -----------------------------------------------------------------------

    /// Choose an option for the current question. Not persisted until
    /// `check_answer`.
    pub fn select_option(
        &mut self,
        question_id: &str,
        option_id: &str,
    ) -> Result<(), SessionError> {
        self.require_phase("select_option", SessionPhase::Active)?;
        self.require_mode("select_option", AnswerMode::Unanswered)?;

        let question = self.current()?;
        if question.id != question_id {
            return Err(SessionError::UnknownQuestion(question_id.to_string()));
        }
        if question.option(option_id).is_none() {
            return Err(SessionError::UnknownOption {
                question_id: question_id.to_string(),
                option_id: option_id.to_string(),
            });
        }

        self.pending = Some(option_id.to_string());
        Ok(())
    }

    /// Commit the pending selection for the current question.
    pub fn check_answer(&mut self) -> Result<AnswerFeedback, SessionError> {
        self.require_phase("check_answer", SessionPhase::Active)?;
        self.require_mode("check_answer", AnswerMode::Unanswered)?;
        let option_id = self.pending.clone().ok_or(SessionError::NoSelection)?;

        let feedback = self.commit(Some(option_id))?;
        self.persist();
        Ok(feedback)
    }

    /// Record the current question as skipped.
    pub fn skip(&mut self) -> Result<AnswerFeedback, SessionError> {
        self.require_phase("skip", SessionPhase::Active)?;
        self.require_mode("skip", AnswerMode::Unanswered)?;

        let feedback = self.commit(None)?;
        self.persist();
        Ok(feedback)
    }

    fn commit(&mut self, selected: Option<String>) -> Result<AnswerFeedback, SessionError> {
        let question = self.current()?.clone();
        let is_correct = selected
            .as_deref()
            .is_some_and(|option_id| question.is_correct(option_id));

        self.ledger.record(
            &question.id,
            selected.clone(),
            is_correct,
            self.countdown.elapsed(),
        );
        self.mode = AnswerMode::Submitted;
        self.pending = None;

        tracing::debug!(question = %question.id, is_correct, "answer recorded");

        Ok(AnswerFeedback {
            question_id: question.id.clone(),
            selected_option_id: selected,
            is_correct,
            correct_option_id: question.correct_option().map(|o| o.id.clone()),
            explanation: question.explanation.clone(),
        })
    }

    /// Advance to the next question, or finish at the last one.
    pub async fn next(&mut self) -> Result<Navigation, SessionError> {
        self.require_phase("next", SessionPhase::Active)?;
        self.require_mode("next", AnswerMode::Submitted)?;

        if self.current_index + 1 >= self.questions.len() {
            let report = self.finish(false).await?;
            return Ok(Navigation::Finished(Box::new(report)));
        }

        self.move_to(self.current_index + 1);
        Ok(Navigation::Moved {
            index: self.current_index,
            mode: self.mode,
        })
    }

    /// Go back one question for review. Allowed from either sub-mode.
    pub fn previous(&mut self) -> Result<AnswerMode, SessionError> {
        self.require_phase("previous", SessionPhase::Active)?;
        if self.current_index == 0 {
            return Err(SessionError::OutOfBounds("before the first question"));
        }

        self.move_to(self.current_index - 1);
        Ok(self.mode)
    }

    fn move_to(&mut self, index: usize) {
        self.current_index = index;
        self.pending = None;
        self.mode = self.derive_mode();
        self.persist();
    }

    fn derive_mode(&self) -> AnswerMode {
        match self.questions.get(self.current_index) {
            Some(q) if self.ledger.contains(&q.id) => AnswerMode::Submitted,
            _ => AnswerMode::Unanswered,
        }
    }

    /// Flip the review flag on a question. Returns whether it is now flagged.
    pub fn toggle_flag(&mut self, question_id: &str) -> Result<bool, SessionError> {
        self.require_phase("toggle_flag", SessionPhase::Active)?;
        if !self.questions.iter().any(|q| q.id == question_id) {
            return Err(SessionError::UnknownQuestion(question_id.to_string()));
        }

        let flagged = if self.flags.remove(question_id) {
            false
        } else {
            self.flags.insert(question_id.to_string());
            true
        };
        self.persist();
        Ok(flagged)
    }

    // -----------------------------------------------------------------------
    // Countdown
    // -----------------------------------------------------------------------

    /// Wait for the scheduler's next tick. Never resolves while the session
    /// is not Active.
    pub async fn next_tick(&mut self) {
        self.scheduler.next_tick().await
    }

    /// Apply one second. Expiry forces submission from any sub-mode.
    pub async fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        if self.phase != SessionPhase::Active {
            return Ok(TickOutcome::Inert);
        }

        match self.countdown.tick() {
            CountdownEvent::Idle => Ok(TickOutcome::Inert),
            CountdownEvent::Tick { time_left } => {
                self.ticks_since_persist += 1;
                if self.config.persist_every_ticks > 0
                    && self.ticks_since_persist >= self.config.persist_every_ticks
                {
                    self.ticks_since_persist = 0;
                    self.persist();
                }
                Ok(TickOutcome::Ticked { time_left })
            }
            CountdownEvent::Expired => {
                tracing::info!(user = %self.user_id, "time expired, submitting");
                let report = self.finish(true).await?;
                Ok(TickOutcome::Expired(Box::new(report)))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Submit the attempt.
    ///
    /// With `time_expired` the current question's pending selection (if any)
    /// is committed silently and the sub-mode is ignored. Otherwise an
    /// unchecked current question must have a selection. After a failed
    /// summary write the session is `Failed { retryable: true }` and this may
    /// be called again.
    pub async fn finish(&mut self, time_expired: bool) -> Result<SubmissionReport, SessionError> {
        match self.phase {
            SessionPhase::Active => {
                if self.mode == AnswerMode::Unanswered {
                    match self.pending.clone() {
                        Some(option_id) => {
                            self.commit(Some(option_id))?;
                        }
                        None if !time_expired => return Err(SessionError::NoSelection),
                        None => {}
                    }
                }
            }
            SessionPhase::Failed { retryable: true } => {}
            phase => {
                return Err(SessionError::InvalidPhase {
                    operation: "finish",
                    phase,
                })
            }
        }

        self.time_expired |= time_expired;
        self.countdown.stop();
        self.scheduler.disarm();
        self.phase = SessionPhase::Submitting;
        self.persist();

        let Some(exam_id) = self.exam_id.clone() else {
            self.phase = SessionPhase::Failed { retryable: false };
            return Err(SessionError::MissingSessionId);
        };

        let pipeline = SubmissionPipeline::new(
            Arc::clone(&self.remote),
            Arc::clone(&self.snapshots),
            self.archive.clone(),
        )
        .with_timeout(self.config.remote_timeout);

        let request = SubmissionRequest {
            user_id: &self.user_id,
            exam_id: &exam_id,
            legacy_exam_id: self.legacy_exam_id.as_deref(),
            profile: &self.profile,
            questions: &self.questions,
            answers: self.ledger.answers(),
            correct_answers: self.ledger.correct_count(),
            flagged_count: self.flags.len(),
            elapsed_seconds: self.countdown.elapsed(),
            time_expired: self.time_expired,
            completed_at: Utc::now(),
        };

        let outcome = pipeline.submit(request).await;
        match outcome {
            Ok(report) => {
                self.phase = SessionPhase::Completed;
                tracing::info!(
                    session = %exam_id,
                    score = report.result.score_percentage,
                    passed = report.result.passed,
                    "session completed"
                );
                Ok(report)
            }
            Err(e) => {
                self.phase = SessionPhase::Failed {
                    retryable: e.is_retryable(),
                };
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Snapshot management
    // -----------------------------------------------------------------------

    /// Whether the user has an in-progress attempt at the other part.
    pub fn has_conflicting_snapshot(&self) -> bool {
        self.load_snapshot()
            .is_some_and(|s| s.exam_part != self.profile.part)
    }

    /// Abandon the user's in-progress attempt, whichever part it is for.
    /// An active session is reset to `Uninitialized`.
    pub fn discard_snapshot(&mut self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Submitting {
            return Err(SessionError::InvalidPhase {
                operation: "discard_snapshot",
                phase: self.phase,
            });
        }

        self.snapshots
            .clear_snapshot(&self.user_id)
            .map_err(|e| SessionError::Persistence(format!("{e:#}")))?;
        tracing::info!(user = %self.user_id, "snapshot discarded");

        if self.phase != SessionPhase::Completed {
            self.countdown.stop();
            self.scheduler.disarm();
            self.phase = SessionPhase::Uninitialized;
            self.questions.clear();
            self.ledger.clear();
            self.flags.clear();
            self.current_index = 0;
            self.mode = AnswerMode::Unanswered;
            self.pending = None;
            self.countdown = Countdown::new();
            self.exam_id = None;
            self.legacy_exam_id = None;
            self.time_expired = false;
        }
        Ok(())
    }

    /// The snapshot that would be persisted now, once questions are loaded.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        if self.questions.is_empty() {
            return None;
        }

        Some(SessionSnapshot {
            exam_id: self.exam_id.clone(),
            exam_part: self.profile.part,
            exam_title: self.profile.title.clone(),
            duration_minutes: self.profile.duration_minutes,
            question_count: self.questions.len(),
            started_at: self.started_at,
            legacy_exam_id: self.legacy_exam_id.clone(),
            question_ids: self.questions.iter().map(|q| q.id.clone()).collect(),
            saved_at: Some(Utc::now()),
            state: SessionState {
                current_index: self.current_index,
                submitted: self.mode == AnswerMode::Submitted,
                answers: self.ledger.answers().to_vec(),
                flagged: self.flags.clone(),
                time_left_seconds: self.countdown.time_left(),
                elapsed_seconds: self.countdown.elapsed(),
            },
        })
    }

    /// Best-effort write-through; failures are logged and the in-memory
    /// transition stands.
    fn persist(&self) {
        let Some(snapshot) = self.snapshot() else {
            return;
        };
        match self.snapshots.save_snapshot(&self.user_id, &snapshot) {
            Ok(()) => tracing::debug!(
                user = %self.user_id,
                index = snapshot.state.current_index,
                time_left = snapshot.state.time_left_seconds,
                "snapshot saved"
            ),
            Err(e) => tracing::warn!(user = %self.user_id, "snapshot write failed: {e:#}"),
        }
    }

    fn load_snapshot(&self) -> Option<SessionSnapshot> {
        match self.snapshots.load_snapshot(&self.user_id) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(user = %self.user_id, "snapshot load failed: {e:#}");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Projections
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn mode(&self) -> AnswerMode {
        self.mode
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn profile(&self) -> &ExamProfile {
        &self.profile
    }

    pub fn exam_id(&self) -> Option<&str> {
        self.exam_id.as_deref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    /// Position through the exam in `(0, 1]`, or 0 before questions load.
    pub fn progress_fraction(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        (self.current_index + 1) as f64 / self.questions.len() as f64
    }

    pub fn time_left(&self) -> u32 {
        self.countdown.time_left()
    }

    pub fn elapsed(&self) -> u32 {
        self.countdown.elapsed()
    }

    pub fn flagged_count(&self) -> usize {
        self.flags.len()
    }

    pub fn is_flagged(&self, question_id: &str) -> bool {
        self.flags.contains(question_id)
    }

    pub fn answered_count(&self) -> usize {
        self.ledger.answered_count()
    }

    pub fn answers(&self) -> &[Answer] {
        self.ledger.answers()
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&Answer> {
        self.ledger.get(question_id)
    }

    pub fn pending_selection(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    fn require_phase(
        &self,
        operation: &'static str,
        expected: SessionPhase,
    ) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    fn require_mode(
        &self,
        operation: &'static str,
        expected: AnswerMode,
    ) -> Result<(), SessionError> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(SessionError::NotPermitted {
                operation,
                mode: self.mode,
            })
        }
    }

    fn current(&self) -> Result<&Question, SessionError> {
        self.questions
            .get(self.current_index)
            .ok_or(SessionError::OutOfBounds("past the last question"))
    }
}
