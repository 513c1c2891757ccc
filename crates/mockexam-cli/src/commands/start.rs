//! The `mockexam start` command.
//!
//! Runs one attempt interactively. Ticks and stdin lines are multiplexed on
//! the current task; every committed action is persisted, so `q`, a closed
//! stdin, or a killed process all leave a resumable snapshot behind.

use std::path::Path;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use mockexam_core::archive::ScoreDelta;
use mockexam_core::error::SessionError;
use mockexam_core::model::ExamPart;
use mockexam_core::session::{AnswerFeedback, ExamSession, Navigation, StartOutcome, TickOutcome};
use mockexam_core::submission::{DetailRowOutcome, LegacyOutcome, SubmissionReport};
use mockexam_remote::config::create_remote;

use super::{format_seconds, AppContext};

/// Console renderer for an interactive session.
struct ConsoleReporter;

impl ConsoleReporter {
    fn question(&self, session: &ExamSession) {
        let Some(question) = session.current_question() else {
            return;
        };
        let flag = if session.is_flagged(&question.id) {
            " [flagged]"
        } else {
            ""
        };
        println!(
            "\nQuestion {}/{}{flag}  ({} left)",
            session.current_index() + 1,
            session.question_count(),
            format_seconds(session.time_left())
        );
        println!("{}", question.prompt);
        for (i, option) in question.options.iter().enumerate() {
            println!("  {}) {}", i + 1, option.text);
        }

        if let Some(answer) = session.answer_for(&question.id) {
            match answer
                .selected_option_id
                .as_deref()
                .and_then(|id| question.options.iter().position(|o| o.id == id))
            {
                Some(i) if answer.is_correct => println!("Answered {}: correct", i + 1),
                Some(i) => println!("Answered {}: incorrect", i + 1),
                None => println!("Skipped"),
            }
        }
    }

    fn feedback(&self, session: &ExamSession, feedback: &AnswerFeedback) {
        if feedback.is_correct {
            println!("Correct!");
        } else {
            let correct = session.current_question().and_then(|q| {
                let id = feedback.correct_option_id.as_deref()?;
                q.options
                    .iter()
                    .position(|o| o.id == id)
                    .map(|i| format!("{}) {}", i + 1, q.options[i].text))
            });
            match correct {
                Some(correct) => println!("Incorrect. The answer is {correct}"),
                None => println!("Incorrect."),
            }
        }
        if let Some(explanation) = &feedback.explanation {
            println!("  {explanation}");
        }
        println!("Type `n` for the next question.");
    }

    fn help(&self) {
        println!("Commands:");
        println!("  <number>   select an option");
        println!("  c          check the selected answer");
        println!("  s          skip this question");
        println!("  n / p      next / previous question");
        println!("  f          flag or unflag this question for review");
        println!("  t          show time remaining");
        println!("  finish     submit the exam now");
        println!("  q          save and quit (resume later with the same command)");
    }

    fn report(&self, report: &SubmissionReport, delta: Option<&ScoreDelta>) {
        let result = &report.result;
        println!("\n=== {} ===", result.exam_title);
        if result.time_expired {
            println!("Time expired.");
        }
        println!(
            "Score: {}% ({}/{} correct, {} answered)",
            result.score_percentage,
            result.correct_answers,
            result.total_questions,
            result.answered_count()
        );
        println!(
            "Time: {} of {}",
            format_seconds(result.time_taken_seconds),
            format_seconds(result.duration_minutes.saturating_mul(60))
        );
        println!("Flagged: {}", result.flagged_count);
        println!(
            "Result: {}",
            if result.passed { "PASS" } else { "FAIL" }
        );

        if let Some(delta) = delta {
            println!(
                "Compared with previous attempt: {:+} points, {:+}s",
                delta.score_change, delta.time_change
            );
        }
        if let LegacyOutcome::Failed(e) = &report.legacy {
            eprintln!("  Note: legacy record not updated: {e}");
        }
        if let DetailRowOutcome::Abandoned(e) = &report.detail_rows {
            eprintln!("  Note: per-question details not saved remotely: {e}");
        }
        if let Some(e) = &report.archive_error {
            eprintln!("  Warning: result not saved to local history: {e}");
            eprintln!("  The attempt stays resumable; run `mockexam start` again to re-submit.");
        }
        println!("Session id: {}", result.session_id);
    }
}

enum Flow {
    Continue,
    Finished(Box<SubmissionReport>),
    Quit,
}

pub async fn execute(
    config_path: Option<&Path>,
    user: Option<String>,
    part: ExamPart,
    discard_existing: bool,
) -> Result<()> {
    let ctx = AppContext::load(config_path, user)?;
    let remote = create_remote(
        &ctx.config.remote,
        ctx.store.data_dir(),
        ctx.config.submit_timeout_secs,
    )?;
    let archive = ctx.store.archive();

    let mut session = ExamSession::new(
        ctx.user_id(),
        ctx.config.profile(part),
        remote,
        ctx.store.snapshots(),
        archive.clone(),
    )
    .with_config(ctx.config.session_config());

    if session.has_conflicting_snapshot() {
        if discard_existing {
            session.discard_snapshot()?;
            println!("Discarded the in-progress attempt at the other part.");
        } else {
            anyhow::bail!(
                "an attempt at the other part is in progress; \
                 resume it, run `mockexam discard`, or pass --discard-existing"
            );
        }
    }

    match session.start().await? {
        StartOutcome::Fresh { .. } => println!(
            "Starting {}: {} questions, {} minutes. Type `h` for help.",
            session.profile().title,
            session.question_count(),
            session.profile().duration_minutes
        ),
        StartOutcome::Resumed { current_index, .. } => println!(
            "Resuming {} at question {} with {} left.",
            session.profile().title,
            current_index + 1,
            format_seconds(session.time_left())
        ),
    }

    let out = ConsoleReporter;
    out.question(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let report = loop {
        tokio::select! {
            _ = session.next_tick() => match session.tick().await {
                Ok(TickOutcome::Expired(report)) => {
                    println!("\nTime is up.");
                    break Some(report);
                }
                Ok(TickOutcome::Ticked { time_left }) if time_left == 60 => {
                    println!("\nOne minute remaining.");
                }
                Ok(_) => {}
                Err(e) => report_error(&e)?,
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!("\nInput closed; progress saved.");
                    break None;
                };
                match handle_input(&mut session, &line, &out).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Finished(report)) => break Some(report),
                    Ok(Flow::Quit) => break None,
                    Err(e) => report_error(&e)?,
                }
            }
        }
    };

    match report {
        Some(report) => {
            let delta = archive.score_delta(&report.result).unwrap_or_else(|e| {
                tracing::warn!("could not compare with history: {e:#}");
                None
            });
            out.report(&report, delta.as_ref());
        }
        None => println!(
            "Resume with: mockexam start --part {}",
            session.profile().part
        ),
    }

    Ok(())
}

/// Print recoverable errors and keep going; bail on anything else.
fn report_error(e: &SessionError) -> Result<()> {
    if e.is_user_error() {
        println!("  {e}");
        Ok(())
    } else if e.is_retryable() {
        println!("  Submission failed: {e}");
        println!("  Your answers are saved. Type `finish` to retry or `q` to quit.");
        Ok(())
    } else {
        Err(anyhow::anyhow!("{e}"))
    }
}

async fn handle_input(
    session: &mut ExamSession,
    input: &str,
    out: &ConsoleReporter,
) -> Result<Flow, SessionError> {
    match input.trim() {
        "" => Ok(Flow::Continue),
        "h" | "help" | "?" => {
            out.help();
            Ok(Flow::Continue)
        }
        "c" | "check" => {
            let feedback = session.check_answer()?;
            out.feedback(session, &feedback);
            Ok(Flow::Continue)
        }
        "s" | "skip" => {
            session.skip()?;
            println!("Skipped. Type `n` for the next question.");
            Ok(Flow::Continue)
        }
        "n" | "next" => match session.next().await? {
            Navigation::Moved { .. } => {
                out.question(session);
                Ok(Flow::Continue)
            }
            Navigation::Finished(report) => Ok(Flow::Finished(report)),
        },
        "p" | "prev" | "previous" => {
            session.previous()?;
            out.question(session);
            Ok(Flow::Continue)
        }
        "f" | "flag" => {
            let question_id = current_question_id(session)?;
            let flagged = session.toggle_flag(&question_id)?;
            println!(
                "{} ({} flagged)",
                if flagged { "Flagged." } else { "Unflagged." },
                session.flagged_count()
            );
            Ok(Flow::Continue)
        }
        "t" | "time" => {
            println!(
                "{} left, {}/{} answered",
                format_seconds(session.time_left()),
                session.answered_count(),
                session.question_count()
            );
            Ok(Flow::Continue)
        }
        "finish" => {
            let report = session.finish(false).await?;
            Ok(Flow::Finished(Box::new(report)))
        }
        "q" | "quit" => Ok(Flow::Quit),
        other => match other.parse::<usize>() {
            Ok(n) if n >= 1 => {
                let question_id = current_question_id(session)?;
                let option_id = session
                    .current_question()
                    .and_then(|q| q.options.get(n - 1))
                    .map(|o| o.id.clone())
                    .ok_or_else(|| SessionError::UnknownOption {
                        question_id: question_id.clone(),
                        option_id: n.to_string(),
                    })?;
                session.select_option(&question_id, &option_id)?;
                println!("Selected {n}. Type `c` to check.");
                Ok(Flow::Continue)
            }
            _ => {
                println!("Unknown command `{other}`; type `h` for help.");
                Ok(Flow::Continue)
            }
        },
    }
}

fn current_question_id(session: &ExamSession) -> Result<String, SessionError> {
    session
        .current_question()
        .map(|q| q.id.clone())
        .ok_or(SessionError::OutOfBounds("past the last question"))
}
