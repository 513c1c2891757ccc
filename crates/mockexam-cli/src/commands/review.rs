//! The `mockexam review` command.

use std::path::Path;

use anyhow::Result;

use mockexam_core::model::SessionResult;

use super::{format_seconds, AppContext};

pub fn execute(
    config_path: Option<&Path>,
    user: Option<String>,
    session_id: String,
    incorrect_only: bool,
) -> Result<()> {
    let ctx = AppContext::load(config_path, user)?;
    let history = ctx.store.archive().history(ctx.user_id())?;
    let result = find_by_prefix(&history, &session_id)?;

    println!(
        "{} ({}), {}: {}% ({}/{}) in {}",
        result.exam_title,
        result.exam_part,
        result.completed_at.format("%Y-%m-%d %H:%M UTC"),
        result.score_percentage,
        result.correct_answers,
        result.total_questions,
        format_seconds(result.time_taken_seconds)
    );

    let mut shown = 0;
    for (n, question) in result.questions.iter().enumerate() {
        let answer = result.answer_for(&question.id);
        let correct = answer.is_some_and(|a| a.is_correct);
        if incorrect_only && correct {
            continue;
        }
        shown += 1;

        let selected = answer.and_then(|a| a.selected_option_id.as_deref());
        println!("\n{}. {}", n + 1, question.prompt);
        for (i, option) in question.options.iter().enumerate() {
            let marker = match (option.is_correct, selected == Some(option.id.as_str())) {
                (true, true) => "*>",
                (true, false) => "* ",
                (false, true) => " >",
                (false, false) => "  ",
            };
            println!("  {marker} {}) {}", i + 1, option.text);
        }

        let verdict = match answer {
            None => "not reached",
            Some(a) if a.is_skipped() => "skipped",
            Some(a) if a.is_correct => "correct",
            Some(_) => "incorrect",
        };
        println!("  -> {verdict}");
        if let Some(explanation) = &question.explanation {
            println!("  {explanation}");
        }
    }

    if shown == 0 {
        println!("\nEvery question was answered correctly.");
    } else {
        println!("\n(* correct answer, > your answer)");
    }

    Ok(())
}

/// Resolve a full id or a unique prefix of one.
fn find_by_prefix<'a>(history: &'a [SessionResult], prefix: &str) -> Result<&'a SessionResult> {
    if let Some(exact) = history.iter().find(|r| r.session_id == prefix) {
        return Ok(exact);
    }

    let mut matches = history.iter().filter(|r| r.session_id.starts_with(prefix));
    match (matches.next(), matches.next()) {
        (Some(result), None) => Ok(result),
        (Some(_), Some(_)) => anyhow::bail!("session id `{prefix}` is ambiguous"),
        (None, _) => anyhow::bail!("no completed session matches `{prefix}`"),
    }
}
