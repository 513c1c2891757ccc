//! The `mockexam history` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use mockexam_core::model::{ExamPart, SessionResult};

use super::{format_seconds, AppContext};

pub fn execute(
    config_path: Option<&Path>,
    user: Option<String>,
    part: Option<ExamPart>,
    format: String,
) -> Result<()> {
    let ctx = AppContext::load(config_path, user)?;
    let results: Vec<SessionResult> = ctx
        .store
        .archive()
        .history(ctx.user_id())?
        .into_iter()
        .filter(|r| part.is_none_or(|p| r.exam_part == p))
        .collect();

    match format.as_str() {
        "json" => {
            let rows: Vec<serde_json::Value> = results.iter().map(summary_json).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        "text" => {
            if results.is_empty() {
                println!("No completed attempts.");
            } else {
                print_table(&results);
            }
        }
        other => anyhow::bail!("unknown format `{other}` (expected text or json)"),
    }

    Ok(())
}

fn summary_json(r: &SessionResult) -> serde_json::Value {
    serde_json::json!({
        "session_id": r.session_id,
        "exam_part": r.exam_part,
        "exam_title": r.exam_title,
        "completed_at": r.completed_at,
        "score_percentage": r.score_percentage,
        "correct_answers": r.correct_answers,
        "total_questions": r.total_questions,
        "time_taken_seconds": r.time_taken_seconds,
        "passed": r.passed,
        "time_expired": r.time_expired,
    })
}

fn print_table(results: &[SessionResult]) {
    let mut table = Table::new();
    table.set_header(vec![
        "Completed",
        "Part",
        "Score",
        "Correct",
        "Time",
        "Result",
        "Session",
    ]);

    for r in results {
        let outcome = match (r.passed, r.time_expired) {
            (true, _) => "PASS",
            (false, true) => "FAIL (time)",
            (false, false) => "FAIL",
        };
        table.add_row(vec![
            Cell::new(
                r.completed_at
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M"),
            ),
            Cell::new(r.exam_part),
            Cell::new(format!("{}%", r.score_percentage)),
            Cell::new(format!("{}/{}", r.correct_answers, r.total_questions)),
            Cell::new(format_seconds(r.time_taken_seconds)),
            Cell::new(outcome),
            Cell::new(short_id(&r.session_id)),
        ]);
    }

    println!("{table}");
}

/// First eight characters; enough for `mockexam review`.
pub(crate) fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(i, _)| &id[..i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ids() {
        assert_eq!(short_id("0b6f2d1c-9a4e-4c1b"), "0b6f2d1c");
        assert_eq!(short_id("s-1"), "s-1");
    }
}
