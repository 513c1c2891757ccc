//! The `mockexam status` command.

use std::path::Path;

use anyhow::Result;

use super::{format_seconds, AppContext};

pub fn execute(config_path: Option<&Path>, user: Option<String>) -> Result<()> {
    let ctx = AppContext::load(config_path, user)?;
    let Some(snapshot) = ctx.store.snapshots().load_snapshot(ctx.user_id())? else {
        println!("No attempt in progress for {}.", ctx.user_id());
        return Ok(());
    };

    let state = &snapshot.state;
    println!("In progress: {} ({})", snapshot.exam_title, snapshot.exam_part);
    println!(
        "  Question {}/{}, {} answered, {} flagged",
        state.current_index + 1,
        snapshot.question_count,
        state.answers.iter().filter(|a| !a.is_skipped()).count(),
        state.flagged.len()
    );
    println!(
        "  Time left: {} of {}",
        format_seconds(state.time_left_seconds),
        format_seconds(snapshot.duration_minutes.saturating_mul(60))
    );
    if let Some(saved_at) = snapshot.saved_at {
        println!("  Last saved: {}", saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!(
        "Resume with `mockexam start --part {}` or abandon with `mockexam discard`.",
        snapshot.exam_part
    );
    Ok(())
}
