//! The `mockexam discard` command.

use std::path::Path;

use anyhow::Result;

use super::AppContext;

pub fn execute(config_path: Option<&Path>, user: Option<String>) -> Result<()> {
    let ctx = AppContext::load(config_path, user)?;
    let snapshots = ctx.store.snapshots();

    match snapshots.load_snapshot(ctx.user_id())? {
        Some(snapshot) => {
            snapshots.clear_snapshot(ctx.user_id())?;
            println!(
                "Discarded the in-progress {} attempt ({}/{} answered).",
                snapshot.exam_part,
                snapshot.state.answers.len(),
                snapshot.question_count
            );
        }
        None => println!("No attempt in progress."),
    }
    Ok(())
}
