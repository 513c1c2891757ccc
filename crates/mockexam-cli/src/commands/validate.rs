//! The `mockexam validate` command.

use std::path::PathBuf;

use anyhow::Result;

use mockexam_core::parser;

pub fn execute(banks_path: PathBuf) -> Result<()> {
    let banks = if banks_path.is_dir() {
        parser::load_bank_directory(&banks_path)?
    } else {
        vec![parser::parse_question_bank(&banks_path)?]
    };

    let mut total_warnings = 0;

    for bank in &banks {
        println!(
            "Question bank: {} [{}] ({} questions)",
            bank.title,
            bank.part,
            bank.questions.len()
        );

        let warnings = parser::validate_question_bank(bank);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All question banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
