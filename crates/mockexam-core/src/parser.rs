//! TOML question bank parser.
//!
//! Loads question sets from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{ExamPart, Question, QuestionOption};

/// A question set for one exam part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    pub part: ExamPart,
    pub title: String,
    pub questions: Vec<Question>,
}

/// Intermediate TOML structure for parsing question bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    part: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    prompt: String,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    options: Vec<TomlOption>,
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    id: String,
    text: String,
    #[serde(default)]
    correct: bool,
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_question_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_question_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank` (useful for testing).
pub fn parse_question_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let part: ExamPart = parsed
        .bank
        .part
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}: {}", source_path.display(), e))?;

    let title = if parsed.bank.title.is_empty() {
        part.to_string()
    } else {
        parsed.bank.title
    };

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| Question {
            id: q.id,
            prompt: q.prompt.trim().to_string(),
            options: q
                .options
                .into_iter()
                .map(|o| QuestionOption {
                    id: o.id,
                    text: o.text,
                    is_correct: o.correct,
                })
                .collect(),
            explanation: q.explanation.map(|e| e.trim().to_string()),
            category: q.category,
        })
        .collect();

    Ok(QuestionBank {
        part,
        title,
        questions,
    })
}

/// Recursively load all `.toml` question banks from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_question_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// A warning from question bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a question bank for common issues.
pub fn validate_question_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "bank has no questions".into(),
        });
    }

    let mut seen_ids = HashSet::new();
    for question in &bank.questions {
        let warn = |message: String| ValidationWarning {
            question_id: Some(question.id.clone()),
            message,
        };

        if !seen_ids.insert(&question.id) {
            warnings.push(warn(format!("duplicate question ID: {}", question.id)));
        }

        if question.prompt.trim().is_empty() {
            warnings.push(warn("prompt is empty".into()));
        }

        if question.options.is_empty() {
            warnings.push(warn("question has no options".into()));
            continue;
        }

        let mut seen_options = HashSet::new();
        for option in &question.options {
            if !seen_options.insert(&option.id) {
                warnings.push(warn(format!("duplicate option ID: {}", option.id)));
            }
        }

        match question.options.iter().filter(|o| o.is_correct).count() {
            0 => warnings.push(warn("no option is marked correct".into())),
            1 => {}
            n => warnings.push(warn(format!(
                "{n} options are marked correct; only the first counts"
            ))),
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[bank]
part = "part_a"
title = "Numeracy practice"

[[questions]]
id = "a1"
prompt = """
A patient needs 500 mg. Tablets are 250 mg. How many tablets?
"""
explanation = "500 / 250 = 2"
category = "dosage"

[[questions.options]]
id = "a1-1"
text = "1"

[[questions.options]]
id = "a1-2"
text = "2"
correct = true

[[questions]]
id = "a2"
prompt = "Convert 1.5 g to mg."

[[questions.options]]
id = "a2-1"
text = "1500 mg"
correct = true

[[questions.options]]
id = "a2-2"
text = "150 mg"
"#;

    #[test]
    fn parse_valid_toml() {
        let bank = parse_question_bank_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(bank.part, ExamPart::PartA);
        assert_eq!(bank.title, "Numeracy practice");
        assert_eq!(bank.questions.len(), 2);
        assert_eq!(bank.questions[0].category.as_deref(), Some("dosage"));
        assert_eq!(
            bank.questions[0].correct_option().map(|o| o.id.as_str()),
            Some("a1-2")
        );
        assert!(validate_question_bank(&bank).is_empty());
    }

    #[test]
    fn missing_title_defaults_to_part() {
        let toml = r#"
[bank]
part = "part_b"
"#;
        let bank = parse_question_bank_str(toml, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(bank.title, "part_b");
        let warnings = validate_question_bank(&bank);
        assert!(warnings.iter().any(|w| w.message.contains("no questions")));
    }

    #[test]
    fn unknown_part_is_an_error() {
        let toml = r#"
[bank]
part = "part_z"
"#;
        let err = parse_question_bank_str(toml, &PathBuf::from("z.toml")).unwrap_err();
        assert!(err.to_string().contains("unknown exam part"));
    }

    #[test]
    fn validate_correctness_markers() {
        let toml = r#"
[bank]
part = "a"

[[questions]]
id = "none"
prompt = "No correct option"
[[questions.options]]
id = "x"
text = "x"

[[questions]]
id = "two"
prompt = "Two correct options"
[[questions.options]]
id = "y"
text = "y"
correct = true
[[questions.options]]
id = "z"
text = "z"
correct = true

[[questions]]
id = "none"
prompt = "Duplicate id, no options"
"#;
        let bank = parse_question_bank_str(toml, &PathBuf::from("test.toml")).unwrap();
        let warnings = validate_question_bank(&bank);
        assert!(warnings.iter().any(|w| w.message.contains("no option is marked")));
        assert!(warnings.iter().any(|w| w.message.contains("2 options")));
        assert!(warnings.iter().any(|w| w.message.contains("duplicate question")));
        assert!(warnings.iter().any(|w| w.message.contains("no options")));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        let result = parse_question_bank_str(bad, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("part_a.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not toml [").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let banks = load_bank_directory(dir.path()).unwrap();
        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].questions.len(), 2);
    }
}
