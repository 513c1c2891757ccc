//! The `mockexam init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("mockexam.toml").exists() {
        println!("mockexam.toml already exists, skipping.");
    } else {
        std::fs::write("mockexam.toml", SAMPLE_CONFIG)?;
        println!("Created mockexam.toml");
    }

    std::fs::create_dir_all("question-banks")?;
    for (name, content) in [("part_a.toml", PART_A_BANK), ("part_b.toml", PART_B_BANK)] {
        let path = Path::new("question-banks").join(name);
        if path.exists() {
            println!("question-banks/{name} already exists, skipping.");
        } else {
            std::fs::write(&path, content)?;
            println!("Created question-banks/{name}");
        }
    }

    println!("\nNext steps:");
    println!("  1. Add questions under question-banks/ (or point [remote] at a REST backend)");
    println!("  2. Run: mockexam validate --banks question-banks");
    println!("  3. Run: mockexam start --part part_a");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mockexam configuration

user_id = "local-user"
# data_dir = "~/.local/share/mockexam"
submit_timeout_secs = 30
persist_every_ticks = 1
clock_policy = "tick_counted"

[remote]
type = "local"
bank_dir = "question-banks"

# [remote]
# type = "rest"
# url = "https://your-project.supabase.co"
# api_key = "${MOCKEXAM_API_KEY}"

# [parts.part_a]
# duration_minutes = 30
# question_count = 15
# pass_mark = 100
"#;

const PART_A_BANK: &str = r#"[bank]
part = "part_a"
title = "Part A — Numeracy"

[[questions]]
id = "a-001"
prompt = "A patient is prescribed 500 mg. Tablets contain 250 mg. How many tablets?"
explanation = "500 mg / 250 mg = 2 tablets."
category = "dosage"

[[questions.options]]
id = "a-001-1"
text = "1"

[[questions.options]]
id = "a-001-2"
text = "2"
correct = true

[[questions.options]]
id = "a-001-3"
text = "4"

[[questions]]
id = "a-002"
prompt = "Convert 1.5 g to milligrams."
explanation = "1 g = 1000 mg, so 1.5 g = 1500 mg."
category = "conversion"

[[questions.options]]
id = "a-002-1"
text = "1500 mg"
correct = true

[[questions.options]]
id = "a-002-2"
text = "150 mg"

[[questions.options]]
id = "a-002-3"
text = "15 mg"

[[questions]]
id = "a-003"
prompt = "An infusion of 1000 mL runs over 8 hours. What is the rate in mL/h?"
explanation = "1000 mL / 8 h = 125 mL/h."
category = "infusion"

[[questions.options]]
id = "a-003-1"
text = "100 mL/h"

[[questions.options]]
id = "a-003-2"
text = "125 mL/h"
correct = true

[[questions.options]]
id = "a-003-3"
text = "150 mL/h"
"#;

const PART_B_BANK: &str = r#"[bank]
part = "part_b"
title = "Part B — Clinical Knowledge"

[[questions]]
id = "b-001"
prompt = "Which is the first step when assessing an acutely unwell patient?"
explanation = "The ABCDE approach starts with the airway."
category = "assessment"

[[questions.options]]
id = "b-001-1"
text = "Airway"
correct = true

[[questions.options]]
id = "b-001-2"
text = "Blood glucose"

[[questions.options]]
id = "b-001-3"
text = "Exposure"

[[questions]]
id = "b-002"
prompt = "What is a normal adult resting respiratory rate (breaths per minute)?"
category = "observations"

[[questions.options]]
id = "b-002-1"
text = "6-10"

[[questions.options]]
id = "b-002-2"
text = "12-20"
correct = true

[[questions.options]]
id = "b-002-3"
text = "25-30"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use mockexam_core::model::ExamPart;
    use mockexam_core::parser::{parse_question_bank_str, validate_question_bank};
    use mockexam_remote::config::{MockexamConfig, RemoteConfig};

    #[test]
    fn sample_config_parses() {
        let config: MockexamConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.user_id, "local-user");
        assert!(matches!(config.remote, RemoteConfig::Local { .. }));
    }

    #[test]
    fn sample_banks_are_clean() {
        for (content, part, count) in [
            (PART_A_BANK, ExamPart::PartA, 3),
            (PART_B_BANK, ExamPart::PartB, 2),
        ] {
            let bank = parse_question_bank_str(content, Path::new("sample.toml")).unwrap();
            assert_eq!(bank.part, part);
            assert_eq!(bank.questions.len(), count);
            assert!(validate_question_bank(&bank).is_empty());
        }
    }
}
