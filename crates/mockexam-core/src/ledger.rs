//! Answer ledger: per-question responses keyed by question id.

use crate::model::Answer;

/// Upsert-only record of answers for one attempt.
///
/// Never holds two entries for the same question; re-recording a question
/// replaces its entry in place. Recorded times never decrease.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerLedger {
    answers: Vec<Answer>,
}

impl AnswerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted answers. Later duplicates win.
    pub fn from_answers(answers: Vec<Answer>) -> Self {
        let mut ledger = Self::new();
        for answer in answers {
            ledger.record(
                &answer.question_id,
                answer.selected_option_id,
                answer.is_correct,
                answer.time_taken_seconds,
            );
        }
        ledger
    }

    /// Record or replace the answer for `question_id`.
    pub fn record(
        &mut self,
        question_id: &str,
        selected_option_id: Option<String>,
        is_correct: bool,
        time_taken_seconds: u32,
    ) -> &Answer {
        let time_taken_seconds = time_taken_seconds.max(self.latest_time());
        let answer = Answer {
            question_id: question_id.to_string(),
            selected_option_id,
            is_correct,
            time_taken_seconds,
        };

        match self
            .answers
            .iter()
            .position(|a| a.question_id == question_id)
        {
            Some(idx) => {
                self.answers[idx] = answer;
                &self.answers[idx]
            }
            None => {
                self.answers.push(answer);
                &self.answers[self.answers.len() - 1]
            }
        }
    }

    pub fn get(&self, question_id: &str) -> Option<&Answer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.get(question_id).is_some()
    }

    pub fn correct_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_correct).count()
    }

    /// Entries with a selection. Skipped entries are not counted.
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| !a.is_skipped()).count()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }

    fn latest_time(&self) -> u32 {
        self.answers
            .iter()
            .map(|a| a.time_taken_seconds)
            .max()
            .unwrap_or(0)
    }
}
