//! Core domain types for the question bank.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{QuizBankError, Result};

// ---------------------------------------------------------------------------
// QuestionId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for question and choice identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub Uuid);

impl QuestionId {
    /// Generate a new time-sortable identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for QuestionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QuestionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// NaturalKey
// ---------------------------------------------------------------------------

/// Reconciliation key derived from chapter name + source file stem.
///
/// Case-insensitive: `("Ch1", "Question 1.txt")` and `("CH1", "question 1.TXT")`
/// produce the same key, `ch1::question 1`. Never shown to quiz takers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NaturalKey(String);

impl NaturalKey {
    /// Separator between the chapter and file components.
    pub const SEPARATOR: &'static str = "::";

    /// Derive the key for a question file inside a chapter.
    pub fn new(chapter: &str, file_name: &str) -> Self {
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        Self(format!(
            "{}{}{}",
            chapter_key(chapter),
            Self::SEPARATOR,
            stem.trim().to_lowercase()
        ))
    }

    /// Wrap a key that was previously derived and persisted.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Case-folded chapter label; the chapter component of every [`NaturalKey`].
pub fn chapter_key(chapter: &str) -> String {
    chapter.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// ImportDiscipline
// ---------------------------------------------------------------------------

/// How a re-import integrates with questions already in storage.
///
/// One discipline applies to every chapter of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportDiscipline {
    /// Update-in-place by natural key; ids survive re-imports.
    #[default]
    Upsert,
    /// Delete the chapter's questions, then insert everything fresh.
    BulkReplace,
}

impl fmt::Display for ImportDiscipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upsert => f.write_str("upsert"),
            Self::BulkReplace => f.write_str("bulk-replace"),
        }
    }
}

impl FromStr for ImportDiscipline {
    type Err = QuizBankError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upsert" => Ok(Self::Upsert),
            "bulk-replace" | "bulk_replace" | "replace" => Ok(Self::BulkReplace),
            other => Err(QuizBankError::config(format!(
                "unknown import discipline '{other}': expected 'upsert' or 'bulk-replace'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Question / Choice / Asset
// ---------------------------------------------------------------------------

/// One answer option, owned by exactly one [`Question`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Unique choice identifier (UUID v7).
    pub id: String,
    /// Display text, never empty.
    pub text: String,
    /// Whether selecting this choice is required for a correct answer.
    pub is_correct: bool,
}

/// An image attached to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Path relative to the public content root, e.g. `questions/Ch1/Images/q_18.png`.
    pub path: String,
}

/// A persisted quiz question with its choices and assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Stable identifier (UUID v7), preserved across upsert re-imports.
    pub id: String,
    /// Chapter label (name of the source subdirectory).
    pub chapter: String,
    /// Reconciliation key; internal only.
    pub natural_key: NaturalKey,
    /// Question body.
    pub text: String,
    /// Display time limit in seconds.
    pub time_limit: u32,
    /// File name the question was imported from.
    pub source_file: String,
    pub choices: Vec<Choice>,
    pub assets: Vec<Asset>,
    /// SHA-256 of the canonical question content, used to skip no-op updates.
    pub content_hash: String,
    /// When the question was first imported.
    pub imported_at: DateTime<Utc>,
    /// When the question content last changed.
    pub updated_at: DateTime<Utc>,
}

impl Question {
    /// Ids of all choices flagged correct.
    pub fn correct_choice_ids(&self) -> impl Iterator<Item = &str> {
        self.choices
            .iter()
            .filter(|c| c.is_correct)
            .map(|c| c.id.as_str())
    }

    /// Look up a choice by id.
    pub fn choice(&self, id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == id)
    }

    /// Check the ownership-independent invariants of a question record.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(QuizBankError::validation(format!(
                "question {} has an empty body",
                self.natural_key
            )));
        }
        if self.time_limit == 0 {
            return Err(QuizBankError::validation(format!(
                "question {} has a zero time limit",
                self.natural_key
            )));
        }
        if self.choices.is_empty() {
            return Err(QuizBankError::validation(format!(
                "question {} has no choices",
                self.natural_key
            )));
        }
        if !self.choices.iter().any(|c| c.is_correct) {
            return Err(QuizBankError::validation(format!(
                "question {} has no correct choice",
                self.natural_key
            )));
        }
        if let Some(empty) = self.choices.iter().find(|c| c.text.trim().is_empty()) {
            return Err(QuizBankError::validation(format!(
                "question {} has an empty choice ({})",
                self.natural_key, empty.id
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mistake
// ---------------------------------------------------------------------------

/// A wrongly answered question remembered for later review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mistake {
    pub id: String,
    pub user_id: String,
    /// Not foreign-keyed: survives bulk-replace imports, possibly dangling.
    pub question_id: String,
    pub chosen_choice_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_question() -> Question {
        Question {
            id: QuestionId::new().to_string(),
            chapter: "Ch1".into(),
            natural_key: NaturalKey::new("Ch1", "Question 1.txt"),
            text: "Capital of France?".into(),
            time_limit: 30,
            source_file: "Question 1.txt".into(),
            choices: vec![
                Choice {
                    id: "a".into(),
                    text: "Paris".into(),
                    is_correct: true,
                },
                Choice {
                    id: "b".into(),
                    text: "Lyon".into(),
                    is_correct: false,
                },
            ],
            assets: vec![],
            content_hash: "hash".into(),
            imported_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn question_id_roundtrip() {
        let id = QuestionId::new();
        let parsed: QuestionId = id.to_string().parse().expect("parse QuestionId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn natural_key_is_case_insensitive() {
        let a = NaturalKey::new("Ch1", "Question 1.txt");
        let b = NaturalKey::new("CH1", "question 1.TXT");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "ch1::question 1");
    }

    #[test]
    fn natural_key_without_extension() {
        let key = NaturalKey::new("Geo", "capitals");
        assert_eq!(key.to_string(), "geo::capitals");
    }

    #[test]
    fn discipline_parse_and_display() {
        assert_eq!(
            "upsert".parse::<ImportDiscipline>().unwrap(),
            ImportDiscipline::Upsert
        );
        assert_eq!(
            "Bulk-Replace".parse::<ImportDiscipline>().unwrap(),
            ImportDiscipline::BulkReplace
        );
        assert!("merge".parse::<ImportDiscipline>().is_err());
        assert_eq!(ImportDiscipline::BulkReplace.to_string(), "bulk-replace");
    }

    #[test]
    fn discipline_serde_uses_kebab_case() {
        let json = serde_json::to_string(&ImportDiscipline::BulkReplace).unwrap();
        assert_eq!(json, "\"bulk-replace\"");
    }

    #[test]
    fn valid_question_passes() {
        let q = sample_question();
        assert!(q.validate().is_ok());
        assert_eq!(q.correct_choice_ids().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(q.choice("b").map(|c| c.text.as_str()), Some("Lyon"));
    }

    #[test]
    fn question_without_correct_choice_fails() {
        let mut q = sample_question();
        for c in &mut q.choices {
            c.is_correct = false;
        }
        let err = q.validate().unwrap_err();
        assert!(err.to_string().contains("no correct choice"));
    }

    #[test]
    fn natural_key_is_not_serialized_as_struct() {
        let q = sample_question();
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["natural_key"], "ch1::question 1");
    }
}
