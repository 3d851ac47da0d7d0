//! Read-only client views over imported questions.
//!
//! Client payloads never carry correctness flags or natural keys, and choices
//! are reshuffled on every request.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use quizbank_shared::{Question, Result};
use quizbank_storage::Storage;

/// A choice as sent to a quiz taker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientChoice {
    pub id: String,
    pub text: String,
}

/// A question as sent to a quiz taker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientQuestion {
    pub id: String,
    pub chapter: String,
    pub text: String,
    pub time_limit: u32,
    pub choices: Vec<ClientChoice>,
    /// Public image paths.
    pub assets: Vec<String>,
}

impl ClientQuestion {
    /// Strip a stored question down to its client view, shuffling choices.
    pub fn from_question<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> Self {
        let mut choices: Vec<ClientChoice> = question
            .choices
            .iter()
            .map(|c| ClientChoice {
                id: c.id.clone(),
                text: c.text.clone(),
            })
            .collect();
        choices.shuffle(rng);

        Self {
            id: question.id.clone(),
            chapter: question.chapter.clone(),
            text: question.text.clone(),
            time_limit: question.time_limit,
            choices,
            assets: question.assets.iter().map(|a| a.path.clone()).collect(),
        }
    }
}

/// Chapter names with at least one question, sorted case-insensitively.
pub async fn list_chapters(storage: &Storage) -> Result<Vec<String>> {
    storage.list_chapters().await
}

/// Client views of a chapter's questions. Unknown chapters yield an empty list.
pub async fn chapter_questions<R: Rng + ?Sized>(
    storage: &Storage,
    chapter: &str,
    rng: &mut R,
) -> Result<Vec<ClientQuestion>> {
    let questions = storage.list_questions_by_chapter(chapter).await?;
    Ok(questions
        .iter()
        .map(|q| ClientQuestion::from_question(q, &mut *rng))
        .collect())
}
