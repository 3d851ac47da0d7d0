//! Scoring of submitted answers.
//!
//! An answer is correct only when the chosen choice ids equal the set of ids
//! flagged correct. Empty answers, unknown question ids and repeated answers
//! to an already scored question are skipped.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use quizbank_shared::{Mistake, Question, QuestionId, QuizBankError, Result};
use quizbank_storage::Storage;

/// The choices picked for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    #[serde(default)]
    pub choice_ids: Vec<String>,
}

/// A batch of answers, optionally tied to a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub user_id: Option<String>,
    pub answers: Vec<Answer>,
}

impl Submission {
    /// Parse a submission from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| QuizBankError::parse(format!("invalid submission: {e}")))
    }
}

/// A wrongly answered question, with texts for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncorrectAnswer {
    pub question_id: String,
    pub question_text: String,
    pub chosen_choice_ids: Vec<String>,
    /// Texts of the chosen choices that belong to the question.
    pub chosen: Vec<String>,
    /// Texts of every correct choice.
    pub correct: Vec<String>,
}

/// Aggregate result of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
    pub correct: usize,
    /// Answers that were evaluated.
    pub total: usize,
    pub incorrect: Vec<IncorrectAnswer>,
    /// Question ids that were unanswered or unknown.
    pub skipped: Vec<String>,
}

/// Score answers against already loaded questions.
///
/// Only the first non-empty answer per question counts.
pub fn evaluate(answers: &[Answer], questions: &HashMap<String, Question>) -> ScoreReport {
    let mut report = ScoreReport::default();
    let mut scored: HashSet<&str> = HashSet::new();

    for answer in answers {
        let question = match questions.get(&answer.question_id) {
            Some(q) if !answer.choice_ids.is_empty() && scored.insert(q.id.as_str()) => q,
            _ => {
                report.skipped.push(answer.question_id.clone());
                continue;
            }
        };

        report.total += 1;
        let chosen: HashSet<&str> = answer.choice_ids.iter().map(String::as_str).collect();
        let correct: HashSet<&str> = question.correct_choice_ids().collect();

        if chosen == correct {
            report.correct += 1;
            continue;
        }

        report.incorrect.push(IncorrectAnswer {
            question_id: question.id.clone(),
            question_text: question.text.clone(),
            chosen_choice_ids: answer.choice_ids.clone(),
            chosen: answer
                .choice_ids
                .iter()
                .filter_map(|id| question.choice(id))
                .map(|c| c.text.clone())
                .collect(),
            correct: question
                .choices
                .iter()
                .filter(|c| c.is_correct)
                .map(|c| c.text.clone())
                .collect(),
        });
    }

    report
}

/// Load the answered questions, score them, and record mistakes when the
/// submission names a user.
#[instrument(skip_all, fields(answers = submission.answers.len(), user = ?submission.user_id))]
pub async fn score_submission(storage: &Storage, submission: &Submission) -> Result<ScoreReport> {
    let mut questions = HashMap::new();
    for answer in &submission.answers {
        if questions.contains_key(&answer.question_id) {
            continue;
        }
        if let Some(question) = storage.get_question(&answer.question_id).await? {
            questions.insert(answer.question_id.clone(), question);
        }
    }

    let report = evaluate(&submission.answers, &questions);
    debug!(
        correct = report.correct,
        total = report.total,
        skipped = report.skipped.len(),
        "submission scored"
    );

    if let Some(user_id) = &submission.user_id {
        record_mistakes(storage, user_id, &report).await?;
    }
    Ok(report)
}

/// Persist one mistake per incorrect answer. Returns how many were written.
pub async fn record_mistakes(storage: &Storage, user_id: &str, report: &ScoreReport) -> Result<usize> {
    for wrong in &report.incorrect {
        storage
            .insert_mistake(&Mistake {
                id: QuestionId::new().to_string(),
                user_id: user_id.to_string(),
                question_id: wrong.question_id.clone(),
                chosen_choice_ids: wrong.chosen_choice_ids.clone(),
                created_at: Utc::now(),
            })
            .await?;
    }
    Ok(report.incorrect.len())
}
