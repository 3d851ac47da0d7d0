//! Reconciliation of freshly parsed questions against stored ones.
//!
//! A [`ReconcileContext`] is built once per import run and dropped afterwards.
//! Under [`ImportDiscipline::Upsert`] it holds every stored question keyed by
//! natural key; each draft is then inserted, updated in place (id preserved),
//! or left alone when its content hash is unchanged. Stored questions whose
//! file disappeared are kept.
//!
//! Under [`ImportDiscipline::BulkReplace`] each chapter is wiped first and every
//! draft is inserted with a new id. Mistake records that point at the old ids
//! are left dangling.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use quizbank_parser::{ParsedChoice, ParsedQuestion};
use quizbank_shared::{
    Asset, Choice, ImportDiscipline, NaturalKey, Question, QuestionId, Result,
};
use quizbank_storage::Storage;

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// A parsed question with its assets attached, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub chapter: String,
    pub source_file: String,
    pub natural_key: NaturalKey,
    pub text: String,
    pub time_limit: u32,
    pub choices: Vec<ParsedChoice>,
    pub assets: Vec<Asset>,
}

impl QuestionDraft {
    /// Build a draft from a parser result.
    pub fn new(chapter: &str, source_file: &str, parsed: ParsedQuestion, assets: Vec<Asset>) -> Self {
        Self {
            chapter: chapter.to_string(),
            source_file: source_file.to_string(),
            natural_key: NaturalKey::new(chapter, source_file),
            text: parsed.text,
            time_limit: parsed.time_limit,
            choices: parsed.choices,
            assets,
        }
    }

    /// SHA-256 over everything an import writes for this question.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.chapter.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.source_file.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.text.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.time_limit.to_le_bytes());
        for choice in &self.choices {
            hasher.update([1, u8::from(choice.is_correct)]);
            hasher.update(choice.text.as_bytes());
            hasher.update(b"\0");
        }
        for asset in &self.assets {
            hasher.update(b"\x02");
            hasher.update(asset.path.as_bytes());
            hasher.update(b"\0");
        }
        format!("{:x}", hasher.finalize())
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// What reconciling one draft did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Created,
    Updated,
    Unchanged,
}

impl fmt::Display for Reconciled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
            Self::Unchanged => f.write_str("unchanged"),
        }
    }
}

/// The write a draft calls for.
#[derive(Debug, Clone)]
pub enum Plan {
    Insert(Question),
    Update(Question),
    Unchanged { id: String },
}

/// Per-run reconciliation state.
pub struct ReconcileContext {
    discipline: ImportDiscipline,
    existing: HashMap<NaturalKey, Question>,
    claimed: HashSet<NaturalKey>,
}

impl ReconcileContext {
    /// Build the context for one run, loading stored questions when upserting.
    pub async fn load(storage: &Storage, discipline: ImportDiscipline) -> Result<Self> {
        let existing: HashMap<NaturalKey, Question> = match discipline {
            ImportDiscipline::Upsert => storage
                .list_questions()
                .await?
                .into_iter()
                .map(|q| (q.natural_key.clone(), q))
                .collect(),
            ImportDiscipline::BulkReplace => HashMap::new(),
        };
        debug!(%discipline, existing = existing.len(), "reconcile context loaded");
        Ok(Self::with_existing(discipline, existing))
    }

    /// Build a context from an in-memory set of stored questions.
    pub fn with_existing(
        discipline: ImportDiscipline,
        existing: HashMap<NaturalKey, Question>,
    ) -> Self {
        Self {
            discipline,
            existing,
            claimed: HashSet::new(),
        }
    }

    pub fn discipline(&self) -> ImportDiscipline {
        self.discipline
    }

    /// Reserve a natural key for this run.
    ///
    /// Returns `false` when another file already produced the same key.
    pub fn claim(&mut self, key: &NaturalKey) -> bool {
        self.claimed.insert(key.clone())
    }

    /// Prepare storage for a chapter. Under bulk-replace this deletes the
    /// chapter's stored questions and returns how many were removed.
    pub async fn begin_chapter(&mut self, storage: &Storage, chapter: &str) -> Result<u64> {
        match self.discipline {
            ImportDiscipline::Upsert => Ok(0),
            ImportDiscipline::BulkReplace => storage.delete_questions_by_chapter(chapter).await,
        }
    }

    /// Decide what to do with a draft without touching storage.
    pub fn plan(&self, draft: &QuestionDraft, now: DateTime<Utc>) -> Plan {
        let content_hash = draft.content_hash();

        let Some(stored) = self.existing.get(&draft.natural_key) else {
            let choices = draft
                .choices
                .iter()
                .map(new_choice)
                .collect();
            return Plan::Insert(build_question(
                draft,
                QuestionId::new().to_string(),
                choices,
                content_hash,
                now,
                now,
            ));
        };

        if stored.content_hash == content_hash {
            return Plan::Unchanged {
                id: stored.id.clone(),
            };
        }

        let choices = reuse_choice_ids(&stored.choices, &draft.choices);
        Plan::Update(build_question(
            draft,
            stored.id.clone(),
            choices,
            content_hash,
            stored.imported_at,
            now,
        ))
    }

    /// Plan and write one draft.
    pub async fn apply(&mut self, storage: &Storage, draft: &QuestionDraft) -> Result<Reconciled> {
        match self.plan(draft, Utc::now()) {
            Plan::Insert(question) => {
                storage.insert_question(&question).await?;
                self.existing.insert(question.natural_key.clone(), question);
                Ok(Reconciled::Created)
            }
            Plan::Update(question) => {
                storage.update_question(&question).await?;
                self.existing.insert(question.natural_key.clone(), question);
                Ok(Reconciled::Updated)
            }
            Plan::Unchanged { .. } => Ok(Reconciled::Unchanged),
        }
    }
}

fn new_choice(parsed: &ParsedChoice) -> Choice {
    Choice {
        id: QuestionId::new().to_string(),
        text: parsed.text.clone(),
        is_correct: parsed.is_correct,
    }
}

/// Keep the id of each stored choice whose text reappears unchanged.
fn reuse_choice_ids(stored: &[Choice], parsed: &[ParsedChoice]) -> Vec<Choice> {
    let mut available: Vec<&Choice> = stored.iter().collect();
    parsed
        .iter()
        .map(|p| match available.iter().position(|s| s.text == p.text) {
            Some(i) => Choice {
                id: available.swap_remove(i).id.clone(),
                text: p.text.clone(),
                is_correct: p.is_correct,
            },
            None => new_choice(p),
        })
        .collect()
}

fn build_question(
    draft: &QuestionDraft,
    id: String,
    choices: Vec<Choice>,
    content_hash: String,
    imported_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Question {
    Question {
        id,
        chapter: draft.chapter.clone(),
        natural_key: draft.natural_key.clone(),
        text: draft.text.clone(),
        time_limit: draft.time_limit,
        source_file: draft.source_file.clone(),
        choices,
        assets: draft.assets.clone(),
        content_hash,
        imported_at,
        updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizbank_parser::{ParseOptions, parse_question};

    fn draft(chapter: &str, file: &str, content: &str) -> QuestionDraft {
        let parsed = parse_question(content, &ParseOptions::default()).expect("parse");
        QuestionDraft::new(chapter, file, parsed, Vec::new())
    }

    fn stored(d: &QuestionDraft) -> Question {
        match ReconcileContext::with_existing(ImportDiscipline::Upsert, HashMap::new())
            .plan(d, Utc::now())
        {
            Plan::Insert(q) => q,
            other => panic!("expected insert, got {other:?}"),
        }
    }

    fn context_with(questions: Vec<Question>) -> ReconcileContext {
        ReconcileContext::with_existing(
            ImportDiscipline::Upsert,
            questions
                .into_iter()
                .map(|q| (q.natural_key.clone(), q))
                .collect(),
        )
    }

    const FRANCE: &str = "Capital of France?\n[x] Paris\n[ ] Lyon\n[ ] Nice\n";

    #[test]
    fn hash_is_deterministic_and_content_sensitive() {
        let a = draft("Ch1", "Question 1.txt", FRANCE);
        let b = draft("Ch1", "Question 1.txt", FRANCE);
        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash().len(), 64);

        let flipped = draft("Ch1", "Question 1.txt", "Capital of France?\n[ ] Paris\n[x] Lyon\n[ ] Nice\n");
        assert_ne!(a.content_hash(), flipped.content_hash());

        let mut with_asset = a.clone();
        with_asset.assets.push(Asset {
            path: "questions/Ch1/Images/1.png".into(),
        });
        assert_ne!(a.content_hash(), with_asset.content_hash());
    }

    #[test]
    fn new_key_is_inserted_with_fresh_ids() {
        let d = draft("Ch1", "Question 1.txt", FRANCE);
        let q = stored(&d);
        assert_eq!(q.natural_key.as_str(), "ch1::question 1");
        assert_eq!(q.choices.len(), 3);
        assert!(q.validate().is_ok());
        assert_eq!(q.imported_at, q.updated_at);
    }

    #[test]
    fn unchanged_content_is_left_alone() {
        let d = draft("Ch1", "Question 1.txt", FRANCE);
        let q = stored(&d);
        let ctx = context_with(vec![q.clone()]);
        match ctx.plan(&d, Utc::now()) {
            Plan::Unchanged { id } => assert_eq!(id, q.id),
            other => panic!("expected unchanged, got {other:?}"),
        }
    }

    #[test]
    fn edited_text_keeps_question_and_choice_ids() {
        let original = stored(&draft("Ch1", "Question 1.txt", FRANCE));
        let ctx = context_with(vec![original.clone()]);

        let edited = draft(
            "CH1",
            "question 1.TXT",
            "What is the capital of France?\n[x] Paris\n[ ] Marseille\n[ ] Lyon\n",
        );
        let Plan::Update(updated) = ctx.plan(&edited, Utc::now()) else {
            panic!("expected update");
        };

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.imported_at, original.imported_at);
        assert_eq!(updated.text, "What is the capital of France?");
        assert_eq!(updated.choices[0].id, original.choices[0].id);
        assert_ne!(updated.choices[1].id, original.choices[1].id);
        assert_eq!(updated.choices[2].id, original.choices[1].id);
        assert!(updated.validate().is_ok());
    }

    #[test]
    fn duplicate_choice_texts_get_distinct_ids() {
        let original = stored(&draft("Ch1", "Question 2.txt", "Pick?\n[x] same\n[ ] same\n"));
        let ctx = context_with(vec![original.clone()]);
        let edited = draft("Ch1", "Question 2.txt", "Pick one?\n[x] same\n[ ] same\n");
        let Plan::Update(updated) = ctx.plan(&edited, Utc::now()) else {
            panic!("expected update");
        };
        assert_ne!(updated.choices[0].id, updated.choices[1].id);
    }

    #[test]
    fn claims_are_exclusive_per_run() {
        let mut ctx = context_with(Vec::new());
        let key = NaturalKey::new("Ch1", "Question 1.txt");
        assert!(ctx.claim(&key));
        assert!(!ctx.claim(&NaturalKey::new("ch1", "QUESTION 1.txt")));
    }

    #[tokio::test]
    async fn bulk_replace_wipes_the_chapter_first() {
        let tmp = std::env::temp_dir().join(format!("qb_reconcile_{}.db", uuid::Uuid::now_v7()));
        let storage = Storage::open(&tmp).await.expect("open");

        let mut upsert = ReconcileContext::load(&storage, ImportDiscipline::Upsert)
            .await
            .unwrap();
        let d = draft("Ch1", "Question 1.txt", FRANCE);
        assert_eq!(upsert.apply(&storage, &d).await.unwrap(), Reconciled::Created);
        let first_id = storage.list_questions().await.unwrap()[0].id.clone();

        let mut replace = ReconcileContext::load(&storage, ImportDiscipline::BulkReplace)
            .await
            .unwrap();
        assert_eq!(replace.begin_chapter(&storage, "ch1").await.unwrap(), 1);
        assert_eq!(replace.apply(&storage, &d).await.unwrap(), Reconciled::Created);

        let all = storage.list_questions().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_ne!(all[0].id, first_id);
    }

    #[tokio::test]
    async fn upsert_apply_is_idempotent() {
        let tmp = std::env::temp_dir().join(format!("qb_reconcile_{}.db", uuid::Uuid::now_v7()));
        let storage = Storage::open(&tmp).await.expect("open");
        let d = draft("Ch1", "Question 1.txt", FRANCE);

        let mut first = ReconcileContext::load(&storage, ImportDiscipline::Upsert)
            .await
            .unwrap();
        assert_eq!(first.begin_chapter(&storage, "Ch1").await.unwrap(), 0);
        assert_eq!(first.apply(&storage, &d).await.unwrap(), Reconciled::Created);

        let mut second = ReconcileContext::load(&storage, ImportDiscipline::Upsert)
            .await
            .unwrap();
        assert_eq!(second.apply(&storage, &d).await.unwrap(), Reconciled::Unchanged);
        assert_eq!(storage.count_questions().await.unwrap(), 1);
    }
}
