//! Turso Embedded / libSQL storage layer for the question bank.
//!
//! The [`Storage`] struct wraps a libSQL database holding questions, their
//! choices and assets, and the per-user mistake log.
//!
//! **Access rules:**
//! - Importer and CLI writes: read-write (sole writer) via [`Storage::open`]
//! - Serving/reporting paths: read-only via [`Storage::open_readonly`]
//!
//! Writes are grouped with [`Storage::begin`] / [`Storage::commit`] /
//! [`Storage::rollback`]; the importer commits once per chapter.

mod migrations;

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use quizbank_shared::{
    Asset, Choice, Mistake, NaturalKey, Question, QuizBankError, Result, chapter_key,
};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| QuizBankError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(QuizBankError::storage)?;

        let conn = db.connect().map_err(QuizBankError::storage)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.enable_foreign_keys().await?;
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(QuizBankError::storage)?;

        let conn = db.connect().map_err(QuizBankError::storage)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    async fn enable_foreign_keys(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .await
            .map_err(QuizBankError::storage)?;
        Ok(())
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        QuizBankError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(QuizBankError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Start a write transaction.
    pub async fn begin(&self) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute("BEGIN IMMEDIATE", params![])
            .await
            .map_err(QuizBankError::storage)?;
        Ok(())
    }

    /// Commit the open transaction.
    pub async fn commit(&self) -> Result<()> {
        self.conn
            .execute("COMMIT", params![])
            .await
            .map_err(QuizBankError::storage)?;
        Ok(())
    }

    /// Roll back the open transaction.
    pub async fn rollback(&self) -> Result<()> {
        self.conn
            .execute("ROLLBACK", params![])
            .await
            .map_err(QuizBankError::storage)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Question writes
    // -----------------------------------------------------------------------

    /// Insert a new question together with its choices and assets.
    pub async fn insert_question(&self, question: &Question) -> Result<()> {
        self.check_writable()?;
        question.validate()?;
        self.conn
            .execute(
                "INSERT INTO questions (id, chapter, chapter_key, natural_key, text, time_limit,
                                        source_file, content_hash, imported_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    question.id.as_str(),
                    question.chapter.as_str(),
                    chapter_key(&question.chapter),
                    question.natural_key.as_str(),
                    question.text.as_str(),
                    i64::from(question.time_limit),
                    question.source_file.as_str(),
                    question.content_hash.as_str(),
                    question.imported_at.to_rfc3339(),
                    question.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(QuizBankError::storage)?;
        self.insert_children(question).await
    }

    /// Replace a stored question's content in place, keeping its id and
    /// `imported_at`. Choices and assets are rewritten from `question`.
    pub async fn update_question(&self, question: &Question) -> Result<()> {
        self.check_writable()?;
        question.validate()?;
        let affected = self
            .conn
            .execute(
                "UPDATE questions SET
                   chapter = ?2,
                   chapter_key = ?3,
                   natural_key = ?4,
                   text = ?5,
                   time_limit = ?6,
                   source_file = ?7,
                   content_hash = ?8,
                   updated_at = ?9
                 WHERE id = ?1",
                params![
                    question.id.as_str(),
                    question.chapter.as_str(),
                    chapter_key(&question.chapter),
                    question.natural_key.as_str(),
                    question.text.as_str(),
                    i64::from(question.time_limit),
                    question.source_file.as_str(),
                    question.content_hash.as_str(),
                    question.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(QuizBankError::storage)?;

        if affected == 0 {
            return Err(QuizBankError::Storage(format!(
                "question {} not found for update",
                question.id
            )));
        }

        self.delete_children(&question.id).await?;
        self.insert_children(question).await
    }

    async fn insert_children(&self, question: &Question) -> Result<()> {
        for (position, choice) in question.choices.iter().enumerate() {
            self.conn
                .execute(
                    "INSERT INTO choices (id, question_id, position, text, is_correct)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        choice.id.as_str(),
                        question.id.as_str(),
                        position as i64,
                        choice.text.as_str(),
                        i64::from(choice.is_correct),
                    ],
                )
                .await
                .map_err(QuizBankError::storage)?;
        }

        for (position, asset) in question.assets.iter().enumerate() {
            self.conn
                .execute(
                    "INSERT INTO assets (question_id, position, path) VALUES (?1, ?2, ?3)",
                    params![question.id.as_str(), position as i64, asset.path.as_str()],
                )
                .await
                .map_err(QuizBankError::storage)?;
        }
        Ok(())
    }

    async fn delete_children(&self, question_id: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM choices WHERE question_id = ?1",
                params![question_id],
            )
            .await
            .map_err(QuizBankError::storage)?;
        self.conn
            .execute(
                "DELETE FROM assets WHERE question_id = ?1",
                params![question_id],
            )
            .await
            .map_err(QuizBankError::storage)?;
        Ok(())
    }

    /// Delete one question and everything it owns. Returns whether it existed.
    pub async fn delete_question(&self, question_id: &str) -> Result<bool> {
        self.check_writable()?;
        self.delete_children(question_id).await?;
        let affected = self
            .conn
            .execute("DELETE FROM questions WHERE id = ?1", params![question_id])
            .await
            .map_err(QuizBankError::storage)?;
        Ok(affected > 0)
    }

    /// Delete every question of a chapter (matched case-insensitively) and
    /// everything they own. Returns the number of questions removed.
    pub async fn delete_questions_by_chapter(&self, chapter: &str) -> Result<u64> {
        self.check_writable()?;
        let key = chapter_key(chapter);
        for sql in [
            "DELETE FROM choices WHERE question_id IN
               (SELECT id FROM questions WHERE chapter_key = ?1)",
            "DELETE FROM assets WHERE question_id IN
               (SELECT id FROM questions WHERE chapter_key = ?1)",
        ] {
            self.conn
                .execute(sql, params![key.as_str()])
                .await
                .map_err(QuizBankError::storage)?;
        }
        let affected = self
            .conn
            .execute(
                "DELETE FROM questions WHERE chapter_key = ?1",
                params![key.as_str()],
            )
            .await
            .map_err(QuizBankError::storage)?;
        Ok(affected)
    }

    // -----------------------------------------------------------------------
    // Question reads
    // -----------------------------------------------------------------------

    /// Get a question (with choices and assets) by id.
    pub async fn get_question(&self, question_id: &str) -> Result<Option<Question>> {
        Ok(self
            .load_questions(None, Some(question_id))
            .await?
            .into_iter()
            .next())
    }

    /// List every stored question, ordered by chapter then source file.
    pub async fn list_questions(&self) -> Result<Vec<Question>> {
        self.load_questions(None, None).await
    }

    /// List the questions of one chapter (matched case-insensitively).
    pub async fn list_questions_by_chapter(&self, chapter: &str) -> Result<Vec<Question>> {
        self.load_questions(Some(&chapter_key(chapter)), None).await
    }

    /// Distinct chapter labels, sorted case-insensitively.
    pub async fn list_chapters(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT DISTINCT chapter FROM questions ORDER BY chapter COLLATE NOCASE",
                params![],
            )
            .await
            .map_err(QuizBankError::storage)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(QuizBankError::storage)? {
            results.push(row.get::<String>(0).map_err(QuizBankError::storage)?);
        }
        Ok(results)
    }

    /// Total number of stored questions.
    pub async fn count_questions(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM questions", params![])
            .await
            .map_err(QuizBankError::storage)?;

        match rows.next().await.map_err(QuizBankError::storage)? {
            Some(row) => {
                let n = row.get::<i64>(0).map_err(QuizBankError::storage)?;
                Ok(u64::try_from(n).unwrap_or(0))
            }
            None => Ok(0),
        }
    }

    /// Load questions filtered by chapter key and/or id, then attach children.
    async fn load_questions(
        &self,
        chapter_key: Option<&str>,
        question_id: Option<&str>,
    ) -> Result<Vec<Question>> {
        const FILTER: &str = "(?1 IS NULL OR q.chapter_key = ?1) AND (?2 IS NULL OR q.id = ?2)";

        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT q.id, q.chapter, q.natural_key, q.text, q.time_limit, q.source_file,
                            q.content_hash, q.imported_at, q.updated_at
                     FROM questions q WHERE {FILTER}
                     ORDER BY q.chapter_key, q.natural_key"
                ),
                params![chapter_key, question_id],
            )
            .await
            .map_err(QuizBankError::storage)?;

        let mut questions = Vec::new();
        while let Some(row) = rows.next().await.map_err(QuizBankError::storage)? {
            questions.push(row_to_question(&row)?);
        }
        if questions.is_empty() {
            return Ok(questions);
        }

        let mut choices: HashMap<String, Vec<Choice>> = HashMap::new();
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT c.question_id, c.id, c.text, c.is_correct
                     FROM choices c JOIN questions q ON q.id = c.question_id
                     WHERE {FILTER}
                     ORDER BY c.question_id, c.position"
                ),
                params![chapter_key, question_id],
            )
            .await
            .map_err(QuizBankError::storage)?;
        while let Some(row) = rows.next().await.map_err(QuizBankError::storage)? {
            let owner: String = row.get(0).map_err(QuizBankError::storage)?;
            choices.entry(owner).or_default().push(Choice {
                id: row.get::<String>(1).map_err(QuizBankError::storage)?,
                text: row.get::<String>(2).map_err(QuizBankError::storage)?,
                is_correct: row.get::<i64>(3).map_err(QuizBankError::storage)? != 0,
            });
        }

        let mut assets: HashMap<String, Vec<Asset>> = HashMap::new();
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT a.question_id, a.path
                     FROM assets a JOIN questions q ON q.id = a.question_id
                     WHERE {FILTER}
                     ORDER BY a.question_id, a.position"
                ),
                params![chapter_key, question_id],
            )
            .await
            .map_err(QuizBankError::storage)?;
        while let Some(row) = rows.next().await.map_err(QuizBankError::storage)? {
            let owner: String = row.get(0).map_err(QuizBankError::storage)?;
            assets.entry(owner).or_default().push(Asset {
                path: row.get::<String>(1).map_err(QuizBankError::storage)?,
            });
        }

        for question in &mut questions {
            question.choices = choices.remove(&question.id).unwrap_or_default();
            question.assets = assets.remove(&question.id).unwrap_or_default();
        }
        Ok(questions)
    }

    // -----------------------------------------------------------------------
    // Mistake log
    // -----------------------------------------------------------------------

    /// Record a wrongly answered question for a user.
    pub async fn insert_mistake(&self, mistake: &Mistake) -> Result<()> {
        self.check_writable()?;
        let chosen = serde_json::to_string(&mistake.chosen_choice_ids)
            .map_err(QuizBankError::storage)?;
        self.conn
            .execute(
                "INSERT INTO mistakes (id, user_id, question_id, chosen_choice_ids, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    mistake.id.as_str(),
                    mistake.user_id.as_str(),
                    mistake.question_id.as_str(),
                    chosen,
                    mistake.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(QuizBankError::storage)?;
        Ok(())
    }

    /// A user's mistakes, newest first.
    pub async fn list_mistakes(&self, user_id: &str) -> Result<Vec<Mistake>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, question_id, chosen_choice_ids, created_at
                 FROM mistakes WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC",
                params![user_id],
            )
            .await
            .map_err(QuizBankError::storage)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(QuizBankError::storage)? {
            let chosen: String = row.get(3).map_err(QuizBankError::storage)?;
            results.push(Mistake {
                id: row.get::<String>(0).map_err(QuizBankError::storage)?,
                user_id: row.get::<String>(1).map_err(QuizBankError::storage)?,
                question_id: row.get::<String>(2).map_err(QuizBankError::storage)?,
                chosen_choice_ids: serde_json::from_str(&chosen)
                    .map_err(|e| QuizBankError::Storage(format!("invalid chosen ids: {e}")))?,
                created_at: parse_timestamp(&row.get::<String>(4).map_err(QuizBankError::storage)?)?,
            });
        }
        Ok(results)
    }
}

/// Convert a database row to a [`Question`] without children.
fn row_to_question(row: &libsql::Row) -> Result<Question> {
    let time_limit = row.get::<i64>(4).map_err(QuizBankError::storage)?;
    Ok(Question {
        id: row.get::<String>(0).map_err(QuizBankError::storage)?,
        chapter: row.get::<String>(1).map_err(QuizBankError::storage)?,
        natural_key: NaturalKey::from_stored(
            row.get::<String>(2).map_err(QuizBankError::storage)?,
        ),
        text: row.get::<String>(3).map_err(QuizBankError::storage)?,
        time_limit: u32::try_from(time_limit)
            .map_err(|_| QuizBankError::Storage(format!("invalid time limit {time_limit}")))?,
        source_file: row.get::<String>(5).map_err(QuizBankError::storage)?,
        choices: Vec::new(),
        assets: Vec::new(),
        content_hash: row.get::<String>(6).map_err(QuizBankError::storage)?,
        imported_at: parse_timestamp(&row.get::<String>(7).map_err(QuizBankError::storage)?)?,
        updated_at: parse_timestamp(&row.get::<String>(8).map_err(QuizBankError::storage)?)?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| QuizBankError::Storage(format!("invalid date: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizbank_shared::QuestionId;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("qb_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn choice(text: &str, is_correct: bool) -> Choice {
        Choice {
            id: QuestionId::new().to_string(),
            text: text.into(),
            is_correct,
        }
    }

    fn question(chapter: &str, file: &str, text: &str) -> Question {
        Question {
            id: QuestionId::new().to_string(),
            chapter: chapter.into(),
            natural_key: NaturalKey::new(chapter, file),
            text: text.into(),
            time_limit: 30,
            source_file: file.into(),
            choices: vec![choice("Paris", true), choice("Lyon", false)],
            assets: vec![Asset {
                path: format!("questions/{chapter}/Images/q.png"),
            }],
            content_hash: "hash-1".into(),
            imported_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("qb_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn question_insert_and_get() {
        let storage = test_storage().await;
        let q = question("Ch1", "Question 1.txt", "Capital of France?");
        storage.insert_question(&q).await.expect("insert");

        let found = storage
            .get_question(&q.id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(found.text, "Capital of France?");
        assert_eq!(found.natural_key.as_str(), "ch1::question 1");
        assert_eq!(found.choices.len(), 2);
        assert_eq!(found.choices[0].text, "Paris");
        assert!(found.choices[0].is_correct);
        assert!(!found.choices[1].is_correct);
        assert_eq!(found.assets.len(), 1);
        assert_eq!(found.assets[0].path, "questions/Ch1/Images/q.png");

        assert!(storage.get_question("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_replaces_children_and_keeps_id() {
        let storage = test_storage().await;
        let q = question("Ch1", "Question 1.txt", "Old text");
        storage.insert_question(&q).await.unwrap();

        let mut edited = q.clone();
        edited.text = "New text".into();
        edited.choices = vec![
            q.choices[0].clone(),
            choice("Nice", false),
            choice("Lille", false),
        ];
        edited.assets.clear();
        edited.content_hash = "hash-2".into();
        storage.update_question(&edited).await.expect("update");

        let found = storage.get_question(&q.id).await.unwrap().unwrap();
        assert_eq!(found.text, "New text");
        assert_eq!(found.choices.len(), 3);
        assert_eq!(found.choices[0].id, q.choices[0].id);
        assert!(found.assets.is_empty());
        assert_eq!(found.content_hash, "hash-2");
        assert_eq!(storage.count_questions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_question_fails() {
        let storage = test_storage().await;
        let q = question("Ch1", "Question 1.txt", "Never stored");
        let err = storage.update_question(&q).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn natural_key_is_unique() {
        let storage = test_storage().await;
        storage
            .insert_question(&question("Ch1", "Question 1.txt", "A"))
            .await
            .unwrap();
        let dup = question("CH1", "question 1.TXT", "B");
        assert!(storage.insert_question(&dup).await.is_err());
    }

    #[tokio::test]
    async fn invalid_question_is_refused() {
        let storage = test_storage().await;
        let mut q = question("Ch1", "Question 1.txt", "No answer");
        for c in &mut q.choices {
            c.is_correct = false;
        }
        assert!(storage.insert_question(&q).await.is_err());
        assert_eq!(storage.count_questions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn chapters_and_chapter_listing() {
        let storage = test_storage().await;
        for (chapter, file) in [
            ("Geography", "Question 1.txt"),
            ("Geography", "Question 2.txt"),
            ("art", "Question 1.txt"),
        ] {
            storage
                .insert_question(&question(chapter, file, "text"))
                .await
                .unwrap();
        }

        let chapters = storage.list_chapters().await.unwrap();
        assert_eq!(chapters, vec!["art".to_string(), "Geography".to_string()]);

        let geo = storage.list_questions_by_chapter("geography").await.unwrap();
        assert_eq!(geo.len(), 2);
        assert!(geo.iter().all(|q| q.choices.len() == 2));
        assert_eq!(storage.list_questions().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn delete_by_chapter_cascades() {
        let storage = test_storage().await;
        let keep = question("Keep", "Question 1.txt", "stay");
        storage.insert_question(&keep).await.unwrap();
        storage
            .insert_question(&question("Drop", "Question 1.txt", "go"))
            .await
            .unwrap();
        storage
            .insert_question(&question("Drop", "Question 2.txt", "go"))
            .await
            .unwrap();

        let removed = storage.delete_questions_by_chapter("DROP").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(storage.count_questions().await.unwrap(), 1);

        let kept = storage.get_question(&keep.id).await.unwrap().unwrap();
        assert_eq!(kept.choices.len(), 2);
    }

    #[tokio::test]
    async fn delete_single_question() {
        let storage = test_storage().await;
        let q = question("Ch1", "Question 1.txt", "bye");
        storage.insert_question(&q).await.unwrap();
        assert!(storage.delete_question(&q.id).await.unwrap());
        assert!(!storage.delete_question(&q.id).await.unwrap());
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let storage = test_storage().await;
        storage.begin().await.unwrap();
        storage
            .insert_question(&question("Ch1", "Question 1.txt", "tmp"))
            .await
            .unwrap();
        storage.rollback().await.unwrap();
        assert_eq!(storage.count_questions().await.unwrap(), 0);

        storage.begin().await.unwrap();
        storage
            .insert_question(&question("Ch1", "Question 1.txt", "kept"))
            .await
            .unwrap();
        storage.commit().await.unwrap();
        assert_eq!(storage.count_questions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mistakes_roundtrip() {
        let storage = test_storage().await;
        let older = Mistake {
            id: QuestionId::new().to_string(),
            user_id: "user-1".into(),
            question_id: "q-1".into(),
            chosen_choice_ids: vec!["c-1".into()],
            created_at: Utc::now() - chrono::Duration::minutes(5),
        };
        let newer = Mistake {
            id: QuestionId::new().to_string(),
            question_id: "q-2".into(),
            chosen_choice_ids: vec!["c-2".into(), "c-3".into()],
            created_at: Utc::now(),
            ..older.clone()
        };
        storage.insert_mistake(&older).await.unwrap();
        storage.insert_mistake(&newer).await.unwrap();

        let list = storage.list_mistakes("user-1").await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].question_id, "q-2");
        assert_eq!(list[0].chosen_choice_ids, vec!["c-2", "c-3"]);
        assert!(storage.list_mistakes("someone-else").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("qb_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.insert_question(&question("Ch1", "Question 1.txt", "A"))
            .await
            .unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.count_questions().await.unwrap(), 1);
        let result = ro
            .insert_question(&question("Ch1", "Question 2.txt", "B"))
            .await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }
}
