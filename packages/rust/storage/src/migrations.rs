//! SQL migration definitions for the quizbank database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements, and records itself in
//! `schema_migrations`.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: questions, choices, assets",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Imported questions
CREATE TABLE IF NOT EXISTS questions (
    id           TEXT PRIMARY KEY,
    chapter      TEXT NOT NULL,
    chapter_key  TEXT NOT NULL,
    natural_key  TEXT NOT NULL UNIQUE,
    text         TEXT NOT NULL,
    time_limit   INTEGER NOT NULL CHECK (time_limit > 0),
    source_file  TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    imported_at  TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_questions_chapter_key ON questions(chapter_key);

-- Answer options, owned by one question
CREATE TABLE IF NOT EXISTS choices (
    id          TEXT PRIMARY KEY,
    question_id TEXT NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
    position    INTEGER NOT NULL,
    text        TEXT NOT NULL CHECK (length(trim(text)) > 0),
    is_correct  INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_choices_question ON choices(question_id);

-- Images, owned by one question
CREATE TABLE IF NOT EXISTS assets (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    question_id TEXT NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
    position    INTEGER NOT NULL,
    path        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_assets_question ON assets(question_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Mistake log for wrongly answered questions",
            sql: r#"
-- question_id is not a foreign key; rows outlive bulk-replace imports
CREATE TABLE IF NOT EXISTS mistakes (
    id                TEXT PRIMARY KEY,
    user_id           TEXT NOT NULL,
    question_id       TEXT NOT NULL,
    chosen_choice_ids TEXT NOT NULL,
    created_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_mistakes_user ON mistakes(user_id);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
