//! Shared types, error model, and configuration for quizbank.
//!
//! This crate is the foundation depended on by all other quizbank crates.
//! It provides:
//! - [`QuizBankError`] — the unified error type
//! - Domain types ([`Question`], [`Choice`], [`Asset`], [`NaturalKey`], [`Mistake`])
//! - Configuration ([`AppConfig`], [`ImportConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ImportConfig, ImportSection, StorageSection, TimeLimitConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{QuizBankError, Result};
pub use types::{
    Asset, Choice, ImportDiscipline, Mistake, NaturalKey, Question, QuestionId, chapter_key,
};
