//! Question-bank ingestion and quiz logic for quizbank.
//!
//! This crate ties the parser and storage together: it walks a question tree
//! (`import`), attaches images (`assets`), reconciles drafts with stored
//! questions (`reconcile`), scores submissions (`scoring`), and serves
//! client views (`catalog`).

pub mod assets;
pub mod catalog;
pub mod import;
pub mod reconcile;
pub mod scoring;

pub use import::{ImportProgress, ImportReport, SilentProgress, SkippedFile, import_question_bank};
pub use reconcile::{QuestionDraft, ReconcileContext, Reconciled};
