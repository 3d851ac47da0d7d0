//! Question-bank import: root → chapter directories → question files.
//!
//! Each chapter is parsed completely before any write, then reconciled inside
//! one storage transaction. A file that cannot be read or parsed is skipped
//! and reported; a storage failure rolls back the current chapter and aborts
//! the run. A missing root directory is a no-op.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use quizbank_parser::{ParseOptions, parse_bytes};
use quizbank_shared::{ImportConfig, QuizBankError, Result, chapter_key};
use quizbank_storage::Storage;

use crate::assets::{AssetLocation, match_assets};
use crate::reconcile::{QuestionDraft, ReconcileContext, Reconciled};

// ---------------------------------------------------------------------------
// Report & progress
// ---------------------------------------------------------------------------

/// A file (or chapter directory) that was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Chapters walked.
    pub chapters: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Questions deleted by bulk-replace before re-inserting.
    pub removed: u64,
    pub skipped: Vec<SkippedFile>,
    pub elapsed: Duration,
}

impl ImportReport {
    /// Questions created or updated by this run.
    pub fn imported(&self) -> usize {
        self.created + self.updated
    }

    fn record(&mut self, outcome: Reconciled) {
        match outcome {
            Reconciled::Created => self.created += 1,
            Reconciled::Updated => self.updated += 1,
            Reconciled::Unchanged => self.unchanged += 1,
        }
    }
}

/// Progress callback for reporting import status.
pub trait ImportProgress: Send + Sync {
    /// Called before a chapter's files are parsed.
    fn chapter_started(&self, chapter: &str, files: usize);
    /// Called after a file has been reconciled.
    fn file_imported(&self, chapter: &str, file: &str, outcome: Reconciled);
    /// Called when a file is skipped.
    fn file_skipped(&self, chapter: &str, file: &str, reason: &str);
    /// Called when the run completes.
    fn done(&self, report: &ImportReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ImportProgress for SilentProgress {
    fn chapter_started(&self, _chapter: &str, _files: usize) {}
    fn file_imported(&self, _chapter: &str, _file: &str, _outcome: Reconciled) {}
    fn file_skipped(&self, _chapter: &str, _file: &str, _reason: &str) {}
    fn done(&self, _report: &ImportReport) {}
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// Import every chapter under `config.root_dir` into `storage`.
#[instrument(skip_all, fields(root = %config.root_dir.display(), discipline = %config.discipline))]
pub async fn import_question_bank(
    config: &ImportConfig,
    storage: &Storage,
    progress: &dyn ImportProgress,
) -> Result<ImportReport> {
    let start = Instant::now();
    let mut report = ImportReport::default();

    if !config.root_dir.is_dir() {
        warn!("question root does not exist, nothing to import");
        report.elapsed = start.elapsed();
        progress.done(&report);
        return Ok(report);
    }

    let opts = ParseOptions::from(&config.time_limit);
    let mut ctx = ReconcileContext::load(storage, config.discipline).await?;
    let mut seen_chapters = HashSet::new();

    for (chapter, dir) in chapter_dirs(&config.root_dir)? {
        if !seen_chapters.insert(chapter_key(&chapter)) {
            warn!(%chapter, "another directory already provides this chapter, skipping");
            report.skipped.push(SkippedFile {
                path: dir,
                reason: "duplicate chapter name".into(),
            });
            continue;
        }

        let collected = collect_chapter(
            config,
            &opts,
            &mut ctx,
            &chapter,
            &dir,
            &mut report,
            progress,
        );
        let drafts = match collected {
            Ok(drafts) => drafts,
            Err(e) => {
                warn!(%chapter, error = %e, "chapter directory unreadable, skipping");
                report.skipped.push(SkippedFile {
                    path: dir,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        report.chapters += 1;
        write_chapter(storage, &mut ctx, &chapter, &drafts, &mut report, progress).await?;
    }

    report.elapsed = start.elapsed();
    info!(
        chapters = report.chapters,
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        removed = report.removed,
        skipped = report.skipped.len(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "import complete"
    );
    progress.done(&report);
    Ok(report)
}

/// Parse every question file of a chapter into drafts.
fn collect_chapter(
    config: &ImportConfig,
    opts: &ParseOptions,
    ctx: &mut ReconcileContext,
    chapter: &str,
    dir: &Path,
    report: &mut ImportReport,
    progress: &dyn ImportProgress,
) -> Result<Vec<QuestionDraft>> {
    let files = question_files(dir, config)?;
    progress.chapter_started(chapter, files.len());

    let (asset_dir, images) = match find_asset_dir(dir, &config.asset_dir_name)? {
        Some(asset_dir) => {
            let images = list_files(&dir.join(&asset_dir))?;
            (asset_dir, images)
        }
        None => (config.asset_dir_name.clone(), Vec::new()),
    };
    let location = AssetLocation {
        public_root: &config.public_asset_root,
        chapter,
        asset_dir: &asset_dir,
    };
    debug!(%chapter, files = files.len(), images = images.len(), "chapter scanned");

    let mut drafts = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file);
        let mut skip = |reason: String| {
            warn!(%chapter, %file, %reason, "skipping question file");
            progress.file_skipped(chapter, &file, &reason);
            report.skipped.push(SkippedFile {
                path: path.clone(),
                reason,
            });
        };

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                skip(format!("unreadable: {e}"));
                continue;
            }
        };

        let parsed = match parse_bytes(&bytes, opts) {
            Ok(parsed) => parsed,
            Err(rejection) => {
                skip(rejection.to_string());
                continue;
            }
        };

        let assets = match_assets(&file, &images, &location);
        let draft = QuestionDraft::new(chapter, &file, parsed, assets);
        if !ctx.claim(&draft.natural_key) {
            skip(format!("duplicate question key '{}'", draft.natural_key));
            continue;
        }
        drafts.push(draft);
    }
    Ok(drafts)
}

/// Reconcile a chapter's drafts inside one transaction.
async fn write_chapter(
    storage: &Storage,
    ctx: &mut ReconcileContext,
    chapter: &str,
    drafts: &[QuestionDraft],
    report: &mut ImportReport,
    progress: &dyn ImportProgress,
) -> Result<()> {
    storage.begin().await?;

    let result = async {
        let removed = ctx.begin_chapter(storage, chapter).await?;
        let mut outcomes = Vec::with_capacity(drafts.len());
        for draft in drafts {
            outcomes.push(ctx.apply(storage, draft).await?);
        }
        Ok::<_, QuizBankError>((removed, outcomes))
    }
    .await;

    match result {
        Ok((removed, outcomes)) => {
            storage.commit().await?;
            if removed > 0 {
                info!(%chapter, removed, "chapter cleared for bulk replace");
            }
            report.removed += removed;
            for (draft, outcome) in drafts.iter().zip(outcomes) {
                debug!(%chapter, file = %draft.source_file, %outcome, "question reconciled");
                report.record(outcome);
                progress.file_imported(chapter, &draft.source_file, outcome);
            }
            Ok(())
        }
        Err(e) => {
            if let Err(rollback_err) = storage.rollback().await {
                warn!(%chapter, error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Filesystem helpers
// ---------------------------------------------------------------------------

/// Chapter directories under `root`, sorted by name. Hidden entries and
/// non-UTF-8 names are ignored.
fn chapter_dirs(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut chapters = Vec::new();
    for entry in read_dir(root)? {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        match visible_name(&entry) {
            Some(name) => chapters.push((name, path)),
            None => debug!(path = %path.display(), "ignoring directory"),
        }
    }
    chapters.sort();
    Ok(chapters)
}

/// `*.txt` files of a chapter (extension matched case-insensitively) minus
/// the exclusion list, sorted by name.
fn question_files(dir: &Path, config: &ImportConfig) -> Result<Vec<String>> {
    let files = list_files(dir)?
        .into_iter()
        .filter(|name| {
            Path::new(name)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
        })
        .filter(|name| !config.is_excluded(name))
        .collect();
    Ok(files)
}

/// The on-disk name of the chapter's image directory, matched case-insensitively.
fn find_asset_dir(dir: &Path, wanted: &str) -> Result<Option<String>> {
    let wanted = wanted.to_lowercase();
    let mut found = None;
    for entry in read_dir(dir)? {
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = visible_name(&entry) {
            if name.to_lowercase() == wanted && found.as_ref().is_none_or(|f: &String| name < *f) {
                found = Some(name);
            }
        }
    }
    Ok(found)
}

/// Regular, visible files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut files: Vec<String> = read_dir(dir)?
        .into_iter()
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| visible_name(&entry))
        .collect();
    files.sort();
    Ok(files)
}

fn read_dir(dir: &Path) -> Result<Vec<std::fs::DirEntry>> {
    std::fs::read_dir(dir)
        .and_then(|entries| entries.collect::<std::io::Result<Vec<_>>>())
        .map_err(|e| QuizBankError::io(dir, e))
}

fn visible_name(entry: &std::fs::DirEntry) -> Option<String> {
    let name = entry.file_name().into_string().ok()?;
    (!name.starts_with('.')).then_some(name)
}
