//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use quizbank_core::catalog;
use quizbank_core::scoring::{Submission, score_submission};
use quizbank_core::{ImportProgress, ImportReport, Reconciled, import_question_bank};
use quizbank_shared::{
    AppConfig, ImportConfig, ImportDiscipline, init_config, load_config, load_config_from,
};
use quizbank_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// quizbank — import and serve plain-text quiz question banks.
#[derive(Parser)]
#[command(
    name = "quizbank",
    version,
    about = "Import plain-text quiz questions into a question bank and score answers.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.quizbank/quizbank.toml.
    #[arg(long, global = true, env = "QUIZBANK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file (overrides storage.db_path).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Import every chapter of a question tree.
    Import {
        /// Question root directory (overrides import.root_dir).
        #[arg(long)]
        root: Option<PathBuf>,

        /// Re-import discipline: upsert or bulk-replace.
        #[arg(long)]
        discipline: Option<ImportDiscipline>,
    },

    /// List chapter names.
    Chapters,

    /// Print a chapter's questions as served to quiz takers (JSON).
    Questions {
        /// Chapter name (case-insensitive).
        #[arg(long)]
        chapter: String,

        /// Seed for choice shuffling, for reproducible output.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Score a JSON submission file.
    Score {
        /// Path to a JSON file: {"user_id": ..., "answers": [{"question_id", "choice_ids"}]}.
        #[arg(long)]
        file: PathBuf,

        /// Record mistakes for this user (overrides user_id in the file).
        #[arg(long)]
        user: Option<String>,
    },

    /// List a user's recorded mistakes, newest first.
    Mistakes {
        #[arg(long)]
        user: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "quizbank=info",
        1 => "quizbank=debug",
        _ => "quizbank=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref())?;
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.storage.db_path));

    match cli.command {
        Command::Import { root, discipline } => {
            cmd_import(&config, &db_path, root, discipline).await
        }
        Command::Chapters => cmd_chapters(&db_path).await,
        Command::Questions { chapter, seed } => cmd_questions(&db_path, &chapter, seed).await,
        Command::Score { file, user } => cmd_score(&db_path, &file, user).await,
        Command::Mistakes { user } => cmd_mistakes(&db_path, &user).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Open an existing database for reading.
async fn open_existing(db_path: &Path) -> Result<Storage> {
    if !db_path.exists() {
        return Err(eyre!(
            "no database at '{}'; run `quizbank import` first",
            db_path.display()
        ));
    }
    Ok(Storage::open_readonly(db_path).await?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_import(
    config: &AppConfig,
    db_path: &Path,
    root: Option<PathBuf>,
    discipline: Option<ImportDiscipline>,
) -> Result<()> {
    let mut import_config = ImportConfig::from(config);
    if let Some(root) = root {
        import_config.root_dir = root;
    }
    if let Some(discipline) = discipline {
        import_config.discipline = discipline;
    }

    info!(
        root = %import_config.root_dir.display(),
        db = %db_path.display(),
        discipline = %import_config.discipline,
        "importing question bank"
    );

    let storage = Storage::open(db_path).await?;
    let reporter = CliProgress::new();
    let report = import_question_bank(&import_config, &storage, &reporter).await?;

    println!();
    println!("  Import finished.");
    println!("  Chapters:  {}", report.chapters);
    println!("  Created:   {}", report.created);
    println!("  Updated:   {}", report.updated);
    println!("  Unchanged: {}", report.unchanged);
    if report.removed > 0 {
        println!("  Removed:   {}", report.removed);
    }
    println!("  Skipped:   {}", report.skipped.len());
    for skipped in &report.skipped {
        println!("    {} ({})", skipped.path.display(), skipped.reason);
    }
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_chapters(db_path: &Path) -> Result<()> {
    let storage = open_existing(db_path).await?;
    for chapter in catalog::list_chapters(&storage).await? {
        println!("{chapter}");
    }
    Ok(())
}

async fn cmd_questions(db_path: &Path, chapter: &str, seed: Option<u64>) -> Result<()> {
    let storage = open_existing(db_path).await?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let questions = catalog::chapter_questions(&storage, chapter, &mut rng).await?;
    if questions.is_empty() {
        return Err(eyre!("no questions in chapter '{chapter}'"));
    }
    println!("{}", serde_json::to_string_pretty(&questions)?);
    Ok(())
}

async fn cmd_score(db_path: &Path, file: &Path, user: Option<String>) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read submission '{}': {e}", file.display()))?;
    let mut submission = Submission::from_json(&json)?;
    if user.is_some() {
        submission.user_id = user;
    }

    let storage = Storage::open(db_path).await?;
    let report = score_submission(&storage, &submission).await?;

    println!();
    println!("  Score: {}/{}", report.correct, report.total);
    for wrong in &report.incorrect {
        println!();
        println!("  {}", wrong.question_text);
        println!("    yours:   {}", wrong.chosen.join(", "));
        println!("    correct: {}", wrong.correct.join(", "));
    }
    if !report.skipped.is_empty() {
        println!();
        println!("  Skipped {} unanswered or unknown question(s)", report.skipped.len());
    }
    if let Some(user) = &submission.user_id {
        if !report.incorrect.is_empty() {
            println!("  Recorded {} mistake(s) for {user}", report.incorrect.len());
        }
    }
    println!();

    Ok(())
}

async fn cmd_mistakes(db_path: &Path, user: &str) -> Result<()> {
    let storage = open_existing(db_path).await?;
    let mistakes = storage.list_mistakes(user).await?;
    if mistakes.is_empty() {
        println!("No mistakes recorded for {user}.");
        return Ok(());
    }

    for mistake in mistakes {
        let text = match storage.get_question(&mistake.question_id).await? {
            Some(question) => question.text,
            None => "(question no longer exists)".to_string(),
        };
        println!(
            "{}  {}  [{}]",
            mistake.created_at.format("%Y-%m-%d %H:%M"),
            text,
            mistake.chosen_choice_ids.join(", ")
        );
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ImportProgress for CliProgress {
    fn chapter_started(&self, chapter: &str, files: usize) {
        self.spinner
            .set_message(format!("Chapter {chapter} ({files} files)"));
    }

    fn file_imported(&self, chapter: &str, file: &str, outcome: Reconciled) {
        self.spinner
            .set_message(format!("{chapter}/{file}: {outcome}"));
    }

    fn file_skipped(&self, chapter: &str, file: &str, reason: &str) {
        self.spinner
            .println(format!("  skipped {chapter}/{file}: {reason}"));
    }

    fn done(&self, _report: &ImportReport) {
        self.spinner.finish_and_clear();
    }
}
