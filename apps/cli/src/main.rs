//! quizbank CLI — imports plain-text quiz question banks.
//!
//! Walks a directory of chapters, parses question files into a libSQL
//! question bank, and serves and scores quizzes from it.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
