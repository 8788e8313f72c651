//! omnidb-sql: run SQL statements against any registered backend
//!
//! Reads `;`-terminated statements from stdin, executes them through an
//! OmniDB handle and prints the rows to stdout.
//!
//! ```bash
//! omnidb-sql -c db.toml < script.sql
//! omnidb-sql -c db.toml -i
//! ```
//!
//! Set RUST_LOG=debug (or pass `--verbose`) for lifecycle logging on stderr.

mod args;
mod commands;
mod config;
mod console;
mod editor;
mod formatter;
mod session;
mod statement;

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use omnidb_core::global_registry;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use args::Cli;
use console::Console;
use editor::{EditorInput, KeywordCompleter};
use formatter::{OutputFormat, unescape};
use session::{Session, SessionEnd};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli).await {
        Ok(end) if end.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            let mut console = Console::stderr(false);
            let _ = console.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<SessionEnd> {
    let config = config::load_config(&cli.config)?;
    let completer = match &cli.keywords {
        Some(path) => KeywordCompleter::from_file(path)?,
        None => KeywordCompleter::default(),
    };
    let registry = global_registry();
    let handle = registry.connect(&config).await?;
    tracing::info!(backend = %config.backend, "connected");

    let mut console = Console::stderr(cli.verbose);
    console.info(&format!(
        "connected to '{}' using the {} backend",
        config.database, config.backend
    ))?;

    let format = OutputFormat {
        delimiter: unescape(&cli.delimiter),
        separator: unescape(&cli.separator),
        header: cli.interactive,
    };
    let mut session = Session::new(
        handle,
        &config,
        format,
        cli.interactive,
        io::stdout().lock(),
        console,
    );

    let end = if cli.interactive && io::stdin().is_terminal() {
        session.run(EditorInput::new(completer)?).await?
    } else {
        let input = tokio::io::BufReader::new(tokio::io::stdin());
        session.run(input.lines()).await?
    };

    if let Err(e) = registry.destroy(session.into_handle()).await {
        tracing::warn!(error = %e, "closing the connection failed");
    }
    Ok(end)
}
