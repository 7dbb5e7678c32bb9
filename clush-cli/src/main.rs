//! clush: a hierarchical cluster administration shell.
//!
//! Runs one command given on the command line, a script, or an interactive
//! session.

mod cluster;
mod docs;
mod levels;
mod repl;
mod repl_input;

use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use clush_core::{Context, FileStackStore, LevelRegistrar, ShellConfig, SkillLevel};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::cluster::Cluster;

/// clush: navigate and administer a cluster from a tree of command levels
#[derive(Parser, Debug)]
#[command(name = "clush", version, about, long_about = None)]
struct Cli {
    /// Command to run, e.g. `configure show` (starts interactive mode if omitted)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,

    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Run commands from a file (`-` reads standard input)
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Skill level: operator, administrator or expert
    #[arg(long, value_name = "LEVEL")]
    skill_level: Option<SkillLevel>,

    /// Wait for every command to complete
    #[arg(long)]
    wait: bool,

    /// Do not save or restore the current level between sessions
    #[arg(long)]
    no_persist: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(cli: &Cli) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(EnvFilter::try_from_env("CLUSH_LOG").unwrap_or_else(|_| EnvFilter::new(filter)));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "clush", "clush")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let (json_layer, guard) = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::daily(&log_dir, "clush.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    guard
}

fn load_config(cli: &Cli, workspace: &std::path::Path) -> anyhow::Result<ShellConfig> {
    let mut config = clush_core::load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(level) = cli.skill_level {
        config.skill_level = level;
    }
    if cli.wait {
        config.wait = true;
    }
    if cli.no_persist {
        config.session.persist_stack = false;
    }
    config.validate()?;
    Ok(config)
}

fn build_context(config: &ShellConfig, persist: bool) -> anyhow::Result<Context> {
    let mut registrar = LevelRegistrar::new();
    docs::install(registrar.help_mut()).context("Embedded help reference is malformed")?;

    let mut builder = Context::builder(levels::ROOT)
        .registrar(registrar)
        .config(config);
    if persist {
        let location = config
            .session
            .state_file
            .clone()
            .or_else(FileStackStore::default_location);
        if let Some(path) = location {
            tracing::debug!(path = %path.display(), "Persisting level stack");
            builder = builder.store(FileStackStore::new(path));
        }
    }
    let mut ctx = builder.build().context("Could not register the level tree")?;
    ctx.insert_extension(Cluster::demo(Duration::from_millis(300)));
    Ok(ctx)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(&cli);

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let config = load_config(&cli, &workspace)?;
    let color = config.ui.color && io::stdout().is_terminal();

    if !cli.command.is_empty() {
        let ctx = build_context(&config, false)?;
        let ok = repl::run_single(ctx, &cli.command, color).await;
        return Ok(exit_code(ok));
    }

    if let Some(file) = &cli.file {
        let mut ctx = build_context(&config, false)?;
        let ok = if file.as_os_str() == "-" {
            repl::run_script(&mut ctx, io::stdin().lock(), "<stdin>", color).await?
        } else {
            let reader = std::fs::File::open(file)
                .with_context(|| format!("Cannot open {}", file.display()))?;
            let source = file.display().to_string();
            repl::run_script(&mut ctx, BufReader::new(reader), &source, color).await?
        };
        return Ok(exit_code(ok));
    }

    if !io::stdin().is_terminal() {
        let mut ctx = build_context(&config, false)?;
        let ok = repl::run_script(&mut ctx, io::stdin().lock(), "<stdin>", color).await?;
        return Ok(exit_code(ok));
    }

    let persist = config.session.persist_stack;
    let mut ctx = build_context(&config, persist)?;
    if persist && !ctx.restore_stack() && !cli.quiet {
        eprintln!("Could not return to the level of the last session; starting at the top.");
    }
    repl::run_interactive(ctx, &config, &workspace).await?;
    Ok(ExitCode::SUCCESS)
}

fn exit_code(ok: bool) -> ExitCode {
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
