use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use selkie::{
    agent::{LoopOutcome, ReactLoop},
    app::load_config,
    cli::{handle_command, Cli},
    models::ScriptedModel,
    session::{Session, SessionStore},
    tools::{AutoApprove, ConfirmationProvider, TerminalConfirmation},
    utils::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger(cli.verbose);

    let project_path = cli
        .path
        .clone()
        .unwrap_or_else(|| PathBuf::from("."))
        .canonicalize()
        .context("Project directory does not exist")?;

    if let Some(command) = &cli.command {
        if handle_command(command, &project_path)? {
            return Ok(());
        }
    }

    let Some(task) = cli.task.clone() else {
        anyhow::bail!("No task given. Run with --task \"...\" or see --help.");
    };

    let config = load_config(Some(&project_path)).unwrap_or_else(|e| {
        eprintln!("⚠️  Failed to load config: {}. Using defaults.", e);
        Default::default()
    });

    // The model transport is pluggable; the bundled backend replays a
    // recorded script of replies
    let replay = cli
        .replay
        .as_ref()
        .context("No model replay script given (--replay <file>)")?;
    let script = std::fs::read_to_string(replay)
        .with_context(|| format!("Failed to read replay script: {}", replay.display()))?;
    let replies: Vec<String> = script
        .split("\n---\n")
        .map(str::to_string)
        .filter(|r| !r.trim().is_empty())
        .collect();
    let model = Arc::new(ScriptedModel::new(replies));

    let confirm: Arc<dyn ConfirmationProvider> = if cli.yes {
        Arc::new(AutoApprove)
    } else {
        Arc::new(TerminalConfirmation)
    };

    println!("🦭 Selkie working in {}", project_path.display().to_string().green());
    println!("   Task: {}", task);

    let session = Session::new(task, project_path.clone());
    let store = SessionStore::new(&project_path)?;

    let mut agent = ReactLoop::new(&config, session, model, confirm)?.with_store(store);

    // Ctrl-C aborts the current suspension point and marks the session
    let interrupt = agent.interrupt_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.interrupt();
        }
    });

    let outcome = agent.run().await;
    let session = agent.session();

    match outcome {
        LoopOutcome::Done { summary } => {
            println!("\n{} after {} steps", "Done".green().bold(), session.steps.len());
            if let Some(summary) = summary {
                println!("{}", summary);
            }
            Ok(())
        }
        LoopOutcome::Aborted { reason } => {
            println!("\n{}: {}", "Aborted".yellow().bold(), reason);
            println!("Step history saved as session {}", session.id);
            std::process::exit(2);
        }
        LoopOutcome::Failed { error } => {
            eprintln!("\n{}: {}", "Failed".red().bold(), error);
            eprintln!("Step history saved as session {}", session.id);
            std::process::exit(1);
        }
    }
}
