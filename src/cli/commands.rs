use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::app;
use crate::constants::STATE_DIR;
use crate::session::SessionStore;

use super::args::Commands;

/// Handle a subcommand; returns true when the command was fully handled
pub fn handle_command(command: &Commands, project_path: &Path) -> Result<bool> {
    match command {
        Commands::Init => {
            init_config(project_path)?;
            Ok(true)
        }
        Commands::Sessions => {
            list_sessions(project_path)?;
            Ok(true)
        }
        Commands::Show { id } => {
            show_session(project_path, id)?;
            Ok(true)
        }
    }
}

/// Write a commented default config under the project state directory
fn init_config(project_path: &Path) -> Result<()> {
    let state_dir = project_path.join(STATE_DIR);
    std::fs::create_dir_all(&state_dir)?;

    let config_file = state_dir.join("config.toml");
    if config_file.exists() {
        println!("Configuration already exists at {}", config_file.display());
        return Ok(());
    }

    let default_config = app::Config::default();
    let toml_string = toml::to_string_pretty(&default_config)?;
    std::fs::write(&config_file, toml_string)
        .with_context(|| format!("Failed to write config to {}", config_file.display()))?;

    println!("Created default configuration at {}", config_file.display());
    Ok(())
}

fn list_sessions(project_path: &Path) -> Result<()> {
    let store = SessionStore::new(project_path)?;
    let sessions = store.list()?;

    if sessions.is_empty() {
        println!("No saved sessions for this project.");
        return Ok(());
    }

    for session in sessions {
        println!("{}  {}", session.id.cyan(), session.summary());
    }
    Ok(())
}

fn show_session(project_path: &Path, id: &str) -> Result<()> {
    let store = SessionStore::new(project_path)?;
    let session = store.load(id)?;

    println!("{}", session.summary().bold());
    for step in &session.steps {
        println!("\n{}", format!("--- step {} ---", step.index).dimmed());
        println!("{}", step.render());
    }
    Ok(())
}
