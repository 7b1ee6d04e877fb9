use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use allocation::{Change, Confirm, Derived, Session};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use shared::{domain::Record, persisted::PersistedRecord};
use storage::{FileStore, StateStore};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::load_settings;

/// Splits a monthly social-security fund across companies by logged hours.
#[derive(Parser, Debug)]
#[command(name = "gigfund", version)]
struct Cli {
    /// Config file (defaults to ./gigfund.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the stored sheet.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Storage key the sheet is kept under.
    #[arg(long, global = true)]
    key: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the hours table and the fund summary.
    Show {
        #[arg(long)]
        json: bool,
    },
    AddWorker {
        #[arg(default_value = "")]
        name: String,
    },
    RemoveWorker {
        index: usize,
    },
    RenameWorker {
        index: usize,
        name: String,
    },
    /// Set the hours a worker logged for a company. Non-numeric input counts as 0.
    SetHours {
        worker: usize,
        company: usize,
        #[arg(allow_hyphen_values = true)]
        hours: String,
    },
    /// Set the flat per-worker contribution. Non-numeric input counts as 0.
    SetRate {
        #[arg(allow_hyphen_values = true)]
        rate: String,
    },
    /// Set the month label; defaults to the current month.
    SetMonth {
        month: Option<String>,
    },
    AddCompany {
        name: String,
    },
    RenameCompany {
        index: usize,
        name: String,
    },
    RemoveCompany {
        index: usize,
    },
    Save,
    /// Restore the default sheet.
    Reset {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Serialize)]
struct Snapshot<'a> {
    record: PersistedRecord,
    derived: &'a Derived,
}

struct TerminalPrompt {
    assume_yes: bool,
}

impl Confirm for TerminalPrompt {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    fn acknowledge(&mut self, message: &str) {
        println!("{message}");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref());
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }
    if let Some(key) = cli.key {
        settings.storage_key = key;
    }
    debug!(?settings, "settings resolved");

    let store = StateStore::with_key(FileStore::new(&settings.data_dir), settings.storage_key);
    let mut session = Session::open(store);
    session.subscribe(|change: Change, record: &Record, derived: &Derived| {
        print!("{}", render::region(change, record, derived));
    });

    match cli.command.unwrap_or(Command::Show { json: false }) {
        Command::Show { json: false } => {
            print!(
                "{}\n{}",
                render::table(session.record(), session.derived()),
                render::summary(session.record(), session.derived())
            );
        }
        Command::Show { json: true } => {
            let snapshot = Snapshot {
                record: PersistedRecord::from(session.record()),
                derived: session.derived(),
            };
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::AddWorker { name } => {
            session.add_worker(name);
        }
        Command::RemoveWorker { index } => {
            session
                .remove_worker(index)
                .with_context(|| format!("cannot remove worker {index}"))?;
        }
        Command::RenameWorker { index, name } => {
            session
                .rename_worker(index, name)
                .with_context(|| format!("cannot rename worker {index}"))?;
        }
        Command::SetHours {
            worker,
            company,
            hours,
        } => {
            session
                .edit_hours(worker, company, &hours)
                .with_context(|| format!("cannot set hours for worker {worker}, company {company}"))?;
        }
        Command::SetRate { rate } => {
            session.edit_rate(&rate);
        }
        Command::SetMonth { month } => {
            let month = month.unwrap_or_else(|| chrono::Local::now().format("%B").to_string());
            session.set_month(month);
        }
        Command::AddCompany { name } => {
            session.add_company(name);
        }
        Command::RenameCompany { index, name } => {
            session
                .rename_company(index, name)
                .with_context(|| format!("cannot rename company {index}"))?;
        }
        Command::RemoveCompany { index } => {
            session
                .remove_company(index)
                .with_context(|| format!("cannot remove company {index}"))?;
        }
        Command::Save => {
            session
                .save(&mut TerminalPrompt { assume_yes: false })
                .with_context(|| format!("failed to save to {}", settings.data_dir.display()))?;
        }
        Command::Reset { yes } => {
            if !session.reset(&mut TerminalPrompt { assume_yes: yes }) {
                println!("Reset cancelled.");
            }
        }
    }

    Ok(())
}
