//! blogdesk: write blog entries from the terminal.
//!
//! Entries go straight to the site when it can be reached and are kept as
//! drafts on this machine when it cannot.
//!
//! Usage:
//!   blogdesk new --subject "Field notes" --summary-file notes.html
//!   blogdesk edit 42 --attach diagram.png
//!   blogdesk drafts
//!   blogdesk sync

use anyhow::{bail, Context, Result};
use blogdesk_cli::{App, AppConfig, EntryInput, TerminalUi};
use blogdesk_sync::SaveOutcome;
use blogdesk_types::{EntryKey, PublishState};
use chrono::DateTime;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "blogdesk")]
#[command(about = "Blog editor with offline drafts")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "blogdesk.toml")]
    config: PathBuf,

    /// Treat the device as offline: attachments are staged on disk first
    #[arg(long)]
    offline: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a new entry
    New(EntryArgs),
    /// Edit an entry by id, or an offline-only entry by `new-<created>`
    Edit {
        key: EntryKey,
        #[command(flatten)]
        entry: EntryArgs,
    },
    /// List entries waiting on this machine
    Drafts,
    /// Send every waiting entry to the site
    Sync,
}

#[derive(ClapArgs, Debug)]
struct EntryArgs {
    #[arg(long)]
    subject: Option<String>,

    /// Entry body (HTML)
    #[arg(long, conflicts_with = "summary_file")]
    summary: Option<String>,

    /// Read the entry body from a file
    #[arg(long)]
    summary_file: Option<PathBuf>,

    /// site, public or draft
    #[arg(long)]
    state: Option<PublishState>,

    /// Associate the entry with this course
    #[arg(long)]
    course: Option<i64>,

    /// Remove the course association
    #[arg(long, conflicts_with = "course")]
    no_course: bool,

    /// Remove the activity association
    #[arg(long)]
    no_module: bool,

    /// File to attach (repeatable)
    #[arg(long)]
    attach: Vec<PathBuf>,

    /// Attachment name to remove (repeatable)
    #[arg(long)]
    detach: Vec<String>,
}

impl EntryArgs {
    fn into_input(self) -> Result<EntryInput> {
        let summary = match (self.summary, self.summary_file) {
            (Some(text), _) => Some(text),
            (None, Some(path)) => Some(
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
            ),
            (None, None) => None,
        };
        Ok(EntryInput {
            subject: self.subject,
            summary,
            publish_state: self.state,
            course_id: self.course,
            associate_with_course: self.no_course.then_some(false),
            associate_with_module: self.no_module.then_some(false),
            attach: self.attach,
            detach: self.detach,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let mut config = AppConfig::load(&args.config)?;
    if let Ok(token) = std::env::var("BLOGDESK_TOKEN") {
        config.moodle.token = token;
    }

    let ui = Arc::new(TerminalUi::new(args.yes));
    let app = App::open(&config, ui)?;
    if args.offline {
        info!("Offline mode: attachments stay on disk");
        app.set_online(false);
    }

    match args.command {
        Command::New(entry) => {
            let outcome = app.create(&entry.into_input()?).await?;
            report_outcome(outcome)
        }
        Command::Edit { key, entry } => match app.edit(key, &entry.into_input()?).await? {
            Some(outcome) => report_outcome(outcome),
            None => {
                println!("Nothing changed.");
                Ok(())
            }
        },
        Command::Drafts => {
            let drafts = app.drafts().await?;
            if drafts.is_empty() {
                println!("No offline entries.");
            }
            for draft in drafts {
                let files = draft.attachments.as_ref().map_or(0, |a| a.online.len() + a.offline);
                let modified = DateTime::from_timestamp(draft.last_modified, 0)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("{:<16} {:<16} {:>2} file(s)  {}", draft.key, modified, files, draft.subject);
            }
            Ok(())
        }
        Command::Sync => {
            let report = app.sync().await?;
            println!(
                "Synced {}, discarded {}, skipped {}, still waiting {}",
                report.synced.len(),
                report.discarded.len(),
                report.skipped.len(),
                report.failed.len()
            );
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            Ok(())
        }
    }
}

fn report_outcome(outcome: SaveOutcome) -> Result<()> {
    match outcome {
        SaveOutcome::Synced(id) => println!("Saved entry {id}."),
        SaveOutcome::StagedOffline(key) => {
            println!("Saved entry {key} on this machine. Run `blogdesk sync` to send it.")
        }
        SaveOutcome::Invalid => bail!("Subject and summary are required"),
        SaveOutcome::Rejected(_) | SaveOutcome::Failed(_) => bail!("The entry was not saved"),
    }
    Ok(())
}
