use crate::charts::format_table;
use crate::config::AppSettings;
use crate::dashboard::DashboardCore;
use crate::http::HttpServer;
use crate::ingest::Tables;
use crate::models::{ChatEntry, DashboardView};
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "riskpilot", version, about = "Project risk dashboard")]
pub struct Cli {
    /// YAML settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the dashboard in the browser
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Skip the language model and always answer with the fallback
        #[arg(long)]
        no_advisor: bool,
    },
    /// Score three CSV files and print the result
    Analyze {
        #[arg(long)]
        projects: PathBuf,
        #[arg(long)]
        employees: PathBuf,
        #[arg(long)]
        finances: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
        /// Ask the advisor one question about the result
        #[arg(long)]
        ask: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

impl Command {
    /// Serving logs at info; one-shot analysis stays quiet on stderr.
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Self::Serve { .. } => "info",
            Self::Analyze { .. } => "warn",
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeReport {
    dashboard: Option<DashboardView>,
    skipped_projects: Vec<String>,
    answer: Option<ChatEntry>,
}

pub fn apply_overrides(settings: &mut AppSettings, command: &Command) {
    match command {
        Command::Serve { bind, port, no_advisor } => {
            if let Some(bind) = bind {
                settings.bind_addr = bind.clone();
            }
            if let Some(port) = port {
                settings.port = *port;
            }
            if *no_advisor {
                settings.advisor.enabled = false;
            }
        }
        Command::Analyze { seed, .. } => {
            if seed.is_some() {
                settings.simulation.seed = *seed;
            }
        }
    }
}

pub async fn execute(settings: AppSettings, command: Command) -> anyhow::Result<()> {
    let core = DashboardCore::new(settings).context("failed to build dashboard core")?;
    match command {
        Command::Serve { .. } => {
            HttpServer::new(core).start().await?;
        }
        Command::Analyze {
            projects,
            employees,
            finances,
            ask,
            json,
            ..
        } => {
            let tables = Tables::load(&projects, &employees, &finances)?;
            let session_id = core.open_session().await;
            let response = core.run_analysis(&session_id, tables).await?;
            let dashboard = core.dashboard(&session_id).await?;
            let answer = match ask {
                Some(question) => Some(core.ask(&session_id, &question).await?),
                None => None,
            };

            if json {
                let report = AnalyzeReport {
                    dashboard,
                    skipped_projects: response.skipped_projects,
                    answer,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(dashboard.as_ref(), &response.skipped_projects, answer.as_ref());
            }
        }
    }
    Ok(())
}

fn print_report(dashboard: Option<&DashboardView>, skipped: &[String], answer: Option<&ChatEntry>) {
    match dashboard {
        Some(view) => {
            println!("Executive Summary\n");
            println!("{}", view.summary_text);
            println!("{}", format_table(&view.rows));
        }
        None => println!("No project had both a team and a finance record."),
    }
    if !skipped.is_empty() {
        println!("\nSkipped projects: {}", skipped.join(", "));
    }
    if let Some(entry) = answer {
        println!("\nYou: {}\nAI: {}", entry.question, entry.answer);
    }
}
