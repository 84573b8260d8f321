//! aec - fill and submit Animal Ethics Committee applications from a terminal
//!
//! # Commands
//! - `aec questionnaires` - List the questionnaires applications can be made against
//! - `aec applications` - List your applications
//! - `aec new <slug>` - Start an application
//! - `aec fill <key>` - Fill, review and submit an application
//! - `aec review <key>` - Print an application's answers
//! - `aec visibility --questionnaire FILE` - Show which questions a set of answers reveals

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use aec_form::ClientConfig;

/// Animal Ethics Committee application client
#[derive(Parser)]
#[command(name = "aec")]
#[command(author, version, about = "Fill and submit Animal Ethics Committee applications")]
struct Cli {
    /// Config file (default: config.toml in the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base64-encoded JSON client config, as embedded by the web client
    #[arg(long, global = true, env = "AEC_CLIENT_CONFIG", hide_env_values = true)]
    bootstrap: Option<String>,

    /// API base URL
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Directory for local drafts
    #[arg(long, global = true)]
    drafts_dir: Option<PathBuf>,

    /// Plain prompts without colors
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available questionnaires
    Questionnaires {
        /// List the questionnaires bundled with this client
        #[arg(long)]
        offline: bool,
    },

    /// List your applications
    Applications,

    /// Start a new application
    New {
        /// Questionnaire slug
        slug: String,
    },

    /// Fill in an application step by step
    Fill {
        /// Application key (any name when offline)
        key: String,

        /// Questionnaire JSON file to use instead of the server's
        #[arg(short, long)]
        questionnaire: Option<PathBuf>,

        /// Walk-back table JSON file
        #[arg(long)]
        followups: Option<PathBuf>,

        /// Keep answers in a local draft only
        #[arg(long)]
        offline: bool,
    },

    /// Print the answers of an application
    Review {
        /// Application key
        key: String,

        /// Review the local draft only
        #[arg(long)]
        offline: bool,

        /// Questionnaire JSON file (offline)
        #[arg(short, long)]
        questionnaire: Option<PathBuf>,

        /// Walk-back table JSON file
        #[arg(long)]
        followups: Option<PathBuf>,
    },

    /// Show which questions are visible for a set of answers
    Visibility {
        /// Questionnaire JSON file
        #[arg(short, long)]
        questionnaire: PathBuf,

        /// Answers JSON file
        #[arg(short, long)]
        answers: Option<PathBuf>,

        /// Walk-back table JSON file
        #[arg(short, long)]
        followups: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let config = match (&cli.config, &cli.bootstrap) {
        (Some(path), _) => ClientConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        (None, Some(blob)) => {
            ClientConfig::from_base64_json(blob).context("decoding AEC_CLIENT_CONFIG")?
        }
        (None, None) => ClientConfig::load_default().context("loading default config")?,
    };

    let mut config = config.with_env_overrides();
    if let Some(api_base) = &cli.api_base {
        config.api_base = api_base.clone();
    }
    if let Some(drafts_dir) = &cli.drafts_dir {
        config.drafts_dir = Some(drafts_dir.clone());
    }
    Ok(config)
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let wizard = commands::Wizard::new(config, cli.plain);

    match cli.command {
        Commands::Questionnaires { offline } => wizard.questionnaires(offline),
        Commands::Applications => wizard.applications(),
        Commands::New { slug } => wizard.create(&slug),
        Commands::Fill {
            key,
            questionnaire,
            followups,
            offline,
        } => wizard.fill(&key, questionnaire.as_deref(), followups.as_deref(), offline),
        Commands::Review {
            key,
            offline,
            questionnaire,
            followups,
        } => wizard.review(&key, questionnaire.as_deref(), followups.as_deref(), offline),
        Commands::Visibility {
            questionnaire,
            answers,
            followups,
        } => commands::visibility(&questionnaire, answers.as_deref(), followups.as_deref()),
    }
}
