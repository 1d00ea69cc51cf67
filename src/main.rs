//! # jira-lens CLI (`jlens`)
//!
//! Search Jira issues from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! jlens --config ./config/jlens.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `jlens search "<text>"` | Compile, retrieve, filter and page through issues |
//! | `jlens extract <url>` | Download one attachment and print its text |
//! | `jlens probe` | Show which optional server features are available |
//!
//! ## Examples
//!
//! ```bash
//! # Free-text search over two projects, last 30 days
//! jlens search "login crash" --project BCC --project CSR --window 30d
//!
//! # Exact phrase, only open issues on Android, second page
//! jlens search '"sync stalls"' --status Open --platform Android --page 2
//!
//! # OCR the screenshots on the shown page
//! jlens search "blank screen" --ocr
//!
//! # Machine-readable output
//! jlens search "timeout" --json
//! ```
//!
//! Credentials come from `JIRA_USERNAME` and `JIRA_API_TOKEN` unless the
//! config names other variables.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use jira_lens::config::{self, Config};
use jira_lens::models::{SearchRequest, TimeWindow};
use jira_lens::search::{self, SearchArgs};
use jira_lens::{client, extract};

/// jira-lens: weighted Jira search with local facets and attachment OCR.
#[derive(Parser)]
#[command(
    name = "jlens",
    about = "jira-lens: an interactive Jira issue-search client",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/jlens.toml`. May be absent when `--base-url`
    /// is given.
    #[arg(long, global = true, default_value = "./config/jlens.toml")]
    config: PathBuf,

    /// Jira base URL; overrides `jira.base_url`.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search issues.
    ///
    /// Text wrapped in double quotes is matched as an exact phrase.
    /// Otherwise every word must appear, with signal words such as
    /// "crash" or "error" weighted up.
    Search {
        /// Free text; may be empty when a filter is given.
        #[arg(default_value = "")]
        text: String,

        /// Project key (repeatable).
        #[arg(long = "project", short)]
        projects: Vec<String>,

        /// Created within: 7d, 30d, 1y or all.
        #[arg(long, default_value = "all")]
        window: TimeWindow,

        /// Sort: updated, updated_asc, created, created_asc, priority.
        #[arg(long, default_value = "updated")]
        sort: String,

        /// Status facet (repeatable).
        #[arg(long = "status", short)]
        statuses: Vec<String>,

        /// Platform facet.
        #[arg(long)]
        platform: Option<String>,

        /// Page to show (1-based; clamped to the last page).
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Issues per page; defaults to `display.page_size`.
        #[arg(long)]
        page_size: Option<usize>,

        /// OCR image attachments of the shown issues.
        #[arg(long)]
        ocr: bool,

        /// Print the page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Download one attachment and print its extracted text.
    Extract {
        /// Attachment content URL.
        url: String,

        /// MIME type of the attachment.
        #[arg(long, default_value = "image/png")]
        mime: String,
    },

    /// Probe the server for optional capabilities.
    Probe,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match (&cli.base_url, cli.config.exists()) {
        (Some(url), false) => Config::minimal(url),
        _ => config::load_config(&cli.config)?,
    };
    if let Some(ref url) = cli.base_url {
        cfg.jira.base_url = url.clone();
    }
    config::validate(&cfg)?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = resolve_config(&cli)?;

    match cli.command {
        Commands::Search {
            text,
            projects,
            window,
            sort,
            statuses,
            platform,
            page,
            page_size,
            ocr,
            json,
        } => {
            let request = SearchRequest {
                text,
                projects,
                window,
                sort,
                statuses,
                platform,
            };
            search::run_search(
                &cfg,
                SearchArgs {
                    request,
                    page,
                    page_size,
                    ocr,
                    json,
                },
            )
            .await?;
        }
        Commands::Extract { url, mime } => {
            extract::run_extract(&cfg, &url, &mime).await?;
        }
        Commands::Probe => {
            client::run_probe(&cfg).await?;
        }
    }

    Ok(())
}
