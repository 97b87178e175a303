use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ocm_config::secrets::resolve_provider_secrets_from_env;
use ocm_config::AppConfig;
use ocm_runtime::workflow::{
    authorize_url, disable_trigger_workflow, fetch_workflow, quotes_workflow, reorganize_workflow,
    weekly_refresh_workflow,
};
use ocm_runtime::{Backends, FetchOptions};
use ocm_schemas::SystemClock;
use ocm_storage::reorganize::DEFAULT_PAGE_SIZE;
use ocm_storage::FLAT_CHAIN_PREFIX;
use serde_json::json;

mod prompt;

use prompt::StdinPrompt;

#[derive(Parser)]
#[command(name = "ocm")]
#[command(about = "Options-chain collector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and store the option chain of every symbol in QUOTES_LIST
    Fetch {
        /// Ignore the market-hours gate
        #[arg(long, default_value_t = false)]
        all_hours: bool,

        /// Fetch without uploading or recording anything
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Weekly manual step: re-authorize, store the credential, re-enable the trigger
    WeeklyRefresh,

    /// Disable the scheduled trigger rule
    DisableTrigger,

    /// Move flat-layout artifacts into the date-partitioned layout
    Reorganize {
        /// Listing prefix
        #[arg(long, default_value = FLAT_CHAIN_PREFIX)]
        prefix: String,

        /// Keys per listing page
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
    },

    /// Manual quote call; authorizes interactively if no credential is stored
    Quotes {
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Print the OAuth authorize URL
    AuthUrl,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();
    let cfg = AppConfig::from_env()?;
    let backends = Backends::file_backed(&cfg);

    match cli.cmd {
        Commands::Fetch { all_hours, dry_run } => {
            let secrets = resolve_provider_secrets_from_env()?;
            let records = fetch_workflow(
                &cfg,
                &secrets,
                &backends,
                Arc::new(SystemClock),
                FetchOptions {
                    on_hours_only: !all_hours,
                    persist: !dry_run,
                },
            )?;
            println!("{}", json!({"statusCode": 200, "body": records}));
        }

        Commands::WeeklyRefresh => {
            let secrets = resolve_provider_secrets_from_env()?;
            let toggle = weekly_refresh_workflow(&cfg, &secrets, &backends, &StdinPrompt)?;
            println!("{}", serde_json::to_string(&toggle)?);
        }

        Commands::DisableTrigger => {
            let toggle = disable_trigger_workflow(&cfg, &backends)?;
            println!("{}", serde_json::to_string(&toggle)?);
        }

        Commands::Reorganize { prefix, page_size } => {
            let report = reorganize_workflow(&cfg, &backends, &prefix, page_size)?;
            println!("{}", serde_json::to_string(&report)?);
        }

        Commands::Quotes { symbols } => {
            let secrets = resolve_provider_secrets_from_env()?;
            let doc = quotes_workflow(&cfg, &secrets, &backends, &symbols, Box::new(StdinPrompt))?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }

        Commands::AuthUrl => {
            let secrets = resolve_provider_secrets_from_env()?;
            println!("{}", authorize_url(&cfg, &secrets)?);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
