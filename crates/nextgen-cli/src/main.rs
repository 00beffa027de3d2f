/*
[INPUT]:  CLI arguments, optional YAML configuration, persisted settings, OS shutdown signals
[OUTPUT]: Task submissions, task listings, live status updates, diagnostics
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, subcommands, or startup flow
*/

mod commands;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nextgen_client::{EndpointConfig, FileSettingsStore, TaskSync};
use nextgen_cli::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "nextgen", version, about = "Submit and track image generation tasks")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    /// Settings file holding the server address
    #[arg(long = "settings", value_name = "PATH")]
    settings_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a new generation task
    Submit {
        prompt: String,
        #[arg(long = "negative")]
        negative_prompt: Option<String>,
        #[arg(long)]
        steps: Option<u32>,
        #[arg(long, requires = "height")]
        width: Option<u32>,
        #[arg(long, requires = "width")]
        height: Option<u32>,
        #[arg(long = "cfg-scale")]
        cfg_scale: Option<f32>,
        /// Keep polling until the task finishes
        #[arg(long)]
        wait: bool,
    },
    /// List tasks known to the service
    History {
        #[arg(long)]
        json: bool,
    },
    /// Show one task
    Task { id: String },
    /// Poll until no task is submitted or processing
    Watch,
    /// Check that the service answers
    Ping,
    /// Query the service health endpoint
    Health,
    /// Run ping and health together
    Diagnose {
        /// Probe this address instead of the saved one (not persisted)
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show or change the service address
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
}

#[derive(Subcommand, Debug)]
enum AddressAction {
    Show,
    Set { address: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let config = load_config(args.config_path.as_ref())?;
    let settings_path = config.resolve_settings_path(args.settings_path.clone())?;
    info!(settings_path = %settings_path.display(), "loading settings");

    let settings = Arc::new(FileSettingsStore::new(&settings_path));
    let endpoint = Arc::new(
        EndpointConfig::load(settings, config.client_config()).context("configure endpoint")?,
    );
    let sync = TaskSync::with_config(endpoint, config.scheduler_config());

    let result = match args.command {
        Command::Submit {
            prompt,
            negative_prompt,
            steps,
            width,
            height,
            cfg_scale,
            wait,
        } => {
            let options = commands::SubmitOptions {
                negative_prompt,
                steps,
                size: width.zip(height),
                cfg_scale,
                wait,
            };
            commands::submit(&sync, &prompt, options).await
        }
        Command::History { json } => commands::history(&sync, json).await,
        Command::Task { id } => commands::show_task(&sync, &id).await,
        Command::Watch => commands::watch(&sync, None).await,
        Command::Ping => commands::ping(&sync).await,
        Command::Health => commands::health(&sync).await,
        Command::Diagnose { address, json } => {
            commands::diagnose(&sync, address.as_deref(), json).await
        }
        Command::Address { action } => match action {
            AddressAction::Show => commands::show_address(&sync),
            AddressAction::Set { address } => commands::set_address(&sync, &address),
        },
    };

    sync.shutdown();
    result
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<CliConfig> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    let path_str = path
        .to_str()
        .context("config path must be valid utf-8")?;
    CliConfig::from_file(path_str).context("load config")
}
