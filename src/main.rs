#![forbid(unsafe_code)]

mod config;
mod constants;
mod gui;
mod persistence;
mod telemetry;
mod wallet;
mod widget;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use config::{ConfigStore, Configuration, Environment, IframeMode, ThemeMode};
use gui::{run_gui, HarnessStore};
use persistence::{FileStorage, KeyValueStorage, MemoryStorage};
use widget::loopback::{load_record, Fixtures};
use widget::{LoopbackWidgetFactory, WidgetLifecycleManager};

/// Test harness for the wallet connector widget
#[derive(Parser, Debug)]
#[command(name = "connect-harness", version, long_about = None)]
struct Cli {
    /// Keep settings in memory instead of the settings file
    #[arg(long, global = true)]
    ephemeral: bool,

    /// JSON auth record replayed when the widget signs in
    #[arg(long, global = true, value_name = "FILE")]
    auth_fixture: Option<PathBuf>,

    /// JSON backup record replayed when the backup screen opens
    #[arg(long, global = true, value_name = "FILE")]
    backup_fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the harness window (default)
    Gui,

    /// Inspect or edit the persisted settings
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Print the flattened rows of a JSON session record
    Flatten {
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Change settings; endpoints are only accepted for the CUSTOM environment
    Set {
        /// popup, modal, half or sidebar
        #[arg(long)]
        mode: Option<IframeMode>,

        /// PRODUCTION, DEVELOPMENT or CUSTOM
        #[arg(long)]
        environment: Option<Environment>,

        #[arg(long)]
        base_url: Option<String>,

        #[arg(long)]
        base_server_url: Option<String>,

        /// light, dark or system
        #[arg(long)]
        theme: Option<ThemeMode>,
    },
}

#[derive(Serialize)]
struct ConfigReport<'a> {
    #[serde(flatten)]
    configuration: &'a Configuration,
    theme: ThemeMode,
    reload_needed: bool,
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var(constants::env::LOG_LEVEL)
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Gui) {
        Commands::Gui => {
            let fixtures = Fixtures::load(cli.auth_fixture.as_deref(), cli.backup_fixture.as_deref())?;
            // No ambient wallet outside the browser
            let factory = LoopbackWidgetFactory::new(fixtures);
            let routes = factory.route_log();
            let manager = WidgetLifecycleManager::new(Box::new(factory), None);
            run_gui(open_store(cli.ephemeral)?, manager, routes)
        }
        Commands::Config { action: ConfigCommand::Show } => print_config(&open_store(cli.ephemeral)?),
        Commands::Config {
            action:
                ConfigCommand::Set {
                    mode,
                    environment,
                    base_url,
                    base_server_url,
                    theme,
                },
        } => {
            let mut store = open_store(cli.ephemeral)?;
            // Environment first so endpoint edits see the new one
            if let Some(environment) = environment {
                store.switch_environment(environment)?;
            }
            if let Some(mode) = mode {
                store.set_iframe_mode(mode)?;
            }
            if let Some(url) = base_url {
                store.set_base_url(&url)?;
            }
            if let Some(url) = base_server_url {
                store.set_base_server_url(&url)?;
            }
            if let Some(theme) = theme {
                store.set_theme(theme)?;
            }

            if store.reload_needed() {
                info!("Settings changed, running harness windows need a restart");
            }
            print_config(&store)
        }
        Commands::Flatten { file } => print_flattened(&file),
    }
}

fn open_store(ephemeral: bool) -> Result<HarnessStore> {
    let storage: Box<dyn KeyValueStorage> = if ephemeral {
        info!("Using in-memory settings");
        Box::new(MemoryStorage::new())
    } else {
        let storage = FileStorage::open_default();
        info!(path = %storage.path().display(), "Using settings file");
        Box::new(storage)
    };

    ConfigStore::load(storage).context("Failed to load harness settings")
}

fn print_config(store: &HarnessStore) -> Result<()> {
    let report = ConfigReport {
        configuration: store.current(),
        theme: store.theme(),
        reload_needed: store.reload_needed(),
    };
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize configuration")?;
    println!("{json}");
    Ok(())
}

fn print_flattened(path: &Path) -> Result<()> {
    let record = load_record(path)?;
    for row in telemetry::flatten(&record) {
        println!("{} = {}", row.path, row.value);
    }
    Ok(())
}
