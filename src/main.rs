//! obs-hotkeyd - OBS hotkeys from evdev keyboards

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use obs_hotkeyd::config::AppConfig;
use obs_hotkeyd::hotkeys::{Action, HotkeyTable};
use obs_hotkeyd::input::evdev_source::{list_keyboards, open_keyboards};
use obs_hotkeyd::obs::{ObsConnection, WsConnector};
use obs_hotkeyd::{app, keys, paths};

/// Trigger OBS recording/streaming actions from keyboard hotkeys
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// OBS WebSocket URL (overrides obs.url)
    #[arg(long, env = "OBS_URL")]
    obs_url: Option<String>,

    /// OBS WebSocket password (overrides obs.password)
    #[arg(long, env = "OBS_PASSWORD", hide_env_values = true)]
    obs_password: Option<String>,

    /// List detected keyboard devices and exit
    #[arg(long)]
    list_devices: bool,

    /// List supported key names and actions and exit
    #[arg(long)]
    list_keys: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    if args.list_keys {
        print_keys();
        return Ok(());
    }

    if args.list_devices {
        print_devices();
        return Ok(());
    }

    let config = load_config(&args).await?;

    let table = HotkeyTable::build(&config.hotkeys)?;
    info!("Registered hotkeys:");
    table.log_bindings();

    let keyboards = open_keyboards(&config.input.devices)?;

    let mut obs = ObsConnection::new(WsConnector, config.connection_settings());

    app::run(
        keyboards,
        table,
        &mut obs,
        config.loop_settings(),
        shutdown_signal(),
    )
    .await;

    info!("obs-hotkeyd shutdown complete");
    Ok(())
}

async fn load_config(args: &Args) -> Result<AppConfig> {
    let path = args.config.clone().or_else(paths::find_config);
    let mut config = match &path {
        Some(path) => {
            info!("Configuration file: {}", path.display());
            AppConfig::load(path).await?
        },
        None => {
            info!("No configuration file found, using defaults");
            AppConfig::default()
        },
    };

    if let Some(url) = &args.obs_url {
        config.obs.url = url.clone();
    }
    if let Some(password) = &args.obs_password {
        config.obs.password = Some(password.clone());
    }
    config
        .validate()
        .context("Invalid configuration after command-line overrides")?;

    Ok(config)
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

fn print_devices() {
    println!("\n{}", "=== Keyboard Devices ===".bold().cyan());

    let keyboards = list_keyboards();
    if keyboards.is_empty() {
        println!("  {}", "No keyboards found (are you root or in the `input` group?)".yellow());
        return;
    }
    for keyboard in keyboards {
        println!(
            "  {}  {}",
            keyboard.path.display().to_string().green(),
            keyboard.name
        );
    }
}

fn print_keys() {
    println!("\n{}", "=== Key Names ===".bold().cyan());
    for (name, key) in keys::KEY_NAMES {
        println!("  {:<12} {}", name.green(), format!("({})", key.code()).dimmed());
    }

    println!("\n{}", "=== Actions ===".bold().cyan());
    for action in Action::ALL {
        println!(
            "  {:<22} {}",
            action.config_name().green(),
            action.description()
        );
    }
}
