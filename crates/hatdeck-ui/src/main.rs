#![deny(unsafe_op_in_unsafe_fn)]

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use hatdeck_ui::{
    app::App,
    config::{Backend, Config},
    hw,
    runner::CommandLauncher,
};

#[derive(Debug, Parser)]
#[command(name = "hatdeck-ui", about = "Script launcher UI for the GFX HAT")]
struct Cli {
    /// Directory holding hatdeck.json, scripts/ and logs/.
    #[arg(long, env = "HATDECK_ROOT", default_value = ".")]
    root: PathBuf,
    /// Overrides display.backend from the config file.
    #[arg(long, env = "HATDECK_BACKEND", value_enum)]
    backend: Option<Backend>,
    /// Print the effective config as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = cli.root;

    let log_cfg = hatdeck_logging::fs::read_config(&root);
    let _logging_guards = hatdeck_logging::init("hatdeck-ui", &root, &log_cfg)?;
    let _log_watcher = match hatdeck_logging::spawn_watcher(&root) {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::warn!("Logging watcher disabled: {}", err);
            None
        }
    };
    if let Err(err) = hatdeck_logging::run_retention(&root, &log_cfg) {
        tracing::warn!("Log retention failed: {:#}", err);
    }

    let span = tracing::info_span!("hatdeck-ui", component = "hatdeck-ui");
    let _span_guard = span.enter();

    let mut config = Config::load(&root)
        .with_context(|| format!("loading config from {}", root.display()))?;
    if let Some(backend) = cli.backend {
        config.display.backend = backend;
    }
    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing::info!(backend = ?config.display.backend, entries = config.menu.len(), "Starting");
    let hardware = hw::open(&config).context("opening display backend")?;
    let app = App::new(&config, hardware, Box::new(CommandLauncher));
    let stop = app.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received SIGINT/SIGTERM, shutting down...");
        stop.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!("Failed to set signal handler: {e}");
    }
    app.run()
}
