use std::path::Path;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_log::LogTracer;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::reload;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::targets::T_PROC;

static RELOAD: OnceCell<reload::Handle<EnvFilter, Registry>> = OnceCell::new();

/// Keeps the non-blocking file writers alive. Dropping it flushes them.
pub struct LoggingGuards {
    _file_guards: Vec<WorkerGuard>,
}

pub fn init(component: &str, root: &Path, cfg: &LoggingConfig) -> Result<LoggingGuards> {
    let filter = build_filter(cfg);
    let (filter_layer, handle) = reload::Layer::new(filter);
    let _ = RELOAD.set(handle);

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .compact();

    let log_dir = root.join("logs");

    let base = tracing_subscriber::registry()
        .with(filter_layer)
        .with(ErrorLayer::default())
        .with(stdout_layer);

    let mut guards = Vec::new();

    if let Err(err) = std::fs::create_dir_all(&log_dir) {
        base.try_init().ok();
        let _ = LogTracer::init();
        tracing::warn!("File logging disabled ({}): {}", log_dir.display(), err);
        return Ok(LoggingGuards {
            _file_guards: guards,
        });
    }

    let component_appender =
        tracing_appender::rolling::daily(&log_dir, component_log_name(component));
    let (component_writer, component_guard) = tracing_appender::non_blocking(component_appender);
    let component_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .compact()
        .with_writer(component_writer)
        .with_filter(component_targets());
    guards.push(component_guard);

    let (proc_layer, proc_guard) = subsystem_layer(&log_dir, "proc.log", T_PROC);
    guards.push(proc_guard);

    base.with(component_layer).with(proc_layer).try_init().ok();
    let _ = LogTracer::init();

    Ok(LoggingGuards {
        _file_guards: guards,
    })
}

/// Swap the active filter for one built from `cfg`.
pub fn apply(cfg: &LoggingConfig) -> Result<()> {
    let handle = RELOAD
        .get()
        .ok_or_else(|| anyhow::anyhow!("logging not initialized"))?;
    handle.reload(build_filter(cfg))?;
    Ok(())
}

fn build_filter(cfg: &LoggingConfig) -> EnvFilter {
    if !cfg.enabled {
        return EnvFilter::new("off");
    }
    EnvFilter::try_new(cfg.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub(crate) fn component_log_name(component: &str) -> String {
    format!("{component}.log")
}

fn component_targets() -> Targets {
    Targets::new()
        .with_default(LevelFilter::TRACE)
        .with_target(T_PROC, LevelFilter::OFF)
}

fn subsystem_layer<S>(
    log_dir: &Path,
    filename: &str,
    target: &'static str,
) -> (impl Layer<S> + Send + Sync, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let appender = tracing_appender::rolling::daily(log_dir, filename);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .compact()
        .with_writer(writer)
        .with_filter(Targets::new().with_target(target, LevelFilter::TRACE));
    (layer, guard)
}
