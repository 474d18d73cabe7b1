use std::path::Path;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::fs::{config_path, read_config};
use crate::init::apply;

/// Watch `<root>/config/logging.json` and reload the filter whenever it changes.
pub fn spawn_watcher(root: &Path) -> Result<JoinHandle<()>> {
    let root = root.to_path_buf();
    let path = config_path(&root);
    let watch_dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("missing logging config parent dir"))?
        .to_path_buf();

    std::fs::create_dir_all(&watch_dir)
        .with_context(|| format!("creating logging config dir {}", watch_dir.display()))?;

    let handle = thread::Builder::new()
        .name("log-watcher".to_string())
        .spawn(move || {
            let (tx, rx) = mpsc::channel();
            let mut watcher = match notify::recommended_watcher(tx) {
                Ok(watcher) => watcher,
                Err(err) => {
                    tracing::warn!("Failed to start logging watcher: {}", err);
                    return;
                }
            };

            if let Err(err) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
                tracing::warn!("Failed to watch logging config dir: {}", err);
                return;
            }

            loop {
                match rx.recv() {
                    Ok(event) => handle_event(event, &root, &path),
                    Err(err) => {
                        tracing::warn!("Logging watcher stopped: {}", err);
                        return;
                    }
                }
            }
        })
        .context("spawning logging watcher thread")?;

    Ok(handle)
}

fn handle_event(event: notify::Result<Event>, root: &Path, path: &Path) {
    let event = match event {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!("Logging watcher error: {}", err);
            return;
        }
    };

    if !matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    ) {
        return;
    }

    if !event.paths.iter().any(|p| p == path) {
        return;
    }

    let cfg = read_config(root);
    match apply(&cfg) {
        Ok(()) => tracing::info!(level = %cfg.level, enabled = cfg.enabled, "Logging config reloaded"),
        Err(err) => tracing::warn!("Failed to apply logging config: {}", err),
    }
}
