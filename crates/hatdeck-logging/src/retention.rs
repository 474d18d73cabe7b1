use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};

use crate::config::LoggingConfig;

const MAX_LOG_BYTES: u64 = 64 * 1024 * 1024;

struct LogFile {
    path: PathBuf,
    modified: SystemTime,
    size: u64,
}

/// Delete logs older than `keep_days`, then the oldest ones until the total fits the size cap.
pub fn run_retention(root: &Path, cfg: &LoggingConfig) -> Result<()> {
    let log_root = root.join("logs");
    let mut entries = collect_log_files(&log_root)?;

    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(
            cfg.keep_days.saturating_mul(24 * 60 * 60),
        ))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    entries.retain(|entry| {
        if entry.modified < cutoff {
            if let Err(err) = fs::remove_file(&entry.path) {
                tracing::warn!("Failed to remove old log {}: {}", entry.path.display(), err);
                true
            } else {
                false
            }
        } else {
            true
        }
    });

    let mut total_size: u64 = entries.iter().map(|e| e.size).sum();
    if total_size > MAX_LOG_BYTES {
        entries.sort_by_key(|e| e.modified);
        for entry in entries {
            if total_size <= MAX_LOG_BYTES {
                break;
            }
            if let Err(err) = fs::remove_file(&entry.path) {
                tracing::warn!(
                    "Failed to remove log {} during size cap cleanup: {}",
                    entry.path.display(),
                    err
                );
                continue;
            }
            total_size = total_size.saturating_sub(entry.size);
        }
    }

    Ok(())
}

fn collect_log_files(log_root: &Path) -> Result<Vec<LogFile>> {
    let mut files = Vec::new();
    if !log_root.exists() {
        return Ok(files);
    }

    let entries =
        fs::read_dir(log_root).with_context(|| format!("reading {}", log_root.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("iterating {}", log_root.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let name = match path.file_name().and_then(|s| s.to_str()) {
            Some(name) => name,
            None => continue,
        };

        if !is_log_name(name) {
            continue;
        }

        let metadata = fs::metadata(&path).with_context(|| format!("stat {}", path.display()))?;
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push(LogFile {
            path,
            modified,
            size: metadata.len(),
        });
    }

    Ok(files)
}

fn is_log_name(name: &str) -> bool {
    const PREFIXES: [&str; 2] = ["hatdeck-ui.log", "proc.log"];
    PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn only_known_log_names_are_collected() {
        assert!(is_log_name("hatdeck-ui.log.2026-10-19"));
        assert!(is_log_name("proc.log"));
        assert!(!is_log_name("notes.txt"));
    }

    #[test]
    fn zero_keep_days_removes_every_known_log() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("proc.log.2026-01-01"), "old").unwrap();
        fs::write(logs.join("keep.me"), "other").unwrap();

        // Make sure the file is strictly older than "now".
        std::thread::sleep(Duration::from_millis(20));
        let cfg = LoggingConfig {
            keep_days: 0,
            ..LoggingConfig::default()
        };
        run_retention(dir.path(), &cfg).unwrap();

        assert!(!logs.join("proc.log.2026-01-01").exists());
        assert!(logs.join("keep.me").exists());
    }

    #[test]
    fn missing_log_dir_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        run_retention(dir.path(), &LoggingConfig::default()).unwrap();
    }
}
