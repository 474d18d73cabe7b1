use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::LoggingConfig;

pub fn config_path(root: &Path) -> PathBuf {
    root.join("config").join("logging.json")
}

/// Read the logging config, writing a default file when none exists yet.
/// A malformed file is not fatal: logging falls back to defaults.
pub fn read_config(root: &Path) -> LoggingConfig {
    let path = config_path(root);
    match fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                let cfg = LoggingConfig::default();
                let _ = write_config_atomic(root, &cfg);
                cfg
            } else {
                LoggingConfig::default()
            }
        }
    }
}

pub fn write_config_atomic(root: &Path, cfg: &LoggingConfig) -> Result<()> {
    let path = config_path(root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating logging config dir {}", parent.display()))?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(cfg).context("serializing logging config")?;

    let mut options = fs::OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(&tmp_path)
        .with_context(|| format!("opening {}", tmp_path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("writing {}", tmp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("syncing {}", tmp_path.display()))?;
    drop(file);

    fs::rename(&tmp_path, &path)
        .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn read_config_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let cfg = read_config(dir.path());
        assert_eq!(cfg, LoggingConfig::default());
        assert!(config_path(dir.path()).exists());
    }

    #[test]
    fn written_config_is_read_back() {
        let dir = TempDir::new().unwrap();
        let cfg = LoggingConfig {
            enabled: false,
            level: "hatdeck=trace".to_string(),
            keep_days: 3,
        };
        write_config_atomic(dir.path(), &cfg).unwrap();
        assert_eq!(read_config(dir.path()), cfg);
    }

    #[test]
    fn garbage_config_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let path = config_path(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert_eq!(read_config(dir.path()), LoggingConfig::default());
    }
}
