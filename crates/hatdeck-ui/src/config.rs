use std::{
    collections::HashSet,
    fs,
    io::Write,
    path::{Path, PathBuf},
    process,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::gesture::{Symbol, DEFAULT_SECRET};
use crate::input::Button;
use crate::menu::{default_entries, MenuEntry};

pub const CONFIG_FILE: &str = "hatdeck.json";

/// Problems repaired (or reported) while loading the config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("duplicate menu label {0:?} dropped")]
    DuplicateLabel(String),
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    #[error("unlock secret is empty or has unknown symbols, using the default")]
    InvalidSecret,
    #[error("input channel map must list each pad exactly once, using the default")]
    ChannelMap,
    #[error("script {} does not exist", .0.display())]
    MissingScript(PathBuf),
}

impl ConfigError {
    /// Whether `normalize` rewrote the value, so the file should be saved again.
    pub fn repaired(&self) -> bool {
        !matches!(self, Self::MissingScript(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub brightness: BrightnessConfig,
    #[serde(default)]
    pub unlock: UnlockConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
    #[serde(default = "default_entries")]
    pub menu: Vec<MenuEntry>,
    #[serde(skip)]
    pub root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            timing: TimingConfig::default(),
            brightness: BrightnessConfig::default(),
            unlock: UnlockConfig::default(),
            input: InputConfig::default(),
            hardware: HardwareConfig::default(),
            menu: default_entries(),
            root: PathBuf::new(),
        }
    }
}

impl Config {
    pub fn path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE)
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        if !path.exists() {
            let mut default = Config::default();
            default.save(&path)?;
            default.finish(root);
            return Ok(default);
        }

        let contents =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;

        let issues = config.normalize();
        for issue in &issues {
            tracing::warn!(path = %path.display(), "Config: {issue}");
        }
        if issues.iter().any(ConfigError::repaired) {
            config.save(&path)?;
        }
        config.finish(root);
        Ok(config)
    }

    /// Resolve script paths against `root` and report missing scripts once.
    fn finish(&mut self, root: &Path) {
        self.root = root.to_path_buf();
        for entry in &mut self.menu {
            entry.resolve_paths(root);
        }
        for issue in self.missing_scripts() {
            tracing::warn!("Config: {issue}");
        }
    }

    pub fn missing_scripts(&self) -> Vec<ConfigError> {
        self.menu
            .iter()
            .filter_map(MenuEntry::script)
            .filter(|spec| !spec.script.exists())
            .map(|spec| ConfigError::MissingScript(spec.script.clone()))
            .collect()
    }

    /// Repair values the controller cannot work with. Returns what was changed.
    pub fn normalize(&mut self) -> Vec<ConfigError> {
        let mut issues = Vec::new();

        let mut seen = HashSet::new();
        self.menu.retain(|entry| {
            if seen.insert(entry.label.clone()) {
                true
            } else {
                issues.push(ConfigError::DuplicateLabel(entry.label.clone()));
                false
            }
        });

        if self.display.lines_per_page == 0 {
            self.display.lines_per_page = 1;
            issues.push(ConfigError::Zero("display.lines_per_page"));
        }
        if self.display.wrap_width == 0 {
            self.display.wrap_width = 1;
            issues.push(ConfigError::Zero("display.wrap_width"));
        }
        if self.brightness.step == 0 {
            self.brightness.step = 1;
            issues.push(ConfigError::Zero("brightness.step"));
        }
        if self.timing.poll_ms == 0 {
            self.timing.poll_ms = 1;
            issues.push(ConfigError::Zero("timing.poll_ms"));
        }
        if self.timing.script_timeout_secs == 0 {
            self.timing.script_timeout_secs = 1;
            issues.push(ConfigError::Zero("timing.script_timeout_secs"));
        }
        if self.unlock.secret.is_empty() {
            self.unlock.secret = DEFAULT_SECRET.to_vec();
            issues.push(ConfigError::InvalidSecret);
        }
        let distinct: HashSet<u8> = self.input.channel_map.iter().copied().collect();
        if self.input.channel_map.len() != Button::ALL.len()
            || distinct.len() != Button::ALL.len()
            || distinct.iter().any(|ch| Button::from_channel(*ch).is_none())
        {
            self.input.channel_map = default_channel_map();
            issues.push(ConfigError::ChannelMap);
        }
        issues
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let mut tmp = path.to_path_buf();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(CONFIG_FILE);
        let now_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|dur| dur.as_nanos())
            .unwrap_or(0);
        tmp.set_file_name(format!(".{filename}.tmp.{}.{}", process::id(), now_ns));

        let mut file = fs::File::create(&tmp)
            .with_context(|| format!("creating temp config {}", tmp.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("writing temp config {}", tmp.display()))?;
        file.write_all(b"\n")
            .with_context(|| format!("writing newline to temp config {}", tmp.display()))?;
        file.sync_all()
            .with_context(|| format!("syncing temp config {}", tmp.display()))?;
        drop(file);

        fs::rename(&tmp, path).with_context(|| {
            format!(
                "renaming temp config {} -> {}",
                tmp.display(),
                path.display()
            )
        })?;
        if let Some(parent) = path.parent() {
            if let Ok(dir_handle) = fs::File::open(parent) {
                let _ = dir_handle.sync_all();
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sim,
    #[value(name = "gfxhat")]
    GfxHat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "DisplayConfig::default_lines_per_page")]
    pub lines_per_page: usize,
    #[serde(default = "DisplayConfig::default_wrap_width")]
    pub wrap_width: usize,
    #[serde(default)]
    pub width_override: Option<u32>,
    #[serde(default)]
    pub height_override: Option<u32>,
}

impl DisplayConfig {
    const fn default_lines_per_page() -> usize {
        5
    }
    const fn default_wrap_width() -> usize {
        20
    }

    /// Panel size for the simulator. The GFX HAT is always 128x64.
    pub fn dimensions(&self) -> (u32, u32) {
        (
            self.width_override.unwrap_or(128).max(1),
            self.height_override.unwrap_or(64).max(1),
        )
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            lines_per_page: Self::default_lines_per_page(),
            wrap_width: Self::default_wrap_width(),
            width_override: None,
            height_override: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "TimingConfig::default_unlock_ms")]
    pub unlock_ms: u64,
    #[serde(default = "TimingConfig::default_open_menu_ms")]
    pub open_menu_ms: u64,
    #[serde(default = "TimingConfig::default_launch_ms")]
    pub launch_ms: u64,
    #[serde(default = "TimingConfig::default_lock_ms")]
    pub lock_ms: u64,
    #[serde(default = "TimingConfig::default_idle_tick_ms")]
    pub idle_tick_ms: u64,
    #[serde(default = "TimingConfig::default_poll_ms")]
    pub poll_ms: u64,
    #[serde(default = "TimingConfig::default_script_timeout_secs")]
    pub script_timeout_secs: u64,
}

impl TimingConfig {
    const fn default_unlock_ms() -> u64 {
        600
    }
    const fn default_open_menu_ms() -> u64 {
        800
    }
    const fn default_launch_ms() -> u64 {
        1000
    }
    const fn default_lock_ms() -> u64 {
        500
    }
    const fn default_idle_tick_ms() -> u64 {
        500
    }
    const fn default_poll_ms() -> u64 {
        20
    }
    const fn default_script_timeout_secs() -> u64 {
        30
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            unlock_ms: Self::default_unlock_ms(),
            open_menu_ms: Self::default_open_menu_ms(),
            launch_ms: Self::default_launch_ms(),
            lock_ms: Self::default_lock_ms(),
            idle_tick_ms: Self::default_idle_tick_ms(),
            poll_ms: Self::default_poll_ms(),
            script_timeout_secs: Self::default_script_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrightnessConfig {
    #[serde(default = "BrightnessConfig::default_initial")]
    pub initial: u8,
    #[serde(default = "BrightnessConfig::default_step")]
    pub step: u8,
}

impl BrightnessConfig {
    const fn default_initial() -> u8 {
        128
    }
    const fn default_step() -> u8 {
        16
    }
}

impl Default for BrightnessConfig {
    fn default() -> Self {
        Self {
            initial: Self::default_initial(),
            step: Self::default_step(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockConfig {
    #[serde(
        default = "UnlockConfig::default_secret",
        deserialize_with = "lenient_secret"
    )]
    pub secret: Vec<Symbol>,
}

impl UnlockConfig {
    fn default_secret() -> Vec<Symbol> {
        DEFAULT_SECRET.to_vec()
    }
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            secret: Self::default_secret(),
        }
    }
}

/// Unknown symbols empty the secret so that `normalize` falls back to the default.
fn lenient_secret<'de, D>(deserializer: D) -> Result<Vec<Symbol>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    let parsed: Option<Vec<Symbol>> = raw
        .iter()
        .map(|s| match s.trim().to_ascii_lowercase().as_str() {
            "up" | "u" => Some(Symbol::Up),
            "down" | "d" => Some(Symbol::Down),
            _ => None,
        })
        .collect();
    Ok(parsed.unwrap_or_default())
}

fn default_channel_map() -> Vec<u8> {
    Button::ALL.iter().map(|b| b.channel()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Logical channel for each hardware pad index.
    #[serde(default = "default_channel_map")]
    pub channel_map: Vec<u8>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            channel_map: default_channel_map(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    #[serde(default = "HardwareConfig::default_spi_path")]
    pub spi_path: String,
    #[serde(default = "HardwareConfig::default_i2c_path")]
    pub i2c_path: String,
    #[serde(default = "HardwareConfig::default_gpio_chip")]
    pub gpio_chip: String,
    #[serde(default = "HardwareConfig::default_lcd_dc_pin")]
    pub lcd_dc_pin: u32,
    #[serde(default = "HardwareConfig::default_lcd_reset_pin")]
    pub lcd_reset_pin: u32,
    #[serde(default = "HardwareConfig::default_lcd_contrast")]
    pub lcd_contrast: u8,
}

impl HardwareConfig {
    fn default_spi_path() -> String {
        "/dev/spidev0.0".to_string()
    }
    fn default_i2c_path() -> String {
        "/dev/i2c-1".to_string()
    }
    fn default_gpio_chip() -> String {
        "/dev/gpiochip0".to_string()
    }
    const fn default_lcd_dc_pin() -> u32 {
        6
    }
    const fn default_lcd_reset_pin() -> u32 {
        5
    }
    const fn default_lcd_contrast() -> u8 {
        58
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            spi_path: Self::default_spi_path(),
            i2c_path: Self::default_i2c_path(),
            gpio_chip: Self::default_gpio_chip(),
            lcd_dc_pin: Self::default_lcd_dc_pin(),
            lcd_reset_pin: Self::default_lcd_reset_pin(),
            lcd_contrast: Self::default_lcd_contrast(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::{MenuAction, ScriptSpec};
    use tempfile::TempDir;

    #[test]
    fn load_writes_default_when_missing() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(Config::path(dir.path()).exists());
        assert_eq!(config.menu.len(), 5);
        assert_eq!(config.display.lines_per_page, 5);
        assert_eq!(config.unlock.secret, DEFAULT_SECRET.to_vec());
        assert_eq!(
            config.menu[0].script().map(|s| s.script.clone()),
            Some(dir.path().join("scripts/wifi_scan.py")),
            "relative scripts resolve against the root"
        );
    }

    #[test]
    fn default_file_keeps_relative_paths() {
        let dir = TempDir::new().unwrap();
        Config::load(dir.path()).unwrap();
        let raw = fs::read_to_string(Config::path(dir.path())).unwrap();
        assert!(raw.contains("\"scripts/wifi_scan.py\""), "got {raw}");
    }

    #[test]
    fn missing_sections_use_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            Config::path(dir.path()),
            r#"{"brightness": {"initial": 40}}"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.brightness.initial, 40);
        assert_eq!(config.brightness.step, 16);
        assert_eq!(config.timing.launch_ms, 1000);
        assert_eq!(config.display.backend, Backend::Sim);
    }

    #[test]
    fn duplicate_labels_keep_first_and_persist() {
        let dir = TempDir::new().unwrap();
        fs::write(
            Config::path(dir.path()),
            r#"{"menu": [
                {"label": "A", "action": {"run": {"script": "/bin/true"}}},
                {"label": "A", "action": {"exit": {}}}
            ]}"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.menu.len(), 1);
        assert!(matches!(config.menu[0].action, MenuAction::Run(_)));

        let raw = fs::read_to_string(Config::path(dir.path())).unwrap();
        let saved: Config = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.menu.len(), 1, "repaired config is written back");
    }

    #[test]
    fn empty_menu_is_allowed() {
        let dir = TempDir::new().unwrap();
        fs::write(Config::path(dir.path()), r#"{"menu": []}"#).unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.menu.is_empty());
    }

    #[test]
    fn bad_secret_falls_back_to_default() {
        let mut config: Config =
            serde_json::from_str(r#"{"unlock": {"secret": ["up", "left"]}}"#).unwrap();
        let issues = config.normalize();
        assert!(issues.contains(&ConfigError::InvalidSecret));
        assert_eq!(config.unlock.secret, DEFAULT_SECRET.to_vec());

        let mut config: Config =
            serde_json::from_str(r#"{"unlock": {"secret": ["down", "down"]}}"#).unwrap();
        assert!(config.normalize().is_empty());
        assert_eq!(config.unlock.secret, vec![Symbol::Down, Symbol::Down]);
    }

    #[test]
    fn zero_values_are_clamped() {
        let mut config: Config = serde_json::from_str(
            r#"{"display": {"lines_per_page": 0, "wrap_width": 0}, "input": {"channel_map": [0, 1]}}"#,
        )
        .unwrap();
        let issues = config.normalize();
        assert_eq!(config.display.lines_per_page, 1);
        assert_eq!(config.display.wrap_width, 1);
        assert_eq!(config.input.channel_map, vec![0, 1, 2, 3, 4, 5]);
        assert!(issues.contains(&ConfigError::Zero("display.lines_per_page")));
        assert!(issues.contains(&ConfigError::ChannelMap));
    }

    #[test]
    fn channel_map_with_repeated_pads_is_replaced() {
        let mut config: Config =
            serde_json::from_str(r#"{"input": {"channel_map": [0, 0, 0, 0, 0, 0]}}"#).unwrap();
        assert_eq!(config.normalize(), vec![ConfigError::ChannelMap]);
        assert_eq!(config.input.channel_map, vec![0, 1, 2, 3, 4, 5]);

        let mut config: Config =
            serde_json::from_str(r#"{"input": {"channel_map": [1, 0, 3, 2, 5, 4]}}"#).unwrap();
        assert!(config.normalize().is_empty());
        assert_eq!(config.input.channel_map, vec![1, 0, 3, 2, 5, 4]);
    }

    #[test]
    fn missing_scripts_are_reported_not_repaired() {
        let mut config = Config::default();
        config.menu = vec![MenuEntry::run("Nope", ScriptSpec::new("/no/such/script"))];
        let missing = config.missing_scripts();
        assert_eq!(missing.len(), 1);
        assert!(!missing[0].repaired());
    }

    #[test]
    fn backend_names() {
        let display: DisplayConfig = serde_json::from_str(r#"{"backend": "gfxhat"}"#).unwrap();
        assert_eq!(display.backend, Backend::GfxHat);
        assert_eq!(
            serde_json::to_string(&Backend::Sim).unwrap(),
            "\"sim\"".to_string()
        );
    }
}
