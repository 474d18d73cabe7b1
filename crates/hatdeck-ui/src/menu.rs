use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What to launch for a menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSpec {
    pub script: PathBuf,
    /// Program used to run `script`, e.g. `python3`. `None` executes the script directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,
}

impl ScriptSpec {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            interpreter: None,
        }
    }

    pub fn with_interpreter(script: impl Into<PathBuf>, interpreter: &str) -> Self {
        Self {
            script: script.into(),
            interpreter: Some(interpreter.to_string()),
        }
    }

    pub fn resolve(&mut self, root: &Path) {
        if self.script.is_relative() {
            self.script = root.join(&self.script);
        }
    }
}

/// Decided when the config is loaded, never from the label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuAction {
    Run(ScriptSpec),
    /// Leave the controller. `hook` runs first, best effort, output discarded.
    Exit {
        #[serde(default)]
        hook: Option<ScriptSpec>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub label: String,
    pub action: MenuAction,
}

impl MenuEntry {
    pub fn run(label: &str, spec: ScriptSpec) -> Self {
        Self {
            label: label.to_string(),
            action: MenuAction::Run(spec),
        }
    }

    pub fn exit(label: &str, hook: Option<ScriptSpec>) -> Self {
        Self {
            label: label.to_string(),
            action: MenuAction::Exit { hook },
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self.action, MenuAction::Exit { .. })
    }

    pub fn script(&self) -> Option<&ScriptSpec> {
        match &self.action {
            MenuAction::Run(spec) => Some(spec),
            MenuAction::Exit { hook } => hook.as_ref(),
        }
    }

    pub fn resolve_paths(&mut self, root: &Path) {
        match &mut self.action {
            MenuAction::Run(spec) => spec.resolve(root),
            MenuAction::Exit { hook: Some(spec) } => spec.resolve(root),
            MenuAction::Exit { hook: None } => {}
        }
    }
}

/// The stock menu shipped with the device image.
pub fn default_entries() -> Vec<MenuEntry> {
    vec![
        MenuEntry::run(
            "Wi-Fi Scan",
            ScriptSpec::with_interpreter("scripts/wifi_scan.py", "python3"),
        ),
        MenuEntry::run(
            "Port Scan",
            ScriptSpec::with_interpreter("scripts/port_scan.py", "python3"),
        ),
        MenuEntry::run(
            "Keylogger Sim",
            ScriptSpec::with_interpreter("scripts/keylogger_sim.py", "python3"),
        ),
        MenuEntry::run(
            "NFC Sim",
            ScriptSpec::with_interpreter("scripts/nfc_sim.py", "python3"),
        ),
        MenuEntry::exit(
            "Exit",
            Some(ScriptSpec::with_interpreter(
                "scripts/exit_script.py",
                "python3",
            )),
        ),
    ]
}

/// Cursor over the menu. Movement wraps in both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuCursor {
    selection: usize,
}

impl MenuCursor {
    pub fn selection(&self) -> usize {
        self.selection
    }

    pub fn move_up(&mut self, total: usize) {
        if total == 0 {
            self.selection = 0;
            return;
        }
        self.selection = (self.selection + total - 1) % total;
    }

    pub fn move_down(&mut self, total: usize) {
        if total == 0 {
            self.selection = 0;
            return;
        }
        self.selection = (self.selection + 1) % total;
    }

    pub fn home(&mut self) {
        self.selection = 0;
    }
}

/// First row to draw so that the selection sits in the middle of the window when possible.
pub fn first_visible(selection: usize, total: usize, visible: usize) -> usize {
    if total <= visible {
        return 0;
    }
    selection
        .saturating_sub(visible / 2)
        .min(total - visible)
}
