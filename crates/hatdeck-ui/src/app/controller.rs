//! The mode state machine. Pure with respect to time: every entry point takes
//! `now`, and side effects are returned as `Effect`s for the main loop to apply.

use std::time::{Duration, Instant};

use hatdeck_logging::targets::T_INPUT;

use super::state::{Brightness, JobState, Mode, Transition};
use crate::config::Config;
use crate::gesture::{GestureRecognizer, Symbol, DEFAULT_SECRET};
use crate::input::{Button, InputEvent};
use crate::menu::{MenuAction, MenuCursor, MenuEntry, ScriptSpec};
use crate::runner::NO_OUTPUT;
use crate::ui::paging::PagedBuffer;
use crate::ui::render::{ScreenView, ViewModel};
use crate::ui::sprites::AnimationFrame;

pub const UNLOCK_TITLE: &str = "Loading...";
pub const OPEN_MENU_TITLE: &str = "Opening...";
pub const LAUNCH_PREFIX: &str = "Launching: ";
pub const LOCK_TITLE: &str = "Locking...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Redraw,
    SetBacklight(u8),
    /// Run `spec` off the main loop and report back with `job_finished`.
    Launch { label: String, spec: ScriptSpec },
    /// Run the exit hook, clean up and stop.
    Terminate { hook: Option<ScriptSpec> },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub secret: Vec<Symbol>,
    pub lines_per_page: usize,
    pub initial_brightness: u8,
    pub brightness_step: u8,
    pub unlock: Duration,
    pub open_menu: Duration,
    pub launch: Duration,
    pub lock: Duration,
    pub idle_tick: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        let ms = Duration::from_millis;
        let timing = &config.timing;
        Self {
            secret: config.unlock.secret.clone(),
            lines_per_page: config.display.lines_per_page,
            initial_brightness: config.brightness.initial,
            brightness_step: config.brightness.step,
            unlock: ms(timing.unlock_ms),
            open_menu: ms(timing.open_menu_ms),
            launch: ms(timing.launch_ms),
            lock: ms(timing.lock_ms),
            idle_tick: ms(timing.idle_tick_ms),
        }
    }

    /// Same settings with zero-length loading screens.
    pub fn instant(mut self) -> Self {
        self.unlock = Duration::ZERO;
        self.open_menu = Duration::ZERO;
        self.launch = Duration::ZERO;
        self.lock = Duration::ZERO;
        self
    }
}

pub struct Controller {
    settings: Settings,
    mode: Mode,
    entries: Vec<MenuEntry>,
    cursor: MenuCursor,
    gesture: GestureRecognizer,
    brightness: Brightness,
    frame: AnimationFrame,
    session: Option<PagedBuffer>,
    transition: Option<Transition>,
    drawn_step: u32,
    next_idle: Instant,
}

impl Controller {
    pub fn new(entries: Vec<MenuEntry>, settings: Settings, now: Instant) -> Self {
        let secret = if settings.secret.is_empty() {
            DEFAULT_SECRET.to_vec()
        } else {
            settings.secret.clone()
        };
        Self {
            mode: Mode::Locked,
            entries,
            cursor: MenuCursor::default(),
            gesture: GestureRecognizer::new(secret),
            brightness: Brightness::new(settings.initial_brightness, settings.brightness_step),
            frame: AnimationFrame::default(),
            session: None,
            transition: None,
            drawn_step: 0,
            next_idle: now + settings.idle_tick,
            settings,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn brightness(&self) -> u8 {
        self.brightness.level()
    }

    pub fn selection(&self) -> usize {
        self.cursor.selection()
    }

    pub fn session(&self) -> Option<&PagedBuffer> {
        self.session.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.mode == Mode::Transitioning
    }

    /// First paint and backlight level at boot.
    pub fn startup(&self) -> Vec<Effect> {
        vec![
            Effect::SetBacklight(self.brightness.level()),
            Effect::Redraw,
        ]
    }

    pub fn handle_event(&mut self, event: InputEvent, now: Instant) -> Vec<Effect> {
        let Some(button) = event.pressed() else {
            return Vec::new();
        };
        tracing::debug!(target: T_INPUT, %event, mode = ?self.mode, "Button");
        match self.mode {
            Mode::Transitioning => {
                tracing::debug!(target: T_INPUT, %event, "Busy, input dropped");
                Vec::new()
            }
            Mode::Locked => self.on_locked(button, now),
            Mode::UnlockPrompt => self.on_prompt(button, now),
            Mode::MenuActive => self.on_menu(button, now),
            Mode::OutputView => self.on_output(button),
        }
    }

    /// Periodic work: finishing loading screens, progress, the idle animation.
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        match self.mode {
            Mode::Transitioning => {
                let Some(transition) = self.transition.as_ref() else {
                    self.enter_locked(now);
                    return vec![Effect::Redraw];
                };
                if transition.ready(now) {
                    if let Some(done) = self.transition.take() {
                        self.complete(done, now);
                    }
                    return vec![Effect::Redraw];
                }
                let step = transition.step(now);
                if step != self.drawn_step {
                    self.drawn_step = step;
                    vec![Effect::Redraw]
                } else {
                    Vec::new()
                }
            }
            Mode::Locked if now >= self.next_idle => {
                self.frame = self.frame.toggled();
                self.next_idle = now + self.settings.idle_tick;
                vec![Effect::Redraw]
            }
            _ => Vec::new(),
        }
    }

    /// Result of a `Launch` effect.
    pub fn job_finished(&mut self, lines: Vec<String>, now: Instant) -> Vec<Effect> {
        match self.transition.as_mut() {
            Some(transition) if transition.job == JobState::Pending => {
                transition.job = JobState::Done(lines);
            }
            _ => {
                tracing::warn!(mode = ?self.mode, "Script result arrived with no launch pending");
                return Vec::new();
            }
        }
        self.tick(now)
    }

    pub fn view(&self) -> ViewModel {
        let screen = match self.mode {
            Mode::Locked => ScreenView::Locked { frame: self.frame },
            Mode::UnlockPrompt => ScreenView::Prompt,
            Mode::Transitioning => match &self.transition {
                Some(transition) => ScreenView::Transition {
                    title: transition.title.clone(),
                    step: self.drawn_step,
                },
                None => ScreenView::Locked { frame: self.frame },
            },
            Mode::MenuActive => ScreenView::Menu {
                labels: self.entries.iter().map(|e| e.label.clone()).collect(),
                selection: self.cursor.selection(),
            },
            Mode::OutputView => ScreenView::Output {
                lines: self
                    .session
                    .as_ref()
                    .map(|s| s.visible().to_vec())
                    .unwrap_or_default(),
            },
        };
        ViewModel {
            screen,
            brightness: self.brightness.level(),
            clock: String::new(),
        }
    }

    fn on_locked(&mut self, button: Button, now: Instant) -> Vec<Effect> {
        match button {
            Button::Ok => {
                self.frame = self.frame.toggled();
                self.next_idle = now + self.settings.idle_tick;
                vec![Effect::Redraw]
            }
            Button::Back => {
                self.gesture.reset();
                self.begin(Transition::new(
                    UNLOCK_TITLE,
                    now,
                    self.settings.unlock,
                    Mode::UnlockPrompt,
                ))
            }
            Button::DimUp | Button::DimDown => self.adjust_brightness(button),
            Button::Up | Button::Down => Vec::new(),
        }
    }

    fn on_prompt(&mut self, button: Button, now: Instant) -> Vec<Effect> {
        if button == Button::Back {
            self.gesture.reset();
            self.enter_locked(now);
            return vec![Effect::Redraw];
        }
        let Some(symbol) = Symbol::from_button(button) else {
            return Vec::new();
        };
        if self.gesture.append(symbol) {
            tracing::info!("Unlocked");
            self.gesture.reset();
            return self.begin(Transition::new(
                OPEN_MENU_TITLE,
                now,
                self.settings.open_menu,
                Mode::MenuActive,
            ));
        }
        vec![Effect::Redraw]
    }

    fn on_menu(&mut self, button: Button, now: Instant) -> Vec<Effect> {
        let total = self.entries.len();
        match button {
            Button::Up => {
                self.cursor.move_up(total);
                vec![Effect::Redraw]
            }
            Button::Down => {
                self.cursor.move_down(total);
                vec![Effect::Redraw]
            }
            Button::Ok => self.activate(now),
            Button::Back => self.begin(Transition::new(
                LOCK_TITLE,
                now,
                self.settings.lock,
                Mode::Locked,
            )),
            Button::DimUp | Button::DimDown => self.adjust_brightness(button),
        }
    }

    fn activate(&mut self, now: Instant) -> Vec<Effect> {
        let Some(entry) = self.entries.get(self.cursor.selection()) else {
            return Vec::new();
        };
        let label = entry.label.clone();
        match &entry.action {
            MenuAction::Exit { hook } => {
                tracing::info!(entry = %label, "Exit selected");
                vec![Effect::Terminate { hook: hook.clone() }]
            }
            MenuAction::Run(spec) => {
                let spec = spec.clone();
                let transition = Transition::new(
                    format!("{LAUNCH_PREFIX}{label}"),
                    now,
                    self.settings.launch,
                    Mode::OutputView,
                )
                .with_job();
                let mut effects = vec![Effect::Launch { label, spec }];
                effects.extend(self.begin(transition));
                effects
            }
        }
    }

    fn on_output(&mut self, button: Button) -> Vec<Effect> {
        match button {
            Button::Up | Button::Down => {
                if let Some(session) = self.session.as_mut() {
                    if button == Button::Up {
                        session.scroll_up();
                    } else {
                        session.scroll_down();
                    }
                }
                vec![Effect::Redraw]
            }
            Button::Back => {
                self.session = None;
                self.mode = Mode::MenuActive;
                vec![Effect::Redraw]
            }
            Button::DimUp | Button::DimDown => self.adjust_brightness(button),
            Button::Ok => Vec::new(),
        }
    }

    fn adjust_brightness(&mut self, button: Button) -> Vec<Effect> {
        let level = if button == Button::DimUp {
            self.brightness.raise()
        } else {
            self.brightness.lower()
        };
        vec![Effect::SetBacklight(level), Effect::Redraw]
    }

    fn begin(&mut self, transition: Transition) -> Vec<Effect> {
        tracing::debug!(title = %transition.title, target = ?transition.target, "Loading screen");
        self.drawn_step = 0;
        self.transition = Some(transition);
        self.mode = Mode::Transitioning;
        vec![Effect::Redraw]
    }

    fn complete(&mut self, transition: Transition, now: Instant) {
        match transition.target {
            Mode::OutputView => {
                let lines = match transition.job {
                    JobState::Done(lines) => lines,
                    JobState::None | JobState::Pending => vec![NO_OUTPUT.to_string()],
                };
                self.session = Some(PagedBuffer::new(lines, self.settings.lines_per_page));
                self.mode = Mode::OutputView;
            }
            Mode::MenuActive => {
                self.cursor.home();
                self.mode = Mode::MenuActive;
            }
            Mode::Locked | Mode::Transitioning => self.enter_locked(now),
            Mode::UnlockPrompt => self.mode = Mode::UnlockPrompt,
        }
        tracing::debug!(mode = ?self.mode, "Mode entered");
    }

    fn enter_locked(&mut self, now: Instant) {
        self.transition = None;
        self.mode = Mode::Locked;
        self.next_idle = now + self.settings.idle_tick;
    }
}
