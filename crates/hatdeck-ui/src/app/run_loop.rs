use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use hatdeck_logging::targets::T_PROC;

use super::controller::{Controller, Effect, Settings};
use crate::config::Config;
use crate::hw::{Backlight, Hardware, InputSource, Screen};
use crate::menu::ScriptSpec;
use crate::runner::{display_lines, ProcessRunner, ScriptLauncher, FAILURE_PREFIX};
use crate::ui::layout::UiLayoutMetrics;
use crate::ui::render::render;

/// A script run reported back from its worker thread.
struct JobFinished {
    label: String,
    lines: Vec<String>,
}

pub struct App {
    controller: Controller,
    screen: Screen,
    layout: UiLayoutMetrics,
    backlight: Box<dyn Backlight>,
    input: Box<dyn InputSource>,
    runner: Arc<ProcessRunner<Box<dyn ScriptLauncher>>>,
    wrap_width: usize,
    jobs_tx: Sender<JobFinished>,
    jobs_rx: Receiver<JobFinished>,
    poll: Duration,
    stop: Arc<AtomicBool>,
}

impl App {
    pub fn new(config: &Config, hardware: Hardware, launcher: Box<dyn ScriptLauncher>) -> Self {
        let screen = Screen::new(hardware.panel);
        let (width, height) = screen.dimensions();
        let runner = ProcessRunner::new(launcher)
            .with_timeout(config.timing.script_timeout())
            .with_wrap_width(config.display.wrap_width);
        let (jobs_tx, jobs_rx) = mpsc::channel();
        Self {
            controller: Controller::new(
                config.menu.clone(),
                Settings::from_config(config),
                Instant::now(),
            ),
            screen,
            layout: UiLayoutMetrics::from_dimensions(width, height),
            backlight: hardware.backlight,
            input: hardware.input,
            runner: Arc::new(runner),
            wrap_width: config.display.wrap_width,
            jobs_tx,
            jobs_rx,
            poll: config.timing.poll(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Setting this flag makes the loop stop and clean up at the next iteration.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn run(mut self) -> Result<()> {
        tracing::info!(
            width = self.layout.width_px,
            height = self.layout.height_px,
            "UI started"
        );
        if self.start().is_continue() {
            while self.pump().is_continue() {}
        }
        self.shutdown();
        Ok(())
    }

    pub fn start(&mut self) -> ControlFlow<()> {
        let effects = self.controller.startup();
        self.apply(effects)
    }

    /// One loop iteration: finished jobs, at most one input event, then a tick.
    pub fn pump(&mut self) -> ControlFlow<()> {
        if self.stop.load(Ordering::SeqCst) {
            tracing::info!("Stop requested");
            return ControlFlow::Break(());
        }
        while let Ok(job) = self.jobs_rx.try_recv() {
            tracing::debug!(target: T_PROC, entry = %job.label, lines = job.lines.len(), "Job finished");
            let effects = self.controller.job_finished(job.lines, Instant::now());
            if self.apply(effects).is_break() {
                return ControlFlow::Break(());
            }
        }

        match self.input.poll(self.poll) {
            Ok(Some(event)) => {
                let effects = self.controller.handle_event(event, Instant::now());
                if self.apply(effects).is_break() {
                    return ControlFlow::Break(());
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Input poll failed: {:#}", e);
                thread::sleep(self.poll);
            }
        }

        if self.stop.load(Ordering::SeqCst) {
            return ControlFlow::Break(());
        }
        let effects = self.controller.tick(Instant::now());
        self.apply(effects)
    }

    /// Best effort: blank the panel and switch the backlight off.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.screen.blank() {
            tracing::warn!("Display cleanup failed: {:#}", e);
        }
        if let Err(e) = self.backlight.set_rgb(0, 0, 0) {
            tracing::warn!("Backlight cleanup failed: {:#}", e);
        }
        tracing::info!("UI stopped");
    }

    fn apply(&mut self, effects: Vec<Effect>) -> ControlFlow<()> {
        for effect in effects {
            match effect {
                Effect::Redraw => self.redraw(),
                Effect::SetBacklight(level) => {
                    if let Err(e) = self.backlight.set_rgb(level, level, level) {
                        tracing::warn!("Backlight update failed: {:#}", e);
                    }
                }
                Effect::Launch { label, spec } => self.launch(label, spec),
                Effect::Terminate { hook } => {
                    if let Some(hook) = hook {
                        let lines = self.runner.run(&hook);
                        tracing::debug!(target: T_PROC, lines = lines.len(), "Exit hook done");
                    }
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn redraw(&mut self) {
        let view = self
            .controller
            .view()
            .with_clock(chrono::Local::now().format("%H:%M").to_string());
        if let Err(e) = render(self.screen.frame_mut(), &self.layout, &view) {
            tracing::warn!("Render failed: {:#}", e);
            return;
        }
        if let Err(e) = self.screen.flush() {
            tracing::warn!("Display update failed: {:#}", e);
        }
    }

    fn launch(&mut self, label: String, spec: ScriptSpec) {
        tracing::info!(target: T_PROC, entry = %label, script = %spec.script.display(), "Launching script");
        let runner = Arc::clone(&self.runner);
        let tx = self.jobs_tx.clone();
        let worker_label = label.clone();
        let spawned = thread::Builder::new()
            .name("script-runner".to_string())
            .spawn(move || {
                let lines = runner.run(&spec);
                let _ = tx.send(JobFinished {
                    label: worker_label,
                    lines,
                });
            });
        if let Err(e) = spawned {
            tracing::warn!(target: T_PROC, entry = %label, "Worker spawn failed: {e}");
            let lines = display_lines(&format!("{FAILURE_PREFIX}{e}"), self.wrap_width);
            let _ = self.jobs_tx.send(JobFinished { label, lines });
        }
    }
}
