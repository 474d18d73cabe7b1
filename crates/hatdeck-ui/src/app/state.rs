use std::time::{Duration, Instant};

use crate::ui::render::PROGRESS_STEPS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Locked,
    UnlockPrompt,
    Transitioning,
    MenuActive,
    OutputView,
}

/// Backlight level in `[0, 255]`, moved in fixed steps and clamped at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brightness {
    level: u8,
    step: u8,
}

impl Brightness {
    pub fn new(initial: u8, step: u8) -> Self {
        Self {
            level: initial,
            step: step.max(1),
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn raise(&mut self) -> u8 {
        self.level = self.level.saturating_add(self.step);
        self.level
    }

    pub fn lower(&mut self) -> u8 {
        self.level = self.level.saturating_sub(self.step);
        self.level
    }
}

/// Script result slot carried by a launch screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    None,
    Pending,
    Done(Vec<String>),
}

/// A timed loading screen. Leaves for `target` once the deadline has passed and
/// no job is still pending.
#[derive(Debug, Clone)]
pub struct Transition {
    pub title: String,
    pub started: Instant,
    pub deadline: Instant,
    pub target: Mode,
    pub job: JobState,
}

impl Transition {
    pub fn new(title: impl Into<String>, now: Instant, length: Duration, target: Mode) -> Self {
        Self {
            title: title.into(),
            started: now,
            deadline: now + length,
            target,
            job: JobState::None,
        }
    }

    pub fn with_job(mut self) -> Self {
        self.job = JobState::Pending;
        self
    }

    pub fn ready(&self, now: Instant) -> bool {
        now >= self.deadline && self.job != JobState::Pending
    }

    /// Filled bar segments, `0..=PROGRESS_STEPS`.
    pub fn step(&self, now: Instant) -> u32 {
        let total = self.deadline.saturating_duration_since(self.started);
        let elapsed = now.saturating_duration_since(self.started);
        if total.is_zero() || elapsed >= total {
            return PROGRESS_STEPS;
        }
        (elapsed.as_micros() * PROGRESS_STEPS as u128 / total.as_micros()) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_clamps_at_both_ends() {
        let mut b = Brightness::new(250, 16);
        assert_eq!(b.raise(), 255);
        assert_eq!(b.raise(), 255);
        let mut b = Brightness::new(10, 16);
        assert_eq!(b.lower(), 0);
        assert_eq!(b.lower(), 0);
    }

    #[test]
    fn brightness_steps_from_initial() {
        let mut b = Brightness::new(128, 16);
        assert_eq!(b.raise(), 144);
        assert_eq!(b.lower(), 128);
        assert_eq!(b.lower(), 112);
    }

    #[test]
    fn transition_progress_runs_to_full() {
        let t0 = Instant::now();
        let t = Transition::new("x", t0, Duration::from_millis(1200), Mode::Locked);
        assert_eq!(t.step(t0), 0);
        assert_eq!(t.step(t0 + Duration::from_millis(600)), 6);
        assert_eq!(t.step(t0 + Duration::from_millis(5000)), PROGRESS_STEPS);
    }

    #[test]
    fn pending_job_holds_transition() {
        let t0 = Instant::now();
        let mut t = Transition::new("x", t0, Duration::ZERO, Mode::OutputView).with_job();
        assert!(!t.ready(t0 + Duration::from_secs(10)));
        t.job = JobState::Done(vec!["ok".into()]);
        assert!(t.ready(t0));
    }
}
