mod controller;
mod run_loop;
mod state;

pub use controller::{
    Controller, Effect, Settings, LAUNCH_PREFIX, LOCK_TITLE, OPEN_MENU_TITLE, UNLOCK_TITLE,
};
pub use run_loop::App;
pub use state::{Brightness, JobState, Mode, Transition};
