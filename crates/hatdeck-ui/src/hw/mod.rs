//! Device collaborators: the LCD, the RGB backlight and the touch pads.
//!
//! The controller only talks to these traits. `sim` runs anywhere and draws
//! to the terminal; `gfxhat` drives the real HAT over SPI/I²C on a Pi.

use std::time::Duration;

use anyhow::Result;

use crate::config::{Backend, Config};
use crate::input::InputEvent;

#[cfg(target_os = "linux")]
pub mod gfxhat;
pub mod screen;
pub mod sim;

pub use screen::{MonoFrame, Screen};

/// A monochrome panel with its own pixel buffer.
pub trait Panel: Send {
    fn dimensions(&self) -> (u32, u32);
    fn set_pixel(&mut self, x: u32, y: u32, on: bool);
    /// Push the buffered pixels to the glass.
    fn present(&mut self) -> Result<()>;
    /// Blank the buffer and the glass.
    fn clear(&mut self) -> Result<()>;
}

pub trait Backlight: Send {
    fn set_rgb(&mut self, r: u8, g: u8, b: u8) -> Result<()>;
}

pub trait InputSource: Send {
    /// Wait up to `timeout` for the next event.
    fn poll(&mut self, timeout: Duration) -> Result<Option<InputEvent>>;
}

pub struct Hardware {
    pub panel: Box<dyn Panel>,
    pub backlight: Box<dyn Backlight>,
    pub input: Box<dyn InputSource>,
}

pub fn open(config: &Config) -> Result<Hardware> {
    match config.display.backend {
        Backend::Sim => Ok(sim::open(config)),
        #[cfg(target_os = "linux")]
        Backend::GfxHat => gfxhat::open(config),
        #[cfg(not(target_os = "linux"))]
        Backend::GfxHat => anyhow::bail!("the gfxhat backend is only available on Linux"),
    }
}
