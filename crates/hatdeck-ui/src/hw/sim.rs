//! Terminal stand-ins for the HAT, used off-device and in CI.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use hatdeck_logging::targets::T_INPUT;

use super::{Backlight, Hardware, InputSource, Panel};
use crate::config::Config;
use crate::input::{parse_console_key, InputEvent};

/// Prints the frame with half-block glyphs, two pixel rows per text row.
pub struct ConsolePanel {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
    shown: Option<Vec<bool>>,
    out: Box<dyn Write + Send>,
}

impl ConsolePanel {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_writer(width, height, Box::new(io::stdout()))
    }

    pub fn with_writer(width: u32, height: u32, out: Box<dyn Write + Send>) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; (width * height) as usize],
            shown: None,
            out,
        }
    }

    fn pixel(&self, x: u32, y: u32) -> bool {
        y < self.height && self.pixels[(y * self.width + x) as usize]
    }

    fn ascii(&self) -> String {
        let mut art = String::with_capacity(((self.width + 3) * (self.height / 2 + 3)) as usize);
        let border = "-".repeat(self.width as usize);
        art.push_str(&format!("+{border}+\n"));
        for y in (0..self.height).step_by(2) {
            art.push('|');
            for x in 0..self.width {
                art.push(match (self.pixel(x, y), self.pixel(x, y + 1)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                });
            }
            art.push_str("|\n");
        }
        art.push_str(&format!("+{border}+\n"));
        art
    }
}

impl Panel for ConsolePanel {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_pixel(&mut self, x: u32, y: u32, on: bool) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = on;
        }
    }

    fn present(&mut self) -> Result<()> {
        if self.shown.as_ref() == Some(&self.pixels) {
            return Ok(());
        }
        let art = self.ascii();
        self.out
            .write_all(art.as_bytes())
            .and_then(|_| self.out.flush())
            .context("writing console frame")?;
        self.shown = Some(self.pixels.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.pixels.iter_mut().for_each(|px| *px = false);
        self.present()
    }
}

#[derive(Debug, Default)]
pub struct LogBacklight {
    last: Option<(u8, u8, u8)>,
}

impl LogBacklight {
    pub fn last(&self) -> Option<(u8, u8, u8)> {
        self.last
    }
}

impl Backlight for LogBacklight {
    fn set_rgb(&mut self, r: u8, g: u8, b: u8) -> Result<()> {
        tracing::info!(r, g, b, "Backlight");
        self.last = Some((r, g, b));
        Ok(())
    }
}

/// Reads one key per line on a background thread.
pub struct StdinInput {
    rx: Receiver<InputEvent>,
    closed: bool,
}

impl StdinInput {
    pub fn spawn() -> Self {
        Self::from_reader(io::BufReader::new(io::stdin()))
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("console-input".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let Ok(line) = line else { break };
                    match parse_console_key(&line) {
                        Some(button) => {
                            let sent = tx
                                .send(InputEvent::press(button))
                                .and_then(|_| tx.send(InputEvent::release(button)));
                            if sent.is_err() {
                                break;
                            }
                        }
                        None => {
                            tracing::debug!(target: T_INPUT, line = %line.trim(), "Unknown console key")
                        }
                    }
                }
            })
            .map(|_| ())
            .unwrap_or_else(|e| tracing::warn!(target: T_INPUT, "Console input thread failed: {e}"));
        Self { rx, closed: false }
    }
}

impl InputSource for StdinInput {
    fn poll(&mut self, timeout: Duration) -> Result<Option<InputEvent>> {
        if self.closed {
            thread::sleep(timeout);
            return Ok(None);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!(target: T_INPUT, "Console input closed");
                self.closed = true;
                Ok(None)
            }
        }
    }
}

pub fn open(config: &Config) -> Hardware {
    let (width, height) = config.display.dimensions();
    Hardware {
        panel: Box::new(ConsolePanel::new(width, height)),
        backlight: Box::new(LogBacklight::default()),
        input: Box::new(StdinInput::spawn()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Button;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn present_skips_unchanged_frames() {
        let sink = Sink::default();
        let mut panel = ConsolePanel::with_writer(4, 4, Box::new(sink.clone()));
        panel.set_pixel(0, 0, true);
        panel.present().unwrap();
        let first = sink.0.lock().unwrap().len();
        assert!(first > 0);
        panel.present().unwrap();
        assert_eq!(sink.0.lock().unwrap().len(), first);
    }

    #[test]
    fn half_blocks_pack_two_rows() {
        let mut panel = ConsolePanel::with_writer(2, 2, Box::new(Sink::default()));
        panel.set_pixel(0, 0, true);
        panel.set_pixel(1, 1, true);
        let art = panel.ascii();
        assert!(art.contains("|▀▄|"), "got:\n{art}");
    }

    #[test]
    fn console_lines_become_press_release_pairs() {
        let mut input = StdinInput::from_reader(Cursor::new("u\nx\n+\n"));
        let wait = Duration::from_secs(2);
        assert_eq!(
            input.poll(wait).unwrap(),
            Some(InputEvent::press(Button::Up))
        );
        assert_eq!(
            input.poll(wait).unwrap(),
            Some(InputEvent::release(Button::Up))
        );
        assert_eq!(
            input.poll(wait).unwrap(),
            Some(InputEvent::press(Button::DimUp))
        );
    }

    #[test]
    fn closed_input_reports_nothing() {
        let mut input = StdinInput::from_reader(Cursor::new(""));
        let wait = Duration::from_millis(200);
        assert_eq!(input.poll(wait).unwrap(), None);
        assert_eq!(input.poll(Duration::from_millis(1)).unwrap(), None);
    }

    #[test]
    fn backlight_remembers_level() {
        let mut light = LogBacklight::default();
        light.set_rgb(32, 32, 32).unwrap();
        assert_eq!(light.last(), Some((32, 32, 32)));
    }
}
