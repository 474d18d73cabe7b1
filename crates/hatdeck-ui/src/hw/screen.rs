use std::convert::Infallible;

use anyhow::Result;
use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};

use super::Panel;

/// Off-screen 1-bit frame that the renderer draws into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoFrame {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl MonoFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.pixels[(y * self.width + x) as usize] = on;
    }

    pub fn blank(&mut self) {
        self.pixels.iter_mut().for_each(|px| *px = false);
    }

    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|px| **px).count()
    }
}

impl OriginDimensions for MonoFrame {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for MonoFrame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) {
                self.set(x, y, color.is_on());
            }
        }
        Ok(())
    }
}

/// The panel plus the frame that is rendered before every present.
pub struct Screen {
    panel: Box<dyn Panel>,
    frame: MonoFrame,
}

impl Screen {
    pub fn new(panel: Box<dyn Panel>) -> Self {
        let (width, height) = panel.dimensions();
        Self {
            panel,
            frame: MonoFrame::new(width, height),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.frame.width(), self.frame.height())
    }

    pub fn frame(&self) -> &MonoFrame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut MonoFrame {
        &mut self.frame
    }

    /// Copy the whole frame into the panel, then present it.
    pub fn flush(&mut self) -> Result<()> {
        for y in 0..self.frame.height() {
            for x in 0..self.frame.width() {
                self.panel.set_pixel(x, y, self.frame.get(x, y));
            }
        }
        self.panel.present()
    }

    pub fn blank(&mut self) -> Result<()> {
        self.frame.blank();
        self.panel.clear()
    }
}
