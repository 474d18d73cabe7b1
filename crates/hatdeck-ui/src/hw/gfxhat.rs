//! Pimoroni GFX HAT: ST7567 LCD on SPI, SN3218 backlight and CAP1166 touch pads on I²C.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use embedded_hal::{delay::DelayNs, digital::OutputPin, i2c::I2c, spi::SpiDevice};
use hatdeck_logging::targets::T_INPUT;
use linux_embedded_hal::{
    gpio_cdev::{Chip, LineRequestFlags},
    spidev::{SpiModeFlags, SpidevOptions},
    CdevPin, Delay, I2cdev, SpidevDevice,
};

use super::{Backlight, Hardware, InputSource, Panel};
use crate::config::{Config, HardwareConfig};
use crate::input::{remap_channel, EventKind, InputEvent};

pub const WIDTH: u32 = 128;
pub const HEIGHT: u32 = 64;
const PAGES: usize = (HEIGHT / 8) as usize;
const BUFFER_LEN: usize = WIDTH as usize * PAGES;

const ST7567_ENTER_RMWMODE: u8 = 0xE0;
const ST7567_EXIT_RMWMODE: u8 = 0xEE;
const ST7567_SETPAGESTART: u8 = 0xB0;
const ST7567_SETCOLL: u8 = 0x00;
const ST7567_SETCOLH: u8 = 0x10;
const ST7567_SETCONTRAST: u8 = 0x81;

pub fn open(config: &Config) -> Result<Hardware> {
    let hw = &config.hardware;
    let panel = St7567::open(hw).context("initialising ST7567 LCD")?;
    let backlight = Sn3218::open(&hw.i2c_path).context("initialising SN3218 backlight")?;
    let input = Cap1166::open(&hw.i2c_path, config.input.channel_map.clone())
        .context("initialising CAP1166 touch controller")?;
    Ok(Hardware {
        panel: Box::new(panel),
        backlight: Box::new(backlight),
        input: Box::new(input),
    })
}

fn output_line(chip: &mut Chip, offset: u32, consumer: &str) -> Result<CdevPin> {
    let line = chip
        .get_line(offset)
        .with_context(|| format!("getting GPIO line {offset}"))?;
    let handle = line
        .request(LineRequestFlags::OUTPUT, 1, consumer)
        .with_context(|| format!("requesting GPIO line {offset}"))?;
    CdevPin::new(handle).with_context(|| format!("creating pin for line {offset}"))
}

pub struct St7567 {
    spi: SpidevDevice,
    dc: CdevPin,
    _reset: CdevPin,
    buffer: [u8; BUFFER_LEN],
}

impl St7567 {
    pub fn open(hw: &HardwareConfig) -> Result<Self> {
        let mut spi = SpidevDevice::open(&hw.spi_path)
            .with_context(|| format!("opening SPI device {}", hw.spi_path))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(1_000_000)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options).context("configuring SPI")?;

        let mut chip = Chip::new(&hw.gpio_chip)
            .with_context(|| format!("opening GPIO chip {}", hw.gpio_chip))?;
        let dc = output_line(&mut chip, hw.lcd_dc_pin, "hatdeck-dc")?;
        let mut reset = output_line(&mut chip, hw.lcd_reset_pin, "hatdeck-rst")?;

        let mut delay = Delay;
        reset
            .set_low()
            .map_err(|e| anyhow!("LCD reset low: {e:?}"))?;
        delay.delay_ms(10);
        reset
            .set_high()
            .map_err(|e| anyhow!("LCD reset high: {e:?}"))?;
        delay.delay_ms(100);

        let mut lcd = Self {
            spi,
            dc,
            _reset: reset,
            buffer: [0; BUFFER_LEN],
        };
        lcd.command(&[
            0xA3, // bias 1/7
            0xA0, // segment direction normal
            0xC8, // COM reverse
            0xA6, // display normal
            0x40, // start line 0
            0x2F, // booster, regulator, follower on
            0x23, // regulation ratio
            0xAF, // display on
            ST7567_SETCONTRAST,
            hw.lcd_contrast,
        ])?;
        tracing::info!(contrast = hw.lcd_contrast, "ST7567 ready");
        Ok(lcd)
    }

    fn command(&mut self, bytes: &[u8]) -> Result<()> {
        self.dc
            .set_low()
            .map_err(|e| anyhow!("LCD DC low: {e:?}"))?;
        self.spi
            .write(bytes)
            .map_err(|e| anyhow!("LCD command write: {e:?}"))
    }

    fn data(&mut self, page: usize) -> Result<()> {
        self.dc
            .set_high()
            .map_err(|e| anyhow!("LCD DC high: {e:?}"))?;
        let start = page * WIDTH as usize;
        let chunk = &self.buffer[start..start + WIDTH as usize];
        self.spi
            .write(chunk)
            .map_err(|e| anyhow!("LCD data write: {e:?}"))
    }
}

impl Panel for St7567 {
    fn dimensions(&self) -> (u32, u32) {
        (WIDTH, HEIGHT)
    }

    fn set_pixel(&mut self, x: u32, y: u32, on: bool) {
        if x >= WIDTH || y >= HEIGHT {
            return;
        }
        let offset = (y / 8) as usize * WIDTH as usize + x as usize;
        let bit = 1u8 << (y % 8);
        if on {
            self.buffer[offset] |= bit;
        } else {
            self.buffer[offset] &= !bit;
        }
    }

    fn present(&mut self) -> Result<()> {
        self.command(&[ST7567_ENTER_RMWMODE])?;
        for page in 0..PAGES {
            self.command(&[ST7567_SETPAGESTART | page as u8, ST7567_SETCOLL, ST7567_SETCOLH])?;
            self.data(page)?;
        }
        self.command(&[ST7567_EXIT_RMWMODE])
    }

    fn clear(&mut self) -> Result<()> {
        self.buffer = [0; BUFFER_LEN];
        self.present()
    }
}

const SN3218_ADDR: u8 = 0x54;
const SN3218_CMD_ENABLE_OUTPUT: u8 = 0x00;
const SN3218_CMD_SET_PWM_VALUES: u8 = 0x01;
const SN3218_CMD_ENABLE_LEDS: u8 = 0x13;
const SN3218_CMD_UPDATE: u8 = 0x16;
/// Channel order of the six RGB zones behind the LCD.
const LED_MAP: [usize; 18] = [2, 1, 0, 5, 4, 3, 8, 7, 6, 11, 10, 9, 14, 13, 12, 17, 16, 15];

pub struct Sn3218 {
    bus: I2cdev,
}

impl Sn3218 {
    pub fn open(path: &str) -> Result<Self> {
        let bus = I2cdev::new(path).with_context(|| format!("opening I2C bus {path}"))?;
        let mut led = Self { bus };
        led.write(&[SN3218_CMD_ENABLE_OUTPUT, 0x01])?;
        led.write(&[SN3218_CMD_ENABLE_LEDS, 0x3F, 0x3F, 0x3F])?;
        Ok(led)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.bus
            .write(SN3218_ADDR, bytes)
            .map_err(|e| anyhow!("SN3218 write: {e:?}"))
    }
}

impl Backlight for Sn3218 {
    fn set_rgb(&mut self, r: u8, g: u8, b: u8) -> Result<()> {
        let mut frame = [0u8; 19];
        frame[0] = SN3218_CMD_SET_PWM_VALUES;
        for zone in LED_MAP.chunks(3) {
            frame[1 + zone[0]] = r;
            frame[1 + zone[1]] = g;
            frame[1 + zone[2]] = b;
        }
        self.write(&frame)?;
        self.write(&[SN3218_CMD_UPDATE, 0xFF])
    }
}

const CAP1166_ADDR: u8 = 0x2C;
const CAP1166_MAIN_CONTROL: u8 = 0x00;
const CAP1166_INPUT_STATUS: u8 = 0x03;
const CAP1166_INT_BIT: u8 = 0x01;
const PADS: u8 = 6;
const TOUCH_POLL: Duration = Duration::from_millis(10);

pub struct Cap1166 {
    bus: I2cdev,
    channel_map: Vec<u8>,
    held: u8,
    pending: VecDeque<InputEvent>,
}

impl Cap1166 {
    pub fn open(path: &str, channel_map: Vec<u8>) -> Result<Self> {
        let bus = I2cdev::new(path).with_context(|| format!("opening I2C bus {path}"))?;
        let mut touch = Self {
            bus,
            channel_map,
            held: 0,
            pending: VecDeque::new(),
        };
        touch.clear_interrupt()?;
        Ok(touch)
    }

    fn read(&mut self, register: u8) -> Result<u8> {
        let mut value = [0u8; 1];
        self.bus
            .write_read(CAP1166_ADDR, &[register], &mut value)
            .map_err(|e| anyhow!("CAP1166 read {register:#04x}: {e:?}"))?;
        Ok(value[0])
    }

    fn clear_interrupt(&mut self) -> Result<()> {
        let main = self.read(CAP1166_MAIN_CONTROL)?;
        self.bus
            .write(CAP1166_ADDR, &[CAP1166_MAIN_CONTROL, main & !CAP1166_INT_BIT])
            .map_err(|e| anyhow!("CAP1166 clear INT: {e:?}"))
    }

    fn sample(&mut self) -> Result<()> {
        let status = self.read(CAP1166_INPUT_STATUS)?;
        self.clear_interrupt()?;
        let changed = status ^ self.held;
        for pad in 0..PADS {
            let mask = 1u8 << pad;
            if changed & mask == 0 {
                continue;
            }
            let Some(channel) = remap_channel(&self.channel_map, pad) else {
                tracing::debug!(target: T_INPUT, pad, "Unmapped touch pad");
                continue;
            };
            let kind = if status & mask != 0 {
                EventKind::Press
            } else {
                EventKind::Release
            };
            self.pending.push_back(InputEvent { channel, kind });
        }
        self.held = status;
        Ok(())
    }
}

impl InputSource for Cap1166 {
    fn poll(&mut self, timeout: Duration) -> Result<Option<InputEvent>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            self.sample()?;
            if !self.pending.is_empty() {
                continue;
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            thread::sleep(TOUCH_POLL.min(deadline - now));
        }
    }
}
