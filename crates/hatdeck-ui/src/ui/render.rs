//! Stateless screen drawing. Every call repaints the whole frame from a
//! `ViewModel` snapshot.

use anyhow::{anyhow, Result};
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};

use crate::menu::first_visible;
use crate::ui::layout::{chars_that_fit, ellipsize, UiLayoutMetrics};
use crate::ui::sprites::{lit_pixels, AnimationFrame};

pub const PROGRESS_STEPS: u32 = 12;
pub const PROMPT_TEXT: &str = "Cheat code?";
pub const EMPTY_MENU_TEXT: &str = "No entries";

const LOCK_FOOTER: &str = "BACK:Unlock  +/-:Lum";
const PROMPT_FOOTER: &str = "U/D:Code  BACK:Back";
const MENU_FOOTER: &str = "BACK:Lock  OK:Run  +/-:Lum";
const OUTPUT_FOOTER: &str = "<BACK menu>  +/- Lum  U/D Scroll";
const TEXT_INSET_PX: i32 = 4;
const LABEL_INSET_PX: i32 = 6;
const BRIGHTNESS_WIDTH_PX: u32 = 36;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenView {
    Locked { frame: AnimationFrame },
    /// Carries nothing about the gesture typed so far.
    Prompt,
    Transition { title: String, step: u32 },
    Menu { labels: Vec<String>, selection: usize },
    Output { lines: Vec<String> },
}

/// Everything a repaint needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub screen: ScreenView,
    pub brightness: u8,
    pub clock: String,
}

impl ViewModel {
    pub fn with_clock(mut self, clock: impl Into<String>) -> Self {
        self.clock = clock.into();
        self
    }
}

fn style(color: BinaryColor) -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyle::new(&FONT_6X10, color)
}

fn text<D>(target: &mut D, value: &str, x: i32, y: i32, color: BinaryColor) -> Result<()>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Text::with_baseline(value, Point::new(x, y), style(color), Baseline::Top)
        .draw(target)
        .map_err(|_| anyhow!("Draw error"))?;
    Ok(())
}

fn fill<D>(target: &mut D, x: i32, y: i32, width: u32, height: u32) -> Result<()>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Rectangle::new(Point::new(x, y), Size::new(width, height))
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(target)
        .map_err(|_| anyhow!("Draw error"))
}

pub fn render<D>(target: &mut D, layout: &UiLayoutMetrics, view: &ViewModel) -> Result<()>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target
        .clear(BinaryColor::Off)
        .map_err(|_| anyhow!("Draw error"))?;
    match &view.screen {
        ScreenView::Locked { frame } => draw_lock(target, layout, *frame),
        ScreenView::Prompt => draw_prompt(target, layout),
        ScreenView::Transition { title, step } => draw_transition(target, layout, title, *step),
        ScreenView::Menu { labels, selection } => {
            draw_header(target, layout, view)?;
            draw_menu(target, layout, labels, *selection)
        }
        ScreenView::Output { lines } => {
            draw_header(target, layout, view)?;
            draw_output(target, layout, lines)
        }
    }
}

fn draw_footer<D>(target: &mut D, layout: &UiLayoutMetrics, hint: &str) -> Result<()>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let max_chars = chars_that_fit(layout.width_px.saturating_sub(4), layout.char_width_px);
    text(
        target,
        &ellipsize(hint, max_chars),
        2,
        layout.footer_y as i32,
        BinaryColor::On,
    )
}

fn draw_header<D>(target: &mut D, layout: &UiLayoutMetrics, view: &ViewModel) -> Result<()>
where
    D: DrawTarget<Color = BinaryColor>,
{
    fill(target, 0, 0, layout.width_px, layout.header_height)?;
    text(target, &view.clock, TEXT_INSET_PX, 1, BinaryColor::Off)?;
    let level = format!("L:{}", view.brightness);
    let x = layout.width_px.saturating_sub(BRIGHTNESS_WIDTH_PX) as i32;
    text(target, &level, x, 1, BinaryColor::Off)
}

fn draw_lock<D>(target: &mut D, layout: &UiLayoutMetrics, frame: AnimationFrame) -> Result<()>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let scale = layout.sprite_scale;
    let (ox, oy) = layout.sprite_origin;
    for (col, row) in lit_pixels(frame.bitmap()) {
        fill(
            target,
            ox + (col * scale) as i32,
            oy + (row * scale) as i32,
            scale,
            scale,
        )?;
    }
    draw_footer(target, layout, LOCK_FOOTER)
}

fn draw_prompt<D>(target: &mut D, layout: &UiLayoutMetrics) -> Result<()>
where
    D: DrawTarget<Color = BinaryColor>,
{
    text(target, PROMPT_TEXT, 8, layout.prompt_y as i32, BinaryColor::On)?;
    draw_footer(target, layout, PROMPT_FOOTER)
}

fn draw_transition<D>(
    target: &mut D,
    layout: &UiLayoutMetrics,
    title: &str,
    step: u32,
) -> Result<()>
where
    D: DrawTarget<Color = BinaryColor>,
{
    text(
        target,
        &ellipsize(title, layout.chars_per_line),
        TEXT_INSET_PX,
        8,
        BinaryColor::On,
    )?;

    let (x, y) = (layout.bar_x as i32, layout.bar_y as i32);
    Rectangle::new(
        Point::new(x - 1, y - 1),
        Size::new(layout.bar_width + 2, layout.bar_height + 2),
    )
    .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
    .draw(target)
    .map_err(|_| anyhow!("Draw error"))?;

    let filled = layout.bar_width * step.min(PROGRESS_STEPS) / PROGRESS_STEPS;
    if filled > 0 {
        fill(target, x, y, filled, layout.bar_height)?;
    }
    Ok(())
}

fn draw_menu<D>(
    target: &mut D,
    layout: &UiLayoutMetrics,
    labels: &[String],
    selection: usize,
) -> Result<()>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let row_h = layout.menu_row_height;
    if labels.is_empty() {
        let y = layout.menu_start_y(1) as i32;
        text(target, EMPTY_MENU_TEXT, LABEL_INSET_PX, y, BinaryColor::On)?;
        return draw_footer(target, layout, MENU_FOOTER);
    }

    let rows = labels.len().min(layout.menu_visible_items);
    let first = first_visible(selection, labels.len(), rows);
    let max_chars = layout.chars_per_line.saturating_sub(1).max(1);
    let mut y = layout.menu_start_y(rows) as i32;
    for (idx, label) in labels.iter().enumerate().skip(first).take(rows) {
        let color = if idx == selection {
            fill(target, 0, y, layout.width_px, row_h)?;
            BinaryColor::Off
        } else {
            BinaryColor::On
        };
        text(target, &ellipsize(label, max_chars), LABEL_INSET_PX, y, color)?;
        y += row_h as i32;
    }
    draw_footer(target, layout, MENU_FOOTER)
}

fn draw_output<D>(target: &mut D, layout: &UiLayoutMetrics, lines: &[String]) -> Result<()>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let mut y = layout.output_top as i32;
    for line in lines {
        text(
            target,
            &ellipsize(line, layout.chars_per_line),
            TEXT_INSET_PX,
            y,
            BinaryColor::On,
        )?;
        y += layout.line_height_px as i32;
    }
    draw_footer(target, layout, OUTPUT_FOOTER)
}
