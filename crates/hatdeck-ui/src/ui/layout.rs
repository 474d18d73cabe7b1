/// Pixel geometry for every screen, derived once from the panel size at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiLayoutMetrics {
    pub width_px: u32,
    pub height_px: u32,
    pub char_width_px: u32,
    pub line_height_px: u32,
    pub header_height: u32,
    pub footer_y: u32,
    pub menu_top: u32,
    pub menu_row_height: u32,
    pub menu_visible_items: usize,
    pub output_top: u32,
    pub chars_per_line: usize,
    pub prompt_y: u32,
    pub sprite_scale: u32,
    pub sprite_origin: (i32, i32),
    pub bar_x: u32,
    pub bar_y: u32,
    pub bar_width: u32,
    pub bar_height: u32,
}

pub const SPRITE_SIZE: u32 = 16;
const FOOTER_RESERVED_PX: u32 = 20;

impl UiLayoutMetrics {
    pub fn from_dimensions(width_px: u32, height_px: u32) -> Self {
        let char_width_px = 6;
        let line_height_px = 10;
        let menu_row_height = line_height_px + 2;

        let header_height = 11u32.min(height_px);
        let footer_y = height_px.saturating_sub(line_height_px - 1);
        let menu_area = height_px.saturating_sub(18);
        let menu_visible_items = (menu_area / menu_row_height).max(1) as usize;
        let menu_top = header_height.saturating_sub(1);

        let scale_w = (width_px / SPRITE_SIZE).max(1);
        let scale_h = (height_px.saturating_sub(FOOTER_RESERVED_PX) / SPRITE_SIZE).max(1);
        let sprite_scale = scale_w.min(scale_h).max(1);
        let sprite_px = (SPRITE_SIZE * sprite_scale) as i32;
        let sprite_origin = (
            (width_px as i32 - sprite_px) / 2,
            (height_px as i32 - sprite_px) / 2 - 4,
        );

        Self {
            width_px,
            height_px,
            char_width_px,
            line_height_px,
            header_height,
            footer_y,
            menu_top,
            menu_row_height,
            menu_visible_items,
            output_top: header_height + 1,
            chars_per_line: chars_that_fit(width_px, char_width_px),
            prompt_y: (height_px / 2).saturating_sub(12),
            sprite_scale,
            sprite_origin,
            bar_x: 8,
            bar_y: (height_px / 2).saturating_add(2),
            bar_width: width_px.saturating_sub(16).max(1),
            bar_height: 6,
        }
    }

    /// Vertical offset that centres `rows` menu rows in the space below the header.
    pub fn menu_start_y(&self, rows: usize) -> u32 {
        let area = self.height_px.saturating_sub(18);
        let used = self.menu_row_height * rows as u32;
        self.menu_top + area.saturating_sub(used) / 2
    }
}

pub fn chars_that_fit(width_px: u32, char_width_px: u32) -> usize {
    if char_width_px == 0 {
        return 1;
    }
    (width_px / char_width_px).max(1) as usize
}

pub fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let keep = max_chars - 3;
    let head: String = text.chars().take(keep).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gfx_hat_geometry() {
        let layout = UiLayoutMetrics::from_dimensions(128, 64);
        assert_eq!(layout.chars_per_line, 21);
        assert_eq!(layout.menu_visible_items, 3);
        assert_eq!(layout.sprite_scale, 2);
        assert_eq!(layout.sprite_origin, (48, 12));
        assert_eq!(layout.footer_y, 55);
        assert_eq!(layout.bar_width, 112);
    }

    #[test]
    fn bigger_panel_scales_sprite() {
        let layout = UiLayoutMetrics::from_dimensions(128, 128);
        assert_eq!(layout.sprite_scale, 6);
        assert!(layout.menu_visible_items > 3);
    }

    #[test]
    fn tiny_panel_never_produces_zero_sized_layout() {
        let layout = UiLayoutMetrics::from_dimensions(8, 8);
        assert_eq!(layout.chars_per_line, 1);
        assert_eq!(layout.menu_visible_items, 1);
        assert_eq!(layout.sprite_scale, 1);
        assert!(layout.bar_width >= 1);
    }

    #[test]
    fn menu_rows_are_centred() {
        let layout = UiLayoutMetrics::from_dimensions(128, 64);
        // 46px of menu area, 3 rows of 12px leaves 10px split evenly.
        assert_eq!(layout.menu_start_y(3), 10 + 5);
    }

    #[test]
    fn ellipsize_truncates_with_dots() {
        assert_eq!(ellipsize("short", 10), "short");
        assert_eq!(ellipsize("BACK:Lock  OK:Run  +/-:Lum", 21), "BACK:Lock  OK:Run ...");
        assert_eq!(ellipsize("abcdef", 2), "ab");
    }
}
