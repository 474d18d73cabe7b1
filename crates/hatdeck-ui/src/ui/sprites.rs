//! 16x16 lock-screen mascot, two idle frames. Each row is one `u16`, MSB = leftmost pixel.

use super::layout::SPRITE_SIZE;

pub const MASCOT_IDLE_1: [u16; 16] = [
    0b1000_0010_0000_0000,
    0b1100_0110_0000_0000,
    0b1011_1010_0000_0000,
    0b1000_0010_0001_1000,
    0b1000_0010_0010_0100,
    0b1100_1010_0010_0010,
    0b1000_0010_0001_1001,
    0b1000_0010_0000_0101,
    0b1000_0110_0000_0101,
    0b1100_0001_1100_1001,
    0b0110_0000_0011_0010,
    0b0010_0000_0001_0100,
    0b0010_0000_0001_1000,
    0b0010_0100_1001_0000,
    0b0010_0100_1001_0000,
    0b0011_1111_1111_0000,
];

pub const MASCOT_IDLE_2: [u16; 16] = [
    0b0100_0001_0000_0000,
    0b1010_0010_1000_0000,
    0b1001_1100_1000_0000,
    0b1000_0000_1000_1100,
    0b1000_0000_1001_0010,
    0b1010_0100_1001_0001,
    0b1000_0000_1000_1001,
    0b1000_0000_1000_0101,
    0b0100_0001_1000_0101,
    0b0010_0000_0100_0101,
    0b0010_0000_0011_1001,
    0b0010_0000_0001_0010,
    0b0010_0000_0001_1100,
    0b0010_0100_1001_0000,
    0b0010_0100_1001_0000,
    0b0011_1111_1111_0000,
];

/// Which idle frame the lock screen shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnimationFrame {
    #[default]
    EyesOpen,
    Blink,
}

impl AnimationFrame {
    pub fn toggled(self) -> Self {
        match self {
            Self::EyesOpen => Self::Blink,
            Self::Blink => Self::EyesOpen,
        }
    }

    pub fn bitmap(self) -> &'static [u16; 16] {
        match self {
            Self::EyesOpen => &MASCOT_IDLE_1,
            Self::Blink => &MASCOT_IDLE_2,
        }
    }
}

/// Iterate the `(column, row)` of every set pixel in a sprite.
pub fn lit_pixels(bitmap: &[u16; 16]) -> impl Iterator<Item = (u32, u32)> + '_ {
    bitmap.iter().enumerate().flat_map(|(row, bits)| {
        (0..SPRITE_SIZE).filter_map(move |col| {
            let mask = 1u16 << (SPRITE_SIZE - 1 - col);
            (bits & mask != 0).then_some((col, row as u32))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_alternate() {
        let frame = AnimationFrame::default();
        assert_eq!(frame.toggled(), AnimationFrame::Blink);
        assert_eq!(frame.toggled().toggled(), frame);
        assert_ne!(frame.bitmap(), frame.toggled().bitmap());
    }

    #[test]
    fn lit_pixels_reads_msb_first() {
        let pixels: Vec<(u32, u32)> = lit_pixels(&MASCOT_IDLE_1).take(2).collect();
        assert_eq!(pixels, vec![(0, 0), (6, 0)]);
    }

    #[test]
    fn bottom_row_is_the_solid_base() {
        let bottom: Vec<u32> = lit_pixels(&MASCOT_IDLE_1)
            .filter(|(_, row)| *row == 15)
            .map(|(col, _)| col)
            .collect();
        assert_eq!(bottom, (2..12).collect::<Vec<_>>());
    }
}
