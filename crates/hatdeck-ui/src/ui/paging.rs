/// Bounded scroll position over an immutable list of lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedBuffer {
    lines: Vec<String>,
    offset: usize,
    page_size: usize,
}

/// Largest offset that still fills a page, or 0 when everything fits.
pub fn max_offset(total_lines: usize, page_size: usize) -> usize {
    total_lines.saturating_sub(page_size)
}

pub fn clamped_offset(requested: usize, total_lines: usize, page_size: usize) -> usize {
    requested.min(max_offset(total_lines, page_size))
}

impl PagedBuffer {
    pub fn new(lines: Vec<String>, page_size: usize) -> Self {
        Self {
            lines,
            offset: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn scroll_up(&mut self) {
        self.offset = self.offset.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.offset = clamped_offset(self.offset + 1, self.lines.len(), self.page_size);
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn visible(&self) -> &[String] {
        let end = (self.offset + self.page_size).min(self.lines.len());
        &self.lines[self.offset..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn scroll_down_stabilises_at_total_minus_page() {
        let mut buf = PagedBuffer::new(numbered(12), 5);
        for _ in 0..20 {
            buf.scroll_down();
            assert!(buf.offset() <= 7);
        }
        assert_eq!(buf.offset(), 7);
        assert_eq!(buf.visible().len(), 5);
        assert_eq!(buf.visible()[4], "line 11");
    }

    #[test]
    fn scroll_up_returns_to_zero_and_stays() {
        let mut buf = PagedBuffer::new(numbered(12), 5);
        for _ in 0..7 {
            buf.scroll_down();
        }
        for _ in 0..20 {
            buf.scroll_up();
        }
        assert_eq!(buf.offset(), 0);
    }

    #[test]
    fn short_content_never_scrolls() {
        let mut buf = PagedBuffer::new(numbered(3), 5);
        buf.scroll_down();
        assert_eq!(buf.offset(), 0);
        assert_eq!(buf.visible().len(), 3);
    }

    #[test]
    fn clamp_handles_empty_and_oversized_requests() {
        assert_eq!(clamped_offset(3, 0, 5), 0);
        assert_eq!(clamped_offset(100, 12, 5), 7);
        assert_eq!(clamped_offset(2, 12, 5), 2);
    }
}
