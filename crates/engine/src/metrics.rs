use txtreader_core::{GlyphMetrics, LineMetrics};
use unicode_width::UnicodeWidthChar;

/// Cells a tab advances in [`CellMetrics`].
pub const TAB_CELLS: u32 = 4;

/// Every glyph has the same advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonospaceMetrics {
    pub glyph_width: u32,
    pub line: LineMetrics,
}

impl MonospaceMetrics {
    pub fn new(glyph_width: u32, line_height: u32) -> Self {
        Self {
            glyph_width,
            line: LineMetrics {
                ascent: line_height,
                ..LineMetrics::default()
            },
        }
    }
}

impl GlyphMetrics for MonospaceMetrics {
    fn char_width(&self, _ch: char) -> u32 {
        self.glyph_width
    }

    fn line_metrics(&self) -> LineMetrics {
        self.line
    }
}

/// Terminal grid metrics: a glyph is as wide as the cells it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMetrics {
    pub cell_width_px: u32,
    pub cell_height_px: u32,
}

impl CellMetrics {
    pub fn new(cell_width_px: u32, cell_height_px: u32) -> Self {
        Self {
            cell_width_px,
            cell_height_px,
        }
    }

    pub fn cells(ch: char) -> u32 {
        if ch == '\t' {
            return TAB_CELLS;
        }
        ch.width().unwrap_or(0) as u32
    }
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl GlyphMetrics for CellMetrics {
    fn char_width(&self, ch: char) -> u32 {
        Self::cells(ch).saturating_mul(self.cell_width_px)
    }

    fn line_metrics(&self) -> LineMetrics {
        LineMetrics {
            ascent: self.cell_height_px,
            ..LineMetrics::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_follow_unicode_width() {
        assert_eq!(CellMetrics::cells('a'), 1);
        assert_eq!(CellMetrics::cells('测'), 2);
        assert_eq!(CellMetrics::cells('\u{301}'), 0);
        assert_eq!(CellMetrics::cells('\t'), TAB_CELLS);
    }

    #[test]
    fn cell_metrics_scale_to_pixels() {
        let metrics = CellMetrics::new(8, 16);
        assert_eq!(metrics.char_width('测'), 16);
        assert_eq!(metrics.line_height(), 16);
    }

    #[test]
    fn monospace_ignores_glyph() {
        let metrics = MonospaceMetrics::new(7, 18);
        assert_eq!(metrics.char_width('W'), 7);
        assert_eq!(metrics.char_width('i'), 7);
        assert_eq!(metrics.line_height(), 18);
    }
}
