//! Core domain types for txtreader.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Opens a page fragment.
pub const PAGE_START: &str = "<html>";
/// Terminates every display-line inside a page fragment.
pub const LINE_BREAK: &str = "<br/>";
/// Closes a page fragment.
pub const PAGE_END: &str = "</html>";

pub const MIN_WINDOW_EDGE: u32 = 100;
pub const MIN_FONT_SIZE: u32 = 1;
pub const MAX_FONT_SIZE: u32 = 200;

/// Vertical metrics of a font, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LineMetrics {
    pub ascent: u32,
    pub descent: u32,
    pub leading: u32,
    /// Fixed extra spacing added below every line.
    pub compensation: u32,
}

impl LineMetrics {
    pub fn height(&self) -> u32 {
        self.ascent
            .saturating_add(self.descent)
            .saturating_add(self.leading)
            .saturating_add(self.compensation)
    }
}

/// Measures glyphs for a concrete font/style/size.
///
/// Implementations are supplied by whatever renders the pages; the engine only
/// ever asks for the advance of a single `char` and the height of one line.
pub trait GlyphMetrics {
    fn char_width(&self, ch: char) -> u32;

    fn line_metrics(&self) -> LineMetrics;

    fn line_height(&self) -> u32 {
        self.line_metrics().height()
    }
}

impl<M: GlyphMetrics + ?Sized> GlyphMetrics for &M {
    fn char_width(&self, ch: char) -> u32 {
        (**self).char_width(ch)
    }

    fn line_metrics(&self) -> LineMetrics {
        (**self).line_metrics()
    }
}

/// Pixel area a page has to fit into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub available_width_px: u32,
    pub available_height_px: u32,
    pub line_height_px: u32,
}

impl Viewport {
    pub fn new(available_width_px: u32, available_height_px: u32, line_height_px: u32) -> Self {
        Self {
            available_width_px,
            available_height_px,
            line_height_px,
        }
    }

    pub fn for_metrics(
        available_width_px: u32,
        available_height_px: u32,
        metrics: &impl GlyphMetrics,
    ) -> Self {
        Self::new(
            available_width_px,
            available_height_px,
            metrics.line_height(),
        )
    }

    pub fn max_lines(&self) -> u32 {
        if self.line_height_px == 0 {
            0
        } else {
            self.available_height_px / self.line_height_px
        }
    }

    /// False when not even one glyph row fits; pagination then yields no pages.
    pub fn has_room(&self) -> bool {
        self.available_width_px > 0 && self.max_lines() >= 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DisplayLine {
    Text(String),
    /// Stands in for a blank source line.
    Blank,
}

impl DisplayLine {
    pub fn as_str(&self) -> &str {
        match self {
            DisplayLine::Text(text) => text,
            DisplayLine::Blank => "",
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, DisplayLine::Blank)
    }
}

/// A screenful of display-lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Page {
    lines: Vec<DisplayLine>,
}

impl Page {
    pub fn new(lines: Vec<DisplayLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[DisplayLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Renders the page as one delimited fragment. Line text is emitted verbatim.
    pub fn to_markup(&self) -> String {
        let body: usize = self.lines.iter().map(|l| l.as_str().len()).sum();
        let mut out = String::with_capacity(
            PAGE_START.len() + PAGE_END.len() + body + self.lines.len() * LINE_BREAK.len(),
        );
        out.push_str(PAGE_START);
        for line in &self.lines {
            out.push_str(line.as_str());
            out.push_str(LINE_BREAK);
        }
        out.push_str(PAGE_END);
        out
    }
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_markup())
    }
}

/// Font style bits as persisted: bit 0 is bold, bit 1 is italic. Other values
/// are carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FontStyle(pub i32);

impl FontStyle {
    pub const PLAIN: FontStyle = FontStyle(0);
    pub const BOLD: FontStyle = FontStyle(1);
    pub const ITALIC: FontStyle = FontStyle(2);
    pub const BOLD_ITALIC: FontStyle = FontStyle(3);

    pub fn is_bold(&self) -> bool {
        self.0 & Self::BOLD.0 != 0
    }

    pub fn is_italic(&self) -> bool {
        self.0 & Self::ITALIC.0 != 0
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            FontStyle::PLAIN => "plain",
            FontStyle::BOLD => "bold",
            FontStyle::ITALIC => "italic",
            FontStyle::BOLD_ITALIC => "bold italic",
            _ => "custom",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            FontStyle::PLAIN => FontStyle::BOLD,
            FontStyle::BOLD => FontStyle::ITALIC,
            _ => FontStyle::PLAIN,
        }
    }
}

impl std::fmt::Display for FontStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FontStyle {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "plain" | "normal" => Ok(FontStyle::PLAIN),
            "bold" => Ok(FontStyle::BOLD),
            "italic" => Ok(FontStyle::ITALIC),
            "bold italic" | "bolditalic" => Ok(FontStyle::BOLD_ITALIC),
            _ => Err("unknown font style"),
        }
    }
}

/// Packed `0xAARRGGBB` colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Argb(pub u32);

impl Argb {
    pub const WHITE: Argb = Argb(0xFFFF_FFFF);

    pub fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Argb(0xFF00_0000 | (u32::from(red) << 16) | (u32::from(green) << 8) | u32::from(blue))
    }

    /// The store keeps colours as signed 32-bit integers.
    pub fn from_signed(value: i32) -> Self {
        Argb(value as u32)
    }

    pub fn to_signed(self) -> i32 {
        self.0 as i32
    }

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }
}

impl Default for Argb {
    fn default() -> Self {
        Self::WHITE
    }
}

impl std::fmt::Display for Argb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red(), self.green(), self.blue())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self {
            width: 900,
            height: 600,
            x: 800,
            y: 500,
        }
    }
}

/// Identifies the font a page sequence was measured with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    pub family: String,
    pub style: FontStyle,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub foreground: Argb,
    pub font: String,
    pub font_style: FontStyle,
    pub font_size: u32,
    pub window: WindowGeometry,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            foreground: Argb::WHITE,
            font: "Serif".to_string(),
            font_style: FontStyle::PLAIN,
            font_size: 16,
            window: WindowGeometry::default(),
        }
    }
}

impl DisplayConfig {
    pub fn normalize(&mut self) {
        self.font_size = self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self.window.width = self.window.width.max(MIN_WINDOW_EDGE);
        self.window.height = self.window.height.max(MIN_WINDOW_EDGE);
        let font = self.font.trim();
        if font.is_empty() {
            self.font = DisplayConfig::default().font;
        } else if font.len() != self.font.len() {
            self.font = font.to_string();
        }
    }

    pub fn font_key(&self) -> FontKey {
        FontKey {
            family: self.font.clone(),
            style: self.font_style,
            size: self.font_size,
        }
    }
}

/// Reading progress for one document, keyed by its absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRecord {
    pub file_path: String,
    pub current_page: u32,
    pub last_reading_time: NaiveDateTime,
}

impl DocumentRecord {
    pub fn new(file_path: impl Into<String>, current_page: u32, at: NaiveDateTime) -> Self {
        Self {
            file_path: file_path.into(),
            current_page,
            last_reading_time: at,
        }
    }

    pub fn file_name(&self) -> &str {
        Path::new(&self.file_path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.file_path)
    }

    pub fn directory(&self) -> &str {
        Path::new(&self.file_path)
            .parent()
            .and_then(|dir| dir.to_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub current_page: u32,
    pub total_pages: u32,
}

impl Progress {
    pub fn percent(&self) -> f32 {
        if self.total_pages == 0 {
            0.0
        } else {
            ((self.current_page + 1) as f32 / self.total_pages as f32) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn max_lines_floors_and_handles_zero_line_height() {
        assert_eq!(Viewport::new(100, 95, 20).max_lines(), 4);
        assert_eq!(Viewport::new(100, 95, 0).max_lines(), 0);
        assert!(!Viewport::new(0, 95, 20).has_room());
        assert!(!Viewport::new(100, 19, 20).has_room());
        assert!(Viewport::new(1, 20, 20).has_room());
    }

    #[test]
    fn line_metrics_sum_into_height() {
        let metrics = LineMetrics {
            ascent: 12,
            descent: 4,
            leading: 1,
            compensation: 3,
        };
        assert_eq!(metrics.height(), 20);
    }

    #[test]
    fn page_markup_wraps_lines() {
        let page = Page::new(vec![
            DisplayLine::Text("AAAA".to_string()),
            DisplayLine::Blank,
        ]);
        assert_eq!(page.to_markup(), "<html>AAAA<br/><br/></html>");
        assert_eq!(page.to_string(), page.to_markup());
    }

    #[test]
    fn font_style_bits() {
        assert!(FontStyle::BOLD_ITALIC.is_bold());
        assert!(FontStyle::BOLD_ITALIC.is_italic());
        assert!(!FontStyle::PLAIN.is_bold());
        assert_eq!(FontStyle(7).as_str(), "custom");
        assert_eq!(" Bold ".parse::<FontStyle>().unwrap(), FontStyle::BOLD);
        assert!("heavy".parse::<FontStyle>().is_err());
    }

    #[test]
    fn cycle_font_style_rotates() {
        let style = FontStyle::PLAIN.cycle();
        assert_eq!(style, FontStyle::BOLD);
        let style = style.cycle();
        assert_eq!(style, FontStyle::ITALIC);
        assert_eq!(style.cycle(), FontStyle::PLAIN);
    }

    #[test]
    fn argb_signed_roundtrip() {
        assert_eq!(Argb::WHITE.to_signed(), -1);
        assert_eq!(Argb::from_signed(-1), Argb::WHITE);
        let orange = Argb::from_rgb(0xff, 0x80, 0x00);
        assert_eq!(orange.alpha(), 0xff);
        assert_eq!(orange.to_string(), "#ff8000");
    }

    #[test]
    fn display_config_normalizes() {
        let mut config = DisplayConfig {
            font: "  ".to_string(),
            font_size: 0,
            window: WindowGeometry {
                width: 20,
                height: 640,
                x: 0,
                y: 0,
            },
            ..DisplayConfig::default()
        };
        config.normalize();
        assert_eq!(config.font, "Serif");
        assert_eq!(config.font_size, MIN_FONT_SIZE);
        assert_eq!(config.window.width, MIN_WINDOW_EDGE);
        assert_eq!(config.window.height, 640);
    }

    #[test]
    fn record_splits_path() {
        let at = NaiveDate::from_ymd_opt(2024, 10, 21)
            .unwrap()
            .and_hms_opt(14, 13, 0)
            .unwrap();
        let record = DocumentRecord::new("/books/novel.txt", 3, at);
        assert_eq!(record.file_name(), "novel.txt");
        assert_eq!(record.directory(), "/books");
    }

    #[test]
    fn progress_handles_zero_pages() {
        let progress = Progress {
            current_page: 1,
            total_pages: 0,
        };
        assert_eq!(progress.percent(), 0.0);
        let progress = Progress {
            current_page: 0,
            total_pages: 4,
        };
        assert_eq!(progress.percent(), 25.0);
    }
}
