//! Application orchestration layer for txtreader.
//!
//! Holds what the frontend shows: the display configuration, the document list
//! and the open document with its current page sequence. Nothing here touches
//! the terminal or the store file.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::debug;
use txtreader_core::{
    Argb, DisplayConfig, DocumentRecord, FontKey, FontStyle, GlyphMetrics, MAX_FONT_SIZE,
    MIN_FONT_SIZE, MIN_WINDOW_EDGE, Page, Progress, Viewport,
};
use txtreader_engine::{LayoutKey, PageCache};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("document has no pages")]
    NoPages,
    #[error("page {page} is out of range (0..{count})")]
    OutOfRange { page: usize, count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("window must be at least 100x100 (got {width}x{height})")]
    WindowTooSmall { width: u32, height: u32 },
    #[error("font size must be within 1..=200 (got {0})")]
    FontSize(u32),
    #[error("font family must not be blank")]
    BlankFont,
    #[error(transparent)]
    Page(#[from] NavigationError),
}

#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: DisplayConfig,
    pub records: Vec<DocumentRecord>,
    pub selected: usize,
    pub reader: Option<ReaderState>,
    /// One-shot message for the frontend, e.g. a failed save.
    pub notice: Option<String>,
}

impl AppContext {
    pub fn new(mut config: DisplayConfig) -> Self {
        config.normalize();
        Self {
            config,
            records: Vec::new(),
            selected: 0,
            reader: None,
            notice: None,
        }
    }

    pub fn with_records(mut self, records: Vec<DocumentRecord>) -> Self {
        self.records = records;
        self.selected = self.selected.min(self.records.len().saturating_sub(1));
        self
    }

    pub fn selected_record(&self) -> Option<&DocumentRecord> {
        self.records.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.records.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Page a document should reopen at.
    pub fn resume_page(&self, file_path: &str) -> u32 {
        self.records
            .iter()
            .find(|r| r.file_path == file_path)
            .map(|r| r.current_page)
            .unwrap_or(0)
    }

    pub fn open_document(&mut self, file_path: String, lines: Vec<String>) -> &mut ReaderState {
        let start = usize::try_from(self.resume_page(&file_path)).unwrap_or(usize::MAX);
        debug!(path = %file_path, lines = lines.len(), start, "document opened");
        self.reader.insert(ReaderState::new(file_path, lines).with_page(start))
    }

    /// Closes the open document, returning what should be persisted.
    pub fn close_document(&mut self) -> Option<(String, u32)> {
        let reader = self.reader.take()?;
        Some((reader.path().to_string(), page_number(reader.current_index())))
    }

    /// Mirrors a saved record: it moves to the front of the list.
    pub fn remember(&mut self, record: DocumentRecord) {
        self.records.retain(|r| r.file_path != record.file_path);
        self.records.insert(0, record);
        self.selected = 0;
    }

    pub fn forget(&mut self, file_path: &str) {
        self.records.retain(|r| r.file_path != file_path);
        self.selected = self.selected.min(self.records.len().saturating_sub(1));
    }

    /// Validates `change` against the open document and installs the
    /// resulting configuration. The caller reflows afterwards.
    pub fn apply_settings(&mut self, change: &SettingsChange) -> Result<(), SettingsError> {
        let page_count = self.reader.as_ref().map(ReaderState::page_count);
        let config = change.apply_to(&self.config, page_count)?;
        if let (Some(page), Some(reader)) = (change.jump_page, self.reader.as_mut()) {
            reader.jump_to(page)?;
        }
        self.config = config;
        Ok(())
    }
}

/// One open document and its pages for the current layout.
#[derive(Debug, Clone)]
pub struct ReaderState {
    path: String,
    lines: Vec<String>,
    cache: PageCache,
    pages: Arc<[Page]>,
    page: usize,
}

impl ReaderState {
    pub fn new(path: String, lines: Vec<String>) -> Self {
        Self {
            path,
            lines,
            cache: PageCache::new(),
            pages: Arc::from(Vec::new()),
            page: 0,
        }
    }

    /// Page to show once a layout exists.
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Paginates for `viewport`/`font` unless the pages already match.
    /// Returns whether a new page sequence was computed.
    pub fn layout<M>(&mut self, viewport: Viewport, font: FontKey, metrics: &M) -> bool
    where
        M: GlyphMetrics + ?Sized,
    {
        let key = LayoutKey {
            document: self.path.clone(),
            viewport,
            font,
        };
        if self.cache.key() == Some(&key) {
            return false;
        }
        self.pages = self.cache.get_or_paginate(key, &self.lines, metrics);
        if !self.pages.is_empty() {
            self.page = self.page.min(self.pages.len() - 1);
        }
        true
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_index(&self) -> usize {
        self.page
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.pages.get(self.page)
    }

    pub fn next_page(&mut self) -> bool {
        if self.page + 1 < self.pages.len() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page > 0 && !self.pages.is_empty() {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn jump_to(&mut self, page: usize) -> Result<(), NavigationError> {
        check_page(page, self.pages.len())?;
        self.page = page;
        Ok(())
    }

    pub fn progress(&self) -> Progress {
        Progress {
            current_page: page_number(self.page),
            total_pages: page_number(self.pages.len()),
        }
    }
}

// Saturates where a page index does not fit the persisted width.
fn page_number(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

fn check_page(page: usize, count: usize) -> Result<(), NavigationError> {
    if count == 0 {
        return Err(NavigationError::NoPages);
    }
    if page >= count {
        return Err(NavigationError::OutOfRange { page, count });
    }
    Ok(())
}

/// Values entered in the settings panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsChange {
    pub font: String,
    pub font_style: FontStyle,
    pub font_size: u32,
    pub foreground: Argb,
    pub width: u32,
    pub height: u32,
    pub jump_page: Option<usize>,
}

impl SettingsChange {
    pub fn from_config(config: &DisplayConfig, current_page: Option<usize>) -> Self {
        Self {
            font: config.font.clone(),
            font_style: config.font_style,
            font_size: config.font_size,
            foreground: config.foreground,
            width: config.window.width,
            height: config.window.height,
            jump_page: current_page,
        }
    }

    pub fn validate(&self, page_count: Option<usize>) -> Result<(), SettingsError> {
        if self.width < MIN_WINDOW_EDGE || self.height < MIN_WINDOW_EDGE {
            return Err(SettingsError::WindowTooSmall {
                width: self.width,
                height: self.height,
            });
        }
        if !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&self.font_size) {
            return Err(SettingsError::FontSize(self.font_size));
        }
        if self.font.trim().is_empty() {
            return Err(SettingsError::BlankFont);
        }
        if let (Some(page), Some(count)) = (self.jump_page, page_count) {
            check_page(page, count)?;
        }
        Ok(())
    }

    /// Builds the configuration this change describes; `base` is left as is.
    pub fn apply_to(
        &self,
        base: &DisplayConfig,
        page_count: Option<usize>,
    ) -> Result<DisplayConfig, SettingsError> {
        self.validate(page_count)?;
        let mut config = base.clone();
        config.font = self.font.trim().to_string();
        config.font_style = self.font_style;
        config.font_size = self.font_size;
        config.foreground = self.foreground;
        config.window.width = self.width;
        config.window.height = self.height;
        Ok(config)
    }
}

/// Absolute identity of a document: canonical when possible.
pub fn document_identity(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf());
    resolved.to_string_lossy().to_string()
}

pub fn is_text_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}

/// Human-friendly age of `then` relative to `now`.
pub fn format_last_read(then: NaiveDateTime, now: NaiveDateTime) -> String {
    let delta = (now - then).num_seconds();
    if delta < 10 {
        return "just now".to_string();
    }
    if delta < 60 {
        return format!("{delta}s ago");
    }
    if delta < 60 * 60 {
        return format!("{}m ago", delta / 60);
    }
    if delta < 60 * 60 * 24 {
        return format!("{}h ago", delta / (60 * 60));
    }
    format!("{}d ago", delta / (60 * 60 * 24))
}
