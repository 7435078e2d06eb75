//! Pagination engine.
//!
//! Turns decoded source lines into fixed-size [`Page`]s by greedy width-first
//! wrapping against a [`Viewport`] and a [`GlyphMetrics`] provider. The result
//! is only valid for the (document, viewport, font) triple it was computed for;
//! [`PageCache`] keeps exactly one such sequence and drops it when the key
//! changes.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, trace};
use txtreader_core::{DisplayLine, FontKey, GlyphMetrics, Page, Viewport};

mod metrics;
pub mod source;

pub use metrics::{CellMetrics, MonospaceMetrics, TAB_CELLS};
pub use source::{TextEncoding, paginate_file, read_lines};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Paginates `lines` in one pass.
///
/// Returns no pages when the viewport cannot hold a single glyph row, and no
/// pages for empty input.
pub fn paginate<I, S, M>(lines: I, viewport: &Viewport, metrics: &M) -> Vec<Page>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    M: GlyphMetrics + ?Sized,
{
    if !viewport.has_room() {
        debug!(
            width = viewport.available_width_px,
            height = viewport.available_height_px,
            line_height = viewport.line_height_px,
            "viewport too small to paginate"
        );
        return Vec::new();
    }

    let mut paginator = Paginator::new(*viewport, metrics);
    for line in lines {
        paginator.push_line(line.as_ref());
    }
    paginator.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WrapState {
    /// Room left on the current page; take the next segment of the line.
    Accumulating,
    /// The current page holds `max_lines` lines and must be flushed first.
    PageFull,
    /// Every character of the source line has been placed.
    LineExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Break {
    /// Byte length of the longest prefix that fits the width.
    Fit(usize),
    /// Nothing fits; byte length of the single character taken anyway.
    Forced(usize),
}

/// Incremental pagination over a stream of source lines.
pub struct Paginator<'m, M: GlyphMetrics + ?Sized> {
    viewport: Viewport,
    metrics: &'m M,
    max_lines: usize,
    current: Vec<DisplayLine>,
    pages: Vec<Page>,
    forced_breaks: usize,
}

impl<'m, M: GlyphMetrics + ?Sized> Paginator<'m, M> {
    pub fn new(viewport: Viewport, metrics: &'m M) -> Self {
        Self {
            viewport,
            metrics,
            max_lines: viewport.max_lines() as usize,
            current: Vec::new(),
            pages: Vec::new(),
            forced_breaks: 0,
        }
    }

    pub fn push_line(&mut self, line: &str) {
        if !self.viewport.has_room() {
            return;
        }

        if line.is_empty() {
            if self.is_page_full() {
                self.flush();
            }
            self.current.push(DisplayLine::Blank);
            return;
        }

        let mut rest = line;
        let mut state = if self.is_page_full() {
            WrapState::PageFull
        } else {
            WrapState::Accumulating
        };

        loop {
            state = match state {
                WrapState::PageFull => {
                    self.flush();
                    WrapState::Accumulating
                }
                WrapState::Accumulating => {
                    let len = match self.next_break(rest) {
                        Break::Fit(len) => len,
                        Break::Forced(len) => {
                            self.forced_breaks += 1;
                            trace!(
                                glyph = %&rest[..len],
                                width = self.viewport.available_width_px,
                                "glyph wider than viewport; forcing a break"
                            );
                            len
                        }
                    };
                    let (head, tail) = rest.split_at(len);
                    self.current.push(DisplayLine::Text(head.to_string()));
                    rest = tail;

                    if rest.is_empty() {
                        WrapState::LineExhausted
                    } else if self.is_page_full() {
                        WrapState::PageFull
                    } else {
                        WrapState::Accumulating
                    }
                }
                WrapState::LineExhausted => break,
            };
        }
    }

    /// Number of display-lines that had to overflow the width.
    pub fn forced_breaks(&self) -> usize {
        self.forced_breaks
    }

    pub fn finish(mut self) -> Vec<Page> {
        if !self.current.is_empty() {
            self.flush();
        }
        debug!(
            pages = self.pages.len(),
            max_lines = self.max_lines,
            width = self.viewport.available_width_px,
            forced_breaks = self.forced_breaks,
            "pagination finished"
        );
        self.pages
    }

    fn is_page_full(&self) -> bool {
        self.current.len() >= self.max_lines
    }

    fn flush(&mut self) {
        let lines = std::mem::take(&mut self.current);
        self.pages.push(Page::new(lines));
    }

    fn next_break(&self, rest: &str) -> Break {
        let limit = u64::from(self.viewport.available_width_px);
        let mut running = 0u64;
        for (idx, ch) in rest.char_indices() {
            let width = u64::from(self.metrics.char_width(ch));
            if running + width > limit {
                return if idx == 0 {
                    Break::Forced(ch.len_utf8())
                } else {
                    Break::Fit(idx)
                };
            }
            running += width;
        }
        Break::Fit(rest.len())
    }
}

/// Everything a page sequence depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    pub document: String,
    pub viewport: Viewport,
    pub font: FontKey,
}

/// Holds the page sequence of one [`LayoutKey`].
#[derive(Debug, Clone, Default)]
pub struct PageCache {
    entry: Option<(LayoutKey, Arc<[Page]>)>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self) -> Option<&LayoutKey> {
        self.entry.as_ref().map(|(key, _)| key)
    }

    pub fn get(&self, key: &LayoutKey) -> Option<Arc<[Page]>> {
        match &self.entry {
            Some((cached, pages)) if cached == key => Some(Arc::clone(pages)),
            _ => None,
        }
    }

    /// Returns the cached pages for `key`, recomputing from scratch on any
    /// mismatch.
    pub fn get_or_paginate<S, M>(&mut self, key: LayoutKey, lines: &[S], metrics: &M) -> Arc<[Page]>
    where
        S: AsRef<str>,
        M: GlyphMetrics + ?Sized,
    {
        if let Some(pages) = self.get(&key) {
            return pages;
        }
        if let Some(stale) = self.key() {
            debug!(document = %stale.document, "layout changed; discarding pages");
        }
        let pages: Arc<[Page]> = paginate(lines, &key.viewport, metrics).into();
        self.entry = Some((key, Arc::clone(&pages)));
        pages
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
