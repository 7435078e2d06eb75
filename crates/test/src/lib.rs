//! Test helpers and fixtures.

use std::path::{Path, PathBuf};

use txtreader_core::Viewport;
use txtreader_engine::MonospaceMetrics;

pub const GLYPH_WIDTH_PX: u32 = 10;
pub const LINE_HEIGHT_PX: u32 = 20;

/// Every glyph `GLYPH_WIDTH_PX` wide, lines `LINE_HEIGHT_PX` tall.
pub fn fixed_metrics() -> MonospaceMetrics {
    MonospaceMetrics::new(GLYPH_WIDTH_PX, LINE_HEIGHT_PX)
}

/// Viewport holding `columns` glyphs of [`fixed_metrics`] per line and `rows`
/// lines per page.
pub fn make_viewport(columns: u32, rows: u32) -> Viewport {
    Viewport::new(columns * GLYPH_WIDTH_PX, rows * LINE_HEIGHT_PX, LINE_HEIGHT_PX)
}

pub fn write_document(
    dir: &Path,
    name: &str,
    contents: impl AsRef<[u8]>,
) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use txtreader_application::{AppContext, SettingsChange, document_identity};
    use txtreader_core::{DisplayConfig, DisplayLine, FontStyle, GlyphMetrics, Page};
    use txtreader_engine::{paginate, read_lines};
    use txtreader_storage::RecordStore;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 21)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    /// Rebuilds source lines from pages by joining the pieces a long line was
    /// wrapped into.
    fn unwrap_pages(pages: &[Page], source: &[&str]) -> Vec<String> {
        let mut display = pages.iter().flat_map(|page| page.lines().iter());
        let mut rebuilt = Vec::new();
        for line in source {
            if line.is_empty() {
                match display.next() {
                    Some(DisplayLine::Blank) => rebuilt.push(String::new()),
                    other => panic!("expected a blank line, got {other:?}"),
                }
                continue;
            }
            let mut joined = String::new();
            while joined.len() < line.len() {
                match display.next() {
                    Some(DisplayLine::Text(piece)) => joined.push_str(piece),
                    other => panic!("ran out of pieces for {line:?}: {other:?}"),
                }
            }
            rebuilt.push(joined);
        }
        assert!(display.next().is_none());
        rebuilt
    }

    #[test]
    fn builds_viewport() {
        let viewport = make_viewport(8, 3);
        assert_eq!(viewport.max_lines(), 3);
        assert_eq!(viewport.available_width_px, 80);
        assert_eq!(fixed_metrics().line_height(), LINE_HEIGHT_PX);
    }

    #[test]
    fn pages_reproduce_source_and_respect_bounds() {
        let source = [
            "Chapter 1",
            "",
            "It was a bright cold day in April, and the clocks were striking thirteen.",
            "",
            "",
            "短行",
            "一行很长的中文文本需要被折成好几行才能放下",
        ];
        let viewport = make_viewport(12, 4);
        let metrics = fixed_metrics();
        let pages = paginate(source, &viewport, &metrics);

        assert_eq!(unwrap_pages(&pages, &source), source);
        for page in &pages {
            assert!(!page.is_empty());
            assert!(page.len() as u32 <= viewport.max_lines());
            for line in page.lines() {
                let width: u32 = line.as_str().chars().map(|ch| metrics.char_width(ch)).sum();
                assert!(width <= viewport.available_width_px);
            }
        }
        assert_eq!(pages, paginate(source, &viewport, &metrics));
    }

    #[test]
    fn read_save_and_resume() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let doc = write_document(
            dir.path(),
            "novel.txt",
            "\u{FEFF}one\r\ntwo\r\nthree\r\nfour\r\nfive\r\n",
        )?;
        let store = RecordStore::new(dir.path().join("state").join("bookmark.json"));
        let identity = document_identity(&doc);
        let viewport = make_viewport(10, 2);
        let metrics = fixed_metrics();

        let mut ctx = AppContext::new(DisplayConfig::default());
        let font = ctx.config.font_key();
        let reader = ctx.open_document(identity.clone(), read_lines(&doc)?);
        reader.layout(viewport, font, &metrics);
        assert_eq!(reader.page_count(), 3);
        assert_eq!(
            reader.current_page().map(Page::to_markup).as_deref(),
            Some("<html>one<br/>two<br/></html>")
        );
        reader.next_page();
        reader.next_page();

        let (path, page) = ctx.close_document().unwrap();
        let saved = store.upsert(&path, page, &ctx.config)?.unwrap();
        ctx.remember(saved);

        let snapshot = store.load()?;
        assert_eq!(snapshot.records[0].file_path, identity);
        assert_eq!(snapshot.records[0].current_page, 2);
        assert_eq!(snapshot.config, DisplayConfig::default());

        let mut ctx = AppContext::new(snapshot.config).with_records(snapshot.records);
        let reader = ctx.open_document(identity, read_lines(&doc)?);
        reader.layout(viewport, DisplayConfig::default().font_key(), &metrics);
        assert_eq!(reader.current_index(), 2);
        assert_eq!(reader.current_page().map(Page::len), Some(1));
        Ok(())
    }

    #[test]
    fn settings_change_reflows_and_persists() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = RecordStore::new(dir.path().join("bookmark.json"));
        let lines: Vec<String> = (0..12).map(|i| format!("line {i}")).collect();
        let metrics = fixed_metrics();

        let mut ctx = AppContext::new(DisplayConfig::default());
        let font = ctx.config.font_key();
        ctx.open_document("/books/a.txt".to_string(), lines)
            .layout(make_viewport(10, 2), font, &metrics);

        let mut change = SettingsChange::from_config(&ctx.config, Some(5));
        change.font_style = FontStyle::ITALIC;
        change.font_size = 20;
        ctx.apply_settings(&change)?;

        let font = ctx.config.font_key();
        let reader = ctx.reader.as_mut().unwrap();
        assert!(reader.layout(make_viewport(10, 4), font, &metrics));
        assert_eq!(reader.page_count(), 3);
        assert_eq!(reader.current_index(), 2);

        let (path, page) = ctx.close_document().unwrap();
        store.upsert(&path, page, &ctx.config)?;
        let config = store.load()?.config;
        assert_eq!(config.font_style, FontStyle::ITALIC);
        assert_eq!(config.font_size, 20);
        Ok(())
    }

    #[test]
    fn records_load_newest_first_and_delete() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = RecordStore::new(dir.path().join("bookmark.json"));
        let config = DisplayConfig::default();

        store.upsert_at("/t2.txt", 2, &config, at(2))?;
        store.upsert_at("/t3.txt", 3, &config, at(3))?;
        store.upsert_at("/t1.txt", 1, &config, at(1))?;

        let order: Vec<String> = store
            .load()?
            .records
            .into_iter()
            .map(|r| r.file_path)
            .collect();
        // The last save lists first; its time is only a lower bound.
        assert_eq!(order, ["/t1.txt", "/t3.txt", "/t2.txt"]);

        let raw = r#"{"novels": [
            {"filePath": "/t1.txt", "currentPage": 1, "lastReadingTime": "2024-10-21T01:00:00"},
            {"filePath": "/t3.txt", "currentPage": 3, "lastReadingTime": "2024-10-21T03:00:00"},
            {"filePath": "/t2.txt", "currentPage": 2, "lastReadingTime": "2024-10-21T02:00:00"}
        ]}"#;
        std::fs::write(store.path(), raw)?;
        let snapshot = store.load()?;
        let order: Vec<&str> = snapshot.records.iter().map(|r| r.file_path.as_str()).collect();
        assert_eq!(order, ["/t3.txt", "/t2.txt", "/t1.txt"]);

        assert!(store.delete("/t2.txt")?);
        assert!(!store.delete("/t2.txt")?);
        let snapshot = store.load()?;
        assert!(!snapshot.contains("/t2.txt"));
        assert_eq!(snapshot.records.len(), 2);
        Ok(())
    }

    #[test]
    fn degenerate_inputs_yield_no_pages() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let empty = write_document(dir.path(), "empty.txt", "")?;
        let metrics = fixed_metrics();

        assert!(paginate(read_lines(&empty)?, &make_viewport(10, 3), &metrics).is_empty());
        assert!(paginate(["text"], &make_viewport(10, 0), &metrics).is_empty());

        let narrow = Viewport::new(GLYPH_WIDTH_PX / 2, LINE_HEIGHT_PX * 4, LINE_HEIGHT_PX);
        let pages = paginate(["abc"], &narrow, &metrics);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 3);
        Ok(())
    }
}
