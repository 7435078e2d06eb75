//! Reading source documents into decoded lines.

use std::fs;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use tracing::{debug, warn};
use txtreader_core::{GlyphMetrics, Page, Viewport};

use crate::{EngineError, paginate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    /// A legacy single- or multi-byte encoding such as GBK or Big5.
    Legacy(&'static Encoding),
}

impl TextEncoding {
    /// A byte order mark wins. Otherwise valid UTF-8 stays UTF-8 and anything
    /// else is handed to the statistical detector.
    pub fn detect(bytes: &[u8]) -> Self {
        match bytes {
            [0xEF, 0xBB, 0xBF, ..] => TextEncoding::Utf8Bom,
            [0xFF, 0xFE, ..] => TextEncoding::Utf16Le,
            [0xFE, 0xFF, ..] => TextEncoding::Utf16Be,
            _ if std::str::from_utf8(bytes).is_ok() => TextEncoding::Utf8,
            _ => TextEncoding::guess(bytes),
        }
    }

    fn guess(bytes: &[u8]) -> Self {
        let mut detector = EncodingDetector::new();
        detector.feed(bytes, true);
        let encoding = detector.guess(None, true);
        if encoding == encoding_rs::UTF_8 {
            TextEncoding::Utf8
        } else {
            TextEncoding::Legacy(encoding)
        }
    }

    fn bom_len(self) -> usize {
        match self {
            TextEncoding::Utf8 | TextEncoding::Legacy(_) => 0,
            TextEncoding::Utf8Bom => 3,
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => 2,
        }
    }

    pub fn decode(self, bytes: &[u8]) -> String {
        let body = &bytes[self.bom_len().min(bytes.len())..];
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => match std::str::from_utf8(body) {
                Ok(text) => text.to_string(),
                Err(err) => {
                    warn!(
                        valid_up_to = err.valid_up_to(),
                        "source is not valid utf-8; decoding lossily"
                    );
                    String::from_utf8_lossy(body).into_owned()
                }
            },
            TextEncoding::Utf16Le => decode_utf16(body, u16::from_le_bytes),
            TextEncoding::Utf16Be => decode_utf16(body, u16::from_be_bytes),
            TextEncoding::Legacy(encoding) => {
                let (text, had_errors) = encoding.decode_without_bom_handling(body);
                if had_errors {
                    warn!(
                        encoding = encoding.name(),
                        "source has unmappable bytes; replaced"
                    );
                }
                text.into_owned()
            }
        }
    }
}

fn decode_utf16(body: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let chunks = body.chunks_exact(2);
    let dangling = !chunks.remainder().is_empty();
    let mut out: String = char::decode_utf16(chunks.map(|pair| unit([pair[0], pair[1]])))
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if dangling {
        out.push(char::REPLACEMENT_CHARACTER);
    }
    out
}

/// Splits on `\n`, `\r\n` and lone `\r`. A trailing terminator does not start
/// another line.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\n' => lines.push(std::mem::take(&mut current)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn read_lines(path: &Path) -> Result<Vec<String>, EngineError> {
    let bytes = fs::read(path).map_err(|source| EngineError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let encoding = TextEncoding::detect(&bytes);
    let lines = split_lines(&encoding.decode(&bytes));
    debug!(
        path = %path.display(),
        ?encoding,
        bytes = bytes.len(),
        lines = lines.len(),
        "source read"
    );
    Ok(lines)
}

/// Reads and paginates a file. The file is not touched when the viewport has
/// no room.
pub fn paginate_file<M>(
    path: &Path,
    viewport: &Viewport,
    metrics: &M,
) -> Result<Vec<Page>, EngineError>
where
    M: GlyphMetrics + ?Sized,
{
    if !viewport.has_room() {
        return Ok(Vec::new());
    }
    let lines = read_lines(path)?;
    Ok(paginate(&lines, viewport, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MonospaceMetrics;

    #[test]
    fn split_lines_matches_reader_semantics() {
        assert!(split_lines("").is_empty());
        assert_eq!(split_lines("abc"), vec!["abc"]);
        assert_eq!(split_lines("abc\n"), vec!["abc"]);
        assert_eq!(split_lines("\n"), vec![""]);
        assert_eq!(split_lines("a\r\n\r\nb\rc"), vec!["a", "", "b", "c"]);
    }

    #[test]
    fn detects_byte_order_marks() {
        assert_eq!(TextEncoding::detect(b"\xEF\xBB\xBFhi"), TextEncoding::Utf8Bom);
        assert_eq!(TextEncoding::detect(b"\xFF\xFEh\0"), TextEncoding::Utf16Le);
        assert_eq!(TextEncoding::detect(b"\xFE\xFF\0h"), TextEncoding::Utf16Be);
        assert_eq!(TextEncoding::detect(b"hi"), TextEncoding::Utf8);
    }

    #[test]
    fn decodes_utf16_both_orders() {
        let le = [0xFF, 0xFE, b'h', 0, b'i', 0];
        assert_eq!(TextEncoding::detect(&le).decode(&le), "hi");
        let be = [0xFE, 0xFF, 0x6D, 0x4B];
        assert_eq!(TextEncoding::detect(&be).decode(&be), "测");
    }

    #[test]
    fn strips_utf8_bom_and_replaces_invalid_bytes() {
        let bom = b"\xEF\xBB\xBFtext";
        assert_eq!(TextEncoding::detect(bom).decode(bom), "text");
        let broken = b"ok\xFF";
        assert_eq!(TextEncoding::Utf8.decode(broken), "ok\u{FFFD}");
    }

    #[test]
    fn decodes_gbk() {
        assert_eq!(
            TextEncoding::Legacy(encoding_rs::GBK).decode(b"\xB2\xE2\xCA\xD4"),
            "测试"
        );
    }

    #[test]
    fn reads_legacy_chinese_file() -> anyhow::Result<()> {
        let text = "第一章 风起\n天色渐渐暗了下来，城门口的行人越来越少。\n\
                    他站在客栈的窗前，望着远处的山峦，心中想着明天的路该怎么走。\n";
        let (bytes, _, unmappable) = encoding_rs::GBK.encode(text);
        assert!(!unmappable);
        assert!(matches!(TextEncoding::detect(&bytes), TextEncoding::Legacy(_)));

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("gbk.txt");
        fs::write(&path, &bytes)?;
        let lines = read_lines(&path)?;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "第一章 风起");
        assert_eq!(lines[2], "他站在客栈的窗前，望着远处的山峦，心中想着明天的路该怎么走。");
        Ok(())
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let err = read_lines(&path).unwrap_err();
        assert!(matches!(err, EngineError::Read { .. }));
    }

    #[test]
    fn paginate_file_skips_io_without_room() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let metrics = MonospaceMetrics::new(10, 20);
        let pages = paginate_file(&path, &Viewport::new(100, 0, 20), &metrics).unwrap();
        assert!(pages.is_empty());
    }

    #[test]
    fn paginate_file_reads_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("novel.txt");
        fs::write(&path, "one\r\n\r\ntwo\n").unwrap();
        let metrics = MonospaceMetrics::new(10, 20);
        let pages = paginate_file(&path, &Viewport::new(100, 40, 20), &metrics).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines()[0].as_str(), "one");
        assert!(pages[0].lines()[1].is_blank());
        assert_eq!(pages[1].lines()[0].as_str(), "two");
    }
}
