//! On-disk shape of the store file.
//!
//! Pure mapping between the JSON document and the domain types; no I/O and no
//! merge rules live here.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use txtreader_core::{Argb, DisplayConfig, DocumentRecord, FontStyle};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoreDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location_x: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location_y: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_style: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_foreground: Option<i64>,
    #[serde(default)]
    novels: Vec<StoredRecord>,
    /// Keys this program does not know about, written back untouched.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    file_path: String,
    #[serde(default)]
    current_page: i64,
    #[serde(
        default,
        serialize_with = "timestamp::serialize",
        deserialize_with = "timestamp::deserialize"
    )]
    last_reading_time: Option<NaiveDateTime>,
}

impl StoreDocument {
    pub(crate) fn config(&self) -> DisplayConfig {
        let defaults = DisplayConfig::default();
        let mut config = defaults.clone();

        if let (Some(width), Some(height)) = (self.width, self.height) {
            config.window.width = u32::try_from(width).unwrap_or(defaults.window.width);
            config.window.height = u32::try_from(height).unwrap_or(defaults.window.height);
        }
        if let (Some(x), Some(y)) = (self.location_x, self.location_y) {
            config.window.x = i32::try_from(x).unwrap_or(defaults.window.x);
            config.window.y = i32::try_from(y).unwrap_or(defaults.window.y);
        }
        if let Some(font) = &self.font {
            config.font = font.clone();
        }
        if let Some(size) = self.font_size {
            config.font_size = u32::try_from(size).unwrap_or(defaults.font_size);
        }
        if let Some(style) = self.font_style {
            config.font_style = i32::try_from(style)
                .map(FontStyle)
                .unwrap_or(defaults.font_style);
        }
        if let Some(color) = self.label_foreground {
            // Accept both the signed form and an unsigned 0xAARRGGBB.
            config.foreground = i32::try_from(color)
                .map(Argb::from_signed)
                .or_else(|_| u32::try_from(color).map(Argb))
                .unwrap_or(defaults.foreground);
        }

        config.normalize();
        config
    }

    pub(crate) fn set_config(&mut self, config: &DisplayConfig) {
        self.width = Some(i64::from(config.window.width));
        self.height = Some(i64::from(config.window.height));
        self.location_x = Some(i64::from(config.window.x));
        self.location_y = Some(i64::from(config.window.y));
        self.font = Some(config.font.clone());
        self.font_size = Some(i64::from(config.font_size));
        self.font_style = Some(i64::from(config.font_style.0));
        self.label_foreground = Some(i64::from(config.foreground.to_signed()));
    }

    /// Records in stored order.
    pub(crate) fn records(&self) -> Vec<DocumentRecord> {
        self.novels
            .iter()
            .map(|novel| DocumentRecord {
                file_path: novel.file_path.clone(),
                current_page: u32::try_from(novel.current_page.max(0)).unwrap_or(u32::MAX),
                last_reading_time: novel.last_reading_time.unwrap_or_default(),
            })
            .collect()
    }

    pub(crate) fn set_records(&mut self, records: &[DocumentRecord]) {
        self.novels = records
            .iter()
            .map(|record| StoredRecord {
                file_path: record.file_path.clone(),
                current_page: i64::from(record.current_page),
                last_reading_time: Some(record.last_reading_time),
            })
            .collect();
    }
}

/// `lastReadingTime` is written as ISO-8601 local time. Older stores may hold
/// `YYYY-MM-DD HH:MM:SS` strings or epoch milliseconds.
mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
    const LEGACY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub(super) fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.collect_str(&value.format(FORMAT)),
            None => serializer.serialize_none(),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Raw>::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        match raw {
            Raw::Text(text) => parse(&text).map(Some).ok_or_else(|| {
                serde::de::Error::custom(format!("invalid lastReadingTime: {text}"))
            }),
            Raw::Millis(millis) => DateTime::from_timestamp_millis(millis)
                .map(|dt| Some(dt.with_timezone(&Local).naive_local()))
                .ok_or_else(|| {
                    serde::de::Error::custom(format!("lastReadingTime out of range: {millis}"))
                }),
        }
    }

    pub(super) fn parse(text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        text.parse::<NaiveDateTime>()
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(text, LEGACY_FORMAT).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 21)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn reads_legacy_store() {
        let json = r#"{
            "width": 1024, "height": 700, "locationX": 10, "locationY": 20,
            "font": "KaiTi", "fontSize": 18, "fontStyle": 1, "labelForeground": -16777216,
            "novels": [
                {"filePath": "/a.txt", "currentPage": 4, "lastReadingTime": "2024-10-21 14:13:00"},
                {"filePath": "/b.txt", "currentPage": -2, "lastReadingTime": "2024-10-21T15:00:00.250"}
            ]
        }"#;
        let doc: StoreDocument = serde_json::from_str(json).unwrap();
        let config = doc.config();
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.y, 20);
        assert_eq!(config.font, "KaiTi");
        assert_eq!(config.font_style, FontStyle::BOLD);
        assert_eq!(config.foreground, Argb(0xFF00_0000));

        let records = doc.records();
        assert_eq!(records[0].last_reading_time, at(14, 13, 0));
        assert_eq!(records[1].current_page, 0);
        assert_eq!(
            records[1].last_reading_time,
            at(15, 0, 0) + chrono::TimeDelta::milliseconds(250)
        );
    }

    #[test]
    fn partial_geometry_falls_back_to_defaults() {
        let doc: StoreDocument = serde_json::from_str(r#"{"width": 300}"#).unwrap();
        assert_eq!(doc.config(), DisplayConfig::default());
    }

    #[test]
    fn accepts_epoch_millis_and_missing_time() {
        let json = r#"{"novels": [
            {"filePath": "/a.txt", "currentPage": 1, "lastReadingTime": 1729500000000},
            {"filePath": "/b.txt"}
        ]}"#;
        let doc: StoreDocument = serde_json::from_str(json).unwrap();
        let records = doc.records();
        assert!(records[0].last_reading_time > NaiveDateTime::default());
        assert_eq!(records[1].last_reading_time, NaiveDateTime::default());
        assert_eq!(records[1].current_page, 0);
    }

    #[test]
    fn rejects_garbage_timestamp() {
        let json = r#"{"novels": [{"filePath": "/a.txt", "lastReadingTime": "yesterday"}]}"#;
        assert!(serde_json::from_str::<StoreDocument>(json).is_err());
    }

    #[test]
    fn writes_external_field_names_and_keeps_unknown_keys() {
        let mut doc: StoreDocument = serde_json::from_str(r#"{"theme": "dark"}"#).unwrap();
        doc.set_config(&DisplayConfig::default());
        doc.set_records(&[DocumentRecord::new("/a.txt", 2, at(9, 30, 0))]);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["locationX"], 800);
        assert_eq!(value["fontSize"], 16);
        assert_eq!(value["fontStyle"], 0);
        assert_eq!(value["labelForeground"], -1);
        assert_eq!(value["novels"][0]["filePath"], "/a.txt");
        assert_eq!(value["novels"][0]["currentPage"], 2);
        assert_eq!(value["novels"][0]["lastReadingTime"], "2024-10-21T09:30:00");
    }

    #[test]
    fn timestamp_format_roundtrips_subseconds() {
        let stamp = at(9, 30, 0) + chrono::TimeDelta::microseconds(1_500);
        let text = stamp.format(timestamp::FORMAT).to_string();
        assert_eq!(timestamp::parse(&text), Some(stamp));
    }
}
