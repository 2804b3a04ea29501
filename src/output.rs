use std::fs;
use std::path::{Path, PathBuf};

use rand::{Rng, rng};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::Result;
use crate::model::EventRecord;

/// Pretty JSON with a four-space indent; non-ASCII text is written as-is.
pub fn render_records(records: &[EventRecord]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut ser)?;
    Ok(buf)
}

/// Writes `dir/event_data_<suffix>.json`, creating `dir` if needed.
pub fn write_records(dir: &Path, records: &[EventRecord]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("event_data_{}.json", random_suffix()));
    fs::write(&path, render_records(records)?)?;
    Ok(path)
}

fn random_suffix() -> String {
    format!("{:05x}", rng().random_range(0..0x10_0000u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DateTime, PriceTier};

    fn record() -> EventRecord {
        EventRecord {
            event_name: "Fête de la Musique".into(),
            date_time: DateTime {
                start_date: "2026-06-21".into(),
                start_time: "18:00".into(),
                end_date: "2026-06-21".into(),
                end_time: "23:30".into(),
            },
            event_url: "https://www.eventbrite.com/e/fete".into(),
            location: "Place du Marché".into(),
            prices: vec![PriceTier { name: "Entrée".into(), price: "0".into() }],
        }
    }

    #[test]
    fn renders_indented_unescaped_json() {
        let text = String::from_utf8(render_records(&[record()]).unwrap()).unwrap();
        assert!(text.starts_with("[\n    {\n        \"event_name\": \"Fête de la Musique\""));
        assert!(text.contains("\"location\": \"Place du Marché\""));
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn writes_into_a_fresh_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("event_datas");
        let path = write_records(&dir, &[record()]).unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("event_data_") && name.ends_with(".json"));
        let suffix = &name["event_data_".len()..name.len() - ".json".len()];
        assert_eq!(suffix.len(), 5);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let back: Vec<EventRecord> = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(back, vec![record()]);
    }

    #[test]
    fn empty_run_still_writes_an_array() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_records(tmp.path(), &[]).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "[]");
    }
}
