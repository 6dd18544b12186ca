use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::clock::datetime_from_unix_seconds;
use crate::config::LayoutConfig;
use crate::error::{AlignError, Result};
use crate::types::HeartRateSample;

const DEFAULT_NAMESPACE: &str = r#" xmlns="[^"]+""#;
const TCX_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Largest |unix seconds| a nanosecond-precision i64 clock can hold (year 2262)
const MAX_EPOCH_SECONDS: f64 = 9_223_372_036.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartRateFormat {
    Tcx,
    Json,
}

impl fmt::Display for HeartRateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeartRateFormat::Tcx => write!(f, "tcx"),
            HeartRateFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for HeartRateFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcx" => Ok(HeartRateFormat::Tcx),
            "json" => Ok(HeartRateFormat::Json),
            other => Err(format!("unknown heart-rate format '{}' (expected tcx or json)", other)),
        }
    }
}

impl HeartRateFormat {
    /// Load heart-rate samples for a session.
    ///
    /// For TCX, `path` is either one `.tcx` file or a directory scanned for
    /// them. For JSON, `path` is the session directory holding the Samsung
    /// Health subdirectory.
    pub fn load(self, path: &Path, layout: &LayoutConfig) -> Result<Vec<HeartRateSample>> {
        let mut samples = match self {
            HeartRateFormat::Tcx => load_tcx(path, &layout.tcx_extension)?,
            HeartRateFormat::Json => load_samsung_json(path, layout)?,
        };

        if !samples.windows(2).all(|w| w[0].time <= w[1].time) {
            tracing::warn!(
                "heart-rate samples from {} are out of time order; sorting",
                path.display()
            );
            samples.sort_by_key(|s| s.time);
        }

        tracing::info!("loaded {} heart-rate samples ({}) from {}", samples.len(), self, path.display());
        Ok(samples)
    }
}

fn load_tcx(path: &Path, extension: &str) -> Result<Vec<HeartRateSample>> {
    if path.is_file() {
        return read_tcx_file(path);
    }

    let mut files: Vec<PathBuf> = list_dir(path)?
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(extension))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(AlignError::MissingFile(path.join(format!("*{}", extension))));
    }

    let mut samples = Vec::new();
    for file in &files {
        samples.extend(read_tcx_file(file)?);
    }
    Ok(samples)
}

fn read_tcx_file(path: &Path) -> Result<Vec<HeartRateSample>> {
    let xml = fs::read_to_string(path).map_err(|e| not_found_as_missing(e, path))?;
    let samples = parse_tcx(&xml, path)?;
    tracing::debug!("{}: {} trackpoints", path.display(), samples.len());
    Ok(samples)
}

/// Remove the first default namespace declaration so element names are bare
pub fn strip_default_namespace(xml: &str) -> Cow<'_, str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(DEFAULT_NAMESPACE).expect("namespace pattern is valid"))
        .replacen(xml, 1, "")
}

/// Extract (time, bpm) from every Trackpoint under every Activity
pub fn parse_tcx(xml: &str, path: &Path) -> Result<Vec<HeartRateSample>> {
    let xml = strip_default_namespace(xml);
    let doc = roxmltree::Document::parse(&xml).map_err(|e| AlignError::parse(path, e.to_string()))?;

    let mut samples = Vec::new();
    let activities = doc.root().descendants().filter(|n| n.has_tag_name("Activity"));
    for activity in activities {
        let trackpoints = activity.descendants().filter(|n| n.has_tag_name("Trackpoint"));
        for trackpoint in trackpoints {
            let pos = trackpoint.range().start;

            let time_text = trackpoint
                .children()
                .find(|n| n.is_element())
                .and_then(|n| n.text())
                .ok_or_else(|| AlignError::parse(path, format!("trackpoint at byte {} has no time", pos)))?;
            let time = parse_tcx_time(time_text.trim())
                .ok_or_else(|| AlignError::parse(path, format!("bad trackpoint time '{}'", time_text)))?;

            let bpm_text = trackpoint
                .children()
                .find(|n| n.has_tag_name("HeartRateBpm"))
                .and_then(|hr| hr.children().find(|n| n.is_element()))
                .and_then(|v| v.text())
                .ok_or_else(|| {
                    AlignError::parse(path, format!("trackpoint at byte {} has no HeartRateBpm value", pos))
                })?;
            let bpm = bpm_text
                .trim()
                .parse::<u16>()
                .map_err(|e| AlignError::parse(path, format!("bad heart rate '{}': {}", bpm_text, e)))?;

            samples.push(HeartRateSample { time, bpm });
        }
    }
    Ok(samples)
}

fn parse_tcx_time(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, TCX_TIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn load_samsung_json(session_dir: &Path, layout: &LayoutConfig) -> Result<Vec<HeartRateSample>> {
    let dir = session_dir.join(&layout.samsung_subdir);
    let mut files = list_dir(&dir)?;
    files.sort();

    let file = files
        .into_iter()
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(&layout.samsung_pattern))
        })
        .ok_or_else(|| AlignError::MissingFile(dir.join(format!("*{}*", layout.samsung_pattern))))?;

    let text = fs::read_to_string(&file).map_err(|e| not_found_as_missing(e, &file))?;
    parse_samsung_json(&text, &file)
}

/// Keep `start_time`/`heart_rate` of each live-data record, skipping records
/// where either is absent or null
pub fn parse_samsung_json(text: &str, path: &Path) -> Result<Vec<HeartRateSample>> {
    let value: Value = serde_json::from_str(text).map_err(|e| AlignError::parse(path, e.to_string()))?;
    let records = value
        .as_array()
        .ok_or_else(|| AlignError::parse(path, "expected an array of records"))?;

    let mut samples = Vec::with_capacity(records.len());
    let mut skipped = 0usize;
    for (index, record) in records.iter().enumerate() {
        let field = |name: &str| record.get(name).filter(|v| !v.is_null());
        let (Some(start), Some(rate)) = (field("start_time"), field("heart_rate")) else {
            skipped += 1;
            continue;
        };

        let time = parse_json_time(start).ok_or_else(|| {
            AlignError::parse(path, format!("record {}: bad start_time {}", index, start))
        })?;
        let bpm = rate
            .as_f64()
            .map(f64::round)
            .filter(|v| (0.0..=u16::MAX as f64).contains(v))
            .ok_or_else(|| AlignError::parse(path, format!("record {}: bad heart_rate {}", index, rate)))?;

        samples.push(HeartRateSample { time, bpm: bpm as u16 });
    }

    if skipped > 0 {
        tracing::debug!("{}: skipped {} records without start_time or heart_rate", path.display(), skipped);
    }
    Ok(samples)
}

/// Epoch numbers take the smallest of s/ms/us/ns that yields a representable
/// date; strings are RFC 3339 or naive `YYYY-MM-DD[T ]HH:MM:SS[.f]` in UTC.
fn parse_json_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let raw = n.as_f64()?;
            [1.0, 1e3, 1e6, 1e9]
                .iter()
                .map(|per_second| raw / per_second)
                .find(|secs| secs.abs() < MAX_EPOCH_SECONDS)
                .and_then(datetime_from_unix_seconds)
        }
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                        .map(|naive| Utc.from_utc_datetime(&naive))
                })
        }
        _ => None,
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| not_found_as_missing(e, dir))?;
    let mut out = Vec::new();
    for entry in entries {
        out.push(entry?.path());
    }
    Ok(out)
}

fn not_found_as_missing(e: std::io::Error, path: &Path) -> AlignError {
    match e.kind() {
        ErrorKind::NotFound => AlignError::MissingFile(path.to_path_buf()),
        _ => AlignError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use tempfile::TempDir;

    const TCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TrainingCenterDatabase xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2" xmlns:ns3="http://www.garmin.com/xmlschemas/ActivityExtension/v2">
  <Activities>
    <Activity Sport="Running">
      <Id>2023-06-08T10:41:00.000000Z</Id>
      <Lap StartTime="2023-06-08T10:41:00.000000Z">
        <Track>
          <Trackpoint>
            <Time>2023-06-08T10:41:00.000000Z</Time>
            <HeartRateBpm><Value>92</Value></HeartRateBpm>
          </Trackpoint>
          <Trackpoint>
            <Time>2023-06-08T10:41:05.500000Z</Time>
            <DistanceMeters>7.1</DistanceMeters>
            <HeartRateBpm><Value>97</Value></HeartRateBpm>
          </Trackpoint>
        </Track>
      </Lap>
    </Activity>
  </Activities>
</TrainingCenterDatabase>"#;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_strips_only_first_default_namespace() {
        let xml = r#"<a xmlns="urn:one"><b xmlns="urn:two"/></a>"#;
        assert_eq!(strip_default_namespace(xml), r#"<a><b xmlns="urn:two"/></a>"#);
        assert_eq!(strip_default_namespace("<a/>"), "<a/>");
        assert_eq!(strip_default_namespace(r#"<c xmlns="urn:three"/>"#), "<c/>");
    }

    #[test]
    fn test_parses_nested_trackpoints() {
        let samples = parse_tcx(TCX, Path::new("walk.tcx")).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].time, utc("2023-06-08T10:41:00Z"));
        assert_eq!(samples[0].bpm, 92);
        assert_eq!(samples[1].time.nanosecond(), 500_000_000);
        assert_eq!(samples[1].bpm, 97);
    }

    #[test]
    fn test_trackpoint_without_heart_rate_is_parse_error() {
        let xml = r#"<TrainingCenterDatabase xmlns="urn:tcx"><Activities><Activity>
            <Trackpoint><Time>2023-06-08T10:41:00.0Z</Time></Trackpoint>
        </Activity></Activities></TrainingCenterDatabase>"#;
        let err = parse_tcx(xml, Path::new("bad.tcx")).unwrap_err();
        assert!(matches!(err, AlignError::Parse { .. }));
    }

    #[test]
    fn test_bad_trackpoint_time_is_parse_error() {
        let xml = r#"<TrainingCenterDatabase><Activity><Trackpoint>
            <Time>08/06/2023 10:41</Time><HeartRateBpm><Value>90</Value></HeartRateBpm>
        </Trackpoint></Activity></TrainingCenterDatabase>"#;
        assert!(parse_tcx(xml, Path::new("bad.tcx")).is_err());
    }

    #[test]
    fn test_directory_scan_concatenates_and_sorts() {
        let tmpdir = TempDir::new().unwrap();
        let late = TCX.replace("10:41", "11:41");
        // "a_" sorts first but holds the later recording
        fs::write(tmpdir.path().join("a_second.tcx"), late).unwrap();
        fs::write(tmpdir.path().join("b_first.tcx"), TCX).unwrap();
        fs::write(tmpdir.path().join("notes.txt"), "ignored").unwrap();

        let samples = HeartRateFormat::Tcx
            .load(tmpdir.path(), &LayoutConfig::default())
            .unwrap();
        assert_eq!(samples.len(), 4);
        assert!(samples.windows(2).all(|w| w[0].time <= w[1].time));
        assert_eq!(samples[0].time, utc("2023-06-08T10:41:00Z"));
        assert_eq!(samples[3].time.hour(), 11);
    }

    #[test]
    fn test_loads_single_tcx_file() {
        let tmpdir = TempDir::new().unwrap();
        let file = tmpdir.path().join("watch.tcx");
        fs::write(&file, TCX).unwrap();
        fs::write(tmpdir.path().join("other.tcx"), TCX.replace("10:41", "11:41")).unwrap();

        let samples = HeartRateFormat::Tcx.load(&file, &LayoutConfig::default()).unwrap();
        assert_eq!(samples.iter().map(|s| s.bpm).collect::<Vec<_>>(), vec![92, 97]);
        assert!(samples.iter().all(|s| s.time.hour() == 10));
    }

    #[test]
    fn test_directory_without_tcx_is_missing_file() {
        let tmpdir = TempDir::new().unwrap();
        let err = HeartRateFormat::Tcx
            .load(tmpdir.path(), &LayoutConfig::default())
            .unwrap_err();
        assert!(matches!(err, AlignError::MissingFile(_)));
    }

    #[test]
    fn test_json_drops_incomplete_records() {
        let json = r#"[
            {"start_time": 1686213660000, "heart_rate": 88},
            {"start_time": 1686213665000, "heart_rate": null},
            {"heart_rate": 90},
            {"start_time": 1686213670000, "heart_rate": 91.0, "speed": 1.2}
        ]"#;
        let samples = parse_samsung_json(json, Path::new("live.json")).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].time.timestamp(), 1_686_213_660);
        assert_eq!(samples[0].bpm, 88);
        assert_eq!(samples[1].bpm, 91);
    }

    #[test]
    fn test_json_time_units_and_strings() {
        let secs = parse_json_time(&Value::from(1_686_213_660)).unwrap();
        let millis = parse_json_time(&Value::from(1_686_213_660_000u64)).unwrap();
        let iso = parse_json_time(&Value::from("2023-06-08 08:41:00.000")).unwrap();
        assert_eq!(secs, millis);
        assert_eq!(secs, iso);
    }

    #[test]
    fn test_json_loader_finds_vendor_file() {
        let tmpdir = TempDir::new().unwrap();
        let layout = LayoutConfig::default();
        let dir = tmpdir.path().join(&layout.samsung_subdir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("unrelated.json"), "{}").unwrap();
        fs::write(
            dir.join("abc123.com.samsung.health.exercise.live_data.json"),
            r#"[{"start_time": 1686213670000, "heart_rate": 70},
                {"start_time": 1686213660000, "heart_rate": 65}]"#,
        )
        .unwrap();

        let samples = HeartRateFormat::Json.load(tmpdir.path(), &layout).unwrap();
        assert_eq!(samples.iter().map(|s| s.bpm).collect::<Vec<_>>(), vec![65, 70]);
    }

    #[test]
    fn test_json_loader_without_vendor_file() {
        let tmpdir = TempDir::new().unwrap();
        let layout = LayoutConfig::default();
        fs::create_dir_all(tmpdir.path().join(&layout.samsung_subdir)).unwrap();

        let err = HeartRateFormat::Json.load(tmpdir.path(), &layout).unwrap_err();
        assert!(matches!(err, AlignError::MissingFile(_)));
    }

    #[test]
    fn test_format_tag_parsing() {
        assert_eq!("TCX".parse::<HeartRateFormat>().unwrap(), HeartRateFormat::Tcx);
        assert_eq!("json".parse::<HeartRateFormat>().unwrap(), HeartRateFormat::Json);
        assert!("fit".parse::<HeartRateFormat>().is_err());
    }
}
