use chrono::{TimeZone, Utc};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::config::LayoutConfig;
use crate::phyphox::{ACCELEROMETER_FILE, GYROSCOPE_FILE, LOCATION_FILE, TIME_FILE};

pub const START_UNIX_S: i64 = 1_686_213_660;

/// Write accelerometer, gyroscope, optional location and `time.csv` files.
/// Sensor values are derived from the sample index so rows are distinguishable.
pub fn write_motion(
    dir: &Path,
    layout: &LayoutConfig,
    acc_times: &[f64],
    gyro_times: &[f64],
    location_times: Option<&[f64]>,
) -> std::io::Result<()> {
    let motion_dir = dir.join(&layout.motion_subdir);
    let meta_dir = motion_dir.join(&layout.meta_subdir);
    fs::create_dir_all(&meta_dir)?;

    let mut acc = String::from("\"Time (s)\",\"Acceleration x (m/s^2)\",\"Acceleration y (m/s^2)\",\"Acceleration z (m/s^2)\"\n");
    for (i, t) in acc_times.iter().enumerate() {
        let _ = writeln!(acc, "{},{},{},{}", t, i as f64 * 0.1, 9.81, -(i as f64) * 0.1);
    }
    fs::write(motion_dir.join(ACCELEROMETER_FILE), acc)?;

    let mut gyro = String::from("\"Time (s)\",\"Gyroscope x (rad/s)\",\"Gyroscope y (rad/s)\",\"Gyroscope z (rad/s)\"\n");
    for (i, t) in gyro_times.iter().enumerate() {
        let _ = writeln!(gyro, "{},{},{},{}", t, i as f64 * 0.01, 0.0, 0.02);
    }
    fs::write(motion_dir.join(GYROSCOPE_FILE), gyro)?;

    if let Some(times) = location_times {
        let mut loc = String::from(
            "\"Time (s)\",\"Latitude (°)\",\"Longitude (°)\",\"Height (m)\",\"Velocity (m/s)\",\
             \"Direction (°)\",\"Horizontal Accuracy (m)\",\"Vertical Accuracy (m)\"\n",
        );
        for (i, t) in times.iter().enumerate() {
            let _ = writeln!(loc, "{},{},{},{},{},{},{},{}", t, 52.37 + i as f64 * 1e-4, 4.89, 3.0, 1.4, 180.0, 4.0, 6.0);
        }
        fs::write(motion_dir.join(LOCATION_FILE), loc)?;
    }

    fs::write(
        meta_dir.join(TIME_FILE),
        format!(
            "\"event\",\"experiment time\",\"system time\",\"system time text\"\n\
             \"START\",0.000000000,{}.000,\"2023-06-08 08:41:00.000 UTC+00:00\"\n",
            START_UNIX_S
        ),
    )
}

/// Single-activity TCX file with trackpoints at `START_UNIX_S + secs`
pub fn write_tcx(path: &Path, points: &[(i64, u16)]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <TrainingCenterDatabase xmlns=\"http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2\">\n\
         <Activities><Activity Sport=\"Other\"><Lap><Track>\n",
    );
    for (secs, bpm) in points {
        let time = Utc
            .timestamp_opt(START_UNIX_S + secs, 0)
            .single()
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
            .unwrap_or_default();
        let _ = writeln!(
            xml,
            "<Trackpoint><Time>{}</Time><HeartRateBpm><Value>{}</Value></HeartRateBpm></Trackpoint>",
            time, bpm
        );
    }
    xml.push_str("</Track></Lap></Activity></Activities></TrainingCenterDatabase>\n");
    fs::write(path, xml)
}

/// Samsung Health live-data export with epoch-millisecond start times
pub fn write_samsung(dir: &Path, layout: &LayoutConfig, points: &[(i64, u16)]) -> std::io::Result<()> {
    let health_dir = dir.join(&layout.samsung_subdir);
    fs::create_dir_all(&health_dir)?;
    let records: Vec<serde_json::Value> = points
        .iter()
        .map(|(secs, bpm)| {
            serde_json::json!({
                "start_time": (START_UNIX_S + secs) * 1000,
                "heart_rate": bpm,
            })
        })
        .collect();
    fs::write(
        health_dir.join(format!("0a1b2c.{}", layout.samsung_pattern)),
        serde_json::Value::Array(records).to_string(),
    )
}
