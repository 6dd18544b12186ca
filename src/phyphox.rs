use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{AlignError, Result};

pub const ACCELEROMETER_FILE: &str = "Accelerometer.csv";
pub const GYROSCOPE_FILE: &str = "Gyroscope.csv";
pub const LOCATION_FILE: &str = "Location.csv";
pub const TIME_FILE: &str = "time.csv";

const START_EVENT: &str = "START";

#[derive(Debug, Clone, Deserialize)]
pub struct AccelerometerRecord {
    #[serde(rename = "Time (s)")]
    pub time_s: f64,
    #[serde(rename = "Acceleration x (m/s^2)")]
    pub x: Option<f64>,
    #[serde(rename = "Acceleration y (m/s^2)")]
    pub y: Option<f64>,
    #[serde(rename = "Acceleration z (m/s^2)")]
    pub z: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GyroscopeRecord {
    #[serde(rename = "Time (s)")]
    pub time_s: f64,
    #[serde(rename = "Gyroscope x (rad/s)")]
    pub x: Option<f64>,
    #[serde(rename = "Gyroscope y (rad/s)")]
    pub y: Option<f64>,
    #[serde(rename = "Gyroscope z (rad/s)")]
    pub z: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationRecord {
    #[serde(rename = "Time (s)")]
    pub time_s: f64,
    #[serde(rename = "Latitude (°)")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude (°)")]
    pub longitude: Option<f64>,
    #[serde(rename = "Height (m)")]
    pub height: Option<f64>,
    #[serde(rename = "Velocity (m/s)")]
    pub velocity: Option<f64>,
    #[serde(rename = "Direction (°)")]
    pub direction: Option<f64>,
    #[serde(rename = "Horizontal Accuracy (m)")]
    pub h_accuracy: Option<f64>,
    #[serde(rename = "Vertical Accuracy (m)")]
    pub v_accuracy: Option<f64>,
}

impl AccelerometerRecord {
    pub fn values(&self) -> [Option<f64>; 3] {
        [self.x, self.y, self.z]
    }
}

impl GyroscopeRecord {
    pub fn values(&self) -> [Option<f64>; 3] {
        [self.x, self.y, self.z]
    }
}

impl LocationRecord {
    pub fn values(&self) -> [Option<f64>; 7] {
        [
            self.latitude,
            self.longitude,
            self.height,
            self.velocity,
            self.direction,
            self.h_accuracy,
            self.v_accuracy,
        ]
    }
}

#[derive(Debug, Deserialize)]
struct TimeEvent {
    event: String,
    #[serde(rename = "system time")]
    system_time: f64,
}

/// Raw sensor streams of one recording, still on their native time columns
#[derive(Debug, Clone, Default)]
pub struct MotionStreams {
    pub accelerometer: Vec<AccelerometerRecord>,
    pub gyroscope: Vec<GyroscopeRecord>,
    pub location: Option<Vec<LocationRecord>>,
}

impl MotionStreams {
    /// Load the sensor CSVs from `dir`; `Location.csv` is skipped unless `with_location`
    pub fn load(dir: &Path, with_location: bool) -> Result<Self> {
        let accelerometer = read_records(&dir.join(ACCELEROMETER_FILE))?;
        let gyroscope = read_records(&dir.join(GYROSCOPE_FILE))?;
        let location = if with_location {
            Some(read_records(&dir.join(LOCATION_FILE))?)
        } else {
            None
        };

        tracing::info!(
            "loaded motion streams from {}: accelerometer={}, gyroscope={}, location={}",
            dir.display(),
            accelerometer.len(),
            gyroscope.len(),
            location.as_ref().map_or(0, Vec::len)
        );

        Ok(MotionStreams { accelerometer, gyroscope, location })
    }
}

/// Deserialize every row of a headed CSV file
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AlignError::MissingFile(path.to_path_buf()),
        _ => AlignError::Io(e),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut records = Vec::new();
    for (line_number, result) in reader.deserialize().enumerate() {
        let record: T = result.map_err(|e| {
            // +1 for the header, +1 for 1-based lines
            AlignError::parse(path, format!("line {}: {}", line_number + 2, e))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Unix time (seconds) of the first START event in a `time.csv` event log
pub fn read_start_time(path: &Path) -> Result<f64> {
    let events: Vec<TimeEvent> = read_records(path)?;
    let start = events
        .iter()
        .find(|e| e.event == START_EVENT)
        .ok_or_else(|| AlignError::parse(path, "no START event"))?;
    tracing::debug!("session start at {} (unix s) from {}", start.system_time, path.display());
    Ok(start.system_time)
}
