use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GPS fix interpolated onto the motion timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
    pub velocity: f64,
    pub direction: f64,
    pub h_accuracy: f64,
    pub v_accuracy: f64,
}

impl Location {
    /// Builds a fix from values in export column order
    pub fn from_values(v: [f64; 7]) -> Self {
        Location {
            latitude: v[0],
            longitude: v[1],
            height: v[2],
            velocity: v[3],
            direction: v[4],
            h_accuracy: v[5],
            v_accuracy: v[6],
        }
    }
}

/// One synchronized accelerometer/gyroscope (and optionally GPS) reading
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSample {
    pub time: DateTime<Utc>,
    /// m/s^2, [x, y, z]
    pub acceleration: [f64; 3],
    /// rad/s, [x, y, z]
    pub gyroscope: [f64; 3],
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub time: DateTime<Utc>,
    pub bpm: u16,
}

/// Motion sample stamped with the heart rate in effect and the session label
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub sample: MotionSample,
    pub heart_rate: u16,
    pub label: String,
}

impl MergedRow {
    pub fn time(&self) -> DateTime<Utc> {
        self.sample.time
    }
}
