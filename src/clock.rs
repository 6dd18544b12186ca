use chrono::{DateTime, TimeZone, Utc};

use crate::error::{AlignError, Result};

/// Evenly spaced relative timeline shared by the accelerometer and gyroscope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    pub period_s: f64,
    pub len: usize,
    /// Samples discarded from the longer stream
    pub truncated: usize,
}

impl Timeline {
    pub fn offset(&self, index: usize) -> f64 {
        self.period_s * index as f64
    }

    pub fn offsets(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len).map(move |i| self.offset(i))
    }
}

/// Mean of successive differences, `None` with fewer than two samples
pub fn mean_interval(times: &[f64]) -> Option<f64> {
    if times.len() < 2 {
        return None;
    }
    let sum: f64 = times.windows(2).map(|w| w[1] - w[0]).sum();
    Some(sum / (times.len() - 1) as f64)
}

/// Estimate the shared sampling period of two native time columns.
///
/// Both columns are cut to the shorter length first; the excess tail of the
/// longer one is dropped without resampling.
pub fn reconstruct(accelerometer: &[f64], gyroscope: &[f64]) -> Result<Timeline> {
    let len = accelerometer.len().min(gyroscope.len());
    let truncated = accelerometer.len().max(gyroscope.len()) - len;
    if truncated > 0 {
        tracing::debug!(
            "truncating motion streams to {} samples (accelerometer={}, gyroscope={})",
            len,
            accelerometer.len(),
            gyroscope.len()
        );
    }

    let acc_mean = mean_interval(&accelerometer[..len]).ok_or_else(|| {
        AlignError::data(format!("accelerometer stream has {} usable samples, need 2", len))
    })?;
    let gyro_mean = mean_interval(&gyroscope[..len]).ok_or_else(|| {
        AlignError::data(format!("gyroscope stream has {} usable samples, need 2", len))
    })?;

    let period_s = (acc_mean + gyro_mean) / 2.0;
    if !period_s.is_finite() || period_s <= 0.0 {
        return Err(AlignError::data(format!(
            "sampling period {} is not a positive duration",
            period_s
        )));
    }

    Ok(Timeline { period_s, len, truncated })
}

/// Anchors relative offsets to the wall-clock START event of a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionClock {
    pub start_unix_s: f64,
}

impl SessionClock {
    pub fn new(start_unix_s: f64) -> Self {
        SessionClock { start_unix_s }
    }

    pub fn absolute(&self, offset_s: f64) -> Result<DateTime<Utc>> {
        let secs = self.start_unix_s + offset_s;
        datetime_from_unix_seconds(secs)
            .ok_or_else(|| AlignError::data(format!("timestamp {} s is out of range", secs)))
    }
}

/// Unix seconds to a UTC timestamp at microsecond resolution
pub fn datetime_from_unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let micros = (secs * 1e6).round();
    if micros.abs() >= i64::MAX as f64 {
        return None;
    }
    let micros = micros as i64;
    let whole = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    Utc.timestamp_opt(whole, nanos).single()
}
