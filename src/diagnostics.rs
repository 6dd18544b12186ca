use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::heart_rate::HeartRateFormat;

/// How one session's rows were produced and where they were lost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub dir: PathBuf,
    pub label: String,
    pub heart_rate_format: HeartRateFormat,
    pub accelerometer_samples: usize,
    pub gyroscope_samples: usize,
    pub location_samples: Option<usize>,
    /// Samples cut from the longer motion stream
    pub truncated_samples: usize,
    pub sample_period_s: f64,
    pub heart_rate_samples: usize,
    /// Rows on the merged timeline before dropping incomplete ones
    pub merged_rows: usize,
    pub dropped_by_interpolation: usize,
    pub dropped_by_heart_rate: usize,
    pub output_rows: usize,
}

impl SessionReport {
    pub fn sample_rate_hz(&self) -> f64 {
        1.0 / self.sample_period_s
    }

    pub fn log(&self) {
        tracing::info!(
            "session {} [{}]: {} rows ({:.1} Hz, {} merged, -{} interpolation, -{} heart-rate coverage, {} truncated)",
            self.dir.display(),
            self.label,
            self.output_rows,
            self.sample_rate_hz(),
            self.merged_rows,
            self.dropped_by_interpolation,
            self.dropped_by_heart_rate,
            self.truncated_samples
        );
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSession {
    pub dir: PathBuf,
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    pub sessions: Vec<SessionReport>,
    pub skipped: Vec<SkippedSession>,
}

impl DatasetReport {
    pub fn total_rows(&self) -> usize {
        self.sessions.iter().map(|s| s.output_rows).sum()
    }

    pub fn log(&self) {
        tracing::info!(
            "dataset: {} rows from {} sessions ({} skipped)",
            self.total_rows(),
            self.sessions.len(),
            self.skipped.len()
        );
        for skipped in &self.skipped {
            tracing::warn!("skipped session {}: {}", skipped.dir.display(), skipped.reason);
        }
    }
}
