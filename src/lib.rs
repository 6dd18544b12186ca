//! Time alignment of wearable sensor recordings.
//!
//! A session is a directory of phone motion CSVs (accelerometer, gyroscope,
//! GPS) plus a heart-rate trace from a watch (TCX) or Samsung Health (JSON).
//! Each session is put on one reconstructed timeline, stamped with the heart
//! rate in effect at every row and labeled with its activity; sessions are
//! then concatenated into a single time-sorted table.

pub mod clock;
pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod exporter;
pub mod heart_rate;
pub mod interval;
pub mod motion;
pub mod phyphox;
pub mod session;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use config::{AppConfig, LayoutConfig, SessionConfig, SessionErrorPolicy};
pub use dataset::{aggregate, Dataset};
pub use error::{AlignError, Result};
pub use exporter::{export_dataset, ExportFormat, ExportManifest};
pub use heart_rate::HeartRateFormat;
pub use session::{combine, SessionTable};
pub use types::{HeartRateSample, Location, MergedRow, MotionSample};
