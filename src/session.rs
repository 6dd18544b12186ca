use crate::clock::{self, SessionClock};
use crate::config::{LayoutConfig, SessionConfig};
use crate::diagnostics::SessionReport;
use crate::error::{AlignError, Result};
use crate::interval;
use crate::motion;
use crate::phyphox::{self, MotionStreams};
use crate::types::{MergedRow, MotionSample};

/// Aligned, labeled rows of one recording
#[derive(Debug, Clone)]
pub struct SessionTable {
    pub rows: Vec<MergedRow>,
    pub report: SessionReport,
}

/// Load, align and label one session directory.
///
/// Rows outside the interpolation bounds or the heart-rate coverage are
/// dropped; a session left with no rows at all is an error.
pub fn combine(session: &SessionConfig, layout: &LayoutConfig) -> Result<SessionTable> {
    let motion_dir = session.motion_dir(layout);
    let streams = MotionStreams::load(&motion_dir, session.location)?;

    let acc_times: Vec<f64> = streams.accelerometer.iter().map(|r| r.time_s).collect();
    let gyro_times: Vec<f64> = streams.gyroscope.iter().map(|r| r.time_s).collect();
    let timeline = clock::reconstruct(&acc_times, &gyro_times)?;
    let merged = motion::merge(&streams, &timeline);

    let session_clock = SessionClock::new(phyphox::read_start_time(&session.time_file(layout))?);
    let samples = merged
        .samples
        .iter()
        .map(|s| -> Result<MotionSample> {
            Ok(MotionSample {
                time: session_clock.absolute(s.offset_s)?,
                acceleration: s.acceleration,
                gyroscope: s.gyroscope,
                location: s.location,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let readings = session
        .heart_rate
        .load(&session.heart_rate_path(), layout)?;
    let times: Vec<_> = samples.iter().map(|s| s.time).collect();
    let assigned = interval::assign_heart_rate(&times, &readings);

    let aligned = samples.len();
    let rows: Vec<MergedRow> = samples
        .into_iter()
        .zip(assigned)
        .filter_map(|(sample, heart_rate)| {
            heart_rate.map(|heart_rate| MergedRow {
                sample,
                heart_rate,
                label: session.label.clone(),
            })
        })
        .collect();

    if rows.is_empty() {
        return Err(AlignError::data(format!(
            "session {} has no rows covered by every sensor and the heart-rate trace",
            session.dir.display()
        )));
    }

    let report = SessionReport {
        dir: session.dir.clone(),
        label: session.label.clone(),
        heart_rate_format: session.heart_rate,
        accelerometer_samples: streams.accelerometer.len(),
        gyroscope_samples: streams.gyroscope.len(),
        location_samples: streams.location.as_ref().map(Vec::len),
        truncated_samples: timeline.truncated,
        sample_period_s: timeline.period_s,
        heart_rate_samples: readings.len(),
        merged_rows: merged.merged_rows,
        dropped_by_interpolation: merged.dropped_rows,
        dropped_by_heart_rate: aligned - rows.len(),
        output_rows: rows.len(),
    };
    report.log();

    Ok(SessionTable { rows, report })
}
