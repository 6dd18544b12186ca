use crate::clock::Timeline;
use crate::phyphox::MotionStreams;
use crate::types::Location;

const ACCEL: usize = 0;
const GYRO: usize = 3;
const LOCATION: usize = 6;
const CHANNELS: usize = 13;

/// Merged motion row on the relative session timeline
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSample {
    pub offset_s: f64,
    pub acceleration: [f64; 3],
    pub gyroscope: [f64; 3],
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub samples: Vec<AlignedSample>,
    /// Rows on the timeline before incomplete rows were dropped
    pub merged_rows: usize,
    pub dropped_rows: usize,
}

#[derive(Debug, Clone, Copy)]
struct TimedRow {
    offset_s: f64,
    values: [Option<f64>; CHANNELS],
}

impl TimedRow {
    fn new(offset_s: f64) -> Self {
        TimedRow { offset_s, values: [None; CHANNELS] }
    }

    fn with(mut self, start: usize, values: &[Option<f64>]) -> Self {
        for (slot, v) in self.values[start..start + values.len()].iter_mut().zip(values) {
            // NaN counts as a missing reading
            *slot = v.filter(|x| !x.is_nan());
        }
        self
    }

    fn absorb(&mut self, other: &TimedRow) {
        for (slot, v) in self.values.iter_mut().zip(other.values.iter()) {
            if slot.is_none() {
                *slot = *v;
            }
        }
    }
}

/// Merge the raw streams onto `timeline`.
///
/// Only the first `timeline.len` accelerometer and gyroscope rows are used;
/// their native time columns are replaced by the timeline offsets.
pub fn merge(streams: &MotionStreams, timeline: &Timeline) -> MergeOutcome {
    let acc_rows: Vec<TimedRow> = streams
        .accelerometer
        .iter()
        .take(timeline.len)
        .zip(timeline.offsets())
        .map(|(r, t)| TimedRow::new(t).with(ACCEL, &r.values()))
        .collect();
    let gyro_rows: Vec<TimedRow> = streams
        .gyroscope
        .iter()
        .take(timeline.len)
        .zip(timeline.offsets())
        .map(|(r, t)| TimedRow::new(t).with(GYRO, &r.values()))
        .collect();

    let mut rows = outer_join(acc_rows, gyro_rows);

    let with_location = streams.location.is_some();
    if let Some(location) = &streams.location {
        rows.extend(
            location
                .iter()
                .map(|r| TimedRow::new(r.time_s).with(LOCATION, &r.values())),
        );
        // stable: motion rows stay ahead of GPS rows sharing a timestamp
        rows.sort_by(|a, b| a.offset_s.total_cmp(&b.offset_s));
    }

    for channel in 0..CHANNELS {
        interpolate_channel(&mut rows, channel);
    }

    let required = if with_location { CHANNELS } else { LOCATION };
    let merged_rows = rows.len();
    let samples: Vec<AlignedSample> = rows
        .iter()
        .filter_map(|row| complete_sample(row, required))
        .collect();
    let dropped_rows = merged_rows - samples.len();

    tracing::debug!(
        "merged {} rows on the motion timeline, dropped {} without full coverage",
        merged_rows,
        dropped_rows
    );

    MergeOutcome { samples, merged_rows, dropped_rows }
}

/// Full outer join of two offset-sorted row sets on exact offset equality
fn outer_join(left: Vec<TimedRow>, right: Vec<TimedRow>) -> Vec<TimedRow> {
    let mut out = Vec::with_capacity(left.len().max(right.len()));
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        match (left.peek(), right.peek()) {
            (Some(l), Some(r)) if l.offset_s == r.offset_s => {
                let mut row = *l;
                row.absorb(r);
                out.push(row);
                left.next();
                right.next();
            }
            (Some(l), Some(r)) if l.offset_s < r.offset_s => {
                out.push(*l);
                left.next();
            }
            (Some(_), Some(r)) => {
                out.push(*r);
                right.next();
            }
            (Some(l), None) => {
                out.push(*l);
                left.next();
            }
            (None, Some(r)) => {
                out.push(*r);
                right.next();
            }
            (None, None) => break,
        }
    }
    out
}

/// Fill interior holes of one channel by time-weighted linear interpolation.
/// Leading and trailing holes are left empty.
fn interpolate_channel(rows: &mut [TimedRow], channel: usize) {
    let mut previous: Option<usize> = None;
    for i in 0..rows.len() {
        if rows[i].values[channel].is_none() {
            continue;
        }
        if let Some(p) = previous {
            if i > p + 1 {
                fill_gap(rows, channel, p, i);
            }
        }
        previous = Some(i);
    }
}

fn fill_gap(rows: &mut [TimedRow], channel: usize, left: usize, right: usize) {
    let (t0, t1) = (rows[left].offset_s, rows[right].offset_s);
    let (v0, v1) = match (rows[left].values[channel], rows[right].values[channel]) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };
    let span = t1 - t0;
    for row in &mut rows[left + 1..right] {
        let weight = if span > 0.0 { (row.offset_s - t0) / span } else { 0.0 };
        row.values[channel] = Some(v0 + (v1 - v0) * weight);
    }
}

fn complete_sample(row: &TimedRow, required: usize) -> Option<AlignedSample> {
    let v = &row.values;
    if v[..required].iter().any(Option::is_none) {
        return None;
    }
    let at = |i: usize| v[i].unwrap_or_default();
    let location = if required > LOCATION {
        Some(Location::from_values(std::array::from_fn(|i| at(LOCATION + i))))
    } else {
        None
    };
    Some(AlignedSample {
        offset_s: row.offset_s,
        acceleration: [at(ACCEL), at(ACCEL + 1), at(ACCEL + 2)],
        gyroscope: [at(GYRO), at(GYRO + 1), at(GYRO + 2)],
        location,
    })
}
