use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::dataset::Dataset;
use crate::heart_rate::HeartRateFormat;
use crate::types::MergedRow;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Metadata about an exported dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub export_id: String,
    pub format: ExportFormat,
    pub timestamp_utc: i64,
    pub num_records: u64,
    pub table: PathBuf,
    pub table_sha256: String,
    pub sessions: Vec<SessionExportInfo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    /// One JSON object per line
    #[serde(rename = "jsonl")]
    JsonLines,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExportInfo {
    pub dir: PathBuf,
    pub label: String,
    pub heart_rate_format: HeartRateFormat,
    pub sample_count: u64,
    pub sample_rate_hz: f64,
}

/// Flat output row, columns in export order
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    time: String,
    acceleration_x: f64,
    acceleration_y: f64,
    acceleration_z: f64,
    gyroscope_x: f64,
    gyroscope_y: f64,
    gyroscope_z: f64,
    latitude: Option<f64>,
    longitude: Option<f64>,
    height: Option<f64>,
    velocity: Option<f64>,
    direction: Option<f64>,
    h_accuracy: Option<f64>,
    v_accuracy: Option<f64>,
    heart_rate: u16,
    label: &'a str,
}

impl<'a> From<&'a MergedRow> for ExportRow<'a> {
    fn from(row: &'a MergedRow) -> Self {
        let s = &row.sample;
        let loc = s.location.as_ref();
        ExportRow {
            time: s.time.format(TIME_FORMAT).to_string(),
            acceleration_x: s.acceleration[0],
            acceleration_y: s.acceleration[1],
            acceleration_z: s.acceleration[2],
            gyroscope_x: s.gyroscope[0],
            gyroscope_y: s.gyroscope[1],
            gyroscope_z: s.gyroscope[2],
            latitude: loc.map(|l| l.latitude),
            longitude: loc.map(|l| l.longitude),
            height: loc.map(|l| l.height),
            velocity: loc.map(|l| l.velocity),
            direction: loc.map(|l| l.direction),
            h_accuracy: loc.map(|l| l.h_accuracy),
            v_accuracy: loc.map(|l| l.v_accuracy),
            heart_rate: row.heart_rate,
            label: &row.label,
        }
    }
}

/// Write the dataset table to `output`, plus a manifest next to it when asked
pub fn export_dataset(
    dataset: &Dataset,
    output: &Path,
    format: ExportFormat,
    write_manifest: bool,
) -> Result<ExportManifest> {
    tracing::info!("exporting {} rows as {:?} to {}", dataset.len(), format, output.display());

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }

    match format {
        ExportFormat::Csv => write_csv(dataset, output)?,
        ExportFormat::JsonLines => write_json_lines(dataset, output)?,
    }

    let manifest = ExportManifest {
        export_id: format!("{}-{}", export_stem(output), format_tag(format)),
        format,
        timestamp_utc: chrono::Utc::now().timestamp_millis(),
        num_records: dataset.len() as u64,
        table: output.to_path_buf(),
        table_sha256: file_sha256(output)?,
        sessions: dataset
            .report
            .sessions
            .iter()
            .map(|s| SessionExportInfo {
                dir: s.dir.clone(),
                label: s.label.clone(),
                heart_rate_format: s.heart_rate_format,
                sample_count: s.output_rows as u64,
                sample_rate_hz: s.sample_rate_hz(),
            })
            .collect(),
    };

    if write_manifest {
        let manifest_path = manifest_path(output);
        let manifest_json = serde_json::to_string_pretty(&manifest)?;
        fs::write(&manifest_path, manifest_json)
            .with_context(|| format!("writing {}", manifest_path.display()))?;
        tracing::info!("manifest written: {}", manifest_path.display());
    }

    tracing::info!("export complete: {}", output.display());
    Ok(manifest)
}

fn write_csv(dataset: &Dataset, output: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("creating {}", output.display()))?;
    for row in &dataset.rows {
        writer.serialize(ExportRow::from(row))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json_lines(dataset: &Dataset, output: &Path) -> Result<()> {
    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    for row in &dataset.rows {
        serde_json::to_writer(&mut writer, &ExportRow::from(row))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn format_tag(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::Csv => "csv",
        ExportFormat::JsonLines => "jsonl",
    }
}

fn export_stem(output: &Path) -> String {
    output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string())
}

/// `data-set/data.csv` -> `data-set/data.manifest.json`
pub fn manifest_path(output: &Path) -> PathBuf {
    output.with_file_name(format!("{}.manifest.json", export_stem(output)))
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(format!("{:x}", hasher.finalize()))
}
