use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::exporter::ExportFormat;
use crate::heart_rate::HeartRateFormat;

/// Where files live inside a session directory
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    /// Subdirectory holding the phone sensor CSVs; empty for the session root
    #[serde(default = "default_motion_subdir")]
    pub motion_subdir: PathBuf,
    /// Subdirectory (relative to the motion files) holding `time.csv`
    #[serde(default = "default_meta_subdir")]
    pub meta_subdir: PathBuf,
    #[serde(default = "default_samsung_subdir")]
    pub samsung_subdir: PathBuf,
    #[serde(default = "default_samsung_pattern")]
    pub samsung_pattern: String,
    #[serde(default = "default_tcx_extension")]
    pub tcx_extension: String,
}

fn default_motion_subdir() -> PathBuf {
    PathBuf::from("Phyphox")
}

fn default_meta_subdir() -> PathBuf {
    PathBuf::from("meta")
}

fn default_samsung_subdir() -> PathBuf {
    PathBuf::from("SamsungHealth")
}

fn default_samsung_pattern() -> String {
    "com.samsung.health.exercise.live_data.json".to_string()
}

fn default_tcx_extension() -> String {
    "tcx".to_string()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            motion_subdir: default_motion_subdir(),
            meta_subdir: default_meta_subdir(),
            samsung_subdir: default_samsung_subdir(),
            samsung_pattern: default_samsung_pattern(),
            tcx_extension: default_tcx_extension(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub output: PathBuf,
    #[serde(default)]
    pub format: ExportFormat,
    /// Write `<output stem>.manifest.json` next to the table
    #[serde(default = "default_manifest")]
    pub manifest: bool,
}

fn default_manifest() -> bool {
    true
}

/// What the aggregator does when one session fails to load or align
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionErrorPolicy {
    /// Fail the whole run
    #[default]
    Abort,
    /// Log the failure and continue with the remaining sessions
    Skip,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub on_session_error: SessionErrorPolicy,
}

/// One recording: directory, activity label and heart-rate source
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionConfig {
    pub dir: PathBuf,
    pub label: String,
    pub heart_rate: HeartRateFormat,
    /// TCX file or directory to read instead of the session directory
    #[serde(default)]
    pub heart_rate_path: Option<PathBuf>,
    /// Devices without GPS set this to false
    #[serde(default = "default_location")]
    pub location: bool,
}

fn default_location() -> bool {
    true
}

impl SessionConfig {
    pub fn new(dir: impl Into<PathBuf>, label: impl Into<String>, heart_rate: HeartRateFormat) -> Self {
        SessionConfig {
            dir: dir.into(),
            label: label.into(),
            heart_rate,
            heart_rate_path: None,
            location: true,
        }
    }

    pub fn motion_dir(&self, layout: &LayoutConfig) -> PathBuf {
        self.dir.join(&layout.motion_subdir)
    }

    pub fn time_file(&self, layout: &LayoutConfig) -> PathBuf {
        self.motion_dir(layout)
            .join(&layout.meta_subdir)
            .join(crate::phyphox::TIME_FILE)
    }

    pub fn heart_rate_path(&self) -> PathBuf {
        self.heart_rate_path.clone().unwrap_or_else(|| self.dir.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
    pub export: ExportConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,
}

impl AppConfig {
    pub fn load_default() -> anyhow::Result<Self> {
        let default = include_str!("../config/default.toml");
        let cfg: AppConfig = toml::from_str(default)?;
        Ok(cfg)
    }

    pub fn load_from(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let p = path.into();
        let s = fs::read_to_string(&p)?;
        let cfg: AppConfig = toml::from_str(&s)?;
        Ok(cfg)
    }
}
