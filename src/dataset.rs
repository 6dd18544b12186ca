use crate::config::{LayoutConfig, SessionConfig, SessionErrorPolicy};
use crate::diagnostics::{DatasetReport, SkippedSession};
use crate::error::{AlignError, Result};
use crate::session;
use crate::types::MergedRow;

/// All labeled rows of a run, sorted by time
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub rows: Vec<MergedRow>,
    pub report: DatasetReport,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Combine `sessions` in order and sort the concatenation by time.
///
/// The sort is stable, so rows sharing a timestamp keep session order.
pub fn aggregate(
    sessions: &[SessionConfig],
    layout: &LayoutConfig,
    policy: SessionErrorPolicy,
) -> Result<Dataset> {
    if sessions.is_empty() {
        return Err(AlignError::data("no sessions to merge"));
    }

    let mut dataset = Dataset::default();
    for entry in sessions {
        tracing::info!("processing session {} ({}, {})", entry.dir.display(), entry.label, entry.heart_rate);
        match session::combine(entry, layout) {
            Ok(table) => {
                dataset.rows.extend(table.rows);
                dataset.report.sessions.push(table.report);
            }
            Err(e) if policy == SessionErrorPolicy::Skip => {
                tracing::warn!("session {} failed: {}", entry.dir.display(), e);
                dataset.report.skipped.push(SkippedSession {
                    dir: entry.dir.clone(),
                    label: entry.label.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    if dataset.rows.is_empty() {
        return Err(AlignError::data("every session failed; nothing to export"));
    }

    dataset.rows.sort_by_key(MergedRow::time);
    dataset.report.log();
    Ok(dataset)
}
