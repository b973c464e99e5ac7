//! Selection output
//!
//! The report a selection run produces and the writer boundary that turns
//! it into a file. The engine is agnostic to the container; the bundled
//! writer emits the camelCase JSON document the node interchange uses, as
//! `{recordCount, records, unresolved}`. Alternative containers implement
//! [`ReportWriter`] against the same report.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{CarveError, CarveResult, IoResultExt};
use crate::model::NodeRecord;

/// A node the run could not resolve, kept out of the output but surfaced
/// for the caller to warn about.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedNode {
    /// Position in the input stream.
    pub index: usize,
    pub node: NodeRecord,
    pub reason: String,
}

/// Everything one selection run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionReport {
    /// Intersecting records, in input order.
    pub selected: Vec<NodeRecord>,
    /// Records whose bounds could not be resolved, in input order.
    pub unresolved: Vec<UnresolvedNode>,
    /// Nodes that reached the bounds test.
    pub examined: usize,
    /// Nodes rejected by the pre-filter.
    pub filtered_out: usize,
    /// Whether the run was cut short by its cancel token.
    pub cancelled: bool,
}

impl SelectionReport {
    pub fn record_count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// How a writer treats an existing destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Replace the destination wholesale.
    Overwrite,
    /// Merge into the destination, keeping its records and appending new
    /// ones that are not already present.
    Extend,
}

/// Output container boundary.
pub trait ReportWriter {
    fn write(
        &self,
        report: &SelectionReport,
        destination: &Path,
        mode: SaveMode,
    ) -> CarveResult<()>;
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportDoc {
    record_count: usize,
    records: Vec<NodeRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    unresolved: Vec<UnresolvedDoc>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnresolvedDoc {
    index: usize,
    node_type: String,
    debug_name: String,
    reason: String,
}

/// camelCase JSON writer.
///
/// Writes go through a sibling temp file and a rename, so a crash never
/// leaves a half-written document in place. `Extend` refuses to merge into
/// a destination it cannot parse rather than clobbering it; the unresolved
/// list always reflects the latest run only, since its indexes refer to
/// that run's input.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReportWriter;

impl JsonReportWriter {
    pub fn new() -> Self {
        JsonReportWriter
    }

    fn build_doc(report: &SelectionReport, existing: Vec<NodeRecord>) -> CarveResult<ReportDoc> {
        let mut seen = FxHashSet::default();
        let mut records = Vec::with_capacity(existing.len() + report.selected.len());
        for record in existing.into_iter().chain(report.selected.iter().cloned()) {
            let fingerprint = serde_json::to_string(&record)
                .map_err(|e| CarveError::malformed(format!("record encode: {e}")))?;
            if seen.insert(fingerprint) {
                records.push(record);
            }
        }
        Ok(ReportDoc {
            record_count: records.len(),
            records,
            unresolved: report
                .unresolved
                .iter()
                .map(|u| UnresolvedDoc {
                    index: u.index,
                    node_type: u.node.node_type().to_string(),
                    debug_name: u.node.debug_name().to_string(),
                    reason: u.reason.clone(),
                })
                .collect(),
        })
    }

    fn read_existing(destination: &Path) -> CarveResult<Vec<NodeRecord>> {
        let bytes = fs::read(destination).at_path(destination)?;
        let doc: ReportDoc = serde_json::from_slice(&bytes).map_err(|e| {
            CarveError::malformed(format!(
                "existing output {}: {e}",
                destination.display()
            ))
        })?;
        Ok(doc.records)
    }
}

impl ReportWriter for JsonReportWriter {
    fn write(
        &self,
        report: &SelectionReport,
        destination: &Path,
        mode: SaveMode,
    ) -> CarveResult<()> {
        let existing = match mode {
            SaveMode::Extend if destination.is_file() => Self::read_existing(destination)?,
            _ => Vec::new(),
        };
        let merged = existing.len();
        let doc = Self::build_doc(report, existing)?;

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).at_path(parent)?;
            }
        }
        let mut tmp_name = destination.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut writer = BufWriter::new(File::create(&tmp).at_path(&tmp)?);
        serde_json::to_writer_pretty(&mut writer, &doc)
            .map_err(|e| CarveError::malformed(format!("report encode: {e}")))?;
        writer.write_all(b"\n").at_path(&tmp)?;
        let file = writer
            .into_inner()
            .map_err(|e| CarveError::io(&tmp, e.into_error()))?;
        file.sync_all().at_path(&tmp)?;
        fs::rename(&tmp, destination).at_path(destination)?;

        log::info!(
            "[JsonReportWriter] wrote {} records to {} ({} unresolved, merged over {})",
            doc.record_count,
            destination.display(),
            doc.unresolved.len(),
            merged
        );
        Ok(())
    }
}
