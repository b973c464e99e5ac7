//! Selection engine
//!
//! Runs a candidate node stream against a selection volume on a bounded
//! rayon pool. Bounds come from the cache (mesh-backed kinds), from the
//! record itself (fixed-extent kinds), or not at all (extentless kinds,
//! which are never selected). Results are re-sequenced into input order, so
//! identical inputs over a warm cache produce identical reports no matter
//! how resolution interleaves.
//!
//! Per-node resolution failures are collected as warnings, not run
//! failures; only storage-level errors abort a run. Runs are cooperatively
//! cancellable through a [`CancelToken`] and report coarse progress over an
//! optional channel.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use rayon::prelude::*;

use crate::cache::{BoundsCache, Partition};
use crate::error::{CarveError, CarveResult};
use crate::filter::CandidateFilter;
use crate::geom::{Aabb, BoundingVolume, SelectionVolume};
use crate::model::{GeometryClass, NodeRecord};
use crate::output::{SelectionReport, UnresolvedNode};
use crate::resolver::{resolve_bounds, GeometrySource, ResourceKey};

/// Completions between two `NodeBatch` events.
pub const DEFAULT_PROGRESS_BATCH: usize = 256;

/// Cooperative cancellation handle. Clone it, hand one copy to
/// [`SelectionOptions`], keep the other; `cancel` stops the run at the next
/// node boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Coarse run advancement, delivered best-effort; a dropped receiver never
/// stalls the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started { total: usize },
    NodeBatch { processed: usize, total: usize },
    Finished { selected: usize, unresolved: usize },
    Cancelled { processed: usize },
}

/// Per-run knobs. The defaults run on one worker per CPU with no filter, no
/// progress subscriber, and a fresh (never-fired) cancel token.
#[derive(Debug)]
pub struct SelectionOptions {
    /// Worker pool size; `None` means one per CPU.
    pub worker_threads: Option<usize>,
    /// Completions between `NodeBatch` events; 0 disables them.
    pub progress_batch: usize,
    /// Pre-filter applied before any bounds work.
    pub filter: Option<CandidateFilter>,
    /// Progress subscriber.
    pub progress: Option<Sender<ProgressEvent>>,
    pub cancel: CancelToken,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        SelectionOptions {
            worker_threads: None,
            progress_batch: DEFAULT_PROGRESS_BATCH,
            filter: None,
            progress: None,
            cancel: CancelToken::new(),
        }
    }
}

/// Per-node outcome, buffered in input order before assembly.
enum Verdict {
    Selected(NodeRecord),
    Outside,
    NoExtent,
    FilteredOut,
    Unresolved { node: NodeRecord, reason: String },
    Fatal(CarveError),
    Skipped,
}

/// The intersection-query runner.
pub struct SelectionEngine {
    pool: rayon::ThreadPool,
    options: SelectionOptions,
}

impl SelectionEngine {
    pub fn new(options: SelectionOptions) -> CarveResult<Self> {
        let threads = options.worker_threads.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("carver-select-{i}"))
            .build()
            .map_err(|e| CarveError::WorkerPool {
                reason: e.to_string(),
            })?;
        Ok(SelectionEngine { pool, options })
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run one selection.
    ///
    /// Every node is dispatched by geometry class; mesh-backed bounds go
    /// through `cache.resolve` with `partition_for` choosing the partition,
    /// so provenance and precision-tier routing stay with the caller.
    /// Failed resolutions land in the report's unresolved list with their
    /// input index. `Err` is reserved for storage-level failures, which
    /// abort the run.
    pub fn select<P>(
        &self,
        nodes: Vec<NodeRecord>,
        volume: &SelectionVolume,
        cache: &BoundsCache,
        source: &dyn GeometrySource,
        partition_for: P,
    ) -> CarveResult<SelectionReport>
    where
        P: Fn(&NodeRecord) -> Partition + Sync,
    {
        let total = nodes.len();
        let cancel = &self.options.cancel;
        let filter = self.options.filter.as_ref();
        let progress = self.options.progress.as_ref();
        let batch = self.options.progress_batch;
        let aborted = AtomicBool::new(false);
        let processed = AtomicUsize::new(0);

        send(progress, ProgressEvent::Started { total });
        log::debug!("[SelectionEngine] run over {total} candidates");

        let verdicts: Vec<Verdict> = self.pool.install(|| {
            nodes
                .into_par_iter()
                .map(|node| {
                    if cancel.is_cancelled() || aborted.load(Ordering::Relaxed) {
                        return Verdict::Skipped;
                    }
                    if let Some(filter) = filter {
                        if !filter.admits(&node) {
                            return Verdict::FilteredOut;
                        }
                    }
                    let verdict = test_node(node, volume, cache, source, &partition_for);
                    if matches!(verdict, Verdict::Fatal(_)) {
                        aborted.store(true, Ordering::Relaxed);
                        return verdict;
                    }
                    let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    if batch > 0 && done % batch == 0 {
                        send(
                            progress,
                            ProgressEvent::NodeBatch {
                                processed: done,
                                total,
                            },
                        );
                    }
                    verdict
                })
                .collect()
        });

        let mut report = SelectionReport {
            selected: Vec::new(),
            unresolved: Vec::new(),
            examined: 0,
            filtered_out: 0,
            cancelled: false,
        };
        for (index, verdict) in verdicts.into_iter().enumerate() {
            match verdict {
                Verdict::Selected(node) => {
                    report.examined += 1;
                    report.selected.push(node);
                }
                Verdict::Outside | Verdict::NoExtent => report.examined += 1,
                Verdict::Unresolved { node, reason } => {
                    report.examined += 1;
                    report.unresolved.push(UnresolvedNode {
                        index,
                        node,
                        reason,
                    });
                }
                Verdict::FilteredOut => report.filtered_out += 1,
                Verdict::Skipped => {}
                Verdict::Fatal(e) => {
                    log::error!("[SelectionEngine] run aborted: {e}");
                    return Err(e);
                }
            }
        }
        report.cancelled = cancel.is_cancelled();

        if report.cancelled {
            log::info!(
                "[SelectionEngine] cancelled after {} of {total} candidates",
                report.examined + report.filtered_out
            );
            send(
                progress,
                ProgressEvent::Cancelled {
                    processed: processed.load(Ordering::Relaxed),
                },
            );
        } else {
            log::info!(
                "[SelectionEngine] {} selected, {} unresolved, {} filtered out of {total}",
                report.selected.len(),
                report.unresolved.len(),
                report.filtered_out
            );
            send(
                progress,
                ProgressEvent::Finished {
                    selected: report.selected.len(),
                    unresolved: report.unresolved.len(),
                },
            );
        }
        Ok(report)
    }
}

fn send(progress: Option<&Sender<ProgressEvent>>, event: ProgressEvent) {
    if let Some(tx) = progress {
        let _ = tx.send(event);
    }
}

fn test_node<P>(
    node: NodeRecord,
    volume: &SelectionVolume,
    cache: &BoundsCache,
    source: &dyn GeometrySource,
    partition_for: &P,
) -> Verdict
where
    P: Fn(&NodeRecord) -> Partition,
{
    match node.geometry_class() {
        GeometryClass::Extentless => Verdict::NoExtent,
        GeometryClass::FixedExtent => {
            let Some(local) = node.local_fixed_aabb() else {
                return Verdict::Unresolved {
                    reason: "fixed-extent record without extent data".to_string(),
                    node,
                };
            };
            place_and_test(node, local, volume)
        }
        GeometryClass::MeshBacked => {
            let Some(path) = node.resource_path().map(str::to_string) else {
                return Verdict::Unresolved {
                    reason: "mesh-backed record without a resource path".to_string(),
                    node,
                };
            };
            let scale = node.transform().scale;
            let key = ResourceKey::new(&path, scale, node.source_hash());
            let partition = partition_for(&node);
            match cache.resolve(partition, &key, || {
                resolve_bounds(source, &key, &path, scale)
            }) {
                Ok(BoundingVolume::Box(local)) => place_and_test(node, local, volume),
                Ok(BoundingVolume::NoGeometry) => Verdict::NoExtent,
                Err(e @ CarveError::ResolutionFailed { .. }) => {
                    log::warn!("[SelectionEngine] {e}");
                    Verdict::Unresolved {
                        reason: e.to_string(),
                        node,
                    }
                }
                Err(e) => Verdict::Fatal(e),
            }
        }
    }
}

fn place_and_test(node: NodeRecord, local: Aabb, volume: &SelectionVolume) -> Verdict {
    let world = node.transform().placed_aabb(&local);
    if volume.intersects_aabb(&world) {
        Verdict::Selected(node)
    } else {
        Verdict::Outside
    }
}
