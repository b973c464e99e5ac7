//! Persistent bounds cache
//!
//! Four isolated partitions keyed by provenance and precision tier, each a
//! write-through append log with an in-memory index (see [`store`]). The
//! cache never computes bounds itself; [`BoundsCache::resolve`] takes a
//! provider closure and guarantees that concurrent misses on one key run it
//! exactly once, with every waiter sharing the outcome. A failed provider
//! leaves no trace, so later calls simply retry.
//!
//! Lifecycle is explicit: [`BoundsCache::initialize`] opens or creates the
//! store, [`BoundsCache::dispose`] flushes and releases it, and
//! [`BoundsCache::relocate`] moves a closed store between directories
//! without ever corrupting the source.

mod store;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{CarveError, CarveResult, IoResultExt};
use crate::geom::BoundingVolume;
use crate::resolver::{ResolvedBounds, ResourceKey};

pub use store::{CacheEntry, LOG_MAGIC};

use store::PartitionStore;

/// Store metadata file name.
pub const STORE_META_FILE: &str = "store.meta";

/// On-disk layout version.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// Cache partition: provenance times precision tier.
///
/// Partitions are fully isolated; the same resource key can hold different
/// volumes in each. Precision is a partition axis rather than a key
/// component, so the bounds-only tiers never shadow full-geometry answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Partition {
    /// Base-game resources, full geometry payloads.
    Vanilla,
    /// Modded resources, full geometry payloads.
    Modded,
    /// Base-game resources, bounds-only payloads.
    VanillaBounds,
    /// Modded resources, bounds-only payloads.
    ModdedBounds,
}

impl Partition {
    pub const ALL: [Partition; 4] = [
        Partition::Vanilla,
        Partition::Modded,
        Partition::VanillaBounds,
        Partition::ModdedBounds,
    ];

    /// Log file name inside the store directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Partition::Vanilla => "vanilla.pcl",
            Partition::Modded => "modded.pcl",
            Partition::VanillaBounds => "vanilla_bounds.pcl",
            Partition::ModdedBounds => "modded_bounds.pcl",
        }
    }

    fn slot(self) -> usize {
        match self {
            Partition::Vanilla => 0,
            Partition::Modded => 1,
            Partition::VanillaBounds => 2,
            Partition::ModdedBounds => 3,
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Partition::Vanilla => "Vanilla",
            Partition::Modded => "Modded",
            Partition::VanillaBounds => "VanillaBounds",
            Partition::ModdedBounds => "ModdedBounds",
        };
        f.write_str(name)
    }
}

/// Entry count and on-disk footprint of one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionStats {
    pub entry_count: u64,
    pub estimated_size_bytes: u64,
}

/// Snapshot of all four partitions, computed from current on-disk state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub vanilla: PartitionStats,
    pub modded: PartitionStats,
    pub vanilla_bounds: PartitionStats,
    pub modded_bounds: PartitionStats,
}

impl CacheStats {
    pub fn partition(&self, partition: Partition) -> &PartitionStats {
        match partition {
            Partition::Vanilla => &self.vanilla,
            Partition::Modded => &self.modded,
            Partition::VanillaBounds => &self.vanilla_bounds,
            Partition::ModdedBounds => &self.modded_bounds,
        }
    }

    pub fn total_entries(&self) -> u64 {
        Partition::ALL
            .iter()
            .map(|p| self.partition(*p).entry_count)
            .sum()
    }

    pub fn total_size_bytes(&self) -> u64 {
        Partition::ALL
            .iter()
            .map(|p| self.partition(*p).estimated_size_bytes)
            .sum()
    }
}

#[derive(Serialize, Deserialize)]
struct StoreMeta {
    format_version: u32,
    partitions: Vec<String>,
}

#[derive(Debug, Clone)]
enum FlightOutcome {
    Resolved(BoundingVolume),
    Failed(String),
}

/// Rendezvous for concurrent resolvers of one key.
#[derive(Debug)]
struct Flight {
    outcome: Mutex<Option<FlightOutcome>>,
    ready: Condvar,
}

impl Flight {
    fn new() -> Self {
        Flight {
            outcome: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn wait(&self) -> FlightOutcome {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(out) = outcome.as_ref() {
                return out.clone();
            }
            self.ready.wait(&mut outcome);
        }
    }

    fn complete(&self, result: FlightOutcome) {
        *self.outcome.lock() = Some(result);
        self.ready.notify_all();
    }
}

type FlightKey = (Partition, String);

/// The persistent bounds cache.
#[derive(Debug)]
pub struct BoundsCache {
    root: PathBuf,
    stores: RwLock<Option<[PartitionStore; 4]>>,
    flights: Mutex<FxHashMap<FlightKey, Arc<Flight>>>,
}

impl BoundsCache {
    /// Open the store at `root`, creating directory, metadata, and partition
    /// logs as needed. Must complete before any other operation; after
    /// [`dispose`](Self::dispose), a fresh `initialize` is the way back.
    pub fn initialize(root: impl Into<PathBuf>) -> CarveResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).at_path(&root)?;

        let meta_path = root.join(STORE_META_FILE);
        if meta_path.is_file() {
            let bytes = fs::read(&meta_path).at_path(&meta_path)?;
            let meta: StoreMeta = bincode::deserialize(&bytes)
                .map_err(|e| CarveError::storage(&root, format!("unreadable metadata: {e}")))?;
            if meta.format_version != STORE_FORMAT_VERSION {
                return Err(CarveError::storage(
                    &root,
                    format!(
                        "store format {} (expected {})",
                        meta.format_version, STORE_FORMAT_VERSION
                    ),
                ));
            }
        } else {
            // Partition logs without metadata means a foreign or pre-metadata
            // layout; refuse rather than guess.
            if Partition::ALL
                .iter()
                .any(|p| root.join(p.file_name()).exists())
            {
                return Err(CarveError::storage(
                    &root,
                    "partition logs present but metadata missing",
                ));
            }
            let meta = StoreMeta {
                format_version: STORE_FORMAT_VERSION,
                partitions: Partition::ALL
                    .iter()
                    .map(|p| p.file_name().to_string())
                    .collect(),
            };
            fs::write(&meta_path, bincode::serialize(&meta)?).at_path(&meta_path)?;
        }

        let stores = [
            PartitionStore::open(root.join(Partition::Vanilla.file_name()))?,
            PartitionStore::open(root.join(Partition::Modded.file_name()))?,
            PartitionStore::open(root.join(Partition::VanillaBounds.file_name()))?,
            PartitionStore::open(root.join(Partition::ModdedBounds.file_name()))?,
        ];
        let total: u64 = stores.iter().map(|s| s.entry_count()).sum();
        log::info!(
            "[BoundsCache] opened store at {} ({} entries)",
            root.display(),
            total
        );

        Ok(BoundsCache {
            root,
            stores: RwLock::new(Some(stores)),
            flights: Mutex::new(FxHashMap::default()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up or compute the bounding volume for a key.
    ///
    /// On a miss, exactly one caller per (partition, key) runs `provider`;
    /// concurrent callers block and share its outcome. A successful result
    /// is appended to the partition log before anyone observes it. Failure
    /// is shared with current waiters but cached nowhere, so the next call
    /// starts over.
    pub fn resolve<F>(
        &self,
        partition: Partition,
        key: &ResourceKey,
        provider: F,
    ) -> CarveResult<BoundingVolume>
    where
        F: FnOnce() -> CarveResult<ResolvedBounds>,
    {
        let guard = self.stores.read();
        let stores = guard.as_ref().ok_or_else(|| self.disposed())?;
        let store = &stores[partition.slot()];

        if let Some(entry) = store.get(key) {
            return Ok(entry.volume);
        }

        let flight_key: FlightKey = (partition, key.as_str().to_string());
        let (flight, leader) = {
            let mut flights = self.flights.lock();
            match flights.get(&flight_key) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let flight = Arc::new(Flight::new());
                    flights.insert(flight_key.clone(), flight.clone());
                    (flight, true)
                }
            }
        };

        if !leader {
            return match flight.wait() {
                FlightOutcome::Resolved(volume) => Ok(volume),
                FlightOutcome::Failed(reason) => Err(CarveError::resolution(key.as_str(), reason)),
            };
        }

        let result = provider().and_then(|resolved| {
            store.put(
                key,
                CacheEntry {
                    volume: resolved.volume,
                    source_size: resolved.source_size,
                },
            )?;
            Ok(resolved.volume)
        });

        // Publish to the store before dropping the flight so late arrivals
        // hit the index instead of starting a second computation.
        self.flights.lock().remove(&flight_key);
        match &result {
            Ok(volume) => flight.complete(FlightOutcome::Resolved(*volume)),
            Err(e) => flight.complete(FlightOutcome::Failed(e.to_string())),
        }
        result
    }

    /// Read a cached entry without resolving. `None` on miss or after
    /// dispose.
    pub fn peek(&self, partition: Partition, key: &ResourceKey) -> Option<CacheEntry> {
        let guard = self.stores.read();
        guard.as_ref()?[partition.slot()].get(key)
    }

    /// Entry counts and on-disk sizes per partition, from live state.
    pub fn stats(&self) -> CarveResult<CacheStats> {
        let guard = self.stores.read();
        let stores = guard.as_ref().ok_or_else(|| self.disposed())?;

        let mut stats = CacheStats::default();
        for partition in Partition::ALL {
            let store = &stores[partition.slot()];
            let per = PartitionStats {
                entry_count: store.entry_count(),
                estimated_size_bytes: store.disk_size()?,
            };
            match partition {
                Partition::Vanilla => stats.vanilla = per,
                Partition::Modded => stats.modded = per,
                Partition::VanillaBounds => stats.vanilla_bounds = per,
                Partition::ModdedBounds => stats.modded_bounds = per,
            }
        }
        Ok(stats)
    }

    /// Delete every entry in one partition. Other partitions are untouched.
    pub fn clear(&self, partition: Partition) -> CarveResult<()> {
        let guard = self.stores.read();
        let stores = guard.as_ref().ok_or_else(|| self.disposed())?;
        stores[partition.slot()].clear()?;
        log::info!("[BoundsCache] cleared partition {partition}");
        Ok(())
    }

    /// Delete every entry in every partition.
    pub fn clear_all(&self) -> CarveResult<()> {
        for partition in Partition::ALL {
            self.clear(partition)?;
        }
        Ok(())
    }

    /// Flush and release the store. Idempotent; every subsequent operation
    /// fails with [`CarveError::StorageUnavailable`] until a fresh
    /// [`initialize`](Self::initialize).
    pub fn dispose(&mut self) -> CarveResult<()> {
        let mut guard = self.stores.write();
        let Some(stores) = guard.take() else {
            return Ok(());
        };
        let mut first_err = None;
        for store in &stores {
            if let Err(e) = store.flush() {
                log::warn!("[BoundsCache] flush on dispose failed: {e}");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        log::info!("[BoundsCache] disposed store at {}", self.root.display());
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Move a closed store directory to a new location.
    ///
    /// The source must hold store metadata; the destination must not exist
    /// or be an empty directory. Tries a rename first and falls back to
    /// copy-verify-remove across filesystems. On any failure the source is
    /// left exactly as it was. Never call this with the store open.
    pub fn relocate(from: &Path, to: &Path) -> CarveResult<()> {
        let meta_path = from.join(STORE_META_FILE);
        if !meta_path.is_file() {
            return Err(CarveError::relocation(format!(
                "{} is not a cache store",
                from.display()
            )));
        }

        match fs::read_dir(to) {
            Ok(mut entries) => {
                if entries.next().is_some() {
                    return Err(CarveError::relocation(format!(
                        "destination {} is occupied",
                        to.display()
                    )));
                }
                // Empty directory; remove it so rename can take its place.
                fs::remove_dir(to)
                    .map_err(|e| CarveError::relocation(format!("destination: {e}")))?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CarveError::relocation(format!(
                    "destination {}: {e}",
                    to.display()
                )))
            }
        }
        if let Some(parent) = to.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| CarveError::relocation(format!("destination parent: {e}")))?;
            }
        }

        if fs::rename(from, to).is_ok() {
            log::info!(
                "[BoundsCache] relocated store {} -> {}",
                from.display(),
                to.display()
            );
            return Ok(());
        }

        // Cross-device fallback: copy everything, verify sizes, then remove
        // the source. A failure mid-copy removes the partial destination.
        let copy = || -> CarveResult<()> {
            fs::create_dir_all(to).at_path(to)?;
            for entry in fs::read_dir(from).at_path(from)? {
                let entry = entry.at_path(from)?;
                let src = entry.path();
                if !src.is_file() {
                    continue;
                }
                let dst = to.join(entry.file_name());
                let copied = fs::copy(&src, &dst).at_path(&src)?;
                let expected = fs::metadata(&src).at_path(&src)?.len();
                if copied != expected {
                    return Err(CarveError::io(
                        &dst,
                        std::io::Error::new(
                            std::io::ErrorKind::WriteZero,
                            format!("short copy: {copied} of {expected} bytes"),
                        ),
                    ));
                }
            }
            if let Ok(dir) = File::open(to) {
                let _ = dir.sync_all();
            }
            Ok(())
        };

        if let Err(e) = copy() {
            let _ = fs::remove_dir_all(to);
            return Err(CarveError::relocation(e.to_string()));
        }
        fs::remove_dir_all(from)
            .map_err(|e| CarveError::relocation(format!("source cleanup: {e}")))?;
        log::info!(
            "[BoundsCache] relocated store {} -> {} (copied)",
            from.display(),
            to.display()
        );
        Ok(())
    }

    fn disposed(&self) -> CarveError {
        CarveError::storage(&self.root, "cache disposed")
    }
}

impl Drop for BoundsCache {
    fn drop(&mut self) {
        if self.stores.get_mut().is_some() {
            if let Err(e) = self.dispose() {
                log::warn!("[BoundsCache] dispose on drop failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Aabb;
    use glam::Vec3;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::tempdir;

    fn key(name: &str) -> ResourceKey {
        ResourceKey::new(name, Vec3::ONE, None)
    }

    fn boxed(extent: f32) -> ResolvedBounds {
        ResolvedBounds {
            volume: BoundingVolume::Box(Aabb::new(Vec3::splat(-extent), Vec3::splat(extent))),
            source_size: 100,
        }
    }

    #[test]
    fn test_initialize_creates_layout() {
        let dir = tempdir().unwrap();
        let cache = BoundsCache::initialize(dir.path()).unwrap();
        assert!(dir.path().join(STORE_META_FILE).is_file());
        for partition in Partition::ALL {
            assert!(dir.path().join(partition.file_name()).is_file());
        }
        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_entries(), 0);
    }

    #[test]
    fn test_resolve_miss_then_hit() {
        let dir = tempdir().unwrap();
        let cache = BoundsCache::initialize(dir.path()).unwrap();
        let calls = AtomicUsize::new(0);

        let k = key("base/env/crate.mesh");
        let volume = cache
            .resolve(Partition::Vanilla, &k, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(boxed(1.0))
            })
            .unwrap();
        assert_eq!(volume, boxed(1.0).volume);

        // Second resolve must not call the provider.
        let volume = cache
            .resolve(Partition::Vanilla, &k, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(boxed(9.0))
            })
            .unwrap();
        assert_eq!(volume, boxed(1.0).volume);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_geometry_is_cached() {
        let dir = tempdir().unwrap();
        let cache = BoundsCache::initialize(dir.path()).unwrap();
        let calls = AtomicUsize::new(0);
        let k = key("base/env/empty.mesh");

        for _ in 0..3 {
            let volume = cache
                .resolve(Partition::Vanilla, &k, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(ResolvedBounds {
                        volume: BoundingVolume::NoGeometry,
                        source_size: 0,
                    })
                })
                .unwrap();
            assert_eq!(volume, BoundingVolume::NoGeometry);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_partitions_are_isolated() {
        let dir = tempdir().unwrap();
        let cache = BoundsCache::initialize(dir.path()).unwrap();
        let k = key("base/env/crate.mesh");

        cache
            .resolve(Partition::Vanilla, &k, || Ok(boxed(1.0)))
            .unwrap();
        let modded = cache
            .resolve(Partition::Modded, &k, || Ok(boxed(2.0)))
            .unwrap();
        assert_eq!(modded, boxed(2.0).volume);

        let stats = cache.stats().unwrap();
        assert_eq!(stats.vanilla.entry_count, 1);
        assert_eq!(stats.modded.entry_count, 1);
        assert_eq!(stats.vanilla_bounds.entry_count, 0);

        cache.clear(Partition::Modded).unwrap();
        let stats = cache.stats().unwrap();
        assert_eq!(stats.vanilla.entry_count, 1);
        assert_eq!(stats.modded.entry_count, 0);
        assert!(cache.peek(Partition::Vanilla, &k).is_some());
        assert!(cache.peek(Partition::Modded, &k).is_none());
    }

    #[test]
    fn test_entries_survive_reinitialize() {
        let dir = tempdir().unwrap();
        let k = key("base/env/crate.mesh");
        {
            let mut cache = BoundsCache::initialize(dir.path()).unwrap();
            cache
                .resolve(Partition::VanillaBounds, &k, || Ok(boxed(4.0)))
                .unwrap();
            cache.dispose().unwrap();
        }
        let cache = BoundsCache::initialize(dir.path()).unwrap();
        let volume = cache
            .resolve(Partition::VanillaBounds, &k, || {
                panic!("provider must not run on a warm cache")
            })
            .unwrap();
        assert_eq!(volume, boxed(4.0).volume);
    }

    #[test]
    fn test_provider_failure_does_not_poison() {
        let dir = tempdir().unwrap();
        let cache = BoundsCache::initialize(dir.path()).unwrap();
        let k = key("base/env/flaky.mesh");

        let err = cache
            .resolve(Partition::Vanilla, &k, || {
                Err(CarveError::resolution(k.as_str(), "archive offline"))
            })
            .unwrap_err();
        assert!(matches!(err, CarveError::ResolutionFailed { .. }));
        assert_eq!(cache.stats().unwrap().vanilla.entry_count, 0);

        let volume = cache
            .resolve(Partition::Vanilla, &k, || Ok(boxed(2.0)))
            .unwrap();
        assert_eq!(volume, boxed(2.0).volume);
    }

    #[test]
    fn test_operations_after_dispose_fail() {
        let dir = tempdir().unwrap();
        let mut cache = BoundsCache::initialize(dir.path()).unwrap();
        cache.dispose().unwrap();
        cache.dispose().unwrap();

        let k = key("a.mesh");
        assert!(matches!(
            cache.resolve(Partition::Vanilla, &k, || Ok(boxed(1.0))),
            Err(CarveError::StorageUnavailable { .. })
        ));
        assert!(matches!(
            cache.stats(),
            Err(CarveError::StorageUnavailable { .. })
        ));
        assert!(matches!(
            cache.clear(Partition::Vanilla),
            Err(CarveError::StorageUnavailable { .. })
        ));
        assert!(cache.peek(Partition::Vanilla, &k).is_none());
    }

    #[test]
    fn test_concurrent_resolves_run_provider_once() {
        let dir = tempdir().unwrap();
        let cache = BoundsCache::initialize(dir.path()).unwrap();
        let calls = AtomicUsize::new(0);
        let k = key("base/env/slow.mesh");

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let volume = cache
                        .resolve(Partition::Vanilla, &k, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(50));
                            Ok(boxed(3.0))
                        })
                        .unwrap();
                    assert_eq!(volume, boxed(3.0).volume);
                });
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().unwrap().vanilla.entry_count, 1);
    }

    #[test]
    fn test_stats_track_entries_and_disk_growth() {
        let dir = tempdir().unwrap();
        let cache = BoundsCache::initialize(dir.path()).unwrap();
        let empty = cache.stats().unwrap().modded.estimated_size_bytes;

        for name in ["a.mesh", "b.mesh", "c.mesh"] {
            cache
                .resolve(Partition::Vanilla, &key(name), || Ok(boxed(1.0)))
                .unwrap();
        }
        for name in ["a.mesh", "b.mesh"] {
            cache
                .resolve(Partition::Modded, &key(name), || Ok(boxed(2.0)))
                .unwrap();
        }

        let stats = cache.stats().unwrap();
        assert_eq!(stats.vanilla.entry_count, 3);
        assert_eq!(stats.modded.entry_count, 2);
        assert_eq!(stats.vanilla_bounds.entry_count, 0);
        assert_eq!(stats.modded_bounds.entry_count, 0);
        assert_eq!(stats.total_entries(), 5);
        assert!(stats.modded.estimated_size_bytes > empty);
    }

    #[test]
    fn test_relocate_moves_store() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("old");
        let to = dir.path().join("nested").join("new");
        let k = key("base/env/crate.mesh");
        {
            let mut cache = BoundsCache::initialize(&from).unwrap();
            cache
                .resolve(Partition::Vanilla, &k, || Ok(boxed(1.0)))
                .unwrap();
            cache.dispose().unwrap();
        }

        BoundsCache::relocate(&from, &to).unwrap();
        assert!(!from.exists());

        let cache = BoundsCache::initialize(&to).unwrap();
        assert!(cache.peek(Partition::Vanilla, &k).is_some());
    }

    #[test]
    fn test_relocate_refuses_occupied_destination() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("old");
        let to = dir.path().join("busy");
        {
            let mut cache = BoundsCache::initialize(&from).unwrap();
            cache
                .resolve(Partition::Vanilla, &key("a.mesh"), || Ok(boxed(1.0)))
                .unwrap();
            cache.dispose().unwrap();
        }
        fs::create_dir_all(&to).unwrap();
        fs::write(to.join("unrelated.txt"), b"keep out").unwrap();

        let err = BoundsCache::relocate(&from, &to).unwrap_err();
        assert!(matches!(err, CarveError::RelocationFailed { .. }));

        // Source must be untouched and reopenable.
        let cache = BoundsCache::initialize(&from).unwrap();
        assert!(cache.peek(Partition::Vanilla, &key("a.mesh")).is_some());
    }

    #[test]
    fn test_relocate_requires_store_source() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("not_a_store");
        fs::create_dir_all(&from).unwrap();
        let err = BoundsCache::relocate(&from, &dir.path().join("dst")).unwrap_err();
        assert!(matches!(err, CarveError::RelocationFailed { .. }));
    }

    #[test]
    fn test_initialize_rejects_version_drift() {
        let dir = tempdir().unwrap();
        let meta = StoreMeta {
            format_version: STORE_FORMAT_VERSION + 1,
            partitions: Vec::new(),
        };
        fs::write(
            dir.path().join(STORE_META_FILE),
            bincode::serialize(&meta).unwrap(),
        )
        .unwrap();
        let err = BoundsCache::initialize(dir.path()).unwrap_err();
        assert!(matches!(err, CarveError::StorageUnavailable { .. }));
    }

    #[test]
    fn test_initialize_rejects_logs_without_metadata() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(Partition::Vanilla.file_name()), LOG_MAGIC).unwrap();
        let err = BoundsCache::initialize(dir.path()).unwrap_err();
        assert!(matches!(err, CarveError::StorageUnavailable { .. }));
    }
}
