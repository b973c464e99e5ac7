//! Per-partition record log
//!
//! Each partition persists as a single append-only log file:
//!
//! ```text
//! offset  size  field
//! 0       4     magic "PCL1"
//! 4       ...   records
//! ```
//!
//! A record is a length (u32 LE), a CRC32 of the body (u32 LE), and a
//! bincode body holding key, volume, and source size. Updates append; the
//! newest record for a key wins during replay. An unreadable tail (torn
//! write, bad checksum, absurd length) is truncated away with a warning, so
//! a crash mid-append costs at most the record being written.
//!
//! Replay counts superseded records; when at least half the log is garbage
//! the store rewrites itself through a temp file and an atomic rename before
//! taking appends.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{CarveError, CarveResult, IoResultExt};
use crate::geom::BoundingVolume;
use crate::resolver::ResourceKey;

/// Log file magic.
pub const LOG_MAGIC: &[u8; 4] = b"PCL1";

const LOG_HEADER_LEN: u64 = 4;
const RECORD_HEADER_LEN: u64 = 8;

/// Upper bound on a record body. Real records are under a kilobyte; anything
/// larger in a length field is corruption.
const MAX_RECORD_LEN: u32 = 1 << 20;

/// One cached resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    pub volume: BoundingVolume,
    /// Size of the source payload the volume was derived from.
    pub source_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogRecord {
    key: String,
    volume: BoundingVolume,
    source_size: u64,
}

/// Persistent key-to-volume map for one partition.
///
/// Reads go through the in-memory index; writes append to the log under the
/// writer lock before updating the index, so the index never claims an entry
/// the log does not hold.
#[derive(Debug)]
pub(crate) struct PartitionStore {
    path: PathBuf,
    writer: Mutex<File>,
    index: DashMap<String, CacheEntry>,
}

impl PartitionStore {
    /// Open or create the log at `path`, replaying existing records.
    pub fn open(path: PathBuf) -> CarveResult<Self> {
        let index = DashMap::new();
        if path.is_file() {
            let replayed = replay(&path, &index)?;
            let live = index.len() as u64;
            let superseded = replayed.saturating_sub(live);
            if superseded > 0 && superseded * 2 >= replayed {
                log::info!(
                    "[PartitionStore] compacting {}: {} of {} records superseded",
                    path.display(),
                    superseded,
                    replayed
                );
                compact(&path, &index)?;
            }
        } else {
            let mut file = File::create(&path).at_path(&path)?;
            file.write_all(LOG_MAGIC).at_path(&path)?;
            file.sync_all().at_path(&path)?;
        }

        let writer = OpenOptions::new()
            .append(true)
            .open(&path)
            .at_path(&path)?;
        Ok(PartitionStore {
            path,
            writer: Mutex::new(writer),
            index,
        })
    }

    pub fn get(&self, key: &ResourceKey) -> Option<CacheEntry> {
        self.index.get(key.as_str()).map(|e| *e)
    }

    /// Append an entry, write-through. Newest record for a key wins.
    pub fn put(&self, key: &ResourceKey, entry: CacheEntry) -> CarveResult<()> {
        let record = LogRecord {
            key: key.as_str().to_string(),
            volume: entry.volume,
            source_size: entry.source_size,
        };
        let body = bincode::serialize(&record)?;
        let mut buf = Vec::with_capacity(RECORD_HEADER_LEN as usize + body.len());
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(&crc32(&body).to_le_bytes());
        buf.extend_from_slice(&body);

        // Hold the writer lock across both steps so a concurrent clear
        // cannot leave the index claiming records the log lost.
        let mut writer = self.writer.lock();
        writer.write_all(&buf).at_path(&self.path)?;
        self.index.insert(record.key, entry);
        Ok(())
    }

    /// Drop every entry and truncate the log back to its header.
    pub fn clear(&self) -> CarveResult<()> {
        let writer = self.writer.lock();
        writer.set_len(LOG_HEADER_LEN).at_path(&self.path)?;
        self.index.clear();
        drop(writer);
        Ok(())
    }

    pub fn entry_count(&self) -> u64 {
        self.index.len() as u64
    }

    /// Bytes the log currently occupies on disk.
    pub fn disk_size(&self) -> CarveResult<u64> {
        Ok(fs::metadata(&self.path).at_path(&self.path)?.len())
    }

    /// Push appended records down to the device.
    pub fn flush(&self) -> CarveResult<()> {
        self.writer.lock().sync_all().at_path(&self.path)
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Replay the log into `index`, truncating any unreadable tail. Returns the
/// number of records read.
fn replay(path: &Path, index: &DashMap<String, CacheEntry>) -> CarveResult<u64> {
    let file = File::open(path).at_path(path)?;
    let file_len = file.metadata().at_path(path)?.len();
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut magic) {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            // Created but never got its header; start fresh.
            log::warn!("[PartitionStore] {} shorter than header, resetting", path.display());
            let file = OpenOptions::new().write(true).open(path).at_path(path)?;
            file.set_len(0).at_path(path)?;
            let mut file = file;
            file.write_all(LOG_MAGIC).at_path(path)?;
            file.sync_all().at_path(path)?;
            return Ok(0);
        }
        return Err(CarveError::io(path, e));
    }
    if &magic != LOG_MAGIC {
        return Err(CarveError::storage(path, "not a partition log (bad magic)"));
    }

    let mut offset = LOG_HEADER_LEN;
    let mut replayed = 0u64;
    loop {
        let mut header = [0u8; RECORD_HEADER_LEN as usize];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(CarveError::io(path, e)),
        }
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let stored_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if len == 0 || len > MAX_RECORD_LEN {
            break;
        }

        let mut body = vec![0u8; len as usize];
        match reader.read_exact(&mut body) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(CarveError::io(path, e)),
        }
        if crc32(&body) != stored_crc {
            break;
        }
        let record: LogRecord = match bincode::deserialize(&body) {
            Ok(r) => r,
            Err(_) => break,
        };

        index.insert(
            record.key,
            CacheEntry {
                volume: record.volume,
                source_size: record.source_size,
            },
        );
        replayed += 1;
        offset += RECORD_HEADER_LEN + u64::from(len);
    }

    if offset < file_len {
        log::warn!(
            "[PartitionStore] {}: dropping {} bytes of unreadable tail",
            path.display(),
            file_len - offset
        );
        let file = OpenOptions::new().write(true).open(path).at_path(path)?;
        file.set_len(offset).at_path(path)?;
        file.sync_all().at_path(path)?;
    }
    Ok(replayed)
}

/// Rewrite the log to hold only live entries: temp file, sync, rename.
fn compact(path: &Path, index: &DashMap<String, CacheEntry>) -> CarveResult<()> {
    let tmp = path.with_extension("pcl.tmp");
    {
        let file = File::create(&tmp).at_path(&tmp)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(LOG_MAGIC).at_path(&tmp)?;
        for item in index.iter() {
            let record = LogRecord {
                key: item.key().clone(),
                volume: item.value().volume,
                source_size: item.value().source_size,
            };
            let body = bincode::serialize(&record)?;
            writer
                .write_all(&(body.len() as u32).to_le_bytes())
                .at_path(&tmp)?;
            writer.write_all(&crc32(&body).to_le_bytes()).at_path(&tmp)?;
            writer.write_all(&body).at_path(&tmp)?;
        }
        writer.flush().at_path(&tmp)?;
        writer
            .into_inner()
            .map_err(|e| CarveError::io(&tmp, e.into_error()))?
            .sync_all()
            .at_path(&tmp)?;
    }
    fs::rename(&tmp, path).at_path(path)?;
    sync_parent_dir(path);
    Ok(())
}

/// Best-effort fsync of the containing directory after a rename.
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Aabb;
    use glam::Vec3;
    use tempfile::tempdir;

    fn key(name: &str) -> ResourceKey {
        ResourceKey::new(name, Vec3::ONE, None)
    }

    fn entry(extent: f32) -> CacheEntry {
        CacheEntry {
            volume: BoundingVolume::Box(Aabb::new(Vec3::splat(-extent), Vec3::splat(extent))),
            source_size: 64,
        }
    }

    #[test]
    fn test_put_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = PartitionStore::open(dir.path().join("vanilla.pcl")).unwrap();

        assert!(store.get(&key("a.mesh")).is_none());
        store.put(&key("a.mesh"), entry(1.0)).unwrap();
        assert_eq!(store.get(&key("a.mesh")), Some(entry(1.0)));
        assert_eq!(store.entry_count(), 1);
    }

    #[test]
    fn test_reopen_replays_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vanilla.pcl");
        {
            let store = PartitionStore::open(path.clone()).unwrap();
            store.put(&key("a.mesh"), entry(1.0)).unwrap();
            store.put(&key("b.mesh"), entry(2.0)).unwrap();
            store.flush().unwrap();
        }
        let store = PartitionStore::open(path).unwrap();
        assert_eq!(store.entry_count(), 2);
        assert_eq!(store.get(&key("b.mesh")), Some(entry(2.0)));
    }

    #[test]
    fn test_last_writer_wins_on_replay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vanilla.pcl");
        {
            let store = PartitionStore::open(path.clone()).unwrap();
            store.put(&key("a.mesh"), entry(1.0)).unwrap();
            store.put(&key("a.mesh"), entry(3.0)).unwrap();
        }
        let store = PartitionStore::open(path).unwrap();
        assert_eq!(store.get(&key("a.mesh")), Some(entry(3.0)));
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vanilla.pcl");
        {
            let store = PartitionStore::open(path.clone()).unwrap();
            store.put(&key("a.mesh"), entry(1.0)).unwrap();
            store.flush().unwrap();
        }
        let clean_len = fs::metadata(&path).unwrap().len();
        // Simulate a crash mid-append: garbage half-record at the tail.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0x55, 0x02, 0x00, 0x00, 0x99]).unwrap();
        drop(file);

        let store = PartitionStore::open(path.clone()).unwrap();
        assert_eq!(store.entry_count(), 1);
        assert_eq!(store.get(&key("a.mesh")), Some(entry(1.0)));
        assert_eq!(fs::metadata(&path).unwrap().len(), clean_len);
    }

    #[test]
    fn test_append_after_torn_tail_truncation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vanilla.pcl");
        {
            let store = PartitionStore::open(path.clone()).unwrap();
            store.put(&key("a.mesh"), entry(1.0)).unwrap();
        }
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0xFF; 6]).unwrap();
        drop(file);

        let store = PartitionStore::open(path.clone()).unwrap();
        store.put(&key("b.mesh"), entry(2.0)).unwrap();
        drop(store);

        let store = PartitionStore::open(path).unwrap();
        assert_eq!(store.entry_count(), 2);
        assert_eq!(store.get(&key("b.mesh")), Some(entry(2.0)));
    }

    #[test]
    fn test_bad_magic_is_storage_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vanilla.pcl");
        fs::write(&path, b"XXXXjunk").unwrap();
        let err = PartitionStore::open(path).unwrap_err();
        assert!(matches!(err, CarveError::StorageUnavailable { .. }));
    }

    #[test]
    fn test_clear_truncates_to_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vanilla.pcl");
        let store = PartitionStore::open(path.clone()).unwrap();
        store.put(&key("a.mesh"), entry(1.0)).unwrap();
        store.put(&key("b.mesh"), entry(2.0)).unwrap();

        store.clear().unwrap();
        assert_eq!(store.entry_count(), 0);
        assert!(store.get(&key("a.mesh")).is_none());
        assert_eq!(fs::metadata(&path).unwrap().len(), LOG_HEADER_LEN);

        // Still usable after a clear.
        store.put(&key("c.mesh"), entry(3.0)).unwrap();
        drop(store);
        let store = PartitionStore::open(path).unwrap();
        assert_eq!(store.entry_count(), 1);
    }

    #[test]
    fn test_compaction_rewrites_garbage_heavy_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vanilla.pcl");
        {
            let store = PartitionStore::open(path.clone()).unwrap();
            // Nine of ten records superseded.
            for i in 0..10 {
                store.put(&key("hot.mesh"), entry(i as f32 + 1.0)).unwrap();
            }
            store.flush().unwrap();
        }
        let bloated = fs::metadata(&path).unwrap().len();

        let store = PartitionStore::open(path.clone()).unwrap();
        assert_eq!(store.entry_count(), 1);
        assert_eq!(store.get(&key("hot.mesh")), Some(entry(10.0)));
        let compacted = store.disk_size().unwrap();
        assert!(compacted < bloated, "{compacted} >= {bloated}");

        // Compacted log still replays.
        drop(store);
        let store = PartitionStore::open(path).unwrap();
        assert_eq!(store.get(&key("hot.mesh")), Some(entry(10.0)));
    }

    #[test]
    fn test_fresh_log_has_only_header() {
        let dir = tempdir().unwrap();
        let store = PartitionStore::open(dir.path().join("modded.pcl")).unwrap();
        assert_eq!(store.entry_count(), 0);
        assert_eq!(store.disk_size().unwrap(), LOG_HEADER_LEN);
        assert!(store.path().is_file());
    }
}
