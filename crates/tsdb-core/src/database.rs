//! # Database
//!
//! The public engine API: a database directory holding a catalog and one
//! data file plus one change log per timeseries instance.
//!
//! ```text
//! <root>/tsdb.redb          catalog
//! <root>/data/<uuid>.tsdb   data records
//! <root>/data/<uuid>.log    change log
//! ```
//!
//! `Database` is `Send + Sync`. Writes are serialized by an internal
//! lock; reads run concurrently.
//!
//! Every write bumps a generation counter under the cache lock. A read
//! that misses the cache only stores what it decoded if no write
//! finished in the meantime, so the cache never holds a series older
//! than the file.

use crate::cache::{CacheStats, DEFAULT_CACHE_SIZE, LruCache, SeriesCache};
use crate::changelog;
use crate::error::{Result, TsdbError};
use crate::frequency::Frequency;
use crate::metadata::{
    FileKind, InstanceFilter, InstanceKey, Measurand, Source, TimeseriesInstance,
    TimeseriesRecord,
};
use crate::reader;
use crate::series::TimeSeries;
use crate::storage::{CATALOG_FILE, Catalog};
use crate::writer::{self, WriteReport};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

/// Directory holding data files and change logs.
pub const DATA_DIR: &str = "data";

/// An open database.
#[derive(Debug)]
pub struct Database {
    root: PathBuf,
    catalog: Catalog,
    cache: Mutex<SeriesCache>,
    write_lock: Mutex<()>,
    /// Completed writes; read under the cache lock before caching.
    generation: AtomicU64,
}

impl Database {
    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Create a new database at `path` and open it.
    ///
    /// Fails with `AlreadyExists` if anything is already at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref();
        if root.exists() {
            return Err(TsdbError::AlreadyExists(root.to_path_buf()));
        }

        fs::create_dir_all(root.join(DATA_DIR))?;
        let catalog = Catalog::create(&root.join(CATALOG_FILE))?;
        info!(path = %root.display(), "created database");

        Ok(Self::from_parts(root.to_path_buf(), catalog))
    }

    /// Open the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref();
        if !root.is_dir() {
            return Err(TsdbError::NotFound(root.to_path_buf()));
        }

        let catalog = match Catalog::open(&root.join(CATALOG_FILE)) {
            Err(TsdbError::NotFound(_)) => return Err(TsdbError::NotFound(root.to_path_buf())),
            other => other?,
        };
        fs::create_dir_all(root.join(DATA_DIR))?;
        debug!(path = %root.display(), "opened database");

        Ok(Self::from_parts(root.to_path_buf(), catalog))
    }

    fn from_parts(root: PathBuf, catalog: Catalog) -> Self {
        Self {
            root,
            catalog,
            cache: Mutex::new(LruCache::new(DEFAULT_CACHE_SIZE)),
            write_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Register a timeseries identifier, e.g. a station id.
    pub fn add_timeseries(&self, identifier: &str) -> Result<()> {
        self.catalog.add_timeseries(&TimeseriesRecord {
            identifier: identifier.to_string(),
        })
    }

    pub fn add_measurand(&self, short_id: &str, long_id: &str, description: &str) -> Result<()> {
        self.catalog.add_measurand(&Measurand {
            short_id: short_id.to_string(),
            long_id: long_id.to_string(),
            description: description.to_string(),
        })
    }

    pub fn add_source(&self, short_id: &str, description: &str) -> Result<()> {
        self.catalog.add_source(&Source {
            short_id: short_id.to_string(),
            description: description.to_string(),
        })
    }

    /// Register a stored series for an identifier. Allocates the uuid
    /// that names its files.
    pub fn add_timeseries_instance(
        &self,
        key: &InstanceKey,
        initial_metadata: &str,
    ) -> Result<TimeseriesInstance> {
        let instance = TimeseriesInstance {
            uuid: Uuid::new_v4(),
            identifier: key.identifier.clone(),
            measurand: key.measurand.clone(),
            source: key.source.clone(),
            freq: key.freq,
            initial_metadata: initial_metadata.to_string(),
        };
        self.catalog.add_instance(&instance)?;
        info!(instance = %key, uuid = %instance.uuid, "added timeseries instance");
        Ok(instance)
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// The registered instance for `key`.
    pub fn instance(&self, key: &InstanceKey) -> Result<TimeseriesInstance> {
        self.catalog
            .instance(key)?
            .ok_or_else(|| TsdbError::MissingData {
                kind: "timeseries instance",
                key: key.to_string(),
            })
    }

    /// Path of the data file or change log of `key`.
    pub fn get_file_path(&self, key: &InstanceKey, kind: FileKind) -> Result<PathBuf> {
        Ok(self.file_path(&self.instance(key)?, kind))
    }

    fn file_path(&self, instance: &TimeseriesInstance, kind: FileKind) -> PathBuf {
        self.root
            .join(DATA_DIR)
            .join(format!("{}.{}", instance.uuid, kind.extension()))
    }

    /// Identifiers with at least one instance matching `filter`, sorted.
    ///
    /// With an empty filter every registered identifier is listed,
    /// including those without instances.
    pub fn ts_list(&self, filter: &InstanceFilter) -> Result<Vec<String>> {
        if filter.is_empty() {
            return Ok(self
                .catalog
                .list_timeseries()?
                .into_iter()
                .map(|t| t.identifier)
                .collect());
        }
        let ids: BTreeSet<String> = self
            .catalog
            .list_instances(filter)?
            .into_iter()
            .map(|i| i.identifier)
            .collect();
        Ok(ids.into_iter().collect())
    }

    pub fn list_measurands(&self) -> Result<Vec<Measurand>> {
        self.catalog.list_measurands()
    }

    pub fn list_sources(&self) -> Result<Vec<Source>> {
        self.catalog.list_sources()
    }

    /// Every instance registered for `identifier`.
    pub fn list_instances(&self, identifier: &str) -> Result<Vec<TimeseriesInstance>> {
        Ok(self
            .catalog
            .list_instances(&InstanceFilter::default())?
            .into_iter()
            .filter(|i| i.identifier == identifier)
            .collect())
    }

    // =========================================================================
    // DATA
    // =========================================================================

    /// Write `series` to the instance at `key`, logging the change now.
    pub fn write(&self, key: &InstanceKey, series: &TimeSeries) -> Result<WriteReport> {
        self.write_at(key, series, Utc::now())
    }

    /// Write `series`, stamping its change log entries with `written_at`.
    pub fn write_at(
        &self,
        key: &InstanceKey,
        series: &TimeSeries,
        written_at: DateTime<Utc>,
    ) -> Result<WriteReport> {
        let instance = self.instance(key)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let result = writer::write(&self.file_path(&instance, FileKind::Data), series, instance.freq);
        {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            self.generation.fetch_add(1, Ordering::AcqRel);
            cache.invalidate(&instance.uuid);
        }
        let report = result?;

        changelog::append(
            &self.file_path(&instance, FileKind::Log),
            &report.created,
            written_at.timestamp(),
        )?;

        info!(
            instance = %key,
            created = report.created.len(),
            updated = report.updated.len(),
            "wrote timeseries"
        );
        Ok(report)
    }

    /// Current contents of the instance at `key`.
    pub fn read(&self, key: &InstanceKey) -> Result<TimeSeries> {
        let instance = self.instance(key)?;
        if let Some(series) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&instance.uuid)
        {
            return Ok(series);
        }

        let generation = self.generation.load(Ordering::Acquire);
        let series = reader::read_series(&self.file_path(&instance, FileKind::Data))?;

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::Acquire) == generation {
            cache.insert(instance.uuid, series.clone());
        } else {
            debug!(instance = %key, "write raced read, not caching");
        }
        Ok(series)
    }

    /// Contents of the instance at `key` as they were stored at `as_at`.
    pub fn read_log(&self, key: &InstanceKey, as_at: DateTime<Utc>) -> Result<TimeSeries> {
        let instance = self.instance(key)?;
        changelog::as_at(&self.file_path(&instance, FileKind::Log), as_at)
    }

    /// Read every instance of frequency `freq` matching `filter`,
    /// skipping identifiers listed in `excludes`.
    pub fn read_all(
        &self,
        freq: Frequency,
        filter: &InstanceFilter,
        excludes: &[&str],
    ) -> Result<BTreeMap<InstanceKey, TimeSeries>> {
        let filter = filter.clone().freq(freq);
        let mut out = BTreeMap::new();
        for instance in self.catalog.list_instances(&filter)? {
            if excludes.contains(&instance.identifier.as_str()) {
                continue;
            }
            let key = instance.key();
            let series = self.read(&key)?;
            out.insert(key, series);
        }
        Ok(out)
    }

    /// Read-cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats()
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root.display())
    }
}

// =============================================================================
// TESTS
// =============================================================================
