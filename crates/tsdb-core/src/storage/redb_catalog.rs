//! redb-backed catalog.

use crate::error::{Result, TsdbError};
use crate::metadata::{
    InstanceFilter, InstanceKey, Measurand, Source, TimeseriesInstance, TimeseriesRecord,
};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

// =============================================================================
// TABLES
// =============================================================================

/// File name of the catalog inside a database directory.
pub const CATALOG_FILE: &str = "tsdb.redb";

/// Layout version written at creation and checked on open.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &str = "schema_version";

type StrTable = TableDefinition<'static, &'static str, &'static [u8]>;

const META: StrTable = TableDefinition::new("meta");
const TIMESERIES: StrTable = TableDefinition::new("timeseries");
const MEASURANDS: StrTable = TableDefinition::new("measurands");
const SOURCES: StrTable = TableDefinition::new("sources");

/// (identifier, measurand, source, freq) -> instance
const INSTANCES: TableDefinition<(&str, &str, &str, &str), &[u8]> =
    TableDefinition::new("instances");

// =============================================================================
// CATALOG
// =============================================================================

/// Registry of timeseries, measurands, sources and instances.
pub struct Catalog {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").field("path", &self.path).finish()
    }
}

impl Catalog {
    /// Create a catalog file with every table and the schema version.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(TsdbError::AlreadyExists(path.to_path_buf()));
        }

        let db = Database::create(path)?;
        let txn = db.begin_write()?;
        {
            let mut meta = txn.open_table(META)?;
            let version = postcard::to_allocvec(&SCHEMA_VERSION)?;
            meta.insert(SCHEMA_VERSION_KEY, version.as_slice())?;
            txn.open_table(TIMESERIES)?;
            txn.open_table(MEASURANDS)?;
            txn.open_table(SOURCES)?;
            txn.open_table(INSTANCES)?;
        }
        txn.commit()?;

        debug!(path = %path.display(), "created catalog");
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing catalog and check its schema version.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(TsdbError::NotFound(path.to_path_buf()));
        }

        let catalog = Self {
            db: Database::open(path)?,
            path: path.to_path_buf(),
        };
        let version = catalog.schema_version()?;
        if version != SCHEMA_VERSION {
            return Err(TsdbError::corrupt(
                path,
                format!("unsupported catalog schema version {version}"),
            ));
        }
        Ok(catalog)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema_version(&self) -> Result<u32> {
        self.get(META, SCHEMA_VERSION_KEY)?
            .ok_or_else(|| TsdbError::corrupt(&self.path, "catalog has no schema version"))
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    pub fn add_timeseries(&self, record: &TimeseriesRecord) -> Result<()> {
        self.insert_unique(TIMESERIES, "timeseries", &record.identifier, record)
    }

    pub fn add_measurand(&self, measurand: &Measurand) -> Result<()> {
        self.insert_unique(MEASURANDS, "measurand", &measurand.short_id, measurand)
    }

    pub fn add_source(&self, source: &Source) -> Result<()> {
        self.insert_unique(SOURCES, "source", &source.short_id, source)
    }

    /// Register an instance. Its timeseries, measurand and source must
    /// already be registered.
    pub fn add_instance(&self, instance: &TimeseriesInstance) -> Result<()> {
        let freq = instance.freq.to_string();
        let key = (
            instance.identifier.as_str(),
            instance.measurand.as_str(),
            instance.source.as_str(),
            freq.as_str(),
        );
        let bytes = postcard::to_allocvec(instance)?;

        let txn = self.db.begin_write()?;
        {
            let references = [
                (TIMESERIES, "timeseries", instance.identifier.as_str()),
                (MEASURANDS, "measurand", instance.measurand.as_str()),
                (SOURCES, "source", instance.source.as_str()),
            ];
            for (table, kind, id) in references {
                let table = txn.open_table(table)?;
                if table.get(id)?.is_none() {
                    return Err(TsdbError::MissingData {
                        kind,
                        key: id.to_string(),
                    });
                }
            }

            let mut instances = txn.open_table(INSTANCES)?;
            if instances.get(key)?.is_some() {
                return Err(TsdbError::Duplicate {
                    kind: "timeseries instance",
                    key: instance.key().to_string(),
                });
            }
            instances.insert(key, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    pub fn timeseries(&self, identifier: &str) -> Result<Option<TimeseriesRecord>> {
        self.get(TIMESERIES, identifier)
    }

    pub fn measurand(&self, short_id: &str) -> Result<Option<Measurand>> {
        self.get(MEASURANDS, short_id)
    }

    pub fn source(&self, short_id: &str) -> Result<Option<Source>> {
        self.get(SOURCES, short_id)
    }

    pub fn instance(&self, key: &InstanceKey) -> Result<Option<TimeseriesInstance>> {
        let freq = key.freq.to_string();
        let txn = self.db.begin_read()?;
        let table = txn.open_table(INSTANCES)?;
        let found = match table.get((
            key.identifier.as_str(),
            key.measurand.as_str(),
            key.source.as_str(),
            freq.as_str(),
        ))? {
            Some(guard) => Some(postcard::from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    pub fn list_timeseries(&self) -> Result<Vec<TimeseriesRecord>> {
        self.list(TIMESERIES)
    }

    pub fn list_measurands(&self) -> Result<Vec<Measurand>> {
        self.list(MEASURANDS)
    }

    pub fn list_sources(&self) -> Result<Vec<Source>> {
        self.list(SOURCES)
    }

    /// Instances matching `filter`, in key order.
    pub fn list_instances(&self, filter: &InstanceFilter) -> Result<Vec<TimeseriesInstance>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(INSTANCES)?;
        let mut out = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            let instance: TimeseriesInstance = postcard::from_bytes(value.value())?;
            if filter.matches(&instance) {
                out.push(instance);
            }
        }
        Ok(out)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn insert_unique<T: Serialize>(
        &self,
        table: StrTable,
        kind: &'static str,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let bytes = postcard::to_allocvec(value)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(table)?;
            if table.get(key)?.is_some() {
                return Err(TsdbError::Duplicate {
                    kind,
                    key: key.to_string(),
                });
            }
            table.insert(key, bytes.as_slice())?;
        }
        txn.commit()?;
        debug!(kind, key, "registered");
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, table: StrTable, key: &str) -> Result<Option<T>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(table)?;
        let found = match table.get(key)? {
            Some(guard) => Some(postcard::from_bytes(guard.value())?),
            None => None,
        };
        Ok(found)
    }

    fn list<T: DeserializeOwned>(&self, table: StrTable) -> Result<Vec<T>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(table)?;
        let mut out = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            out.push(postcard::from_bytes(value.value())?);
        }
        Ok(out)
    }
}

// =============================================================================
// TESTS
// =============================================================================
