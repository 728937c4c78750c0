//! In-memory vehicle registry mirrored to a JSON file.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{Local, Utc};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::{
    error::{RegistryError, Result},
    models::{
        current_max_year, max_year_for, NewVehicle, VehicleField, VehicleRecord, VehicleUpdate,
        ID_PREFIX,
    },
    store,
};

/// Thread-safe registry of imported vehicles.
///
/// Records are kept in insertion order alongside an identifier index. Reads
/// share the lock; every mutation takes it exclusively and rewrites the
/// backing file before releasing it.
#[derive(Clone)]
pub struct VehicleRegistry {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    path: PathBuf,
    records: Vec<VehicleRecord>,
    index: HashMap<String, usize>,
    last_stamp: i64,
}

/// Result of a mutating operation.
///
/// The change is always applied in memory; `persist_error` carries the
/// failure to write the backing file, if any.
#[derive(Debug)]
pub struct Mutation<T> {
    /// Value produced by the operation.
    pub value: T,
    /// Set when the collection could not be written to disk.
    pub persist_error: Option<RegistryError>,
}

impl<T> Mutation<T> {
    /// Whether the backing file reflects this mutation.
    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// Details of an update.
#[derive(Debug)]
pub struct UpdateReport {
    /// Record as stored after the update.
    pub record: VehicleRecord,
    /// Fields that received a new value.
    pub changed: Vec<VehicleField>,
    /// Supplied values that were refused; those fields kept their old value.
    pub rejected: Vec<RegistryError>,
}

impl VehicleRegistry {
    /// Create an empty registry backed by `path`. Nothing is read from disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                path: path.into(),
                records: Vec::new(),
                index: HashMap::new(),
                last_stamp: 0,
            })),
        }
    }

    /// Create a registry for `path` and load any records already stored there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let registry = Self::new(path);
        registry.load()?;
        Ok(registry)
    }

    /// Backing file location.
    pub fn path(&self) -> PathBuf {
        self.inner.read().path.clone()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Whether the registry holds no records.
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Validate `fields`, store a new record and persist the collection.
    pub fn create(&self, fields: NewVehicle) -> Result<Mutation<VehicleRecord>> {
        let today = Local::now().date_naive();
        let fields = fields.validated(max_year_for(today))?;

        let mut inner = self.inner.write();
        let id = inner.next_id();
        let record = VehicleRecord::from_new(id, fields, today);
        inner.push(record.clone());
        info!(id = %record.id, vehicle = %record.display_name(), "vehicle created");

        let persist_error = inner.persist();
        Ok(Mutation {
            value: record,
            persist_error,
        })
    }

    /// All records in listing order.
    pub fn list(&self) -> Vec<VehicleRecord> {
        self.inner.read().records.clone()
    }

    /// Look up a single record by identifier.
    pub fn get(&self, id: &str) -> Result<VehicleRecord> {
        let inner = self.inner.read();
        inner
            .position(id)
            .map(|pos| inner.records[pos].clone())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Overwrite the supplied non-blank fields of record `id` and persist.
    ///
    /// Invalid values do not abort the update: the field keeps its value and
    /// the refusal is listed in [`UpdateReport::rejected`].
    pub fn update(&self, id: &str, update: VehicleUpdate) -> Result<Mutation<UpdateReport>> {
        let max_year = current_max_year();

        let mut inner = self.inner.write();
        let pos = inner
            .position(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let changes = inner.records[pos].apply(update, max_year);
        for err in &changes.rejected {
            warn!(%id, "update value rejected: {err}");
        }
        let record = inner.records[pos].clone();
        info!(%id, changed = changes.changed.len(), "vehicle updated");

        let persist_error = inner.persist();
        Ok(Mutation {
            value: UpdateReport {
                record,
                changed: changes.changed,
                rejected: changes.rejected,
            },
            persist_error,
        })
    }

    /// Remove record `id` from the registry and persist. Returns the removed record.
    pub fn delete(&self, id: &str) -> Result<Mutation<VehicleRecord>> {
        let mut inner = self.inner.write();
        let record = inner
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        info!(%id, vehicle = %record.display_name(), "vehicle deleted");

        let persist_error = inner.persist();
        Ok(Mutation {
            value: record,
            persist_error,
        })
    }

    /// Write the whole collection to the backing file.
    pub fn save(&self) -> Result<()> {
        let inner = self.inner.write();
        store::write_records(&inner.path, &inner.records)
    }

    /// Replace the in-memory collection with the content of the backing file.
    ///
    /// A missing file yields an empty collection. On any error the current
    /// state is left untouched. Returns the number of records loaded.
    pub fn load(&self) -> Result<usize> {
        let mut inner = self.inner.write();
        let records = store::read_records(&inner.path)?.unwrap_or_default();
        let (index, last_stamp) = build_index(&inner.path, &records)?;

        inner.records = records;
        inner.index = index;
        inner.last_stamp = inner.last_stamp.max(last_stamp);
        info!(path = %inner.path.display(), records = inner.records.len(), "registry loaded");
        Ok(inner.records.len())
    }
}

impl Inner {
    fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    fn push(&mut self, record: VehicleRecord) {
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
    }

    fn remove(&mut self, id: &str) -> Option<VehicleRecord> {
        let pos = self.index.remove(id)?;
        let record = self.records.remove(pos);
        for (offset, later) in self.records[pos..].iter().enumerate() {
            self.index.insert(later.id.clone(), pos + offset);
        }
        Some(record)
    }

    /// Issue an identifier strictly newer than any issued or loaded before.
    fn next_id(&mut self) -> String {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MIN);
        let mut stamp = self
            .last_stamp
            .checked_add(1)
            .map_or(i64::MAX, |next| next.max(now));
        loop {
            let id = format!("{ID_PREFIX}{stamp}");
            if !self.index.contains_key(&id) {
                self.last_stamp = stamp;
                return id;
            }
            match stamp.checked_add(1) {
                Some(next) => stamp = next,
                None => break,
            }
        }

        // stamps exhausted, fall back to a counter suffix
        self.last_stamp = i64::MAX;
        (1u64..)
            .map(|n| format!("{ID_PREFIX}{}_{n}", i64::MAX))
            .find(|id| !self.index.contains_key(id))
            .unwrap_or_default()
    }

    fn persist(&self) -> Option<RegistryError> {
        match store::write_records(&self.path, &self.records) {
            Ok(()) => None,
            Err(err) => {
                warn!(path = %self.path.display(), "failed to persist registry: {err}");
                Some(err)
            }
        }
    }
}

fn build_index(path: &Path, records: &[VehicleRecord]) -> Result<(HashMap<String, usize>, i64)> {
    let max_year = current_max_year();
    let mut index = HashMap::with_capacity(records.len());
    let mut last_stamp = 0;

    for (pos, record) in records.iter().enumerate() {
        record.check(max_year).map_err(|err| {
            RegistryError::format(path, format!("record {} at position {pos}: {err}", record.id))
        })?;
        if index.insert(record.id.clone(), pos).is_some() {
            return Err(RegistryError::format(
                path,
                format!("duplicate vehicle id {}", record.id),
            ));
        }
        if let Some(stamp) = record
            .id
            .strip_prefix(ID_PREFIX)
            .and_then(|raw| raw.parse::<i64>().ok())
        {
            last_stamp = last_stamp.max(stamp);
        }
    }

    Ok((index, last_stamp))
}
