//! Record store abstraction.
//!
//! Records live in an external data store; the registry reaches it only
//! through [`RecordStore`]. [`InMemoryRecordStore`] backs tests and local use.

use crate::models::{CalibrationRecord, Inventory, RecordStatus, RegistryKind};
use crate::services::metrics::STORE_OPERATION_DURATION;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use service_core::error::AppError;
use tracing::{debug, instrument};
use uuid::Uuid;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record. Fails with `Conflict` if the id exists.
    async fn insert(&self, record: CalibrationRecord) -> Result<(), AppError>;

    /// Fetch a record. Fails with `NotFound` if absent.
    async fn get(&self, record_id: Uuid) -> Result<CalibrationRecord, AppError>;

    /// Replace an existing record. Fails with `NotFound` if absent.
    async fn update(&self, record: CalibrationRecord) -> Result<(), AppError>;

    /// Set only the status and update time of a record, provided its stored
    /// inventory still equals `derived_from`. Returns `false` when the
    /// inventory has changed since the status was computed, leaving the
    /// record untouched. Fails with `NotFound` if absent.
    async fn update_status(
        &self,
        record_id: Uuid,
        derived_from: &Inventory,
        status: RecordStatus,
        updated_utc: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Delete a record. Fails with `NotFound` if absent.
    async fn delete(&self, record_id: Uuid) -> Result<(), AppError>;

    /// All records, optionally restricted to one registry.
    async fn list(&self, registry: Option<RegistryKind>) -> Result<Vec<CalibrationRecord>, AppError>;
}

/// DashMap-backed store.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: DashMap<Uuid, CalibrationRecord>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn not_found(record_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Record {} not found", record_id))
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    #[instrument(skip(self, record), fields(record_id = %record.record_id))]
    async fn insert(&self, record: CalibrationRecord) -> Result<(), AppError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["insert"])
            .start_timer();

        let result = match self.records.entry(record.record_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::Conflict(
                anyhow::anyhow!("Record {} already exists", record.record_id),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        };

        timer.observe_duration();
        result
    }

    #[instrument(skip(self))]
    async fn get(&self, record_id: Uuid) -> Result<CalibrationRecord, AppError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["get"])
            .start_timer();

        let record = self
            .records
            .get(&record_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| not_found(record_id));

        timer.observe_duration();
        record
    }

    #[instrument(skip(self, record), fields(record_id = %record.record_id))]
    async fn update(&self, record: CalibrationRecord) -> Result<(), AppError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["update"])
            .start_timer();

        let result = match self.records.get_mut(&record.record_id) {
            Some(mut existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(not_found(record.record_id)),
        };

        timer.observe_duration();
        result
    }

    #[instrument(skip(self, derived_from))]
    async fn update_status(
        &self,
        record_id: Uuid,
        derived_from: &Inventory,
        status: RecordStatus,
        updated_utc: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["update_status"])
            .start_timer();

        let result = match self.records.get_mut(&record_id) {
            Some(mut existing) if existing.inventory == *derived_from => {
                existing.status = status;
                existing.updated_utc = updated_utc;
                Ok(true)
            }
            Some(_) => {
                debug!("Inventory changed since status was computed; skipping");
                Ok(false)
            }
            None => Err(not_found(record_id)),
        };

        timer.observe_duration();
        result
    }

    #[instrument(skip(self))]
    async fn delete(&self, record_id: Uuid) -> Result<(), AppError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["delete"])
            .start_timer();

        let result = self
            .records
            .remove(&record_id)
            .map(|_| ())
            .ok_or_else(|| not_found(record_id));

        timer.observe_duration();
        result
    }

    #[instrument(skip(self))]
    async fn list(&self, registry: Option<RegistryKind>) -> Result<Vec<CalibrationRecord>, AppError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["list"])
            .start_timer();

        let records: Vec<CalibrationRecord> = self
            .records
            .iter()
            .filter(|r| registry.map_or(true, |kind| r.registry == kind))
            .map(|r| r.value().clone())
            .collect();

        debug!(count = records.len(), "Listed records");
        timer.observe_duration();
        Ok(records)
    }
}
