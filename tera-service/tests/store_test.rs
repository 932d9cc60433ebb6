//! Record store integration tests for tera-service.

mod common;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{date, device, market_record, spbu_record, TestRegistry};
use service_core::error::AppError;
use std::sync::{Arc, Mutex};
use tera_service::models::{
    CalibrationRecord, DeviceInput, Inventory, ListRecordsFilter, RecordStatus, RegistryKind,
};
use tera_service::services::metrics::ERRORS_TOTAL;
use tera_service::services::{get_metrics, InMemoryRecordStore, RecordStore, RegistryService};
use uuid::Uuid;

/// Store that lets a second registry add a device right after `list` has
/// taken its snapshot, the way a concurrent request would.
struct RacingStore {
    inner: Arc<InMemoryRecordStore>,
    racer: RegistryService<InMemoryRecordStore>,
    pending_add: Mutex<Option<(Uuid, DeviceInput)>>,
}

#[async_trait]
impl RecordStore for RacingStore {
    async fn insert(&self, record: CalibrationRecord) -> Result<(), AppError> {
        self.inner.insert(record).await
    }

    async fn get(&self, record_id: Uuid) -> Result<CalibrationRecord, AppError> {
        self.inner.get(record_id).await
    }

    async fn update(&self, record: CalibrationRecord) -> Result<(), AppError> {
        self.inner.update(record).await
    }

    async fn update_status(
        &self,
        record_id: Uuid,
        derived_from: &Inventory,
        status: RecordStatus,
        updated_utc: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.inner
            .update_status(record_id, derived_from, status, updated_utc)
            .await
    }

    async fn delete(&self, record_id: Uuid) -> Result<(), AppError> {
        self.inner.delete(record_id).await
    }

    async fn list(&self, registry: Option<RegistryKind>) -> Result<Vec<CalibrationRecord>, AppError> {
        let snapshot = self.inner.list(registry).await?;
        let pending = self.pending_add.lock().unwrap().take();
        if let Some((record_id, input)) = pending {
            self.racer.add_device(record_id, input).await?;
        }
        Ok(snapshot)
    }
}

/// Store that refuses every full-record write.
struct ReadOnlyStore {
    inner: Arc<InMemoryRecordStore>,
}

#[async_trait]
impl RecordStore for ReadOnlyStore {
    async fn insert(&self, record: CalibrationRecord) -> Result<(), AppError> {
        self.inner.insert(record).await
    }

    async fn get(&self, record_id: Uuid) -> Result<CalibrationRecord, AppError> {
        self.inner.get(record_id).await
    }

    async fn update(&self, _record: CalibrationRecord) -> Result<(), AppError> {
        Err(AppError::DatabaseError(anyhow::anyhow!("store is read-only")))
    }

    async fn update_status(
        &self,
        record_id: Uuid,
        derived_from: &Inventory,
        status: RecordStatus,
        updated_utc: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.inner
            .update_status(record_id, derived_from, status, updated_utc)
            .await
    }

    async fn delete(&self, record_id: Uuid) -> Result<(), AppError> {
        self.inner.delete(record_id).await
    }

    async fn list(&self, registry: Option<RegistryKind>) -> Result<Vec<CalibrationRecord>, AppError> {
        self.inner.list(registry).await
    }
}

#[tokio::test]
async fn insert_rejects_duplicate_ids() {
    let app = TestRegistry::spawn();

    let record = app
        .service
        .create_record(market_record("Bu Sum", vec![]))
        .await
        .unwrap();

    let result = app.store.insert(record.clone()).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(app.store.len(), 1);
}

#[tokio::test]
async fn update_and_delete_require_existing_record() {
    let app = TestRegistry::spawn();

    let record = app
        .service
        .create_record(market_record("Pak Dul", vec![]))
        .await
        .unwrap();
    app.store.delete(record.record_id).await.unwrap();

    let result = app.store.update(record.clone()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let result = app.store.delete(Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn list_filters_by_registry() {
    let app = TestRegistry::spawn();

    app.service
        .create_record(market_record("Bu Nah", vec![]))
        .await
        .unwrap();
    app.service
        .create_record(spbu_record("SPBU 3", None))
        .await
        .unwrap();

    assert_eq!(app.store.list(None).await.unwrap().len(), 2);

    let spbu = app.store.list(Some(RegistryKind::Spbu)).await.unwrap();
    assert_eq!(spbu.len(), 1);
    assert!(matches!(spbu[0].inventory(), Inventory::Flat(_)));

    assert!(app
        .store
        .list(Some(RegistryKind::BusinessOwner))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn records_round_trip_through_json() {
    let app = TestRegistry::spawn();

    let record = app
        .service
        .create_record(market_record(
            "Bu Yati",
            vec![device("Dacin", Some(date(2023, 5, 5)))],
        ))
        .await
        .unwrap();
    let record = app.service.get_record(record.record_id).await.unwrap();

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["status"], "inactive");
    assert_eq!(json["registry"], "market");
    assert_eq!(json["inventory"]["type"], "devices");
    assert_eq!(json["inventory"]["devices"][0]["expiry_date"], "2024-05-05");

    let decoded: CalibrationRecord = serde_json::from_value(json).unwrap();
    assert_eq!(decoded.status(), RecordStatus::Inactive);
    assert_eq!(decoded.devices(), record.devices());
}

#[tokio::test]
async fn metrics_track_status_evaluations() {
    let app = TestRegistry::spawn();

    let record = app
        .service
        .create_record(spbu_record("SPBU 4", Some(date(2025, 1, 1))))
        .await
        .unwrap();
    app.service.get_record(record.record_id).await.unwrap();

    let metrics = get_metrics();
    assert!(metrics.contains("tera_status_evaluations_total"));
    assert!(metrics.contains("tera_record_operations_total"));
}

#[tokio::test]
async fn update_status_touches_only_status_and_timestamp() {
    let app = TestRegistry::spawn();

    let record = app
        .service
        .create_record(market_record(
            "Bu Lastri",
            vec![device("Dacin", Some(date(2024, 1, 10)))],
        ))
        .await
        .unwrap();
    let later = record.updated_utc + Duration::hours(1);

    let applied = app
        .store
        .update_status(record.record_id, record.inventory(), RecordStatus::Inactive, later)
        .await
        .unwrap();
    assert!(applied);

    let stored = app.store.get(record.record_id).await.unwrap();
    assert_eq!(stored.status(), RecordStatus::Inactive);
    assert_eq!(stored.updated_utc, later);
    assert_eq!(stored.devices(), record.devices());
    assert_eq!(stored.owner_name, record.owner_name);

    // Status computed from an inventory that no longer matches is dropped
    let stale = Inventory::Devices { devices: vec![] };
    let applied = app
        .store
        .update_status(record.record_id, &stale, RecordStatus::Active, later)
        .await
        .unwrap();
    assert!(!applied);
    assert_eq!(
        app.store.get(record.record_id).await.unwrap().status(),
        RecordStatus::Inactive
    );

    let result = app
        .store
        .update_status(Uuid::new_v4(), &stale, RecordStatus::Active, later)
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn list_refresh_keeps_concurrently_added_device() {
    let app = TestRegistry::spawn();
    let store = Arc::new(RacingStore {
        inner: app.store.clone(),
        racer: app.service.clone(),
        pending_add: Mutex::new(None),
    });
    let service = RegistryService::new(store.clone(), app.service.lifecycle().clone());

    // One expired device; held active until the next load
    let record = service
        .create_record(market_record(
            "Bu Tini",
            vec![device("Dacin", Some(date(2024, 1, 10)))],
        ))
        .await
        .unwrap();
    assert_eq!(record.status(), RecordStatus::Active);

    *store.pending_add.lock().unwrap() =
        Some((record.record_id, device("Neraca", Some(date(2025, 6, 1)))));

    let listed = service
        .list_records(&ListRecordsFilter::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status(), RecordStatus::Inactive);

    let stored = app.store.get(record.record_id).await.unwrap();
    assert_eq!(stored.devices().len(), 2);
    assert_eq!(stored.status(), RecordStatus::Inactive);
}

#[tokio::test]
async fn failed_writes_and_missing_devices_count_as_errors() {
    let app = TestRegistry::spawn();
    let errors = |kind: &str| ERRORS_TOTAL.with_label_values(&[kind]).get();

    let record = app
        .service
        .create_record(market_record(
            "Pak Harto",
            vec![device("Dacin", Some(date(2025, 3, 1)))],
        ))
        .await
        .unwrap();

    let not_found_before = errors("not_found");
    let result = app
        .service
        .renew_device_certificate(record.record_id, Uuid::new_v4(), date(2025, 6, 1))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    let result = app
        .service
        .remove_device(record.record_id, Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(errors("not_found") >= not_found_before + 2.0);

    let read_only = RegistryService::new(
        Arc::new(ReadOnlyStore {
            inner: app.store.clone(),
        }),
        app.service.lifecycle().clone(),
    );
    let database_before = errors("database");
    let result = read_only
        .add_device(record.record_id, device("Neraca", None))
        .await;
    assert!(matches!(result, Err(AppError::DatabaseError(_))));
    assert!(errors("database") >= database_before + 1.0);
    assert_eq!(app.store.get(record.record_id).await.unwrap().devices().len(), 1);
}
