//! Registry service shared by every registry (SPBU, Pasar, Umum, business owners).
//!
//! Status is recomputed from the inventory every time a record is loaded or
//! changed, and expiry dates are always derived from calibration dates.

use crate::error::LifecycleError;
use crate::models::{
    CalibratedDevice, CalibrationRecord, CertificateDates, CreateRecord, DeviceInput, Inventory,
    ListRecordsFilter, RecordStatus, RegistryKind, RenewalEntry,
};
use crate::services::lifecycle::{classify_inventory, days_until_expiry, CertificateLifecycle};
use crate::services::metrics::{
    record_error, record_operation, record_status_change, record_status_evaluation,
};
use crate::services::store::RecordStore;
use chrono::NaiveDate;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

fn counted(err: AppError) -> AppError {
    record_error(err.kind());
    err
}

fn invalid_date(err: LifecycleError) -> AppError {
    record_error("invalid_date");
    err.into()
}

fn bad_request(message: String) -> AppError {
    record_error("bad_request");
    AppError::BadRequest(anyhow::anyhow!(message))
}

fn device_list_mut(record: &mut CalibrationRecord) -> Result<&mut Vec<CalibratedDevice>, AppError> {
    let registry = record.registry;
    match &mut record.inventory {
        Inventory::Devices { devices } => Ok(devices),
        Inventory::Flat(_) => Err(bad_request(format!(
            "Registry '{}' records hold a single certificate, not a device list",
            registry
        ))),
    }
}

fn device_not_found(record_id: Uuid, device_id: Uuid) -> AppError {
    counted(AppError::NotFound(anyhow::anyhow!(
        "Device {} not found in record {}",
        device_id,
        record_id
    )))
}

fn device_mut(
    record: &mut CalibrationRecord,
    device_id: Uuid,
) -> Result<&mut CalibratedDevice, AppError> {
    let record_id = record.record_id;
    device_list_mut(record)?
        .iter_mut()
        .find(|d| d.device_id() == device_id)
        .ok_or_else(|| device_not_found(record_id, device_id))
}

/// Record operations over a [`RecordStore`].
pub struct RegistryService<S: RecordStore> {
    store: Arc<S>,
    lifecycle: CertificateLifecycle,
}

impl<S: RecordStore> Clone for RegistryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            lifecycle: self.lifecycle.clone(),
        }
    }
}

impl<S: RecordStore> RegistryService<S> {
    pub fn new(store: Arc<S>, lifecycle: CertificateLifecycle) -> Self {
        Self { store, lifecycle }
    }

    pub fn lifecycle(&self) -> &CertificateLifecycle {
        &self.lifecycle
    }

    /// Recompute a record's status. Returns whether it changed.
    fn recompute(&self, record: &mut CalibrationRecord, reference: NaiveDate) -> bool {
        let status = classify_inventory(&record.inventory, reference);
        record_status_evaluation(record.registry.as_str(), status.as_str());

        if status == record.status {
            return false;
        }

        info!(
            record_id = %record.record_id,
            registry = %record.registry,
            from = %record.status,
            to = %status,
            %reference,
            "Record status changed"
        );
        record_status_change(record.registry.as_str(), status.as_str());
        record.status = status;
        true
    }

    /// Recompute a freshly read record and persist only its status if it
    /// changed. Returns whether the stored record was updated.
    async fn refresh_status(
        &self,
        record: &mut CalibrationRecord,
        reference: NaiveDate,
    ) -> Result<bool, AppError> {
        if !self.recompute(record, reference) {
            return Ok(false);
        }
        record.updated_utc = self.lifecycle.now();
        self.store
            .update_status(
                record.record_id,
                &record.inventory,
                record.status,
                record.updated_utc,
            )
            .await
            .map_err(counted)
    }

    /// Load, apply `change`, recompute status and persist.
    async fn modify<F>(
        &self,
        record_id: Uuid,
        operation: &str,
        change: F,
    ) -> Result<CalibrationRecord, AppError>
    where
        F: FnOnce(&mut CalibrationRecord) -> Result<(), AppError>,
    {
        let mut record = self.store.get(record_id).await.map_err(counted)?;
        change(&mut record)?;

        self.recompute(&mut record, self.lifecycle.today());
        record.updated_utc = self.lifecycle.now();
        self.store.update(record.clone()).await.map_err(counted)?;

        record_operation(record.registry.as_str(), operation);
        Ok(record)
    }

    /// Register a new record.
    ///
    /// Status starts as active whatever the submitted dates say; the first
    /// load or refresh brings it in line with the certificates.
    #[instrument(skip(self, input), fields(registry = %input.registry))]
    pub async fn create_record(&self, input: CreateRecord) -> Result<CalibrationRecord, AppError> {
        let inventory = if input.registry.is_single_device() {
            if !input.devices.is_empty() {
                return Err(bad_request(format!(
                    "Registry '{}' does not accept a device list",
                    input.registry
                )));
            }
            Inventory::Flat(
                CertificateDates::from_calibration(input.calibration_date).map_err(invalid_date)?,
            )
        } else {
            if input.calibration_date.is_some() {
                return Err(bad_request(format!(
                    "Registry '{}' records take calibration dates per device",
                    input.registry
                )));
            }
            let devices = input
                .devices
                .into_iter()
                .map(CalibratedDevice::new)
                .collect::<Result<Vec<_>, _>>()
                .map_err(invalid_date)?;
            Inventory::Devices { devices }
        };

        let now = self.lifecycle.now();
        let record = CalibrationRecord {
            record_id: Uuid::new_v4(),
            registry: input.registry,
            owner_name: input.owner_name,
            address: input.address,
            permit_number: input.permit_number,
            inventory,
            status: RecordStatus::Active,
            metadata: input.metadata,
            created_utc: now,
            updated_utc: now,
        };

        let derived = self.lifecycle.status_today(&record.inventory);
        if derived == RecordStatus::Inactive {
            warn!(
                record_id = %record.record_id,
                "Record created with an expired certificate; status held active until next recomputation"
            );
        }

        self.store.insert(record.clone()).await.map_err(counted)?;
        record_operation(record.registry.as_str(), "create");

        info!(record_id = %record.record_id, "Record created");
        Ok(record)
    }

    /// Load a record with its status recomputed for today.
    #[instrument(skip(self))]
    pub async fn get_record(&self, record_id: Uuid) -> Result<CalibrationRecord, AppError> {
        let mut record = self.store.get(record_id).await.map_err(counted)?;

        self.refresh_status(&mut record, self.lifecycle.today()).await?;

        Ok(record)
    }

    /// List records with statuses recomputed, filtered and sorted by owner name.
    #[instrument(skip(self, filter), fields(registry = ?filter.registry, status = ?filter.status))]
    pub async fn list_records(
        &self,
        filter: &ListRecordsFilter,
    ) -> Result<Vec<CalibrationRecord>, AppError> {
        let reference = self.lifecycle.today();
        let mut records = self.store.list(filter.registry).await.map_err(counted)?;

        for record in records.iter_mut() {
            self.refresh_status(record, reference).await?;
        }

        records.retain(|r| filter.matches(r));
        records.sort_by(|a, b| {
            a.owner_name
                .to_lowercase()
                .cmp(&b.owner_name.to_lowercase())
                .then_with(|| a.created_utc.cmp(&b.created_utc))
        });

        Ok(records)
    }

    /// Add a device to a multi-device record.
    #[instrument(skip(self, input))]
    pub async fn add_device(
        &self,
        record_id: Uuid,
        input: DeviceInput,
    ) -> Result<CalibrationRecord, AppError> {
        self.modify(record_id, "add_device", |record| {
            let device = CalibratedDevice::new(input).map_err(invalid_date)?;
            device_list_mut(record)?.push(device);
            Ok(())
        })
        .await
    }

    /// Replace a device's details. A changed calibration date re-derives expiry.
    #[instrument(skip(self, input))]
    pub async fn update_device(
        &self,
        record_id: Uuid,
        device_id: Uuid,
        input: DeviceInput,
    ) -> Result<CalibrationRecord, AppError> {
        self.modify(record_id, "update_device", |record| {
            device_mut(record, device_id)?
                .apply(input)
                .map_err(invalid_date)
        })
        .await
    }

    /// Remove a device from a multi-device record.
    #[instrument(skip(self))]
    pub async fn remove_device(
        &self,
        record_id: Uuid,
        device_id: Uuid,
    ) -> Result<CalibrationRecord, AppError> {
        self.modify(record_id, "remove_device", |record| {
            let devices = device_list_mut(record)?;
            let before = devices.len();
            devices.retain(|d| d.device_id() != device_id);
            if devices.len() == before {
                return Err(device_not_found(record_id, device_id));
            }
            Ok(())
        })
        .await
    }

    /// Renew one device's certificate from a new calibration date.
    #[instrument(skip(self))]
    pub async fn renew_device_certificate(
        &self,
        record_id: Uuid,
        device_id: Uuid,
        calibration_date: NaiveDate,
    ) -> Result<CalibrationRecord, AppError> {
        self.modify(record_id, "renew_device", |record| {
            device_mut(record, device_id)?
                .recalibrate(calibration_date)
                .map_err(invalid_date)
        })
        .await
    }

    /// Set or clear the calibration date of a single-device record.
    #[instrument(skip(self))]
    pub async fn set_calibration_date(
        &self,
        record_id: Uuid,
        calibration_date: Option<NaiveDate>,
    ) -> Result<CalibrationRecord, AppError> {
        self.modify(record_id, "set_calibration", |record| {
            let registry = record.registry;
            match &mut record.inventory {
                Inventory::Flat(dates) => {
                    *dates = CertificateDates::from_calibration(calibration_date)
                        .map_err(invalid_date)?;
                    Ok(())
                }
                Inventory::Devices { .. } => Err(bad_request(format!(
                    "Registry '{}' records take calibration dates per device",
                    registry
                ))),
            }
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_record(&self, record_id: Uuid) -> Result<(), AppError> {
        let record = self.store.get(record_id).await.map_err(counted)?;
        self.store.delete(record_id).await.map_err(counted)?;

        record_operation(record.registry.as_str(), "delete");
        info!(record_id = %record_id, "Record deleted");
        Ok(())
    }

    /// Recompute and persist every record's status. Returns how many changed.
    #[instrument(skip(self))]
    pub async fn refresh_statuses(&self, registry: Option<RegistryKind>) -> Result<usize, AppError> {
        let reference = self.lifecycle.today();
        let mut changed = 0;

        for mut record in self.store.list(registry).await.map_err(counted)? {
            if self.refresh_status(&mut record, reference).await? {
                changed += 1;
            }
        }

        info!(changed, %reference, "Statuses refreshed");
        Ok(changed)
    }

    /// Certificates expiring between today and `days` from now, soonest first.
    #[instrument(skip(self))]
    pub async fn expiring_within(
        &self,
        registry: Option<RegistryKind>,
        days: i64,
    ) -> Result<Vec<RenewalEntry>, AppError> {
        if days < 0 {
            return Err(bad_request(format!(
                "Renewal window must not be negative, got {}",
                days
            )));
        }

        let reference = self.lifecycle.today();
        let mut entries = Vec::new();

        for record in self.store.list(registry).await.map_err(counted)? {
            let certificates: Vec<(Option<Uuid>, Option<NaiveDate>)> = match &record.inventory {
                Inventory::Flat(dates) => vec![(None, dates.expiry_date())],
                Inventory::Devices { devices } => devices
                    .iter()
                    .map(|d| (Some(d.device_id()), d.expiry_date()))
                    .collect(),
            };

            for (device_id, expiry) in certificates {
                let (Some(expiry_date), Some(days_left)) =
                    (expiry, days_until_expiry(expiry, reference))
                else {
                    continue;
                };
                if (0..=days).contains(&days_left) {
                    entries.push(RenewalEntry {
                        record_id: record.record_id,
                        registry: record.registry,
                        owner_name: record.owner_name.clone(),
                        device_id,
                        expiry_date,
                        days_left,
                    });
                }
            }
        }

        entries.sort_by(|a, b| {
            a.expiry_date
                .cmp(&b.expiry_date)
                .then_with(|| a.owner_name.cmp(&b.owner_name))
        });
        Ok(entries)
    }
}
