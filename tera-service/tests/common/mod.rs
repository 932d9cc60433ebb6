//! Test helper module for tera-service integration tests.
//!
//! Provides a registry over an in-memory store with a pinned clock.

#![allow(dead_code)]

use chrono::{DateTime, Months, NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use tera_service::models::{CreateRecord, DeviceCondition, DeviceInput, RegistryKind};
use tera_service::services::lifecycle::{utc_offset, DEFAULT_UTC_OFFSET_HOURS};
use tera_service::services::{
    init_metrics, CertificateLifecycle, FixedClock, InMemoryRecordStore, RegistryService,
};

/// 10:00 WIB on 15 June 2025.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 3, 0, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Calibration date whose certificate expires on `expiry`.
pub fn calibrated_for_expiry(expiry: NaiveDate) -> NaiveDate {
    expiry.checked_sub_months(Months::new(12)).unwrap()
}

/// Test registry wrapper for integration tests.
pub struct TestRegistry {
    pub service: RegistryService<InMemoryRecordStore>,
    pub store: Arc<InMemoryRecordStore>,
    pub clock: Arc<FixedClock>,
}

impl TestRegistry {
    /// Registry whose "now" is [`test_now`].
    pub fn spawn() -> Self {
        Self::spawn_at(test_now())
    }

    pub fn spawn_at(now: DateTime<Utc>) -> Self {
        init_metrics();

        let store = Arc::new(InMemoryRecordStore::new());
        let clock = Arc::new(FixedClock::new(now));
        let lifecycle = CertificateLifecycle::new(
            clock.clone(),
            utc_offset(DEFAULT_UTC_OFFSET_HOURS).unwrap(),
        );

        Self {
            service: RegistryService::new(store.clone(), lifecycle),
            store,
            clock,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.service.lifecycle().today()
    }

    /// Move the pinned clock forward by whole days.
    pub fn advance_days(&self, days: i64) {
        let now = self.service.lifecycle().now() + chrono::Duration::days(days);
        self.clock.set(now);
    }
}

pub fn device(kind: &str, calibration_date: Option<NaiveDate>) -> DeviceInput {
    DeviceInput {
        kind: kind.to_string(),
        brand: "Camry".to_string(),
        condition: DeviceCondition::Good,
        calibration_date,
    }
}

pub fn market_record(owner_name: &str, devices: Vec<DeviceInput>) -> CreateRecord {
    CreateRecord {
        registry: RegistryKind::Market,
        owner_name: owner_name.to_string(),
        address: "Pasar Bandar, Kios 12".to_string(),
        permit_number: format!("SIUP-{}", owner_name.to_uppercase()),
        calibration_date: None,
        devices,
        metadata: None,
    }
}

pub fn spbu_record(owner_name: &str, calibration_date: Option<NaiveDate>) -> CreateRecord {
    CreateRecord {
        registry: RegistryKind::Spbu,
        owner_name: owner_name.to_string(),
        address: "Jl. Ahmad Yani No. 5".to_string(),
        permit_number: format!("SPBU-{}", owner_name.to_uppercase()),
        calibration_date,
        devices: vec![],
        metadata: Some(serde_json::json!({ "nozzles": 4 })),
    }
}
