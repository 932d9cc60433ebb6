//! Calibration record model.

use super::device::{CalibratedDevice, DeviceInput};
use super::status::RecordStatus;
use crate::error::LifecycleError;
use crate::services::lifecycle::derive_expiry;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registry a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    /// Fuel stations. One pump certificate per record.
    #[serde(alias = "SPBU")]
    Spbu,
    /// Market stall traders (Pasar).
    #[serde(alias = "pasar", alias = "Pasar")]
    Market,
    /// General registrants (Umum).
    #[serde(alias = "umum", alias = "Umum")]
    General,
    /// Business owners (pelaku usaha).
    #[serde(alias = "pelaku_usaha")]
    BusinessOwner,
}

impl RegistryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryKind::Spbu => "spbu",
            RegistryKind::Market => "market",
            RegistryKind::General => "general",
            RegistryKind::BusinessOwner => "business_owner",
        }
    }

    /// Whether records carry a single flat certificate instead of a device list.
    pub fn is_single_device(&self) -> bool {
        matches!(self, RegistryKind::Spbu)
    }
}

impl std::fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Calibration and derived expiry dates held directly on a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateDates {
    calibration_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
}

impl CertificateDates {
    pub fn from_calibration(calibration_date: Option<NaiveDate>) -> Result<Self, LifecycleError> {
        Ok(Self {
            calibration_date,
            expiry_date: derive_expiry(calibration_date)?,
        })
    }

    pub fn calibration_date(&self) -> Option<NaiveDate> {
        self.calibration_date
    }

    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry_date
    }
}

/// What a record certifies: one flat certificate or a list of devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inventory {
    Flat(CertificateDates),
    Devices { devices: Vec<CalibratedDevice> },
}

impl Inventory {
    pub fn devices(&self) -> &[CalibratedDevice] {
        match self {
            Inventory::Flat(_) => &[],
            Inventory::Devices { devices } => devices.as_slice(),
        }
    }
}

/// A registrant and the certificates of its devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub record_id: Uuid,
    pub registry: RegistryKind,
    pub owner_name: String,
    pub address: String,
    pub permit_number: String,
    pub(crate) inventory: Inventory,
    pub(crate) status: RecordStatus,
    pub metadata: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl CalibrationRecord {
    /// Status as of the last recomputation.
    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn devices(&self) -> &[CalibratedDevice] {
        self.inventory.devices()
    }

    pub fn device(&self, device_id: Uuid) -> Option<&CalibratedDevice> {
        self.devices().iter().find(|d| d.device_id() == device_id)
    }
}

/// Input for creating a record.
#[derive(Debug, Clone)]
pub struct CreateRecord {
    pub registry: RegistryKind,
    pub owner_name: String,
    pub address: String,
    pub permit_number: String,
    /// Flat certificate date; only for single-device registries.
    pub calibration_date: Option<NaiveDate>,
    /// Devices; only for multi-device registries.
    pub devices: Vec<DeviceInput>,
    pub metadata: Option<serde_json::Value>,
}

/// Filter parameters for listing records.
#[derive(Debug, Clone, Default)]
pub struct ListRecordsFilter {
    pub registry: Option<RegistryKind>,
    pub status: Option<RecordStatus>,
    /// Case-insensitive match on owner name or permit number.
    pub search: Option<String>,
}

impl ListRecordsFilter {
    pub fn matches(&self, record: &CalibrationRecord) -> bool {
        if self.registry.is_some_and(|r| r != record.registry) {
            return false;
        }
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                record.owner_name.to_lowercase().contains(&term)
                    || record.permit_number.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// A certificate due for renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenewalEntry {
    pub record_id: Uuid,
    pub registry: RegistryKind,
    pub owner_name: String,
    /// `None` for flat single-device records.
    pub device_id: Option<Uuid>,
    pub expiry_date: NaiveDate,
    pub days_left: i64,
}
