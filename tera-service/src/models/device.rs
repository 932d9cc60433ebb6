//! Calibrated device (UTTP) model.

use crate::error::LifecycleError;
use crate::services::lifecycle::derive_expiry;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physical condition recorded at inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCondition {
    #[serde(alias = "Baik", alias = "baik")]
    Good,
    #[serde(alias = "Rusak", alias = "rusak")]
    Damaged,
}

impl DeviceCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCondition::Good => "good",
            DeviceCondition::Damaged => "damaged",
        }
    }
}

impl std::fmt::Display for DeviceCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A measuring instrument subject to periodic calibration.
///
/// The expiry date is never set directly: it is derived from the
/// calibration date whenever the device is created or edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibratedDevice {
    device_id: Uuid,
    kind: String,
    brand: String,
    condition: DeviceCondition,
    calibration_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
}

impl CalibratedDevice {
    /// Build a new device, deriving its expiry from the calibration date.
    pub fn new(input: DeviceInput) -> Result<Self, LifecycleError> {
        let expiry_date = derive_expiry(input.calibration_date)?;
        Ok(Self {
            device_id: Uuid::new_v4(),
            kind: input.kind,
            brand: input.brand,
            condition: input.condition,
            calibration_date: input.calibration_date,
            expiry_date,
        })
    }

    /// Replace the editable fields, keeping the device id.
    pub fn apply(&mut self, input: DeviceInput) -> Result<(), LifecycleError> {
        let expiry_date = derive_expiry(input.calibration_date)?;
        self.kind = input.kind;
        self.brand = input.brand;
        self.condition = input.condition;
        self.calibration_date = input.calibration_date;
        self.expiry_date = expiry_date;
        Ok(())
    }

    /// Record a new calibration, rolling the expiry forward.
    pub fn recalibrate(&mut self, calibration_date: NaiveDate) -> Result<(), LifecycleError> {
        self.expiry_date = derive_expiry(Some(calibration_date))?;
        self.calibration_date = Some(calibration_date);
        Ok(())
    }

    pub fn device_id(&self) -> Uuid {
        self.device_id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn condition(&self) -> DeviceCondition {
        self.condition
    }

    pub fn calibration_date(&self) -> Option<NaiveDate> {
        self.calibration_date
    }

    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry_date
    }
}

/// Input for adding or editing a device.
#[derive(Debug, Clone)]
pub struct DeviceInput {
    pub kind: String,
    pub brand: String,
    pub condition: DeviceCondition,
    pub calibration_date: Option<NaiveDate>,
}
