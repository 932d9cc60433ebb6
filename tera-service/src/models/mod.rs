//! Domain models for tera-service.

mod device;
mod record;
mod status;

pub use device::{CalibratedDevice, DeviceCondition, DeviceInput};
pub use record::{
    CalibrationRecord, CertificateDates, CreateRecord, Inventory, ListRecordsFilter,
    RegistryKind, RenewalEntry,
};
pub use status::RecordStatus;
