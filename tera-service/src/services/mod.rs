//! Services module for tera-service.

pub mod clock;
pub mod lifecycle;
pub mod metrics;
pub mod registry;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use lifecycle::CertificateLifecycle;
pub use metrics::{get_metrics, init_metrics};
pub use registry::RegistryService;
pub use store::{InMemoryRecordStore, RecordStore};
