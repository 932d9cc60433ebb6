//! Certificate lifecycle: status derivation and expiry rollover.
//!
//! Every function here is pure. "Now" enters only through
//! [`CertificateLifecycle::today`], which reads the injected [`Clock`] and
//! normalises it to a calendar date in a single timezone. All comparisons are
//! on [`NaiveDate`], so time of day never affects a result.

use crate::error::LifecycleError;
use crate::models::{CalibratedDevice, Inventory, RecordStatus};
use crate::services::clock::{Clock, SystemClock};
use chrono::{DateTime, FixedOffset, Months, NaiveDate, Utc};
use std::sync::Arc;

/// Certificates are valid for one calendar year after calibration.
const CERTIFICATE_VALIDITY: Months = Months::new(12);

/// Western Indonesia Time (WIB), where the registries are operated.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

/// Classify a single certificate.
///
/// Inactive only when an expiry exists and falls strictly before `reference`.
/// A certificate expiring on the reference date is still active that day.
pub fn classify_status(expiry: Option<NaiveDate>, reference: NaiveDate) -> RecordStatus {
    match expiry {
        Some(expiry) if expiry < reference => RecordStatus::Inactive,
        _ => RecordStatus::Active,
    }
}

/// Classify a device list: inactive if any device is inactive.
pub fn classify_record_status(devices: &[CalibratedDevice], reference: NaiveDate) -> RecordStatus {
    let any_expired = devices
        .iter()
        .any(|d| classify_status(d.expiry_date(), reference) == RecordStatus::Inactive);

    if any_expired {
        RecordStatus::Inactive
    } else {
        RecordStatus::Active
    }
}

/// Classify a record's inventory, flat or device list.
pub fn classify_inventory(inventory: &Inventory, reference: NaiveDate) -> RecordStatus {
    match inventory {
        Inventory::Flat(dates) => classify_status(dates.expiry_date(), reference),
        Inventory::Devices { devices } => classify_record_status(devices, reference),
    }
}

/// Expiry for a calibration performed on `calibration`.
///
/// Adds one calendar year. A calibration on 29 February expires on
/// 28 February of the following year.
pub fn compute_expiry_from_calibration(calibration: NaiveDate) -> Result<NaiveDate, LifecycleError> {
    calibration
        .checked_add_months(CERTIFICATE_VALIDITY)
        .ok_or_else(|| {
            LifecycleError::invalid_date(
                calibration.to_string(),
                "expiry falls outside the supported calendar range",
            )
        })
}

/// Expiry field value for an optional calibration date.
pub fn derive_expiry(calibration: Option<NaiveDate>) -> Result<Option<NaiveDate>, LifecycleError> {
    calibration.map(compute_expiry_from_calibration).transpose()
}

/// Parse a date submitted by a form or read from the data store.
///
/// Accepts `YYYY-MM-DD` and RFC 3339 timestamps; timestamps are reduced to
/// their calendar date in `timezone`.
pub fn parse_date(input: &str, timezone: FixedOffset) -> Result<NaiveDate, LifecycleError> {
    let trimmed = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&timezone).date_naive())
        .map_err(|e| LifecycleError::invalid_date(input, e.to_string()))
}

/// Like [`parse_date`], but a missing or blank value means "no date".
pub fn parse_optional_date(
    input: Option<&str>,
    timezone: FixedOffset,
) -> Result<Option<NaiveDate>, LifecycleError> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_date(value, timezone).map(Some),
    }
}

/// Calendar date of `now` in `timezone`.
pub fn reference_date(now: DateTime<Utc>, timezone: FixedOffset) -> NaiveDate {
    now.with_timezone(&timezone).date_naive()
}

/// Days from `reference` until `expiry`; negative once expired.
pub fn days_until_expiry(expiry: Option<NaiveDate>, reference: NaiveDate) -> Option<i64> {
    expiry.map(|e| (e - reference).num_days())
}

/// Build a UTC offset from whole hours.
pub fn utc_offset(hours: i32) -> Result<FixedOffset, LifecycleError> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            LifecycleError::invalid_date(hours.to_string(), "UTC offset out of range")
        })
}

/// Lifecycle bound to a clock and timezone.
///
/// Holds no record state; it only decides what "today" is.
#[derive(Clone)]
pub struct CertificateLifecycle {
    clock: Arc<dyn Clock>,
    timezone: FixedOffset,
}

impl CertificateLifecycle {
    pub fn new(clock: Arc<dyn Clock>, timezone: FixedOffset) -> Self {
        Self { clock, timezone }
    }

    /// Lifecycle on the system clock.
    pub fn system(timezone: FixedOffset) -> Self {
        Self::new(Arc::new(SystemClock), timezone)
    }

    pub fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    /// Current instant, for audit timestamps.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Reference date for status evaluation.
    pub fn today(&self) -> NaiveDate {
        reference_date(self.clock.now(), self.timezone)
    }

    pub fn parse_date(&self, input: &str) -> Result<NaiveDate, LifecycleError> {
        parse_date(input, self.timezone)
    }

    pub fn parse_optional_date(&self, input: Option<&str>) -> Result<Option<NaiveDate>, LifecycleError> {
        parse_optional_date(input, self.timezone)
    }

    pub fn status_today(&self, inventory: &Inventory) -> RecordStatus {
        classify_inventory(inventory, self.today())
    }
}

impl std::fmt::Debug for CertificateLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateLifecycle")
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}
