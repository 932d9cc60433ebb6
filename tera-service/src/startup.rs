//! Registry startup and wiring.

use crate::config::TeraConfig;
use crate::models::{RegistryKind, RenewalEntry};
use crate::services::{
    init_metrics, CertificateLifecycle, Clock, InMemoryRecordStore, RecordStore, RegistryService,
    SystemClock,
};
use service_core::error::AppError;
use service_core::observability::init_tracing;
use std::sync::Arc;

/// Configured registry: the service plus the settings it was built from.
pub struct Registry<S: RecordStore = InMemoryRecordStore> {
    config: TeraConfig,
    service: RegistryService<S>,
}

impl Registry {
    /// Load configuration from the environment and build the registry.
    pub fn from_env() -> Result<Self, AppError> {
        let config = TeraConfig::load().map_err(|e| {
            eprintln!("Failed to load configuration: {}", e);
            e
        })?;
        Self::build(config)
    }

    /// Build the registry over an in-memory store and the system clock.
    pub fn build(config: TeraConfig) -> Result<Self, AppError> {
        Self::build_with(
            config,
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(SystemClock),
        )
    }
}

impl<S: RecordStore> Registry<S> {
    /// Build the registry with the given store and clock.
    pub fn build_with(
        config: TeraConfig,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        init_tracing(&config.common.service_name, &config.common.log_level);
        init_metrics();

        let timezone = config.lifecycle.timezone().map_err(|e| {
            tracing::error!(error = %e, "Invalid lifecycle timezone");
            e
        })?;
        let lifecycle = CertificateLifecycle::new(clock, timezone);

        tracing::info!(
            service_name = %config.common.service_name,
            utc_offset_hours = config.lifecycle.utc_offset_hours,
            renewal_window_days = config.lifecycle.renewal_window_days,
            today = %lifecycle.today(),
            "Registry configured"
        );

        Ok(Self {
            config,
            service: RegistryService::new(store, lifecycle),
        })
    }

    pub fn config(&self) -> &TeraConfig {
        &self.config
    }

    pub fn service(&self) -> &RegistryService<S> {
        &self.service
    }

    /// Renewal queue over the configured look-ahead window.
    pub async fn expiring_soon(
        &self,
        registry: Option<RegistryKind>,
    ) -> Result<Vec<RenewalEntry>, AppError> {
        self.service
            .expiring_within(registry, self.config.lifecycle.renewal_window_days)
            .await
    }
}
