//! Tera Service - calibration certificate lifecycle for metrology registries.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod startup;
