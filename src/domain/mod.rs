//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the observed time series (`Observation`, `PriceSeries`)
//! - derived window statistics (`Summary`)
//! - run configuration (`TrackerConfig`, `StorageFormat`, `CivilOffset`, etc.)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
