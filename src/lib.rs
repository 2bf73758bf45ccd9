//! `pricewatch` library crate.
//!
//! The binary (`pricewatch`) is a thin wrapper around this library so that:
//!
//! - the store, statistics and pipeline are testable without spawning processes
//! - the observation source and notifier can be swapped for fakes
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod notify;
pub mod report;
pub mod stats;
