//! Input/output helpers.
//!
//! - record store load/persist (`store`)
//! - cooperative lock file for the store's critical section (`lock`)

pub mod lock;
pub mod store;

pub use lock::*;
pub use store::*;
