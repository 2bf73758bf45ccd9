//! Observation sources.
//!
//! The pipeline only needs "give me today's price or fail"; how the number is
//! obtained lives behind `PriceSource` so runs can be driven by fakes in tests.

pub mod page;

pub use page::*;

use crate::domain::is_valid_price;
use crate::error::AppError;

/// Anything that can produce a single price observation.
pub trait PriceSource {
    /// Fetch the current price. Failures are reported as `ObservationFailed`.
    fn observe(&self) -> Result<f64, AppError>;
}

/// Reject prices that cannot enter the series.
pub fn validate_price(price: f64) -> Result<f64, AppError> {
    if is_valid_price(price) {
        Ok(price)
    } else {
        Err(AppError::observation(format!(
            "Observed price {price} is not a positive finite number."
        )))
    }
}
